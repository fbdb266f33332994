//! Best-effort hostname resolution and ip:port deduplication of configured addresses.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use log::debug;
use rank_core::{Address, Identity};
use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;

/// Name lookup capability. Implementations report failure instead of retrying forever.
#[async_trait]
pub trait Resolve: Send + Sync {
    async fn resolve(&self, host: &str) -> Result<IpAddr>;
}

/// Resolver backed by the operating system (`getaddrinfo` through tokio).
#[derive(Debug, Clone, Default)]
pub struct SystemResolver {
    /// Extra cap on a single lookup; `None` relies on the OS resolver's own timeout.
    pub timeout: Option<Duration>,
}

#[async_trait]
impl Resolve for SystemResolver {
    async fn resolve(&self, host: &str) -> Result<IpAddr> {
        if let Ok(ip) = host.parse::<IpAddr>() {
            return Ok(ip);
        }
        let lookup = tokio::net::lookup_host((host, 0u16));
        let mut addrs = match self.timeout {
            Some(t) => timeout(t, lookup).await.map_err(|_| anyhow!("lookup timed out: {}", host))??,
            None => lookup.await?,
        };
        addrs.next().map(|sa| sa.ip()).ok_or_else(|| anyhow!("no address for: {}", host))
    }
}

/// Tag one address with its resolved ip. Failure leaves `ip` unset.
pub async fn resolve_address(resolver: &dyn Resolve, mut address: Address) -> Address {
    match resolver.resolve(&address.host).await {
        Ok(ip) => address.ip = Some(ip),
        Err(e) => debug!("resolve {} failed: {}", address.host, e),
    }
    address
}

/// Resolve every address concurrently. Output order matches input order.
pub async fn resolve_all(resolver: Arc<dyn Resolve>, addresses: Vec<Address>) -> Vec<Address> {
    let mut handles = Vec::with_capacity(addresses.len());
    for address in addresses {
        let r = resolver.clone();
        let fallback = address.clone();
        let h = tokio::spawn(async move { resolve_address(r.as_ref(), address).await });
        handles.push((h, fallback));
    }
    let mut out = Vec::with_capacity(handles.len());
    for (h, fallback) in handles {
        match h.await {
            Ok(a) => out.push(a),
            Err(e) => {
                debug!("resolve task for {} aborted: {}", fallback.host, e);
                out.push(fallback);
            }
        }
    }
    out
}

/// Collapse addresses that share an identity. The first occurrence is canonical and
/// collects every other member's hostnames in `alias_hosts`.
pub fn dedupe(addresses: Vec<Address>) -> Vec<Address> {
    let mut index: HashMap<Identity, usize> = HashMap::new();
    let mut out: Vec<Address> = Vec::new();
    for address in addresses {
        match index.get(&address.identity()) {
            Some(&i) => {
                let canonical = &mut out[i];
                for host in std::iter::once(address.host).chain(address.alias_hosts) {
                    if host != canonical.host && !canonical.alias_hosts.contains(&host) {
                        canonical.alias_hosts.push(host);
                    }
                }
            }
            None => {
                index.insert(address.identity(), out.len());
                out.push(address);
            }
        }
    }
    out
}
