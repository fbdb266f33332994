use crate::{parse_plugins, PingResponse, ProbeError, ProbeKind, ProbeResponse, ProbeTransport, QueryResponse};
use log::debug;
use rank_core::{Address, MinuteStamp};
use records::ServerRecord;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeSettings {
    pub ping_attempts: u32,
    pub query_attempts: u32,
    pub timeout: Duration,
}

impl Default for ProbeSettings {
    fn default() -> Self {
        ProbeSettings { ping_attempts: 3, query_attempts: 2, timeout: Duration::from_millis(2000) }
    }
}

/// Applies ping and query outcomes to a server record. Probe failures are folded into
/// the record and never returned.
#[derive(Clone)]
pub struct ProbeClient {
    transport: Arc<dyn ProbeTransport>,
    settings: ProbeSettings,
}

impl ProbeClient {
    pub fn new(transport: Arc<dyn ProbeTransport>, settings: ProbeSettings) -> Self {
        ProbeClient { transport, settings }
    }

    async fn send(&self, kind: ProbeKind, address: &Address, attempts: u32) -> Result<ProbeResponse, ProbeError> {
        self.transport
            .probe(kind, &address.probe_host(), address.port, attempts, self.settings.timeout)
            .await
    }

    /// Liveness phase. On success the record goes online with fresh identity and
    /// population; on failure it goes offline with zero players. Returns `online`.
    pub async fn ping(&self, server: &mut ServerRecord, now: MinuteStamp) -> bool {
        match self.send(ProbeKind::Ping, &server.address, self.settings.ping_attempts).await {
            Ok(ProbeResponse::Ping(PingResponse { hostname, version, numplayers, maxplayers })) => {
                server.online = true;
                server.last_online = now;
                server.hostname = hostname;
                server.version = version;
                server.maxplayers = maxplayers;
                server.numplayers = numplayers;
            }
            other => {
                if let Err(e) = other {
                    debug!("ping {} failed: {}", server.address.identity(), e);
                }
                server.online = false;
                server.numplayers = 0;
            }
        }
        server.online
    }

    /// Detail phase, skipped for offline servers. A failure keeps the ping result and
    /// whatever detail fields the record already had. Returns whether a reply arrived.
    pub async fn query(&self, server: &mut ServerRecord) -> bool {
        if !server.online {
            return false;
        }
        match self.send(ProbeKind::Query, &server.address, self.settings.query_attempts).await {
            Ok(ProbeResponse::Query(QueryResponse { server_engine, players, plugins })) => {
                if let Some(engine) = server_engine {
                    server.server_engine = engine;
                }
                if let Some(names) = players {
                    server.players = names;
                }
                if let Some(manifest) = plugins {
                    server.plugins = Some(parse_plugins(&manifest));
                }
                true
            }
            Ok(_) => false,
            Err(e) => {
                debug!("query {} failed: {}", server.address.identity(), e);
                false
            }
        }
    }
}
