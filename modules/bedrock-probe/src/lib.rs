//! Two-phase probing of Bedrock servers: RakNet ping, then GameSpy4 query.

pub mod client;
pub mod gs4;
pub mod plugins;
pub mod raknet;

pub use client::{ProbeClient, ProbeSettings};
pub use plugins::parse_plugins;

use async_trait::async_trait;
use log::debug;
use rand::{thread_rng, Rng};
use std::net::SocketAddr;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use thiserror::Error;
use tokio::net::UdpSocket;
use tokio::time::timeout;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeKind {
    /// Cheap liveness and population check.
    Ping,
    /// Engine, player list and plugin manifest.
    Query,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PingResponse {
    pub hostname: String,
    pub version: String,
    pub numplayers: u32,
    pub maxplayers: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryResponse {
    pub server_engine: Option<String>,
    pub players: Option<Vec<String>>,
    /// Raw manifest string, see [`parse_plugins`].
    pub plugins: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeResponse {
    Ping(PingResponse),
    Query(QueryResponse),
}

#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("timed out")]
    Timeout,
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed response: {0}")]
    Malformed(String),
    #[error("cannot resolve {0}")]
    Resolve(String),
}

impl From<tokio::time::error::Elapsed> for ProbeError {
    fn from(_: tokio::time::error::Elapsed) -> Self { ProbeError::Timeout }
}

/// Game-protocol transport. `attempts` bounds retries, `per_attempt` bounds each
/// socket operation.
#[async_trait]
pub trait ProbeTransport: Send + Sync {
    async fn probe(
        &self,
        kind: ProbeKind,
        host: &str,
        port: u16,
        attempts: u32,
        per_attempt: Duration,
    ) -> Result<ProbeResponse, ProbeError>;
}

/// UDP transport speaking the Bedrock ping and query protocols.
#[derive(Debug, Clone, Default)]
pub struct BedrockUdpTransport;

#[async_trait]
impl ProbeTransport for BedrockUdpTransport {
    async fn probe(
        &self,
        kind: ProbeKind,
        host: &str,
        port: u16,
        attempts: u32,
        per_attempt: Duration,
    ) -> Result<ProbeResponse, ProbeError> {
        let addr = resolve_first(host, port).await?;
        let mut last = ProbeError::Timeout;
        for attempt in 1..=attempts.max(1) {
            let res = match kind {
                ProbeKind::Ping => ping_once(addr, per_attempt).await.map(ProbeResponse::Ping),
                ProbeKind::Query => query_once(addr, per_attempt).await.map(ProbeResponse::Query),
            };
            match res {
                Ok(r) => return Ok(r),
                Err(e) => {
                    debug!("{:?} {} attempt {}/{} failed: {}", kind, addr, attempt, attempts.max(1), e);
                    last = e;
                }
            }
        }
        Err(last)
    }
}

async fn resolve_first(host: &str, port: u16) -> Result<SocketAddr, ProbeError> {
    let mut it = tokio::net::lookup_host((host, port)).await.map_err(|_| ProbeError::Resolve(host.to_string()))?;
    it.next().ok_or_else(|| ProbeError::Resolve(host.to_string()))
}

async fn connected_socket(addr: SocketAddr) -> Result<UdpSocket, ProbeError> {
    let local = if addr.is_ipv4() { "0.0.0.0:0" } else { "[::]:0" };
    let sock = UdpSocket::bind(local).await?;
    sock.connect(addr).await?;
    Ok(sock)
}

async fn exchange(sock: &UdpSocket, pkt: &[u8], buf: &mut [u8], per_attempt: Duration) -> Result<usize, ProbeError> {
    timeout(per_attempt, sock.send(pkt)).await??;
    Ok(timeout(per_attempt, sock.recv(buf)).await??)
}

async fn ping_once(addr: SocketAddr, per_attempt: Duration) -> Result<PingResponse, ProbeError> {
    let sock = connected_socket(addr).await?;
    let now_ms = SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_millis() as u64).unwrap_or(0);
    let pkt = raknet::build_unconnected_ping(now_ms, thread_rng().gen());
    let mut buf = [0u8; 1500];
    let n = exchange(&sock, &pkt, &mut buf, per_attempt).await?;
    raknet::parse_unconnected_pong(&buf[..n])
}

async fn query_once(addr: SocketAddr, per_attempt: Duration) -> Result<QueryResponse, ProbeError> {
    let sock = connected_socket(addr).await?;
    let session = gs4::session_id(thread_rng().gen());
    let mut buf = vec![0u8; 8192];
    let n = exchange(&sock, &gs4::build_handshake(session), &mut buf, per_attempt).await?;
    let challenge = gs4::parse_challenge(&buf[..n])?;
    let n = exchange(&sock, &gs4::build_full_stat(session, challenge), &mut buf, per_attempt).await?;
    gs4::parse_full_stat(&buf[..n])
}
