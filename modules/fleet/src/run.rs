use crate::aggregate::{aggregate_plugins, rank, totals, FleetTotals, PluginAggregate};
use crate::persist::{persist, WriteFailure};
use bedrock_probe::ProbeClient;
use log::{info, warn};
use rank_core::runguard::RunGuard;
use rank_core::{minute_timestamp, Address, MinuteStamp, DEFAULT_PORT};
use records::{apply_rolling, ServerRecord, SnapshotStore, StoreError};
use resolve::{dedupe, resolve_all, Resolve};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use time::{OffsetDateTime, UtcOffset};

#[derive(Debug, Error)]
pub enum RunError {
    #[error("a run is already in progress")]
    AlreadyRunning,
    #[error("address list: {0}")]
    Addresses(#[source] StoreError),
    #[error("write phase aborted: {0}")]
    Persist(#[from] tokio::task::JoinError),
}

#[derive(Debug, Clone)]
pub struct FleetOptions {
    /// JSON list of `{host, port}` re-read at the start of every run.
    pub addresses: PathBuf,
    pub default_port: u16,
    /// Calendar used for rolling records.
    pub utc_offset: UtcOffset,
}

impl Default for FleetOptions {
    fn default() -> Self {
        FleetOptions { addresses: PathBuf::from("addresses.json"), default_port: DEFAULT_PORT, utc_offset: UtcOffset::UTC }
    }
}

/// Outcome of one completed run.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub time: MinuteStamp,
    /// Ranked, highest population first.
    pub online: Vec<ServerRecord>,
    pub offline: Vec<ServerRecord>,
    pub plugins: Vec<PluginAggregate>,
    pub totals: FleetTotals,
    pub write_failures: Vec<WriteFailure>,
}

#[derive(Deserialize)]
struct AddressEntry {
    host: String,
    #[serde(default)]
    port: Option<u16>,
}

/// Read the configured address list. A missing or zero port takes `default_port`.
pub fn load_addresses(path: &Path, default_port: u16) -> Result<Vec<Address>, StoreError> {
    let bytes = std::fs::read(path).map_err(|source| StoreError::Io { path: path.to_path_buf(), source })?;
    let entries: Vec<AddressEntry> =
        serde_json::from_slice(&bytes).map_err(|source| StoreError::Json { path: path.to_path_buf(), source })?;
    Ok(entries
        .into_iter()
        .map(|e| Address::new(e.host, e.port.filter(|p| *p != 0).unwrap_or(default_port)))
        .collect())
}

/// Load, ping, roll records forward, then query one server.
pub async fn probe_server(client: &ProbeClient, store: &SnapshotStore, address: Address, now: OffsetDateTime) -> ServerRecord {
    let mut server = store.load(&address).await;
    client.ping(&mut server, minute_timestamp(now)).await;
    apply_rolling(&mut server, now);
    client.query(&mut server).await;
    server
}

pub struct FleetAggregator {
    resolver: Arc<dyn Resolve>,
    client: ProbeClient,
    store: SnapshotStore,
    options: FleetOptions,
    guard: RunGuard,
}

impl FleetAggregator {
    pub fn new(resolver: Arc<dyn Resolve>, client: ProbeClient, store: SnapshotStore, options: FleetOptions) -> Self {
        FleetAggregator { resolver, client, store, options, guard: RunGuard::new() }
    }

    pub fn is_running(&self) -> bool {
        self.guard.is_running()
    }

    pub async fn run(&self) -> Result<RunSummary, RunError> {
        self.run_at(OffsetDateTime::now_utc()).await
    }

    /// One full batch: resolve, dedupe, probe everything concurrently, then rank,
    /// aggregate and persist once every probe has settled. File writes run on the
    /// blocking pool. Refuses to overlap with a run already in flight.
    pub async fn run_at(&self, now: OffsetDateTime) -> Result<RunSummary, RunError> {
        let _permit = self.guard.try_begin().ok_or(RunError::AlreadyRunning)?;
        let now = now.to_offset(self.options.utc_offset);
        let time = minute_timestamp(now);
        info!("run started at {}", now);

        let configured = load_addresses(&self.options.addresses, self.options.default_port).map_err(RunError::Addresses)?;
        let configured_len = configured.len();
        let addresses = dedupe(resolve_all(self.resolver.clone(), configured).await);
        info!("probing {} servers ({} configured addresses)", addresses.len(), configured_len);

        let results = self.probe_all(addresses, now).await;

        let mut ranked = rank(results);
        let plugins = aggregate_plugins(&mut ranked.online);
        let totals = totals(&ranked, &plugins);
        let store = self.store.clone();
        let (ranked, plugins, write_failures) = tokio::task::spawn_blocking(move || {
            let failures = persist(&store, time, &ranked, &plugins, &totals);
            (ranked, plugins, failures)
        })
        .await?;

        info!(
            "run finished: {} players on {}/{} servers, {} plugins, {} failed writes",
            totals.numplayers,
            totals.online_servers,
            totals.servers,
            totals.plugins,
            write_failures.len()
        );
        Ok(RunSummary { time, online: ranked.online, offline: ranked.offline, plugins, totals, write_failures })
    }

    async fn probe_all(&self, addresses: Vec<Address>, now: OffsetDateTime) -> Vec<ServerRecord> {
        let mut handles = Vec::with_capacity(addresses.len());
        for address in addresses {
            let client = self.client.clone();
            let store = self.store.clone();
            let id = address.identity();
            let h = tokio::spawn(async move { probe_server(&client, &store, address, now).await });
            handles.push((id, h));
        }
        let mut out = Vec::with_capacity(handles.len());
        for (id, h) in handles {
            match h.await {
                Ok(server) => out.push(server),
                Err(e) => warn!("probe task for {} aborted, snapshot left untouched: {}", id, e),
            }
        }
        out
    }
}
