use crate::{FleetTotals, PluginAggregate, Ranked};
use log::warn;
use rank_core::MinuteStamp;
use records::{append_fleet_sample, append_server_sample, write_json, SnapshotStore, StoreError};
use std::path::PathBuf;

/// One write that did not land. Reported back to the caller, never retried.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteFailure {
    pub path: PathBuf,
    pub error: String,
}

impl From<StoreError> for WriteFailure {
    fn from(e: StoreError) -> Self {
        WriteFailure { path: e.path().to_path_buf(), error: e.to_string() }
    }
}

/// Write every per-server and fleet file for one run. Each write is attempted regardless
/// of earlier failures.
pub fn persist(store: &SnapshotStore, time: MinuteStamp, ranked: &Ranked, plugins: &[PluginAggregate], totals: &FleetTotals) -> Vec<WriteFailure> {
    let paths = &store.paths;
    let mut results: Vec<Result<(), StoreError>> = Vec::new();

    for server in &ranked.online {
        results.push(append_server_sample(&paths.server_statistics(&server.address.identity()), time, server.numplayers));
        results.push(store.save(server));
    }
    for server in &ranked.offline {
        results.push(store.save(server));
    }

    let online: Vec<_> = ranked.online.iter().map(|s| s.simplify()).collect();
    let offline: Vec<_> = ranked.offline.iter().map(|s| s.simplify()).collect();
    results.push(write_json(&paths.online_servers, &online));
    results.push(write_json(&paths.offline_servers, &offline));
    results.push(write_json(&paths.plugins, plugins));
    results.push(write_json(&paths.total, totals));
    results.push(append_fleet_sample(&paths.total_statistics, time, totals.numplayers, totals.online_servers));

    results
        .into_iter()
        .filter_map(Result::err)
        .map(|e| {
            warn!("write failed: {}", e);
            WriteFailure::from(e)
        })
        .collect()
}
