use crate::{DataPaths, RecordPatch, ServerRecord, StoreError};
use log::debug;
use rank_core::Address;
use serde::Serialize;
use std::path::Path;

/// JSON snapshot files for servers and fleet-wide documents.
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    pub paths: DataPaths,
}

impl SnapshotStore {
    pub fn open_or_create(paths: DataPaths) -> Result<Self, StoreError> {
        paths
            .ensure_dirs()
            .map_err(|source| StoreError::Io { path: paths.servers_dir.clone(), source })?;
        Ok(SnapshotStore { paths })
    }

    /// Load the snapshot for `address`. A missing, unreadable or corrupt file yields a
    /// fresh default record; loading never fails.
    pub async fn load(&self, address: &Address) -> ServerRecord {
        let path = self.paths.server(&address.identity());
        let patch = match tokio::fs::read(&path).await {
            Ok(bytes) => match serde_json::from_slice::<RecordPatch>(&bytes) {
                Ok(p) => Some(p),
                Err(e) => {
                    debug!("discarding corrupt snapshot {}: {}", path.display(), e);
                    None
                }
            },
            Err(_) => None,
        };
        ServerRecord::new(address.clone(), patch)
    }

    pub fn save(&self, server: &ServerRecord) -> Result<(), StoreError> {
        write_json(&self.paths.server(&server.address.identity()), server)
    }
}

/// Overwrite `path` with the JSON encoding of `value`.
pub fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), StoreError> {
    let bytes = serde_json::to_vec(value).map_err(|source| StoreError::Json { path: path.to_path_buf(), source })?;
    std::fs::write(path, bytes).map_err(|source| StoreError::Io { path: path.to_path_buf(), source })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::RollingRecord;

    fn store() -> (tempfile::TempDir, SnapshotStore) {
        let tmp = tempfile::tempdir().unwrap();
        let s = SnapshotStore::open_or_create(DataPaths::under(tmp.path())).unwrap();
        (tmp, s)
    }

    fn resolved() -> Address {
        let mut a = Address::new("mc.example", 19132);
        a.ip = Some("10.0.0.9".parse().unwrap());
        a
    }

    #[tokio::test]
    async fn missing_file_loads_defaults() {
        let (_tmp, s) = store();
        let r = s.load(&resolved()).await;
        assert_eq!(r, ServerRecord::new(resolved(), None));
    }

    #[tokio::test]
    async fn save_then_load_round_trips() {
        let (_tmp, s) = store();
        let mut r = ServerRecord::new(resolved(), None);
        r.online = true;
        r.hostname = "Lobby".into();
        r.numplayers = 17;
        r.maxplayers = 100;
        r.rank = 2;
        r.last_update = 28_000_000;
        r.last_online = 28_000_000;
        r.players = vec!["Alex".into(), "Steve".into()];
        r.monthly_record = RollingRecord { numplayers: 30 };
        s.save(&r).unwrap();
        assert_eq!(s.load(&resolved()).await, r);
    }

    #[tokio::test]
    async fn load_uses_given_address_over_stored_one() {
        let (_tmp, s) = store();
        let r = ServerRecord::new(resolved(), None);
        s.save(&r).unwrap();
        let mut fresh = resolved();
        fresh.alias_hosts.push("alt.example".into());
        assert_eq!(s.load(&fresh).await.address, fresh);
    }

    #[tokio::test]
    async fn null_rolling_count_keeps_the_rest_of_the_snapshot() {
        let (_tmp, s) = store();
        std::fs::write(
            s.paths.server(&resolved().identity()),
            r#"{"hostname":"Lobby","last_online":28000000,"daily_record":{"numplayers":5},
                "weekly_record":{"numplayers":null},"monthly_record":{"numplayers":40}}"#,
        )
        .unwrap();
        let r = s.load(&resolved()).await;
        assert_eq!(r.hostname, "Lobby");
        assert_eq!(r.last_online, 28_000_000);
        assert_eq!(r.daily_record, RollingRecord { numplayers: 5 });
        assert_eq!(r.weekly_record, RollingRecord { numplayers: 0 });
        assert_eq!(r.monthly_record, RollingRecord { numplayers: 40 });
    }

    #[tokio::test]
    async fn corrupt_file_loads_defaults() {
        let (_tmp, s) = store();
        std::fs::write(s.paths.server(&resolved().identity()), b"{not json").unwrap();
        assert_eq!(s.load(&resolved()).await, ServerRecord::new(resolved(), None));
    }
}
