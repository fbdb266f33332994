use rank_core::Identity;
use std::io;
use std::path::{Path, PathBuf};

/// Every file and directory the pipeline reads or writes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataPaths {
    pub servers_dir: PathBuf,
    pub server_statistics_dir: PathBuf,
    pub online_servers: PathBuf,
    pub offline_servers: PathBuf,
    pub plugins: PathBuf,
    pub total: PathBuf,
    pub total_statistics: PathBuf,
}

impl DataPaths {
    /// Standard layout below a data root.
    pub fn under(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref();
        let statistics = root.join("statistics");
        DataPaths {
            servers_dir: root.join("servers"),
            server_statistics_dir: statistics.join("servers"),
            online_servers: root.join("online_servers.json"),
            offline_servers: root.join("offline_servers.json"),
            plugins: root.join("plugins.json"),
            total: root.join("total.json"),
            total_statistics: statistics.join("total.csv"),
        }
    }

    pub fn server(&self, id: &Identity) -> PathBuf {
        self.servers_dir.join(format!("{}.json", id.file_stem()))
    }

    pub fn server_statistics(&self, id: &Identity) -> PathBuf {
        self.server_statistics_dir.join(format!("{}.csv", id.file_stem()))
    }

    pub fn ensure_dirs(&self) -> io::Result<()> {
        let mut dirs = vec![self.servers_dir.as_path(), self.server_statistics_dir.as_path()];
        for file in [&self.online_servers, &self.offline_servers, &self.plugins, &self.total, &self.total_statistics] {
            if let Some(parent) = file.parent() {
                dirs.push(parent);
            }
        }
        for d in dirs {
            if !d.as_os_str().is_empty() {
                std::fs::create_dir_all(d)?;
            }
        }
        Ok(())
    }
}
