mod models;
mod paths;
mod rolling;
mod store;
mod timeseries;

pub use models::*;
pub use paths::DataPaths;
pub use rolling::*;
pub use store::{write_json, SnapshotStore};
pub use timeseries::*;

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{}: {source}", path.display())]
    Io { path: PathBuf, #[source] source: std::io::Error },
    #[error("{}: {source}", path.display())]
    Json { path: PathBuf, #[source] source: serde_json::Error },
    #[error("{}: {source}", path.display())]
    Csv { path: PathBuf, #[source] source: csv::Error },
}

impl StoreError {
    pub fn path(&self) -> &std::path::Path {
        match self {
            StoreError::Io { path, .. } | StoreError::Json { path, .. } | StoreError::Csv { path, .. } => path,
        }
    }
}
