//! One polling run over the whole fleet: resolve, dedupe, probe, rank, aggregate, persist.

pub mod aggregate;
pub mod persist;
pub mod run;

pub use aggregate::{aggregate_plugins, rank, totals, FleetTotals, PluginAggregate, Ranked, VersionCount};
pub use persist::{persist, WriteFailure};
pub use run::{load_addresses, probe_server, FleetAggregator, FleetOptions, RunError, RunSummary};
