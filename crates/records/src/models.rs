use rank_core::{Address, MinuteStamp, NEVER};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};

pub const UNKNOWN: &str = "Unknown";

/// Running maximum of the player count over one calendar period.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RollingRecord {
    #[serde(default, deserialize_with = "count_or_zero")]
    pub numplayers: u32,
}

/// One entry of a server's plugin manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plugin {
    pub name: String,
    pub version: String,
}

/// Persisted state of one physical server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServerRecord {
    pub address: Address,
    pub online: bool,
    pub last_update: MinuteStamp,
    pub last_online: MinuteStamp,
    pub hostname: String,
    pub version: String,
    pub server_engine: String,
    pub maxplayers: u32,
    pub numplayers: u32,
    /// 1-based among online servers, -1 while offline.
    pub rank: i32,
    pub daily_record: RollingRecord,
    pub weekly_record: RollingRecord,
    pub monthly_record: RollingRecord,
    pub players: Vec<String>,
    /// Query-phase manifest, folded into the fleet aggregate and never persisted.
    #[serde(skip)]
    pub plugins: Option<Vec<Plugin>>,
}

/// Partial snapshot as found on disk. Every field may be missing, null or of the
/// wrong type; each one falls back to its default on its own.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RecordPatch {
    #[serde(deserialize_with = "lenient")]
    pub address: Option<Address>,
    #[serde(deserialize_with = "lenient")]
    pub online: Option<bool>,
    #[serde(deserialize_with = "lenient")]
    pub last_update: Option<MinuteStamp>,
    #[serde(deserialize_with = "lenient")]
    pub last_online: Option<MinuteStamp>,
    #[serde(deserialize_with = "lenient")]
    pub hostname: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub version: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub server_engine: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub maxplayers: Option<u32>,
    #[serde(deserialize_with = "lenient")]
    pub numplayers: Option<u32>,
    #[serde(deserialize_with = "lenient")]
    pub rank: Option<i32>,
    #[serde(deserialize_with = "lenient")]
    pub daily_record: Option<RollingRecord>,
    #[serde(deserialize_with = "lenient")]
    pub weekly_record: Option<RollingRecord>,
    #[serde(deserialize_with = "lenient")]
    pub monthly_record: Option<RollingRecord>,
    #[serde(deserialize_with = "lenient")]
    pub players: Option<Vec<String>>,
}

/// Keep a field only if it decodes; anything else reads as absent.
fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let raw = serde_json::Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(raw).ok())
}

/// Older snapshots carry `null` player counts in rolling records.
fn count_or_zero<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u32, D::Error> {
    Ok(lenient(deserializer)?.unwrap_or(0))
}

impl ServerRecord {
    /// Build a fully populated record for `address`, taking every field present in `patch`.
    ///
    /// Defaults: offline, never updated or online, hostname `host-port`, version and
    /// engine `"Unknown"`, zero players, rank -1, zeroed rolling records. The address
    /// stored in the patch is ignored so the record always carries the freshly
    /// configured (and resolved) address.
    pub fn new(address: Address, patch: Option<RecordPatch>) -> Self {
        let p = patch.unwrap_or_default();
        let hostname = p.hostname.unwrap_or_else(|| format!("{}-{}", address.host, address.port));
        ServerRecord {
            address,
            online: p.online.unwrap_or(false),
            last_update: p.last_update.unwrap_or(NEVER),
            last_online: p.last_online.unwrap_or(NEVER),
            hostname,
            version: p.version.unwrap_or_else(|| UNKNOWN.to_string()),
            server_engine: p.server_engine.unwrap_or_else(|| UNKNOWN.to_string()),
            maxplayers: p.maxplayers.unwrap_or(0),
            numplayers: p.numplayers.unwrap_or(0),
            rank: p.rank.unwrap_or(-1),
            daily_record: p.daily_record.unwrap_or_default(),
            weekly_record: p.weekly_record.unwrap_or_default(),
            monthly_record: p.monthly_record.unwrap_or_default(),
            players: p.players.unwrap_or_default(),
            plugins: None,
        }
    }

    /// Public view written to the fleet lists.
    pub fn simplify(&self) -> PublicServer<'_> {
        PublicServer {
            address: &self.address,
            online: self.online,
            last_update: self.last_update,
            last_online: self.last_online,
            hostname: &self.hostname,
            version: &self.version,
            maxplayers: self.maxplayers,
            numplayers: self.numplayers,
            rank: self.rank,
            daily_record: self.daily_record,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PublicServer<'a> {
    pub address: &'a Address,
    pub online: bool,
    pub last_update: MinuteStamp,
    pub last_online: MinuteStamp,
    pub hostname: &'a str,
    pub version: &'a str,
    pub maxplayers: u32,
    pub numplayers: u32,
    pub rank: i32,
    pub daily_record: RollingRecord,
}
