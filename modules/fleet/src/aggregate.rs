//! Ranking, plugin frequency and fleet totals over one completed batch.

use records::ServerRecord;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionCount {
    pub version: String,
    pub servers: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginAggregate {
    pub plugin: String,
    pub servers: u32,
    /// Version strings in descending lexicographic order.
    pub versions: Vec<VersionCount>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FleetTotals {
    pub numplayers: u64,
    pub servers: usize,
    pub online_servers: usize,
    pub plugins: usize,
}

#[derive(Debug, Clone, Default)]
pub struct Ranked {
    /// Sorted by player count, highest first.
    pub online: Vec<ServerRecord>,
    pub offline: Vec<ServerRecord>,
}

/// Split the batch by liveness, order online servers by population (stable) and assign
/// ranks 1..N. Offline servers get -1.
pub fn rank(results: Vec<ServerRecord>) -> Ranked {
    let (mut online, mut offline): (Vec<_>, Vec<_>) = results.into_iter().partition(|s| s.online);
    online.sort_by(|a, b| b.numplayers.cmp(&a.numplayers));
    for (i, s) in online.iter_mut().enumerate() {
        s.rank = i as i32 + 1;
    }
    for s in offline.iter_mut() {
        s.rank = -1;
    }
    Ranked { online, offline }
}

/// Fold every online server's plugin manifest into per-plugin counts, consuming the
/// transient `plugins` field. Result is ordered by server count, highest first, ties in
/// first-seen order.
pub fn aggregate_plugins(online: &mut [ServerRecord]) -> Vec<PluginAggregate> {
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut acc: Vec<(String, u32, BTreeMap<String, u32>)> = Vec::new();
    for server in online.iter_mut() {
        for plugin in server.plugins.take().unwrap_or_default() {
            let i = *index.entry(plugin.name.clone()).or_insert_with(|| {
                acc.push((plugin.name.clone(), 0, BTreeMap::new()));
                acc.len() - 1
            });
            let (_, servers, versions) = &mut acc[i];
            *servers += 1;
            *versions.entry(plugin.version).or_insert(0) += 1;
        }
    }
    let mut out: Vec<PluginAggregate> = acc
        .into_iter()
        .map(|(plugin, servers, versions)| PluginAggregate {
            plugin,
            servers,
            versions: versions.into_iter().rev().map(|(version, servers)| VersionCount { version, servers }).collect(),
        })
        .collect();
    out.sort_by(|a, b| b.servers.cmp(&a.servers));
    out
}

pub fn totals(ranked: &Ranked, plugins: &[PluginAggregate]) -> FleetTotals {
    FleetTotals {
        numplayers: ranked.online.iter().map(|s| u64::from(s.numplayers)).sum(),
        servers: ranked.online.len() + ranked.offline.len(),
        online_servers: ranked.online.len(),
        plugins: plugins.len(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rank_core::Address;
    use records::Plugin;

    fn server(host: &str, online: bool, numplayers: u32) -> ServerRecord {
        let mut s = ServerRecord::new(Address::new(host, 19132), None);
        s.online = online;
        s.numplayers = numplayers;
        s
    }

    fn with_plugins(mut s: ServerRecord, list: &[(&str, &str)]) -> ServerRecord {
        s.plugins = Some(list.iter().map(|(n, v)| Plugin { name: n.to_string(), version: v.to_string() }).collect());
        s
    }

    #[test]
    fn ranks_are_contiguous_and_ordered() {
        let r = rank(vec![
            server("a", true, 5),
            server("b", false, 0),
            server("c", true, 20),
            server("d", true, 5),
            server("e", false, 0),
        ]);
        let order: Vec<(&str, i32)> = r.online.iter().map(|s| (s.address.host.as_str(), s.rank)).collect();
        assert_eq!(order, vec![("c", 1), ("a", 2), ("d", 3)]);
        assert!(r.offline.iter().all(|s| s.rank == -1));
        assert!(r.online.windows(2).all(|w| w[0].numplayers >= w[1].numplayers));
    }

    #[test]
    fn stale_rank_is_cleared_when_offline() {
        let mut s = server("a", false, 0);
        s.rank = 3;
        assert_eq!(rank(vec![s]).offline[0].rank, -1);
    }

    #[test]
    fn same_plugin_same_version_on_two_servers() {
        let mut online = vec![
            with_plugins(server("a", true, 1), &[("X", "v1")]),
            with_plugins(server("b", true, 1), &[("X", "v1")]),
        ];
        let agg = aggregate_plugins(&mut online);
        assert_eq!(
            agg,
            vec![PluginAggregate { plugin: "X".into(), servers: 2, versions: vec![VersionCount { version: "v1".into(), servers: 2 }] }]
        );
        assert!(online.iter().all(|s| s.plugins.is_none()));
    }

    #[test]
    fn versions_descend_and_plugins_order_by_popularity() {
        let mut online = vec![
            with_plugins(server("a", true, 1), &[("Solo", "1"), ("Eco", "1.2")]),
            with_plugins(server("b", true, 1), &[("Eco", "1.10"), ("Tie", "x")]),
            with_plugins(server("c", true, 1), &[("Eco", "2.0")]),
            server("d", true, 1),
        ];
        let agg = aggregate_plugins(&mut online);
        let names: Vec<&str> = agg.iter().map(|p| p.plugin.as_str()).collect();
        assert_eq!(names, vec!["Eco", "Solo", "Tie"]);
        let versions: Vec<&str> = agg[0].versions.iter().map(|v| v.version.as_str()).collect();
        assert_eq!(versions, vec!["2.0", "1.2", "1.10"]);
    }

    #[test]
    fn totals_count_online_players_only() {
        let mut r = rank(vec![server("a", true, 7), server("b", false, 0), with_plugins(server("c", true, 3), &[("P", "1")])]);
        let plugins = aggregate_plugins(&mut r.online);
        assert_eq!(totals(&r, &plugins), FleetTotals { numplayers: 10, servers: 3, online_servers: 2, plugins: 1 });
    }
}
