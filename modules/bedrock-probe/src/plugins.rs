use records::Plugin;

const MISSING_VERSION: &str = "undefined";

/// Parse a PocketMine-style manifest: `"<engine>: <name> <version>; <name> <version>"`.
/// Without the `": "` separator the engine reports no plugins.
pub fn parse_plugins(manifest: &str) -> Vec<Plugin> {
    let Some(list) = manifest.split(": ").nth(1) else {
        return Vec::new();
    };
    list.split("; ")
        .filter_map(|entry| {
            let mut parts = entry.split(' ');
            let name = parts.next().filter(|n| !n.is_empty())?;
            let version = parts.next().filter(|v| !v.is_empty()).unwrap_or(MISSING_VERSION);
            Some(Plugin { name: name.to_string(), version: version.to_string() })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(name: &str, version: &str) -> Plugin {
        Plugin { name: name.into(), version: version.into() }
    }

    #[test]
    fn names_and_versions() {
        assert_eq!(parse_plugins("Engine 1.0: Foo 2.0; Bar"), vec![p("Foo", "2.0"), p("Bar", "undefined")]);
    }

    #[test]
    fn no_separator_means_no_plugins() {
        assert!(parse_plugins("PocketMine-MP 1.7dev").is_empty());
        assert!(parse_plugins("").is_empty());
    }

    #[test]
    fn empty_list_and_entries_are_skipped() {
        assert!(parse_plugins("PocketMine-MP 1.7: ").is_empty());
        assert_eq!(parse_plugins("E: Foo 1; ; Baz 3 extra"), vec![p("Foo", "1"), p("Baz", "3")]);
    }
}
