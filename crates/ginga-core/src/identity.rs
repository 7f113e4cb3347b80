//! Hostname → actor name resolution.
//!
//! Each viewer workstation runs its own actor instance, so the name the
//! actor registers with on the hub depends on the machine it runs on.

use std::collections::BTreeMap;

/// Name used on hosts that appear in neither the built-in nor the configured table.
pub const DEFAULT_ACTOR_NAME: &str = "ginga";

/// Built-in hostname table. Keys are short, lower-case host names.
const KNOWN_HOSTS: &[(&str, &str)] = &[
    ("pfs-ics", "ginga"),
    ("shell2-ics", "ginga_shell2"),
    ("pfsa-usr01", "ginga_usr01"),
    ("pfsa-usr02", "ginga_usr02"),
    ("pfsa-usr03", "ginga_usr03"),
];

/// Lookup table from host name to actor name.
#[derive(Debug, Clone)]
pub struct IdentityTable {
    hosts: BTreeMap<String, String>,
    default_name: String,
}

impl IdentityTable {
    /// Built-in entries with `overrides` layered on top.
    pub fn new(overrides: &BTreeMap<String, String>, default_name: &str) -> Self {
        let mut hosts: BTreeMap<String, String> = KNOWN_HOSTS
            .iter()
            .map(|(host, name)| (host.to_string(), name.to_string()))
            .collect();
        for (host, name) in overrides {
            hosts.insert(normalize_hostname(host), name.clone());
        }
        Self {
            hosts,
            default_name: default_name.to_string(),
        }
    }

    /// Actor name for `hostname`, or the default name if it is unknown.
    pub fn resolve(&self, hostname: &str) -> &str {
        self.hosts
            .get(&normalize_hostname(hostname))
            .map(String::as_str)
            .unwrap_or(&self.default_name)
    }

    /// Resolve the name for the machine we are running on.
    pub fn resolve_local(&self) -> &str {
        match local_hostname() {
            Some(host) => self.resolve(&host),
            None => {
                tracing::warn!("could not read local hostname; using default actor name");
                &self.default_name
            }
        }
    }
}

impl Default for IdentityTable {
    fn default() -> Self {
        Self::new(&BTreeMap::new(), DEFAULT_ACTOR_NAME)
    }
}

/// Lower-case and strip the domain part (`PFSA-USR01.subaru.nao.ac.jp` → `pfsa-usr01`).
pub fn normalize_hostname(hostname: &str) -> String {
    hostname
        .trim()
        .split('.')
        .next()
        .unwrap_or_default()
        .to_lowercase()
}

fn local_hostname() -> Option<String> {
    nix::unistd::gethostname()
        .ok()
        .map(|name| name.to_string_lossy().into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_host_resolves() {
        let table = IdentityTable::default();
        assert_eq!(table.resolve("pfsa-usr01"), "ginga_usr01");
    }

    #[test]
    fn test_fqdn_and_case_are_normalized() {
        let table = IdentityTable::default();
        assert_eq!(table.resolve("SHELL2-ICS.pfs.example.org"), "ginga_shell2");
    }

    #[test]
    fn test_unknown_host_falls_back_to_default() {
        let table = IdentityTable::default();
        assert_eq!(table.resolve("somebody-laptop"), DEFAULT_ACTOR_NAME);
    }

    #[test]
    fn test_overrides_win_over_builtins() {
        let mut overrides = BTreeMap::new();
        overrides.insert("PFSA-USR01".to_string(), "ginga_custom".to_string());
        overrides.insert("labpc".to_string(), "ginga_lab".to_string());
        let table = IdentityTable::new(&overrides, "viewer");

        assert_eq!(table.resolve("pfsa-usr01"), "ginga_custom");
        assert_eq!(table.resolve("labpc.local"), "ginga_lab");
        assert_eq!(table.resolve("elsewhere"), "viewer");
    }

    #[test]
    fn test_resolve_local_returns_some_name() {
        let table = IdentityTable::default();
        assert!(!table.resolve_local().is_empty());
    }
}
