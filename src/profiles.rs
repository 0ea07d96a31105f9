//! Connection profile catalog and its persistence
//!
//! A connection profile is a named, reusable bundle of connection parameters
//! (scheme, host, port, credentials, access list) stored as a flat
//! string-to-string map so protocol-specific keys pass through untouched.
//! The [`ProfileStore`] owns the catalog exclusively and rewrites the whole
//! settings document to disk after every mutation.

use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::config::Settings;

/// A single connection profile: string keys to string values
///
/// Well-known keys are `id`, `scheme`, `hostname`, `port`, `username`,
/// `access` (comma-separated user allow-list) and `guacd` (per-profile
/// backend address override); anything else is protocol-specific and is
/// carried verbatim.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectionProfile {
    values: BTreeMap<String, String>,
}

impl ConnectionProfile {
    /// Create an empty profile
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a key, `None` when absent
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// Insert or overwrite a key
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), value.into());
    }

    /// The profile identifier, `None` when absent or empty
    #[must_use]
    pub fn id(&self) -> Option<&str> {
        self.get("id").filter(|id| !id.is_empty())
    }

    /// The comma-separated user allow-list, `None` when absent
    #[must_use]
    pub fn access(&self) -> Option<&str> {
        self.get("access")
    }

    /// Per-profile guacd address override, `None` when absent or empty
    #[must_use]
    pub fn guacd(&self) -> Option<&str> {
        self.get("guacd").filter(|addr| !addr.is_empty())
    }

    /// Derive the deterministic identifier `scheme-hostname-port-username`
    ///
    /// Missing parts contribute an empty segment, so derivation is total.
    #[must_use]
    pub fn derived_id(&self) -> String {
        format!(
            "{}-{}-{}-{}",
            self.get("scheme").unwrap_or(""),
            self.get("hostname").unwrap_or(""),
            self.get("port").unwrap_or(""),
            self.get("username").unwrap_or("")
        )
    }

    /// Store the derived identifier unless one is already present
    ///
    /// Identifier derivation happens exactly once, at write time; read paths
    /// never mutate the profile.
    pub fn ensure_id(&mut self) {
        if self.id().is_none() {
            let id = self.derived_id();
            self.set("id", id);
        }
    }

    /// Merge another profile's fields into this one; incoming keys overwrite
    pub fn merge(&mut self, other: &Self) {
        for (key, value) in &other.values {
            self.values.insert(key.clone(), value.clone());
        }
    }

    /// Iterate over all key/value pairs
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl From<BTreeMap<String, String>> for ConnectionProfile {
    fn from(values: BTreeMap<String, String>) -> Self {
        Self { values }
    }
}

impl FromIterator<(String, String)> for ConnectionProfile {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}

/// In-memory catalog of connection profiles, persisted as YAML
///
/// The store retains the non-catalog sections of the startup [`Settings`] so
/// every save rewrites the complete document, not just the catalog. All
/// catalog reads and writes, including the persistence write itself, happen
/// under one lock: interleaved writers can never produce a corrupt file.
pub struct ProfileStore {
    /// Settings document sans catalog, kept for serialization
    settings: Settings,
    /// Persistence target
    path: PathBuf,
    /// The catalog; insertion order is the listing order
    catalog: Mutex<Vec<ConnectionProfile>>,
}

impl ProfileStore {
    /// Build a store from startup settings, taking ownership of the catalog
    ///
    /// Profiles loaded without an `id` get one derived here, so reads stay
    /// pure for the rest of the process lifetime.
    pub fn new(mut settings: Settings, path: impl Into<PathBuf>) -> Self {
        let mut catalog = std::mem::take(&mut settings.conns);
        for profile in &mut catalog {
            profile.ensure_id();
        }

        Self {
            settings,
            path: path.into(),
            catalog: Mutex::new(catalog),
        }
    }

    /// The file this store persists to
    #[must_use]
    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    /// The full catalog, insertion order preserved
    #[must_use]
    pub fn list(&self) -> Vec<ConnectionProfile> {
        self.catalog.lock().clone()
    }

    /// The profile with the given id, if any
    #[must_use]
    pub fn get(&self, id: &str) -> Option<ConnectionProfile> {
        self.catalog
            .lock()
            .iter()
            .find(|p| p.id() == Some(id))
            .cloned()
    }

    /// Every profile's id, in listing order
    #[must_use]
    pub fn ids(&self) -> Vec<String> {
        self.catalog
            .lock()
            .iter()
            .filter_map(|p| p.id().map(str::to_string))
            .collect()
    }

    /// Add a profile, or merge it into an existing one with the same id
    ///
    /// A missing id is derived first. When a profile with that id already
    /// exists the incoming fields are merged into it (new keys overwrite,
    /// others stay) instead of duplicating the entry. The catalog is
    /// persisted afterwards; the stored profile is returned.
    pub fn add(&self, mut profile: ConnectionProfile) -> ConnectionProfile {
        let mut catalog = self.catalog.lock();

        profile.ensure_id();
        let id = profile
            .id()
            .map_or_else(|| profile.derived_id(), str::to_string);

        let stored = if let Some(existing) =
            catalog.iter_mut().find(|p| p.id() == Some(id.as_str()))
        {
            existing.merge(&profile);
            existing.clone()
        } else {
            catalog.push(profile.clone());
            profile
        };

        self.persist(&catalog);
        stored
    }

    /// Remove the profile with the given id; `false` when absent
    ///
    /// Removal swaps the last entry into the vacated slot, so the order of
    /// the moved element is not preserved.
    pub fn remove(&self, id: &str) -> bool {
        let mut catalog = self.catalog.lock();

        let Some(pos) = catalog.iter().position(|p| p.id() == Some(id)) else {
            return false;
        };

        catalog.swap_remove(pos);
        self.persist(&catalog);
        true
    }

    /// Serialize the whole settings document and overwrite the config file
    ///
    /// Called with the catalog lock held. A failed write is logged and the
    /// in-memory catalog stays authoritative; the mutation that triggered the
    /// save still succeeds.
    fn persist(&self, catalog: &[ConnectionProfile]) {
        let mut document = self.settings.clone();
        document.conns = catalog.to_vec();

        let yaml = match serde_yaml::to_string(&document) {
            Ok(yaml) => yaml,
            Err(e) => {
                error!(error = %e, "Failed to serialize connection catalog");
                return;
            }
        };

        match fs::write(&self.path, yaml) {
            Ok(()) => debug!(path = %self.path.display(), "Persisted connection catalog"),
            Err(e) => {
                error!(path = %self.path.display(), error = %e, "Failed to persist connection catalog");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn rdp_profile() -> ConnectionProfile {
        let mut profile = ConnectionProfile::new();
        profile.set("scheme", "rdp");
        profile.set("hostname", "h");
        profile.set("port", "3389");
        profile.set("username", "u");
        profile
    }

    fn store_in(dir: &tempfile::TempDir) -> ProfileStore {
        ProfileStore::new(Settings::default(), dir.path().join("config.yaml"))
    }

    #[test]
    fn test_derived_id() {
        assert_eq!(rdp_profile().derived_id(), "rdp-h-3389-u");
        // Missing parts contribute empty segments
        assert_eq!(ConnectionProfile::new().derived_id(), "---");
    }

    #[test]
    fn test_ensure_id_is_idempotent() {
        let mut profile = rdp_profile();
        profile.ensure_id();
        assert_eq!(profile.id(), Some("rdp-h-3389-u"));

        // An existing id is never overwritten
        profile.set("hostname", "other");
        profile.ensure_id();
        assert_eq!(profile.id(), Some("rdp-h-3389-u"));
    }

    #[test]
    fn test_add_derives_id() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);

        let stored = store.add(rdp_profile());
        assert_eq!(stored.id(), Some("rdp-h-3389-u"));
        assert_eq!(store.ids(), vec!["rdp-h-3389-u".to_string()]);
    }

    #[test]
    fn test_add_merges_instead_of_duplicating() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);

        store.add(rdp_profile());

        let mut update = rdp_profile();
        update.set("password", "secret");
        let stored = store.add(update);

        assert_eq!(store.list().len(), 1);
        assert_eq!(stored.get("password"), Some("secret"));
        // Untouched keys survive the merge
        assert_eq!(stored.get("hostname"), Some("h"));
    }

    #[test]
    fn test_remove() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);

        store.add(rdp_profile());
        assert!(store.remove("rdp-h-3389-u"));
        assert!(store.get("rdp-h-3389-u").is_none());
        assert!(!store.remove("rdp-h-3389-u"));
    }

    #[test]
    fn test_remove_swaps_last_entry_in() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);

        for host in ["a", "b", "c"] {
            let mut profile = rdp_profile();
            profile.set("hostname", host);
            store.add(profile);
        }

        assert!(store.remove("rdp-a-3389-u"));
        let ids = store.ids();
        assert_eq!(ids.len(), 2);
        assert_eq!(ids[0], "rdp-c-3389-u");
        assert_eq!(ids[1], "rdp-b-3389-u");
    }

    #[test]
    fn test_ids_derived_at_load_not_on_read() {
        let mut settings = Settings::default();
        settings.conns.push(rdp_profile());

        let dir = tempfile::tempdir().unwrap();
        let store = ProfileStore::new(settings, dir.path().join("config.yaml"));

        // Derivation happened at construction; repeated reads see the same ids
        assert_eq!(store.ids(), vec!["rdp-h-3389-u".to_string()]);
        assert_eq!(store.ids(), vec!["rdp-h-3389-u".to_string()]);
        assert_eq!(store.list()[0].id(), Some("rdp-h-3389-u"));
    }

    #[test]
    fn test_persistence_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");

        let mut settings = Settings::default();
        settings.server.port = 8080;
        let store = ProfileStore::new(settings, &path);

        let mut profile = rdp_profile();
        profile.set("access", "alice,bob");
        store.add(profile);

        // The whole document is on disk, not just the catalog
        let reloaded = Settings::load(&path).unwrap();
        assert_eq!(reloaded.server.port, 8080);
        assert_eq!(reloaded.conns.len(), 1);

        let restored = ProfileStore::new(reloaded, &path);
        let profile = restored.get("rdp-h-3389-u").unwrap();
        assert_eq!(profile.get("access"), Some("alice,bob"));
    }

    #[test]
    fn test_save_failure_keeps_memory_authoritative() {
        let store = ProfileStore::new(
            Settings::default(),
            "/nonexistent-dir/never/config.yaml",
        );

        let stored = store.add(rdp_profile());
        assert_eq!(stored.id(), Some("rdp-h-3389-u"));
        // The write failed, the catalog did not
        assert_eq!(store.list().len(), 1);
        assert!(store.get("rdp-h-3389-u").is_some());
    }
}
