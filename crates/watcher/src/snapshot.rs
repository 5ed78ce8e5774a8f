//! Snapshot of observed files and the diff applied on each observation

use crate::fs::PathMetadata;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

/// Kind of a snapshot entry; directories are never stored
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryType {
    File,
}

/// Last observed state of one file
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Entry {
    /// Base name of the path
    pub name: String,
    /// Absolute path, equal to the snapshot key
    pub path: PathBuf,
    /// Modification time in epoch milliseconds
    pub modified: i64,
    /// Creation time in epoch milliseconds
    pub created: i64,
    #[serde(rename = "type")]
    pub entry_type: EntryType,
}

impl Entry {
    /// Build a file entry from freshly fetched metadata
    pub fn file(path: impl Into<PathBuf>, name: impl Into<String>, metadata: &PathMetadata) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            modified: epoch_millis(metadata.modified),
            created: epoch_millis(metadata.created),
            entry_type: EntryType::File,
        }
    }
}

/// Convert a timestamp to signed epoch milliseconds
pub fn epoch_millis(time: SystemTime) -> i64 {
    match time.duration_since(UNIX_EPOCH) {
        Ok(after) => i64::try_from(after.as_millis()).unwrap_or(i64::MAX),
        Err(before) => i64::try_from(before.duration().as_millis())
            .map(|ms| -ms)
            .unwrap_or(i64::MIN),
    }
}

/// Outcome of recording one entry in the snapshot
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Observation {
    /// The path was not in the snapshot
    New(Entry),
    /// The path was known and its modification time moved forward
    Changed { updated: Entry, previous: Entry },
    /// Known path with no newer modification time
    Unchanged,
}

/// Mapping from absolute path to last observed entry
///
/// Entries are inserted on first sight and overwritten on every later
/// observation. Nothing is ever removed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot {
    entries: HashMap<PathBuf, Entry>,
}

impl Snapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Classify `entry` against the stored one, then store it
    pub fn observe(&mut self, entry: Entry) -> Observation {
        let observation = match self.entries.get(&entry.path) {
            None => Observation::New(entry.clone()),
            Some(previous) if entry.modified > previous.modified => Observation::Changed {
                updated: entry.clone(),
                previous: previous.clone(),
            },
            Some(_) => Observation::Unchanged,
        };

        self.entries.insert(entry.path.clone(), entry);
        observation
    }

    pub fn get(&self, path: &Path) -> Option<&Entry> {
        self.entries.get(path)
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.entries.contains_key(path)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&PathBuf, &Entry)> {
        self.entries.iter()
    }

    /// Entries ordered by path
    pub fn sorted_entries(&self) -> Vec<&Entry> {
        let mut entries: Vec<_> = self.entries.values().collect();
        entries.sort_by(|a, b| a.path.cmp(&b.path));
        entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::memory::at;
    use crate::fs::PathKind;
    use pretty_assertions::assert_eq;

    fn entry(path: &str, modified_ms: u64) -> Entry {
        let metadata = PathMetadata {
            modified: at(modified_ms),
            created: at(10),
            size: 0,
            kind: PathKind::File,
        };
        let name = path.rsplit('/').next().unwrap_or(path);
        Entry::file(path, name, &metadata)
    }

    #[test]
    fn test_entry_from_metadata() {
        let e = entry("/root/file.json", 1_500);
        assert_eq!(e.name, "file.json");
        assert_eq!(e.path, PathBuf::from("/root/file.json"));
        assert_eq!(e.modified, 1_500);
        assert_eq!(e.created, 10);
        assert_eq!(e.entry_type, EntryType::File);
    }

    #[test]
    fn test_first_observation_is_new() {
        let mut snapshot = Snapshot::new();
        let e = entry("/root/a", 1_000);

        assert_eq!(snapshot.observe(e.clone()), Observation::New(e.clone()));
        assert_eq!(snapshot.get(Path::new("/root/a")), Some(&e));
    }

    #[test]
    fn test_newer_mtime_is_changed() {
        let mut snapshot = Snapshot::new();
        let old = entry("/root/a", 1_000);
        let new = entry("/root/a", 1_001);
        snapshot.observe(old.clone());

        assert_eq!(
            snapshot.observe(new.clone()),
            Observation::Changed {
                updated: new.clone(),
                previous: old,
            }
        );
        assert_eq!(snapshot.get(Path::new("/root/a")), Some(&new));
        assert_eq!(snapshot.len(), 1);
    }

    #[test]
    fn test_same_or_older_mtime_is_unchanged_but_stored() {
        let mut snapshot = Snapshot::new();
        snapshot.observe(entry("/root/a", 1_000));

        assert_eq!(snapshot.observe(entry("/root/a", 1_000)), Observation::Unchanged);

        let older = entry("/root/a", 900);
        assert_eq!(snapshot.observe(older.clone()), Observation::Unchanged);
        assert_eq!(snapshot.get(Path::new("/root/a")), Some(&older));
    }

    #[test]
    fn test_epoch_millis_before_epoch() {
        let before = UNIX_EPOCH - std::time::Duration::from_millis(250);
        assert_eq!(epoch_millis(before), -250);
        assert_eq!(epoch_millis(at(42)), 42);
    }

    #[test]
    fn test_entry_serializes_type_field() {
        let json = serde_json::to_value(entry("/root/a", 5)).expect("serialize failed");
        assert_eq!(json["type"], "file");
        assert_eq!(json["modified"], 5);
    }
}
