use crate::types::{MaltrieveError, Result};
use serde_pickle::{DeOptions, HashableValue, Value};
use std::collections::BTreeSet;
use std::fs::{self, File};
use std::io::BufReader;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

pub const URLS_FILE: &str = "urls.json";
pub const HASHES_FILE: &str = "hashes.json";
pub const LEGACY_URLS_FILE: &str = "urls.obj";
pub const LEGACY_HASHES_FILE: &str = "hashes.obj";

/// URLs and content hashes carried from one run to the next.
///
/// `urls` gates downloads; `hashes` is accumulated alongside it but is not
/// consulted when deciding what to fetch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DedupState {
    pub urls: BTreeSet<String>,
    pub hashes: BTreeSet<String>,
}

impl DedupState {
    pub fn is_seen(&self, url: &str) -> bool {
        self.urls.contains(url)
    }

    pub fn record(&mut self, url: impl Into<String>, content_hash: impl Into<String>) {
        self.urls.insert(url.into());
        self.hashes.insert(content_hash.into());
    }

    pub fn merge(&mut self, other: DedupState) {
        self.urls.extend(other.urls);
        self.hashes.extend(other.hashes);
    }
}

/// JSON-file persistence for [`DedupState`] with a one-way migration from the
/// pickled files older releases wrote.
pub struct DedupStore {
    state_dir: PathBuf,
}

impl DedupStore {
    pub fn new(state_dir: impl Into<PathBuf>) -> Self {
        Self {
            state_dir: state_dir.into(),
        }
    }

    /// Never fails: missing or unreadable files yield empty sets.
    pub fn load(&self) -> DedupState {
        DedupState {
            urls: self.load_set(URLS_FILE, LEGACY_URLS_FILE),
            hashes: self.load_set(HASHES_FILE, LEGACY_HASHES_FILE),
        }
    }

    /// Overwrite the persisted state. The hash file is only written once
    /// there is something in it.
    pub fn save(&self, state: &DedupState) -> Result<()> {
        fs::create_dir_all(&self.state_dir)?;

        info!("Dumping {} past URLs to file", state.urls.len());
        self.write_set(URLS_FILE, &state.urls)?;

        if !state.hashes.is_empty() {
            self.write_set(HASHES_FILE, &state.hashes)?;
        }
        Ok(())
    }

    fn load_set(&self, current: &str, legacy: &str) -> BTreeSet<String> {
        let path = self.state_dir.join(current);
        if path.exists() {
            return match read_json_set(&path) {
                Ok(set) => {
                    debug!("Loaded {} entries from {}", set.len(), path.display());
                    set
                }
                Err(e) => {
                    warn!("Ignoring unreadable state file {}: {}", path.display(), e);
                    BTreeSet::new()
                }
            };
        }

        let legacy_path = self.state_dir.join(legacy);
        if !legacy_path.exists() {
            return BTreeSet::new();
        }
        match read_legacy_set(&legacy_path) {
            Ok(set) => {
                info!(
                    "Migrating {} entries from legacy {}",
                    set.len(),
                    legacy_path.display()
                );
                set
            }
            Err(e) => {
                warn!("Ignoring unreadable legacy file {}: {}", legacy_path.display(), e);
                BTreeSet::new()
            }
        }
    }

    /// Write through a temp file in the same directory so an interrupted
    /// save leaves the previous file intact.
    fn write_set(&self, name: &str, set: &BTreeSet<String>) -> Result<()> {
        let mut tmp = NamedTempFile::new_in(&self.state_dir)?;
        serde_json::to_writer(&mut tmp, set)?;
        tmp.as_file().sync_all()?;
        tmp.persist(self.state_dir.join(name))
            .map_err(|e| MaltrieveError::Io(e.error))?;
        Ok(())
    }
}

fn read_json_set(path: &Path) -> Result<BTreeSet<String>> {
    let file = File::open(path)?;
    let set = serde_json::from_reader(BufReader::new(file))?;
    Ok(set)
}

fn read_legacy_set(path: &Path) -> Result<BTreeSet<String>> {
    let file = File::open(path)?;
    let value = serde_pickle::value_from_reader(BufReader::new(file), DeOptions::new())
        .map_err(|e| MaltrieveError::Legacy(e.to_string()))?;
    pickled_strings(value)
}

/// Accepts the containers older releases pickled: sets, lists and tuples of
/// text or byte strings.
fn pickled_strings(value: Value) -> Result<BTreeSet<String>> {
    let strings = match value {
        Value::List(items) | Value::Tuple(items) => {
            items.into_iter().filter_map(value_string).collect()
        }
        Value::Set(items) | Value::FrozenSet(items) => {
            items.into_iter().filter_map(hashable_string).collect()
        }
        other => {
            return Err(MaltrieveError::Legacy(format!(
                "expected a collection of strings, found {:?}",
                other
            )))
        }
    };
    Ok(strings)
}

fn value_string(value: Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s),
        Value::Bytes(b) => String::from_utf8(b).ok(),
        _ => None,
    }
}

fn hashable_string(value: HashableValue) -> Option<String> {
    match value {
        HashableValue::String(s) => Some(s),
        HashableValue::Bytes(b) => String::from_utf8(b).ok(),
        _ => None,
    }
}
