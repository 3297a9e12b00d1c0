use std::collections::{BTreeMap, HashMap};
use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use crate::error::Result;

/// Synchronous string key/value storage the journal persists into.
///
/// Mirrors browser local storage: every value is text (JSON for accounts and trades).
/// Keeping it behind a trait lets the account logic run against [`MemoryStore`] in tests.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&mut self, key: &str, value: String) -> Result<()>;
    fn remove(&mut self, key: &str) -> Result<()>;
}

/// In-memory store, nothing survives the process.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    entries: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: String) -> Result<()> {
        self.entries.insert(key.to_string(), value);
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        self.entries.remove(key);
        Ok(())
    }
}

/// File-backed store: one pretty-printed JSON object mapping key to text.
///
/// The whole file is rewritten on every mutation through a temporary sibling and a
/// rename, so a failed write leaves the previous file (and the in-memory view) intact.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    entries: BTreeMap<String, String>,
}

/// Resolves to journal.json if a directory (or a non-.json path) was provided.
pub fn resolve_store_path<P: AsRef<Path>>(store_path: P) -> PathBuf {
    let path = store_path.as_ref();
    if path.is_dir() || path.extension().and_then(|e| e.to_str()) != Some("json") {
        path.join("journal.json")
    } else {
        path.to_path_buf()
    }
}

impl JsonFileStore {
    /// Opens the store, reading journal.json if it exists. The file is only created on
    /// the first write. A file that is not a JSON object of strings is an error rather
    /// than being reinitialized, since it holds user data.
    pub fn open<P: AsRef<Path>>(store_path: P) -> Result<Self> {
        let path = resolve_store_path(store_path);

        let entries = match File::open(&path) {
            Ok(mut file) => {
                let mut contents = String::new();
                file.read_to_string(&mut contents)?;
                if contents.trim().is_empty() {
                    BTreeMap::new()
                } else {
                    serde_json::from_str(&contents)?
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(e.into()),
        };

        tracing::debug!(path = %path.display(), keys = entries.len(), "Opened journal store");
        Ok(Self { path, entries })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self) -> Result<()> {
        // Create parent directory if it doesn't exist
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let tmp_path = self.path.with_extension("json.tmp");
        let formatted = serde_json::to_string_pretty(&self.entries)?;
        {
            let mut file = File::create(&tmp_path)?;
            file.write_all(formatted.as_bytes())?;
            file.sync_all()?;
        }
        fs::rename(&tmp_path, &self.path)?;
        Ok(())
    }

    fn restore(&mut self, key: &str, previous: Option<String>) {
        match previous {
            Some(v) => {
                self.entries.insert(key.to_string(), v);
            }
            None => {
                self.entries.remove(key);
            }
        }
    }
}

impl KeyValueStore for JsonFileStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: String) -> Result<()> {
        let previous = self.entries.insert(key.to_string(), value);
        if let Err(e) = self.flush() {
            self.restore(key, previous);
            return Err(e);
        }
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        let Some(previous) = self.entries.remove(key) else {
            return Ok(());
        };
        if let Err(e) = self.flush() {
            self.restore(key, Some(previous));
            return Err(e);
        }
        Ok(())
    }
}
