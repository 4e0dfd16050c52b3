//! Key/value persistence backends.
//!
//! Keys live in a namespace, mirroring the preferences partition the node
//! firmware writes to (`HX711` by default).

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use loadnode_traits::{BoxError, KvStore};

use crate::error::HwError;

/// In-memory store. Clones share the same contents, so a "fresh" handle
/// on the same map behaves like reopening non-volatile storage.
#[derive(Debug, Clone)]
pub struct MemoryStore {
    namespace: String,
    entries: Arc<Mutex<HashMap<String, f32>>>,
}

impl MemoryStore {
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            entries: Arc::default(),
        }
    }

    /// Handle on the same backing map under another namespace.
    pub fn with_namespace(&self, namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            entries: Arc::clone(&self.entries),
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Raw lookup without a default; `None` when never written.
    pub fn peek(&self, key: &str) -> Option<f32> {
        let map = self.entries.lock().ok()?;
        map.get(&self.scoped(key)).copied()
    }

    fn scoped(&self, key: &str) -> String {
        format!("{}/{}", self.namespace, key)
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new("HX711")
    }
}

impl KvStore for MemoryStore {
    fn get_float(&self, key: &str, default: f32) -> Result<f32, BoxError> {
        let map = self
            .entries
            .lock()
            .map_err(|_| HwError::Store("memory store lock poisoned".into()))?;
        Ok(map.get(&self.scoped(key)).copied().unwrap_or(default))
    }

    fn put_float(&mut self, key: &str, value: f32) -> Result<(), BoxError> {
        let mut map = self
            .entries
            .lock()
            .map_err(|_| HwError::Store("memory store lock poisoned".into()))?;
        map.insert(self.scoped(key), value);
        Ok(())
    }
}

type Tables = BTreeMap<String, BTreeMap<String, f64>>;

/// TOML file store: one table per namespace, written through on every put.
///
/// ```toml
/// [HX711]
/// conversionFactor = 2.5
/// calibratedForce = 10.0
/// ```
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    namespace: String,
    tables: Tables,
}

impl FileStore {
    /// Open `path`, creating nothing until the first write.
    pub fn open(path: impl AsRef<Path>, namespace: impl Into<String>) -> crate::error::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let tables = match std::fs::read_to_string(&path) {
            Ok(text) => toml::from_str::<Tables>(&text)
                .map_err(|e| HwError::Store(format!("parse {}: {e}", path.display())))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Tables::new(),
            Err(e) => return Err(HwError::Io(e)),
        };
        let namespace = namespace.into();
        tracing::debug!(path = %path.display(), namespace = %namespace, "opened file store");
        Ok(Self {
            path,
            namespace,
            tables,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self) -> crate::error::Result<()> {
        let text = toml::to_string(&self.tables)
            .map_err(|e| HwError::Store(format!("serialize store: {e}")))?;
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir)?;
        }
        // replace atomically so a crash mid-write keeps the previous contents
        let tmp = self.path.with_extension("toml.tmp");
        std::fs::write(&tmp, text)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl KvStore for FileStore {
    fn get_float(&self, key: &str, default: f32) -> Result<f32, BoxError> {
        Ok(self
            .tables
            .get(&self.namespace)
            .and_then(|t| t.get(key))
            .map_or(default, |v| *v as f32))
    }

    fn put_float(&mut self, key: &str, value: f32) -> Result<(), BoxError> {
        self.tables
            .entry(self.namespace.clone())
            .or_default()
            .insert(key.to_string(), f64::from(value));
        self.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_store_defaults_and_shares() {
        let mut a = MemoryStore::new("HX711");
        assert_eq!(a.get_float("conversionFactor", 1.0).unwrap(), 1.0);
        a.put_float("conversionFactor", 2.5).unwrap();

        let b = a.clone();
        assert_eq!(b.get_float("conversionFactor", 1.0).unwrap(), 2.5);
        assert_eq!(b.peek("conversionFactor"), Some(2.5));
    }

    #[test]
    fn memory_store_namespaces_are_isolated() {
        let mut a = MemoryStore::new("HX711");
        a.put_float("calibratedForce", 4.0).unwrap();
        let other = a.with_namespace("OTHER");
        assert_eq!(other.get_float("calibratedForce", 0.0).unwrap(), 0.0);
        assert_eq!(other.namespace(), "OTHER");
    }
}
