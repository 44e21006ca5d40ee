//! Change cache.
//!
//! Persists `(timestamp, size)` per absolute module path between runs so the
//! build report can say how many modules changed. Staleness lookup
//! ([`ChangeCache::is_changed`]) is pure; refreshing entries is a separate
//! [`ChangeCache::record`] step, and writing to disk is [`ChangeCache::persist`].
//!
//! The cache is a reporting hint only. It never decides what goes into the
//! artifact.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::error::BundleError;

/// Observed state of one module file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileStamp {
    pub timestamp: DateTime<Utc>,
    pub size: u64,
}

impl FileStamp {
    pub fn observe(path: &Path) -> std::io::Result<Self> {
        let metadata = fs::metadata(path)?;
        Ok(FileStamp {
            timestamp: DateTime::<Utc>::from(metadata.modified()?),
            size: metadata.len(),
        })
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CacheFile {
    files: BTreeMap<PathBuf, FileStamp>,
    last_run: Option<DateTime<Utc>>,
}

#[derive(Debug, Default)]
pub struct ChangeCache {
    entries: BTreeMap<PathBuf, FileStamp>,
    last_run: Option<DateTime<Utc>>,
}

impl ChangeCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a cache file. Missing or corrupt files reset to an empty cache.
    pub fn load(cache_path: &Path) -> Self {
        let data = match fs::read_to_string(cache_path) {
            Ok(d) => d,
            Err(_) => {
                debug!(path = %cache_path.display(), "no change cache, starting fresh");
                return Self::new();
            }
        };

        match serde_json::from_str::<CacheFile>(&data) {
            Ok(file) => ChangeCache {
                entries: file.files,
                last_run: file.last_run,
            },
            Err(e) => {
                warn!(
                    path = %cache_path.display(),
                    error = %e,
                    "change cache is corrupt, resetting"
                );
                Self::new()
            }
        }
    }

    /// Changed iff no prior entry exists or either field differs.
    pub fn is_changed(&self, path: &Path, stamp: &FileStamp) -> bool {
        self.entries.get(path) != Some(stamp)
    }

    /// Overwrite the entry for `path` with the observed stamp.
    pub fn record(&mut self, path: PathBuf, stamp: FileStamp) {
        self.entries.insert(path, stamp);
    }

    pub fn get(&self, path: &Path) -> Option<&FileStamp> {
        self.entries.get(path)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn last_run(&self) -> Option<DateTime<Utc>> {
        self.last_run
    }

    /// Write the cache, stamping it with the current time.
    pub fn persist(&mut self, cache_path: &Path) -> Result<(), BundleError> {
        self.last_run = Some(Utc::now());
        let file = CacheFile {
            files: self.entries.clone(),
            last_run: self.last_run,
        };
        let data = serde_json::to_string_pretty(&file).map_err(|e| {
            BundleError::io(
                cache_path,
                std::io::Error::new(std::io::ErrorKind::InvalidData, e),
            )
        })?;
        if let Some(parent) = cache_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| BundleError::io(parent, e))?;
            }
        }
        fs::write(cache_path, data).map_err(|e| BundleError::io(cache_path, e))
    }
}

/// Cache key for a module path: absolute when it can be resolved.
pub fn cache_key(path: &Path) -> PathBuf {
    fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn stamp(secs: i64, size: u64) -> FileStamp {
        FileStamp {
            timestamp: Utc.timestamp_opt(secs, 0).unwrap(),
            size,
        }
    }

    #[test]
    fn test_absent_entry_is_changed() {
        let cache = ChangeCache::new();
        assert!(cache.is_changed(Path::new("/a.js"), &stamp(10, 5)));
    }

    #[test]
    fn test_matching_entry_is_unchanged() {
        let mut cache = ChangeCache::new();
        cache.record(PathBuf::from("/a.js"), stamp(10, 5));
        assert!(!cache.is_changed(Path::new("/a.js"), &stamp(10, 5)));
    }

    #[test]
    fn test_any_field_difference_is_changed() {
        let mut cache = ChangeCache::new();
        cache.record(PathBuf::from("/a.js"), stamp(10, 5));
        assert!(cache.is_changed(Path::new("/a.js"), &stamp(11, 5)));
        assert!(cache.is_changed(Path::new("/a.js"), &stamp(10, 6)));
    }

    #[test]
    fn test_query_does_not_refresh() {
        let mut cache = ChangeCache::new();
        cache.record(PathBuf::from("/a.js"), stamp(10, 5));
        let _ = cache.is_changed(Path::new("/a.js"), &stamp(99, 5));
        assert_eq!(cache.get(Path::new("/a.js")), Some(&stamp(10, 5)));
    }

    #[test]
    fn test_persist_and_reload() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("cache.json");

        let mut cache = ChangeCache::new();
        cache.record(PathBuf::from("/a.js"), stamp(10, 5));
        cache.persist(&path).unwrap();

        let reloaded = ChangeCache::load(&path);
        assert_eq!(reloaded.len(), 1);
        assert!(!reloaded.is_changed(Path::new("/a.js"), &stamp(10, 5)));
        assert!(reloaded.last_run().is_some());
    }

    #[test]
    fn test_corrupt_file_resets() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cache.json");
        fs::write(&path, "{ not json").unwrap();

        let cache = ChangeCache::load(&path);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_missing_file_resets() {
        let dir = TempDir::new().unwrap();
        let cache = ChangeCache::load(&dir.path().join("absent.json"));
        assert!(cache.is_empty());
    }

    #[test]
    fn test_observe_reads_size() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.js");
        fs::write(&path, "let a = 1;").unwrap();
        let observed = FileStamp::observe(&path).unwrap();
        assert_eq!(observed.size, 10);
    }
}
