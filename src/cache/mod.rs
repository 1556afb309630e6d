//! Index cache
//!
//! Derived post metadata is persisted as a JSON sidecar so that repeated
//! builds skip re-reading and re-deriving every content file. The cache is
//! keyed on a stamp of the content directory (newest mtime and file count)
//! and a fingerprint of the derivation settings.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use walkdir::WalkDir;

use crate::content::scanner::is_content_file;
use crate::content::PostMeta;

/// Cache directory, relative to the site root
pub const CACHE_DIR: &str = ".yourblog-cache";

/// Cache file name inside [`CACHE_DIR`]
const CACHE_FILE: &str = "index.json";

/// Snapshot of a directory tree used for invalidation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirStamp {
    /// Newest modification time in the tree, nanoseconds since the epoch
    pub newest_mtime: u64,
    /// Number of content files in the tree
    pub file_count: usize,
}

impl DirStamp {
    /// Stamp the given directories. Missing directories contribute nothing.
    pub fn compute(dirs: &[&Path]) -> Self {
        let mut stamp = DirStamp::default();

        for dir in dirs {
            if !dir.exists() {
                continue;
            }

            let walker = WalkDir::new(dir)
                .follow_links(true)
                .into_iter()
                .filter_entry(|e| {
                    e.depth() == 0
                        || !e.file_name().to_str().is_some_and(|n| n.starts_with('.'))
                })
                .filter_map(|e| e.ok());

            for entry in walker {
                let is_dir = entry.file_type().is_dir();
                if !is_dir && !entry.file_type().is_file() {
                    continue;
                }
                if let Some(mtime) = get_mtime(entry.path()) {
                    stamp.newest_mtime = stamp.newest_mtime.max(mtime);
                }
                if !is_dir && is_content_file(entry.path()) {
                    stamp.file_count += 1;
                }
            }
        }

        stamp
    }
}

/// A cached post, in scan order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// Source path relative to the content directory
    pub source: String,
    pub meta: PostMeta,
}

/// On-disk index cache
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IndexCache {
    /// Version of the cache format
    pub version: u32,
    /// Fingerprint of the derivation settings
    pub fingerprint: u64,
    /// Content directory stamp at the time the cache was written
    pub stamp: DirStamp,
    /// Every derived post, drafts included
    pub entries: Vec<CacheEntry>,
}

impl IndexCache {
    /// Current cache format version
    const VERSION: u32 = 1;

    /// Create a new cache with version set
    pub fn new(fingerprint: u64, stamp: DirStamp, entries: Vec<CacheEntry>) -> Self {
        Self {
            version: Self::VERSION,
            fingerprint,
            stamp,
            entries,
        }
    }

    /// Path of the sidecar file under a cache directory
    pub fn path(cache_dir: &Path) -> PathBuf {
        cache_dir.join(CACHE_FILE)
    }

    /// Load the cache from disk. Missing, unreadable or outdated files yield `None`.
    pub fn load(cache_dir: &Path) -> Option<Self> {
        let content = fs::read_to_string(Self::path(cache_dir)).ok()?;
        match serde_json::from_str::<IndexCache>(&content) {
            Ok(cache) if cache.version == Self::VERSION => Some(cache),
            Ok(_) => {
                tracing::info!("Cache version mismatch, rebuilding index");
                None
            }
            Err(e) => {
                tracing::warn!("Ignoring corrupt index cache: {}", e);
                None
            }
        }
    }

    /// Save cache to disk
    pub fn save(&self, cache_dir: &Path) -> Result<()> {
        fs::create_dir_all(cache_dir)?;
        let content = serde_json::to_string_pretty(self)?;
        fs::write(Self::path(cache_dir), content)?;
        Ok(())
    }

    /// Whether the cache still describes the content on disk
    pub fn is_fresh(&self, fingerprint: u64, stamp: &DirStamp) -> bool {
        self.version == Self::VERSION && self.fingerprint == fingerprint && self.stamp == *stamp
    }
}

/// Remove the cache directory
pub fn clear(cache_dir: &Path) -> Result<()> {
    if cache_dir.exists() {
        fs::remove_dir_all(cache_dir)?;
        tracing::info!("Deleted: {:?}", cache_dir);
    }
    Ok(())
}

/// Modification time as nanoseconds since the epoch
pub fn get_mtime(path: &Path) -> Option<u64> {
    let mtime = fs::metadata(path).and_then(|m| m.modified()).ok()?;
    let nanos = mtime
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    Some(u64::try_from(nanos).unwrap_or(u64::MAX))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn meta(slug: &str) -> PostMeta {
        PostMeta {
            slug: slug.to_string(),
            title: slug.to_string(),
            date: "2024-01-01".to_string(),
            tags: vec!["t".to_string()],
            category: None,
            excerpt: Some("e".to_string()),
            read_min: 2,
            thumbnail: None,
            thumbnail_alt: None,
            draft: true,
        }
    }

    fn set_mtime(path: &Path, secs: u64) {
        let file = fs::File::options().write(true).open(path).unwrap();
        file.set_modified(SystemTime::UNIX_EPOCH + Duration::from_secs(secs))
            .unwrap();
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let cache_dir = dir.path().join(CACHE_DIR);
        let stamp = DirStamp {
            newest_mtime: 42,
            file_count: 1,
        };
        let cache = IndexCache::new(
            7,
            stamp,
            vec![CacheEntry {
                source: "a.md".to_string(),
                meta: meta("a"),
            }],
        );
        cache.save(&cache_dir).unwrap();

        let loaded = IndexCache::load(&cache_dir).unwrap();
        assert!(loaded.is_fresh(7, &stamp));
        assert!(!loaded.is_fresh(8, &stamp));
        assert_eq!(loaded.entries[0].meta, meta("a"));
    }

    #[test]
    fn test_load_missing_or_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        assert!(IndexCache::load(dir.path()).is_none());

        fs::write(IndexCache::path(dir.path()), "{ not json").unwrap();
        assert!(IndexCache::load(dir.path()).is_none());

        fs::write(
            IndexCache::path(dir.path()),
            r#"{"version":0,"fingerprint":0,"stamp":{"newest_mtime":0,"file_count":0},"entries":[]}"#,
        )
        .unwrap();
        assert!(IndexCache::load(dir.path()).is_none());
    }

    #[test]
    fn test_stamp_tracks_edits_and_additions() {
        let dir = tempfile::tempdir().unwrap();
        let content = dir.path().join("posts");
        fs::create_dir_all(&content).unwrap();
        let post = content.join("a.md");
        fs::write(&post, "a").unwrap();
        set_mtime(&post, 1_000);

        let before = DirStamp::compute(&[&content]);
        assert_eq!(before.file_count, 1);
        assert_eq!(before, DirStamp::compute(&[&content]));

        fs::write(&post, "edited").unwrap();
        set_mtime(&post, 4_000_000_000);
        let edited = DirStamp::compute(&[&content]);
        assert_ne!(before, edited);

        fs::write(content.join("b.mdx"), "b").unwrap();
        fs::write(content.join("notes.txt"), "n").unwrap();
        let added = DirStamp::compute(&[&content]);
        assert_eq!(added.file_count, 2);
    }

    #[test]
    fn test_stamp_ignores_missing_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let stamp = DirStamp::compute(&[&dir.path().join("missing")]);
        assert_eq!(stamp, DirStamp::default());
    }

    #[test]
    fn test_clear() {
        let dir = tempfile::tempdir().unwrap();
        let cache_dir = dir.path().join(CACHE_DIR);
        IndexCache::default().save(&cache_dir).unwrap();
        assert!(cache_dir.exists());
        clear(&cache_dir).unwrap();
        assert!(!cache_dir.exists());
        clear(&cache_dir).unwrap();
    }
}
