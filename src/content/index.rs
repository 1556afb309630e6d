//! Post index - the public API over the content directory

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use super::{scanner, CategoryCount, ContentError, FrontMatter, MetaDeriver, Post, PostMeta, TagCount};
use crate::cache::{CacheEntry, DirStamp, IndexCache};
use crate::config::DeriveOptions;
use crate::helpers::{decode_uri_component, encode_uri_component, to_posix};

/// Options for building a [`ContentIndex`]
#[derive(Debug, Clone)]
pub struct IndexOptions {
    pub derive: DeriveOptions,
    /// Where the JSON sidecar lives; `None` disables caching
    pub cache_dir: Option<PathBuf>,
    /// Whether drafts are listed when the caller does not say
    pub include_drafts: bool,
}

/// Index over all posts in the content directory
pub struct ContentIndex {
    deriver: MetaDeriver,
    cache_dir: Option<PathBuf>,
    include_drafts: bool,
}

impl ContentIndex {
    pub fn new(options: IndexOptions) -> Self {
        Self {
            deriver: MetaDeriver::new(options.derive),
            cache_dir: options.cache_dir,
            include_drafts: options.include_drafts,
        }
    }

    pub fn content_dir(&self) -> &Path {
        &self.deriver.options().content_dir
    }

    /// All posts sorted by date, newest first.
    ///
    /// Drafts are dropped unless `include_drafts` (or the index default) says
    /// otherwise. Posts sharing a date keep their scan order.
    pub fn all_posts(&self, include_drafts: Option<bool>) -> Result<Vec<PostMeta>, ContentError> {
        let include_drafts = include_drafts.unwrap_or(self.include_drafts);
        let mut posts: Vec<PostMeta> = self
            .load_entries()?
            .into_iter()
            .map(|e| e.meta)
            .filter(|m| include_drafts || !m.draft)
            .collect();

        posts.sort_by(|a, b| b.date.cmp(&a.date));
        Ok(posts)
    }

    /// Posts with their Markdown bodies, in the same order as [`all_posts`](Self::all_posts)
    pub fn load_posts(&self, include_drafts: Option<bool>) -> Result<Vec<Post>, ContentError> {
        let include_drafts = include_drafts.unwrap_or(self.include_drafts);
        let mut posts = Vec::new();

        for entry in self.load_entries()? {
            if entry.meta.draft && !include_drafts {
                continue;
            }
            let source = self.content_dir().join(&entry.source);
            match read_body(&source) {
                Ok(content) => posts.push(Post {
                    meta: entry.meta,
                    content,
                    source,
                }),
                Err(e) => tracing::warn!("Skipping post {:?}: {}", source, e),
            }
        }

        posts.sort_by(|a, b| b.meta.date.cmp(&a.meta.date));
        Ok(posts)
    }

    /// Find a post by slug.
    ///
    /// The request may be percent-encoded. Drafts are reachable. A post's
    /// own slug is preferred over another post's file name.
    pub fn post_source(&self, slug: &str) -> Result<Option<Post>, ContentError> {
        let wanted = decode_uri_component(slug);
        let matches = |candidate: &str| candidate == wanted || encode_uri_component(candidate) == slug;

        let entries = self.load_entries()?;
        let hit = entries
            .iter()
            .find(|e| matches(&e.meta.slug))
            .or_else(|| entries.iter().find(|e| matches(&source_stem(&e.source))));

        let Some(entry) = hit else {
            return Ok(None);
        };

        let path = self.content_dir().join(&entry.source);
        self.deriver.load(&path).map(Some)
    }

    /// Like [`post_source`](Self::post_source) but a missing post is an error
    pub fn require_post(&self, slug: &str) -> Result<Post, ContentError> {
        self.post_source(slug)?
            .ok_or_else(|| ContentError::NotFound(slug.to_string()))
    }

    /// Slugs of all listed posts, newest first
    pub fn all_slugs(&self, include_drafts: Option<bool>) -> Result<Vec<String>, ContentError> {
        Ok(self
            .all_posts(include_drafts)?
            .into_iter()
            .map(|p| p.slug)
            .collect())
    }

    /// Tag usage, most used first, ties broken alphabetically
    pub fn tag_counts(&self, include_drafts: Option<bool>) -> Result<Vec<TagCount>, ContentError> {
        let posts = self.all_posts(include_drafts)?;
        let counts = count_by(posts.iter().flat_map(|p| p.tags.iter().map(String::as_str)));

        Ok(counts
            .into_iter()
            .map(|(tag, count)| TagCount { tag, count })
            .collect())
    }

    /// Category usage, most used first; uncategorized posts count as `etc`
    pub fn category_counts(
        &self,
        include_drafts: Option<bool>,
    ) -> Result<Vec<CategoryCount>, ContentError> {
        let posts = self.all_posts(include_drafts)?;
        let counts = count_by(posts.iter().map(|p| p.category_key()));

        Ok(counts
            .into_iter()
            .map(|(category, count)| CategoryCount { category, count })
            .collect())
    }

    /// Every post in scan order, drafts included, served from the cache when fresh
    fn load_entries(&self) -> Result<Vec<CacheEntry>, ContentError> {
        let Some(cache_dir) = &self.cache_dir else {
            return self.scan_entries();
        };

        let options = self.deriver.options();
        let images_dir = options.static_dir.join("images");
        let stamp = DirStamp::compute(&[&options.content_dir, &images_dir]);
        let fingerprint = options.fingerprint();

        if let Some(cache) = IndexCache::load(cache_dir) {
            if cache.is_fresh(fingerprint, &stamp) {
                tracing::debug!("Index cache hit ({} posts)", cache.entries.len());
                return Ok(cache.entries);
            }
            tracing::debug!("Index cache stale, rescanning");
        }

        let entries = self.scan_entries()?;
        let cache = IndexCache::new(fingerprint, stamp, entries);
        if let Err(e) = cache.save(cache_dir) {
            tracing::warn!("Failed to write index cache: {}", e);
        }

        Ok(cache.entries)
    }

    fn scan_entries(&self) -> Result<Vec<CacheEntry>, ContentError> {
        let files = scanner::scan(self.content_dir())?;
        let mut entries = Vec::with_capacity(files.len());

        for path in files {
            match self.deriver.load(&path) {
                Ok(post) => {
                    let relative = path.strip_prefix(self.content_dir()).unwrap_or(&path);
                    entries.push(CacheEntry {
                        source: to_posix(relative),
                        meta: post.meta,
                    });
                }
                Err(e) => tracing::warn!("Failed to load post {:?}: {}", path, e),
            }
        }

        tracing::debug!("Scanned {} posts in {:?}", entries.len(), self.content_dir());
        Ok(entries)
    }
}

/// Read a content file and return its body without front-matter
fn read_body(path: &Path) -> Result<String, ContentError> {
    let raw = fs::read_to_string(path).map_err(|source| ContentError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let (_, body) = FrontMatter::parse(&raw);
    Ok(body.to_string())
}

/// File name of a relative source path without its extension
fn source_stem(source: &str) -> String {
    Path::new(source)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Count occurrences, sorted by count descending then key ascending
fn count_by<'a>(items: impl Iterator<Item = &'a str>) -> Vec<(String, usize)> {
    let mut map: HashMap<&str, usize> = HashMap::new();
    for item in items {
        *map.entry(item).or_insert(0) += 1;
    }

    let mut counts: Vec<(String, usize)> = map.into_iter().map(|(k, v)| (k.to_string(), v)).collect();
    counts.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    counts
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Site {
        _dir: tempfile::TempDir,
        root: PathBuf,
    }

    impl Site {
        fn new() -> Self {
            let dir = tempfile::tempdir().unwrap();
            let root = dir.path().to_path_buf();
            fs::create_dir_all(root.join("content")).unwrap();
            Self { _dir: dir, root }
        }

        fn write(&self, rel: &str, content: &str) {
            let path = self.root.join("content").join(rel);
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).unwrap();
            }
            fs::write(path, content).unwrap();
        }

        fn index(&self, cached: bool, include_drafts: bool) -> ContentIndex {
            ContentIndex::new(IndexOptions {
                derive: DeriveOptions {
                    content_dir: self.root.join("content"),
                    static_dir: self.root.join("public"),
                    excerpt_length: 180,
                    words_per_minute: 200,
                    date_from_git: false,
                },
                cache_dir: cached.then(|| self.root.join(".cache")),
                include_drafts,
            })
        }
    }

    fn fixture() -> Site {
        let site = Site::new();
        site.write(
            "elden.md",
            "---\ntitle: Elden Ring\ndate: 2025-03-01\ncategory: game\ntags: [공략, RPG]\n---\nBody",
        );
        site.write(
            "2024/isr.mdx",
            "---\ntitle: Next ISR\ndate: 2025-05-10\ncategory: developer\ntags: [Next.js, RPG]\n---\nBody",
        );
        site.write(
            "draft.md",
            "---\ntitle: Secret\ndate: 2025-06-01\ndraft: true\ntags: [RPG]\n---\nBody",
        );
        site.write("2025-01-02-first.md", "# First Post\n\nHello");
        site.write(".hidden/skip.md", "---\ntitle: Hidden\n---\n");
        site
    }

    #[test]
    fn test_all_posts_sorted_and_filtered() {
        let site = fixture();
        let index = site.index(false, false);

        let posts = index.all_posts(None).unwrap();
        let titles: Vec<_> = posts.iter().map(|p| p.title.as_str()).collect();
        assert_eq!(titles, vec!["Next ISR", "Elden Ring", "First Post"]);
        assert_eq!(posts[2].date, "2025-01-02");
        assert_eq!(posts[2].slug, "2025-01-02-first");

        let with_drafts = index.all_posts(Some(true)).unwrap();
        assert_eq!(with_drafts.len(), 4);
        assert_eq!(with_drafts[0].title, "Secret");
    }

    #[test]
    fn test_default_draft_policy() {
        let site = fixture();
        assert_eq!(site.index(false, true).all_posts(None).unwrap().len(), 4);
        assert_eq!(site.index(false, true).all_posts(Some(false)).unwrap().len(), 3);
    }

    #[test]
    fn test_equal_dates_keep_scan_order() {
        let site = Site::new();
        site.write("b.md", "---\ndate: 2024-01-01\n---\n");
        site.write("a.md", "---\ndate: 2024-01-01\n---\n");
        site.write("c.md", "---\ndate: 2024-02-01\n---\n");
        let slugs = site.index(false, false).all_slugs(None).unwrap();
        assert_eq!(slugs, vec!["c", "a", "b"]);
    }

    #[test]
    fn test_post_source() {
        let site = fixture();
        let index = site.index(false, false);

        let post = index.post_source("isr").unwrap().unwrap();
        assert_eq!(post.meta.title, "Next ISR");
        assert_eq!(post.content, "Body");

        // drafts are reachable directly
        assert!(index.post_source("draft").unwrap().is_some());
        assert!(index.post_source("missing").unwrap().is_none());
        assert!(matches!(
            index.require_post("missing"),
            Err(ContentError::NotFound(_))
        ));
    }

    #[test]
    fn test_post_source_encoded_slug() {
        let site = Site::new();
        site.write("엘든링 공략.md", "# 엘든링\n");
        let index = site.index(false, false);

        let encoded = encode_uri_component("엘든링 공략");
        let post = index.post_source(&encoded).unwrap().unwrap();
        assert_eq!(post.meta.slug, "엘든링 공략");
        assert!(index.post_source("엘든링 공략").unwrap().is_some());
    }

    #[test]
    fn test_post_source_by_front_matter_slug() {
        let site = Site::new();
        site.write("file-name.md", "---\nslug: pretty\n---\nx");
        let index = site.index(false, false);
        assert!(index.post_source("pretty").unwrap().is_some());
        assert!(index.post_source("file-name").unwrap().is_some());
    }

    #[test]
    fn test_tag_counts() {
        let site = fixture();
        let index = site.index(false, false);

        let counts = index.tag_counts(None).unwrap();
        assert_eq!(
            counts,
            vec![
                TagCount { tag: "RPG".to_string(), count: 2 },
                TagCount { tag: "Next.js".to_string(), count: 1 },
                TagCount { tag: "공략".to_string(), count: 1 },
            ]
        );

        let with_drafts = index.tag_counts(Some(true)).unwrap();
        assert_eq!(with_drafts[0].count, 3);
    }

    #[test]
    fn test_category_counts() {
        let site = fixture();
        let counts = site.index(false, false).category_counts(None).unwrap();
        let keys: Vec<_> = counts.iter().map(|c| c.category.as_str()).collect();
        assert_eq!(keys, vec!["developer", "etc", "game"]);
    }

    #[test]
    fn test_missing_content_dir() {
        let site = Site::new();
        fs::remove_dir_all(site.root.join("content")).unwrap();
        assert!(site.index(true, false).all_posts(None).unwrap().is_empty());
    }

    #[test]
    fn test_cache_is_written_and_reused() {
        let site = fixture();
        let index = site.index(true, false);

        let first = index.all_posts(None).unwrap();
        let cache_file = IndexCache::path(&site.root.join(".cache"));
        assert!(cache_file.exists());

        let cached = IndexCache::load(&site.root.join(".cache")).unwrap();
        assert_eq!(cached.entries.len(), 4);

        let second = index.all_posts(None).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_cache_serves_stored_entries_when_fresh() {
        let site = fixture();
        let index = site.index(true, false);
        index.all_posts(None).unwrap();

        // Tamper with the stored metadata without touching the content dir
        let cache_dir = site.root.join(".cache");
        let mut cache = IndexCache::load(&cache_dir).unwrap();
        for entry in &mut cache.entries {
            entry.meta.title = format!("cached {}", entry.meta.title);
        }
        cache.save(&cache_dir).unwrap();

        let posts = index.all_posts(None).unwrap();
        assert!(posts.iter().all(|p| p.title.starts_with("cached ")));
    }

    #[test]
    fn test_cache_invalidated_by_new_file() {
        let site = fixture();
        let index = site.index(true, false);
        assert_eq!(index.all_posts(None).unwrap().len(), 3);

        site.write("new.md", "---\ntitle: Brand New\ndate: 2026-01-01\n---\n");
        let posts = index.all_posts(None).unwrap();
        assert_eq!(posts.len(), 4);
        assert_eq!(posts[0].title, "Brand New");
    }

    /// Push a path's mtime forward so the change is visible on coarse clocks
    fn bump_mtime(path: &Path, secs: u64) {
        let when = std::time::SystemTime::now() + std::time::Duration::from_secs(secs);
        fs::File::open(path).unwrap().set_modified(when).unwrap();
    }

    #[cfg(unix)]
    #[test]
    fn test_cache_follows_thumbnail_images() {
        let site = Site::new();
        site.write("trip.md", "---
title: Trip
date: 2024-01-01
---
Body");
        let index = site.index(true, false);
        assert_eq!(index.all_posts(None).unwrap()[0].thumbnail, None);

        // adding an image picks up the auto thumbnail
        let images = site.root.join("public/images");
        fs::create_dir_all(&images).unwrap();
        let cover = images.join("trip.png");
        fs::write(&cover, b"png").unwrap();
        bump_mtime(&cover, 10);
        assert_eq!(
            index.all_posts(None).unwrap()[0].thumbnail.as_deref(),
            Some("/images/trip.png")
        );

        // removing it drops the thumbnail again
        fs::remove_file(&cover).unwrap();
        bump_mtime(&images, 20);
        assert_eq!(index.all_posts(None).unwrap()[0].thumbnail, None);
    }

    #[test]
    fn test_load_posts_reads_bodies() {
        let site = fixture();
        let posts = site.index(true, false).load_posts(None).unwrap();
        assert_eq!(posts.len(), 3);
        assert_eq!(posts[0].meta.title, "Next ISR");
        assert_eq!(posts[0].content, "Body");
        assert_eq!(posts[2].content, "# First Post\n\nHello");
    }

    #[test]
    fn test_count_by() {
        let counts = count_by(["b", "a", "b", "c"].into_iter());
        assert_eq!(
            counts,
            vec![("b".to_string(), 2), ("a".to_string(), 1), ("c".to_string(), 1)]
        );
    }
}
