//! Site configuration (_config.yml)

use anyhow::Result;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};

/// Configuration file name, relative to the site root
pub const CONFIG_FILE: &str = "_config.yml";

/// Environment variable overriding `content_dir`
const CONTENT_DIR_ENV: &str = "CONTENT_DIR";

/// Environment variable selecting the build mode
const MODE_ENV: &str = "BLOG_ENV";

/// Main site configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    // Site
    pub title: String,
    pub description: String,
    pub author: String,
    pub language: String,

    // URL
    pub url: String,
    pub root: String,

    // Directory
    pub content_dir: String,
    pub static_dir: String,
    pub output_dir: String,

    // Home page
    /// Category tabs, in display order. The `all` key shows every post.
    pub categories: IndexMap<String, String>,
    pub hero_tags: Vec<String>,

    // Derivation
    pub excerpt_length: usize,
    pub words_per_minute: usize,
    pub date_from_git: bool,

    // Rendering
    pub highlight_theme: String,
    pub line_numbers: bool,
    pub feed_limit: usize,

    // Store any additional fields
    #[serde(flatten)]
    pub extra: HashMap<String, serde_yaml::Value>,
}

impl Default for SiteConfig {
    fn default() -> Self {
        let categories = [
            ("all", "전체"),
            ("data_analytics", "데이터 분석"),
            ("developer", "개발"),
            ("game", "게임"),
            ("movie", "영화"),
            ("opinion", "잡담"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        let hero_tags = ["Python", "R", "Django", "Next.js", "DB", "공략", "AWS", "정처기"]
            .into_iter()
            .map(String::from)
            .collect();

        Self {
            title: "YourBlog".to_string(),
            description: "Game guides & study notes".to_string(),
            author: "YourBlog".to_string(),
            language: "ko".to_string(),

            url: "http://localhost:4000".to_string(),
            root: "/".to_string(),

            content_dir: "content/posts".to_string(),
            static_dir: "public".to_string(),
            output_dir: "out".to_string(),

            categories,
            hero_tags,

            excerpt_length: 180,
            words_per_minute: 200,
            date_from_git: true,

            highlight_theme: "base16-ocean.dark".to_string(),
            line_numbers: false,
            feed_limit: 20,

            extra: HashMap::new(),
        }
    }
}

impl SiteConfig {
    /// Load configuration from a file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        // An empty file deserializes to unit, not a mapping
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: SiteConfig = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Apply overrides from the process environment
    pub fn apply_env(&mut self) {
        if let Ok(dir) = std::env::var(CONTENT_DIR_ENV) {
            if !dir.trim().is_empty() {
                tracing::debug!("content_dir overridden by {}: {}", CONTENT_DIR_ENV, dir);
                self.content_dir = dir;
            }
        }
    }

    /// Derivation settings, resolved against the site root
    pub fn derive_options(&self, base_dir: &Path) -> DeriveOptions {
        DeriveOptions {
            content_dir: base_dir.join(&self.content_dir),
            static_dir: base_dir.join(&self.static_dir),
            excerpt_length: self.excerpt_length.max(1),
            words_per_minute: self.words_per_minute.max(1),
            date_from_git: self.date_from_git,
        }
    }

    /// Label for a category key, falling back to the key itself
    pub fn category_label<'a>(&'a self, key: &'a str) -> &'a str {
        self.categories.get(key).map(String::as_str).unwrap_or(key)
    }
}

/// Build mode; drafts are only listed outside production
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Development,
    Production,
}

impl Mode {
    /// Read the mode from `BLOG_ENV`, defaulting to development
    pub fn from_env() -> Self {
        match std::env::var(MODE_ENV) {
            Ok(v) if v.eq_ignore_ascii_case("production") => Mode::Production,
            _ => Mode::Development,
        }
    }

    /// Whether drafts are included by default in this mode
    pub fn include_drafts(self) -> bool {
        self == Mode::Development
    }
}

/// Settings that affect how metadata is derived from a content file.
///
/// Changing any of these invalidates the index cache.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DeriveOptions {
    pub content_dir: PathBuf,
    pub static_dir: PathBuf,
    pub excerpt_length: usize,
    pub words_per_minute: usize,
    pub date_from_git: bool,
}

impl DeriveOptions {
    /// Stable fingerprint stored alongside cached metadata
    pub fn fingerprint(&self) -> u64 {
        use std::collections::hash_map::DefaultHasher;

        let mut hasher = DefaultHasher::new();
        self.hash(&mut hasher);
        hasher.finish()
    }
}
