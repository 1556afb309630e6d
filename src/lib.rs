//! yourblog: a static blog generator over a folder of Markdown/MDX posts
//!
//! Posts are scanned from the content directory, their metadata derived
//! from front-matter and file conventions, indexed through a JSON cache,
//! and rendered with embedded Tera templates into a static site.

pub mod cache;
pub mod commands;
pub mod config;
pub mod content;
pub mod generator;
pub mod helpers;
pub mod server;
pub mod templates;
pub mod watch;

use anyhow::Result;
use std::path::{Path, PathBuf};

use config::{Mode, SiteConfig, CONFIG_FILE};
use content::{ContentIndex, IndexOptions};

/// The blog application
#[derive(Debug, Clone)]
pub struct Blog {
    /// Site configuration
    pub config: SiteConfig,
    /// Site root
    pub base_dir: PathBuf,
    /// Directory holding the posts
    pub content_dir: PathBuf,
    /// Assets copied verbatim into the output
    pub static_dir: PathBuf,
    /// Generated site
    pub output_dir: PathBuf,
    /// Index cache sidecar directory
    pub cache_dir: PathBuf,
    /// Build mode
    pub mode: Mode,
}

impl Blog {
    /// Create a blog from a site root, reading `_config.yml` and the environment
    pub fn new<P: AsRef<Path>>(base_dir: P) -> Result<Self> {
        let base_dir = base_dir.as_ref().to_path_buf();
        let config_path = base_dir.join(CONFIG_FILE);

        let mut config = if config_path.exists() {
            SiteConfig::load(&config_path)?
        } else {
            tracing::debug!("No {} found, using defaults", CONFIG_FILE);
            SiteConfig::default()
        };
        config.apply_env();

        Ok(Self::with_config(base_dir, config, Mode::from_env()))
    }

    /// Create a blog from an already loaded configuration
    pub fn with_config(base_dir: PathBuf, config: SiteConfig, mode: Mode) -> Self {
        let content_dir = base_dir.join(&config.content_dir);
        let static_dir = base_dir.join(&config.static_dir);
        let output_dir = base_dir.join(&config.output_dir);
        let cache_dir = base_dir.join(cache::CACHE_DIR);

        Self {
            config,
            base_dir,
            content_dir,
            static_dir,
            output_dir,
            cache_dir,
            mode,
        }
    }

    /// The post index for this site
    pub fn index(&self) -> ContentIndex {
        ContentIndex::new(IndexOptions {
            derive: self.config.derive_options(&self.base_dir),
            cache_dir: Some(self.cache_dir.clone()),
            include_drafts: self.mode.include_drafts(),
        })
    }

    /// Generate the static site
    pub fn generate(&self) -> Result<()> {
        commands::build::run(self, None)
    }

    /// Remove the output directory and the index cache
    pub fn clean(&self) -> Result<()> {
        commands::clean::run(self)
    }
}
