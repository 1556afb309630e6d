//! Clean the output directory

use anyhow::Result;
use std::fs;

use crate::{cache, Blog};

/// Remove the output directory and the index cache
pub fn run(blog: &Blog) -> Result<()> {
    if blog.output_dir.exists() {
        fs::remove_dir_all(&blog.output_dir)?;
        tracing::info!("Deleted: {:?}", blog.output_dir);
    }

    cache::clear(&blog.cache_dir)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Mode, SiteConfig};

    #[test]
    fn test_clean_removes_output_and_cache() {
        let dir = tempfile::tempdir().unwrap();
        let blog = Blog::with_config(
            dir.path().to_path_buf(),
            SiteConfig::default(),
            Mode::Development,
        );
        fs::create_dir_all(blog.output_dir.join("posts")).unwrap();
        fs::create_dir_all(&blog.cache_dir).unwrap();
        fs::write(blog.cache_dir.join("index.json"), "{}").unwrap();

        run(&blog).unwrap();
        assert!(!blog.output_dir.exists());
        assert!(!blog.cache_dir.exists());

        // nothing left to clean is fine
        run(&blog).unwrap();
    }
}
