//! Generate static files

use anyhow::Result;
use std::time::Instant;

use crate::generator::Generator;
use crate::watch;
use crate::Blog;

/// Generate the static site.
///
/// `include_drafts` overrides the mode default when set.
pub fn run(blog: &Blog, include_drafts: Option<bool>) -> Result<()> {
    let start = Instant::now();

    let index = blog.index();
    let posts = index.load_posts(include_drafts)?;
    tracing::info!("Loaded {} posts", posts.len());

    let generator = Generator::new(blog)?;
    generator.generate(&posts)?;

    let duration = start.elapsed();
    tracing::info!("Generated in {:.2}s", duration.as_secs_f64());

    Ok(())
}

/// Watch the content, static dir and config, regenerating on change
pub async fn watch(blog: &Blog, include_drafts: Option<bool>) -> Result<()> {
    tracing::info!("Watching for changes. Press Ctrl+C to stop.");

    let blog = blog.clone();
    tokio::task::spawn_blocking(move || watch::rebuild_on_change(&blog, include_drafts, || {}))
        .await?
}
