//! Content directory diagnostics

use anyhow::Result;
use std::fmt::Write;

use crate::Blog;

/// Characters of the first post's body shown in the report
const BODY_PREVIEW: usize = 200;

/// Print where posts are read from and what the first one looks like
pub fn run(blog: &Blog) -> Result<()> {
    print!("{}", report(blog)?);
    Ok(())
}

/// Build the diagnostics report
pub fn report(blog: &Blog) -> Result<String> {
    let mut out = String::new();
    let cwd = std::env::current_dir()?;
    let env_dir = std::env::var("CONTENT_DIR").unwrap_or_else(|_| "(unset)".to_string());

    writeln!(out, "cwd:          {}", cwd.display())?;
    writeln!(out, "CONTENT_DIR:  {}", env_dir)?;
    writeln!(out, "content_dir:  {}", blog.config.content_dir)?;
    writeln!(out, "resolvedPath: {}", blog.content_dir.display())?;
    writeln!(out, "exists:       {}", blog.content_dir.exists())?;
    writeln!(out, "mode:         {:?}", blog.mode)?;

    let index = blog.index();
    let posts = index.all_posts(None)?;
    writeln!(out, "posts:        {}", posts.len())?;

    let Some(first) = posts.first() else {
        return Ok(out);
    };

    writeln!(out, "first slug:   {}", first.slug)?;
    writeln!(out, "first title:  {}", first.title)?;
    writeln!(out, "first meta:")?;
    writeln!(out, "{}", serde_json::to_string_pretty(first)?)?;

    if let Some(post) = index.post_source(&first.slug)? {
        let preview: String = post.content.chars().take(BODY_PREVIEW).collect();
        writeln!(out, "first body:")?;
        writeln!(out, "{}", preview)?;
    }

    Ok(out)
}
