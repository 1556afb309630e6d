//! Show a single post

use anyhow::Result;

use crate::Blog;

/// Print a post's metadata as JSON followed by its body
pub fn run(blog: &Blog, slug: &str) -> Result<()> {
    let post = blog.index().require_post(slug)?;

    println!("{}", serde_json::to_string_pretty(&post.meta)?);
    println!("source: {}", post.source.display());
    println!("url: {}", post.meta.url());
    println!();
    println!("{}", post.content);

    Ok(())
}
