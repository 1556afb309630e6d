//! List site content

use anyhow::Result;
use clap::ValueEnum;

use crate::Blog;

/// What to list
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ListKind {
    #[value(alias = "posts")]
    Post,
    #[value(alias = "tags")]
    Tag,
    #[value(alias = "categories")]
    Category,
    #[value(alias = "slugs")]
    Slug,
}

/// List site content by kind
pub fn run(blog: &Blog, kind: ListKind, include_drafts: Option<bool>) -> Result<()> {
    print!("{}", render(blog, kind, include_drafts)?);
    Ok(())
}

/// Render the listing as text
pub fn render(blog: &Blog, kind: ListKind, include_drafts: Option<bool>) -> Result<String> {
    let index = blog.index();
    let mut out = String::new();

    match kind {
        ListKind::Post => {
            let posts = index.all_posts(include_drafts)?;
            out.push_str(&format!("Posts ({}):\n", posts.len()));
            for post in posts {
                let draft = if post.draft { " (draft)" } else { "" };
                out.push_str(&format!(
                    "  {} - {} [{}]{}\n",
                    post.date, post.title, post.slug, draft
                ));
            }
        }
        ListKind::Tag => {
            let tags = index.tag_counts(include_drafts)?;
            out.push_str(&format!("Tags ({}):\n", tags.len()));
            for tag in tags {
                out.push_str(&format!("  {} ({})\n", tag.tag, tag.count));
            }
        }
        ListKind::Category => {
            let categories = index.category_counts(include_drafts)?;
            out.push_str(&format!("Categories ({}):\n", categories.len()));
            for c in categories {
                out.push_str(&format!(
                    "  {} [{}] ({})\n",
                    blog.config.category_label(&c.category),
                    c.category,
                    c.count
                ));
            }
        }
        ListKind::Slug => {
            for slug in index.all_slugs(include_drafts)? {
                out.push_str(&slug);
                out.push('\n');
            }
        }
    }

    Ok(out)
}
