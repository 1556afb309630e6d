//! Content module - scanning, front-matter, metadata derivation and the post index

mod derive;
mod error;
mod filter;
mod frontmatter;
mod index;
mod markdown;
mod post;
pub mod scanner;

pub use derive::{derive_excerpt, extract_first_h1, read_minutes, MetaDeriver};
pub use error::ContentError;
pub use filter::{filter_posts, ALL_CATEGORY, UNCATEGORIZED};
pub use frontmatter::FrontMatter;
pub use index::{ContentIndex, IndexOptions};
pub use markdown::MarkdownRenderer;
pub use post::{CategoryCount, Post, PostMeta, TagCount};
