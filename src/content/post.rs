//! Post models

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::helpers::post_url;

/// Derived metadata for a single post
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostMeta {
    /// URL-friendly name
    pub slug: String,

    /// Post title
    pub title: String,

    /// Publication date, ISO `YYYY-MM-DD`
    pub date: String,

    /// Post tags
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,

    /// Category key, matched against the configured category tabs
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,

    /// Plain-text summary
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub excerpt: Option<String>,

    /// Estimated reading time in minutes
    pub read_min: u32,

    /// Thumbnail URL (absolute or site-rooted)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail_alt: Option<String>,

    /// Drafts are hidden in production builds
    #[serde(default)]
    pub draft: bool,
}

impl PostMeta {
    /// Site-relative URL of the post page
    pub fn url(&self) -> String {
        post_url(&self.slug)
    }

    /// Category key used for filtering (`etc` when unset)
    pub fn category_key(&self) -> &str {
        self.category.as_deref().unwrap_or(super::UNCATEGORIZED)
    }
}

/// A post with its Markdown body, as needed to render the post page
#[derive(Debug, Clone)]
pub struct Post {
    pub meta: PostMeta,

    /// Markdown body without front-matter
    pub content: String,

    /// Full source file path
    pub source: PathBuf,
}

/// Number of posts carrying a tag
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TagCount {
    pub tag: String,
    pub count: usize,
}

/// Number of posts in a category
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryCount {
    pub category: String,
    pub count: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meta() -> PostMeta {
        PostMeta {
            slug: "hello world".to_string(),
            title: "Hello".to_string(),
            date: "2024-01-15".to_string(),
            tags: Vec::new(),
            category: None,
            excerpt: None,
            read_min: 1,
            thumbnail: None,
            thumbnail_alt: None,
            draft: false,
        }
    }

    #[test]
    fn test_serializes_camel_case_and_skips_empty() {
        let mut m = meta();
        m.thumbnail_alt = Some("alt".to_string());
        let json = serde_json::to_value(&m).unwrap();
        assert_eq!(json["readMin"], 1);
        assert_eq!(json["thumbnailAlt"], "alt");
        assert!(json.get("tags").is_none());
        assert!(json.get("category").is_none());
    }

    #[test]
    fn test_url_and_category_key() {
        let mut m = meta();
        assert_eq!(m.url(), "/posts/hello%20world/");
        assert_eq!(m.category_key(), "etc");
        m.category = Some("game".to_string());
        assert_eq!(m.category_key(), "game");
    }
}
