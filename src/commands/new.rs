//! Create a new post

use anyhow::Result;
use serde::Serialize;
use std::fs;
use std::path::PathBuf;

use crate::Blog;

/// Front-matter written into a new post
#[derive(Debug, Serialize)]
struct Scaffold<'a> {
    title: &'a str,
    date: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    category: Option<&'a str>,
    tags: Vec<String>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    draft: bool,
}

/// Create a new post in the content directory and return its path
pub fn create_post(
    blog: &Blog,
    title: &str,
    category: Option<&str>,
    draft: bool,
) -> Result<PathBuf> {
    let now = chrono::Local::now();

    let mut slug = slug::slugify(title);
    if slug.is_empty() {
        slug = now.format("post-%Y%m%d-%H%M%S").to_string();
    }

    fs::create_dir_all(&blog.content_dir)?;
    let file_path = blog.content_dir.join(format!("{}.md", slug));

    if file_path.exists() {
        anyhow::bail!("File already exists: {:?}", file_path);
    }

    let scaffold = Scaffold {
        title,
        date: now.format("%Y-%m-%d").to_string(),
        category,
        tags: Vec::new(),
        draft,
    };

    let content = format!(
        "---\n{}---\n\n# {}\n",
        serde_yaml::to_string(&scaffold)?,
        title
    );
    fs::write(&file_path, content)?;

    tracing::debug!("Created post {:?}", file_path);
    Ok(file_path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Mode, SiteConfig};
    use crate::content::FrontMatter;

    fn blog(dir: &std::path::Path) -> Blog {
        Blog::with_config(dir.to_path_buf(), SiteConfig::default(), Mode::Development)
    }

    #[test]
    fn test_create_post() {
        let dir = tempfile::tempdir().unwrap();
        let blog = blog(dir.path());

        let path = create_post(&blog, "Hello: World", Some("developer"), true).unwrap();
        assert_eq!(path, blog.content_dir.join("hello-world.md"));

        let raw = fs::read_to_string(&path).unwrap();
        let (fm, body) = FrontMatter::parse(&raw);
        assert_eq!(fm.title.as_deref(), Some("Hello: World"));
        assert_eq!(fm.category.as_deref(), Some("developer"));
        assert_eq!(fm.draft, Some(true));
        assert!(fm.date.is_some());
        assert!(body.contains("# Hello: World"));
    }

    #[test]
    fn test_create_post_refuses_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let blog = blog(dir.path());
        create_post(&blog, "Same", None, false).unwrap();
        assert!(create_post(&blog, "Same", None, false).is_err());
    }

    #[test]
    fn test_create_post_without_draft_flag() {
        let dir = tempfile::tempdir().unwrap();
        let blog = blog(dir.path());
        let path = create_post(&blog, "Plain", None, false).unwrap();
        let raw = fs::read_to_string(path).unwrap();
        assert!(!raw.contains("draft"));
        assert!(!raw.contains("category"));
    }
}
