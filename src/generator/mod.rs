//! Generator module - generates static HTML files using built-in Tera templates

use anyhow::{Context as _, Result};
use chrono::{Datelike, NaiveDate};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use tera::Context;
use walkdir::WalkDir;

use crate::content::scanner::is_mdx;
use crate::content::{filter_posts, MarkdownRenderer, Post, PostMeta, ALL_CATEGORY};
use crate::helpers::{
    absolutize_urls, category_url, date_xml, escape_xml, full_url_for, is_http,
    strip_invalid_xml_chars, url_for,
};
use crate::templates::{
    CategoryTab, HeroTag, NavPost, PostData, SiteData, TemplateRenderer, MAIN_JS, STYLE_CSS,
};
use crate::Blog;

/// Static site generator using Tera templates
pub struct Generator {
    blog: Blog,
    renderer: TemplateRenderer,
    markdown: MarkdownRenderer,
}

impl Generator {
    /// Create a new generator
    pub fn new(blog: &Blog) -> Result<Self> {
        let renderer = TemplateRenderer::new()?;
        let markdown =
            MarkdownRenderer::with_options(&blog.config.highlight_theme, blog.config.line_numbers);

        Ok(Self {
            blog: blog.clone(),
            renderer,
            markdown,
        })
    }

    /// Generate the entire site from posts sorted newest first
    pub fn generate(&self, posts: &[Post]) -> Result<()> {
        let output_dir = &self.blog.output_dir;
        fs::create_dir_all(output_dir)
            .with_context(|| format!("Failed to create output dir {:?}", output_dir))?;

        // Static files first so generated pages win on conflicts
        self.copy_static_dir()?;
        self.write_assets()?;

        let posts: Vec<&Post> = posts.iter().filter(|p| is_safe_slug(&p.meta.slug)).collect();
        let metas: Vec<PostMeta> = posts.iter().map(|p| p.meta.clone()).collect();
        let site_data = self.build_site_data();

        self.generate_listing_pages(&metas, &site_data)?;
        let rendered = self.generate_post_pages(&posts, &site_data)?;
        self.generate_posts_json(&metas)?;
        self.generate_atom_feed(&posts, &rendered)?;

        tracing::info!("Generated {} post pages", posts.len());
        Ok(())
    }

    /// Build site data for templates
    fn build_site_data(&self) -> SiteData {
        let config = &self.blog.config;
        SiteData {
            title: config.title.clone(),
            description: config.description.clone(),
            author: config.author.clone(),
            language: config.language.clone(),
            url: config.url.clone(),
            root: url_for(config, ""),
            current_year: chrono::Local::now().year().to_string(),
        }
    }

    /// Template view of a post
    fn post_data(&self, meta: &PostMeta, visible: bool) -> PostData {
        let config = &self.blog.config;
        let category = meta.category_key().to_string();

        PostData {
            slug: meta.slug.clone(),
            title: meta.title.clone(),
            date: meta.date.clone(),
            url: url_for(config, &meta.url()),
            tags: meta.tags.clone(),
            category_label: config.category_label(&category).to_string(),
            category_url: url_for(config, &category_url(&category)),
            category,
            excerpt: meta.excerpt.clone(),
            read_min: meta.read_min,
            thumbnail: meta.thumbnail.as_ref().map(|t| self.asset_url(t)),
            thumbnail_alt: meta
                .thumbnail_alt
                .clone()
                .unwrap_or_else(|| meta.title.clone()),
            draft: meta.draft,
            visible,
        }
    }

    /// Site-rooted asset URLs get the configured root; absolute URLs pass through
    fn asset_url(&self, url: &str) -> String {
        if is_http(url) || url.starts_with("//") {
            url.to_string()
        } else {
            url_for(&self.blog.config, url)
        }
    }

    /// Home page plus one page per configured category
    fn generate_listing_pages(&self, metas: &[PostMeta], site_data: &SiteData) -> Result<()> {
        let config = &self.blog.config;

        let counts = tag_counts(metas);
        let hero_tags: Vec<HeroTag> = config
            .hero_tags
            .iter()
            .map(|name| HeroTag {
                name: name.clone(),
                count: counts.get(name.as_str()).copied().unwrap_or(0),
            })
            .collect();

        let mut keys: Vec<&str> = config.categories.keys().map(String::as_str).collect();
        if !keys.contains(&ALL_CATEGORY) {
            keys.insert(0, ALL_CATEGORY);
        }

        for active in &keys {
            let html = self.render_listing(metas, site_data, &hero_tags, active)?;

            let output_path = if *active == ALL_CATEGORY {
                self.blog.output_dir.join("index.html")
            } else {
                self.blog
                    .output_dir
                    .join("category")
                    .join(active)
                    .join("index.html")
            };
            write_file(&output_path, &html)?;
            tracing::debug!("Generated: {:?}", output_path);
        }

        tracing::info!("Generated {} listing pages", keys.len());
        Ok(())
    }

    /// Render a listing page with `active` as the selected category tab
    fn render_listing(
        &self,
        metas: &[PostMeta],
        site_data: &SiteData,
        hero_tags: &[HeroTag],
        active: &str,
    ) -> Result<String> {
        let config = &self.blog.config;

        let visible: Vec<&str> = filter_posts(metas, active, "")
            .into_iter()
            .map(|p| p.slug.as_str())
            .collect();
        let posts: Vec<PostData> = metas
            .iter()
            .map(|m| self.post_data(m, visible.contains(&m.slug.as_str())))
            .collect();

        let mut categories: Vec<CategoryTab> = config
            .categories
            .iter()
            .map(|(key, label)| CategoryTab {
                key: key.clone(),
                label: label.clone(),
                url: url_for(config, &category_url(key)),
                active: key == active,
            })
            .collect();
        if !config.categories.contains_key(ALL_CATEGORY) {
            categories.insert(
                0,
                CategoryTab {
                    key: ALL_CATEGORY.to_string(),
                    label: ALL_CATEGORY.to_string(),
                    url: url_for(config, "/"),
                    active: active == ALL_CATEGORY,
                },
            );
        }

        let page_title = if active == ALL_CATEGORY {
            config.title.clone()
        } else {
            format!("{} | {}", config.category_label(active), config.title)
        };

        let mut context = Context::new();
        context.insert("site", site_data);
        context.insert("page_title", &page_title);
        context.insert("posts", &posts);
        context.insert("categories", &categories);
        context.insert("hero_tags", hero_tags);
        context.insert("active_category", active);

        self.renderer.render("home.html", &context)
    }

    /// Generate individual post pages, returning each post's rendered body
    fn generate_post_pages(&self, posts: &[&Post], site_data: &SiteData) -> Result<Vec<String>> {
        let mut rendered = Vec::with_capacity(posts.len());

        for (slug, first, later) in duplicate_slugs(posts) {
            tracing::warn!(
                "Duplicate slug {:?}: page from {:?} is overwritten by {:?}",
                slug,
                first,
                later
            );
        }

        for (i, post) in posts.iter().enumerate() {
            // Posts are newest first: "previous" is the older neighbour
            let prev_post = posts.get(i + 1).map(|p| self.nav_post(&p.meta));
            let next_post = i
                .checked_sub(1)
                .and_then(|j| posts.get(j))
                .map(|p| self.nav_post(&p.meta));

            let content = self
                .markdown
                .render_post(&post.content, is_mdx(&post.source))
                .with_context(|| format!("Failed to render {:?}", post.source))?;

            let mut context = Context::new();
            context.insert("site", site_data);
            context.insert(
                "page_title",
                &format!("{} | {}", post.meta.title, self.blog.config.title),
            );
            context.insert("post", &self.post_data(&post.meta, true));
            context.insert("content", &content);
            if let Some(ref prev) = prev_post {
                context.insert("prev_post", prev);
            }
            if let Some(ref next) = next_post {
                context.insert("next_post", next);
            }

            let html = self.renderer.render("post.html", &context)?;

            let output_path = self.post_output_path(&post.meta.slug);
            write_file(&output_path, &html)?;
            tracing::debug!("Generated post: {:?}", output_path);

            rendered.push(content);
        }

        Ok(rendered)
    }

    fn nav_post(&self, meta: &PostMeta) -> NavPost {
        NavPost {
            title: meta.title.clone(),
            url: url_for(&self.blog.config, &meta.url()),
        }
    }

    /// Output file of a post page. The directory is the decoded slug, which
    /// static servers map the encoded URL back onto.
    fn post_output_path(&self, slug: &str) -> PathBuf {
        self.blog
            .output_dir
            .join("posts")
            .join(slug)
            .join("index.html")
    }

    /// Write the metadata index as JSON
    fn generate_posts_json(&self, metas: &[PostMeta]) -> Result<()> {
        let output_path = self.blog.output_dir.join("posts.json");
        let json = serde_json::to_string_pretty(metas)?;
        write_file(&output_path, &json)?;
        tracing::info!("Generated posts.json");
        Ok(())
    }

    /// Generate Atom feed of the newest posts
    fn generate_atom_feed(&self, posts: &[&Post], rendered: &[String]) -> Result<()> {
        let config = &self.blog.config;
        let base_url = config.url.trim_end_matches('/');
        let home = full_url_for(config, "/");

        let updated = posts
            .first()
            .and_then(|p| parse_iso(&p.meta.date))
            .map(|d| date_xml(&d))
            .unwrap_or_else(|| chrono::Utc::now().to_rfc3339());

        let mut feed = String::new();
        feed.push_str(r#"<?xml version="1.0" encoding="utf-8"?>"#);
        feed.push('\n');
        feed.push_str(r#"<feed xmlns="http://www.w3.org/2005/Atom">"#);
        feed.push('\n');
        feed.push_str(&format!("  <title>{}</title>\n", escape_xml(&config.title)));
        feed.push_str(&format!(
            "  <subtitle>{}</subtitle>\n",
            escape_xml(&config.description)
        ));
        feed.push_str(&format!(
            "  <link href=\"{}\" rel=\"self\"/>\n",
            full_url_for(config, "atom.xml")
        ));
        feed.push_str(&format!("  <link href=\"{}\"/>\n", home));
        feed.push_str(&format!("  <updated>{}</updated>\n", updated));
        feed.push_str(&format!("  <id>{}</id>\n", home));
        feed.push_str(&format!(
            "  <author><name>{}</name></author>\n",
            escape_xml(&config.author)
        ));

        for (post, content) in posts.iter().zip(rendered).take(config.feed_limit) {
            let link = full_url_for(config, &post.meta.url());
            let date = parse_iso(&post.meta.date)
                .map(|d| date_xml(&d))
                .unwrap_or_else(|| updated.clone());

            feed.push_str("  <entry>\n");
            feed.push_str(&format!(
                "    <title>{}</title>\n",
                escape_xml(&post.meta.title)
            ));
            feed.push_str(&format!("    <link href=\"{}\"/>\n", link));
            feed.push_str(&format!("    <id>{}</id>\n", link));
            feed.push_str(&format!("    <published>{}</published>\n", date));
            feed.push_str(&format!("    <updated>{}</updated>\n", date));
            for tag in &post.meta.tags {
                feed.push_str(&format!("    <category term=\"{}\"/>\n", escape_xml(tag)));
            }
            if let Some(ref excerpt) = post.meta.excerpt {
                feed.push_str(&format!(
                    "    <summary>{}</summary>\n",
                    escape_xml(&strip_invalid_xml_chars(excerpt))
                ));
            }
            // CDATA cannot contain its own terminator
            let content = strip_invalid_xml_chars(&absolutize_urls(content, base_url))
                .replace("]]>", "]]]]><![CDATA[>");
            feed.push_str(&format!(
                "    <content type=\"html\"><![CDATA[{}]]></content>\n",
                content
            ));
            feed.push_str("  </entry>\n");
        }

        feed.push_str("</feed>\n");

        let output_path = self.blog.output_dir.join("atom.xml");
        write_file(&output_path, &feed)?;
        tracing::info!("Generated atom.xml");

        Ok(())
    }

    /// Write the embedded stylesheet and script
    fn write_assets(&self) -> Result<()> {
        let assets = self.blog.output_dir.join("assets");
        write_file(&assets.join("style.css"), STYLE_CSS)?;
        write_file(&assets.join("main.js"), MAIN_JS)?;
        Ok(())
    }

    /// Copy the static directory verbatim into the output directory
    fn copy_static_dir(&self) -> Result<()> {
        let static_dir = &self.blog.static_dir;
        if !static_dir.exists() {
            return Ok(());
        }

        let mut copied = 0;
        for entry in WalkDir::new(static_dir)
            .follow_links(true)
            .into_iter()
            .filter_map(|e| e.ok())
        {
            let path = entry.path();
            if !entry.file_type().is_file() {
                continue;
            }

            let relative = path.strip_prefix(static_dir)?;
            let dest = self.blog.output_dir.join(relative);

            if let Some(parent) = dest.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::copy(path, &dest)
                .with_context(|| format!("Failed to copy {:?} to {:?}", path, dest))?;
            copied += 1;
        }

        tracing::debug!("Copied {} static files", copied);
        Ok(())
    }
}

/// Slugs become a single directory name under `posts/`
fn is_safe_slug(slug: &str) -> bool {
    let safe = !slug.is_empty()
        && slug != "."
        && slug != ".."
        && !slug.contains('/')
        && !slug.contains('\\');
    if !safe {
        tracing::warn!("Skipping post with unusable slug {:?}", slug);
    }
    safe
}

/// Tag usage counts for the hero chips
fn tag_counts(metas: &[PostMeta]) -> HashMap<&str, usize> {
    let mut counts = HashMap::new();
    for tag in metas.iter().flat_map(|m| m.tags.iter()) {
        *counts.entry(tag.as_str()).or_insert(0) += 1;
    }
    counts
}

/// Slugs claimed by more than one source, as `(slug, first, later)`.
/// Pages are written in order, so the later file's page wins.
fn duplicate_slugs<'a>(posts: &[&'a Post]) -> Vec<(&'a str, &'a Path, &'a Path)> {
    let mut seen: HashMap<&str, &Path> = HashMap::new();
    let mut duplicates = Vec::new();
    for &post in posts {
        match seen.get(post.meta.slug.as_str()) {
            Some(first) => duplicates.push((post.meta.slug.as_str(), *first, post.source.as_path())),
            None => {
                seen.insert(post.meta.slug.as_str(), post.source.as_path());
            }
        }
    }
    duplicates
}

fn parse_iso(date: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(date, "%Y-%m-%d").ok()
}

fn write_file(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create dir {:?}", parent))?;
    }
    fs::write(path, contents).with_context(|| format!("Failed to write {:?}", path))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Mode, SiteConfig};

    struct Site {
        _dir: tempfile::TempDir,
        blog: Blog,
    }

    impl Site {
        fn new() -> Self {
            let dir = tempfile::tempdir().unwrap();
            let mut config = SiteConfig::default();
            config.date_from_git = false;
            config.url = "https://blog.example.com".to_string();
            let blog = Blog::with_config(dir.path().to_path_buf(), config, Mode::Production);
            fs::create_dir_all(&blog.content_dir).unwrap();
            Self { _dir: dir, blog }
        }

        fn post(&self, name: &str, raw: &str) {
            fs::write(self.blog.content_dir.join(name), raw).unwrap();
        }

        fn build(&self) {
            let posts = self.blog.index().load_posts(None).unwrap();
            Generator::new(&self.blog).unwrap().generate(&posts).unwrap();
        }

        fn read(&self, rel: &str) -> String {
            fs::read_to_string(self.blog.output_dir.join(rel)).unwrap()
        }
    }

    fn fixture() -> Site {
        let site = Site::new();
        site.post(
            "elden.md",
            "---\ntitle: Elden Ring\ndate: 2025-03-01\ncategory: game\ntags: [공략]\n---\n# Elden Ring\n\nBoss guide.",
        );
        site.post(
            "isr.mdx",
            "---\ntitle: Next ISR\ndate: 2025-05-10\ncategory: developer\ntags: [Next.js]\n---\nimport Chart from './chart'\n\nRevalidate <b>often</b>.",
        );
        site.post(
            "엘든링 공략.md",
            "---\ntitle: 한글 제목\ndate: 2024-12-01\n---\n본문",
        );
        site
    }

    #[test]
    fn test_generates_home_and_categories() {
        let site = fixture();
        site.build();

        let home = site.read("index.html");
        assert!(home.contains("Next ISR"));
        assert!(home.contains("Elden Ring"));
        assert!(home.contains("목록 내 검색"));
        assert!(home.contains(r#"href="/category/game/""#));

        let game = site.read("category/game/index.html");
        // every card is present, only the game card is shown
        assert!(game.contains(r#"data-active="game""#));
        assert!(game.contains(r#"<li class="card" data-category="game""#));
        assert!(game.contains(r#"<li class="card" hidden data-category="developer""#));

        let movie = site.read("category/movie/index.html");
        assert!(movie.contains(r#"<p id="empty" class="empty">"#));
    }

    #[test]
    fn test_generates_post_pages_with_navigation() {
        let site = fixture();
        site.build();

        let isr = site.read("posts/isr/index.html");
        assert!(isr.contains("2025-05-10 · 1 min"));
        assert!(!isr.contains("import Chart"));
        assert!(isr.contains(r#"href="/posts/elden/""#));
        assert!(!isr.contains("next-post"));

        let elden = site.read("posts/elden/index.html");
        assert!(elden.contains("prev-post"));
        assert!(elden.contains("next-post"));
        assert!(elden.contains("Boss guide."));

        let korean = site.read("posts/엘든링 공략/index.html");
        assert!(korean.contains("한글 제목"));
        assert!(elden.contains(&crate::helpers::post_url("엘든링 공략")));
    }

    #[test]
    fn test_generates_posts_json_and_feed() {
        let site = fixture();
        site.build();

        let json: Vec<serde_json::Value> =
            serde_json::from_str(&site.read("posts.json")).unwrap();
        assert_eq!(json.len(), 3);
        assert_eq!(json[0]["slug"], "isr");
        assert_eq!(json[0]["readMin"], 1);

        let feed = site.read("atom.xml");
        assert!(feed.contains("<title>YourBlog</title>"));
        assert!(feed.contains("https://blog.example.com/posts/isr/"));
        assert!(feed.contains("<updated>2025-05-10T00:00:00+00:00</updated>"));
        assert_eq!(feed.matches("<entry>").count(), 3);
    }

    #[test]
    fn test_feed_limit() {
        let mut site = fixture();
        site.blog.config.feed_limit = 1;
        site.build();
        assert_eq!(site.read("atom.xml").matches("<entry>").count(), 1);
    }

    #[test]
    fn test_copies_static_dir_and_assets() {
        let site = fixture();
        let images = site.blog.static_dir.join("images/elden");
        fs::create_dir_all(&images).unwrap();
        fs::write(images.join("cover.png"), b"png").unwrap();
        fs::write(site.blog.static_dir.join("robots.txt"), "User-agent: *").unwrap();

        site.build();

        assert!(site.blog.output_dir.join("images/elden/cover.png").exists());
        assert_eq!(site.read("robots.txt"), "User-agent: *");
        assert!(site.read("assets/main.js").contains("data-category"));
        assert!(site.read("assets/style.css").contains(":root.dark"));

        // the cover is picked up as the thumbnail
        let home = site.read("index.html");
        assert!(home.contains(r#"src="/images/elden/cover.png""#));
    }

    #[test]
    fn test_quoted_front_matter_stays_inside_attributes() {
        let site = Site::new();
        site.post(
            "quoted.md",
            "---\ntitle: Quoted\ncategory: 'a\" onmouseover=\"alert(1)'\ncover: 'img\" onerror=\"alert(2).png'\n---\nbody",
        );
        site.build();

        let home = site.read("index.html");
        assert!(home.contains(r#"data-category="a&quot; onmouseover=&quot;alert(1)""#));
        assert!(home.contains(r#"src="/img&quot; onerror=&quot;alert(2).png""#));
        assert!(!home.contains(r#"onmouseover="alert"#));
        assert!(!home.contains(r#"onerror="alert"#));

        let page = site.read("posts/quoted/index.html");
        assert!(!page.contains(r#"onerror="alert"#));
    }

    #[test]
    fn test_unsafe_slug_is_skipped() {
        let site = Site::new();
        site.post("a.md", "---\nslug: ../escape\n---\n");
        site.post("b.md", "---\ntitle: Fine\n---\n");
        site.build();

        assert!(!site.blog.base_dir.join("escape").exists());
        assert!(site.blog.output_dir.join("posts/b/index.html").exists());
    }

    #[test]
    fn test_duplicate_slugs_are_reported() {
        let site = Site::new();
        fs::create_dir_all(site.blog.content_dir.join("2024")).unwrap();
        fs::create_dir_all(site.blog.content_dir.join("2025")).unwrap();
        site.post("2024/hello.md", "---\ntitle: Old Hello\ndate: 2024-01-01\n---\nold");
        site.post("2025/hello.md", "---\ntitle: New Hello\ndate: 2025-01-01\n---\nnew");
        site.post("other.md", "---\ntitle: Other\ndate: 2023-01-01\n---\nx");

        let posts = site.blog.index().load_posts(None).unwrap();
        let refs: Vec<&Post> = posts.iter().collect();
        let duplicates = duplicate_slugs(&refs);
        assert_eq!(duplicates.len(), 1);
        let (slug, first, later) = duplicates[0];
        assert_eq!(slug, "hello");
        assert!(first.ends_with("2025/hello.md"));
        assert!(later.ends_with("2024/hello.md"));

        site.build();
        assert!(site.read("posts/hello/index.html").contains("Old Hello"));
    }

    #[test]
    fn test_empty_site() {
        let site = Site::new();
        site.build();
        let home = site.read("index.html");
        assert!(home.contains(r#"<p id="empty" class="empty">"#));
        assert!(site.read("posts.json").trim() == "[]");
    }
}
