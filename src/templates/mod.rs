//! Built-in theme templates using the Tera template engine
//!
//! Templates and assets are embedded in the binary.

use anyhow::Result;
use serde::Serialize;
use std::collections::HashMap;
use tera::{Context, Tera};

use crate::helpers;

/// Stylesheet written to `/assets/style.css`
pub const STYLE_CSS: &str = include_str!("theme/assets/style.css");

/// Client script written to `/assets/main.js`
pub const MAIN_JS: &str = include_str!("theme/assets/main.js");

/// Template renderer with the embedded theme
pub struct TemplateRenderer {
    tera: Tera,
}

impl TemplateRenderer {
    /// Create a new renderer with all theme templates loaded
    pub fn new() -> Result<Self> {
        let mut tera = Tera::default();

        // URLs are emitted pre-encoded; text is escaped explicitly with `| escape`
        tera.autoescape_on(vec![]);

        tera.add_raw_templates(vec![
            ("layout.html", include_str!("theme/layout.html")),
            ("home.html", include_str!("theme/home.html")),
            ("post.html", include_str!("theme/post.html")),
            ("partials/header.html", include_str!("theme/partials/header.html")),
            ("partials/card.html", include_str!("theme/partials/card.html")),
            ("partials/footer.html", include_str!("theme/partials/footer.html")),
        ])?;

        tera.register_filter("display_date", display_date_filter);
        tera.register_filter("truncate_chars", truncate_chars_filter);
        tera.register_filter("attr", attr_filter);

        Ok(Self { tera })
    }

    /// Render a template with given context
    pub fn render(&self, template_name: &str, context: &Context) -> Result<String> {
        Ok(self.tera.render(template_name, context)?)
    }
}

/// Tera filter: ISO date to the card display format
fn display_date_filter(
    value: &tera::Value,
    _args: &HashMap<String, tera::Value>,
) -> tera::Result<tera::Value> {
    let s = tera::try_get_value!("display_date", "value", String, value);
    Ok(tera::Value::String(helpers::display_date(&s)))
}

/// Tera filter: quote-safe attribute value that leaves `/` readable in URLs
fn attr_filter(
    value: &tera::Value,
    _args: &HashMap<String, tera::Value>,
) -> tera::Result<tera::Value> {
    let s = tera::try_get_value!("attr", "value", String, value);
    Ok(tera::Value::String(helpers::html_escape(&s)))
}

/// Tera filter: truncate by character count
fn truncate_chars_filter(
    value: &tera::Value,
    args: &HashMap<String, tera::Value>,
) -> tera::Result<tera::Value> {
    let s = tera::try_get_value!("truncate_chars", "value", String, value);
    let length = match args.get("length") {
        Some(val) => tera::try_get_value!("truncate_chars", "length", usize, val),
        None => 150,
    };
    let omission = match args.get("omission") {
        Some(val) => tera::try_get_value!("truncate_chars", "omission", String, val),
        None => "…".to_string(),
    };

    Ok(tera::Value::String(helpers::truncate(&s, length, Some(&omission))))
}

// Data structures for template context

/// Site-wide values available on every page
#[derive(Debug, Clone, Serialize)]
pub struct SiteData {
    pub title: String,
    pub description: String,
    pub author: String,
    pub language: String,
    pub url: String,
    pub root: String,
    pub current_year: String,
}

/// A post as shown on a card or the post page
#[derive(Debug, Clone, Serialize)]
pub struct PostData {
    pub slug: String,
    pub title: String,
    pub date: String,
    pub url: String,
    pub tags: Vec<String>,
    pub category: String,
    pub category_label: String,
    pub category_url: String,
    pub excerpt: Option<String>,
    pub read_min: u32,
    pub thumbnail: Option<String>,
    /// Alt text, falling back to the title
    pub thumbnail_alt: String,
    pub draft: bool,
    /// Whether the card is shown before any client-side filtering
    pub visible: bool,
}

/// A category tab on the home page
#[derive(Debug, Clone, Serialize)]
pub struct CategoryTab {
    pub key: String,
    pub label: String,
    pub url: String,
    pub active: bool,
}

/// A hero tag chip; clicking it fills the search box
#[derive(Debug, Clone, Serialize)]
pub struct HeroTag {
    pub name: String,
    pub count: usize,
}

/// Link to a neighbouring post
#[derive(Debug, Clone, Serialize)]
pub struct NavPost {
    pub title: String,
    pub url: String,
}
