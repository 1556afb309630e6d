//! Metadata derivation - fills in whatever the front-matter leaves out

use chrono::{DateTime, NaiveDate, Utc};
use lazy_static::lazy_static;
use regex::Regex;
use std::borrow::Cow;
use std::fs;
use std::path::Path;
use std::process::Command;

use super::markdown::strip_mdx_module_lines;
use super::scanner::is_mdx;
use super::{ContentError, FrontMatter, Post, PostMeta};
use crate::config::DeriveOptions;
use crate::helpers::{is_http, iso_date, lead_slash, parse_date_string, to_posix};

lazy_static! {
    static ref MORE_MARKER: Regex = Regex::new(r"<!--\s*more\s*-->").unwrap();
    static ref FENCED_CODE: Regex = Regex::new(r"(?s)```.*?```").unwrap();
    static ref INLINE_CODE: Regex = Regex::new(r"`[^`]*`").unwrap();
    static ref IMAGE: Regex = Regex::new(r"!\[[^\]]*\]\([^)]+\)").unwrap();
    static ref LINK: Regex = Regex::new(r"\[([^\]]+)\]\([^)]+\)").unwrap();
    static ref MARKUP: Regex = Regex::new(r"[#>*_~`-]+").unwrap();
    static ref WHITESPACE: Regex = Regex::new(r"\s+").unwrap();
    static ref TRAILING_WORD: Regex = Regex::new(r"\s+\S*$").unwrap();
    static ref FIRST_H1: Regex = Regex::new(r"(?m)^\s*#\s+(.+)\s*$").unwrap();
    static ref PATH_DATE: Regex = Regex::new(r"(\d{4})[/-](\d{2})[/-](\d{2})").unwrap();
}

const THUMBNAIL_EXTENSIONS: [&str; 4] = ["png", "jpg", "jpeg", "webp"];

/// Derives [`PostMeta`] from a content file and its front-matter
#[derive(Debug, Clone)]
pub struct MetaDeriver {
    options: DeriveOptions,
}

impl MetaDeriver {
    pub fn new(options: DeriveOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &DeriveOptions {
        &self.options
    }

    /// Read a content file and derive its metadata
    pub fn load(&self, path: &Path) -> Result<Post, ContentError> {
        let raw = fs::read_to_string(path).map_err(|source| ContentError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let (fm, body) = FrontMatter::parse(&raw);
        let meta = self.derive(path, body, &fm);

        Ok(Post {
            meta,
            content: body.to_string(),
            source: path.to_path_buf(),
        })
    }

    /// Build metadata from front-matter, falling back to derived values
    pub fn derive(&self, path: &Path, body: &str, fm: &FrontMatter) -> PostMeta {
        // MDX module lines are neither prose nor headings
        let body: Cow<str> = if is_mdx(path) {
            Cow::Owned(strip_mdx_module_lines(body))
        } else {
            Cow::Borrowed(body)
        };
        let body = body.as_ref();

        let date = self.resolve_date(fm.date.as_deref(), path);

        let slug = fm
            .slug
            .clone()
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| file_slug(path));

        let title = fm
            .title
            .clone()
            .filter(|t| !t.trim().is_empty())
            .or_else(|| extract_first_h1(body))
            .unwrap_or_else(|| slug.clone());

        let thumbnail = match fm.raw_thumbnail() {
            Some(raw) if is_http(raw) => Some(raw.to_string()),
            Some(raw) => Some(lead_slash(raw)),
            None => self.find_auto_thumbnail(&slug),
        };

        let excerpt = fm
            .excerpt
            .clone()
            .filter(|e| !e.trim().is_empty())
            .or_else(|| derive_excerpt(body, self.options.excerpt_length));

        let read_min = fm
            .read_min
            .filter(|m| *m >= 0.0)
            .map(|m| m.round() as u32)
            .unwrap_or_else(|| read_minutes(body, self.options.words_per_minute));

        PostMeta {
            slug,
            title,
            date,
            tags: fm.tags.clone().unwrap_or_default(),
            category: fm.category.clone(),
            excerpt,
            read_min,
            thumbnail,
            thumbnail_alt: fm.thumbnail_alt.clone(),
            draft: fm.is_draft(),
        }
    }

    /// Front-matter date, else a date in the path, else git history, else mtime
    fn resolve_date(&self, raw: Option<&str>, path: &Path) -> String {
        if let Some(date) = raw.and_then(parse_date_string) {
            return iso_date(&date);
        }

        let relative = path.strip_prefix(&self.options.content_dir).unwrap_or(path);
        if let Some(date) = date_from_path(&to_posix(relative)) {
            return iso_date(&date);
        }

        if self.options.date_from_git {
            if let Some(date) = git_created_date(path) {
                return iso_date(&date);
            }
        }

        iso_date(&mtime_date(path))
    }

    /// `images/<slug>/cover.*` first, then `images/<slug>.*`, under the static dir
    fn find_auto_thumbnail(&self, slug: &str) -> Option<String> {
        let images = self.options.static_dir.join("images");

        let nested = THUMBNAIL_EXTENSIONS
            .iter()
            .map(|ext| images.join(slug).join(format!("cover.{}", ext)));
        let flat = THUMBNAIL_EXTENSIONS
            .iter()
            .map(|ext| images.join(format!("{}.{}", slug, ext)));

        nested.chain(flat).find(|p| p.is_file()).map(|hit| {
            let relative = hit.strip_prefix(&self.options.static_dir).unwrap_or(&hit);
            lead_slash(&to_posix(relative))
        })
    }
}

/// Slug from the file name, without the `.md`/`.mdx` extension
fn file_slug(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// First `YYYY-MM-DD` (or `YYYY/MM/DD`) in a path that is a real calendar date
fn date_from_path(path: &str) -> Option<NaiveDate> {
    PATH_DATE.captures_iter(path).find_map(|caps| {
        let year = caps[1].parse().ok()?;
        let month = caps[2].parse().ok()?;
        let day = caps[3].parse().ok()?;
        NaiveDate::from_ymd_opt(year, month, day)
    })
}

/// Date of the commit that first added the file
fn git_created_date(path: &Path) -> Option<NaiveDate> {
    let dir = path.parent()?;
    let file = path.file_name()?;

    let output = Command::new("git")
        .arg("log")
        .arg("--follow")
        .arg("--diff-filter=A")
        .arg("--format=%cI")
        .arg("--")
        .arg(file)
        .current_dir(dir)
        .output();

    let output = match output {
        Ok(output) if output.status.success() => output,
        Ok(_) => return None,
        Err(e) => {
            tracing::debug!("git unavailable for {:?}: {}", path, e);
            return None;
        }
    };

    let stdout = String::from_utf8_lossy(&output.stdout);
    let line = stdout.lines().rev().find(|l| !l.trim().is_empty())?;
    DateTime::parse_from_rfc3339(line.trim())
        .ok()
        .map(|dt| dt.with_timezone(&Utc).date_naive())
}

/// File modification date (UTC), or today if unavailable
fn mtime_date(path: &Path) -> NaiveDate {
    fs::metadata(path)
        .and_then(|m| m.modified())
        .map(|t| DateTime::<Utc>::from(t).date_naive())
        .unwrap_or_else(|_| Utc::now().date_naive())
}

/// Text of the first level-1 ATX heading
pub fn extract_first_h1(md: &str) -> Option<String> {
    FIRST_H1
        .captures(md)
        .map(|caps| caps[1].trim().to_string())
        .filter(|t| !t.is_empty())
}

/// Plain-text summary of the body up to the `<!--more-->` marker.
///
/// Code, images and Markdown punctuation are removed, link text is kept.
/// Text longer than `limit` characters is cut on a word boundary and
/// suffixed with `…`.
pub fn derive_excerpt(md: &str, limit: usize) -> Option<String> {
    let cutoff = match MORE_MARKER.find(md) {
        Some(m) => &md[..m.start()],
        None => md,
    };

    let text = FENCED_CODE.replace_all(cutoff, " ");
    let text = INLINE_CODE.replace_all(&text, " ");
    let text = IMAGE.replace_all(&text, " ");
    let text = LINK.replace_all(&text, "$1");
    let text = MARKUP.replace_all(&text, " ");
    let text = WHITESPACE.replace_all(&text, " ");
    let text = text.trim();

    if text.is_empty() {
        return None;
    }

    if text.chars().count() <= limit {
        return Some(text.to_string());
    }

    let cut: String = text.chars().take(limit).collect();
    let cut = TRAILING_WORD.replace(&cut, "");
    Some(format!("{}…", cut))
}

/// Reading time at `words_per_minute`, never less than one minute
pub fn read_minutes(text: &str, words_per_minute: usize) -> u32 {
    let words = text.split_whitespace().count();
    let minutes = (words as f64 / words_per_minute.max(1) as f64).round() as u32;
    minutes.max(1)
}
