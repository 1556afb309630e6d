//! Content scanner - finds Markdown/MDX files below the content directory

use std::path::{Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

use super::ContentError;

/// Recursively collect Markdown and MDX files.
///
/// Hidden entries (name starting with `.`) are skipped, and hidden
/// directories are not descended into. A missing directory yields no files.
/// Entries below the root that cannot be read (broken symlinks, permission
/// errors) are logged and skipped; only an unreadable root is an error.
pub fn scan(dir: &Path) -> Result<Vec<PathBuf>, ContentError> {
    if !dir.is_dir() {
        tracing::debug!("Content directory {:?} does not exist", dir);
        return Ok(Vec::new());
    }

    let mut files = Vec::new();
    let walker = WalkDir::new(dir)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !is_hidden(e));

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) if err.depth() > 0 => {
                tracing::warn!("Skipping unreadable entry: {}", err);
                continue;
            }
            Err(err) => return Err(err.into()),
        };
        if entry.file_type().is_file() && is_content_file(entry.path()) {
            files.push(entry.into_path());
        }
    }

    Ok(files)
}

/// Check if a file is a Markdown or MDX file (case-insensitive)
pub fn is_content_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("md") || e.eq_ignore_ascii_case("mdx"))
        .unwrap_or(false)
}

/// Whether the file is MDX rather than plain Markdown
pub fn is_mdx(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("mdx"))
        .unwrap_or(false)
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry
        .file_name()
        .to_str()
        .map(|s| s.starts_with('.'))
        .unwrap_or(false)
}
