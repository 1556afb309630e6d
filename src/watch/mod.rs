//! Debounced rebuilds for `build --watch` and `serve`

use anyhow::Result;
use notify::RecursiveMode;
use notify_debouncer_mini::{new_debouncer, DebouncedEvent};
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::time::Duration;

use crate::commands::build;
use crate::config::CONFIG_FILE;
use crate::Blog;

/// Quiet period after the last change before rebuilding
const DEBOUNCE: Duration = Duration::from_millis(500);

/// Paths whose changes trigger a rebuild. Missing ones are left out.
pub fn watch_targets(blog: &Blog) -> Vec<(PathBuf, RecursiveMode)> {
    let mut targets: Vec<(PathBuf, RecursiveMode)> = [&blog.content_dir, &blog.static_dir]
        .into_iter()
        .filter(|dir| dir.is_dir())
        .map(|dir| (dir.clone(), RecursiveMode::Recursive))
        .collect();

    let config_path = blog.base_dir.join(CONFIG_FILE);
    if config_path.is_file() {
        targets.push((config_path, RecursiveMode::NonRecursive));
    }

    targets
}

/// Block the current thread, rebuilding after every burst of relevant
/// changes. `on_rebuilt` runs after each successful rebuild.
///
/// The blog is reloaded from disk each time so config edits apply.
pub fn rebuild_on_change<F>(blog: &Blog, include_drafts: Option<bool>, mut on_rebuilt: F) -> Result<()>
where
    F: FnMut(),
{
    let (tx, rx) = mpsc::channel();
    let mut debouncer = new_debouncer(DEBOUNCE, tx)?;

    for (path, mode) in watch_targets(blog) {
        debouncer.watcher().watch(&path, mode)?;
        tracing::debug!("Watching: {:?}", path);
    }

    for result in rx {
        let events = match result {
            Ok(events) => events,
            Err(e) => {
                tracing::error!("Watch error: {:?}", e);
                continue;
            }
        };

        let changed = changed_paths(&events);
        if changed.is_empty() {
            continue;
        }
        for path in &changed {
            tracing::info!("File changed: {}", path.display());
        }

        match rebuild(&blog.base_dir, include_drafts) {
            Ok(()) => {
                tracing::info!("Regenerated successfully");
                on_rebuilt();
            }
            Err(e) => tracing::error!("Generation failed: {:#}", e),
        }
    }

    Ok(())
}

/// Reload configuration and regenerate
fn rebuild(base_dir: &Path, include_drafts: Option<bool>) -> Result<()> {
    let blog = Blog::new(base_dir)?;
    build::run(&blog, include_drafts)
}

fn changed_paths(events: &[DebouncedEvent]) -> Vec<&Path> {
    events
        .iter()
        .map(|e| e.path.as_path())
        .filter(|p| is_relevant(p))
        .collect()
}

/// Editor swap files and OS metadata do not trigger a rebuild
fn is_relevant(path: &Path) -> bool {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy())
        .unwrap_or_default();

    !(name.starts_with('.') || name.ends_with('~') || name.ends_with(".swp"))
}
