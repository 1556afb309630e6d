//! Post list filtering by category tab and search query

use super::PostMeta;

/// Category key that shows every post
pub const ALL_CATEGORY: &str = "all";

/// Category key for posts without one
pub const UNCATEGORIZED: &str = "etc";

/// Filter posts by the active category and a case-insensitive query.
///
/// The query matches as a substring of the title or of the space-joined tags.
/// Order is preserved.
pub fn filter_posts<'a>(posts: &'a [PostMeta], category: &str, query: &str) -> Vec<&'a PostMeta> {
    let query = query.to_lowercase();

    posts
        .iter()
        .filter(|p| category == ALL_CATEGORY || p.category_key() == category)
        .filter(|p| {
            p.title.to_lowercase().contains(&query)
                || p.tags.join(" ").to_lowercase().contains(&query)
        })
        .collect()
}
