//! URL helper functions

use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use std::path::Path;

use crate::config::SiteConfig;

/// Characters escaped by JavaScript's `encodeURIComponent`
const URI_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// Generate a URL with the root path
///
/// # Examples
/// ```ignore
/// url_for(&config, "/posts/hello/") // -> "/blog/posts/hello/"
/// ```
pub fn url_for(config: &SiteConfig, path: &str) -> String {
    let root = config.root.trim_end_matches('/');
    let path = path.trim_start_matches('/');

    if path.is_empty() {
        format!("{}/", root)
    } else {
        format!("{}/{}", root, path)
    }
}

/// Generate a full URL including the domain
pub fn full_url_for(config: &SiteConfig, path: &str) -> String {
    let base = config.url.trim_end_matches('/');
    format!("{}{}", base, url_for(config, path))
}

/// Percent-encode a single path segment
pub fn encode_uri_component(s: &str) -> String {
    utf8_percent_encode(s, URI_COMPONENT).to_string()
}

/// Decode a percent-encoded segment. Malformed input is returned unchanged.
pub fn decode_uri_component(s: &str) -> String {
    match percent_decode_str(s).decode_utf8() {
        Ok(decoded) => decoded.into_owned(),
        Err(_) => s.to_string(),
    }
}

/// URL path of a post page
///
/// # Examples
/// ```ignore
/// post_url("hello world") // -> "/posts/hello%20world/"
/// ```
pub fn post_url(slug: &str) -> String {
    format!("/posts/{}/", encode_uri_component(slug))
}

/// URL path of a category listing page
pub fn category_url(key: &str) -> String {
    if key == "all" {
        "/".to_string()
    } else {
        format!("/category/{}/", encode_uri_component(key))
    }
}

/// Whether the string is an absolute http(s) URL
pub fn is_http(s: &str) -> bool {
    let lower = s.get(..8).unwrap_or(s).to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

/// Root a relative asset path at `/`, dropping a leading `./` or `/`
pub fn lead_slash(p: &str) -> String {
    if p.starts_with('/') {
        return p.to_string();
    }
    let stripped = p.strip_prefix("./").unwrap_or(p);
    format!("/{}", stripped)
}

/// Render a path with forward slashes regardless of platform
pub fn to_posix(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> SiteConfig {
        let mut config = SiteConfig::default();
        config.url = "https://example.com".to_string();
        config.root = "/blog/".to_string();
        config
    }

    #[test]
    fn test_url_for() {
        let config = test_config();
        assert_eq!(url_for(&config, "/posts/a/"), "/blog/posts/a/");
        assert_eq!(url_for(&config, ""), "/blog/");
    }

    #[test]
    fn test_full_url_for() {
        let config = test_config();
        assert_eq!(
            full_url_for(&config, "/atom.xml"),
            "https://example.com/blog/atom.xml"
        );
    }

    #[test]
    fn test_encode_uri_component() {
        assert_eq!(encode_uri_component("hello-world"), "hello-world");
        assert_eq!(encode_uri_component("a b/c"), "a%20b%2Fc");
        assert_eq!(encode_uri_component("it's(ok)!"), "it's(ok)!");
        assert_eq!(encode_uri_component("게임"), "%EA%B2%8C%EC%9E%84");
    }

    #[test]
    fn test_decode_uri_component() {
        assert_eq!(decode_uri_component("%EA%B2%8C%EC%9E%84"), "게임");
        assert_eq!(decode_uri_component("plain"), "plain");
        assert_eq!(decode_uri_component("%FF"), "%FF");
    }

    #[test]
    fn test_post_url() {
        assert_eq!(post_url("hello"), "/posts/hello/");
        assert_eq!(post_url("엘든링"), "/posts/%EC%97%98%EB%93%A0%EB%A7%81/");
    }

    #[test]
    fn test_is_http() {
        assert!(is_http("https://cdn.example.com/a.png"));
        assert!(is_http("HTTP://EXAMPLE.COM"));
        assert!(!is_http("/images/a.png"));
        assert!(!is_http("http"));
    }

    #[test]
    fn test_lead_slash() {
        assert_eq!(lead_slash("/images/a.png"), "/images/a.png");
        assert_eq!(lead_slash("./images/a.png"), "/images/a.png");
        assert_eq!(lead_slash("images/a.png"), "/images/a.png");
    }
}
