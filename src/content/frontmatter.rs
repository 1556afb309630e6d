//! Front-matter parsing

use serde::{Deserialize, Deserializer, Serialize};
use serde_yaml::Value;

/// Keep a value only when it is a string
fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => Some(s),
        _ => None,
    })
}

/// Keep a value only when it is a boolean
fn lenient_bool<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Bool(b) => Some(b),
        _ => None,
    })
}

/// Keep a value only when it is a finite number
fn lenient_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Number(n) => n.as_f64().filter(|f| f.is_finite()),
        _ => None,
    })
}

/// Accept a list of scalars or a single string.
///
/// Scalars inside the list are stringified; nested lists and maps are dropped.
fn lenient_tags<'de, D>(deserializer: D) -> Result<Option<Vec<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Sequence(items) => Some(items.iter().filter_map(scalar_to_string).collect()),
        Value::String(s) => Some(vec![s]),
        _ => None,
    })
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null => Some("null".to_string()),
        Value::Tagged(tagged) => scalar_to_string(&tagged.value),
        Value::Sequence(_) | Value::Mapping(_) => None,
    }
}

/// Front-matter data from a post.
///
/// Every field is optional and typed leniently: a value of the wrong type is
/// treated as absent instead of failing the whole block.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FrontMatter {
    #[serde(deserialize_with = "lenient_string")]
    pub title: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub date: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub slug: Option<String>,
    #[serde(deserialize_with = "lenient_tags")]
    pub tags: Option<Vec<String>>,
    #[serde(deserialize_with = "lenient_string")]
    pub category: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub excerpt: Option<String>,
    #[serde(rename = "readMin", alias = "read_min", deserialize_with = "lenient_number")]
    pub read_min: Option<f64>,
    #[serde(deserialize_with = "lenient_string")]
    pub thumbnail: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub thumb: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub cover: Option<String>,
    #[serde(rename = "thumbnailAlt", deserialize_with = "lenient_string")]
    pub thumbnail_alt: Option<String>,
    #[serde(deserialize_with = "lenient_bool")]
    pub draft: Option<bool>,
    #[serde(deserialize_with = "lenient_bool")]
    pub published: Option<bool>,
}

impl FrontMatter {
    /// Parse front-matter from content string
    /// Returns (front_matter, remaining_content)
    pub fn parse(content: &str) -> (Self, &str) {
        let content = content.strip_prefix('\u{feff}').unwrap_or(content);
        let trimmed = content.trim_start();

        if opens_with(trimmed, "---") {
            return Self::parse_yaml(trimmed);
        }

        if opens_with(trimmed, "+++") {
            return Self::parse_toml(trimmed);
        }

        // No front-matter found
        (FrontMatter::default(), content)
    }

    fn parse_yaml(content: &str) -> (Self, &str) {
        let Some((yaml_content, remaining)) = split_block(content, "---") else {
            tracing::debug!("Unclosed YAML front-matter, treating as content");
            return (FrontMatter::default(), content);
        };

        if yaml_content.trim().is_empty() {
            return (FrontMatter::default(), remaining);
        }

        // A leading `---` may just be a thematic break followed by prose
        if !has_yaml_structure(yaml_content) {
            return (FrontMatter::default(), content);
        }

        match serde_yaml::from_str::<FrontMatter>(yaml_content) {
            Ok(fm) => (fm, remaining),
            Err(e) => {
                tracing::warn!(
                    "Failed to parse YAML front-matter, treating as content: {}",
                    e
                );
                (FrontMatter::default(), content)
            }
        }
    }

    fn parse_toml(content: &str) -> (Self, &str) {
        let Some((toml_content, remaining)) = split_block(content, "+++") else {
            tracing::debug!("Unclosed TOML front-matter, treating as content");
            return (FrontMatter::default(), content);
        };

        let table = match toml_content.parse::<toml::Table>() {
            Ok(table) => table,
            Err(e) => {
                tracing::warn!(
                    "Failed to parse TOML front-matter, treating as content: {}",
                    e
                );
                return (FrontMatter::default(), content);
            }
        };

        let value = toml_to_yaml(toml::Value::Table(table));
        match serde_yaml::from_value::<FrontMatter>(value) {
            Ok(fm) => (fm, remaining),
            Err(e) => {
                tracing::warn!("Unusable TOML front-matter: {}", e);
                (FrontMatter::default(), content)
            }
        }
    }

    /// Thumbnail from `thumbnail`, `thumb` or `cover`, in that order
    pub fn raw_thumbnail(&self) -> Option<&str> {
        self.thumbnail
            .as_deref()
            .or(self.thumb.as_deref())
            .or(self.cover.as_deref())
    }

    /// `draft: true` or `published: false`
    pub fn is_draft(&self) -> bool {
        self.draft == Some(true) || self.published == Some(false)
    }
}

/// Whether the first line of `content` is exactly the delimiter
fn opens_with(content: &str, delim: &str) -> bool {
    content
        .lines()
        .next()
        .map(|line| line.trim_end() == delim)
        .unwrap_or(false)
}

/// Split `delim\n<block>\ndelim\n<body>` into block and body.
/// Returns `None` when the closing delimiter is missing.
fn split_block<'a>(content: &'a str, delim: &str) -> Option<(&'a str, &'a str)> {
    let first_line_end = content.find('\n')?;
    let rest = &content[first_line_end + 1..];

    let mut offset = 0;
    for line in rest.split_inclusive('\n') {
        if line.trim_end() == delim {
            let block = &rest[..offset];
            let body = rest[offset + line.len()..].trim_start_matches(['\n', '\r']);
            return Some((block, body));
        }
        offset += line.len();
    }

    None
}

/// Valid YAML front-matter has at least one `key: value` line
fn has_yaml_structure(yaml_content: &str) -> bool {
    yaml_content.lines().any(|line| {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            return false;
        }
        let Some((key, after_colon)) = split_key(trimmed) else {
            return false;
        };
        let is_valid_key = !key.is_empty() && !matches!(key, "http" | "https" | "ftp");
        is_valid_key && (after_colon.is_empty() || after_colon.starts_with(' '))
    })
}

/// Split a `key: value` line into the key and what follows its colon.
/// Keys are either quoted or made of letters, digits, `_` and `-`.
fn split_key(line: &str) -> Option<(&str, &str)> {
    if let Some(quote) = line.chars().next().filter(|c| matches!(c, '"' | '\'')) {
        let inner = &line[1..];
        let close = inner.find(quote)?;
        let after = inner[close + 1..].strip_prefix(':')?;
        return Some((&inner[..close], after));
    }

    let colon_pos = line.find(':')?;
    let key = &line[..colon_pos];
    key.chars()
        .all(|c| c.is_alphanumeric() || c == '_' || c == '-')
        .then(|| (key, &line[colon_pos + 1..]))
}

fn toml_to_yaml(value: toml::Value) -> Value {
    match value {
        toml::Value::String(s) => Value::String(s),
        toml::Value::Integer(i) => Value::Number(i.into()),
        toml::Value::Float(f) => Value::Number(f.into()),
        toml::Value::Boolean(b) => Value::Bool(b),
        toml::Value::Datetime(dt) => Value::String(dt.to_string()),
        toml::Value::Array(items) => Value::Sequence(items.into_iter().map(toml_to_yaml).collect()),
        toml::Value::Table(table) => Value::Mapping(
            table
                .into_iter()
                .map(|(k, v)| (Value::String(k), toml_to_yaml(v)))
                .collect(),
        ),
    }
}
