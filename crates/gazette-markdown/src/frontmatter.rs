//! Front-matter extraction and parsing.
//!
//! Two header styles are recognized at the top of a document:
//!
//! - a fenced YAML block delimited by `---` lines,
//! - bare `Key: value` lines (continuation lines indented by four or more
//!   spaces), terminated by the first blank line.
//!
//! Either way, every value is normalized to a sequence of strings.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;

/// Metadata extracted from a document header.
pub type Metadata = BTreeMap<String, Vec<String>>;

static META_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[ ]{0,3}(?P<key>[A-Za-z0-9_-]+):\s*(?P<value>.*)$").expect("valid regex")
});

static META_CONTINUATION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[ ]{4,}(?P<value>.*)$").expect("valid regex"));

/// Extract front matter from a document.
///
/// Returns the metadata and the remaining content after the header.
pub fn extract_frontmatter(source: &str) -> Result<(Metadata, &str), FrontmatterError> {
    let trimmed = source.trim_start();

    let Some(after_open) = strip_fence_line(trimmed) else {
        return Ok(extract_meta_lines(source));
    };

    if let Some(fenced) = extract_fenced(after_open) {
        return fenced;
    }

    // Without a closing fence, the opening line starts a meta-line header
    let (metadata, remaining) = extract_meta_lines(after_open);
    if metadata.is_empty() {
        return Ok((metadata, source));
    }

    Ok((metadata, remaining))
}

/// Text after the first line, if that line is exactly `---`.
fn strip_fence_line(text: &str) -> Option<&str> {
    let (line, rest) = match text.split_once('\n') {
        Some((line, rest)) => (line, rest),
        None => (text, ""),
    };

    is_fence(line).then_some(rest)
}

fn is_fence(line: &str) -> bool {
    line.trim_end() == "---"
}

/// Parse a YAML block closed by a `---` line.
///
/// Returns `None` unless the block opens with a `key:` line and is closed,
/// so a leading thematic break is never mistaken for front matter.
fn extract_fenced(body: &str) -> Option<Result<(Metadata, &str), FrontmatterError>> {
    let mut lines = body.split_inclusive('\n');
    let first = lines.next()?;

    if is_fence(first) {
        return Some(Ok((Metadata::new(), body[first.len()..].trim_start())));
    }

    if !META_LINE.is_match(first.trim_end_matches(['\n', '\r'])) {
        return None;
    }

    let mut offset = first.len();
    for line in lines {
        if is_fence(line) {
            let yaml = &body[..offset];
            let remaining = body[offset + line.len()..].trim_start();
            return Some(parse_yaml(yaml).map(|metadata| (metadata, remaining)));
        }
        offset += line.len();
    }

    None
}

fn parse_yaml(yaml: &str) -> Result<Metadata, FrontmatterError> {
    let value: serde_yaml::Value =
        serde_yaml::from_str(yaml).map_err(|e| FrontmatterError::InvalidYaml(e.to_string()))?;

    let serde_yaml::Value::Mapping(mapping) = value else {
        return Err(FrontmatterError::NotAMapping);
    };

    let mut metadata = Metadata::new();
    for (key, value) in mapping {
        let Some(key) = scalar_to_string(&key) else {
            return Err(FrontmatterError::InvalidKey(format!("{key:?}")));
        };
        metadata.insert(key, yaml_to_strings(value));
    }

    Ok(metadata)
}

fn extract_meta_lines(source: &str) -> (Metadata, &str) {
    let mut metadata = Metadata::new();
    let mut last_key: Option<String> = None;
    let mut consumed = 0;

    for line in source.split_inclusive('\n') {
        let text = line.trim_end_matches(['\n', '\r']);

        if text.trim().is_empty() {
            if last_key.is_some() {
                consumed += line.len();
            }
            break;
        }

        if let Some(caps) = META_LINE.captures(text) {
            let key = caps["key"].to_lowercase();
            let value = caps["value"].trim().to_string();
            metadata.entry(key.clone()).or_default().push(value);
            last_key = Some(key);
        } else if let (Some(key), Some(caps)) = (&last_key, META_CONTINUATION.captures(text)) {
            let value = caps["value"].trim().to_string();
            if let Some(values) = metadata.get_mut(key) {
                // A bare `key:` line introduces a list
                if values.len() == 1 && values[0].is_empty() {
                    values.clear();
                }
                values.push(value);
            }
        } else {
            break;
        }

        consumed += line.len();
    }

    if metadata.is_empty() {
        return (metadata, source);
    }

    (metadata, &source[consumed..])
}

fn scalar_to_string(value: &serde_yaml::Value) -> Option<String> {
    match value {
        serde_yaml::Value::String(s) => Some(s.clone()),
        serde_yaml::Value::Bool(b) => Some(b.to_string()),
        serde_yaml::Value::Number(n) => Some(n.to_string()),
        serde_yaml::Value::Null => Some(String::new()),
        _ => None,
    }
}

fn yaml_to_strings(value: serde_yaml::Value) -> Vec<String> {
    match value {
        serde_yaml::Value::Sequence(items) => items
            .iter()
            .map(|item| scalar_to_string(item).unwrap_or_else(|| flatten(item)))
            .collect(),
        other => vec![scalar_to_string(&other).unwrap_or_else(|| flatten(&other))],
    }
}

fn flatten(value: &serde_yaml::Value) -> String {
    serde_yaml::to_string(value)
        .map(|s| s.trim().to_string())
        .unwrap_or_default()
}

/// Errors that can occur when parsing front matter.
#[derive(Debug, thiserror::Error)]
pub enum FrontmatterError {
    #[error("Invalid YAML in front matter: {0}")]
    InvalidYaml(String),

    #[error("Front matter must be a mapping of keys to values")]
    NotAMapping,

    #[error("Front matter key must be a scalar: {0}")]
    InvalidKey(String),
}
