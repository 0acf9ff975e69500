//! Page metadata from `+++` TOML front matter.

use serde::{Deserialize, Serialize};

/// Deserialize a string list, treating a bare string as a one-element list
fn deserialize_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
    }

    Ok(match Option::<OneOrMany>::deserialize(deserializer)? {
        Some(OneOrMany::One(item)) => vec![item],
        Some(OneOrMany::Many(items)) => items,
        None => Vec::new(),
    })
}

/// Page metadata from front matter
///
/// | Field        | Type          | Description                          |
/// |--------------|---------------|--------------------------------------|
/// | `title`      | `String`      | Page title                           |
/// | `date`       | `String`      | Publication date                     |
/// | `draft`      | `bool`        | Draft status (default: false)        |
/// | `tags`       | `Vec<String>` | Tags                                 |
/// | `categories` | `Vec<String>` | Categories                           |
/// | `section`    | `String`      | Overrides the directory-based section |
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PageMeta {
    pub title: Option<String>,
    pub date: Option<String>,
    pub draft: bool,
    #[serde(deserialize_with = "deserialize_list")]
    pub tags: Vec<String>,
    #[serde(deserialize_with = "deserialize_list")]
    pub categories: Vec<String>,
    pub section: Option<String>,
}

const DELIMITER: &str = "+++";

/// Split a document into its front matter and body.
///
/// Returns `None` for the front matter when the document has no `+++` block.
pub fn split_front_matter(source: &str) -> (Option<&str>, &str) {
    let Some(rest) = source
        .strip_prefix(DELIMITER)
        .and_then(|r| r.strip_prefix('\n').or_else(|| r.strip_prefix("\r\n")))
    else {
        return (None, source);
    };

    let mut offset = 0;
    for line in rest.split_inclusive('\n') {
        if line.trim_end() == DELIMITER {
            let body = &rest[offset + line.len()..];
            return (Some(&rest[..offset]), body);
        }
        offset += line.len();
    }
    // Unterminated block: treat the whole document as body
    (None, source)
}

/// Parse front matter into metadata.
pub fn parse(front_matter: &str) -> Result<PageMeta, toml::de::Error> {
    toml::from_str(front_matter)
}
