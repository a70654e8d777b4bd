//! Core data structures for the contentvault application.
//!
//! An [`Item`] is the only persisted entity: either a free-text note or a
//! saved link. A [`NewItem`] is what callers hand to the store when saving.
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{normalize_tags, trim_to_option, Result, VaultError};

/// Discriminates notes from links. Serialized as `"note"` / `"link"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    Note,
    Link,
}

impl fmt::Display for ItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ItemKind::Note => write!(f, "note"),
            ItemKind::Link => write!(f, "link"),
        }
    }
}

/// Represents a single saved note or link.
///
/// Field names follow the on-disk snapshot format (`type`, `createdAt`,
/// `updatedAt`); absent optional fields are omitted from the JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    /// Unique identifier, assigned at creation
    pub id: String,
    /// Whether this is a note or a link
    #[serde(rename = "type")]
    pub kind: ItemKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Note content, or commentary on a link
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    /// Target address as given by the caller (links only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Lowercase tags in insertion order
    #[serde(default)]
    pub tags: Vec<String>,
    /// When the item was created
    pub created_at: DateTime<Utc>,
    /// Set when a duplicate-link save merged new data into this item
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Item {
    pub fn is_link(&self) -> bool {
        self.kind == ItemKind::Link
    }

    /// Returns the title if set, otherwise the URL, otherwise a placeholder.
    pub fn display_title(&self) -> &str {
        self.title
            .as_deref()
            .or(self.url.as_deref())
            .unwrap_or("(Untitled)")
    }
}

/// A save candidate, as supplied by a caller.
///
/// Text fields are trimmed and tags normalized when the candidate becomes an
/// [`Item`]; the store never keeps surrounding whitespace.
#[derive(Debug, Clone, PartialEq)]
pub struct NewItem {
    pub kind: ItemKind,
    pub title: Option<String>,
    pub body: Option<String>,
    pub url: Option<String>,
    pub tags: Vec<String>,
}

impl NewItem {
    /// Creates a note candidate with the given body text.
    pub fn note(body: impl Into<String>) -> Self {
        Self {
            kind: ItemKind::Note,
            title: None,
            body: Some(body.into()),
            url: None,
            tags: Vec::new(),
        }
    }

    /// Creates a link candidate for the given URL.
    pub fn link(url: impl Into<String>) -> Self {
        Self {
            kind: ItemKind::Link,
            title: None,
            body: None,
            url: Some(url.into()),
            tags: Vec::new(),
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    /// The trimmed URL of a link candidate, or an error if it is missing or blank.
    pub(crate) fn link_url(&self) -> Result<String> {
        trim_to_option(self.url.as_deref()).ok_or_else(|| VaultError::InvalidItem {
            message: "a link requires a non-empty URL".to_string(),
        })
    }

    /// Builds the stored item. Notes never carry a URL.
    pub(crate) fn into_item(self, id: String, now: DateTime<Utc>) -> Result<Item> {
        let url = match self.kind {
            ItemKind::Link => Some(self.link_url()?),
            ItemKind::Note => None,
        };

        Ok(Item {
            id,
            kind: self.kind,
            title: trim_to_option(self.title.as_deref()),
            body: trim_to_option(self.body.as_deref()),
            url,
            tags: normalize_tags(&self.tags),
            created_at: now,
            updated_at: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_field_names() {
        let now = "2024-01-01T00:00:00Z".parse().unwrap();
        let item = NewItem::link(" https://example.com ")
            .with_tags(["Rust"])
            .into_item("abc".to_string(), now)
            .unwrap();

        let value = serde_json::to_value(&item).unwrap();
        assert_eq!(value["type"], "link");
        assert!(value["createdAt"]
            .as_str()
            .unwrap()
            .starts_with("2024-01-01T00:00:00"));
        assert_eq!(value["url"], "https://example.com");
        assert_eq!(value["tags"], serde_json::json!(["rust"]));
        assert!(value.get("title").is_none());
        assert!(value.get("updatedAt").is_none());
    }

    #[test]
    fn reads_javascript_style_timestamps() {
        let raw = r#"{"id":"x1","type":"note","body":"hi","tags":[],"createdAt":"2024-06-01T12:30:00.000Z"}"#;
        let item: Item = serde_json::from_str(raw).unwrap();
        assert_eq!(item.kind, ItemKind::Note);
        assert_eq!(item.created_at.to_rfc3339(), "2024-06-01T12:30:00+00:00");
        assert!(item.updated_at.is_none());
    }

    #[test]
    fn link_requires_url() {
        let now = Utc::now();
        let err = NewItem::link("   ")
            .into_item("id".to_string(), now)
            .unwrap_err();
        assert!(matches!(err, VaultError::InvalidItem { .. }));
    }

    #[test]
    fn note_drops_url_and_blank_fields() {
        let mut candidate = NewItem::note("  body text  ").with_title("   ");
        candidate.url = Some("https://ignored.example".to_string());

        let item = candidate.into_item("id".to_string(), Utc::now()).unwrap();
        assert_eq!(item.url, None);
        assert_eq!(item.title, None);
        assert_eq!(item.body.as_deref(), Some("body text"));
        assert_eq!(item.display_title(), "(Untitled)");
    }
}
