//! Schemaless documents and their field values.
//!
//! Every record in the store is a flat map of named fields. Write paths may
//! carry the [`Field::ServerTime`] sentinel, which the backend swaps for its
//! own clock at commit time; a stored document never contains it.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use crate::error::{Result, StoreError};

/// A single field value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Field {
    /// UTF-8 text.
    Text(String),
    /// A concrete UTC timestamp.
    Timestamp(DateTime<Utc>),
    /// Placeholder resolved against the backend clock at write time.
    ServerTime,
}

impl Field {
    pub fn text(value: impl Into<String>) -> Self {
        Field::Text(value.into())
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Field::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_timestamp(&self) -> Option<DateTime<Utc>> {
        match self {
            Field::Timestamp(ts) => Some(*ts),
            _ => None,
        }
    }
}

/// A flat map of named fields.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Document {
    fields: BTreeMap<String, Field>,
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, name: impl Into<String>, value: Field) -> Self {
        self.fields.insert(name.into(), value);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: Field) {
        self.fields.insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Option<&Field> {
        self.fields.get(name)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Typed accessor for a required text field.
    pub fn text(&self, name: &'static str) -> Result<&str> {
        match self.fields.get(name) {
            Some(Field::Text(s)) => Ok(s),
            Some(_) => Err(StoreError::Malformed {
                field: name,
                expected: "text",
            }),
            None => Err(StoreError::MissingField(name)),
        }
    }

    /// Typed accessor for a required timestamp field.
    pub fn timestamp(&self, name: &'static str) -> Result<DateTime<Utc>> {
        match self.fields.get(name) {
            Some(Field::Timestamp(ts)) => Ok(*ts),
            Some(_) => Err(StoreError::Malformed {
                field: name,
                expected: "timestamp",
            }),
            None => Err(StoreError::MissingField(name)),
        }
    }

    /// Text accessor for a field that may legitimately be absent.
    pub fn text_opt(&self, name: &str) -> Option<&str> {
        self.fields.get(name).and_then(Field::as_text)
    }

    /// Timestamp accessor for a field that may legitimately be absent.
    pub fn timestamp_opt(&self, name: &str) -> Option<DateTime<Utc>> {
        self.fields.get(name).and_then(Field::as_timestamp)
    }

    /// Overwrites or adds every field present in `patch`. Fields absent from
    /// the patch are left untouched.
    pub fn merge_from(&mut self, patch: &Document) {
        for (name, value) in &patch.fields {
            self.fields.insert(name.clone(), value.clone());
        }
    }

    /// Replaces every [`Field::ServerTime`] sentinel with `now`.
    pub fn resolve_server_time(&mut self, now: DateTime<Utc>) {
        for value in self.fields.values_mut() {
            if matches!(value, Field::ServerTime) {
                *value = Field::Timestamp(now);
            }
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Field)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_typed_accessors() {
        let ts = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let doc = Document::new()
            .with("username", Field::text("alice"))
            .with("lastSeen", Field::Timestamp(ts));

        assert_eq!(doc.text("username").unwrap(), "alice");
        assert_eq!(doc.timestamp("lastSeen").unwrap(), ts);
        assert_eq!(doc.text("missing"), Err(StoreError::MissingField("missing")));
        assert_eq!(
            doc.text("lastSeen"),
            Err(StoreError::Malformed {
                field: "lastSeen",
                expected: "text",
            })
        );
    }

    #[test]
    fn test_merge_overwrites_and_adds() {
        let mut doc = Document::new()
            .with("bio", Field::text("old"))
            .with("username", Field::text("alice"));
        let patch = Document::new()
            .with("bio", Field::text("new"))
            .with("bannerURL", Field::text("banner"));

        doc.merge_from(&patch);

        assert_eq!(doc.text("bio").unwrap(), "new");
        assert_eq!(doc.text("username").unwrap(), "alice");
        assert_eq!(doc.text("bannerURL").unwrap(), "banner");
    }

    #[test]
    fn test_server_time_resolution() {
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let mut doc = Document::new()
            .with("createdAt", Field::ServerTime)
            .with("text", Field::text("hi"));

        doc.resolve_server_time(now);

        assert_eq!(doc.timestamp("createdAt").unwrap(), now);
        assert_eq!(doc.text("text").unwrap(), "hi");
    }
}
