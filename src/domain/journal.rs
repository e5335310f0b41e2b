//! Dream journal entries and client-side filtering.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JournalEntry {
    pub id: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub body: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl JournalEntry {
    pub fn new(title: Option<String>, body: String, tags: Vec<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            title,
            body,
            tags,
            created_at: OffsetDateTime::now_utc(),
        }
    }

    fn matches(&self, needle: &str) -> bool {
        let haystack_hit = |text: &str| text.to_lowercase().contains(needle);
        self.title.as_deref().is_some_and(haystack_hit)
            || haystack_hit(&self.body)
            || self.tags.iter().any(|tag| haystack_hit(tag))
    }
}

/// Case-insensitive substring filter across title, body, and tags.
/// An empty query matches everything.
pub fn filter_entries<'a>(entries: &'a [JournalEntry], query: &str) -> Vec<&'a JournalEntry> {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return entries.iter().collect();
    }
    entries
        .iter()
        .filter(|entry| entry.matches(&needle))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(title: Option<&str>, body: &str, tags: &[&str]) -> JournalEntry {
        JournalEntry::new(
            title.map(str::to_string),
            body.to_string(),
            tags.iter().map(|tag| tag.to_string()).collect(),
        )
    }

    #[test]
    fn empty_query_returns_all_entries() {
        let entries = vec![entry(None, "flying over water", &[])];
        assert_eq!(filter_entries(&entries, "  ").len(), 1);
    }

    #[test]
    fn filter_is_case_insensitive_across_fields() {
        let entries = vec![
            entry(Some("Lucid"), "a quiet forest", &["recurring"]),
            entry(None, "falling", &[]),
        ];
        assert_eq!(filter_entries(&entries, "LUCID").len(), 1);
        assert_eq!(filter_entries(&entries, "forest").len(), 1);
        assert_eq!(filter_entries(&entries, "RECURRING").len(), 1);
        assert!(filter_entries(&entries, "ocean").is_empty());
    }
}
