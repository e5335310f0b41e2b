//! Domain entities mirrored from persistent storage.

use serde::Serialize;
use serde_json::Value as JsonValue;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::domain::types::PostStatus;

#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct PostRecord {
    pub id: Uuid,
    pub slug: String,
    pub title: String,
    pub excerpt: String,
    pub content: String,
    pub author: String,
    pub category: String,
    pub tags: Vec<String>,
    pub image_url: Option<String>,
    pub status: PostStatus,
    #[serde(with = "time::serde::rfc3339::option")]
    pub scheduled_at: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339::option")]
    pub published_at: Option<OffsetDateTime>,
    pub featured: bool,
    pub social_share_enabled: bool,
    pub email_notify_enabled: bool,
    pub zapier_webhook_url: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

/// Append-only audit entry for automation side effects.
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct AutomationLogRecord {
    pub id: Uuid,
    pub post_id: Option<Uuid>,
    pub automation_type: String,
    pub status: String,
    pub details: JsonValue,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct SubscriberRecord {
    pub id: Uuid,
    pub email: String,
    pub confirmed: bool,
    pub preferences: JsonValue,
    #[serde(with = "time::serde::rfc3339::option")]
    pub unsubscribed_at: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl SubscriberRecord {
    /// A subscriber receives post emails unless unsubscribed, unconfirmed,
    /// or the `new_posts` preference is explicitly false.
    pub fn wants_post_emails(&self) -> bool {
        if self.unsubscribed_at.is_some() || !self.confirmed {
            return false;
        }
        self.preferences
            .get("new_posts")
            .and_then(JsonValue::as_bool)
            .unwrap_or(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn subscriber(confirmed: bool, unsubscribed: bool, prefs: JsonValue) -> SubscriberRecord {
        SubscriberRecord {
            id: Uuid::new_v4(),
            email: "calm@example.com".into(),
            confirmed,
            preferences: prefs,
            unsubscribed_at: unsubscribed.then(OffsetDateTime::now_utc),
            created_at: OffsetDateTime::now_utc(),
        }
    }

    #[test]
    fn confirmed_subscriber_with_no_preferences_receives_emails() {
        assert!(subscriber(true, false, json!({})).wants_post_emails());
    }

    #[test]
    fn explicit_false_preference_opts_out() {
        assert!(!subscriber(true, false, json!({"new_posts": false})).wants_post_emails());
    }

    #[test]
    fn unsubscribed_or_unconfirmed_never_receives_emails() {
        assert!(!subscriber(true, true, json!({})).wants_post_emails());
        assert!(!subscriber(false, false, json!({})).wants_post_emails());
    }
}
