//! Post-publish side effects: subscriber email fan-out and webhook POSTs.
//!
//! Dispatch is fire-and-forget relative to the publish transaction. Both
//! actions are independently gated by flags on the post; each attempt
//! appends exactly one automation log entry and failures are visible
//! only through that audit trail.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use serde_json::json;
use time::OffsetDateTime;
use tracing::{error, info, warn};
use url::Url;
use uuid::Uuid;

use crate::application::repos::{AutomationLogRepo, SubscribersRepo};
use crate::domain::entities::{AutomationLogRecord, PostRecord};
use crate::domain::types::{AutomationStatus, AutomationType};

const DISPATCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Outbound webhook body describing a freshly published post.
#[derive(Debug, Serialize, PartialEq)]
pub struct WebhookPayload {
    pub title: String,
    pub excerpt: String,
    pub slug: String,
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    pub category: String,
    pub tags: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub published_at: Option<String>,
}

impl WebhookPayload {
    pub fn for_post(post: &PostRecord, site_url: &Url) -> Self {
        let url = site_url
            .join(&format!("posts/{}", post.slug))
            .map(String::from)
            .unwrap_or_else(|_| format!("{site_url}posts/{}", post.slug));

        Self {
            title: post.title.clone(),
            excerpt: post.excerpt.clone(),
            slug: post.slug.clone(),
            url,
            image_url: post.image_url.clone(),
            category: post.category.clone(),
            tags: post.tags.clone(),
            published_at: post.published_at.and_then(|at| {
                at.format(&time::format_description::well_known::Rfc3339)
                    .ok()
            }),
        }
    }
}

/// Thin client for an HTTP email delivery API.
#[derive(Clone)]
pub struct EmailClient {
    http: reqwest::Client,
    base_url: Url,
    sender: String,
    authorization_token: String,
}

impl EmailClient {
    pub fn new(base_url: Url, sender: String, authorization_token: String) -> Self {
        Self {
            http: reqwest::Client::builder()
                .timeout(DISPATCH_TIMEOUT)
                .build()
                .unwrap_or_default(),
            base_url,
            sender,
            authorization_token,
        }
    }

    pub async fn send(
        &self,
        recipient: &str,
        subject: &str,
        body_text: &str,
    ) -> Result<(), reqwest::Error> {
        let endpoint = self
            .base_url
            .join("email")
            .unwrap_or_else(|_| self.base_url.clone());

        self.http
            .post(endpoint)
            .header("X-Server-Token", &self.authorization_token)
            .json(&json!({
                "from": self.sender,
                "to": recipient,
                "subject": subject,
                "text_body": body_text,
            }))
            .send()
            .await?
            .error_for_status()?;

        Ok(())
    }
}

pub struct NotificationDispatcher {
    subscribers: Arc<dyn SubscribersRepo>,
    audit: Arc<dyn AutomationLogRepo>,
    email: Option<EmailClient>,
    http: reqwest::Client,
    site_url: Url,
}

impl NotificationDispatcher {
    pub fn new(
        subscribers: Arc<dyn SubscribersRepo>,
        audit: Arc<dyn AutomationLogRepo>,
        email: Option<EmailClient>,
        site_url: Url,
    ) -> Self {
        Self {
            subscribers,
            audit,
            email,
            http: reqwest::Client::builder()
                .timeout(DISPATCH_TIMEOUT)
                .build()
                .unwrap_or_default(),
            site_url,
        }
    }

    /// Fire the side effects a publish event calls for. Never fails:
    /// outcomes land in the automation log only.
    pub async fn dispatch_post_published(&self, post: &PostRecord) {
        if post.email_notify_enabled {
            self.dispatch_emails(post).await;
        }

        if post.social_share_enabled {
            match post.zapier_webhook_url.as_deref() {
                Some(webhook_url) => self.dispatch_webhook(post, webhook_url).await,
                None => warn!(
                    target = "application::notify",
                    slug = post.slug,
                    "social share enabled but no webhook url configured"
                ),
            }
        }
    }

    async fn dispatch_emails(&self, post: &PostRecord) {
        let Some(client) = &self.email else {
            warn!(
                target = "application::notify",
                slug = post.slug,
                "email notify enabled but no email client configured"
            );
            self.append_log(
                post.id,
                AutomationType::EmailNotification,
                AutomationStatus::Failed,
                json!({ "reason": "email delivery not configured" }),
            )
            .await;
            return;
        };

        let recipients = match self.subscribers.list_active().await {
            Ok(active) => active
                .into_iter()
                .filter(|subscriber| subscriber.wants_post_emails())
                .collect::<Vec<_>>(),
            Err(err) => {
                self.append_log(
                    post.id,
                    AutomationType::EmailNotification,
                    AutomationStatus::Failed,
                    json!({ "reason": err.to_string() }),
                )
                .await;
                return;
            }
        };

        let subject = format!("New from Stillpoint: {}", post.title);
        let body_text = format!(
            "{}\n\nRead it here: {}posts/{}",
            post.excerpt, self.site_url, post.slug
        );

        let mut sent = 0u32;
        let mut failures = 0u32;
        for subscriber in &recipients {
            match client.send(&subscriber.email, &subject, &body_text).await {
                Ok(()) => sent += 1,
                Err(err) => {
                    failures += 1;
                    warn!(
                        target = "application::notify",
                        slug = post.slug,
                        error = %err,
                        "email send failed"
                    );
                }
            }
        }

        let status = if failures == 0 {
            AutomationStatus::Success
        } else {
            AutomationStatus::Failed
        };

        metrics::counter!("stillpoint_emails_sent_total").increment(u64::from(sent));
        if failures > 0 {
            metrics::counter!("stillpoint_dispatch_failures_total").increment(u64::from(failures));
        }

        info!(
            target = "application::notify",
            slug = post.slug,
            sent,
            failures,
            "email notification dispatched"
        );

        self.append_log(
            post.id,
            AutomationType::EmailNotification,
            status,
            json!({ "recipients": recipients.len(), "sent": sent, "failed": failures }),
        )
        .await;
    }

    async fn dispatch_webhook(&self, post: &PostRecord, webhook_url: &str) {
        let payload = WebhookPayload::for_post(post, &self.site_url);

        let result = self
            .http
            .post(webhook_url)
            .json(&payload)
            .send()
            .await
            .and_then(|response| response.error_for_status());

        let (status, details) = match result {
            Ok(_) => (
                AutomationStatus::Success,
                json!({ "webhook_url": webhook_url }),
            ),
            Err(err) => {
                metrics::counter!("stillpoint_dispatch_failures_total").increment(1);
                warn!(
                    target = "application::notify",
                    slug = post.slug,
                    error = %err,
                    "webhook dispatch failed"
                );
                (
                    AutomationStatus::Failed,
                    json!({ "webhook_url": webhook_url, "reason": err.to_string() }),
                )
            }
        };

        self.append_log(post.id, AutomationType::SocialShare, status, details)
            .await;
    }

    async fn append_log(
        &self,
        post_id: Uuid,
        automation_type: AutomationType,
        status: AutomationStatus,
        details: serde_json::Value,
    ) {
        let record = AutomationLogRecord {
            id: Uuid::new_v4(),
            post_id: Some(post_id),
            automation_type: automation_type.as_str().to_string(),
            status: status.as_str().to_string(),
            details,
            created_at: OffsetDateTime::now_utc(),
        };

        if let Err(err) = self.audit.append_log(record).await {
            error!(
                target = "application::notify",
                error = %err,
                "failed to append automation log"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::PostStatus;

    fn published_post() -> PostRecord {
        PostRecord {
            id: Uuid::new_v4(),
            slug: "body-scan-basics".into(),
            title: "Body Scan Basics".into(),
            excerpt: "A gentle introduction.".into(),
            content: "Start at the crown of the head.".into(),
            author: "Mara".into(),
            category: "meditation".into(),
            tags: vec!["beginner".into()],
            image_url: None,
            status: PostStatus::Published,
            scheduled_at: None,
            published_at: Some(time::macros::datetime!(2025-06-15 09:00 UTC)),
            featured: false,
            social_share_enabled: true,
            email_notify_enabled: true,
            zapier_webhook_url: None,
            created_at: OffsetDateTime::now_utc(),
            updated_at: OffsetDateTime::now_utc(),
        }
    }

    #[test]
    fn webhook_payload_carries_the_canonical_post_url() {
        let site = Url::parse("https://stillpoint.example/").unwrap();
        let payload = WebhookPayload::for_post(&published_post(), &site);
        assert_eq!(payload.url, "https://stillpoint.example/posts/body-scan-basics");
        assert_eq!(
            payload.published_at.as_deref(),
            Some("2025-06-15T09:00:00Z")
        );
    }
}
