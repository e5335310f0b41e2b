//! Scheduled-publish sweep: promotes due scheduled posts to published.

use std::str::FromStr;
use std::sync::Arc;

use apalis::prelude::{Data, Error as ApalisError};
use apalis_cron::Schedule;
use serde_json::json;
use time::OffsetDateTime;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::application::notify::NotificationDispatcher;
use crate::application::repos::{AutomationLogRepo, PostsRepo, PostsWriteRepo, RepoError};
use crate::domain::entities::{AutomationLogRecord, PostRecord};
use crate::domain::types::{AutomationStatus, AutomationType};
use crate::infra::db::PostgresRepositories;

use super::job_failed;

/// Result of one sweep pass. Only posts whose conditional update landed
/// are listed; posts that failed or lost a concurrent race are not.
#[derive(Debug, Default)]
pub struct SweepOutcome {
    pub published: Vec<PostRecord>,
    pub failed: u32,
}

impl SweepOutcome {
    pub fn transition_count(&self) -> usize {
        self.published.len()
    }
}

/// One stateless pass: select due scheduled posts and transition each
/// independently. A failing post is skipped, never aborting the batch.
/// Re-running with nothing due is a no-op.
pub async fn run_publish_sweep<R>(
    repos: &R,
    now: OffsetDateTime,
) -> Result<SweepOutcome, RepoError>
where
    R: PostsRepo + PostsWriteRepo + AutomationLogRepo + ?Sized,
{
    let due = repos.list_due_scheduled(now).await?;
    let mut outcome = SweepOutcome::default();

    for post in due {
        match repos.mark_published_if_scheduled(post.id, now).await {
            Ok(Some(updated)) => {
                append_sweep_log(repos, updated.id, updated.published_at.unwrap_or(now)).await;
                info!(
                    target = "application::jobs::sweep",
                    slug = updated.slug,
                    "scheduled post published"
                );
                outcome.published.push(updated);
            }
            Ok(None) => {
                // Guard did not match: a concurrent sweep or an admin edit
                // got there first. Nothing to log.
                info!(
                    target = "application::jobs::sweep",
                    slug = post.slug,
                    "post no longer scheduled, skipping"
                );
            }
            Err(err) => {
                warn!(
                    target = "application::jobs::sweep",
                    slug = post.slug,
                    error = %err,
                    "failed to transition due post"
                );
                outcome.failed += 1;
            }
        }
    }

    if outcome.transition_count() > 0 || outcome.failed > 0 {
        metrics::counter!("stillpoint_sweep_published_total")
            .increment(outcome.transition_count() as u64);
        metrics::counter!("stillpoint_sweep_failed_total").increment(u64::from(outcome.failed));
    }

    Ok(outcome)
}

async fn append_sweep_log<A: AutomationLogRepo + ?Sized>(
    audit: &A,
    post_id: Uuid,
    published_at: OffsetDateTime,
) {
    let record = AutomationLogRecord {
        id: Uuid::new_v4(),
        post_id: Some(post_id),
        automation_type: AutomationType::ScheduledPublish.as_str().to_string(),
        status: AutomationStatus::Success.as_str().to_string(),
        details: json!({
            "published_at": published_at
                .format(&time::format_description::well_known::Rfc3339)
                .unwrap_or_default(),
        }),
        created_at: OffsetDateTime::now_utc(),
    };

    if let Err(err) = audit.append_log(record).await {
        error!(
            target = "application::jobs::sweep",
            error = %err,
            "failed to append automation log"
        );
    }
}

/// Marker struct for the cron-triggered sweep.
/// Must implement `From<chrono::DateTime<chrono::Utc>>` for apalis-cron.
#[derive(Default, Debug, Clone)]
pub struct PublishSweepJob;

impl From<chrono::DateTime<chrono::Utc>> for PublishSweepJob {
    fn from(_: chrono::DateTime<chrono::Utc>) -> Self {
        Self
    }
}

#[derive(Clone)]
pub struct SweepWorkerContext {
    pub repositories: Arc<PostgresRepositories>,
    pub notifications: Arc<NotificationDispatcher>,
}

/// Process one cron tick: run the sweep, then fan out notifications for
/// every transitioned post. Dispatch failures never fail the job; the
/// publish itself already committed.
pub async fn process_publish_sweep_job(
    _job: PublishSweepJob,
    ctx: Data<SweepWorkerContext>,
) -> Result<(), ApalisError> {
    let repos = ctx.repositories.as_ref();
    let outcome = run_publish_sweep(repos, OffsetDateTime::now_utc())
        .await
        .map_err(job_failed)?;

    if outcome.transition_count() > 0 {
        info!(
            target = "application::jobs::sweep",
            published = outcome.transition_count(),
            failed = outcome.failed,
            "publish sweep completed"
        );
    }

    for post in &outcome.published {
        ctx.notifications.dispatch_post_published(post).await;
    }

    Ok(())
}

/// Cron schedule for the sweep; the expression comes from configuration
/// and is validated at startup.
pub fn publish_sweep_schedule(expression: &str) -> Result<Schedule, String> {
    Schedule::from_str(expression)
        .map_err(|err| format!("invalid sweep cron expression `{expression}`: {err}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_schedule_expression_parses() {
        let schedule = publish_sweep_schedule("0 * * * * *").unwrap();
        let upcoming: Vec<_> = schedule.upcoming(chrono::Utc).take(2).collect();
        assert_eq!(upcoming.len(), 2);
    }

    #[test]
    fn malformed_schedule_expression_is_reported() {
        assert!(publish_sweep_schedule("whenever").is_err());
    }
}
