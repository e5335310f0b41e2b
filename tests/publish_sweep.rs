mod common;

use time::OffsetDateTime;
use time::ext::NumericalDuration;

use common::{MemoryRepositories, scheduled_post};
use stillpoint::application::jobs::run_publish_sweep;
use stillpoint::domain::types::{AutomationType, PostStatus};

#[tokio::test]
async fn due_posts_are_published_and_logged() {
    let repos = MemoryRepositories::default();
    let now = OffsetDateTime::now_utc();
    let due_id = repos.insert_post(scheduled_post("morning-sit", now - 1.hours()));
    let future_id = repos.insert_post(scheduled_post("evening-sit", now + 1.hours()));

    let outcome = run_publish_sweep(&repos, now).await.unwrap();

    assert_eq!(outcome.transition_count(), 1);
    assert_eq!(outcome.failed, 0);

    let published = repos.post(due_id).unwrap();
    assert_eq!(published.status, PostStatus::Published);
    assert_eq!(published.published_at, Some(now));
    assert!(published.scheduled_at.is_none());

    let untouched = repos.post(future_id).unwrap();
    assert_eq!(untouched.status, PostStatus::Scheduled);
    assert!(untouched.published_at.is_none());

    let logs = repos.logs_of_type(AutomationType::ScheduledPublish.as_str());
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].post_id, Some(due_id));
    assert_eq!(logs[0].status, "success");
}

#[tokio::test]
async fn rerunning_the_sweep_is_a_noop() {
    let repos = MemoryRepositories::default();
    let now = OffsetDateTime::now_utc();
    repos.insert_post(scheduled_post("morning-sit", now - 1.hours()));

    let first = run_publish_sweep(&repos, now).await.unwrap();
    assert_eq!(first.transition_count(), 1);

    let second = run_publish_sweep(&repos, now).await.unwrap();
    assert_eq!(second.transition_count(), 0);
    assert_eq!(second.failed, 0);

    let logs = repos.logs_of_type(AutomationType::ScheduledPublish.as_str());
    assert_eq!(logs.len(), 1);
}

#[tokio::test]
async fn a_failing_post_does_not_abort_the_batch() {
    let repos = MemoryRepositories::default();
    let now = OffsetDateTime::now_utc();
    let poisoned = repos.insert_post(scheduled_post("stuck-post", now - 2.hours()));
    let healthy = repos.insert_post(scheduled_post("healthy-post", now - 1.hours()));
    repos.fail_writes_for(poisoned);

    let outcome = run_publish_sweep(&repos, now).await.unwrap();

    assert_eq!(outcome.transition_count(), 1);
    assert_eq!(outcome.failed, 1);
    assert_eq!(outcome.published[0].id, healthy);

    assert_eq!(repos.post(poisoned).unwrap().status, PostStatus::Scheduled);
    assert_eq!(repos.post(healthy).unwrap().status, PostStatus::Published);

    // Only the landed transition is audited.
    let logs = repos.logs_of_type(AutomationType::ScheduledPublish.as_str());
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].post_id, Some(healthy));
}

#[tokio::test]
async fn already_published_posts_are_never_reselected() {
    let repos = MemoryRepositories::default();
    let now = OffsetDateTime::now_utc();
    let mut stale = scheduled_post("old-post", now - 3.days());
    stale.status = PostStatus::Published;
    stale.published_at = Some(now - 3.days());
    let id = repos.insert_post(stale);

    let outcome = run_publish_sweep(&repos, now).await.unwrap();

    assert_eq!(outcome.transition_count(), 0);
    assert_eq!(repos.post(id).unwrap().published_at, Some(now - 3.days()));
    assert!(
        repos
            .logs_of_type(AutomationType::ScheduledPublish.as_str())
            .is_empty()
    );
}
