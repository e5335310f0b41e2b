use async_trait::async_trait;

use crate::application::repos::{RepoError, SubscribersRepo};
use crate::domain::entities::SubscriberRecord;

use super::{PostgresRepositories, map_sqlx_error};

#[async_trait]
impl SubscribersRepo for PostgresRepositories {
    async fn list_active(&self) -> Result<Vec<SubscriberRecord>, RepoError> {
        sqlx::query_as::<_, SubscriberRecord>(
            "SELECT id, email, confirmed, preferences, unsubscribed_at, created_at \
             FROM subscribers \
             WHERE unsubscribed_at IS NULL AND confirmed = true \
             ORDER BY created_at",
        )
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)
    }
}
