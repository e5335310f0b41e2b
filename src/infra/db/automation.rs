use async_trait::async_trait;

use crate::application::repos::{AutomationLogRepo, RepoError};
use crate::domain::entities::AutomationLogRecord;

use super::{PostgresRepositories, map_sqlx_error};

#[async_trait]
impl AutomationLogRepo for PostgresRepositories {
    async fn append_log(&self, record: AutomationLogRecord) -> Result<(), RepoError> {
        sqlx::query(
            "INSERT INTO automation_logs (id, post_id, automation_type, status, details, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(record.id)
        .bind(record.post_id)
        .bind(&record.automation_type)
        .bind(&record.status)
        .bind(&record.details)
        .bind(record.created_at)
        .execute(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(())
    }
}
