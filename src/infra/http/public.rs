use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use tracing::error;

use crate::application::content::ContentResolver;
use crate::infra::db::PostgresRepositories;

use super::error::ApiError;

#[derive(Clone)]
pub struct PublicState {
    pub content: Arc<ContentResolver>,
    pub db: Arc<PostgresRepositories>,
}

pub fn build_public_router(state: PublicState) -> Router {
    Router::new()
        .route("/healthz", get(health))
        .route("/posts", get(list_posts))
        .route("/posts/{slug}", get(get_post))
        .with_state(state)
}

async fn health(State(state): State<PublicState>) -> Response {
    match state.db.health_check().await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => {
            error!(target = "infra::http::public", error = %err, "health check failed");
            StatusCode::SERVICE_UNAVAILABLE.into_response()
        }
    }
}

async fn list_posts(State(state): State<PublicState>) -> Result<Response, ApiError> {
    let posts = state.content.list().await.map_err(|err| {
        error!(target = "infra::http::public", error = %err, "failed to resolve posts");
        ApiError::internal("failed to load posts")
    })?;
    Ok(Json(posts).into_response())
}

async fn get_post(
    State(state): State<PublicState>,
    Path(slug): Path<String>,
) -> Result<Response, ApiError> {
    let post = state.content.find_by_slug(&slug).await.map_err(|err| {
        error!(target = "infra::http::public", error = %err, "failed to resolve post");
        ApiError::internal("failed to load post")
    })?;

    match post {
        Some(post) => Ok(Json(post).into_response()),
        None => Err(ApiError::not_found(format!("no post with slug `{slug}`"))),
    }
}
