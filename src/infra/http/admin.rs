use std::sync::Arc;

use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use tracing::warn;

use crate::application::admin::{AdminGatewayService, AdminRequest, AdminResponse, GatewayError};

#[derive(Clone)]
pub struct AdminHttpState {
    pub gateway: Arc<AdminGatewayService>,
}

pub fn build_admin_router(state: AdminHttpState) -> Router {
    Router::new()
        .route("/admin/api", post(handle_admin_request))
        .with_state(state)
}

async fn handle_admin_request(
    State(state): State<AdminHttpState>,
    body: Result<Json<AdminRequest>, JsonRejection>,
) -> (StatusCode, Json<AdminResponse>) {
    let Json(request) = match body {
        Ok(body) => body,
        Err(rejection) => {
            return (
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(error_envelope(
                    "validation_failed",
                    rejection.body_text(),
                )),
            );
        }
    };

    match state.gateway.handle(request).await {
        Ok(response) => (StatusCode::OK, Json(response)),
        Err(err) => {
            let (status, code) = match &err {
                GatewayError::Unauthorized => (StatusCode::UNAUTHORIZED, "unauthorized"),
                GatewayError::Validation(_) => {
                    (StatusCode::UNPROCESSABLE_ENTITY, "validation_failed")
                }
                GatewayError::NotFound => (StatusCode::NOT_FOUND, "not_found"),
                GatewayError::Store(inner) => {
                    warn!(target = "infra::http::admin", error = %inner, "store failure");
                    (StatusCode::INTERNAL_SERVER_ERROR, "store_failure")
                }
            };
            (status, Json(error_envelope(code, err.to_string())))
        }
    }
}

fn error_envelope(code: &str, details: impl Into<String>) -> AdminResponse {
    AdminResponse {
        success: false,
        error: Some(code.to_string()),
        details: Some(details.into()),
        ..AdminResponse::default()
    }
}
