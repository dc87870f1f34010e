// Request handlers. Each endpoint re-acquires a credential through the
// CredentialManager, delegates to the activity service, and maps any
// failure to a 500 with the message in the body. `/health` is the one
// exception: it always answers 200 and reports failures in the body.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::Local;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::core::activity::{ActivityRecord, SheetStore};
use crate::core::auth::{AuthBroker, TokenStore};
use crate::http::routes::AppContext;

/// Error leaving the HTTP boundary. Every core failure maps to the same
/// 500 + `{"detail": ...}` shape; callers cannot distinguish an auth
/// failure from a transient network failure by status code (known gap).
pub struct ApiError(String);

impl ApiError {
    fn wrap(prefix: &str, err: impl std::fmt::Display) -> Self {
        let message = format!("{}: {}", prefix, err);
        tracing::error!("{}", message);
        Self(message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "detail": self.0 })),
        )
            .into_response()
    }
}

#[derive(Debug, Deserialize)]
pub struct LogActivityRequest {
    pub activity: String,
}

#[derive(Debug, Deserialize)]
pub struct ActivitiesQuery {
    #[serde(default = "default_limit")]
    pub limit: i64,
}

fn default_limit() -> i64 {
    10
}

pub async fn root() -> Json<Value> {
    Json(json!({ "message": "Activity Logger API is running" }))
}

/// Always 200; upstream failures only flip `sheets_connected` and attach
/// the error text to the body.
pub async fn health<S, T, B>(State(context): State<Arc<AppContext<S, T, B>>>) -> Json<Value>
where
    S: SheetStore,
    T: TokenStore,
    B: AuthBroker,
{
    match check_sheets(&context).await {
        Ok(()) => Json(json!({ "status": "healthy", "sheets_connected": true })),
        Err(err) => {
            tracing::error!("Health check failed: {}", err);
            Json(json!({
                "status": "unhealthy",
                "sheets_connected": false,
                "error": err,
            }))
        }
    }
}

/// Proves connectivity end to end: a usable credential plus one read.
async fn check_sheets<S, T, B>(context: &AppContext<S, T, B>) -> Result<(), String>
where
    S: SheetStore,
    T: TokenStore,
    B: AuthBroker,
{
    let credential = context
        .credentials
        .acquire()
        .await
        .map_err(|err| err.to_string())?;
    context
        .activities
        .recent(&credential.access_token, 1)
        .await
        .map_err(|err| err.to_string())?;
    Ok(())
}

pub async fn log_activity<S, T, B>(
    State(context): State<Arc<AppContext<S, T, B>>>,
    Json(request): Json<LogActivityRequest>,
) -> Result<Json<Value>, ApiError>
where
    S: SheetStore,
    T: TokenStore,
    B: AuthBroker,
{
    let credential = context
        .credentials
        .acquire()
        .await
        .map_err(|err| ApiError::wrap("Failed to log activity", err))?;

    let result = context
        .activities
        .log(&credential.access_token, &request.activity, Local::now())
        .await
        .map_err(|err| ApiError::wrap("Failed to log activity", err))?;

    Ok(Json(json!({
        "message": "Activity logged successfully",
        "result": result,
    })))
}

pub async fn activities<S, T, B>(
    State(context): State<Arc<AppContext<S, T, B>>>,
    Query(query): Query<ActivitiesQuery>,
) -> Result<Json<Vec<ActivityRecord>>, ApiError>
where
    S: SheetStore,
    T: TokenStore,
    B: AuthBroker,
{
    // Negative limits degenerate to an empty list rather than an error.
    let limit = query.limit.max(0) as usize;

    let credential = context
        .credentials
        .acquire()
        .await
        .map_err(|err| ApiError::wrap("Failed to fetch activities", err))?;

    let records = context
        .activities
        .recent(&credential.access_token, limit)
        .await
        .map_err(|err| ApiError::wrap("Failed to fetch activities", err))?;

    Ok(Json(records))
}
