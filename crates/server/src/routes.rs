//! HTTP surface: `/health`, `/answer`, and `/engine/turn`.

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    http::{header, HeaderValue, Method, StatusCode},
    middleware::from_fn_with_state,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use tower_http::cors::CorsLayer;
use tracing::{info, warn};
use uuid::Uuid;

use answer_agent::{AnswerService, TurnOutcome, TurnService};
use answer_core::{
    AnswerRequest, AnswerResponse, ApplicationError, DomainError, EngineInput, InterfaceError,
};

use crate::auth::{enforce_rate_limit, require_bearer_auth, AuthState, RateLimitState};
use crate::health::{health, HealthState};

#[derive(Clone)]
pub struct AppState {
    pub answers: Arc<AnswerService>,
    pub turns: Arc<TurnService>,
}

pub struct RouterSettings {
    pub auth: AuthState,
    pub rate_limit: RateLimitState,
    pub cors_origins: Vec<String>,
}

/// Authentication runs before rate limiting so rejected tokens never open a window.
pub fn build_router(
    state: AppState,
    health_state: HealthState,
    settings: RouterSettings,
) -> Router {
    let api = Router::new()
        .route("/answer", post(answer))
        .route("/engine/turn", post(engine_turn))
        .route_layer(from_fn_with_state(settings.rate_limit, enforce_rate_limit))
        .route_layer(from_fn_with_state(settings.auth, require_bearer_auth))
        .with_state(state);

    let router = Router::new()
        .route("/health", get(health))
        .with_state(health_state)
        .merge(api);

    match build_cors(&settings.cors_origins) {
        Some(cors) => router.layer(cors),
        None => router,
    }
}

/// `None` when no origin is configured, which leaves cross-origin requests blocked.
fn build_cors(origins: &[String]) -> Option<CorsLayer> {
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(error) => {
                warn!(event_name = "system.cors.invalid_origin", origin = %origin, error = %error, "ignoring CORS origin");
                None
            }
        })
        .collect();
    if allowed.is_empty() {
        return None;
    }

    Some(
        CorsLayer::new()
            .allow_origin(allowed)
            .allow_methods([Method::GET, Method::POST])
            .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]),
    )
}

pub struct ApiError(InterfaceError);

impl ApiError {
    fn from_application(error: ApplicationError, correlation_id: &str) -> Self {
        Self(error.into_interface(correlation_id))
    }

    fn validation(detail: impl Into<String>, correlation_id: &str) -> Self {
        let error = DomainError::InvalidRequest(vec![detail.into()]);
        Self::from_application(error.into(), correlation_id)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let user_message = self.0.user_message();
        match self.0 {
            InterfaceError::BadRequest { details, correlation_id, .. } => {
                info!(event_name = "http.request.invalid", correlation_id = %correlation_id, details = %details.join("; "), "request rejected");
                (
                    StatusCode::BAD_REQUEST,
                    Json(json!({ "error": "validation_error", "details": details })),
                )
                    .into_response()
            }
            InterfaceError::ServiceUnavailable { message, correlation_id } => {
                warn!(event_name = "http.request.unavailable", correlation_id = %correlation_id, error = %message, "request failed");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    Json(json!({
                        "error": "service_unavailable",
                        "message": user_message,
                        "correlation_id": correlation_id,
                    })),
                )
                    .into_response()
            }
            InterfaceError::Internal { message, correlation_id } => {
                warn!(event_name = "http.request.internal_error", correlation_id = %correlation_id, error = %message, "request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({
                        "error": "internal_error",
                        "message": user_message,
                        "correlation_id": correlation_id,
                    })),
                )
                    .into_response()
            }
        }
    }
}

async fn answer(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<AnswerResponse>, ApiError> {
    let correlation_id = Uuid::new_v4().to_string();
    let Json(body) =
        payload.map_err(|rejection| ApiError::validation(rejection.body_text(), &correlation_id))?;
    let request = AnswerRequest::from_json(body)
        .map_err(|error| ApiError::from_application(error.into(), &correlation_id))?;

    state
        .answers
        .handle_answer_request(&request)
        .await
        .map(Json)
        .map_err(|error| ApiError::from_application(error, &correlation_id))
}

async fn engine_turn(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<TurnOutcome>, ApiError> {
    let correlation_id = Uuid::new_v4().to_string();
    let Json(body) =
        payload.map_err(|rejection| ApiError::validation(rejection.body_text(), &correlation_id))?;
    let (conversation_id, input) =
        parse_turn_body(body).map_err(|detail| ApiError::validation(detail, &correlation_id))?;

    state
        .turns
        .handle_turn(&conversation_id, input)
        .await
        .map(Json)
        .map_err(|error| ApiError::from_application(error, &correlation_id))
}

/// Splits `{conversation_id, ...EngineInput}` into its two parts.
fn parse_turn_body(body: Value) -> Result<(String, EngineInput), String> {
    let Value::Object(mut fields) = body else {
        return Err("body: expected a JSON object".to_owned());
    };

    let conversation_id = match fields.remove("conversation_id") {
        Some(Value::String(id)) if !id.trim().is_empty() => id,
        Some(Value::String(_)) => return Err("conversation_id: must not be empty".to_owned()),
        Some(_) => return Err("conversation_id: expected a string".to_owned()),
        None => return Err("conversation_id: required".to_owned()),
    };

    let input = serde_json::from_value(Value::Object(fields))
        .map_err(|error| format!("engine input: {error}"))?;
    Ok((conversation_id, input))
}
