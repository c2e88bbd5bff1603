use std::env;
use std::sync::Arc;
use std::time::Duration;

use aero_agents::{build_controller, AirlineAgent, AppConfig};
use aero_core::replies::EMPTY_INPUT;
use aero_core::{ChatInput, TurnError};
use aero_ml::TrainingReport;
use aero_observability::{AppMetrics, MetricsSnapshot};
use aero_storage::Store;
use anyhow::Result;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Json, State};
use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;
use serde::{Deserialize, Serialize};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;
use tracing::{debug, error, warn};

pub const SESSION_COOKIE: &str = "aero_session";

const PROCESSING_FAILED: &str = "Error processing your message";
const TURN_TIMED_OUT: &str = "The assistant took too long to respond. Please try again.";
const CHAT_ENDED: &str = "Chat ended.";
const MAX_SESSION_ID_LEN: usize = 128;

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub app: AppConfig,
    pub turn_timeout: Duration,
    /// How often expired sessions are swept from the store.
    pub purge_interval: Duration,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            app: AppConfig::default(),
            turn_timeout: Duration::from_millis(5_000),
            purge_interval: Duration::from_secs(300),
        }
    }
}

impl ApiConfig {
    pub fn from_env() -> Self {
        Self {
            app: AppConfig::from_env(),
            turn_timeout: env::var("AERO_TURN_TIMEOUT_MS")
                .ok()
                .and_then(|value| value.parse::<u64>().ok())
                .filter(|millis| *millis > 0)
                .map(Duration::from_millis)
                .unwrap_or_else(|| Duration::from_millis(5_000)),
            purge_interval: env::var("AERO_PURGE_INTERVAL_SECS")
                .ok()
                .and_then(|value| value.parse::<u64>().ok())
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs)
                .unwrap_or_else(|| Duration::from_secs(300)),
        }
    }
}

#[derive(Clone)]
pub struct ApiState {
    pub agent: AirlineAgent<Store>,
    pub metrics: Arc<AppMetrics>,
    pub training: Arc<TrainingReport>,
    pub turn_timeout: Duration,
    pub session_ttl_seconds: u64,
}

#[derive(Debug, Deserialize)]
struct MessageRequest {
    #[serde(default)]
    message: String,
}

#[derive(Debug, Serialize)]
struct MessageResponse<'a> {
    message: &'a str,
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    timestamp_utc: String,
    model: String,
    intent_tags: usize,
    cv_accuracy: Option<f64>,
    metrics: MetricsSnapshot,
}

pub async fn build_app(config: ApiConfig) -> Result<Router> {
    let metrics = AppMetrics::shared();
    let (controller, training) = build_controller(&config.app, metrics.clone())?;
    let store = Store::from_database_url(config.app.database_url.as_deref()).await?;

    let session_ttl = config.app.session_ttl();
    let agent = AirlineAgent::new(Arc::new(controller), Arc::new(store), metrics.clone())
        .with_session_ttl(session_ttl);

    let sweeper = agent.clone();
    let purge_interval = config.purge_interval;
    tokio::spawn(async move { sweeper.run_session_purge(purge_interval).await });

    let state = ApiState {
        agent,
        metrics,
        training: Arc::new(training),
        turn_timeout: config.turn_timeout,
        session_ttl_seconds: session_ttl.num_seconds().max(0) as u64,
    };

    Ok(build_router(state))
}

pub fn build_router(state: ApiState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/message", post(message))
        .route("/end_chat", post(end_chat))
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(RequestBodyLimitLayer::new(16 * 1024))
        .with_state(state)
}

async fn health(State(state): State<ApiState>) -> impl IntoResponse {
    let payload = HealthResponse {
        status: "ok",
        timestamp_utc: chrono::Utc::now().to_rfc3339(),
        model: state.agent.controller().model_name().to_string(),
        intent_tags: state.training.tags.len(),
        cv_accuracy: state.training.cv_accuracy,
        metrics: state.metrics.snapshot(),
    };
    (StatusCode::OK, Json(payload))
}

async fn message(
    State(state): State<ApiState>,
    headers: HeaderMap,
    payload: Result<Json<MessageRequest>, JsonRejection>,
) -> Response {
    let text = match payload {
        Ok(Json(request)) => request.message,
        Err(rejection) => {
            debug!(error = %rejection, "unreadable message body");
            String::new()
        }
    };
    if text.trim().is_empty() {
        return message_response(StatusCode::BAD_REQUEST, EMPTY_INPUT);
    }

    let cookie_session = read_cookie_value(&headers, SESSION_COOKIE).filter(|id| valid_session_id(id));
    let input = ChatInput {
        session_id: cookie_session.clone(),
        text,
    };

    match tokio::time::timeout(state.turn_timeout, state.agent.handle_chat(input)).await {
        Ok(Ok(reply)) => {
            let mut response = message_response(StatusCode::OK, &reply.message);
            if cookie_session.as_deref() != Some(reply.session_id.as_str()) {
                let cookie = build_session_cookie(SESSION_COOKIE, &reply.session_id, state.session_ttl_seconds);
                if let Ok(value) = HeaderValue::from_str(&cookie) {
                    response.headers_mut().insert(header::SET_COOKIE, value);
                }
            }
            response
        }
        Ok(Err(err)) if err.downcast_ref::<TurnError>().is_some() => {
            message_response(StatusCode::BAD_REQUEST, EMPTY_INPUT)
        }
        Ok(Err(err)) => {
            error!(error = ?err, "message handling failed");
            message_response(StatusCode::INTERNAL_SERVER_ERROR, PROCESSING_FAILED)
        }
        Err(_) => {
            warn!(timeout_ms = state.turn_timeout.as_millis() as u64, "turn timed out");
            message_response(StatusCode::GATEWAY_TIMEOUT, TURN_TIMED_OUT)
        }
    }
}

async fn end_chat(State(state): State<ApiState>, headers: HeaderMap) -> Response {
    if let Some(session_id) = read_cookie_value(&headers, SESSION_COOKIE).filter(|id| valid_session_id(id)) {
        if let Err(err) = state.agent.end_session(&session_id).await {
            error!(error = ?err, "failed ending chat session");
            return message_response(StatusCode::INTERNAL_SERVER_ERROR, PROCESSING_FAILED);
        }
    }

    let mut response = message_response(StatusCode::OK, CHAT_ENDED);
    if let Ok(value) = HeaderValue::from_str(&build_clear_cookie(SESSION_COOKIE)) {
        response.headers_mut().insert(header::SET_COOKIE, value);
    }
    response
}

fn message_response(status: StatusCode, message: &str) -> Response {
    (status, Json(MessageResponse { message })).into_response()
}

fn valid_session_id(value: &str) -> bool {
    !value.is_empty()
        && value.len() <= MAX_SESSION_ID_LEN
        && value
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || ch == '-' || ch == '_')
}

fn read_cookie_value(headers: &HeaderMap, cookie_name: &str) -> Option<String> {
    let raw_cookie = headers.get(header::COOKIE)?.to_str().ok()?;
    raw_cookie.split(';').find_map(|part| {
        let mut split = part.trim().splitn(2, '=');
        let key = split.next()?.trim();
        let value = split.next()?.trim();
        if key == cookie_name {
            Some(value.to_string())
        } else {
            None
        }
    })
}

fn build_session_cookie(cookie_name: &str, session_id: &str, max_age_seconds: u64) -> String {
    [
        format!("{cookie_name}={session_id}"),
        "Path=/".to_string(),
        "HttpOnly".to_string(),
        "SameSite=Lax".to_string(),
        format!("Max-Age={max_age_seconds}"),
    ]
    .join("; ")
}

fn build_clear_cookie(cookie_name: &str) -> String {
    [
        format!("{cookie_name}="),
        "Path=/".to_string(),
        "HttpOnly".to_string(),
        "SameSite=Lax".to_string(),
        "Max-Age=0".to_string(),
        "Expires=Thu, 01 Jan 1970 00:00:00 GMT".to_string(),
    ]
    .join("; ")
}
