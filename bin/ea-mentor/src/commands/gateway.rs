use axum::{
    extract::{rejection::JsonRejection, Request, State},
    http::{header, HeaderValue, Method, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use mentor_agent::MentorRuntime;
use mentor_core::config::GatewayConfig;
use mentor_core::{ChatReply, ChatRequest, Error, Paths, QuestionRequest};
use mentor_core::types::PracticeQuestion;
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use super::{build_runtime, load_config};

#[derive(Clone)]
pub struct GatewayState {
    pub runtime: Arc<MentorRuntime>,
    pub api_token: Option<String>,
}

fn secure_eq(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff: u8 = 0;
    for (&x, &y) in a.as_bytes().iter().zip(b.as_bytes().iter()) {
        diff |= x ^ y;
    }
    diff == 0
}

/// Only `/api/*` is protected; the banner and health probe stay open.
async fn auth_middleware(State(state): State<GatewayState>, req: Request, next: Next) -> Response {
    let token = match &state.api_token {
        Some(t) if !t.is_empty() => t,
        _ => return next.run(req).await,
    };

    if !req.uri().path().starts_with("/api/") {
        return next.run(req).await;
    }

    let authorized = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(|given| secure_eq(given, token))
        .unwrap_or(false);

    if authorized {
        next.run(req).await
    } else {
        (
            StatusCode::UNAUTHORIZED,
            Json(ErrorBody {
                detail: "Unauthorized: invalid or missing Bearer token".to_string(),
            }),
        )
            .into_response()
    }
}

// ---------------------------------------------------------------------------
// Response bodies
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct ErrorBody {
    detail: String,
}

#[derive(Serialize)]
struct ChatResponse {
    success: bool,
    #[serde(flatten)]
    reply: ChatReply,
}

#[derive(Serialize)]
struct QuestionResponse {
    success: bool,
    question: PracticeQuestion,
}

#[derive(Serialize)]
struct RootResponse {
    name: &'static str,
    version: &'static str,
    status: &'static str,
    health: &'static str,
}

fn error_response(err: &Error, prefix: &str) -> Response {
    match err {
        Error::Validation(msg) => (
            StatusCode::BAD_REQUEST,
            Json(ErrorBody { detail: msg.clone() }),
        )
            .into_response(),
        other => {
            error!(error = %other, "{}", prefix);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorBody {
                    detail: format!("{}: {}", prefix, other),
                }),
            )
                .into_response()
        }
    }
}

fn rejection_response(rejection: JsonRejection) -> Response {
    warn!(status = %rejection.status(), "Rejected request body");
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorBody {
            detail: rejection.body_text(),
        }),
    )
        .into_response()
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn handle_root() -> impl IntoResponse {
    Json(RootResponse {
        name: "EA Mentor API",
        version: env!("CARGO_PKG_VERSION"),
        status: "online",
        health: "/health",
    })
}

async fn handle_health(State(state): State<GatewayState>) -> impl IntoResponse {
    Json(state.runtime.health())
}

async fn handle_chat(
    State(state): State<GatewayState>,
    body: Result<Json<ChatRequest>, JsonRejection>,
) -> Response {
    let Json(req) = match body {
        Ok(body) => body,
        Err(rejection) => return rejection_response(rejection),
    };
    match state.runtime.chat(&req).await {
        Ok(reply) => Json(ChatResponse { success: true, reply }).into_response(),
        Err(e) => error_response(&e, "Error processing message"),
    }
}

async fn handle_generate_question(
    State(state): State<GatewayState>,
    body: Result<Json<QuestionRequest>, JsonRejection>,
) -> Response {
    let Json(req) = match body {
        Ok(body) => body,
        Err(rejection) => return rejection_response(rejection),
    };
    match state.runtime.generate_question(&req).await {
        Ok(question) => Json(QuestionResponse { success: true, question }).into_response(),
        Err(e) => error_response(&e, "Error generating question"),
    }
}

async fn handle_metrics(State(state): State<GatewayState>) -> impl IntoResponse {
    Json(state.runtime.metrics().await)
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

fn build_cors_layer(config: &GatewayConfig) -> CorsLayer {
    let base = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);

    if config.cors_origins.iter().any(|o| o.trim() == "*") {
        return base.allow_origin(Any);
    }

    let origins: Vec<HeaderValue> = config
        .cors_origins
        .iter()
        .filter_map(|o| match HeaderValue::from_str(o.trim()) {
            Ok(v) => Some(v),
            Err(_) => {
                warn!(origin = %o, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    base.allow_origin(AllowOrigin::list(origins))
}

pub fn build_router(state: GatewayState, config: &GatewayConfig) -> Router {
    Router::new()
        .route("/", get(handle_root))
        .route("/health", get(handle_health))
        .route("/api/chat", post(handle_chat))
        .route("/api/questions/generate", post(handle_generate_question))
        .route("/api/metrics", get(handle_metrics))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
        .layer(build_cors_layer(config))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn run(host: Option<String>, port: Option<u16>) -> anyhow::Result<()> {
    let paths = Paths::new();
    let config = load_config(&paths)?;
    let runtime = build_runtime(&config, &paths)?;

    let host = host.unwrap_or_else(|| config.gateway.host.clone());
    let port = port.unwrap_or(config.gateway.port);
    let api_token = config.api_token().map(str::to_string);

    if api_token.is_none() {
        warn!("No gateway.apiToken configured, /api/* is open to any caller");
    }

    let state = GatewayState { runtime, api_token };
    let app = build_router(state, &config.gateway);

    let bind_addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!(addr = %bind_addr, "Gateway listening");
    println!("EA Mentor gateway listening on http://{}", bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutdown signal received");
        })
        .await?;

    Ok(())
}
