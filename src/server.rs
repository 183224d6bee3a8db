use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::extract::{ConnectInfo, State};
use axum::http::{HeaderValue, Method, header};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use eyre::Result;
use log::warn;
use serde::Deserialize;
use serde_json::{Value, json};
use tower_http::cors::CorsLayer;

use crate::captions;
use crate::config::Config;
use crate::limiter::RateLimiter;
use crate::prompt::{self, PromptTooLong};
use crate::relay::{self, RelayError};

const NO_CAPTIONS_MSG: &str =
    "Sorry, the video must contain english captions in order to generate a summary.";
const PROMPT_TOO_LONG_MSG: &str = "The video transcript is too long to generate a summary";
const RATE_LIMIT_MSG: &str =
    "Request limit exceeded. You can make up to 2 requests per minute. Please wait and try again.";

/// Shared per-process state, cheap to clone into handlers.
#[derive(Clone)]
pub struct AppState {
    pub http: reqwest::Client,
    pub config: Arc<Config>,
    pub limiter: Arc<RateLimiter>,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        let limiter = RateLimiter::new(
            config.rate_limit_points,
            Duration::from_secs(config.rate_limit_window_secs),
        );
        // Bounds connection establishment only; streamed responses may
        // legitimately stay open far longer.
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_default();
        Self {
            http,
            config: Arc::new(config),
            limiter: Arc::new(limiter),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct SummaryRequest {
    #[serde(rename = "videoId")]
    pub video_id: String,
    #[serde(default)]
    pub title: String,
}

/// Build the router: the summarize endpoint behind single-origin CORS.
pub fn build_router(state: AppState) -> Result<Router> {
    let origin: HeaderValue = state
        .config
        .allowed_origin
        .parse()
        .map_err(|_| eyre::eyre!("allowed_origin is not a valid header value"))?;

    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::POST])
        .allow_headers([header::CONTENT_TYPE]);

    Ok(Router::new()
        .route("/getSummary", post(get_summary))
        .with_state(state)
        .layer(cors))
}

/// Summarize the requested video: rate limiter, caption extraction, prompt
/// construction, then the streamed relay. The first failure short-circuits
/// with a structured payload; success streams plain text.
async fn get_summary(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    Json(request): Json<SummaryRequest>,
) -> Response {
    if !state.limiter.admit(peer.ip()) {
        return error_response("RATE_LIMIT_EXCEEDED", RATE_LIMIT_MSG);
    }

    // The watch page for a malformed ID has no manifest either, so this is
    // the same outcome the fetch would reach, minus the fetch.
    let Some(video_id) = crate::extract_video_id(&request.video_id) else {
        warn!("unusable video id in request: {:?}", request.video_id);
        return error_response("NO_CAPTIONS_FOUND", NO_CAPTIONS_MSG);
    };

    let transcript =
        match captions::fetch_transcript(&state.http, &state.config.youtube_base_url, &video_id).await {
            Ok(t) => t,
            Err(err) => {
                warn!("caption extraction failed for {video_id}: {err:#}");
                return error_response("NO_CAPTIONS_FOUND", NO_CAPTIONS_MSG);
            }
        };

    let prompt = match prompt::build_prompt(&request.title, &transcript) {
        Ok(p) => p,
        Err(PromptTooLong) => return error_response("PROMPT_TOO_LONG", PROMPT_TOO_LONG_MSG),
    };

    match relay::open_summary_stream(
        &state.http,
        &state.config.openai_base_url,
        &state.config.openai_api_key,
        &state.config.model,
        &prompt,
    )
    .await
    {
        Ok(stream) => Body::from_stream(stream).into_response(),
        Err(RelayError::Provider(error)) => summary_response(error),
        Err(RelayError::Transport(err)) => {
            warn!("completion request failed: {err:#}");
            summary_response(json!({ "error": { "message": err.to_string() } }))
        }
    }
}

/// Structured failure: HTTP 200 with `{"summary": {CODE: message}}`.
fn error_response(code: &str, message: &str) -> Response {
    let mut payload = serde_json::Map::new();
    payload.insert(code.to_string(), Value::String(message.to_string()));
    summary_response(Value::Object(payload))
}

fn summary_response(summary: Value) -> Response {
    Json(json!({ "summary": summary })).into_response()
}
