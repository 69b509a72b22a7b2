//! services/api/src/web/rest.rs
//!
//! Contains the Axum handler for the assistant relay endpoint, the router
//! constructor, and the master definition for the OpenAPI specification.

use crate::error::ApiError;
use crate::web::state::AppState;
use axum::{
    extract::State,
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE},
        HeaderName, Method,
    },
    routing::post,
    Json, Router,
};
use farm_assistant_core::ports::PortError;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info};
use utoipa::{OpenApi, ToSchema};
use uuid::Uuid;

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        assistant_handler,
    ),
    components(
        schemas(AssistantRequest, AssistantReply)
    ),
    tags(
        (name = "Farm Assistant API", description = "Relay endpoint for the multilingual farming assistant.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// API Request and Response Structs
//=========================================================================================

/// One user message plus an optional locale hint for language detection.
#[derive(Deserialize, ToSchema)]
pub struct AssistantRequest {
    pub message: String,
    /// Locale code such as `hi-IN`; omitted means auto-detect.
    pub language: Option<String>,
}

/// The assistant's plain-text reply.
#[derive(Serialize, ToSchema)]
pub struct AssistantReply {
    pub reply: String,
}

//=========================================================================================
// REST API Handlers
//=========================================================================================

/// Relay one message to the assistant and return its reply.
///
/// Stateless: each call is independent, and the upstream credential never
/// leaves the server side.
#[utoipa::path(
    post,
    path = "/assistant",
    request_body = AssistantRequest,
    responses(
        (status = 200, description = "Reply generated successfully", body = AssistantReply),
        (status = 400, description = "Empty message"),
        (status = 429, description = "Upstream rate limit; retry shortly"),
        (status = 402, description = "Upstream quota exhausted; temporarily unavailable"),
        (status = 500, description = "Assistant service error")
    )
)]
pub async fn assistant_handler(
    State(app_state): State<Arc<AppState>>,
    Json(payload): Json<AssistantRequest>,
) -> Result<Json<AssistantReply>, ApiError> {
    let request_id = Uuid::new_v4();

    if payload.message.trim().is_empty() {
        return Err(ApiError::Port(PortError::InvalidInput(
            "Message must not be empty.".to_string(),
        )));
    }

    info!(
        "[{}] Received message: {} (language hint: {})",
        request_id,
        payload.message,
        payload.language.as_deref().unwrap_or("auto-detect")
    );

    let reply = app_state
        .assistant
        .reply(&payload.message, payload.language.as_deref())
        .await
        .map_err(|e| {
            error!("[{}] Assistant request failed: {}", request_id, e);
            ApiError::Port(e)
        })?;

    Ok(Json(AssistantReply { reply }))
}

//=========================================================================================
// Router Construction
//=========================================================================================

/// Builds the relay router with its permissive CORS layer.
///
/// Any client origin may call the relay; the allow-list covers the headers a
/// hosted frontend sends alongside its requests. The layer also answers
/// OPTIONS pre-flight requests with an empty success response, and applies
/// the same headers to error responses.
pub fn create_router(app_state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([
            AUTHORIZATION,
            CONTENT_TYPE,
            HeaderName::from_static("x-client-info"),
            HeaderName::from_static("apikey"),
        ]);

    Router::new()
        .route("/assistant", post(assistant_handler))
        .layer(cors)
        .with_state(app_state)
}
