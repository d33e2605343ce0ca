/// API route handlers for the Relay proxy.
use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};

use relay_shared::errors::ExtractError;
use relay_shared::models::{ArchiveOptions, RenderProperties, RenderRequest, Role};

use crate::auth::TokenOptions;
use crate::facts;
use crate::platform::id_of;
use crate::AppState;

/// Longest a composer render may run, in seconds.
const RENDER_MAX_DURATION: u32 = 1800;
const DEFAULT_RESOLUTION: &str = "1280x720";

// ====== REQUEST / RESPONSE TYPES ======

/// Uniform failure body.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub success: bool,
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

pub type ApiError = (StatusCode, Json<ErrorBody>);
pub type ApiResult = Result<(StatusCode, Json<Value>), ApiError>;

fn fail(status: StatusCode, error: impl Into<String>, message: Option<String>) -> ApiError {
    (
        status,
        Json(ErrorBody {
            success: false,
            error: error.into(),
            message,
        }),
    )
}

fn ok(body: Value) -> ApiResult {
    Ok((StatusCode::OK, Json(body)))
}

/// Trimmed, non-empty value or a 400.
fn required(value: Option<String>, error: &str) -> Result<String, ApiError> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| fail(StatusCode::BAD_REQUEST, error, None))
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct TokenBody {
    pub role: Option<String>,
    pub data: Option<String>,
    pub expire_time: Option<i64>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArchivesQuery {
    pub offset: Option<u32>,
    pub count: Option<u32>,
    pub session_id: Option<String>,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct StartArchiveBody {
    pub session_id: Option<String>,
    pub name: Option<String>,
    pub layout: Option<Value>,
    pub resolution: Option<String>,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct StartComposerBody {
    pub session_id: Option<String>,
    pub url: Option<String>,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ExtractBody {
    pub url: Option<String>,
    pub archive_id: Option<String>,
}

// ====== HEALTH ======

/// GET /_/health
pub async fn liveness() -> StatusCode {
    StatusCode::OK
}

/// GET /health
pub async fn health() -> Json<Value> {
    Json(serde_json::json!({
        "status": "OK",
        "timestamp": Utc::now().to_rfc3339(),
    }))
}

// ====== SESSION ROUTES ======

/// POST /sessions
pub async fn create_session(State(state): State<Arc<AppState>>) -> ApiResult {
    match state.platform.create_session().await {
        Ok(session_id) => ok(serde_json::json!({ "sessionId": session_id, "success": true })),
        Err(e) => {
            warn!("Failed to create session: {}", e);
            Err(fail(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to create session",
                Some(e.detail()),
            ))
        }
    }
}

/// POST /sessions/:sessionId/tokens
pub async fn create_token(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
    body: Option<Json<TokenBody>>,
) -> ApiResult {
    let body = body.map(|Json(b)| b).unwrap_or_default();

    let role = match body.role.as_deref().map(str::trim).filter(|r| !r.is_empty()) {
        Some(r) => r
            .parse::<Role>()
            .map_err(|e| fail(StatusCode::BAD_REQUEST, e, None))?,
        None => Role::Publisher,
    };
    let opts = TokenOptions {
        role,
        data: body.data,
        expire_time: body.expire_time,
    };
    opts.validate(Utc::now().timestamp())
        .map_err(|e| fail(StatusCode::BAD_REQUEST, e, None))?;

    let token = state
        .platform
        .credentials()
        .client_token(&session_id, &opts)
        .map_err(|e| {
            warn!("Failed to generate token: {}", e);
            fail(StatusCode::INTERNAL_SERVER_ERROR, "Failed to generate token", None)
        })?;

    info!("Issued {} token for session {}", role, session_id);
    ok(serde_json::json!({ "token": token, "success": true }))
}

// ====== ARCHIVE ROUTES ======

/// GET /archives
pub async fn list_archives(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ArchivesQuery>,
) -> ApiResult {
    let offset = query.offset.unwrap_or(0);
    let count = query.count.unwrap_or(50);

    match state
        .platform
        .list_archives(offset, count, query.session_id.as_deref())
        .await
    {
        Ok(list) => ok(serde_json::json!({
            "archives": list.items,
            "totalCount": list.count,
            "success": true,
        })),
        Err(e) => {
            warn!("Failed to list archives: {}", e);
            Err(fail(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to list archives",
                Some(e.detail()),
            ))
        }
    }
}

async fn start_archive(state: &AppState, options: ArchiveOptions, kind: &str) -> ApiResult {
    match state.platform.start_archive(&options).await {
        Ok(archive) => ok(serde_json::json!({
            "archiveId": id_of(&archive),
            "archive": archive,
            "success": true,
        })),
        Err(e) => {
            warn!("Failed to start {} archive: {}", kind, e);
            Err(fail(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to start {} archive", kind),
                Some(e.detail()),
            ))
        }
    }
}

/// POST /archives/start/audio-only
pub async fn start_audio_only(
    State(state): State<Arc<AppState>>,
    body: Option<Json<StartArchiveBody>>,
) -> ApiResult {
    let body = body.map(|Json(b)| b).unwrap_or_default();
    let session_id = required(body.session_id, "sessionId is required")?;
    let name = body.name.unwrap_or_else(|| "Audio Only Archive".to_string());

    start_archive(&state, ArchiveOptions::audio_only(session_id, name), "audio-only").await
}

/// POST /archives/start/composed
pub async fn start_composed(
    State(state): State<Arc<AppState>>,
    body: Option<Json<StartArchiveBody>>,
) -> ApiResult {
    let body = body.map(|Json(b)| b).unwrap_or_default();
    let session_id = required(body.session_id, "sessionId is required")?;
    let name = body.name.unwrap_or_else(|| "Composed Archive".to_string());
    let resolution = body.resolution.unwrap_or_else(|| DEFAULT_RESOLUTION.to_string());

    let options = ArchiveOptions::composed(session_id, name)
        .with_resolution(resolution)
        .with_layout(body.layout);
    start_archive(&state, options, "composed").await
}

/// POST /archives/start/individual
pub async fn start_individual(
    State(state): State<Arc<AppState>>,
    body: Option<Json<StartArchiveBody>>,
) -> ApiResult {
    let body = body.map(|Json(b)| b).unwrap_or_default();
    let session_id = required(body.session_id, "sessionId is required")?;
    let name = body.name.unwrap_or_else(|| "Individual Archive".to_string());

    start_archive(&state, ArchiveOptions::individual(session_id, name), "individual").await
}

/// POST /archives/:archiveId/stop
pub async fn stop_archive(
    State(state): State<Arc<AppState>>,
    Path(archive_id): Path<String>,
) -> ApiResult {
    match state.platform.stop_archive(&archive_id).await {
        Ok(archive) => ok(serde_json::json!({
            "archiveId": id_of(&archive).unwrap_or(&archive_id),
            "archive": archive,
            "success": true,
        })),
        Err(e) => {
            warn!("Failed to stop archive {}: {}", archive_id, e);
            Err(fail(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to stop archive",
                Some(e.detail()),
            ))
        }
    }
}

/// POST /archives/extract - Unpack an individual-stream bundle for playback
pub async fn extract_archive(
    State(state): State<Arc<AppState>>,
    body: Option<Json<ExtractBody>>,
) -> ApiResult {
    let body = body.map(|Json(b)| b).unwrap_or_default();

    match state
        .extractor
        .extract(body.url.as_deref(), body.archive_id.as_deref())
        .await
    {
        Ok(files) => ok(serde_json::json!({
            "success": true,
            "count": files.len(),
            "files": files,
        })),
        Err(e) => {
            let status = StatusCode::from_u16(e.status_code())
                .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            warn!("Archive extraction failed: {}", e);
            match &e {
                ExtractError::Validation(_) | ExtractError::NotFound => {
                    Err(fail(status, e.to_string(), None))
                }
                _ => Err(fail(status, "Failed to extract archive", Some(e.to_string()))),
            }
        }
    }
}

// ====== COMPOSER ROUTES ======

/// POST /composer/start - Render a web page into the session and record it
pub async fn start_composer(
    State(state): State<Arc<AppState>>,
    body: Option<Json<StartComposerBody>>,
) -> ApiResult {
    let body = body.map(|Json(b)| b).unwrap_or_default();
    let session_id = required(body.session_id, "sessionId is required")?;
    let url = required(
        body.url,
        "url is required - must be a web application that renders the video session",
    )?;

    let token = state
        .platform
        .credentials()
        .client_token(&session_id, &TokenOptions::moderator())
        .map_err(|e| {
            fail(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to start Experience Composer: {}", e),
                None,
            )
        })?;

    let fact = facts::random_fact();
    let request = RenderRequest {
        session_id: session_id.clone(),
        token,
        url,
        max_duration: RENDER_MAX_DURATION,
        resolution: DEFAULT_RESOLUTION.to_string(),
        properties: RenderProperties {
            name: format!("{} - Experience Composer Render", fact),
        },
    };

    let render = state.platform.start_render(&request).await.map_err(|e| {
        warn!("Failed to start Experience Composer: {}", e);
        fail(
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Failed to start Experience Composer: {}", e.detail()),
            None,
        )
    })?;
    let render_id = id_of(&render).map(String::from);

    let options = ArchiveOptions::composed(
        session_id,
        format!("{} - Experience Composer Archive", fact),
    );
    let archive = match state.platform.start_archive(&options).await {
        Ok(archive) => archive,
        Err(e) => {
            warn!("Failed to start composer archive: {}", e);
            if let Some(id) = &render_id {
                if let Err(stop_err) = state.platform.stop_render(id).await {
                    warn!("Failed to stop orphaned render {}: {}", id, stop_err);
                }
            }
            return Err(fail(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to start archive: {}", e.detail()),
                None,
            ));
        }
    };
    let archive_id = id_of(&archive).map(String::from);

    if let (Some(render_id), Some(archive_id)) = (&render_id, &archive_id) {
        state.renders.associate(render_id, archive_id).await;
    }

    ok(serde_json::json!({
        "render": render,
        "archive": archive,
        "archiveId": archive_id,
        "success": true,
    }))
}

/// POST /composer/:renderId/stop - Stop a render and the archive started with it
pub async fn stop_composer(
    State(state): State<Arc<AppState>>,
    Path(render_id): Path<String>,
) -> ApiResult {
    let archive_id = state.renders.lookup(&render_id).await;

    match state.platform.stop_render(&render_id).await {
        Ok(render) => {
            let archive = match &archive_id {
                Some(id) => match state.platform.stop_archive(id).await {
                    Ok(archive) => archive,
                    Err(e) => {
                        warn!("Failed to stop archive {} for render {}: {}", id, render_id, e);
                        Value::Null
                    }
                },
                None => Value::Null,
            };
            state.renders.remove(&render_id).await;
            info!(
                "Composer {} stopped ({} renders still tracked)",
                render_id,
                state.renders.len().await
            );

            ok(serde_json::json!({
                "render": render,
                "archive": archive,
                "success": true,
            }))
        }
        Err(e) if e.is_not_found() => {
            state.renders.remove(&render_id).await;
            Err(fail(
                StatusCode::NOT_FOUND,
                "Experience Composer render not found. It may have already been stopped or expired.",
                None,
            ))
        }
        Err(e) => {
            warn!("Failed to stop Experience Composer {}: {}", render_id, e);
            Err(fail(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to stop Experience Composer: {}", e.detail()),
                None,
            ))
        }
    }
}
