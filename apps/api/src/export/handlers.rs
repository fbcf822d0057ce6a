use std::net::SocketAddr;
use std::time::Instant;

use axum::{
    extract::{ConnectInfo, Path, State},
    http::{header, HeaderMap, HeaderName, HeaderValue},
    response::{IntoResponse, Response},
    Json,
};

use crate::content::handlers::ContentRequest;
use crate::content::view_model::{ExportPayload, ExportViewModel};
use crate::errors::AppError;
use crate::export::rate_limit::{client_identity, RateDecision};
use crate::render::{self, ExportFormat};
use crate::state::AppState;

static X_RATELIMIT_LIMIT: HeaderName = HeaderName::from_static("x-ratelimit-limit");
static X_RATELIMIT_REMAINING: HeaderName = HeaderName::from_static("x-ratelimit-remaining");
static X_RATELIMIT_RESET: HeaderName = HeaderName::from_static("x-ratelimit-reset");

/// POST /api/v1/export/:format
///
/// Body is a client-built view model. It is re-normalised before rendering.
pub async fn handle_export(
    State(state): State<AppState>,
    Path(format): Path<String>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
    Json(payload): Json<ExportPayload>,
) -> Result<Response, AppError> {
    let format = parse_format(&format)?;
    let route = format!("export:{format}");
    let decision = enforce_rate_limit(&state, &headers, connect_info, &route).await?;

    check_required(&payload, format)?;
    let vm = payload.normalize();
    export(&state, format, vm, decision).await
}

/// POST /api/v1/export/:format/from-content
///
/// Builds the view model server-side; the builder always supplies a name and headline.
pub async fn handle_export_from_content(
    State(state): State<AppState>,
    Path(format): Path<String>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
    Json(req): Json<ContentRequest>,
) -> Result<Response, AppError> {
    let format = parse_format(&format)?;
    let route = format!("export:{format}:from-content");
    let decision = enforce_rate_limit(&state, &headers, connect_info, &route).await?;

    let vm = req.build(&state);
    export(&state, format, vm, decision).await
}

fn parse_format(raw: &str) -> Result<ExportFormat, AppError> {
    raw.parse::<ExportFormat>().map_err(AppError::NotFound)
}

/// Counts the request against the client's budget for `route`.
///
/// `route` is built from the parsed format, so `/export/HTML` and `/export/htm` share
/// the `/export/html` budget.
async fn enforce_rate_limit(
    state: &AppState,
    headers: &HeaderMap,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    route: &str,
) -> Result<RateDecision, AppError> {
    let identity = client_identity(headers, connect_info.map(|ci| ci.0));
    let decision = state.rate_limiter.check(&identity, route).await;
    if !decision.allowed {
        tracing::info!("Rate limit exceeded for {identity} on {route}");
        return Err(AppError::RateLimited {
            retry_after_secs: decision.retry_after_secs,
        });
    }
    Ok(decision)
}

/// Name is required for every format, headline only for PDF.
fn check_required(payload: &ExportPayload, format: ExportFormat) -> Result<(), AppError> {
    if payload.name().is_none() {
        return Err(AppError::Validation("resolvedName is required".to_string()));
    }
    if format.requires_headline() && payload.headline().is_none() {
        return Err(AppError::Validation(format!(
            "resolvedHeadline is required for {format} export"
        )));
    }
    Ok(())
}

async fn export(
    state: &AppState,
    format: ExportFormat,
    mut vm: ExportViewModel,
    decision: RateDecision,
) -> Result<Response, AppError> {
    if format == ExportFormat::Pdf {
        if let Some(avatar) = vm.profile.avatar.clone() {
            match state.avatar_processor.process(&avatar).await {
                Ok(processed) => vm.profile.avatar = Some(processed),
                Err(e) => tracing::warn!("Avatar processing failed, using original: {e}"),
            }
        }
    }

    let filename = format!("{}-cv.{}", slugify(&vm.resolved_name), format.extension());
    let template = vm.template_id;
    let tokens = template.tokens();
    let started = Instant::now();

    let bytes = tokio::task::spawn_blocking(move || render::render(format, &vm, &tokens))
        .await
        .map_err(|e| AppError::Internal(anyhow::anyhow!("render task failed: {e}")))??;

    tracing::info!(
        "Exported {format} ({} template): {} bytes in {}ms",
        template.as_str(),
        bytes.len(),
        started.elapsed().as_millis()
    );

    let disposition = HeaderValue::from_str(&format!("attachment; filename=\"{filename}\""))
        .map_err(|e| AppError::Internal(e.into()))?;
    let content_length = bytes.len();

    let mut response = bytes.into_response();
    let headers = response.headers_mut();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static(format.content_type()),
    );
    headers.insert(header::CONTENT_DISPOSITION, disposition);
    headers.insert(header::CONTENT_LENGTH, HeaderValue::from(content_length));
    headers.insert(X_RATELIMIT_LIMIT.clone(), HeaderValue::from(decision.limit));
    headers.insert(
        X_RATELIMIT_REMAINING.clone(),
        HeaderValue::from(decision.remaining),
    );
    headers.insert(X_RATELIMIT_RESET.clone(), HeaderValue::from(decision.reset_at));
    Ok(response)
}

/// Lower-cased name with whitespace runs collapsed to `-` and everything outside
/// `[a-z0-9_-]` removed. Falls back to `portfolio`.
pub fn slugify(name: &str) -> String {
    let slug: String = name
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("-")
        .to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_')
        .collect();
    if slug.is_empty() {
        "portfolio".to_string()
    } else {
        slug
    }
}
