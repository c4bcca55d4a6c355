//! Waveform/RMS rendering by shelling out to an external audio-analysis
//! tool (spec.md §1 names this "the external audio-waveform rendering
//! tool" as an out-of-scope collaborator; this module owns only the
//! subprocess plumbing, not the analysis itself). The tool binary name is
//! configurable via `VIBIN_WAVEFORM_TOOL` (default `audiowaveform`), and a
//! missing binary degrades to `MissingDependencyError` rather than a 500,
//! per spec.md §7.

use axum::extract::{Path, State};
use axum::http::header;
use axum::response::IntoResponse;
use axum::Json;
use tokio::process::Command;
use vibin_core::VibinError;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

fn tool_name() -> String {
    std::env::var("VIBIN_WAVEFORM_TOOL").unwrap_or_else(|_| "audiowaveform".to_string())
}

async fn track_audio_url(state: &AppState, id: &str) -> ApiResult<String> {
    let media_server = state
        .hub
        .media_server()
        .ok_or_else(|| ApiError(VibinError::MissingDependencyError("no media server is configured".to_string())))?;
    let metadata = media_server.metadata(id).await?;
    metadata
        .get("audio_url")
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
        .ok_or_else(|| ApiError(VibinError::NotFound(format!("track '{id}' has no known audio URL"))))
}

async fn run_tool(args: &[&str]) -> ApiResult<Vec<u8>> {
    let output = Command::new(tool_name())
        .args(args)
        .output()
        .await
        .map_err(|err| ApiError(VibinError::MissingDependencyError(format!("{}: {err}", tool_name()))))?;

    if !output.status.success() {
        return Err(ApiError(VibinError::Internal(format!(
            "{} exited with {}: {}",
            tool_name(),
            output.status,
            String::from_utf8_lossy(&output.stderr)
        ))));
    }
    Ok(output.stdout)
}

pub async fn peaks(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Json<serde_json::Value>> {
    let audio_url = track_audio_url(&state, &id).await?;
    let stdout = run_tool(&["-i", &audio_url, "--output-format", "json", "-o", "-"]).await?;
    let value: serde_json::Value = serde_json::from_slice(&stdout).map_err(|err| ApiError(VibinError::Internal(err.to_string())))?;
    Ok(Json(value))
}

pub async fn png(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<impl IntoResponse> {
    let audio_url = track_audio_url(&state, &id).await?;
    let bytes = run_tool(&["-i", &audio_url, "--output-format", "png", "-o", "-"]).await?;
    Ok(([(header::CONTENT_TYPE, "image/png")], bytes))
}

pub async fn rms(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Json<serde_json::Value>> {
    let audio_url = track_audio_url(&state, &id).await?;
    let stdout = run_tool(&["-i", &audio_url, "--output-format", "json", "--rms", "-o", "-"]).await?;
    let value: serde_json::Value = serde_json::from_slice(&stdout).map_err(|err| ApiError(VibinError::Internal(err.to_string())))?;
    Ok(Json(value))
}
