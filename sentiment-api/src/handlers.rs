//! HTTP request handlers for the sentiment API.

use analysis::{AnalysisReport, Sentiment};
use axum::{
    Json,
    extract::{
        Multipart, State,
        multipart::MultipartError,
        rejection::JsonRejection,
    },
    http::StatusCode,
    response::IntoResponse,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::{ApiError, Result};
use crate::ingest::{FileKind, read_reviews};
use crate::state::AppState;

/// Health check response.
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub model: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ReviewBatch {
    pub reviews: Vec<String>,
}

/// Sentiment summary returned by both analysis endpoints.
///
/// `partial` is set when some chunks could not be classified; the
/// proportions then cover only `analyzed_reviews` of `total_reviews`.
#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct SentimentResponse {
    pub positive: f64,
    pub negative: f64,
    pub neutral: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_positive: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_negative: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_neutral: Option<Vec<String>>,
    pub total_reviews: usize,
    pub analyzed_reviews: usize,
    pub partial: bool,
}

impl From<&AnalysisReport> for SentimentResponse {
    fn from(report: &AnalysisReport) -> Self {
        let aggregate = &report.aggregate;
        let top = |label| aggregate.top.as_ref().map(|t| t.texts(label));

        Self {
            positive: aggregate.proportions.positive,
            negative: aggregate.proportions.negative,
            neutral: aggregate.proportions.neutral,
            top_positive: top(Sentiment::Positive),
            top_negative: top(Sentiment::Negative),
            top_neutral: top(Sentiment::Neutral),
            total_reviews: report.total_reviews(),
            analyzed_reviews: report.analyzed_reviews(),
            partial: report.is_partial(),
        }
    }
}

/// GET /health
pub async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "healthy".to_string(),
            model: state.analyzer.client().model().to_string(),
        }),
    )
}

/// GET /metrics
///
/// Prometheus text format; empty when metrics are disabled.
pub async fn metrics(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let body = state
        .metrics_handle
        .as_ref()
        .map(|handle| handle.render())
        .unwrap_or_default();

    (StatusCode::OK, body)
}

/// POST /analyze_batch
pub async fn analyze_batch(
    State(state): State<Arc<AppState>>,
    payload: std::result::Result<Json<ReviewBatch>, JsonRejection>,
) -> Result<Json<SentimentResponse>> {
    let Json(batch) = payload.map_err(|rejection| {
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            ApiError::PayloadTooLarge(rejection.body_text())
        } else {
            ApiError::InvalidInput(rejection.body_text())
        }
    })?;

    tracing::debug!(reviews = batch.reviews.len(), "Received review batch");
    Ok(Json(analyze(&state, &batch.reviews).await))
}

/// POST /analyze_file
///
/// Expects a multipart `file` field holding a `.csv` or `.xlsx` upload.
pub async fn analyze_file(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<SentimentResponse>> {
    while let Some(field) = multipart.next_field().await.map_err(upload_error)? {
        if field.name() != Some("file") {
            continue;
        }

        let file_name = field
            .file_name()
            .ok_or_else(|| ApiError::InvalidInput("Uploaded file has no name".to_string()))?
            .to_string();
        let kind = FileKind::from_file_name(&file_name)?;
        let bytes = field.bytes().await.map_err(upload_error)?;

        tracing::debug!(file = %file_name, bytes = bytes.len(), "Received review file");
        let reviews = read_reviews(kind, &bytes)?;
        return Ok(Json(analyze(&state, &reviews).await));
    }

    Err(ApiError::InvalidInput(
        "Missing multipart field 'file'".to_string(),
    ))
}

async fn analyze(state: &AppState, reviews: &[String]) -> SentimentResponse {
    let report = state.analyzer.analyze(reviews).await;
    SentimentResponse::from(&report)
}

fn upload_error(err: MultipartError) -> ApiError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::PayloadTooLarge(err.body_text())
    } else {
        ApiError::UploadRead(err.body_text())
    }
}
