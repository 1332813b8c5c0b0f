//! Check Routes
//!
//! Endpoints (mounted under `/api/check`):
//! - POST /pdf         - multipart upload (field `file`), returns text + analysis
//! - POST /pdf/sample  - same, for the server-side sample document
//! - POST /rules       - judge `rules` against `pdfText`

use axum::{
    extract::{
        multipart::MultipartRejection,
        rejection::JsonRejection,
        Multipart, State,
    },
    routing::post,
    Json, Router,
};
use serde::Serialize;
use serde_json::Value;

use super::error::ApiError;
use super::state::AppState;
use crate::output::{DocumentAnalysis, RuleVerdict};

/// Extraction response for uploads and the sample document.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionResponse {
    pub filename: String,
    pub pages: usize,
    pub text: String,
    pub analysis: DocumentAnalysis,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sample_path: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RulesResponse {
    pub results: Vec<RuleVerdict>,
}

/// Create the check router
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/pdf", post(upload_pdf))
        .route("/pdf/sample", post(sample_pdf))
        .route("/rules", post(check_rules))
}

/// Upload a PDF and extract its text
async fn upload_pdf(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<ExtractionResponse>, ApiError> {
    let mut multipart = multipart.map_err(|e| {
        ApiError::bad_request_with("No file uploaded. Use field \"file\"", e.body_text())
    })?;

    while let Some(field) = multipart.next_field().await.map_err(|e| {
        tracing::warn!("Failed to read multipart field: {}", e);
        ApiError::bad_request_with("Failed to read upload", e.body_text())
    })? {
        if field.name() != Some("file") {
            continue;
        }

        let original = field.file_name().unwrap_or("upload.pdf").to_string();
        let data = field.bytes().await.map_err(|e| {
            tracing::warn!("Failed to read file data: {}", e);
            ApiError::bad_request_with("Failed to read file data", e.body_text())
        })?;

        let stored = state.uploads().store(&original, &data).await?;
        tracing::info!("Received file: {}", stored.path.display());

        let extraction = state.extractor().extract(data.to_vec()).await?;
        let analysis = state.analyze(&extraction.text).await;

        return Ok(Json(ExtractionResponse {
            filename: stored.filename,
            pages: extraction.page_count,
            text: extraction.text,
            analysis,
            sample_path: None,
        }));
    }

    tracing::warn!("No file field found in multipart upload");
    Err(ApiError::bad_request("No file uploaded. Use field \"file\""))
}

/// Extract the server-side sample document
async fn sample_pdf(State(state): State<AppState>) -> Result<Json<ExtractionResponse>, ApiError> {
    let path = state.sample_pdf();
    let data = match tokio::fs::read(path).await {
        Ok(data) => data,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(ApiError::not_found(format!(
                "Sample PDF not found at {}",
                path.display()
            )));
        }
        Err(e) => {
            tracing::error!("Failed to read sample {}: {e}", path.display());
            return Err(ApiError::server_error("could not read sample PDF"));
        }
    };

    let extraction = state.extractor().extract(data).await?;
    let analysis = state.analyze(&extraction.text).await;

    Ok(Json(ExtractionResponse {
        filename: path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default(),
        pages: extraction.page_count,
        text: extraction.text,
        analysis,
        sample_path: Some(path.display().to_string()),
    }))
}

/// Judge each rule against the supplied text
async fn check_rules(
    State(state): State<AppState>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<RulesResponse>, ApiError> {
    let Json(body) =
        body.map_err(|e| ApiError::bad_request_with("Invalid JSON body", e.body_text()))?;
    let (rules, pdf_text) = parse_rules_request(&body)?;

    let results = state.evaluator().evaluate(&rules, &pdf_text).await;
    Ok(Json(RulesResponse { results }))
}

/// `{ rules: [string, ...], pdfText?: string }`, validated by hand so each
/// problem gets its own message.
fn parse_rules_request(body: &Value) -> Result<(Vec<String>, String), ApiError> {
    let rules = match body.get("rules") {
        Some(Value::Array(items)) if !items.is_empty() => items,
        _ => return Err(ApiError::bad_request("No rules provided")),
    };
    let rules = rules
        .iter()
        .enumerate()
        .map(|(i, rule)| match rule {
            Value::String(s) => Ok(s.clone()),
            _ => Err(ApiError::bad_request_with(
                "Invalid rule",
                format!("rules[{i}] must be a string"),
            )),
        })
        .collect::<Result<Vec<_>, _>>()?;

    let pdf_text = match body.get("pdfText") {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(_) => {
            return Err(ApiError::bad_request_with(
                "Invalid pdfText",
                "pdfText must be a string",
            ))
        }
    };

    Ok((rules, pdf_text))
}
