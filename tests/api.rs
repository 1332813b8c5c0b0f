//! HTTP API tests against an in-process router.
//!
//! Engines, the LLM and (where noted) the analyzer are stubs; uploads go to
//! a temporary directory.
//!
//! Run with:
//!   cargo test --test api

use async_trait::async_trait;
use axum::http::StatusCode;
use axum_test::multipart::{MultipartForm, Part};
use axum_test::TestServer;
use pdf_rulecheck::server::{self, AppState, UploadStore};
use pdf_rulecheck::{
    DocumentAnalysis, EngineError, EvaluatorConfig, ExtractionResult, GenerationError,
    KeywordAnalyzer, PdfBytes, RuleEvaluator, ServerConfig, TextAnalyzer, TextEngine,
    TextExtractor, TextGenerator,
};
use serde_json::{json, Value};
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;

// ── Stubs ────────────────────────────────────────────────────────────────────

struct FixedText(&'static str);

impl TextEngine for FixedText {
    fn name(&self) -> &'static str {
        "fixed"
    }

    fn extract(&self, _pdf: &PdfBytes) -> Result<ExtractionResult, EngineError> {
        Ok(ExtractionResult::new(self.0, 2))
    }
}

struct Broken;

impl TextEngine for Broken {
    fn name(&self) -> &'static str {
        "broken"
    }

    fn extract(&self, _pdf: &PdfBytes) -> Result<ExtractionResult, EngineError> {
        Err(EngineError::Parse {
            engine: "broken",
            detail: "no trailer".into(),
        })
    }
}

/// Passes every rule that mentions "total"; fails "explode" at the transport.
struct KeywordJudge;

#[async_trait]
impl TextGenerator for KeywordJudge {
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
        let rule = prompt
            .split("RULE:\n")
            .nth(1)
            .and_then(|rest| rest.split("\n\nDOCUMENT").next())
            .unwrap_or_default();
        if rule == "explode" {
            return Err(GenerationError::Provider("connection reset".into()));
        }
        let status = if rule.contains("total") { "pass" } else { "fail" };
        Ok(format!(
            r#"Answer: {{"rule":"{rule}","status":"{status}","evidence":"","reasoning":"checked","confidence":80}}"#
        ))
    }
}

struct OfflineAnalyzer;

#[async_trait]
impl TextAnalyzer for OfflineAnalyzer {
    async fn analyze(&self, _text: &str) -> Result<DocumentAnalysis, String> {
        Err("analysis model offline".into())
    }
}

// ── Harness ──────────────────────────────────────────────────────────────────

struct Harness {
    server: TestServer,
    dir: TempDir,
}

impl Harness {
    fn upload_dir(&self) -> PathBuf {
        self.dir.path().join("uploads")
    }
}

async fn harness_with(
    primary: Arc<dyn TextEngine>,
    analyzer: Arc<dyn TextAnalyzer>,
    sample: Option<&[u8]>,
) -> Harness {
    let dir = tempfile::tempdir().unwrap();
    let sample_path = dir.path().join("sample.pdf");
    if let Some(bytes) = sample {
        std::fs::write(&sample_path, bytes).unwrap();
    }

    let config = ServerConfig {
        upload_dir: dir.path().join("uploads"),
        sample_pdf: sample_path.clone(),
        fonts_dir: dir.path().join("fonts"),
        ..ServerConfig::default()
    };
    let uploads = UploadStore::open(&config.upload_dir).await.unwrap();
    let evaluator = RuleEvaluator::new(Arc::new(KeywordJudge), EvaluatorConfig::default());
    let state = AppState::new(
        TextExtractor::with_engines(primary, Arc::new(Broken)),
        evaluator,
        analyzer,
        uploads,
        sample_path,
    );

    let server = TestServer::new(server::router(state, &config)).unwrap();
    Harness { server, dir }
}

async fn harness() -> Harness {
    harness_with(
        Arc::new(FixedText("Invoice\nTotal amount: $500\nPayment due 2024-01-31")),
        Arc::new(KeywordAnalyzer::default()),
        None,
    )
    .await
}

fn pdf_part(name: &str) -> MultipartForm {
    MultipartForm::new().add_part(
        "file",
        Part::bytes(b"%PDF-1.4 stub".to_vec())
            .file_name(name)
            .mime_type("application/pdf"),
    )
}

// ── Root ─────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_root_reports_liveness() {
    let h = harness().await;
    let response = h.server.get("/").await;
    response.assert_status_ok();
    response.assert_text("pdf-rulecheck backend is running");
}

// ── Upload ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_upload_extracts_and_stores() {
    let h = harness().await;

    let response = h
        .server
        .post("/api/check/pdf")
        .multipart(pdf_part("Annual Report.pdf"))
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["pages"], 2);
    assert!(body["text"].as_str().unwrap().contains("Total amount"));
    assert!(body.get("samplePath").is_none());

    let filename = body["filename"].as_str().unwrap();
    assert!(filename.ends_with("-Annual_Report.pdf"), "{filename}");
    let stored = std::fs::read(h.upload_dir().join(filename)).unwrap();
    assert_eq!(stored, b"%PDF-1.4 stub");

    let found: Vec<&str> = body["analysis"]["keywordsFound"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(Value::as_str)
        .collect();
    assert!(found.contains(&"total"));
    assert!(found.contains(&"payment"));
}

#[tokio::test]
async fn test_repeated_upload_gets_distinct_names() {
    let h = harness().await;

    let first: Value = h
        .server
        .post("/api/check/pdf")
        .multipart(pdf_part("a.pdf"))
        .await
        .json();
    let second: Value = h
        .server
        .post("/api/check/pdf")
        .multipart(pdf_part("a.pdf"))
        .await
        .json();

    assert_ne!(first["filename"], second["filename"]);
    assert_eq!(std::fs::read_dir(h.upload_dir()).unwrap().count(), 2);
}

#[tokio::test]
async fn test_upload_without_file_field_is_rejected() {
    let h = harness().await;

    let response = h
        .server
        .post("/api/check/pdf")
        .multipart(MultipartForm::new().add_text("note", "no file here"))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["error"], "No file uploaded. Use field \"file\"");
}

#[tokio::test]
async fn test_upload_without_multipart_body_is_rejected() {
    let h = harness().await;

    let response = h.server.post("/api/check/pdf").await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["error"], "No file uploaded. Use field \"file\"");
}

#[tokio::test]
async fn test_extraction_failure_uses_server_error_shape() {
    let h = harness_with(
        Arc::new(Broken),
        Arc::new(KeywordAnalyzer::default()),
        None,
    )
    .await;

    let response = h
        .server
        .post("/api/check/pdf")
        .multipart(pdf_part("broken.pdf"))
        .await;

    response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = response.json();
    assert_eq!(body["error"], "Server error");
    assert!(body["details"].as_str().unwrap().contains("no trailer"));
}

#[tokio::test]
async fn test_analysis_failure_degrades_to_placeholder() {
    let h = harness_with(
        Arc::new(FixedText("Some text")),
        Arc::new(OfflineAnalyzer),
        None,
    )
    .await;

    let response = h
        .server
        .post("/api/check/pdf")
        .multipart(pdf_part("doc.pdf"))
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["text"], "Some text");
    assert_eq!(
        body["analysis"],
        json!({
            "summary": "analysis unavailable",
            "keywordsFound": [],
            "warnings": ["analysis model offline"],
        })
    );
}

// ── Sample ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_missing_sample_is_not_found() {
    let h = harness().await;

    let response = h.server.post("/api/check/pdf/sample").await;

    response.assert_status(StatusCode::NOT_FOUND);
    let body: Value = response.json();
    let error = body["error"].as_str().unwrap();
    assert!(error.starts_with("Sample PDF not found at "), "{error}");
    assert!(error.ends_with("sample.pdf"), "{error}");
}

#[tokio::test]
async fn test_sample_is_extracted() {
    let h = harness_with(
        Arc::new(FixedText("Sample invoice total")),
        Arc::new(KeywordAnalyzer::default()),
        Some(&b"%PDF-1.4 sample"[..]),
    )
    .await;

    let response = h.server.post("/api/check/pdf/sample").await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["filename"], "sample.pdf");
    assert_eq!(body["text"], "Sample invoice total");
    assert!(body["samplePath"].as_str().unwrap().ends_with("sample.pdf"));
}

// ── Rules ────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_rules_are_judged_in_order() {
    let h = harness().await;

    let response = h
        .server
        .post("/api/check/rules")
        .json(&json!({
            "rules": ["mentions a total", "is signed", "explode"],
            "pdfText": "Total amount: $500",
        }))
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    let results = body["results"].as_array().unwrap();
    assert_eq!(results.len(), 3);

    assert_eq!(results[0]["rule"], "mentions a total");
    assert_eq!(results[0]["status"], "pass");
    assert_eq!(results[0]["confidence"], 80);

    assert_eq!(results[1]["rule"], "is signed");
    assert_eq!(results[1]["status"], "fail");

    assert_eq!(results[2]["rule"], "explode");
    assert_eq!(results[2]["status"], "fail");
    assert_eq!(results[2]["confidence"], 0);
    assert!(results[2]["reasoning"]
        .as_str()
        .unwrap()
        .starts_with("LLM call failed:"));
}

#[tokio::test]
async fn test_empty_rules_are_rejected() {
    let h = harness().await;

    for body in [
        json!({ "rules": [], "pdfText": "x" }),
        json!({ "pdfText": "x" }),
    ] {
        let response = h.server.post("/api/check/rules").json(&body).await;
        response.assert_status(StatusCode::BAD_REQUEST);
        let body: Value = response.json();
        assert_eq!(body["error"], "No rules provided");
    }
}

#[tokio::test]
async fn test_non_string_rule_is_rejected() {
    let h = harness().await;

    let response = h
        .server
        .post("/api/check/rules")
        .json(&json!({ "rules": ["ok", 7] }))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["error"], "Invalid rule");
    assert_eq!(body["details"], "rules[1] must be a string");
}

#[tokio::test]
async fn test_malformed_json_is_rejected() {
    let h = harness().await;

    let response = h
        .server
        .post("/api/check/rules")
        .content_type("application/json")
        .bytes("{not json".into())
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["error"], "Invalid JSON body");
}
