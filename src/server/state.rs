//! Shared application state

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::analysis::{KeywordAnalyzer, TextAnalyzer};
use crate::config::ServerConfig;
use crate::error::RuleCheckError;
use crate::evaluate::RuleEvaluator;
use crate::output::DocumentAnalysis;
use crate::pipeline::extract::TextExtractor;

use super::uploads::UploadStore;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    extractor: TextExtractor,
    evaluator: RuleEvaluator,
    analyzer: Arc<dyn TextAnalyzer>,
    uploads: UploadStore,
    sample_pdf: PathBuf,
}

impl AppState {
    pub fn new(
        extractor: TextExtractor,
        evaluator: RuleEvaluator,
        analyzer: Arc<dyn TextAnalyzer>,
        uploads: UploadStore,
        sample_pdf: impl Into<PathBuf>,
    ) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                extractor,
                evaluator,
                analyzer,
                uploads,
                sample_pdf: sample_pdf.into(),
            }),
        }
    }

    /// Default engines and keyword analysis, uploads under `config.upload_dir`.
    pub async fn from_config(
        config: &ServerConfig,
        evaluator: RuleEvaluator,
    ) -> Result<Self, RuleCheckError> {
        let uploads = UploadStore::open(&config.upload_dir).await?;
        let analyzer = KeywordAnalyzer::new(config.keywords.clone())
            .with_char_limit(evaluator.config().document_char_limit);
        Ok(Self::new(
            TextExtractor::default(),
            evaluator,
            Arc::new(analyzer),
            uploads,
            &config.sample_pdf,
        ))
    }

    pub fn extractor(&self) -> &TextExtractor {
        &self.inner.extractor
    }

    pub fn evaluator(&self) -> &RuleEvaluator {
        &self.inner.evaluator
    }

    pub fn uploads(&self) -> &UploadStore {
        &self.inner.uploads
    }

    pub fn sample_pdf(&self) -> &Path {
        &self.inner.sample_pdf
    }

    /// Run the analyzer; failures become the "unavailable" placeholder.
    pub async fn analyze(&self, text: &str) -> DocumentAnalysis {
        match self.inner.analyzer.analyze(text).await {
            Ok(analysis) => analysis,
            Err(reason) => {
                tracing::warn!("Document analysis failed: {reason}");
                DocumentAnalysis::unavailable(reason)
            }
        }
    }
}
