use async_trait::async_trait;
use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

use crate::shared::state::AppState;

#[derive(Debug, thiserror::Error)]
pub enum ClassifierError {
    #[error("Classification service unavailable: {0}")]
    Unavailable(String),
}

/// Result of classifying free-text ticket content.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Classification {
    pub category: String,
    pub confidence: f64,
    #[serde(default)]
    pub keywords: Vec<String>,
}

/// Contract to the external text-classification service. Classification is
/// best-effort enrichment: callers must keep working when it fails.
#[async_trait]
pub trait Classifier: Send + Sync {
    async fn classify(&self, text: &str) -> Result<Classification, ClassifierError>;
    async fn health(&self) -> Result<serde_json::Value, ClassifierError>;
}

pub struct HttpClassifier {
    client: Client,
    base_url: String,
    timeout: Duration,
}

#[derive(Debug, Deserialize)]
struct ClassifyResponse {
    category: String,
    #[serde(default)]
    confidence: f64,
    #[serde(default)]
    keywords: Vec<String>,
}

impl HttpClassifier {
    pub fn new(base_url: String, timeout_secs: u64) -> Self {
        Self {
            client: Client::new(),
            base_url,
            timeout: Duration::from_secs(timeout_secs),
        }
    }
}

#[async_trait]
impl Classifier for HttpClassifier {
    async fn classify(&self, text: &str) -> Result<Classification, ClassifierError> {
        let response = self
            .client
            .post(format!("{}/classify", self.base_url))
            .timeout(self.timeout)
            .json(&serde_json::json!({ "text": text }))
            .send()
            .await
            .map_err(|e| ClassifierError::Unavailable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ClassifierError::Unavailable(format!(
                "classifier returned {status}"
            )));
        }

        let body: ClassifyResponse = response
            .json()
            .await
            .map_err(|e| ClassifierError::Unavailable(format!("invalid response: {e}")))?;

        Ok(Classification {
            category: body.category,
            confidence: body.confidence.clamp(0.0, 1.0),
            keywords: body.keywords,
        })
    }

    async fn health(&self) -> Result<serde_json::Value, ClassifierError> {
        let response = self
            .client
            .get(format!("{}/health", self.base_url))
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| ClassifierError::Unavailable(e.to_string()))?;

        if !response.status().is_success() {
            return Err(ClassifierError::Unavailable(format!(
                "classifier returned {}",
                response.status()
            )));
        }

        response
            .json()
            .await
            .map_err(|e| ClassifierError::Unavailable(format!("invalid response: {e}")))
    }
}

#[derive(Debug, Deserialize)]
pub struct ClassifyRequest {
    pub text: String,
}

#[derive(Debug, thiserror::Error)]
pub enum NlpError {
    #[error("Text is required")]
    MissingText,
    #[error("{0}")]
    Unavailable(String),
}

impl axum::response::IntoResponse for NlpError {
    fn into_response(self) -> axum::response::Response {
        use axum::http::StatusCode;
        let status = match &self {
            Self::MissingText => StatusCode::BAD_REQUEST,
            Self::Unavailable(_) => StatusCode::BAD_GATEWAY,
        };
        (status, Json(serde_json::json!({ "error": self.to_string() }))).into_response()
    }
}

impl From<ClassifierError> for NlpError {
    fn from(e: ClassifierError) -> Self {
        match e {
            ClassifierError::Unavailable(msg) => Self::Unavailable(msg),
        }
    }
}

/// Direct classification passthrough, used by admin tooling to preview what
/// the classifier would say about a piece of text.
pub async fn classify_text(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ClassifyRequest>,
) -> Result<Json<Classification>, NlpError> {
    if req.text.trim().is_empty() {
        return Err(NlpError::MissingText);
    }
    let result = state.classifier.classify(&req.text).await?;
    Ok(Json(result))
}

pub async fn classifier_health(
    State(state): State<Arc<AppState>>,
) -> Result<Json<serde_json::Value>, NlpError> {
    let status = state.classifier.health().await?;
    Ok(Json(status))
}

pub fn configure_nlp_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/nlp/classify", post(classify_text))
        .route("/api/nlp/health", get(classifier_health))
}
