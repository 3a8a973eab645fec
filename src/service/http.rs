use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use super::{ReportSynthesizer, StageInvoker, StageOutputs};
use crate::errors::ServiceError;

/// Placeholder in `stage_path` replaced by the stage id.
pub const STAGE_PLACEHOLDER: &str = "{stage}";

/// Where the analysis service lives and how long a call may take.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceEndpoints {
    pub base_url: String,
    /// Path template containing `{stage}`, e.g. `/api/agents/{stage}`
    pub stage_path: String,
    /// Synthesis path; `None` disables synthesis
    pub report_path: Option<String>,
    pub health_path: String,
    pub timeout: Duration,
}

impl Default for ServiceEndpoints {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:5000".to_string(),
            stage_path: "/api/agents/{stage}".to_string(),
            report_path: Some("/api/analyze".to_string()),
            health_path: "/api/health".to_string(),
            timeout: Duration::from_secs(300),
        }
    }
}

impl ServiceEndpoints {
    fn join(&self, path: &str) -> String {
        let base = self.base_url.trim_end_matches('/');
        if path.starts_with('/') {
            format!("{}{}", base, path)
        } else {
            format!("{}/{}", base, path)
        }
    }

    pub fn stage_url(&self, stage_id: &str) -> String {
        self.join(&self.stage_path.replace(STAGE_PLACEHOLDER, stage_id))
    }

    pub fn report_url(&self) -> Option<String> {
        self.report_path.as_deref().map(|p| self.join(p))
    }

    pub fn health_url(&self) -> String {
        self.join(&self.health_path)
    }
}

#[derive(Debug, Serialize)]
struct StageRequest<'a> {
    query: &'a str,
    agent: &'a str,
    context: &'a str,
}

#[derive(Debug, Serialize)]
struct ReportRequest<'a> {
    query: &'a str,
    #[serde(flatten)]
    outputs: &'a StageOutputs,
}

/// The `{success, result, error}` envelope every endpoint answers with.
#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    result: Option<serde_json::Value>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct HealthResponse {
    status: String,
}

/// Pull report text out of an envelope `result`.
///
/// Accepts a bare string or an object carrying the text under `analysis`.
fn result_text(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(text) => Some(text.clone()),
        serde_json::Value::Object(map) => map
            .get("analysis")
            .and_then(|a| a.as_str())
            .map(|s| s.to_string()),
        _ => None,
    }
}

/// JSON-over-HTTP client for the analysis backend.
pub struct HttpAnalysisService {
    client: reqwest::Client,
    endpoints: ServiceEndpoints,
}

impl HttpAnalysisService {
    pub fn new(endpoints: ServiceEndpoints) -> Result<Self, ServiceError> {
        let client = reqwest::Client::builder()
            .timeout(endpoints.timeout)
            .build()?;
        Ok(Self { client, endpoints })
    }

    pub fn endpoints(&self) -> &ServiceEndpoints {
        &self.endpoints
    }

    /// Query the health endpoint, returning the reported status string.
    pub async fn health(&self) -> Result<String, ServiceError> {
        let url = self.endpoints.health_url();
        debug!(%url, "checking service health");
        let resp = self.client.get(&url).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(ServiceError::Status {
                status: status.as_u16(),
                message: status.canonical_reason().unwrap_or("unknown").to_string(),
            });
        }
        let body: HealthResponse = resp.json().await?;
        Ok(body.status)
    }

    async fn post_envelope<B: Serialize + ?Sized>(
        &self,
        url: &str,
        body: &B,
    ) -> Result<String, ServiceError> {
        debug!(%url, "posting to analysis service");
        let resp = self.client.post(url).json(body).send().await?;
        let status = resp.status();
        let raw = resp.text().await?;
        let envelope = serde_json::from_str::<Envelope>(&raw);

        if !status.is_success() {
            let message = envelope
                .ok()
                .and_then(|e| e.error)
                .unwrap_or_else(|| status.canonical_reason().unwrap_or("unknown").to_string());
            return Err(ServiceError::Status {
                status: status.as_u16(),
                message,
            });
        }

        let envelope = envelope.map_err(|e| ServiceError::Decode(e.to_string()))?;
        if !envelope.success {
            return Err(ServiceError::Unsuccessful(
                envelope
                    .error
                    .unwrap_or_else(|| "service reported an unsuccessful response".to_string()),
            ));
        }

        envelope
            .result
            .as_ref()
            .and_then(result_text)
            .ok_or_else(|| ServiceError::Decode("response carried no result text".to_string()))
    }
}

#[async_trait]
impl StageInvoker for HttpAnalysisService {
    async fn invoke(
        &self,
        stage_id: &str,
        query: &str,
        context: &str,
    ) -> Result<String, ServiceError> {
        let url = self.endpoints.stage_url(stage_id);
        let body = StageRequest {
            query,
            agent: stage_id,
            context,
        };
        self.post_envelope(&url, &body).await
    }
}

#[async_trait]
impl ReportSynthesizer for HttpAnalysisService {
    async fn synthesize(&self, query: &str, outputs: &StageOutputs) -> Result<String, ServiceError> {
        let url = self.endpoints.report_url().ok_or_else(|| {
            ServiceError::Unavailable("no report synthesis endpoint configured".to_string())
        })?;
        let body = ReportRequest { query, outputs };
        self.post_envelope(&url, &body).await
    }
}
