use std::time::Duration;

use monitor_core::{AgentId, AuthDescriptor, LogEntry, RunMode, RunOptions, StatusSnapshot};
use reqwest::header::{CONTENT_TYPE, RETRY_AFTER};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::{ApiError, FailureKind, ReportParams};

#[derive(Debug, Clone)]
pub struct ApiSettings {
    pub base_url: String,
    pub report_base_url: String,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8000/api".to_string(),
            report_base_url: "http://127.0.0.1:8001/api".to_string(),
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
        }
    }
}

/// Remote collaborators of the monitor: the agent service and the report
/// service. Every method fails with an [`ApiError`]; none panics.
#[async_trait::async_trait]
pub trait AgentApi: Send + Sync {
    async fn fetch_status(&self, agent_id: &AgentId) -> Result<StatusSnapshot, ApiError>;

    async fn fetch_logs(&self, agent_id: &AgentId, limit: usize)
        -> Result<Vec<LogEntry>, ApiError>;

    async fn start_run(&self, target: &str, options: &RunOptions) -> Result<AgentId, ApiError>;

    async fn stop_run(&self, agent_id: &AgentId) -> Result<(), ApiError>;

    async fn generate_report(&self, params: &ReportParams) -> Result<String, ApiError>;
}

#[derive(Debug, Serialize)]
struct StartRunBody<'a> {
    target: &'a str,
    mode: RunMode,
    #[serde(skip_serializing_if = "Option::is_none")]
    prompt: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    auth: Option<&'a AuthDescriptor>,
    #[serde(skip_serializing_if = "Option::is_none")]
    provider: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    model: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct StartRunResponse {
    #[serde(alias = "agentId")]
    agent_id: AgentId,
}

#[derive(Debug, Serialize)]
struct ReportBody<'a> {
    agent_id: &'a str,
    target: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    scan_id: Option<&'a str>,
    finding_count: usize,
}

#[derive(Debug, Deserialize)]
struct ReportResponse {
    #[serde(alias = "reportId")]
    report_id: String,
}

/// The log endpoint answers either with a bare array or wrapped in `logs`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum LogsResponse {
    Bare(Vec<LogEntry>),
    Wrapped { logs: Vec<LogEntry> },
}

#[derive(Debug, Clone)]
pub struct ReqwestAgentApi {
    settings: ApiSettings,
    client: reqwest::Client,
}

impl ReqwestAgentApi {
    pub fn new(settings: ApiSettings) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .connect_timeout(settings.connect_timeout)
            .timeout(settings.request_timeout)
            .build()
            .map_err(|err| ApiError::new(FailureKind::Network, err.to_string()))?;
        Ok(Self { settings, client })
    }

    async fn get_json<T: DeserializeOwned>(&self, url: reqwest::Url) -> Result<T, ApiError> {
        let response = self.client.get(url).send().await.map_err(map_reqwest_error)?;
        decode(read_body(response).await?)
    }

    async fn post_json<B: Serialize>(
        &self,
        url: reqwest::Url,
        body: &B,
    ) -> Result<Vec<u8>, ApiError> {
        let payload = serde_json::to_vec(body)
            .map_err(|err| ApiError::new(FailureKind::Decode, err.to_string()))?;
        let response = self
            .client
            .post(url)
            .header(CONTENT_TYPE, "application/json")
            .body(payload)
            .send()
            .await
            .map_err(map_reqwest_error)?;
        read_body(response).await
    }
}

#[async_trait::async_trait]
impl AgentApi for ReqwestAgentApi {
    async fn fetch_status(&self, agent_id: &AgentId) -> Result<StatusSnapshot, ApiError> {
        let url = endpoint(
            &self.settings.base_url,
            &["agents", agent_id.as_str(), "status"],
        )?;
        self.get_json(url).await
    }

    async fn fetch_logs(
        &self,
        agent_id: &AgentId,
        limit: usize,
    ) -> Result<Vec<LogEntry>, ApiError> {
        let mut url = endpoint(&self.settings.base_url, &["agents", agent_id.as_str(), "logs"])?;
        url.query_pairs_mut()
            .append_pair("limit", &limit.to_string());
        let logs = match self.get_json::<LogsResponse>(url).await? {
            LogsResponse::Bare(logs) | LogsResponse::Wrapped { logs } => logs,
        };
        Ok(logs)
    }

    async fn start_run(&self, target: &str, options: &RunOptions) -> Result<AgentId, ApiError> {
        let url = endpoint(&self.settings.base_url, &["agents"])?;
        let body = StartRunBody {
            target,
            mode: options.mode,
            prompt: options.prompt.as_deref(),
            auth: options.auth.as_ref(),
            provider: options.provider.as_deref(),
            model: options.model.as_deref(),
        };
        let response: StartRunResponse = decode(self.post_json(url, &body).await?)?;
        if response.agent_id.is_empty() {
            return Err(ApiError::new(FailureKind::Decode, "empty agent id"));
        }
        Ok(response.agent_id)
    }

    async fn stop_run(&self, agent_id: &AgentId) -> Result<(), ApiError> {
        let url = endpoint(&self.settings.base_url, &["agents", agent_id.as_str(), "stop"])?;
        self.post_json(url, &serde_json::json!({})).await?;
        Ok(())
    }

    async fn generate_report(&self, params: &ReportParams) -> Result<String, ApiError> {
        let url = endpoint(&self.settings.report_base_url, &["reports"])?;
        let body = ReportBody {
            agent_id: params.agent_id.as_str(),
            target: &params.target,
            scan_id: params.scan_id.as_deref(),
            finding_count: params.finding_count,
        };
        let response: ReportResponse = decode(self.post_json(url, &body).await?)?;
        Ok(response.report_id)
    }
}

fn endpoint(base: &str, segments: &[&str]) -> Result<reqwest::Url, ApiError> {
    let mut url = reqwest::Url::parse(base)
        .map_err(|err| ApiError::new(FailureKind::InvalidUrl, err.to_string()))?;
    url.path_segments_mut()
        .map_err(|_| ApiError::new(FailureKind::InvalidUrl, format!("{base} cannot be a base")))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

async fn read_body(response: reqwest::Response) -> Result<Vec<u8>, ApiError> {
    let status = response.status();
    if status == StatusCode::TOO_MANY_REQUESTS {
        let retry_after_secs = response
            .headers()
            .get(RETRY_AFTER)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.trim().parse::<u64>().ok());
        let message = error_text(response.text().await.unwrap_or_default(), status);
        return Err(ApiError::new(
            FailureKind::RateLimited { retry_after_secs },
            message,
        ));
    }
    if !status.is_success() {
        let message = error_text(response.text().await.unwrap_or_default(), status);
        return Err(ApiError::new(FailureKind::HttpStatus(status.as_u16()), message));
    }
    let bytes = response.bytes().await.map_err(map_reqwest_error)?;
    Ok(bytes.to_vec())
}

/// Services put the reason in `detail` or `error`; fall back to the raw body.
fn error_text(body: String, status: StatusCode) -> String {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return status.to_string();
    }
    serde_json::from_str::<serde_json::Value>(trimmed)
        .ok()
        .and_then(|value| {
            ["detail", "error", "message"]
                .iter()
                .find_map(|key| value.get(key).and_then(|v| v.as_str()).map(str::to_owned))
        })
        .unwrap_or_else(|| trimmed.to_string())
}

fn decode<T: DeserializeOwned>(bytes: Vec<u8>) -> Result<T, ApiError> {
    serde_json::from_slice(&bytes).map_err(|err| ApiError::new(FailureKind::Decode, err.to_string()))
}

fn map_reqwest_error(err: reqwest::Error) -> ApiError {
    if err.is_timeout() {
        return ApiError::new(FailureKind::Timeout, err.to_string());
    }
    if err.is_decode() {
        return ApiError::new(FailureKind::Decode, err.to_string());
    }
    ApiError::new(FailureKind::Network, err.to_string())
}
