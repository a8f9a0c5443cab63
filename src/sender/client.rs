use super::envelope::DeliveryEnvelope;
use crate::app::Config;
use reqwest::{Client, ClientBuilder};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// `code` value the collector uses for success.
pub const SUCCESS_CODE: i64 = 200;

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),
    #[error("HTTP error: {status}")]
    HttpStatus { status: u16 },
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
    #[error("Collector rejected request: {code} - {message}")]
    Rejected { code: i64, message: String },
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
    pub access_token: String,
    pub timeout: Duration,
    pub connection_timeout: Duration,
    pub user_agent: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".to_string(),
            access_token: String::new(),
            timeout: Duration::from_secs(30),
            connection_timeout: Duration::from_secs(10),
            user_agent: format!("remote-log/{}", crate::VERSION),
        }
    }
}

impl From<&Config> for ClientConfig {
    fn from(config: &Config) -> Self {
        Self {
            base_url: config.api_url.clone(),
            access_token: config.access_token.clone(),
            timeout: config.request_timeout(),
            ..Self::default()
        }
    }
}

/// `{code, message}` body returned by every collector endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectorResponse {
    pub code: i64,
    #[serde(default)]
    pub message: String,
}

/// Pooled client for the collector API.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
    config: ClientConfig,
    collect_url: Url,
    storage_days_url: Url,
}

impl HttpClient {
    pub fn new(config: ClientConfig) -> Result<Self, ClientError> {
        let base_url: Url = config.base_url.parse().map_err(|e| {
            ClientError::InvalidConfiguration(format!("Invalid collector URL: {e}"))
        })?;

        let mut collect_url = endpoint_url(&base_url, "api/collectLog");
        collect_url
            .query_pairs_mut()
            .append_pair("pwd", &config.access_token);
        let storage_days_url = endpoint_url(&base_url, "api/appStorageDays");

        let client = ClientBuilder::new()
            .timeout(config.timeout)
            .connect_timeout(config.connection_timeout)
            .user_agent(&config.user_agent)
            .build()
            .map_err(|e| {
                ClientError::InvalidConfiguration(format!("Failed to build HTTP client: {e}"))
            })?;

        Ok(Self {
            client,
            config,
            collect_url,
            storage_days_url,
        })
    }

    pub fn collect_url(&self) -> &Url {
        &self.collect_url
    }

    /// `POST /api/collectLog` with one envelope.
    pub async fn collect_log(&self, envelope: &DeliveryEnvelope) -> Result<(), ClientError> {
        let request = self.client.post(self.collect_url.clone()).json(envelope);
        self.execute(request).await
    }

    /// `GET /api/appStorageDays`, registering how long the collector keeps
    /// this application's logs.
    pub async fn register_storage_days(
        &self,
        app_name: &str,
        storage_days: u32,
    ) -> Result<(), ClientError> {
        let mut url = self.storage_days_url.clone();
        url.query_pairs_mut()
            .append_pair("app", app_name)
            .append_pair("storageDays", &storage_days.to_string())
            .append_pair("pwd", &self.config.access_token);

        self.execute(self.client.get(url)).await
    }

    async fn execute(&self, request: reqwest::RequestBuilder) -> Result<(), ClientError> {
        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;

        let parsed: CollectorResponse = match serde_json::from_str(&body) {
            Ok(parsed) => parsed,
            Err(_) if !status.is_success() => {
                return Err(ClientError::HttpStatus {
                    status: status.as_u16(),
                });
            }
            Err(e) => {
                return Err(ClientError::InvalidResponse(format!(
                    "unparsable collector response: {e}"
                )));
            }
        };

        if parsed.code != SUCCESS_CODE {
            return Err(ClientError::Rejected {
                code: parsed.code,
                message: parsed.message,
            });
        }
        Ok(())
    }
}

/// Appends `path` to whatever path prefix the base URL already carries.
fn endpoint_url(base: &Url, path: &str) -> Url {
    let mut url = base.clone();
    let prefix = base.path().trim_end_matches('/');
    url.set_path(&format!("{prefix}/{path}"));
    url.set_query(None);
    url
}
