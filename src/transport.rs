//! Transport abstraction over the TeamCity REST API
//!
//! The core only needs one call shape: GET a REST path with query parameters
//! and get parsed JSON back, with failures classified into the error
//! taxonomy. [`HttpTransport`] is the real reqwest-backed implementation;
//! [`ScriptedTransport`] replays a scripted sequence of outcomes for tests.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use crate::config::{AuthConfig, ClientConfig};
use crate::error::{Result, TeamCityError};

/// A single logical remote call: the only thing resilience wraps.
#[async_trait]
pub trait Transport: Send + Sync {
    /// GET `path` (relative to the REST API root) with query parameters,
    /// returning the parsed JSON body.
    async fn get(&self, path: &str, query: &[(String, String)]) -> Result<Value>;
}

/// Real HTTP transport over `reqwest`.
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
    auth: AuthConfig,
}

impl HttpTransport {
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .build()
            .map_err(|e| TeamCityError::Config {
                message: format!("failed to build HTTP client: {e}"),
            })?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            auth: config.auth.clone(),
        })
    }

    fn url_for(&self, path: &str) -> String {
        format!("{}/app/rest/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn classify_send_error(err: reqwest::Error) -> TeamCityError {
        if err.is_timeout() {
            TeamCityError::Timeout {
                message: err.to_string(),
            }
        } else {
            TeamCityError::Network {
                message: err.to_string(),
            }
        }
    }

    /// `Retry-After` in whole seconds; HTTP-date forms are ignored.
    fn retry_after(response: &reqwest::Response) -> Option<u64> {
        response
            .headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok())
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get(&self, path: &str, query: &[(String, String)]) -> Result<Value> {
        let mut request = self
            .client
            .get(self.url_for(path))
            .header(reqwest::header::ACCEPT, "application/json")
            .query(query);

        request = match &self.auth {
            AuthConfig::Guest => request,
            AuthConfig::Token { token } => request.bearer_auth(token),
            AuthConfig::Basic { username, password } => {
                request.basic_auth(username, Some(password))
            }
        };

        let response = request.send().await.map_err(Self::classify_send_error)?;

        let status = response.status();
        if !status.is_success() {
            let retry_after = Self::retry_after(&response);
            let body = response.text().await.unwrap_or_default();
            return Err(TeamCityError::from_status(status.as_u16(), body, retry_after));
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| TeamCityError::Network {
                message: format!("failed to read response body: {e}"),
            })
    }
}

/// A recorded GET issued against a [`ScriptedTransport`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCall {
    pub path: String,
    pub query: Vec<(String, String)>,
}

/// Transport that replays a fixed script of outcomes, for tests.
#[derive(Default)]
pub struct ScriptedTransport {
    script: Mutex<VecDeque<Result<Value>>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl ScriptedTransport {
    pub fn new(script: Vec<Result<Value>>) -> Self {
        Self {
            script: Mutex::new(script.into_iter().collect()),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Every call issued so far, in order.
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn get(&self, path: &str, query: &[(String, String)]) -> Result<Value> {
        self.calls.lock().unwrap().push(RecordedCall {
            path: path.to_string(),
            query: query.to_vec(),
        });
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(TeamCityError::Other("transport script exhausted".to_string())))
    }
}
