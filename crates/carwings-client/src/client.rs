//! Carwings gateway HTTP transport
//!
//! Every gateway call is a form-encoded `POST` to `{base_url}/{Action}.php`
//! answered by a JSON object whose `status` field carries the vendor's own
//! result code. This module owns that envelope; callers only see the body.

use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde_json::Value;
use tracing::{debug, instrument};
use url::Url;

use crate::error::{CarwingsError, Result};

/// Default request timeout
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
/// Default connection timeout
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Static key the mobile app identifies itself with
pub(crate) const INITIAL_APP_STR: &str = "9s5rfKVuMrT03RtzajWNcA";

/// HTTP settings for a session
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub timeout: Duration,
    pub connect_timeout: Duration,
    /// Language tag sent as `lg`
    pub language: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            language: "en-US".to_string(),
        }
    }
}

/// Gateway endpoints used by this crate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Action {
    InitialApp,
    UserLogin,
    BatteryStatusRecords,
    RemoteAcRecords,
    BatteryStatusCheck,
    BatteryStatusCheckResult,
}

impl Action {
    fn path(&self) -> &'static str {
        match self {
            Action::InitialApp => "InitialApp_v2.php",
            Action::UserLogin => "UserLoginRequest.php",
            Action::BatteryStatusRecords => "BatteryStatusRecordsRequest.php",
            Action::RemoteAcRecords => "RemoteACRecordsRequest.php",
            Action::BatteryStatusCheck => "BatteryStatusCheckRequest.php",
            Action::BatteryStatusCheckResult => "BatteryStatusCheckResultRequest.php",
        }
    }
}

/// Unauthenticated Carwings HTTP client
///
/// A [`Session`](crate::Session) owns exactly one of these and drops it on
/// logout.
#[derive(Debug)]
pub(crate) struct CarwingsClient {
    client: Client,
    base_url: Url,
}

impl CarwingsClient {
    /// Create a new client for the given gateway URL
    pub fn with_config(base_url: &str, config: &ClientConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .build()?;

        let base_url = normalize_base_url(base_url)?;

        Ok(Self { client, base_url })
    }

    /// Get the base URL
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Send one action and return the reply body once the envelope is checked
    pub(crate) async fn post(&self, action: Action, params: &[(&str, &str)]) -> Result<Value> {
        let value = self.fetch(action, params).await?;
        check_envelope(&value)?;
        Ok(value)
    }

    /// Send one action and return the JSON body without looking at `status`
    #[instrument(skip(self, params))]
    pub(crate) async fn fetch(&self, action: Action, params: &[(&str, &str)]) -> Result<Value> {
        let url = self.base_url.join(action.path())?;
        debug!("POST {}", url);

        let response = self.client.post(url).form(params).send().await?;
        self.handle_response(response).await
    }

    async fn handle_response(&self, response: reqwest::Response) -> Result<Value> {
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(extract_error(status, &body));
        }

        let value: Value = serde_json::from_str(&body)
            .map_err(|e| CarwingsError::remote(None, format!("malformed reply: {}", e)))?;

        Ok(value)
    }
}

/// Make sure relative joins land below the configured path
fn normalize_base_url(base_url: &str) -> Result<Url> {
    let mut url = Url::parse(base_url)?;
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

/// Vendor `status` code of a reply; the gateway sends it as a number or a string
pub(crate) fn envelope_status(value: &Value) -> Option<u16> {
    match value.get("status")? {
        Value::Number(n) => n.as_u64().and_then(|n| u16::try_from(n).ok()),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn envelope_message(value: &Value) -> Option<String> {
    ["ErrorMessage", "message", "ErrorCode"]
        .iter()
        .find_map(|key| value.get(*key).and_then(Value::as_str))
        .map(String::from)
}

pub(crate) fn check_envelope(value: &Value) -> Result<()> {
    if !value.is_object() {
        return Err(CarwingsError::remote(None, "reply is not a JSON object"));
    }

    match envelope_status(value) {
        Some(200) => Ok(()),
        Some(status) => Err(CarwingsError::remote(
            Some(status),
            envelope_message(value).unwrap_or_else(|| "request rejected".to_string()),
        )),
        None => Err(CarwingsError::remote(None, "reply has no status field")),
    }
}

fn extract_error(status: StatusCode, body: &str) -> CarwingsError {
    // Try to parse error response body
    let message = serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| envelope_message(&v))
        .unwrap_or_else(|| format!("HTTP {}", status));

    CarwingsError::remote(Some(status.as_u16()), message)
}
