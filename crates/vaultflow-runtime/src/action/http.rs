//! Built-in `HTTP_REQUEST` action.

use std::collections::HashMap;
use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use super::{ActionError, ActionHandler, ActionResult, TRACING_TARGET};
use crate::definition::RetryPolicy;
use crate::event::{Event, Resolved};

/// Registry key of the built-in HTTP action.
pub const HTTP_REQUEST: &str = "HTTP_REQUEST";

/// Matches `{{ field.path }}` placeholders.
static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{\s*([A-Za-z0-9_.]+)\s*\}\}").expect("valid pattern"));

/// Configuration schema for [`HttpRequestAction`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HttpRequestConfig {
    /// HTTP method.
    pub method: String,
    /// Request URL; may contain `{{field}}` placeholders resolved
    /// against the event context before dispatch.
    pub url: String,
    /// Extra request headers; values support placeholders.
    #[serde(default)]
    pub headers: HashMap<String, String>,
    /// Authentication descriptor.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth: Option<HttpAuth>,
    /// JSON body; string leaves support placeholders.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<serde_json::Value>,
    /// Request timeout in milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
    /// Opt-in retry on failure (bounded attempts with backoff).
    #[serde(default)]
    pub retry_on_failure: bool,
}

/// Authentication descriptor for outgoing requests.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "scheme", rename_all = "snake_case")]
pub enum HttpAuth {
    /// `Authorization: Bearer <token>`.
    Bearer {
        /// The bearer token.
        token: String,
    },
    /// HTTP basic auth.
    Basic {
        /// Username.
        username: String,
        /// Password.
        password: String,
    },
}

/// The canonical built-in action: performs an HTTP request against an
/// external system, interpolating event-context fields into the URL,
/// headers and body.
#[derive(Debug, Clone, Default)]
pub struct HttpRequestAction {
    client: reqwest::Client,
}

impl HttpRequestAction {
    /// Creates the action with a default client.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates the action with a preconfigured client.
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    fn parse_config(config: &serde_json::Value) -> Result<HttpRequestConfig, ActionError> {
        serde_json::from_value(config.clone())
            .map_err(|e| ActionError::InvalidConfig(e.to_string()))
    }

    async fn send(&self, config: &HttpRequestConfig, event: &Event) -> ActionResult {
        let method = parse_method(&config.method)
            .ok_or_else(|| ActionError::InvalidConfig(format!("invalid method: {}", config.method)))?;

        let url = interpolate(&config.url, event);
        let mut request = self.client.request(method, &url);

        for (name, value) in &config.headers {
            request = request.header(name, interpolate(value, event));
        }
        match &config.auth {
            Some(HttpAuth::Bearer { token }) => {
                request = request.bearer_auth(token);
            }
            Some(HttpAuth::Basic { username, password }) => {
                request = request.basic_auth(username, Some(password));
            }
            None => {}
        }
        if let Some(body) = &config.body {
            request = request.json(&interpolate_value(body, event));
        }
        if let Some(timeout_ms) = config.timeout_ms {
            request = request.timeout(Duration::from_millis(timeout_ms));
        }

        tracing::debug!(target: TRACING_TARGET, %url, "sending http action request");

        let response = request
            .send()
            .await
            .map_err(|e| ActionError::Failed(e.to_string()))?;

        let status = response.status();
        let body: serde_json::Value = match response.json().await {
            Ok(json) => json,
            Err(_) => serde_json::Value::Null,
        };

        if !status.is_success() {
            return Err(ActionError::Failed(format!("HTTP {status}")));
        }

        Ok(serde_json::json!({
            "status": status.as_u16(),
            "body": body,
        }))
    }
}

#[async_trait::async_trait]
impl ActionHandler for HttpRequestAction {
    fn action_type(&self) -> &str {
        HTTP_REQUEST
    }

    fn validate_config(&self, config: &serde_json::Value) -> Vec<String> {
        let parsed = match Self::parse_config(config) {
            Ok(parsed) => parsed,
            Err(e) => return vec![e.to_string()],
        };

        let mut errors = Vec::new();
        if parse_method(&parsed.method).is_none() {
            errors.push(format!("invalid method: {}", parsed.method));
        }
        if parsed.url.is_empty() {
            errors.push("url must not be empty".to_string());
        }
        errors
    }

    async fn execute(
        &self,
        config: &serde_json::Value,
        event: &Event,
        cancel: CancellationToken,
    ) -> ActionResult {
        let config = Self::parse_config(config)?;

        tokio::select! {
            _ = cancel.cancelled() => Err(ActionError::Cancelled),
            result = self.send(&config, event) => result,
        }
    }

    fn timeout(&self, config: &serde_json::Value) -> Option<Duration> {
        Self::parse_config(config)
            .ok()
            .and_then(|c| c.timeout_ms)
            .map(Duration::from_millis)
    }

    fn retry_policy(&self, config: &serde_json::Value) -> Option<RetryPolicy> {
        let retry = Self::parse_config(config)
            .map(|c| c.retry_on_failure)
            .unwrap_or(false);
        retry.then_some(RetryPolicy {
            max_attempts: 3,
            backoff_ms: 250,
        })
    }
}

/// Maps a method name onto the standard set, case-insensitively.
/// Extension methods are not supported.
fn parse_method(method: &str) -> Option<reqwest::Method> {
    match method.to_uppercase().as_str() {
        "GET" => Some(reqwest::Method::GET),
        "POST" => Some(reqwest::Method::POST),
        "PUT" => Some(reqwest::Method::PUT),
        "PATCH" => Some(reqwest::Method::PATCH),
        "DELETE" => Some(reqwest::Method::DELETE),
        "HEAD" => Some(reqwest::Method::HEAD),
        _ => None,
    }
}

/// Replaces `{{field}}` placeholders with values from the event context.
///
/// Strings render raw, other scalars via their JSON form; an unresolved
/// field renders as the empty string.
fn interpolate(template: &str, event: &Event) -> String {
    PLACEHOLDER
        .replace_all(template, |caps: &regex::Captures<'_>| {
            match event.resolve(&caps[1]) {
                Resolved::Value(serde_json::Value::String(s)) => s.clone(),
                Resolved::Value(value) => value.to_string(),
                Resolved::Undefined => String::new(),
            }
        })
        .into_owned()
}

/// Interpolates every string leaf of a JSON value.
fn interpolate_value(value: &serde_json::Value, event: &Event) -> serde_json::Value {
    match value {
        serde_json::Value::String(s) => serde_json::Value::String(interpolate(s, event)),
        serde_json::Value::Array(items) => serde_json::Value::Array(
            items.iter().map(|item| interpolate_value(item, event)).collect(),
        ),
        serde_json::Value::Object(map) => serde_json::Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), interpolate_value(v, event)))
                .collect(),
        ),
        other => other.clone(),
    }
}
