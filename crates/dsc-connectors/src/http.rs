//! HTTP client for connector management APIs.
//!
//! Each call is sent exactly once: no retry, no backoff. Transport and status
//! failures are mapped onto the remote-call variants of [`ConnectorError`].

use crate::secure_string::SecureString;
use crate::traits::{ConnectorError, ConnectorResult};
use reqwest::{Client, Response, StatusCode};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

/// Maximum number of body characters quoted in error messages.
const BODY_EXCERPT_LEN: usize = 500;

/// Credentials presented to the management API.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AuthConfig {
    None,
    Basic {
        username: String,
        password: SecureString,
    },
    BearerToken {
        token: SecureString,
    },
}

/// Configuration of one management API surface.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Surface name used in log fields, e.g. "control".
    pub name: String,
    pub base_url: String,
    pub auth: AuthConfig,
    /// Per-request timeout; `None` waits indefinitely.
    pub timeout_secs: Option<u64>,
    pub verify_tls: bool,
}

/// JSON-over-HTTP client bound to one base URL.
pub struct HttpClient {
    client: Client,
    config: ClientConfig,
}

impl HttpClient {
    pub fn new(config: ClientConfig) -> ConnectorResult<Self> {
        if !config.verify_tls {
            warn!(
                base_url = %config.base_url,
                surface = %config.name,
                "TLS certificate verification disabled"
            );
        }

        let mut builder = Client::builder()
            .danger_accept_invalid_certs(!config.verify_tls)
            .pool_idle_timeout(Duration::from_secs(90));
        if let Some(secs) = config.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }

        let client = builder
            .build()
            .map_err(|e| ConnectorError::ConfigError(e.to_string()))?;

        Ok(Self { client, config })
    }

    /// Joins `path` onto the base URL with exactly one slash between them.
    pub fn build_url(&self, path: &str) -> String {
        let base = self.config.base_url.trim_end_matches('/');
        let path = path.trim_start_matches('/');
        format!("{}/{}", base, path)
    }

    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    /// GETs `path` and deserializes the JSON response.
    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> ConnectorResult<T> {
        let request = self.client.get(self.build_url(path));
        let response = self.execute(request).await?;
        parse_json_response(response).await
    }

    /// POSTs `body` as JSON and deserializes the JSON response.
    pub async fn post_json<T: Serialize + ?Sized, R: DeserializeOwned>(
        &self,
        path: &str,
        body: &T,
    ) -> ConnectorResult<R> {
        let response = self.post(path, body).await?;
        parse_json_response(response).await
    }

    /// POSTs `body` as JSON and returns the response as an untyped value.
    ///
    /// An empty response body yields `Value::Null`.
    pub async fn post_value<T: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &T,
    ) -> ConnectorResult<serde_json::Value> {
        let response = self.post(path, body).await?;
        let text = read_body(response).await?;
        if text.trim().is_empty() {
            return Ok(serde_json::Value::Null);
        }
        parse_json_text(StatusCode::OK, &text)
    }

    /// POSTs `body` as JSON, returning the raw response on success.
    pub async fn post<T: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &T,
    ) -> ConnectorResult<Response> {
        let request = self.client.post(self.build_url(path)).json(body);
        self.execute(request).await
    }

    async fn execute(&self, request: reqwest::RequestBuilder) -> ConnectorResult<Response> {
        let request = self.add_auth(request);

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                ConnectorError::Timeout(e.to_string())
            } else if e.is_connect() {
                ConnectorError::ConnectionFailed(e.to_string())
            } else {
                ConnectorError::RemoteCallFailed(e.to_string())
            }
        })?;

        let status = response.status();
        debug!(
            surface = %self.config.name,
            url = %response.url(),
            %status,
            "management API response"
        );

        if status.is_success() {
            return Ok(response);
        }

        Err(match status {
            StatusCode::UNAUTHORIZED => {
                ConnectorError::AuthenticationFailed("Unauthorized".into())
            }
            StatusCode::FORBIDDEN => ConnectorError::AuthorizationDenied("Forbidden".into()),
            StatusCode::NOT_FOUND => {
                ConnectorError::NotFound(format!("{} returned 404", response.url()))
            }
            _ => {
                let body = response.text().await.unwrap_or_default();
                ConnectorError::RemoteCallFailed(format!(
                    "status {}: {}",
                    status,
                    excerpt(&body)
                ))
            }
        })
    }

    fn add_auth(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.config.auth {
            AuthConfig::None => request,
            AuthConfig::Basic { username, password } => {
                request.basic_auth(username, Some(password.expose_secret()))
            }
            AuthConfig::BearerToken { token } => request.bearer_auth(token.expose_secret()),
        }
    }
}

async fn read_body(response: Response) -> ConnectorResult<String> {
    response
        .text()
        .await
        .map_err(|e| ConnectorError::InvalidResponse(e.to_string()))
}

async fn parse_json_response<T: DeserializeOwned>(response: Response) -> ConnectorResult<T> {
    let status = response.status();
    let text = read_body(response).await?;
    parse_json_text(status, &text)
}

fn parse_json_text<T: DeserializeOwned>(status: StatusCode, text: &str) -> ConnectorResult<T> {
    serde_json::from_str(text).map_err(|e| {
        ConnectorError::InvalidResponse(format!(
            "Failed to parse response (status {}): {} - Body: {}",
            status,
            e,
            excerpt(text)
        ))
    })
}

fn excerpt(text: &str) -> String {
    text.chars().take(BODY_EXCERPT_LEN).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_config() -> ClientConfig {
        ClientConfig {
            name: "datamanagement".to_string(),
            base_url: "https://edcconsumer/api/v1/data/".to_string(),
            auth: AuthConfig::Basic {
                username: "admin".to_string(),
                password: SecureString::from("password"),
            },
            timeout_secs: None,
            verify_tls: true,
        }
    }

    #[test]
    fn test_build_url() {
        let client = HttpClient::new(create_test_config()).unwrap();

        assert_eq!(
            client.build_url("/contractnegotiations"),
            "https://edcconsumer/api/v1/data/contractnegotiations"
        );
        assert_eq!(
            client.build_url("catalog/request"),
            "https://edcconsumer/api/v1/data/catalog/request"
        );
    }

    #[test]
    fn test_client_with_timeout() {
        let mut config = create_test_config();
        config.timeout_secs = Some(5);
        assert!(HttpClient::new(config).is_ok());
    }

    #[test]
    fn test_parse_json_text_reports_body() {
        let result: ConnectorResult<serde_json::Value> =
            parse_json_text(StatusCode::OK, "<html>oops</html>");
        match result {
            Err(ConnectorError::InvalidResponse(msg)) => assert!(msg.contains("<html>oops")),
            other => panic!("Expected InvalidResponse, got {:?}", other),
        }
    }

    #[test]
    fn test_excerpt_truncates() {
        let long = "x".repeat(2 * BODY_EXCERPT_LEN);
        assert_eq!(excerpt(&long).len(), BODY_EXCERPT_LEN);
    }

    #[test]
    fn test_auth_config_debug_redacts_password() {
        let config = ClientConfig {
            auth: AuthConfig::Basic {
                username: "admin".to_string(),
                password: SecureString::from("s3cret"),
            },
            ..create_test_config()
        };
        let debug = format!("{:?}", config.auth);
        assert!(!debug.contains("s3cret"));
        assert!(debug.contains("REDACTED"));
    }
}
