//! Connector controller contract.
//!
//! This module defines the interface an orchestrating layer uses to drive a
//! dataspace connector, independent of the connector product behind it, and
//! the value types exchanged over that interface.

use crate::secure_string::SecureString;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// Errors that can occur in connector controllers.
#[derive(Error, Debug, Clone)]
pub enum ConnectorError {
    #[error("Not implemented: {0}")]
    NotImplemented(String),

    #[error("Precondition not met: {0}")]
    PreconditionNotMet(String),

    #[error("Unsupported usage policy: {0}")]
    UnsupportedPolicy(String),

    #[error("Unknown contract agreement: {0}")]
    UnknownAgreement(String),

    #[error("Negotiation {negotiation_id} not confirmed after {attempts} polls")]
    NegotiationNeverConfirmed {
        negotiation_id: String,
        attempts: u32,
    },

    #[error("Negotiation {negotiation_id} ended in state {state}{}", detail_suffix(.detail))]
    NegotiationTerminated {
        negotiation_id: String,
        state: String,
        detail: Option<String>,
    },

    #[error("Cancelled: {0}")]
    Cancelled(String),

    #[error("Remote call failed: {0}")]
    RemoteCallFailed(String),

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Authorization denied: {0}")]
    AuthorizationDenied(String),

    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ConnectorError {
    /// Returns true for failures reported by (or while reaching) the remote
    /// management API.
    pub fn is_remote_failure(&self) -> bool {
        matches!(
            self,
            Self::RemoteCallFailed(_)
                | Self::AuthenticationFailed(_)
                | Self::AuthorizationDenied(_)
                | Self::ConnectionFailed(_)
                | Self::NotFound(_)
                | Self::InvalidResponse(_)
                | Self::Timeout(_)
        )
    }
}

fn detail_suffix(detail: &Option<String>) -> String {
    detail
        .as_deref()
        .map(|d| format!(": {}", d))
        .unwrap_or_default()
}

/// Result type for connector operations.
pub type ConnectorResult<T> = Result<T, ConnectorError>;

/// A named network access point of a connector instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoint {
    /// Endpoint name, e.g. "control" or "ids".
    pub name: String,
    /// Host-relative path, e.g. "/api/v1/ids".
    pub path: String,
    pub port: u16,
}

impl Endpoint {
    pub fn new(name: impl Into<String>, path: impl Into<String>, port: u16) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            port,
        }
    }
}

/// An offer advertised in a peer's catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OfferedResource {
    pub offer_id: String,
    pub contract_offer_id: String,
    pub asset_id: String,
    pub asset_name: String,
}

/// Result of a successful contract negotiation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NegotiatedContract {
    /// The contract agreement id assigned by the provider.
    pub contract_id: String,
}

/// Descriptive metadata of an artifact being published.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Artifact {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub start: Option<DateTime<Utc>>,
    #[serde(default)]
    pub end: Option<DateTime<Utc>>,
}

/// The family of usage-policy patterns a controller may be asked to enforce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UsagePolicyType {
    /// Use without restriction.
    Unrestricted,
    /// No use at all.
    ProhibitAccess,
    /// Use allowed within a time interval.
    UsageDuringInterval,
    /// Use allowed for a limited duration.
    DurationUsage,
    /// Use allowed a limited number of times.
    NTimesUsage,
    /// Each use is logged.
    UsageLogging,
    /// Each use triggers a notification.
    UsageNotification,
    /// Use restricted to a named connector.
    ConnectorRestrictedUsage,
    /// Use restricted to a security profile.
    SecurityProfileRestrictedUsage,
}

impl std::fmt::Display for UsagePolicyType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Unrestricted => "unrestricted",
            Self::ProhibitAccess => "prohibit_access",
            Self::UsageDuringInterval => "usage_during_interval",
            Self::DurationUsage => "duration_usage",
            Self::NTimesUsage => "n_times_usage",
            Self::UsageLogging => "usage_logging",
            Self::UsageNotification => "usage_notification",
            Self::ConnectorRestrictedUsage => "connector_restricted_usage",
            Self::SecurityProfileRestrictedUsage => "security_profile_restricted_usage",
        };
        f.write_str(name)
    }
}

/// An abstract usage-policy descriptor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsagePolicy {
    #[serde(rename = "type")]
    pub policy_type: UsagePolicyType,
    /// Pattern-specific parameters (interval bounds, counts, connector ids...).
    #[serde(default)]
    pub parameters: HashMap<String, serde_json::Value>,
}

impl UsagePolicy {
    pub fn new(policy_type: UsagePolicyType) -> Self {
        Self {
            policy_type,
            parameters: HashMap::new(),
        }
    }

    pub fn unrestricted() -> Self {
        Self::new(UsagePolicyType::Unrestricted)
    }
}

/// Descriptive fields of an offer to publish.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OfferDescription {
    pub name: String,
    pub description: Option<String>,
    #[serde(default)]
    pub keywords: Vec<String>,
    pub publisher: Option<String>,
    pub language: Option<String>,
    pub license: Option<String>,
    pub sovereign: Option<String>,
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

/// How an offered artifact is represented.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Representation {
    pub name: Option<String>,
    pub standard: Option<String>,
    pub media_type: String,
}

/// Catalog an offer is filed under.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogDescription {
    pub name: String,
    pub description: Option<String>,
}

/// API key presented to an HTTP data source.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiKeyAuth {
    pub header_key: String,
    pub value: SecureString,
}

/// Basic credentials presented to an HTTP data source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BasicAuth {
    pub username: String,
    pub password: SecureString,
}

/// Polling schedule for a data source, in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourcePolling {
    pub delay: u64,
    pub period: u64,
}

/// An HTTP endpoint backing an artifact.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HttpEndpointSource {
    pub url: String,
    pub mime_type: String,
    #[serde(default)]
    pub api_key: Option<ApiKeyAuth>,
    #[serde(default)]
    pub basic_auth: Option<BasicAuth>,
    #[serde(default)]
    pub polling: Option<ResourcePolling>,
}

impl HttpEndpointSource {
    pub fn new(url: impl Into<String>, mime_type: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            mime_type: mime_type.into(),
            api_key: None,
            basic_auth: None,
            polling: None,
        }
    }

    pub fn with_basic_auth(mut self, username: impl Into<String>, password: &str) -> Self {
        self.basic_auth = Some(BasicAuth {
            username: username.into(),
            password: SecureString::from(password),
        });
        self
    }

    pub fn with_api_key(mut self, header_key: impl Into<String>, value: &str) -> Self {
        self.api_key = Some(ApiKeyAuth {
            header_key: header_key.into(),
            value: SecureString::from(value),
        });
        self
    }
}

/// Database engines a database-backed artifact can point at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DatabaseType {
    Postgres,
    MySql,
    Oracle,
    SqlServer,
    H2,
}

/// A database query backing an artifact.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatabaseSource {
    pub url: String,
    pub database: DatabaseType,
    pub username: String,
    pub password: SecureString,
    pub sql_query: String,
}

/// Location of an artifact made available under an agreement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactLink {
    pub url: String,
}

/// The controller contract exposed to orchestrating callers.
///
/// Operations a given connector product cannot support fail with
/// [`ConnectorError::NotImplemented`]; callers must treat that as permanent.
#[async_trait]
pub trait ConnectorController: Send + Sync {
    /// Prepares the controller for use.
    async fn initialize(&self) -> ConnectorResult<()>;

    /// Negotiates a contract for `offer` with the peer at `endpoint_url`.
    async fn negotiate_contract(
        &self,
        endpoint_url: &str,
        offer: &OfferedResource,
    ) -> ConnectorResult<NegotiatedContract>;

    /// Lists artifacts made available under a contract agreement.
    async fn get_artifacts_for_agreement(
        &self,
        contract_id: &str,
    ) -> ConnectorResult<Vec<ArtifactLink>>;

    /// Downloads an artifact by URL.
    async fn download_artifact(
        &self,
        artifact_url: &str,
        force_download: bool,
    ) -> ConnectorResult<serde_json::Value>;

    /// Starts the data transfer for a previously negotiated agreement.
    async fn transfer_artifacts_for_agreement(
        &self,
        contract_agreement_id: &str,
    ) -> ConnectorResult<()>;

    /// Lists the offers in the catalog of the peer at `provider_url`.
    async fn get_all_offers(&self, provider_url: &str) -> ConnectorResult<Vec<OfferedResource>>;

    /// Returns the self-description of the connector at `hostname`.
    async fn get_description(&self, hostname: &str) -> ConnectorResult<serde_json::Value>;

    /// Publishes a fixed value as an artifact, returning its id.
    async fn create_value_artifact(&self, artifact: &Artifact, value: &str)
        -> ConnectorResult<String>;

    /// Publishes an HTTP endpoint as an artifact, returning its id.
    async fn create_http_endpoint_artifact(
        &self,
        artifact: &Artifact,
        source: &HttpEndpointSource,
    ) -> ConnectorResult<String>;

    /// Publishes a database query as an artifact, returning its id.
    async fn create_database_artifact(
        &self,
        artifact: &Artifact,
        source: &DatabaseSource,
    ) -> ConnectorResult<String>;

    /// Offers an artifact under a usage policy.
    async fn create_offer_for_artifact(
        &self,
        artifact_id: &str,
        offer: &OfferDescription,
        representation: &Representation,
        catalog: &CatalogDescription,
        policy: Option<&UsagePolicy>,
    ) -> ConnectorResult<serde_json::Value>;

    /// Fetches the first artifact offered at `endpoint_url`.
    async fn get_first_artifact(&self, endpoint_url: &str) -> ConnectorResult<serde_json::Value>;

    /// Registers the HTTP receiver that transfers deliver data to.
    async fn set_http_data_receiver(&self, url: &str) -> ConnectorResult<()>;
}
