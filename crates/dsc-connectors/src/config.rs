//! Controller configuration.
//!
//! A controller is configured with the hostname and credentials of its EDC
//! instance, the instance's named endpoints, and the negotiation polling
//! policy. Configuration can be built in code or loaded from YAML:
//!
//! ```yaml
//! hostname: edcconsumer
//! username: admin
//! password: password
//! endpoints:
//!   - { name: control, path: /control, port: 8585 }
//!   - { name: ids, path: /api/v1/ids, port: 8282 }
//!   - { name: datamanagement, path: /api/v1/data, port: 8383 }
//!   - { name: public, path: /public, port: 8686 }
//! negotiation:
//!   interval_ms: 500
//!   max_attempts: 60
//! ```

use crate::secure_string::SecureString;
use crate::traits::{ConnectorError, ConnectorResult, Endpoint};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

pub const CONTROL_ENDPOINT: &str = "control";
pub const IDS_ENDPOINT: &str = "ids";
pub const DATA_MANAGEMENT_ENDPOINT: &str = "datamanagement";
pub const PUBLIC_ENDPOINT: &str = "public";

/// Configuration of an EDC controller instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControllerConfig {
    /// Hostname of the EDC instance this controller drives.
    pub hostname: String,
    pub username: String,
    pub password: SecureString,
    /// Named endpoints; "control", "ids", "datamanagement" and "public" are required.
    pub endpoints: Vec<Endpoint>,
    /// Connector id announced in negotiation and transfer requests.
    #[serde(default = "default_connector_id")]
    pub connector_id: String,
    /// Dataspace protocol used for negotiation and transfer.
    #[serde(default = "default_protocol")]
    pub protocol: String,
    /// Id of the data-plane entry registered by `set_http_data_receiver`.
    #[serde(default = "default_dataplane_id")]
    pub dataplane_id: String,
    /// Per-request timeout towards the management API; unset means none.
    #[serde(default)]
    pub timeout_secs: Option<u64>,
    #[serde(default = "default_verify_tls")]
    pub verify_tls: bool,
    #[serde(default)]
    pub negotiation: NegotiationPollingConfig,
}

fn default_connector_id() -> String {
    "http-pull-provider".to_string()
}

fn default_protocol() -> String {
    "ids-multipart".to_string()
}

fn default_dataplane_id() -> String {
    "http-pull-provider-dataplane".to_string()
}

fn default_verify_tls() -> bool {
    true
}

impl ControllerConfig {
    pub fn new(
        hostname: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<SecureString>,
        endpoints: Vec<Endpoint>,
    ) -> Self {
        Self {
            hostname: hostname.into(),
            username: username.into(),
            password: password.into(),
            endpoints,
            connector_id: default_connector_id(),
            protocol: default_protocol(),
            dataplane_id: default_dataplane_id(),
            timeout_secs: None,
            verify_tls: default_verify_tls(),
            negotiation: NegotiationPollingConfig::default(),
        }
    }

    pub fn with_negotiation(mut self, negotiation: NegotiationPollingConfig) -> Self {
        self.negotiation = negotiation;
        self
    }

    /// Parses a YAML document.
    pub fn from_yaml_str(yaml: &str) -> ConnectorResult<Self> {
        serde_yaml::from_str(yaml)
            .map_err(|e| ConnectorError::ConfigError(format!("invalid controller config: {}", e)))
    }

    /// Reads and parses a YAML file.
    pub fn from_file(path: impl AsRef<Path>) -> ConnectorResult<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            ConnectorError::ConfigError(format!("failed to read {}: {}", path.display(), e))
        })?;
        Self::from_yaml_str(&contents)
    }

    /// Checks the configuration and resolves the required endpoints.
    pub fn validate(&self) -> ConnectorResult<ConnectorEndpoints> {
        if self.hostname.trim().is_empty() {
            return Err(ConnectorError::ConfigError(
                "hostname cannot be empty".to_string(),
            ));
        }
        if self.username.is_empty() || self.password.is_empty() {
            return Err(ConnectorError::ConfigError(
                "management API credentials cannot be empty".to_string(),
            ));
        }
        if self.connector_id.is_empty() || self.protocol.is_empty() {
            return Err(ConnectorError::ConfigError(
                "connector_id and protocol cannot be empty".to_string(),
            ));
        }
        self.negotiation.validate()?;
        ConnectorEndpoints::from_endpoints(&self.endpoints)
    }
}

/// The endpoints a controller needs, resolved once at construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectorEndpoints {
    pub control: Endpoint,
    pub ids: Endpoint,
    pub data_management: Endpoint,
    pub public: Endpoint,
}

impl ConnectorEndpoints {
    /// Picks the required endpoints out of a named list.
    ///
    /// Endpoints with other names are ignored. A missing or duplicated
    /// required name, or a required endpoint with port 0, is rejected.
    pub fn from_endpoints(endpoints: &[Endpoint]) -> ConnectorResult<Self> {
        let find = |name: &str| -> ConnectorResult<Endpoint> {
            let mut matches = endpoints.iter().filter(|e| e.name == name);
            let endpoint = matches.next().ok_or_else(|| {
                ConnectorError::ConfigError(format!("missing required endpoint '{}'", name))
            })?;
            if matches.next().is_some() {
                return Err(ConnectorError::ConfigError(format!(
                    "endpoint '{}' is defined more than once",
                    name
                )));
            }
            if endpoint.port == 0 {
                return Err(ConnectorError::ConfigError(format!(
                    "endpoint '{}' has no port",
                    name
                )));
            }
            Ok(endpoint.clone())
        };

        Ok(Self {
            control: find(CONTROL_ENDPOINT)?,
            ids: find(IDS_ENDPOINT)?,
            data_management: find(DATA_MANAGEMENT_ENDPOINT)?,
            public: find(PUBLIC_ENDPOINT)?,
        })
    }

    /// Base URL of the control API.
    pub fn control_base_url(&self, hostname: &str) -> String {
        format!("https://{}{}", hostname, self.control.path)
    }

    /// Base URL of the data-management API.
    pub fn data_management_base_url(&self, hostname: &str) -> String {
        format!("https://{}{}", hostname, self.data_management.path)
    }

    /// IDS data address of a peer reachable at `peer_url`.
    pub fn peer_address(&self, peer_url: &str) -> String {
        format!(
            "{}:{}{}/data",
            peer_url.trim_end_matches('/'),
            self.ids.port,
            self.ids.path
        )
    }

    /// Transfer URL advertised in this instance's data-plane entry.
    pub fn dataplane_transfer_url(&self, hostname: &str) -> String {
        format!(
            "http://{}:{}{}/transfer",
            hostname, self.control.port, self.control.path
        )
    }

    /// Public API URL advertised in this instance's data-plane entry.
    pub fn public_api_url(&self, hostname: &str) -> String {
        format!(
            "http://{}:{}{}/",
            hostname, self.public.port, self.public.path
        )
    }
}

/// How a controller waits for a contract negotiation to settle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NegotiationPollingConfig {
    /// Constant delay between two status polls.
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
    /// Give up after this many polls; `None` polls without limit.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: Option<u32>,
    /// Give up once this much time has passed; `None` has no deadline.
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

fn default_interval_ms() -> u64 {
    1000
}

fn default_max_attempts() -> Option<u32> {
    Some(120)
}

impl Default for NegotiationPollingConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_interval_ms(),
            max_attempts: default_max_attempts(),
            timeout_secs: None,
        }
    }
}

impl NegotiationPollingConfig {
    /// Polls until the negotiation settles, however long that takes.
    pub fn unbounded() -> Self {
        Self {
            max_attempts: None,
            timeout_secs: None,
            ..Self::default()
        }
    }

    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    pub fn deadline(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }

    fn validate(&self) -> ConnectorResult<()> {
        if self.interval_ms == 0 {
            return Err(ConnectorError::ConfigError(
                "negotiation.interval_ms must be at least 1".to_string(),
            ));
        }
        if self.max_attempts == Some(0) {
            return Err(ConnectorError::ConfigError(
                "negotiation.max_attempts must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
