//! Fixtures for testing controllers.

use crate::config::{ControllerConfig, NegotiationPollingConfig};
use crate::traits::{Artifact, ConnectorError, ConnectorResult, Endpoint, OfferedResource};

/// The endpoint layout of a default EDC deployment.
pub fn test_endpoints() -> Vec<Endpoint> {
    vec![
        Endpoint::new("control", "/control", 8585),
        Endpoint::new("ids", "/api/v1/ids", 8282),
        Endpoint::new("datamanagement", "/api/v1/data", 8383),
        Endpoint::new("public", "/public", 8686),
    ]
}

/// A controller config for `hostname` that polls every millisecond.
pub fn test_controller_config(hostname: &str) -> ControllerConfig {
    ControllerConfig::new(hostname, "admin", "password", test_endpoints()).with_negotiation(
        NegotiationPollingConfig {
            interval_ms: 1,
            max_attempts: Some(20),
            timeout_secs: None,
        },
    )
}

/// An offer whose offer id and contract offer id coincide.
pub fn sample_offer(offer_id: &str, asset_id: &str) -> OfferedResource {
    OfferedResource {
        offer_id: offer_id.to_string(),
        contract_offer_id: offer_id.to_string(),
        asset_id: asset_id.to_string(),
        asset_name: asset_id.to_uppercase(),
    }
}

pub fn sample_artifact(name: &str) -> Artifact {
    Artifact {
        id: format!("data-{}", name),
        name: name.to_string(),
        ..Default::default()
    }
}

/// Asserts that `result` failed with `NotImplemented`.
pub fn assert_not_implemented<T: std::fmt::Debug>(result: &ConnectorResult<T>) {
    match result {
        Err(ConnectorError::NotImplemented(_)) => {}
        other => panic!("Expected NotImplemented, got {:?}", other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_test_controller_config_is_valid() {
        let config = test_controller_config("edcconsumer");
        assert_eq!(config.hostname, "edcconsumer");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_sample_offer() {
        let offer = sample_offer("o1", "a1");
        assert_eq!(offer.offer_id, offer.contract_offer_id);
        assert_eq!(offer.asset_name, "A1");
    }

    #[test]
    fn test_assert_not_implemented() {
        let result: ConnectorResult<()> = Err(ConnectorError::NotImplemented("x".into()));
        assert_not_implemented(&result);
    }
}
