//! # dsc-connectors
//!
//! Controllers for dataspace connectors.
//!
//! A controller drives one connector instance on behalf of an orchestrating
//! service: it publishes artifacts and offers, negotiates contracts with
//! peer connectors, and starts data transfers under negotiated agreements.
//! The [`ConnectorController`] trait is the contract every controller
//! implements; [`EdcController`] implements it for the Eclipse Dataspace
//! Connector.

pub mod config;
pub mod edc;
pub mod http;
mod secure_string;
pub mod testing;
pub mod traits;

pub use secure_string::SecureString;

pub use config::{ConnectorEndpoints, ControllerConfig, NegotiationPollingConfig};

// Re-export traits
pub use traits::{
    ApiKeyAuth,
    Artifact,
    ArtifactLink,
    BasicAuth,
    CatalogDescription,
    ConnectorController,
    ConnectorError,
    ConnectorResult,
    DatabaseSource,
    DatabaseType,
    Endpoint,
    HttpEndpointSource,
    NegotiatedContract,
    OfferDescription,
    OfferedResource,
    Representation,
    ResourcePolling,
    UsagePolicy,
    UsagePolicyType,
};

// Re-export connector implementations
pub use edc::{
    AgreementRecord, AgreementStore, EdcController, InMemoryAgreementStore, MockManagementApi,
};
