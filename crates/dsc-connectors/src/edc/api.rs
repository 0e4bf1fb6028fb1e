//! EDC management API client.
//!
//! [`ManagementApi`] is the seam between the controller and a running EDC
//! instance. [`HttpManagementApi`] talks to the data-management and control
//! APIs over HTTPS; tests substitute [`super::MockManagementApi`].

use super::models::{
    AssetEntry, Catalog, CatalogRequest, ContractDefinition, DataPlaneInstance, IdResponse,
    NegotiationInitiateRequest, NegotiationStatus, PolicyDefinition, TransferRequest,
};
use crate::config::{ConnectorEndpoints, ControllerConfig};
use crate::http::{AuthConfig, ClientConfig, HttpClient};
use crate::traits::ConnectorResult;
use async_trait::async_trait;
use tracing::{debug, instrument};

/// Operations of the EDC management API used by the controller.
#[async_trait]
pub trait ManagementApi: Send + Sync {
    /// Starts a contract negotiation, returning its id.
    async fn initiate_negotiation(
        &self,
        request: &NegotiationInitiateRequest,
    ) -> ConnectorResult<IdResponse>;

    /// Reads the current state of a negotiation.
    async fn get_negotiation(&self, negotiation_id: &str) -> ConnectorResult<NegotiationStatus>;

    /// Requests the catalog of a peer connector.
    async fn request_catalog(&self, request: &CatalogRequest) -> ConnectorResult<Catalog>;

    async fn create_asset(&self, entry: &AssetEntry) -> ConnectorResult<()>;

    async fn create_policy(&self, definition: &PolicyDefinition) -> ConnectorResult<()>;

    /// Creates a contract definition, returning the connector's response body.
    async fn create_contract_definition(
        &self,
        definition: &ContractDefinition,
    ) -> ConnectorResult<serde_json::Value>;

    /// Starts a transfer process, returning the connector's response body.
    async fn initiate_transfer(
        &self,
        request: &TransferRequest,
    ) -> ConnectorResult<serde_json::Value>;

    /// Registers a data-plane instance with the control API.
    async fn add_dataplane_instance(&self, instance: &DataPlaneInstance) -> ConnectorResult<()>;
}

/// [`ManagementApi`] over HTTPS with basic credentials.
pub struct HttpManagementApi {
    control: HttpClient,
    data_management: HttpClient,
}

impl HttpManagementApi {
    /// Builds clients for the control and data-management surfaces of the
    /// instance described by `config`.
    pub fn new(config: &ControllerConfig, endpoints: &ConnectorEndpoints) -> ConnectorResult<Self> {
        let auth = AuthConfig::Basic {
            username: config.username.clone(),
            password: config.password.clone(),
        };
        let surface = |name: &str, base_url: String| ClientConfig {
            name: name.to_string(),
            base_url,
            auth: auth.clone(),
            timeout_secs: config.timeout_secs,
            verify_tls: config.verify_tls,
        };

        let control = HttpClient::new(surface(
            "control",
            endpoints.control_base_url(&config.hostname),
        ))?;
        let data_management = HttpClient::new(surface(
            "datamanagement",
            endpoints.data_management_base_url(&config.hostname),
        ))?;

        debug!(
            control = %control.base_url(),
            data_management = %data_management.base_url(),
            "EDC management API clients created"
        );

        Ok(Self {
            control,
            data_management,
        })
    }
}

#[async_trait]
impl ManagementApi for HttpManagementApi {
    #[instrument(skip(self, request), fields(asset_id = %request.offer.asset_id))]
    async fn initiate_negotiation(
        &self,
        request: &NegotiationInitiateRequest,
    ) -> ConnectorResult<IdResponse> {
        self.data_management
            .post_json("/contractnegotiations", request)
            .await
    }

    #[instrument(skip(self))]
    async fn get_negotiation(&self, negotiation_id: &str) -> ConnectorResult<NegotiationStatus> {
        let path = format!(
            "/contractnegotiations/{}",
            urlencoding::encode(negotiation_id)
        );
        self.data_management.get_json(&path).await
    }

    #[instrument(skip(self, request), fields(provider_url = %request.provider_url))]
    async fn request_catalog(&self, request: &CatalogRequest) -> ConnectorResult<Catalog> {
        self.data_management
            .post_json("/catalog/request", request)
            .await
    }

    #[instrument(skip(self, entry))]
    async fn create_asset(&self, entry: &AssetEntry) -> ConnectorResult<()> {
        self.data_management.post("/assets", entry).await?;
        Ok(())
    }

    #[instrument(skip(self, definition), fields(policy_id = %definition.id))]
    async fn create_policy(&self, definition: &PolicyDefinition) -> ConnectorResult<()> {
        self.data_management
            .post("/policydefinitions", definition)
            .await?;
        Ok(())
    }

    #[instrument(skip(self, definition), fields(definition_id = %definition.id))]
    async fn create_contract_definition(
        &self,
        definition: &ContractDefinition,
    ) -> ConnectorResult<serde_json::Value> {
        self.data_management
            .post_value("/contractdefinitions", definition)
            .await
    }

    #[instrument(skip(self, request), fields(contract_id = %request.contract_id))]
    async fn initiate_transfer(
        &self,
        request: &TransferRequest,
    ) -> ConnectorResult<serde_json::Value> {
        self.data_management
            .post_value("/transferprocess", request)
            .await
    }

    #[instrument(skip(self, instance), fields(dataplane_id = %instance.id))]
    async fn add_dataplane_instance(&self, instance: &DataPlaneInstance) -> ConnectorResult<()> {
        self.control.post("/instances", instance).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::test_controller_config;

    #[test]
    fn test_clients_use_management_paths() {
        let config = test_controller_config("edcconsumer");
        let endpoints = config.validate().unwrap();
        let api = HttpManagementApi::new(&config, &endpoints).unwrap();

        assert_eq!(api.control.base_url(), "https://edcconsumer/control");
        assert_eq!(
            api.data_management.base_url(),
            "https://edcconsumer/api/v1/data"
        );
        assert_eq!(
            api.data_management.build_url("/contractnegotiations"),
            "https://edcconsumer/api/v1/data/contractnegotiations"
        );
    }
}
