//! EDC connector controller.
//!
//! Implements [`ConnectorController`] on top of the EDC management API. Apart
//! from contract negotiation, which polls until the negotiation settles,
//! every operation is a single call against the connector. The controller
//! keeps two pieces of state: the agreements it negotiated and the HTTP
//! receiver URL registered through `set_http_data_receiver`.

use super::agreements::{AgreementRecord, AgreementStore, InMemoryAgreementStore};
use super::api::{HttpManagementApi, ManagementApi};
use super::models::{
    AssetEntry, AssetProperties, CatalogRequest, ContractDefinition, ContractOfferDescription,
    DataAddress, DataPlaneInstance, NegotiationInitiateRequest, PolicyDefinition,
    TransferRequest, TransferType, ASSET_PROP_CONTENT_TYPE, ASSET_PROP_ID, ASSET_PROP_NAME,
    HTTP_DATA_TYPE, HTTP_PROXY_TYPE,
};
use super::negotiation::await_agreement;
use super::policy::map_usage_policy_rule;
use crate::config::{ConnectorEndpoints, ControllerConfig};
use crate::traits::{
    Artifact, ArtifactLink, CatalogDescription, ConnectorController, ConnectorError,
    ConnectorResult, DatabaseSource, HttpEndpointSource, NegotiatedContract, OfferDescription,
    OfferedResource, Representation, UsagePolicy,
};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument};
use uuid::Uuid;

const AUTH_KEY_PROPERTY: &str = "authKey";
const AUTH_CODE_PROPERTY: &str = "authCode";

/// Controller for one EDC instance.
pub struct EdcController {
    config: ControllerConfig,
    endpoints: ConnectorEndpoints,
    api: Arc<dyn ManagementApi>,
    agreements: Arc<dyn AgreementStore>,
    http_receiver_url: RwLock<Option<String>>,
}

impl EdcController {
    /// Creates a controller talking to the EDC instance described by `config`.
    ///
    /// Fails with [`ConnectorError::ConfigError`] if a required endpoint is
    /// missing.
    pub fn new(config: ControllerConfig) -> ConnectorResult<Self> {
        let endpoints = config.validate()?;
        let api = HttpManagementApi::new(&config, &endpoints)?;
        Ok(Self::assemble(config, endpoints, Arc::new(api)))
    }

    /// Creates a controller using `api` in place of the HTTP client.
    pub fn with_api(
        config: ControllerConfig,
        api: Arc<dyn ManagementApi>,
    ) -> ConnectorResult<Self> {
        let endpoints = config.validate()?;
        Ok(Self::assemble(config, endpoints, api))
    }

    fn assemble(
        config: ControllerConfig,
        endpoints: ConnectorEndpoints,
        api: Arc<dyn ManagementApi>,
    ) -> Self {
        info!(
            hostname = %config.hostname,
            connector_id = %config.connector_id,
            "EDC controller initialized"
        );
        Self {
            config,
            endpoints,
            api,
            agreements: Arc::new(InMemoryAgreementStore::new()),
            http_receiver_url: RwLock::new(None),
        }
    }

    /// Replaces the agreement store.
    pub fn with_agreement_store(mut self, store: Arc<dyn AgreementStore>) -> Self {
        self.agreements = store;
        self
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    pub fn endpoints(&self) -> &ConnectorEndpoints {
        &self.endpoints
    }

    /// Looks up a negotiated agreement.
    pub async fn agreement(&self, agreement_id: &str) -> ConnectorResult<Option<AgreementRecord>> {
        self.agreements.get(agreement_id).await
    }

    /// The HTTP receiver URL, once registered.
    pub async fn http_receiver_url(&self) -> Option<String> {
        self.http_receiver_url.read().await.clone()
    }

    /// Negotiates a contract, stopping early if `cancel` fires while the
    /// negotiation is being polled.
    #[instrument(skip(self, offer, cancel), fields(asset_id = %offer.asset_id))]
    pub async fn negotiate_contract_with_cancel(
        &self,
        endpoint_url: &str,
        offer: &OfferedResource,
        cancel: &CancellationToken,
    ) -> ConnectorResult<NegotiatedContract> {
        let connector_address = self.endpoints.peer_address(endpoint_url);
        let request = NegotiationInitiateRequest {
            connector_id: self.config.connector_id.clone(),
            connector_address: connector_address.clone(),
            protocol: self.config.protocol.clone(),
            offer: ContractOfferDescription {
                offer_id: offer.offer_id.clone(),
                asset_id: offer.asset_id.clone(),
                policy: map_usage_policy_rule(&offer.asset_id, None)?,
            },
        };

        let negotiation = self.api.initiate_negotiation(&request).await?;
        info!(
            negotiation_id = %negotiation.id,
            connector_address = %connector_address,
            "contract negotiation initiated"
        );

        let agreement_id = await_agreement(
            self.api.as_ref(),
            &negotiation.id,
            &self.config.negotiation,
            cancel,
        )
        .await?;

        self.agreements
            .put(
                &agreement_id,
                AgreementRecord::new(connector_address, offer.asset_id.clone()),
            )
            .await?;

        Ok(NegotiatedContract {
            contract_id: agreement_id,
        })
    }

    /// Data address of an HTTP artifact, carrying credentials for the source.
    ///
    /// Basic credentials take precedence over an API key.
    fn http_data_address(artifact: &Artifact, source: &HttpEndpointSource) -> DataAddress {
        let address = DataAddress::http(&source.url).with_property("name", artifact.name.clone());

        if let Some(basic) = &source.basic_auth {
            let credentials = format!("{}:{}", basic.username, basic.password.expose_secret());
            address
                .with_property(AUTH_KEY_PROPERTY, "Authorization")
                .with_property(
                    AUTH_CODE_PROPERTY,
                    format!("Basic {}", BASE64.encode(credentials)),
                )
        } else if let Some(api_key) = &source.api_key {
            address
                .with_property(AUTH_KEY_PROPERTY, api_key.header_key.clone())
                .with_property(AUTH_CODE_PROPERTY, api_key.value.expose_secret())
        } else {
            address
        }
    }

    fn not_implemented(operation: &str) -> ConnectorError {
        ConnectorError::NotImplemented(format!(
            "{} is not supported by the EDC controller",
            operation
        ))
    }
}

#[async_trait]
impl ConnectorController for EdcController {
    async fn initialize(&self) -> ConnectorResult<()> {
        debug!(hostname = %self.config.hostname, "nothing to initialize for EDC");
        Ok(())
    }

    async fn negotiate_contract(
        &self,
        endpoint_url: &str,
        offer: &OfferedResource,
    ) -> ConnectorResult<NegotiatedContract> {
        self.negotiate_contract_with_cancel(endpoint_url, offer, &CancellationToken::new())
            .await
    }

    async fn get_artifacts_for_agreement(
        &self,
        _contract_id: &str,
    ) -> ConnectorResult<Vec<ArtifactLink>> {
        Err(Self::not_implemented("get_artifacts_for_agreement"))
    }

    async fn download_artifact(
        &self,
        _artifact_url: &str,
        _force_download: bool,
    ) -> ConnectorResult<serde_json::Value> {
        Err(Self::not_implemented("download_artifact"))
    }

    #[instrument(skip(self))]
    async fn transfer_artifacts_for_agreement(
        &self,
        contract_agreement_id: &str,
    ) -> ConnectorResult<()> {
        let receiver_url = self.http_receiver_url().await.ok_or_else(|| {
            ConnectorError::PreconditionNotMet(
                "set_http_data_receiver must be called before transfer_artifacts_for_agreement"
                    .to_string(),
            )
        })?;

        let agreement = self
            .agreements
            .get(contract_agreement_id)
            .await?
            .ok_or_else(|| ConnectorError::UnknownAgreement(contract_agreement_id.to_string()))?;

        let request = TransferRequest {
            connector_id: self.config.connector_id.clone(),
            connector_address: agreement.provider_url,
            contract_id: contract_agreement_id.to_string(),
            asset_id: agreement.asset_id,
            managed_resources: false,
            data_destination: DataAddress::http(&receiver_url),
            protocol: self.config.protocol.clone(),
            transfer_type: TransferType::default(),
        };

        let response = self.api.initiate_transfer(&request).await?;
        info!(
            asset_id = %request.asset_id,
            transfer = %response,
            "transfer initiated"
        );
        Ok(())
    }

    #[instrument(skip(self))]
    async fn get_all_offers(&self, provider_url: &str) -> ConnectorResult<Vec<OfferedResource>> {
        let request = CatalogRequest {
            provider_url: self.endpoints.peer_address(provider_url),
        };
        let offers = self.api.request_catalog(&request).await?.into_offers()?;
        debug!(count = offers.len(), "catalog received");
        Ok(offers)
    }

    async fn get_description(&self, _hostname: &str) -> ConnectorResult<serde_json::Value> {
        Err(Self::not_implemented("get_description"))
    }

    async fn create_value_artifact(
        &self,
        _artifact: &Artifact,
        _value: &str,
    ) -> ConnectorResult<String> {
        Err(Self::not_implemented("create_value_artifact"))
    }

    #[instrument(skip(self, artifact, source), fields(artifact = %artifact.name))]
    async fn create_http_endpoint_artifact(
        &self,
        artifact: &Artifact,
        source: &HttpEndpointSource,
    ) -> ConnectorResult<String> {
        if let Some(polling) = &source.polling {
            debug!(
                delay = polling.delay,
                period = polling.period,
                "resource polling has no EDC counterpart, ignoring"
            );
        }

        let asset_id = Uuid::new_v4().to_string();
        let properties = HashMap::from([
            (ASSET_PROP_ID.to_string(), asset_id.clone()),
            (ASSET_PROP_NAME.to_string(), artifact.name.clone()),
            (ASSET_PROP_CONTENT_TYPE.to_string(), source.mime_type.clone()),
        ]);

        self.api
            .create_asset(&AssetEntry {
                asset: AssetProperties { properties },
                data_address: Self::http_data_address(artifact, source),
            })
            .await?;

        info!(asset_id = %asset_id, "HTTP endpoint artifact created");
        Ok(asset_id)
    }

    async fn create_database_artifact(
        &self,
        _artifact: &Artifact,
        _source: &DatabaseSource,
    ) -> ConnectorResult<String> {
        Err(Self::not_implemented("create_database_artifact"))
    }

    #[instrument(skip(self, offer, representation, catalog, policy))]
    async fn create_offer_for_artifact(
        &self,
        artifact_id: &str,
        offer: &OfferDescription,
        representation: &Representation,
        catalog: &CatalogDescription,
        policy: Option<&UsagePolicy>,
    ) -> ConnectorResult<serde_json::Value> {
        let policy = map_usage_policy_rule(artifact_id, policy)?;
        debug!(
            offer = %offer.name,
            media_type = %representation.media_type,
            catalog = %catalog.name,
            "offer metadata is not stored by EDC"
        );

        let policy_id = Uuid::new_v4().to_string();
        self.api
            .create_policy(&PolicyDefinition {
                id: policy_id.clone(),
                policy,
            })
            .await?;

        let definition = ContractDefinition {
            id: Uuid::new_v4().to_string(),
            access_policy_id: policy_id.clone(),
            contract_policy_id: policy_id,
            criteria: Vec::new(),
        };
        let response = self.api.create_contract_definition(&definition).await?;

        info!(
            contract_definition_id = %definition.id,
            "offer created"
        );
        Ok(response)
    }

    async fn get_first_artifact(&self, _endpoint_url: &str) -> ConnectorResult<serde_json::Value> {
        Err(Self::not_implemented("get_first_artifact"))
    }

    #[instrument(skip(self))]
    async fn set_http_data_receiver(&self, url: &str) -> ConnectorResult<()> {
        let hostname = &self.config.hostname;
        let instance = DataPlaneInstance {
            id: self.config.dataplane_id.clone(),
            url: self.endpoints.dataplane_transfer_url(hostname),
            allowed_source_types: vec![HTTP_DATA_TYPE.to_string()],
            allowed_dest_types: vec![HTTP_PROXY_TYPE.to_string(), HTTP_DATA_TYPE.to_string()],
            properties: HashMap::from([(
                "publicApiUrl".to_string(),
                self.endpoints.public_api_url(hostname),
            )]),
        };

        self.api.add_dataplane_instance(&instance).await?;
        *self.http_receiver_url.write().await = Some(url.to_string());

        info!(receiver_url = %url, "HTTP data receiver registered");
        Ok(())
    }
}
