//! Wire models of the EDC data-management and control APIs.
//!
//! Request bodies serialize to the camelCase JSON the connector expects.
//! Response bodies are deserialized leniently and validated by the caller,
//! so a malformed response surfaces as [`ConnectorError::InvalidResponse`]
//! rather than a panic.

use crate::traits::{ConnectorError, ConnectorResult, OfferedResource};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Asset property holding the asset id.
pub const ASSET_PROP_ID: &str = "asset:prop:id";
/// Asset property holding the display name.
pub const ASSET_PROP_NAME: &str = "asset:prop:name";
/// Asset property holding the content type.
pub const ASSET_PROP_CONTENT_TYPE: &str = "asset:prop:contenttype";

/// Transport type of HTTP data sources and destinations.
pub const HTTP_DATA_TYPE: &str = "HttpData";
/// Transport type of proxied HTTP pulls.
pub const HTTP_PROXY_TYPE: &str = "HttpProxy";

// ============================================================================
// Policies
// ============================================================================

/// An EDC policy document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Policy {
    pub uid: String,
    #[serde(default)]
    pub permissions: Vec<Permission>,
    #[serde(rename = "@type")]
    pub policy_type: PolicyType,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Permission {
    pub target: String,
    pub action: Action,
    pub edctype: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    #[serde(rename = "type")]
    pub action_type: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyType {
    #[serde(rename = "@policytype")]
    pub policytype: String,
}

impl PolicyType {
    pub fn set() -> Self {
        Self {
            policytype: "set".to_string(),
        }
    }
}

/// Body of `POST /policydefinitions`.
#[derive(Debug, Clone, Serialize)]
pub struct PolicyDefinition {
    pub id: String,
    pub policy: Policy,
}

/// Body of `POST /contractdefinitions`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractDefinition {
    pub id: String,
    pub access_policy_id: String,
    pub contract_policy_id: String,
    pub criteria: Vec<Criterion>,
}

/// Asset selector of a contract definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Criterion {
    pub operand_left: String,
    pub operator: String,
    pub operand_right: String,
}

// ============================================================================
// Assets
// ============================================================================

/// Body of `POST /assets`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetEntry {
    pub asset: AssetProperties,
    pub data_address: DataAddress,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct AssetProperties {
    pub properties: HashMap<String, String>,
}

/// Where and how the data of an asset (or a transfer destination) lives.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DataAddress {
    pub properties: HashMap<String, String>,
}

impl DataAddress {
    /// HTTP data address pointing at `base_url`.
    pub fn http(base_url: &str) -> Self {
        let mut properties = HashMap::new();
        properties.insert("baseUrl".to_string(), base_url.to_string());
        properties.insert("type".to_string(), HTTP_DATA_TYPE.to_string());
        Self { properties }
    }

    pub fn with_property(mut self, key: &str, value: impl Into<String>) -> Self {
        self.properties.insert(key.to_string(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(String::as_str)
    }
}

// ============================================================================
// Catalog
// ============================================================================

/// Body of `POST /catalog/request`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogRequest {
    pub provider_url: String,
}

/// Catalog returned by a peer. Only the parts projected onto offers are read.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Catalog {
    #[serde(default)]
    pub contract_offers: Option<Vec<CatalogOffer>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CatalogOffer {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub asset: Option<CatalogAsset>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CatalogAsset {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub properties: HashMap<String, serde_json::Value>,
}

impl Catalog {
    /// Projects the catalog onto the controller's offer shape.
    ///
    /// Fails if the offer list, an offer id, an offer's asset or the asset id
    /// is missing. A missing asset name projects to an empty string.
    pub fn into_offers(self) -> ConnectorResult<Vec<OfferedResource>> {
        let offers = self.contract_offers.ok_or_else(|| {
            ConnectorError::InvalidResponse("catalog has no contractOffers".to_string())
        })?;

        offers
            .into_iter()
            .enumerate()
            .map(|(index, offer)| {
                let offer_id = offer.id.filter(|id| !id.is_empty()).ok_or_else(|| {
                    ConnectorError::InvalidResponse(format!(
                        "contract offer #{} has no id",
                        index
                    ))
                })?;
                let asset = offer.asset.ok_or_else(|| {
                    ConnectorError::InvalidResponse(format!(
                        "contract offer {} has no asset",
                        offer_id
                    ))
                })?;
                let asset_id = asset.id.filter(|id| !id.is_empty()).ok_or_else(|| {
                    ConnectorError::InvalidResponse(format!(
                        "asset of contract offer {} has no id",
                        offer_id
                    ))
                })?;
                let asset_name = asset
                    .properties
                    .get(ASSET_PROP_NAME)
                    .and_then(|v| v.as_str())
                    .unwrap_or_default()
                    .to_string();

                Ok(OfferedResource {
                    contract_offer_id: offer_id.clone(),
                    offer_id,
                    asset_id,
                    asset_name,
                })
            })
            .collect()
    }
}

// ============================================================================
// Negotiation
// ============================================================================

/// Body of `POST /contractnegotiations`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NegotiationInitiateRequest {
    pub connector_id: String,
    pub connector_address: String,
    pub protocol: String,
    pub offer: ContractOfferDescription,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractOfferDescription {
    pub offer_id: String,
    pub asset_id: String,
    pub policy: Policy,
}

/// Response of `GET /contractnegotiations/{id}`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NegotiationStatus {
    #[serde(default)]
    pub id: Option<String>,
    pub state: String,
    #[serde(default)]
    pub contract_agreement_id: Option<String>,
    #[serde(default)]
    pub error_detail: Option<String>,
}

impl NegotiationStatus {
    pub fn new(state: &str) -> Self {
        Self {
            state: state.to_string(),
            ..Default::default()
        }
    }

    pub fn with_agreement(mut self, agreement_id: &str) -> Self {
        self.contract_agreement_id = Some(agreement_id.to_string());
        self
    }

    pub fn with_error_detail(mut self, detail: &str) -> Self {
        self.error_detail = Some(detail.to_string());
        self
    }
}

// ============================================================================
// Transfer
// ============================================================================

/// Body of `POST /transferprocess`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferRequest {
    pub connector_id: String,
    pub connector_address: String,
    pub contract_id: String,
    pub asset_id: String,
    pub managed_resources: bool,
    pub data_destination: DataAddress,
    pub protocol: String,
    pub transfer_type: TransferType,
}

/// Transfer type hints. Always sent empty (`{}`) so the connector picks its
/// defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TransferType {}

// ============================================================================
// Data plane
// ============================================================================

/// Body of `POST /instances` on the control API.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DataPlaneInstance {
    pub id: String,
    pub url: String,
    pub allowed_source_types: Vec<String>,
    pub allowed_dest_types: Vec<String>,
    pub properties: HashMap<String, String>,
}

/// Id returned by create/initiate calls.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdResponse {
    pub id: String,
    #[serde(default)]
    pub created_at: Option<i64>,
}
