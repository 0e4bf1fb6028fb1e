//! Integration tests for the EDC controller.
//!
//! These tests drive `EdcController` through the `ConnectorController`
//! contract against a scripted management API and verify:
//! - Negotiations settle only on a confirmed status with an agreement id
//! - Agreements recorded by a negotiation feed later transfers
//! - Transfers require a registered HTTP receiver
//! - Credentials of HTTP artifacts reach the data address
//! - Stubbed operations fail permanently

use std::sync::Arc;

use dsc_connectors::edc::models::{Catalog, NegotiationStatus};
use dsc_connectors::testing::{
    assert_not_implemented, sample_artifact, sample_offer, test_controller_config,
};
use dsc_connectors::{
    AgreementRecord, AgreementStore, ConnectorController, ConnectorError, DatabaseSource,
    DatabaseType, EdcController, HttpEndpointSource, InMemoryAgreementStore, MockManagementApi,
    SecureString,
};

const RECEIVER_URL: &str = "http://receiver/callback";

fn controller_with_mock() -> (EdcController, Arc<MockManagementApi>) {
    let api = Arc::new(MockManagementApi::new());
    let controller = EdcController::with_api(test_controller_config("edcconsumer"), api.clone())
        .expect("valid test config");
    (controller, api)
}

// =============================================================================
// Negotiation
// =============================================================================

#[tokio::test]
async fn test_negotiation_waits_for_confirmed_with_agreement_id() {
    let (controller, api) = controller_with_mock();
    api.push_negotiation_statuses([
        NegotiationStatus::new("REQUESTED"),
        NegotiationStatus::new("REQUESTED"),
        NegotiationStatus::new("CONFIRMED"),
        NegotiationStatus::new("CONFIRMED").with_agreement("ag-4"),
    ]);

    let contract = controller
        .negotiate_contract("http://provider", &sample_offer("o1", "a1"))
        .await
        .unwrap();

    assert_eq!(contract.contract_id, "ag-4");
    assert_eq!(api.negotiation_polls(), 4);
}

#[tokio::test]
async fn test_stalled_negotiation_is_bounded() {
    let (controller, api) = controller_with_mock();

    let result = controller
        .negotiate_contract("http://provider", &sample_offer("o1", "a1"))
        .await;

    match result {
        Err(ConnectorError::NegotiationNeverConfirmed { attempts, .. }) => {
            assert_eq!(attempts, 20)
        }
        other => panic!("Expected NegotiationNeverConfirmed, got {:?}", other),
    }
    assert_eq!(api.negotiation_polls(), 20);
    assert_eq!(controller.agreement("ag-1").await.unwrap(), None);
}

#[tokio::test]
async fn test_concurrent_negotiations_record_distinct_agreements() {
    let api = Arc::new(MockManagementApi::new());
    api.push_negotiation_statuses_for(
        "neg-1",
        [
            NegotiationStatus::new("REQUESTED"),
            NegotiationStatus::new("REQUESTED"),
            NegotiationStatus::new("CONFIRMED").with_agreement("ag-1"),
        ],
    );
    api.push_negotiation_statuses_for(
        "neg-2",
        [
            NegotiationStatus::new("REQUESTED"),
            NegotiationStatus::new("CONFIRMED").with_agreement("ag-2"),
        ],
    );
    let controller = Arc::new(
        EdcController::with_api(test_controller_config("edcconsumer"), api.clone()).unwrap(),
    );

    let first = {
        let controller = controller.clone();
        tokio::spawn(async move {
            controller
                .negotiate_contract("http://provider", &sample_offer("o1", "a1"))
                .await
        })
    };
    let second = {
        let controller = controller.clone();
        tokio::spawn(async move {
            controller
                .negotiate_contract("http://other", &sample_offer("o2", "a2"))
                .await
        })
    };
    let first = first.await.unwrap().unwrap().contract_id;
    let second = second.await.unwrap().unwrap().contract_id;

    // Which task is handed neg-1 depends on scheduling; each agreement must
    // still point at its own provider and asset.
    let mut ids = vec![first.clone(), second.clone()];
    ids.sort();
    assert_eq!(ids, vec!["ag-1", "ag-2"]);

    let first_record = controller.agreement(&first).await.unwrap().unwrap();
    assert_eq!(
        first_record.provider_url,
        "http://provider:8282/api/v1/ids/data"
    );
    assert_eq!(first_record.asset_id, "a1");

    let second_record = controller.agreement(&second).await.unwrap().unwrap();
    assert_eq!(second_record.provider_url, "http://other:8282/api/v1/ids/data");
    assert_eq!(second_record.asset_id, "a2");

    assert_eq!(api.negotiations().len(), 2);
    assert_eq!(api.negotiation_polls(), 5);
}

// =============================================================================
// Transfer
// =============================================================================

#[tokio::test]
async fn test_transfer_uses_recorded_agreement() {
    let (controller, api) = controller_with_mock();
    api.push_negotiation_statuses([NegotiationStatus::new("CONFIRMED").with_agreement("ag-7")]);
    controller.set_http_data_receiver(RECEIVER_URL).await.unwrap();

    controller
        .negotiate_contract("http://provider/", &sample_offer("o1", "asset-7"))
        .await
        .unwrap();
    controller
        .transfer_artifacts_for_agreement("ag-7")
        .await
        .unwrap();

    let transfers = api.transfers();
    assert_eq!(transfers.len(), 1);
    let request = &transfers[0];
    assert_eq!(
        request.connector_address,
        "http://provider:8282/api/v1/ids/data"
    );
    assert_eq!(request.asset_id, "asset-7");
    assert_eq!(request.contract_id, "ag-7");
    assert!(!request.managed_resources);
    assert_eq!(request.connector_id, "http-pull-provider");
    assert_eq!(request.protocol, "ids-multipart");
    assert_eq!(request.data_destination.get("type"), Some("HttpData"));
}

#[tokio::test]
async fn test_transfer_requires_receiver() {
    let (controller, api) = controller_with_mock();
    api.push_negotiation_statuses([NegotiationStatus::new("CONFIRMED").with_agreement("ag-1")]);
    controller
        .negotiate_contract("http://provider", &sample_offer("o1", "a1"))
        .await
        .unwrap();

    let result = controller.transfer_artifacts_for_agreement("ag-1").await;

    assert!(matches!(result, Err(ConnectorError::PreconditionNotMet(_))));
    assert!(api.transfers().is_empty());
}

#[tokio::test]
async fn test_transfer_of_unknown_agreement() {
    let (controller, api) = controller_with_mock();
    controller.set_http_data_receiver(RECEIVER_URL).await.unwrap();

    let result = controller.transfer_artifacts_for_agreement("missing").await;

    match result {
        Err(ConnectorError::UnknownAgreement(id)) => assert_eq!(id, "missing"),
        other => panic!("Expected UnknownAgreement, got {:?}", other),
    }
    assert!(api.transfers().is_empty());
}

#[tokio::test]
async fn test_transfer_with_custom_store() {
    let api = Arc::new(MockManagementApi::new());
    let store = Arc::new(InMemoryAgreementStore::new());
    store
        .put(
            "ag-restored",
            AgreementRecord::new("http://provider:8282/api/v1/ids/data", "a9"),
        )
        .await
        .unwrap();

    let controller = EdcController::with_api(test_controller_config("edcconsumer"), api.clone())
        .unwrap()
        .with_agreement_store(store);
    controller.set_http_data_receiver(RECEIVER_URL).await.unwrap();
    controller
        .transfer_artifacts_for_agreement("ag-restored")
        .await
        .unwrap();

    assert_eq!(api.transfers()[0].asset_id, "a9");
}

#[tokio::test]
async fn test_transfer_failure_propagates() {
    let (controller, api) = controller_with_mock();
    api.push_negotiation_statuses([NegotiationStatus::new("CONFIRMED").with_agreement("ag-1")]);
    controller.set_http_data_receiver(RECEIVER_URL).await.unwrap();
    controller
        .negotiate_contract("http://provider", &sample_offer("o1", "a1"))
        .await
        .unwrap();
    api.fail_next(
        "initiate_transfer",
        ConnectorError::RemoteCallFailed("status 500".into()),
    );

    let err = controller
        .transfer_artifacts_for_agreement("ag-1")
        .await
        .unwrap_err();

    assert!(err.is_remote_failure());
}

// =============================================================================
// Catalog
// =============================================================================

#[tokio::test]
async fn test_get_all_offers_projects_catalog() {
    let (controller, api) = controller_with_mock();
    let catalog: Catalog = serde_json::from_value(serde_json::json!({
        "id": "default",
        "contractOffers": [
            {
                "id": "offer-1:3a1b",
                "asset": {
                    "id": "asset-1",
                    "properties": { "asset:prop:name": "Weather" }
                },
                "policy": {}
            },
            {
                "id": "offer-2:9f0c",
                "asset": { "id": "asset-2", "properties": {} }
            }
        ]
    }))
    .unwrap();
    api.set_catalog(catalog);

    let offers = controller.get_all_offers("http://provider").await.unwrap();

    assert_eq!(offers.len(), 2);
    assert_eq!(offers[0].offer_id, "offer-1:3a1b");
    assert_eq!(offers[0].contract_offer_id, "offer-1:3a1b");
    assert_eq!(offers[0].asset_id, "asset-1");
    assert_eq!(offers[0].asset_name, "Weather");
    assert_eq!(offers[1].asset_name, "");
    assert_eq!(
        api.catalog_requests()[0].provider_url,
        "http://provider:8282/api/v1/ids/data"
    );
}

#[tokio::test]
async fn test_get_all_offers_rejects_malformed_catalog() {
    let (controller, api) = controller_with_mock();
    let catalog: Catalog = serde_json::from_value(serde_json::json!({
        "contractOffers": [{ "id": "offer-1" }]
    }))
    .unwrap();
    api.set_catalog(catalog);

    let result = controller.get_all_offers("http://provider").await;

    assert!(matches!(result, Err(ConnectorError::InvalidResponse(_))));
}

// =============================================================================
// Provider side
// =============================================================================

#[tokio::test]
async fn test_basic_auth_reaches_asset_data_address() {
    let (controller, api) = controller_with_mock();
    let source = HttpEndpointSource::new("https://data.example/weather", "application/json")
        .with_basic_auth("user", "password");

    controller
        .create_http_endpoint_artifact(&sample_artifact("weather"), &source)
        .await
        .unwrap();

    let address = &api.assets()[0].data_address;
    assert_eq!(address.get("authKey"), Some("Authorization"));
    assert_eq!(address.get("authCode"), Some("Basic dXNlcjpwYXNzd29yZA=="));
}

#[tokio::test]
async fn test_publish_artifact_and_offer() {
    let (controller, api) = controller_with_mock();
    let source = HttpEndpointSource::new("https://data.example/weather", "application/json");

    let asset_id = controller
        .create_http_endpoint_artifact(&sample_artifact("weather"), &source)
        .await
        .unwrap();
    controller
        .create_offer_for_artifact(
            &asset_id,
            &Default::default(),
            &Default::default(),
            &Default::default(),
            None,
        )
        .await
        .unwrap();

    let policy = &api.policies()[0].policy;
    assert_eq!(policy.permissions[0].target, asset_id);
    assert_eq!(policy.permissions[0].action.action_type, "USE");
}

// =============================================================================
// Unsupported operations
// =============================================================================

#[tokio::test]
async fn test_stubbed_operations_are_not_implemented() {
    let (controller, _api) = controller_with_mock();
    let artifact = sample_artifact("db");
    let database = DatabaseSource {
        url: "jdbc:postgresql://db/warehouse".into(),
        database: DatabaseType::Postgres,
        username: "reader".into(),
        password: SecureString::from("pw"),
        sql_query: "SELECT 1".into(),
    };

    assert_not_implemented(&controller.get_artifacts_for_agreement("ag-1").await);
    assert_not_implemented(&controller.download_artifact("http://a", false).await);
    assert_not_implemented(&controller.get_description("edcconsumer").await);
    assert_not_implemented(&controller.create_value_artifact(&artifact, "42").await);
    assert_not_implemented(
        &controller
            .create_database_artifact(&artifact, &database)
            .await,
    );
    assert_not_implemented(&controller.get_first_artifact("http://provider").await);
    assert!(controller.initialize().await.is_ok());
}

// =============================================================================
// End to end
// =============================================================================

#[tokio::test]
async fn test_negotiate_then_transfer_end_to_end() {
    let (controller, api) = controller_with_mock();
    api.push_negotiation_statuses([NegotiationStatus::new("CONFIRMED").with_agreement("ag-1")]);

    controller.set_http_data_receiver(RECEIVER_URL).await.unwrap();

    let offer = dsc_connectors::OfferedResource {
        offer_id: "o1".into(),
        contract_offer_id: "o1".into(),
        asset_id: "a1".into(),
        asset_name: "A1".into(),
    };
    let contract = controller
        .negotiate_contract("http://provider", &offer)
        .await
        .unwrap();
    assert_eq!(contract.contract_id, "ag-1");
    assert_eq!(api.negotiation_polls(), 1);

    let record = controller.agreement("ag-1").await.unwrap().unwrap();
    assert_eq!(record.provider_url, "http://provider:8282/api/v1/ids/data");
    assert_eq!(record.asset_id, "a1");

    controller
        .transfer_artifacts_for_agreement("ag-1")
        .await
        .unwrap();

    let transfers = api.transfers();
    assert_eq!(transfers.len(), 1);
    assert_eq!(transfers[0].asset_id, "a1");
    assert_eq!(transfers[0].contract_id, "ag-1");
    assert_eq!(
        transfers[0].data_destination.get("baseUrl"),
        Some(RECEIVER_URL)
    );
}
