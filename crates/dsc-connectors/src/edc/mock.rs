//! Scripted in-memory management API for testing.

use super::api::ManagementApi;
use super::models::{
    AssetEntry, Catalog, CatalogRequest, ContractDefinition, DataPlaneInstance, IdResponse,
    NegotiationInitiateRequest, NegotiationStatus, PolicyDefinition, TransferRequest,
};
use crate::traits::{ConnectorError, ConnectorResult};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// State reported while no negotiation status is scripted.
const DEFAULT_PENDING_STATE: &str = "REQUESTED";

/// Mock EDC management API.
///
/// Negotiation statuses are served from a queue; the last queued status is
/// repeated once the queue runs dry, and `REQUESTED` is reported if nothing
/// was queued. A negotiation with its own queue is served from that queue,
/// all others share the default one. Every request received is recorded for
/// inspection.
#[derive(Default)]
pub struct MockManagementApi {
    statuses: Mutex<VecDeque<NegotiationStatus>>,
    statuses_by_id: Mutex<HashMap<String, VecDeque<NegotiationStatus>>>,
    stalled: Mutex<HashSet<&'static str>>,
    catalog: Mutex<Catalog>,
    failures: Mutex<HashMap<&'static str, ConnectorError>>,
    polls: AtomicU32,
    counter: AtomicU32,
    negotiations: Mutex<Vec<NegotiationInitiateRequest>>,
    catalog_requests: Mutex<Vec<CatalogRequest>>,
    assets: Mutex<Vec<AssetEntry>>,
    policies: Mutex<Vec<PolicyDefinition>>,
    contract_definitions: Mutex<Vec<ContractDefinition>>,
    transfers: Mutex<Vec<TransferRequest>>,
    dataplanes: Mutex<Vec<DataPlaneInstance>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl MockManagementApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues statuses for successive `get_negotiation` calls.
    pub fn push_negotiation_statuses(
        &self,
        statuses: impl IntoIterator<Item = NegotiationStatus>,
    ) {
        lock(&self.statuses).extend(statuses);
    }

    /// Queues statuses for polls of negotiation `negotiation_id` only.
    ///
    /// Negotiation ids are handed out as `neg-1`, `neg-2`, ... in the order
    /// `initiate_negotiation` is called.
    pub fn push_negotiation_statuses_for(
        &self,
        negotiation_id: &str,
        statuses: impl IntoIterator<Item = NegotiationStatus>,
    ) {
        lock(&self.statuses_by_id)
            .entry(negotiation_id.to_string())
            .or_default()
            .extend(statuses);
    }

    /// Makes every call of `method` wait forever.
    pub fn stall(&self, method: &'static str) {
        lock(&self.stalled).insert(method);
    }

    /// Sets the catalog returned by `request_catalog`.
    pub fn set_catalog(&self, catalog: Catalog) {
        *lock(&self.catalog) = catalog;
    }

    /// Makes the next call of `method` fail with `error`.
    pub fn fail_next(&self, method: &'static str, error: ConnectorError) {
        lock(&self.failures).insert(method, error);
    }

    /// Number of `get_negotiation` calls served so far.
    pub fn negotiation_polls(&self) -> u32 {
        self.polls.load(Ordering::SeqCst)
    }

    pub fn negotiations(&self) -> Vec<NegotiationInitiateRequest> {
        lock(&self.negotiations).clone()
    }

    pub fn catalog_requests(&self) -> Vec<CatalogRequest> {
        lock(&self.catalog_requests).clone()
    }

    pub fn assets(&self) -> Vec<AssetEntry> {
        lock(&self.assets).clone()
    }

    pub fn policies(&self) -> Vec<PolicyDefinition> {
        lock(&self.policies).clone()
    }

    pub fn contract_definitions(&self) -> Vec<ContractDefinition> {
        lock(&self.contract_definitions).clone()
    }

    pub fn transfers(&self) -> Vec<TransferRequest> {
        lock(&self.transfers).clone()
    }

    pub fn dataplanes(&self) -> Vec<DataPlaneInstance> {
        lock(&self.dataplanes).clone()
    }

    /// Applies the stall and queued failure configured for `method`.
    async fn enter(&self, method: &'static str) -> ConnectorResult<()> {
        let stalled = lock(&self.stalled).contains(method);
        if stalled {
            std::future::pending::<()>().await;
        }
        match lock(&self.failures).remove(method) {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    fn next_id(&self, prefix: &str) -> String {
        format!("{}-{}", prefix, self.counter.fetch_add(1, Ordering::SeqCst) + 1)
    }

    fn next_status(&self, negotiation_id: &str) -> NegotiationStatus {
        if let Some(queue) = lock(&self.statuses_by_id).get_mut(negotiation_id) {
            return next_from(queue);
        }
        next_from(&mut lock(&self.statuses))
    }
}

fn next_from(queue: &mut VecDeque<NegotiationStatus>) -> NegotiationStatus {
    if queue.len() > 1 {
        queue.pop_front().unwrap_or_default()
    } else {
        queue
            .front()
            .cloned()
            .unwrap_or_else(|| NegotiationStatus::new(DEFAULT_PENDING_STATE))
    }
}

#[async_trait]
impl ManagementApi for MockManagementApi {
    async fn initiate_negotiation(
        &self,
        request: &NegotiationInitiateRequest,
    ) -> ConnectorResult<IdResponse> {
        self.enter("initiate_negotiation").await?;
        lock(&self.negotiations).push(request.clone());
        Ok(IdResponse {
            id: self.next_id("neg"),
            created_at: None,
        })
    }

    async fn get_negotiation(&self, negotiation_id: &str) -> ConnectorResult<NegotiationStatus> {
        self.polls.fetch_add(1, Ordering::SeqCst);
        self.enter("get_negotiation").await?;
        let mut status = self.next_status(negotiation_id);
        status.id = Some(negotiation_id.to_string());
        Ok(status)
    }

    async fn request_catalog(&self, request: &CatalogRequest) -> ConnectorResult<Catalog> {
        self.enter("request_catalog").await?;
        lock(&self.catalog_requests).push(request.clone());
        Ok(lock(&self.catalog).clone())
    }

    async fn create_asset(&self, entry: &AssetEntry) -> ConnectorResult<()> {
        self.enter("create_asset").await?;
        lock(&self.assets).push(entry.clone());
        Ok(())
    }

    async fn create_policy(&self, definition: &PolicyDefinition) -> ConnectorResult<()> {
        self.enter("create_policy").await?;
        lock(&self.policies).push(definition.clone());
        Ok(())
    }

    async fn create_contract_definition(
        &self,
        definition: &ContractDefinition,
    ) -> ConnectorResult<serde_json::Value> {
        self.enter("create_contract_definition").await?;
        lock(&self.contract_definitions).push(definition.clone());
        Ok(serde_json::json!({ "id": definition.id }))
    }

    async fn initiate_transfer(
        &self,
        request: &TransferRequest,
    ) -> ConnectorResult<serde_json::Value> {
        self.enter("initiate_transfer").await?;
        lock(&self.transfers).push(request.clone());
        Ok(serde_json::json!({ "id": self.next_id("transfer") }))
    }

    async fn add_dataplane_instance(&self, instance: &DataPlaneInstance) -> ConnectorResult<()> {
        self.enter("add_dataplane_instance").await?;
        lock(&self.dataplanes).push(instance.clone());
        Ok(())
    }
}
