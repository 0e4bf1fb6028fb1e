//! Eclipse Dataspace Connector (EDC) controller.

pub mod agreements;
pub mod api;
pub mod controller;
pub mod mock;
pub mod models;
pub mod negotiation;
pub mod policy;

pub use agreements::{AgreementRecord, AgreementStore, InMemoryAgreementStore};
pub use api::{HttpManagementApi, ManagementApi};
pub use controller::EdcController;
pub use mock::MockManagementApi;
pub use negotiation::{await_agreement, NegotiationState};
pub use policy::{map_usage_policy_rule, UNRESTRICTED_POLICY_UID};
