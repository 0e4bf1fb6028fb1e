//! Usage-policy to EDC policy mapping.
//!
//! Translates the abstract [`UsagePolicy`] descriptors of the controller
//! contract into the policy documents the EDC management API stores. Only
//! unrestricted use has an EDC counterpart today; every other pattern is
//! rejected with [`ConnectorError::UnsupportedPolicy`].

use super::models::{Action, Permission, Policy, PolicyType};
use crate::traits::{ConnectorError, ConnectorResult, UsagePolicy, UsagePolicyType};

/// Policy uid shared by every unrestricted policy this mapper produces.
///
/// EDC keys stored policy definitions by the definition id, not by this uid,
/// so reusing it across definitions is accepted by the connector.
pub const UNRESTRICTED_POLICY_UID: &str = "231802-bb34-11ec-8422-0242ac120002";

const USE_ACTION: &str = "USE";
const PERMISSION_EDC_TYPE: &str = "dataspaceconnector:permission";

/// Maps a usage policy scoped to `asset_id` onto an EDC policy.
///
/// An absent policy is treated as unrestricted.
pub fn map_usage_policy_rule(
    asset_id: &str,
    usage_policy: Option<&UsagePolicy>,
) -> ConnectorResult<Policy> {
    match usage_policy.map(|p| p.policy_type) {
        None | Some(UsagePolicyType::Unrestricted) => Ok(unrestricted_policy(asset_id)),
        Some(other) => Err(ConnectorError::UnsupportedPolicy(format!(
            "usage policy '{}' is not supported by the EDC controller",
            other
        ))),
    }
}

fn unrestricted_policy(asset_id: &str) -> Policy {
    Policy {
        uid: UNRESTRICTED_POLICY_UID.to_string(),
        permissions: vec![Permission {
            target: asset_id.to_string(),
            action: Action {
                action_type: USE_ACTION.to_string(),
            },
            edctype: PERMISSION_EDC_TYPE.to_string(),
        }],
        policy_type: PolicyType::set(),
    }
}
