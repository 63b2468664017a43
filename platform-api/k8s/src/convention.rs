//! Names, labels, and annotations that make a namespace recognizable as
//! platform-managed. Everything the service writes to a cluster goes
//! through these constants; they are load-bearing for `list_managed` and
//! for any tooling that selects on them.

/// Marks a namespace as owned by the platform. Always `"true"`.
pub const MANAGED_LABEL: &str = "platform.io/managed";
pub const TEAM_LABEL: &str = "platform.io/team";
pub const ENVIRONMENT_LABEL: &str = "platform.io/environment";
pub const RESOURCE_TIER_LABEL: &str = "platform.io/resource-tier";
pub const NETWORK_POLICY_LABEL: &str = "platform.io/network-policy";
pub const PROVISIONED_BY_LABEL: &str = "platform.io/provisioned-by";

pub const REQUESTED_BY_ANNOTATION: &str = "platform.io/requested-by";
pub const REQUESTED_AT_ANNOTATION: &str = "platform.io/requested-at";
pub const DESCRIPTION_ANNOTATION: &str = "platform.io/description";
/// JSON array of the request's feature flags, recognized or not.
pub const FEATURES_ANNOTATION: &str = "platform.io/features";

/// Istio's own namespace label; set to `"enabled"` when the request
/// carries the istio-injection feature.
pub const ISTIO_INJECTION_LABEL: &str = "istio-injection";

pub const RESOURCE_QUOTA_NAME: &str = "platform-resource-quota";
pub const LIMIT_RANGE_NAME: &str = "platform-limit-range";
pub const ISOLATED_POLICY_NAME: &str = "platform-isolated-policy";
pub const TEAM_SHARED_POLICY_NAME: &str = "platform-team-shared-policy";

pub const FIELD_MANAGER: &str = "platform-api";

/// Name of both the RoleBinding in the namespace and the group it binds.
pub fn team_developers(team: &str) -> String {
    format!("{team}-developers")
}
