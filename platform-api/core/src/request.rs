use crate::tier::ResourceTierConfig;
use std::{collections::BTreeSet, fmt, str::FromStr};

/// Feature flag that labels the namespace for istio sidecar injection.
pub const FEATURE_ISTIO_INJECTION: &str = "istio-injection";

/// Feature flags recognized by the platform. Unrecognized flags are kept
/// on the namespace annotation but have no provisioning behavior.
pub const KNOWN_FEATURES: &[&str] = &[
    FEATURE_ISTIO_INJECTION,
    "monitoring-enhanced",
    "backup-enabled",
];

/// Deployment environment a namespace belongs to.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

/// Isolation level applied to a provisioned namespace.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum NetworkPolicyKind {
    /// No NetworkPolicy object is created.
    Open,
    /// Traffic is scoped to namespaces carrying the same team label.
    TeamShared,
    /// Traffic is scoped to the namespace itself, plus DNS egress.
    Isolated,
}

/// Indicates that a request carried a value outside an enum's vocabulary.
#[derive(Clone, Debug, thiserror::Error)]
#[error("unrecognized value {0:?}")]
pub struct UnknownValue(pub String);

/// A provisioning request as received on the wire.
///
/// Enum-valued fields stay as strings here so validation can report every
/// bad field in one pass instead of failing at deserialization. Missing
/// fields deserialize to their defaults and are caught by the validator.
#[derive(Clone, Debug, Default, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProvisioningRequest {
    #[serde(default)]
    pub namespace_name: String,
    #[serde(default)]
    pub team: String,
    #[serde(default)]
    pub environment: String,
    #[serde(default)]
    pub resource_tier: String,
    #[serde(default)]
    pub network_policy: String,
    #[serde(default)]
    pub features: Vec<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub requested_by: String,
    /// Route this request through the external workflow engine instead of
    /// provisioning synchronously.
    #[serde(default)]
    pub use_workflow_engine: bool,
}

/// A request that has passed validation, with enum fields parsed and the
/// resource tier resolved against the catalog.
#[derive(Clone, Debug)]
pub struct ValidatedRequest {
    pub namespace: String,
    pub team: String,
    pub environment: Environment,
    pub tier: &'static ResourceTierConfig,
    pub network_policy: NetworkPolicyKind,
    pub features: BTreeSet<String>,
    pub description: Option<String>,
    pub requested_by: String,
    pub use_workflow_engine: bool,
}

// === impl Environment ===

impl Environment {
    pub const ALL: [Self; 3] = [Self::Development, Self::Staging, Self::Production];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Development => "development",
            Self::Staging => "staging",
            Self::Production => "production",
        }
    }
}

impl FromStr for Environment {
    type Err = UnknownValue;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "development" => Ok(Self::Development),
            "staging" => Ok(Self::Staging),
            "production" => Ok(Self::Production),
            s => Err(UnknownValue(s.to_string())),
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.as_str().fmt(f)
    }
}

// === impl NetworkPolicyKind ===

impl NetworkPolicyKind {
    pub const ALL: [Self; 3] = [Self::Open, Self::TeamShared, Self::Isolated];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::TeamShared => "team-shared",
            Self::Isolated => "isolated",
        }
    }
}

impl FromStr for NetworkPolicyKind {
    type Err = UnknownValue;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "open" => Ok(Self::Open),
            "team-shared" => Ok(Self::TeamShared),
            "isolated" => Ok(Self::Isolated),
            s => Err(UnknownValue(s.to_string())),
        }
    }
}

impl fmt::Display for NetworkPolicyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.as_str().fmt(f)
    }
}

// === impl ValidatedRequest ===

impl ValidatedRequest {
    /// Whether the namespace should be labeled for istio sidecar injection.
    pub fn istio_injection(&self) -> bool {
        self.features.contains(FEATURE_ISTIO_INJECTION)
    }

    /// Whether provisioning creates a NetworkPolicy object at all.
    pub fn wants_network_policy(&self) -> bool {
        self.network_policy != NetworkPolicyKind::Open
    }
}
