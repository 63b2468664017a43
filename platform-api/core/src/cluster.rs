use crate::{error::Error, request::{Environment, ValidatedRequest}};

/// Narrows a managed-namespace listing.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ListFilter {
    pub team: Option<String>,
    pub environment: Option<Environment>,
}

/// A namespace under platform management, as reported by the cluster.
///
/// Fields are read back from the namespace's labels and annotations, so
/// they are strings even where the request model is typed.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ManagedNamespace {
    pub name: String,
    pub team: String,
    pub environment: String,
    pub resource_tier: String,
    pub network_policy: String,
    pub requested_by: String,
    pub requested_at: String,
}

/// Cluster-side provisioning operations.
///
/// Implemented against the Kubernetes API by the k8s crate and by
/// in-memory fakes in tests. Every method is expected to bound its own
/// I/O; callers do not apply timeouts.
#[async_trait::async_trait]
pub trait ProvisionCluster: Send + Sync {
    /// Whether a namespace with this name exists, managed or not.
    async fn namespace_exists(&self, name: &str) -> Result<bool, Error>;

    /// Creates the namespace with the full platform label and annotation
    /// set. A name conflict surfaces as [`Error::AlreadyExists`].
    async fn create_namespace(
        &self,
        req: &ValidatedRequest,
        requested_at: &str,
    ) -> Result<(), Error>;

    /// Applies the tier's ResourceQuota to the namespace.
    async fn create_resource_quota(&self, req: &ValidatedRequest) -> Result<(), Error>;

    /// Applies the tier's LimitRange to the namespace.
    async fn create_limit_range(&self, req: &ValidatedRequest) -> Result<(), Error>;

    /// Grants the team's developer group edit access in the namespace.
    async fn create_team_role_binding(&self, req: &ValidatedRequest) -> Result<(), Error>;

    /// Applies the NetworkPolicy matching the request's isolation level.
    /// A no-op for the open policy.
    async fn create_network_policy(&self, req: &ValidatedRequest) -> Result<(), Error>;

    /// Labels the namespace for istio sidecar injection.
    async fn enable_istio_injection(&self, namespace: &str) -> Result<(), Error>;

    /// Deletes the namespace, cascading to everything in it. Succeeds if
    /// the namespace is already gone.
    async fn delete_namespace(&self, name: &str) -> Result<(), Error>;

    /// Lists namespaces carrying the platform's managed label.
    async fn list_managed(&self, filter: &ListFilter) -> Result<Vec<ManagedNamespace>, Error>;
}
