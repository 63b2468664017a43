use crate::{
    convention::{
        ENVIRONMENT_LABEL, FIELD_MANAGER, ISTIO_INJECTION_LABEL, MANAGED_LABEL,
        NETWORK_POLICY_LABEL, REQUESTED_AT_ANNOTATION, REQUESTED_BY_ANNOTATION,
        RESOURCE_TIER_LABEL, TEAM_LABEL,
    },
    objects,
};
use k8s_openapi::api::{
    core::v1::{LimitRange, Namespace, ResourceQuota},
    networking::v1::NetworkPolicy,
    rbac::v1::RoleBinding,
};
use kube::{
    api::{Api, DeleteParams, ListParams, Patch, PatchParams, PostParams, ResourceExt},
    Client,
};
use platform_api_core::{
    Error, ListFilter, ManagedNamespace, ProvisionCluster, ValidatedRequest,
};
use std::collections::BTreeMap;
use tokio::time;
use tracing::{debug, info};

/// Writes provisioning objects to the cluster.
///
/// Every call is bounded by a single write timeout; a hung API server
/// surfaces as an infrastructure error rather than a stuck request.
/// Child-resource creates tolerate conflicts so a failed run can be
/// retried after its namespace is removed, or resumed by a workflow
/// re-run, without tripping over what already exists.
#[derive(Clone)]
pub struct ProvisionerClient {
    client: Client,
    timeout: time::Duration,
}

// === impl ProvisionerClient ===

impl ProvisionerClient {
    pub fn new(client: Client, timeout: time::Duration) -> Self {
        Self { client, timeout }
    }

    fn namespaces(&self) -> Api<Namespace> {
        Api::all(self.client.clone())
    }

    fn post_params() -> PostParams {
        PostParams {
            dry_run: false,
            field_manager: Some(FIELD_MANAGER.to_string()),
        }
    }

    async fn bounded<T, F>(&self, what: &str, fut: F) -> Result<T, Error>
    where
        F: std::future::Future<Output = Result<T, kube::Error>>,
    {
        match time::timeout(self.timeout, fut).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(error)) => Err(translate(what, error)),
            Err(_) => Err(Error::infrastructure(format!(
                "{what}: no response from the cluster within {:?}",
                self.timeout,
            ))),
        }
    }

    /// Creates an object, treating a name conflict as success: the
    /// object is there, which is what the step is for.
    async fn create_if_absent<K>(&self, what: &str, api: &Api<K>, obj: &K) -> Result<(), Error>
    where
        K: Clone + std::fmt::Debug + serde::Serialize + serde::de::DeserializeOwned,
    {
        match self.bounded(what, api.create(&Self::post_params(), obj)).await {
            Ok(_) => {
                debug!(what, "Created");
                Ok(())
            }
            Err(Error::Infrastructure {
                status: Some(409), ..
            }) => {
                debug!(what, "Already present; left in place");
                Ok(())
            }
            Err(error) => Err(error),
        }
    }
}

#[async_trait::async_trait]
impl ProvisionCluster for ProvisionerClient {
    async fn namespace_exists(&self, name: &str) -> Result<bool, Error> {
        let found = self
            .bounded("get namespace", self.namespaces().get_opt(name))
            .await?;
        Ok(found.is_some())
    }

    async fn create_namespace(
        &self,
        req: &ValidatedRequest,
        requested_at: &str,
    ) -> Result<(), Error> {
        let ns = objects::namespace(req, requested_at);
        match self
            .bounded(
                "create namespace",
                self.namespaces().create(&Self::post_params(), &ns),
            )
            .await
        {
            Ok(_) => {
                info!(namespace = %req.namespace, "Created namespace");
                Ok(())
            }
            // The authoritative duplicate signal: someone else created the
            // name between the existence check and this write.
            Err(Error::Infrastructure {
                status: Some(409), ..
            }) => Err(Error::AlreadyExists(req.namespace.clone())),
            Err(error) => Err(error),
        }
    }

    async fn create_resource_quota(&self, req: &ValidatedRequest) -> Result<(), Error> {
        let api = Api::<ResourceQuota>::namespaced(self.client.clone(), &req.namespace);
        self.create_if_absent("create resource quota", &api, &objects::resource_quota(req))
            .await
    }

    async fn create_limit_range(&self, req: &ValidatedRequest) -> Result<(), Error> {
        let api = Api::<LimitRange>::namespaced(self.client.clone(), &req.namespace);
        self.create_if_absent("create limit range", &api, &objects::limit_range(req))
            .await
    }

    async fn create_team_role_binding(&self, req: &ValidatedRequest) -> Result<(), Error> {
        let api = Api::<RoleBinding>::namespaced(self.client.clone(), &req.namespace);
        self.create_if_absent("create role binding", &api, &objects::team_role_binding(req))
            .await
    }

    async fn create_network_policy(&self, req: &ValidatedRequest) -> Result<(), Error> {
        let Some(policy) = objects::network_policy(req) else {
            debug!(namespace = %req.namespace, "Open network policy; nothing to apply");
            return Ok(());
        };
        let api = Api::<NetworkPolicy>::namespaced(self.client.clone(), &req.namespace);
        self.create_if_absent("create network policy", &api, &policy)
            .await
    }

    async fn enable_istio_injection(&self, namespace: &str) -> Result<(), Error> {
        let patch = serde_json::json!({
            "metadata": { "labels": { ISTIO_INJECTION_LABEL: "enabled" } }
        });
        self.bounded(
            "label namespace for istio injection",
            self.namespaces()
                .patch(
                    namespace,
                    &PatchParams::apply(FIELD_MANAGER),
                    &Patch::Merge(&patch),
                ),
        )
        .await?;
        debug!(%namespace, "Enabled istio injection");
        Ok(())
    }

    async fn delete_namespace(&self, name: &str) -> Result<(), Error> {
        match self
            .bounded(
                "delete namespace",
                self.namespaces().delete(name, &DeleteParams::background()),
            )
            .await
        {
            Ok(_) => {
                info!(namespace = %name, "Deleted namespace");
                Ok(())
            }
            // Already gone is fine; deletion only has to be idempotent.
            Err(Error::Infrastructure {
                status: Some(404), ..
            }) => Ok(()),
            Err(error) => Err(error),
        }
    }

    async fn list_managed(&self, filter: &ListFilter) -> Result<Vec<ManagedNamespace>, Error> {
        let params = ListParams::default().labels(&managed_selector(filter));
        let list = self
            .bounded("list namespaces", self.namespaces().list(&params))
            .await?;
        Ok(list.items.iter().map(managed_row).collect())
    }
}

/// Label selector matching managed namespaces, narrowed by the filter.
fn managed_selector(filter: &ListFilter) -> String {
    let mut selector = format!("{}=true", MANAGED_LABEL);
    if let Some(team) = &filter.team {
        selector.push_str(&format!(",{}={}", TEAM_LABEL, team));
    }
    if let Some(environment) = filter.environment {
        selector.push_str(&format!(",{}={}", ENVIRONMENT_LABEL, environment.as_str()));
    }
    selector
}

fn managed_row(ns: &Namespace) -> ManagedNamespace {
    let labels = ns.labels();
    let annotations = ns.annotations();
    ManagedNamespace {
        name: ns.name_any(),
        team: value(labels, TEAM_LABEL),
        environment: value(labels, ENVIRONMENT_LABEL),
        resource_tier: value(labels, RESOURCE_TIER_LABEL),
        network_policy: value(labels, NETWORK_POLICY_LABEL),
        requested_by: value(annotations, REQUESTED_BY_ANNOTATION),
        requested_at: value(annotations, REQUESTED_AT_ANNOTATION),
    }
}

fn value(map: &BTreeMap<String, String>, key: &str) -> String {
    map.get(key).cloned().unwrap_or_default()
}

fn translate(what: &str, error: kube::Error) -> Error {
    let status = match &error {
        kube::Error::Api(response) => Some(response.code),
        _ => None,
    };
    Error::Infrastructure {
        status,
        message: format!("{what}: {error}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kube::api::ObjectMeta;
    use maplit::{btreemap, convert_args};
    use platform_api_core::Environment;

    #[test]
    fn api_errors_keep_their_status_code() {
        let error = kube::Error::Api(kube::core::ErrorResponse {
            status: "Failure".to_string(),
            message: "resourcequotas is forbidden".to_string(),
            reason: "Forbidden".to_string(),
            code: 403,
        });
        match translate("create resource quota", error) {
            Error::Infrastructure { status, message } => {
                assert_eq!(status, Some(403));
                assert!(message.starts_with("create resource quota:"));
                assert!(message.contains("forbidden"));
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn non_api_errors_have_no_status() {
        let error = kube::Error::Service("connection refused".into());
        match translate("list namespaces", error) {
            Error::Infrastructure { status, .. } => assert_eq!(status, None),
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn selector_always_requires_the_managed_label() {
        assert_eq!(
            managed_selector(&ListFilter::default()),
            "platform.io/managed=true",
        );
        assert_eq!(
            managed_selector(&ListFilter {
                team: Some("team-alpha".to_string()),
                environment: None,
            }),
            "platform.io/managed=true,platform.io/team=team-alpha",
        );
        assert_eq!(
            managed_selector(&ListFilter {
                team: Some("team-alpha".to_string()),
                environment: Some(Environment::Staging),
            }),
            "platform.io/managed=true,platform.io/team=team-alpha,platform.io/environment=staging",
        );
    }

    #[test]
    fn rows_are_read_from_labels_and_annotations() {
        let ns = Namespace {
            metadata: ObjectMeta {
                name: Some("team-alpha-dev".to_string()),
                labels: Some(convert_args!(btreemap!(
                    "platform.io/managed" => "true",
                    "platform.io/team" => "team-alpha",
                    "platform.io/environment" => "development",
                    "platform.io/resource-tier" => "small",
                    "platform.io/network-policy" => "open",
                ))),
                annotations: Some(convert_args!(btreemap!(
                    "platform.io/requested-by" => "alice",
                    "platform.io/requested-at" => "2026-01-02T03:04:05Z",
                ))),
                ..Default::default()
            },
            ..Default::default()
        };
        let row = managed_row(&ns);
        assert_eq!(row.name, "team-alpha-dev");
        assert_eq!(row.team, "team-alpha");
        assert_eq!(row.environment, "development");
        assert_eq!(row.resource_tier, "small");
        assert_eq!(row.network_policy, "open");
        assert_eq!(row.requested_by, "alice");
        assert_eq!(row.requested_at, "2026-01-02T03:04:05Z");
    }

    #[test]
    fn rows_tolerate_stripped_metadata() {
        let ns = Namespace {
            metadata: ObjectMeta {
                name: Some("orphan".to_string()),
                ..Default::default()
            },
            ..Default::default()
        };
        let row = managed_row(&ns);
        assert_eq!(row.name, "orphan");
        assert_eq!(row.team, "");
        assert_eq!(row.requested_by, "");
    }
}
