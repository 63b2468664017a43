//! Synchronous provisioning: apply each step in order against the
//! cluster, stopping at the first failure.

use crate::{
    cluster::ProvisionCluster,
    error::Error,
    request::ValidatedRequest,
    result::{ProvisionStep, ProvisioningResult, ProvisioningStatus, StepStatus},
    strategy::{ProvisionContext, ProvisioningStrategy},
};
use std::sync::Arc;

/// What to do with a partially provisioned namespace after a step fails.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum RollbackPolicy {
    /// Leave applied resources in place. The failed run can be retried
    /// once the namespace is removed, and an operator can inspect what
    /// was applied.
    #[default]
    Keep,
    /// Delete the namespace, cascading to everything created in it.
    DeleteNamespace,
}

/// Provisions synchronously, one cluster write per step in a fixed
/// order. The caller gets a terminal result: either every applicable
/// step applied, or the first failure with everything before it intact.
pub struct DirectStrategy {
    cluster: Arc<dyn ProvisionCluster>,
    rollback: RollbackPolicy,
}

// === impl DirectStrategy ===

impl DirectStrategy {
    pub fn new(cluster: Arc<dyn ProvisionCluster>, rollback: RollbackPolicy) -> Self {
        Self { cluster, rollback }
    }

    /// The ordered steps this request needs. Open network policy and
    /// absent istio-injection drop their steps entirely.
    fn steps_for(req: &ValidatedRequest) -> impl Iterator<Item = ProvisionStep> + '_ {
        ProvisionStep::ORDERED.into_iter().filter(|step| match step {
            ProvisionStep::NetworkPolicy => req.wants_network_policy(),
            ProvisionStep::IstioInjection => req.istio_injection(),
            _ => true,
        })
    }

    async fn apply(
        &self,
        step: ProvisionStep,
        req: &ValidatedRequest,
        ctx: &ProvisionContext,
    ) -> Result<(), Error> {
        match step {
            ProvisionStep::Namespace => {
                self.cluster.create_namespace(req, &ctx.requested_at).await
            }
            ProvisionStep::ResourceQuota => self.cluster.create_resource_quota(req).await,
            ProvisionStep::LimitRange => self.cluster.create_limit_range(req).await,
            ProvisionStep::RoleBinding => self.cluster.create_team_role_binding(req).await,
            ProvisionStep::NetworkPolicy => self.cluster.create_network_policy(req).await,
            ProvisionStep::IstioInjection => {
                self.cluster.enable_istio_injection(&req.namespace).await
            }
        }
    }

    async fn roll_back(&self, req: &ValidatedRequest, result: &mut ProvisioningResult) {
        match self.cluster.delete_namespace(&req.namespace).await {
            Ok(()) => {
                tracing::info!(namespace = %req.namespace, "Rolled back partially provisioned namespace");
                result.message.push_str("; namespace deleted");
            }
            Err(error) => {
                tracing::warn!(namespace = %req.namespace, %error, "Rollback failed");
                result.message.push_str(&format!("; rollback failed: {error}"));
            }
        }
    }
}

#[async_trait::async_trait]
impl ProvisioningStrategy for DirectStrategy {
    async fn provision(
        &self,
        req: &ValidatedRequest,
        ctx: &ProvisionContext,
    ) -> Result<ProvisioningResult, Error> {
        let mut result = ProvisioningResult::pending(&ctx.request_id, &req.namespace);
        result.status = ProvisioningStatus::Provisioning;

        for step in Self::steps_for(req) {
            match self.apply(step, req, ctx).await {
                Ok(()) => {
                    tracing::debug!(namespace = %req.namespace, step = step.as_str(), "Applied");
                    result.record_step(step, StepStatus::Applied, None);
                }
                // A namespace name conflict is the authoritative duplicate
                // signal; it refuses the request rather than failing the run.
                Err(error @ Error::AlreadyExists(_)) if step == ProvisionStep::Namespace => {
                    return Err(error);
                }
                Err(error) => {
                    tracing::warn!(
                        namespace = %req.namespace,
                        step = step.as_str(),
                        %error,
                        "Provisioning step failed",
                    );
                    result.record_step(step, StepStatus::Failed, Some(error.to_string()));
                    result.status = ProvisioningStatus::Failed;
                    result.message = format!("step {} failed: {error}", step.as_str());
                    if self.rollback == RollbackPolicy::DeleteNamespace
                        && result.created_resources.namespace
                    {
                        self.roll_back(req, &mut result).await;
                    }
                    return Ok(result);
                }
            }
        }

        result.status = ProvisioningStatus::Completed;
        result.message = format!("namespace {} provisioned", req.namespace);
        Ok(result)
    }
}
