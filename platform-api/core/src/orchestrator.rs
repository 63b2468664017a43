use crate::{
    cluster::{ListFilter, ManagedNamespace, ProvisionCluster},
    direct::{DirectStrategy, RollbackPolicy},
    error::Error,
    request::ProvisioningRequest,
    result::{ProvisioningResult, ProvisioningStatus},
    store::RequestStore,
    strategy::{ProvisionContext, ProvisioningStrategy},
    validate::validate,
    workflow::{WorkflowEngine, WorkflowStrategy},
};
use chrono::{SecondsFormat, Utc};
use rand::Rng;
use std::sync::Arc;

/// Workflow template installed in the cluster alongside this service.
pub const DEFAULT_WORKFLOW_TEMPLATE: &str = "platform-namespace-provision";

#[derive(Clone, Debug)]
pub struct OrchestratorConfig {
    pub rollback: RollbackPolicy,
    pub workflow_template: String,
}

/// Front door for provisioning: validates requests, refuses duplicates,
/// dispatches to a strategy, and keeps the request store current.
pub struct Orchestrator {
    cluster: Arc<dyn ProvisionCluster>,
    engine: Arc<dyn WorkflowEngine>,
    store: Arc<dyn RequestStore>,
    direct: DirectStrategy,
    workflow: WorkflowStrategy,
}

// === impl OrchestratorConfig ===

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            rollback: RollbackPolicy::default(),
            workflow_template: DEFAULT_WORKFLOW_TEMPLATE.to_string(),
        }
    }
}

// === impl Orchestrator ===

impl Orchestrator {
    pub fn new(
        cluster: Arc<dyn ProvisionCluster>,
        engine: Arc<dyn WorkflowEngine>,
        store: Arc<dyn RequestStore>,
        config: OrchestratorConfig,
    ) -> Self {
        let direct = DirectStrategy::new(cluster.clone(), config.rollback);
        let workflow = WorkflowStrategy::new(engine.clone(), config.workflow_template);
        Self {
            cluster,
            engine,
            store,
            direct,
            workflow,
        }
    }

    /// Accepts a provisioning request and runs it to whatever point its
    /// strategy reaches synchronously.
    ///
    /// Validation failures and duplicate namespaces are refused before
    /// any request state is recorded or any cluster write happens.
    pub async fn submit(&self, request: &ProvisioningRequest) -> Result<ProvisioningResult, Error> {
        let req = validate(request).map_err(Error::Validation)?;

        if self.cluster.namespace_exists(&req.namespace).await? {
            tracing::info!(namespace = %req.namespace, "Refusing request for existing namespace");
            return Err(Error::AlreadyExists(req.namespace));
        }

        let ctx = ProvisionContext {
            request_id: generate_request_id(),
            requested_at: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
        };
        tracing::info!(
            request = %ctx.request_id,
            namespace = %req.namespace,
            team = %req.team,
            environment = %req.environment,
            tier = req.tier.name,
            workflow = req.use_workflow_engine,
            "Provisioning requested",
        );
        self.store
            .put(ProvisioningResult::pending(&ctx.request_id, &req.namespace));

        let strategy: &dyn ProvisioningStrategy = if req.use_workflow_engine {
            &self.workflow
        } else {
            &self.direct
        };
        match strategy.provision(&req, &ctx).await {
            Ok(result) => {
                self.store.put(result.clone());
                Ok(result)
            }
            Err(error) => {
                // Keep the stored record truthful even though the caller
                // only sees the refusal.
                let mut refused = ProvisioningResult::pending(&ctx.request_id, &req.namespace);
                refused.status = ProvisioningStatus::Failed;
                refused.message = error.to_string();
                self.store.put(refused);
                Err(error)
            }
        }
    }

    /// Current state of a request. Non-terminal workflow runs re-read
    /// the engine; terminal results are served from the store untouched.
    pub async fn get_status(&self, request_id: &str) -> Result<ProvisioningResult, Error> {
        let mut result = self
            .store
            .get(request_id)
            .ok_or_else(|| Error::NotFound(request_id.to_string()))?;

        if result.status.is_terminal() {
            return Ok(result);
        }
        let Some(workflow_id) = result.workflow_id.clone() else {
            return Ok(result);
        };

        let report = self.engine.phase(&workflow_id).await?;
        let status = report.phase.to_status();
        if !status.is_terminal() {
            return Ok(result);
        }

        result.status = status;
        match status {
            ProvisioningStatus::Completed => {
                result.complete_pending_steps();
                result.message = format!("workflow {workflow_id} succeeded");
            }
            _ => {
                result.message = match report.message {
                    Some(detail) => format!("workflow {workflow_id} failed: {detail}"),
                    None => format!("workflow {workflow_id} failed"),
                };
            }
        }
        tracing::info!(
            request = %result.request_id,
            workflow = %workflow_id,
            status = status.as_str(),
            "Workflow finished",
        );
        self.store.put(result.clone());
        Ok(result)
    }

    /// Namespaces under platform management, optionally narrowed by team
    /// and environment.
    pub async fn list_managed(&self, filter: &ListFilter) -> Result<Vec<ManagedNamespace>, Error> {
        self.cluster.list_managed(filter).await
    }
}

/// A fresh request id: `req-` plus ten random lowercase alphanumerics.
fn generate_request_id() -> String {
    const CHARSET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";
    let mut rng = rand::thread_rng();
    let suffix: String = (0..10)
        .map(|_| CHARSET[rng.gen_range(0..CHARSET.len())] as char)
        .collect();
    format!("req-{suffix}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_ids_are_prefixed_and_distinct() {
        let a = generate_request_id();
        let b = generate_request_id();
        assert_eq!(a.len(), 14);
        assert!(a.starts_with("req-"));
        assert!(a[4..].chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit()));
        assert_ne!(a, b);
    }
}
