//! Workflow-engine provisioning: the asynchronous strategy and the DAG
//! specification it submits.

use crate::{
    error::Error,
    request::ValidatedRequest,
    result::{ProvisionStep, ProvisioningResult, ProvisioningStatus, StepStatus},
    strategy::{ProvisionContext, ProvisioningStrategy},
};
use std::sync::Arc;

/// Name of the DAG task every other task depends on.
pub const NAMESPACE_TASK: &str = "create-namespace";

/// Phase vocabulary reported by the workflow engine.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum WorkflowPhase {
    Pending,
    Running,
    Succeeded,
    Failed,
    Error,
}

/// A phase plus the engine's failure message, if it reported one.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WorkflowReport {
    pub phase: WorkflowPhase,
    pub message: Option<String>,
}

/// Submission and status operations against an external workflow engine.
#[async_trait::async_trait]
pub trait WorkflowEngine: Send + Sync {
    /// Submits a workflow and returns the engine's id for it.
    async fn submit(&self, spec: &WorkflowSpec) -> Result<String, Error>;

    /// Reads the current phase of a previously submitted workflow.
    async fn phase(&self, workflow_id: &str) -> Result<WorkflowReport, Error>;
}

/// One task in the provisioning DAG. The task's name doubles as the name
/// of the template it references inside the cluster's workflow template.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WorkflowTask {
    pub step: ProvisionStep,
    pub name: &'static str,
    pub dependencies: &'static [&'static str],
}

/// An engine-agnostic workflow: which template to run, the parameters
/// every task sees, and the DAG of tasks to execute.
#[derive(Clone, Debug)]
pub struct WorkflowSpec {
    /// Namespace being provisioned; engines may use it to name the run.
    pub namespace_name: String,
    /// Cluster-side workflow template the tasks reference.
    pub template: String,
    pub parameters: Vec<(String, String)>,
    pub tasks: Vec<WorkflowTask>,
}

/// Provisions by handing the whole run to the workflow engine and
/// returning immediately; completion is observed via status lookups.
pub struct WorkflowStrategy {
    engine: Arc<dyn WorkflowEngine>,
    template: String,
}

// === impl WorkflowPhase ===

impl WorkflowPhase {
    /// Parses the engine's phase string. An empty phase means the engine
    /// has accepted the workflow but not yet started it.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "" | "Pending" => Some(Self::Pending),
            "Running" => Some(Self::Running),
            "Succeeded" => Some(Self::Succeeded),
            "Failed" => Some(Self::Failed),
            "Error" => Some(Self::Error),
            _ => None,
        }
    }

    /// Maps the engine's vocabulary onto the provisioning lifecycle.
    pub fn to_status(self) -> ProvisioningStatus {
        match self {
            Self::Pending | Self::Running => ProvisioningStatus::Provisioning,
            Self::Succeeded => ProvisioningStatus::Completed,
            Self::Failed | Self::Error => ProvisioningStatus::Failed,
        }
    }
}

// === impl WorkflowSpec ===

impl WorkflowSpec {
    /// Builds the DAG and parameter set for one validated request.
    ///
    /// Conditional steps are decided here, at submission time: the task
    /// list is the authoritative record of what the run will apply.
    pub fn build(req: &ValidatedRequest, template: &str, requested_at: &str) -> Self {
        let mut parameters = vec![
            ("namespace".to_string(), req.namespace.clone()),
            ("team".to_string(), req.team.clone()),
            ("environment".to_string(), req.environment.to_string()),
            ("resource-tier".to_string(), req.tier.name.to_string()),
            ("cpu-limit".to_string(), req.tier.cpu_limit.to_string()),
            ("memory-limit".to_string(), req.tier.memory_limit.to_string()),
            ("storage-quota".to_string(), req.tier.storage_quota.to_string()),
            ("max-pods".to_string(), req.tier.max_pods.to_string()),
            ("max-services".to_string(), req.tier.max_services.to_string()),
            ("network-policy".to_string(), req.network_policy.to_string()),
            ("requested-by".to_string(), req.requested_by.clone()),
            ("requested-at".to_string(), requested_at.to_string()),
        ];
        if let Some(description) = &req.description {
            parameters.push(("description".to_string(), description.clone()));
        }
        if !req.features.is_empty() {
            let features = req.features.iter().cloned().collect::<Vec<_>>().join(",");
            parameters.push(("features".to_string(), features));
        }

        Self {
            namespace_name: req.namespace.clone(),
            template: template.to_string(),
            parameters,
            tasks: tasks_for(req),
        }
    }
}

fn tasks_for(req: &ValidatedRequest) -> Vec<WorkflowTask> {
    const AFTER_NAMESPACE: &[&str] = &[NAMESPACE_TASK];

    let mut tasks = vec![
        WorkflowTask {
            step: ProvisionStep::Namespace,
            name: NAMESPACE_TASK,
            dependencies: &[],
        },
        WorkflowTask {
            step: ProvisionStep::ResourceQuota,
            name: "apply-resource-quota",
            dependencies: AFTER_NAMESPACE,
        },
        WorkflowTask {
            step: ProvisionStep::LimitRange,
            name: "apply-limit-range",
            dependencies: AFTER_NAMESPACE,
        },
        WorkflowTask {
            step: ProvisionStep::RoleBinding,
            name: "apply-rbac",
            dependencies: AFTER_NAMESPACE,
        },
    ];
    if req.wants_network_policy() {
        tasks.push(WorkflowTask {
            step: ProvisionStep::NetworkPolicy,
            name: "apply-network-policy",
            dependencies: AFTER_NAMESPACE,
        });
    }
    if req.istio_injection() {
        tasks.push(WorkflowTask {
            step: ProvisionStep::IstioInjection,
            name: "enable-istio-injection",
            dependencies: AFTER_NAMESPACE,
        });
    }
    tasks
}

// === impl WorkflowStrategy ===

impl WorkflowStrategy {
    pub fn new(engine: Arc<dyn WorkflowEngine>, template: String) -> Self {
        Self { engine, template }
    }
}

#[async_trait::async_trait]
impl ProvisioningStrategy for WorkflowStrategy {
    async fn provision(
        &self,
        req: &ValidatedRequest,
        ctx: &ProvisionContext,
    ) -> Result<ProvisioningResult, Error> {
        let spec = WorkflowSpec::build(req, &self.template, &ctx.requested_at);
        let mut result = ProvisioningResult::pending(&ctx.request_id, &req.namespace);
        result.status = ProvisioningStatus::Provisioning;

        match self.engine.submit(&spec).await {
            Ok(workflow_id) => {
                tracing::info!(
                    namespace = %req.namespace,
                    workflow = %workflow_id,
                    "Submitted provisioning workflow",
                );
                result.message = format!("workflow {workflow_id} submitted");
                result.workflow_id = Some(workflow_id);
                for task in &spec.tasks {
                    result.record_step(task.step, StepStatus::Pending, None);
                }
            }
            Err(error) => {
                tracing::warn!(namespace = %req.namespace, %error, "Workflow submission failed");
                result.status = ProvisioningStatus::Failed;
                result.message = format!("workflow submission failed: {error}");
            }
        }
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        request::{Environment, NetworkPolicyKind},
        tier::ResourceTierConfig,
    };
    use std::collections::BTreeSet;

    fn request(policy: NetworkPolicyKind, features: &[&str]) -> ValidatedRequest {
        ValidatedRequest {
            namespace: "team-alpha-dev".to_string(),
            team: "team-alpha".to_string(),
            environment: Environment::Development,
            tier: ResourceTierConfig::lookup("medium").expect("medium tier exists"),
            network_policy: policy,
            features: features.iter().map(|f| f.to_string()).collect::<BTreeSet<_>>(),
            description: None,
            requested_by: "alice".to_string(),
            use_workflow_engine: true,
        }
    }

    fn task_names(spec: &WorkflowSpec) -> Vec<&'static str> {
        spec.tasks.iter().map(|t| t.name).collect()
    }

    #[test]
    fn full_dag_fans_out_from_the_namespace_task() {
        let req = request(NetworkPolicyKind::Isolated, &["istio-injection"]);
        let spec = WorkflowSpec::build(&req, "platform-namespace-provision", "2026-01-02T03:04:05Z");

        assert_eq!(
            task_names(&spec),
            vec![
                "create-namespace",
                "apply-resource-quota",
                "apply-limit-range",
                "apply-rbac",
                "apply-network-policy",
                "enable-istio-injection",
            ],
        );
        assert!(spec.tasks[0].dependencies.is_empty());
        for task in &spec.tasks[1..] {
            assert_eq!(task.dependencies, [NAMESPACE_TASK]);
        }
    }

    #[test]
    fn open_policy_and_no_istio_drop_their_tasks() {
        let req = request(NetworkPolicyKind::Open, &[]);
        let spec = WorkflowSpec::build(&req, "platform-namespace-provision", "2026-01-02T03:04:05Z");
        assert_eq!(
            task_names(&spec),
            vec![
                "create-namespace",
                "apply-resource-quota",
                "apply-limit-range",
                "apply-rbac",
            ],
        );
    }

    #[test]
    fn parameters_carry_the_tier_numbers() {
        let req = request(NetworkPolicyKind::TeamShared, &["backup-enabled"]);
        let spec = WorkflowSpec::build(&req, "platform-namespace-provision", "2026-01-02T03:04:05Z");

        let get = |name: &str| {
            spec.parameters
                .iter()
                .find(|(n, _)| n == name)
                .map(|(_, v)| v.as_str())
        };
        assert_eq!(get("namespace"), Some("team-alpha-dev"));
        assert_eq!(get("cpu-limit"), Some("4"));
        assert_eq!(get("memory-limit"), Some("8Gi"));
        assert_eq!(get("max-pods"), Some("25"));
        assert_eq!(get("network-policy"), Some("team-shared"));
        assert_eq!(get("requested-at"), Some("2026-01-02T03:04:05Z"));
        assert_eq!(get("features"), Some("backup-enabled"));
        assert_eq!(get("description"), None);
    }

    #[test]
    fn phase_vocabulary_maps_onto_the_lifecycle() {
        for (raw, status) in [
            ("", ProvisioningStatus::Provisioning),
            ("Pending", ProvisioningStatus::Provisioning),
            ("Running", ProvisioningStatus::Provisioning),
            ("Succeeded", ProvisioningStatus::Completed),
            ("Failed", ProvisioningStatus::Failed),
            ("Error", ProvisioningStatus::Failed),
        ] {
            let phase = WorkflowPhase::parse(raw).expect("phase should parse");
            assert_eq!(phase.to_status(), status, "{raw:?}");
        }
        assert_eq!(WorkflowPhase::parse("Paused"), None);
    }
}
