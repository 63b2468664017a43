use kube::{
    api::{Api, ObjectMeta, PostParams, ResourceExt},
    core::{DynamicObject, TypeMeta},
    discovery::ApiResource,
    Client,
};
use platform_api_core::{Error, WorkflowEngine, WorkflowPhase, WorkflowReport, WorkflowSpec};
use serde_json::json;
use tokio::time;
use tracing::info;

const GROUP: &str = "argoproj.io";
const VERSION: &str = "v1alpha1";
const KIND: &str = "Workflow";
const PLURAL: &str = "workflows";

/// Name of the single DAG template inside each submitted workflow.
const ENTRYPOINT: &str = "provision";

/// Submits provisioning workflows to Argo and polls their phase.
///
/// Workflows are `DynamicObject`s: this service does not own the Argo
/// CRDs and only touches the handful of fields it writes and reads. Each
/// DAG task references a template of the same name inside the
/// cluster-installed workflow template, so the actual provisioning
/// containers are operated independently of this service.
#[derive(Clone)]
pub struct ArgoWorkflows {
    client: Client,
    /// Namespace workflows are submitted to, watched by the Argo
    /// controller.
    namespace: String,
    timeout: time::Duration,
}

// === impl ArgoWorkflows ===

impl ArgoWorkflows {
    pub fn new(client: Client, namespace: String, timeout: time::Duration) -> Self {
        Self {
            client,
            namespace,
            timeout,
        }
    }

    fn api(&self) -> Api<DynamicObject> {
        Api::namespaced_with(self.client.clone(), &self.namespace, &api_resource())
    }

    async fn bounded<T, F>(&self, what: &str, fut: F) -> Result<T, Error>
    where
        F: std::future::Future<Output = Result<T, kube::Error>>,
    {
        match time::timeout(self.timeout, fut).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(error)) => Err(translate(what, error)),
            Err(_) => Err(Error::infrastructure(format!(
                "{what}: no response from the workflow engine within {:?}",
                self.timeout,
            ))),
        }
    }
}

#[async_trait::async_trait]
impl WorkflowEngine for ArgoWorkflows {
    async fn submit(&self, spec: &WorkflowSpec) -> Result<String, Error> {
        let workflow = render(spec);
        let created = self
            .bounded(
                "submit workflow",
                self.api().create(&PostParams::default(), &workflow),
            )
            .await?;
        let id = created.name_any();
        info!(workflow = %id, namespace = %spec.namespace_name, "Workflow submitted");
        Ok(id)
    }

    async fn phase(&self, workflow_id: &str) -> Result<WorkflowReport, Error> {
        let workflow = self
            .bounded("get workflow", self.api().get(workflow_id))
            .await?;
        report_from(workflow_id, &workflow.data)
    }
}

fn api_resource() -> ApiResource {
    ApiResource {
        group: GROUP.to_string(),
        version: VERSION.to_string(),
        kind: KIND.to_string(),
        api_version: format!("{GROUP}/{VERSION}"),
        plural: PLURAL.to_string(),
    }
}

/// Renders the engine-agnostic spec as an Argo `Workflow` object.
fn render(spec: &WorkflowSpec) -> DynamicObject {
    let parameters: Vec<_> = spec
        .parameters
        .iter()
        .map(|(name, value)| json!({ "name": name, "value": value }))
        .collect();

    let tasks: Vec<_> = spec
        .tasks
        .iter()
        .map(|task| {
            let mut rendered = json!({
                "name": task.name,
                "templateRef": { "name": spec.template, "template": task.name },
            });
            if !task.dependencies.is_empty() {
                rendered["dependencies"] = json!(task.dependencies);
            }
            rendered
        })
        .collect();

    DynamicObject {
        types: Some(TypeMeta {
            api_version: format!("{GROUP}/{VERSION}"),
            kind: KIND.to_string(),
        }),
        metadata: ObjectMeta {
            // The API server truncates the base if the generated name
            // would exceed the object name limit.
            generate_name: Some(format!("platform-ns-{}-", spec.namespace_name)),
            ..Default::default()
        },
        data: json!({
            "spec": {
                "entrypoint": ENTRYPOINT,
                "arguments": { "parameters": parameters },
                "templates": [{
                    "name": ENTRYPOINT,
                    "dag": { "tasks": tasks },
                }],
            }
        }),
    }
}

/// Reads a phase report out of a workflow's `status` block. A workflow
/// with no status yet is pending; a phase outside Argo's vocabulary is an
/// infrastructure error rather than a guess.
fn report_from(workflow_id: &str, data: &serde_json::Value) -> Result<WorkflowReport, Error> {
    let raw = data
        .pointer("/status/phase")
        .and_then(|v| v.as_str())
        .unwrap_or("");
    let phase = WorkflowPhase::parse(raw).ok_or_else(|| {
        Error::infrastructure(format!(
            "workflow {workflow_id} reported unrecognized phase {raw:?}"
        ))
    })?;
    let message = data
        .pointer("/status/message")
        .and_then(|v| v.as_str())
        .map(|s| s.to_string());
    Ok(WorkflowReport { phase, message })
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
    use platform_api_core::{
        Environment, NetworkPolicyKind, ResourceTierConfig, ValidatedRequest,
    };
    use std::collections::BTreeSet;

    fn spec() -> WorkflowSpec {
        let req = ValidatedRequest {
            namespace: "team-alpha-dev".to_string(),
            team: "team-alpha".to_string(),
            environment: Environment::Development,
            tier: ResourceTierConfig::lookup("small").expect("small tier exists"),
            network_policy: NetworkPolicyKind::Isolated,
            features: ["istio-injection"]
                .iter()
                .map(|f| f.to_string())
                .collect::<BTreeSet<_>>(),
            description: None,
            requested_by: "alice".to_string(),
            use_workflow_engine: true,
        };
        WorkflowSpec::build(&req, "platform-namespace-provision", "2026-01-02T03:04:05Z")
    }

    #[test]
    fn renders_an_argo_workflow() {
        let value = serde_json::to_value(render(&spec())).expect("should serialize");

        assert_eq!(value["apiVersion"], "argoproj.io/v1alpha1");
        assert_eq!(value["kind"], "Workflow");
        assert_eq!(value["metadata"]["generateName"], "platform-ns-team-alpha-dev-");
        assert_eq!(value["spec"]["entrypoint"], "provision");

        let templates = value["spec"]["templates"]
            .as_array()
            .expect("templates is an array");
        assert_eq!(templates.len(), 1);
        assert_eq!(templates[0]["name"], "provision");
    }

    #[test]
    fn tasks_reference_the_cluster_template() {
        let value = serde_json::to_value(render(&spec())).expect("should serialize");
        let tasks = value["spec"]["templates"][0]["dag"]["tasks"]
            .as_array()
            .expect("dag tasks is an array");
        assert_eq!(tasks.len(), 6);

        assert_eq!(tasks[0]["name"], "create-namespace");
        assert_eq!(
            tasks[0]["templateRef"]["name"],
            "platform-namespace-provision",
        );
        assert_eq!(tasks[0]["templateRef"]["template"], "create-namespace");
        assert!(tasks[0].get("dependencies").is_none());

        for task in &tasks[1..] {
            assert_eq!(task["dependencies"], json!(["create-namespace"]));
        }
    }

    #[test]
    fn rendered_parameters_mirror_the_spec() {
        let spec = spec();
        let value = serde_json::to_value(render(&spec)).expect("should serialize");
        let parameters = value["spec"]["arguments"]["parameters"]
            .as_array()
            .expect("parameters is an array");
        assert_eq!(parameters.len(), spec.parameters.len());
        assert!(parameters
            .iter()
            .any(|p| p["name"] == "namespace" && p["value"] == "team-alpha-dev"));
        assert!(parameters
            .iter()
            .any(|p| p["name"] == "features" && p["value"] == "istio-injection"));
    }

    #[test]
    fn missing_status_reads_as_pending() {
        let report = report_from("wf-1", &json!({"spec": {}})).expect("should read");
        assert_eq!(report.phase, WorkflowPhase::Pending);
        assert_eq!(report.message, None);
    }

    #[test]
    fn phase_and_message_are_read_from_status() {
        let data = json!({
            "status": { "phase": "Failed", "message": "child pod errored" }
        });
        let report = report_from("wf-1", &data).expect("should read");
        assert_eq!(report.phase, WorkflowPhase::Failed);
        assert_eq!(report.message.as_deref(), Some("child pod errored"));
    }

    #[test]
    fn unknown_phases_are_refused() {
        let data = json!({ "status": { "phase": "Paused" } });
        let error = report_from("wf-1", &data).expect_err("unknown phase");
        assert!(error.to_string().contains("Paused"));
    }
}
