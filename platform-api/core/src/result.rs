use serde::Serialize;

/// Lifecycle of a provisioning request.
///
/// `Completed` and `Failed` are terminal; a result never leaves a
/// terminal status once it has been recorded.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProvisioningStatus {
    Pending,
    Provisioning,
    Completed,
    Failed,
}

/// The ordered steps of a provisioning run.
///
/// The namespace must exist before anything else is applied; the
/// remaining steps each depend only on the namespace.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProvisionStep {
    Namespace,
    ResourceQuota,
    LimitRange,
    RoleBinding,
    NetworkPolicy,
    IstioInjection,
}

/// Outcome of a single step within a run.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    /// Submitted to the workflow engine but not yet reported on.
    Pending,
    Applied,
    Failed,
}

/// One entry in a run's step log.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StepOutcome {
    pub step: ProvisionStep,
    pub outcome: StepStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// Which child resources a run has actually applied to the cluster.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedResources {
    pub namespace: bool,
    pub resource_quota: bool,
    pub limit_range: bool,
    pub rbac: bool,
    pub network_policy: bool,
    pub istio_injection: bool,
}

/// The queryable record of a provisioning request.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProvisioningResult {
    pub request_id: String,
    pub status: ProvisioningStatus,
    pub namespace_name: String,
    /// Set only for workflow-engine runs.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workflow_id: Option<String>,
    pub message: String,
    pub created_resources: CreatedResources,
    pub steps: Vec<StepOutcome>,
}

// === impl ProvisioningStatus ===

impl ProvisioningStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Provisioning => "provisioning",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

// === impl ProvisionStep ===

impl ProvisionStep {
    pub const ORDERED: [Self; 6] = [
        Self::Namespace,
        Self::ResourceQuota,
        Self::LimitRange,
        Self::RoleBinding,
        Self::NetworkPolicy,
        Self::IstioInjection,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Namespace => "namespace",
            Self::ResourceQuota => "resource-quota",
            Self::LimitRange => "limit-range",
            Self::RoleBinding => "role-binding",
            Self::NetworkPolicy => "network-policy",
            Self::IstioInjection => "istio-injection",
        }
    }
}

// === impl CreatedResources ===

impl CreatedResources {
    fn record(&mut self, step: ProvisionStep) {
        match step {
            ProvisionStep::Namespace => self.namespace = true,
            ProvisionStep::ResourceQuota => self.resource_quota = true,
            ProvisionStep::LimitRange => self.limit_range = true,
            ProvisionStep::RoleBinding => self.rbac = true,
            ProvisionStep::NetworkPolicy => self.network_policy = true,
            ProvisionStep::IstioInjection => self.istio_injection = true,
        }
    }
}

// === impl ProvisioningResult ===

impl ProvisioningResult {
    /// A freshly accepted request, before any strategy has run.
    pub fn pending(request_id: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self {
            request_id: request_id.into(),
            status: ProvisioningStatus::Pending,
            namespace_name: namespace.into(),
            workflow_id: None,
            message: "request accepted".to_string(),
            created_resources: CreatedResources::default(),
            steps: Vec::new(),
        }
    }

    /// Appends a step outcome, keeping the created-resources flags in sync.
    pub fn record_step(&mut self, step: ProvisionStep, outcome: StepStatus, detail: Option<String>) {
        if outcome == StepStatus::Applied {
            self.created_resources.record(step);
        }
        self.steps.push(StepOutcome {
            step,
            outcome,
            detail,
        });
    }

    /// Marks every still-pending step as applied. Used when the workflow
    /// engine reports the run succeeded as a whole.
    pub fn complete_pending_steps(&mut self) {
        for entry in &mut self.steps {
            if entry.outcome == StepStatus::Pending {
                entry.outcome = StepStatus::Applied;
                self.created_resources.record(entry.step);
            }
        }
    }
}
