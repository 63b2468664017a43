use crate::{error::Error, request::ValidatedRequest, result::ProvisioningResult};

/// Per-request values fixed by the orchestrator before a strategy runs,
/// so both strategies and the recorded result agree on them.
#[derive(Clone, Debug)]
pub struct ProvisionContext {
    pub request_id: String,
    /// RFC 3339 submission timestamp, recorded on the namespace.
    pub requested_at: String,
}

/// How a validated request gets turned into cluster state.
///
/// A strategy reports step failures inside the returned result rather
/// than as an `Err`; the error channel is reserved for conditions the
/// orchestrator maps to a request-level refusal, such as a namespace
/// name conflict detected at creation time.
#[async_trait::async_trait]
pub trait ProvisioningStrategy: Send + Sync {
    async fn provision(
        &self,
        req: &ValidatedRequest,
        ctx: &ProvisionContext,
    ) -> Result<ProvisioningResult, Error>;
}
