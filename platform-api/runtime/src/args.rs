use anyhow::{bail, Result};
use clap::Parser;
use platform_api_core::{
    InMemoryStore, Orchestrator, OrchestratorConfig, RollbackPolicy, DEFAULT_WORKFLOW_TEMPLATE,
};
use platform_api_http::{ApiMetrics, PlatformApi};
use platform_api_k8s::ProvisionerClient;
use platform_api_workflow::ArgoWorkflows;
use prometheus_client::registry::Registry;
use std::{net::SocketAddr, sync::Arc, time::Duration};
use tracing::{error, instrument};

#[derive(Debug, Parser)]
#[clap(name = "platform-api", about = "Namespace provisioning API")]
pub struct Args {
    #[clap(long, default_value = "platform=info,warn", env = "PLATFORM_API_LOG")]
    log_level: kubert::LogFilter,

    #[clap(long, default_value = "plain")]
    log_format: kubert::LogFormat,

    #[clap(flatten)]
    client: kubert::ClientArgs,

    #[clap(flatten)]
    admin: kubert::AdminArgs,

    #[clap(long, default_value = "0.0.0.0:8080")]
    api_addr: SocketAddr,

    /// Namespace the Argo workflow engine runs in.
    #[clap(long, default_value = "argo")]
    workflow_namespace: String,

    /// WorkflowTemplate that workflow-strategy requests are rendered
    /// against.
    #[clap(long, default_value = DEFAULT_WORKFLOW_TEMPLATE)]
    workflow_template: String,

    #[clap(long, default_value = "5000")]
    cluster_timeout_ms: u64,

    #[clap(long, default_value = "30000")]
    workflow_timeout_ms: u64,

    /// How long finished provisioning records stay queryable.
    #[clap(long, default_value = "86400")]
    request_ttl_secs: u64,

    /// Delete the namespace when a direct provisioning step fails,
    /// instead of keeping the partial namespace for inspection.
    #[clap(long)]
    rollback_on_failure: bool,
}

impl Args {
    #[inline]
    pub async fn parse_and_run() -> Result<()> {
        Self::parse().run().await
    }

    pub async fn run(self) -> Result<()> {
        let Self {
            log_level,
            log_format,
            client,
            admin,
            api_addr,
            workflow_namespace,
            workflow_template,
            cluster_timeout_ms,
            workflow_timeout_ms,
            request_ttl_secs,
            rollback_on_failure,
        } = self;

        let mut prom = <Registry>::default();
        let api_metrics = ApiMetrics::register(prom.sub_registry_with_prefix("platform"));
        let rt_metrics = kubert::RuntimeMetrics::register(prom.sub_registry_with_prefix("kube"));

        let runtime = kubert::Runtime::builder()
            .with_log(log_level, log_format)
            .with_metrics(rt_metrics)
            .with_admin(admin.into_builder().with_prometheus(prom))
            .with_client(client)
            .build()
            .await?;

        let cluster = Arc::new(ProvisionerClient::new(
            runtime.client(),
            Duration::from_millis(cluster_timeout_ms),
        ));
        let engine = Arc::new(ArgoWorkflows::new(
            runtime.client(),
            workflow_namespace,
            Duration::from_millis(workflow_timeout_ms),
        ));
        let store = Arc::new(InMemoryStore::new(Duration::from_secs(request_ttl_secs)));

        let rollback = if rollback_on_failure {
            RollbackPolicy::DeleteNamespace
        } else {
            RollbackPolicy::Keep
        };
        let orchestrator = Arc::new(Orchestrator::new(
            cluster,
            engine,
            store,
            OrchestratorConfig {
                rollback,
                workflow_template,
            },
        ));

        let api = PlatformApi::new(orchestrator, api_metrics);
        tokio::spawn(serve_api(api_addr, api, runtime.shutdown_handle()));

        // Block the main thread on the shutdown signal. Once it fires, wait
        // for in-flight work to complete before exiting.
        if runtime.run().await.is_err() {
            bail!("Aborted");
        }

        Ok(())
    }
}

#[instrument(skip_all, fields(port = %addr.port()))]
async fn serve_api(addr: SocketAddr, api: PlatformApi, drain: drain::Watch) {
    if let Err(error) = platform_api_http::serve(addr, api, drain).await {
        error!(%error, "API server failed");
    }
}
