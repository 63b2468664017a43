use crate::metrics::ApiMetrics;
use futures::future;
use http_body_util::BodyExt;
use hyper::{http, Request, Response};
use platform_api_core::{
    Environment, Error as ProvisionError, FieldError, ListFilter, Orchestrator,
    ProvisioningRequest,
};
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, trace, warn};

pub const SUBMIT_PATH: &str = "/api/platform/namespaces/request";
pub const LIST_PATH: &str = "/api/platform/namespaces";
pub const HEALTH_PATH: &str = "/health";

const STATUS_PREFIX: &str = "/api/platform/namespaces/request/";
const STATUS_SUFFIX: &str = "/status";

type Body = http_body_util::Full<bytes::Bytes>;

/// The provisioning API as a `tower::Service`, one clone per connection.
#[derive(Clone)]
pub struct PlatformApi {
    orchestrator: Arc<Orchestrator>,
    metrics: ApiMetrics,
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("failed to read request body: {0}")]
    Request(Box<dyn std::error::Error + Send + Sync>),

    #[error("failed to encode json response: {0}")]
    Json(#[from] serde_json::Error),
}

/// Wire shape of every error response.
#[derive(Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
    message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<&'a [FieldError]>,
}

// === impl PlatformApi ===

impl tower::Service<Request<hyper::body::Incoming>> for PlatformApi {
    type Response = Response<Body>;
    type Error = Error;
    type Future = future::BoxFuture<'static, Result<Response<Body>, Error>>;

    fn poll_ready(
        &mut self,
        _cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<std::result::Result<(), Self::Error>> {
        std::task::Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: Request<hyper::body::Incoming>) -> Self::Future {
        trace!(?req);
        let api = self.clone();
        Box::pin(api.handle(req))
    }
}

impl PlatformApi {
    pub fn new(orchestrator: Arc<Orchestrator>, metrics: ApiMetrics) -> Self {
        Self {
            orchestrator,
            metrics,
        }
    }

    async fn handle<B>(self, req: Request<B>) -> Result<Response<Body>, Error>
    where
        B: hyper::body::Body,
        B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        let method = req.method().clone();
        let path = req.uri().path().to_string();
        let query = req.uri().query().map(|q| q.to_string());

        let (route, rsp) = if path == HEALTH_PATH {
            ("health", self.health(&method)?)
        } else if path == SUBMIT_PATH {
            ("submit", self.submit(&method, req).await?)
        } else if path == LIST_PATH {
            ("list", self.list(&method, query.as_deref()).await?)
        } else if let Some(request_id) = status_request_id(&path) {
            ("status", self.status(&method, request_id).await?)
        } else {
            let rsp = error_body(
                http::StatusCode::NOT_FOUND,
                "NotFound",
                &format!("no route for {path}"),
            )?;
            ("unknown", rsp)
        };

        debug!(route, status = rsp.status().as_u16(), "Handled request");
        self.metrics.observe_request(route, rsp.status());
        Ok(rsp)
    }

    fn health(&self, method: &http::Method) -> Result<Response<Body>, Error> {
        if method != http::Method::GET && method != http::Method::HEAD {
            return method_not_allowed();
        }
        json_response(http::StatusCode::OK, &serde_json::json!({ "status": "ok" }))
    }

    async fn submit<B>(
        &self,
        method: &http::Method,
        req: Request<B>,
    ) -> Result<Response<Body>, Error>
    where
        B: hyper::body::Body,
        B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        if method != http::Method::POST {
            return method_not_allowed();
        }

        let bytes = req
            .into_body()
            .collect()
            .await
            .map_err(|e| Error::Request(e.into()))?
            .to_bytes();
        let request: ProvisioningRequest = match serde_json::from_slice(&bytes) {
            Ok(request) => request,
            Err(error) => {
                warn!(%error, "Failed to parse request body");
                return error_body(
                    http::StatusCode::BAD_REQUEST,
                    "ValidationError",
                    &format!("invalid request body: {error}"),
                );
            }
        };

        let strategy = if request.use_workflow_engine {
            "workflow"
        } else {
            "direct"
        };
        match self.orchestrator.submit(&request).await {
            Ok(result) => {
                self.metrics.observe_provision(strategy, result.status.as_str());
                json_response(http::StatusCode::CREATED, &result)
            }
            Err(error) => {
                self.metrics.observe_provision(strategy, error.kind());
                refusal(error)
            }
        }
    }

    async fn status(
        &self,
        method: &http::Method,
        request_id: &str,
    ) -> Result<Response<Body>, Error> {
        if method != http::Method::GET {
            return method_not_allowed();
        }
        match self.orchestrator.get_status(request_id).await {
            Ok(result) => json_response(http::StatusCode::OK, &result),
            Err(error) => refusal(error),
        }
    }

    async fn list(
        &self,
        method: &http::Method,
        query: Option<&str>,
    ) -> Result<Response<Body>, Error> {
        if method != http::Method::GET {
            return method_not_allowed();
        }
        let filter = match parse_filter(query) {
            Ok(filter) => filter,
            Err(message) => {
                return error_body(http::StatusCode::BAD_REQUEST, "ValidationError", &message)
            }
        };
        match self.orchestrator.list_managed(&filter).await {
            Ok(namespaces) => json_response(http::StatusCode::OK, &namespaces),
            Err(error) => refusal(error),
        }
    }
}

/// Extracts the request id from `/api/platform/namespaces/request/{id}/status`.
fn status_request_id(path: &str) -> Option<&str> {
    path.strip_prefix(STATUS_PREFIX)?
        .strip_suffix(STATUS_SUFFIX)
        .filter(|id| !id.is_empty() && !id.contains('/'))
}

/// Query parameters recognized by the listing route; anything else is
/// ignored.
fn parse_filter(query: Option<&str>) -> Result<ListFilter, String> {
    let mut filter = ListFilter::default();
    let Some(query) = query else {
        return Ok(filter);
    };
    for pair in query.split('&').filter(|p| !p.is_empty()) {
        let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
        match key {
            "team" if !value.is_empty() => filter.team = Some(value.to_string()),
            "environment" => {
                let environment = value.parse::<Environment>().map_err(|_| {
                    format!("environment must be one of development, staging, production, not {value:?}")
                })?;
                filter.environment = Some(environment);
            }
            _ => {}
        }
    }
    Ok(filter)
}

/// Maps a provisioning error onto its documented status code and body.
fn refusal(error: ProvisionError) -> Result<Response<Body>, Error> {
    let message = error.to_string();
    match &error {
        ProvisionError::Validation(details) => {
            debug!(violations = details.len(), "Invalid provisioning request");
            json_response(
                http::StatusCode::BAD_REQUEST,
                &ErrorBody {
                    error: error.kind(),
                    message: &message,
                    details: Some(details),
                },
            )
        }
        ProvisionError::AlreadyExists(_) => {
            error_body(http::StatusCode::CONFLICT, error.kind(), &message)
        }
        ProvisionError::NotFound(_) => {
            error_body(http::StatusCode::NOT_FOUND, error.kind(), &message)
        }
        ProvisionError::Infrastructure { .. } => {
            // The upstream detail goes to the log, not the caller.
            warn!(error = %message, "Upstream failure");
            error_body(
                http::StatusCode::BAD_GATEWAY,
                error.kind(),
                "provisioning failed",
            )
        }
    }
}

fn method_not_allowed() -> Result<Response<Body>, Error> {
    error_body(
        http::StatusCode::METHOD_NOT_ALLOWED,
        "MethodNotAllowed",
        "method not allowed for this route",
    )
}

fn error_body(
    status: http::StatusCode,
    kind: &str,
    message: &str,
) -> Result<Response<Body>, Error> {
    json_response(
        status,
        &ErrorBody {
            error: kind,
            message,
            details: None,
        },
    )
}

fn json_response<T: Serialize>(
    status: http::StatusCode,
    value: &T,
) -> Result<Response<Body>, Error> {
    let bytes = serde_json::to_vec(value)?;
    Ok(Response::builder()
        .status(status)
        .header(http::header::CONTENT_TYPE, "application/json")
        .body(Body::from(bytes))
        .expect("json response must be valid"))
}
