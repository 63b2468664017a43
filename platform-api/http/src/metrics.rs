use hyper::http;
use prometheus_client::{
    encoding::EncodeLabelSet,
    metrics::{counter::Counter, family::Family},
    registry::Registry,
};

/// Counters for the API's HTTP traffic and provisioning outcomes.
#[derive(Clone, Debug)]
pub struct ApiMetrics {
    requests: Family<RequestLabels, Counter>,
    provisions: Family<ProvisionLabels, Counter>,
}

#[derive(Clone, Hash, PartialEq, Eq, EncodeLabelSet, Debug)]
struct RequestLabels {
    route: &'static str,
    status: &'static str,
}

#[derive(Clone, Hash, PartialEq, Eq, EncodeLabelSet, Debug)]
struct ProvisionLabels {
    strategy: &'static str,
    outcome: &'static str,
}

// === impl ApiMetrics ===

impl ApiMetrics {
    pub fn register(reg: &mut Registry) -> Self {
        let requests = Family::<RequestLabels, Counter>::default();
        reg.register(
            "http_requests",
            "Requests handled by the provisioning API",
            requests.clone(),
        );

        let provisions = Family::<ProvisionLabels, Counter>::default();
        reg.register(
            "provision_requests",
            "Provisioning requests by strategy and outcome",
            provisions.clone(),
        );

        Self {
            requests,
            provisions,
        }
    }

    pub(crate) fn observe_request(&self, route: &'static str, status: http::StatusCode) {
        self.requests
            .get_or_create(&RequestLabels {
                route,
                status: status_str(status),
            })
            .inc();
    }

    pub(crate) fn observe_provision(&self, strategy: &'static str, outcome: &'static str) {
        self.provisions
            .get_or_create(&ProvisionLabels { strategy, outcome })
            .inc();
    }
}

fn status_str(status: http::StatusCode) -> &'static str {
    match status.as_u16() {
        200 => "200",
        201 => "201",
        400 => "400",
        404 => "404",
        405 => "405",
        409 => "409",
        502 => "502",
        _ if status.is_success() => "2xx",
        _ if status.is_client_error() => "4xx",
        _ if status.is_server_error() => "5xx",
        _ => "other",
    }
}
