//! Builders for the objects a provisioning run writes to the cluster.
//!
//! These are pure: given the same validated request they always produce
//! the same objects, which is what makes direct and workflow runs
//! converge on identical cluster state.

use crate::convention::{
    team_developers, DESCRIPTION_ANNOTATION, ENVIRONMENT_LABEL, FEATURES_ANNOTATION,
    ISOLATED_POLICY_NAME, LIMIT_RANGE_NAME, MANAGED_LABEL, NETWORK_POLICY_LABEL,
    PROVISIONED_BY_LABEL, REQUESTED_AT_ANNOTATION, REQUESTED_BY_ANNOTATION, RESOURCE_QUOTA_NAME,
    RESOURCE_TIER_LABEL, TEAM_LABEL, TEAM_SHARED_POLICY_NAME,
};
use k8s_openapi::{
    api::{
        core::v1::{
            LimitRange, LimitRangeItem, LimitRangeSpec, Namespace, ResourceQuota,
            ResourceQuotaSpec,
        },
        networking::v1::{
            NetworkPolicy, NetworkPolicyEgressRule, NetworkPolicyIngressRule, NetworkPolicyPeer,
            NetworkPolicyPort, NetworkPolicySpec,
        },
        rbac::v1::{RoleBinding, RoleRef, Subject},
    },
    apimachinery::pkg::{
        api::resource::Quantity, apis::meta::v1::LabelSelector, util::intstr::IntOrString,
    },
};
use kube::api::ObjectMeta;
use maplit::{btreemap, convert_args};
use platform_api_core::{NetworkPolicyKind, ValidatedRequest, PROVISIONER_NAME};
use std::collections::BTreeMap;

pub fn namespace(req: &ValidatedRequest, requested_at: &str) -> Namespace {
    Namespace {
        metadata: ObjectMeta {
            name: Some(req.namespace.clone()),
            labels: Some(namespace_labels(req)),
            annotations: Some(namespace_annotations(req, requested_at)),
            ..Default::default()
        },
        ..Default::default()
    }
}

pub fn namespace_labels(req: &ValidatedRequest) -> BTreeMap<String, String> {
    convert_args!(btreemap!(
        MANAGED_LABEL => "true",
        TEAM_LABEL => req.team.as_str(),
        ENVIRONMENT_LABEL => req.environment.as_str(),
        RESOURCE_TIER_LABEL => req.tier.name,
        NETWORK_POLICY_LABEL => req.network_policy.as_str(),
        PROVISIONED_BY_LABEL => PROVISIONER_NAME,
    ))
}

pub fn namespace_annotations(
    req: &ValidatedRequest,
    requested_at: &str,
) -> BTreeMap<String, String> {
    // The annotation set is closed: every key is present on every managed
    // namespace, with "" standing in for a missing description.
    convert_args!(btreemap!(
        REQUESTED_BY_ANNOTATION => req.requested_by.as_str(),
        REQUESTED_AT_ANNOTATION => requested_at,
        DESCRIPTION_ANNOTATION => req.description.clone().unwrap_or_default(),
        FEATURES_ANNOTATION => feature_list(req),
    ))
}

fn feature_list(req: &ValidatedRequest) -> String {
    serde_json::to_string(&req.features).unwrap_or_else(|_| "[]".to_string())
}

pub fn resource_quota(req: &ValidatedRequest) -> ResourceQuota {
    let tier = req.tier;
    ResourceQuota {
        metadata: child_meta(req, RESOURCE_QUOTA_NAME),
        spec: Some(ResourceQuotaSpec {
            hard: Some(btreemap!(
                "limits.cpu".to_string() => quantity(tier.cpu_limit),
                "limits.memory".to_string() => quantity(tier.memory_limit),
                "requests.storage".to_string() => quantity(tier.storage_quota),
                "pods".to_string() => quantity(tier.max_pods),
                "services".to_string() => quantity(tier.max_services),
                "secrets".to_string() => quantity(10),
                "configmaps".to_string() => quantity(10),
            )),
            ..Default::default()
        }),
        ..Default::default()
    }
}

pub fn limit_range(req: &ValidatedRequest) -> LimitRange {
    let tier = req.tier;
    LimitRange {
        metadata: child_meta(req, LIMIT_RANGE_NAME),
        spec: Some(LimitRangeSpec {
            limits: vec![
                LimitRangeItem {
                    type_: "Container".to_string(),
                    default: Some(btreemap!(
                        "cpu".to_string() => quantity("500m"),
                        "memory".to_string() => quantity("512Mi"),
                    )),
                    default_request: Some(btreemap!(
                        "cpu".to_string() => quantity("100m"),
                        "memory".to_string() => quantity("128Mi"),
                    )),
                    max: Some(btreemap!(
                        "cpu".to_string() => quantity(tier.cpu_limit),
                        "memory".to_string() => quantity(tier.memory_limit),
                    )),
                    ..Default::default()
                },
                LimitRangeItem {
                    type_: "PersistentVolumeClaim".to_string(),
                    max: Some(btreemap!(
                        "storage".to_string() => quantity(tier.storage_quota),
                    )),
                    ..Default::default()
                },
            ],
        }),
        ..Default::default()
    }
}

pub fn team_role_binding(req: &ValidatedRequest) -> RoleBinding {
    RoleBinding {
        metadata: ObjectMeta {
            name: Some(team_developers(&req.team)),
            namespace: Some(req.namespace.clone()),
            labels: Some(child_labels(req)),
            ..Default::default()
        },
        role_ref: RoleRef {
            api_group: "rbac.authorization.k8s.io".to_string(),
            kind: "ClusterRole".to_string(),
            name: "edit".to_string(),
        },
        subjects: Some(vec![Subject {
            api_group: Some("rbac.authorization.k8s.io".to_string()),
            kind: "Group".to_string(),
            name: team_developers(&req.team),
            ..Default::default()
        }]),
    }
}

/// The NetworkPolicy for the request's isolation level, or `None` when
/// the namespace is open.
pub fn network_policy(req: &ValidatedRequest) -> Option<NetworkPolicy> {
    match req.network_policy {
        NetworkPolicyKind::Open => None,
        NetworkPolicyKind::Isolated => Some(isolated_policy(req)),
        NetworkPolicyKind::TeamShared => Some(team_shared_policy(req)),
    }
}

/// All traffic confined to the namespace itself. DNS egress stays open
/// so pods can still resolve cluster services.
fn isolated_policy(req: &ValidatedRequest) -> NetworkPolicy {
    let same_namespace = NetworkPolicyPeer {
        pod_selector: Some(LabelSelector::default()),
        ..Default::default()
    };
    NetworkPolicy {
        metadata: child_meta(req, ISOLATED_POLICY_NAME),
        spec: Some(NetworkPolicySpec {
            pod_selector: LabelSelector::default(),
            policy_types: Some(vec!["Ingress".to_string(), "Egress".to_string()]),
            ingress: Some(vec![NetworkPolicyIngressRule {
                from: Some(vec![same_namespace.clone()]),
                ..Default::default()
            }]),
            egress: Some(vec![
                NetworkPolicyEgressRule {
                    to: Some(vec![same_namespace]),
                    ..Default::default()
                },
                dns_egress(),
            ]),
        }),
        ..Default::default()
    }
}

/// Traffic allowed to and from every namespace carrying the same team
/// label, plus DNS egress.
fn team_shared_policy(req: &ValidatedRequest) -> NetworkPolicy {
    let team_namespaces = NetworkPolicyPeer {
        namespace_selector: Some(LabelSelector {
            match_labels: Some(convert_args!(btreemap!(
                TEAM_LABEL => req.team.as_str(),
            ))),
            ..Default::default()
        }),
        ..Default::default()
    };
    NetworkPolicy {
        metadata: child_meta(req, TEAM_SHARED_POLICY_NAME),
        spec: Some(NetworkPolicySpec {
            pod_selector: LabelSelector::default(),
            policy_types: Some(vec!["Ingress".to_string(), "Egress".to_string()]),
            ingress: Some(vec![NetworkPolicyIngressRule {
                from: Some(vec![team_namespaces.clone()]),
                ..Default::default()
            }]),
            egress: Some(vec![
                NetworkPolicyEgressRule {
                    to: Some(vec![team_namespaces]),
                    ..Default::default()
                },
                dns_egress(),
            ]),
        }),
        ..Default::default()
    }
}

fn dns_egress() -> NetworkPolicyEgressRule {
    NetworkPolicyEgressRule {
        ports: Some(vec![
            NetworkPolicyPort {
                protocol: Some("UDP".to_string()),
                port: Some(IntOrString::Int(53)),
                ..Default::default()
            },
            NetworkPolicyPort {
                protocol: Some("TCP".to_string()),
                port: Some(IntOrString::Int(53)),
                ..Default::default()
            },
        ]),
        ..Default::default()
    }
}

fn child_meta(req: &ValidatedRequest, name: &str) -> ObjectMeta {
    ObjectMeta {
        name: Some(name.to_string()),
        namespace: Some(req.namespace.clone()),
        labels: Some(child_labels(req)),
        ..Default::default()
    }
}

fn child_labels(req: &ValidatedRequest) -> BTreeMap<String, String> {
    convert_args!(btreemap!(
        MANAGED_LABEL => "true",
        TEAM_LABEL => req.team.as_str(),
    ))
}

fn quantity(value: impl ToString) -> Quantity {
    Quantity(value.to_string())
}
