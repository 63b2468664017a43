use crate::{
    error::FieldError,
    request::{Environment, NetworkPolicyKind, ProvisioningRequest, ValidatedRequest, KNOWN_FEATURES},
    tier::ResourceTierConfig,
};
use regex::Regex;
use std::collections::BTreeSet;

/// RFC 1123 label: lowercase alphanumeric, dashes allowed between
/// characters.
const NAME_PATTERN: &str = "^[a-z0-9]([a-z0-9-]*[a-z0-9])?$";

/// Kubernetes object name limit.
const MAX_NAMESPACE_LEN: usize = 63;

/// Team names become the `{team}-developers` RoleBinding and group name,
/// which must itself fit in an object name.
const MAX_TEAM_LEN: usize = MAX_NAMESPACE_LEN - "-developers".len();

/// Checks a provisioning request field by field.
///
/// Reports every violation at once rather than stopping at the first, so
/// a caller can fix a request in one round trip. On success the enum
/// fields are parsed and the tier is resolved against the catalog.
pub fn validate(req: &ProvisioningRequest) -> Result<ValidatedRequest, Vec<FieldError>> {
    let mut errors = Vec::new();

    check_name("namespaceName", &req.namespace_name, MAX_NAMESPACE_LEN, &mut errors);
    check_name("team", &req.team, MAX_TEAM_LEN, &mut errors);

    let environment = match req.environment.parse::<Environment>() {
        Ok(env) => Some(env),
        Err(_) => {
            errors.push(FieldError::new(
                "environment",
                format!("must be one of {}", join(Environment::ALL.iter().map(|e| e.as_str()))),
            ));
            None
        }
    };

    let tier = match ResourceTierConfig::lookup(&req.resource_tier) {
        Some(tier) => Some(tier),
        None => {
            errors.push(FieldError::new(
                "resourceTier",
                format!(
                    "unknown tier {:?}; expected one of {}",
                    req.resource_tier,
                    join(ResourceTierConfig::names()),
                ),
            ));
            None
        }
    };

    let network_policy = match req.network_policy.parse::<NetworkPolicyKind>() {
        Ok(kind) => Some(kind),
        Err(_) => {
            errors.push(FieldError::new(
                "networkPolicy",
                format!("must be one of {}", join(NetworkPolicyKind::ALL.iter().map(|p| p.as_str()))),
            ));
            None
        }
    };

    if req.requested_by.trim().is_empty() {
        errors.push(FieldError::new("requestedBy", "must not be empty"));
    }

    let features: BTreeSet<String> = req.features.iter().cloned().collect();
    for feature in &features {
        if !KNOWN_FEATURES.contains(&feature.as_str()) {
            tracing::debug!(%feature, "Unrecognized feature flag; recorded but has no effect");
        }
    }

    match (environment, tier, network_policy) {
        (Some(environment), Some(tier), Some(network_policy)) if errors.is_empty() => {
            Ok(ValidatedRequest {
                namespace: req.namespace_name.clone(),
                team: req.team.clone(),
                environment,
                tier,
                network_policy,
                features,
                description: req.description.clone(),
                requested_by: req.requested_by.clone(),
                use_workflow_engine: req.use_workflow_engine,
            })
        }
        _ => Err(errors),
    }
}

fn check_name(field: &'static str, value: &str, max_len: usize, errors: &mut Vec<FieldError>) {
    if value.is_empty() {
        errors.push(FieldError::new(field, "must not be empty"));
        return;
    }
    if value.len() > max_len {
        errors.push(FieldError::new(field, format!("must be at most {max_len} characters")));
    }
    if !Regex::new(NAME_PATTERN)
        .expect("name pattern must compile")
        .is_match(value)
    {
        errors.push(FieldError::new(
            field,
            "must be lowercase alphanumeric, with dashes allowed between characters",
        ));
    }
}

fn join(values: impl Iterator<Item = &'static str>) -> String {
    values.collect::<Vec<_>>().join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_request() -> ProvisioningRequest {
        ProvisioningRequest {
            namespace_name: "team-alpha-dev".to_string(),
            team: "team-alpha".to_string(),
            environment: "development".to_string(),
            resource_tier: "small".to_string(),
            network_policy: "isolated".to_string(),
            features: vec![],
            description: None,
            requested_by: "alice".to_string(),
            use_workflow_engine: false,
        }
    }

    fn errors_for(req: &ProvisioningRequest) -> Vec<FieldError> {
        validate(req).expect_err("request should fail validation")
    }

    fn fields(errors: &[FieldError]) -> Vec<&'static str> {
        errors.iter().map(|e| e.field).collect()
    }

    #[test]
    fn accepts_a_well_formed_request() {
        let validated = validate(&valid_request()).expect("should validate");
        assert_eq!(validated.namespace, "team-alpha-dev");
        assert_eq!(validated.environment, Environment::Development);
        assert_eq!(validated.tier.name, "small");
        assert_eq!(validated.network_policy, NetworkPolicyKind::Isolated);
        assert!(!validated.use_workflow_engine);
    }

    #[test]
    fn rejects_names_outside_the_label_grammar() {
        for bad in ["Team-Alpha", "-leading", "trailing-", "under_score", "dot.name", "sp ace"] {
            let req = ProvisioningRequest {
                namespace_name: bad.to_string(),
                ..valid_request()
            };
            assert_eq!(fields(&errors_for(&req)), vec!["namespaceName"], "{bad:?}");
        }
    }

    #[test]
    fn rejects_an_overlong_namespace_name() {
        let req = ProvisioningRequest {
            namespace_name: "a".repeat(64),
            ..valid_request()
        };
        assert_eq!(fields(&errors_for(&req)), vec!["namespaceName"]);

        let req = ProvisioningRequest {
            namespace_name: "a".repeat(63),
            ..valid_request()
        };
        assert!(validate(&req).is_ok());
    }

    #[test]
    fn bounds_team_so_the_role_binding_name_fits() {
        let req = ProvisioningRequest {
            team: "t".repeat(52),
            ..valid_request()
        };
        let validated = validate(&req).expect("52 characters should fit");
        assert_eq!(format!("{}-developers", validated.team).len(), 63);

        let req = ProvisioningRequest {
            team: "t".repeat(53),
            ..valid_request()
        };
        assert_eq!(fields(&errors_for(&req)), vec!["team"]);
    }

    #[test]
    fn rejects_unknown_enum_values() {
        let req = ProvisioningRequest {
            environment: "prod".to_string(),
            resource_tier: "huge".to_string(),
            network_policy: "closed".to_string(),
            ..valid_request()
        };
        let errors = errors_for(&req);
        assert_eq!(fields(&errors), vec!["environment", "resourceTier", "networkPolicy"]);
        assert!(errors[1].message.contains("small, medium, large, xlarge"));
    }

    #[test]
    fn reports_every_missing_field_at_once() {
        let errors = errors_for(&ProvisioningRequest::default());
        assert_eq!(
            fields(&errors),
            vec![
                "namespaceName",
                "team",
                "environment",
                "resourceTier",
                "networkPolicy",
                "requestedBy",
            ],
        );
    }

    #[test]
    fn rejects_blank_requested_by() {
        let req = ProvisioningRequest {
            requested_by: "   ".to_string(),
            ..valid_request()
        };
        assert_eq!(fields(&errors_for(&req)), vec!["requestedBy"]);
    }

    #[test]
    fn keeps_unrecognized_features() {
        let req = ProvisioningRequest {
            features: vec![
                "istio-injection".to_string(),
                "chaos-monkey".to_string(),
                "istio-injection".to_string(),
            ],
            ..valid_request()
        };
        let validated = validate(&req).expect("should validate");
        assert_eq!(validated.features.len(), 2);
        assert!(validated.istio_injection());
        assert!(validated.features.contains("chaos-monkey"));
    }

    #[test]
    fn wire_format_is_camel_case_with_defaults() {
        let req: ProvisioningRequest = serde_json::from_str(
            r#"{
                "namespaceName": "team-alpha-dev",
                "team": "team-alpha",
                "environment": "development",
                "resourceTier": "small",
                "networkPolicy": "open",
                "requestedBy": "alice"
            }"#,
        )
        .expect("should deserialize");
        let validated = validate(&req).expect("should validate");
        assert!(validated.features.is_empty());
        assert!(validated.description.is_none());
        assert!(!validated.use_workflow_engine);
        assert!(!validated.wants_network_policy());
    }
}
