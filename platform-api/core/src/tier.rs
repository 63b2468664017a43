//! The resource tier catalog.
//!
//! Tiers are compiled in. Changing a tier's numbers only affects
//! namespaces provisioned after the change; existing ResourceQuota and
//! LimitRange objects are not reconciled.

/// A named bundle of quota numbers applied to a provisioned namespace.
///
/// The string fields hold Kubernetes quantity expressions and are passed
/// through to the cluster verbatim.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResourceTierConfig {
    pub name: &'static str,
    pub cpu_limit: &'static str,
    pub memory_limit: &'static str,
    pub storage_quota: &'static str,
    pub max_pods: u32,
    pub max_services: u32,
}

/// All tiers offered by the platform, in ascending size order.
pub const TIERS: &[ResourceTierConfig] = &[
    ResourceTierConfig {
        name: "small",
        cpu_limit: "2",
        memory_limit: "4Gi",
        storage_quota: "10Gi",
        max_pods: 10,
        max_services: 5,
    },
    ResourceTierConfig {
        name: "medium",
        cpu_limit: "4",
        memory_limit: "8Gi",
        storage_quota: "50Gi",
        max_pods: 25,
        max_services: 10,
    },
    ResourceTierConfig {
        name: "large",
        cpu_limit: "8",
        memory_limit: "16Gi",
        storage_quota: "100Gi",
        max_pods: 50,
        max_services: 20,
    },
    ResourceTierConfig {
        name: "xlarge",
        cpu_limit: "16",
        memory_limit: "32Gi",
        storage_quota: "500Gi",
        max_pods: 100,
        max_services: 40,
    },
];

// === impl ResourceTierConfig ===

impl ResourceTierConfig {
    /// Resolves a tier by name against the catalog.
    pub fn lookup(name: &str) -> Option<&'static Self> {
        TIERS.iter().find(|t| t.name == name)
    }

    /// Names of all known tiers, for error messages.
    pub fn names() -> impl Iterator<Item = &'static str> {
        TIERS.iter().map(|t| t.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_resolves_every_catalog_entry() {
        for tier in TIERS {
            let found = ResourceTierConfig::lookup(tier.name);
            assert_eq!(found, Some(tier));
        }
    }

    #[test]
    fn lookup_rejects_unknown_names() {
        assert_eq!(ResourceTierConfig::lookup("xxl"), None);
        assert_eq!(ResourceTierConfig::lookup(""), None);
        assert_eq!(ResourceTierConfig::lookup("Small"), None);
    }

    #[test]
    fn tiers_grow_monotonically() {
        for pair in TIERS.windows(2) {
            assert!(pair[0].max_pods < pair[1].max_pods);
            assert!(pair[0].max_services < pair[1].max_services);
        }
    }
}
