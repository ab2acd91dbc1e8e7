//! The secret catalog: which categories and fields each service carries.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::model::Service;

/// What to do when no prompt or ambient value supplies a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum FieldPolicy {
    /// Generate a random value.
    #[default]
    GenerateIfAbsent,
    /// Fail the sync; some values cannot be invented (third-party keys).
    Required,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldSpec {
    pub name: String,
    #[serde(default)]
    pub policy: FieldPolicy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategorySpec {
    pub name: String,
    pub fields: Vec<FieldSpec>,
}

/// Per-service secret layout. The built-in catalog covers the stock
/// services; config may replace it entirely.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SecretCatalog {
    services: BTreeMap<Service, Vec<CategorySpec>>,
}

impl SecretCatalog {
    pub fn from_specs(specs: Vec<(Service, Vec<CategorySpec>)>) -> Self {
        SecretCatalog {
            services: specs.into_iter().collect(),
        }
    }

    pub fn categories(&self, service: Service) -> &[CategorySpec] {
        self.services.get(&service).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn is_empty(&self) -> bool {
        self.services.values().all(Vec::is_empty)
    }

    /// Stock layout for the four services.
    pub fn builtin() -> Self {
        fn generated(name: &str) -> FieldSpec {
            FieldSpec {
                name: name.to_string(),
                policy: FieldPolicy::GenerateIfAbsent,
            }
        }
        fn category(name: &str, fields: Vec<FieldSpec>) -> CategorySpec {
            CategorySpec {
                name: name.to_string(),
                fields,
            }
        }

        SecretCatalog::from_specs(vec![
            (
                Service::Frontend,
                vec![category("session", vec![generated("cookie-key")])],
            ),
            (
                Service::Catalogue,
                vec![category(
                    "database",
                    vec![generated("username"), generated("password")],
                )],
            ),
            (
                Service::Voting,
                vec![category(
                    "database",
                    vec![generated("username"), generated("password")],
                )],
            ),
            (
                Service::Recommendation,
                vec![category("api", vec![generated("api-key")])],
            ),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_covers_every_service() {
        let catalog = SecretCatalog::builtin();
        for service in crate::model::SERVICES {
            assert!(
                !catalog.categories(service).is_empty(),
                "no categories for {service}"
            );
        }
    }

    #[test]
    fn unknown_lookup_is_empty_not_panic() {
        let catalog = SecretCatalog::from_specs(vec![]);
        assert!(catalog.categories(Service::Voting).is_empty());
        assert!(catalog.is_empty());
    }
}
