//! Tree layout of the desired-state store.
//!
//! Records live at `envs/<environment>/<service>.yaml`. The single-slot
//! rollback pointers live under `.rollback/`, one file per service,
//! overwritten on every promotion.

use crate::model::{Environment, Service};

pub const ENVS_DIR: &str = "envs";
pub const ROLLBACK_DIR: &str = ".rollback";

/// Tree-relative path of a desired-state record.
pub fn record_path(service: Service, environment: Environment) -> String {
    format!("{ENVS_DIR}/{environment}/{service}.yaml")
}

/// Tree-relative path of a service's rollback pointer slot.
pub fn rollback_slot_path(service: Service) -> String {
    format!("{ROLLBACK_DIR}/{service}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_paths_are_per_pair() {
        assert_eq!(
            record_path(Service::Catalogue, Environment::Staging),
            "envs/staging/catalogue.yaml"
        );
        assert_eq!(
            record_path(Service::Frontend, Environment::Prod),
            "envs/prod/frontend.yaml"
        );
    }

    #[test]
    fn rollback_slot_is_per_service() {
        assert_eq!(rollback_slot_path(Service::Voting), ".rollback/voting");
    }
}
