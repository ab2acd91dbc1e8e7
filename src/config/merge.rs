//! Layer merging and environment overrides.
//!
//! Precedence, lowest to highest: defaults, user config, repo config,
//! `REGATTA_*` environment variables.

use super::{Config, ConfigLayer};
use crate::registry::StrictnessPolicy;

pub fn merge_layers(user: Option<ConfigLayer>, repo: Option<ConfigLayer>) -> Config {
    let mut config = Config::default();
    if let Some(user) = user {
        user.apply_to(&mut config);
    }
    if let Some(repo) = repo {
        repo.apply_to(&mut config);
    }
    config
}

pub fn apply_env_overrides(config: &mut Config) {
    let var = |name: &str| {
        std::env::var(name)
            .ok()
            .filter(|value| !value.trim().is_empty())
    };

    if let Some(branch) = var("REGATTA_BRANCH") {
        config.store.branch = branch;
    }
    if let Some(remote) = var("REGATTA_REMOTE") {
        config.store.remote = remote;
    }
    if let Some(host) = var("REGATTA_REGISTRY") {
        config.registry.host = host;
    }
    if let Some(namespace) = var("REGATTA_NAMESPACE") {
        config.registry.namespace = namespace;
    }
    if let Some(prefix) = var("REGATTA_APP_PREFIX") {
        config.controller.app_prefix = prefix;
    }
    if let Some(mount) = var("REGATTA_VAULT_MOUNT") {
        config.secrets.mount = mount;
    }
    if let Some(strictness) = var("REGATTA_STRICTNESS") {
        match strictness.to_lowercase().as_str() {
            "strict" => config.promotion.strictness = StrictnessPolicy::Strict,
            "warn" | "warn_and_proceed" => {
                config.promotion.strictness = StrictnessPolicy::WarnAndProceed;
            }
            other => {
                tracing::warn!(value = other, "ignoring unknown REGATTA_STRICTNESS");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::{RegistryLayer, StoreLayer};

    #[test]
    fn repo_layer_wins_over_user_layer() {
        let user = ConfigLayer {
            store: StoreLayer {
                branch: Some("user-branch".to_string()),
                remote: None,
            },
            registry: RegistryLayer {
                host: Some("user.example.io".to_string()),
                ..RegistryLayer::default()
            },
            ..ConfigLayer::default()
        };
        let repo = ConfigLayer {
            store: StoreLayer {
                branch: Some("repo-branch".to_string()),
                remote: None,
            },
            ..ConfigLayer::default()
        };

        let merged = merge_layers(Some(user), Some(repo));
        assert_eq!(merged.store.branch, "repo-branch");
        // Repo layer left the host alone, so the user layer shows through.
        assert_eq!(merged.registry.host, "user.example.io");
    }

    #[test]
    fn no_layers_means_defaults() {
        let merged = merge_layers(None, None);
        assert_eq!(merged.store.branch, "main");
        assert_eq!(merged.store.remote, "origin");
    }
}
