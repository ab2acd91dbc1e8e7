//! Layered configuration: user config, repo-local `regatta.toml`, and
//! `REGATTA_*` environment overrides, merged in that order.

mod load;
mod merge;
mod schema;

pub use load::{
    config_path, discover_repo_root, load, load_for_repo, repo_config_path, write_config,
};
pub use merge::{apply_env_overrides, merge_layers};
pub use schema::{
    Config, ConfigLayer, ControllerConfig, FileLoggingConfig, LogFormat, LoggingConfig,
    PromotionConfig, RegistryConfig, SecretsConfig, StoreConfig,
};
