use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::model::{ImageRef, ModelError, Service};
use crate::registry::StrictnessPolicy;
use crate::secrets::SecretCatalog;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub store: StoreConfig,
    pub registry: RegistryConfig,
    pub controller: ControllerConfig,
    pub promotion: PromotionConfig,
    pub secrets: SecretsConfig,
    pub logging: LoggingConfig,
}

impl Config {
    /// The full image reference for a service at a tag.
    pub fn image_for(&self, service: Service, tag: &str) -> Result<ImageRef, ModelError> {
        ImageRef::new(self.registry.repository_for(service), tag)
    }
}

/// Where the desired-state store lives.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Single tracked branch carrying records and the event log.
    pub branch: String,
    pub remote: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            branch: "main".to_string(),
            remote: "origin".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    pub host: String,
    pub namespace: String,
    /// Per-service image name overrides; default is the service name.
    pub images: BTreeMap<Service, String>,
}

impl RegistryConfig {
    pub fn repository_for(&self, service: Service) -> String {
        let name = self
            .images
            .get(&service)
            .map(String::as_str)
            .unwrap_or(service.as_str());
        format!("{}/{}/{}", self.host, self.namespace, name)
    }
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            host: "registry.example.io".to_string(),
            namespace: "craftista".to_string(),
            images: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    /// Application names derive as `{app_prefix}-{service}-{environment}`.
    pub app_prefix: String,
    pub poll_interval_secs: u64,
    pub default_timeout_secs: u64,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            app_prefix: "craftista".to_string(),
            poll_interval_secs: 10,
            default_timeout_secs: 300,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct PromotionConfig {
    pub strictness: StrictnessPolicy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SecretsConfig {
    pub mount: String,
    /// Full catalog replacement; absent means the built-in layout.
    pub catalog: Option<SecretCatalog>,
}

impl SecretsConfig {
    pub fn catalog(&self) -> SecretCatalog {
        self.catalog.clone().unwrap_or_else(SecretCatalog::builtin)
    }
}

impl Default for SecretsConfig {
    fn default() -> Self {
        Self {
            mount: "secret/craftista".to_string(),
            catalog: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Pretty,
    Compact,
    Json,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub stdout: bool,
    pub stdout_format: LogFormat,
    pub filter: Option<String>,
    pub file: FileLoggingConfig,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            stdout: true,
            stdout_format: LogFormat::Compact,
            filter: None,
            file: FileLoggingConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FileLoggingConfig {
    pub enabled: bool,
    pub dir: Option<PathBuf>,
    pub format: LogFormat,
}

impl Default for FileLoggingConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            dir: None,
            format: LogFormat::Json,
        }
    }
}

// =============================================================================
// Layer (partial config) for user/repo files
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ConfigLayer {
    pub store: StoreLayer,
    pub registry: RegistryLayer,
    pub controller: ControllerLayer,
    pub promotion: PromotionLayer,
    pub secrets: SecretsLayer,
    pub logging: LoggingLayer,
}

impl ConfigLayer {
    pub fn apply_to(&self, target: &mut Config) {
        self.store.apply_to(&mut target.store);
        self.registry.apply_to(&mut target.registry);
        self.controller.apply_to(&mut target.controller);
        self.promotion.apply_to(&mut target.promotion);
        self.secrets.apply_to(&mut target.secrets);
        self.logging.apply_to(&mut target.logging);
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct StoreLayer {
    pub branch: Option<String>,
    pub remote: Option<String>,
}

impl StoreLayer {
    fn apply_to(&self, target: &mut StoreConfig) {
        if let Some(branch) = &self.branch {
            target.branch = branch.clone();
        }
        if let Some(remote) = &self.remote {
            target.remote = remote.clone();
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct RegistryLayer {
    pub host: Option<String>,
    pub namespace: Option<String>,
    pub images: Option<BTreeMap<Service, String>>,
}

impl RegistryLayer {
    fn apply_to(&self, target: &mut RegistryConfig) {
        if let Some(host) = &self.host {
            target.host = host.clone();
        }
        if let Some(namespace) = &self.namespace {
            target.namespace = namespace.clone();
        }
        if let Some(images) = &self.images {
            target.images = images.clone();
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ControllerLayer {
    pub app_prefix: Option<String>,
    pub poll_interval_secs: Option<u64>,
    pub default_timeout_secs: Option<u64>,
}

impl ControllerLayer {
    fn apply_to(&self, target: &mut ControllerConfig) {
        if let Some(prefix) = &self.app_prefix {
            target.app_prefix = prefix.clone();
        }
        if let Some(interval) = self.poll_interval_secs {
            target.poll_interval_secs = interval;
        }
        if let Some(timeout) = self.default_timeout_secs {
            target.default_timeout_secs = timeout;
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct PromotionLayer {
    pub strictness: Option<StrictnessPolicy>,
}

impl PromotionLayer {
    fn apply_to(&self, target: &mut PromotionConfig) {
        if let Some(strictness) = self.strictness {
            target.strictness = strictness;
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct SecretsLayer {
    pub mount: Option<String>,
    pub catalog: Option<SecretCatalog>,
}

impl SecretsLayer {
    fn apply_to(&self, target: &mut SecretsConfig) {
        if let Some(mount) = &self.mount {
            target.mount = mount.clone();
        }
        if let Some(catalog) = &self.catalog {
            target.catalog = Some(catalog.clone());
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct LoggingLayer {
    pub stdout: Option<bool>,
    pub stdout_format: Option<LogFormat>,
    pub filter: Option<String>,
    pub file_enabled: Option<bool>,
    pub file_dir: Option<PathBuf>,
}

impl LoggingLayer {
    fn apply_to(&self, target: &mut LoggingConfig) {
        if let Some(stdout) = self.stdout {
            target.stdout = stdout;
        }
        if let Some(format) = self.stdout_format {
            target.stdout_format = format;
        }
        if let Some(filter) = &self.filter {
            target.filter = Some(filter.clone());
        }
        if let Some(enabled) = self.file_enabled {
            target.file.enabled = enabled;
        }
        if let Some(dir) = &self.file_dir {
            target.file.dir = Some(dir.clone());
        }
    }
}
