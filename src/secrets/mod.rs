//! Secret synchronizer: idempotent writes of service/environment-scoped
//! secret bundles into the secret backend.
//!
//! Values are resolved per field from an operator prompt, an ambient
//! environment variable, or generation, then written as full overwrites.
//! Nothing here retains old values; rotation safety is the caller's.

mod backend;
mod catalog;
mod error;

use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, info};

pub use backend::{MemoryBackend, SecretBackend, VaultCliBackend};
pub use catalog::{CategorySpec, FieldPolicy, FieldSpec, SecretCatalog};
pub use error::SecretError;

use crate::model::{Environment, Service};

/// Minimum length of generated secret values.
pub const GENERATED_LEN: usize = 32;

/// How field values are sourced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncMode {
    /// Ask the operator for each field; blank answers fall through to the
    /// field's policy.
    Interactive,
    /// Read ambient `REGATTA_SECRET_*` variables; absent ones fall through
    /// to the field's policy.
    FromEnv,
    /// Resolve everything, report with redacted values, write nothing.
    DryRun,
}

/// Where a resolved value came from (reported, value never included).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueSource {
    Prompt,
    Env,
    Generated,
}

/// Report entry for one field of one written (or planned) bundle.
#[derive(Debug, Clone)]
pub struct FieldReport {
    pub name: String,
    pub source: ValueSource,
}

/// One (service, category) bundle outcome.
#[derive(Debug, Clone)]
pub struct WriteResult {
    pub service: Service,
    pub category: String,
    /// Backend path the bundle was (or would be) written to.
    pub path: String,
    pub fields: Vec<FieldReport>,
    /// False in dry-run mode.
    pub written: bool,
}

/// Operator input for interactive mode. Returns `None` for a blank answer.
pub trait PromptSource {
    fn read_secret(&mut self, prompt: &str) -> Result<Option<SecretString>, SecretError>;
}

/// Reads one line per prompt from stdin.
pub struct StdinPrompt;

impl PromptSource for StdinPrompt {
    fn read_secret(&mut self, prompt: &str) -> Result<Option<SecretString>, SecretError> {
        use std::io::{BufRead, Write};

        let mut stderr = std::io::stderr();
        write!(stderr, "{prompt}: ").map_err(|e| SecretError::PromptFailed(e.to_string()))?;
        stderr
            .flush()
            .map_err(|e| SecretError::PromptFailed(e.to_string()))?;

        let mut line = String::new();
        std::io::stdin()
            .lock()
            .read_line(&mut line)
            .map_err(|e| SecretError::PromptFailed(e.to_string()))?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            Ok(None)
        } else {
            Ok(Some(SecretString::from(trimmed.to_string())))
        }
    }
}

/// Ambient variable carrying a field value:
/// `REGATTA_SECRET_<SERVICE>_<CATEGORY>_<FIELD>`, dashes mapped to
/// underscores.
pub fn env_var_name(service: Service, category: &str, field: &str) -> String {
    let canon = |s: &str| s.to_uppercase().replace('-', "_");
    format!(
        "REGATTA_SECRET_{}_{}_{}",
        canon(service.as_str()),
        canon(category),
        canon(field)
    )
}

/// Backend path for a bundle: `{mount}/{environment}/{service}/{category}`.
pub fn secret_path(mount: &str, environment: Environment, service: Service, category: &str) -> String {
    format!("{mount}/{environment}/{service}/{category}")
}

pub struct SecretSynchronizer<'a> {
    backend: &'a dyn SecretBackend,
    catalog: &'a SecretCatalog,
    mount: &'a str,
}

impl<'a> SecretSynchronizer<'a> {
    pub fn new(backend: &'a dyn SecretBackend, catalog: &'a SecretCatalog, mount: &'a str) -> Self {
        SecretSynchronizer {
            backend,
            catalog,
            mount,
        }
    }

    /// Synchronize every category in scope: all services, or just one.
    ///
    /// Writes are unconditional overwrites. Dry-run performs the full
    /// resolution pass and reports it, issuing zero backend writes.
    pub fn sync(
        &self,
        environment: Environment,
        service: Option<Service>,
        mode: SyncMode,
        prompt: &mut dyn PromptSource,
    ) -> Result<Vec<WriteResult>, SecretError> {
        let services: Vec<Service> = match service {
            Some(s) => vec![s],
            None => crate::model::SERVICES.to_vec(),
        };

        let mut results = Vec::new();
        for service in services {
            for category in self.catalog.categories(service) {
                results.push(self.sync_category(environment, service, category, mode, prompt)?);
            }
        }
        Ok(results)
    }

    fn sync_category(
        &self,
        environment: Environment,
        service: Service,
        category: &CategorySpec,
        mode: SyncMode,
        prompt: &mut dyn PromptSource,
    ) -> Result<WriteResult, SecretError> {
        let path = secret_path(self.mount, environment, service, &category.name);
        let mut fields = Vec::new();
        let mut values: Vec<(String, SecretString)> = Vec::new();

        for field in &category.fields {
            let (value, source) = self.resolve_field(service, &category.name, field, mode, prompt)?;
            fields.push(FieldReport {
                name: field.name.clone(),
                source,
            });
            values.push((field.name.clone(), value));
        }

        let written = match mode {
            SyncMode::DryRun => {
                debug!(%path, "dry-run: skipping write");
                false
            }
            SyncMode::Interactive | SyncMode::FromEnv => {
                self.backend.put(&path, &values)?;
                info!(%path, fields = fields.len(), "secret bundle written");
                true
            }
        };

        Ok(WriteResult {
            service,
            category: category.name.clone(),
            path,
            fields,
            written,
        })
    }

    fn resolve_field(
        &self,
        service: Service,
        category: &str,
        field: &FieldSpec,
        mode: SyncMode,
        prompt: &mut dyn PromptSource,
    ) -> Result<(SecretString, ValueSource), SecretError> {
        // Operator prompt first in interactive mode.
        if mode == SyncMode::Interactive {
            let label = format!("{service}/{category}/{}", field.name);
            if let Some(value) = prompt.read_secret(&label)? {
                return Ok((value, ValueSource::Prompt));
            }
        }

        // Ambient variable (also honored in interactive and dry-run modes,
        // so a partially seeded environment behaves the same everywhere).
        let var = env_var_name(service, category, &field.name);
        if let Ok(value) = std::env::var(&var)
            && !value.is_empty()
        {
            return Ok((SecretString::from(value), ValueSource::Env));
        }

        match field.policy {
            FieldPolicy::GenerateIfAbsent => Ok((generate_value(), ValueSource::Generated)),
            FieldPolicy::Required => Err(SecretError::MissingValue {
                service,
                category: category.to_string(),
                field: field.name.clone(),
                env_var: var,
            }),
        }
    }
}

/// Random alphanumeric value of [`GENERATED_LEN`] characters.
fn generate_value() -> SecretString {
    use rand::Rng;

    let mut rng = rand::rng();
    let value: String = (0..GENERATED_LEN)
        .map(|_| rng.sample(rand::distr::Alphanumeric) as char)
        .collect();
    SecretString::from(value)
}

/// Redacted rendering for reports; the only place a value's length leaks.
pub fn redact(value: &SecretString) -> String {
    "*".repeat(value.expose_secret().len().min(8))
}

#[cfg(test)]
mod tests {
    use secrecy::ExposeSecret;

    use super::*;

    struct NoPrompt;

    impl PromptSource for NoPrompt {
        fn read_secret(&mut self, _prompt: &str) -> Result<Option<SecretString>, SecretError> {
            Ok(None)
        }
    }

    struct CannedPrompt(Vec<Option<&'static str>>);

    impl PromptSource for CannedPrompt {
        fn read_secret(&mut self, _prompt: &str) -> Result<Option<SecretString>, SecretError> {
            Ok(self
                .0
                .remove(0)
                .map(|s| SecretString::from(s.to_string())))
        }
    }

    #[test]
    fn generated_values_meet_minimum_length() {
        let value = generate_value();
        assert_eq!(value.expose_secret().len(), GENERATED_LEN);
        assert!(
            value
                .expose_secret()
                .chars()
                .all(|c| c.is_ascii_alphanumeric())
        );
    }

    #[test]
    fn env_var_names_are_canonical() {
        assert_eq!(
            env_var_name(Service::Catalogue, "database", "root-password"),
            "REGATTA_SECRET_CATALOGUE_DATABASE_ROOT_PASSWORD"
        );
    }

    #[test]
    fn dry_run_resolves_everything_and_writes_nothing() {
        let backend = MemoryBackend::default();
        let catalog = SecretCatalog::builtin();
        let sync = SecretSynchronizer::new(&backend, &catalog, "secret/craftista");

        let results = sync
            .sync(Environment::Dev, None, SyncMode::DryRun, &mut NoPrompt)
            .unwrap();

        // Every service contributed at least one bundle, none written.
        assert!(results.len() >= crate::model::SERVICES.len());
        assert!(results.iter().all(|r| !r.written));
        assert!(results.iter().all(|r| !r.fields.is_empty()));
        assert_eq!(backend.write_count(), 0);
    }

    #[test]
    fn from_env_writes_full_overwrites() {
        let backend = MemoryBackend::default();
        let catalog = SecretCatalog::builtin();
        let sync = SecretSynchronizer::new(&backend, &catalog, "secret/craftista");

        let results = sync
            .sync(
                Environment::Dev,
                Some(Service::Voting),
                SyncMode::FromEnv,
                &mut NoPrompt,
            )
            .unwrap();
        assert!(results.iter().all(|r| r.written));
        assert!(backend.write_count() >= 1);

        let first = &results[0];
        let stored = backend.get(&first.path).unwrap().unwrap();
        assert_eq!(stored.len(), first.fields.len());

        // Second sync overwrites with fresh generated values.
        let before: Vec<String> = stored
            .iter()
            .map(|(_, v)| v.expose_secret().to_string())
            .collect();
        sync.sync(
            Environment::Dev,
            Some(Service::Voting),
            SyncMode::FromEnv,
            &mut NoPrompt,
        )
        .unwrap();
        let after = backend.get(&first.path).unwrap().unwrap();
        let after: Vec<String> = after
            .iter()
            .map(|(_, v)| v.expose_secret().to_string())
            .collect();
        assert_ne!(before, after);
    }

    #[test]
    fn interactive_prefers_prompt_answers() {
        let backend = MemoryBackend::default();
        let catalog = SecretCatalog::builtin();
        let sync = SecretSynchronizer::new(&backend, &catalog, "secret/craftista");

        // Answer the first field, leave the rest blank.
        let mut prompt = CannedPrompt(vec![Some("hunter2-but-long-enough"), None, None, None]);
        let results = sync
            .sync(
                Environment::Staging,
                Some(Service::Catalogue),
                SyncMode::Interactive,
                &mut prompt,
            )
            .unwrap();

        let fields: Vec<&FieldReport> = results.iter().flat_map(|r| &r.fields).collect();
        assert_eq!(fields[0].source, ValueSource::Prompt);
        assert!(
            fields[1..]
                .iter()
                .all(|f| f.source == ValueSource::Generated)
        );
    }

    #[test]
    fn required_field_without_source_fails() {
        let backend = MemoryBackend::default();
        let catalog = SecretCatalog::from_specs(vec![(
            Service::Frontend,
            vec![CategorySpec {
                name: "oauth".to_string(),
                fields: vec![FieldSpec {
                    name: "client-secret-test-only".to_string(),
                    policy: FieldPolicy::Required,
                }],
            }],
        )]);
        let sync = SecretSynchronizer::new(&backend, &catalog, "secret/craftista");

        let err = sync
            .sync(
                Environment::Dev,
                Some(Service::Frontend),
                SyncMode::FromEnv,
                &mut NoPrompt,
            )
            .unwrap_err();
        assert!(matches!(err, SecretError::MissingValue { .. }));
        assert_eq!(backend.write_count(), 0);
    }

    #[test]
    fn redaction_hides_length_beyond_cap() {
        let value = SecretString::from("supercalifragilistic".to_string());
        assert_eq!(redact(&value), "********");
    }
}
