//! Secret backend: a path-hierarchical key-value store behind a narrow
//! trait, with a Vault CLI implementation and an in-memory test double.

use std::collections::BTreeMap;
use std::io::{self, Write};
use std::process::{Command, Stdio};
use std::sync::Mutex;

use secrecy::{ExposeSecret, SecretString};
use tracing::debug;

use super::error::SecretError;

/// Full-overwrite writes and verification reads, keyed by slash paths.
pub trait SecretBackend {
    fn put(&self, path: &str, fields: &[(String, SecretString)]) -> Result<(), SecretError>;

    fn get(&self, path: &str) -> Result<Option<Vec<(String, SecretString)>>, SecretError>;
}

/// Backend shelling out to the `vault` CLI.
///
/// Field values are streamed as JSON over stdin (`vault kv put <path> -`)
/// so they never appear on the argument list. Ambient `VAULT_ADDR` and
/// `VAULT_TOKEN` provide addressing and auth, as everywhere else in the
/// deployment tooling.
pub struct VaultCliBackend {
    program: String,
}

impl VaultCliBackend {
    pub fn new() -> Self {
        VaultCliBackend {
            program: "vault".to_string(),
        }
    }

    pub fn with_program(program: impl Into<String>) -> Self {
        VaultCliBackend {
            program: program.into(),
        }
    }

    fn spawn_err(&self, e: io::Error) -> SecretError {
        if e.kind() == io::ErrorKind::NotFound {
            SecretError::ToolUnavailable(format!("`{}` not installed", self.program))
        } else {
            SecretError::ToolUnavailable(format!("failed to run `{}`: {e}", self.program))
        }
    }
}

impl Default for VaultCliBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl SecretBackend for VaultCliBackend {
    fn put(&self, path: &str, fields: &[(String, SecretString)]) -> Result<(), SecretError> {
        let payload: BTreeMap<&str, &str> = fields
            .iter()
            .map(|(k, v)| (k.as_str(), v.expose_secret()))
            .collect();
        let body = serde_json::to_vec(&payload)
            .map_err(|e| SecretError::BackendFailed(format!("encode payload: {e}")))?;

        let mut child = Command::new(&self.program)
            .arg("kv")
            .arg("put")
            .arg(path)
            .arg("-")
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .env("NO_COLOR", "1")
            .spawn()
            .map_err(|e| self.spawn_err(e))?;

        child
            .stdin
            .take()
            .expect("stdin was piped")
            .write_all(&body)
            .map_err(|e| SecretError::BackendFailed(format!("write to vault stdin: {e}")))?;

        let output = child
            .wait_with_output()
            .map_err(|e| SecretError::BackendFailed(e.to_string()))?;
        if !output.status.success() {
            return Err(SecretError::BackendFailed(
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            ));
        }
        debug!(%path, "vault write ok");
        Ok(())
    }

    fn get(&self, path: &str) -> Result<Option<Vec<(String, SecretString)>>, SecretError> {
        let output = Command::new(&self.program)
            .arg("kv")
            .arg("get")
            .arg("-format=json")
            .arg(path)
            .env("NO_COLOR", "1")
            .output()
            .map_err(|e| self.spawn_err(e))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            if stderr.contains("No value found") || stderr.contains("no secret exists") {
                return Ok(None);
            }
            return Err(SecretError::BackendFailed(stderr.trim().to_string()));
        }

        #[derive(serde::Deserialize)]
        struct KvDocument {
            data: KvData,
        }
        #[derive(serde::Deserialize)]
        struct KvData {
            #[serde(default)]
            data: BTreeMap<String, String>,
        }

        let doc: KvDocument = serde_json::from_slice(&output.stdout)
            .map_err(|e| SecretError::BackendFailed(format!("parse vault output: {e}")))?;
        Ok(Some(
            doc.data
                .data
                .into_iter()
                .map(|(k, v)| (k, SecretString::from(v)))
                .collect(),
        ))
    }
}

/// In-memory backend for tests and dry wiring.
///
/// Stores plain strings internally; values re-wrap on read.
#[derive(Default)]
pub struct MemoryBackend {
    entries: Mutex<BTreeMap<String, Vec<(String, String)>>>,
    writes: Mutex<usize>,
}

impl MemoryBackend {
    pub fn write_count(&self) -> usize {
        *self.writes.lock().expect("writes lock")
    }
}

impl SecretBackend for MemoryBackend {
    fn put(&self, path: &str, fields: &[(String, SecretString)]) -> Result<(), SecretError> {
        let mut entries = self.entries.lock().expect("entries lock");
        entries.insert(
            path.to_string(),
            fields
                .iter()
                .map(|(k, v)| (k.clone(), v.expose_secret().to_string()))
                .collect(),
        );
        *self.writes.lock().expect("writes lock") += 1;
        Ok(())
    }

    fn get(&self, path: &str) -> Result<Option<Vec<(String, SecretString)>>, SecretError> {
        let entries = self.entries.lock().expect("entries lock");
        Ok(entries.get(path).map(|fields| {
            fields
                .iter()
                .map(|(k, v)| (k.clone(), SecretString::from(v.clone())))
                .collect()
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_backend_overwrites() {
        let backend = MemoryBackend::default();
        let path = "secret/craftista/dev/voting/database";

        backend
            .put(path, &[("password".into(), SecretString::from("one"))])
            .unwrap();
        backend
            .put(path, &[("password".into(), SecretString::from("two"))])
            .unwrap();

        let stored = backend.get(path).unwrap().unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].1.expose_secret(), "two");
        assert_eq!(backend.write_count(), 2);
    }

    #[test]
    fn memory_backend_misses_are_none() {
        let backend = MemoryBackend::default();
        assert!(backend.get("secret/absent").unwrap().is_none());
    }
}
