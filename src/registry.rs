//! Registry verifier: manifest-level existence checks for image artifacts.
//!
//! The probe shells out to an OCI inspection tool and never downloads the
//! artifact itself. Availability of the tool is an explicit policy decision
//! ([`StrictnessPolicy`]), not an implicit fallback.

use std::io;
use std::process::Command;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::error::{Effect, Transience};
use crate::model::ImageRef;

/// What to do when existence cannot be verified (tool missing or failing).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum StrictnessPolicy {
    /// Unverifiable is fatal.
    Strict,
    /// Warn and assume the artifact exists.
    ///
    /// The default, matching long-standing operator expectations: a missing
    /// inspection tool must not block an otherwise-valid promotion.
    #[default]
    WarnAndProceed,
}

/// Raw probe outcome, before policy is applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Probe {
    Present,
    Absent,
    Unverifiable(String),
}

#[derive(Error, Debug)]
#[non_exhaustive]
pub enum RegistryError {
    #[error("image {0} not found in registry")]
    ArtifactNotFound(ImageRef),

    #[error("registry inspection tool unavailable: {0}")]
    ToolUnavailable(String),
}

impl RegistryError {
    pub fn transience(&self) -> Transience {
        match self {
            RegistryError::ArtifactNotFound(_) => Transience::Permanent,
            RegistryError::ToolUnavailable(_) => Transience::Retryable,
        }
    }

    pub fn effect(&self) -> Effect {
        // Probes are read-only.
        Effect::None
    }
}

/// Manifest-existence check, keyed by a full image reference.
pub trait RegistryProbe {
    fn probe(&self, image: &ImageRef) -> Probe;
}

/// Apply the strictness policy to a raw probe outcome.
///
/// Returns `Ok(())` when the promotion may proceed.
pub fn verify(
    probe: &dyn RegistryProbe,
    image: &ImageRef,
    policy: StrictnessPolicy,
) -> Result<(), RegistryError> {
    match probe.probe(image) {
        Probe::Present => {
            debug!(%image, "registry manifest present");
            Ok(())
        }
        Probe::Absent => Err(RegistryError::ArtifactNotFound(image.clone())),
        Probe::Unverifiable(reason) => match policy {
            StrictnessPolicy::Strict => Err(RegistryError::ToolUnavailable(reason)),
            StrictnessPolicy::WarnAndProceed => {
                warn!(%image, reason, "cannot verify image existence, assuming present");
                Ok(())
            }
        },
    }
}

/// Probe backed by `skopeo inspect --raw`, a manifest fetch with no layer
/// downloads.
pub struct SkopeoProbe {
    program: String,
}

impl SkopeoProbe {
    pub fn new() -> Self {
        SkopeoProbe {
            program: "skopeo".to_string(),
        }
    }

    /// Override the tool name (tests, alternative inspectors).
    pub fn with_program(program: impl Into<String>) -> Self {
        SkopeoProbe {
            program: program.into(),
        }
    }
}

impl Default for SkopeoProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl RegistryProbe for SkopeoProbe {
    fn probe(&self, image: &ImageRef) -> Probe {
        let mut cmd = Command::new(&self.program);
        cmd.arg("inspect")
            .arg("--raw")
            .arg(format!("docker://{image}"))
            .env("NO_COLOR", "1");

        let output = match cmd.output() {
            Ok(output) => output,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Probe::Unverifiable(format!("`{}` not installed", self.program));
            }
            Err(e) => {
                return Probe::Unverifiable(format!("failed to run `{}`: {e}", self.program));
            }
        };

        if output.status.success() {
            return Probe::Present;
        }

        let stderr = String::from_utf8_lossy(&output.stderr);
        if is_definitive_absence(&stderr) {
            Probe::Absent
        } else {
            Probe::Unverifiable(format!(
                "`{}` exited with {}: {}",
                self.program,
                output.status,
                stderr.trim()
            ))
        }
    }
}

/// Only these diagnostics count as "the registry says it is not there";
/// anything else (auth, network, rate limits) stays unverifiable.
fn is_definitive_absence(stderr: &str) -> bool {
    let s = stderr.to_lowercase();
    s.contains("manifest unknown")
        || s.contains("name unknown")
        || s.contains("not found")
        || s.contains("does not exist")
}
