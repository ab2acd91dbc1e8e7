//! Sync monitor: bounded polling of the reconciliation controller.
//!
//! Purely observational. The monitor never mutates anything and is safe to
//! run concurrently with itself or with a publish; it only reads the
//! controller's reported sync/health pair until convergence or timeout.

use std::io;
use std::process::Command;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::error::{Effect, Transience};
use crate::model::{Environment, Service};

/// Controller-reported sync state. Unrecognized strings map to `Unknown`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SyncState {
    Synced,
    OutOfSync,
    Unknown,
}

/// Controller-reported health state. Unrecognized strings map to `Unknown`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum HealthState {
    Healthy,
    Degraded,
    Progressing,
    Missing,
    Suspended,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SyncStatus {
    pub sync: SyncState,
    pub health: HealthState,
}

impl SyncStatus {
    /// The only terminal success pair.
    pub fn is_converged(&self) -> bool {
        self.sync == SyncState::Synced && self.health == HealthState::Healthy
    }
}

impl std::fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}/{:?}", self.sync, self.health)
    }
}

/// Outcome of a bounded wait. `TimedOut` is advisory, not an error: the
/// caller decides whether an unconverged application is fatal.
#[derive(Debug, Clone)]
pub enum Convergence {
    Converged { polls: u32, elapsed: Duration },
    TimedOut { polls: u32, last: Option<SyncStatus> },
}

#[derive(Error, Debug)]
#[non_exhaustive]
pub enum MonitorError {
    #[error("controller CLI unavailable: {0}")]
    ToolUnavailable(String),

    #[error("controller query for {app} failed: {reason}")]
    QueryFailed { app: String, reason: String },

    #[error("could not parse controller status for {app}: {reason}")]
    ParseFailed { app: String, reason: String },
}

impl MonitorError {
    pub fn transience(&self) -> Transience {
        match self {
            MonitorError::ToolUnavailable(_) | MonitorError::QueryFailed { .. } => {
                Transience::Retryable
            }
            MonitorError::ParseFailed { .. } => Transience::Permanent,
        }
    }

    pub fn effect(&self) -> Effect {
        // Status queries are read-only.
        Effect::None
    }
}

/// Controller application identifier: `{prefix}-{service}-{environment}`.
pub fn app_name(prefix: &str, service: Service, environment: Environment) -> String {
    format!("{prefix}-{service}-{environment}")
}

/// Read-only status query against the reconciliation controller.
pub trait StatusSource {
    fn status(&self, app: &str) -> Result<SyncStatus, MonitorError>;
}

/// Poll until the terminal pair (Synced, Healthy) or until `timeout`.
///
/// Every observation is passed to `observer` before the loop decides
/// anything, so operators see intermediate states, not just the outcome.
/// A zero timeout returns `TimedOut` without querying at all.
pub fn await_convergence(
    source: &dyn StatusSource,
    app: &str,
    timeout: Duration,
    interval: Duration,
    mut observer: impl FnMut(u32, &SyncStatus),
) -> Result<Convergence, MonitorError> {
    if timeout.is_zero() {
        return Ok(Convergence::TimedOut {
            polls: 0,
            last: None,
        });
    }

    let started = Instant::now();
    let mut polls = 0u32;
    let mut last = None;

    loop {
        let status = source.status(app)?;
        polls += 1;
        observer(polls, &status);
        info!(%app, poll = polls, status = %status, "sync status");
        last = Some(status);

        if status.is_converged() {
            return Ok(Convergence::Converged {
                polls,
                elapsed: started.elapsed(),
            });
        }

        let elapsed = started.elapsed();
        if elapsed >= timeout {
            return Ok(Convergence::TimedOut { polls, last });
        }
        let remaining = timeout - elapsed;
        std::thread::sleep(remaining.min(interval));
    }
}

/// Status source backed by the `argocd` CLI.
pub struct ArgoCliSource {
    program: String,
}

impl ArgoCliSource {
    pub fn new() -> Self {
        ArgoCliSource {
            program: "argocd".to_string(),
        }
    }

    pub fn with_program(program: impl Into<String>) -> Self {
        ArgoCliSource {
            program: program.into(),
        }
    }
}

impl Default for ArgoCliSource {
    fn default() -> Self {
        Self::new()
    }
}

/// The slice of `argocd app get -o json` this core consumes.
#[derive(Debug, Deserialize)]
struct AppDocument {
    status: AppStatus,
}

#[derive(Debug, Deserialize)]
struct AppStatus {
    #[serde(default)]
    sync: StateField,
    #[serde(default)]
    health: StateField,
}

#[derive(Debug, Default, Deserialize)]
struct StateField {
    #[serde(default)]
    status: String,
}

impl StatusSource for ArgoCliSource {
    fn status(&self, app: &str) -> Result<SyncStatus, MonitorError> {
        let mut cmd = Command::new(&self.program);
        cmd.arg("app")
            .arg("get")
            .arg(app)
            .arg("-o")
            .arg("json")
            .env("NO_COLOR", "1");

        let output = match cmd.output() {
            Ok(output) => output,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(MonitorError::ToolUnavailable(format!(
                    "`{}` not installed",
                    self.program
                )));
            }
            Err(e) => {
                return Err(MonitorError::ToolUnavailable(format!(
                    "failed to run `{}`: {e}",
                    self.program
                )));
            }
        };

        if !output.status.success() {
            return Err(MonitorError::QueryFailed {
                app: app.to_string(),
                reason: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let doc: AppDocument =
            serde_json::from_slice(&output.stdout).map_err(|e| MonitorError::ParseFailed {
                app: app.to_string(),
                reason: e.to_string(),
            })?;

        let status = SyncStatus {
            sync: parse_sync(&doc.status.sync.status),
            health: parse_health(&doc.status.health.status),
        };
        debug!(%app, %status, "controller reported");
        Ok(status)
    }
}

fn parse_sync(raw: &str) -> SyncState {
    match raw {
        "Synced" => SyncState::Synced,
        "OutOfSync" => SyncState::OutOfSync,
        _ => SyncState::Unknown,
    }
}

fn parse_health(raw: &str) -> HealthState {
    match raw {
        "Healthy" => HealthState::Healthy,
        "Degraded" => HealthState::Degraded,
        "Progressing" => HealthState::Progressing,
        "Missing" => HealthState::Missing,
        "Suspended" => HealthState::Suspended,
        _ => HealthState::Unknown,
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use super::*;

    struct ScriptedSource {
        script: RefCell<Vec<SyncStatus>>,
        queries: RefCell<u32>,
    }

    impl ScriptedSource {
        fn new(script: Vec<SyncStatus>) -> Self {
            ScriptedSource {
                script: RefCell::new(script),
                queries: RefCell::new(0),
            }
        }
    }

    impl StatusSource for ScriptedSource {
        fn status(&self, _app: &str) -> Result<SyncStatus, MonitorError> {
            *self.queries.borrow_mut() += 1;
            let mut script = self.script.borrow_mut();
            if script.len() > 1 {
                Ok(script.remove(0))
            } else {
                Ok(script[0])
            }
        }
    }

    const PROGRESSING: SyncStatus = SyncStatus {
        sync: SyncState::OutOfSync,
        health: HealthState::Progressing,
    };
    const CONVERGED: SyncStatus = SyncStatus {
        sync: SyncState::Synced,
        health: HealthState::Healthy,
    };

    #[test]
    fn zero_timeout_never_queries() {
        let source = ScriptedSource::new(vec![CONVERGED]);
        let outcome = await_convergence(
            &source,
            "craftista-voting-dev",
            Duration::ZERO,
            Duration::from_millis(1),
            |_, _| {},
        )
        .unwrap();
        assert!(matches!(
            outcome,
            Convergence::TimedOut {
                polls: 0,
                last: None
            }
        ));
        assert_eq!(*source.queries.borrow(), 0);
    }

    #[test]
    fn converges_after_intermediate_states() {
        let source = ScriptedSource::new(vec![PROGRESSING, PROGRESSING, CONVERGED]);
        let mut seen = Vec::new();
        let outcome = await_convergence(
            &source,
            "craftista-voting-dev",
            Duration::from_secs(5),
            Duration::from_millis(1),
            |_, status| seen.push(*status),
        )
        .unwrap();
        assert!(matches!(outcome, Convergence::Converged { polls: 3, .. }));
        // Every intermediate observation was surfaced.
        assert_eq!(seen.len(), 3);
        assert_eq!(seen[0], PROGRESSING);
        assert_eq!(seen[2], CONVERGED);
    }

    #[test]
    fn times_out_reporting_last_seen() {
        let source = ScriptedSource::new(vec![PROGRESSING]);
        let outcome = await_convergence(
            &source,
            "craftista-voting-dev",
            Duration::from_millis(5),
            Duration::from_millis(1),
            |_, _| {},
        )
        .unwrap();
        match outcome {
            Convergence::TimedOut { polls, last } => {
                assert!(polls >= 1);
                assert_eq!(last, Some(PROGRESSING));
            }
            other => panic!("expected timeout, got {other:?}"),
        }
    }

    #[test]
    fn synced_but_unhealthy_is_not_terminal() {
        let degraded = SyncStatus {
            sync: SyncState::Synced,
            health: HealthState::Degraded,
        };
        assert!(!degraded.is_converged());
        assert!(CONVERGED.is_converged());
    }

    #[test]
    fn app_names_derive_from_prefix_service_environment() {
        assert_eq!(
            app_name("craftista", Service::Catalogue, Environment::Staging),
            "craftista-catalogue-staging"
        );
    }

    #[test]
    fn unknown_controller_strings_map_to_unknown() {
        assert_eq!(parse_sync("Weird"), SyncState::Unknown);
        assert_eq!(parse_health(""), HealthState::Unknown);
    }
}
