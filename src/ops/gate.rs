//! Approval gates: interactive confirmation for high-risk transitions.

use super::OpError;

/// How the caller wants approvals handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApprovalMode {
    /// Ask through the gate.
    Interactive,
    /// `--yes`: skip the prompt, record the bypass.
    Bypass,
}

/// Asks the operator to confirm an action. Refusal is terminal; there is no
/// retry loop at this layer.
pub trait ApprovalGate {
    fn confirm(&mut self, prompt: &str) -> Result<bool, OpError>;
}

/// Reads a `yes`/`y` line from stdin. Anything else, including EOF, is a
/// refusal.
pub struct StdinGate;

impl ApprovalGate for StdinGate {
    fn confirm(&mut self, prompt: &str) -> Result<bool, OpError> {
        use std::io::{BufRead, Write};

        let mut stderr = std::io::stderr();
        let _ = write!(stderr, "{prompt} [y/N]: ");
        let _ = stderr.flush();

        let mut line = String::new();
        if std::io::stdin().lock().read_line(&mut line).is_err() {
            return Ok(false);
        }
        let answer = line.trim().to_lowercase();
        Ok(answer == "y" || answer == "yes")
    }
}

/// Fixed answer, for automation plumbing and tests.
pub struct PresetGate(pub bool);

impl ApprovalGate for PresetGate {
    fn confirm(&mut self, _prompt: &str) -> Result<bool, OpError> {
        Ok(self.0)
    }
}
