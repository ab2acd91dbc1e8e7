//! Output rendering: one payload, two shapes (human text or `--json`).

use serde::Serialize;

use crate::Result;
use crate::cli::validation;

/// Print either the JSON payload or the human rendering to stdout.
pub(crate) fn out<T: Serialize>(
    json: bool,
    payload: &T,
    human: impl FnOnce() -> String,
) -> Result<()> {
    let s = if json {
        serde_json::to_string_pretty(payload)
            .map_err(|e| validation("output", format!("failed to encode JSON: {e}")))?
    } else {
        human()
    };
    print_line(&s)
}

/// Progress/diagnostic line for humans; suppressed in JSON mode so stdout
/// stays parseable.
pub(crate) fn note(json: bool, line: &str) {
    if !json {
        eprintln!("{line}");
    }
}

fn print_line(s: &str) -> Result<()> {
    use std::io::Write;
    let mut stdout = std::io::stdout().lock();
    if let Err(e) = writeln!(stdout, "{s}")
        && e.kind() != std::io::ErrorKind::BrokenPipe
    {
        return Err(validation("output", format!("failed to write output: {e}")));
    }
    Ok(())
}
