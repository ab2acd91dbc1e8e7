//! CLI surface for regatta.
//!
//! Thin handlers over the library: parse, resolve repo + config, dispatch.
//! Tolerant value parsing (case, aliases) so operators and pipelines don't
//! fight the parser.

use std::ffi::OsString;
use std::path::PathBuf;
use std::time::Duration;

use clap::{ArgAction, Parser, Subcommand, builder::BoolishValueParser};

use crate::config::Config;
use crate::model::{Environment, Service};
use crate::{Error, Result};

pub mod commands;
mod render;

// =============================================================================
// Entry + global options
// =============================================================================

#[derive(Parser, Debug)]
#[command(
    name = "regatta",
    version,
    about = "GitOps environment promotion, rollback, and secret sync",
    infer_subcommands = true,
    infer_long_args = true,
    arg_required_else_help = true
)]
pub struct Cli {
    /// Machine-readable JSON output.
    #[arg(
        long,
        global = true,
        default_value_t = false,
        num_args = 0..=1,
        value_parser = BoolishValueParser::new()
    )]
    pub json: bool,

    /// Desired-state repository path (default: discover from cwd).
    #[arg(long, global = true, value_name = "PATH")]
    pub repo: Option<PathBuf>,

    /// Actor identity recorded in promotion events.
    #[arg(long, global = true, value_name = "ACTOR")]
    pub actor: Option<String>,

    /// Errors only.
    #[arg(
        short = 'q',
        long,
        global = true,
        default_value_t = false,
        num_args = 0..=1,
        value_parser = BoolishValueParser::new()
    )]
    pub quiet: bool,

    /// Debug output (repeat for more).
    #[arg(short = 'v', long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Promote a service image tag into an environment.
    Promote(commands::promote::PromoteArgs),

    /// Roll a service back to an earlier desired state.
    Rollback(commands::rollback::RollbackArgs),

    /// Wait for the controller to converge an application.
    Wait(commands::wait::WaitArgs),

    /// Show current desired-state records.
    Status(commands::status::StatusArgs),

    /// Show the promotion event log.
    #[command(alias = "log")]
    History(commands::history::HistoryArgs),

    /// Secret backend operations.
    Secrets {
        #[command(subcommand)]
        cmd: commands::secrets::SecretsCmd,
    },
}

pub fn parse_from<I, T>(args: I) -> Cli
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    Cli::parse_from(args)
}

pub fn run(cli: Cli) -> Result<()> {
    let ctx = Ctx::resolve(cli.repo, cli.json)?;

    match cli.command {
        Commands::Promote(args) => commands::promote::handle(&ctx, args),
        Commands::Rollback(args) => commands::rollback::handle(&ctx, args),
        Commands::Wait(args) => commands::wait::handle(&ctx, args),
        Commands::Status(args) => commands::status::handle(&ctx, args),
        Commands::History(args) => commands::history::handle(&ctx, args),
        Commands::Secrets { cmd } => commands::secrets::handle(&ctx, cmd),
    }
}

// =============================================================================
// Context + helpers
// =============================================================================

pub(crate) struct Ctx {
    pub repo_root: PathBuf,
    pub config: Config,
    pub json: bool,
}

impl Ctx {
    fn resolve(repo: Option<PathBuf>, json: bool) -> Result<Self> {
        let repo_root = match repo {
            Some(p) => {
                let abs = if p.is_absolute() {
                    p
                } else {
                    std::env::current_dir()
                        .map_err(|e| validation("repo", format!("failed to get cwd: {e}")))?
                        .join(p)
                };
                std::fs::canonicalize(&abs).unwrap_or(abs)
            }
            None => crate::repo::discover()?.1,
        };
        let config = crate::config::load_for_repo(Some(&repo_root))?;
        Ok(Ctx {
            repo_root,
            config,
            json,
        })
    }

    pub fn open_repo(&self) -> Result<git2::Repository> {
        crate::repo::open_at(&self.repo_root)
    }
}

pub(crate) fn validation(field: &str, reason: String) -> Error {
    Error::Op(crate::ops::OpError::ValidationFailed {
        field: field.to_string(),
        reason,
    })
}

// =============================================================================
// Parsing helpers
// =============================================================================

pub(crate) fn parse_service(raw: &str) -> std::result::Result<Service, String> {
    Service::parse(raw).map_err(|e| e.to_string())
}

pub(crate) fn parse_environment(raw: &str) -> std::result::Result<Environment, String> {
    Environment::parse(raw).map_err(|e| e.to_string())
}

/// Accepts plain seconds ("300") or a duration suffix ("5m", "45s", "1h").
pub(crate) fn parse_duration_secs(raw: &str) -> std::result::Result<Duration, String> {
    let s = raw.trim().to_lowercase();
    if let Ok(secs) = s.parse::<u64>() {
        return Ok(Duration::from_secs(secs));
    }
    let (value, unit) = s.split_at(s.len().saturating_sub(1));
    let value: u64 = value
        .parse()
        .map_err(|_| format!("invalid duration `{raw}` (use seconds, or 30s/5m/1h)"))?;
    match unit {
        "s" => Ok(Duration::from_secs(value)),
        "m" => Ok(Duration::from_secs(value * 60)),
        "h" => Ok(Duration::from_secs(value * 3600)),
        _ => Err(format!("invalid duration `{raw}` (use seconds, or 30s/5m/1h)")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn durations_accept_bare_seconds_and_suffixes() {
        assert_eq!(parse_duration_secs("300").unwrap(), Duration::from_secs(300));
        assert_eq!(parse_duration_secs("45s").unwrap(), Duration::from_secs(45));
        assert_eq!(parse_duration_secs("5m").unwrap(), Duration::from_secs(300));
        assert_eq!(parse_duration_secs("1h").unwrap(), Duration::from_secs(3600));
        assert!(parse_duration_secs("5 parsecs").is_err());
    }

    #[test]
    fn zero_duration_is_allowed() {
        // `--timeout 0` is a meaningful boundary: probe-free timeout.
        assert_eq!(parse_duration_secs("0").unwrap(), Duration::ZERO);
    }
}
