use std::time::Duration;

use clap::Args;
use serde::Serialize;

use crate::Result;
use crate::cli::render::{note, out};
use crate::cli::{Ctx, parse_duration_secs, parse_environment, parse_service};
use crate::model::{Environment, Service};
use crate::monitor::{self, ArgoCliSource, Convergence, SyncStatus};

#[derive(Args, Debug)]
pub struct WaitArgs {
    #[arg(short = 's', long, value_parser = parse_service)]
    pub service: Service,

    #[arg(short = 'e', long = "env", alias = "environment", value_parser = parse_environment)]
    pub env: Environment,

    /// Wait bound (seconds or 30s/5m/1h). Zero reports timeout immediately.
    #[arg(long, value_parser = parse_duration_secs)]
    pub timeout: Option<Duration>,

    /// Poll interval (seconds or 30s/5m/1h).
    #[arg(long, value_parser = parse_duration_secs)]
    pub interval: Option<Duration>,
}

#[derive(Serialize)]
struct WaitReport {
    app: String,
    converged: bool,
    polls: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    last: Option<SyncStatus>,
}

/// Timeout is advisory here: the command reports the outcome and exits 0
/// either way. Pipelines that treat it as fatal check the `converged` field.
pub(crate) fn handle(ctx: &Ctx, args: WaitArgs) -> Result<()> {
    let app = monitor::app_name(&ctx.config.controller.app_prefix, args.service, args.env);
    let timeout = args
        .timeout
        .unwrap_or(Duration::from_secs(ctx.config.controller.default_timeout_secs));
    let interval = args
        .interval
        .unwrap_or(Duration::from_secs(ctx.config.controller.poll_interval_secs.max(1)));

    let source = ArgoCliSource::new();
    let outcome = monitor::await_convergence(&source, &app, timeout, interval, |poll, status| {
        note(ctx.json, &format!("[{poll}] {app}: {status}"));
    })?;

    match outcome {
        Convergence::Converged { polls, elapsed } => out(
            ctx.json,
            &WaitReport {
                app: app.clone(),
                converged: true,
                polls,
                last: None,
            },
            || format!("{app} converged after {polls} poll(s) in {elapsed:.0?}"),
        ),
        Convergence::TimedOut { polls, last } => out(
            ctx.json,
            &WaitReport {
                app: app.clone(),
                converged: false,
                polls,
                last,
            },
            || {
                let last = last
                    .map(|s| s.to_string())
                    .unwrap_or_else(|| "never observed".into());
                format!("{app} did not converge (polls: {polls}, last: {last})")
            },
        ),
    }
}
