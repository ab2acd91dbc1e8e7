use std::time::Duration;

use clap::Args;
use serde::Serialize;

use crate::cli::render::{note, out};
use crate::cli::{Ctx, parse_duration_secs, parse_environment, parse_service};
use crate::model::{Environment, Service};
use crate::monitor::{self, ArgoCliSource, Convergence};
use crate::ops::{ApprovalMode, PresetGate, StdinGate};
use crate::ops::promote::{PromoteOutcome, PromoteRequest, promote};
use crate::registry::SkopeoProbe;
use crate::Result;

#[derive(Args, Debug)]
pub struct PromoteArgs {
    /// Service to promote.
    #[arg(short = 's', long, value_parser = parse_service)]
    pub service: Service,

    /// Image tag to promote.
    #[arg(short = 't', long, value_name = "TAG")]
    pub tag: String,

    /// Target environment.
    #[arg(short = 'e', long = "env", alias = "environment", value_parser = parse_environment)]
    pub env: Environment,

    /// Override the upstream tier checked by the prod consistency gate.
    #[arg(long = "source-env", value_parser = parse_environment)]
    pub source_env: Option<Environment>,

    /// Validate and show the staged change without committing or pushing.
    #[arg(long)]
    pub dry_run: bool,

    /// Skip the prod approval prompt (recorded as a bypass).
    #[arg(short = 'y', long)]
    pub yes: bool,

    /// After publishing, wait for the controller to converge.
    #[arg(short = 'w', long)]
    pub wait: bool,

    /// Convergence wait bound (seconds or 30s/5m/1h).
    #[arg(long, value_parser = parse_duration_secs)]
    pub timeout: Option<Duration>,
}

#[derive(Serialize)]
struct PromoteReport<'a> {
    outcome: &'static str,
    service: Service,
    environment: Environment,
    tag: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    commit: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    previous_tag: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    converged: Option<bool>,
}

pub(crate) fn handle(ctx: &Ctx, args: PromoteArgs) -> Result<()> {
    let repo = ctx.open_repo()?;

    let request = PromoteRequest {
        service: args.service,
        tag: args.tag.clone(),
        target: args.env,
        source: args.source_env,
        dry_run: args.dry_run,
        approval: if args.yes {
            ApprovalMode::Bypass
        } else {
            ApprovalMode::Interactive
        },
    };

    let probe = SkopeoProbe::new();
    let outcome = if args.yes {
        // The gate is never consulted on bypass; keep stdin untouched.
        promote(&repo, &ctx.config, &request, &probe, &mut PresetGate(true))?
    } else {
        promote(&repo, &ctx.config, &request, &probe, &mut StdinGate)?
    };

    match &outcome {
        PromoteOutcome::NoOp { tag } => out(
            ctx.json,
            &PromoteReport {
                outcome: "noop",
                service: args.service,
                environment: args.env,
                tag,
                commit: None,
                previous_tag: None,
                converged: None,
            },
            || {
                format!(
                    "{}/{} already at {}, nothing to do",
                    args.service, args.env, tag
                )
            },
        ),
        PromoteOutcome::DryRun { event, diff } => out(
            ctx.json,
            &PromoteReport {
                outcome: "dry-run",
                service: args.service,
                environment: args.env,
                tag: &event.image.tag,
                commit: None,
                previous_tag: event.previous_tag.as_deref(),
                converged: None,
            },
            || {
                format!(
                    "dry run: would publish `{}`\n{}",
                    event.subject(),
                    diff.render()
                )
            },
        ),
        PromoteOutcome::Published { event, commit } => {
            let converged = if args.wait {
                Some(wait_for_convergence(ctx, args.service, args.env, args.timeout)?)
            } else {
                None
            };
            out(
                ctx.json,
                &PromoteReport {
                    outcome: "published",
                    service: args.service,
                    environment: args.env,
                    tag: &event.image.tag,
                    commit: Some(commit.to_string()),
                    previous_tag: event.previous_tag.as_deref(),
                    converged,
                },
                || format!("published `{}` as {}", event.subject(), commit),
            )
        }
    }
}

/// Shared by promote --wait and rollback --wait.
pub(crate) fn wait_for_convergence(
    ctx: &Ctx,
    service: Service,
    environment: Environment,
    timeout: Option<Duration>,
) -> Result<bool> {
    let app = monitor::app_name(&ctx.config.controller.app_prefix, service, environment);
    let timeout =
        timeout.unwrap_or(Duration::from_secs(ctx.config.controller.default_timeout_secs));
    let interval = Duration::from_secs(ctx.config.controller.poll_interval_secs.max(1));

    let source = ArgoCliSource::new();
    let outcome = monitor::await_convergence(&source, &app, timeout, interval, |poll, status| {
        note(ctx.json, &format!("[{poll}] {app}: {status}"));
    })?;

    match outcome {
        Convergence::Converged { polls, elapsed } => {
            note(
                ctx.json,
                &format!("{app} converged after {polls} poll(s) in {elapsed:.0?}"),
            );
            Ok(true)
        }
        Convergence::TimedOut { last, .. } => {
            let last = last.map(|s| s.to_string()).unwrap_or_else(|| "never observed".into());
            note(
                ctx.json,
                &format!("{app} did not converge within the timeout (last: {last})"),
            );
            if environment.is_prod() {
                note(
                    ctx.json,
                    &format!(
                        "verify manually before proceeding; to undo: regatta rollback --service {service} --env {environment} --steps 1"
                    ),
                );
            }
            Ok(false)
        }
    }
}
