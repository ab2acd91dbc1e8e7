use std::time::Duration;

use clap::Args;
use serde::Serialize;

use crate::Result;
use crate::cli::render::out;
use crate::cli::{Ctx, parse_duration_secs, parse_environment, parse_service};
use crate::model::{Environment, Service};
use crate::ops::rollback::{RollbackRequest, RollbackSelector, rollback};
use crate::ops::{ApprovalMode, PresetGate, StdinGate};

use super::promote::wait_for_convergence;

#[derive(Args, Debug)]
pub struct RollbackArgs {
    /// Service to roll back.
    #[arg(short = 's', long, value_parser = parse_service)]
    pub service: Service,

    /// Environment to roll back.
    #[arg(short = 'e', long = "env", alias = "environment", value_parser = parse_environment)]
    pub env: Environment,

    /// Steps back through matching promotion events (default 1).
    #[arg(long, conflicts_with_all = ["to_commit", "to_tag"])]
    pub steps: Option<usize>,

    /// Restore the record as of this revision.
    #[arg(long = "to-commit", value_name = "REV", conflicts_with = "to_tag")]
    pub to_commit: Option<String>,

    /// Set the record to this tag directly (no history search).
    #[arg(long = "to-tag", value_name = "TAG")]
    pub to_tag: Option<String>,

    /// Skip the confirmation prompt (recorded as a bypass).
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
struct RollbackReport<'a> {
    service: Service,
    environment: Environment,
    tag: &'a str,
    previous_tag: Option<&'a str>,
    commit: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    rollback_target: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    converged: Option<bool>,
}

pub(crate) fn handle(ctx: &Ctx, args: RollbackArgs) -> Result<()> {
    let repo = ctx.open_repo()?;

    let selector = if let Some(tag) = args.to_tag.clone() {
        RollbackSelector::ToTag(tag)
    } else if let Some(rev) = args.to_commit.clone() {
        RollbackSelector::ToRevision(rev)
    } else {
        RollbackSelector::StepsBack(args.steps.unwrap_or(1))
    };

    let request = RollbackRequest {
        service: args.service,
        environment: args.env,
        selector,
        approval: if args.yes {
            ApprovalMode::Bypass
        } else {
            ApprovalMode::Interactive
        },
    };

    let outcome = if args.yes {
        rollback(&repo, &ctx.config, &request, &mut PresetGate(true))?
    } else {
        rollback(&repo, &ctx.config, &request, &mut StdinGate)?
    };

    let converged = if args.wait {
        Some(wait_for_convergence(ctx, args.service, args.env, args.timeout)?)
    } else {
        None
    };

    out(
        ctx.json,
        &RollbackReport {
            service: args.service,
            environment: args.env,
            tag: &outcome.event.image.tag,
            previous_tag: outcome.event.previous_tag.as_deref(),
            commit: outcome.commit.to_string(),
            rollback_target: outcome.event.rollback_target.as_deref(),
            converged,
        },
        || {
            format!(
                "rolled back {}/{} to {} as {}",
                args.service, args.env, outcome.event.image.tag, outcome.commit
            )
        },
    )
}
