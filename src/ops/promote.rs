//! The promotion engine.

use git2::{Oid, Repository};
use time::OffsetDateTime;
use tracing::{info, instrument};

use super::gate::{ApprovalGate, ApprovalMode};
use super::{OpError, current_actor};
use crate::config::Config;
use crate::model::{Approval, Environment, EventKind, PromotionEvent, Service};
use crate::registry::{self, RegistryProbe};
use crate::store::{Publisher, StageDiff, StagedChange, record_path, rollback_slot_path};
use crate::{Error, Result};

#[derive(Debug, Clone)]
pub struct PromoteRequest {
    pub service: Service,
    pub tag: String,
    pub target: Environment,
    /// Upstream tier for the prod consistency gate. Defaults to the
    /// target's predecessor.
    pub source: Option<Environment>,
    pub dry_run: bool,
    pub approval: ApprovalMode,
}

#[derive(Debug)]
pub enum PromoteOutcome {
    /// A new commit was published.
    Published { event: PromotionEvent, commit: Oid },
    /// The target record already carried the tag; nothing was committed.
    NoOp { tag: String },
    /// Dry run: the staged diff, discarded without commit or push.
    DryRun { event: PromotionEvent, diff: StageDiff },
}

/// Promote `service` to `tag` in `target`.
///
/// Runs Validating → (Gated) → Mutating → Publishing. Every failure aborts
/// the whole invocation; nothing is resumable.
#[instrument(skip_all, fields(service = %req.service, env = %req.target, tag = %req.tag))]
pub fn promote(
    repo: &Repository,
    config: &Config,
    req: &PromoteRequest,
    probe: &dyn RegistryProbe,
    gate: &mut dyn ApprovalGate,
) -> Result<PromoteOutcome> {
    // Validating.
    let image = config.image_for(req.service, &req.tag)?;
    let source = resolve_source(req)?;

    registry::verify(probe, &image, config.promotion.strictness)?;

    let publisher =
        Publisher::new(&config.store.branch, &config.store.remote).load(repo)?;

    // Consistency gate: prod must echo a tag already live in the upstream
    // tier, so promotions cannot skip ahead of validation.
    if req.target.is_prod() {
        let source = source.expect("prod always has a predecessor");
        let upstream = publisher.record(repo, req.service, source)?;
        if upstream.tag() != req.tag {
            return Err(Error::Op(OpError::SourceNotValidated {
                service: req.service,
                source_env: source,
                requested: req.tag.clone(),
                found: upstream.tag().to_string(),
            }));
        }
    }

    // Approval gate.
    let approval = if req.target.is_prod() {
        match req.approval {
            ApprovalMode::Bypass => Approval::Bypassed,
            ApprovalMode::Interactive => {
                let prompt = format!(
                    "Promote {} to {} with tag {}?",
                    req.service, req.target, req.tag
                );
                if !gate.confirm(&prompt)? {
                    return Err(Error::Op(OpError::ApprovalDenied {
                        operation: "promotion",
                    }));
                }
                Approval::Granted
            }
        }
    } else {
        Approval::NotRequired
    };

    // Mutating.
    let current = publisher.record(repo, req.service, req.target)?;
    if current.tag() == req.tag {
        info!("target already at requested tag, nothing to do");
        return Ok(PromoteOutcome::NoOp {
            tag: req.tag.clone(),
        });
    }

    let previous_tag = current.tag().to_string();
    let updated = current.with_tag(&req.tag)?;

    let changes = vec![
        StagedChange {
            path: record_path(req.service, req.target),
            bytes: updated.to_yaml(),
            note: format!(
                "{}: {} -> {}",
                record_path(req.service, req.target),
                previous_tag,
                req.tag
            ),
        },
        StagedChange {
            path: rollback_slot_path(req.service),
            bytes: format!("{previous_tag}\n").into_bytes(),
            note: format!("{}: {}", rollback_slot_path(req.service), previous_tag),
        },
    ];

    let actor = current_actor();
    let event = PromotionEvent {
        kind: EventKind::Promote,
        service: req.service,
        environment: req.target,
        image,
        previous_tag: Some(previous_tag),
        source_environment: if req.target.is_prod() { source } else { None },
        rollback_target: None,
        approval,
        actor,
        timestamp: OffsetDateTime::now_utc(),
    };

    let staged = publisher.stage(repo, changes)?;

    if req.dry_run {
        info!("dry run: discarding staged changes");
        return Ok(PromoteOutcome::DryRun {
            event,
            diff: staged.diff().clone(),
        });
    }

    // Publishing.
    let committed = staged.commit(repo, &event.actor, &event.to_commit_message())?;
    let commit = committed.push(repo)?;
    info!(%commit, "promotion published");

    Ok(PromoteOutcome::Published { event, commit })
}

/// Default the source tier and reject nonsensical combinations early.
fn resolve_source(req: &PromoteRequest) -> Result<Option<Environment>> {
    let source = req.source.or_else(|| req.target.predecessor());
    if let Some(source) = source
        && source >= req.target
    {
        return Err(Error::Op(OpError::ValidationFailed {
            field: "source-env".to_string(),
            reason: format!(
                "source {source} is not below target {target} in the promotion order",
                target = req.target
            ),
        }));
    }
    Ok(source)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(target: Environment, source: Option<Environment>) -> PromoteRequest {
        PromoteRequest {
            service: Service::Catalogue,
            tag: "v1.0.0".to_string(),
            target,
            source,
            dry_run: false,
            approval: ApprovalMode::Bypass,
        }
    }

    #[test]
    fn source_defaults_to_predecessor() {
        let source = resolve_source(&request(Environment::Prod, None)).unwrap();
        assert_eq!(source, Some(Environment::Staging));
        let source = resolve_source(&request(Environment::Dev, None)).unwrap();
        assert_eq!(source, None);
    }

    #[test]
    fn source_must_be_below_target() {
        assert!(resolve_source(&request(Environment::Staging, Some(Environment::Prod))).is_err());
        assert!(
            resolve_source(&request(Environment::Prod, Some(Environment::Dev))).is_ok(),
            "skipping a tier as explicit source is allowed; the consistency gate still applies"
        );
    }
}
