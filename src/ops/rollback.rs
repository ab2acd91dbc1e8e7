//! The rollback resolver.
//!
//! Rollback restores a prior record state as a new forward promotion event.
//! History is never rewritten; the restore commit is itself an event the
//! next rollback can resolve against.

use git2::{Oid, Repository};
use time::OffsetDateTime;
use tracing::{info, instrument};

use super::gate::{ApprovalGate, ApprovalMode};
use super::{OpError, current_actor};
use crate::config::Config;
use crate::model::{Approval, Environment, EventKind, PromotionEvent, Service};
use crate::store::history;
use crate::store::{Publisher, StagedChange, record_path, rollback_slot_path};
use crate::{Error, Result};

/// How the rollback target is selected. Exactly one.
#[derive(Debug, Clone)]
pub enum RollbackSelector {
    /// Set the record to an explicit tag; no history search.
    ToTag(String),
    /// Restore the record as of an explicit revision.
    ToRevision(String),
    /// Restore the record as of the N-th most recent matching event
    /// (0-indexed from the most recent; 1 = the one before the latest).
    StepsBack(usize),
}

#[derive(Debug, Clone)]
pub struct RollbackRequest {
    pub service: Service,
    pub environment: Environment,
    pub selector: RollbackSelector,
    pub approval: ApprovalMode,
}

#[derive(Debug)]
pub struct RollbackOutcome {
    pub event: PromotionEvent,
    pub commit: Oid,
}

/// Resolve and apply a rollback.
///
/// Confirmation is unconditional: rollback moves against the promotion
/// direction and is treated as higher-risk at every tier. `--yes` records
/// an explicit bypass instead.
#[instrument(skip_all, fields(service = %req.service, env = %req.environment))]
pub fn rollback(
    repo: &Repository,
    config: &Config,
    req: &RollbackRequest,
    gate: &mut dyn ApprovalGate,
) -> Result<RollbackOutcome> {
    let publisher =
        Publisher::new(&config.store.branch, &config.store.remote).load(repo)?;
    let head = publisher.head();

    let current = publisher.record(repo, req.service, req.environment)?;
    let previous_tag = current.tag().to_string();

    // Resolve the target content before asking for confirmation, so the
    // prompt can state exactly what will be restored.
    let (restored_bytes, restored_tag, rollback_target) = match &req.selector {
        RollbackSelector::ToTag(tag) => {
            let restored = current.with_tag(tag)?;
            (restored.to_yaml(), tag.clone(), None)
        }
        RollbackSelector::ToRevision(rev) => {
            let commit = history::resolve_revision(repo, head, rev)?;
            let (record, bytes) =
                history::record_at(repo, commit, req.service, req.environment)?;
            (bytes, record.tag().to_string(), Some(commit.to_string()))
        }
        RollbackSelector::StepsBack(steps) => {
            let entry =
                history::resolve_steps_back(repo, head, req.service, req.environment, *steps)?;
            let (record, bytes) =
                history::record_at(repo, entry.commit, req.service, req.environment)?;
            (bytes, record.tag().to_string(), Some(entry.commit.to_string()))
        }
    };

    let approval = match req.approval {
        ApprovalMode::Bypass => Approval::Bypassed,
        ApprovalMode::Interactive => {
            let prompt = format!(
                "Roll back {} in {} from {} to {}?",
                req.service, req.environment, previous_tag, restored_tag
            );
            if !gate.confirm(&prompt)? {
                return Err(Error::Op(OpError::ApprovalDenied {
                    operation: "rollback",
                }));
            }
            Approval::Granted
        }
    };

    let changes = vec![
        StagedChange {
            path: record_path(req.service, req.environment),
            bytes: restored_bytes,
            note: format!(
                "{}: {} -> {}",
                record_path(req.service, req.environment),
                previous_tag,
                restored_tag
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
        kind: EventKind::Rollback,
        service: req.service,
        environment: req.environment,
        image: current.image.with_tag(&restored_tag)?,
        previous_tag: Some(previous_tag),
        source_environment: None,
        rollback_target,
        approval,
        actor,
        timestamp: OffsetDateTime::now_utc(),
    };

    let committed = publisher
        .stage(repo, changes)?
        .commit(repo, &event.actor, &event.to_commit_message())?;
    let commit = committed.push(repo)?;
    info!(%commit, tag = %restored_tag, "rollback published");

    Ok(RollbackOutcome { event, commit })
}
