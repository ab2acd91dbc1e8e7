//! Queries over the append-only promotion event log.
//!
//! The log is physically the store branch's commit history; entries are the
//! commits whose messages parse as [`PromotionEvent`]s. All queries walk
//! from an explicit head commit so that reads and publishes share one
//! snapshot of the branch.

use git2::{Oid, Repository};
use tracing::warn;

use super::error::StoreError;
use super::layout::record_path;
use super::publish::read_blob;
use super::record::DesiredStateRecord;
use crate::model::{Environment, ModelError, PromotionEvent, Service};

/// A parsed event plus the commit that carries it.
#[derive(Debug, Clone)]
pub struct EventEntry {
    pub commit: Oid,
    pub event: PromotionEvent,
}

/// Walk the log newest-first, filtered to a (service, environment) pair.
///
/// Commits that are not promotion events (bootstrap, onboarding, manual
/// edits) are skipped. A commit that claims to be an event but fails schema
/// parsing is skipped with a warning rather than poisoning the whole walk.
pub fn events(
    repo: &Repository,
    from: Oid,
    service: Option<Service>,
    environment: Option<Environment>,
    limit: Option<usize>,
) -> Result<Vec<EventEntry>, StoreError> {
    let mut walk = repo.revwalk()?;
    walk.push(from)?;
    walk.set_sorting(git2::Sort::TOPOLOGICAL | git2::Sort::TIME)?;

    let mut out = Vec::new();
    for oid in walk {
        let oid = oid?;
        let commit = repo.find_commit(oid)?;
        let message = commit.message().unwrap_or_default();

        let event = match PromotionEvent::parse(&oid.to_string(), message) {
            Ok(event) => event,
            Err(ModelError::NotAnEvent { .. }) => continue,
            Err(e) => {
                warn!(commit = %oid, error = %e, "skipping malformed promotion event");
                continue;
            }
        };

        if let Some(service) = service
            && event.service != service
        {
            continue;
        }
        if let Some(environment) = environment
            && event.environment != environment
        {
            continue;
        }

        out.push(EventEntry { commit: oid, event });
        if let Some(limit) = limit
            && out.len() >= limit
        {
            break;
        }
    }
    Ok(out)
}

/// Resolve an N-steps-back rollback target.
///
/// Position is 0-indexed from the most recent matching event: `steps == 1`
/// selects the second-most-recent. Fewer matches than requested is
/// `InsufficientHistory`, never a silent clamp to the oldest.
pub fn resolve_steps_back(
    repo: &Repository,
    from: Oid,
    service: Service,
    environment: Environment,
    steps: usize,
) -> Result<EventEntry, StoreError> {
    let needed = steps + 1;
    let matches = events(repo, from, Some(service), Some(environment), Some(needed))?;
    if matches.len() < needed {
        return Err(StoreError::InsufficientHistory {
            service,
            environment,
            needed,
            available: matches.len(),
        });
    }
    Ok(matches.into_iter().nth(steps).expect("length checked"))
}

/// Resolve an explicit revision to a commit reachable from the store head.
pub fn resolve_revision(repo: &Repository, from: Oid, rev: &str) -> Result<Oid, StoreError> {
    let object = repo
        .revparse_single(rev)
        .map_err(|_| StoreError::InvalidRevision(rev.to_string()))?;
    let commit = object
        .peel_to_commit()
        .map_err(|_| StoreError::InvalidRevision(rev.to_string()))?;
    let oid = commit.id();

    let reachable = oid == from || repo.graph_descendant_of(from, oid).unwrap_or(false);
    if !reachable {
        return Err(StoreError::InvalidRevision(rev.to_string()));
    }
    Ok(oid)
}

/// The record for a pair as it existed at `commit`: parsed form plus the
/// exact bytes, so a restore re-publishes the historical content verbatim.
pub fn record_at(
    repo: &Repository,
    commit: Oid,
    service: Service,
    environment: Environment,
) -> Result<(DesiredStateRecord, Vec<u8>), StoreError> {
    let path = record_path(service, environment);
    let bytes = read_blob(repo, commit, &path)?.ok_or(StoreError::MissingRecord {
        service,
        environment,
        path: path.clone(),
    })?;
    let record = DesiredStateRecord::parse_for(&path, &bytes, service)?;
    Ok((record, bytes))
}
