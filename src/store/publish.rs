//! Publish typestate machine.
//!
//! A publish walks Idle → Loaded → Staged → Committed, each transition
//! consuming `self`, so a caller cannot stage against state it never read or
//! push a commit it never staged.
//!
//! Key design:
//! - The commit's sole parent is the exact remote HEAD read in `load`, and
//!   the push is fast-forward only. Any interleaved publish therefore forces
//!   a deterministic `PublishConflict` instead of last-writer-wins.
//! - Only the changed paths are staged; the rest of the tree is reused
//!   untouched from the parent commit.
//! - The machine never retries. `PublishConflict` is surfaced to the caller,
//!   who must re-read and re-invoke.

use std::path::Path;

use git2::{ObjectType, Oid, Repository, Signature, Tree};
use tracing::debug;

use super::error::StoreError;
use super::layout::record_path;
use super::record::DesiredStateRecord;
use crate::model::{Environment, Service};

/// Initial phase.
pub struct Idle;

/// Base state has been fetched and resolved.
#[derive(Debug)]
pub struct Loaded {
    /// Commit the publish will parent on.
    pub head: Oid,
}

/// Changed paths are written as a new tree, ready to commit.
pub struct Staged {
    parent: Oid,
    tree: Oid,
    diff: StageDiff,
}

/// Local commit exists, ready to push.
pub struct Committed {
    pub commit: Oid,
}

/// One staged write: tree-relative path, new content, operator-facing note.
pub struct StagedChange {
    pub path: String,
    pub bytes: Vec<u8>,
    pub note: String,
}

/// Operator-facing summary of what a publish touches.
#[derive(Debug, Clone, Default)]
pub struct StageDiff {
    pub lines: Vec<String>,
}

impl StageDiff {
    pub fn render(&self) -> String {
        self.lines.join("\n")
    }
}

#[derive(Debug)]
pub struct Publisher<Phase> {
    branch: String,
    remote: String,
    pub phase: Phase,
}

impl Publisher<Idle> {
    pub fn new(branch: impl Into<String>, remote: impl Into<String>) -> Self {
        Publisher {
            branch: branch.into(),
            remote: remote.into(),
            phase: Idle,
        }
    }

    /// Fetch the store branch and resolve the base commit.
    ///
    /// Prefers the remote-tracking ref after fetch; falls back to the local
    /// branch for remote-less repositories. The store is never implicitly
    /// initialized; a missing branch is an error, since records are
    /// onboarded out of band.
    pub fn load(self, repo: &Repository) -> Result<Publisher<Loaded>, StoreError> {
        if let Ok(mut remote) = repo.find_remote(&self.remote) {
            let cfg = repo.config().ok();
            let mut fo = git2::FetchOptions::new();
            fo.remote_callbacks(credential_callbacks(cfg));
            let refspec = format!("refs/heads/{}", self.branch);
            remote
                .fetch(&[refspec.as_str()], Some(&mut fo), None)
                .map_err(|source| StoreError::Fetch {
                    remote: self.remote.clone(),
                    source,
                })?;
        }

        let tracking = format!("refs/remotes/{}/{}", self.remote, self.branch);
        let local = format!("refs/heads/{}", self.branch);
        let head = match repo.refname_to_id(&tracking) {
            Ok(oid) => oid,
            Err(_) => repo
                .refname_to_id(&local)
                .map_err(|_| StoreError::NoBranch(self.branch.clone()))?,
        };
        debug!(branch = %self.branch, head = %head, "store loaded");

        Ok(Publisher {
            branch: self.branch,
            remote: self.remote,
            phase: Loaded { head },
        })
    }
}

impl Publisher<Loaded> {
    pub fn head(&self) -> Oid {
        self.phase.head
    }

    /// Raw bytes of a tree path at the loaded head, if present.
    pub fn read(&self, repo: &Repository, path: &str) -> Result<Option<Vec<u8>>, StoreError> {
        read_blob(repo, self.phase.head, path)
    }

    /// Parse the desired-state record for a (service, environment) pair.
    pub fn record(
        &self,
        repo: &Repository,
        service: Service,
        environment: Environment,
    ) -> Result<DesiredStateRecord, StoreError> {
        let path = record_path(service, environment);
        let bytes = self
            .read(repo, &path)?
            .ok_or(StoreError::MissingRecord {
                service,
                environment,
                path: path.clone(),
            })?;
        DesiredStateRecord::parse_for(&path, &bytes, service)
    }

    /// Write the given changes on top of the head tree.
    ///
    /// Stages exactly the named paths; every other entry is shared with the
    /// parent commit's tree.
    pub fn stage(
        self,
        repo: &Repository,
        changes: Vec<StagedChange>,
    ) -> Result<Publisher<Staged>, StoreError> {
        let head_commit = repo.find_commit(self.phase.head)?;
        let mut tree_oid = head_commit.tree_id();
        let mut diff = StageDiff::default();

        for change in &changes {
            let blob = repo.blob(&change.bytes)?;
            let base = repo.find_tree(tree_oid)?;
            let components: Vec<&str> = change.path.split('/').collect();
            tree_oid = write_blob_at(repo, Some(&base), &components, blob)?;
            diff.lines.push(change.note.clone());
        }

        Ok(Publisher {
            branch: self.branch,
            remote: self.remote,
            phase: Staged {
                parent: self.phase.head,
                tree: tree_oid,
                diff,
            },
        })
    }
}

impl Publisher<Staged> {
    pub fn diff(&self) -> &StageDiff {
        &self.phase.diff
    }

    /// Create the commit and advance the local branch ref to it.
    ///
    /// The single parent is the loaded head, which is what makes the later
    /// fast-forward push an optimistic concurrency check.
    pub fn commit(
        self,
        repo: &Repository,
        actor: &str,
        message: &str,
    ) -> Result<Publisher<Committed>, StoreError> {
        let tree = repo.find_tree(self.phase.tree)?;
        let parent = repo.find_commit(self.phase.parent)?;
        let sig = signature_for(actor)?;

        let commit = repo.commit(None, &sig, &sig, message, &tree, &[&parent])?;
        let local = format!("refs/heads/{}", self.branch);
        repo.reference(&local, commit, true, "regatta publish")?;
        debug!(commit = %commit, "store commit created");

        Ok(Publisher {
            branch: self.branch,
            remote: self.remote,
            phase: Committed { commit },
        })
    }
}

impl Publisher<Committed> {
    pub fn commit_oid(&self) -> Oid {
        self.phase.commit
    }

    /// Push the branch, completing the publish.
    ///
    /// A remote-less repository completes at the local ref. A rejected
    /// (non-fast-forward) push is `PublishConflict`; the already-created
    /// local commit is reported to the operator, never discarded silently.
    pub fn push(self, repo: &Repository) -> Result<Oid, StoreError> {
        let mut remote = match repo.find_remote(&self.remote) {
            Ok(r) => r,
            Err(_) => return Ok(self.phase.commit),
        };

        let refspec = format!("refs/heads/{b}:refs/heads/{b}", b = self.branch);

        use std::cell::RefCell;
        let rejection: RefCell<Option<String>> = RefCell::new(None);
        {
            let cfg = repo.config().ok();
            let mut callbacks = credential_callbacks(cfg);
            callbacks.push_update_reference(|_refname, status| {
                if let Some(msg) = status {
                    *rejection.borrow_mut() = Some(msg.to_string());
                }
                Ok(())
            });
            let mut opts = git2::PushOptions::new();
            opts.remote_callbacks(callbacks);

            if let Err(e) = remote.push(&[refspec.as_str()], Some(&mut opts)) {
                if is_non_fast_forward(&e.to_string()) {
                    return Err(StoreError::PublishConflict);
                }
                return Err(StoreError::Push {
                    remote: self.remote.clone(),
                    source: e,
                });
            }
        }

        if let Some(msg) = rejection.into_inner() {
            if is_non_fast_forward(&msg) {
                return Err(StoreError::PublishConflict);
            }
            return Err(StoreError::Push {
                remote: self.remote,
                source: git2::Error::from_str(&msg),
            });
        }

        Ok(self.phase.commit)
    }
}

fn is_non_fast_forward(msg: &str) -> bool {
    msg.contains("non-fast-forward")
        || msg.contains("fetch first")
        || msg.contains("cannot lock ref")
        || msg.contains("failed to update ref")
}

fn signature_for(actor: &str) -> Result<Signature<'static>, git2::Error> {
    // Actor strings are `user@host`; reuse both halves for the signature.
    let (name, email) = match actor.split_once('@') {
        Some((user, _)) if !user.is_empty() => (user, actor),
        _ => (actor, actor),
    };
    Signature::now(name, email)
}

/// Read a blob's bytes at `path` inside the tree of `commit`.
pub(crate) fn read_blob(
    repo: &Repository,
    commit: Oid,
    path: &str,
) -> Result<Option<Vec<u8>>, StoreError> {
    let tree = repo.find_commit(commit)?.tree()?;
    let entry = match tree.get_path(Path::new(path)) {
        Ok(entry) => entry,
        Err(e) if e.code() == git2::ErrorCode::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    let blob = repo
        .find_object(entry.id(), Some(ObjectType::Blob))?
        .peel_to_blob()?;
    Ok(Some(blob.content().to_vec()))
}

/// Rebuild the tree spine along `components`, replacing exactly one blob.
fn write_blob_at(
    repo: &Repository,
    base: Option<&Tree<'_>>,
    components: &[&str],
    blob: Oid,
) -> Result<Oid, git2::Error> {
    let mut builder = repo.treebuilder(base)?;
    let name = components[0];
    if components.len() == 1 {
        builder.insert(name, blob, 0o100644)?;
    } else {
        let sub_base = match base.and_then(|t| t.get_name(name)) {
            Some(entry) if entry.kind() == Some(ObjectType::Tree) => {
                Some(repo.find_tree(entry.id())?)
            }
            _ => None,
        };
        let sub_oid = write_blob_at(repo, sub_base.as_ref(), &components[1..], blob)?;
        builder.insert(name, sub_oid, 0o040000)?;
    }
    builder.write()
}

fn credential_callbacks<'a>(cfg: Option<git2::Config>) -> git2::RemoteCallbacks<'a> {
    let mut callbacks = git2::RemoteCallbacks::new();
    callbacks.credentials(move |url, username_from_url, allowed| {
        if allowed.is_ssh_key()
            && let Some(user) = username_from_url
        {
            return git2::Cred::ssh_key_from_agent(user);
        }
        if allowed.is_user_pass_plaintext()
            && let Some(ref cfg) = cfg
            && let Ok(cred) = git2::Cred::credential_helper(cfg, url, username_from_url)
        {
            return Ok(cred);
        }
        git2::Cred::default()
    });
    callbacks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_fast_forward_detection() {
        assert!(is_non_fast_forward("cannot push non-fast-forward ref"));
        assert!(is_non_fast_forward("remote says: fetch first"));
        assert!(!is_non_fast_forward("connection reset"));
    }

    #[test]
    fn signature_splits_actor() {
        let sig = signature_for("ops@bastion").unwrap();
        assert_eq!(sig.name(), Some("ops"));
        assert_eq!(sig.email(), Some("ops@bastion"));
    }

    #[test]
    fn signature_tolerates_plain_names() {
        let sig = signature_for("ci-runner").unwrap();
        assert_eq!(sig.name(), Some("ci-runner"));
    }
}
