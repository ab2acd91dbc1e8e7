//! Shared fixture: a seeded desired-state repository with a bare origin.
#![allow(dead_code)] // each test binary uses a different slice of the fixture

use std::fs;
use std::path::Path;

use git2::{Repository, RepositoryInitOptions, Signature};
use tempfile::TempDir;

use regatta::config::Config;
use regatta::model::{Environment, ImageRef, Service};
use regatta::registry::{Probe, RegistryProbe};
use regatta::store::DesiredStateRecord;

pub const DEFAULT_TAG: &str = "v1.0.0";

/// Probe with a fixed answer.
pub struct FixedProbe(pub Probe);

impl RegistryProbe for FixedProbe {
    fn probe(&self, _image: &ImageRef) -> Probe {
        self.0.clone()
    }
}

pub fn present() -> FixedProbe {
    FixedProbe(Probe::Present)
}

pub struct World {
    /// Owns the tempdir for the lifetime of the test.
    pub tmp: TempDir,
    pub repo: Repository,
    pub config: Config,
}

impl World {
    /// Head of the published store branch on the origin side.
    pub fn origin_head(&self) -> git2::Oid {
        let origin = Repository::open(self.tmp.path().join("origin.git")).expect("open origin");
        origin
            .refname_to_id("refs/heads/main")
            .expect("origin main")
    }

    /// Parse the current record straight from the origin's tree.
    pub fn origin_record(&self, service: Service, environment: Environment) -> DesiredStateRecord {
        let origin = Repository::open(self.tmp.path().join("origin.git")).expect("open origin");
        let head = origin
            .refname_to_id("refs/heads/main")
            .expect("origin main");
        let tree = origin.find_commit(head).expect("commit").tree().expect("tree");
        let path = regatta::store::record_path(service, environment);
        let entry = tree.get_path(Path::new(&path)).expect("record entry");
        let blob = origin.find_blob(entry.id()).expect("record blob");
        DesiredStateRecord::parse(&path, blob.content()).expect("parse record")
    }

    /// Paths touched by the origin head commit relative to its parent.
    pub fn origin_head_touched_paths(&self) -> Vec<String> {
        let origin = Repository::open(self.tmp.path().join("origin.git")).expect("open origin");
        let head = origin
            .refname_to_id("refs/heads/main")
            .expect("origin main");
        let commit = origin.find_commit(head).expect("commit");
        let parent = commit.parent(0).expect("parent");
        let diff = origin
            .diff_tree_to_tree(
                Some(&parent.tree().expect("parent tree")),
                Some(&commit.tree().expect("tree")),
                None,
            )
            .expect("diff");
        let mut paths: Vec<String> = diff
            .deltas()
            .filter_map(|d| d.new_file().path().map(|p| p.display().to_string()))
            .collect();
        paths.sort();
        paths
    }

    pub fn origin_head_message(&self) -> String {
        let origin = Repository::open(self.tmp.path().join("origin.git")).expect("open origin");
        let head = origin
            .refname_to_id("refs/heads/main")
            .expect("origin main");
        origin
            .find_commit(head)
            .expect("commit")
            .message()
            .expect("message")
            .to_string()
    }
}

/// Seed every (service, environment) pair at [`DEFAULT_TAG`], with the given
/// overrides, commit to `main`, and push to a bare origin.
pub fn seed(overrides: &[(Service, Environment, &str)]) -> World {
    let tmp = tempfile::tempdir().expect("tempdir");
    let config = Config::default();

    let origin_path = tmp.path().join("origin.git");
    let mut bare_opts = RepositoryInitOptions::new();
    bare_opts.bare(true).initial_head("main");
    Repository::init_opts(&origin_path, &bare_opts).expect("init origin");

    let work_path = tmp.path().join("work");
    let mut opts = RepositoryInitOptions::new();
    opts.initial_head("main");
    let repo = Repository::init_opts(&work_path, &opts).expect("init work repo");

    for service in regatta::model::SERVICES {
        for environment in Environment::all() {
            let tag = overrides
                .iter()
                .find(|(s, e, _)| *s == service && *e == environment)
                .map(|(_, _, tag)| *tag)
                .unwrap_or(DEFAULT_TAG);
            let record = DesiredStateRecord::new(
                service,
                ImageRef::new(config.registry.repository_for(service), tag).expect("image"),
            );
            let rel = regatta::store::record_path(service, environment);
            let abs = work_path.join(&rel);
            fs::create_dir_all(abs.parent().expect("parent")).expect("mkdir");
            fs::write(&abs, record.to_yaml()).expect("write record");
        }
    }

    let mut index = repo.index().expect("index");
    index
        .add_all(["*"], git2::IndexAddOption::DEFAULT, None)
        .expect("add");
    index.write().expect("index write");
    let tree_id = index.write_tree().expect("write tree");

    {
        let tree = repo.find_tree(tree_id).expect("tree");
        let sig = Signature::now("seed", "seed@localhost").expect("sig");
        repo.commit(
            Some("refs/heads/main"),
            &sig,
            &sig,
            "onboard environments",
            &tree,
            &[],
        )
        .expect("seed commit");
    }

    let origin_url = origin_path.display().to_string();
    let mut remote = repo.remote("origin", &origin_url).expect("add remote");
    remote
        .push(&["refs/heads/main:refs/heads/main"], None)
        .expect("seed push");
    drop(remote);

    World { tmp, repo, config }
}
