//! Repository discovery.

use std::path::{Path, PathBuf};

use git2::Repository;

use crate::store::StoreError;
use crate::Error;

/// Open the git repository containing the current directory.
pub fn discover() -> Result<(Repository, PathBuf), Error> {
    let repo = Repository::discover(".")
        .map_err(|e| StoreError::OpenRepo(PathBuf::from("."), e))?;
    let path = repo
        .workdir()
        .ok_or_else(|| {
            StoreError::OpenRepo(
                PathBuf::from("."),
                git2::Error::from_str("bare repository not supported"),
            )
        })?
        .to_owned();
    Ok((repo, path))
}

/// Open the repository at an explicit path.
pub fn open_at(path: &Path) -> Result<Repository, Error> {
    Ok(Repository::open(path).map_err(|e| StoreError::OpenRepo(path.to_owned(), e))?)
}
