//! libgit2 backend through the `git2` crate.

use std::path::{Path, PathBuf};

use git2::{DiffOptions, ErrorCode, Repository, Status, StatusOptions};
use gvs_diff::DiffHunk;
use gvs_types::StatusFlags;
use tracing::debug;

use crate::error::{BackendError, BackendResult};
use crate::lifecycle;
use crate::traits::{Backend, BackendRepo, StatusEntry};

/// Backend that opens real Git repositories on disk.
#[derive(Debug)]
pub struct Git2Backend {
    _priv: (),
}

impl Git2Backend {
    pub fn new() -> Self {
        lifecycle::init();
        Self { _priv: () }
    }
}

impl Default for Git2Backend {
    fn default() -> Self {
        Self::new()
    }
}

impl Backend for Git2Backend {
    fn open(&self, path: &Path) -> BackendResult<Box<dyn BackendRepo>> {
        let repo = Repository::discover(path).map_err(|e| {
            if e.code() == ErrorCode::NotFound {
                BackendError::NotFound(path.to_path_buf())
            } else {
                BackendError::Git(e)
            }
        })?;
        let workdir = match repo.workdir() {
            Some(dir) => normalize(dir),
            None => return Err(BackendError::Bare(repo.path().to_path_buf())),
        };
        debug!(path = %path.display(), workdir = %workdir.display(), "opened git repository");
        Ok(Box::new(Git2Repo { repo, workdir }))
    }
}

/// One opened libgit2 repository.
pub struct Git2Repo {
    repo: Repository,
    workdir: PathBuf,
}

impl BackendRepo for Git2Repo {
    fn workdir(&self) -> &Path {
        &self.workdir
    }

    fn is_ignored(&self, rel_path: &Path) -> BackendResult<bool> {
        Ok(self.repo.is_path_ignored(rel_path)?)
    }

    fn statuses(&self) -> BackendResult<Vec<StatusEntry>> {
        let mut opts = StatusOptions::new();
        opts.include_untracked(true)
            .recurse_untracked_dirs(true)
            .include_ignored(false);

        let statuses = self.repo.statuses(Some(&mut opts))?;
        let mut entries = Vec::with_capacity(statuses.len());
        for entry in statuses.iter() {
            let Some(path) = entry.path() else {
                debug!("skipping status entry with non UTF-8 path");
                continue;
            };
            entries.push(StatusEntry::new(path, convert_status(entry.status())));
        }
        Ok(entries)
    }

    fn diff_index_to_workdir(
        &self,
        rel_path: &Path,
        context_lines: u32,
    ) -> BackendResult<Vec<DiffHunk>> {
        let mut opts = DiffOptions::new();
        opts.context_lines(context_lines)
            .pathspec(rel_path)
            .disable_pathspec_match(true);

        let diff = self.repo.diff_index_to_workdir(None, Some(&mut opts))?;
        let mut hunks = Vec::new();
        diff.foreach(
            &mut |_, _| true,
            None,
            Some(&mut |_, hunk| {
                hunks.push(DiffHunk::new(
                    hunk.old_start(),
                    hunk.old_lines(),
                    hunk.new_start(),
                    hunk.new_lines(),
                ));
                true
            }),
            None,
        )?;
        Ok(hunks)
    }
}

/// Strip the trailing separator libgit2 leaves on work directories.
fn normalize(dir: &Path) -> PathBuf {
    dir.components().collect()
}

fn convert_status(status: Status) -> StatusFlags {
    const PAIRS: [(Status, StatusFlags); 12] = [
        (Status::INDEX_NEW, StatusFlags::INDEX_NEW),
        (Status::INDEX_MODIFIED, StatusFlags::INDEX_MODIFIED),
        (Status::INDEX_DELETED, StatusFlags::INDEX_DELETED),
        (Status::INDEX_RENAMED, StatusFlags::INDEX_RENAMED),
        (Status::INDEX_TYPECHANGE, StatusFlags::INDEX_TYPECHANGE),
        (Status::WT_NEW, StatusFlags::WT_NEW),
        (Status::WT_MODIFIED, StatusFlags::WT_MODIFIED),
        (Status::WT_DELETED, StatusFlags::WT_DELETED),
        (Status::WT_TYPECHANGE, StatusFlags::WT_TYPECHANGE),
        (Status::WT_RENAMED, StatusFlags::WT_RENAMED),
        (Status::IGNORED, StatusFlags::IGNORED),
        (Status::CONFLICTED, StatusFlags::CONFLICTED),
    ];

    PAIRS
        .iter()
        .filter(|(native, _)| status.contains(*native))
        .fold(StatusFlags::empty(), |acc, (_, flags)| acc | *flags)
}
