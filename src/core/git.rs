use crate::core::error::{PruneError, Result};
use git2::{ErrorCode, Repository};
use std::path::{Path, PathBuf};
use std::process::Command;
use std::thread;
use std::time::{Duration, Instant};

const LOCK_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Trait defining the version-control operations the engine needs.
/// This abstraction lets tests swap in a fake that records calls instead of
/// touching a real repository.
pub trait VcsClient {
    /// Stages a single file (adds its current content to the index).
    fn stage(&self, path: &Path) -> Result<()>;

    /// Records the staged changes as a new commit.
    fn commit(&self, message: &str) -> Result<()>;
}

/// Which `VcsClient` implementation a run uses.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum Backend {
    /// Run the `git` executable.
    #[default]
    Cli,
    /// Use libgit2 in-process.
    Libgit2,
}

impl Backend {
    /// Opens the repository containing `start` with this backend.
    pub fn open(self, start: &Path, lock_timeout: Duration) -> Result<Box<dyn VcsClient>> {
        Ok(match self {
            Backend::Cli => Box::new(GitCliClient::new(start, lock_timeout)?),
            Backend::Libgit2 => Box::new(Git2Client::new(start, lock_timeout)?),
        })
    }
}

/// Blocks until `<git_dir>/index.lock` is gone, or fails after `timeout`.
///
/// Another git process (an editor integration, a hook, a previous command
/// still exiting) holding the lock would otherwise make `add` or `commit`
/// fail outright.
pub fn wait_for_index_lock(git_dir: &Path, timeout: Duration) -> Result<()> {
    let lock = git_dir.join("index.lock");
    let started = Instant::now();
    while lock.exists() {
        if started.elapsed() >= timeout {
            return Err(PruneError::LockTimeout { path: lock });
        }
        tracing::debug!(path = %lock.display(), "Waiting for index lock");
        thread::sleep(LOCK_POLL_INTERVAL);
    }
    Ok(())
}

fn discover(start: &Path) -> Result<Repository> {
    Repository::discover(start).map_err(|e| PruneError::VersionControl {
        operation: "open",
        detail: format!("{}: {}", start.display(), e.message()),
    })
}

/// Shells out to the `git` executable, exactly as an operator would.
pub struct GitCliClient {
    git_dir: PathBuf,
    work_tree: PathBuf,
    lock_timeout: Duration,
}

impl GitCliClient {
    /// Locates the repository that contains `start`.
    pub fn new(start: &Path, lock_timeout: Duration) -> Result<Self> {
        let repo = discover(start)?;
        let work_tree = repo.workdir().unwrap_or_else(|| repo.path()).to_path_buf();
        Ok(Self {
            git_dir: repo.path().to_path_buf(),
            work_tree,
            lock_timeout,
        })
    }

    fn run(&self, operation: &'static str, cwd: &Path, args: &[&str]) -> Result<()> {
        wait_for_index_lock(&self.git_dir, self.lock_timeout)?;
        tracing::debug!(?args, cwd = %cwd.display(), "Running git");

        let output = Command::new("git")
            .args(args)
            .current_dir(cwd)
            .output()
            .map_err(|e| PruneError::VersionControl {
                operation,
                detail: format!("failed to run git: {e}"),
            })?;

        if output.status.success() {
            return Ok(());
        }
        let stderr = String::from_utf8_lossy(&output.stderr);
        let stdout = String::from_utf8_lossy(&output.stdout);
        let message = if stderr.trim().is_empty() { stdout } else { stderr };
        Err(PruneError::VersionControl {
            operation,
            detail: format!("{}: {}", output.status, message.trim()),
        })
    }
}

impl VcsClient for GitCliClient {
    fn stage(&self, path: &Path) -> Result<()> {
        let cwd = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| PruneError::VersionControl {
                operation: "add",
                detail: format!("unsupported path {}", path.display()),
            })?;
        self.run("add", cwd, &["add", "--", name])
    }

    fn commit(&self, message: &str) -> Result<()> {
        self.run("commit", &self.work_tree, &["commit", "-m", message])
    }
}

/// Implementation of `VcsClient` on top of libgit2.
pub struct Git2Client {
    repo: Repository,
    lock_timeout: Duration,
}

impl Git2Client {
    pub fn new(start: &Path, lock_timeout: Duration) -> Result<Self> {
        Ok(Self {
            repo: discover(start)?,
            lock_timeout,
        })
    }

    /// Path of `path` relative to the working tree, as the index wants it.
    fn relative_to_workdir(&self, path: &Path) -> Result<PathBuf> {
        let workdir = self.repo.workdir().ok_or_else(|| PruneError::VersionControl {
            operation: "add",
            detail: "repository has no working tree".to_string(),
        })?;
        let workdir = workdir.canonicalize().map_err(|e| PruneError::io(workdir, e))?;
        let full = path.canonicalize().map_err(|e| PruneError::io(path, e))?;
        full.strip_prefix(&workdir)
            .map(Path::to_path_buf)
            .map_err(|_| PruneError::VersionControl {
                operation: "add",
                detail: format!("{} is outside the repository", path.display()),
            })
    }
}

impl VcsClient for Git2Client {
    fn stage(&self, path: &Path) -> Result<()> {
        wait_for_index_lock(self.repo.path(), self.lock_timeout)?;
        let relative = self.relative_to_workdir(path)?;
        let mut index = self.repo.index()?;
        index.add_path(&relative)?;
        index.write()?;
        Ok(())
    }

    fn commit(&self, message: &str) -> Result<()> {
        wait_for_index_lock(self.repo.path(), self.lock_timeout)?;
        let mut index = self.repo.index()?;
        let tree_id = index.write_tree()?;
        let tree = self.repo.find_tree(tree_id)?;

        let parent = match self.repo.head() {
            Ok(head) => Some(head.peel_to_commit()?),
            Err(e) if matches!(e.code(), ErrorCode::UnbornBranch | ErrorCode::NotFound) => None,
            Err(e) => return Err(e.into()),
        };

        // Mirror `git commit`: refuse to record a commit that changes nothing.
        if parent.as_ref().is_some_and(|p| p.tree_id() == tree_id) {
            return Err(PruneError::VersionControl {
                operation: "commit",
                detail: "nothing to commit".to_string(),
            });
        }

        let signature = self.repo.signature()?;
        let parents: Vec<&git2::Commit<'_>> = parent.iter().collect();
        let id = self
            .repo
            .commit(Some("HEAD"), &signature, &signature, message, &tree, &parents)?;
        tracing::debug!(commit = %id, "Created commit");
        Ok(())
    }
}
