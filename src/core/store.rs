use crate::core::error::{PruneError, Result};
use crate::core::lines::LineSet;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// The forwarding list on disk.
///
/// Every rewrite goes through a temporary sibling file that is synced and then
/// renamed over the target, so readers (and `git add`) only ever see the old
/// or the new content, never a partial write.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    path: PathBuf,
}

impl ConfigFile {
    /// Opens the target, failing with `ConfigNotFound` if it is absent.
    /// The stored path is canonical, so its parent is always a real directory.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if !path.is_file() {
            return Err(PruneError::ConfigNotFound { path });
        }
        let path = path.canonicalize().map_err(|e| PruneError::io(&path, e))?;
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Directory holding the file; git commands run from here.
    pub fn dir(&self) -> &Path {
        self.path.parent().unwrap_or_else(|| Path::new("."))
    }

    pub fn load(&self) -> Result<LineSet> {
        let content = fs::read_to_string(&self.path).map_err(|e| PruneError::io(&self.path, e))?;
        Ok(LineSet::parse(&content))
    }

    /// Replaces the file content with `lines`, returning only after the data
    /// and the rename have reached storage.
    pub fn write_durable(&self, lines: &LineSet) -> Result<()> {
        let dir = self.dir();
        let io_err = |e: std::io::Error| PruneError::io(&self.path, e);

        let permissions = fs::metadata(&self.path).map_err(io_err)?.permissions();
        let mut tmp = NamedTempFile::new_in(dir).map_err(io_err)?;
        tmp.write_all(lines.render().as_bytes()).map_err(io_err)?;
        tmp.flush().map_err(io_err)?;
        tmp.as_file().sync_all().map_err(io_err)?;
        fs::set_permissions(tmp.path(), permissions).map_err(io_err)?;
        tmp.persist(&self.path).map_err(|e| io_err(e.error))?;

        sync_dir(dir).map_err(io_err)?;
        tracing::trace!(path = %self.path.display(), lines = lines.len(), "Rewrote config file");
        Ok(())
    }
}

#[cfg(unix)]
fn sync_dir(dir: &Path) -> std::io::Result<()> {
    fs::File::open(dir)?.sync_all()
}

#[cfg(not(unix))]
fn sync_dir(_dir: &Path) -> std::io::Result<()> {
    Ok(())
}
