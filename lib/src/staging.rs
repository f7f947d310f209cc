use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

use crate::error::{Chainable, Result};
use crate::value::Sink;

/// Prefix of staging directory names in the project root.
pub const STAGING_PREFIX: &str = "_tmp_";

/// The private directory a build is assembled in.
///
/// Created empty, with owner-only permissions and a random name, inside the
/// project root so that promotion can use same-filesystem renames. Dropping a
/// `StagingArea` removes the directory, which is what makes every pre-dispatch
/// failure safe to abort; call [`StagingArea::persist()`] to keep it.
#[derive(Debug)]
pub struct StagingArea {
    dir: TempDir,
}

impl StagingArea {
    pub fn create(root: &Path) -> Result<Self> {
        let mut builder = tempfile::Builder::new();
        builder.prefix(STAGING_PREFIX).rand_bytes(8);

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            builder.permissions(fs::Permissions::from_mode(0o700));
        }

        let dir = builder.tempdir_in(root)
            .chain_with(|| error! {
                "failed to create staging directory",
                "project root" => root.display(),
            })?;

        tracing::debug!(path = %dir.path().display(), "created staging directory");
        Ok(StagingArea { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn join<P: AsRef<Path>>(&self, subpath: P) -> PathBuf {
        self.path().join(subpath)
    }

    /// Creates `subpath` and any missing parents.
    pub fn create_dir_all<P: AsRef<Path>>(&self, subpath: P) -> Result<PathBuf> {
        let path = self.join(subpath);
        fs::create_dir_all(&path).chain_with(|| error! {
            "failed to create staging subdirectory",
            "path" => path.display(),
        })?;

        Ok(path)
    }

    /// Copies the file at `source` into the `subpath` directory of the staging
    /// tree, keeping its file name.
    pub fn copy_into<P: AsRef<Path>>(&self, source: &Path, subpath: P) -> Result<PathBuf> {
        let dir = self.create_dir_all(subpath)?;
        let file_name = source.file_name().ok_or_else(|| error! {
            "staged file has no file name",
            "source path" => source.display(),
        })?;

        let target = dir.join(file_name);
        fs::copy(source, &target).chain_with(|| error! {
            "failed to copy file into staging",
            "source path" => source.display(),
            "destination path" => target.display(),
        })?;

        Ok(target)
    }

    /// Writes `contents` to `subpath`, creating parent directories.
    pub fn write<P: AsRef<Path>>(&self, subpath: P, contents: String) -> Result<PathBuf> {
        let target = self.join(subpath);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).chain_with(|| error! {
                "failed to create staging subdirectory",
                "path" => parent.display(),
            })?;
        }

        target.as_path().write(contents)?;
        Ok(target)
    }

    /// Removes the staging directory. Failure only leaves an orphaned
    /// directory behind, so it is logged rather than returned.
    pub fn destroy(self) {
        let path = self.path().to_path_buf();
        match self.dir.close() {
            Ok(()) => tracing::debug!(path = %path.display(), "removed staging directory"),
            Err(e) => tracing::warn!(path = %path.display(), error = %e, "failed to remove staging directory"),
        }
    }

    /// Keeps the staging directory on disk and returns its path.
    pub fn persist(self) -> PathBuf {
        self.dir.keep()
    }
}
