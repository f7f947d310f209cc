mod macros;
mod path_ext;

pub use path_ext::*;
pub use macros::*;

use std::fs;
use std::io;
use std::path::Path;

/// Removes whatever is at `path`, directory or file. A missing path is not an
/// error.
pub fn remove_path(path: &Path) -> io::Result<()> {
    match fs::symlink_metadata(path) {
        Ok(meta) if meta.is_dir() => fs::remove_dir_all(path),
        Ok(_) => fs::remove_file(path),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}

/// Creates `path` if it doesn't exist. An existing directory is fine.
pub fn ensure_dir(path: &Path) -> io::Result<()> {
    match fs::create_dir(path) {
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists && path.is_dir() => Ok(()),
        result => result,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remove_path_handles_every_kind() {
        let root = tempfile::tempdir().unwrap();
        let dir = root.path().join("dir");
        let file = root.path().join("file");
        fs::create_dir_all(dir.join("nested")).unwrap();
        fs::write(&file, "x").unwrap();

        remove_path(&dir).unwrap();
        remove_path(&file).unwrap();
        remove_path(&root.path().join("missing")).unwrap();
        assert!(!dir.exists() && !file.exists());
    }

    #[test]
    fn ensure_dir_tolerates_existing() {
        let root = tempfile::tempdir().unwrap();
        let dir = root.path().join("live");
        ensure_dir(&dir).unwrap();
        ensure_dir(&dir).unwrap();

        let file = root.path().join("file");
        fs::write(&file, "x").unwrap();
        assert!(ensure_dir(&file).is_err());
    }
}
