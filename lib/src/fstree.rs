use std::sync::Arc;
use std::path::{Path, PathBuf};
use std::collections::BTreeMap;
use std::{fs, fmt};

use rustc_hash::FxHashMap;

use crate::error::{Chainable, Result};

#[derive(Copy, Clone, PartialEq, Eq, Hash)]
pub struct EntryId(pub(crate) usize);

/// A snapshot of a directory tree, in sorted depth-first order.
///
/// Parents always precede their children, so replaying the entries in order
/// recreates the tree.
#[derive(Debug)]
pub struct FsTree {
    entries: Vec<Entry>,
    map: FxHashMap<Arc<Path>, EntryId>,
}

#[derive(Debug)]
pub struct Entry {
    pub id: EntryId,
    pub path: Arc<Path>,
    pub metadata: fs::Metadata,
    pub file_name: String,
    pub file_type: fs::FileType,
    pub parent: Option<EntryId>,
    pub children: Vec<EntryId>,
    pub depth: usize,
}

#[derive(Default, Debug)]
struct FsMetadata(Option<fs::Metadata>);

impl FsTree {
    fn new() -> Self {
        Self {
            map: FxHashMap::default(),
            entries: vec![],
        }
    }

    pub fn build<P: AsRef<Path>>(root: P) -> Result<Self> {
        use jwalk::{Parallelism, WalkDirGeneric};

        // Trees are built inside rayon tasks, where walking on the pool can stall.
        let root = root.as_ref();
        let walker = WalkDirGeneric::<FsMetadata>::new(root)
            .parallelism(Parallelism::Serial)
            .follow_links(true)
            .sort(true)
            .process_read_dir(|_, _, _, entries| {
                entries.iter_mut()
                    .filter_map(|e| e.as_mut().ok())
                    .for_each(|e| e.client_state = FsMetadata(e.metadata().ok()))
            });

        let mut tree = FsTree::new();
        for entry in walker {
            let entry = entry.map_err(|e| error! {
                "failed to walk directory tree",
                "search root" => root.display(),
                e,
            })?;

            // The root is yielded without client state; stat it directly.
            if entry.depth == 0 {
                let metadata = fs::metadata(root).chain_with(|| error! {
                    "failed to read directory metadata",
                    "path" => root.display(),
                })?;

                tree.insert(entry, metadata);
            } else if let Some(metadata) = entry.client_state.0.clone() {
                tree.insert(entry, metadata);
            }
        }

        if tree.len() == 0 {
            return err! {
                "file system tree discovery yielded zero entries",
                "search root" => root.display(),
            }
        }

        Ok(tree)
    }

    /// Like [`FsTree::build()`], but an absent `root` yields `Ok(None)`.
    pub fn scan<P: AsRef<Path>>(root: P) -> Result<Option<Self>> {
        let root = root.as_ref();
        match fs::metadata(root) {
            Ok(meta) if meta.is_dir() => Self::build(root).map(Some),
            Ok(_) => err! {
                "expected a directory",
                "path" => root.display(),
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e).chain(error! {
                "failed to read directory metadata",
                "path" => root.display(),
            }),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn root(&self) -> &Entry {
        &self[self.root_id()]
    }

    pub fn root_id(&self) -> EntryId {
        EntryId(0)
    }

    #[inline]
    pub fn get<P: AsRef<Path>>(&self, path: P) -> Option<&Entry> {
        let full_path = self.root().path.join(path.as_ref());
        self.map.get(&*full_path).map(|&id| &self[id])
    }

    pub fn iter(&self) -> impl Iterator<Item = &Entry> {
        self.entries.iter()
    }

    /// Every regular file in the tree, in walk order.
    pub fn files(&self) -> impl Iterator<Item = &Entry> {
        self.iter().filter(|e| e.metadata.is_file())
    }

    /// The direct children of the root.
    pub fn top_level(&self) -> impl Iterator<Item = &Entry> {
        self.root().children.iter().map(|&id| &self[id])
    }

    /// Recreates this tree under `dest`, which must already exist. Returns
    /// the number of files copied.
    pub fn copy_to<P: AsRef<Path>>(&self, dest: P) -> Result<usize> {
        let dest = dest.as_ref();
        let mut copied = 0;
        for entry in self.iter().skip(1) {
            let target = dest.join(entry.relative_path());
            if entry.metadata.is_dir() {
                fs::create_dir_all(&target).chain_with(|| error! {
                    "failed to create directory",
                    "path" => target.display(),
                })?;
            } else if entry.metadata.is_file() {
                fs::copy(&entry.path, &target).chain_with(|| error! {
                    "failed to copy file",
                    "source path" => entry.path.display(),
                    "destination path" => target.display(),
                })?;

                copied += 1;
            }
        }

        Ok(copied)
    }

    /// Relative path to size for every file in the tree.
    pub fn manifest(&self) -> BTreeMap<PathBuf, u64> {
        self.files()
            .map(|e| (e.relative_path().to_path_buf(), e.metadata.len()))
            .collect()
    }

    fn insert(&mut self, entry: jwalk::DirEntry<FsMetadata>, metadata: fs::Metadata) -> EntryId {
        let entry = Entry {
            id: EntryId(self.entries.len()),
            path: Arc::from(entry.path().into_boxed_path()),
            file_type: metadata.file_type(),
            metadata,
            file_name: entry.file_name.to_string_lossy().into_owned(),
            parent: self.map.get(&entry.parent_path).cloned(),
            children: vec![],
            depth: entry.depth,
        };

        self.map.insert(entry.path.clone(), entry.id);
        if let Some(parent) = entry.parent {
            self.entries[parent.0].children.push(entry.id);
        }

        let id = entry.id;
        self.entries.push(entry);
        id
    }
}

impl Entry {
    /// File name without the extension.
    pub fn file_stem(&self) -> &str {
        match self.file_name.rsplit_once('.') {
            Some((left, _)) => left,
            None => &self.file_name,
        }
    }

    /// The final extension, if any.
    pub fn file_ext(&self) -> Option<&str> {
        self.file_name.rsplit_once('.').map(|(_, right)| right)
    }

    pub fn has_ext(&self, exts: &[&str]) -> bool {
        self.file_ext().map_or(false, |ext| exts.contains(&ext))
    }

    /// Path relative to the root of the tree `self` is in.
    pub fn relative_path(&self) -> &Path {
        let mut components = self.path.components();
        for _ in 0..(self.path.components().count() - self.depth) {
            components.next();
        }

        components.as_path()
    }
}

impl jwalk::ClientState for FsMetadata {
    type ReadDirState = ();
    type DirEntryState = Self;
}

impl std::ops::Index<EntryId> for FsTree {
    type Output = Entry;

    fn index(&self, index: EntryId) -> &Self::Output {
        &self.entries[index.0]
    }
}

impl fmt::Debug for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn copy_and_manifest_round_trip() {
        let src = tempfile::tempdir().unwrap();
        fs::create_dir_all(src.path().join("a/b")).unwrap();
        fs::write(src.path().join("top.txt"), "top").unwrap();
        fs::write(src.path().join("a/b/deep.txt"), "deeper").unwrap();

        let tree = FsTree::build(src.path()).unwrap();
        assert_eq!(tree.files().count(), 2);
        assert_eq!(tree.get("a/b/deep.txt").unwrap().file_stem(), "deep");

        let dest = tempfile::tempdir().unwrap();
        assert_eq!(tree.copy_to(dest.path()).unwrap(), 2);
        assert_eq!(fs::read_to_string(dest.path().join("a/b/deep.txt")).unwrap(), "deeper");

        let copy = FsTree::build(dest.path()).unwrap();
        assert_eq!(tree.manifest(), copy.manifest());
    }

    #[test]
    fn scan_tolerates_missing_dirs() {
        let root = tempfile::tempdir().unwrap();
        assert!(FsTree::scan(root.path().join("nope")).unwrap().is_none());

        fs::write(root.path().join("file"), "").unwrap();
        assert!(FsTree::scan(root.path().join("file")).is_err());
    }

    #[test]
    fn entry_names() {
        let root = tempfile::tempdir().unwrap();
        fs::write(root.path().join("about.markdown"), "").unwrap();

        let tree = FsTree::build(root.path()).unwrap();
        let entry = tree.files().next().unwrap();
        assert_eq!(entry.file_stem(), "about");
        assert!(entry.has_ext(&["md", "markdown"]));
        assert_eq!(entry.relative_path(), Path::new("about.markdown"));
        assert_eq!(tree.top_level().count(), 1);
    }
}
