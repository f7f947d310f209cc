use std::fs;

use crate::error::{Chainable, Result};
use crate::fstree::FsTree;
use crate::pipeline::BuildContext;
use crate::staging::StagingArea;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CleanReport {
    pub dirs: usize,
    pub files: usize,
}

/// Strips build inputs from the staging tree so that only publishable output
/// remains: top-level internal (`_`-prefixed) directories, and content
/// sources at any depth.
pub fn clean(ctx: &BuildContext, staging: &StagingArea) -> Result<CleanReport> {
    let mut report = CleanReport::default();
    let tree = FsTree::build(staging.path())?;

    for entry in tree.top_level() {
        if entry.metadata.is_dir() && entry.file_name.starts_with(ctx.layout.internal_prefix) {
            fs::remove_dir_all(&entry.path).chain_with(|| error! {
                "failed to remove internal directory from staging",
                "path" => entry.path.display(),
            })?;

            tracing::debug!(path = %entry.path.display(), "removed internal directory");
            report.dirs += 1;
        }
    }

    for entry in tree.files().filter(|e| e.has_ext(ctx.layout.source_exts)) {
        if !entry.path.exists() {
            continue;
        }

        fs::remove_file(&entry.path).chain_with(|| error! {
            "failed to remove source file from staging",
            "path" => entry.path.display(),
        })?;

        report.files += 1;
    }

    tracing::info!(dirs = report.dirs, files = report.files, "cleaned staging directory");
    Ok(report)
}
