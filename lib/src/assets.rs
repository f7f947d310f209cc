use std::sync::Arc;
use std::path::PathBuf;

use crate::error::{Chainable, Result};
use crate::fstree::{Entry, FsTree};
use crate::pipeline::BuildContext;
use crate::staging::StagingArea;
use crate::util::PathExt;
use crate::value::Dict;

/// Logical image name (its path below the images source directory) to the
/// site-relative path it is published at.
pub type Images = Dict<Arc<str>, Arc<str>>;

const SASS_EXTS: &[&str] = &["scss", "sass"];
const CSS_EXTS: &[&str] = &["css"];

/// The image sources of one build.
#[derive(Debug, Default)]
pub struct ImageSet {
    pub images: Images,
    sources: Vec<(PathBuf, PathBuf)>,
}

/// Indexes every file below the images source directory. A project without
/// one simply has no images.
pub fn collect_images(ctx: &BuildContext) -> Result<ImageSet> {
    let source = ctx.source(ctx.layout.images);
    let Some(tree) = FsTree::scan(&source)? else {
        tracing::info!(path = %source.display(), "no images directory; continuing without images");
        return Ok(ImageSet::default());
    };

    let mut set = ImageSet::default();
    for entry in tree.files() {
        let relative = entry.relative_path();
        let name = relative.to_slash_lossy();
        let published = format!("{}/{name}", ctx.layout.staged_images);
        let subdir = PathBuf::from(ctx.layout.staged_images)
            .join(relative.parent().unwrap_or(relative));

        set.images.insert(name.into(), published.into());
        set.sources.push((entry.path.to_path_buf(), subdir));
    }

    tracing::info!(count = set.images.len(), "loaded references to images");
    Ok(set)
}

/// Copies every image verbatim into the staged images directory.
pub fn copy_images(staging: &StagingArea, images: &ImageSet) -> Result<usize> {
    for (source, subdir) in &images.sources {
        staging.copy_into(source, subdir).chain(error!("failed to stage image"))?;
        tracing::debug!(path = %source.display(), "staged image");
    }

    Ok(images.sources.len())
}

impl ImageSet {
    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }
}

/// Counts of stylesheets produced by [`build_styles()`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct StyleReport {
    pub compiled: usize,
    pub copied: usize,
    pub overridden: usize,
}

/// Populates the staged `styles/` directory. Pages may render into the same
/// directory concurrently, so existing files in it are left alone.
///
/// Sass sources are compiled first. Plain `.css` sources are copied after,
/// so a plain stylesheet replaces compiled output with the same name.
pub fn build_styles(ctx: &BuildContext, staging: &StagingArea) -> Result<StyleReport> {
    let output = staging.create_dir_all(ctx.layout.staged_styles)?;
    let source = ctx.source(ctx.layout.styles);
    let Some(tree) = FsTree::scan(&source)? else {
        tracing::info!(path = %source.display(), "no styles directory; continuing without stylesheets");
        return Ok(StyleReport::default());
    };

    let mut report = StyleReport::default();
    let is_partial = |e: &Entry| e.file_name.starts_with('_');
    let sass: Vec<&Entry> = tree.top_level()
        .filter(|e| e.metadata.is_file() && e.has_ext(SASS_EXTS) && !is_partial(e))
        .collect();

    for entry in sass {
        let css = compile_sass(entry)?;
        let target = output.join(format!("{}.css", entry.file_stem()));
        staging.write(&target, css)?;
        tracing::debug!(source = %entry.path.display(), "compiled stylesheet");
        report.compiled += 1;
    }

    for entry in tree.top_level().filter(|e| e.metadata.is_file() && e.has_ext(CSS_EXTS)) {
        if output.join(&entry.file_name).exists() {
            tracing::debug!(file = %entry.file_name, "plain stylesheet replaces compiled output");
            report.overridden += 1;
        }

        staging.copy_into(&entry.path, ctx.layout.staged_styles)?;
        report.copied += 1;
    }

    tracing::info!(compiled = report.compiled, copied = report.copied, "built stylesheets");
    Ok(report)
}

#[cfg(feature = "sass")]
fn compile_sass(entry: &Entry) -> Result<String> {
    use crate::value::{Grass, Mapper};

    Grass::default().map(entry).chain_with(|| error! {
        "stylesheet compilation failed",
        "path" => entry.path.display(),
    })
}

#[cfg(not(feature = "sass"))]
fn compile_sass(entry: &Entry) -> Result<String> {
    err! {
        "found a sass stylesheet but sass support is disabled",
        "path" => entry.path.display(),
        "help" => "enable the `sass` feature",
    }
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::Path;

    use super::*;
    use crate::pipeline::BuildMode;

    fn project() -> (tempfile::TempDir, BuildContext) {
        let root = tempfile::tempdir().unwrap();
        let ctx = BuildContext::new(root.path(), BuildMode::Development).unwrap();
        (root, ctx)
    }

    fn write(root: &Path, path: &str, contents: &str) {
        let path = root.join(path);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }

    #[test]
    fn missing_images_directory_is_empty() {
        let (_root, ctx) = project();
        let images = collect_images(&ctx).unwrap();
        assert!(images.is_empty());
    }

    #[test]
    fn images_are_indexed_and_copied() {
        let (root, ctx) = project();
        write(root.path(), "_static/images/logo.png", "png");
        write(root.path(), "_static/images/icons/star.svg", "svg");

        let images = collect_images(&ctx).unwrap();
        assert_eq!(images.images.get("logo.png").map(|s| &**s), Some("images/logo.png"));
        assert_eq!(images.images.get("icons/star.svg").map(|s| &**s), Some("images/icons/star.svg"));

        let staging = StagingArea::create(root.path()).unwrap();
        assert_eq!(copy_images(&staging, &images).unwrap(), 2);
        assert_eq!(fs::read_to_string(staging.join("images/icons/star.svg")).unwrap(), "svg");
    }

    #[test]
    fn missing_styles_directory_still_creates_output() {
        let (root, ctx) = project();
        let staging = StagingArea::create(root.path()).unwrap();
        assert_eq!(build_styles(&ctx, &staging).unwrap(), StyleReport::default());
        assert!(staging.join("styles").is_dir());
    }

    #[test]
    fn rendered_pages_in_styles_survive() {
        let (root, ctx) = project();
        write(root.path(), "_static/styles/site.css", "body{}");

        let staging = StagingArea::create(root.path()).unwrap();
        staging.write("styles/guide.html", "<p>guide</p>".into()).unwrap();
        build_styles(&ctx, &staging).unwrap();

        assert_eq!(fs::read_to_string(staging.join("styles/guide.html")).unwrap(), "<p>guide</p>");
        assert!(staging.join("styles/site.css").is_file());
    }

    #[cfg(feature = "sass")]
    #[test]
    fn plain_css_wins_over_compiled() {
        let (root, ctx) = project();
        write(root.path(), "_static/styles/a.scss", "$c: red;\nbody { color: $c; }\n");
        write(root.path(), "_static/styles/a.css", "body{color:blue}");
        write(root.path(), "_static/styles/b.scss", "@use 'vars';\np { color: vars.$c; }\n");
        write(root.path(), "_static/styles/_vars.scss", "$c: green;\n");

        let staging = StagingArea::create(root.path()).unwrap();
        let report = build_styles(&ctx, &staging).unwrap();
        assert_eq!(report, StyleReport { compiled: 2, copied: 1, overridden: 1 });

        assert_eq!(fs::read_to_string(staging.join("styles/a.css")).unwrap(), "body{color:blue}");
        assert!(fs::read_to_string(staging.join("styles/b.css")).unwrap().contains("green"));
        assert!(!staging.join("styles/_vars.css").exists());
    }

    #[cfg(feature = "sass")]
    #[test]
    fn broken_sass_is_fatal() {
        let (root, ctx) = project();
        write(root.path(), "_static/styles/bad.scss", "body { color: ; ");

        let staging = StagingArea::create(root.path()).unwrap();
        assert!(build_styles(&ctx, &staging).is_err());
    }
}
