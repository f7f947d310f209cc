use std::ffi::OsString;
use std::path::{Path, PathBuf};

use rayon::prelude::*;

use crate::assets::Images;
use crate::error::{Chainable, Result};
use crate::fstree::{Entry, FsTree};
use crate::markdown::{FrontMatter, Markdown, Normalize};
use crate::metadata::{Metadata, Template};
use crate::minify::Minifier;
use crate::pipeline::BuildContext;
use crate::staging::StagingArea;
use crate::templating::{Rendered, TemplateRegistry};
use crate::util::PathExt;
use crate::value::Source;

/// One content page, split into front matter and markdown body.
#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    /// Path relative to the pages directory, without its extension.
    pub path: PathBuf,
    pub metadata: Metadata,
    pub body: String,
}

impl Page {
    /// Parses the content file at `relative`. Every error returned here is a
    /// problem with the page itself, not with the build.
    pub fn parse(relative: &Path, source: &str) -> Result<Self> {
        let Some(front_matter) = FrontMatter::parse(source)? else {
            return err!("page has no front matter");
        };

        let metadata = Metadata::new(front_matter.metadata);
        metadata.require(Template)?;
        Ok(Page {
            path: relative.without_extension().into_owned(),
            metadata,
            body: front_matter.body.to_string(),
        })
    }

    pub fn template(&self) -> Result<std::sync::Arc<str>> {
        self.metadata.require(Template)
    }

    /// `<path>.html`, keeping any dots in the file stem.
    pub fn output_path(&self) -> PathBuf {
        let mut path = OsString::from(self.path.as_os_str());
        path.push(".html");
        PathBuf::from(path)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageOutcome {
    /// The page was rendered to this staging-relative path.
    Written(PathBuf),
    /// The page was left out of the build.
    Skipped { path: PathBuf, reason: String },
}

/// Renders every content page into the staging area.
#[derive(Debug)]
pub struct PageRenderer<'a> {
    ctx: &'a BuildContext,
    staging: &'a StagingArea,
    registry: &'a TemplateRegistry,
    images: &'a Images,
    minifier: Option<Minifier>,
}

impl<'a> PageRenderer<'a> {
    pub fn new(
        ctx: &'a BuildContext,
        staging: &'a StagingArea,
        registry: &'a TemplateRegistry,
        images: &'a Images,
    ) -> Self {
        let minifier = ctx.settings.minify.then(Minifier::new);
        PageRenderer { ctx, staging, registry, images, minifier }
    }

    pub fn render_all(&self) -> Result<Vec<PageOutcome>> {
        let source = self.ctx.source(self.ctx.layout.pages);
        let Some(tree) = FsTree::scan(&source)? else {
            return err! {
                "pages directory not found",
                "path" => source.display(),
                "help" => "create it and add at least one markdown page",
            };
        };

        let exts = self.ctx.layout.source_exts;
        let entries: Vec<&Entry> = tree.files().filter(|e| e.has_ext(exts)).collect();
        tracing::info!(count = entries.len(), "rendering pages");

        let outcomes = crate::time!("page rendering" => match self.ctx.settings.parallel {
            true => entries.par_iter().map(|e| self.render(e)).collect::<Result<Vec<_>>>(),
            false => entries.iter().map(|e| self.render(e)).collect::<Result<Vec<_>>>(),
        })?;

        Ok(outcomes)
    }

    /// Renders one content file. Front matter and template resolution
    /// problems skip the page; anything else is an error.
    pub fn render(&self, entry: &Entry) -> Result<PageOutcome> {
        let relative = entry.relative_path();
        let subdir = relative.parent().unwrap_or(Path::new(""));
        self.staging.copy_into(&entry.path, subdir)?;

        let source = entry.read()?;
        let page = match Page::parse(relative, &source) {
            Ok(page) => page,
            Err(e) => {
                tracing::error!(page = %relative.display(), "skipping page: {}", e.message());
                return Ok(PageOutcome::Skipped { path: relative.to_path_buf(), reason: e.message() });
            }
        };

        let template = page.template()?;
        let content = Markdown::from(page.body.as_str())
            .plugin(Normalize)
            .run()
            .chain_with(|| error!("failed to render markdown", "page" => relative.display()))?;

        let html = match self.registry.render(&template, &content, page.metadata.as_dict(), self.images) {
            Ok(Rendered::Ok(html)) => html,
            Ok(Rendered::TemplateNotFound(name)) => {
                tracing::error!(page = %relative.display(), template = %name, "skipping page: template not found");
                let reason = format!("template `{name}` not found");
                return Ok(PageOutcome::Skipped { path: relative.to_path_buf(), reason });
            }
            Err(e) => return Err(e).chain_with(|| error! {
                "failed to render page",
                "page" => relative.display(),
                "template" => &template,
            }),
        };

        let html = match &self.minifier {
            Some(minifier) => minifier.minify(&html)?,
            None => html,
        };

        let output = page.output_path();
        self.staging.write(&output, html)?;
        tracing::debug!(page = %relative.display(), output = %output.display(), "rendered page");
        Ok(PageOutcome::Written(output))
    }
}

/// Ensures the staged `posts/` directory exists, keeping any pages already
/// rendered into it. Posts are not published yet; returns how many source
/// files were left out.
pub fn build_posts(ctx: &BuildContext, staging: &StagingArea) -> Result<usize> {
    staging.create_dir_all(ctx.layout.staged_posts)?;

    let source = ctx.source(ctx.layout.posts);
    let ignored = match FsTree::scan(&source)? {
        Some(tree) => tree.files().count(),
        None => 0,
    };

    if ignored > 0 {
        tracing::info!(count = ignored, "posts are not published yet; ignoring them");
    }

    Ok(ignored)
}
