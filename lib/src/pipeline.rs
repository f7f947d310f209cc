use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::{Duration, Instant};

use crate::assets::{self, StyleReport};
use crate::clean;
use crate::config::{Config, Settings};
use crate::dispatch;
use crate::error::{Chainable, Error, Failure, Result};
use crate::pages::{self, PageOutcome, PageRenderer};
use crate::staging::StagingArea;
use crate::templating::{minijinja::MiniJinjaEngine, TemplateRegistry};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BuildMode {
    /// Build, then swap the result into the live output directory.
    #[default]
    Production,
    /// Build, then keep the staging directory for inspection.
    Development,
}

impl FromStr for BuildMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "production" | "prod" => Ok(BuildMode::Production),
            "development" | "dev" => Ok(BuildMode::Development),
            _ => err! {
                "unknown build mode",
                "mode" => s,
                "help" => "expected `production` or `development`",
            },
        }
    }
}

impl fmt::Display for BuildMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BuildMode::Production => f.write_str("production"),
            BuildMode::Development => f.write_str("development"),
        }
    }
}

/// Directory and file names of a project. These are a stable contract with
/// site authors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    pub templates: &'static str,
    pub pages: &'static str,
    pub posts: &'static str,
    pub images: &'static str,
    pub styles: &'static str,
    pub staged_images: &'static str,
    pub staged_styles: &'static str,
    pub staged_posts: &'static str,
    pub source_exts: &'static [&'static str],
    pub internal_prefix: &'static str,
}

impl Default for Layout {
    fn default() -> Self {
        Layout {
            templates: "_templates",
            pages: "_pages",
            posts: "_posts",
            images: "_static/images",
            styles: "_static/styles",
            staged_images: "images",
            staged_styles: "styles",
            staged_posts: "posts",
            source_exts: &["md", "markdown"],
            internal_prefix: "_",
        }
    }
}

/// Everything a build needs to know, fixed for its duration.
#[derive(Debug, Clone)]
pub struct BuildContext {
    pub root: PathBuf,
    pub mode: BuildMode,
    pub layout: Layout,
    pub config: Config,
    pub settings: Settings,
}

impl BuildContext {
    /// Loads the project at `root` with an explicit build mode.
    pub fn new(root: &Path, mode: BuildMode) -> Result<Self> {
        Self::load(root, Some(mode))
    }

    /// Loads the project at `root`. Without an explicit `mode`, `build.mode`
    /// from the configuration is used, then [`BuildMode::Production`].
    pub fn load(root: &Path, mode: Option<BuildMode>) -> Result<Self> {
        let root = root.canonicalize().chain_with(|| error! {
            "project root is not accessible",
            "path" => root.display(),
        })?;

        if !root.is_dir() {
            return err!("project root is not a directory", "path" => root.display());
        }

        let config = Config::load(&root)?;
        let settings = Settings::from_config(&config)?;
        let mode = match (mode, settings.mode.as_deref()) {
            (Some(mode), _) => mode,
            (None, Some(configured)) => configured.parse::<BuildMode>().chain(error!("invalid `build.mode`"))?,
            (None, None) => BuildMode::default(),
        };

        Ok(BuildContext { root, mode, layout: Layout::default(), config, settings })
    }

    /// The path of a source directory or file in the project.
    pub fn source<P: AsRef<Path>>(&self, subpath: P) -> PathBuf {
        self.root.join(subpath)
    }

    /// The live output directory.
    pub fn output_dir(&self) -> PathBuf {
        self.root.join(&self.settings.output)
    }

    /// Where the next live output is assembled before it is swapped in.
    pub fn next_dir(&self) -> PathBuf {
        self.root.join(format!("{}_new", self.settings.output))
    }

    /// Where the previous live output waits while the new one is swapped in.
    pub fn retired_dir(&self) -> PathBuf {
        self.root.join(format!("{}_old", self.settings.output))
    }
}

/// What a finished build produced.
#[derive(Debug, Clone)]
pub struct Summary {
    pub mode: BuildMode,
    pub pages_written: usize,
    pub pages_skipped: usize,
    pub images: usize,
    pub stylesheets: usize,
    /// The live output directory, or the kept staging directory.
    pub location: PathBuf,
    pub elapsed: Duration,
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} build finished in {:.2?}", self.mode, self.elapsed)?;
        writeln!(f, "  pages:       {} written, {} skipped", self.pages_written, self.pages_skipped)?;
        writeln!(f, "  images:      {}", self.images)?;
        writeln!(f, "  stylesheets: {}", self.stylesheets)?;
        match self.mode {
            BuildMode::Production => write!(f, "  live output: {}", self.location.display()),
            BuildMode::Development => write!(f, "  staging:     {}", self.location.display()),
        }
    }
}

/// Runs a whole build: stage everything, then dispatch or keep the staging
/// directory depending on the mode.
///
/// Returning [`Failure::Aborted`] guarantees the live output is unchanged.
pub fn build(ctx: &BuildContext) -> Result<Summary, Failure> {
    let start = Instant::now();
    tracing::info!(mode = %ctx.mode, root = %ctx.root.display(), "starting build");

    let staging = StagingArea::create(&ctx.root)?;
    let registry = TemplateRegistry::load::<MiniJinjaEngine>(ctx, &staging)?;
    let images = assets::collect_images(ctx)?;

    let (staged_assets, rendered) = rayon::join(
        || -> Result<(usize, StyleReport)> {
            let images = assets::copy_images(&staging, &images)?;
            let styles = assets::build_styles(ctx, &staging)?;
            Ok((images, styles))
        },
        || PageRenderer::new(ctx, &staging, &registry, &images.images).render_all(),
    );

    let ((image_count, styles), outcomes) = match (staged_assets, rendered) {
        (Ok(assets), Ok(outcomes)) => (assets, outcomes),
        (Ok(_), Err(e)) | (Err(e), Ok(_)) => return Err(e.into()),
        (Err(e1), Err(e2)) => return Err(e1.chain(e2).into()),
    };

    pages::build_posts(ctx, &staging)?;
    clean::clean(ctx, &staging)?;

    let location = match ctx.mode {
        BuildMode::Production => dispatch::dispatch(ctx, staging)?.live,
        BuildMode::Development => {
            let path = staging.persist();
            tracing::info!(path = %path.display(), "kept staging directory");
            path
        }
    };

    let skipped = outcomes.iter().filter(|o| matches!(o, PageOutcome::Skipped { .. })).count();
    let summary = Summary {
        mode: ctx.mode,
        pages_written: outcomes.len() - skipped,
        pages_skipped: skipped,
        images: image_count,
        stylesheets: styles.compiled + styles.copied - styles.overridden,
        location,
        elapsed: start.elapsed(),
    };

    tracing::info!(
        written = summary.pages_written,
        skipped = summary.pages_skipped,
        elapsed_ms = summary.elapsed.as_millis() as u64,
        "build finished",
    );

    Ok(summary)
}
