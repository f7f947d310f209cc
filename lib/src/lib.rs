#![doc = svgbobdoc::transform!(
//! Staged static site builds with atomic dispatch.
//!
//! # Overview
//!
//! Plover turns a project directory of templates, markdown pages, images and
//! stylesheets into a static web site. Every build is assembled in a private
//! staging directory first; the live output is only touched once the whole
//! site has been produced, and then only by renames.
//!
//! A project is laid out as follows:
//!
//! ```text
//! project/
//! ├── config.toml          optional
//! ├── _templates/          page.html, post.html, ...
//! ├── _pages/              about.md, blog/first.markdown, ...
//! ├── _posts/              reserved
//! ├── _static/
//! │   ├── images/
//! │   └── styles/          .scss/.sass compiled, .css copied
//! └── _website/            live output
//! ```
//!
//! ## Building
//!
//! ```svgbob
//!  +---------+   +-----------+   +--------+
//!  | staging |-->| templates |-->| images |
//!  +---------+   +-----------+   +---+----+
//!                                    |
//!                  +-----------------+-----------------+
//!                  |                                   |
//!            +-----+------+                       +----+---+
//!            | copy images|                       | pages  |
//!            | + styles   |                       |        |
//!            +-----+------+                       +----+---+
//!                  |                                   |
//!                  +-----------------+-----------------+
//!                                    |
//!                   +-------+   +----+----+   +----------+
//!                   | clean |<--+  posts  |   | dispatch |
//!                   +---+---+   +---------+   +----+-----+
//!                       |                          ^
//!                       +--------------------------+
//! ```
//!
//! Assets and pages are independent and run concurrently; pages themselves are
//! rendered in parallel. A page whose front matter is unusable, or whose
//! template does not exist, is skipped and logged. Any other failure aborts the
//! build, discards staging and leaves the live output as it was.
//!
//! ## Dispatching
//!
//! In production mode the staged tree is promoted by [`dispatch::dispatch()`],
//! a state machine that copies staging into `<output>_new`, moves the live
//! output aside, and renames the new output into place:
//!
//! ```svgbob
//!  idle -> stage-new-output -> populate-next -> ensure-live-exists
//!                                                      |
//!                                                      v
//!  done <- release-staging <- verify <- swap-in <- swap-out
//! ```
//!
//! Failures up to `swap-out` are [`Failure::Aborted`]. Failures during
//! `swap-in` or `verify` are [`Failure::SiteDown`] and raise an alarm on the
//! `plover::alarm` log target.
//!
//! In development mode the staging directory is kept and its path reported
//! instead.
)]

#[macro_use]
pub mod error;
pub mod util;
pub mod fstree;
pub mod value;
pub mod metadata;
pub mod markdown;
pub mod templating;
pub mod config;
pub mod staging;
pub mod assets;
pub mod minify;
pub mod pages;
pub mod clean;
pub mod dispatch;
pub mod pipeline;

use std::path::Path;

pub use error::{Error, Failure, Result};
pub use pipeline::{BuildContext, BuildMode, Layout, Summary};
pub use dispatch::{DispatchReport, DispatchState};
pub use pages::PageOutcome;

/// Loads the project at `root` and builds it in `mode`.
pub fn build(root: &Path, mode: BuildMode) -> Result<Summary, Failure> {
    let ctx = BuildContext::new(root, mode)?;
    pipeline::build(&ctx)
}
