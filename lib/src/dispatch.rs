use std::fmt;
use std::fs;
use std::path::PathBuf;

use crate::error::{Chainable, Error, Failure, Result};
use crate::fstree::FsTree;
use crate::pipeline::BuildContext;
use crate::staging::StagingArea;
use crate::util::{ensure_dir, remove_path};

/// Log target of the site-down alarm.
pub const ALARM_TARGET: &str = "plover::alarm";

/// The steps of promoting a staged build to the live output, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DispatchState {
    Idle,
    StageNewOutput,
    PopulateNext,
    EnsureLiveExists,
    SwapOut,
    SwapIn,
    Verify,
    ReleaseStaging,
    Done,
}

impl DispatchState {
    pub fn next(self) -> Option<Self> {
        use DispatchState::*;

        Some(match self {
            Idle => StageNewOutput,
            StageNewOutput => PopulateNext,
            PopulateNext => EnsureLiveExists,
            EnsureLiveExists => SwapOut,
            SwapOut => SwapIn,
            SwapIn => Verify,
            Verify => ReleaseStaging,
            ReleaseStaging => Done,
            Done => return None,
        })
    }

    /// Whether a failure in this state can leave the live output missing or
    /// inconsistent. A failed swap-out rename leaves the live output in place.
    pub fn is_unsafe(self) -> bool {
        matches!(self, DispatchState::SwapIn | DispatchState::Verify)
    }

    pub fn name(self) -> &'static str {
        match self {
            DispatchState::Idle => "idle",
            DispatchState::StageNewOutput => "stage-new-output",
            DispatchState::PopulateNext => "populate-next",
            DispatchState::EnsureLiveExists => "ensure-live-exists",
            DispatchState::SwapOut => "swap-out",
            DispatchState::SwapIn => "swap-in",
            DispatchState::Verify => "verify",
            DispatchState::ReleaseStaging => "release-staging",
            DispatchState::Done => "done",
        }
    }
}

impl fmt::Display for DispatchState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The result of a completed dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchReport {
    pub visited: Vec<DispatchState>,
    pub live: PathBuf,
    pub files: usize,
}

/// Promotes `staging` to the live output directory.
///
/// ```text
/// staging ──copy──▶ <output>_new
///                        │
/// <output> ──rename──▶ <output>_old      (swap-out)
/// <output>_new ──rename──▶ <output>      (swap-in)
/// ```
///
/// Up to and including swap-out, a failure leaves the live output untouched and
/// is returned as [`Failure::Aborted`]. During swap-in or verification it is
/// returned as [`Failure::SiteDown`] and raised on [`ALARM_TARGET`]; in that
/// case the staging directory is kept for recovery.
pub fn dispatch(ctx: &BuildContext, staging: StagingArea) -> Result<DispatchReport, Failure> {
    Dispatcher::new(ctx, staging).run()
}

#[derive(Debug)]
pub struct Dispatcher {
    staging: Option<StagingArea>,
    live: PathBuf,
    next: PathBuf,
    retired: PathBuf,
    visited: Vec<DispatchState>,
    files: usize,
}

impl Dispatcher {
    pub fn new(ctx: &BuildContext, staging: StagingArea) -> Self {
        Dispatcher {
            staging: Some(staging),
            live: ctx.output_dir(),
            next: ctx.next_dir(),
            retired: ctx.retired_dir(),
            visited: vec![DispatchState::Idle],
            files: 0,
        }
    }

    pub fn run(self) -> Result<DispatchReport, Failure> {
        self.run_observed(|_| Ok(()))
    }

    /// Runs the state machine, calling `enter` before each step.
    fn run_observed<F>(mut self, mut enter: F) -> Result<DispatchReport, Failure>
        where F: FnMut(DispatchState) -> Result<()>
    {
        let mut state = DispatchState::Idle;
        while let Some(next) = state.next() {
            state = next;
            self.visited.push(state);
            tracing::debug!(%state, "dispatch state");

            if let Err(error) = enter(state).and_then(|_| self.step(state)) {
                return Err(self.fail(state, error));
            }
        }

        tracing::info!(live = %self.live.display(), files = self.files, "dispatched build");
        Ok(DispatchReport { visited: self.visited, live: self.live, files: self.files })
    }

    fn staging(&self) -> Result<&StagingArea> {
        self.staging.as_ref().ok_or_else(|| error!("staging directory already released"))
    }

    fn step(&mut self, state: DispatchState) -> Result<()> {
        match state {
            DispatchState::Idle | DispatchState::Done => {}
            DispatchState::StageNewOutput => {
                for stale in [&self.next, &self.retired] {
                    if stale.exists() {
                        tracing::warn!(path = %stale.display(), "removing leftover from an earlier dispatch");
                    }

                    remove_path(stale).chain_with(|| error! {
                        "failed to remove leftover output directory",
                        "path" => stale.display(),
                    })?;
                }

                fs::create_dir(&self.next).chain_with(|| error! {
                    "failed to create next output directory",
                    "path" => self.next.display(),
                })?;
            }
            DispatchState::PopulateNext => {
                let tree = FsTree::build(self.staging()?.path())?;
                self.files = crate::time!("populating next output" => tree.copy_to(&self.next))
                    .chain(error!("failed to copy staging into next output"))?;
            }
            DispatchState::EnsureLiveExists => {
                ensure_dir(&self.live).chain_with(|| error! {
                    "failed to create live output directory",
                    "path" => self.live.display(),
                })?;
            }
            DispatchState::SwapOut => {
                fs::rename(&self.live, &self.retired).chain_with(|| error! {
                    "failed to move live output aside",
                    "from" => self.live.display(),
                    "to" => self.retired.display(),
                })?;
            }
            DispatchState::SwapIn => {
                fs::rename(&self.next, &self.live).chain_with(|| error! {
                    "failed to move next output into place",
                    "from" => self.next.display(),
                    "to" => self.live.display(),
                })?;
            }
            DispatchState::Verify => {
                let expected = FsTree::build(self.staging()?.path())?.manifest();
                let actual = FsTree::build(&self.live)?.manifest();
                if let Some((path, size)) = expected.iter().find(|(p, s)| actual.get(*p) != Some(*s)) {
                    return err! {
                        "live output does not match staged build",
                        "path" => path.display(),
                        "expected size" => size,
                        "live size" => actual.get(path).map_or("missing".into(), |s| s.to_string()),
                    };
                }

                if let Some(extra) = actual.keys().find(|p| !expected.contains_key(*p)) {
                    return err!("live output contains an unexpected file", "path" => extra.display());
                }
            }
            DispatchState::ReleaseStaging => {
                if let Some(staging) = self.staging.take() {
                    staging.destroy();
                }

                if let Err(e) = remove_path(&self.retired) {
                    tracing::warn!(path = %self.retired.display(), error = %e, "failed to remove retired output");
                }
            }
        }

        Ok(())
    }

    fn fail(&mut self, state: DispatchState, error: Error) -> Failure {
        if !state.is_unsafe() {
            if let Err(e) = remove_path(&self.next) {
                tracing::warn!(path = %self.next.display(), error = %e, "failed to remove next output");
            }

            tracing::error!(%state, "dispatch aborted; live output unchanged");
            return Failure::Aborted(error.chain(error!("dispatch aborted", "state" => state)));
        }

        let mut error = error;
        if state == DispatchState::SwapIn {
            error = match fs::rename(&self.retired, &self.live) {
                Ok(()) => error.chain(error!("swap-in failed; previous live output was restored")),
                Err(e) => error.chain(error! {
                    "swap-in failed and the previous live output could not be restored",
                    "previous output" => self.retired.display(),
                    e,
                }),
            };
        }

        let kept = self.staging.take().map(StagingArea::persist);
        tracing::error!(
            target: ALARM_TARGET,
            %state,
            live = %self.live.display(),
            staging = %kept.as_ref().map(|p| p.display().to_string()).unwrap_or_default(),
            "SITE DOWN: live output may be missing or incomplete",
        );

        Failure::SiteDown { state, error }
    }
}
