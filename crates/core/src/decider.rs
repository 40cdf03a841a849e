//! Decision oracles: anything that can look at a (hybrid) profile and say
//! whether the build it produces is GOOD or BAD.
//!
//! Three implementations live here:
//! - [`FnDecider`] adapts a closure (tests, library callers).
//! - [`ExternalDecider`] shells out to a user-provided build-and-test script.
//! - [`DeciderState`] wraps another decider with a resumable verdict journal.

use std::collections::VecDeque;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Command;

use log::{debug, info};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::profile::{profile_map_to_text, Profile};
use crate::state::{ResumeState, StateError};

/// Exit code an external decider uses to report a GOOD build.
pub const GOOD_STATUS: i32 = 0;
/// Exit code an external decider uses to report a BAD build.
pub const BAD_STATUS: i32 = 1;
/// Exit code an external decider uses when it could not reach a verdict.
pub const PROBLEM_STATUS: i32 = 127;

/// Outcome of evaluating one profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Good,
    Bad,
}

impl Verdict {
    /// Encode as the integer status used by decider scripts and the state file.
    pub fn to_status(self) -> i32 {
        match self {
            Verdict::Good => GOOD_STATUS,
            Verdict::Bad => BAD_STATUS,
        }
    }

    /// Decode an integer status; anything other than GOOD/BAD is not a verdict.
    pub fn from_status(status: i32) -> Option<Self> {
        match status {
            GOOD_STATUS => Some(Verdict::Good),
            BAD_STATUS => Some(Verdict::Bad),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Verdict::Good => "GOOD",
            Verdict::Bad => "BAD",
        }
    }
}

#[derive(Debug, Error)]
pub enum DeciderError {
    #[error("Failed to launch decider {script}: {source}")]
    Spawn {
        script: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error(
        "Decider {script} returned PROBLEM_STATUS on the profile stored at {profile}; \
         aborting analysis"
    )]
    Problem { script: PathBuf, profile: PathBuf },
    #[error("Decider {script} exited with unexpected status {code}")]
    UnexpectedStatus { script: PathBuf, code: i32 },
    #[error("Decider {script} was terminated by a signal")]
    Terminated { script: PathBuf },
    #[error("Failed to stage profile for decider: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to persist decider state: {0}")]
    State(#[from] StateError),
    #[error("Decider failed: {0}")]
    Failed(String),
}

/// Anything that can evaluate a profile.
///
/// `save_run` marks calls whose verdict belongs to the resumable history of a
/// search. Search probes pass `true`; the baseline checks of the input
/// profiles pass `false` so they are always re-run live. Implementations
/// without a journal ignore it.
pub trait Decider {
    fn run(&mut self, profile: &Profile, save_run: bool) -> Result<Verdict, DeciderError>;
}

impl<D: Decider + ?Sized> Decider for &mut D {
    fn run(&mut self, profile: &Profile, save_run: bool) -> Result<Verdict, DeciderError> {
        (**self).run(profile, save_run)
    }
}

/// Closure-backed decider. Counts every call it receives.
pub struct FnDecider<F> {
    func: F,
    calls: usize,
}

impl<F> FnDecider<F>
where
    F: FnMut(&Profile) -> Result<Verdict, DeciderError>,
{
    pub fn new(func: F) -> Self {
        Self { func, calls: 0 }
    }

    pub fn calls(&self) -> usize {
        self.calls
    }
}

impl<F> Decider for FnDecider<F>
where
    F: FnMut(&Profile) -> Result<Verdict, DeciderError>,
{
    fn run(&mut self, profile: &Profile, _save_run: bool) -> Result<Verdict, DeciderError> {
        self.calls += 1;
        (self.func)(profile)
    }
}

/// Runs `<script> <profile-path>` and maps the exit code to a verdict.
///
/// The profile is written to a temporary file that is removed after the
/// script exits, unless the script reports [`PROBLEM_STATUS`], in which case
/// the file is kept so the failure can be reproduced.
#[derive(Debug, Clone)]
pub struct ExternalDecider {
    script: PathBuf,
    runs: usize,
}

impl ExternalDecider {
    pub fn new(script: impl Into<PathBuf>) -> Self {
        Self { script: script.into(), runs: 0 }
    }

    pub fn script(&self) -> &Path {
        &self.script
    }

    /// Number of times the script has been launched.
    pub fn runs(&self) -> usize {
        self.runs
    }
}

impl Decider for ExternalDecider {
    fn run(&mut self, profile: &Profile, _save_run: bool) -> Result<Verdict, DeciderError> {
        let mut staged = tempfile::Builder::new().prefix("afdo_prof_").suffix(".txt").tempfile()?;
        staged.write_all(profile_map_to_text(profile).as_bytes())?;
        staged.flush()?;

        let status = Command::new(&self.script)
            .arg(staged.path())
            .status()
            .map_err(|source| DeciderError::Spawn { script: self.script.clone(), source })?;
        self.runs += 1;

        match status.code() {
            Some(PROBLEM_STATUS) => {
                let (_file, kept) = staged.keep().map_err(|e| e.error)?;
                Err(DeciderError::Problem { script: self.script.clone(), profile: kept })
            }
            Some(code) => Verdict::from_status(code).ok_or_else(|| {
                DeciderError::UnexpectedStatus { script: self.script.clone(), code }
            }),
            None => Err(DeciderError::Terminated { script: self.script.clone() }),
        }
    }
}

/// Decider wrapper that journals saved verdicts so an interrupted analysis
/// can pick up where it left off.
///
/// Saved calls replay journaled verdicts in order before reaching the inner
/// decider. Unsaved calls always run live and are never journaled.
pub struct DeciderState<D> {
    inner: D,
    state: ResumeState,
    state_path: Option<PathBuf>,
    replay: VecDeque<Verdict>,
    live_runs: usize,
}

impl<D: Decider> DeciderState<D> {
    /// Wrap `inner`, queueing every verdict already recorded in `state` for replay.
    pub fn new(
        inner: D,
        state: ResumeState,
        state_path: Option<PathBuf>,
    ) -> Result<Self, StateError> {
        let replay = state.verdicts()?.into_iter().collect::<VecDeque<_>>();
        if !replay.is_empty() {
            info!("Resuming with {} saved decider verdicts", replay.len());
        }
        Ok(Self { inner, state, state_path, replay, live_runs: 0 })
    }

    pub fn seed(&self) -> u64 {
        self.state.seed
    }

    pub fn state(&self) -> &ResumeState {
        &self.state
    }

    /// Verdicts still waiting to be replayed.
    pub fn pending_replays(&self) -> usize {
        self.replay.len()
    }

    /// Number of calls that reached the inner decider.
    pub fn live_runs(&self) -> usize {
        self.live_runs
    }

    pub fn inner(&self) -> &D {
        &self.inner
    }

    pub fn into_inner(self) -> D {
        self.inner
    }

    /// Write the current state to the state file, if one is configured.
    pub fn persist(&mut self) -> Result<(), StateError> {
        match &self.state_path {
            Some(path) => self.state.save(path),
            None => Ok(()),
        }
    }
}

impl<D: Decider> Decider for DeciderState<D> {
    fn run(&mut self, profile: &Profile, save_run: bool) -> Result<Verdict, DeciderError> {
        if save_run {
            if let Some(verdict) = self.replay.pop_front() {
                debug!("Replayed saved verdict {}", verdict.as_str());
                return Ok(verdict);
            }
        }

        let verdict = self.inner.run(profile, save_run)?;
        self.live_runs += 1;
        if save_run {
            self.state.record(verdict);
            self.persist()?;
        }
        info!(
            "Run {} of decider returned {}{}",
            self.live_runs,
            verdict.as_str(),
            if save_run { "" } else { " (unsaved)" }
        );
        Ok(verdict)
    }
}
