//! Resume state for long-running analyses.
//!
//! Each decider run may take minutes, so verdicts are journaled to a JSON
//! state file as they arrive. A rerun with the same inputs replays them
//! instead of invoking the decider again.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::Utc;
use log::info;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::decider::Verdict;
use crate::profile::{profile_map_to_text, Profile};

/// Default location of the state file, relative to the working directory.
pub const DEFAULT_STATE_FILE: &str = "afdo_analysis_state.json";

#[derive(Debug, Error)]
pub enum StateError {
    #[error("Failed to access state file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse state file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("Failed to serialize state for {path}: {source}")]
    Serialize {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error(
        "State file {path} was recorded for different profiles; \
         rerun with --no-resume to start over"
    )]
    ProfileMismatch { path: PathBuf },
    #[error("State file holds invalid verdict status {0}")]
    InvalidVerdict(i32),
}

/// Serialized journal of a (possibly interrupted) analysis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResumeState {
    /// Seed that ordered the search; must be reused for replays to line up.
    pub seed: u64,
    pub good_profile_sha256: String,
    pub bad_profile_sha256: String,
    /// Saved verdicts in the order they were produced, as decider statuses.
    #[serde(default)]
    pub accumulated_results: Vec<i32>,
    #[serde(default)]
    pub updated_at: String,
}

impl ResumeState {
    pub fn new(seed: u64, good: &Profile, bad: &Profile) -> Self {
        Self {
            seed,
            good_profile_sha256: profile_sha256(good),
            bad_profile_sha256: profile_sha256(bad),
            accumulated_results: Vec::new(),
            updated_at: Utc::now().to_rfc3339(),
        }
    }

    /// Load a state file; a missing file is not an error.
    pub fn load(path: &Path) -> Result<Option<Self>, StateError> {
        if !path.exists() {
            return Ok(None);
        }
        let body = fs::read_to_string(path)
            .map_err(|source| StateError::Io { path: path.to_path_buf(), source })?;
        let state = serde_json::from_str(&body)
            .map_err(|source| StateError::Parse { path: path.to_path_buf(), source })?;
        Ok(Some(state))
    }

    pub fn save(&mut self, path: &Path) -> Result<(), StateError> {
        self.updated_at = Utc::now().to_rfc3339();
        let body = serde_json::to_string_pretty(self)
            .map_err(|source| StateError::Serialize { path: path.to_path_buf(), source })?;
        fs::write(path, body).map_err(|source| StateError::Io { path: path.to_path_buf(), source })
    }

    /// Reject a state recorded for other inputs; replaying it would be noise.
    pub fn ensure_matches(
        &self,
        path: &Path,
        good: &Profile,
        bad: &Profile,
    ) -> Result<(), StateError> {
        if self.good_profile_sha256 != profile_sha256(good)
            || self.bad_profile_sha256 != profile_sha256(bad)
        {
            return Err(StateError::ProfileMismatch { path: path.to_path_buf() });
        }
        Ok(())
    }

    pub fn record(&mut self, verdict: Verdict) {
        self.accumulated_results.push(verdict.to_status());
    }

    pub fn verdicts(&self) -> Result<Vec<Verdict>, StateError> {
        self.accumulated_results
            .iter()
            .map(|&status| Verdict::from_status(status).ok_or(StateError::InvalidVerdict(status)))
            .collect()
    }
}

/// SHA-256 of a profile's text form.
pub fn profile_sha256(profile: &Profile) -> String {
    let mut hasher = Sha256::new();
    hasher.update(profile_map_to_text(profile).as_bytes());
    format!("{:x}", hasher.finalize())
}

fn timestamped_sibling(path: &Path, tag: &str) -> PathBuf {
    let stamp = Utc::now().format("%Y%m%dT%H%M%S%.3f");
    let mut name = path.as_os_str().to_owned();
    name.push(format!(".{tag}.{stamp}"));
    PathBuf::from(name)
}

/// Move an existing state file out of the way so a fresh analysis starts.
///
/// Returns where the old file went, or `None` if there was nothing to move.
pub fn archive_stale_state(path: &Path) -> Result<Option<PathBuf>, StateError> {
    if !path.exists() {
        return Ok(None);
    }
    let target = timestamped_sibling(path, "old");
    fs::rename(path, &target)
        .map_err(|source| StateError::Io { path: path.to_path_buf(), source })?;
    info!("Moved previous state file to {}", target.display());
    Ok(Some(target))
}

/// Dispose of the state file after a completed analysis: delete it, or keep
/// it as `<path>.completed.<timestamp>`.
pub fn retire_state_file(path: &Path, remove: bool) -> Result<Option<PathBuf>, StateError> {
    if !path.exists() {
        return Ok(None);
    }
    if remove {
        fs::remove_file(path)
            .map_err(|source| StateError::Io { path: path.to_path_buf(), source })?;
        return Ok(None);
    }
    let target = timestamped_sibling(path, "completed");
    fs::rename(path, &target)
        .map_err(|source| StateError::Io { path: path.to_path_buf(), source })?;
    Ok(Some(target))
}
