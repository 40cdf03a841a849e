//! Layered analysis settings.
//!
//! A YAML or JSON config file supplies defaults and command-line flags are
//! overlaid on top; `resolve` fills in the remaining defaults.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};

use crate::state::DEFAULT_STATE_FILE;

/// Analysis settings as they appear in a config file or on the command line.
///
/// Every field is optional so that layers can be overlaid; [`resolve`]
/// checks that the required ones ended up set.
///
/// [`resolve`]: AnalysisConfig::resolve
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AnalysisConfig {
    #[serde(default)]
    pub good_prof: Option<PathBuf>,
    #[serde(default)]
    pub bad_prof: Option<PathBuf>,
    #[serde(default)]
    pub external_decider: Option<PathBuf>,
    #[serde(default)]
    pub analysis_output_file: Option<PathBuf>,
    #[serde(default)]
    pub state_file: Option<PathBuf>,
    #[serde(default)]
    pub no_resume: Option<bool>,
    #[serde(default)]
    pub remove_state_on_completion: Option<bool>,
    #[serde(default)]
    pub seed: Option<u64>,
}

/// Fully resolved settings for one analysis run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisSettings {
    pub good_prof: PathBuf,
    pub bad_prof: PathBuf,
    pub external_decider: PathBuf,
    pub analysis_output_file: PathBuf,
    pub state_file: PathBuf,
    pub no_resume: bool,
    pub remove_state_on_completion: bool,
    /// `None` lets the caller pick one (or reuse a resumed state's seed).
    pub seed: Option<u64>,
}

impl AnalysisConfig {
    /// Load a config file; `.json` is parsed as JSON, anything else as YAML.
    pub fn load(path: &Path) -> Result<Self> {
        let body = fs::read_to_string(path)
            .with_context(|| format!("Failed to read analysis config at {}", path.display()))?;
        if path.extension().and_then(|e| e.to_str()) == Some("json") {
            serde_json::from_str(&body).context("Failed to parse analysis config JSON")
        } else {
            serde_yaml::from_str(&body).context("Failed to parse analysis config YAML")
        }
    }

    /// Layer `overrides` on top of `self`; set fields in `overrides` win.
    pub fn overlay(self, overrides: AnalysisConfig) -> AnalysisConfig {
        AnalysisConfig {
            good_prof: overrides.good_prof.or(self.good_prof),
            bad_prof: overrides.bad_prof.or(self.bad_prof),
            external_decider: overrides.external_decider.or(self.external_decider),
            analysis_output_file: overrides.analysis_output_file.or(self.analysis_output_file),
            state_file: overrides.state_file.or(self.state_file),
            no_resume: overrides.no_resume.or(self.no_resume),
            remove_state_on_completion: overrides
                .remove_state_on_completion
                .or(self.remove_state_on_completion),
            seed: overrides.seed.or(self.seed),
        }
    }

    pub fn resolve(self) -> Result<AnalysisSettings> {
        fn required(value: Option<PathBuf>, flag: &str) -> Result<PathBuf> {
            value.ok_or_else(|| anyhow!("Missing required setting --{flag}"))
        }

        Ok(AnalysisSettings {
            good_prof: required(self.good_prof, "good-prof")?,
            bad_prof: required(self.bad_prof, "bad-prof")?,
            external_decider: required(self.external_decider, "external-decider")?,
            analysis_output_file: required(self.analysis_output_file, "analysis-output-file")?,
            state_file: self.state_file.unwrap_or_else(|| PathBuf::from(DEFAULT_STATE_FILE)),
            no_resume: self.no_resume.unwrap_or(false),
            remove_state_on_completion: self.remove_state_on_completion.unwrap_or(false),
            seed: self.seed,
        })
    }
}
