use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use afdo_core::config::{AnalysisConfig, AnalysisSettings};
use anyhow::Result;
use clap::Parser;

pub mod commands;

/// Bisect a good and a bad AFDO profile to find the function profiles that
/// break the build.
///
/// This CLI is a thin wrapper around `afdo-core` (exposed in code as `afdo_core`).
/// It reads the profiles, runs the external decider on hybrid profiles, and
/// writes a JSON report.
#[derive(Parser, Debug)]
#[command(
    name = "afdo-prof-analysis",
    version,
    about = "Bisect AFDO profiles against a build-and-test decider",
    long_about = None
)]
pub struct Cli {
    /// Text AFDO profile that produces a GOOD build.
    #[arg(long)]
    pub good_prof: Option<PathBuf>,

    /// Text AFDO profile that produces a BAD build.
    #[arg(long)]
    pub bad_prof: Option<PathBuf>,

    /// Script invoked as `<script> <profile>`; exits 0 for GOOD, 1 for BAD,
    /// 127 if it could not decide.
    #[arg(long)]
    pub external_decider: Option<PathBuf>,

    /// Where to write the JSON analysis report.
    #[arg(long)]
    pub analysis_output_file: Option<PathBuf>,

    /// State file used to resume an interrupted analysis.
    /// Defaults to `afdo_analysis_state.json` in the working directory.
    #[arg(long)]
    pub state_file: Option<PathBuf>,

    /// Ignore (and archive) an existing state file instead of resuming from it.
    #[arg(long, default_value_t = false, overrides_with = "resume")]
    pub no_resume: bool,

    /// Resume from an existing state file even if the config sets `no_resume`.
    #[arg(long, default_value_t = false, overrides_with = "no_resume")]
    pub resume: bool,

    /// Delete the state file when the analysis completes instead of keeping a
    /// timestamped copy.
    #[arg(long, default_value_t = false, overrides_with = "keep_state")]
    pub remove_state_on_completion: bool,

    /// Keep a timestamped copy of the state file even if the config sets
    /// `remove_state_on_completion`.
    #[arg(long, default_value_t = false, overrides_with = "remove_state_on_completion")]
    pub keep_state: bool,

    /// Seed for ordering the search. Defaults to the current time.
    #[arg(long)]
    pub seed: Option<u64>,

    /// YAML or JSON file providing any of the settings above.
    /// Flags given on the command line take precedence.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Log at debug level.
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,
}

impl Cli {
    /// Settings given as flags, with unset switches left unset so a config
    /// file can still provide them.
    pub fn flag_layer(&self) -> AnalysisConfig {
        AnalysisConfig {
            good_prof: self.good_prof.clone(),
            bad_prof: self.bad_prof.clone(),
            external_decider: self.external_decider.clone(),
            analysis_output_file: self.analysis_output_file.clone(),
            state_file: self.state_file.clone(),
            no_resume: switch(self.no_resume, self.resume),
            remove_state_on_completion: switch(self.remove_state_on_completion, self.keep_state),
            seed: self.seed,
        }
    }

    /// Merge the optional config file under the flags and resolve defaults.
    pub fn settings(&self) -> Result<AnalysisSettings> {
        let file_layer = match &self.config {
            Some(path) => AnalysisConfig::load(path)?,
            None => AnalysisConfig::default(),
        };
        file_layer.overlay(self.flag_layer()).resolve()
    }
}

/// A switch and its negation; `None` when neither was given.
fn switch(on: bool, off: bool) -> Option<bool> {
    match (on, off) {
        (true, _) => Some(true),
        (false, true) => Some(false),
        (false, false) => None,
    }
}

/// Initialize `env_logger`; `RUST_LOG` still overrides the default level.
pub fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let env = env_logger::Env::default().default_filter_or(default_level);
    let _ = env_logger::Builder::from_env(env).try_init();
}

/// Seed derived from the wall clock, used when none was provided.
pub fn default_seed() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_secs()).unwrap_or_default()
}
