//! End-to-end analysis: bisect, then probe the functions only one profile has.

use chrono::Utc;
use log::info;
use serde::{Deserialize, Serialize};

use crate::bisect::{
    bisect_profiles_wrapper, check_bad_not_good, check_good_not_bad, BisectError, BisectOptions,
    BisectResults,
};
use crate::decider::Decider;
use crate::profile::Profile;

/// Everything an analysis run reports, serialized as the output file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub seed: u64,
    pub bisect_results: BisectResults,
    /// Adding the good-only functions to the bad profile makes it GOOD.
    pub good_only_functions: bool,
    /// Adding the bad-only functions to the good profile makes it BAD.
    pub bad_only_functions: bool,
    pub started_at: String,
    pub finished_at: String,
    /// Decider invocations that actually ran (replayed verdicts excluded).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decider_runs: Option<usize>,
}

/// Run the full analysis with the common keys shuffled by `seed`.
pub fn run_analysis<D: Decider + ?Sized>(
    decider: &mut D,
    good: &Profile,
    bad: &Profile,
    seed: u64,
) -> Result<AnalysisReport, BisectError> {
    let started_at = Utc::now().to_rfc3339();
    info!(
        "Analyzing {} good and {} bad function profiles (seed {})",
        good.len(),
        bad.len(),
        seed
    );

    let options = BisectOptions { perform_check: true, shuffle_seed: Some(seed) };
    let bisect_results = bisect_profiles_wrapper(decider, good, bad, &options)?;
    let good_only_functions = check_good_not_bad(decider, good, bad)?;
    let bad_only_functions = check_bad_not_good(decider, good, bad)?;

    Ok(AnalysisReport {
        seed,
        bisect_results,
        good_only_functions,
        bad_only_functions,
        started_at,
        finished_at: Utc::now().to_rfc3339(),
        decider_runs: None,
    })
}
