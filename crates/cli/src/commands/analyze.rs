use std::fs;

use afdo_core::analysis::{run_analysis, AnalysisReport};
use afdo_core::config::AnalysisSettings;
use afdo_core::decider::{DeciderState, ExternalDecider};
use afdo_core::profile::read_profile_file;
use afdo_core::state::{archive_stale_state, retire_state_file, ResumeState};
use anyhow::{anyhow, Context, Result};
use log::{info, warn};

use crate::default_seed;

/// Run a full analysis: bisect, probe one-sided functions, write the report.
pub fn analyze_command(settings: &AnalysisSettings) -> Result<AnalysisReport> {
    let good = read_profile_file(&settings.good_prof)?;
    let bad = read_profile_file(&settings.bad_prof)?;

    if !settings.external_decider.exists() {
        return Err(anyhow!(
            "External decider does not exist: {}",
            settings.external_decider.display()
        ));
    }

    if settings.no_resume {
        archive_stale_state(&settings.state_file)
            .context("Failed to move the previous state file aside")?;
    }

    let state = match ResumeState::load(&settings.state_file)? {
        Some(state) => {
            state.ensure_matches(&settings.state_file, &good, &bad)?;
            if settings.seed.is_some_and(|seed| seed != state.seed) {
                warn!(
                    "Ignoring --seed; resuming the analysis recorded with seed {}",
                    state.seed
                );
            }
            info!("Resuming analysis from {}", settings.state_file.display());
            state
        }
        None => ResumeState::new(settings.seed.unwrap_or_else(default_seed), &good, &bad),
    };

    let mut decider = DeciderState::new(
        ExternalDecider::new(&settings.external_decider),
        state,
        Some(settings.state_file.clone()),
    )?;
    // Record the seed before the first (possibly slow) decider run.
    decider.persist()?;

    let seed = decider.seed();
    let mut report = run_analysis(&mut decider, &good, &bad, seed)?;
    report.decider_runs = Some(decider.live_runs());

    let json =
        serde_json::to_string_pretty(&report).context("Failed to serialize analysis report")?;
    fs::write(&settings.analysis_output_file, json).with_context(|| {
        format!("Failed to write analysis report to {}", settings.analysis_output_file.display())
    })?;

    match retire_state_file(&settings.state_file, settings.remove_state_on_completion)? {
        Some(kept) => info!("State file kept at {}", kept.display()),
        None => info!("State file removed"),
    }

    Ok(report)
}

/// Human-readable summary of a finished analysis.
pub fn print_report_summary(report: &AnalysisReport, output: &std::path::Path) {
    let results = &report.bisect_results;
    println!("AFDO profile analysis (seed {})", report.seed);
    println!("Individual culprits ({}):", results.individuals.len());
    if results.individuals.is_empty() {
        println!("  (none)");
    }
    for func in &results.individuals {
        println!("  - {func}");
    }
    println!("Culprit ranges ({}):", results.ranges.len());
    if results.ranges.is_empty() {
        println!("  (none)");
    }
    for range in &results.ranges {
        println!("  - {}", range.join(", "));
    }
    println!("Good-only functions fix the bad profile: {}", report.good_only_functions);
    println!("Bad-only functions break the good profile: {}", report.bad_only_functions);
    if let Some(runs) = report.decider_runs {
        println!("Decider runs: {runs}");
    }
    println!("Report: {}", output.display());
}
