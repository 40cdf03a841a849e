use std::path::PathBuf;

use afdo_prof_analysis::{default_seed, Cli};
use clap::Parser;
use tempfile::tempdir;

#[test]
fn default_seed_is_wall_clock_seconds() {
    assert!(default_seed() > 1_600_000_000);
}

#[test]
fn flags_resolve_without_a_config_file() {
    let cli = Cli::parse_from([
        "afdo-prof-analysis",
        "--good-prof",
        "g.txt",
        "--bad-prof",
        "b.txt",
        "--external-decider",
        "d.sh",
        "--analysis-output-file",
        "o.json",
        "--no-resume",
    ]);
    let settings = cli.settings().expect("settings");
    assert_eq!(settings.good_prof, PathBuf::from("g.txt"));
    assert_eq!(settings.state_file, PathBuf::from("afdo_analysis_state.json"));
    assert!(settings.no_resume);
    assert!(!settings.remove_state_on_completion);
    assert_eq!(settings.seed, None);
}

#[test]
fn flags_override_config_file_values() {
    let tmp = tempdir().expect("tempdir");
    let config = tmp.path().join("analysis.yaml");
    std::fs::write(
        &config,
        "good_prof: from_config_good.txt\nbad_prof: from_config_bad.txt\n\
         external_decider: decide.sh\nanalysis_output_file: out.json\n\
         seed: 3\nremove_state_on_completion: true\n",
    )
    .expect("write config");

    let cli = Cli::parse_from([
        "afdo-prof-analysis",
        "--config",
        config.to_str().expect("utf-8 path"),
        "--good-prof",
        "flag_good.txt",
        "--seed",
        "4",
    ]);
    let settings = cli.settings().expect("settings");
    assert_eq!(settings.good_prof, PathBuf::from("flag_good.txt"));
    assert_eq!(settings.bad_prof, PathBuf::from("from_config_bad.txt"));
    assert_eq!(settings.seed, Some(4));
    // An unset switch does not clobber the config's value.
    assert!(settings.remove_state_on_completion);
}

#[test]
fn negation_flags_switch_off_config_values() {
    let tmp = tempdir().expect("tempdir");
    let config = tmp.path().join("analysis.json");
    std::fs::write(
        &config,
        r#"{"good_prof": "g.txt", "bad_prof": "b.txt", "external_decider": "d.sh",
            "analysis_output_file": "o.json", "no_resume": true,
            "remove_state_on_completion": true}"#,
    )
    .expect("write config");
    let config = config.to_str().expect("utf-8 path");

    let from_config = Cli::parse_from(["afdo-prof-analysis", "--config", config]);
    let settings = from_config.settings().expect("settings");
    assert!(settings.no_resume);
    assert!(settings.remove_state_on_completion);

    let negated =
        Cli::parse_from(["afdo-prof-analysis", "--config", config, "--resume", "--keep-state"]);
    let settings = negated.settings().expect("settings");
    assert!(!settings.no_resume);
    assert!(!settings.remove_state_on_completion);
}

#[test]
fn last_of_a_switch_and_its_negation_wins() {
    let cli = Cli::parse_from(["afdo-prof-analysis", "--no-resume", "--resume"]);
    assert!(!cli.no_resume);
    assert!(cli.resume);
    assert_eq!(cli.flag_layer().no_resume, Some(false));

    let cli = Cli::parse_from([
        "afdo-prof-analysis",
        "--keep-state",
        "--remove-state-on-completion",
    ]);
    assert_eq!(cli.flag_layer().remove_state_on_completion, Some(true));
}

#[test]
fn missing_required_settings_name_the_flag() {
    let cli = Cli::parse_from(["afdo-prof-analysis", "--good-prof", "g.txt"]);
    let err = cli.settings().unwrap_err();
    assert!(err.to_string().contains("--bad-prof"), "unexpected error: {err}");
}
