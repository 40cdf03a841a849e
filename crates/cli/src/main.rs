use afdo_prof_analysis::commands::{analyze_command, print_report_summary};
use afdo_prof_analysis::{init_logging, Cli};
use anyhow::Result;
use clap::Parser;

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let settings = cli.settings()?;
    let report = analyze_command(&settings)?;
    print_report_summary(&report, &settings.analysis_output_file);

    Ok(())
}
