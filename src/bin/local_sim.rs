use std::fs;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use streetlight_sim::simulation::config::{CommandLineArgs, Config};
use streetlight_sim::simulation::controller::LocalControllerBuilder;
use streetlight_sim::simulation::error::Result;
use streetlight_sim::simulation::io::resolve_path;
use streetlight_sim::simulation::logging::{init_logging, init_std_out_logging_thread_local};
use streetlight_sim::simulation::scenario::Scenario;
use tracing::{error, info};

fn main() -> ExitCode {
    let _guard = init_std_out_logging_thread_local();

    let args = CommandLineArgs::parse();
    info!("Started with args: {:?}", args);

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Simulation failed: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &CommandLineArgs) -> Result<()> {
    // Load and adapt config
    let config = Arc::new(Config::from_args(args)?);

    let output_dir = resolve_path(config.context(), &config.output().output_dir);
    fs::create_dir_all(&output_dir)?;
    let _log_guards = init_logging(&config, &output_dir);

    // Load and validate scenario
    let scenario = Scenario::load(config)?;

    // Create and run simulation
    let output = LocalControllerBuilder::default()
        .scenario(scenario)
        .build()?
        .run()?;

    info!(
        "Wrote {} schedule entries to {:?}",
        output.schedule.len(),
        output.output_dir
    );
    Ok(())
}
