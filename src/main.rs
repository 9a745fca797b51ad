//! lightsong CLI entry point

use clap::Parser;
use lightsong::config::{Cli, Settings};
use lightsong::pipeline;
use lightsong::types::ScaleName;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    let cli = Cli::parse();

    init_logging(&cli);

    if cli.list_scales {
        print_scales();
        return ExitCode::SUCCESS;
    }

    let settings = match Settings::from_cli(&cli) {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = validate_inputs(&settings) {
        eprintln!("Error: {}", e);
        return ExitCode::FAILURE;
    }

    match pipeline::run(&settings) {
        Ok(result) => {
            println!();
            println!(
                "Summary: {} successful, {} failed, {} skipped (of {} total)",
                result.successful, result.failed, result.skipped, result.total
            );

            if result.failed > 0 {
                ExitCode::from(1)
            } else {
                ExitCode::SUCCESS
            }
        }
        Err(e) => {
            eprintln!("Fatal error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn init_logging(cli: &Cli) {
    let filter = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    let filter = if cli.quiet { "error" } else { filter };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_target(false)
        .init();
}

fn print_scales() {
    for name in ScaleName::ALL {
        let offsets: Vec<String> = name.offsets().iter().map(|o| o.to_string()).collect();
        println!("{:<12} {}", name.as_str(), offsets.join(" "));
    }
}

fn validate_inputs(settings: &Settings) -> Result<(), String> {
    if !settings.data_dir.is_dir() {
        return Err(format!(
            "Light-curve directory does not exist: {}\n\n  Tip: Pass --data or set LIGHTSONG_DATA_PATH.\n  Example:\n    lightsong --data ./lightcurves -o ./songs 4912991",
            settings.data_dir.display()
        ));
    }

    // The output directory itself is created on demand
    if let Some(parent) = settings.output.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            return Err(format!(
                "Output parent directory does not exist: {}\n\n  Tip: The output directory will be created automatically,\n  but its parent directory must exist.\n  Example: mkdir -p {}",
                parent.display(),
                parent.display()
            ));
        }
    }

    Ok(())
}
