//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - loads `.env` and initialises logging
//! - parses CLI arguments
//! - runs the batch pipeline and prints reports/plots
//! - writes outputs once every file has been processed

use clap::Parser;
use log::info;

use crate::cli::{Command, LayoutArgs, RunArgs, ShowArgs, SimulateArgs};
use crate::domain::{RunConfig, SimulateConfig};
use crate::error::AppError;

pub mod pipeline;

/// Entry point for the `plate` binary.
pub fn run() -> Result<(), AppError> {
    // A missing .env is fine; settings then come from flags, env or defaults.
    let _ = dotenvy::dotenv();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    // We want `plate` and `plate --data-dir x` to behave like `plate run ...`.
    //
    // Clap requires a subcommand name, so we do a small, explicit rewrite of the
    // argv list before parsing.
    let argv = rewrite_args(std::env::args().collect());
    let cli = crate::cli::Cli::parse_from(argv);

    match cli.command {
        Command::Run(args) => handle_run(args),
        Command::Classify(args) => handle_classify(args),
        Command::Simulate(args) => handle_simulate(args),
        Command::Show(args) => handle_show(args),
    }
}

fn handle_run(args: RunArgs) -> Result<(), AppError> {
    let config = run_config_from_args(&args)?;
    let run = pipeline::run_batch(&config)?;

    println!("{}", crate::report::format_run_summary(&run.layout, &run.files));

    for file in &run.files {
        for plate in &file.plates {
            println!("{} / {}", file.name, crate::report::format_result_grid(plate));
            if config.plot {
                for fit in &plate.fits {
                    println!("{} {} {}", file.name, plate.name, fit.key);
                    println!(
                        "{}",
                        crate::plot::render_group_plot(fit, config.plot_width, config.plot_height)
                    );
                }
            }
        }
    }

    if config.dry_run {
        info!("Dry run: no outputs written");
        return Ok(());
    }
    pipeline::write_outputs(&config, &run)?;
    Ok(())
}

fn handle_classify(args: LayoutArgs) -> Result<(), AppError> {
    let layout = crate::io::load_layout(&args.template, &args.concentrations)?;
    println!("{}", crate::report::format_classification(&layout));
    Ok(())
}

fn handle_simulate(args: SimulateArgs) -> Result<(), AppError> {
    let config = simulate_config_from_args(&args);
    let sample = crate::data::generate_sample(&config)?;
    let paths = crate::data::write_sample(&config.output_dir, &sample)?;
    println!(
        "Wrote {} and {}, {} data file(s) in {}",
        paths.template.display(),
        paths.concentrations.display(),
        sample.files.len(),
        paths.data_dir.display()
    );
    Ok(())
}

fn handle_show(args: ShowArgs) -> Result<(), AppError> {
    let report = crate::io::read_report_json(&args.report)?;
    println!("{}", crate::report::format_report(&report));

    if args.plot {
        for file in &report.files {
            for plate in &file.plates {
                for fit in &plate.fits {
                    let group = fit.group.map(|g| format!(" group {g}")).unwrap_or_default();
                    println!("{} {}{group}", file.name, plate.name);
                    let params = fit.params.unwrap_or(crate::domain::FitParams::NAN);
                    println!(
                        "{}",
                        crate::plot::render_fit_plot(&params, &fit.points, args.width, args.height)
                    );
                }
            }
        }
    }
    Ok(())
}

pub fn run_config_from_args(args: &RunArgs) -> Result<RunConfig, AppError> {
    if args.max_iterations == 0 {
        return Err(AppError::config("--max-iterations must be > 0."));
    }
    if args.plate_marker.trim().is_empty() {
        return Err(AppError::config("--plate-marker must not be empty."));
    }
    Ok(RunConfig {
        data_dir: args.data_dir.clone(),
        template_path: args.layout.template.clone(),
        concentrations_path: args.layout.concentrations.clone(),
        output_dir: args.output_dir.clone(),
        plate_marker: args.plate_marker.clone(),
        max_evaluations: args.max_iterations,
        charts: !args.no_charts,
        plot: args.plot,
        plot_width: args.width,
        plot_height: args.height,
        dry_run: args.dry_run,
    })
}

pub fn simulate_config_from_args(args: &SimulateArgs) -> SimulateConfig {
    SimulateConfig {
        output_dir: args.output_dir.clone(),
        files: args.files,
        plates: args.plates,
        groups: args.groups,
        seed: args.seed,
        noise: args.noise,
        missing: args.missing,
    }
}

/// Rewrite argv so `plate` defaults to `plate run`.
///
/// Rules:
/// - `plate`                       -> `plate run`
/// - `plate --data-dir d ...`      -> `plate run --data-dir d ...`
/// - `plate --help/--version/-h`   -> unchanged (show top-level help/version)
fn rewrite_args(mut argv: Vec<String>) -> Vec<String> {
    let Some(arg1) = argv.get(1).cloned() else {
        argv.push("run".to_string());
        return argv;
    };

    let is_top_level_help_or_version = matches!(
        arg1.as_str(),
        "-h" | "--help" | "-V" | "--version" | "help"
    );
    if is_top_level_help_or_version {
        return argv;
    }

    let is_subcommand = matches!(arg1.as_str(), "run" | "classify" | "simulate" | "show");
    if is_subcommand {
        return argv;
    }

    // If the first token is a flag, treat it as "run flags".
    if arg1.starts_with('-') {
        argv.insert(1, "run".to_string());
        return argv;
    }

    // Otherwise, leave as-is.
    argv
}
