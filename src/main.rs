use chrono::Local;
use clap::Parser;
use colored::*;
use eyre::{Context, Result};
use log::info;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

mod cli;

use cli::Cli;
use cli::commands::Commands;
use segfuse::config::{GlobalConfig, load_config};
use segfuse::dispatch::{ConsoleProgress, DispatchPool};
use segfuse::fusion::CommandFuser;
use segfuse::planner::JobPlanner;
use segfuse::resolve::WorkSetResolver;
use segfuse::runner::{BatchFilter, BatchRunner, configurations};
use segfuse::validation::{CommandProbe, ValidationOracle};

fn setup_logging(verbose: bool) -> Result<()> {
    // Create log directory
    let log_dir = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("segfuse")
        .join("logs");

    fs::create_dir_all(&log_dir).context("Failed to create log directory")?;

    let log_file = log_dir.join("segfuse.log");

    // Setup env_logger with file output
    let target = Box::new(
        fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_file)
            .context("Failed to open log file")?,
    );

    let mut builder = env_logger::Builder::from_default_env();
    if verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder.target(env_logger::Target::Pipe(target)).init();

    info!("Logging initialized, writing to: {}", log_file.display());
    Ok(())
}

async fn run_application(cli: &Cli, mut config: GlobalConfig) -> Result<()> {
    if cli.is_verbose() {
        println!("{}", "Verbose mode enabled".yellow());
    }

    match &cli.command {
        None => handle_run_command(&mut config, &[], &[], None, false).await,
        Some(Commands::Run {
            methods,
            challenges,
            workers,
            dry_run,
        }) => handle_run_command(&mut config, methods, challenges, *workers, *dry_run).await,
        Some(Commands::Check {
            path,
            no_shape_check,
            allow_all_zero,
        }) => handle_check_command(&config, path, *no_shape_check, *allow_all_zero).await,
        Some(Commands::List { challenges }) => handle_list_command(&config, challenges).await,
    }
}

async fn handle_run_command(
    config: &mut GlobalConfig,
    methods: &[segfuse::domain::FusionMethod],
    challenges: &[String],
    workers: Option<usize>,
    dry_run: bool,
) -> Result<()> {
    if let Some(workers) = workers {
        config.workers = workers;
        config.validate().context("Invalid worker count")?;
    }
    config.require_probe_command()?;
    if !dry_run {
        config.require_fusion_command()?;
    }

    let oracle = ValidationOracle::new(Arc::new(CommandProbe::new(config.probe.clone())));
    let fuser = Arc::new(CommandFuser::new(
        config.fusion.command_config(),
        config.fusion.uninitialized_markers.clone(),
    ));
    let runner = BatchRunner::new(JobPlanner::new(oracle), DispatchPool::new(config.workers), fuser)
        .with_progress(Arc::new(ConsoleProgress))
        .with_dry_run(dry_run);

    let filter = BatchFilter {
        methods: methods.to_vec(),
        challenges: challenges.to_vec(),
    };
    let batch = configurations(config, &filter);
    info!("Running {} configurations with {} workers (dry run: {})", batch.len(), config.workers, dry_run);

    println!("*** starting at {} ***", Local::now().format("%H:%M:%S%.6f"));
    let report = runner.run_batch(batch).await;

    for failed in &report.failed_configurations {
        println!("{} {}: {}", "Configuration failed:".red(), failed.label, failed.error);
    }
    let fused = if dry_run {
        format!("{} would be fused", report.enqueued())
    } else {
        format!("{} fused", report.completed())
    };
    println!(
        "{} {} runs, {}, {} skipped, {} failed",
        "Summary:".green(),
        report.runs.len(),
        fused,
        report.skipped(),
        report.failed()
    );
    println!("*** finished at: {} ***", Local::now().format("%H:%M:%S%.6f"));
    Ok(())
}

async fn handle_check_command(
    config: &GlobalConfig,
    path: &Path,
    no_shape_check: bool,
    allow_all_zero: bool,
) -> Result<()> {
    config.require_probe_command()?;
    info!("Checking artifact: {}", path.display());

    let mut policy = config.validation.clone();
    if no_shape_check {
        policy = policy.without_shape_check();
    }
    if allow_all_zero {
        policy = policy.allow_all_zero();
    }

    let oracle = ValidationOracle::new(Arc::new(CommandProbe::new(config.probe.clone())));
    let verdict = oracle.inspect(path, &policy).await;
    if verdict.valid {
        println!("{} {}: {}", "Valid:".green(), path.display(), verdict.reason);
    } else {
        println!("{} {}: {}", "Invalid:".red(), path.display(), verdict.reason);
    }
    Ok(())
}

async fn handle_list_command(config: &GlobalConfig, challenges: &[String]) -> Result<()> {
    let filter = BatchFilter {
        methods: Vec::new(),
        challenges: challenges.to_vec(),
    };

    for (method, group) in configurations(config, &filter) {
        let label = format!("{} {}", method, group.label);
        match WorkSetResolver::work_items(&group).await {
            Ok(items) => println!(
                "{} [{}] {} fusable -> {}",
                label.cyan(),
                group.joined_labels(),
                items.len(),
                group.output_dir.display()
            ),
            Err(e) => println!("{} {}", label.cyan(), e.to_string().red()),
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();

    setup_logging(cli.is_verbose()).context("Failed to setup logging")?;

    // Load configuration
    let config = load_config(cli.config.as_ref()).context("Failed to load configuration")?;
    config.validate().context("Invalid configuration")?;

    info!("Starting with config from: {:?}", cli.config);

    run_application(&cli, config).await.context("Application failed")?;

    Ok(())
}
