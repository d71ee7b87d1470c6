use clap::Parser;
use colored::*;
use eyre::{Context, Result, eyre};
use log::info;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use aeroforge::config::Config;
use aeroforge::domain::Status;
use aeroforge::manager::{MissionManager, MissionManagerConfig, MissionRecord, mission_files, status_of};
use aeroforge::storage::{JsonlStorage, MISSIONS, Storage};
use aeroforge::workflow::Collaborators;

mod cli;

use cli::Cli;
use cli::commands::Commands;

const POLL_INTERVAL: Duration = Duration::from_millis(500);

fn setup_logging() -> Result<()> {
    let log_dir = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("aeroforge")
        .join("logs");

    fs::create_dir_all(&log_dir).context("Failed to create log directory")?;

    let log_file = log_dir.join("aeroforge.log");

    let target = Box::new(
        fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_file)
            .context("Failed to open log file")?,
    );

    env_logger::Builder::from_default_env()
        .target(env_logger::Target::Pipe(target))
        .init();

    info!("Logging initialized, writing to: {}", log_file.display());
    Ok(())
}

fn open_storage(config: &Config) -> Result<Arc<JsonlStorage>> {
    let storage = JsonlStorage::new(&config.storage.dir)
        .with_context(|| format!("Failed to open mission store at {}", config.storage.dir.display()))?;
    Ok(Arc::new(storage))
}

fn load_record(config: &Config, id: &str) -> Result<MissionRecord> {
    open_storage(config)?
        .get(MISSIONS, id)?
        .ok_or_else(|| eyre!("Mission not found: {}", id))
}

fn colored_status(status: Status) -> ColoredString {
    let text = status.to_string();
    match status {
        Status::Complete => text.green(),
        Status::Failed | Status::Cancelled => text.red(),
        _ => text.yellow(),
    }
}

async fn run_application(cli: &Cli, mut config: Config) -> Result<()> {
    info!("Starting application");

    if cli.is_verbose() {
        println!("{}", "Verbose mode enabled".yellow());
    }

    match &cli.command {
        Commands::Run {
            prompt,
            max_iterations,
            offline,
        } => {
            if *offline {
                config.workflow.offline_designs = true;
            }
            handle_run_command(&prompt.join(" "), *max_iterations, &config, cli.is_verbose()).await
        }
        Commands::Status { id } => handle_status_command(id, &config),
        Commands::Results { id } => handle_results_command(id, &config),
        Commands::List => handle_list_command(&config),
    }
}

async fn handle_run_command(prompt: &str, max_iterations: Option<u32>, config: &Config, verbose: bool) -> Result<()> {
    let collaborators = Collaborators::from_config(config).context("Failed to set up collaborators")?;
    let manager = MissionManager::new(
        open_storage(config)?,
        collaborators,
        MissionManagerConfig {
            output_root: config.output.root.clone(),
            default_max_iterations: config.workflow.max_iterations,
        },
    );

    let id = manager.submit(prompt, max_iterations).await?;
    println!("{} {}", "Mission:".green(), id);

    let mut printed = 0;
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                println!("{}", "Cancelling after the current stage...".yellow());
                manager.cancel(&id).await?;
            }
            _ = tokio::time::sleep(POLL_INTERVAL) => {}
        }

        let status = manager.status(&id).await?;
        for line in status.logs.iter().skip(printed) {
            println!("  {}", line);
        }
        printed = status.logs.len();
        if status.status.is_terminal() {
            break;
        }
    }

    let state = manager.wait(&id).await?;
    println!(
        "{} {} after {} iteration(s)",
        "Finished:".green(),
        colored_status(state.status),
        state.iteration
    );
    println!("  metrics: {}", state.simulation_metrics.summary());
    if let Some(location) = &state.artifact_location {
        println!("  description: {}", location.display());
    }
    if verbose && let Some(feedback) = &state.feedback {
        println!("{}\n{}", "Feedback:".cyan(), feedback);
    }
    Ok(())
}

fn handle_status_command(id: &str, config: &Config) -> Result<()> {
    let status = status_of(&load_record(config, id)?);
    println!("{} {}", "Mission:".green(), status.id);
    println!("  status: {}", colored_status(status.status));
    println!("  iteration: {}", status.iteration);
    println!("  metrics: {}", status.metrics.summary());
    if !status.errors.is_empty() {
        println!("  {}", "errors:".red());
        for error in &status.errors {
            println!("    - {}", error);
        }
    }
    println!("  logs:");
    for line in &status.logs {
        println!("    {}", line);
    }
    Ok(())
}

fn handle_results_command(id: &str, config: &Config) -> Result<()> {
    let record = load_record(config, id)?;
    let files = mission_files(&config.output.root, id)?;

    println!("{} {} ({})", "Mission:".green(), id, colored_status(record.state.status));
    println!("  metrics: {}", record.state.simulation_metrics.summary());
    if files.is_empty() {
        println!("  no generated files");
    }
    for file in files {
        println!("  {}", file.display());
    }
    Ok(())
}

fn handle_list_command(config: &Config) -> Result<()> {
    let mut records: Vec<MissionRecord> = open_storage(config)?.list(MISSIONS)?;
    records.sort_by_key(|r| r.created_at);

    if records.is_empty() {
        println!("No missions yet");
    }
    for record in records {
        println!(
            "{}  {:<10} iter {}  {}",
            record.id,
            colored_status(record.state.status),
            record.state.iteration,
            record.state.mission_prompt
        );
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    setup_logging().context("Failed to setup logging")?;

    let cli = Cli::parse();

    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;

    info!("Starting with config from: {:?}", cli.config);

    run_application(&cli, config).await.context("Application failed")?;

    Ok(())
}
