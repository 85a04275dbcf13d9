mod app;
mod config;
mod environment;
mod installation;
mod service;
mod signals;

use std::collections::HashMap;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{error, info, warn};

use metronome_config::MetronomeConfig;
use metronome_core::MetronomeError;
use logging::LoggerOptions;
use metronome_scheduler::Scheduler;

use app::App;
use config::{to_logger_options, to_scheduler_config, ConfigArgs, RunArgs};
use environment::RuntimeEnvironment;
use service::HeartbeatService;

#[derive(Parser)]
#[command(name = "metronome")]
#[command(about = "Metronome: recurring-task scheduler and event loop")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the event loop until a termination signal arrives
    Run(RunArgs),
    /// Load and validate the configuration, then print a summary
    CheckConfig(ConfigArgs),
    /// Check required directories and files and their access rights
    CheckInstallation {
        /// Configuration file to check; repeat for several
        #[arg(short, long = "config", value_name = "FILE")]
        configs: Vec<PathBuf>,
        /// Log directory to check
        #[arg(long, value_name = "DIR")]
        log_dir: Option<PathBuf>,
    },
    /// Write the effective configuration to a file
    WriteConfig {
        #[command(flatten)]
        config: ConfigArgs,
        /// Target file (defaults to the user config file)
        #[arg(long, value_name = "PATH")]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let code = match execute(cli.command).await {
        Ok(()) => 0,
        Err(e) => {
            let code = exit_code(&e);
            // Logging may not be up yet if the config failed to load.
            eprintln!("metronome: {e:#}");
            error!(error = %format!("{e:#}"), code, "Fatal error");
            code
        }
    };

    info!("Terminated with exit code {code}");
    std::process::exit(code);
}

async fn execute(command: Commands) -> Result<()> {
    match command {
        Commands::Run(args) => run(args).await,
        Commands::CheckConfig(args) => {
            let paths = config_paths(&args);
            let merged = metronome_config::load_merged(&paths)
                .await
                .context("Cannot load configuration")?;
            let referenced = metronome_config::collect_referenced_vars(&merged);
            let env: HashMap<String, String> = std::env::vars().collect();
            let config = metronome_config::prepare(merged, &args.options, &env)
                .context("Cannot load configuration")?;
            print_summary(&config, &referenced);
            Ok(())
        }
        Commands::CheckInstallation { configs, log_dir } => {
            logging::init_logger(&LoggerOptions {
                json: false,
                ..LoggerOptions::default()
            })?;
            info!("Checking installation...");
            installation::check_installation(log_dir.as_deref(), &configs)?;
            info!("Installation OK!");
            println!("Installation OK!");
            Ok(())
        }
        Commands::WriteConfig { config: args, output } => {
            let config = load(&args, &args.options).await?;
            let path = output.unwrap_or_else(|| {
                metronome_config::user_config_path(&metronome_config::config_dir())
            });
            metronome_config::write_config(&config, &path).await?;
            println!("Configuration written to {}", path.display());
            Ok(())
        }
    }
}

async fn run(args: RunArgs) -> Result<()> {
    let config = load(&args.config, &args.options()).await?;

    logging::init_logger(&to_logger_options(&config))
        .map_err(|e| MetronomeError::ConfigError(format!("{e:#}")))?;
    for warning in metronome_config::validate(&config).warnings {
        warn!(path = %warning.path, message = %warning.message, "Config warning");
    }

    let runtime = RuntimeEnvironment::detect();
    info!(
        app = %config.app_name(),
        runtime = runtime.describe(),
        version = env!("CARGO_PKG_VERSION"),
        "Starting Metronome"
    );
    if let Some(snap) = &runtime.snap {
        info!(snap = %snap, "Running inside a snap");
    }

    let scheduler = Scheduler::new(to_scheduler_config(&config));
    App::new(config.app_name(), scheduler)
        .with_service(HeartbeatService::new(config.enabled_tasks()))
        .run()
        .await
        .map(|_| ())
}

async fn load(args: &ConfigArgs, options: &[String]) -> Result<MetronomeConfig> {
    metronome_config::load_and_prepare(&config_paths(args), options)
        .await
        .context("Cannot load configuration")
}

fn config_paths(args: &ConfigArgs) -> Vec<PathBuf> {
    let user_config = metronome_config::user_config_path(&metronome_config::config_dir());
    args.config_paths(Some(user_config))
}

fn print_summary(config: &MetronomeConfig, referenced_vars: &[String]) {
    println!("Configuration OK: app '{}'", config.app_name());
    println!(
        "  scheduler: slack {:?}, downtime threshold {:?}, debug mode {}, single run {}",
        config.maximum_timer_slack(),
        config.minimum_downtime_duration(),
        config.debug_mode(),
        config.single_run(),
    );
    println!("  log level: {}", config.log_level());
    if !referenced_vars.is_empty() {
        println!("  environment variables used: {}", referenced_vars.join(", "));
    }
    for task in &config.tasks {
        println!(
            "  task '{}': every {}s{}{}",
            task.name,
            task.interval_secs,
            if task.fixed_schedule { ", fixed schedule" } else { "" },
            if task.enabled { "" } else { " (disabled)" },
        );
    }
}

/// Exit status for a failed run: the first [`MetronomeError`] in the chain
/// decides, anything else is 1.
fn exit_code(err: &anyhow::Error) -> i32 {
    err.chain()
        .find_map(|cause| cause.downcast_ref::<MetronomeError>())
        .map_or(1, MetronomeError::exit_code)
}
