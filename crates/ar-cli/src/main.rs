//! Asset Relay CLI
//!
//! Command-line interface for the Asset Relay inventory → MDM
//! synchronization service.

use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;

mod commands;
mod config;
mod validator;

use ar_connectors::{Connector, ConnectorHealth, JamfConnector, SnipeItConnector};
use commands::{run_sync, SyncInvocation};
use config::AppConfig;
use validator::ConfigValidator;

#[derive(Parser)]
#[command(name = "asset-relay")]
#[command(version)]
#[command(about = "One-way synchronization of inventory assets into an MDM", long_about = None)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Output format (text, json)
    #[arg(long, default_value = "text")]
    format: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum OutputFormat {
    Text,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            _ => Err(format!("Invalid output format: {}", s)),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Run one synchronization pass
    Sync {
        /// Number of days to look back (overrides config)
        #[arg(short = 'd', long)]
        days: Option<i64>,

        /// Number of hours to look back (overrides config)
        #[arg(long)]
        hours: Option<i64>,

        /// Skip building/department reconciliation
        #[arg(long)]
        skip_reconcile: bool,

        /// Map everything but deliver nothing
        #[arg(long)]
        dry_run: bool,
    },

    /// Check connectivity to both systems
    Check,

    /// Validate configuration
    Validate {
        /// Configuration file to validate
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Show current configuration
    Config {
        /// Show secrets (redacted by default)
        #[arg(long)]
        show_secrets: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config_path = cli.config.clone().unwrap_or_else(default_config_path);
    let explicit_config = cli.config.is_some();
    let config = match AppConfig::load(&config_path) {
        Ok(config) => config,
        Err(e) if explicit_config => {
            eprintln!("{}: {:#}", "Configuration error".red().bold(), e);
            std::process::exit(1);
        }
        Err(_) => {
            if cli.verbose {
                eprintln!("Using default configuration (no config file found)");
            }
            AppConfig::default()
        }
    };

    // Initialize logging
    let log_level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        config
            .logging
            .level
            .parse()
            .unwrap_or(tracing::Level::INFO)
    };

    ar_observability::logging::init_logging_with_config(
        ar_observability::logging::LoggingConfig {
            level: log_level,
            json_format: cli.format == OutputFormat::Json || config.logging.json_format,
            ..Default::default()
        },
    );

    // Execute command
    match cli.command {
        Commands::Sync {
            days,
            hours,
            skip_reconcile,
            dry_run,
        } => {
            cmd_sync(
                SyncInvocation::resolve(days, hours, skip_reconcile, dry_run, &config),
                config,
                cli.format,
            )
            .await
        }
        Commands::Check => cmd_check(config).await,
        Commands::Validate { config: cfg_path } => {
            cmd_validate(cfg_path.unwrap_or(config_path)).await
        }
        Commands::Config { show_secrets } => cmd_config(config, show_secrets, cli.format).await,
    }
}

fn default_config_path() -> PathBuf {
    if let Some(dirs) = directories::ProjectDirs::from("edu", "asset-relay", "asset-relay") {
        dirs.config_dir().join("config.yaml")
    } else {
        PathBuf::from("config.yaml")
    }
}

async fn cmd_sync(
    invocation: SyncInvocation,
    config: AppConfig,
    format: OutputFormat,
) -> Result<()> {
    let validation_result = ConfigValidator::validate(&config);
    if validation_result.has_errors() || validation_result.has_warnings() {
        validation_result.print();
    }
    if validation_result.has_errors() {
        println!();
        println!(
            "{}",
            "Sync aborted due to configuration errors. Fix the errors above and try again."
                .red()
                .bold()
        );
        std::process::exit(1);
    }

    println!(
        "Looking {} days and {} hours back{}",
        invocation.days,
        invocation.hours,
        if invocation.dry_run {
            " (dry run)".yellow().to_string()
        } else {
            String::new()
        }
    );

    let report = run_sync(invocation, config).await?;

    if format == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!();
    println!("{}", "Sync Report".bold());
    println!("───────────");
    println!("  Window start: {}", report.window_start);
    println!("  Changed in window: {}", report.changed);
    println!(
        "  Retried from ledger: {} ({} no longer resolve)",
        report.retried, report.unresolved
    );
    println!("  Mapped: {}", report.mapped);
    if report.dry_run {
        println!("  Delivered: {} (dry run)", "skipped".yellow());
    } else {
        println!("  Delivered: {}", report.delivered.to_string().green());
        if report.is_clean() {
            println!("  Failed: {}", "0".green());
        } else {
            println!(
                "  Failed: {} (queued for retry on the next run)",
                report.failed.to_string().red()
            );
        }
    }

    // Individual delivery failures are recorded, not fatal.
    Ok(())
}

async fn cmd_check(config: AppConfig) -> Result<()> {
    println!("{}", "Connector Health".bold());
    println!("────────────────");

    let inventory = SnipeItConnector::new(config.inventory.to_connector_config())?;
    print_health(inventory.name(), inventory.health_check().await);

    let mdm = JamfConnector::new(config.mdm.to_connector_config())?;
    print_health(mdm.name(), mdm.health_check().await);

    Ok(())
}

fn print_health(name: &str, health: ar_connectors::ConnectorResult<ConnectorHealth>) {
    let rendered = match health {
        Ok(ConnectorHealth::Healthy) => "healthy".green().to_string(),
        Ok(ConnectorHealth::Degraded(msg)) => format!("{} ({})", "degraded".yellow(), msg),
        Ok(ConnectorHealth::Unhealthy(msg)) => format!("{} ({})", "unhealthy".red(), msg),
        Ok(ConnectorHealth::Unknown) => "unknown".yellow().to_string(),
        Err(e) => format!("{} ({})", "error".red(), e),
    };
    println!("  {}: {}", name.cyan(), rendered);
}

async fn cmd_validate(config_path: PathBuf) -> Result<()> {
    println!(
        "Validating configuration: {}",
        config_path.display().to_string().cyan()
    );

    let config = match AppConfig::load(&config_path) {
        Ok(config) => config,
        Err(e) => {
            println!("{}: {:#}", "Configuration file error".red().bold(), e);
            std::process::exit(1);
        }
    };

    let validation_result = ConfigValidator::validate(&config);
    validation_result.print();

    println!();
    println!("{}", "Configuration Summary".bold());
    println!("─────────────────────");
    println!("  Inventory: {}", config.inventory.base_url);
    println!("  MDM: {}", config.mdm.base_url);
    println!(
        "  Default window: {} days, {} hours",
        config.sync.lookback_days, config.sync.lookback_hours
    );
    println!("  Ledger: {}", config.sync.ledger_path.display());

    if validation_result.has_errors() {
        println!();
        println!(
            "{}",
            "Configuration validation failed. Fix the errors above."
                .red()
                .bold()
        );
        std::process::exit(1);
    } else if validation_result.has_warnings() {
        println!();
        println!(
            "{}",
            "Configuration is valid with warnings. Review the warnings above."
                .yellow()
                .bold()
        );
    } else {
        println!();
        println!("{}", "Configuration is valid.".green().bold());
    }

    Ok(())
}

async fn cmd_config(config: AppConfig, show_secrets: bool, format: OutputFormat) -> Result<()> {
    let display_config = if show_secrets {
        config
    } else {
        config.redact_secrets()
    };

    if format == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(&display_config)?);
    } else {
        println!("{}", serde_yaml::to_string(&display_config)?);
    }

    Ok(())
}
