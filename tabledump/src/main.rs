//! Command-line front end for tabledump configurations.
//!
//! Resolves a dump configuration ahead of a dump run so that configuration
//! errors surface before any row is read, and checks that the source
//! database is reachable with the configured profile.
//!
//! # Security Guarantees
//! - Passwords are never printed or logged
//! - Connections are opened read-only where the platform supports it

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use tabledump_core::{
    ConnectionHandler, DumpError, DumperConfig, PlatformKind, Result, SqlxConnector,
    init_logging,
};
use tracing::{error, info, warn};

#[derive(Parser)]
#[command(name = "tabledump")]
#[command(about = "Database table dump configuration tool")]
#[command(version)]
#[command(long_about = "
tabledump - configuration checks for anonymizing table dumps

A dump configuration names the source database, the tables to export and
the filters applied to their columns. Tables may depend on other tables,
and data-dependent filters copy values collected from another table.

EXAMPLES:
  tabledump --config dump.yaml check
  tabledump --config dump.yaml check --format json
  TABLEDUMP_CONFIG=dump.yaml tabledump test-connection
")]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    /// Configuration file
    #[arg(
        short,
        long,
        global = true,
        env = "TABLEDUMP_CONFIG",
        help = "Configuration file (.yaml, .yml or .json)"
    )]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Resolve the configuration and print the table graph
    Check(CheckArgs),
    /// Open, adjust and probe the configured database connection
    TestConnection,
    /// List supported database drivers
    List,
}

#[derive(Args)]
pub struct CheckArgs {
    /// Output format
    #[arg(short, long, value_enum, default_value_t = ReportFormat::Text)]
    pub format: ReportFormat,
}

/// Formats for the `check` report
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReportFormat {
    /// Human-readable summary
    Text,
    /// Resolved configuration as JSON
    Json,
}

#[derive(Args)]
pub struct GlobalArgs {
    /// Increase verbosity
    #[arg(
        short,
        long,
        global = true,
        action = clap::ArgAction::Count,
        help = "Increase verbosity (-v, -vv, -vvv)"
    )]
    pub verbose: u8,

    /// Suppress output
    #[arg(short, long, global = true, help = "Suppress all output except errors")]
    pub quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.global.verbose, cli.global.quiet)?;

    match &cli.command {
        Some(Command::Check(args)) => check(config_path(&cli)?, args.format),
        None => check(config_path(&cli)?, ReportFormat::Text),
        Some(Command::TestConnection) => test_connection(config_path(&cli)?).await,
        Some(Command::List) => {
            print!("{}", render_supported_drivers());
            Ok(())
        }
    }
}

fn config_path(cli: &Cli) -> Result<&Path> {
    cli.config.as_deref().ok_or_else(|| {
        DumpError::configuration("no configuration file given (use --config or TABLEDUMP_CONFIG)")
    })
}

/// Loads a configuration file, logging failures.
fn load_config(path: &Path) -> Result<DumperConfig> {
    info!("Loading configuration from {}", path.display());
    DumperConfig::load(path).map_err(|e| {
        error!("Configuration check failed: {}", e);
        e
    })
}

/// Resolves the configuration and prints the report
fn check(path: &Path, format: ReportFormat) -> Result<()> {
    let config = load_config(path)?;
    let report = match format {
        ReportFormat::Text => render_summary(&config),
        ReportFormat::Json => render_json(&config)?,
    };
    println!("{}", report);
    Ok(())
}

/// Opens the configured database once, then probes it the way a dump run
/// does between row batches.
async fn test_connection(path: &Path) -> Result<()> {
    let config = load_config(path)?;
    info!("Testing connection to {}", config.database());

    let mut handler = ConnectionHandler::new(config.database().clone(), SqlxConnector);
    let platform = handler.platform().await.map_err(|e| {
        error!("Connection test failed: {}", e);
        e
    })?;
    info!(
        "Connected to {} using the '{}' adjustment",
        platform,
        handler.adjustment().name()
    );

    handler.reconnect_if_necessary().await?;

    println!("Connection to {} database successful", platform);
    println!("Adjustment: {}", handler.adjustment().name());
    for (native, portable) in handler.type_mappings().iter() {
        println!("Type mapping: {} -> {}", native, portable);
    }

    if let Err(e) = handler.close().await {
        warn!("Failed to close database connection: {}", e);
    }
    Ok(())
}

/// Human-readable summary of a resolved configuration.
fn render_summary(config: &DumperConfig) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Database: {}", config.database());
    if let Some(engine) = config.engine_type_name() {
        let _ = writeln!(out, "Engine: {}", engine);
    }
    if !config.table_allow_list().is_empty() {
        let _ = writeln!(out, "Allowed tables: {}", config.table_allow_list().join(", "));
    }

    let _ = writeln!(out, "Tables: {}", config.tables().count());
    for table in config.tables() {
        let _ = write!(out, "  {}", table.name());
        if table.ignore_table() {
            out.push_str(" (ignored)");
        } else if table.ignore_content() {
            out.push_str(" (structure only)");
        }
        out.push('\n');

        if !table.dependencies().is_empty() {
            let _ = writeln!(out, "    depends on: {}", table.dependencies().join(", "));
        }
        if !table.collect_columns().is_empty() {
            let columns: Vec<&str> = table.collect_columns().iter().map(String::as_str).collect();
            let _ = writeln!(out, "    collects: {}", columns.join(", "));
        }
        for (column, source_table, source_column) in table.data_dependencies() {
            let _ = writeln!(
                out,
                "    {} <- {}.{}",
                column, source_table, source_column
            );
        }
    }

    match config.dependency_order() {
        Ok(order) => {
            let _ = write!(out, "Dump order: {}", order.join(", "));
        }
        Err(e) => {
            let _ = write!(out, "Dump order: unavailable ({})", e);
        }
    }
    out
}

/// Resolved configuration as pretty JSON, with the dump order attached.
fn render_json(config: &DumperConfig) -> Result<String> {
    let mut value = serde_json::to_value(config)
        .map_err(|e| DumpError::serialization("Resolved configuration", e))?;
    let order = config.dependency_order().ok();
    if let Some(object) = value.as_object_mut() {
        object.insert("dependency_order".to_string(), serde_json::json!(order));
    }
    serde_json::to_string_pretty(&value)
        .map_err(|e| DumpError::serialization("Resolved configuration", e))
}

fn render_supported_drivers() -> String {
    let mut out = String::from("Supported database drivers:\n");
    for platform in PlatformKind::ALL {
        let _ = writeln!(
            out,
            "  {:<12} {}",
            platform.to_string(),
            platform.aliases().join(", ")
        );
    }
    out
}
