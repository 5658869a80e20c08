//! sqlite-mysql-migrate CLI - SQLite to MySQL/MariaDB migration.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use dialoguer::Password;
use sqlite_mysql_migrate::{
    CommitMode, Config, InsertMethod, JsonLinesProgress, MigrateError, MigrationResult,
    Orchestrator,
};
use tokio_util::sync::CancellationToken;
use tracing::{info, Level};
use tracing_subscriber::fmt::format::FmtSpan;

#[cfg(unix)]
use tokio::signal::unix::{signal, SignalKind};

#[derive(Parser)]
#[command(name = "sqlite-mysql-migrate")]
#[command(about = "Migrate a SQLite database to MySQL or MariaDB")]
#[command(version)]
struct Cli {
    /// Path to YAML configuration file
    #[arg(short, long, default_value = "config.yaml")]
    config: PathBuf,

    /// Output JSON result to stdout
    #[arg(long)]
    output_json: bool,

    /// Log format: text or json
    #[arg(long, default_value = "text")]
    log_format: String,

    /// Log verbosity: debug, info, warn, error
    #[arg(long, default_value = "info")]
    verbosity: String,

    /// Timeout in seconds for graceful shutdown (default: 60)
    #[arg(long, default_value = "60")]
    shutdown_timeout: u64,

    /// Print progress updates as JSON lines to stderr
    #[arg(long)]
    progress: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the target schema and transfer the data
    Run(RunArgs),

    /// Test database connections
    HealthCheck {
        /// Prompt for the MySQL password instead of reading it from the config file
        #[arg(long)]
        prompt_password: bool,
    },
}

/// Overrides for the `migration` section of the configuration file.
#[derive(Args)]
struct RunArgs {
    /// Override the SQLite database file
    #[arg(long)]
    sqlite_file: Option<PathBuf>,

    /// Migrate only these tables (comma separated)
    #[arg(long, value_delimiter = ',', conflicts_with = "exclude_tables")]
    tables: Vec<String>,

    /// Skip these tables (comma separated)
    #[arg(long, value_delimiter = ',')]
    exclude_tables: Vec<String>,

    /// Rows per chunk (0 transfers each table in one batch)
    #[arg(long)]
    chunk: Option<usize>,

    /// Commit after every table or after every chunk: table, chunk
    #[arg(long)]
    commit_mode: Option<CommitMode>,

    /// Conflict handling for inserted rows: DEFAULT, IGNORE, UPDATE
    #[arg(long)]
    insert_method: Option<InsertMethod>,

    /// Truncate existing target tables before loading
    #[arg(long)]
    truncate: bool,

    /// Transfer the implicit rowid as a leading column
    #[arg(long)]
    with_rowid: bool,

    /// Do not create foreign keys
    #[arg(long)]
    without_foreign_keys: bool,

    /// Create FULLTEXT indexes on text columns
    #[arg(long)]
    use_fulltext: bool,

    /// Skip indexes whose name already exists instead of renaming them
    #[arg(long)]
    ignore_duplicate_keys: bool,

    /// Migrate views as regular tables
    #[arg(long)]
    views_as_tables: bool,

    /// Create the schema only, without transferring rows
    #[arg(long, conflicts_with = "data_only")]
    schema_only: bool,

    /// Transfer rows into existing tables, without creating the schema
    #[arg(long)]
    data_only: bool,

    /// Prompt for the MySQL password instead of reading it from the config file
    #[arg(long)]
    prompt_password: bool,
}

impl RunArgs {
    fn apply(self, config: &mut Config) {
        let m = &mut config.migration;

        if let Some(path) = self.sqlite_file {
            config.source.path = path;
        }
        if !self.tables.is_empty() {
            m.include_tables = self.tables;
            m.exclude_tables.clear();
        }
        if !self.exclude_tables.is_empty() {
            m.exclude_tables = self.exclude_tables;
            m.include_tables.clear();
        }
        if let Some(chunk) = self.chunk {
            m.chunk_size = Some(chunk);
        }
        if let Some(mode) = self.commit_mode {
            m.commit_mode = mode;
        }
        if let Some(method) = self.insert_method {
            m.insert_method = method;
        }
        m.truncate_tables |= self.truncate;
        m.with_rowid |= self.with_rowid;
        m.without_foreign_keys |= self.without_foreign_keys;
        m.use_fulltext |= self.use_fulltext;
        m.ignore_duplicate_keys |= self.ignore_duplicate_keys;
        m.views_as_tables |= self.views_as_tables;
        if self.schema_only {
            m.create_tables = true;
            m.transfer_data = false;
        }
        if self.data_only {
            m.create_tables = false;
            m.transfer_data = true;
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(MigrateError::Cancelled) => {
            eprintln!("Migration interrupted");
            ExitCode::from(MigrateError::Cancelled.exit_code())
        }
        Err(e) => {
            eprintln!("{}", e.format_detailed());
            ExitCode::from(e.exit_code())
        }
    }
}

async fn run() -> Result<(), MigrateError> {
    let cli = Cli::parse();

    setup_logging(&cli.verbosity, &cli.log_format);

    let mut config = Config::load_unvalidated(&cli.config)?;
    info!("Loaded configuration from {:?}", cli.config);

    match cli.command {
        Commands::Run(args) => {
            let prompt = args.prompt_password;
            args.apply(&mut config);
            if prompt {
                config.target.password = prompt_password(&config)?;
            }
            config.validate()?;

            // Setup signal handling for graceful shutdown (SIGINT and SIGTERM)
            let cancel_token = setup_signal_handler(cli.shutdown_timeout);

            let mut orchestrator = Orchestrator::connect(config).await?;
            if cli.progress {
                orchestrator = orchestrator.with_progress(Arc::new(JsonLinesProgress));
            }

            let result = orchestrator.run(cancel_token).await;
            orchestrator.close().await;
            let result = result?;

            if cli.output_json {
                println!("{}", result.to_json()?);
            } else {
                print_summary(&result);
            }
        }

        Commands::HealthCheck { prompt_password: prompt } => {
            if prompt {
                config.target.password = prompt_password(&config)?;
            }
            config.validate()?;
            let result = Orchestrator::health_check(&config).await?;

            if cli.output_json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                println!("Health Check Results:");
                println!(
                    "  Source (SQLite {}): {} ({}ms)",
                    result.source_version.as_deref().unwrap_or("-"),
                    if result.source_connected { "OK" } else { "FAILED" },
                    result.source_latency_ms
                );
                if let Some(ref err) = result.source_error {
                    println!("    Error: {}", err);
                }
                println!(
                    "  Target (MySQL {}): {} ({}ms)",
                    result.target_version.as_deref().unwrap_or("-"),
                    if result.target_connected { "OK" } else { "FAILED" },
                    result.target_latency_ms
                );
                if let Some(ref err) = result.target_error {
                    println!("    Error: {}", err);
                }
                println!(
                    "\n  Overall: {}",
                    if result.healthy { "HEALTHY" } else { "UNHEALTHY" }
                );
            }

            if !result.healthy {
                return Err(MigrateError::Config("Health check failed".to_string()));
            }
        }
    }

    Ok(())
}

fn print_summary(result: &MigrationResult) {
    println!("\nMigration completed!");
    println!("  Run ID: {}", result.run_id);
    println!("  Duration: {:.2}s", result.duration_seconds);
    println!("  Tables: {}/{}", result.tables_success, result.tables_total);
    if result.views_created > 0 {
        println!("  Views: {}", result.views_created);
    }
    println!("  Rows: {}", result.rows_transferred);
    println!("  Throughput: {} rows/sec", result.rows_per_second);
    for table in &result.tables {
        println!(
            "    {}: {} rows, {} indexes, {} foreign keys",
            table.name, table.rows, table.indexes, table.foreign_keys
        );
    }
}

fn prompt_password(config: &Config) -> Result<String, MigrateError> {
    Password::new()
        .with_prompt(format!(
            "MySQL password for {}@{}",
            config.target.user, config.target.host
        ))
        .allow_empty_password(true)
        .interact()
        .map_err(|e| MigrateError::Config(format!("reading password: {}", e)))
}

fn setup_logging(verbosity: &str, format: &str) {
    let level = match verbosity.to_lowercase().as_str() {
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_span_events(FmtSpan::CLOSE)
        .with_target(false)
        .with_writer(std::io::stderr);

    if format == "json" {
        subscriber.json().init();
    } else {
        subscriber.init();
    }
}

/// Setup signal handlers for graceful shutdown.
/// Handles both SIGINT (Ctrl-C) and SIGTERM.
/// Returns a CancellationToken that will be cancelled when a signal is received.
#[cfg(unix)]
fn setup_signal_handler(shutdown_timeout: u64) -> CancellationToken {
    let cancel_token = CancellationToken::new();

    for (kind, name) in [
        (SignalKind::interrupt(), "SIGINT"),
        (SignalKind::terminate(), "SIGTERM"),
    ] {
        let token = cancel_token.clone();
        tokio::spawn(async move {
            let mut stream = match signal(kind) {
                Ok(stream) => stream,
                Err(e) => {
                    eprintln!("Failed to setup {} handler: {}", name, e);
                    return;
                }
            };
            stream.recv().await;
            eprintln!(
                "\nReceived {}. Shutting down gracefully (timeout: {}s)...",
                name, shutdown_timeout
            );
            token.cancel();
            tokio::time::sleep(std::time::Duration::from_secs(shutdown_timeout)).await;
            eprintln!("Shutdown timeout exceeded, exiting");
            std::process::exit(i32::from(MigrateError::Cancelled.exit_code()));
        });
    }

    cancel_token
}

/// Setup signal handler for Windows (only Ctrl-C)
#[cfg(not(unix))]
fn setup_signal_handler(shutdown_timeout: u64) -> CancellationToken {
    let cancel_token = CancellationToken::new();
    let token = cancel_token.clone();

    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            eprintln!("Failed to setup Ctrl-C handler: {}", e);
            return;
        }
        eprintln!("\nReceived Ctrl-C. Shutting down gracefully...");
        token.cancel();
        tokio::time::sleep(std::time::Duration::from_secs(shutdown_timeout)).await;
        std::process::exit(i32::from(MigrateError::Cancelled.exit_code()));
    });

    cancel_token
}
