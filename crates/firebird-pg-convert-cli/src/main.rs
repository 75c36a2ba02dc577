//! firebird-pg-convert CLI - Firebird to PostgreSQL script generation.

use clap::{Parser, Subcommand};
use firebird_pg_convert::{
    provider, Config, ConvertError, DataFormat, DialectTranspiler, Orchestrator, SchemaProvider,
    TranslationResult,
};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tokio_util::sync::CancellationToken;
use tracing::{info, Level};

#[cfg(unix)]
use tokio::signal::unix::{signal, SignalKind};

#[derive(Parser)]
#[command(name = "firebird-pg-convert")]
#[command(about = "Convert Firebird databases and scripts to PostgreSQL")]
#[command(version)]
struct Cli {
    /// Path to YAML configuration file
    #[arg(short, long, default_value = "config.yaml")]
    config: PathBuf,

    /// Output JSON statistics instead of a summary
    #[arg(long)]
    output_json: bool,

    /// Log format: text or json
    #[arg(long, default_value = "text")]
    log_format: String,

    /// Log verbosity: debug, info, warn, error
    #[arg(long, default_value = "info")]
    verbosity: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a PostgreSQL script from a database snapshot
    Generate {
        /// Override the snapshot path from the config
        #[arg(long)]
        snapshot: Option<PathBuf>,

        /// Write the script here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Emit data as COPY blocks instead of INSERT statements
        #[arg(long)]
        copy: bool,

        /// Schema only, no data
        #[arg(long)]
        no_data: bool,

        /// Wrap each table's data in BEGIN/COMMIT
        #[arg(long)]
        wrap_transactions: bool,

        /// Write a plain-text run report to this file
        #[arg(long)]
        report: Option<PathBuf>,
    },

    /// Rewrite a Firebird SQL script for PostgreSQL
    Transpile {
        /// Firebird script to read
        input: PathBuf,

        /// Write the script here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Load the configuration and test the source connection
    Check,

    /// Write a default configuration file
    Init {
        /// Output path for configuration file [default: config.yaml]
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Overwrite an existing file
        #[arg(long, short)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{}", e.format_detailed());
            ExitCode::from(e.exit_code())
        }
    }
}

async fn run() -> Result<ExitCode, ConvertError> {
    let cli = Cli::parse();

    // Init writes a file and nothing else
    if let Commands::Init { output, force } = cli.command {
        let output_path = output.unwrap_or_else(|| PathBuf::from("config.yaml"));
        write_default_config(&output_path, force)?;
        println!("Configuration written to {}", output_path.display());
        return Ok(ExitCode::SUCCESS);
    }

    setup_logging(&cli.verbosity, &cli.log_format);

    match cli.command {
        Commands::Init { .. } => unreachable!(), // Handled above
        Commands::Transpile { input, output } => {
            transpile(&input, output.as_deref(), cli.output_json)
        }
        Commands::Check => {
            let config = Config::load(&cli.config)?;
            info!("Loaded configuration from {:?}", cli.config);
            check(&config, cli.output_json)
        }
        Commands::Generate {
            snapshot,
            output,
            copy,
            no_data,
            wrap_transactions,
            report,
        } => {
            let mut config = if cli.config.exists() {
                info!("Loaded configuration from {:?}", cli.config);
                Config::load(&cli.config)?
            } else if snapshot.is_some() {
                Config::default()
            } else {
                return Err(ConvertError::Config(format!(
                    "Configuration file not found: {}",
                    cli.config.display()
                )));
            };

            // Apply overrides
            if let Some(path) = snapshot {
                config.source.snapshot = Some(path);
            }
            if let Some(path) = output {
                config.output.path = Some(path);
            }
            if copy {
                config.translation.data_format = DataFormat::Copy;
            }
            if no_data {
                config.translation.include_data = false;
            }
            if wrap_transactions {
                config.translation.wrap_transactions = true;
            }
            config.validate()?;

            let cancel_token = setup_signal_handler();
            let result = generate(config.clone(), cancel_token).await?;

            write_script(config.output.path.as_deref(), &result.sql)?;
            if let Some(path) = report {
                std::fs::write(&path, result.report())?;
                info!("Report written to {}", path.display());
            }
            print_summary(&result, cli.output_json, config.output.path.is_none())?;

            Ok(ExitCode::from(result.stats.status.exit_code()))
        }
    }
}

async fn generate(
    config: Config,
    cancel_token: CancellationToken,
) -> Result<TranslationResult, ConvertError> {
    let source = provider::from_source_config(&config.source)?;
    let orchestrator = Orchestrator::new(config, source)?;

    // The engine is synchronous; keep it off the signal-handling runtime threads
    tokio::task::spawn_blocking(move || orchestrator.run(Some(cancel_token)))
        .await
        .map_err(|e| ConvertError::Io(std::io::Error::other(e.to_string())))
}

fn transpile(
    input: &Path,
    output: Option<&Path>,
    output_json: bool,
) -> Result<ExitCode, ConvertError> {
    let result = DialectTranspiler::new().transpile_file(input)?;
    write_script(output, &result.sql)?;

    let stats = &result.stats;
    if output_json {
        let json = serde_json::to_string_pretty(stats)?;
        if output.is_some() {
            println!("{}", json);
        } else {
            eprintln!("{}", json);
        }
    } else {
        eprintln!("\nTranspile completed!");
        eprintln!("  Lines: {}", stats.total_lines);
        eprintln!("  Rules applied: {}", stats.rules_applied.len());
        eprintln!("  Triggers: {}", stats.converted_objects.triggers);
        eprintln!("  Procedures: {}", stats.converted_objects.procedures);
        eprintln!("  Warnings: {}", stats.warnings.len());
        for w in &stats.warnings {
            eprintln!("    - {}", w);
        }
    }

    if !stats.errors.is_empty() {
        return Err(ConvertError::Transpile(stats.errors.join("; ")));
    }
    Ok(ExitCode::SUCCESS)
}

fn check(config: &Config, output_json: bool) -> Result<ExitCode, ConvertError> {
    let mut source = provider::from_source_config(&config.source)?;
    let info = source.connect()?;
    source.close();

    if output_json {
        println!("{}", serde_json::to_string_pretty(&info)?);
    } else {
        println!("Source: {}", config.source.display_label());
        println!("  Database: {}", info.database);
        println!("  Server version: {}", info.server_version);
        println!("  Charset: {}", info.charset);
        println!("  Tables: {}", info.table_count);
        println!("  Views: {}", info.view_count);
        println!("  Generators: {}", info.generator_count);
        println!("\n  Overall: OK");
    }
    Ok(ExitCode::SUCCESS)
}

fn write_default_config(path: &Path, force: bool) -> Result<(), ConvertError> {
    if path.exists() && !force {
        return Err(ConvertError::Config(format!(
            "{} already exists (use --force to overwrite)",
            path.display()
        )));
    }
    let mut config = Config::default();
    config.source.snapshot = Some(PathBuf::from("database.json"));
    let yaml = format!(
        "# firebird-pg-convert configuration\n{}",
        config.to_yaml()?
    );
    std::fs::write(path, yaml)?;
    Ok(())
}

fn write_script(path: Option<&Path>, sql: &str) -> Result<(), ConvertError> {
    match path {
        Some(path) => {
            std::fs::write(path, sql)?;
            info!("Script written to {}", path.display());
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(sql.as_bytes())?;
            stdout.flush()?;
        }
    }
    Ok(())
}

/// Summary or JSON stats; on stderr when the script itself went to stdout.
fn print_summary(
    result: &TranslationResult,
    output_json: bool,
    script_on_stdout: bool,
) -> Result<(), ConvertError> {
    let text = if output_json {
        result.to_json()?
    } else {
        let s = &result.stats;
        let mut lines = vec![
            format!("\nTranslation {}!", s.status),
            format!("  Run ID: {}", s.run_id),
            format!("  Duration: {:.2}s", s.duration_seconds),
            format!("  Tables: {}/{}", s.processed_tables_schema, s.total_tables),
            format!("  Rows: {}/{}", s.processed_rows, s.total_rows),
            format!("  Sequences: {}", s.processed_sequences),
            format!("  Views: {}", s.processed_views),
            format!("  Warnings: {}", s.warnings.len()),
        ];
        if !s.errors.is_empty() {
            lines.push(format!("  Errors: {:?}", s.errors));
        }
        lines.join("\n")
    };

    if script_on_stdout {
        eprintln!("{}", text);
    } else {
        println!("{}", text);
    }
    Ok(())
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
        .with_writer(std::io::stderr)
        .with_target(false);

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
fn setup_signal_handler() -> CancellationToken {
    let cancel_token = CancellationToken::new();

    let token_int = cancel_token.clone();
    let token_term = cancel_token.clone();

    tokio::spawn(async move {
        if let Ok(mut sigint) = signal(SignalKind::interrupt()) {
            sigint.recv().await;
            eprintln!("\nReceived SIGINT. Stopping after the current table...");
            token_int.cancel();
        }
    });

    tokio::spawn(async move {
        if let Ok(mut sigterm) = signal(SignalKind::terminate()) {
            sigterm.recv().await;
            eprintln!("\nReceived SIGTERM. Stopping after the current table...");
            token_term.cancel();
        }
    });

    cancel_token
}

/// Setup signal handler for Windows (only Ctrl-C)
#[cfg(not(unix))]
fn setup_signal_handler() -> CancellationToken {
    let cancel_token = CancellationToken::new();
    let token = cancel_token.clone();

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("\nReceived Ctrl-C. Stopping after the current table...");
            token.cancel();
        }
    });

    cancel_token
}
