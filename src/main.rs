mod db;
mod diagnostics;
mod error;
mod export;
mod fetch;
mod model;
mod parser;
mod pipeline;
mod rates;
mod settings;
mod transform;

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Instant;

use clap::{Parser, Subcommand};

use diagnostics::LogFile;
use pipeline::Source;
use settings::Settings;

#[derive(Parser)]
#[command(name = "bank_etl", about = "Largest banks by market cap: extract, convert, load, query")]
struct Cli {
    /// Settings file (default: ./bank_etl.toml if present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// SQLite database path
    #[arg(long, global = true)]
    db: Option<PathBuf>,
    /// Table name in the database
    #[arg(long, global = true)]
    table: Option<String>,
    /// Diagnostics log file
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract + transform + load, then print the report queries
    Run {
        /// Page to fetch (default: configured url)
        #[arg(long, conflicts_with = "html")]
        url: Option<String>,
        /// Read a saved copy of the page instead of fetching
        #[arg(long)]
        html: Option<PathBuf>,
        /// Table attribute criterion, e.g. "class=wikitable"
        #[arg(short, long)]
        selector: Option<String>,
        /// Exchange rate CSV (Currency,Rate)
        #[arg(long)]
        rates: Option<PathBuf>,
        /// CSV output path
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Run a read query against the database
    Query {
        /// SQL statement, executed as given
        sql: String,
        /// Print rows as a JSON array instead of tuples
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();

    let mut settings = Settings::load_logged(cli.config.as_deref(), cli.log_file.as_deref())?;
    if let Some(db) = cli.db {
        settings.db_path = db;
    }
    if let Some(table) = cli.table {
        settings.table_name = table;
    }
    if let Some(log_file) = cli.log_file {
        settings.log_file = log_file;
    }
    let diag = LogFile::new(&settings.log_file);

    let ok = match cli.command {
        Commands::Run {
            url,
            html,
            selector,
            rates,
            output,
        } => {
            if let Some(s) = selector {
                settings.table_selector = s;
            }
            if let Some(r) = rates {
                settings.exchange_rate_csv = r;
            }
            if let Some(o) = output {
                settings.output_csv = o;
            }
            let url = url.unwrap_or_else(|| settings.url.clone());
            let source = match &html {
                Some(path) => Source::File(path),
                None => Source::Url(&url),
            };
            pipeline::run(&settings, source, &diag).await.is_ok()
        }
        Commands::Query { sql, json } => {
            match db::run_query(&sql, &settings.db_path, &diag) {
                Ok(rows) if json => {
                    println!("{}", serde_json::to_string_pretty(&rows)?);
                    true
                }
                Ok(rows) => {
                    for row in &rows {
                        println!("{}", db::format_row(row));
                    }
                    true
                }
                Err(e) => {
                    eprintln!("{}", e);
                    false
                }
            }
        }
    };

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        println!("\nDone in {}", format_duration(elapsed));
    }

    Ok(if ok { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}

fn format_duration(d: std::time::Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{:.1}s", d.as_secs_f64())
    } else {
        format!("{}m {}s", secs / 60, secs % 60)
    }
}
