use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::Deserialize;

use crate::diagnostics::{Diagnostics, LogFile};

pub const DEFAULT_LOG_FILE: &str = "code_log.txt";

pub const DEFAULT_URL: &str =
    "https://web.archive.org/web/20230908091635/https://en.wikipedia.org/wiki/List_of_largest_banks";

/// Run parameters. Layered: defaults < `bank_etl.toml` < `BANK_ETL_*` env vars.
/// CLI flags are applied on top by `main`.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub url: String,
    pub table_selector: String,
    pub exchange_rate_csv: PathBuf,
    pub output_csv: PathBuf,
    pub db_path: PathBuf,
    pub table_name: String,
    pub log_file: PathBuf,
}

impl Settings {
    /// `file` replaces the optional `bank_etl.toml` and must exist.
    pub fn load(file: Option<&Path>) -> Result<Self> {
        let file_source = match file {
            Some(p) => File::from(p).required(true),
            None => File::with_name("bank_etl").required(false),
        };

        Config::builder()
            .set_default("url", DEFAULT_URL)?
            .set_default("table_selector", "class=wikitable")?
            .set_default("exchange_rate_csv", "./exchange_rate.csv")?
            .set_default("output_csv", "./Largest_banks_data.csv")?
            .set_default("db_path", "Banks.db")?
            .set_default("table_name", "Largest_banks")?
            .set_default("log_file", DEFAULT_LOG_FILE)?
            .add_source(file_source)
            .add_source(Environment::with_prefix("BANK_ETL"))
            .build()
            .context("Failed to load settings")?
            .try_deserialize()
            .context("Invalid settings")
    }

    /// Like [`Settings::load`], but a failure is also written to `log_file`
    /// (or the default log file), since no configured sink exists yet.
    pub fn load_logged(file: Option<&Path>, log_file: Option<&Path>) -> Result<Self> {
        Self::load(file).inspect_err(|e| {
            let path = log_file.unwrap_or(Path::new(DEFAULT_LOG_FILE));
            LogFile::new(path).error(&format!("Workflow execution failed: {:#}", e));
        })
    }
}
