use std::path::Path;
use std::time::Instant;

use crate::db::{self, format_row};
use crate::diagnostics::Diagnostics;
use crate::error::EtlResult;
use crate::export;
use crate::fetch;
use crate::model::{BankRecord, EnrichedBankRecord};
use crate::parser::{self, TableSelector};
use crate::rates::RateTable;
use crate::settings::Settings;
use crate::transform;

const PREVIEW_ROWS: usize = 5;

/// Where the HTML comes from.
pub enum Source<'a> {
    Url(&'a str),
    File(&'a Path),
}

/// The queries printed at the end of every run, as (title, statement).
pub fn report_queries(table: &str) -> Vec<(&'static str, String)> {
    let t = db::quote_ident(table);
    vec![
        ("Contents of the entire table:", format!("SELECT * FROM {}", t)),
        (
            "Average market capitalization in GBP:",
            format!("SELECT AVG(Market_Cap_GBP_Billion) FROM {}", t),
        ),
        ("Top 5 banks by name:", format!("SELECT Name FROM {} LIMIT 5", t)),
    ]
}

/// Runs every stage in order. The first failing stage stops the run and is
/// recorded in the diagnostics sink; outputs of earlier stages are kept.
pub async fn run(settings: &Settings, source: Source<'_>, diag: &dyn Diagnostics) -> EtlResult<()> {
    let result = run_stages(settings, source, diag).await;
    if let Err(e) = &result {
        diag.error(&format!("Workflow execution failed: {}", e));
    }
    result
}

async fn run_stages(settings: &Settings, source: Source<'_>, diag: &dyn Diagnostics) -> EtlResult<()> {
    let selector: TableSelector = settings.table_selector.parse()?;

    // Phase 1: Extract
    diag.info("Starting data extraction");
    let t_extract = Instant::now();
    let document = match source {
        Source::Url(url) => fetch::fetch_document(url).await,
        Source::File(path) => fetch::read_document(path),
    };
    let document = document.inspect_err(|_| diag.error("Failed to fetch the webpage"))?;
    let records = parser::extract(&document, &selector, diag)?;
    println!(
        "Extracted {} banks in {:.1}s",
        records.len(),
        t_extract.elapsed().as_secs_f64()
    );
    print_records(&records);

    // Phase 2: Transform
    let rates = RateTable::load(&settings.exchange_rate_csv)?;
    diag.info(&format!(
        "Loaded {} exchange rates from {}",
        rates.len(),
        settings.exchange_rate_csv.display()
    ));
    let enriched = transform::convert(records, &rates, diag)?;
    print_enriched(&enriched);

    // Phase 3: Load
    export::persist_flat_file(&enriched, &settings.output_csv, diag)?;
    db::persist_table(&enriched, &settings.db_path, &settings.table_name, diag)?;

    // Phase 4: Report
    for (title, sql) in report_queries(&settings.table_name) {
        let rows = db::run_query(&sql, &settings.db_path, diag)?;
        println!("\n{}", title);
        for row in &rows {
            println!("{}", format_row(row));
        }
    }

    diag.info("Process complete.");
    Ok(())
}

fn print_records(records: &[BankRecord]) {
    println!("{:>3} | {:<40} | {:>10}", "#", "Name", "MC_USD_Bn");
    println!("{}", "-".repeat(60));
    for (i, r) in records.iter().take(PREVIEW_ROWS).enumerate() {
        println!(
            "{:>3} | {:<40} | {:>10.2}",
            i,
            truncate(r.name(), 40),
            r.market_cap_usd_billion()
        );
    }
}

fn print_enriched(records: &[EnrichedBankRecord]) {
    println!(
        "{:>3} | {:<40} | {:>10} | {:>10} | {:>10} | {:>11}",
        "#", "Name", "MC_USD_Bn", "MC_GBP_Bn", "MC_EUR_Bn", "MC_INR_Bn"
    );
    println!("{}", "-".repeat(108));
    for (i, r) in records.iter().take(PREVIEW_ROWS).enumerate() {
        println!(
            "{:>3} | {:<40} | {:>10.2} | {:>10.2} | {:>10.2} | {:>11.2}",
            i,
            truncate(&r.name, 40),
            r.market_cap_usd_billion,
            r.market_cap_gbp_billion,
            r.market_cap_eur_billion,
            r.market_cap_inr_billion,
        );
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", truncated)
    }
}
