pub mod table;

use crate::diagnostics::Diagnostics;
use crate::error::{EtlError, EtlResult};
use crate::model::BankRecord;
pub use table::TableSelector;

const NAME_CELL: usize = 1;
const MARKET_CAP_CELL: usize = 2;

/// What happened to a single table row.
#[derive(Debug, PartialEq)]
pub enum RowOutcome {
    Accepted(BankRecord),
    /// Fewer than three cells; silently dropped.
    TooShort,
    /// Market cap cell did not hold a usable number.
    InvalidMarketCap { name: String, raw: String },
}

/// Two-step extraction: document → table rows → bank records.
///
/// The first row is treated as the header. Rows with an unusable market cap
/// are logged and skipped; only a missing table or an empty result abort.
/// The start milestone is logged by the caller, before the document is
/// fetched.
pub fn extract(
    document: &str,
    selector: &TableSelector,
    diag: &dyn Diagnostics,
) -> EtlResult<Vec<BankRecord>> {
    let Some(rows) = table::table_rows(document, selector) else {
        diag.error("Failed to find the specified table on the webpage");
        return Err(EtlError::TableNotFound {
            selector: selector.to_string(),
        });
    };
    diag.info(&format!("Found {} rows in the table", rows.len()));

    let mut records = Vec::new();
    for cells in rows.iter().skip(1) {
        match parse_row(cells) {
            RowOutcome::Accepted(record) => records.push(record),
            RowOutcome::TooShort => {}
            RowOutcome::InvalidMarketCap { name, raw } => {
                diag.warn(&format!(
                    "Invalid market capitalization value for {} ({:?})",
                    name, raw
                ));
            }
        }
    }

    diag.info(&format!("Extracted {} rows successfully", records.len()));
    if records.is_empty() {
        return Err(EtlError::NoValidRows {
            selector: selector.to_string(),
        });
    }
    diag.info("Data extraction completed successfully");
    Ok(records)
}

pub fn parse_row(cells: &[String]) -> RowOutcome {
    if cells.len() <= MARKET_CAP_CELL {
        return RowOutcome::TooShort;
    }
    let name = cells[NAME_CELL].trim().to_string();
    let raw = &cells[MARKET_CAP_CELL];

    match parse_market_cap(raw).and_then(|usd| BankRecord::new(name.clone(), usd)) {
        Some(record) => RowOutcome::Accepted(record),
        None => RowOutcome::InvalidMarketCap {
            name,
            raw: raw.clone(),
        },
    }
}

/// `" 1,000.5[1] "` → `1000.5`. Thousands separators are dropped and any
/// citation marker from the first `[` onwards is cut off.
pub fn parse_market_cap(text: &str) -> Option<f64> {
    let cleaned = text.trim().replace(',', "");
    let number = match cleaned.find('[') {
        Some(i) => &cleaned[..i],
        None => cleaned.as_str(),
    };
    number.trim().parse::<f64>().ok()
}
