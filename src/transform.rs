use crate::diagnostics::Diagnostics;
use crate::error::EtlResult;
use crate::model::{BankRecord, EnrichedBankRecord};
use crate::rates::{RateTable, TARGET_CURRENCIES};

/// Adds GBP/EUR/INR market caps to every record, keeping order and length.
///
/// All rates are resolved before any record is touched, so a missing rate
/// yields an error and no output at all.
pub fn convert(
    records: Vec<BankRecord>,
    rates: &RateTable,
    diag: &dyn Diagnostics,
) -> EtlResult<Vec<EnrichedBankRecord>> {
    let [gbp, eur, inr] = match resolve(rates) {
        Ok(r) => r,
        Err(e) => {
            diag.error(&format!("Error during transformation: {}", e));
            return Err(e);
        }
    };

    let enriched: Vec<EnrichedBankRecord> = records
        .into_iter()
        .map(|r| {
            let usd = r.market_cap_usd_billion();
            EnrichedBankRecord {
                name: r.name().to_string(),
                market_cap_usd_billion: usd,
                market_cap_gbp_billion: usd * gbp,
                market_cap_eur_billion: usd * eur,
                market_cap_inr_billion: usd * inr,
            }
        })
        .collect();

    diag.info("Data transformation successful.");
    Ok(enriched)
}

fn resolve(rates: &RateTable) -> EtlResult<[f64; 3]> {
    let mut out = [0.0; 3];
    for (slot, currency) in out.iter_mut().zip(TARGET_CURRENCIES) {
        *slot = rates.require(currency)?;
    }
    Ok(out)
}
