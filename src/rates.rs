use std::collections::HashMap;
use std::io::Read;
use std::path::Path;

use serde::Deserialize;

use crate::error::{EtlError, EtlResult};

/// Currencies every run converts into, in output column order.
pub const TARGET_CURRENCIES: [&str; 3] = ["GBP", "EUR", "INR"];

/// Currency code -> units of that currency per USD. Read-only once loaded.
#[derive(Debug, Clone, Default)]
pub struct RateTable {
    rates: HashMap<String, f64>,
}

#[derive(Deserialize)]
struct RateRow {
    #[serde(rename = "Currency")]
    currency: String,
    #[serde(rename = "Rate")]
    rate: String,
}

impl RateTable {
    pub fn load(path: impl AsRef<Path>) -> EtlResult<Self> {
        let path = path.as_ref();
        let file = std::fs::File::open(path).map_err(|e| EtlError::RateSource {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        Self::from_reader(file, &path.display().to_string())
    }

    /// Parses `Currency,Rate` CSV. Extra columns are ignored.
    pub fn from_reader(reader: impl Read, source: &str) -> EtlResult<Self> {
        let fail = |message: String| EtlError::RateSource {
            path: source.to_string(),
            message,
        };

        let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
        let mut rates = HashMap::new();

        for (i, row) in rdr.deserialize::<RateRow>().enumerate() {
            let row = row.map_err(|e| fail(e.to_string()))?;
            let code = row.currency.trim().to_uppercase();
            if code.is_empty() {
                return Err(fail(format!("row {}: empty currency code", i + 1)));
            }
            let rate: f64 = row
                .rate
                .parse()
                .map_err(|_| fail(format!("row {}: invalid rate {:?} for {}", i + 1, row.rate, code)))?;
            if !rate.is_finite() || rate <= 0.0 {
                return Err(fail(format!("row {}: rate for {} must be positive", i + 1, code)));
            }
            if rates.insert(code.clone(), rate).is_some() {
                return Err(fail(format!("duplicate currency {}", code)));
            }
        }

        Ok(RateTable { rates })
    }

    pub fn get(&self, currency: &str) -> Option<f64> {
        self.rates.get(currency).copied()
    }

    /// Looks up a rate, treating absence as a configuration error.
    pub fn require(&self, currency: &str) -> EtlResult<f64> {
        self.get(currency)
            .ok_or_else(|| EtlError::MissingRate(currency.to_string()))
    }

    pub fn len(&self) -> usize {
        self.rates.len()
    }
}

impl FromIterator<(String, f64)> for RateTable {
    fn from_iter<I: IntoIterator<Item = (String, f64)>>(iter: I) -> Self {
        RateTable {
            rates: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(csv: &str) -> EtlResult<RateTable> {
        RateTable::from_reader(csv.as_bytes(), "test.csv")
    }

    #[test]
    fn loads_currency_rate_csv() {
        let t = parse("Currency,Rate\nEUR,0.93\nGBP,0.8\nINR,82.95\n").unwrap();
        assert_eq!(t.len(), 3);
        assert_eq!(t.get("GBP"), Some(0.8));
        assert_eq!(t.get("INR"), Some(82.95));
        assert_eq!(t.get("JPY"), None);
    }

    #[test]
    fn normalizes_codes_and_ignores_extra_columns() {
        let t = parse("Currency,Rate,Note\n gbp , 0.8 ,pound\n").unwrap();
        assert_eq!(t.get("GBP"), Some(0.8));
    }

    #[test]
    fn rejects_bad_rates() {
        assert!(matches!(parse("Currency,Rate\nGBP,abc\n"), Err(EtlError::RateSource { .. })));
        assert!(matches!(parse("Currency,Rate\nGBP,0\n"), Err(EtlError::RateSource { .. })));
        assert!(matches!(parse("Currency,Rate\nGBP,-2\n"), Err(EtlError::RateSource { .. })));
        assert!(matches!(
            parse("Currency,Rate\nGBP,0.8\nGBP,0.9\n"),
            Err(EtlError::RateSource { .. })
        ));
    }

    #[test]
    fn rejects_missing_columns() {
        assert!(matches!(parse("Code,Value\nGBP,0.8\n"), Err(EtlError::RateSource { .. })));
    }

    #[test]
    fn require_reports_missing_currency() {
        let t: RateTable = [("GBP".to_string(), 0.8)].into_iter().collect();
        assert_eq!(t.require("GBP").unwrap(), 0.8);
        match t.require("EUR") {
            Err(EtlError::MissingRate(c)) => assert_eq!(c, "EUR"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn missing_file_is_rate_source_error() {
        let err = RateTable::load("/nonexistent/exchange_rate.csv").unwrap_err();
        assert!(matches!(err, EtlError::RateSource { .. }));
    }
}
