use serde::Serialize;

/// One bank row taken from the source table.
#[derive(Debug, Clone, PartialEq)]
pub struct BankRecord {
    name: String,
    market_cap_usd_billion: f64,
}

impl BankRecord {
    /// Returns `None` unless the market cap is finite and non-negative.
    pub fn new(name: impl Into<String>, market_cap_usd_billion: f64) -> Option<Self> {
        if !market_cap_usd_billion.is_finite() || market_cap_usd_billion < 0.0 {
            return None;
        }
        Some(BankRecord {
            name: name.into(),
            market_cap_usd_billion,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn market_cap_usd_billion(&self) -> f64 {
        self.market_cap_usd_billion
    }
}

/// A bank row with the converted market caps. Field order is the column
/// order of both the CSV export and the database table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnrichedBankRecord {
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Market_Cap_USD_Billion")]
    pub market_cap_usd_billion: f64,
    #[serde(rename = "Market_Cap_GBP_Billion")]
    pub market_cap_gbp_billion: f64,
    #[serde(rename = "Market_Cap_EUR_Billion")]
    pub market_cap_eur_billion: f64,
    #[serde(rename = "Market_Cap_INR_Billion")]
    pub market_cap_inr_billion: f64,
}

pub const COLUMNS: [&str; 5] = [
    "Name",
    "Market_Cap_USD_Billion",
    "Market_Cap_GBP_Billion",
    "Market_Cap_EUR_Billion",
    "Market_Cap_INR_Billion",
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_negative_and_non_finite() {
        assert!(BankRecord::new("A", -1.0).is_none());
        assert!(BankRecord::new("A", f64::NAN).is_none());
        assert!(BankRecord::new("A", f64::INFINITY).is_none());
        assert!(BankRecord::new("A", 0.0).is_some());
    }

    #[test]
    fn accessors() {
        let r = BankRecord::new("JPMorgan Chase", 432.92).unwrap();
        assert_eq!(r.name(), "JPMorgan Chase");
        assert_eq!(r.market_cap_usd_billion(), 432.92);
    }
}
