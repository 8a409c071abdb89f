use thiserror::Error;

/// Failures that abort a pipeline run.
///
/// Row-level parse problems never show up here; the extractor skips those
/// rows and keeps going.
#[derive(Debug, Error)]
pub enum EtlError {
    #[error("failed to fetch {url}: {reason}")]
    Fetch { url: String, reason: String },

    #[error("invalid table selector {0:?}: expected attr=value[,attr=value...]")]
    InvalidSelector(String),

    #[error("no table matching {selector} found in document")]
    TableNotFound { selector: String },

    #[error("table matching {selector} had no rows with a valid market capitalization")]
    NoValidRows { selector: String },

    #[error("exchange rate file {path}: {message}")]
    RateSource { path: String, message: String },

    #[error("exchange rate for {0} missing from rate table")]
    MissingRate(String),

    #[error("failed to write {target}: {source}")]
    Persistence {
        target: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("query failed: {0}")]
    QueryExecution(String),
}

impl EtlError {
    pub fn persistence(
        target: impl Into<String>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        EtlError::Persistence {
            target: target.into(),
            source: source.into(),
        }
    }
}

pub type EtlResult<T> = std::result::Result<T, EtlError>;
