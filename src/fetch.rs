use std::path::Path;

use reqwest::StatusCode;
use tracing::info;

use crate::error::{EtlError, EtlResult};

/// GETs `url` and returns the body. Anything but 200 is a fetch error.
pub async fn fetch_document(url: &str) -> EtlResult<String> {
    let fail = |reason: String| EtlError::Fetch {
        url: url.to_string(),
        reason,
    };

    info!("Fetching {}", url);
    let response = reqwest::Client::new()
        .get(url)
        .send()
        .await
        .map_err(|e| fail(e.to_string()))?;

    let status = response.status();
    if status != StatusCode::OK {
        return Err(fail(format!("HTTP status {}", status)));
    }
    response.text().await.map_err(|e| fail(e.to_string()))
}

/// Reads a saved copy of the page instead of fetching it.
pub fn read_document(path: &Path) -> EtlResult<String> {
    std::fs::read_to_string(path).map_err(|e| EtlError::Fetch {
        url: path.display().to_string(),
        reason: e.to_string(),
    })
}
