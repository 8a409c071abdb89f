use std::fs;
use std::path::{Path, PathBuf};

use crate::diagnostics::Diagnostics;
use crate::error::{EtlError, EtlResult};
use crate::model::{EnrichedBankRecord, COLUMNS};

/// Writes the records as CSV with a header row, replacing `path`.
///
/// Rows go to a sibling temp file first which is then renamed over the
/// target, so a failed write leaves the previous file untouched.
pub fn persist_flat_file(
    records: &[EnrichedBankRecord],
    path: impl AsRef<Path>,
    diag: &dyn Diagnostics,
) -> EtlResult<()> {
    let path = path.as_ref();
    let target = path.display().to_string();
    let tmp = temp_path(path);

    let result = write_csv(records, &tmp).and_then(|_| fs::rename(&tmp, path).map_err(Into::into));
    if let Err(e) = result {
        let _ = fs::remove_file(&tmp);
        diag.error(&format!("Error saving data to CSV: {}", e));
        return Err(EtlError::persistence(target, e));
    }

    diag.info(&format!("Data saved to CSV at {}.", target));
    Ok(())
}

fn write_csv(records: &[EnrichedBankRecord], path: &Path) -> Result<(), csv::Error> {
    let mut wtr = csv::Writer::from_path(path)?;
    if records.is_empty() {
        wtr.write_record(COLUMNS)?;
    }
    for r in records {
        wtr.serialize(r)?;
    }
    wtr.flush()?;
    Ok(())
}

fn temp_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!(".{}.tmp", name))
}
