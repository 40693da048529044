//! Export of result envelopes.

use crate::types::{AskError, Result, ResultEnvelope};
use std::io::Write;

/// Write the envelope's rows as CSV with a header row.
///
/// Null cells become empty fields. A result without columns (a write
/// statement) produces no output at all.
///
/// # Errors
///
/// Returns `AskError::ExportError` if the envelope is a failure or writing fails
pub fn to_csv<W: Write>(envelope: &ResultEnvelope, writer: W) -> Result<()> {
    if !envelope.success {
        return Err(AskError::ExportError(
            "cannot export a failed result".to_string(),
        ));
    }

    if envelope.columns().is_empty() {
        return Ok(());
    }

    let mut wtr = csv::Writer::from_writer(writer);
    let export_err = |e: csv::Error| AskError::ExportError(e.to_string());

    wtr.write_record(envelope.columns()).map_err(export_err)?;
    for row in envelope.rows() {
        wtr.write_record(row.iter().map(|cell| cell.to_string()))
            .map_err(export_err)?;
    }
    wtr.flush()?;
    Ok(())
}

/// Pretty-printed JSON of the whole envelope.
///
/// # Errors
///
/// Returns `AskError::JsonError` if serialization fails
pub fn to_json(envelope: &ResultEnvelope) -> Result<String> {
    Ok(serde_json::to_string_pretty(envelope)?)
}
