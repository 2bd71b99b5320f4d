//! Local catalog loader - CSV dumps of the remote catalog
//!
//! Cells are trimmed and rows may be ragged; every row is coerced the same way a
//! remote row is.

use neowatch_common::Catalog;
use std::path::Path;

use super::coerce::{canonical_field, record_from_cells, Cell};
use super::types::LoadReport;
use crate::error::{CatalogError, Result};

/// Load a catalog from a CSV file.
///
/// A missing or unreadable file is `SourceUnavailable`; a header without any
/// identifier column is `SchemaMismatch`. Both are fatal for the load.
pub async fn load_local_catalog(path: impl AsRef<Path>) -> Result<(Catalog, LoadReport)> {
    let path = path.as_ref();
    tracing::info!("Loading local catalog from: {:?}", path);

    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| CatalogError::SourceUnavailable {
            path: path.to_path_buf(),
            source,
        })?;

    let (catalog, report) = parse_catalog_csv(&content)?;

    tracing::info!(
        "Loaded {} records from {:?} ({} rows read, {} skipped, {} duplicates)",
        report.records,
        path,
        report.rows_read,
        report.rows_skipped,
        report.duplicates_dropped
    );
    Ok((catalog, report))
}

/// Parse CSV content into a deduplicated catalog.
pub fn parse_catalog_csv(content: &str) -> Result<(Catalog, LoadReport)> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(content.as_bytes());

    let columns: Vec<String> = reader.headers()?.iter().map(canonical_field).collect();
    if !columns.iter().any(|c| c == "full_name" || c == "spkid") {
        return Err(CatalogError::SchemaMismatch(format!(
            "no identifier column (full_name or spkid) in header [{}]",
            columns.join(", ")
        )));
    }

    let mut report = LoadReport::default();
    let mut records = Vec::new();

    for (index, result) in reader.records().enumerate() {
        report.rows_read += 1;
        // header is line 1
        let line = index + 2;

        let row = match result {
            Ok(row) => row,
            Err(e) => {
                report.rows_skipped += 1;
                tracing::warn!("Error parsing CSV line {}: {}", line, e);
                continue;
            }
        };

        let cells = columns
            .iter()
            .map(String::as_str)
            .zip(row.iter().map(Cell::from));

        match record_from_cells(cells) {
            Some(record) => records.push(record),
            None => {
                report.rows_skipped += 1;
                tracing::warn!("Skipping CSV line {}: no identifier", line);
            }
        }
    }

    let parsed = records.len();
    let catalog = Catalog::from_records(records);
    report.duplicates_dropped = parsed - catalog.len();
    report.records = catalog.len();

    tracing::debug!(
        "Processed {} CSV rows, {} skipped",
        report.rows_read,
        report.rows_skipped
    );
    Ok((catalog, report))
}
