//! CSV ingestion and export for LeadLoom tables.
//!
//! Thin I/O glue around [`Table`]: the header row becomes the column set,
//! each record becomes a [`Row`]. Files that are not valid UTF-8 are
//! decoded as Windows-1252 (the usual spreadsheet-export fallback).

use std::path::Path;

use csv::{ReaderBuilder, Trim, WriterBuilder};
use tracing::debug;

use leadloom_shared::{LeadloomError, Result, Row, Table};

/// Read a CSV file into a [`Table`].
pub fn read_csv(path: &Path) -> Result<Table> {
    let content = read_with_encoding_detection(path)?;
    let table = parse_csv(&content)?;
    debug!(
        path = %path.display(),
        rows = table.rows.len(),
        columns = table.columns.len(),
        "CSV loaded"
    );
    Ok(table)
}

/// Parse CSV content into a [`Table`].
///
/// Short records are padded with empty cells; extra cells beyond the
/// header are dropped. Cell values are whitespace-trimmed.
pub fn parse_csv(content: &str) -> Result<Table> {
    let mut reader = ReaderBuilder::new()
        .trim(Trim::All)
        .flexible(true)
        .from_reader(content.as_bytes());

    let columns: Vec<String> = reader
        .headers()
        .map_err(|e| LeadloomError::Csv(format!("failed to read CSV header: {e}")))?
        .iter()
        .map(String::from)
        .collect();

    let mut rows = Vec::new();
    for (index, record) in reader.records().enumerate() {
        let record =
            record.map_err(|e| LeadloomError::Csv(format!("row {}: {e}", index + 2)))?;

        let mut row = Row::new();
        for (i, column) in columns.iter().enumerate() {
            row.set(column.clone(), record.get(i).unwrap_or(""));
        }
        rows.push(row);
    }

    Ok(Table::new(columns, rows))
}

/// Write a [`Table`] to a CSV file.
pub fn write_csv(path: &Path, table: &Table) -> Result<()> {
    let content = to_csv_string(table)?;
    std::fs::write(path, content).map_err(|e| LeadloomError::io(path, e))?;
    debug!(path = %path.display(), rows = table.rows.len(), "CSV written");
    Ok(())
}

/// Serialize a [`Table`] to CSV text, header first, cells in column order.
pub fn to_csv_string(table: &Table) -> Result<String> {
    let mut writer = WriterBuilder::new().from_writer(Vec::new());

    writer
        .write_record(&table.columns)
        .map_err(|e| LeadloomError::Csv(format!("failed to write header: {e}")))?;

    for (index, row) in table.rows.iter().enumerate() {
        let record: Vec<&str> = table
            .columns
            .iter()
            .map(|c| row.get(c).unwrap_or(""))
            .collect();
        writer
            .write_record(&record)
            .map_err(|e| LeadloomError::Csv(format!("row {}: {e}", index + 1)))?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| LeadloomError::Csv(format!("failed to flush CSV writer: {e}")))?;
    String::from_utf8(bytes).map_err(|e| LeadloomError::Csv(format!("non-UTF-8 output: {e}")))
}

/// Read a file as text, trying UTF-8 first and falling back to Windows-1252.
fn read_with_encoding_detection(path: &Path) -> Result<String> {
    let bytes = std::fs::read(path).map_err(|e| LeadloomError::io(path, e))?;

    match String::from_utf8(bytes) {
        Ok(content) => Ok(content),
        Err(e) => {
            debug!(path = %path.display(), "not valid UTF-8, decoding as Windows-1252");
            let (decoded, _, _) = encoding_rs::WINDOWS_1252.decode(e.as_bytes());
            Ok(decoded.into_owned())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_simple_csv() {
        let table = parse_csv("name,city\nAcme,NYC\nGlobex,").expect("parse");
        assert_eq!(table.columns, vec!["name".to_string(), "city".to_string()]);
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[0].get("name"), Some("Acme"));
        assert_eq!(table.rows[1].get("city"), Some(""));
    }

    #[test]
    fn parse_pads_short_records() {
        let table = parse_csv("name,city,notes\nAcme,NYC\n").expect("parse");
        assert_eq!(table.rows[0].get("notes"), Some(""));
    }

    #[test]
    fn parse_trims_whitespace() {
        let table = parse_csv("name,city\n  Acme  , NYC \n").expect("parse");
        assert_eq!(table.rows[0].get("name"), Some("Acme"));
        assert_eq!(table.rows[0].get("city"), Some("NYC"));
    }

    #[test]
    fn parse_handles_quoted_fields() {
        let table = parse_csv("name,address\n\"Acme, Inc.\",\"1 Main St, NYC\"\n").expect("parse");
        assert_eq!(table.rows[0].get("name"), Some("Acme, Inc."));
        assert_eq!(table.rows[0].get("address"), Some("1 Main St, NYC"));
    }

    #[test]
    fn roundtrip_preserves_order_and_values() {
        let input = "name,city,phone\nAcme,NYC,555-0100\nGlobex,Springfield,\n";
        let table = parse_csv(input).expect("parse");
        let output = to_csv_string(&table).expect("serialize");
        assert_eq!(output, input);
    }

    #[test]
    fn to_csv_fills_missing_cells() {
        let mut table = parse_csv("name,city\nAcme,NYC\n").expect("parse");
        table.columns.push("email".into());
        let output = to_csv_string(&table).expect("serialize");
        assert_eq!(output, "name,city,email\nAcme,NYC,\n");
    }

    #[test]
    fn read_csv_fixture() {
        let path = std::path::Path::new("../../../fixtures/csv/leads.csv");
        let table = read_csv(path).expect("read fixture");
        assert_eq!(table.columns[0], "company");
        assert!(table.rows.len() >= 3);
    }

    #[test]
    fn read_windows_1252_file() {
        let dir = std::env::temp_dir().join(format!("ll-table-test-{}", uuid::Uuid::now_v7()));
        std::fs::create_dir_all(&dir).expect("create temp dir");
        let path = dir.join("latin1.csv");
        // "Café" with a Windows-1252 é (0xE9) — invalid as UTF-8
        std::fs::write(&path, b"name,city\nCaf\xe9,Paris\n").expect("write");

        let table = read_csv(&path).expect("read");
        assert_eq!(table.rows[0].get("name"), Some("Café"));

        let _ = std::fs::remove_dir_all(&dir);
    }
}
