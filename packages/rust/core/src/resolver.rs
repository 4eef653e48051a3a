//! Entity-column detection.
//!
//! Picks the column holding the subject name used for web lookups. This
//! is a best-effort keyword heuristic and can misidentify the key column
//! on adversarial schemas; that is a documented limitation, not something
//! to second-guess with content sniffing.

use leadloom_shared::Table;

/// Column-name keywords that mark a likely entity column.
const ENTITY_KEYWORDS: [&str; 4] = ["name", "company", "incubator", "organization"];

/// Resolve the entity column for a table.
///
/// Returns the first column (in declaration order) whose lowercased name
/// contains one of [`ENTITY_KEYWORDS`], falling back to the first column.
/// An empty table has no entity column; the caller skips processing.
pub fn resolve_entity_column(table: &Table) -> Option<String> {
    if table.rows.is_empty() || table.columns.is_empty() {
        return None;
    }

    table
        .columns
        .iter()
        .find(|column| {
            let lowered = column.to_lowercase();
            ENTITY_KEYWORDS.iter().any(|k| lowered.contains(k))
        })
        .or_else(|| table.columns.first())
        .cloned()
}
