//! Post-run completion statistics over original vs. enriched tables.
//!
//! Pure functions — no side effects, deterministic for a given pair of
//! tables, safe to call repeatedly.

use leadloom_shared::{ContactField, Table};

/// Population of one tracked attribute across the processed table.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldCompletion {
    pub field: ContactField,
    /// Rows with a non-empty value for this attribute.
    pub populated: usize,
    /// `populated` as a percentage of rows.
    pub percent: f64,
}

/// Completion statistics and the changed-row set for one run.
#[derive(Debug, Clone)]
pub struct EnrichmentStats {
    pub row_count: usize,
    /// One entry per tracked attribute, in canonical order.
    pub fields: Vec<FieldCompletion>,
    /// Populated cells / (attribute count × row count), as a percentage.
    pub overall_percent: f64,
    /// Indices of processed rows that differ from the index-aligned
    /// original. A row with no original counterpart counts as changed.
    pub changed_rows: Vec<usize>,
}

/// Compute completion statistics for `processed` against `original`.
pub fn completion_stats(original: &Table, processed: &Table) -> EnrichmentStats {
    let row_count = processed.rows.len();

    let fields: Vec<FieldCompletion> = ContactField::ALL
        .into_iter()
        .map(|field| {
            let populated = processed
                .rows
                .iter()
                .filter(|row| {
                    row.get(field.as_str())
                        .is_some_and(|v| !v.trim().is_empty())
                })
                .count();
            FieldCompletion {
                field,
                populated,
                percent: percentage(populated, row_count),
            }
        })
        .collect();

    let populated_cells: usize = fields.iter().map(|f| f.populated).sum();
    let overall_percent = percentage(populated_cells, ContactField::ALL.len() * row_count);

    let changed_rows = processed
        .rows
        .iter()
        .enumerate()
        .filter(|(index, row)| match original.rows.get(*index) {
            Some(original_row) => original_row != *row,
            None => true,
        })
        .map(|(index, _)| index)
        .collect();

    EnrichmentStats {
        row_count,
        fields,
        overall_percent,
        changed_rows,
    }
}

fn percentage(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 * 100.0 / whole as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use leadloom_shared::Row;

    fn table(rows: Vec<Row>) -> Table {
        Table::new(vec!["name".into()], rows)
    }

    #[test]
    fn counts_populated_fields() {
        let original = table(vec![
            Row::from([("name", "Acme")]),
            Row::from([("name", "Globex")]),
        ]);
        let processed = table(vec![
            Row::from([("name", "Acme"), ("email", "info@acme.com"), ("phone", "555")]),
            Row::from([("name", "Globex"), ("email", "hi@globex.com")]),
        ]);

        let stats = completion_stats(&original, &processed);

        assert_eq!(stats.row_count, 2);
        let email = stats
            .fields
            .iter()
            .find(|f| f.field == ContactField::Email)
            .unwrap();
        assert_eq!(email.populated, 2);
        assert_eq!(email.percent, 100.0);

        let phone = stats
            .fields
            .iter()
            .find(|f| f.field == ContactField::Phone)
            .unwrap();
        assert_eq!(phone.populated, 1);
        assert_eq!(phone.percent, 50.0);

        // 3 populated cells over 9 attributes × 2 rows
        let expected = 3.0 * 100.0 / 18.0;
        assert!((stats.overall_percent - expected).abs() < 1e-9);
    }

    #[test]
    fn empty_values_do_not_count() {
        let processed = table(vec![Row::from([("name", "Acme"), ("email", "  ")])]);
        let stats = completion_stats(&table(vec![]), &processed);
        let email = stats
            .fields
            .iter()
            .find(|f| f.field == ContactField::Email)
            .unwrap();
        assert_eq!(email.populated, 0);
    }

    #[test]
    fn changed_rows_are_index_aligned() {
        let original = table(vec![
            Row::from([("name", "Acme")]),
            Row::from([("name", "Globex")]),
        ]);
        let processed = table(vec![
            Row::from([("name", "Acme"), ("email", "info@acme.com")]),
            Row::from([("name", "Globex")]),
        ]);

        let stats = completion_stats(&original, &processed);
        assert_eq!(stats.changed_rows, vec![0]);
    }

    #[test]
    fn extra_processed_rows_count_as_changed() {
        let original = table(vec![Row::from([("name", "Acme")])]);
        let processed = table(vec![
            Row::from([("name", "Acme")]),
            Row::from([("name", "Globex")]),
        ]);

        let stats = completion_stats(&original, &processed);
        assert_eq!(stats.changed_rows, vec![1]);
    }

    #[test]
    fn empty_tables_yield_zero_percentages() {
        let stats = completion_stats(&Table::empty(), &Table::empty());
        assert_eq!(stats.row_count, 0);
        assert_eq!(stats.overall_percent, 0.0);
        assert!(stats.fields.iter().all(|f| f.percent == 0.0));
        assert!(stats.changed_rows.is_empty());
    }

    #[test]
    fn deterministic_for_same_inputs() {
        let original = table(vec![Row::from([("name", "Acme")])]);
        let processed = table(vec![Row::from([("name", "Acme"), ("phone", "555")])]);

        let a = completion_stats(&original, &processed);
        let b = completion_stats(&original, &processed);
        assert_eq!(a.fields, b.fields);
        assert_eq!(a.changed_rows, b.changed_rows);
        assert_eq!(a.overall_percent, b.overall_percent);
    }
}
