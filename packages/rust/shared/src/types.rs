//! Core domain types for LeadLoom tables and enrichment runs.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// RunId
// ---------------------------------------------------------------------------

/// A UUID v7 wrapper for enrichment run identifiers (time-sortable).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(pub Uuid);

impl RunId {
    /// Generate a new time-sortable run identifier.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for RunId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

// ---------------------------------------------------------------------------
// ContactField
// ---------------------------------------------------------------------------

/// The fixed set of contact attributes enrichment can produce.
///
/// `as_str` values double as column names in result tables and as the
/// JSON keys expected from the extraction model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContactField {
    Contact,
    Phone,
    Email,
    Website,
    Location,
    Linkedin,
    Address,
    Twitter,
    Facebook,
}

impl ContactField {
    /// All tracked attributes, in canonical column order.
    pub const ALL: [ContactField; 9] = [
        Self::Contact,
        Self::Phone,
        Self::Email,
        Self::Website,
        Self::Location,
        Self::Linkedin,
        Self::Address,
        Self::Twitter,
        Self::Facebook,
    ];

    /// Column name / JSON key for this attribute.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Contact => "contact",
            Self::Phone => "phone",
            Self::Email => "email",
            Self::Website => "website",
            Self::Location => "location",
            Self::Linkedin => "linkedin",
            Self::Address => "address",
            Self::Twitter => "twitter",
            Self::Facebook => "facebook",
        }
    }

    /// Resolve a (case-insensitive) JSON key to an attribute.
    pub fn from_key(key: &str) -> Option<Self> {
        let key = key.trim().to_lowercase();
        Self::ALL.into_iter().find(|f| f.as_str() == key)
    }

    /// Whether this attribute must hold an absolute URL.
    pub fn is_link(&self) -> bool {
        matches!(
            self,
            Self::Website | Self::Linkedin | Self::Twitter | Self::Facebook
        )
    }
}

impl std::fmt::Display for ContactField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// ExtractedFields
// ---------------------------------------------------------------------------

/// Validated contact attributes extracted for one row.
///
/// Values are guaranteed cleaned by construction: trimmed, non-empty, and
/// past the per-attribute predicates. Absent attributes are absent, never
/// empty strings.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExtractedFields {
    values: HashMap<ContactField, String>,
}

impl ExtractedFields {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, field: ContactField, value: String) {
        self.values.insert(field, value);
    }

    pub fn get(&self, field: ContactField) -> Option<&str> {
        self.values.get(&field).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterate present attributes in canonical [`ContactField::ALL`] order.
    pub fn iter(&self) -> impl Iterator<Item = (ContactField, &str)> {
        ContactField::ALL
            .into_iter()
            .filter_map(|f| self.values.get(&f).map(|v| (f, v.as_str())))
    }
}

impl FromIterator<(ContactField, String)> for ExtractedFields {
    fn from_iter<T: IntoIterator<Item = (ContactField, String)>>(iter: T) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}

// ---------------------------------------------------------------------------
// Row
// ---------------------------------------------------------------------------

/// A single table row: column name → cell value.
///
/// Column ORDER lives on the owning [`Table`]; a row is only the mapping.
/// Rows read from a source table are never mutated by enrichment —
/// [`Row::merged`] produces a new row.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Row {
    cells: HashMap<String, String>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, column: &str) -> Option<&str> {
        self.cells.get(column).map(String::as_str)
    }

    pub fn set(&mut self, column: impl Into<String>, value: impl Into<String>) {
        self.cells.insert(column.into(), value.into());
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Column names present in this row (unordered).
    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.cells.keys().map(String::as_str)
    }

    /// Shallow merge: a new row with every original cell preserved and each
    /// extracted field written under its column name, overwriting any
    /// same-named original cell.
    pub fn merged(&self, fields: &ExtractedFields) -> Row {
        let mut merged = self.clone();
        for (field, value) in fields.iter() {
            merged.set(field.as_str(), value);
        }
        merged
    }
}

impl<K, V, const N: usize> From<[(K, V); N]> for Row
where
    K: Into<String>,
    V: Into<String>,
{
    fn from(cells: [(K, V); N]) -> Self {
        Self {
            cells: cells
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

impl FromIterator<(String, String)> for Row {
    fn from_iter<T: IntoIterator<Item = (String, String)>>(iter: T) -> Self {
        Self {
            cells: iter.into_iter().collect(),
        }
    }
}

// ---------------------------------------------------------------------------
// Table
// ---------------------------------------------------------------------------

/// An ordered sequence of rows plus the column set they share.
///
/// Columns come from the CSV header (or the first row when constructed
/// programmatically). Uniform columns across rows are assumed, not
/// validated.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Table {
    pub columns: Vec<String>,
    pub rows: Vec<Row>,
}

impl Table {
    pub fn new(columns: Vec<String>, rows: Vec<Row>) -> Self {
        Self { columns, rows }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a table from rows alone, deriving the column set from the
    /// first row. Row mappings are unordered, so derived columns are
    /// sorted for determinism.
    pub fn from_rows(rows: Vec<Row>) -> Self {
        let mut columns: Vec<String> = rows
            .first()
            .map(|r| r.columns().map(String::from).collect())
            .unwrap_or_default();
        columns.sort();
        Self { columns, rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
