//! Per-row enrichment: discovery + extraction + merge.
//!
//! [`RowEnricher::enrich`] is infallible by construction — every client
//! error is absorbed into the returned [`RowOutcome`], and the original
//! row is carried through unchanged whenever anything fails. That is what
//! keeps partial failure from ever aborting a run.

use std::sync::Arc;

use tracing::{debug, warn};

use leadloom_discovery::EntityDiscovery;
use leadloom_extraction::FieldExtraction;
use leadloom_shared::{ExtractedFields, Row};

/// What happened to a single row.
#[derive(Debug, Clone, PartialEq)]
pub enum RowOutcome {
    /// Entity cell was blank; no lookups attempted.
    SkippedBlankEntity,
    /// Discovery failed or returned empty content; original row kept.
    DiscoveryFailed(String),
    /// Discovery succeeded but extraction yielded no valid fields.
    NoFields,
    /// At least one field was extracted and merged.
    Enriched { fields_added: usize },
}

/// A processed row plus its outcome.
#[derive(Debug, Clone)]
pub struct EnrichedRow {
    pub row: Row,
    pub outcome: RowOutcome,
}

impl EnrichedRow {
    fn passthrough(row: &Row, outcome: RowOutcome) -> Self {
        Self {
            row: row.clone(),
            outcome,
        }
    }
}

/// Combines the two clients into one per-row operation.
pub struct RowEnricher {
    discovery: Arc<dyn EntityDiscovery>,
    extractor: Arc<dyn FieldExtraction>,
    content_cap: usize,
}

impl RowEnricher {
    pub fn new(
        discovery: Arc<dyn EntityDiscovery>,
        extractor: Arc<dyn FieldExtraction>,
        content_cap: usize,
    ) -> Self {
        Self {
            discovery,
            extractor,
            content_cap,
        }
    }

    /// Enrich one row, reading the entity name from `entity_column`.
    pub async fn enrich(&self, row: &Row, entity_column: &str) -> EnrichedRow {
        let entity = row.get(entity_column).map(str::trim).unwrap_or_default();
        if entity.is_empty() {
            return EnrichedRow::passthrough(row, RowOutcome::SkippedBlankEntity);
        }

        let discovered = match self.discovery.discover(entity).await {
            Ok(d) if !d.content.trim().is_empty() => d,
            Ok(_) => {
                warn!(entity, "discovery returned empty content");
                return EnrichedRow::passthrough(
                    row,
                    RowOutcome::DiscoveryFailed("empty content".into()),
                );
            }
            Err(e) => {
                warn!(entity, error = %e, "discovery failed");
                return EnrichedRow::passthrough(row, RowOutcome::DiscoveryFailed(e.to_string()));
            }
        };

        debug!(entity, source = %discovered.source_url, "content discovered");

        let capped = truncate_content(&discovered.content, self.content_cap);
        let fields = match self.extractor.extract(&capped, entity).await {
            Ok(fields) => fields,
            Err(e) => {
                warn!(entity, error = %e, "extraction failed");
                ExtractedFields::default()
            }
        };

        if fields.is_empty() {
            return EnrichedRow::passthrough(row, RowOutcome::NoFields);
        }

        let fields_added = fields.len();
        EnrichedRow {
            row: row.merged(&fields),
            outcome: RowOutcome::Enriched { fields_added },
        }
    }
}

/// Truncate content to at most `max_chars` characters (char-boundary safe).
fn truncate_content(content: &str, max_chars: usize) -> String {
    match content.char_indices().nth(max_chars) {
        None => content.to_string(),
        Some((cut, _)) => format!(
            "{}\n\n[... content truncated ...]",
            &content[..cut]
        ),
    }
}

#[cfg(test)]
pub(crate) mod stubs {
    //! Scripted client stubs shared by core tests.

    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use leadloom_discovery::{DiscoveredContent, EntityDiscovery};
    use leadloom_extraction::FieldExtraction;
    use leadloom_shared::{ContactField, ExtractedFields, LeadloomError, Result};

    /// Discovery stub: succeeds with canned content unless `fail` is set.
    pub struct StubDiscovery {
        pub fail: bool,
        pub calls: AtomicUsize,
    }

    impl StubDiscovery {
        pub fn ok() -> Self {
            Self {
                fail: false,
                calls: AtomicUsize::new(0),
            }
        }

        pub fn failing() -> Self {
            Self {
                fail: true,
                calls: AtomicUsize::new(0),
            }
        }

        pub fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl EntityDiscovery for StubDiscovery {
        async fn discover(&self, entity: &str) -> Result<DiscoveredContent> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(LeadloomError::Discovery("search unavailable".into()));
            }
            Ok(DiscoveredContent {
                content: format!("About {entity}: a company."),
                source_url: "https://results.example/1".into(),
            })
        }
    }

    /// Extraction stub: returns the configured fields for every call.
    pub struct StubExtractor {
        pub fields: Vec<(ContactField, String)>,
        pub fail: bool,
        pub calls: AtomicUsize,
    }

    impl StubExtractor {
        pub fn returning(fields: Vec<(ContactField, String)>) -> Self {
            Self {
                fields,
                fail: false,
                calls: AtomicUsize::new(0),
            }
        }

        pub fn empty() -> Self {
            Self::returning(vec![])
        }

        pub fn failing() -> Self {
            Self {
                fields: vec![],
                fail: true,
                calls: AtomicUsize::new(0),
            }
        }

        pub fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl FieldExtraction for StubExtractor {
        async fn extract(&self, _content: &str, _entity: &str) -> Result<ExtractedFields> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(LeadloomError::parse("no JSON object in completion"));
            }
            Ok(self.fields.iter().cloned().collect())
        }
    }
}
