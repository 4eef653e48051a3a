//! Core enrichment pipeline and domain logic for LeadLoom.
//!
//! This crate ties entity-column detection, per-row discovery +
//! extraction, and result statistics into the row-by-row enrichment
//! state machine ([`pipeline::EnrichmentPipeline`]).

pub mod enricher;
pub mod pipeline;
pub mod resolver;
pub mod stats;
