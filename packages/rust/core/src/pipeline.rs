//! The row-by-row enrichment state machine.
//!
//! Rows are processed strictly one at a time, in input order. `pause` and
//! `stop` are cooperative: they set flags the driver loop observes at the
//! top of each row, so in-flight per-row work always finishes before
//! control takes effect. The run record is the only shared mutable state;
//! it sits behind a mutex that is never held across an await.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use tracing::{info, instrument, warn};

use leadloom_discovery::EntityDiscovery;
use leadloom_extraction::FieldExtraction;
use leadloom_shared::{
    ContactField, LeadloomError, PipelineConfig, Result, Row, RunId, Table,
};

use crate::enricher::{RowEnricher, RowOutcome};
use crate::resolver;

/// Number of most-recent log entries retained.
pub const LOG_CAPACITY: usize = 5;

// ---------------------------------------------------------------------------
// States and run record
// ---------------------------------------------------------------------------

/// Pipeline lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Idle,
    Processing,
    Paused,
    Completed,
    Error,
}

impl PipelineState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Processing => "processing",
            Self::Paused => "paused",
            Self::Completed => "completed",
            Self::Error => "error",
        }
    }
}

impl std::fmt::Display for PipelineState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One timestamped entry in the rolling log.
#[derive(Debug, Clone)]
pub struct LogEntry {
    pub at: DateTime<Utc>,
    pub message: String,
}

/// Mutable state of the current run.
struct RunRecord {
    state: PipelineState,
    /// Index of the next unprocessed row.
    cursor: usize,
    /// Entity column, resolved once per fresh run.
    entity_column: Option<String>,
    results: Vec<Row>,
    log: VecDeque<LogEntry>,
    success_count: usize,
    progress: f64,
}

impl RunRecord {
    fn fresh() -> Self {
        Self {
            state: PipelineState::Idle,
            cursor: 0,
            entity_column: None,
            results: Vec::new(),
            log: VecDeque::with_capacity(LOG_CAPACITY),
            success_count: 0,
            progress: 0.0,
        }
    }

    /// Back to idle: cursor 0, accumulated results discarded.
    fn reset(&mut self) {
        *self = Self::fresh();
    }

    fn push_log(&mut self, message: String) {
        if self.log.len() == LOG_CAPACITY {
            self.log.pop_front();
        }
        self.log.push_back(LogEntry {
            at: Utc::now(),
            message,
        });
    }
}

/// Read-only view of the run record for callers and tests.
#[derive(Debug, Clone)]
pub struct PipelineSnapshot {
    pub state: PipelineState,
    pub cursor: usize,
    pub success_count: usize,
    pub progress: f64,
    pub log: Vec<LogEntry>,
}

// ---------------------------------------------------------------------------
// Observer
// ---------------------------------------------------------------------------

/// Progress update emitted after every processed row.
#[derive(Debug, Clone)]
pub struct ProgressUpdate {
    pub state: PipelineState,
    /// Fraction of rows processed, in [0, 1].
    pub fraction: f64,
    pub rows_processed: usize,
    pub total_rows: usize,
}

/// Callbacks the pipeline publishes to; keeps the state machine decoupled
/// from any particular presentation layer.
pub trait PipelineObserver: Send + Sync {
    /// Called after every processed row (including skipped/failed ones).
    fn on_progress(&self, update: &ProgressUpdate);
    /// Called exactly once per fully-completed run with the final table.
    /// Never called for a run that ends paused or stopped.
    fn on_complete(&self, result: &Table);
}

/// No-op observer for headless/test usage.
pub struct SilentObserver;

impl PipelineObserver for SilentObserver {
    fn on_progress(&self, _update: &ProgressUpdate) {}
    fn on_complete(&self, _result: &Table) {}
}

// ---------------------------------------------------------------------------
// EnrichmentPipeline
// ---------------------------------------------------------------------------

/// How the driver loop ended.
enum LoopExit {
    Completed,
    Paused,
    Stopped,
}

/// The enrichment state machine.
///
/// Construct once, share behind an `Arc`; `start` drives the run on the
/// calling task while `pause`/`stop` may be invoked from any other task.
pub struct EnrichmentPipeline {
    config: PipelineConfig,
    enricher: RowEnricher,
    observer: Arc<dyn PipelineObserver>,
    run: Mutex<RunRecord>,
    pause_requested: AtomicBool,
    stop_requested: AtomicBool,
}

impl EnrichmentPipeline {
    pub fn new(
        config: PipelineConfig,
        discovery: Arc<dyn EntityDiscovery>,
        extractor: Arc<dyn FieldExtraction>,
        observer: Arc<dyn PipelineObserver>,
    ) -> Self {
        let enricher = RowEnricher::new(discovery, extractor, config.content_cap);
        Self {
            config,
            enricher,
            observer,
            run: Mutex::new(RunRecord::fresh()),
            pause_requested: AtomicBool::new(false),
            stop_requested: AtomicBool::new(false),
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> PipelineState {
        self.lock_run().state
    }

    /// Read-only snapshot of the run record.
    pub fn snapshot(&self) -> PipelineSnapshot {
        let run = self.lock_run();
        PipelineSnapshot {
            state: run.state,
            cursor: run.cursor,
            success_count: run.success_count,
            progress: run.progress,
            log: run.log.iter().cloned().collect(),
        }
    }

    /// Request a pause. Only effective while processing; the loop finishes
    /// the in-flight row first.
    pub fn pause(&self) {
        let run = self.lock_run();
        if run.state == PipelineState::Processing {
            self.pause_requested.store(true, Ordering::SeqCst);
            info!("pause requested");
        }
    }

    /// Stop the pipeline: back to idle, cursor 0, accumulated results
    /// discarded. Cooperative while processing; immediate otherwise.
    pub fn stop(&self) {
        self.pause_requested.store(false, Ordering::SeqCst);
        let mut run = self.lock_run();
        if run.state == PipelineState::Processing {
            self.stop_requested.store(true, Ordering::SeqCst);
            info!("stop requested");
        } else {
            run.reset();
            info!("pipeline stopped");
        }
    }

    /// Start (from idle/completed/error) or resume (from paused) a run over
    /// `table`, driving it to completion, pause, or stop.
    ///
    /// Fails with a config error when either client credential is absent,
    /// without touching pipeline state.
    #[instrument(skip_all, fields(rows = table.rows.len()))]
    pub async fn start(&self, table: &Table) -> Result<()> {
        if !self.config.credentials.is_complete() {
            return Err(LeadloomError::config(
                "both search and extraction API keys must be set before starting",
            ));
        }

        let run_id = RunId::new();
        {
            let mut run = self.lock_run();
            match run.state {
                PipelineState::Processing => {
                    return Err(LeadloomError::validation("pipeline is already processing"));
                }
                PipelineState::Paused => {
                    run.state = PipelineState::Processing;
                    info!(%run_id, cursor = run.cursor, "resuming enrichment run");
                }
                PipelineState::Idle | PipelineState::Completed | PipelineState::Error => {
                    run.reset();
                    run.entity_column = resolver::resolve_entity_column(table);
                    run.state = PipelineState::Processing;
                    run.push_log(format!("Run started over {} row(s)", table.rows.len()));
                    info!(%run_id, rows = table.rows.len(), "starting enrichment run");
                }
            }
            // Clear any stale control flags from a previous run.
            self.pause_requested.store(false, Ordering::SeqCst);
            self.stop_requested.store(false, Ordering::SeqCst);
        }

        self.drive(table).await;
        Ok(())
    }

    /// The driver loop. Single worker, strictly in input order.
    async fn drive(&self, table: &Table) {
        let total = table.rows.len();
        let entity_column = { self.lock_run().entity_column.clone() };

        let Some(entity_column) = entity_column else {
            // Empty table (or no columns): nothing to enrich, complete with
            // a pass-through result.
            warn!("no entity column resolved, completing without lookups");
            let result = {
                let mut run = self.lock_run();
                run.results = table.rows.clone();
                run.push_log("No entity column; table passed through".into());
                self.complete(&mut run, table)
            };
            self.observer.on_complete(&result);
            return;
        };

        let exit = loop {
            // Row boundary: the only place control takes effect.
            let index = {
                let run = self.lock_run();
                if run.cursor >= total {
                    break LoopExit::Completed;
                }
                run.cursor
            };
            if self.stop_requested.swap(false, Ordering::SeqCst) {
                break LoopExit::Stopped;
            }
            if self.pause_requested.swap(false, Ordering::SeqCst) {
                break LoopExit::Paused;
            }

            let enriched = self.enricher.enrich(&table.rows[index], &entity_column).await;

            let update = {
                let mut run = self.lock_run();
                let message = match &enriched.outcome {
                    RowOutcome::SkippedBlankEntity => {
                        format!("Row {}: skipped (blank entity)", index + 1)
                    }
                    RowOutcome::DiscoveryFailed(reason) => {
                        format!("Row {}: discovery failed ({reason})", index + 1)
                    }
                    RowOutcome::NoFields => {
                        format!("Row {}: no fields extracted", index + 1)
                    }
                    RowOutcome::Enriched { fields_added } => {
                        run.success_count += 1;
                        format!("Row {}: {fields_added} field(s) extracted", index + 1)
                    }
                };
                run.push_log(message);
                run.results.push(enriched.row);
                run.cursor = index + 1;
                run.progress = (index + 1) as f64 / total as f64;
                ProgressUpdate {
                    state: run.state,
                    fraction: run.progress,
                    rows_processed: index + 1,
                    total_rows: total,
                }
            };
            self.observer.on_progress(&update);

            // Fixed throttle against the external services; elapses in full
            // whether or not the lookups succeeded. Blank rows made no
            // external call and skip it. No delay after the last row.
            let looked_up = !matches!(enriched.outcome, RowOutcome::SkippedBlankEntity);
            if looked_up && index + 1 < total && !self.config.row_delay.is_zero() {
                tokio::time::sleep(self.config.row_delay).await;
            }
        };

        match exit {
            LoopExit::Completed => {
                let result = {
                    let mut run = self.lock_run();
                    run.push_log("Run completed".into());
                    self.complete(&mut run, table)
                };
                info!(
                    rows = result.rows.len(),
                    successes = self.lock_run().success_count,
                    "enrichment run completed"
                );
                self.observer.on_complete(&result);
            }
            LoopExit::Paused => {
                let mut run = self.lock_run();
                run.state = PipelineState::Paused;
                let cursor = run.cursor;
                run.push_log(format!("Paused before row {}", cursor + 1));
                info!(cursor, "enrichment run paused");
            }
            LoopExit::Stopped => {
                let mut run = self.lock_run();
                run.reset();
                info!("enrichment run stopped, results discarded");
            }
        }
    }

    /// Transition to completed and build the result table.
    fn complete(&self, run: &mut RunRecord, source: &Table) -> Table {
        run.state = PipelineState::Completed;
        run.progress = 1.0;
        result_table(&source.columns, run.results.clone())
    }

    fn lock_run(&self) -> MutexGuard<'_, RunRecord> {
        self.run.lock().expect("pipeline run lock poisoned")
    }
}

/// Assemble the result table: original columns first, then any contact
/// columns that enrichment actually produced, in canonical order.
fn result_table(columns: &[String], rows: Vec<Row>) -> Table {
    let mut columns = columns.to_vec();
    for field in ContactField::ALL {
        let name = field.as_str();
        if columns.iter().any(|c| c == name) {
            continue;
        }
        if rows.iter().any(|r| r.get(name).is_some()) {
            columns.push(name.to_string());
        }
    }
    Table::new(columns, rows)
}
