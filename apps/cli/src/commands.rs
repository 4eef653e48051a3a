//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Instant;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use leadloom_core::pipeline::{
    EnrichmentPipeline, PipelineObserver, PipelineState, ProgressUpdate,
};
use leadloom_core::stats::completion_stats;
use leadloom_discovery::{DiscoveryOptions, WebDiscovery};
use leadloom_extraction::{ExtractorOptions, OpenRouterExtractor};
use leadloom_shared::{
    AppConfig, Credentials, PipelineConfig, Table, init_config, load_config,
};

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// LeadLoom — fill in contact details for every row of a lead list.
#[derive(Parser)]
#[command(
    name = "leadloom",
    version,
    about = "Enrich CSV lead lists with contact attributes found on the web.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Enrich a CSV file row by row.
    Enrich {
        /// Input CSV file (one row per organization/person).
        input: PathBuf,

        /// Output CSV path (defaults to `<input>-enriched.csv`).
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// Delay between rows in milliseconds (overrides config).
        #[arg(long)]
        delay_ms: Option<u64>,

        /// Extraction model ID (overrides config).
        #[arg(long)]
        model: Option<String>,
    },

    /// Show completion statistics for an enriched file.
    Stats {
        /// The original CSV file.
        original: PathBuf,

        /// The enriched CSV file.
        enriched: PathBuf,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "leadloom=info",
        1 => "leadloom=debug",
        _ => "leadloom=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .init();
        }
        LogFormat::Json => {
            fmt().json().with_env_filter(env_filter).init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Enrich {
            input,
            out,
            delay_ms,
            model,
        } => cmd_enrich(&input, out.as_deref(), delay_ms, model.as_deref()).await,
        Command::Stats { original, enriched } => cmd_stats(&original, &enriched).await,
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init().await,
            ConfigAction::Show => cmd_config_show().await,
        },
    }
}

// ---------------------------------------------------------------------------
// enrich
// ---------------------------------------------------------------------------

async fn cmd_enrich(
    input: &Path,
    out: Option<&Path>,
    delay_ms: Option<u64>,
    model: Option<&str>,
) -> Result<()> {
    let mut config = load_config()?;
    if let Some(ms) = delay_ms {
        config.defaults.row_delay_ms = ms;
    }
    if let Some(model) = model {
        config.openrouter.default_model = model.to_string();
    }

    // Resolve credentials before doing anything
    let credentials = Credentials::from_env(&config)?;

    let table = leadloom_table::read_csv(input)?;
    if table.is_empty() {
        return Err(eyre!("'{}' has no data rows", input.display()));
    }

    let out_path = match out {
        Some(p) => p.to_path_buf(),
        None => default_output_path(input),
    };

    let discovery = WebDiscovery::new(DiscoveryOptions {
        endpoint: config.search.endpoint.clone(),
        api_key: credentials.search_api_key.clone(),
        timeout_secs: config.search.timeout_secs,
    })?;

    let extractor = OpenRouterExtractor::new(ExtractorOptions {
        base_url: config.openrouter.base_url.clone(),
        api_key: credentials.llm_api_key.clone(),
        model: config.openrouter.default_model.clone(),
    })?;

    let pipeline_config = PipelineConfig::from_config(&config, credentials);
    let observer = Arc::new(CliProgress::new(table.rows.len() as u64));
    let pipeline = Arc::new(EnrichmentPipeline::new(
        pipeline_config,
        Arc::new(discovery),
        Arc::new(extractor),
        observer.clone(),
    ));

    // Ctrl-C requests a cooperative stop; the in-flight row finishes first.
    {
        let pipeline = pipeline.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                pipeline.stop();
            }
        });
    }

    info!(
        input = %input.display(),
        rows = table.rows.len(),
        model = %config.openrouter.default_model,
        "starting enrichment"
    );

    let start = Instant::now();
    pipeline.start(&table).await?;

    match pipeline.state() {
        PipelineState::Completed => {
            let result = observer
                .take_result()
                .ok_or_else(|| eyre!("pipeline completed without a result table"))?;

            leadloom_table::write_csv(&out_path, &result)?;

            let stats = completion_stats(&table, &result);
            let snapshot = pipeline.snapshot();

            println!();
            println!("  Enrichment complete!");
            println!("  Rows:     {}", result.rows.len());
            println!("  Enriched: {}", snapshot.success_count);
            println!("  Filled:   {:.1}% of contact cells", stats.overall_percent);
            println!("  Changed:  {} row(s)", stats.changed_rows.len());
            println!("  Output:   {}", out_path.display());
            println!("  Time:     {:.1}s", start.elapsed().as_secs_f64());
            println!();
            Ok(())
        }
        PipelineState::Idle => {
            println!();
            println!("  Enrichment stopped; no output written.");
            println!();
            Ok(())
        }
        state => Err(eyre!("pipeline ended in unexpected state: {state}")),
    }
}

/// `<stem>-enriched.csv` next to the input file.
fn default_output_path(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "output".to_string());
    input.with_file_name(format!("{stem}-enriched.csv"))
}

// ---------------------------------------------------------------------------
// CLI progress observer
// ---------------------------------------------------------------------------

/// Progress bar observer; also captures the completed result table.
struct CliProgress {
    bar: ProgressBar,
    result: Mutex<Option<Table>>,
}

impl CliProgress {
    fn new(total_rows: u64) -> Self {
        let bar = ProgressBar::new(total_rows);
        bar.set_style(
            ProgressStyle::with_template(
                "{spinner:.cyan} [{bar:40.cyan/blue}] {pos}/{len} rows {msg}",
            )
            .expect("valid progress template")
            .progress_chars("##-"),
        );
        Self {
            bar,
            result: Mutex::new(None),
        }
    }

    fn take_result(&self) -> Option<Table> {
        self.result.lock().expect("result lock poisoned").take()
    }
}

impl PipelineObserver for CliProgress {
    fn on_progress(&self, update: &ProgressUpdate) {
        self.bar.set_position(update.rows_processed as u64);
    }

    fn on_complete(&self, result: &Table) {
        self.bar.finish_and_clear();
        *self.result.lock().expect("result lock poisoned") = Some(result.clone());
    }
}

// ---------------------------------------------------------------------------
// stats
// ---------------------------------------------------------------------------

async fn cmd_stats(original: &Path, enriched: &Path) -> Result<()> {
    let original_table = leadloom_table::read_csv(original)?;
    let enriched_table = leadloom_table::read_csv(enriched)?;

    if original_table.rows.len() != enriched_table.rows.len() {
        return Err(eyre!(
            "row count mismatch: {} has {} rows, {} has {}",
            original.display(),
            original_table.rows.len(),
            enriched.display(),
            enriched_table.rows.len()
        ));
    }

    let stats = completion_stats(&original_table, &enriched_table);

    println!();
    println!("  Completion by attribute:");
    for field in &stats.fields {
        println!(
            "    {:<10} {:>4}/{:<4} ({:.1}%)",
            field.field.as_str(),
            field.populated,
            stats.row_count,
            field.percent
        );
    }
    println!();
    println!("  Overall:      {:.1}% of contact cells", stats.overall_percent);
    println!("  Changed rows: {}", stats.changed_rows.len());
    println!();

    Ok(())
}

// ---------------------------------------------------------------------------
// config
// ---------------------------------------------------------------------------

async fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

async fn cmd_config_show() -> Result<()> {
    let config: AppConfig = load_config()?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}
