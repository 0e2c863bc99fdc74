//! dataset-copy CLI - copy datasets between data-store instances.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use dataset_copy::catalog::filter_by_name;
use dataset_copy::{
    format_row_count, Config, CopyError, DatasetSummary, DateFilter, Orchestrator,
    ProgressReporter, TargetRef, TransferRequest,
};
use tracing::{info, Level};

#[derive(Parser)]
#[command(name = "dataset-copy")]
#[command(about = "Copy datasets between data-store instances with bounded memory")]
#[command(version)]
struct Cli {
    /// Path to YAML configuration file
    #[arg(short, long, default_value = "config.yaml")]
    config: PathBuf,

    /// Output JSON result to stdout
    #[arg(long)]
    output_json: bool,

    /// Log format: text or json
    #[arg(long, default_value = "text")]
    log_format: String,

    /// Log verbosity: debug, info, warn, error
    #[arg(long, default_value = "info")]
    verbosity: String,

    /// Print progress updates as JSON lines to stderr
    #[arg(long)]
    progress: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum Side {
    Source,
    Target,
}

#[derive(Subcommand)]
enum Commands {
    /// Copy one dataset from the source to the target instance
    Copy {
        /// Source dataset id
        #[arg(long)]
        source: String,

        /// Existing target dataset id to replace
        #[arg(long, conflicts_with = "target_name")]
        target_id: Option<String>,

        /// Target dataset name, created when absent [default: source name]
        #[arg(long)]
        target_name: Option<String>,

        /// Date/time column to filter on
        #[arg(long, requires = "start", requires = "end")]
        date_column: Option<String>,

        /// First day to copy (YYYY-MM-DD, inclusive)
        #[arg(long, requires = "date_column")]
        start: Option<NaiveDate>,

        /// Last day to copy (YYYY-MM-DD, inclusive)
        #[arg(long, requires = "date_column")]
        end: Option<NaiveDate>,

        /// Override the small-transfer threshold (rows)
        #[arg(long)]
        threshold: Option<u64>,

        /// Override rows per page
        #[arg(long)]
        page_size: Option<usize>,
    },

    /// List datasets on one instance
    List {
        /// Instance to list
        #[arg(long, value_enum, default_value = "source")]
        side: Side,

        /// Only show datasets whose name contains this text
        #[arg(long)]
        search: Option<String>,
    },

    /// Show schema and date columns of a source dataset
    Inspect {
        /// Source dataset id
        id: String,
    },
}

/// Writes progress and status as JSON lines to stderr.
struct JsonLinesProgress;

impl ProgressReporter for JsonLinesProgress {
    fn progress(&self, fraction: f64) {
        eprintln!("{}", serde_json::json!({ "progress": fraction }));
    }

    fn status(&self, message: &str) {
        eprintln!("{}", serde_json::json!({ "status": message }));
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", e.format_detailed());
            ExitCode::from(e.exit_code())
        }
    }
}

async fn run() -> Result<(), CopyError> {
    let cli = Cli::parse();

    setup_logging(&cli.verbosity, &cli.log_format).map_err(CopyError::Config)?;

    let mut config = Config::load(&cli.config)?;
    info!("Loaded configuration from {:?}", cli.config);

    match cli.command {
        Commands::Copy {
            source,
            target_id,
            target_name,
            date_column,
            start,
            end,
            threshold,
            page_size,
        } => {
            if let Some(t) = threshold {
                config.transfer.small_transfer_threshold = Some(t);
            }
            if let Some(p) = page_size {
                config.transfer.page_size = Some(p);
            }

            let target = match (target_id, target_name) {
                (Some(id), _) => TargetRef::Id(id),
                (None, Some(name)) => TargetRef::Name(name),
                (None, None) => TargetRef::SourceName,
            };
            let mut request = TransferRequest::new(source, target);
            if let (Some(column), Some(start), Some(end)) = (date_column, start, end) {
                request = request.with_filter(DateFilter::new(column, start, end));
            }

            let mut orchestrator = Orchestrator::new(config)?;
            if cli.progress {
                orchestrator = orchestrator.with_progress(Arc::new(JsonLinesProgress));
            }

            let result = orchestrator.run(&request).await?;

            if cli.output_json {
                println!("{}", result.to_json()?);
            } else {
                println!("\nTransfer completed!");
                println!("  Run ID: {}", result.run_id);
                println!("  Duration: {:.2}s", result.duration_seconds);
                println!("  Source: {} ({})", result.source_name, result.source_dataset_id);
                println!(
                    "  Target: {} ({}){}",
                    result.target_name,
                    result.target_dataset_id,
                    if result.created_target { " [created]" } else { "" }
                );
                println!("  Strategy: {}", result.strategy);
                if let Some(filter) = &result.filter {
                    println!("  Filter: {}", filter);
                }
                println!("  Rows: {}", format_row_count(result.rows_copied));
            }
        }

        Commands::List { side, search } => {
            let mut orchestrator = Orchestrator::new(config)?;
            let datasets = match side {
                Side::Source => orchestrator.source().list_datasets().await?,
                Side::Target => orchestrator.target_datasets().await?,
            };
            let shown: Vec<&DatasetSummary> = match &search {
                Some(text) => filter_by_name(&datasets, text),
                None => datasets.iter().collect(),
            };

            if cli.output_json {
                println!("{}", serde_json::to_string_pretty(&shown)?);
            } else {
                for d in &shown {
                    let rows = d
                        .row_count
                        .map(format_row_count)
                        .unwrap_or_else(|| "?".to_string());
                    println!("{:<40} {:>14}  {}", d.id, rows, d.name);
                }
                println!("\n{} datasets", shown.len());
            }
        }

        Commands::Inspect { id } => {
            let mut orchestrator = Orchestrator::new(config)?;
            let dataset = orchestrator.source().get_dataset(&id).await?;
            let existing = orchestrator.find_target(&dataset.name).await?;
            let date_columns: Vec<&str> = dataset
                .date_columns()
                .into_iter()
                .map(|c| c.name.as_str())
                .collect();

            if cli.output_json {
                let report = serde_json::json!({
                    "dataset": &dataset,
                    "date_columns": date_columns,
                    "existing_target": existing,
                });
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!("{} ({})", dataset.name, dataset.id);
                println!("  Rows: ~{}", format_row_count(dataset.row_count));
                println!("  Columns:");
                for column in &dataset.columns {
                    println!("    {:<32} {}", column.name, column.column_type);
                }
                if date_columns.is_empty() {
                    println!("  Date columns: none (date filtering unavailable)");
                } else {
                    println!("  Date columns: {}", date_columns.join(", "));
                }
                match existing {
                    Some(t) => println!("  Target: replaces existing dataset {}", t.id),
                    None => println!("  Target: a new dataset will be created"),
                }
            }
        }
    }

    Ok(())
}

fn setup_logging(verbosity: &str, format: &str) -> Result<(), String> {
    let level = match verbosity.to_lowercase().as_str() {
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false);

    if format == "json" {
        subscriber.json().init();
    } else {
        subscriber.init();
    }

    Ok(())
}
