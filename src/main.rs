use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};

use taxi_lakehouse::config::Config;
use taxi_lakehouse::pipeline::steps::{AggregationStage, CleaningStage, IngestionStage, Stage};
use taxi_lakehouse::pipeline::{Pipeline, PipelineContext, SnapshotKind};
use taxi_lakehouse::report::{render_table, ConsoleReporter};
use taxi_lakehouse::storage::{FileSnapshotStore, SnapshotStore};
use taxi_lakehouse::{logging, metrics};

#[derive(Parser)]
#[command(name = "taxi_lakehouse")]
#[command(about = "Taxi trip lakehouse: raw, clean and summary snapshots")]
#[command(version)]
struct Cli {
    /// Config file (defaults to ./lakehouse.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Override the storage base path
    #[arg(long, global = true)]
    base_path: Option<String>,

    /// Directory for rotated JSON logs
    #[arg(long, global = true, default_value = "logs")]
    log_dir: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load the delimited source into the raw snapshot
    Ingest {
        /// Input file (defaults to <base_path>/taxi_tripdata.csv)
        #[arg(long)]
        input: Option<PathBuf>,
    },
    /// Clean the raw snapshot into the clean snapshot
    Clean,
    /// Aggregate the clean snapshot into the summary snapshot
    Aggregate,
    /// Run ingest, clean and aggregate in order
    Run {
        #[arg(long)]
        input: Option<PathBuf>,
    },
    /// List committed versions of a snapshot
    History {
        #[arg(value_enum)]
        snapshot: SnapshotArg,
    },
    /// Print rows of a snapshot, optionally at an older version
    Show {
        #[arg(value_enum)]
        snapshot: SnapshotArg,
        #[arg(long)]
        version: Option<u64>,
        #[arg(long, default_value_t = 20)]
        rows: usize,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum SnapshotArg {
    Raw,
    Clean,
    Summary,
}

impl From<SnapshotArg> for SnapshotKind {
    fn from(arg: SnapshotArg) -> Self {
        match arg {
            SnapshotArg::Raw => SnapshotKind::Raw,
            SnapshotArg::Clean => SnapshotKind::Clean,
            SnapshotArg::Summary => SnapshotKind::Summary,
        }
    }
}

fn single(stage: impl Stage + 'static) -> anyhow::Result<Pipeline> {
    let stages: Vec<Box<dyn Stage>> = vec![Box::new(stage)];
    Ok(Pipeline::new(stages)?)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();
    let _guard = logging::init_logging(&cli.log_dir);
    metrics::init_metrics();

    let mut config = Config::load(cli.config.as_deref()).context("loading configuration")?;
    if let Some(base) = cli.base_path {
        config.storage.base_path = base;
    }

    let store: Arc<dyn SnapshotStore> =
        Arc::new(FileSnapshotStore::new(config.storage.snapshot_root()));
    info!("Snapshot root: {}", config.storage.snapshot_root().display());

    let input_or_default = |input: Option<PathBuf>, config: &Config| {
        input.unwrap_or_else(|| config.input_path())
    };

    let pipeline = match cli.command {
        Commands::Ingest { input } => single(IngestionStage::new(input_or_default(input, &config)))?,
        Commands::Clean => single(CleaningStage)?,
        Commands::Aggregate => single(AggregationStage)?,
        Commands::Run { input } => Pipeline::standard(input_or_default(input, &config)),
        Commands::History { snapshot } => {
            let ctx = PipelineContext::new(store, Arc::new(ConsoleReporter), config);
            let kind = SnapshotKind::from(snapshot);
            let history = ctx.store.history(ctx.snapshot_name(kind)).await?;
            if history.is_empty() {
                println!("No versions committed at {}", ctx.location(kind));
            }
            for info in history {
                println!(
                    "version {:>4}  {}  {:>10} rows  sha256:{}",
                    info.version,
                    info.committed_at.to_rfc3339(),
                    info.row_count,
                    info.content_hash
                );
            }
            return Ok(());
        }
        Commands::Show {
            snapshot,
            version,
            rows,
        } => {
            let ctx = PipelineContext::new(store, Arc::new(ConsoleReporter), config);
            let name = ctx.snapshot_name(snapshot.into());
            let table = match version {
                Some(v) => ctx.store.read_version(name, v).await?,
                None => ctx.store.read(name).await?,
            };
            println!("{} rows", table.len());
            print!("{}", render_table(&table.head(rows)));
            return Ok(());
        }
    };

    let ctx = PipelineContext::new(store, Arc::new(ConsoleReporter), config);
    match pipeline.run(&ctx).await {
        Ok(result) => {
            info!("Pipeline finished: {} stage(s) committed", result.reports.len());
            Ok(())
        }
        Err(e) => {
            error!("Pipeline failed: {}", e);
            Err(e.into())
        }
    }
}
