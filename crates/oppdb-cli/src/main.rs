mod files;
mod pipeline;
mod review;

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use oppdb_core::{ClusterStrategy, OpportunityStatus};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "oppdb")]
#[command(about = "Extract and deduplicate customer-feedback opportunities")]
struct Cli {
    /// Tracing filter used when RUST_LOG is not set
    #[arg(long, global = true, env = "OPPDB_LOG_LEVEL", default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Extract opportunities from a JSON array of content items
    Extract {
        #[command(flatten)]
        extract: ExtractArgs,
    },
    /// Merge near-duplicate opportunities in a JSON array of opportunities
    Dedup {
        input: PathBuf,

        /// Write here instead of stdout
        #[arg(long, short)]
        output: Option<PathBuf>,

        #[command(flatten)]
        dedup: DedupArgs,
    },
    /// Extract, then deduplicate the result
    Run {
        #[command(flatten)]
        extract: ExtractArgs,

        #[command(flatten)]
        dedup: DedupArgs,
    },
    /// Move an opportunity to a new workflow status
    Status {
        /// JSON array of opportunities, rewritten in place
        file: PathBuf,
        id: String,
        /// nueva, en_proceso, solucionada, descartada or bloqueada
        status: OpportunityStatus,
    },
    /// Replace the comments of an opportunity
    Comment {
        /// JSON array of opportunities, rewritten in place
        file: PathBuf,
        id: String,
        text: String,
    },
}

#[derive(Debug, Args)]
struct ExtractArgs {
    /// JSON array of content items
    input: PathBuf,

    /// Write here instead of stdout
    #[arg(long, short)]
    output: Option<PathBuf>,

    /// Items per analysis batch
    #[arg(long)]
    batch_size: Option<usize>,

    /// Items beyond this count are dropped
    #[arg(long)]
    max_items: Option<usize>,

    /// Most opportunities asked for per item
    #[arg(long)]
    max_opportunities: Option<usize>,

    /// Logical date of the run (YYYY-MM-DD), defaults to now
    #[arg(long)]
    processing_date: Option<NaiveDate>,
}

#[derive(Debug, Args)]
struct DedupArgs {
    /// Similarity at or above which opportunities are merged
    #[arg(long, env = "SIMILARITY_THRESHOLD")]
    threshold: Option<f32>,

    /// greedy-seed or connected-components
    #[arg(long, env = "OPPDB_CLUSTER_STRATEGY")]
    strategy: Option<ClusterStrategy>,

    /// Text Embeddings Inference server
    #[arg(long, env = "OPPDB_TEI_URL", default_value = "http://localhost:8080")]
    tei_url: String,

    #[arg(long, env = "OPPDB_REQUEST_TIMEOUT_SECS", default_value_t = 60)]
    timeout_secs: u64,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let env_filter =
        EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(&cli.log_level))?;
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Extract { extract } => pipeline::run_extract(&extract).await?,
        Commands::Dedup {
            input,
            output,
            dedup,
        } => pipeline::run_dedup(&input, output.as_deref(), &dedup).await?,
        Commands::Run { extract, dedup } => pipeline::run_full(&extract, &dedup).await?,
        Commands::Status { file, id, status } => review::set_status(&file, &id, status)?,
        Commands::Comment { file, id, text } => review::set_comments(&file, &id, &text)?,
    }

    Ok(())
}
