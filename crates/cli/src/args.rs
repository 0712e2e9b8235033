//! Command-line arguments.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use blueprint_observability::LogFormat;

#[derive(Debug, Parser)]
#[command(name = "blueprint-sender")]
#[command(about = "Render, publish, and announce monthly blueprints in resumable batches")]
#[command(version)]
pub struct Cli {
    /// Log output format
    #[arg(long, global = true, default_value = "pretty")]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Process a batch (or one shard of it)
    Run(RunArgs),
    /// Print or extract the slice of a work list owned by one shard
    Chunk(ChunkArgs),
    /// Attach last run's buys to a customer-info file as `disallowed`
    MergeDisallowed(MergeArgs),
    /// Resolve Sleeper usernames to user ids and check league membership
    ResolveUsers(ResolveArgs),
}

#[derive(Debug, Clone, Args)]
pub struct RunArgs {
    /// YAML sender config
    #[arg(short, long)]
    pub config: PathBuf,

    /// JSON customer-info export; the config lists are used when absent
    #[arg(short, long)]
    pub input: Option<PathBuf>,

    /// Exported key → buys map from the previous run; its buys become this
    /// run's disallowed buys
    #[arg(long)]
    pub disallowed_from: Option<PathBuf>,

    /// Send notifications (1) or only render and upload (0)
    #[arg(long, default_value_t = 0, value_parser = clap::value_parser!(u8).range(0..=1))]
    pub send_notify: u8,

    /// Absolute index into the work list to resume from
    #[arg(long, default_value_t = 0)]
    pub start_index: usize,

    /// Destination folder name; a random UUID when omitted
    #[arg(long)]
    pub folder_name: Option<String>,

    /// 1-based shard index (requires --chunks)
    #[arg(long, requires = "chunks")]
    pub chunk_index: Option<usize>,

    /// Number of shards (requires --chunk-index)
    #[arg(long, requires = "chunk_index")]
    pub chunks: Option<usize>,

    /// Checkpoint file; defaults to one per shard under `checkpoints/`
    #[arg(long)]
    pub checkpoint: Option<PathBuf>,

    /// Directory to write the email/league/user buy maps to after the run
    #[arg(long)]
    pub export_dir: Option<PathBuf>,
}

impl RunArgs {
    pub fn notify_enabled(&self) -> bool {
        self.send_notify == 1
    }

    pub fn shard(&self) -> Option<(usize, usize)> {
        self.chunk_index.zip(self.chunks)
    }

    pub fn checkpoint_path(&self) -> PathBuf {
        if let Some(path) = &self.checkpoint {
            return path.clone();
        }
        match self.shard() {
            Some((k, n)) => PathBuf::from(format!("checkpoints/checkpoint-{k}-of-{n}.json")),
            None => PathBuf::from("checkpoints/checkpoint.json"),
        }
    }
}

#[derive(Debug, Clone, Args)]
pub struct ChunkArgs {
    /// 1-based shard index
    #[arg(long)]
    pub chunk_index: usize,

    /// Number of shards
    #[arg(long)]
    pub chunks: usize,

    /// Work list length (when not reading --input)
    #[arg(long, required_unless_present = "input", conflicts_with = "input")]
    pub length: Option<usize>,

    /// JSON array to slice
    #[arg(long, requires = "output")]
    pub input: Option<PathBuf>,

    /// Where to write the slice
    #[arg(long, requires = "input")]
    pub output: Option<PathBuf>,
}

#[derive(Debug, Clone, Args)]
pub struct MergeArgs {
    /// JSON customer-info export
    #[arg(long)]
    pub customers: PathBuf,

    /// Exported key → buys map; the first one that knows a key wins
    #[arg(long = "checkpoint", required = true)]
    pub checkpoints: Vec<PathBuf>,

    /// Where to write the merged customer info
    #[arg(long)]
    pub output: PathBuf,
}

#[derive(Debug, Clone, Args)]
pub struct ResolveArgs {
    /// JSON array of `{sleeper_username, league_id}`
    #[arg(long)]
    pub input: PathBuf,

    /// Where to write the resolved rows
    #[arg(long)]
    pub output: PathBuf,

    /// Sleeper API base URL
    #[arg(long, default_value = blueprint_infra::sleeper::SLEEPER_API)]
    pub api_base: String,

    /// Per-request timeout in seconds
    #[arg(long, default_value_t = 30)]
    pub timeout_secs: u64,
}
