//! Subcommand implementations.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, bail};
use tracing::info;
use uuid::Uuid;

use blueprint_core::{ChunkRange, RecipientKey, WorkItemStore, chunk_range};
use blueprint_infra::{
    HttpRenderer, JsonFileCheckpointStore, MailRelayNotifier, ResolveRequest, SenderConfig, SleeperClient,
    export_buy_maps, load_buy_map, load_work_items, merge_disallowed, uploader_from_config, write_selected,
};
use blueprint_pipeline::{BatchDriver, CheckpointStore, ItemPipeline, RunReport, RunState};

use crate::args::{ChunkArgs, MergeArgs, ResolveArgs, RunArgs};

/// Load the work list from `--input` when given, else from the config lists,
/// then apply `--disallowed-from`.
pub fn load_store(args: &RunArgs, config: &SenderConfig) -> anyhow::Result<WorkItemStore> {
    let mut store = match &args.input {
        Some(path) => load_work_items(path).with_context(|| format!("loading customer info {}", path.display()))?,
        None => WorkItemStore::from_columns(&config.columns()),
    };

    if let Some(path) = &args.disallowed_from {
        let prior: BTreeMap<RecipientKey, String> = load_buy_map(path)
            .with_context(|| format!("reading {}", path.display()))?
            .into_iter()
            .filter_map(|(key, buys)| RecipientKey::parse(&key).ok().map(|key| (key, buys)))
            .collect();
        let updated = store.apply_disallowed(&prior);
        info!(path = %path.display(), updated, "applied disallowed buys");
    }
    Ok(store)
}

/// The slice of a `len`-item list this run owns.
pub fn owned_range(args: &RunArgs, len: usize) -> anyhow::Result<ChunkRange> {
    match args.shard() {
        Some((k, n)) => chunk_range(len, k, n).with_context(|| format!("chunk {k} of {n}")),
        None => Ok(ChunkRange::full(len)),
    }
}

/// Wire the HTTP adapters selected by `config`.
pub fn build_pipeline(args: &RunArgs, config: &SenderConfig, folder: &str) -> anyhow::Result<ItemPipeline> {
    let renderer = Arc::new(HttpRenderer::from_config(&config.render));
    let uploader = uploader_from_config(&config.upload);
    let mut pipeline = ItemPipeline::new(renderer, uploader, folder).with_retry_policy(config.retry.policy());

    if args.notify_enabled() {
        let settings = config
            .notify_settings(|name| std::env::var(name).ok())
            .context("notifications requested but not configured")?;
        pipeline = pipeline.with_notifier(Arc::new(MailRelayNotifier::new(settings)));
    }
    Ok(pipeline)
}

/// Drive `store` through `pipeline`, then export the buy maps if asked.
pub fn execute(
    args: &RunArgs,
    config: &SenderConfig,
    pipeline: &ItemPipeline,
    mut store: WorkItemStore,
) -> anyhow::Result<RunReport> {
    let range = owned_range(args, store.len())?;
    let checkpoints = JsonFileCheckpointStore::new(args.checkpoint_path());
    let state = RunState::new(args.start_index).with_skip_set(config.skip_keys());

    let report = BatchDriver::new(pipeline, &checkpoints)
        .run(&mut store, range, state)
        .with_context(|| format!("checkpoint {}", checkpoints.path().display()))?;

    if let Some(dir) = &args.export_dir {
        let checkpoint = checkpoints.load()?;
        export_buy_maps(&checkpoint, dir).with_context(|| format!("exporting buy maps to {}", dir.display()))?;
    }
    Ok(report)
}

pub fn run(args: &RunArgs) -> anyhow::Result<RunReport> {
    let config = SenderConfig::load(&args.config)?;
    let store = load_store(args, &config)?;
    if store.is_empty() {
        bail!("no work items to process");
    }

    let folder = args
        .folder_name
        .clone()
        .unwrap_or_else(|| Uuid::new_v4().to_string());
    info!(folder = %folder, items = store.len(), notify = args.notify_enabled(), "prepared run");

    let pipeline = build_pipeline(args, &config, &folder)?;
    execute(args, &config, &pipeline, store)
}

/// Returns the owned range, writing the slice when `--input` is given.
pub fn chunk(args: &ChunkArgs) -> anyhow::Result<ChunkRange> {
    match (&args.input, &args.output, args.length) {
        (Some(input), Some(output), _) => {
            let len = json_array_len(input)?;
            let range = chunk_range(len, args.chunk_index, args.chunks)?;
            let kept = write_selected(input, output, &[range])?;
            info!(%range, kept, output = %output.display(), "wrote chunk");
            Ok(range)
        }
        (None, _, Some(len)) => Ok(chunk_range(len, args.chunk_index, args.chunks)?),
        _ => bail!("either --length or --input/--output is required"),
    }
}

fn json_array_len(path: &Path) -> anyhow::Result<usize> {
    let value: serde_json::Value = blueprint_infra::fs::read_json(path)
        .with_context(|| format!("reading {}", path.display()))?;
    value
        .as_array()
        .map(Vec::len)
        .with_context(|| format!("{} must contain a JSON array", path.display()))
}

pub fn merge(args: &MergeArgs) -> anyhow::Result<usize> {
    Ok(merge_disallowed(&args.customers, &args.checkpoints, &args.output)?)
}

pub fn resolve_users(args: &ResolveArgs) -> anyhow::Result<usize> {
    let requests: Vec<ResolveRequest> = blueprint_infra::fs::read_json(&args.input)
        .with_context(|| format!("reading {}", args.input.display()))?;
    let client = SleeperClient::new(args.api_base.clone(), std::time::Duration::from_secs(args.timeout_secs))?;

    let rows = client.resolve(&requests);
    blueprint_infra::fs::write_json_atomic(&args.output, &rows)
        .with_context(|| format!("writing {}", args.output.display()))?;
    info!(rows = rows.len(), output = %args.output.display(), "resolved users");
    Ok(rows.len())
}
