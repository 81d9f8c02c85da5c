//! `flowrelay dispatch`: map a rows file and send the valid records in batches.

use anyhow::{Context, Result};
use clap::Args;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use flowrelay_core::{
    DispatchError, DispatchOptions, Dispatcher, Mapper, MappingRegistry, RemoteCall, RunFlowParams,
};

use crate::rows::RowsFile;

#[derive(Args)]
pub struct DispatchArgs {
    /// Path to a {"headers": [...], "rows": [[...]]} JSON file
    #[arg(short, long)]
    input: PathBuf,
    /// Mapping type
    #[arg(long, default_value = "materials")]
    mapping: String,
    /// runFlow flow id (default z244yolix5cg9meb)
    #[arg(long)]
    flow_id: Option<String>,
    /// runFlow action (default materials_excel)
    #[arg(long)]
    action: Option<String>,
    /// Records per batch
    #[arg(long, default_value_t = 200)]
    batch_size: usize,
    /// Retries per batch after the first attempt
    #[arg(long, default_value_t = 3)]
    max_retries: u32,
    /// Wait between retries and between batches, in milliseconds
    #[arg(long, default_value_t = 1000)]
    retry_delay_ms: u64,
    /// Only send the first N valid records
    #[arg(long)]
    limit: Option<usize>,
    /// Print the full summary as JSON
    #[arg(long)]
    json: bool,
}

pub async fn run(
    args: DispatchArgs,
    registry: MappingRegistry,
    remote: Arc<dyn RemoteCall>,
    cancel: CancellationToken,
) -> Result<()> {
    let mapper = Mapper::new(Arc::new(registry));
    let mapped = RowsFile::load(&args.input)?.map(&mapper, &args.mapping)?;
    println!(
        "Mapped {} rows: {} valid, {} filtered ({}%)",
        mapped.total(),
        mapped.valid.len(),
        mapped.invalid.len(),
        mapped.filter_rate()
    );

    let mut records = mapped.valid;
    if let Some(limit) = args.limit {
        records.truncate(limit);
    }

    let options = DispatchOptions::default()
        .batch_size(args.batch_size)
        .max_retries(args.max_retries)
        .retry_delay(Duration::from_millis(args.retry_delay_ms));
    let params = RunFlowParams::or_default(args.flow_id, args.action);

    let dispatcher = Dispatcher::new(remote, options)
        .with_cancel(cancel)
        .on_progress(|done, total| eprintln!("  batch {done}/{total} done"));

    let summary = match dispatcher.dispatch(&records, &params.to_map()).await {
        Ok(summary) => summary,
        Err(DispatchError::EmptyInput) => anyhow::bail!("no valid records in '{}'", args.input.display()),
        Err(e) => return Err(e).context("dispatch"),
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        println!("{}", summary.message());
        for outcome in summary.failed_outcomes() {
            println!(
                "  ✗ batch {} (records {}..{}): {}",
                outcome.batch_index,
                outcome.offset,
                outcome.offset + outcome.data_count,
                outcome.error.as_deref().unwrap_or_default()
            );
        }
    }

    if !summary.success {
        anyhow::bail!("{} records failed to dispatch", summary.error_count);
    }
    Ok(())
}
