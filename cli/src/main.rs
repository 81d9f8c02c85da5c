//! FlowRelay CLI: map spreadsheet rows and relay them to an ERP runFlow endpoint.
//!
//! # Commands
//! ```text
//! flowrelay serve     --bind <addr>
//! flowrelay map       --input <rows.json> [--mapping materials]
//! flowrelay dispatch  --input <rows.json> [--flow-id ..] [--action ..] [--batch-size N]
//! flowrelay mappings
//! flowrelay actions
//! flowrelay health
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use flowrelay_core::{FlowAction, Mapper, MappingRegistry, MaterialsPolicy};
use flowrelay_http::{ErpConfig, HealthStatus, RunFlowClient};
use flowrelay_server::telemetry::{init_tracing, LogConfig};
use flowrelay_server::AppState;

mod cmd_dispatch;
mod rows;

#[derive(Parser)]
#[command(
    name = "flowrelay",
    about = "Spreadsheet to ERP batch relay (FlowRelay CLI)",
    long_about = "
FlowRelay CLI: map sheet rows into typed records and dispatch them to an ERP
runFlow endpoint in paced, retried batches.

ENVIRONMENT VARIABLES:
  ERP_BASE_URL            ERP base URL (required unless --config is given)
  ERP_AUTHORIZATION       Authorization header value (required)
  ERP_RUN_FLOW_PATH       runFlow path (default /api/runFlow)
  ERP_OPEN_RUN_FLOW_PATH  open runFlow path (default /api/open/runFlow)
  ERP_TIMEOUT             request timeout in ms (default 100000)
  ERP_APP_VERSION         app-version header (default v1.1.96)
  RUST_LOG                log filter, overrides --verbose
",
    version
)]
struct Cli {
    /// Enable debug logging for the flowrelay crates
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON structured logs
    #[arg(long, global = true)]
    json_logs: bool,

    /// Validity rule for the materials mapping
    #[arg(long, global = true, value_enum, default_value_t = PolicyArg::NonZeroPrices)]
    policy: PolicyArg,

    /// YAML file with the ERP connection settings (defaults to ERP_* env vars)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum PolicyArg {
    KeyOnly,
    NonZeroPrices,
}

impl From<PolicyArg> for MaterialsPolicy {
    fn from(p: PolicyArg) -> Self {
        match p {
            PolicyArg::KeyOnly => MaterialsPolicy::KeyOnly,
            PolicyArg::NonZeroPrices => MaterialsPolicy::NonZeroPrices,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Run the JSON HTTP API
    Serve {
        /// Listen address
        #[arg(long, default_value = "0.0.0.0:3000")]
        bind: SocketAddr,
    },

    /// Map a rows file and print valid / invalid records
    Map {
        /// Path to a {"headers": [...], "rows": [[...]]} JSON file
        #[arg(short, long)]
        input: PathBuf,
        /// Mapping type
        #[arg(long, default_value = "materials")]
        mapping: String,
        /// Print the records as JSON instead of a summary
        #[arg(long)]
        json: bool,
    },

    /// Map a rows file and dispatch the valid records
    Dispatch(cmd_dispatch::DispatchArgs),

    /// List registered mappings
    Mappings,

    /// List the built-in runFlow actions
    Actions,

    /// Probe the configured ERP endpoint
    Health,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_tracing(&log_config(cli.verbose, cli.json_logs));

    let registry = MappingRegistry::with_builtin(cli.policy.into());
    let config = cli.config.as_deref();

    match cli.command {
        Commands::Serve { bind } => cmd_serve(bind, registry, config).await,

        Commands::Map { input, mapping, json } => cmd_map(&input, &mapping, registry, json),

        Commands::Dispatch(args) => {
            let client = erp_client(config)?;
            cmd_dispatch::run(args, registry, Arc::new(client), shutdown_on_ctrl_c()).await
        }

        Commands::Mappings => cmd_mappings(&registry),

        Commands::Actions => cmd_actions(),

        Commands::Health => cmd_health(config).await,
    }
}

// ─── Shared helpers ──────────────────────────────────────────────────────────

/// `--verbose` raises the flowrelay crates to debug; dependencies stay at info.
fn log_config(verbose: bool, json: bool) -> LogConfig {
    let mut config = LogConfig {
        json,
        ..LogConfig::default()
    };
    if verbose {
        for component in ["flowrelay-core", "flowrelay-http", "flowrelay-server", "flowrelay"] {
            config.components.insert(component.into(), "debug".into());
        }
    }
    config
}

fn erp_client(config: Option<&Path>) -> Result<RunFlowClient> {
    let config = match config {
        Some(path) => ErpConfig::from_yaml_file(path)
            .with_context(|| format!("load ERP config '{}'", path.display()))?,
        None => ErpConfig::from_env().context("load ERP config from environment")?,
    };
    RunFlowClient::new(config).context("build runFlow client")
}

/// Token cancelled on the first Ctrl-C.
fn shutdown_on_ctrl_c() -> CancellationToken {
    let token = CancellationToken::new();
    let trigger = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupt received, stopping");
            trigger.cancel();
        }
    });
    token
}

// ─── Command implementations ─────────────────────────────────────────────────

async fn cmd_serve(bind: SocketAddr, registry: MappingRegistry, config: Option<&Path>) -> Result<()> {
    let client = erp_client(config)?;
    tracing::info!(erp = %client.config().base_url, "ERP endpoint configured");
    let state = AppState::with_erp(registry, client).shutdown_token(shutdown_on_ctrl_c());
    flowrelay_server::serve(bind, Arc::new(state))
        .await
        .with_context(|| format!("serve on {bind}"))
}

fn cmd_map(input: &Path, mapping: &str, registry: MappingRegistry, as_json: bool) -> Result<()> {
    let mapper = Mapper::new(Arc::new(registry));
    let file = rows::RowsFile::load(input)?;
    let mapped = file.map(&mapper, mapping)?;

    if as_json {
        println!("{}", serde_json::to_string_pretty(&mapped)?);
        return Ok(());
    }

    println!("Mapping:   {mapping}");
    println!("Rows:      {}", mapped.total());
    println!("Valid:     {}", mapped.valid.len());
    println!("Invalid:   {} ({}% filtered)", mapped.invalid.len(), mapped.filter_rate());
    if let Ok(spec) = mapper.registry().get(mapping) {
        for record in &mapped.invalid {
            let reason = flowrelay_core::mapper::invalid_reason(record, spec).unwrap_or_default();
            println!("  - {}: {}", record.value("number"), reason);
        }
    }
    Ok(())
}

fn cmd_mappings(registry: &MappingRegistry) -> Result<()> {
    for spec in registry.specs() {
        println!("{} ({}) → table '{}'", spec.name, spec.display_name, spec.table_name);
        for field in &spec.fields {
            let mut flags = Vec::new();
            if field.required {
                flags.push("required");
            }
            if field.nonzero {
                flags.push("nonzero");
            }
            let flags = if flags.is_empty() {
                String::new()
            } else {
                format!(" [{}]", flags.join(", "))
            };
            println!("    {} → {}: {:?}{}", field.source, field.target, field.kind, flags);
        }
    }
    Ok(())
}

fn cmd_actions() -> Result<()> {
    for action in FlowAction::builtin() {
        println!("{:<20} {:<20} {}", action.action, action.flow_id, action.name);
    }
    Ok(())
}

async fn cmd_health(config: Option<&Path>) -> Result<()> {
    let client = erp_client(config)?;
    let report = client.health_check().await;
    println!("{}: {}", report.status, report.message);
    if report.status == HealthStatus::Unhealthy {
        anyhow::bail!("ERP endpoint {} is unhealthy", client.config().base_url);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbose_logging_targets_own_crates() {
        assert_eq!(log_config(false, false).directives(), "info");
        let verbose = log_config(true, true);
        assert!(verbose.json);
        assert_eq!(
            verbose.directives(),
            "info,flowrelay=debug,flowrelay_core=debug,flowrelay_http=debug,flowrelay_server=debug"
        );
    }
}
