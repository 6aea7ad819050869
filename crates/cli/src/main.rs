//! navscan entry point.
//!
//! This binary is the composition root. Responsibilities:
//!
//! 1. **Parse configuration**: load `navscan.toml` for endpoint and credential
//!    settings, and navigator definitions (current or legacy JSON).
//! 2. **Wire observability**: JSON `tracing` output on stderr, with OTLP span
//!    export when `OTEL_EXPORTER_OTLP_ENDPOINT` is set.
//! 3. **Construct collaborators**: a fixture-backed repository source, a
//!    logging webhook registrar and an optional static credential store, injected
//!    into [`scanner::NavigatorScanner`].
//! 4. **Dispatch**: `inspect`, `migrate` or `scan`. Results go to stdout as JSON.

mod config;
mod observability;

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use navigator::{LegacyNavigatorConfig, NavigatorConfig, NavigatorId, SourceConfiguration};
use scanner::{NavigatorScanner, SnapshotSource, StaticCredentialStore, TracingWebhookRegistrar};
use serde::Serialize;

use crate::config::{load_navigator, CliConfig};

const DEFAULT_CONFIG_PATH: &str = "navscan.toml";

#[derive(Debug, Parser)]
#[command(name = "navscan", version, about = "Compose navigator traits and discover buildable heads")]
struct Cli {
    /// Configuration file. Defaults to ./navscan.toml when present.
    #[arg(long, short, global = true, env = "NAVSCAN_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print a navigator's identity and composed decision context.
    Inspect {
        /// Navigator definition (JSON).
        navigator: PathBuf,
        /// Read the definition as a pre-trait configuration.
        #[arg(long)]
        legacy: bool,
    },
    /// Convert a pre-trait configuration into the current format.
    Migrate {
        /// Legacy navigator definition (JSON).
        navigator: PathBuf,
    },
    /// Run a discovery cycle for each navigator against recorded listings.
    Scan {
        /// Repository listings to scan (JSON fixture).
        #[arg(long)]
        fixture: PathBuf,
        /// Read the definitions as pre-trait configurations.
        #[arg(long)]
        legacy: bool,
        /// Maximum heads reported per repository.
        #[arg(long)]
        head_limit: Option<usize>,
        /// Navigator definitions (JSON).
        #[arg(required = true)]
        navigators: Vec<PathBuf>,
    },
}

/// Output of `inspect`.
#[derive(Serialize)]
struct Inspection {
    id: NavigatorId,
    navigator: NavigatorConfig,
    source_configuration: SourceConfiguration,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let _telemetry = observability::init()?;

    let config = match &cli.config {
        Some(path) => CliConfig::load(path, true)?,
        None => CliConfig::load(Path::new(DEFAULT_CONFIG_PATH), false)?,
    };

    match cli.command {
        Command::Inspect { navigator, legacy } => {
            let navigator = load_navigator(&navigator, legacy, &config.endpoints)?;
            print_json(&Inspection {
                id: navigator.id(),
                navigator: navigator.to_config(),
                source_configuration: navigator.build_source_configuration(),
            })
        }
        Command::Migrate { navigator } => {
            let text = std::fs::read_to_string(&navigator)
                .with_context(|| format!("reading navigator {}", navigator.display()))?;
            let legacy: LegacyNavigatorConfig = serde_json::from_str(&text)
                .with_context(|| format!("parsing legacy navigator {}", navigator.display()))?;
            let migrated = legacy.migrate(&config.endpoints)?;
            tracing::info!(navigator = %migrated.id(), "Migrated legacy navigator");
            print_json(&migrated.to_config())
        }
        Command::Scan {
            fixture,
            legacy,
            head_limit,
            navigators,
        } => {
            let navigators = navigators
                .iter()
                .map(|path| load_navigator(path, legacy, &config.endpoints))
                .collect::<anyhow::Result<Vec<_>>>()?;

            let source = SnapshotSource::load(&fixture).await?;
            let mut scanner =
                NavigatorScanner::new(Arc::new(source), Arc::new(TracingWebhookRegistrar));
            if let Some(known) = config.credentials.known_ids() {
                scanner = scanner.with_credential_store(Arc::new(StaticCredentialStore::new(known)));
            }
            if let Some(limit) = head_limit {
                scanner = scanner.with_head_limit(limit);
            }

            let outcomes = Arc::new(scanner).scan_all(navigators).await;
            let failed = outcomes.iter().filter(|o| o.is_err()).count();
            let printable: Vec<serde_json::Value> = outcomes
                .into_iter()
                .map(|outcome| match outcome {
                    Ok(report) => serde_json::to_value(report),
                    Err(e) => Ok(serde_json::json!({ "error": e.to_string() })),
                })
                .collect::<Result<_, _>>()?;
            print_json(&printable)?;

            if failed > 0 {
                anyhow::bail!("{failed} discovery cycle(s) failed");
            }
            Ok(())
        }
    }
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    let mut out = std::io::stdout().lock();
    serde_json::to_writer_pretty(&mut out, value)?;
    writeln!(out)?;
    Ok(())
}
