// SPDX-License-Identifier: GPL-3.0-only

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt};

use datavol_contracts::HostAdapters;
use datavol_types::ReconcileConfig;

/// Data volume lifecycle for ephemeral hosts
#[derive(Parser)]
#[command(name = "datavol")]
#[command(about = "Bootstraps and grows the LVM-backed data volume of a remote host", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Mount the existing data volume, or build one on a blank disk
    Bootstrap(Target),
    /// Absorb newly attached blank disks and grow the mounted data volume
    Expand(Target),
}

#[derive(Args)]
struct Target {
    /// Remote login name
    host_identity: String,
    /// Hostname or IP address
    host_address: String,
    /// Private key used to authenticate
    credential_path: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("datavol=info,warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = ReconcileConfig::from_env();

    let message = match cli.command {
        Commands::Bootstrap(target) => {
            let adapters = connect(&target, &config)?;
            datavol_reconcile::bootstrap(&adapters, &config)
                .await
                .with_context(|| format!("bootstrap of {} failed", target.host_address))?
                .to_string()
        }
        Commands::Expand(target) => {
            let adapters = connect(&target, &config)?;
            datavol_reconcile::expand(&adapters, &config)
                .await
                .with_context(|| format!("expansion of {} failed", target.host_address))?
                .to_string()
        }
    };

    println!("{message}");
    Ok(())
}

fn connect(target: &Target, config: &ReconcileConfig) -> Result<HostAdapters> {
    info!(
        "Reconciling {}/{} at {} on {}@{}",
        config.vg_name,
        config.lv_name,
        config.mount_point,
        target.host_identity,
        target.host_address
    );
    datavol_sys::build_ssh_adapters(
        &target.host_identity,
        &target.host_address,
        &target.credential_path,
    )
    .with_context(|| format!("cannot reach {}", target.host_address))
}
