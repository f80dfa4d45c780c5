pub mod catalog;
pub mod collection;
pub mod db;
pub mod endpoint;
pub mod provider;
pub mod resolver;
#[cfg(test)]
pub mod test_utils;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};

use crate::catalog::{Catalog, DEFAULT_EXCLUDED_PARTITIONS, Region, ServiceBlacklist};
use crate::collection::EndpointCollection;
use crate::endpoint::classification::DnsClassifier;
use crate::provider::FileProvider;
use crate::resolver::ResolveContext;
use crate::resolver::manager::{ResolutionConfig, ResolutionManager};

#[derive(Parser)]
#[command(
    name = "endpoint-ipv6-inventory",
    about = "Inventory IPv4/IPv6 reachability of cloud service endpoints",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run a resolution pass and write the snapshot outputs.
    Scan {
        /// Provider data document (partitions, regions, service rules).
        provider_data: PathBuf,
        /// Resolve the full catalog instead of the offline test catalog.
        #[arg(long)]
        live: bool,
        /// Directory for endpoints.json and endpoints.text.
        #[arg(long, default_value = "output")]
        output_dir: PathBuf,
        /// Also upsert the region/endpoint tables into this SQLite database.
        #[arg(long)]
        database: Option<PathBuf>,
        /// Worker pool size for concurrent resolutions.
        #[arg(long, default_value_t = 64)]
        max_concurrent: usize,
        /// Per-lookup DNS timeout in milliseconds.
        #[arg(long, default_value_t = 5000)]
        dns_timeout_ms: u64,
    },
    /// Regenerate the flat-text listing from a stored snapshot.
    Text {
        /// Snapshot file produced by a previous scan.
        snapshot: PathBuf,
        /// Output path; stdout when omitted.
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    match Cli::parse().command {
        Command::Scan {
            provider_data,
            live,
            output_dir,
            database,
            max_concurrent,
            dns_timeout_ms,
        } => {
            scan(
                provider_data,
                live,
                output_dir,
                database,
                max_concurrent,
                dns_timeout_ms,
            )
            .await
        }
        Command::Text { snapshot, output } => text(snapshot, output).await,
    }
}

async fn scan(
    provider_data: PathBuf,
    live: bool,
    output_dir: PathBuf,
    database: Option<PathBuf>,
    max_concurrent: usize,
    dns_timeout_ms: u64,
) -> anyhow::Result<()> {
    let provider = Arc::new(FileProvider::load(&provider_data).context("loading provider data")?);

    let blacklist = ServiceBlacklist::builtin();
    let catalog = if live {
        Catalog::load(provider.as_ref(), &blacklist, DEFAULT_EXCLUDED_PARTITIONS)
            .context("loading catalog")?
    } else {
        Catalog::test_data()
    };

    println!(
        "resolving {} services across {} regions ({} combinations)",
        catalog.service_count(),
        catalog.region_count(),
        catalog.triples().len()
    );

    let context = ResolveContext {
        ruleset: provider.clone(),
        availability: provider.clone(),
        classifier: Arc::new(DnsClassifier::new().with_timeout(dns_timeout_ms)),
    };

    let manager = ResolutionManager::new(ResolutionConfig { max_concurrent });

    let stop = manager.stop_handle();
    ctrlc::set_handler(move || {
        eprintln!("stop requested; letting in-flight resolutions finish");
        *stop.blocking_write() = true;
    })
    .context("installing interrupt handler")?;

    let collection = manager.run(&catalog, context).await;

    let stats = collection.stats();
    println!("{}", serde_json::to_string_pretty(&stats)?);

    std::fs::create_dir_all(&output_dir).context("creating output directory")?;
    collection
        .write_json_file(&output_dir.join("endpoints.json"))
        .context("writing JSON snapshot")?;
    collection
        .write_text_file(&output_dir.join("endpoints.text"))
        .context("writing flat-text listing")?;

    if let Some(path) = database {
        let regions: Vec<Region> = catalog.regions().cloned().collect();
        let collection = collection.clone();
        tokio::task::spawn_blocking(move || -> anyhow::Result<()> {
            let mut conn = db::open(&path).context("opening database")?;
            endpoint::db::persist_run(&mut conn, &regions, &collection)
                .context("persisting run")?;
            Ok(())
        })
        .await??;
    }

    Ok(())
}

async fn text(snapshot: PathBuf, output: Option<PathBuf>) -> anyhow::Result<()> {
    let collection = EndpointCollection::load_json_file(&snapshot)
        .await
        .context("loading snapshot")?;

    match output {
        Some(path) => collection
            .write_text_file(&path)
            .context("writing flat-text listing")?,
        None => print!("{}", collection.flat_text()),
    }

    Ok(())
}
