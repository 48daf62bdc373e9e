//! Subcommand implementations.

use std::io::Write;

use anyhow::{Context, Result};
use serde_json::json;

use crate::args::{ClearArgs, FetchArgs, GenMapsArgs, KeysArgs};
use crate::maps;
use revcache_client::Worker;
use revcache_client::fetch::resolve;
use revcache_core::{AppConfig, CacheDb, Destination, Request};

/// Build the worker and run its lifecycle up to activated.
async fn active_worker(config: &AppConfig) -> Result<Worker> {
    let worker = Worker::from_config(config).await?;
    worker.install();
    worker.activate().await;
    Ok(worker)
}

pub async fn fetch(args: FetchArgs) -> Result<()> {
    let config = AppConfig::load()?;
    let origin = config.origin_url()?;
    let url = resolve(&origin, &args.url).with_context(|| format!("invalid url: {}", args.url))?;

    let mut request = Request::get(url);
    if let Some(destination) = args.destination.as_deref() {
        request = request.with_destination(destination.parse::<Destination>()?);
    }

    let worker = active_worker(&config).await?;
    let served = worker.fetch(request).await?;
    let response = served.response;

    if args.body {
        std::io::stdout().write_all(&response.body)?;
        return Ok(());
    }

    let summary = json!({
        "url": response.url.as_str(),
        "route": served.strategy.map_or_else(|| "network".to_string(), |kind| kind.to_string()),
        "status": response.status,
        "content_type": response.content_type(),
        "body_bytes": response.body.len(),
    });
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

pub async fn activate() -> Result<()> {
    let config = AppConfig::load()?;
    let worker = Worker::from_config(&config).await?;
    worker.install();

    let summary = match worker.activate().await {
        Some(stats) => json!({ "state": worker.state(), "reconciled": true, "stats": stats }),
        None => json!({ "state": worker.state(), "reconciled": false }),
    };
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

pub async fn keys(args: KeysArgs) -> Result<()> {
    let config = AppConfig::load()?;
    let db = CacheDb::open(&config.db_path).await?;

    let names = match args.cache_name {
        Some(name) => vec![name],
        None => db.cache_names().await?,
    };
    for name in names {
        for key in db.open_partition(name.as_str()).keys().await? {
            println!("{name}\t{key}");
        }
    }
    Ok(())
}

pub async fn clear(args: ClearArgs) -> Result<()> {
    let config = AppConfig::load()?;
    let db = CacheDb::open(&config.db_path).await?;
    let partition = db.open_partition(args.cache_name.as_str());

    let deleted = match args.key {
        Some(key) => u64::from(partition.delete(&key).await?),
        None => partition.clear().await?,
    };
    tracing::info!(cache = partition.name(), deleted, "cleared cache entries");
    println!("{deleted}");
    Ok(())
}

pub fn gen_maps(args: &GenMapsArgs) -> Result<()> {
    let out = args.out.clone().unwrap_or_else(|| maps::default_out(&args.data_dir));
    let generated = maps::generate(&args.data_dir)?;
    maps::write(&out, &generated)?;
    tracing::info!(sources = generated.len(), out = %out.display(), "updated maps");
    Ok(())
}
