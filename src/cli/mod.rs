//! CLI module for the cache-aside shop lookup
//!
//! Runs against a seeded in-memory shop store and the configured cache:
//! - `query`: look a shop up with one of the read strategies
//! - `warm`: pre-populate a logical-expiry entry
//! - `update`: rename a shop and invalidate its entry

use std::sync::Arc;
use std::time::{Duration, Instant};

use clap::{Args, Parser, Subcommand};
use tracing::info;

use crate::config::AppConfig;
use crate::domain::{ReadStrategy, ShopId, ShopRepository};
use crate::infrastructure::cache::{CacheFactory, RebuildScheduler};
use crate::infrastructure::logging::init_logging;
use crate::infrastructure::services::{CacheAsideClient, ShopService};
use crate::infrastructure::shop::{InMemoryShopRepository, sample_shops};

/// Cache-aside reads of shop records
#[derive(Parser)]
#[command(name = "cache-aside")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Simulated latency of every shop store read, in milliseconds
    #[arg(long, global = true, default_value_t = 0)]
    pub latency_ms: u64,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Look up a shop through the cache
    Query(QueryArgs),

    /// Store a shop as a logical-expiry entry
    Warm(WarmArgs),

    /// Rename a shop and invalidate its cache entry
    Update(UpdateArgs),
}

#[derive(Args)]
pub struct QueryArgs {
    pub id: ShopId,

    /// pass_through, mutex or logical_expire
    #[arg(short, long, default_value_t = ReadStrategy::PassThrough)]
    pub strategy: ReadStrategy,

    /// Number of simultaneous lookups
    #[arg(short, long, default_value_t = 1)]
    pub concurrency: usize,
}

#[derive(Args)]
pub struct WarmArgs {
    pub id: ShopId,

    /// Logical TTL; defaults to `shop.logical_ttl_secs`
    #[arg(long)]
    pub logical_ttl_secs: Option<u64>,
}

#[derive(Args)]
pub struct UpdateArgs {
    pub id: ShopId,

    #[arg(long)]
    pub name: String,
}

/// Wires configuration, cache, scheduler and store, then runs the command
pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = AppConfig::load().unwrap_or_default();
    config.validate()?;
    init_logging(&config.logging)?;

    let cache = CacheFactory::new().create(&config.cache).await?;
    let scheduler = Arc::new(RebuildScheduler::new(
        config.cache_aside.scheduler_config(),
    ));
    let client = CacheAsideClient::with_config(
        cache,
        scheduler.clone(),
        config.cache_aside.client_config(),
    );

    let repository = Arc::new(
        InMemoryShopRepository::with_shops(sample_shops())
            .with_latency(Duration::from_millis(cli.latency_ms)),
    );
    let service = ShopService::with_config(
        repository.clone(),
        client,
        config.shop.service_config(),
    );

    let result = match cli.command {
        Command::Query(args) => query(&service, &repository, args).await,
        Command::Warm(args) => warm(&service, &config, args).await,
        Command::Update(args) => update(&service, repository.as_ref(), args).await,
    };

    scheduler.wait_idle().await;
    scheduler.shutdown().await;

    result
}

async fn query(
    service: &ShopService,
    repository: &InMemoryShopRepository,
    args: QueryArgs,
) -> anyhow::Result<()> {
    let started = Instant::now();

    let handles: Vec<_> = (0..args.concurrency.max(1))
        .map(|_| {
            let service = service.clone();
            tokio::spawn(async move { service.query_by_id(args.id, args.strategy).await })
        })
        .collect();

    let mut found = None;
    for handle in handles {
        found = handle.await??;
    }

    info!(
        shop_id = %args.id,
        strategy = %args.strategy,
        concurrency = args.concurrency,
        store_reads = repository.reads(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "Query finished"
    );

    match found {
        Some(shop) => println!("{}", serde_json::to_string_pretty(&shop)?),
        None => println!("shop {} not found", args.id),
    }

    Ok(())
}

async fn warm(service: &ShopService, config: &AppConfig, args: WarmArgs) -> anyhow::Result<()> {
    let logical_ttl = Duration::from_secs(
        args.logical_ttl_secs
            .unwrap_or(config.shop.logical_ttl_secs),
    );

    let shop = service.warm(args.id, logical_ttl).await?;
    println!("{}", serde_json::to_string_pretty(&shop)?);

    Ok(())
}

async fn update(
    service: &ShopService,
    repository: &dyn ShopRepository,
    args: UpdateArgs,
) -> anyhow::Result<()> {
    let mut shop = repository
        .get(&args.id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("shop {} not found", args.id))?;

    shop.name = args.name;
    let updated = service.update(shop).await?;
    println!("{}", serde_json::to_string_pretty(&updated)?);

    Ok(())
}
