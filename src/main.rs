//! Binary entrypoint for the Immich slideshow adapter.
//!
//! Delegates all logic to the library crate; no local modules here.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::{ArgAction, Parser, Subcommand};
use immich_api::ImmichClient;
use immich_slideshow::config::Configuration;
use immich_slideshow::entities::SlideshowEntities;
use immich_slideshow::events::RefreshTrigger;
use immich_slideshow::slideshow::Coordinator;
use immich_slideshow::source::{AssetScope, AssetSource, ImmichSource};
use immich_slideshow::web;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal};

#[derive(Debug, Parser)]
#[command(
    name = "immich-slideshow",
    version,
    about = "Rotating Immich slideshow exposed as camera and sensor entities"
)]
struct Cli {
    /// Path to YAML config file
    #[arg(
        short,
        long,
        value_name = "FILE",
        default_value = "config.yaml",
        global = true
    )]
    config: PathBuf,

    /// Increase log verbosity (repeatable)
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Poll Immich and serve the slideshow entities (default).
    Run,
    /// Check that the server is reachable and accepts the API key.
    Ping,
    /// List albums with their ids, for picking an `album-id`.
    Albums,
    /// Print the assets the slideshow would cycle through.
    Assets {
        /// Maximum number of assets to print
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
}

#[tokio::main]
async fn main() {
    if let Err(err) = try_main().await {
        error!(error = ?err, "immich-slideshow exited with error");
        std::process::exit(1);
    }
}

fn init_tracing(verbosity: u8) {
    // map -v to our own crates only; dependencies stay at info
    let level = match verbosity {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "info,immich_slideshow={level},immich_api={level}"
        ))
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
}

async fn try_main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let cfg = Configuration::from_yaml_file(&cli.config)
        .with_context(|| format!("failed to load configuration from {}", cli.config.display()))?
        .validated()
        .context("invalid configuration values")?;
    info!(
        config = %cli.config.display(),
        server = %cfg.server_url,
        album = cfg.album_id.as_deref().unwrap_or("(all assets)"),
        "loaded configuration"
    );

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => run(cfg).await,
        Commands::Ping => ping(&cfg).await,
        Commands::Albums => list_albums(&cfg).await,
        Commands::Assets { limit } => list_assets(&cfg, limit).await,
    }
}

fn build_client(cfg: &Configuration) -> Result<ImmichClient> {
    ImmichClient::new(&cfg.server_url, &cfg.api_key, cfg.client_options())
        .context("failed to create immich client")
}

fn build_source(cfg: &Configuration) -> Result<ImmichSource> {
    let client = build_client(cfg)?;
    Ok(ImmichSource::new(
        client,
        AssetScope::from_album_id(cfg.album_id.as_deref()),
    ))
}

async fn run(cfg: Configuration) -> Result<()> {
    let source: Arc<dyn AssetSource> = Arc::new(build_source(&cfg)?);
    let coordinator = Coordinator::new(source, cfg.slideshow_options());

    match coordinator.refresh(RefreshTrigger::Startup).await {
        Ok(report) => info!(count = report.count, "initial asset list loaded"),
        Err(err) => warn!(
            kind = ?err.kind,
            "initial refresh failed; entities stay unavailable until a refresh succeeds"
        ),
    }

    let cancel = CancellationToken::new();
    spawn_shutdown_watcher(cancel.clone());

    let entities = Arc::new(SlideshowEntities::from_config(coordinator.clone(), &cfg));
    let server = web::bind(entities, cfg.http.bind_address, cancel.clone())
        .await
        .with_context(|| format!("failed to bind {}", cfg.http.bind_address))?;

    let mut tasks = JoinSet::new();

    // Entity/service surface
    tasks.spawn(async move {
        server
            .await
            .context("entity server panicked")?
            .context("entity server failed")
    });

    // Periodic refresh
    let refresher = coordinator.start(cfg.refresh_schedule());
    tasks.spawn(async move {
        refresher
            .await
            .context("refresh task panicked")?
            .context("refresh task failed")
    });

    tokio::select! {
        _ = cancel.cancelled() => {}
        Some(res) = tasks.join_next() => {
            log_task_result(res);
            warn!("a task ended early; shutting down");
        }
    }

    // Ensure the remaining tasks are asked to stop
    cancel.cancel();
    coordinator.stop();

    while let Some(res) = tasks.join_next().await {
        log_task_result(res);
    }
    info!("shutdown complete");
    Ok(())
}

fn log_task_result(res: Result<Result<()>, tokio::task::JoinError>) {
    match res {
        Ok(Ok(())) => {}
        Ok(Err(e)) => error!("task error: {e:?}"),
        Err(e) => error!("join error: {e}"),
    }
}

fn spawn_shutdown_watcher(cancel: CancellationToken) {
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if let Err(err) = tokio::signal::ctrl_c().await {
                warn!("ctrl-c handler failed: {err}");
                return;
            }
            info!("ctrl-c received; initiating shutdown");
            cancel.cancel();
        });
    }

    #[cfg(unix)]
    tokio::spawn(async move {
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = cancel.cancelled() => {}
                    _ = sigterm.recv() => {
                        info!("SIGTERM received; initiating shutdown");
                        cancel.cancel();
                    }
                }
            }
            Err(err) => warn!("failed to register SIGTERM handler: {err}"),
        }
    });
}

async fn ping(cfg: &Configuration) -> Result<()> {
    let client = build_client(cfg)?;
    if !client.ping().await.context("ping failed")? {
        bail!("{} answered, but not with pong", client.base_url());
    }
    println!("{}: pong", client.base_url());
    Ok(())
}

async fn list_albums(cfg: &Configuration) -> Result<()> {
    let client = build_client(cfg)?;
    let albums = client
        .list_albums()
        .await
        .context("failed to list albums")?;
    if albums.is_empty() {
        println!("(no albums)");
        return Ok(());
    }
    for album in albums {
        println!("{:<38} {:>6}  {}", album.id, album.asset_count, album.name);
    }
    Ok(())
}

async fn list_assets(cfg: &Configuration, limit: usize) -> Result<()> {
    let source = build_source(cfg)?;
    let assets = source
        .fetch_assets()
        .await
        .context("failed to list assets")?;
    match source.scope() {
        AssetScope::All => println!("# all assets: {}", assets.len()),
        AssetScope::Album(id) => println!("# album {id}: {} assets", assets.len()),
    }
    for (idx, asset) in assets.iter().take(limit).enumerate() {
        println!(
            "  {:>4}: {} {:?} {}",
            idx + 1,
            asset.id,
            asset.kind,
            asset.filename
        );
    }
    if assets.len() > limit {
        println!("  ... and {} more", assets.len() - limit);
    }
    Ok(())
}
