use anyhow::{Context, Result};
use axum::Router;
use folder_store::{
    config::AppConfig,
    handlers::AppState,
    routes,
    services::{
        folder_service::{FolderService, FolderSettings},
        object_store::ObjectStore,
        share_registry::ShareRegistry,
        storage_service::{self, PresignSettings, StorageService},
    },
};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use std::{io::ErrorKind, path::Path, str::FromStr, sync::Arc, time::Duration};
use tokio::{fs, net::TcpListener};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // --- Logging setup ---
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    // --- Parse config + migrate flag ---
    let (cfg, migrate) = AppConfig::from_env_and_args()?;
    tracing::info!("Starting folder-store with config: {:?}", cfg.redacted());

    // --- Ensure storage directory exists ---
    if !Path::new(&cfg.storage_dir).exists() {
        fs::create_dir_all(&cfg.storage_dir).await?;
        tracing::info!("Created storage directory at {}", cfg.storage_dir);
    }

    // --- Initialize SQLite connection ---
    let connect_opts = SqliteConnectOptions::from_str(&cfg.database_url)
        .with_context(|| format!("parsing database url `{}`", cfg.database_url))?
        .create_if_missing(true);
    if let Some(parent) = connect_opts.get_filename().parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent).await?;
            tracing::info!("Created missing directory {:?}", parent);
        }
    }
    let db = Arc::new(
        SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(connect_opts)
            .await
            .context("connecting to SQLite")?,
    );

    // --- Handle migration mode ---
    if migrate {
        storage_service::run_migrations(&db).await?;
        tracing::info!("Database migration complete.");
        return Ok(());
    }

    // --- Initialize backing store and folder layer ---
    let storage = StorageService::open(
        db.clone(),
        cfg.storage_dir.clone(),
        &cfg.bucket,
        &cfg.region,
        PresignSettings {
            public_base_url: cfg.public_base_url.clone(),
            secret: cfg.presign_secret.clone(),
        },
    )
    .await
    .context("opening backing store (run with --migrate first?)")?;

    let store: Arc<dyn ObjectStore> = Arc::new(storage.clone());
    let shares = Arc::new(ShareRegistry::new(store.clone()));
    let folders = FolderService::with_registry(
        store,
        FolderSettings::new(&cfg.trash_prefix, cfg.page_size),
        shares.clone(),
    );

    if cfg.share_sweep_secs > 0 {
        spawn_share_sweeper(shares, Duration::from_secs(cfg.share_sweep_secs));
    }

    let state = AppState {
        folders,
        storage,
        default_share_ttl_secs: cfg.default_share_ttl_secs,
    };

    // --- Build router ---
    let app: Router = routes::routes::routes().with_state(state);

    // --- Start server ---
    let addr = cfg.addr();
    let listener = match TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(err)
            if err.kind() == ErrorKind::PermissionDenied
                && matches!(cfg.host.as_str(), "0.0.0.0" | "::") =>
        {
            let fallback_addr = format!("127.0.0.1:{}", cfg.port);
            tracing::warn!(
                "Permission denied binding to {} ({}). Falling back to {}",
                addr,
                err,
                fallback_addr
            );
            TcpListener::bind(&fallback_addr).await?
        }
        Err(err) => return Err(err.into()),
    };

    tracing::info!("Server listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app).await?;

    Ok(())
}

/// Periodically evict expired shares; lookups alone never free them.
fn spawn_share_sweeper(shares: Arc<ShareRegistry>, every: Duration) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        loop {
            ticker.tick().await;
            let removed = shares.sweep_expired();
            if removed > 0 {
                tracing::info!("Evicted {} expired shares", removed);
            }
        }
    });
}
