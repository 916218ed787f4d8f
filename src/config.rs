use anyhow::{Context, Result, bail};
use clap::Parser;
use std::{env, str::FromStr};

/// Centralized application configuration.
/// Combines environment variables and CLI arguments.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub storage_dir: String,
    pub database_url: String,
    pub bucket: String,
    pub region: String,
    pub public_base_url: String,
    pub presign_secret: String,
    pub trash_prefix: String,
    pub page_size: usize,
    pub default_share_ttl_secs: u64,
    /// Interval of the expired-share sweep; 0 disables it.
    pub share_sweep_secs: u64,
}

/// Command-line + environment configuration.
#[derive(Parser, Debug)]
#[command(author, version, about = "Folder semantics over a flat object store")]
pub struct Args {
    /// Host to bind to (overrides FOLDER_STORE_HOST)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind to (overrides FOLDER_STORE_PORT)
    #[arg(long)]
    pub port: Option<u16>,

    /// Directory where object payloads are stored (overrides FOLDER_STORE_STORAGE_DIR)
    #[arg(long)]
    pub storage_dir: Option<String>,

    /// Database URL (overrides FOLDER_STORE_DATABASE_URL)
    #[arg(long)]
    pub database_url: Option<String>,

    /// Bucket to serve (overrides FOLDER_STORE_BUCKET)
    #[arg(long)]
    pub bucket: Option<String>,

    /// Region label of the bucket (overrides FOLDER_STORE_REGION)
    #[arg(long)]
    pub region: Option<String>,

    /// Base URL used in issued share links (overrides FOLDER_STORE_PUBLIC_BASE_URL)
    #[arg(long)]
    pub public_base_url: Option<String>,

    /// Reserved prefix for soft-deleted items (overrides FOLDER_STORE_TRASH_PREFIX)
    #[arg(long)]
    pub trash_prefix: Option<String>,

    /// Run migrations and exit
    #[arg(long)]
    pub migrate: bool,
}

impl AppConfig {
    /// Parse environment variables + CLI args into AppConfig and migrate flag.
    pub fn from_env_and_args() -> Result<(Self, bool)> {
        let args = Args::parse();

        // --- Environment fallback ---
        let env_host = env_or("FOLDER_STORE_HOST", "0.0.0.0");
        let env_port = env_parse("FOLDER_STORE_PORT", 3000u16)?;
        let env_storage = env_or("FOLDER_STORE_STORAGE_DIR", "./data/objects");
        let env_db = env_or(
            "FOLDER_STORE_DATABASE_URL",
            "sqlite://./data/meta/folder_store.db",
        );
        let env_bucket = env_or("FOLDER_STORE_BUCKET", "files");
        let env_region = env_or("FOLDER_STORE_REGION", "local");
        let env_trash = env_or("FOLDER_STORE_TRASH_PREFIX", ".trash/");

        // --- Merge ---
        let host = args.host.unwrap_or(env_host);
        let port = args.port.unwrap_or(env_port);
        let public_base_url = args
            .public_base_url
            .or_else(|| env::var("FOLDER_STORE_PUBLIC_BASE_URL").ok())
            .unwrap_or_else(|| format!("http://localhost:{port}"));

        let presign_secret = match env::var("FOLDER_STORE_PRESIGN_SECRET") {
            Ok(secret) if !secret.is_empty() => secret,
            _ => {
                tracing::warn!(
                    "FOLDER_STORE_PRESIGN_SECRET not set; share links will not survive a restart"
                );
                uuid::Uuid::new_v4().simple().to_string()
            }
        };

        let cfg = Self {
            host,
            port,
            storage_dir: args.storage_dir.unwrap_or(env_storage),
            database_url: args.database_url.unwrap_or(env_db),
            bucket: args.bucket.unwrap_or(env_bucket),
            region: args.region.unwrap_or(env_region),
            public_base_url,
            presign_secret,
            trash_prefix: args.trash_prefix.unwrap_or(env_trash),
            page_size: env_parse("FOLDER_STORE_PAGE_SIZE", 1000usize)?,
            default_share_ttl_secs: env_parse("FOLDER_STORE_SHARE_TTL_SECS", 3600u64)?,
            share_sweep_secs: env_parse("FOLDER_STORE_SHARE_SWEEP_SECS", 300u64)?,
        };

        if cfg.trash_prefix.trim_matches('/').is_empty() {
            bail!("trash prefix must not be empty");
        }

        Ok((cfg, args.migrate))
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Copy safe to log: the presign secret is masked.
    pub fn redacted(&self) -> Self {
        Self {
            presign_secret: "***".into(),
            ..self.clone()
        }
    }
}

fn env_or(name: &str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| default.into())
}

fn env_parse<T>(name: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(name) {
        Ok(value) => value
            .parse::<T>()
            .with_context(|| format!("parsing {} value `{}`", name, value)),
        Err(env::VarError::NotPresent) => Ok(default),
        Err(err) => Err(err).with_context(|| format!("reading {}", name)),
    }
}
