use anyhow::{Context, Result};
use clap::Parser;
use std::env;

/// Centralized application configuration.
/// Combines environment variables and CLI arguments.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub jwt_secret: String,
    pub token_ttl_secs: u64,
    pub download_ttl_secs: u64,
    pub blob_backend: BlobBackend,
    pub storage_dir: String,
    pub s3: S3Config,
}

/// Which blob backend serves file payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlobBackend {
    /// Local filesystem, for development and tests.
    Local,
    /// S3-compatible object storage (AWS or MinIO-style endpoints).
    S3,
}

/// S3-compatible backend settings. Only read when `blob_backend` is `S3`.
#[derive(Debug, Clone)]
pub struct S3Config {
    pub endpoint: Option<String>,
    pub region: String,
    pub bucket: String,
    pub access_key: Option<String>,
    pub secret_key: Option<String>,
}

/// Command-line + environment configuration.
#[derive(Parser, Debug)]
#[command(author, version, about = "Multi-tenant file vault API")]
pub struct Args {
    /// Host to bind to (overrides VAULT_HOST)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind to (overrides VAULT_PORT)
    #[arg(long)]
    pub port: Option<u16>,

    /// Directory for the local blob backend (overrides VAULT_STORAGE_DIR)
    #[arg(long)]
    pub storage_dir: Option<String>,

    /// Database URL (overrides VAULT_DATABASE_URL)
    #[arg(long)]
    pub database_url: Option<String>,

    /// Run migrations and exit
    #[arg(long)]
    pub migrate: bool,
}

impl AppConfig {
    /// Parse environment variables + CLI args into AppConfig and migrate flag.
    pub fn from_env_and_args() -> Result<(Self, bool)> {
        // Parse CLI once
        let args = Args::parse();

        // --- Environment fallback ---
        let env_host = env::var("VAULT_HOST").unwrap_or_else(|_| "0.0.0.0".into());
        let env_port = match env::var("VAULT_PORT") {
            Ok(value) => value
                .parse::<u16>()
                .with_context(|| format!("parsing VAULT_PORT value `{}`", value))?,
            Err(env::VarError::NotPresent) => 3000,
            Err(err) => return Err(err).context("reading VAULT_PORT"),
        };
        let env_storage = env::var("VAULT_STORAGE_DIR").unwrap_or_else(|_| "./data/blobs".into());
        let env_db = env::var("VAULT_DATABASE_URL")
            .unwrap_or_else(|_| "sqlite://./data/meta/file_vault.db".into());

        let jwt_secret = env::var("VAULT_JWT_SECRET").unwrap_or_else(|_| {
            tracing::warn!("VAULT_JWT_SECRET not set, falling back to a development secret");
            "dev-secret".into()
        });
        let token_ttl_secs = parse_secs("VAULT_TOKEN_TTL_SECS", 12 * 3600)?;
        let download_ttl_secs = parse_secs("VAULT_DOWNLOAD_TTL_SECS", 900)?;

        let blob_backend = match env::var("VAULT_BLOB_BACKEND").as_deref() {
            Ok("s3") => BlobBackend::S3,
            Ok("local") | Err(_) => BlobBackend::Local,
            Ok(other) => {
                anyhow::bail!("unknown VAULT_BLOB_BACKEND `{}` (expected local or s3)", other)
            }
        };

        let s3 = S3Config {
            endpoint: env::var("VAULT_S3_ENDPOINT").ok(),
            region: env::var("VAULT_S3_REGION").unwrap_or_else(|_| "us-east-1".into()),
            bucket: env::var("VAULT_S3_BUCKET").unwrap_or_else(|_| "file-vault".into()),
            access_key: env::var("VAULT_S3_ACCESS_KEY").ok(),
            secret_key: env::var("VAULT_S3_SECRET_KEY").ok(),
        };

        // --- Merge ---
        let cfg = Self {
            host: args.host.unwrap_or(env_host),
            port: args.port.unwrap_or(env_port),
            database_url: args.database_url.unwrap_or(env_db),
            jwt_secret,
            token_ttl_secs,
            download_ttl_secs,
            blob_backend,
            storage_dir: args.storage_dir.unwrap_or(env_storage),
            s3,
        };

        Ok((cfg, args.migrate))
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_secs(var: &str, default: u64) -> Result<u64> {
    match env::var(var) {
        Ok(value) => value
            .parse::<u64>()
            .with_context(|| format!("parsing {} value `{}`", var, value)),
        Err(env::VarError::NotPresent) => Ok(default),
        Err(err) => Err(err).with_context(|| format!("reading {}", var)),
    }
}
