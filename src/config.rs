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
    pub export_dir: String,
    pub private_export_dir: String,
    pub allow_ear_tag_metadata: bool,
}

/// Command-line + environment configuration.
#[derive(Parser, Debug, Default)]
#[command(author, version, about = "Barcode scan history store")]
pub struct Args {
    /// Host to bind to (overrides SCAN_STORE_HOST)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind to (overrides SCAN_STORE_PORT)
    #[arg(long)]
    pub port: Option<u16>,

    /// Database URL (overrides SCAN_STORE_DATABASE_URL)
    #[arg(long)]
    pub database_url: Option<String>,

    /// Directory CSV exports are written to (overrides SCAN_STORE_EXPORT_DIR)
    #[arg(long)]
    pub export_dir: Option<String>,

    /// Fallback directory when the export directory is not writable
    /// (overrides SCAN_STORE_PRIVATE_EXPORT_DIR)
    #[arg(long)]
    pub private_export_dir: Option<String>,

    /// Allow metadata edits on ear-tag entries, not just QR codes
    /// (overrides SCAN_STORE_ALLOW_EAR_TAG_METADATA)
    #[arg(long)]
    pub allow_ear_tag_metadata: bool,

    /// Run migrations and exit
    #[arg(long)]
    pub migrate: bool,
}

impl AppConfig {
    /// Parse environment variables + CLI args into AppConfig and migrate flag.
    pub fn from_env_and_args() -> Result<(Self, bool)> {
        let args = Args::parse();
        let migrate = args.migrate;
        Ok((Self::from_args(args)?, migrate))
    }

    /// Merge already-parsed CLI args over environment values.
    pub fn from_args(args: Args) -> Result<Self> {
        // --- Environment fallback ---
        let env_host = env::var("SCAN_STORE_HOST").unwrap_or_else(|_| "0.0.0.0".into());
        let env_port = match env::var("SCAN_STORE_PORT") {
            Ok(value) => value
                .parse::<u16>()
                .with_context(|| format!("parsing SCAN_STORE_PORT value `{}`", value))?,
            Err(env::VarError::NotPresent) => 3000,
            Err(err) => return Err(err).context("reading SCAN_STORE_PORT"),
        };
        let env_db = env::var("SCAN_STORE_DATABASE_URL")
            .unwrap_or_else(|_| "sqlite://./data/scan_store.db".into());
        let env_export =
            env::var("SCAN_STORE_EXPORT_DIR").unwrap_or_else(|_| "./data/exports".into());
        let env_private =
            env::var("SCAN_STORE_PRIVATE_EXPORT_DIR").unwrap_or_else(|_| "./data/private".into());
        let env_allow = match env::var("SCAN_STORE_ALLOW_EAR_TAG_METADATA") {
            Ok(value) => parse_flag(&value).with_context(|| {
                format!("parsing SCAN_STORE_ALLOW_EAR_TAG_METADATA value `{}`", value)
            })?,
            Err(_) => false,
        };

        // --- Merge ---
        Ok(Self {
            host: args.host.unwrap_or(env_host),
            port: args.port.unwrap_or(env_port),
            database_url: args.database_url.unwrap_or(env_db),
            export_dir: args.export_dir.unwrap_or(env_export),
            private_export_dir: args.private_export_dir.unwrap_or(env_private),
            allow_ear_tag_metadata: args.allow_ear_tag_metadata || env_allow,
        })
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_flag(value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        other => anyhow::bail!("expected a boolean, got `{}`", other),
    }
}
