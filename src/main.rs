use anyhow::Result;
use axum::Router;
use scan_history::{
    config,
    routes,
    services::{
        export_service::ExportService, scan_service::ScanService,
        snapshot_repo::SnapshotRepository,
    },
    state::AppState,
};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use std::{fs, io::ErrorKind, path::Path, str::FromStr, sync::Arc};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // --- Logging setup ---
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    // --- Parse config + migrate flag ---
    let (cfg, migrate) = config::AppConfig::from_env_and_args()?;

    tracing::info!("Starting scan-history with config: {:?}", cfg);

    // --- Ensure export directories exist ---
    for dir in [&cfg.export_dir, &cfg.private_export_dir] {
        if !Path::new(dir).exists() {
            match fs::create_dir_all(dir) {
                Ok(_) => tracing::info!("Created export directory at {}", dir),
                // Exports fall back to the private directory at write time.
                Err(e) => tracing::warn!("Could not create export directory {}: {}", dir, e),
            }
        }
    }

    // --- Initialize SQLite connection ---
    let db_url = &cfg.database_url;
    tracing::debug!("Connecting using raw URL => {}", db_url);

    let options = SqliteConnectOptions::from_str(db_url)?.create_if_missing(true);
    let db_path = options.get_filename();
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent)?;
            tracing::info!("Created missing directory {:?}", parent);
        }
    }

    let db: Arc<sqlx::Pool<sqlx::Sqlite>> = Arc::new(
        SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?,
    );

    let repo = SnapshotRepository::new(db.clone());

    // --- Handle migration mode ---
    if migrate {
        repo.ensure_schema().await?;
        tracing::info!("Database migration complete.");
        return Ok(()); // exit after migration
    }

    // --- Initialize core service ---
    let exports = ExportService::new(&cfg.export_dir, &cfg.private_export_dir);
    let scans = ScanService::load(repo, exports).await;
    let state = AppState::new(scans).with_ear_tag_metadata(cfg.allow_ear_tag_metadata);

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
