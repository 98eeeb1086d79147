use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;
use zotserver::config::{Cli, Config, default_config_dir, default_config_path};
use zotserver::endpoints;
use zotserver::handler::AppState;
use zotserver::host::{Host, MemoryLibrary, Snapshot, Uploads};

#[tokio::main]
async fn main() {
    let args = Cli::parse();

    // With --config, data paths resolve against the config file's directory;
    // otherwise against ~/.zotserver/
    let (config_path, data_dir) = match args.config_path {
        Some(path) => {
            let path = PathBuf::from(path);
            let dir = path
                .parent()
                .map(|p| p.to_path_buf())
                .unwrap_or_else(|| PathBuf::from("."));
            (path, dir)
        }
        None => (default_config_path(), default_config_dir()),
    };

    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .json()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
    tracing::info!("zotserver.svc starting");

    let cfg = Config::new(&config_path).unwrap_or_else(|e| {
        tracing::error!(error = %e, path = ?config_path, "failed to load config file");
        std::process::exit(1);
    });

    let library = match cfg.app.get_library(&data_dir) {
        Some(path) => MemoryLibrary::load(&path).unwrap_or_else(|e| {
            tracing::error!(error = %format!("{e:#}"), "failed to load library snapshot");
            std::process::exit(1);
        }),
        None => {
            tracing::warn!("no library snapshot configured, serving an empty personal library");
            MemoryLibrary::new(Snapshot::empty())
        }
    };

    let uploads_dir = cfg.app.get_uploads_dir(&data_dir);
    if let Err(e) = std::fs::create_dir_all(&uploads_dir) {
        tracing::error!(error = %e, path = ?uploads_dir, "failed to create uploads directory");
        std::process::exit(1);
    }

    let state = AppState::new(
        Host::from_backend(Arc::new(library)),
        Uploads::new(uploads_dir, cfg.app.max_upload_bytes),
    );
    let app = endpoints::app(state);

    let address = cfg.app.get_address();
    let listener = tokio::net::TcpListener::bind(&address).await.unwrap_or_else(|e| {
        tracing::error!(error = %e, "failed to setup tcp listener");
        std::process::exit(1);
    });

    let cancellation_token = CancellationToken::new();
    let shutdown_token = cancellation_token.clone();
    tokio::spawn(async move {
        if signal::ctrl_c().await.is_ok() {
            tracing::info!("ctrl+c signal received, preparing to shutdown");
        }
        shutdown_token.cancel();
    });

    tracing::info!("zotserver.svc running on {}", &address);
    let result = axum::serve(listener, app)
        .with_graceful_shutdown(cancellation_token.cancelled_owned())
        .await;
    if let Err(err) = result {
        tracing::error!(error = %err, "server error");
        std::process::exit(1);
    }

    tracing::info!("zotserver.svc going off, graceful shutdown complete");
}
