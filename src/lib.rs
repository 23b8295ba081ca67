pub mod api;
pub mod config;
pub mod db;
pub mod models;
pub mod pipeline;

use std::sync::Arc;

use thiserror::Error;
use tracing_subscriber::EnvFilter;

use crate::api::{start_server, ApiContext};
use crate::config::{ConfigError, ServiceConfig, UPLOADS_MOUNT};
use crate::db::{Database, DatabaseError};
use crate::pipeline::extraction::{TesseractCli, TextRecognizer};
use crate::pipeline::ingestion::LocalBlobStorage;
use crate::pipeline::materialize::SqliteMedicationStore;
use crate::pipeline::upload::UploadPipeline;

#[derive(Error, Debug)]
pub enum StartupError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("Cannot create upload directory: {0}")]
    UploadDir(#[source] std::io::Error),

    #[error("Server error: {0}")]
    Server(String),

    #[error("Signal handler error: {0}")]
    Signal(#[source] std::io::Error),
}

/// Wire the service together from its configuration.
pub fn build_context(config: ServiceConfig) -> Result<ApiContext, StartupError> {
    std::fs::create_dir_all(&config.upload_dir).map_err(StartupError::UploadDir)?;
    let db = Database::initialize(&config.database_path)?;

    let engine = TesseractCli::new(config.tesseract_bin.clone(), &config.ocr_lang);
    let recognizer = TextRecognizer::new(Arc::new(engine), config.ocr_timeout, config.ocr_retries);
    let pipeline = UploadPipeline::new(
        Arc::new(LocalBlobStorage::new(&config.upload_dir, UPLOADS_MOUNT)),
        recognizer,
        Arc::new(SqliteMedicationStore::new(db.clone())),
        config.ingestion(),
    );

    Ok(ApiContext::new(db, pipeline, config))
}

/// Run the service until Ctrl-C.
pub async fn run() -> Result<(), StartupError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .init();

    tracing::info!("MedRecon starting v{}", config::APP_VERSION);

    let config = ServiceConfig::from_env()?;
    tracing::info!(
        data_dir = %config.data_dir.display(),
        upload_dir = %config.upload_dir.display(),
        tesseract = %config.tesseract_bin.display(),
        max_upload_bytes = config.max_upload_bytes,
        "Configuration loaded"
    );

    let bind_addr = config.bind_addr;
    let ctx = build_context(config)?;
    let mut server = start_server(ctx, bind_addr)
        .await
        .map_err(StartupError::Server)?;
    tracing::info!(addr = %server.session.server_addr, "Listening");

    tokio::signal::ctrl_c().await.map_err(StartupError::Signal)?;
    server.shutdown();
    server.stopped().await;

    tracing::info!("MedRecon stopped");
    Ok(())
}
