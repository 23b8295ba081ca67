//! Shared state for the API router.

use std::sync::Arc;

use rusqlite::Connection;

use crate::api::error::ApiError;
use crate::config::ServiceConfig;
use crate::db::{Database, DatabaseError};
use crate::pipeline::upload::UploadPipeline;

/// Shared context for all API routes and middleware.
#[derive(Clone)]
pub struct ApiContext {
    pub db: Database,
    pub pipeline: Arc<UploadPipeline>,
    pub config: Arc<ServiceConfig>,
}

impl ApiContext {
    pub fn new(db: Database, pipeline: UploadPipeline, config: ServiceConfig) -> Self {
        Self {
            db,
            pipeline: Arc::new(pipeline),
            config: Arc::new(config),
        }
    }

    /// Run a unit of database work on the blocking pool with a fresh connection.
    pub async fn with_db<T, F>(&self, work: F) -> Result<T, ApiError>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T, DatabaseError> + Send + 'static,
    {
        let db = self.db.clone();
        let result = tokio::task::spawn_blocking(move || {
            let conn = db.open()?;
            work(&conn)
        })
        .await?;
        Ok(result?)
    }
}
