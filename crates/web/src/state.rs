//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;

use crate::config::{AuthConfig, DirectoryConfig};
use crate::services::auth::AuthService;
use crate::services::stores::StoreService;
use crate::services::uploads::PhotoUploader;

/// Application state shared across all handlers.
///
/// Cheap to clone; everything lives behind one `Arc`.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: DirectoryConfig,
    pool: PgPool,
    uploader: PhotoUploader,
}

impl AppState {
    /// Create a new application state.
    ///
    /// The photo uploader writes to `config.upload_dir`, which is also the
    /// directory served under `/uploads`.
    #[must_use]
    pub fn new(config: DirectoryConfig, pool: PgPool) -> Self {
        let uploader = PhotoUploader::new(config.upload_dir.clone(), config.photo_max_width);

        Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                uploader,
            }),
        }
    }

    /// Get a reference to the directory configuration.
    #[must_use]
    pub fn config(&self) -> &DirectoryConfig {
        &self.inner.config
    }

    /// Login strategy settings.
    #[must_use]
    pub fn auth_config(&self) -> &AuthConfig {
        &self.inner.config.auth
    }

    /// Get a reference to the database connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    /// Photo upload pipeline.
    #[must_use]
    pub fn uploader(&self) -> &PhotoUploader {
        &self.inner.uploader
    }

    /// Authentication service over this state's pool.
    #[must_use]
    pub fn auth(&self) -> AuthService<'_> {
        AuthService::new(self.pool())
    }

    /// Store service over this state's pool.
    #[must_use]
    pub fn stores(&self) -> StoreService<'_> {
        StoreService::new(self.pool())
    }
}
