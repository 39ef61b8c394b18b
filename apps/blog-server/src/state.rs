//! Application state - shared across all handlers.

use std::sync::Arc;

use blogicum_core::ports::{
    CategoryRepository, CommentRepository, LocationRepository, MediaStore, PasswordService,
    PostRepository, TokenService, UserRepository,
};
use blogicum_infra::database::InMemoryStore;
use blogicum_infra::{Argon2PasswordService, JwtTokenService};

#[cfg(feature = "postgres")]
use blogicum_infra::database::{
    PostgresCategoryRepository, PostgresCommentRepository, PostgresLocationRepository,
    PostgresPostRepository, PostgresUserRepository,
};

use crate::config::{AppConfig, BlogSettings};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub users: Arc<dyn UserRepository>,
    pub categories: Arc<dyn CategoryRepository>,
    pub locations: Arc<dyn LocationRepository>,
    pub posts: Arc<dyn PostRepository>,
    pub comments: Arc<dyn CommentRepository>,
    pub media: Arc<dyn MediaStore>,
    pub tokens: Arc<dyn TokenService>,
    pub passwords: Arc<dyn PasswordService>,
    pub settings: BlogSettings,
    /// Which repository backend is live; reported by `/health`.
    pub storage: &'static str,
}

/// Reasons the server refuses to start.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("Failed to connect to the database: {0}")]
    Connect(String),
    #[error("Failed to apply migrations: {0}")]
    Migrate(String),
    #[error("DATABASE_URL is set but the server was built without the postgres feature")]
    PostgresUnavailable,
}

impl AppState {
    /// Build the application state with appropriate implementations.
    ///
    /// Without `DATABASE_URL` the in-memory store is used. A configured
    /// database that can't be reached or migrated stops startup instead.
    pub async fn new(config: &AppConfig, media: Arc<dyn MediaStore>) -> Result<Self, StartupError> {
        let tokens: Arc<dyn TokenService> = Arc::new(JwtTokenService::from_env());
        let passwords: Arc<dyn PasswordService> = Arc::new(Argon2PasswordService::new());

        if config.database.is_some() {
            let state = Self::postgres(config, media, tokens, passwords).await?;
            tracing::info!("Application state initialized (postgres)");
            return Ok(state);
        }

        tracing::warn!("DATABASE_URL not set. Running without database (in-memory mode).");
        Ok(Self::in_memory(
            &InMemoryStore::new(),
            media,
            tokens,
            passwords,
            config.blog,
        ))
    }

    #[cfg(feature = "postgres")]
    async fn postgres(
        config: &AppConfig,
        media: Arc<dyn MediaStore>,
        tokens: Arc<dyn TokenService>,
        passwords: Arc<dyn PasswordService>,
    ) -> Result<Self, StartupError> {
        use migration::MigratorTrait;

        let Some(db_config) = &config.database else {
            return Err(StartupError::Connect("no database configured".to_string()));
        };

        let conn = db_config
            .connect()
            .await
            .map_err(|e| StartupError::Connect(e.to_string()))?;

        if config.auto_migrate {
            migration::Migrator::up(&conn, None)
                .await
                .map_err(|e| StartupError::Migrate(e.to_string()))?;
            tracing::info!("Migrations applied");
        }

        Ok(Self {
            users: Arc::new(PostgresUserRepository::new(conn.clone())),
            categories: Arc::new(PostgresCategoryRepository::new(conn.clone())),
            locations: Arc::new(PostgresLocationRepository::new(conn.clone())),
            posts: Arc::new(PostgresPostRepository::new(conn.clone())),
            comments: Arc::new(PostgresCommentRepository::new(conn)),
            media,
            tokens,
            passwords,
            settings: config.blog,
            storage: "postgres",
        })
    }

    #[cfg(not(feature = "postgres"))]
    async fn postgres(
        _config: &AppConfig,
        _media: Arc<dyn MediaStore>,
        _tokens: Arc<dyn TokenService>,
        _passwords: Arc<dyn PasswordService>,
    ) -> Result<Self, StartupError> {
        Err(StartupError::PostgresUnavailable)
    }

    /// State over an in-memory store.
    pub fn in_memory(
        store: &InMemoryStore,
        media: Arc<dyn MediaStore>,
        tokens: Arc<dyn TokenService>,
        passwords: Arc<dyn PasswordService>,
        settings: BlogSettings,
    ) -> Self {
        Self {
            users: Arc::new(store.users()),
            categories: Arc::new(store.categories()),
            locations: Arc::new(store.locations()),
            posts: Arc::new(store.posts()),
            comments: Arc::new(store.comments()),
            media,
            tokens,
            passwords,
            settings,
            storage: "memory",
        }
    }
}
