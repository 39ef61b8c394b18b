//! Application configuration loaded from environment variables.

use std::env;
use std::path::PathBuf;

use blogicum_core::OwnershipPolicy;
use blogicum_infra::database::DatabaseConfig;

/// Knobs that change how the blog behaves rather than where it runs.
#[derive(Debug, Clone, Copy)]
pub struct BlogSettings {
    pub posts_per_page: u64,
    pub ownership_policy: OwnershipPolicy,
}

impl Default for BlogSettings {
    fn default() -> Self {
        Self {
            posts_per_page: 10,
            ownership_policy: OwnershipPolicy::default(),
        }
    }
}

/// Application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub database: Option<DatabaseConfig>,
    pub auto_migrate: bool,
    pub media_root: PathBuf,
    pub blog: BlogSettings,
}

impl AppConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let database = env::var("DATABASE_URL").ok().map(|url| DatabaseConfig {
            max_connections: parse_var("DB_MAX_CONNECTIONS").unwrap_or(100),
            min_connections: parse_var("DB_MIN_CONNECTIONS").unwrap_or(10),
            ..DatabaseConfig::new(url)
        });

        let defaults = BlogSettings::default();
        let ownership_policy = match env::var("OWNERSHIP_POLICY") {
            Ok(raw) => raw.parse().unwrap_or_else(|e| {
                tracing::warn!("{e}; falling back to '{:?}'", defaults.ownership_policy);
                defaults.ownership_policy
            }),
            Err(_) => defaults.ownership_policy,
        };

        Self {
            host: env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: parse_var("PORT").unwrap_or(8080),
            database,
            auto_migrate: env::var("AUTO_MIGRATE")
                .map(|v| v == "true" || v == "1")
                .unwrap_or(false),
            media_root: env::var("MEDIA_ROOT")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("media")),
            blog: BlogSettings {
                posts_per_page: parse_var::<u64>("POSTS_PER_PAGE")
                    .filter(|n| *n > 0)
                    .unwrap_or(defaults.posts_per_page),
                ownership_policy,
            },
        }
    }
}

fn parse_var<T: std::str::FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|s| s.parse().ok())
}
