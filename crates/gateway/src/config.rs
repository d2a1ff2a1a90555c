//! Configuration loaded from environment variables.

use std::env;

use anyhow::{Context, Result, bail};

/// Gateway configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP server port (default: 8080).
    pub port: u16,

    /// PostgreSQL connection URL.
    pub database_url: String,

    /// Maximum database connections in pool (default: 10).
    pub database_max_connections: u32,

    /// CORS allowed origins (comma-separated, default: "*").
    pub cors_allowed_origins: Vec<String>,

    /// Per-request timeout in seconds (default: 30).
    pub request_timeout_secs: u64,

    /// PostgreSQL NOTIFY channel forwarded to the realtime relay.
    pub relay_channel: Option<String>,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// `DATABASE_URL` wins; otherwise the URL is composed from
    /// `POSTGRES_USER`, `POSTGRES_PASSWORD`, `POSTGRES_DB` and
    /// `POSTGRES_HOST` (default `db:5432`).
    pub fn from_env() -> Result<Self> {
        let port = env::var("PORT")
            .unwrap_or_else(|_| "8080".to_string())
            .parse()
            .context("PORT must be a valid u16")?;

        let database_url = match env::var("DATABASE_URL") {
            Ok(url) => url,
            Err(_) => {
                let (Ok(user), Ok(db)) = (env::var("POSTGRES_USER"), env::var("POSTGRES_DB"))
                else {
                    bail!("DATABASE_URL or POSTGRES_USER/POSTGRES_DB must be set");
                };
                let password = env::var("POSTGRES_PASSWORD").unwrap_or_default();
                let host = env::var("POSTGRES_HOST").unwrap_or_else(|_| "db:5432".to_string());
                compose_database_url(&user, &password, &host, &db)
            }
        };

        let database_max_connections = env::var("DATABASE_MAX_CONNECTIONS")
            .unwrap_or_else(|_| "10".to_string())
            .parse()
            .context("DATABASE_MAX_CONNECTIONS must be a valid u32")?;

        let cors_allowed_origins = env::var("CORS_ALLOWED_ORIGINS")
            .map(|v| v.split(',').map(|s| s.trim().to_string()).collect())
            .unwrap_or_else(|_| vec!["*".to_string()]);

        let request_timeout_secs = env::var("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".to_string())
            .parse()
            .context("REQUEST_TIMEOUT_SECS must be a valid u64")?;

        let relay_channel = env::var("RELAY_CHANNEL")
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());

        Ok(Self {
            port,
            database_url,
            database_max_connections,
            cors_allowed_origins,
            request_timeout_secs,
            relay_channel,
        })
    }
}

/// Build a PostgreSQL URL from its parts. Credentials are percent-encoded.
fn compose_database_url(user: &str, password: &str, host: &str, db: &str) -> String {
    format!(
        "postgres://{}:{}@{}/{}?sslmode=disable",
        urlencoding::encode(user),
        urlencoding::encode(password),
        host,
        db
    )
}
