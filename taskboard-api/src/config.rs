/// Configuration management for the API server
///
/// This module loads configuration from environment variables and provides
/// a type-safe configuration struct.
///
/// # Environment Variables
///
/// - `API_HOST` / `API_PORT`: Bind address (default: 0.0.0.0:8080)
/// - `PUBLIC_URL`: Externally visible base URL, used for share links
/// - `JWT_SECRET`: Session signing secret (required, at least 32 chars)
/// - `GOOGLE_CLIENT_ID` / `GOOGLE_CLIENT_SECRET`: Enables Google sign-in
/// - `STORE_BACKEND`: `postgres` (default) or `memory`
/// - `STORE_PROJECT_ID`: Store namespace (default: taskboard-plus)
/// - `DATABASE_URL`, `DATABASE_MAX_CONNECTIONS`: PostgreSQL backend
/// - `REDIS_URL`: Change feed for the PostgreSQL backend
/// - `LANDING_REFRESH_SECS`: Landing counts cache window (default: 60)
/// - `DELETE_POLICY`: `unchecked` (default) or `owner`
/// - `CORS_ORIGINS`: Comma separated origins, or `*` (default)
/// - `PRODUCTION`: Enables HSTS and Secure cookies
///
/// # Example
///
/// ```no_run
/// use taskboard_api::config::Config;
///
/// # fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// println!("Server will listen on {}", config.bind_address());
/// # Ok(())
/// # }
/// ```

use serde::{Deserialize, Serialize};
use std::env;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use taskboard_shared::auth::authorization::DeletePolicy;

/// Complete application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// API server configuration
    pub api: ApiConfig,

    /// Document store configuration
    pub store: StoreConfig,

    /// JWT configuration
    pub jwt: JwtConfig,

    /// Google sign-in, when both credentials are set
    pub google: Option<GoogleConfig>,

    /// Page flow settings
    pub flows: FlowConfig,
}

/// API server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Host to bind to
    pub host: String,

    /// Port to bind to
    pub port: u16,

    /// Base URL visitors reach the service on
    pub public_url: String,

    /// Allowed CORS origins; `["*"]` allows any
    pub cors_origins: Vec<String>,

    /// Production mode (HSTS, Secure cookies)
    pub production: bool,
}

/// Which store backend to run against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Postgres,
    Memory,
}

impl fmt::Display for StoreBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreBackend::Postgres => f.write_str("postgres"),
            StoreBackend::Memory => f.write_str("memory"),
        }
    }
}

impl FromStr for StoreBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(StoreBackend::Postgres),
            "memory" => Ok(StoreBackend::Memory),
            other => anyhow::bail!("Unknown STORE_BACKEND '{}' (expected 'postgres' or 'memory')", other),
        }
    }
}

/// Document store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Backend selection
    pub backend: StoreBackend,

    /// Namespace all documents live under
    pub project_id: String,

    /// PostgreSQL settings (postgres backend only)
    pub database: Option<DatabaseConfig>,

    /// Redis URL for the change feed (postgres backend only)
    pub redis_url: Option<String>,
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL
    pub url: String,

    /// Maximum number of connections in pool
    pub max_connections: u32,
}

/// JWT configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtConfig {
    /// Secret key for session signing
    ///
    /// IMPORTANT: This must be kept secret and should be at least 32 bytes.
    /// Generate with: `openssl rand -hex 32`
    pub secret: String,
}

/// Google OAuth client credentials
#[derive(Clone, Serialize, Deserialize)]
pub struct GoogleConfig {
    pub client_id: String,
    pub client_secret: String,
}

impl fmt::Debug for GoogleConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GoogleConfig")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .finish()
    }
}

/// Page flow settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlowConfig {
    /// Landing counts cache window in seconds
    pub landing_refresh_secs: u64,

    /// Who may delete tasks and comments
    pub delete_policy: DeletePolicy,
}

impl FlowConfig {
    pub fn landing_refresh(&self) -> Duration {
        Duration::from_secs(self.landing_refresh_secs)
    }
}

impl Config {
    /// Loads configuration from environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Required environment variables are missing
    /// - Environment variables have invalid values
    pub fn from_env() -> anyhow::Result<Self> {
        // Load .env file if present (for development)
        dotenvy::dotenv().ok();

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from any variable source
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var_or = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let api_host = var_or("API_HOST", "0.0.0.0");
        let api_port = var_or("API_PORT", "8080")
            .parse::<u16>()
            .map_err(|e| anyhow::anyhow!("API_PORT is invalid: {}", e))?;
        let public_url = var_or("PUBLIC_URL", "http://localhost:8080")
            .trim_end_matches('/')
            .to_string();
        let cors_origins = var_or("CORS_ORIGINS", "*")
            .split(',')
            .map(str::trim)
            .filter(|origin| !origin.is_empty())
            .map(String::from)
            .collect();
        let production = parse_bool(&var_or("PRODUCTION", "false"))
            .ok_or_else(|| anyhow::anyhow!("PRODUCTION must be true or false"))?;

        let jwt_secret = lookup("JWT_SECRET")
            .ok_or_else(|| anyhow::anyhow!("JWT_SECRET environment variable is required"))?;

        if jwt_secret.len() < 32 {
            anyhow::bail!("JWT_SECRET must be at least 32 characters long");
        }

        let google = match (lookup("GOOGLE_CLIENT_ID"), lookup("GOOGLE_CLIENT_SECRET")) {
            (Some(client_id), Some(client_secret)) => Some(GoogleConfig {
                client_id,
                client_secret,
            }),
            (None, None) => None,
            _ => anyhow::bail!("GOOGLE_CLIENT_ID and GOOGLE_CLIENT_SECRET must be set together"),
        };

        let backend: StoreBackend = var_or("STORE_BACKEND", "postgres").parse()?;
        let (database, redis_url) = match backend {
            StoreBackend::Postgres => {
                let url = lookup("DATABASE_URL").ok_or_else(|| {
                    anyhow::anyhow!("DATABASE_URL environment variable is required for the postgres backend")
                })?;
                let max_connections = var_or("DATABASE_MAX_CONNECTIONS", "10")
                    .parse::<u32>()
                    .map_err(|e| anyhow::anyhow!("DATABASE_MAX_CONNECTIONS is invalid: {}", e))?;
                let redis_url = lookup("REDIS_URL").ok_or_else(|| {
                    anyhow::anyhow!("REDIS_URL environment variable is required for the postgres backend")
                })?;

                (Some(DatabaseConfig { url, max_connections }), Some(redis_url))
            }
            StoreBackend::Memory => (None, None),
        };

        let landing_refresh_secs = var_or("LANDING_REFRESH_SECS", "60")
            .parse::<u64>()
            .map_err(|e| anyhow::anyhow!("LANDING_REFRESH_SECS is invalid: {}", e))?;
        let delete_policy: DeletePolicy = var_or("DELETE_POLICY", "unchecked").parse()?;

        Ok(Self {
            api: ApiConfig {
                host: api_host,
                port: api_port,
                public_url,
                cors_origins,
                production,
            },
            store: StoreConfig {
                backend,
                project_id: var_or("STORE_PROJECT_ID", "taskboard-plus"),
                database,
                redis_url,
            },
            jwt: JwtConfig { secret: jwt_secret },
            google,
            flows: FlowConfig {
                landing_refresh_secs,
                delete_policy,
            },
        })
    }

    /// Returns the server bind address
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.api.host, self.api.port)
    }

    /// Whether any origin may call the API
    pub fn allows_any_origin(&self) -> bool {
        self.api.cors_origins.iter().any(|origin| origin == "*")
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" | "" => Some(false),
        _ => None,
    }
}
