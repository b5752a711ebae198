//! Runtime configuration loaded from environment variables.

use anyhow::{anyhow, Context, Result};
use std::{env, fmt::Display, net::SocketAddr, str::FromStr};
use tracing::{info, warn};

const DEV_JWT_SECRET: &str = "dev-only-secret-change-me";

/// Credentials for the DOCTOR account created on first start
#[derive(Debug, Clone)]
pub struct BootstrapAdmin {
    pub username: String,
    pub password: String,
    pub email: String,
}

#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub token_ttl_hours: i64,
    pub bcrypt_cost: u32,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub cors_origin: String,
    pub auth: AuthConfig,
    pub bootstrap_admin: Option<BootstrapAdmin>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let jwt_secret = match env::var("JWT_SECRET") {
            Ok(secret) if !secret.trim().is_empty() => secret,
            _ if cfg!(debug_assertions) => {
                warn!("JWT_SECRET not set, using the development secret");
                DEV_JWT_SECRET.to_string()
            }
            _ => return Err(anyhow!("JWT_SECRET must be set in release builds")),
        };

        let bcrypt_cost: u32 = try_load("BCRYPT_COST", "12")?;
        if !(4..=31).contains(&bcrypt_cost) {
            return Err(anyhow!("BCRYPT_COST must be between 4 and 31, got {}", bcrypt_cost));
        }

        let token_ttl_hours: i64 = try_load("JWT_TTL_HOURS", "24")?;
        if token_ttl_hours <= 0 {
            return Err(anyhow!("JWT_TTL_HOURS must be positive"));
        }

        Ok(Self {
            host: try_load("SERVER_HOST", "127.0.0.1")?,
            port: try_load("SERVER_PORT", "3000")?,
            database_url: try_load("DATABASE_URL", "sqlite:vaccination_tracker.db")?,
            cors_origin: try_load("CORS_ORIGIN", "http://localhost:8080")?,
            auth: AuthConfig {
                jwt_secret,
                token_ttl_hours,
                bcrypt_cost,
            },
            bootstrap_admin: load_bootstrap_admin(),
        })
    }

    pub fn socket_addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .with_context(|| format!("Invalid listen address {}:{}", self.host, self.port))
    }
}

fn try_load<T: FromStr>(key: &str, default: &str) -> Result<T>
where
    T::Err: Display,
{
    let raw = env::var(key).unwrap_or_else(|_| {
        info!("{key} not set, using default: {default}");
        default.to_string()
    });

    raw.parse()
        .map_err(|e| anyhow!("Invalid {key} value '{raw}': {e}"))
}

fn load_bootstrap_admin() -> Option<BootstrapAdmin> {
    let username = env::var("BOOTSTRAP_ADMIN_USERNAME").ok()?;
    let password = env::var("BOOTSTRAP_ADMIN_PASSWORD").ok()?;
    let email = env::var("BOOTSTRAP_ADMIN_EMAIL")
        .unwrap_or_else(|_| format!("{}@clinic.local", username));

    Some(BootstrapAdmin {
        username,
        password,
        email,
    })
}

#[cfg(test)]
impl AuthConfig {
    /// Cheap bcrypt cost so tests stay fast
    pub fn for_tests() -> Self {
        Self {
            jwt_secret: "test-secret".to_string(),
            token_ttl_hours: 1,
            bcrypt_cost: 4,
        }
    }
}
