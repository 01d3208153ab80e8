use std::net::SocketAddr;

use serde::Deserialize;

use crate::error::Error;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub ttl_hours: i64,
}

/// Process configuration, read from the environment exactly once at startup.
/// Request-handling code never consults the environment directly.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub listen_addr: SocketAddr,
    pub jwt: JwtConfig,
    pub census_interval_secs: u64,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, Error> {
        let database_url = std::env::var("DATABASE_URL")
            .map_err(|_| Error::Configuration("DATABASE_URL must be set"))?;

        // An empty signing secret would make every issued token forgeable,
        // so it is rejected here rather than on the first request.
        let secret = std::env::var("JWT_SECRET").unwrap_or_default();
        if secret.is_empty() {
            return Err(Error::Configuration("JWT_SECRET must be set and non-empty"));
        }

        let listen_addr = format!(
            "{}:{}",
            std::env::var("APP_HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            std::env::var("APP_PORT").unwrap_or_else(|_| "7002".into())
        )
        .parse()
        .map_err(|_| Error::Configuration("APP_HOST/APP_PORT do not form a valid address"))?;

        let jwt = JwtConfig {
            secret,
            ttl_hours: std::env::var("JWT_TTL_HOURS")
                .ok()
                .and_then(|v| v.parse::<i64>().ok())
                .unwrap_or(72),
        };

        let census_interval_secs = std::env::var("CENSUS_INTERVAL_SECS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(10);

        Ok(Self {
            database_url,
            listen_addr,
            jwt,
            census_interval_secs,
        })
    }
}
