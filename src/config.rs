use anyhow::{anyhow, Context, Result};
use std::env;

use crate::payments::providers::MpesaConfig;

pub const DEFAULT_PORT: u16 = 3000;

#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub mpesa: MpesaConfig,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(get: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let server = ServerConfig {
            host: get("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port: match get("PORT") {
                Some(port) => port
                    .trim()
                    .parse::<u16>()
                    .context("PORT must be a valid number")?,
                None => DEFAULT_PORT,
            },
        };

        let mpesa = MpesaConfig::from_lookup(&get).context("Invalid M-Pesa configuration")?;

        let config = Config { server, mpesa };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            return Err(anyhow!("PORT must be greater than 0"));
        }

        if self.server.host.trim().is_empty() {
            return Err(anyhow!("HOST cannot be empty"));
        }

        self.mpesa.validate()?;

        Ok(())
    }
}
