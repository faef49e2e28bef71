use std::env;

use anyhow::{Context, Result};

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub database_url: String,
    pub db_max_connections: u32,
    pub auth_url: String,
    pub auth_api_key: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let port = env::var("PORT")
            .unwrap_or_else(|_| "3030".to_string())
            .parse::<u16>()
            .context("PORT must be a valid u16")?;

        let database_url = env::var("DATABASE_URL").context("DATABASE_URL must be set")?;

        let db_max_connections = env::var("DB_MAX_CONNECTIONS")
            .unwrap_or_else(|_| "5".to_string())
            .parse::<u32>()
            .context("DB_MAX_CONNECTIONS must be a valid u32")?;

        let auth_url = env::var("AUTH_URL").context("AUTH_URL must be set")?;
        let auth_api_key = env::var("AUTH_API_KEY").context("AUTH_API_KEY must be set")?;

        Ok(Self {
            port,
            database_url,
            db_max_connections,
            auth_url,
            auth_api_key,
        })
    }

    pub fn address(&self) -> String {
        format!("0.0.0.0:{}", self.port)
    }
}
