use std::env;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub ai_service_url: String,
    pub bind_addr: String,
}

impl Config {
    /// Read configuration from the environment. `DATABASE_URL` and
    /// `AI_SERVICE_URL` are required; `BIND_ADDR` defaults to all
    /// interfaces on port 3000.
    pub fn from_env() -> Result<Self, env::VarError> {
        Ok(Self {
            database_url: env::var("DATABASE_URL")?,
            ai_service_url: env::var("AI_SERVICE_URL")?,
            bind_addr: env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string()),
        })
    }
}
