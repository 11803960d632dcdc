use anyhow::{Context, Result};
use dotenvy::dotenv;
use std::{env, fmt::Display, path::PathBuf, str::FromStr};

#[derive(Clone, Debug)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub server_addr: String,
    pub access_token_ttl: usize,

    // Rate limiting
    pub rate_login_per_min: u32,
    pub rate_protected_per_min: u32,

    pub api_prefix: String,

    // Spreadsheet uploads are spooled here and removed after each import
    pub upload_dir: PathBuf,
    pub max_upload_bytes: usize,

    pub seed_demo_data: bool,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();

        Ok(Self {
            server_addr: env::var("SERVER_ADDR").unwrap_or_else(|_| "127.0.0.1:5000".to_string()),
            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite://payroll.db?mode=rwc".to_string()),
            jwt_secret: env::var("JWT_SECRET").context("JWT_SECRET must be set")?,
            access_token_ttl: parse_var("ACCESS_TOKEN_TTL", 28_800)?, // default 8 hours

            rate_login_per_min: parse_var("RATE_LOGIN_PER_MIN", 60)?,
            rate_protected_per_min: parse_var("RATE_PROTECTED_PER_MIN", 1000)?,

            api_prefix: env::var("API_PREFIX").unwrap_or_else(|_| "/api".to_string()),

            upload_dir: env::var("UPLOAD_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("uploads")),
            max_upload_bytes: parse_var("MAX_UPLOAD_BYTES", 10 * 1024 * 1024)?,

            seed_demo_data: parse_var("SEED_DEMO_DATA", true)?,
        })
    }
}

fn parse_var<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|e| anyhow::anyhow!("{} has an invalid value {:?}: {}", key, raw, e)),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
impl Config {
    pub fn for_tests() -> Self {
        Self {
            database_url: "sqlite::memory:".to_string(),
            jwt_secret: "test-secret".to_string(),
            server_addr: "127.0.0.1:0".to_string(),
            access_token_ttl: 3600,
            rate_login_per_min: 600,
            rate_protected_per_min: 6000,
            api_prefix: "/api".to_string(),
            upload_dir: env::temp_dir().join("payroll-test-uploads"),
            max_upload_bytes: 1024 * 1024,
            seed_demo_data: false,
        }
    }
}
