use anyhow::{Context, Result};

use crate::image_gen::DEFAULT_API_BASE;

pub const DEFAULT_PORTRAIT_MODEL: &str = "black-forest-labs/flux-kontext-pro";
pub const DEFAULT_BACKGROUND_REMOVAL_MODEL: &str = "851-labs/background-remover";
pub const DEFAULT_PORTRAIT_MAX_DIMENSION: u32 = 2048;
pub const DEFAULT_BACKGROUND_REMOVAL_MAX_DIMENSION: u32 = 1200;
pub const DEFAULT_STORAGE_FOLDER: &str = "portrait-studio";
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 15 * 1024 * 1024;

/// Application configuration loaded from environment variables.
/// Startup fails if required variables are missing.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub s3_bucket: String,
    pub s3_endpoint: String,
    /// Base URL objects in `s3_bucket` are publicly served from.
    pub s3_public_base_url: String,
    pub aws_access_key_id: String,
    pub aws_secret_access_key: String,
    pub replicate_api_token: String,
    pub replicate_api_base: String,
    pub portrait_model: String,
    pub background_removal_model: String,
    pub portrait_max_dimension: u32,
    pub background_removal_max_dimension: u32,
    pub storage_folder: String,
    pub max_upload_bytes: usize,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            database_url: require_env("DATABASE_URL")?,
            s3_bucket: require_env("S3_BUCKET")?,
            s3_endpoint: require_env("S3_ENDPOINT")?,
            s3_public_base_url: require_env("S3_PUBLIC_BASE_URL")?,
            aws_access_key_id: require_env("AWS_ACCESS_KEY_ID")?,
            aws_secret_access_key: require_env("AWS_SECRET_ACCESS_KEY")?,
            replicate_api_token: require_env("REPLICATE_API_TOKEN")?,
            replicate_api_base: env_or("REPLICATE_API_BASE", DEFAULT_API_BASE),
            portrait_model: env_or("PORTRAIT_MODEL", DEFAULT_PORTRAIT_MODEL),
            background_removal_model: env_or(
                "BACKGROUND_REMOVAL_MODEL",
                DEFAULT_BACKGROUND_REMOVAL_MODEL,
            ),
            portrait_max_dimension: parse_env(
                "PORTRAIT_MAX_DIMENSION",
                DEFAULT_PORTRAIT_MAX_DIMENSION,
            )?,
            background_removal_max_dimension: parse_env(
                "BACKGROUND_REMOVAL_MAX_DIMENSION",
                DEFAULT_BACKGROUND_REMOVAL_MAX_DIMENSION,
            )?,
            storage_folder: env_or("STORAGE_FOLDER", DEFAULT_STORAGE_FOLDER),
            max_upload_bytes: parse_env("MAX_UPLOAD_BYTES", DEFAULT_MAX_UPLOAD_BYTES)?,
            port: parse_env("PORT", 8080)?,
            rust_log: env_or("RUST_LOG", "info"),
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("{key} must be a valid number, got '{raw}'")),
        _ => Ok(default),
    }
}
