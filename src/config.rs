use serde::Deserialize;
use std::path::PathBuf;

pub const DEFAULT_MODEL_PATH: &str = "models/personality_model.json";
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 5 * 1024 * 1024;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub model_path: PathBuf,
    /// Expected hex SHA-256 of the model artifact, if pinned.
    pub model_sha256: Option<String>,
    pub max_upload_bytes: usize,
    pub rate_limit_per_second: u64,
    pub rate_limit_burst: u32,
    pub request_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            model_path: PathBuf::from(DEFAULT_MODEL_PATH),
            model_sha256: None,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            rate_limit_per_second: 10,
            rate_limit_burst: 20,
            request_timeout_secs: 30,
        }
    }
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let var = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let config = Self {
            host: var("HOST").unwrap_or(defaults.host),
            port: match var("PORT") {
                Some(port) => port
                    .trim()
                    .parse()
                    .ok()
                    .filter(|port: &u16| *port > 0)
                    .ok_or_else(|| {
                        anyhow::anyhow!("PORT must be a valid number between 1-65535")
                    })?,
                None => defaults.port,
            },
            model_path: var("MODEL_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.model_path),
            model_sha256: match var("MODEL_SHA256") {
                Some(digest) => {
                    let digest = digest.trim().to_lowercase();
                    if digest.len() != 64 || !digest.chars().all(|c| c.is_ascii_hexdigit()) {
                        anyhow::bail!("MODEL_SHA256 must be a 64-character hex digest");
                    }
                    Some(digest)
                }
                None => None,
            },
            max_upload_bytes: parse_positive(var("MAX_UPLOAD_BYTES"), "MAX_UPLOAD_BYTES")?
                .unwrap_or(defaults.max_upload_bytes),
            rate_limit_per_second: parse_positive(
                var("RATE_LIMIT_PER_SECOND"),
                "RATE_LIMIT_PER_SECOND",
            )?
            .unwrap_or(defaults.rate_limit_per_second),
            rate_limit_burst: parse_positive(var("RATE_LIMIT_BURST"), "RATE_LIMIT_BURST")?
                .unwrap_or(defaults.rate_limit_burst),
            request_timeout_secs: parse_positive(
                var("REQUEST_TIMEOUT_SECS"),
                "REQUEST_TIMEOUT_SECS",
            )?
            .unwrap_or(defaults.request_timeout_secs),
        };

        // Log successful configuration load (without sensitive values)
        tracing::debug!("Model path: {}", config.model_path.display());
        if config.model_sha256.is_some() {
            tracing::info!("Model checksum pinned");
        }
        tracing::debug!("Max upload size: {} bytes", config.max_upload_bytes);
        tracing::debug!(
            "Rate limit: {}/s, burst {}",
            config.rate_limit_per_second,
            config.rate_limit_burst
        );
        tracing::debug!("Server address: {}:{}", config.host, config.port);

        Ok(config)
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_positive<T>(value: Option<String>, name: &str) -> anyhow::Result<Option<T>>
where
    T: std::str::FromStr + PartialOrd + Default,
{
    match value {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .ok()
            .filter(|parsed| *parsed > T::default())
            .map(Some)
            .ok_or_else(|| anyhow::anyhow!("{} must be a positive integer, got '{}'", name, raw)),
    }
}
