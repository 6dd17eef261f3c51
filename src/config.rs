use serde::Deserialize;
use std::time::Duration;

pub const DEFAULT_KLAVIYO_BASE_URL: &str = "https://a.klaviyo.com/api";
pub const DEFAULT_KLAVIYO_REVISION: &str = "2023-10-15";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub port: u16,
    pub klaviyo_api_key: String,
    pub klaviyo_base_url: String,
    pub klaviyo_revision: String,
    pub klaviyo_timeout_secs: u64,
    pub klaviyo_max_attempts: u32,
    pub klaviyo_retry_delay_ms: u64,
    pub idempotency_ttl_days: u64,
    pub redis_url: Option<String>,
    pub webhook_secret: Option<String>,
    pub rate_limit_per_second: u64,
    pub rate_limit_burst: u32,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let config = Self {
            port: parse_var("PORT", 3000)?,
            klaviyo_api_key: std::env::var("KLAVIYO_PRIVATE_API_KEY")
                .map_err(|_| anyhow::anyhow!("KLAVIYO_PRIVATE_API_KEY environment variable required"))
                .and_then(|key| {
                    if key.trim().is_empty() {
                        anyhow::bail!("KLAVIYO_PRIVATE_API_KEY cannot be empty");
                    }
                    Ok(key)
                })?,
            klaviyo_base_url: std::env::var("KLAVIYO_BASE_URL")
                .ok()
                .filter(|s| !s.trim().is_empty())
                .map(|url| validate_http_url("KLAVIYO_BASE_URL", url))
                .transpose()?
                .unwrap_or_else(|| DEFAULT_KLAVIYO_BASE_URL.to_string()),
            klaviyo_revision: std::env::var("KLAVIYO_REVISION")
                .ok()
                .filter(|s| !s.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_KLAVIYO_REVISION.to_string()),
            klaviyo_timeout_secs: parse_var("KLAVIYO_TIMEOUT_SECS", 30)
                .and_then(|n: u64| require_nonzero("KLAVIYO_TIMEOUT_SECS", n))?,
            klaviyo_max_attempts: parse_var("KLAVIYO_MAX_ATTEMPTS", 3)
                .and_then(|n: u32| require_nonzero("KLAVIYO_MAX_ATTEMPTS", n))?,
            klaviyo_retry_delay_ms: parse_var("KLAVIYO_RETRY_DELAY_MS", 100)?,
            idempotency_ttl_days: parse_var("IDEMPOTENCY_TTL_DAYS", 30)
                .and_then(|d: u64| require_nonzero("IDEMPOTENCY_TTL_DAYS", d))?,
            redis_url: std::env::var("REDIS_URL")
                .ok()
                .filter(|s| !s.trim().is_empty()),
            webhook_secret: std::env::var("WOOCOMMERCE_WEBHOOK_SECRET")
                .ok()
                .filter(|s| !s.trim().is_empty()),
            rate_limit_per_second: parse_var("RATE_LIMIT_PER_SECOND", 10)?,
            rate_limit_burst: parse_var("RATE_LIMIT_BURST", 20)?,
        };

        // Never log the API key or webhook secret
        tracing::info!("Configuration loaded successfully");
        tracing::debug!("Klaviyo Base URL: {}", config.klaviyo_base_url);
        tracing::debug!("Klaviyo Revision: {}", config.klaviyo_revision);
        tracing::debug!(
            "Idempotency TTL: {} days (backend: {})",
            config.idempotency_ttl_days,
            if config.redis_url.is_some() { "redis" } else { "memory" }
        );
        if config.webhook_secret.is_none() {
            tracing::warn!(
                "WOOCOMMERCE_WEBHOOK_SECRET not set, webhook signatures will not be verified"
            );
        }
        tracing::debug!("Server Port: {}", config.port);

        Ok(config)
    }

    pub fn klaviyo_timeout(&self) -> Duration {
        Duration::from_secs(self.klaviyo_timeout_secs)
    }

    pub fn klaviyo_retry_delay(&self) -> Duration {
        Duration::from_millis(self.klaviyo_retry_delay_ms)
    }

    pub fn idempotency_ttl(&self) -> Duration {
        Duration::from_secs(self.idempotency_ttl_days * 24 * 60 * 60)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 3000,
            klaviyo_api_key: String::new(),
            klaviyo_base_url: DEFAULT_KLAVIYO_BASE_URL.to_string(),
            klaviyo_revision: DEFAULT_KLAVIYO_REVISION.to_string(),
            klaviyo_timeout_secs: 30,
            klaviyo_max_attempts: 3,
            klaviyo_retry_delay_ms: 100,
            idempotency_ttl_days: 30,
            redis_url: None,
            webhook_secret: None,
            rate_limit_per_second: 10,
            rate_limit_burst: 20,
        }
    }
}

fn parse_var<T: std::str::FromStr>(name: &str, default: T) -> anyhow::Result<T> {
    match std::env::var(name) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .map_err(|_| anyhow::anyhow!("{} must be a valid number, got '{}'", name, raw)),
        _ => Ok(default),
    }
}

fn require_nonzero<T: PartialEq + From<u8>>(name: &str, value: T) -> anyhow::Result<T> {
    if value == T::from(0) {
        anyhow::bail!("{} must be at least 1", name);
    }
    Ok(value)
}

fn validate_http_url(name: &str, raw: String) -> anyhow::Result<String> {
    let parsed = url::Url::parse(raw.trim())
        .map_err(|e| anyhow::anyhow!("{} is not a valid URL: {}", name, e))?;
    if parsed.scheme() != "http" && parsed.scheme() != "https" {
        anyhow::bail!("{} must start with http:// or https://", name);
    }
    Ok(raw.trim().trim_end_matches('/').to_string())
}
