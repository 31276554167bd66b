use std::time::Duration;

use anyhow::{bail, Context};

/// Secrets and lifetimes for the two bearer-token kinds.
#[derive(Debug, Clone)]
pub struct TokenConfig {
    pub access_token_secret: String,
    pub access_token_expiry: Duration,
    pub refresh_token_secret: String,
    pub refresh_token_expiry: Duration,
    pub issuer: String,
    pub audience: String,
}

/// S3-compatible asset host.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub endpoint: String,
    pub bucket: String,
    pub access_key: String,
    pub secret_key: String,
    pub region: String,
    pub public_url: String,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub tokens: TokenConfig,
    pub storage: StorageConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| -> anyhow::Result<String> {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .with_context(|| format!("missing required variable {key}"))
        };
        let optional = |key: &str, default: &str| -> String {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| default.to_string())
        };

        let tokens = TokenConfig {
            access_token_secret: required("ACCESS_TOKEN_SECRET")?,
            access_token_expiry: parse_expiry(&required("ACCESS_TOKEN_EXPIRY")?)
                .context("ACCESS_TOKEN_EXPIRY")?,
            refresh_token_secret: required("REFRESH_TOKEN_SECRET")?,
            refresh_token_expiry: parse_expiry(&required("REFRESH_TOKEN_EXPIRY")?)
                .context("REFRESH_TOKEN_EXPIRY")?,
            issuer: optional("JWT_ISSUER", "vidtube"),
            audience: optional("JWT_AUDIENCE", "vidtube-users"),
        };

        let endpoint = required("S3_ENDPOINT")?;
        let bucket = required("S3_BUCKET")?;
        let default_public = format!("{}/{}", endpoint.trim_end_matches('/'), bucket);
        let storage = StorageConfig {
            public_url: optional("ASSET_PUBLIC_URL", &default_public)
                .trim_end_matches('/')
                .to_string(),
            access_key: required("S3_ACCESS_KEY")?,
            secret_key: required("S3_SECRET_KEY")?,
            region: optional("S3_REGION", "us-east-1"),
            endpoint,
            bucket,
        };

        Ok(Self {
            database_url: required("DATABASE_URL")?,
            tokens,
            storage,
        })
    }
}

/// Parses `3600`, `90s`, `15m`, `12h`, `10d` or `2w`.
pub fn parse_expiry(raw: &str) -> anyhow::Result<Duration> {
    let raw = raw.trim();
    let split = raw
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(raw.len());
    let (digits, unit) = raw.split_at(split);
    if digits.is_empty() {
        bail!("expiry {raw:?} has no numeric part");
    }
    let n: u64 = digits
        .parse()
        .with_context(|| format!("expiry {raw:?} is out of range"))?;
    let mult = match unit.trim() {
        "" | "s" => 1,
        "m" => 60,
        "h" => 60 * 60,
        "d" => 60 * 60 * 24,
        "w" => 60 * 60 * 24 * 7,
        other => bail!("unknown expiry unit {other:?}"),
    };
    if n == 0 {
        bail!("expiry must be positive");
    }
    let secs = n
        .checked_mul(mult)
        .with_context(|| format!("expiry {raw:?} is out of range"))?;
    Ok(Duration::from_secs(secs))
}
