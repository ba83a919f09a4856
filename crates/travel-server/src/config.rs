use std::{env, fmt::Display, path::PathBuf, str::FromStr};

use anyhow::{Context, Result, bail};
use tracing::info;

/// Placeholder JWT secrets that MUST NOT be used.
const PLACEHOLDER_SECRETS: &[&str] = &[
    "change-me-to-a-random-string",
    "dev-secret-change-me",
    "replace-with-a-long-random-string",
];

pub struct Config {
    pub host: String,
    pub port: u16,
    pub db_path: PathBuf,
    pub upload_dir: PathBuf,
    pub public_url: String,
    pub jwt_secret: String,
    pub token_ttl_hours: i64,
    pub max_upload_mb: usize,
    pub static_dir: Option<PathBuf>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let jwt_secret = env::var("TRAVEL_JWT_SECRET").unwrap_or_default();
        if !is_usable_secret(&jwt_secret) {
            bail!("TRAVEL_JWT_SECRET is unset or still a placeholder");
        }

        let port: u16 = try_load("TRAVEL_PORT", "8000")?;

        Ok(Self {
            host: try_load("TRAVEL_HOST", "0.0.0.0")?,
            port,
            db_path: try_load("TRAVEL_DB_PATH", "travel.db")?,
            upload_dir: try_load("TRAVEL_UPLOAD_DIR", "./uploads")?,
            public_url: try_load("TRAVEL_PUBLIC_URL", &format!("http://localhost:{port}"))?,
            jwt_secret,
            token_ttl_hours: try_load("TRAVEL_TOKEN_TTL_HOURS", "72")?,
            max_upload_mb: try_load("TRAVEL_MAX_UPLOAD_MB", "10")?,
            static_dir: env::var("TRAVEL_STATIC_DIR").ok().map(PathBuf::from),
        })
    }

    pub fn token_ttl(&self) -> chrono::Duration {
        chrono::Duration::hours(self.token_ttl_hours)
    }

    pub fn max_upload_bytes(&self) -> usize {
        self.max_upload_mb * 1024 * 1024
    }
}

/// Rejects empty secrets and the placeholders shipped in examples.
fn is_usable_secret(secret: &str) -> bool {
    let secret = secret.trim();
    !secret.is_empty() && !PLACEHOLDER_SECRETS.contains(&secret)
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
        .map_err(|e| anyhow::anyhow!("{e}"))
        .with_context(|| format!("Invalid {key} value: {raw}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_example_secret_is_rejected() {
        let example = include_str!("../../../.env.example");
        let shipped = example
            .lines()
            .find_map(|l| l.strip_prefix("TRAVEL_JWT_SECRET="))
            .unwrap();
        assert!(!is_usable_secret(shipped));
    }

    #[test]
    fn placeholders_and_blank_secrets_are_rejected() {
        for placeholder in PLACEHOLDER_SECRETS {
            assert!(!is_usable_secret(placeholder));
        }
        assert!(!is_usable_secret(""));
        assert!(!is_usable_secret("   "));
        assert!(is_usable_secret("k3x9-local-only-secret"));
    }
}
