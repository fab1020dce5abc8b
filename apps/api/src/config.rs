use anyhow::{Context, Result};

use crate::ranking::knn::Metric;

/// Application configuration loaded from environment variables.
/// Start-up fails if required variables are missing or malformed.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub redis_url: String,
    pub s3_bucket: String,
    pub s3_endpoint: String,
    pub s3_region: String,
    pub aws_access_key_id: String,
    pub aws_secret_access_key: String,
    pub admin_username: String,
    /// Hex-encoded SHA-256 digest of the admin password.
    pub admin_password_sha256: String,
    pub session_ttl_secs: u64,
    pub max_upload_bytes: usize,
    pub rank_metric: Metric,
    pub summary_sentences: usize,
    /// Weight repeated terms by `1 + ln(tf)` instead of the raw count.
    pub sublinear_tf: bool,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from an arbitrary key lookup (the process env in production).
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let require = |key: &str| {
            lookup(key)
                .with_context(|| format!("Required environment variable '{key}' is not set"))
        };
        let or_default = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        Ok(Config {
            database_url: require("DATABASE_URL")?,
            redis_url: require("REDIS_URL")?,
            s3_bucket: require("S3_BUCKET")?,
            s3_endpoint: require("S3_ENDPOINT")?,
            s3_region: or_default("S3_REGION", "us-east-1"),
            aws_access_key_id: require("AWS_ACCESS_KEY_ID")?,
            aws_secret_access_key: require("AWS_SECRET_ACCESS_KEY")?,
            admin_username: or_default("ADMIN_USERNAME", "admin"),
            admin_password_sha256: require("ADMIN_PASSWORD_SHA256")?.trim().to_lowercase(),
            session_ttl_secs: or_default("SESSION_TTL_SECS", "28800")
                .parse::<u64>()
                .context("SESSION_TTL_SECS must be a whole number of seconds")?,
            max_upload_bytes: or_default("MAX_UPLOAD_BYTES", "10485760")
                .parse::<usize>()
                .context("MAX_UPLOAD_BYTES must be a byte count")?,
            rank_metric: or_default("RANK_METRIC", "euclidean")
                .parse::<Metric>()
                .context("RANK_METRIC must be 'euclidean' or 'cosine'")?,
            summary_sentences: or_default("SUMMARY_SENTENCES", "3")
                .parse::<usize>()
                .context("SUMMARY_SENTENCES must be a whole number")?,
            sublinear_tf: or_default("SUBLINEAR_TF", "false")
                .parse::<bool>()
                .context("SUBLINEAR_TF must be 'true' or 'false'")?,
            port: or_default("PORT", "5000")
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: or_default("RUST_LOG", "info"),
        })
    }
}
