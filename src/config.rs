use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;

/// Longest lifetime a V4 signed URL may carry (7 days).
pub const MAX_SIGNED_URL_TTL_SECS: u64 = 604_800;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub relay: RelayConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
    pub host: String,
    pub cors_allowed_origins: Vec<String>,
    pub public_dir: PathBuf,
    pub rate_limit_per_second: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageProvider {
    Gcs,
    S3,
}

impl FromStr for StorageProvider {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "gcs" | "gcp" => Ok(StorageProvider::Gcs),
            "s3" => Ok(StorageProvider::S3),
            other => bail!("unknown STORAGE_PROVIDER '{}', expected 'gcs' or 's3'", other),
        }
    }
}

impl std::fmt::Display for StorageProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageProvider::Gcs => write!(f, "gcs"),
            StorageProvider::S3 => write!(f, "s3"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    pub provider: StorageProvider,
    pub signed_url_ttl_secs: u64,
    pub gcp_project_id: String,
    pub gcp_client_email: String,
    /// PEM-encoded PKCS#8 key with real newlines.
    pub gcp_private_key: String,
    pub gcp_bucket_name: String,
    pub s3_bucket: String,
    pub s3_region: String,
    pub s3_access_key_id: Option<String>,
    pub s3_secret_access_key: Option<String>,
    pub s3_endpoint: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RelayTargetKind {
    Script,
    Bucket,
}

impl FromStr for RelayTargetKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "script" => Ok(RelayTargetKind::Script),
            "bucket" => Ok(RelayTargetKind::Bucket),
            other => bail!("unknown RELAY_TARGET '{}', expected 'script' or 'bucket'", other),
        }
    }
}

impl std::fmt::Display for RelayTargetKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RelayTargetKind::Script => write!(f, "script"),
            RelayTargetKind::Bucket => write!(f, "bucket"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RelayConfig {
    pub target: RelayTargetKind,
    pub script_url: Option<String>,
    pub timeout_secs: u64,
    pub max_upload_bytes: usize,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoggingConfig {
    pub dir: Option<PathBuf>,
    pub json: bool,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the configuration from any key lookup (the process environment in production).
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let vars = Vars(lookup);

        let storage = StorageConfig {
            provider: vars.or("STORAGE_PROVIDER", "gcs").parse()?,
            signed_url_ttl_secs: vars.parse("SIGNED_URL_TTL_SECS", "900")?,
            gcp_project_id: vars.or("GCP_PROJECT_ID", ""),
            gcp_client_email: vars.or("GCP_CLIENT_EMAIL", ""),
            gcp_private_key: normalize_private_key(&vars.or("GCP_PRIVATE_KEY", "")),
            gcp_bucket_name: vars.or("GCP_BUCKET_NAME", ""),
            s3_bucket: vars.or("S3_BUCKET", ""),
            s3_region: vars.or("S3_REGION", "us-east-1"),
            s3_access_key_id: vars.get("AWS_ACCESS_KEY_ID"),
            s3_secret_access_key: vars.get("AWS_SECRET_ACCESS_KEY"),
            s3_endpoint: vars.non_empty("S3_ENDPOINT"),
        };

        if storage.signed_url_ttl_secs == 0 || storage.signed_url_ttl_secs > MAX_SIGNED_URL_TTL_SECS {
            bail!(
                "SIGNED_URL_TTL_SECS must be between 1 and {}, got {}",
                MAX_SIGNED_URL_TTL_SECS,
                storage.signed_url_ttl_secs
            );
        }

        Ok(Self {
            server: ServerConfig {
                port: vars.parse("PORT", "3000")?,
                host: vars.or("HOST", "0.0.0.0"),
                cors_allowed_origins: split_origins(&vars.or(
                    "ALLOWED_ORIGINS",
                    "http://localhost:3000,http://localhost:5173",
                )),
                public_dir: PathBuf::from(vars.or("PUBLIC_DIR", "public")),
                rate_limit_per_second: vars.parse("RATE_LIMIT_PER_SECOND", "20")?,
            },
            storage,
            relay: RelayConfig {
                target: vars.or("RELAY_TARGET", "script").parse()?,
                script_url: vars.non_empty("SCRIPT_URL"),
                timeout_secs: vars.parse("RELAY_TIMEOUT_SECS", "300")?,
                max_upload_bytes: vars.parse("MAX_UPLOAD_BYTES", "536870912")?,
            },
            logging: LoggingConfig {
                dir: vars.non_empty("LOG_DIR").map(PathBuf::from),
                json: vars.parse("LOG_JSON", "false")?,
            },
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                port: 3000,
                host: "0.0.0.0".to_string(),
                cors_allowed_origins: vec!["http://localhost:3000".to_string()],
                public_dir: PathBuf::from("public"),
                rate_limit_per_second: 20,
            },
            storage: StorageConfig {
                provider: StorageProvider::Gcs,
                signed_url_ttl_secs: 900,
                gcp_project_id: String::new(),
                gcp_client_email: String::new(),
                gcp_private_key: String::new(),
                gcp_bucket_name: String::new(),
                s3_bucket: String::new(),
                s3_region: "us-east-1".to_string(),
                s3_access_key_id: None,
                s3_secret_access_key: None,
                s3_endpoint: None,
            },
            relay: RelayConfig {
                target: RelayTargetKind::Script,
                script_url: None,
                timeout_secs: 300,
                max_upload_bytes: 512 * 1024 * 1024,
            },
            logging: LoggingConfig::default(),
        }
    }
}

struct Vars<F>(F);

impl<F> Vars<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn get(&self, key: &str) -> Option<String> {
        (self.0)(key)
    }

    fn non_empty(&self, key: &str) -> Option<String> {
        self.get(key).filter(|s| !s.is_empty())
    }

    fn or(&self, key: &str, default: &str) -> String {
        self.get(key).unwrap_or_else(|| default.to_string())
    }

    fn parse<T>(&self, key: &str, default: &str) -> Result<T>
    where
        T: FromStr,
        T::Err: std::error::Error + Send + Sync + 'static,
    {
        let raw = self.or(key, default);
        raw.trim()
            .parse()
            .with_context(|| format!("invalid value for {}: '{}'", key, raw))
    }
}

/// Keys pasted into env files usually carry escaped newlines.
pub fn normalize_private_key(raw: &str) -> String {
    raw.replace("\\n", "\n")
}

fn split_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}
