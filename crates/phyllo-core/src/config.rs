//! Configuration module
//!
//! Environment-driven settings for the intake service: server, database,
//! authentication, the classifier endpoint and both storage tiers.

use std::env;
use std::path::{Component, Path, PathBuf};
use std::time::Duration;

// Common constants
const MAX_CONNECTIONS: u32 = 20;
const CONNECTION_TIMEOUT_SECS: u64 = 30;
const INFERENCE_TIMEOUT_SECS: u64 = 30;
const STORAGE_TIMEOUT_SECS: u64 = 30;
const MAX_FILE_SIZE_MB: usize = 10;
const MIN_OBJECT_SIZE_BYTES: u64 = 1;

/// Base configuration shared by every entry point
#[derive(Clone, Debug)]
pub struct BaseConfig {
    pub server_port: u16,
    pub cors_origins: Vec<String>,
    pub db_max_connections: u32,
    pub db_timeout_seconds: u64,
    pub jwt_secret: String,
    pub environment: String,
}

/// Intake service configuration
#[derive(Clone, Debug)]
pub struct AppConfig {
    pub base: BaseConfig,
    pub database_url: String,
    // Classifier
    pub classifier_base_url: String,
    pub inference_timeout_secs: u64,
    // Remote object storage (S3-compatible, R2 by default)
    pub r2_bucket: String,
    pub r2_account_id: Option<String>,
    pub r2_endpoint: Option<String>,
    pub r2_region: String,
    pub r2_access_key_id: Option<String>,
    pub r2_secret_access_key: Option<String>,
    pub r2_public_base_url: String,
    pub storage_timeout_secs: u64,
    pub min_object_size_bytes: u64,
    // Local fallback tier and scratch space
    pub uploads_dir: PathBuf,
    pub scratch_dir: PathBuf,
    // Upload validation
    pub max_file_size_bytes: usize,
    pub allowed_extensions: Vec<String>,
    pub allowed_content_types: Vec<String>,
}

/// Application configuration.
#[derive(Clone, Debug)]
pub struct Config(pub Box<AppConfig>);

impl Config {
    fn as_app(&self) -> &AppConfig {
        &self.0
    }

    /// Check if the application is running in production mode
    pub fn is_production(&self) -> bool {
        let env = self.as_app().base.environment.to_lowercase();
        env == "production" || env == "prod"
    }

    pub fn from_env() -> Result<Self, anyhow::Error> {
        let config = AppConfig::from_env()?;
        Ok(Config(Box::new(config)))
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        self.as_app().validate()
    }

    pub fn server_port(&self) -> u16 {
        self.as_app().base.server_port
    }

    pub fn jwt_secret(&self) -> &str {
        &self.as_app().base.jwt_secret
    }

    pub fn cors_origins(&self) -> &[String] {
        &self.as_app().base.cors_origins
    }

    pub fn environment(&self) -> &str {
        &self.as_app().base.environment
    }

    pub fn database_url(&self) -> &str {
        &self.as_app().database_url
    }

    pub fn db_max_connections(&self) -> u32 {
        self.as_app().base.db_max_connections
    }

    pub fn db_timeout_seconds(&self) -> u64 {
        self.as_app().base.db_timeout_seconds
    }

    pub fn classifier_base_url(&self) -> &str {
        &self.as_app().classifier_base_url
    }

    pub fn inference_timeout(&self) -> Duration {
        Duration::from_secs(self.as_app().inference_timeout_secs)
    }

    pub fn r2_bucket(&self) -> &str {
        &self.as_app().r2_bucket
    }

    pub fn r2_region(&self) -> &str {
        &self.as_app().r2_region
    }

    pub fn r2_access_key_id(&self) -> Option<&str> {
        self.as_app().r2_access_key_id.as_deref()
    }

    pub fn r2_secret_access_key(&self) -> Option<&str> {
        self.as_app().r2_secret_access_key.as_deref()
    }

    /// S3-compatible endpoint. An explicit `R2_ENDPOINT` wins over the
    /// account-derived Cloudflare endpoint.
    pub fn r2_endpoint(&self) -> Option<String> {
        let app = self.as_app();
        app.r2_endpoint.clone().or_else(|| {
            app.r2_account_id
                .as_ref()
                .map(|id| format!("https://{}.r2.cloudflarestorage.com", id))
        })
    }

    pub fn r2_public_base_url(&self) -> &str {
        &self.as_app().r2_public_base_url
    }

    pub fn storage_timeout(&self) -> Duration {
        Duration::from_secs(self.as_app().storage_timeout_secs)
    }

    pub fn min_object_size_bytes(&self) -> u64 {
        self.as_app().min_object_size_bytes
    }

    pub fn uploads_dir(&self) -> &PathBuf {
        &self.as_app().uploads_dir
    }

    pub fn scratch_dir(&self) -> &PathBuf {
        &self.as_app().scratch_dir
    }

    pub fn max_file_size_bytes(&self) -> usize {
        self.as_app().max_file_size_bytes
    }

    pub fn allowed_extensions(&self) -> &[String] {
        &self.as_app().allowed_extensions
    }

    pub fn allowed_content_types(&self) -> &[String] {
        &self.as_app().allowed_content_types
    }
}

fn env_list(name: &str, default: &str) -> Vec<String> {
    env::var(name)
        .unwrap_or_else(|_| default.to_string())
        .split(',')
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Lexical containment check, ignoring `.` components.
fn is_within(path: &Path, dir: &Path) -> bool {
    let normal = |p: &Path| -> PathBuf {
        p.components()
            .filter(|c| !matches!(c, Component::CurDir))
            .collect()
    };
    normal(path).starts_with(normal(dir))
}

fn env_opt(name: &str) -> Option<String> {
    env::var(name).ok().filter(|s| !s.trim().is_empty())
}

impl AppConfig {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        let environment = env::var("ENVIRONMENT")
            .or_else(|_| env::var("APP_ENV"))
            .unwrap_or_else(|_| "development".to_string());

        let cors_origins_str = env::var("CORS_ORIGINS").unwrap_or_else(|_| "*".to_string());
        let is_production =
            environment.to_lowercase() == "production" || environment.to_lowercase() == "prod";
        if is_production && cors_origins_str.trim() == "*" {
            return Err(anyhow::anyhow!(
                "CORS_ORIGINS cannot be '*' in production. Please specify explicit origins."
            ));
        }

        let cors_origins: Vec<String> = cors_origins_str
            .split(',')
            .map(|s| s.trim().to_string())
            .collect();

        let max_file_size_mb = env::var("MAX_FILE_SIZE_MB")
            .unwrap_or_else(|_| MAX_FILE_SIZE_MB.to_string())
            .parse::<usize>()
            .unwrap_or(MAX_FILE_SIZE_MB);

        let base = BaseConfig {
            server_port: env::var("PORT")
                .unwrap_or_else(|_| "4000".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("PORT must be a valid number"))?,
            cors_origins,
            db_max_connections: env::var("DB_MAX_CONNECTIONS")
                .unwrap_or_else(|_| MAX_CONNECTIONS.to_string())
                .parse()
                .unwrap_or(MAX_CONNECTIONS),
            db_timeout_seconds: env::var("DB_TIMEOUT_SECONDS")
                .unwrap_or_else(|_| CONNECTION_TIMEOUT_SECS.to_string())
                .parse()
                .unwrap_or(CONNECTION_TIMEOUT_SECS),
            jwt_secret: env::var("JWT_SECRET")
                .map_err(|_| anyhow::anyhow!("JWT_SECRET must be set for authentication"))?,
            environment,
        };

        let uploads_dir = PathBuf::from(
            env::var("UPLOADS_DIR").unwrap_or_else(|_| "uploads".to_string()),
        );
        let scratch_dir = PathBuf::from(
            env::var("SCRATCH_DIR").unwrap_or_else(|_| "scratch".to_string()),
        );

        let config = AppConfig {
            base,
            database_url: env::var("DATABASE_URL")
                .map_err(|_| anyhow::anyhow!("DATABASE_URL must be set"))?,
            classifier_base_url: env::var("CLASSIFIER_BASE_URL")
                .unwrap_or_else(|_| "http://localhost:5000".to_string()),
            inference_timeout_secs: env::var("INFERENCE_TIMEOUT_SECS")
                .unwrap_or_else(|_| INFERENCE_TIMEOUT_SECS.to_string())
                .parse()
                .unwrap_or(INFERENCE_TIMEOUT_SECS),
            r2_bucket: env::var("R2_BUCKET_NAME")
                .map_err(|_| anyhow::anyhow!("R2_BUCKET_NAME must be set"))?,
            r2_account_id: env_opt("R2_ACCOUNT_ID"),
            r2_endpoint: env_opt("R2_ENDPOINT"),
            r2_region: env::var("R2_REGION").unwrap_or_else(|_| "auto".to_string()),
            r2_access_key_id: env_opt("R2_ACCESS_KEY_ID"),
            r2_secret_access_key: env_opt("R2_SECRET_ACCESS_KEY"),
            r2_public_base_url: env::var("R2_PUBLIC_BASE_URL")
                .map_err(|_| anyhow::anyhow!("R2_PUBLIC_BASE_URL must be set"))?,
            storage_timeout_secs: env::var("STORAGE_TIMEOUT_SECS")
                .unwrap_or_else(|_| STORAGE_TIMEOUT_SECS.to_string())
                .parse()
                .unwrap_or(STORAGE_TIMEOUT_SECS),
            min_object_size_bytes: env::var("MIN_OBJECT_SIZE_BYTES")
                .unwrap_or_else(|_| MIN_OBJECT_SIZE_BYTES.to_string())
                .parse()
                .unwrap_or(MIN_OBJECT_SIZE_BYTES),
            uploads_dir,
            scratch_dir,
            max_file_size_bytes: max_file_size_mb * 1024 * 1024,
            allowed_extensions: env_list("ALLOWED_EXTENSIONS", "jpg,jpeg,png,webp"),
            allowed_content_types: env_list(
                "ALLOWED_CONTENT_TYPES",
                "image/jpeg,image/png,image/webp",
            ),
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.base.jwt_secret.len() < 32 {
            return Err(anyhow::anyhow!(
                "JWT_SECRET must be at least 32 characters long"
            ));
        }

        if !self.database_url.starts_with("postgresql://")
            && !self.database_url.starts_with("postgres://")
        {
            return Err(anyhow::anyhow!(
                "DATABASE_URL must be a valid PostgreSQL connection string"
            ));
        }

        if self.r2_bucket.trim().is_empty() {
            return Err(anyhow::anyhow!("R2_BUCKET_NAME must not be empty"));
        }

        if !self.r2_public_base_url.starts_with("http://")
            && !self.r2_public_base_url.starts_with("https://")
        {
            return Err(anyhow::anyhow!(
                "R2_PUBLIC_BASE_URL must be an http(s) URL"
            ));
        }

        if self.r2_endpoint.is_none() && self.r2_account_id.is_none() {
            return Err(anyhow::anyhow!(
                "R2_ENDPOINT or R2_ACCOUNT_ID must be set"
            ));
        }

        // `UPLOADS_DIR` is served without auth; in-flight uploads must not be.
        if is_within(&self.scratch_dir, &self.uploads_dir) {
            return Err(anyhow::anyhow!(
                "SCRATCH_DIR must not be inside UPLOADS_DIR"
            ));
        }

        if self.allowed_extensions.is_empty() {
            return Err(anyhow::anyhow!("ALLOWED_EXTENSIONS must not be empty"));
        }

        if self.inference_timeout_secs == 0 || self.storage_timeout_secs == 0 {
            return Err(anyhow::anyhow!(
                "INFERENCE_TIMEOUT_SECS and STORAGE_TIMEOUT_SECS must be greater than zero"
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn sample_config() -> AppConfig {
        AppConfig {
            base: BaseConfig {
                server_port: 4000,
                cors_origins: vec!["*".to_string()],
                db_max_connections: 5,
                db_timeout_seconds: 5,
                jwt_secret: "0123456789abcdef0123456789abcdef".to_string(),
                environment: "development".to_string(),
            },
            database_url: "postgres://localhost/phyllo".to_string(),
            classifier_base_url: "http://localhost:5000".to_string(),
            inference_timeout_secs: 30,
            r2_bucket: "leaves".to_string(),
            r2_account_id: Some("acct123".to_string()),
            r2_endpoint: None,
            r2_region: "auto".to_string(),
            r2_access_key_id: None,
            r2_secret_access_key: None,
            r2_public_base_url: "https://cdn.example.com".to_string(),
            storage_timeout_secs: 30,
            min_object_size_bytes: 1,
            uploads_dir: PathBuf::from("uploads"),
            scratch_dir: PathBuf::from("scratch"),
            max_file_size_bytes: 10 * 1024 * 1024,
            allowed_extensions: vec!["jpg".to_string(), "png".to_string()],
            allowed_content_types: vec!["image/jpeg".to_string()],
        }
    }

    #[test]
    fn test_sample_config_is_valid() {
        assert!(sample_config().validate().is_ok());
    }

    #[test]
    fn test_short_jwt_secret_rejected() {
        let mut config = sample_config();
        config.base.jwt_secret = "short".to_string();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("JWT_SECRET"));
    }

    #[test]
    fn test_database_url_scheme_checked() {
        let mut config = sample_config();
        config.database_url = "mysql://localhost/db".to_string();
        assert!(config.validate().is_err());

        config.database_url = "postgresql://localhost/db".to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_endpoint_derived_from_account_id() {
        let config = Config(Box::new(sample_config()));
        assert_eq!(
            config.r2_endpoint().as_deref(),
            Some("https://acct123.r2.cloudflarestorage.com")
        );
    }

    #[test]
    fn test_explicit_endpoint_wins() {
        let mut app = sample_config();
        app.r2_endpoint = Some("http://localhost:9000".to_string());
        let config = Config(Box::new(app));
        assert_eq!(config.r2_endpoint().as_deref(), Some("http://localhost:9000"));
    }

    #[test]
    fn test_missing_endpoint_and_account_rejected() {
        let mut config = sample_config();
        config.r2_account_id = None;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_scratch_dir_outside_served_uploads() {
        let mut config = sample_config();
        for inside in ["uploads/tmp", "./uploads/tmp", "uploads"] {
            config.scratch_dir = PathBuf::from(inside);
            assert!(config.validate().is_err(), "{} should be rejected", inside);
        }

        config.scratch_dir = PathBuf::from("uploads-scratch");
        assert!(config.validate().is_ok());
        config.scratch_dir = PathBuf::from("/var/tmp/phyllo");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_is_production() {
        let mut app = sample_config();
        app.base.environment = "PROD".to_string();
        assert!(Config(Box::new(app)).is_production());
        assert!(!Config(Box::new(sample_config())).is_production());
    }
}
