//! Configuration module
//!
//! Environment-driven configuration for the intake service: server, database,
//! storage, OCR/LLM providers and pipeline limits.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::storage_types::StorageBackend;

const SERVER_PORT: u16 = 8000;
const MAX_CONNECTIONS: u32 = 10;
const CONNECTION_TIMEOUT_SECS: u64 = 30;
const MAX_FILE_SIZE_BYTES: usize = 10 * 1024 * 1024;
const MAX_FILES_PER_SUBMISSION: usize = 20;
const MAX_CONCURRENT_REMOTE_CALLS: usize = 4;
const PIPELINE_TIMEOUT_SECS: u64 = 300;
const LOCAL_STORAGE_PATH: &str = "./temp";
const LOCAL_STORAGE_BASE_URL: &str = "http://localhost:8000/temp";
const DEFAULT_S3_REGION: &str = "us-east-1";
const DEFAULT_OPENAI_MODEL: &str = "gpt-4o";
const DEFAULT_TESSERACT_PATH: &str = "tesseract";
const DEFAULT_TESSERACT_LANG: &str = "eng";

/// Server-level settings shared by every component.
#[derive(Clone, Debug)]
pub struct BaseConfig {
    pub server_port: u16,
    pub cors_origins: Vec<String>,
    pub db_max_connections: u32,
    pub db_timeout_seconds: u64,
    pub environment: String,
}

/// OCR and language-model provider settings. Absent keys disable the provider.
#[derive(Clone, Debug)]
pub struct ProviderConfig {
    pub google_vision_api_key: Option<String>,
    pub openai_api_key: Option<String>,
    pub openai_model: String,
    pub openai_vision_model: String,
    pub tesseract_path: String,
    pub tesseract_lang: String,
    pub pdfium_library_path: Option<PathBuf>,
}

/// Limits applied to each submission run.
#[derive(Clone, Debug)]
pub struct PipelineConfig {
    pub scratch_dir: PathBuf,
    pub ocr_workers: usize,
    pub max_concurrent_remote_calls: usize,
    /// Zero disables the deadline.
    pub pipeline_timeout_seconds: u64,
    pub max_file_size_bytes: usize,
    pub max_files_per_submission: usize,
}

#[derive(Clone, Debug)]
pub struct IntakeConfig {
    pub base: BaseConfig,
    pub database_url: String,
    pub storage_backend: StorageBackend,
    pub s3_bucket: Option<String>,
    pub s3_region: String,
    pub s3_endpoint: Option<String>,
    pub local_storage_path: String,
    pub local_storage_base_url: String,
    pub providers: ProviderConfig,
    pub pipeline: PipelineConfig,
}

/// Application configuration.
#[derive(Clone, Debug)]
pub struct Config(pub Box<IntakeConfig>);

impl Config {
    fn inner(&self) -> &IntakeConfig {
        &self.0
    }

    pub fn from_env() -> Result<Self, anyhow::Error> {
        let config = IntakeConfig::from_env()?;
        Ok(Config(Box::new(config)))
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        self.inner().validate()
    }

    /// Check if the application is running in production mode
    pub fn is_production(&self) -> bool {
        let env = self.inner().base.environment.to_lowercase();
        env == "production" || env == "prod"
    }

    pub fn server_port(&self) -> u16 {
        self.inner().base.server_port
    }

    pub fn cors_origins(&self) -> &[String] {
        &self.inner().base.cors_origins
    }

    pub fn environment(&self) -> &str {
        &self.inner().base.environment
    }

    pub fn database_url(&self) -> &str {
        &self.inner().database_url
    }

    pub fn db_max_connections(&self) -> u32 {
        self.inner().base.db_max_connections
    }

    pub fn db_timeout_seconds(&self) -> u64 {
        self.inner().base.db_timeout_seconds
    }

    pub fn storage_backend(&self) -> StorageBackend {
        self.inner().storage_backend
    }

    pub fn s3_bucket(&self) -> Option<&str> {
        self.inner().s3_bucket.as_deref()
    }

    pub fn s3_region(&self) -> &str {
        &self.inner().s3_region
    }

    pub fn s3_endpoint(&self) -> Option<&str> {
        self.inner().s3_endpoint.as_deref()
    }

    pub fn local_storage_path(&self) -> &str {
        &self.inner().local_storage_path
    }

    pub fn local_storage_base_url(&self) -> &str {
        &self.inner().local_storage_base_url
    }

    pub fn providers(&self) -> &ProviderConfig {
        &self.inner().providers
    }

    pub fn pipeline(&self) -> &PipelineConfig {
        &self.inner().pipeline
    }

    /// Whole-pipeline deadline, `None` when disabled.
    pub fn pipeline_timeout(&self) -> Option<Duration> {
        match self.inner().pipeline.pipeline_timeout_seconds {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }

    /// Upper bound for a whole multipart request body.
    pub fn max_request_body_bytes(&self) -> usize {
        let pipeline = &self.inner().pipeline;
        pipeline
            .max_file_size_bytes
            .saturating_mul(pipeline.max_files_per_submission)
            .saturating_add(1024 * 1024)
    }
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(default)
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|s| !s.trim().is_empty())
}

impl IntakeConfig {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        let environment = env::var("ENVIRONMENT")
            .or_else(|_| env::var("APP_ENV"))
            .unwrap_or_else(|_| "development".to_string());

        let cors_origins = env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "*".to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let base = BaseConfig {
            server_port: env::var("PORT")
                .unwrap_or_else(|_| SERVER_PORT.to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("PORT must be a valid number"))?,
            cors_origins,
            db_max_connections: env_or("DB_MAX_CONNECTIONS", MAX_CONNECTIONS),
            db_timeout_seconds: env_or("DB_TIMEOUT_SECONDS", CONNECTION_TIMEOUT_SECS),
            environment,
        };

        let storage_backend = match env_opt("STORAGE_BACKEND") {
            Some(value) => value.parse::<StorageBackend>()?,
            None => StorageBackend::Local,
        };

        let default_workers = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(2);

        let openai_model =
            env_opt("OPENAI_MODEL").unwrap_or_else(|| DEFAULT_OPENAI_MODEL.to_string());

        let providers = ProviderConfig {
            google_vision_api_key: env_opt("GOOGLE_VISION_API_KEY"),
            openai_api_key: env_opt("OPENAI_API_KEY"),
            openai_vision_model: env_opt("OPENAI_VISION_MODEL")
                .unwrap_or_else(|| openai_model.clone()),
            openai_model,
            tesseract_path: env_opt("TESSERACT_PATH")
                .unwrap_or_else(|| DEFAULT_TESSERACT_PATH.to_string()),
            tesseract_lang: env_opt("TESSERACT_LANG")
                .unwrap_or_else(|| DEFAULT_TESSERACT_LANG.to_string()),
            pdfium_library_path: env_opt("PDFIUM_LIBRARY_PATH").map(PathBuf::from),
        };

        let pipeline = PipelineConfig {
            scratch_dir: env_opt("SCRATCH_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(env::temp_dir),
            ocr_workers: env_or("OCR_WORKERS", default_workers),
            max_concurrent_remote_calls: env_or(
                "MAX_CONCURRENT_REMOTE_CALLS",
                MAX_CONCURRENT_REMOTE_CALLS,
            ),
            pipeline_timeout_seconds: env_or("PIPELINE_TIMEOUT_SECONDS", PIPELINE_TIMEOUT_SECS),
            max_file_size_bytes: env_or("MAX_FILE_SIZE_BYTES", MAX_FILE_SIZE_BYTES),
            max_files_per_submission: env_or(
                "MAX_FILES_PER_SUBMISSION",
                MAX_FILES_PER_SUBMISSION,
            ),
        };

        Ok(IntakeConfig {
            base,
            database_url: env::var("DATABASE_URL")
                .map_err(|_| anyhow::anyhow!("DATABASE_URL must be set"))?,
            storage_backend,
            s3_bucket: env_opt("S3_BUCKET"),
            s3_region: env_opt("S3_REGION")
                .or_else(|| env_opt("AWS_REGION"))
                .unwrap_or_else(|| DEFAULT_S3_REGION.to_string()),
            s3_endpoint: env_opt("S3_ENDPOINT"),
            local_storage_path: env_opt("LOCAL_STORAGE_PATH")
                .unwrap_or_else(|| LOCAL_STORAGE_PATH.to_string()),
            local_storage_base_url: env_opt("LOCAL_STORAGE_BASE_URL")
                .unwrap_or_else(|| LOCAL_STORAGE_BASE_URL.to_string()),
            providers,
            pipeline,
        })
    }

    /// Built-in defaults without consulting the environment.
    pub fn defaults(database_url: impl Into<String>) -> Self {
        IntakeConfig {
            base: BaseConfig {
                server_port: SERVER_PORT,
                cors_origins: vec!["*".to_string()],
                db_max_connections: MAX_CONNECTIONS,
                db_timeout_seconds: CONNECTION_TIMEOUT_SECS,
                environment: "development".to_string(),
            },
            database_url: database_url.into(),
            storage_backend: StorageBackend::Local,
            s3_bucket: None,
            s3_region: DEFAULT_S3_REGION.to_string(),
            s3_endpoint: None,
            local_storage_path: LOCAL_STORAGE_PATH.to_string(),
            local_storage_base_url: LOCAL_STORAGE_BASE_URL.to_string(),
            providers: ProviderConfig {
                google_vision_api_key: None,
                openai_api_key: None,
                openai_model: DEFAULT_OPENAI_MODEL.to_string(),
                openai_vision_model: DEFAULT_OPENAI_MODEL.to_string(),
                tesseract_path: DEFAULT_TESSERACT_PATH.to_string(),
                tesseract_lang: DEFAULT_TESSERACT_LANG.to_string(),
                pdfium_library_path: None,
            },
            pipeline: PipelineConfig {
                scratch_dir: env::temp_dir(),
                ocr_workers: 2,
                max_concurrent_remote_calls: MAX_CONCURRENT_REMOTE_CALLS,
                pipeline_timeout_seconds: PIPELINE_TIMEOUT_SECS,
                max_file_size_bytes: MAX_FILE_SIZE_BYTES,
                max_files_per_submission: MAX_FILES_PER_SUBMISSION,
            },
        }
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if !self.database_url.starts_with("postgres://")
            && !self.database_url.starts_with("postgresql://")
        {
            return Err(anyhow::anyhow!(
                "DATABASE_URL must be a valid PostgreSQL connection string"
            ));
        }

        match self.storage_backend {
            StorageBackend::S3 => {
                if self.s3_bucket.is_none() {
                    return Err(anyhow::anyhow!(
                        "S3_BUCKET must be set when using S3 storage backend"
                    ));
                }
            }
            StorageBackend::Local => {
                if self.local_storage_base_url.trim().is_empty() {
                    return Err(anyhow::anyhow!(
                        "LOCAL_STORAGE_BASE_URL must not be empty when using local storage backend"
                    ));
                }
            }
        }

        if self.pipeline.ocr_workers == 0 {
            return Err(anyhow::anyhow!("OCR_WORKERS must be at least 1"));
        }
        if self.pipeline.max_concurrent_remote_calls == 0 {
            return Err(anyhow::anyhow!(
                "MAX_CONCURRENT_REMOTE_CALLS must be at least 1"
            ));
        }
        if self.pipeline.max_file_size_bytes == 0 {
            return Err(anyhow::anyhow!("MAX_FILE_SIZE_BYTES must be greater than 0"));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_config() -> IntakeConfig {
        IntakeConfig::defaults("postgresql://localhost/loandesk")
    }

    #[test]
    fn test_validate_accepts_defaults() {
        assert!(sample_config().validate().is_ok());
    }

    #[test]
    fn test_validate_requires_bucket_for_s3() {
        let mut config = sample_config();
        config.storage_backend = StorageBackend::S3;
        assert!(config.validate().is_err());

        config.s3_bucket = Some("loan-docs".to_string());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_workers() {
        let mut config = sample_config();
        config.pipeline.ocr_workers = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_pipeline_timeout_zero_disables() {
        let mut inner = sample_config();
        inner.pipeline.pipeline_timeout_seconds = 0;
        let config = Config(Box::new(inner));
        assert!(config.pipeline_timeout().is_none());
    }

    #[test]
    fn test_is_production() {
        let mut inner = sample_config();
        inner.base.environment = "Production".to_string();
        assert!(Config(Box::new(inner)).is_production());
        assert!(!Config(Box::new(sample_config())).is_production());
    }
}
