use std::env;
use thiserror::Error;

/// Default upper bound on chunk length, measured in characters.
pub const DEFAULT_MAX_CHUNK_SIZE: usize = 1000;
/// Default cap on the `POST /process` request body, in bytes.
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;
/// Default OpenAI-compatible API root used for embeddings.
pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
/// Default embedding model; produces 1536-dimensional vectors.
pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-3-small";

/// Errors encountered while loading configuration from environment variables.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Required environment variable was not provided.
    #[error("Missing environment variable: {0}")]
    MissingVariable(String),
    /// Environment variable contained a value that could not be parsed.
    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(String),
}

/// Runtime configuration for the ingestion service.
///
/// Built once at process start and handed to the pipeline and gateway adapters by reference.
#[derive(Debug, Clone)]
pub struct Config {
    /// Shared secret callers must present on `POST /process`.
    pub processing_secret: String,
    /// Base URL of the storage API receiving status updates and chunk records.
    pub storage_api_url: String,
    /// Optional bearer key for the storage API.
    pub storage_api_key: Option<String>,
    /// Embedding provider used to generate vector representations.
    pub embedding_provider: EmbeddingProvider,
    /// API key for the OpenAI embeddings endpoint.
    pub openai_api_key: Option<String>,
    /// Root URL of the OpenAI-compatible API.
    pub openai_base_url: String,
    /// Embedding model identifier passed to the provider.
    pub embedding_model: String,
    /// Upper bound on chunk length in characters.
    pub max_chunk_size: usize,
    /// Largest accepted `POST /process` body in bytes (base64 inflates documents by a third).
    pub max_upload_bytes: usize,
    /// Optional bearer token attached when downloading documents by URL.
    pub document_fetch_token: Option<String>,
    /// Optional override for the HTTP server port.
    pub server_port: Option<u16>,
}

/// Supported embedding backends for the processing pipeline.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EmbeddingProvider {
    /// Hosted OpenAI embeddings API.
    OpenAI,
    /// Deterministic offline hashing encoder.
    Hashing,
}

impl Config {
    /// Load configuration from environment variables, performing validation along the way.
    pub fn from_env() -> Result<Self, ConfigError> {
        let embedding_provider = match load_env_optional("EMBEDDING_PROVIDER") {
            Some(value) => value
                .parse()
                .map_err(|()| ConfigError::InvalidValue("EMBEDDING_PROVIDER".to_string()))?,
            None => EmbeddingProvider::OpenAI,
        };
        let openai_api_key = load_env_optional("OPENAI_API_KEY");
        if embedding_provider == EmbeddingProvider::OpenAI && openai_api_key.is_none() {
            return Err(ConfigError::MissingVariable("OPENAI_API_KEY".to_string()));
        }

        Ok(Self {
            processing_secret: load_env("PROCESSING_SECRET")?,
            storage_api_url: load_env("STORAGE_API_URL")?,
            storage_api_key: load_env_optional("STORAGE_API_KEY"),
            embedding_provider,
            openai_api_key,
            openai_base_url: load_env_optional("OPENAI_BASE_URL")
                .unwrap_or_else(|| DEFAULT_OPENAI_BASE_URL.to_string()),
            embedding_model: load_env_optional("EMBEDDING_MODEL")
                .unwrap_or_else(|| DEFAULT_EMBEDDING_MODEL.to_string()),
            max_chunk_size: load_env_optional("MAX_CHUNK_SIZE")
                .map(|value| {
                    value
                        .parse::<usize>()
                        .ok()
                        .filter(|size| *size > 0)
                        .ok_or_else(|| ConfigError::InvalidValue("MAX_CHUNK_SIZE".to_string()))
                })
                .transpose()?
                .unwrap_or(DEFAULT_MAX_CHUNK_SIZE),
            max_upload_bytes: load_env_optional("MAX_UPLOAD_BYTES")
                .map(|value| {
                    value
                        .parse::<usize>()
                        .ok()
                        .filter(|size| *size > 0)
                        .ok_or_else(|| ConfigError::InvalidValue("MAX_UPLOAD_BYTES".to_string()))
                })
                .transpose()?
                .unwrap_or(DEFAULT_MAX_UPLOAD_BYTES),
            document_fetch_token: load_env_optional("DOCUMENT_FETCH_TOKEN"),
            server_port: load_env_optional("SERVER_PORT")
                .map(|value| {
                    value
                        .parse()
                        .map_err(|_| ConfigError::InvalidValue("SERVER_PORT".into()))
                })
                .transpose()?,
        })
    }

    /// Load `.env` (when present) and then read the configuration from the environment.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        let config = Self::from_env()?;
        tracing::debug!(
            storage_api_url = %config.storage_api_url,
            has_storage_key = config.storage_api_key.is_some(),
            embedding_provider = ?config.embedding_provider,
            embedding_model = %config.embedding_model,
            max_chunk_size = config.max_chunk_size,
            max_upload_bytes = config.max_upload_bytes,
            server_port = ?config.server_port,
            "Loaded configuration"
        );
        Ok(config)
    }
}

fn load_env(key: &str) -> Result<String, ConfigError> {
    load_env_optional(key).ok_or_else(|| ConfigError::MissingVariable(key.to_string()))
}

fn load_env_optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

impl std::str::FromStr for EmbeddingProvider {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "openai" => Ok(Self::OpenAI),
            "hashing" | "local" => Ok(Self::Hashing),
            _ => Err(()),
        }
    }
}
