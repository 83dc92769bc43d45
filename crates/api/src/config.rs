use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// A configuration value that could not be parsed.
#[derive(Debug, thiserror::Error)]
#[error("{key} must be a valid {expected}, got '{value}'")]
pub struct ConfigError {
    pub key: &'static str,
    pub value: String,
    pub expected: &'static str,
}

/// Server configuration loaded from environment variables.
///
/// All fields have defaults suitable for local development.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `8000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS`.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// How long shutdown waits for in-flight pages (default: `30`).
    pub shutdown_timeout_secs: u64,
    /// Public base URL used to build file URLs.
    pub app_url: String,
    /// Directory for uploads and results (default: `storage/uploads`).
    pub upload_dir: PathBuf,
    /// Shared secret for the `X-API-Key` header. `None` disables the check.
    pub api_key: Option<String>,
    pub jobs: JobsConfig,
}

/// Job tracking and image capability settings.
#[derive(Debug, Clone)]
pub struct JobsConfig {
    pub process_ttl_secs: u64,
    pub cache_max_entries: usize,
    pub sweep_interval_secs: u64,
    /// Bound on each fetch, mask, synthesis and store call.
    pub external_call_timeout_secs: u64,
    pub openai_api_key: Option<String>,
    pub openai_base_url: String,
    pub synthesis_model: String,
    pub synthesis_size: String,
    pub synthesis_quality: String,
    /// Endpoint of the face-masking service. `None` skips masking.
    pub face_masker_url: Option<String>,
    /// Chat model behind `POST /api/v1/generate-keywords`.
    pub keyword_model: String,
}

impl JobsConfig {
    pub fn process_ttl(&self) -> Duration {
        Duration::from_secs(self.process_ttl_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }

    pub fn external_call_timeout(&self) -> Duration {
        Duration::from_secs(self.external_call_timeout_secs)
    }
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                      | Default                     |
    /// |------------------------------|-----------------------------|
    /// | `HOST`                       | `0.0.0.0`                   |
    /// | `PORT`                       | `8000`                      |
    /// | `CORS_ORIGINS`               | `http://localhost:5173`     |
    /// | `REQUEST_TIMEOUT_SECS`       | `30`                        |
    /// | `SHUTDOWN_TIMEOUT_SECS`      | `30`                        |
    /// | `APP_URL`                    | `http://localhost:8000`     |
    /// | `UPLOAD_DIR`                 | `storage/uploads`           |
    /// | `API_KEY`                    | unset                       |
    /// | `PROCESS_TTL_SECS`           | `3600`                      |
    /// | `CACHE_MAX_ENTRIES`          | `1000`                      |
    /// | `CACHE_SWEEP_INTERVAL_SECS`  | `60`                        |
    /// | `EXTERNAL_CALL_TIMEOUT_SECS` | `180`                       |
    /// | `OPENAI_API_KEY`             | unset                       |
    /// | `OPENAI_BASE_URL`            | `https://api.openai.com/v1` |
    /// | `SYNTHESIS_MODEL`            | `gpt-image-1`               |
    /// | `SYNTHESIS_SIZE`             | `1024x1024`                 |
    /// | `SYNTHESIS_QUALITY`          | `high`                      |
    /// | `FACE_MASKER_URL`            | unset                       |
    /// | `KEYWORD_MODEL`              | `gpt-4`                     |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let env = Env(lookup);

        let cors_origins = env
            .string("CORS_ORIGINS", "http://localhost:5173")
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let jobs = JobsConfig {
            process_ttl_secs: env.parse_nonzero("PROCESS_TTL_SECS", 3600)?,
            cache_max_entries: env.parse("CACHE_MAX_ENTRIES", 1000, "usize")?,
            sweep_interval_secs: env.parse_nonzero("CACHE_SWEEP_INTERVAL_SECS", 60)?,
            external_call_timeout_secs: env.parse_nonzero("EXTERNAL_CALL_TIMEOUT_SECS", 180)?,
            openai_api_key: env.optional("OPENAI_API_KEY"),
            openai_base_url: env.string("OPENAI_BASE_URL", taleify_imaging::openai::DEFAULT_BASE_URL),
            synthesis_model: env.string("SYNTHESIS_MODEL", "gpt-image-1"),
            synthesis_size: env.string("SYNTHESIS_SIZE", "1024x1024"),
            synthesis_quality: env.string("SYNTHESIS_QUALITY", "high"),
            face_masker_url: env.optional("FACE_MASKER_URL"),
            keyword_model: env.string("KEYWORD_MODEL", taleify_imaging::keywords::DEFAULT_KEYWORD_MODEL),
        };

        Ok(Self {
            host: env.string("HOST", "0.0.0.0"),
            port: env.parse("PORT", 8000, "u16")?,
            cors_origins,
            request_timeout_secs: env.parse("REQUEST_TIMEOUT_SECS", 30, "u64")?,
            shutdown_timeout_secs: env.parse("SHUTDOWN_TIMEOUT_SECS", 30, "u64")?,
            app_url: env.string("APP_URL", "http://localhost:8000"),
            upload_dir: PathBuf::from(env.string("UPLOAD_DIR", "storage/uploads")),
            api_key: env.optional("API_KEY"),
            jobs,
        })
    }
}

struct Env<F>(F);

impl<F: Fn(&str) -> Option<String>> Env<F> {
    fn string(&self, key: &str, default: &str) -> String {
        (self.0)(key).unwrap_or_else(|| default.to_string())
    }

    /// Unset and blank values are both `None`.
    fn optional(&self, key: &str) -> Option<String> {
        (self.0)(key)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn parse<T: FromStr>(&self, key: &'static str, default: T, expected: &'static str) -> Result<T, ConfigError> {
        match (self.0)(key) {
            None => Ok(default),
            Some(raw) => raw.trim().parse().map_err(|_| ConfigError {
                key,
                value: raw,
                expected,
            }),
        }
    }

    /// A duration in seconds that must be at least one.
    fn parse_nonzero(&self, key: &'static str, default: u64) -> Result<u64, ConfigError> {
        const EXPECTED: &str = "positive number of seconds";
        let value = self.parse(key, default, EXPECTED)?;
        if value == 0 {
            return Err(ConfigError {
                key,
                value: value.to_string(),
                expected: EXPECTED,
            });
        }
        Ok(value)
    }
}
