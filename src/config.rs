//! Configuration management for ai-todos.
//!
//! Configuration can be set via environment variables:
//! - `HOST` - Optional. Server host. Defaults to `127.0.0.1`.
//! - `PORT` - Optional. Server port. Defaults to `3000`.
//! - `GEMINI_API_KEY` - Optional at startup, required per decomposition request.
//! - `GEMINI_MODEL` - Optional. Defaults to `gemini-2.5-flash`.
//! - `GEMINI_API_BASE` - Optional. Base URL of the generateContent API (or a relay in front of it).
//! - `MODEL_TIMEOUT_SECS` - Optional. Request timeout for the model call.
//! - `TASK_STORE` - Optional. `memory`, `sqlite` or `supabase`. Defaults to `sqlite`.
//! - `DATA_DIR` - Optional. Directory for the SQLite database. Defaults to `./data`.
//! - `SUPABASE_URL` - Optional. Supabase project URL (auth, admin and PostgREST storage).
//! - `SUPABASE_ANON_KEY` - Optional. Public key used to look up sessions.
//! - `SUPABASE_SERVICE_ROLE_KEY` - Optional. Privileged key for storage and account deletion.
//! - `SUPABASE_JWT_SECRET` - Optional. Verify session JWTs locally instead of calling Supabase.
//! - `DECOMPOSE_MAX_TASKS`, `DECOMPOSE_MAX_TITLE_CHARS`, `DECOMPOSE_MIN_SPARSE_TASKS` -
//!   Optional. Decomposition bounds; may only be lowered (12 tasks, 120 characters at most).
//!
//! The 4000-character input ceiling is fixed.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

use crate::store::TaskStoreType;

pub const DEFAULT_GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.5-flash";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

/// Bounds applied by the decomposition pipeline.
///
/// The prompt asks the model to respect them; the normalizer enforces them
/// regardless of what the model returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecomposeLimits {
    /// Maximum number of tasks produced by one decomposition
    pub max_tasks: usize,
    /// Maximum title length in characters
    pub max_title_chars: usize,
    /// Upper end of the "1-N tasks" hint for short inputs
    pub min_tasks_on_sparse_input: usize,
    /// Maximum accepted input length in characters (after trimming)
    pub max_input_chars: usize,
}

/// Hard ceiling on tasks per decomposition.
pub const MAX_TASKS: usize = 12;
/// Hard ceiling on title length in characters.
pub const MAX_TITLE_CHARS: usize = 120;
/// Fixed input ceiling in characters. Not configurable.
pub const MAX_INPUT_CHARS: usize = 4000;

impl Default for DecomposeLimits {
    fn default() -> Self {
        Self {
            max_tasks: MAX_TASKS,
            max_title_chars: MAX_TITLE_CHARS,
            min_tasks_on_sparse_input: 3,
            max_input_chars: MAX_INPUT_CHARS,
        }
    }
}

impl DecomposeLimits {
    /// Read overrides through `lookup`. Overrides can only tighten the task and
    /// title ceilings; the input ceiling always stays at [`MAX_INPUT_CHARS`].
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let bounded = |name: &str, default: usize, ceiling: usize| -> Result<usize, ConfigError> {
            let value = parse_value(name, lookup(name), default)?;
            if value == 0 || value > ceiling {
                return Err(ConfigError::InvalidValue(
                    name.to_string(),
                    format!("must be between 1 and {}", ceiling),
                ));
            }
            Ok(value)
        };

        let max_tasks = bounded("DECOMPOSE_MAX_TASKS", defaults.max_tasks, MAX_TASKS)?;
        Ok(Self {
            max_tasks,
            max_title_chars: bounded(
                "DECOMPOSE_MAX_TITLE_CHARS",
                defaults.max_title_chars,
                MAX_TITLE_CHARS,
            )?,
            min_tasks_on_sparse_input: bounded(
                "DECOMPOSE_MIN_SPARSE_TASKS",
                defaults.min_tasks_on_sparse_input.min(max_tasks),
                max_tasks,
            )?,
            max_input_chars: MAX_INPUT_CHARS,
        })
    }
}

/// Upstream model configuration.
#[derive(Debug, Clone)]
pub struct ModelConfig {
    /// Gemini API key. Held by the process, never supplied by callers.
    pub api_key: Option<String>,
    /// Model name used in the generateContent path
    pub model: String,
    /// API base URL, without trailing slash
    pub api_base: String,
    /// Optional timeout for the single model call
    pub timeout: Option<Duration>,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: DEFAULT_GEMINI_MODEL.to_string(),
            api_base: DEFAULT_GEMINI_API_BASE.to_string(),
            timeout: None,
        }
    }
}

/// Supabase project configuration (identity, admin and optional storage).
#[derive(Debug, Clone, Default)]
pub struct SupabaseConfig {
    pub url: Option<String>,
    pub anon_key: Option<String>,
    pub service_role_key: Option<String>,
    pub jwt_secret: Option<String>,
}

impl SupabaseConfig {
    /// Whether privileged (service role) calls can be made.
    pub fn has_service_role(&self) -> bool {
        self.url.is_some() && self.service_role_key.is_some()
    }
}

/// Server configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server host
    pub host: String,

    /// Server port
    pub port: u16,

    /// Upstream model settings
    pub model: ModelConfig,

    /// Task store backend
    pub task_store: TaskStoreType,

    /// Directory for on-disk stores
    pub data_dir: PathBuf,

    /// Supabase settings
    pub supabase: SupabaseConfig,

    /// Decomposition bounds
    pub limits: DecomposeLimits,
}

fn env_opt(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Read an optional base URL, validate it and strip the trailing slash.
fn url_env(name: &str) -> Result<Option<String>, ConfigError> {
    match env_opt(name) {
        Some(raw) => {
            url::Url::parse(&raw)
                .map_err(|e| ConfigError::InvalidValue(name.to_string(), e.to_string()))?;
            Ok(Some(raw.trim_end_matches('/').to_string()))
        }
        None => Ok(None),
    }
}

fn parse_env<T>(name: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    parse_value(name, env_opt(name), default)
}

fn parse_value<T>(name: &str, raw: Option<String>, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match raw.map(|v| v.trim().to_string()).filter(|v| !v.is_empty()) {
        Some(raw) => raw
            .parse()
            .map_err(|e: T::Err| ConfigError::InvalidValue(name.to_string(), e.to_string())),
        None => Ok(default),
    }
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// A missing `GEMINI_API_KEY` is not an error here: the server still serves
    /// task CRUD and reports the missing key on each decomposition request.
    pub fn from_env() -> Result<Self, ConfigError> {
        let host = env_opt("HOST").unwrap_or_else(|| "127.0.0.1".to_string());
        let port = parse_env("PORT", 3000u16)?;

        let timeout = match env_opt("MODEL_TIMEOUT_SECS") {
            Some(raw) => {
                let secs: u64 = raw.parse().map_err(|e: std::num::ParseIntError| {
                    ConfigError::InvalidValue("MODEL_TIMEOUT_SECS".to_string(), e.to_string())
                })?;
                Some(Duration::from_secs(secs))
            }
            None => None,
        };

        let model = ModelConfig {
            api_key: env_opt("GEMINI_API_KEY"),
            model: env_opt("GEMINI_MODEL").unwrap_or_else(|| DEFAULT_GEMINI_MODEL.to_string()),
            api_base: url_env("GEMINI_API_BASE")?
                .unwrap_or_else(|| DEFAULT_GEMINI_API_BASE.to_string()),
            timeout,
        };

        let task_store = match env_opt("TASK_STORE") {
            Some(raw) => TaskStoreType::from_str(&raw)
                .map_err(|e| ConfigError::InvalidValue("TASK_STORE".to_string(), e))?,
            None => TaskStoreType::default(),
        };

        let data_dir = env_opt("DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("data"));

        let supabase = SupabaseConfig {
            url: url_env("SUPABASE_URL")?,
            anon_key: env_opt("SUPABASE_ANON_KEY"),
            service_role_key: env_opt("SUPABASE_SERVICE_ROLE_KEY"),
            jwt_secret: env_opt("SUPABASE_JWT_SECRET"),
        };

        if task_store == TaskStoreType::Supabase && !supabase.has_service_role() {
            return Err(ConfigError::MissingEnvVar(
                "SUPABASE_URL and SUPABASE_SERVICE_ROLE_KEY (required by TASK_STORE=supabase)"
                    .to_string(),
            ));
        }

        let limits = DecomposeLimits::from_lookup(env_opt)?;

        Ok(Self {
            host,
            port,
            model,
            task_store,
            data_dir,
            supabase,
            limits,
        })
    }

    /// Create a config with custom values (useful for testing).
    pub fn new(gemini_api_key: Option<String>, task_store: TaskStoreType) -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
            model: ModelConfig {
                api_key: gemini_api_key,
                ..ModelConfig::default()
            },
            task_store,
            data_dir: PathBuf::from("data"),
            supabase: SupabaseConfig::default(),
            limits: DecomposeLimits::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_limits_match_documented_bounds() {
        let limits = DecomposeLimits::default();
        assert_eq!(limits.max_tasks, 12);
        assert_eq!(limits.max_title_chars, 120);
        assert_eq!(limits.min_tasks_on_sparse_input, 3);
        assert_eq!(limits.max_input_chars, 4000);
    }

    fn lookup(pairs: &'static [(&'static str, &'static str)]) -> impl Fn(&str) -> Option<String> {
        move |name: &str| {
            pairs
                .iter()
                .find(|(k, _)| *k == name)
                .map(|(_, v)| v.to_string())
        }
    }

    #[test]
    fn limits_can_be_lowered() {
        let limits = DecomposeLimits::from_lookup(lookup(&[
            ("DECOMPOSE_MAX_TASKS", "4"),
            ("DECOMPOSE_MAX_TITLE_CHARS", "40"),
            ("DECOMPOSE_MIN_SPARSE_TASKS", "2"),
        ]))
        .expect("limits");
        assert_eq!(limits.max_tasks, 4);
        assert_eq!(limits.max_title_chars, 40);
        assert_eq!(limits.min_tasks_on_sparse_input, 2);
        assert_eq!(limits.max_input_chars, MAX_INPUT_CHARS);

        let limits =
            DecomposeLimits::from_lookup(lookup(&[("DECOMPOSE_MAX_TASKS", "2")])).expect("limits");
        assert_eq!(limits.min_tasks_on_sparse_input, 2);
    }

    #[test]
    fn max_tasks_above_ceiling_is_rejected() {
        let err = DecomposeLimits::from_lookup(lookup(&[("DECOMPOSE_MAX_TASKS", "50")]))
            .expect_err("over ceiling");
        assert!(matches!(err, ConfigError::InvalidValue(name, _) if name == "DECOMPOSE_MAX_TASKS"));
    }

    #[test]
    fn max_title_chars_above_ceiling_is_rejected() {
        let err = DecomposeLimits::from_lookup(lookup(&[("DECOMPOSE_MAX_TITLE_CHARS", "121")]))
            .expect_err("over ceiling");
        assert!(
            matches!(err, ConfigError::InvalidValue(name, _) if name == "DECOMPOSE_MAX_TITLE_CHARS")
        );
    }

    #[test]
    fn input_ceiling_ignores_overrides() {
        let limits = DecomposeLimits::from_lookup(lookup(&[("DECOMPOSE_MAX_INPUT_CHARS", "100000")]))
            .expect("limits");
        assert_eq!(limits.max_input_chars, 4000);
        let text = "a".repeat(5000);
        assert!(crate::decompose::validate_input(&text, limits.max_input_chars).is_err());
    }

    #[test]
    fn zero_limits_are_rejected() {
        assert!(DecomposeLimits::from_lookup(lookup(&[("DECOMPOSE_MAX_TASKS", "0")])).is_err());
        assert!(
            DecomposeLimits::from_lookup(lookup(&[("DECOMPOSE_MIN_SPARSE_TASKS", "13")])).is_err()
        );
    }

    #[test]
    fn test_config_uses_defaults() {
        let config = Config::new(Some("key".to_string()), TaskStoreType::Memory);
        assert_eq!(config.model.model, DEFAULT_GEMINI_MODEL);
        assert_eq!(config.model.api_base, DEFAULT_GEMINI_API_BASE);
        assert_eq!(config.model.api_key.as_deref(), Some("key"));
        assert!(!config.supabase.has_service_role());
    }
}
