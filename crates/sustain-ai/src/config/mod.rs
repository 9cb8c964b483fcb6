use secrecy::SecretString;
use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

/// Distinguishes runtime behavior for different stages of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Top-level configuration for the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub coaching: CoachingConfig,
    pub providers: ProviderConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
        let log_format = match optional_env("APP_LOG_FORMAT") {
            Some(value) => LogFormat::parse(&value).ok_or(ConfigError::InvalidValue {
                key: "APP_LOG_FORMAT",
                value,
            })?,
            None => LogFormat::default(),
        };

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig {
                log_level,
                log_format,
            },
            coaching: CoachingConfig::from_env()?,
            providers: ProviderConfig::from_env()?,
        })
    }
}

/// Settings controlling the HTTP server binding.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        if self.host.eq_ignore_ascii_case("localhost") {
            return Ok(SocketAddr::new(IpAddr::from([127, 0, 0, 1]), self.port));
        }

        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|source| ConfigError::InvalidHost { source })?;

        Ok(SocketAddr::new(ip, self.port))
    }
}

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
    pub log_format: LogFormat,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    #[default]
    Compact,
    Pretty,
}

impl LogFormat {
    fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "compact" => Some(Self::Compact),
            "pretty" => Some(Self::Pretty),
            _ => None,
        }
    }
}

/// Tuning for the recommendation pipeline and scoring.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CoachingConfig {
    pub recommendations: RecommendationConfig,
    /// Ask the generative backend to re-score a category after each update.
    pub llm_rescoring: bool,
}

impl CoachingConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let defaults = RecommendationConfig::default();
        let recommendations = RecommendationConfig {
            cap: parse_env("COACH_RECOMMENDATION_CAP", defaults.cap)?,
            min_primary_results: parse_env(
                "COACH_MIN_PRIMARY_RESULTS",
                defaults.min_primary_results,
            )?,
            generation_quota: parse_env("COACH_GENERATION_QUOTA", defaults.generation_quota)?,
            score_window: parse_env("COACH_SCORE_WINDOW", defaults.score_window)?,
        };

        if recommendations.cap == 0 {
            return Err(ConfigError::InvalidValue {
                key: "COACH_RECOMMENDATION_CAP",
                value: "0".to_string(),
            });
        }

        Ok(Self {
            recommendations,
            llm_rescoring: parse_flag("COACH_LLM_RESCORING"),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecommendationConfig {
    /// Upper bound on recommendations returned per category.
    pub cap: usize,
    /// Knowledge-base hits below this count trigger generation.
    pub min_primary_results: usize,
    /// Items requested from the generative backend.
    pub generation_quota: usize,
    /// Half-width of the score range used to filter knowledge-base documents.
    pub score_window: u8,
}

impl Default for RecommendationConfig {
    fn default() -> Self {
        Self {
            cap: 5,
            min_primary_results: 3,
            generation_quota: 3,
            score_window: 20,
        }
    }
}

/// External collaborators. A missing section leaves that provider disabled.
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub search: Option<SearchConfig>,
    pub completion: Option<CompletionConfig>,
    pub timeout: Duration,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            search: None,
            completion: None,
            timeout: Duration::from_secs(30),
        }
    }
}

impl ProviderConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let timeout = Duration::from_secs(parse_env("PROVIDER_TIMEOUT_SECS", 30u64)?);

        let search = match (optional_env("SEARCH_ENDPOINT"), optional_env("SEARCH_API_KEY")) {
            (Some(endpoint), Some(api_key)) => Some(SearchConfig {
                endpoint,
                index: optional_env("SEARCH_INDEX")
                    .unwrap_or_else(|| "sustainability-resources".to_string()),
                api_key: SecretString::from(api_key),
                api_version: optional_env("SEARCH_API_VERSION")
                    .unwrap_or_else(|| "2023-11-01".to_string()),
            }),
            (Some(_), None) => return Err(ConfigError::MissingValue("SEARCH_API_KEY")),
            _ => None,
        };

        let completion = match optional_env("COMPLETION_BASE_URL") {
            Some(base_url) => Some(CompletionConfig {
                base_url,
                api_key: optional_env("COMPLETION_API_KEY").map(SecretString::from),
                model: optional_env("COMPLETION_MODEL")
                    .ok_or(ConfigError::MissingValue("COMPLETION_MODEL"))?,
                api_version: optional_env("COMPLETION_API_VERSION"),
                max_tokens: parse_env("COMPLETION_MAX_TOKENS", 800u32)?,
                temperature: parse_env("COMPLETION_TEMPERATURE", 0.7f32)?,
            }),
            None => None,
        };

        Ok(Self {
            search,
            completion,
            timeout,
        })
    }
}

/// Azure Cognitive Search style index.
#[derive(Debug, Clone)]
pub struct SearchConfig {
    pub endpoint: String,
    pub index: String,
    pub api_key: SecretString,
    pub api_version: String,
}

/// OpenAI-compatible chat completions endpoint. Setting `api_version` switches
/// to Azure deployment URLs where `model` names the deployment.
#[derive(Debug, Clone)]
pub struct CompletionConfig {
    pub base_url: String,
    pub api_key: Option<SecretString>,
    pub model: String,
    pub api_version: Option<String>,
    pub max_tokens: u32,
    pub temperature: f32,
}

fn optional_env(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn parse_env<T: std::str::FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
    match optional_env(key) {
        Some(value) => value
            .parse::<T>()
            .map_err(|_| ConfigError::InvalidValue { key, value }),
        None => Ok(default),
    }
}

fn parse_flag(key: &str) -> bool {
    optional_env(key)
        .map(|value| matches!(value.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(false)
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidValue { key: &'static str, value: String },
    MissingValue(&'static str),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidValue { key, value } => {
                write!(f, "{key} has an invalid value '{value}'")
            }
            ConfigError::MissingValue(key) => write!(f, "{key} must be set"),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            ConfigError::InvalidPort
            | ConfigError::InvalidValue { .. }
            | ConfigError::MissingValue(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::{Mutex, OnceLock};

    fn env_guard() -> &'static Mutex<()> {
        static GUARD: OnceLock<Mutex<()>> = OnceLock::new();
        GUARD.get_or_init(|| Mutex::new(()))
    }

    const KEYS: &[&str] = &[
        "APP_ENV",
        "APP_HOST",
        "APP_PORT",
        "APP_LOG_LEVEL",
        "APP_LOG_FORMAT",
        "COACH_RECOMMENDATION_CAP",
        "COACH_MIN_PRIMARY_RESULTS",
        "COACH_GENERATION_QUOTA",
        "COACH_SCORE_WINDOW",
        "COACH_LLM_RESCORING",
        "SEARCH_ENDPOINT",
        "SEARCH_INDEX",
        "SEARCH_API_KEY",
        "SEARCH_API_VERSION",
        "COMPLETION_BASE_URL",
        "COMPLETION_API_KEY",
        "COMPLETION_MODEL",
        "COMPLETION_API_VERSION",
        "COMPLETION_MAX_TOKENS",
        "COMPLETION_TEMPERATURE",
        "PROVIDER_TIMEOUT_SECS",
    ];

    fn reset_env() {
        for key in KEYS {
            env::remove_var(key);
        }
    }

    #[test]
    fn load_uses_defaults_when_env_missing() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        let config = AppConfig::load().expect("config loads with defaults");
        assert_eq!(config.environment, AppEnvironment::Development);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.telemetry.log_level, "info");
        assert_eq!(config.telemetry.log_format, LogFormat::Compact);
        assert_eq!(config.coaching, CoachingConfig::default());
        assert!(config.providers.search.is_none());
        assert!(config.providers.completion.is_none());
        assert_eq!(config.providers.timeout, Duration::from_secs(30));
    }

    #[test]
    fn accepts_localhost_host() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APP_HOST", "localhost");
        let config = AppConfig::load().expect("config loads");
        let addr = config.server.socket_addr().expect("localhost resolves");
        assert_eq!(addr, SocketAddr::new(IpAddr::from([127, 0, 0, 1]), 3000));
        reset_env();
    }

    #[test]
    fn coaching_overrides_are_parsed() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("COACH_RECOMMENDATION_CAP", "8");
        env::set_var("COACH_GENERATION_QUOTA", "4");
        env::set_var("COACH_LLM_RESCORING", "true");
        let config = AppConfig::load().expect("config loads");
        assert_eq!(config.coaching.recommendations.cap, 8);
        assert_eq!(config.coaching.recommendations.generation_quota, 4);
        assert_eq!(config.coaching.recommendations.min_primary_results, 3);
        assert!(config.coaching.llm_rescoring);
        reset_env();
    }

    #[test]
    fn rejects_non_numeric_cap() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("COACH_RECOMMENDATION_CAP", "many");
        match AppConfig::load() {
            Err(ConfigError::InvalidValue { key, value }) => {
                assert_eq!(key, "COACH_RECOMMENDATION_CAP");
                assert_eq!(value, "many");
            }
            other => panic!("expected invalid value, got {other:?}"),
        }
        reset_env();
    }

    #[test]
    fn log_format_is_validated() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APP_LOG_FORMAT", "Pretty");
        let config = AppConfig::load().expect("config loads");
        assert_eq!(config.telemetry.log_format, LogFormat::Pretty);

        env::set_var("APP_LOG_FORMAT", "xml");
        assert!(matches!(
            AppConfig::load(),
            Err(ConfigError::InvalidValue {
                key: "APP_LOG_FORMAT",
                ..
            })
        ));
        reset_env();
    }

    #[test]
    fn provider_sections_require_their_credentials() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("SEARCH_ENDPOINT", "https://search.example.net");
        assert!(matches!(
            AppConfig::load(),
            Err(ConfigError::MissingValue("SEARCH_API_KEY"))
        ));

        env::set_var("SEARCH_API_KEY", "secret");
        env::set_var("COMPLETION_BASE_URL", "https://llm.example.net");
        env::set_var("COMPLETION_MODEL", "gpt-4o-mini");
        let config = AppConfig::load().expect("config loads");
        let search = config.providers.search.expect("search configured");
        assert_eq!(search.index, "sustainability-resources");
        let completion = config.providers.completion.expect("completion configured");
        assert_eq!(completion.model, "gpt-4o-mini");
        assert!(completion.api_key.is_none());
        assert_eq!(completion.max_tokens, 800);
        reset_env();
    }
}
