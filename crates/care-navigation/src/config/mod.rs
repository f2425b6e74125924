use std::env;
use std::fmt;
use std::fs;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use crate::matching::MatchingConfig;

const DEFAULT_REBALANCE_INTERVAL_SECS: u64 = 900;

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

/// Top-level configuration for the navigation service.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub balancer: BalancerSchedule,
    pub matching: MatchingConfig,
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

        let interval_secs = match env::var("REBALANCE_INTERVAL_SECS") {
            Ok(value) => value
                .trim()
                .parse::<u64>()
                .map_err(|_| ConfigError::InvalidRebalanceInterval(value))?,
            Err(_) => DEFAULT_REBALANCE_INTERVAL_SECS,
        };

        let matching = match env::var("MATCHING_CONFIG") {
            Ok(path) if !path.trim().is_empty() => load_matching(PathBuf::from(path.trim()))?,
            _ => MatchingConfig::default(),
        };

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            balancer: BalancerSchedule::from_secs(interval_secs),
            matching,
        })
    }
}

fn load_matching(path: PathBuf) -> Result<MatchingConfig, ConfigError> {
    let raw = fs::read_to_string(&path).map_err(|source| ConfigError::MatchingConfigRead {
        path: path.clone(),
        source,
    })?;
    serde_json::from_str(&raw).map_err(|source| ConfigError::MatchingConfigParse { path, source })
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
}

/// How often the background worker runs a rebalancing pass. `None` disables the worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BalancerSchedule {
    pub interval: Option<Duration>,
}

impl BalancerSchedule {
    pub fn from_secs(secs: u64) -> Self {
        Self {
            interval: (secs > 0).then(|| Duration::from_secs(secs)),
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost {
        source: std::net::AddrParseError,
    },
    InvalidRebalanceInterval(String),
    MatchingConfigRead {
        path: PathBuf,
        source: std::io::Error,
    },
    MatchingConfigParse {
        path: PathBuf,
        source: serde_json::Error,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidRebalanceInterval(value) => write!(
                f,
                "REBALANCE_INTERVAL_SECS must be a whole number of seconds, got '{value}'"
            ),
            ConfigError::MatchingConfigRead { path, .. } => {
                write!(f, "unable to read MATCHING_CONFIG file {}", path.display())
            }
            ConfigError::MatchingConfigParse { path, .. } => {
                write!(f, "MATCHING_CONFIG file {} is not valid JSON", path.display())
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidPort | ConfigError::InvalidRebalanceInterval(_) => None,
            ConfigError::InvalidHost { source } => Some(source),
            ConfigError::MatchingConfigRead { source, .. } => Some(source),
            ConfigError::MatchingConfigParse { source, .. } => Some(source),
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

    fn reset_env() {
        env::remove_var("APP_ENV");
        env::remove_var("APP_HOST");
        env::remove_var("APP_PORT");
        env::remove_var("APP_LOG_LEVEL");
        env::remove_var("REBALANCE_INTERVAL_SECS");
        env::remove_var("MATCHING_CONFIG");
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
        assert_eq!(
            config.balancer.interval,
            Some(Duration::from_secs(DEFAULT_REBALANCE_INTERVAL_SECS))
        );
        assert_eq!(config.matching, MatchingConfig::default());
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
    fn zero_interval_disables_the_worker() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("REBALANCE_INTERVAL_SECS", "0");
        let config = AppConfig::load().expect("config loads");
        assert_eq!(config.balancer.interval, None);

        env::set_var("REBALANCE_INTERVAL_SECS", "soon");
        assert!(matches!(
            AppConfig::load(),
            Err(ConfigError::InvalidRebalanceInterval(value)) if value == "soon"
        ));
        reset_env();
    }

    #[test]
    fn matching_overrides_load_from_json_file() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        let path = env::temp_dir().join(format!("matching-config-{}.json", std::process::id()));
        fs::write(&path, r#"{ "balancer": { "overload_factor": 1.5 } }"#)
            .expect("temp file writable");
        env::set_var("MATCHING_CONFIG", &path);

        let config = AppConfig::load().expect("config loads");
        assert_eq!(config.matching.balancer.overload_factor, 1.5);
        assert_eq!(config.matching.balancer.underload_factor, 0.7);

        fs::write(&path, "not json").expect("temp file writable");
        assert!(matches!(
            AppConfig::load(),
            Err(ConfigError::MatchingConfigParse { .. })
        ));

        fs::remove_file(&path).ok();
        env::set_var("MATCHING_CONFIG", "/nonexistent/matching.json");
        assert!(matches!(
            AppConfig::load(),
            Err(ConfigError::MatchingConfigRead { .. })
        ));
        reset_env();
    }
}
