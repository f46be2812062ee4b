use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;

use crate::reports::export::ExportLimits;
use crate::reports::forms::{PeriodMatch, ReportSettings};

/// Deployment stage; production disables the built-in demo data.
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

    pub fn allows_demo_data(self) -> bool {
        !matches!(self, Self::Production)
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub reports: ReportSettings,
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

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig {
                log_level,
                ansi: environment == AppEnvironment::Development,
            },
            reports: load_report_settings()?,
        })
    }
}

fn load_report_settings() -> Result<ReportSettings, ConfigError> {
    let defaults = ReportSettings::default();

    let period_match = match setting("REPORT_PERIOD_MATCH") {
        Some(raw) => PeriodMatch::parse(&raw).ok_or(ConfigError::InvalidSetting {
            name: "REPORT_PERIOD_MATCH",
            value: raw,
        })?,
        None => defaults.period_match,
    };

    let max_rows = positive("REPORT_MAX_EXPORT_ROWS", defaults.limits.max_rows)?;
    let max_bytes = positive("REPORT_MAX_EXPORT_BYTES", defaults.limits.max_bytes)?;
    let preview_rows = positive("REPORT_PREVIEW_ROWS", defaults.preview_rows)?;

    Ok(ReportSettings {
        period_match,
        limits: ExportLimits {
            max_rows,
            max_bytes,
        },
        preview_rows,
    })
}

fn setting(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn positive<T>(name: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr + PartialOrd + Default,
{
    match setting(name) {
        None => Ok(default),
        Some(raw) => match raw.parse::<T>() {
            Ok(value) if value > T::default() => Ok(value),
            _ => Err(ConfigError::InvalidSetting { name, value: raw }),
        },
    }
}

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

#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    /// Fallback `EnvFilter` directive when `RUST_LOG` is unset.
    pub log_level: String,
    pub ansi: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            ansi: false,
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidSetting { name: &'static str, value: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidSetting { name, value } => {
                write!(f, "{name} has an invalid value '{value}'")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            ConfigError::InvalidPort | ConfigError::InvalidSetting { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Mutex, OnceLock};

    fn env_guard() -> &'static Mutex<()> {
        static GUARD: OnceLock<Mutex<()>> = OnceLock::new();
        GUARD.get_or_init(|| Mutex::new(()))
    }

    fn reset_env() {
        for name in [
            "APP_ENV",
            "APP_HOST",
            "APP_PORT",
            "APP_LOG_LEVEL",
            "REPORT_PERIOD_MATCH",
            "REPORT_MAX_EXPORT_ROWS",
            "REPORT_MAX_EXPORT_BYTES",
            "REPORT_PREVIEW_ROWS",
        ] {
            env::remove_var(name);
        }
    }

    #[test]
    fn load_uses_defaults_when_env_missing() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        let config = AppConfig::load().expect("config loads with defaults");
        assert_eq!(config.environment, AppEnvironment::Development);
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.telemetry.log_level, "info");
        assert_eq!(config.reports, ReportSettings::default());
    }

    #[test]
    fn report_settings_follow_environment() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("REPORT_PERIOD_MATCH", "containment");
        env::set_var("REPORT_MAX_EXPORT_ROWS", "1000");
        env::set_var("REPORT_PREVIEW_ROWS", " 50 ");
        let config = AppConfig::load().expect("config loads");
        reset_env();

        assert_eq!(config.reports.period_match, PeriodMatch::Containment);
        assert_eq!(config.reports.limits.max_rows, 1000);
        assert_eq!(config.reports.preview_rows, 50);
    }

    #[test]
    fn rejects_unknown_period_match_and_zero_caps() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("REPORT_PERIOD_MATCH", "sometimes");
        let error = AppConfig::load().expect_err("unknown period match");
        assert!(matches!(
            error,
            ConfigError::InvalidSetting {
                name: "REPORT_PERIOD_MATCH",
                ..
            }
        ));

        reset_env();
        env::set_var("REPORT_MAX_EXPORT_BYTES", "0");
        let error = AppConfig::load().expect_err("zero byte cap");
        reset_env();
        assert_eq!(
            error.to_string(),
            "REPORT_MAX_EXPORT_BYTES has an invalid value '0'"
        );
    }

    #[test]
    fn production_disables_demo_data() {
        assert!(!AppEnvironment::from_str("prod").allows_demo_data());
        assert!(AppEnvironment::from_str("ci").allows_demo_data());
    }

    #[test]
    fn accepts_localhost_host() {
        let server = ServerConfig {
            host: "localhost".to_string(),
            port: 3000,
        };
        let addr = server.socket_addr().expect("localhost resolves");
        assert_eq!(addr, SocketAddr::new(IpAddr::from([127, 0, 0, 1]), 3000));
    }
}
