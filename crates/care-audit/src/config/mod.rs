use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;

use crate::audits::{AlertThresholds, EngineSettings, LeadTimeConfig, ScoringConfig};

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
            telemetry: TelemetryConfig { log_level },
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
}

/// Tenant-tunable engine dials, read from the environment with library
/// defaults as fallback. Every threshold the engine consults flows through
/// here; nothing is hard-coded at the call sites.
pub fn load_engine_settings() -> Result<EngineSettings, ConfigError> {
    dotenvy::dotenv().ok();

    let defaults = EngineSettings::default();

    let green = parse_or("APP_RAG_GREEN_FLOOR", defaults.scoring.green_floor())?;
    let amber = parse_or("APP_RAG_AMBER_FLOOR", defaults.scoring.amber_floor())?;

    let partial_days = parse_or(
        "APP_ACTION_LEAD_DAYS",
        defaults.lead_times.partial_days(),
    )?;
    let non_compliant_days = parse_or(
        "APP_ACTION_URGENT_LEAD_DAYS",
        defaults.lead_times.non_compliant_days(),
    )?;
    let incident_days = parse_or(
        "APP_ACTION_INCIDENT_LEAD_DAYS",
        defaults.lead_times.incident_days(),
    )?;

    let compliance_floor = parse_or(
        "APP_COMPLIANCE_FLOOR_PCT",
        defaults.thresholds.compliance_floor_pct,
    )?;
    let max_overdue = parse_or(
        "APP_MAX_OVERDUE_ACTIONS",
        defaults.thresholds.max_overdue_actions,
    )?;
    let max_red = parse_or("APP_MAX_RED_INSTANCES", defaults.thresholds.max_red_instances)?;

    let horizon_months = parse_or("APP_PLANNING_HORIZON_MONTHS", defaults.horizon_months)?;

    Ok(EngineSettings {
        scoring: ScoringConfig::new(green, amber),
        lead_times: LeadTimeConfig::new(partial_days, non_compliant_days, incident_days),
        thresholds: AlertThresholds {
            compliance_floor_pct: compliance_floor,
            max_overdue_actions: max_overdue,
            max_red_instances: max_red,
        },
        horizon_months,
        projector: defaults.projector,
    })
}

fn parse_or<T: FromStr>(key: &'static str, fallback: T) -> Result<T, ConfigError> {
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|_| ConfigError::InvalidNumber { key }),
        Err(_) => Ok(fallback),
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidNumber { key: &'static str },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidNumber { key } => {
                write!(f, "{key} must be a valid number")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidPort => None,
            ConfigError::InvalidHost { source } => Some(source),
            ConfigError::InvalidNumber { .. } => None,
        }
    }
}
