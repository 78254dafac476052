use std::path::PathBuf;
use std::time::Duration;

use anyhow::{anyhow, Context};
use serde::Deserialize;

const DEFAULT_ENV: &str = "local";
const ENV_VAR_NAME: &str = "LENDING_ENV";
const CONFIG_DIR_ENV: &str = "LENDING_CONFIG_DIR";

/// Deployment environment the application is running in.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Local,
    Staging,
    Production,
}

impl Environment {
    fn parse(raw: &str) -> anyhow::Result<Self> {
        match raw {
            "local" => Ok(Environment::Local),
            "staging" => Ok(Environment::Staging),
            "production" => Ok(Environment::Production),
            other => Err(anyhow!(
                "unsupported environment '{}'; expected local/staging/production",
                other
            )),
        }
    }
}

/// Top-level configuration structure loaded from layered sources.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Settings {
    #[serde(default)]
    pub environment: Environment,
    #[serde(default)]
    pub scanner: ScannerSettings,
    #[serde(default)]
    pub telemetry: TelemetrySettings,
    #[serde(default)]
    pub demo: DemoSettings,
}

impl Settings {
    /// Load configuration by layering `.env`, base file, and environment overlay.
    pub fn load() -> anyhow::Result<Self> {
        // Allow missing `.env` files without failing.
        let _ = dotenvy::dotenv();

        let environment = std::env::var(ENV_VAR_NAME).unwrap_or_else(|_| DEFAULT_ENV.to_string());
        let config_dir = match std::env::var(CONFIG_DIR_ENV) {
            Ok(dir) => PathBuf::from(dir),
            // Default to repo root `config` directory.
            Err(_) => std::env::current_dir()
                .with_context(|| "unable to resolve current directory")?
                .join("config"),
        };

        Self::load_from(&config_dir, &environment)
    }

    /// Load configuration from an explicit directory and environment name.
    pub fn load_from(config_dir: &std::path::Path, environment: &str) -> anyhow::Result<Self> {
        let base_path = config_dir.join("base.toml");
        let environment_path = config_dir.join(format!("{}.toml", environment));

        let builder = config::Config::builder()
            .add_source(config::File::from(base_path).required(false))
            .add_source(config::File::from(environment_path).required(false))
            .add_source(
                config::Environment::with_prefix("LENDING")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            );

        let cfg = builder
            .build()
            .with_context(|| "failed to build configuration")?;

        let mut settings: Settings = cfg
            .try_deserialize()
            .with_context(|| "failed to deserialize configuration")?;

        // Override environment field with parsed enum variant.
        settings.environment = Environment::parse(environment)?;

        Ok(settings)
    }
}

/// Timing and threshold knobs for the overdue scanner.
#[derive(Debug, Clone, Deserialize)]
pub struct ScannerSettings {
    #[serde(default = "ScannerSettings::default_enabled")]
    pub enabled: bool,
    #[serde(default = "ScannerSettings::default_interval_ms")]
    pub interval_ms: u64,
    #[serde(default = "ScannerSettings::default_overdue_threshold_days")]
    pub overdue_threshold_days: i64,
}

impl ScannerSettings {
    fn default_enabled() -> bool {
        true
    }

    fn default_interval_ms() -> u64 {
        5000
    }

    fn default_overdue_threshold_days() -> i64 {
        7
    }

    /// Sleep between two scanner cycles.
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

impl Default for ScannerSettings {
    fn default() -> Self {
        Self {
            enabled: Self::default_enabled(),
            interval_ms: Self::default_interval_ms(),
            overdue_threshold_days: Self::default_overdue_threshold_days(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TelemetrySettings {
    #[serde(default)]
    pub log_format: LogFormat,
    #[serde(default = "TelemetrySettings::default_log_level")]
    pub log_level: String,
}

impl TelemetrySettings {
    fn default_log_level() -> String {
        "info".to_string()
    }
}

impl Default for TelemetrySettings {
    fn default() -> Self {
        Self {
            log_format: LogFormat::Pretty,
            log_level: Self::default_log_level(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Settings only read by the demo binary.
#[derive(Debug, Clone, Deserialize)]
pub struct DemoSettings {
    #[serde(default = "DemoSettings::default_run_for_ms")]
    pub run_for_ms: u64,
}

impl DemoSettings {
    fn default_run_for_ms() -> u64 {
        10_000
    }

    pub fn run_for(&self) -> Duration {
        Duration::from_millis(self.run_for_ms)
    }
}

impl Default for DemoSettings {
    fn default() -> Self {
        Self {
            run_for_ms: Self::default_run_for_ms(),
        }
    }
}
