use std::env;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, bail};

/// Which transport realization serves the workflows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeploymentTarget {
    /// Hosted HTTP backend, multipart uploads.
    Hosted,
    /// Local generation engine driven as child processes.
    Local,
}

impl DeploymentTarget {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeploymentTarget::Hosted => "hosted",
            DeploymentTarget::Local => "local",
        }
    }
}

impl fmt::Display for DeploymentTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeploymentTarget {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "hosted" | "remote" => Ok(DeploymentTarget::Hosted),
            "local" | "desktop" => Ok(DeploymentTarget::Local),
            other => bail!("unknown deployment target '{other}', expected 'hosted' or 'local'"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub environment: String,
    pub deployment_target: DeploymentTarget,
    pub backend_url: String,
    pub engine_command: String,
    pub readiness_command: String,
    pub required_model: String,
    pub output_dir: PathBuf,
    pub settle_delay: Duration,
    pub otel_service_name: String,
    pub otel_exporter_endpoint: String,
}

fn var_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parse_var<T>(key: &str, default: &str) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    let raw = var_or(key, default);
    raw.parse::<T>()
        .map_err(|e| anyhow::anyhow!("{e}"))
        .with_context(|| format!("{key} has an invalid value '{raw}'"))
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        Ok(Self {
            port: parse_var("APP_PORT", "8080")?,
            environment: var_or("ENVIRONMENT", "development"),
            deployment_target: parse_var("DEPLOYMENT_TARGET", "hosted")?,
            backend_url: var_or("BACKEND_URL", "http://localhost:8000"),
            engine_command: var_or("ENGINE_COMMAND", "swot-engine"),
            readiness_command: var_or("READINESS_COMMAND", "ollama"),
            required_model: var_or("REQUIRED_MODEL", "llama3.2:3b"),
            output_dir: PathBuf::from(var_or("OUTPUT_DIR", ".")),
            settle_delay: Duration::from_millis(parse_var("SETTLE_DELAY_MS", "1000")?),
            otel_service_name: var_or("OTEL_SERVICE_NAME", "swot-orchestrator"),
            otel_exporter_endpoint: var_or(
                "OTEL_EXPORTER_OTLP_ENDPOINT",
                "http://localhost:4317",
            ),
        })
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}
