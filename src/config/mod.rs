use anyhow::{Context, Result};
use dotenvy::dotenv;
use serde::Deserialize;
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const ENV_PREFIX: &str = "CHIVITO_";
const DEFAULT_FILTER: &str = "info,chivito=debug";

/// Configuration for the application
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// REST backend root, including the `/api` segment
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    /// Directory holding the persisted session files
    #[serde(default = "default_session_dir")]
    pub session_dir: PathBuf,

    #[serde(default = "default_log_file")]
    pub log_file: PathBuf,

    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_api_base_url() -> String {
    "http://127.0.0.1:8002/api".to_string()
}

fn default_data_dir() -> PathBuf {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".chivito")
}

fn default_session_dir() -> PathBuf {
    default_data_dir().join("session")
}

fn default_log_file() -> PathBuf {
    default_data_dir().join("chivito.log")
}

fn default_request_timeout_secs() -> u64 {
    15
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: default_api_base_url(),
            session_dir: default_session_dir(),
            log_file: default_log_file(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl Config {
    /// Load `CHIVITO_*` variables, after pulling in `.env` if present
    pub fn load() -> Result<Self> {
        dotenv().ok();

        let config = envy::prefixed(ENV_PREFIX)
            .from_env::<Config>()
            .context("Invalid CHIVITO_* configuration")?;

        Ok(config)
    }

    /// Apply command line overrides on top of the environment
    pub fn with_overrides(mut self, api_base: Option<String>, session_dir: Option<PathBuf>) -> Self {
        if let Some(api_base) = api_base {
            self.api_base_url = api_base;
        }
        if let Some(session_dir) = session_dir {
            self.session_dir = session_dir;
        }
        self
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Initialize environment variables and load configuration
pub fn init() -> Result<Config> {
    Config::load()
}

/// Route tracing output to the log file so the alternate screen stays clean.
/// `RUST_LOG` overrides the default filter.
pub fn init_logging(log_file: &Path) -> Result<()> {
    if let Some(parent) = log_file.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Could not create {}", parent.display()))?;
    }
    let file: File = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_file)
        .with_context(|| format!("Could not open log file {}", log_file.display()))?;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_ansi(false).with_writer(Mutex::new(file)))
        .try_init()
        .context("Logging was already initialized")?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_apply_when_env_is_empty() {
        let config: Config = envy::prefixed(ENV_PREFIX)
            .from_iter(Vec::<(String, String)>::new())
            .unwrap();
        assert_eq!(config.api_base_url, "http://127.0.0.1:8002/api");
        assert_eq!(config.request_timeout(), Duration::from_secs(15));
        assert!(config.session_dir.ends_with("session"));
    }

    #[test]
    fn test_prefixed_variables_are_read() {
        let vars = vec![
            ("CHIVITO_API_BASE_URL".to_string(), "https://api.example.com/api".to_string()),
            ("CHIVITO_REQUEST_TIMEOUT_SECS".to_string(), "3".to_string()),
            ("UNRELATED".to_string(), "x".to_string()),
        ];
        let config: Config = envy::prefixed(ENV_PREFIX).from_iter(vars).unwrap();
        assert_eq!(config.api_base_url, "https://api.example.com/api");
        assert_eq!(config.request_timeout_secs, 3);
    }

    #[test]
    fn test_cli_overrides_win() {
        let config = Config::default()
            .with_overrides(Some("http://localhost:9000/api".into()), Some(PathBuf::from("/tmp/s")));
        assert_eq!(config.api_base_url, "http://localhost:9000/api");
        assert_eq!(config.session_dir, PathBuf::from("/tmp/s"));
    }

    #[test]
    fn test_bad_timeout_is_rejected() {
        let vars = vec![("CHIVITO_REQUEST_TIMEOUT_SECS".to_string(), "soon".to_string())];
        assert!(envy::prefixed(ENV_PREFIX).from_iter::<_, Config>(vars).is_err());
    }
}
