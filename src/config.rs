use anyhow::Context;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Env var holding the service-account key path; overrides `gcp.credentials_path`.
pub const CREDENTIALS_ENV: &str = "GOOGLE_APPLICATION_CREDENTIALS_PATH";
const DEFAULT_CREDENTIALS_PATH: &str = "~/default/path/to/credentials.json";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub gcp: GcpConfig,
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub report: ReportConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GcpConfig {
    #[serde(default = "default_credentials_path")]
    pub credentials_path: String,
    /// Overrides the project id read from the credential file.
    #[serde(default)]
    pub project_id: Option<String>,
}

impl Default for GcpConfig {
    fn default() -> Self {
        Self {
            credentials_path: default_credentials_path(),
            project_id: None,
        }
    }
}

fn default_credentials_path() -> String {
    DEFAULT_CREDENTIALS_PATH.into()
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_storage_base_url")]
    pub storage_base_url: String,
    #[serde(default = "default_monitoring_base_url")]
    pub monitoring_base_url: String,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            storage_base_url: default_storage_base_url(),
            monitoring_base_url: default_monitoring_base_url(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

fn default_storage_base_url() -> String {
    "https://storage.googleapis.com".into()
}

fn default_monitoring_base_url() -> String {
    "https://monitoring.googleapis.com".into()
}

fn default_request_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReportConfig {
    #[serde(default = "default_window_days")]
    pub window_days: u32,
    /// Alignment period for every metric query (one point per period).
    #[serde(default = "default_alignment_period_secs")]
    pub alignment_period_secs: u64,
    #[serde(default = "default_output_dir")]
    pub output_dir: String,
    #[serde(default = "default_file_prefix")]
    pub file_prefix: String,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            window_days: default_window_days(),
            alignment_period_secs: default_alignment_period_secs(),
            output_dir: default_output_dir(),
            file_prefix: default_file_prefix(),
        }
    }
}

fn default_window_days() -> u32 {
    30
}

fn default_alignment_period_secs() -> u64 {
    86_400
}

fn default_output_dir() -> String {
    ".".into()
}

fn default_file_prefix() -> String {
    "gcs-bucket-metrics-".into()
}

impl AppConfig {
    /// Reads `CONFIG_FILE` (default `config.toml`) if present, else defaults,
    /// then applies the credential path env override.
    pub fn load() -> anyhow::Result<Self> {
        let path = std::env::var("CONFIG_FILE").unwrap_or_else(|_| "config.toml".into());
        let mut config = Self::load_from_path(Path::new(&path))?;
        if let Ok(p) = std::env::var(CREDENTIALS_ENV) {
            config.gcp.credentials_path = p;
        }
        config.validate()?;
        Ok(config)
    }

    /// Parses the file at `path`; a missing file yields defaults.
    pub fn load_from_path(path: &Path) -> anyhow::Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(s) => {
                Self::load_from_str(&s).with_context(|| format!("config {}", path.display()))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(e).with_context(|| format!("config {}", path.display())),
        }
    }

    /// Parse and validate config from a string (e.g. for tests).
    pub fn load_from_str(s: &str) -> anyhow::Result<Self> {
        let config: AppConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Credential path with a leading `~` expanded to the home directory.
    pub fn credentials_path(&self) -> PathBuf {
        expand_home(&self.gcp.credentials_path)
    }

    fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(
            !self.gcp.credentials_path.is_empty(),
            "gcp.credentials_path must be non-empty"
        );
        if let Some(project_id) = &self.gcp.project_id {
            anyhow::ensure!(
                !project_id.is_empty(),
                "gcp.project_id must be non-empty when set"
            );
        }
        anyhow::ensure!(
            !self.api.storage_base_url.is_empty(),
            "api.storage_base_url must be non-empty"
        );
        anyhow::ensure!(
            !self.api.monitoring_base_url.is_empty(),
            "api.monitoring_base_url must be non-empty"
        );
        anyhow::ensure!(
            self.api.request_timeout_secs > 0,
            "api.request_timeout_secs must be > 0, got {}",
            self.api.request_timeout_secs
        );
        anyhow::ensure!(
            self.report.window_days > 0,
            "report.window_days must be > 0, got {}",
            self.report.window_days
        );
        anyhow::ensure!(
            self.report.alignment_period_secs >= 60,
            "report.alignment_period_secs must be >= 60, got {}",
            self.report.alignment_period_secs
        );
        anyhow::ensure!(
            !self.report.file_prefix.is_empty(),
            "report.file_prefix must be non-empty"
        );
        Ok(())
    }
}

fn expand_home(path: &str) -> PathBuf {
    match path.strip_prefix("~/") {
        Some(rest) => match dirs::home_dir() {
            Some(home) => home.join(rest),
            None => Path::new(path).to_path_buf(),
        },
        None => PathBuf::from(path),
    }
}
