//! Configuration loading from TOML files and the environment

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use ratingline_core::{RetryPolicy, UploadPolicy};
use ratingline_ttcan::{DEFAULT_BASE_URL, Destinations, HarvestConfig};
use serde::Deserialize;

/// Global configuration for ratingline
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub source: SourceConfig,
    pub harvest: HarvestSection,
    pub http: HttpConfig,
    pub upload: UploadSection,
    pub sheets: SheetsConfig,
    pub storage: StorageConfig,
    /// File the configuration was read from
    #[serde(skip)]
    pub origin: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    pub base_url: String,
    pub category_code: String,
    pub period_issued: String,
    /// `Sex` values to harvest, in order
    pub partitions: Vec<String>,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            category_code: "1".to_string(),
            period_issued: "412".to_string(),
            partitions: vec!["F".to_string()],
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HarvestSection {
    pub max_rating: u32,
    pub history_cutoff_year: i32,
    pub with_history: bool,
    pub fetch_details: bool,
    pub checkpoint_interval: u32,
    pub page_delay_ms: u64,
    pub workers_with_history: usize,
    pub workers_plain: usize,
}

impl Default for HarvestSection {
    fn default() -> Self {
        let d = HarvestConfig::default();
        Self {
            max_rating: d.max_rating,
            history_cutoff_year: d.history_cutoff_year,
            with_history: d.with_history,
            fetch_details: d.fetch_details,
            checkpoint_interval: d.checkpoint_interval,
            page_delay_ms: d.page_delay.as_millis() as u64,
            workers_with_history: d.workers_with_history,
            workers_plain: d.workers_plain,
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Listing page timeout in seconds
    pub listing_timeout: u64,
    /// Detail page timeout in seconds
    pub detail_timeout: u64,
    /// Attempts per request, including the first
    pub max_retries: u32,
    /// Backoff base in milliseconds
    pub backoff_ms: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            listing_timeout: 30,
            detail_timeout: 15,
            max_retries: 3,
            backoff_ms: 1000,
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct UploadSection {
    pub batch_size: usize,
    pub batch_delay_ms: u64,
    pub batch_retries: u32,
    pub session_retries: u32,
    pub session_backoff_secs: u64,
}

impl Default for UploadSection {
    fn default() -> Self {
        let d = UploadPolicy::default();
        Self {
            batch_size: d.batch_size,
            batch_delay_ms: d.batch_delay.as_millis() as u64,
            batch_retries: d.batch_attempts,
            session_retries: d.session_attempts,
            session_backoff_secs: d.session_backoff.as_secs(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SheetsConfig {
    #[serde(deserialize_with = "deserialize_env_var")]
    pub spreadsheet_id: Option<String>,
    /// OAuth bearer token with the spreadsheets scope
    #[serde(deserialize_with = "deserialize_env_var")]
    pub access_token: Option<String>,
    pub records_sheet: String,
    pub history_sheet: String,
}

impl Default for SheetsConfig {
    fn default() -> Self {
        let d = Destinations::default();
        Self {
            spreadsheet_id: None,
            access_token: None,
            records_sheet: d.records,
            history_sheet: d.history,
        }
    }
}

impl SheetsConfig {
    /// Spreadsheet id and token, both required for a live upload
    pub fn credentials(&self) -> Result<(&str, &str)> {
        let id = self
            .spreadsheet_id
            .as_deref()
            .context("sheets.spreadsheet_id (or GOOGLE_SHEET_ID) is required; use --dry-run to write locally")?;
        let token = self
            .access_token
            .as_deref()
            .context("sheets.access_token (or GOOGLE_ACCESS_TOKEN) is required; use --dry-run to write locally")?;
        Ok((id, token))
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Session checkpoints and snapshots
    pub dir: PathBuf,
    /// Append log lines here as well as to stderr
    pub log_file: Option<PathBuf>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("./sessions"),
            log_file: None,
        }
    }
}

/// Deserialize a string that may contain environment variable reference like ${VAR}
fn deserialize_env_var<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let opt: Option<String> = Option::deserialize(deserializer)?;
    Ok(opt.and_then(|s| expand_env_var(&s)))
}

/// Expand ${VAR} to environment variable value
fn expand_env_var(s: &str) -> Option<String> {
    if let Some(var_name) = s.strip_prefix("${").and_then(|s| s.strip_suffix('}')) {
        std::env::var(var_name).ok()
    } else {
        Some(s.to_string())
    }
}

impl Config {
    /// Load configuration from default locations, then apply environment
    /// overrides.
    ///
    /// Search order:
    /// 1. ./ratingline.toml (current directory)
    /// 2. ~/.config/ratingline/config.toml
    ///
    /// If no config file found, starts from defaults.
    pub fn load() -> Result<Self> {
        let mut config = Self::find()?;
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    fn find() -> Result<Self> {
        let local_config = PathBuf::from("ratingline.toml");
        if local_config.exists() {
            return Self::from_file(&local_config);
        }

        if let Some(config_dir) = directories::ProjectDirs::from("", "", "ratingline") {
            let user_config = config_dir.config_dir().join("config.toml");
            if user_config.exists() {
                return Self::from_file(&user_config);
            }
        }
        Ok(Self::default())
    }

    /// Load configuration from a specific file, then apply environment overrides
    pub fn load_from(path: &Path) -> Result<Self> {
        let mut config = Self::from_file(path)?;
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Load configuration from a specific file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let mut config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        config.origin = Some(path.to_path_buf());
        Ok(config)
    }

    /// Environment variables of the deployment override file values
    pub fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) {
        let set = |target: &mut String, key: &str| {
            if let Some(v) = var(key).filter(|v| !v.is_empty()) {
                *target = v;
            }
        };
        set(&mut self.source.base_url, "TTCAN_BASE_URL");
        set(&mut self.source.category_code, "CATEGORY_CODE");
        set(&mut self.source.period_issued, "PERIOD_ISSUED");
        set(&mut self.sheets.records_sheet, "GOOGLE_SHEET_NAME");
        if let Some(sex) = var("SEX") {
            self.source.partitions = sex.split(',').map(|s| s.trim().to_string()).collect();
        }
        if let Some(id) = var("GOOGLE_SHEET_ID").filter(|v| !v.is_empty()) {
            self.sheets.spreadsheet_id = Some(id);
        }
        if let Some(token) = var("GOOGLE_ACCESS_TOKEN").filter(|v| !v.is_empty()) {
            self.sheets.access_token = Some(token);
        }
    }

    pub fn harvest_config(&self) -> HarvestConfig {
        HarvestConfig {
            base_url: self.source.base_url.clone(),
            category_code: self.source.category_code.clone(),
            period_issued: self.source.period_issued.clone(),
            partitions: self.source.partitions.clone(),
            max_rating: self.harvest.max_rating,
            history_cutoff_year: self.harvest.history_cutoff_year,
            with_history: self.harvest.with_history,
            fetch_details: self.harvest.fetch_details,
            checkpoint_interval: self.harvest.checkpoint_interval,
            page_delay: Duration::from_millis(self.harvest.page_delay_ms),
            max_pages: None,
            workers_with_history: self.harvest.workers_with_history,
            workers_plain: self.harvest.workers_plain,
            listing_timeout: Duration::from_secs(self.http.listing_timeout),
            detail_timeout: Duration::from_secs(self.http.detail_timeout),
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.http.max_retries,
            base_delay: Duration::from_millis(self.http.backoff_ms),
        }
    }

    pub fn upload_policy(&self) -> UploadPolicy {
        UploadPolicy {
            batch_size: self.upload.batch_size,
            batch_delay: Duration::from_millis(self.upload.batch_delay_ms),
            batch_attempts: self.upload.batch_retries,
            session_attempts: self.upload.session_retries,
            session_backoff: Duration::from_secs(self.upload.session_backoff_secs),
            ..UploadPolicy::default()
        }
    }

    pub fn destinations(&self) -> Destinations {
        Destinations {
            records: self.sheets.records_sheet.clone(),
            history: self.sheets.history_sheet.clone(),
        }
    }
}
