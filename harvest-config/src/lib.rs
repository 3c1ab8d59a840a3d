//! Loader for harvest job configuration with YAML + environment overlays.
//!
//! A configuration file lists harvesting jobs. Each job names a source `kind`
//! (`bluesky`, `bluesky_thread` or `twitter`), the search query, the date range that is
//! cut into windows, the pacing delay and the CSV output path. Source specific knobs
//! live under the job's `config` key.
//!
//! Precedence, lowest first: files/inline YAML in the order they were added, then
//! `HARVEST__`-prefixed environment variables (`__` separates nesting levels, e.g.
//! `HARVEST__LOGGING__FILTER=debug`). After merging, `${VAR}` placeholders in every string
//! are expanded from the process environment.
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;
use time::Date;

const MAXIMUM_ENV_EXPANSION_DEPTH: usize = 8;

/// Replies beyond this many never get their own columns.
pub const MAX_REPLY_SLOTS: usize = 20;

#[derive(Debug, Deserialize)]
pub struct HarvestConfig {
    pub version: Option<String>,
    /// Directory that relative job outputs are resolved against.
    #[serde(default)]
    pub output_dir: Option<PathBuf>,
    #[serde(default)]
    pub logging: LoggingSettings,
    pub jobs: Vec<JobSpec>,
}

#[derive(Debug, Default, Deserialize)]
pub struct LoggingSettings {
    /// `text` or `json`.
    #[serde(default)]
    pub format: Option<String>,
    #[serde(default)]
    pub emit_stderr: Option<bool>,
    #[serde(default)]
    pub dir: Option<PathBuf>,
    /// Default `EnvFilter` directive when `RUST_LOG` is unset.
    #[serde(default)]
    pub filter: Option<String>,
}

/// Shared job fields + the per-kind source details.
#[derive(Debug, Deserialize)]
pub struct JobSpec {
    pub id: String,
    #[serde(default)]
    pub enabled: Option<bool>,
    pub query: String,
    pub start_date: Date,
    /// Exclusive: the last window ends at midnight UTC of this date.
    pub end_date: Date,
    #[serde(default)]
    pub window_days: Option<u32>,
    #[serde(default)]
    pub delay_ms: Option<u64>,
    pub output: PathBuf,
    #[serde(flatten)]
    pub source: SourceDetails,
}

/// The tag is `kind`; the payload lives in `config`.
#[derive(Debug, Deserialize)]
#[serde(tag = "kind")]
pub enum SourceDetails {
    #[serde(rename = "bluesky")]
    Bluesky {
        #[serde(default)]
        config: BlueskyConfig,
    },

    #[serde(rename = "bluesky_thread")]
    BlueskyThread {
        #[serde(default)]
        config: BlueskyThreadConfig,
    },

    #[serde(rename = "twitter")]
    Twitter { config: TwitterConfig },
}

#[derive(Debug, Clone, Deserialize)]
pub struct BlueskyConfig {
    #[serde(default = "default_bluesky_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_sort")]
    pub sort: String,
    /// `null` disables the language filter.
    #[serde(default = "default_lang")]
    pub lang: Option<String>,
    #[serde(default = "default_bluesky_limit")]
    pub limit: u32,
}

impl Default for BlueskyConfig {
    fn default() -> Self {
        Self {
            endpoint: default_bluesky_endpoint(),
            sort: default_sort(),
            lang: default_lang(),
            limit: default_bluesky_limit(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct BlueskyThreadConfig {
    #[serde(flatten)]
    pub search: BlueskyConfig,
    #[serde(default = "default_max_replies")]
    pub max_replies: usize,
    #[serde(default = "default_detail_delay_ms")]
    pub detail_delay_ms: u64,
}

impl Default for BlueskyThreadConfig {
    fn default() -> Self {
        Self {
            search: BlueskyConfig::default(),
            max_replies: default_max_replies(),
            detail_delay_ms: default_detail_delay_ms(),
        }
    }
}

impl BlueskyThreadConfig {
    pub fn reply_slots(&self) -> usize {
        self.max_replies.min(MAX_REPLY_SLOTS)
    }

    pub fn detail_delay(&self) -> Duration {
        Duration::from_millis(self.detail_delay_ms)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TwitterConfig {
    pub auth_token: String,
    #[serde(default = "default_twitter_endpoint")]
    pub endpoint: String,
    /// Use the full-archive endpoint instead of the last-7-days one.
    #[serde(default)]
    pub archive: bool,
    #[serde(default = "default_twitter_max_results")]
    pub max_results: u32,
}

impl TwitterConfig {
    /// False when the token is blank or still holds an unexpanded `${VAR}`.
    pub fn has_token(&self) -> bool {
        !self.auth_token.trim().is_empty() && !self.auth_token.contains("${")
    }
}

fn default_bluesky_endpoint() -> String {
    "https://public.api.bsky.app".into()
}
fn default_twitter_endpoint() -> String {
    "https://api.twitter.com".into()
}
fn default_sort() -> String {
    "latest".into()
}
fn default_lang() -> Option<String> {
    Some("en".into())
}
fn default_bluesky_limit() -> u32 {
    100
}
fn default_twitter_max_results() -> u32 {
    100
}
fn default_max_replies() -> usize {
    MAX_REPLY_SLOTS
}
fn default_detail_delay_ms() -> u64 {
    250
}

impl SourceDetails {
    pub fn kind(&self) -> &'static str {
        match self {
            SourceDetails::Bluesky { .. } => "bluesky",
            SourceDetails::BlueskyThread { .. } => "bluesky_thread",
            SourceDetails::Twitter { .. } => "twitter",
        }
    }

    /// Pause between pages when the job does not set `delay_ms`.
    pub fn default_delay(&self) -> Duration {
        match self {
            SourceDetails::Bluesky { .. } | SourceDetails::BlueskyThread { .. } => {
                Duration::from_secs(5)
            }
            SourceDetails::Twitter { .. } => Duration::from_secs(3),
        }
    }
}

impl JobSpec {
    pub fn is_enabled(&self) -> bool {
        self.enabled.unwrap_or(true)
    }

    pub fn window_days(&self) -> u32 {
        self.window_days.unwrap_or(1)
    }

    pub fn delay(&self) -> Duration {
        self.delay_ms
            .map(Duration::from_millis)
            .unwrap_or_else(|| self.source.default_delay())
    }

    fn validate(&self) -> Result<(), String> {
        if self.id.trim().is_empty() {
            return Err("job id must not be empty".into());
        }
        if self.query.trim().is_empty() {
            return Err(format!("job `{}`: query must not be empty", self.id));
        }
        if self.start_date >= self.end_date {
            return Err(format!(
                "job `{}`: start_date {} must be before end_date {}",
                self.id, self.start_date, self.end_date
            ));
        }
        if self.window_days() == 0 {
            return Err(format!("job `{}`: window_days must be at least 1", self.id));
        }
        if self.output.as_os_str().is_empty() {
            return Err(format!("job `{}`: output must not be empty", self.id));
        }
        // Disabled jobs may keep a placeholder token until someone runs them.
        if let SourceDetails::Twitter { config } = &self.source {
            if self.is_enabled() && !config.has_token() {
                return Err(format!(
                    "job `{}`: twitter auth_token is empty or references an unset variable",
                    self.id
                ));
            }
        }
        Ok(())
    }
}

impl HarvestConfig {
    /// Reject configurations that would fail half-way through a run.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut seen = HashSet::new();
        for job in &self.jobs {
            job.validate().map_err(ConfigError::Message)?;
            if !seen.insert(job.id.as_str()) {
                return Err(ConfigError::Message(format!("duplicate job id `{}`", job.id)));
            }
        }
        Ok(())
    }

    /// Output path of `job`, joined onto `output_dir` when it is relative.
    pub fn output_path(&self, job: &JobSpec) -> PathBuf {
        match &self.output_dir {
            Some(dir) if job.output.is_relative() => dir.join(&job.output),
            _ => job.output.clone(),
        }
    }

    pub fn enabled_jobs(&self) -> impl Iterator<Item = &JobSpec> {
        self.jobs.iter().filter(|j| j.is_enabled())
    }
}

fn expand_env_in_value(v: &mut Value) {
    match v {
        Value::String(s) => {
            if s.contains('$') {
                let mut cur = std::mem::take(s);
                for _ in 0..MAXIMUM_ENV_EXPANSION_DEPTH {
                    let expanded = match shellexpand::env(&cur) {
                        Ok(cow) => cow.into_owned(),
                        Err(_) => cur.clone(),
                    };
                    if expanded == cur {
                        break;
                    }
                    cur = expanded;
                }
                *s = cur;
            }
        }
        Value::Array(arr) => arr.iter_mut().for_each(expand_env_in_value),
        Value::Object(obj) => obj.values_mut().for_each(expand_env_in_value),
        _ => {}
    }
}

/// Builder hides the `config` crate wiring (YAML + env overrides).
pub struct HarvestConfigLoader {
    builder: config::ConfigBuilder<config::builder::DefaultState>,
}

impl Default for HarvestConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl HarvestConfigLoader {
    /// Start with `HARVEST__` environment overrides only; add files or YAML snippets on top.
    ///
    /// ```
    /// use harvest_config::HarvestConfigLoader;
    ///
    /// let config = HarvestConfigLoader::new()
    ///     .with_yaml_str("version: '1'\njobs: []")
    ///     .load()
    ///     .expect("valid config");
    ///
    /// assert_eq!(config.version.as_deref(), Some("1"));
    /// assert!(config.jobs.is_empty());
    /// ```
    pub fn new() -> Self {
        let builder = Config::builder().add_source(
            Environment::with_prefix("HARVEST")
                .separator("__")
                .try_parsing(true),
        );
        Self { builder }
    }

    /// Attach a YAML/TOML/JSON file; the `config` crate infers format by suffix.
    pub fn with_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.builder = self
            .builder
            .add_source(File::from(path.as_ref()).required(true));
        self
    }

    /// Like [`Self::with_file`], but a missing file is skipped.
    pub fn with_optional_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.builder = self
            .builder
            .add_source(File::from(path.as_ref()).required(false));
        self
    }

    /// Merge an inline YAML snippet.
    ///
    /// ```
    /// use harvest_config::{HarvestConfigLoader, SourceDetails};
    ///
    /// let cfg = HarvestConfigLoader::new()
    ///     .with_yaml_str(
    ///         r#"
    /// version: "test"
    /// jobs:
    ///   - id: "bsky"
    ///     kind: "bluesky"
    ///     query: "UnitedHealthcare"
    ///     start_date: "2024-12-04"
    ///     end_date: "2024-12-18"
    ///     output: "bluesky.csv"
    /// "#,
    ///     )
    ///     .load()
    ///     .unwrap();
    ///
    /// assert_eq!(cfg.jobs.len(), 1);
    /// assert!(matches!(cfg.jobs[0].source, SourceDetails::Bluesky { .. }));
    /// assert_eq!(cfg.jobs[0].delay().as_secs(), 5);
    /// ```
    pub fn with_yaml_str(mut self, yaml: &str) -> Self {
        self.builder = self
            .builder
            .add_source(File::from_str(yaml, config::FileFormat::Yaml));
        self
    }

    /// Consume the builder, expand `${VAR}` placeholders and validate the typed result.
    ///
    /// ```
    /// use harvest_config::{HarvestConfigLoader, SourceDetails};
    ///
    /// unsafe { std::env::set_var("DOC_X_TOKEN", "injected-from-env"); }
    ///
    /// let config = HarvestConfigLoader::new()
    ///     .with_yaml_str(r#"
    /// jobs:
    ///   - id: "x"
    ///     kind: "twitter"
    ///     query: "UnitedHealthcare"
    ///     start_date: "2024-12-04"
    ///     end_date: "2024-12-17"
    ///     output: "x.csv"
    ///     config:
    ///       auth_token: "${DOC_X_TOKEN}"
    /// "#)
    ///     .load()
    ///     .expect("valid configuration");
    ///
    /// match &config.jobs[0].source {
    ///     SourceDetails::Twitter { config } => {
    ///         assert_eq!(config.auth_token, "injected-from-env");
    ///         assert_eq!(config.endpoint, "https://api.twitter.com");
    ///         assert_eq!(config.max_results, 100);
    ///     }
    ///     _ => panic!("expected twitter job"),
    /// }
    /// assert_eq!(config.jobs[0].delay().as_secs(), 3);
    ///
    /// unsafe { std::env::remove_var("DOC_X_TOKEN"); }
    /// ```
    pub fn load(self) -> Result<HarvestConfig, ConfigError> {
        let cfg = self.builder.build()?;

        let mut v: Value = cfg.try_deserialize()?;
        expand_env_in_value(&mut v);

        let typed: HarvestConfig =
            serde_json::from_value(v).map_err(|e| ConfigError::Message(e.to_string()))?;
        typed.validate()?;

        Ok(typed)
    }
}
