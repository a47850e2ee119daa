//! `lr.toml` loading for the live reload CLI.
//!
//! The file is found by walking up from the working directory. Command-line
//! flags are layered on top through [`CliSettings`], and the result is turned
//! into [`PluginOptions`] with [`Config::plugin_options`].
//!
//! ```toml
//! [server]
//! host = "0.0.0.0"
//! port = 35729          # 0 picks a free port from 35729 upwards
//!
//! [reload]
//! ignore = ["*.map", "/\\.hot-update\\./"]
//! use_source_hash = true
//! delay_ms = 200
//!
//! [client]
//! append_script_tag = true
//! hostname = "${LR_HOST:-localhost}"
//!
//! [watch]
//! output_dir = "dist"
//! ```
//!
//! ## Environment variables
//!
//! `${VAR}` must be set; `${VAR:-default}` falls back to `default`. Only
//! these fields are expanded:
//! - `server.host`
//! - `client.hostname`

mod expand;

use std::path::{Path, PathBuf};
use std::time::Duration;

use lr_core::{FailurePolicy, IgnoreSpec, PluginOptions};
use serde::Deserialize;

/// Command-line overrides. `None` leaves the file value in place.
#[derive(Debug, Default)]
pub struct CliSettings {
    /// Override server host.
    pub host: Option<String>,
    /// Override reload channel port.
    pub port: Option<u16>,
    /// Override watched output directory.
    pub output_dir: Option<PathBuf>,
    /// Replace ignore patterns.
    pub ignore: Option<Vec<String>>,
    /// Override quiet flag.
    pub quiet: Option<bool>,
    /// Override notification delay.
    pub delay_ms: Option<u64>,
    /// Override content hash diffing.
    pub use_source_hash: Option<bool>,
    /// Override size diffing.
    pub use_source_size: Option<bool>,
}

/// Configuration filename to search for.
const CONFIG_FILENAME: &str = "lr.toml";

/// Protocols accepted for `client.protocol` (empty follows the page).
const CLIENT_PROTOCOLS: [&str; 5] = ["", "http", "https", "ws", "wss"];

/// Application configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Reload channel server configuration.
    pub server: ServerConfig,
    /// Change detection configuration.
    pub reload: ReloadConfig,
    /// Client script configuration.
    pub client: ClientConfig,
    /// Watch configuration (paths are relative strings from TOML).
    watch: WatchConfigRaw,

    /// Resolved watch configuration (set after loading).
    #[serde(skip)]
    pub watch_resolved: WatchConfig,
    /// Path to the config file (set after loading).
    #[serde(skip)]
    pub config_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self::default_with_base(Path::new("."))
    }
}

/// Reload channel server configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address the reload channel binds to.
    pub host: String,
    /// Reload channel port (`0` discovers a free one).
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_owned(),
            port: lr_core::DEFAULT_PORT,
        }
    }
}

/// Change detection configuration.
#[allow(clippy::struct_excessive_bools)]
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ReloadConfig {
    /// Asset names never reported (globs, or `/regex/`).
    #[serde(deserialize_with = "one_or_many")]
    pub ignore: Vec<String>,
    /// Suppress the "listening" message.
    pub quiet: bool,
    /// Diff assets by content digest.
    pub use_source_hash: bool,
    /// Diff assets by byte size.
    pub use_source_size: bool,
    /// Delay between build completion and notification.
    pub delay_ms: u64,
    /// Forget per-asset sizes and digests after a failed build.
    pub reset_on_failure: bool,
}

/// Client script configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Prefix the client script to entry code.
    pub append_script_tag: bool,
    /// Host the browser connects to (defaults to the page's host).
    pub hostname: Option<String>,
    /// Protocol the browser connects with (empty follows the page).
    pub protocol: String,
}

/// Raw watch configuration as parsed from TOML (paths as strings).
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct WatchConfigRaw {
    output_dir: Option<String>,
    debounce_ms: Option<u64>,
}

/// Resolved watch configuration with absolute paths.
#[derive(Debug)]
pub struct WatchConfig {
    /// Build output directory to watch.
    pub output_dir: PathBuf,
    /// Quiet period before a change batch counts as one build.
    pub debounce: Duration,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("dist"),
            debounce: Duration::from_millis(DEFAULT_DEBOUNCE_MS),
        }
    }
}

const DEFAULT_DEBOUNCE_MS: u64 = 100;

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File not found.
    #[error("Configuration file not found: {}", .0.display())]
    NotFound(PathBuf),
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// TOML parsing error.
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),
    /// Validation error.
    #[error("Configuration error: {0}")]
    Validation(String),
    /// `${VAR}` reference to an unset variable.
    #[error("Environment variable error in {field}: {message}")]
    EnvVar {
        /// Config field path (e.g., "`client.hostname`").
        field: String,
        /// Error message (e.g., "${`LR_HOST`} not set").
        message: String,
    },
}

/// Reject blank strings.
fn require_non_empty(value: &str, field: &str) -> Result<(), ConfigError> {
    if value.is_empty() {
        return Err(ConfigError::Validation(format!("{field} cannot be empty")));
    }
    Ok(())
}

/// Accept either a single string or a list of strings.
fn one_or_many<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
    }

    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::One(pattern) => vec![pattern],
        OneOrMany::Many(patterns) => patterns,
    })
}

impl Config {
    /// Load `config_path`, or the nearest `lr.toml`, or built-in defaults.
    ///
    /// `cli_settings` win over the file; the merged result is validated.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for a missing explicit path, and parse, expansion or
    /// validation errors.
    pub fn load(
        config_path: Option<&Path>,
        cli_settings: Option<&CliSettings>,
    ) -> Result<Self, ConfigError> {
        let mut config = if let Some(path) = config_path {
            if !path.exists() {
                return Err(ConfigError::NotFound(path.to_path_buf()));
            }
            Self::load_from_file(path)?
        } else if let Some(discovered) = Self::discover_config() {
            Self::load_from_file(&discovered)?
        } else {
            Self::default_with_cwd()
        };

        if let Some(settings) = cli_settings {
            config.apply_cli_settings(settings);
            config.validate()?;
        }

        Ok(config)
    }

    fn apply_cli_settings(&mut self, settings: &CliSettings) {
        if let Some(host) = &settings.host {
            self.server.host.clone_from(host);
        }
        if let Some(port) = settings.port {
            self.server.port = port;
        }
        if let Some(output_dir) = &settings.output_dir {
            self.watch_resolved.output_dir.clone_from(output_dir);
        }
        if let Some(ignore) = &settings.ignore {
            self.reload.ignore.clone_from(ignore);
        }
        if let Some(quiet) = settings.quiet {
            self.reload.quiet = quiet;
        }
        if let Some(delay_ms) = settings.delay_ms {
            self.reload.delay_ms = delay_ms;
        }
        if let Some(use_source_hash) = settings.use_source_hash {
            self.reload.use_source_hash = use_source_hash;
        }
        if let Some(use_source_size) = settings.use_source_size {
            self.reload.use_source_size = use_source_size;
        }
    }

    /// Compile the ignore patterns.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` naming the first invalid pattern.
    pub fn ignore_spec(&self) -> Result<IgnoreSpec, ConfigError> {
        IgnoreSpec::new(&self.reload.ignore)
            .map_err(|e| ConfigError::Validation(format!("reload.ignore: {e}")))
    }

    /// Build plugin options from the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` if an ignore pattern does not compile.
    pub fn plugin_options(&self) -> Result<PluginOptions, ConfigError> {
        let failure_policy = if self.reload.reset_on_failure {
            FailurePolicy::ResetDiffState
        } else {
            FailurePolicy::KeepDiffState
        };

        Ok(PluginOptions {
            port: self.server.port,
            ignore: self.ignore_spec()?,
            quiet: self.reload.quiet,
            use_source_hash: self.reload.use_source_hash,
            use_source_size: self.reload.use_source_size,
            append_script_tag: self.client.append_script_tag,
            delay: Duration::from_millis(self.reload.delay_ms),
            hostname: self.client.hostname.clone(),
            protocol: self.client.protocol.clone(),
            failure_policy,
        })
    }

    /// Nearest `lr.toml` from the working directory upwards.
    fn discover_config() -> Option<PathBuf> {
        let mut current = std::env::current_dir().ok()?;
        loop {
            let candidate = current.join(CONFIG_FILENAME);
            if candidate.exists() {
                return Some(candidate);
            }
            if !current.pop() {
                return None;
            }
        }
    }

    /// Defaults rooted at the working directory.
    fn default_with_cwd() -> Self {
        let cwd = std::env::current_dir().unwrap_or_default();
        Self::default_with_base(&cwd)
    }

    /// Defaults with `output_dir` under `base`.
    fn default_with_base(base: &Path) -> Self {
        Self {
            server: ServerConfig::default(),
            reload: ReloadConfig::default(),
            client: ClientConfig::default(),
            watch: WatchConfigRaw::default(),
            watch_resolved: WatchConfig {
                output_dir: base.join("dist"),
                ..WatchConfig::default()
            },
            config_path: None,
        }
    }

    fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Self = toml::from_str(&content)?;

        config.expand_env_vars()?;

        let config_dir = path.parent().unwrap_or(Path::new("."));
        config.resolve_paths(config_dir);
        config.config_path = Some(path.to_path_buf());

        config.validate()?;

        Ok(config)
    }

    /// Check host, client protocol, ignore patterns and debounce.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` describing the first bad value.
    pub fn validate(&self) -> Result<(), ConfigError> {
        require_non_empty(&self.server.host, "server.host")?;
        self.validate_reload()?;
        self.validate_client()?;
        self.validate_watch()?;
        Ok(())
    }

    fn validate_reload(&self) -> Result<(), ConfigError> {
        self.ignore_spec().map(|_| ())
    }

    fn validate_client(&self) -> Result<(), ConfigError> {
        if !CLIENT_PROTOCOLS.contains(&self.client.protocol.as_str()) {
            return Err(ConfigError::Validation(format!(
                "client.protocol must be one of http, https, ws, wss (got `{}`)",
                self.client.protocol
            )));
        }
        if let Some(hostname) = &self.client.hostname {
            require_non_empty(hostname, "client.hostname")?;
        }
        Ok(())
    }

    fn validate_watch(&self) -> Result<(), ConfigError> {
        if self.watch_resolved.debounce.is_zero() {
            return Err(ConfigError::Validation(
                "watch.debounce_ms must be greater than 0".to_owned(),
            ));
        }
        Ok(())
    }

    fn expand_env_vars(&mut self) -> Result<(), ConfigError> {
        self.server.host = expand::expand_env(&self.server.host, "server.host")?;

        if let Some(ref hostname) = self.client.hostname {
            self.client.hostname = Some(expand::expand_env(hostname, "client.hostname")?);
        }

        Ok(())
    }

    /// Anchor `watch.output_dir` at the config file's directory.
    fn resolve_paths(&mut self, config_dir: &Path) {
        self.watch_resolved = WatchConfig {
            output_dir: config_dir.join(self.watch.output_dir.as_deref().unwrap_or("dist")),
            debounce: Duration::from_millis(self.watch.debounce_ms.unwrap_or(DEFAULT_DEBOUNCE_MS)),
        };
    }
}
