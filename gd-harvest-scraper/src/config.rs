use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use gd_harvest_core::{DEFAULT_HOME, FIRST_ARCHIVE_YEAR};
use gd_harvest_lib::settings;
use tokio::time::Duration;

use crate::circuit::default_socks_ports;
use crate::error::HarvestError;

pub const DEFAULT_PROXY_HOST: &str = "127.0.0.1";
pub const DEFAULT_CONTROL_PORT: u16 = 9051;
pub const DEFAULT_CONTROL_PASSWORD: &str = "password";

const MAX_BACKOFF: Duration = Duration::from_secs(60);

/// How failed requests are retried.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts per request, the first one included. At least 1.
    pub max_attempts: u32,
    /// Delay before the second attempt; doubles for every further one.
    pub backoff: Duration,
    /// Ask the control port for a new circuit when the archive blocks us.
    pub rotate_on_block: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff: Duration::from_secs(2),
            rotate_on_block: true,
        }
    }
}

impl RetryPolicy {
    /// A policy that never retries.
    pub fn once() -> Self {
        Self {
            max_attempts: 1,
            backoff: Duration::ZERO,
            rotate_on_block: false,
        }
    }

    /// Delay to wait after failed attempt number `attempt` (1-based).
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let factor = 1u32 << attempt.saturating_sub(1).min(16);
        self.backoff.saturating_mul(factor).min(MAX_BACKOFF)
    }
}

/// Everything a harvest run needs to know, fully resolved.
#[derive(Debug, Clone)]
pub struct HarvestConfig {
    /// Archive root URL
    pub home: String,
    /// Where game directories are written (None = current directory)
    pub output_dir: Option<PathBuf>,
    /// Route requests through the SOCKS proxies
    pub use_proxy: bool,
    pub proxy_host: String,
    /// One circuit per port; also caps the session count
    pub socks_ports: Vec<u16>,
    pub control_port: u16,
    pub control_password: String,
    /// Session / worker count (None = available parallelism)
    pub sessions: Option<usize>,
    /// First season for `all`
    pub start_year: i32,
    pub request_timeout: Duration,
    /// Safety net for one game fetch, retries included
    pub item_timeout: Duration,
    pub retry: RetryPolicy,
    /// Rotate a circuit after every N requests on it
    pub rotate_every: Option<u32>,
}

impl Default for HarvestConfig {
    fn default() -> Self {
        Self {
            home: DEFAULT_HOME.to_string(),
            output_dir: None,
            use_proxy: true,
            proxy_host: DEFAULT_PROXY_HOST.to_string(),
            socks_ports: default_socks_ports(),
            control_port: DEFAULT_CONTROL_PORT,
            control_password: DEFAULT_CONTROL_PASSWORD.to_string(),
            sessions: None,
            start_year: FIRST_ARCHIVE_YEAR,
            request_timeout: Duration::from_secs(30),
            item_timeout: Duration::from_secs(300),
            retry: RetryPolicy::default(),
            rotate_every: None,
        }
    }
}

/// Where a config value came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    /// Loaded from an environment variable.
    EnvVar(&'static str),
    /// Loaded from the config file.
    ConfigFile,
    /// Given on the command line.
    CommandLine,
    /// Built-in default.
    Default,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EnvVar(var) => write!(f, "env ${}", var),
            Self::ConfigFile => write!(f, "config file"),
            Self::CommandLine => write!(f, "command line"),
            Self::Default => write!(f, "default"),
        }
    }
}

/// Provenance of each config key, keyed by its config file name.
pub type ConfigSources = BTreeMap<&'static str, ConfigSource>;

/// TOML config file format.
#[derive(Debug, Default, serde::Deserialize, serde::Serialize)]
struct ConfigFile {
    harvest: Option<FileSection>,
}

#[derive(Debug, Default, serde::Deserialize, serde::Serialize)]
struct FileSection {
    home: Option<String>,
    output_dir: Option<PathBuf>,
    use_proxy: Option<bool>,
    proxy_host: Option<String>,
    socks_ports: Option<Vec<u16>>,
    control_port: Option<u16>,
    control_password: Option<String>,
    sessions: Option<usize>,
    start_year: Option<i32>,
    request_timeout_secs: Option<u64>,
    item_timeout_secs: Option<u64>,
    max_attempts: Option<u32>,
    backoff_ms: Option<u64>,
    rotate_on_block: Option<bool>,
    rotate_every: Option<u32>,
}

impl HarvestConfig {
    /// Load from environment variables, the config file, then defaults.
    ///
    /// Priority: env vars > config file > defaults. A missing config file is
    /// fine; an unreadable or invalid one is an error.
    pub fn load() -> Result<(Self, ConfigSources), HarvestError> {
        let file = match settings::config_path() {
            Some(path) if path.exists() => Some(read_config_file(&path)?),
            _ => None,
        };
        Self::resolve(file.unwrap_or_default(), |var| std::env::var(var).ok())
    }

    /// Parse a config file body (the `[harvest]` table) on top of defaults.
    pub fn from_toml_str(contents: &str) -> Result<Self, HarvestError> {
        let section = parse_config(contents)?;
        Ok(Self::resolve(section, |_| None)?.0)
    }

    fn resolve(
        file: FileSection,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<(Self, ConfigSources), HarvestError> {
        let defaults = Self::default();
        let mut sources = ConfigSources::new();

        let home = layer(
            &mut sources,
            "home",
            env_value(&env, "GD_HARVEST_HOME")?,
            file.home,
            defaults.home,
        );
        let output_dir = layer(
            &mut sources,
            "output_dir",
            env_value::<PathBuf>(&env, "GD_HARVEST_OUTPUT")?.map(|(v, var)| (Some(v), var)),
            file.output_dir.map(Some),
            defaults.output_dir,
        );
        let use_proxy = layer(
            &mut sources,
            "use_proxy",
            env_value(&env, "GD_HARVEST_USE_PROXY")?,
            file.use_proxy,
            defaults.use_proxy,
        );
        let proxy_host = layer(
            &mut sources,
            "proxy_host",
            None,
            file.proxy_host,
            defaults.proxy_host,
        );
        let socks_ports = layer(
            &mut sources,
            "socks_ports",
            None,
            file.socks_ports,
            defaults.socks_ports,
        );
        let control_port = layer(
            &mut sources,
            "control_port",
            env_value(&env, "GD_HARVEST_CONTROL_PORT")?,
            file.control_port,
            defaults.control_port,
        );
        let control_password = layer(
            &mut sources,
            "control_password",
            env_value(&env, "GD_HARVEST_TOR_PASSWORD")?,
            file.control_password,
            defaults.control_password,
        );
        let sessions = layer(
            &mut sources,
            "sessions",
            env_value::<usize>(&env, "GD_HARVEST_SESSIONS")?.map(|(v, var)| (Some(v), var)),
            file.sessions.map(Some),
            defaults.sessions,
        );
        let start_year = layer(
            &mut sources,
            "start_year",
            None,
            file.start_year,
            defaults.start_year,
        );
        let request_timeout = layer(
            &mut sources,
            "request_timeout_secs",
            None,
            file.request_timeout_secs.map(Duration::from_secs),
            defaults.request_timeout,
        );
        let item_timeout = layer(
            &mut sources,
            "item_timeout_secs",
            None,
            file.item_timeout_secs.map(Duration::from_secs),
            defaults.item_timeout,
        );
        let max_attempts = layer(
            &mut sources,
            "max_attempts",
            None,
            file.max_attempts,
            defaults.retry.max_attempts,
        );
        let backoff = layer(
            &mut sources,
            "backoff_ms",
            None,
            file.backoff_ms.map(Duration::from_millis),
            defaults.retry.backoff,
        );
        let rotate_on_block = layer(
            &mut sources,
            "rotate_on_block",
            None,
            file.rotate_on_block,
            defaults.retry.rotate_on_block,
        );
        let rotate_every = layer(
            &mut sources,
            "rotate_every",
            None,
            file.rotate_every.map(Some),
            defaults.rotate_every,
        );

        let config = Self {
            home,
            output_dir,
            use_proxy,
            proxy_host,
            socks_ports,
            control_port,
            control_password,
            sessions,
            start_year,
            request_timeout,
            item_timeout,
            retry: RetryPolicy {
                max_attempts,
                backoff,
                rotate_on_block,
            },
            rotate_every,
        };
        config.validate()?;
        Ok((config, sources))
    }

    /// Apply command-line values on top of the loaded config.
    pub fn with_overrides(
        mut self,
        sources: &mut ConfigSources,
        output_dir: Option<PathBuf>,
        sessions: Option<usize>,
        no_proxy: bool,
    ) -> Result<Self, HarvestError> {
        if let Some(dir) = output_dir {
            self.output_dir = Some(dir);
            sources.insert("output_dir", ConfigSource::CommandLine);
        }
        if let Some(n) = sessions {
            self.sessions = Some(n);
            sources.insert("sessions", ConfigSource::CommandLine);
        }
        if no_proxy {
            self.use_proxy = false;
            sources.insert("use_proxy", ConfigSource::CommandLine);
        }
        self.validate()?;
        Ok(self)
    }

    /// Session pool size: requested or available parallelism, capped by the
    /// number of proxy circuits when proxying.
    pub fn session_count(&self) -> usize {
        let wanted = self.sessions.unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
        });
        let capped = if self.use_proxy {
            wanted.min(self.socks_ports.len())
        } else {
            wanted
        };
        capped.max(1)
    }

    /// Output root after applying the current-directory fallback.
    pub fn output_root(&self) -> PathBuf {
        settings::resolve_output_dir(None, self.output_dir.clone())
    }

    /// Control port address, e.g. `127.0.0.1:9051`.
    pub fn control_addr(&self) -> String {
        format!("{}:{}", self.proxy_host, self.control_port)
    }

    /// `(key, value)` pairs for display; the password is masked.
    pub fn display_values(&self) -> Vec<(&'static str, String)> {
        let ports = self
            .socks_ports
            .iter()
            .map(|p| p.to_string())
            .collect::<Vec<_>>()
            .join(",");
        vec![
            ("home", self.home.clone()),
            ("output_dir", self.output_root().display().to_string()),
            ("use_proxy", self.use_proxy.to_string()),
            ("proxy_host", self.proxy_host.clone()),
            ("socks_ports", ports),
            ("control_port", self.control_port.to_string()),
            ("control_password", "*".repeat(self.control_password.len().min(8))),
            ("sessions", self.session_count().to_string()),
            ("start_year", self.start_year.to_string()),
            ("request_timeout_secs", self.request_timeout.as_secs().to_string()),
            ("item_timeout_secs", self.item_timeout.as_secs().to_string()),
            ("max_attempts", self.retry.max_attempts.to_string()),
            ("backoff_ms", self.retry.backoff.as_millis().to_string()),
            ("rotate_on_block", self.retry.rotate_on_block.to_string()),
            (
                "rotate_every",
                self.rotate_every
                    .map(|n| n.to_string())
                    .unwrap_or_else(|| "off".to_string()),
            ),
        ]
    }

    fn validate(&self) -> Result<(), HarvestError> {
        if self.retry.max_attempts == 0 {
            return Err(HarvestError::config("max_attempts must be at least 1"));
        }
        if self.use_proxy && self.socks_ports.is_empty() {
            return Err(HarvestError::config("socks_ports is empty but use_proxy is on"));
        }
        if self.sessions == Some(0) {
            return Err(HarvestError::config("sessions must be at least 1"));
        }
        if self.rotate_every == Some(0) {
            return Err(HarvestError::config("rotate_every must be at least 1"));
        }
        if !self.home.starts_with("http://") && !self.home.starts_with("https://") {
            return Err(HarvestError::config(format!(
                "home must be an http(s) URL, got '{}'",
                self.home
            )));
        }
        Ok(())
    }
}

/// Write a config file holding every default, creating parent directories.
/// Returns the path written. Refuses to overwrite an existing file.
pub fn write_default_config() -> Result<PathBuf, HarvestError> {
    let path = settings::config_path()
        .ok_or_else(|| HarvestError::config("Could not determine config directory"))?;
    if path.exists() {
        return Err(HarvestError::config(format!(
            "{} already exists",
            path.display()
        )));
    }

    let defaults = HarvestConfig::default();
    let file = ConfigFile {
        harvest: Some(FileSection {
            home: Some(defaults.home),
            output_dir: None,
            use_proxy: Some(defaults.use_proxy),
            proxy_host: Some(defaults.proxy_host),
            socks_ports: Some(defaults.socks_ports),
            control_port: Some(defaults.control_port),
            control_password: Some(defaults.control_password),
            sessions: None,
            start_year: Some(defaults.start_year),
            request_timeout_secs: Some(defaults.request_timeout.as_secs()),
            item_timeout_secs: Some(defaults.item_timeout.as_secs()),
            max_attempts: Some(defaults.retry.max_attempts),
            backoff_ms: Some(defaults.retry.backoff.as_millis() as u64),
            rotate_on_block: Some(defaults.retry.rotate_on_block),
            rotate_every: None,
        }),
    };
    let toml_str = toml::to_string_pretty(&file)
        .map_err(|e| HarvestError::config(format!("Failed to serialize config: {}", e)))?;
    settings::write_atomically(&path, toml_str.as_bytes())?;
    Ok(path)
}

fn read_config_file(path: &Path) -> Result<FileSection, HarvestError> {
    let contents = std::fs::read_to_string(path)?;
    parse_config(&contents)
        .map_err(|e| HarvestError::config(format!("{}: {}", path.display(), e)))
}

fn parse_config(contents: &str) -> Result<FileSection, HarvestError> {
    let file: ConfigFile = toml::from_str(contents)
        .map_err(|e| HarvestError::config(format!("Invalid config file: {}", e)))?;
    Ok(file.harvest.unwrap_or_default())
}

/// Read and parse one environment variable, if set.
fn env_value<T: std::str::FromStr>(
    env: &impl Fn(&str) -> Option<String>,
    var: &'static str,
) -> Result<Option<(T, &'static str)>, HarvestError> {
    match env(var) {
        Some(raw) => raw
            .trim()
            .parse()
            .map(|v| Some((v, var)))
            .map_err(|_| HarvestError::config(format!("${} has an invalid value: '{}'", var, raw))),
        None => Ok(None),
    }
}

/// Pick env > file > default for one key and record where it came from.
fn layer<T>(
    sources: &mut ConfigSources,
    key: &'static str,
    from_env: Option<(T, &'static str)>,
    from_file: Option<T>,
    default: T,
) -> T {
    if let Some((value, var)) = from_env {
        sources.insert(key, ConfigSource::EnvVar(var));
        value
    } else if let Some(value) = from_file {
        sources.insert(key, ConfigSource::ConfigFile);
        value
    } else {
        sources.insert(key, ConfigSource::Default);
        default
    }
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
