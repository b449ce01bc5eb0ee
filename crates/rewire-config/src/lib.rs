//! Configuration for the `rewire` tool.
//!
//! A `rewire.toml` has three optional sections:
//!
//! ```toml
//! [catalog]
//! namespace_prefix = "Google\\"
//! client_suffix = "Client"
//! next_gen_segment = "Client"
//! generated_parent_marker = "\\Gapic\\"   # "" disables the check
//! options_parameter = "optionalArgs"
//! setter_prefix = "set"
//!
//! [schema]
//! path = "types.json"                     # relative to the config file
//!
//! [logging]
//! level = "info"
//! json = false
//! stderr = true
//! file = "rewire.log"
//! ```

use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, Once};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing_subscriber::fmt::writer::{BoxMakeWriter, MakeWriterExt};
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

/// Naming conventions used to recognize legacy clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CatalogConfig {
    pub namespace_prefix: String,
    pub client_suffix: String,
    pub next_gen_segment: String,
    /// Substring some ancestor of a legacy client must contain. Empty disables
    /// the check.
    pub generated_parent_marker: String,
    pub options_parameter: String,
    pub setter_prefix: String,
}

impl CatalogConfig {
    pub fn generated_parent_marker(&self) -> Option<&str> {
        Some(self.generated_parent_marker.as_str()).filter(|marker| !marker.is_empty())
    }
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            namespace_prefix: "Google\\".to_owned(),
            client_suffix: "Client".to_owned(),
            next_gen_segment: "Client".to_owned(),
            generated_parent_marker: "\\Gapic\\".to_owned(),
            options_parameter: "optionalArgs".to_owned(),
            setter_prefix: "set".to_owned(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SchemaConfig {
    /// JSON type schema. Relative paths are resolved against the directory of
    /// the config file.
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// A level (`info`, `debug`, ...) or a full `EnvFilter` directive string.
    #[serde(default = "LoggingConfig::default_level")]
    pub level: String,

    /// Emit logs in JSON format.
    #[serde(default)]
    pub json: bool,

    /// Write logs to stderr.
    #[serde(default = "LoggingConfig::default_stderr")]
    pub stderr: bool,

    /// Append logs to the given file path. If the file cannot be opened, file
    /// logging is disabled while stderr logging stays active.
    #[serde(default)]
    pub file: Option<PathBuf>,
}

impl LoggingConfig {
    fn default_level() -> String {
        "warn".to_owned()
    }

    fn default_stderr() -> bool {
        true
    }

    /// Filter directives for this config, with `rust_log` appended so its
    /// per-target directives win over the configured level.
    pub fn filter_directives(&self, rust_log: Option<&str>) -> String {
        let level = level_directive(&self.level);
        match rust_log.map(str::trim).filter(|value| !value.is_empty()) {
            Some(rust_log) => format!("{level},{rust_log}"),
            None => level,
        }
    }

    /// The filter installed by [`init_tracing`]. A `RUST_LOG` value that does
    /// not parse is dropped; a configured level that does not parse falls
    /// back to `warn`.
    pub fn env_filter(&self) -> EnvFilter {
        let rust_log = std::env::var("RUST_LOG").ok();
        EnvFilter::try_new(self.filter_directives(rust_log.as_deref()))
            .or_else(|_| EnvFilter::try_new(self.filter_directives(None)))
            .unwrap_or_else(|_| EnvFilter::new(Self::default_level()))
    }
}

/// Maps level names and their synonyms to `EnvFilter` syntax. Anything else
/// is passed through as a directive string.
fn level_directive(level: &str) -> String {
    let level = level.trim();
    match level.to_ascii_lowercase().as_str() {
        "" => LoggingConfig::default_level(),
        "warning" => "warn".to_owned(),
        known @ ("trace" | "debug" | "info" | "warn" | "error") => known.to_owned(),
        _ => level.to_owned(),
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: Self::default_level(),
            json: false,
            stderr: Self::default_stderr(),
            file: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RewireConfig {
    #[serde(default)]
    pub catalog: CatalogConfig,

    #[serde(default)]
    pub schema: SchemaConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse toml config: {0}")]
    Toml(String),
}

impl From<toml::de::Error> for ConfigError {
    fn from(err: toml::de::Error) -> Self {
        ConfigError::Toml(err.message().to_owned())
    }
}

impl RewireConfig {
    pub fn load_from_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Load a config file from TOML. A relative schema path is resolved
    /// against the file's directory.
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let mut config = Self::load_from_str(&text)?;
        if let Some(dir) = path.parent() {
            config.resolve_relative_paths(dir);
        }
        tracing::debug!(target: "rewire.config", path = %path.display(), "loaded config");
        Ok(config)
    }

    fn resolve_relative_paths(&mut self, dir: &Path) {
        if let Some(schema) = self.schema.path.as_mut() {
            if schema.is_relative() {
                *schema = dir.join(&*schema);
            }
        }
        if let Some(file) = self.logging.file.as_mut() {
            if file.is_relative() {
                *file = dir.join(&*file);
            }
        }
    }
}

pub const REWIRE_CONFIG_ENV_VAR: &str = "REWIRE_CONFIG_PATH";

/// Discover the configuration file for a working root.
///
/// Search order:
/// 1) `REWIRE_CONFIG_PATH` (absolute or relative to `root`)
/// 2) `rewire.toml` in `root`
/// 3) `.rewire.toml` in `root`
pub fn discover_config_path(root: &Path) -> Option<PathBuf> {
    if let Some(value) = std::env::var_os(REWIRE_CONFIG_ENV_VAR) {
        let candidate = PathBuf::from(value);
        let path = if candidate.is_absolute() {
            candidate
        } else {
            root.join(candidate)
        };
        return Some(path.canonicalize().unwrap_or(path));
    }

    ["rewire.toml", ".rewire.toml"]
        .into_iter()
        .map(|name| root.join(name))
        .find(|path| path.is_file())
        .map(|path| path.canonicalize().unwrap_or(path))
}

/// Load the configuration for a working root.
///
/// If no config is present, returns [`RewireConfig::default`] and `None`.
pub fn load_for_root(root: &Path) -> Result<(RewireConfig, Option<PathBuf>), ConfigError> {
    let Some(path) = discover_config_path(root) else {
        return Ok((RewireConfig::default(), None));
    };
    let config = RewireConfig::load_from_path(&path)?;
    Ok((config, Some(path)))
}

static TRACING_INIT: Once = Once::new();

/// Initializes structured `tracing` logging.
///
/// Safe to call multiple times; only the first call installs a global
/// subscriber.
pub fn init_tracing(config: &LoggingConfig) {
    TRACING_INIT.call_once(|| {
        let filter = config.env_filter();

        let file = config
            .file
            .as_ref()
            .and_then(|path| {
                std::fs::OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(path)
                    .ok()
            })
            .map(Mutex::new);
        let file_open_failed = config.file.is_some() && file.is_none();

        let make_writer = match (config.stderr, file) {
            (true, Some(file)) => BoxMakeWriter::new(io::stderr.and(file)),
            (false, Some(file)) => BoxMakeWriter::new(file),
            (true, None) => BoxMakeWriter::new(io::stderr),
            (false, None) => BoxMakeWriter::new(io::sink),
        };

        let layer: Box<dyn tracing_subscriber::Layer<_> + Send + Sync> = if config.json {
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(make_writer)
                .with_ansi(false)
                .boxed()
        } else {
            tracing_subscriber::fmt::layer()
                .with_writer(make_writer)
                .with_ansi(false)
                .boxed()
        };

        let subscriber = tracing_subscriber::registry().with(filter).with(layer);
        if tracing::subscriber::set_global_default(subscriber).is_ok() && file_open_failed {
            if let Some(path) = config.file.as_ref() {
                tracing::warn!(
                    target: "rewire.config",
                    path = %path.display(),
                    "failed to open log file; file logging disabled"
                );
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn level_synonyms_are_normalized() {
        assert_eq!(level_directive(" WARNING "), "warn");
        assert_eq!(level_directive("Debug"), "debug");
        assert_eq!(level_directive(""), "warn");
        assert_eq!(
            level_directive("rewire.refactor=debug"),
            "rewire.refactor=debug"
        );
    }

    #[test]
    fn rust_log_directives_follow_the_configured_level() {
        let logging = LoggingConfig {
            level: "info".to_owned(),
            ..LoggingConfig::default()
        };
        assert_eq!(logging.filter_directives(None), "info");
        assert_eq!(logging.filter_directives(Some("  ")), "info");
        assert_eq!(
            logging.filter_directives(Some("rewire.types=trace")),
            "info,rewire.types=trace"
        );
    }

    #[test]
    fn empty_marker_disables_parent_check() {
        let mut catalog = CatalogConfig::default();
        assert_eq!(catalog.generated_parent_marker(), Some("\\Gapic\\"));
        catalog.generated_parent_marker.clear();
        assert_eq!(catalog.generated_parent_marker(), None);
    }
}
