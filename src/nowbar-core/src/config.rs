use crate::paths::AppDirs;
use nowbar_format::{FormatError, Formatter, FormatterOptions, Template};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

const CURRENT_CONFIG_VERSION: u32 = 1;

/// The values a template may refer to.
pub const TEMPLATE_FIELDS: [&str; 3] = ["status", "artist", "title"];

/// Fully resolved configuration. Built once at startup from the defaults
/// plus any number of [`ConfigOverrides`] layers, then shared read-only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    pub config_version: u32,
    /// Player bus name, with or without the MPRIS namespace prefix.
    pub player: Option<String>,
    /// Template: `{field}` or `{field:directive}`; fields are status, artist, title.
    pub format: String,
    /// Printed when nothing is playing.
    pub placeholder: String,
    /// Escape `&<>"'` for Pango markup.
    pub markup_escape: bool,
    /// Strip control, private-use and unassigned characters (format characters are kept).
    pub sanitize_unicode: bool,
    /// `PlaybackStatus` value to icon glyph.
    pub status_icons: BTreeMap<String, String>,
    /// Button token (X11 mouse button number) to player method.
    pub mouse_buttons: BTreeMap<String, String>,
    /// Do not print the same line twice in a row.
    pub dedupe: bool,
    pub logging: LoggingConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            config_version: CURRENT_CONFIG_VERSION,
            player: None,
            format: "{status}: {artist} – {title}".to_string(),
            placeholder: String::new(),
            markup_escape: false,
            sanitize_unicode: true,
            status_icons: BTreeMap::from([
                ("Playing".to_string(), "\u{f04b}".to_string()),
                ("Paused".to_string(), "\u{f04c}".to_string()),
                ("Stopped".to_string(), "\u{f04d}".to_string()),
            ]),
            mouse_buttons: BTreeMap::from([("1".to_string(), "PlayPause".to_string())]),
            dedupe: true,
            logging: LoggingConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: LogLevel,
    #[serde(default = "default_max_log_files")]
    pub max_log_files: usize,
    /// Mirror log records to stderr. Stdout carries the status line only.
    #[serde(default)]
    pub stderr: bool,
    #[serde(default)]
    pub file_name: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            max_log_files: default_max_log_files(),
            stderr: false,
            file_name: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_filter_directive(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

/// One layer of user-supplied settings. Scalars replace the value below
/// them; `status_icons`, `mouse_buttons` and `logging` are merged key by key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConfigOverrides {
    pub config_version: Option<u32>,
    pub player: Option<String>,
    pub format: Option<String>,
    pub placeholder: Option<String>,
    pub markup_escape: Option<bool>,
    pub sanitize_unicode: Option<bool>,
    pub status_icons: Option<BTreeMap<String, String>>,
    pub mouse_buttons: Option<BTreeMap<String, String>>,
    pub dedupe: Option<bool>,
    pub logging: Option<LoggingOverrides>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingOverrides {
    pub level: Option<LogLevel>,
    pub max_log_files: Option<usize>,
    pub stderr: Option<bool>,
    pub file_name: Option<String>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config at {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("failed to parse config at {path}: {source}")]
    ParseJson {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("config validation failed: {0}")]
    Validation(ValidationError),
    #[error("failed to prepare configuration directories: {0}")]
    Directories(#[from] crate::paths::DirsError),
}

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("unsupported config_version {found}, expected {expected}")]
    UnsupportedVersion { found: u32, expected: u32 },
    #[error("invalid format template: {0}")]
    Template(#[from] FormatError),
    #[error("format template refers to unknown field '{0}'")]
    UnknownField(String),
}

impl ConfigOverrides {
    /// Reads an override layer: JSON when the file ends in `.json`,
    /// TOML otherwise.
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        if is_json {
            serde_json::from_str(&contents).map_err(|source| ConfigError::ParseJson {
                path: path.to_path_buf(),
                source,
            })
        } else {
            toml::from_str(&contents).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })
        }
    }
}

impl LoggingConfig {
    fn merge(&mut self, overrides: LoggingOverrides) {
        if let Some(level) = overrides.level {
            self.level = level;
        }
        if let Some(max_log_files) = overrides.max_log_files {
            self.max_log_files = max_log_files;
        }
        if let Some(stderr) = overrides.stderr {
            self.stderr = stderr;
        }
        if overrides.file_name.is_some() {
            self.file_name = overrides.file_name;
        }
    }
}

impl Config {
    /// Loads defaults merged with the config file. An explicit `path` must
    /// exist; the default `config.toml` is optional.
    pub fn load(dirs: &AppDirs, path: Option<&Path>) -> Result<Self, ConfigError> {
        let overrides = match path {
            Some(path) => ConfigOverrides::from_path(path)?,
            None => {
                dirs.ensure_exists()?;
                let path = Self::config_path(dirs);
                if !path.exists() {
                    ConfigOverrides::default()
                } else {
                    ConfigOverrides::from_path(&path)?
                }
            }
        };
        Ok(Self::default().merge(overrides))
    }

    pub fn config_path(dirs: &AppDirs) -> PathBuf {
        dirs.config_dir().join("config.toml")
    }

    /// Applies one override layer on top of `self`.
    pub fn merge(mut self, overrides: ConfigOverrides) -> Self {
        if let Some(version) = overrides.config_version {
            self.config_version = version;
        }
        if overrides.player.is_some() {
            self.player = overrides.player;
        }
        if let Some(format) = overrides.format {
            self.format = format;
        }
        if let Some(placeholder) = overrides.placeholder {
            self.placeholder = placeholder;
        }
        if let Some(markup_escape) = overrides.markup_escape {
            self.markup_escape = markup_escape;
        }
        if let Some(sanitize_unicode) = overrides.sanitize_unicode {
            self.sanitize_unicode = sanitize_unicode;
        }
        if let Some(icons) = overrides.status_icons {
            self.status_icons.extend(icons);
        }
        if let Some(buttons) = overrides.mouse_buttons {
            self.mouse_buttons.extend(buttons);
        }
        if let Some(dedupe) = overrides.dedupe {
            self.dedupe = dedupe;
        }
        if let Some(logging) = overrides.logging {
            self.logging.merge(logging);
        }
        self
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.config_version != CURRENT_CONFIG_VERSION {
            return Err(ValidationError::UnsupportedVersion {
                found: self.config_version,
                expected: CURRENT_CONFIG_VERSION,
            });
        }
        let template = self.template()?;
        let unknown = template
            .field_names()
            .find(|name| !TEMPLATE_FIELDS.contains(name));
        if let Some(name) = unknown {
            return Err(ValidationError::UnknownField(name.to_string()));
        }
        Ok(())
    }

    pub fn template(&self) -> Result<Template, FormatError> {
        Template::parse(&self.format)
    }

    pub fn formatter(&self) -> Formatter {
        Formatter::new(FormatterOptions {
            status_icons: self.status_icons.clone(),
            markup_escape: self.markup_escape,
            sanitize_unicode: self.sanitize_unicode,
        })
    }
}

fn default_log_level() -> LogLevel {
    LogLevel::Info
}

fn default_max_log_files() -> usize {
    7
}
