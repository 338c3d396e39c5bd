//! Application configuration loading and validation.
//!
//! The configuration is an INI file with two sections:
//!
//! ```ini
//! [mqtt]
//! username = hass
//! password = secret
//! host = 192.168.1.10
//! port = 1883
//!
//! [publish]
//! topic = home/eh203/
//! values = Ulkolampotila, L1 Menovesi
//! ```
//!
//! Presence checks run first and collect every problem they find, so one run
//! reports the whole list instead of stopping at the first missing key. Typed
//! constraints are then checked with `validator`. The result is immutable for
//! the rest of the run.

use std::{
    env, fmt, fs,
    num::NonZeroU16,
    path::{Path, PathBuf},
    str::FromStr,
};

use ini::{Ini, ParseOption, Properties};
use tracing::{debug, info};
use validator::Validate;

pub mod logger;
pub mod publish;

pub use publish::PublishSettings;

/// Broker settings; the session crate owns the type and its constraints.
pub type MqttSettings = ouman_bridge_mqtt::Config;

/// Environment variable naming the configuration file.
pub const CONFIG_ENV: &str = "OUMAN_BRIDGE_CONFIG";

/// Looked up in the working directory when nothing else is given.
pub const DEFAULT_CONFIG_FILE: &str = "ouman-collector.ini";

/// Prints a timestamped error line before the tracing subscriber exists.
#[macro_export]
macro_rules! print_error {
    ($($arg:tt)*) => {
        eprintln!("{}  {} {}",
            console::style(
                time::OffsetDateTime::now_utc()
                    .format(&time::format_description::well_known::Rfc3339)
                    .unwrap_or_default()
            ).dim(),
            console::style("ERROR").red(),
            format_args!($($arg)*)
        );
    };
}

/// Errors that can occur during configuration loading, parsing or validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// IO error while accessing the configuration file.
    #[error("IO error while reading configuration {path}: {source}")]
    IoError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The file is not valid INI.
    #[error("Parse error while reading configuration: {0}")]
    ParseError(String),

    /// Sections or keys are missing or unparsable. Holds every problem found.
    #[error("ini configuration has {} problem(s)", .0.len())]
    Incomplete(Vec<ConfigIssue>),

    /// Values parsed but break a constraint.
    #[error("Validation error: {0}")]
    ValidationError(#[from] validator::ValidationErrors),
}

impl ConfigError {
    /// Individual problems, one per line of diagnostic output.
    pub fn issues(&self) -> &[ConfigIssue] {
        match self {
            ConfigError::Incomplete(issues) => issues,
            _ => &[],
        }
    }
}

/// One problem found by the presence checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigIssue {
    MissingSection(&'static str),
    MissingKey {
        section: &'static str,
        key: &'static str,
    },
    InvalidValue {
        section: &'static str,
        key: &'static str,
        reason: String,
    },
}

impl fmt::Display for ConfigIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigIssue::MissingSection(section) => {
                write!(f, "ini configuration is missing {} section", section)
            }
            ConfigIssue::MissingKey { section, key } => {
                write!(f, "ini configuration is missing {}/{} key", section, key)
            }
            ConfigIssue::InvalidValue {
                section,
                key,
                reason,
            } => write!(f, "ini configuration has invalid {}/{}: {}", section, key, reason),
        }
    }
}

/// Top-level application configuration.
#[derive(Debug, Clone, Validate)]
pub struct AppConfig {
    #[validate(nested)]
    pub mqtt: MqttSettings,

    #[validate(nested)]
    pub publish: PublishSettings,
}

impl AppConfig {
    /// Picks the configuration file.
    ///
    /// Priority:
    /// 1. explicit path (`--config`)
    /// 2. `OUMAN_BRIDGE_CONFIG` environment variable
    /// 3. `ouman-collector.ini` in the working directory
    pub fn resolve_path(explicit: Option<PathBuf>) -> PathBuf {
        if let Some(path) = explicit {
            return path;
        }
        if let Ok(path) = env::var(CONFIG_ENV) {
            debug!("Using config from {}: {}", CONFIG_ENV, path);
            return PathBuf::from(path);
        }
        PathBuf::from(DEFAULT_CONFIG_FILE)
    }

    /// Loads and validates configuration from `path`.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        info!("Loading configuration from: {}", path.display());

        let raw = fs::read_to_string(path).map_err(|source| ConfigError::IoError {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_ini_str(&raw)?;

        debug!("{:#?}", config);
        Ok(config)
    }

    /// Parses and validates configuration from INI text.
    pub fn from_ini_str(raw: &str) -> Result<Self, ConfigError> {
        // Passwords may contain backslashes and quotes; take values literally.
        let options = ParseOption {
            enabled_quote: false,
            enabled_escape: false,
            ..Default::default()
        };
        let ini = Ini::load_from_str_opt(raw, options)
            .map_err(|e| ConfigError::ParseError(e.to_string()))?;

        let mut reader = IniReader::new(&ini);

        let mqtt = reader.section("mqtt").map(|mut section| {
            let username = section.required("username");
            let password = section.required("password");
            let host = section.required("host");
            let port = section
                .required_parsed::<NonZeroU16>("port")
                .map(NonZeroU16::get);
            let client_id = section.optional("client_id");
            let keep_alive = section.optional_parsed::<u64>("keep_alive");
            let connection_timeout = section.optional_parsed::<u64>("connection_timeout");
            let flush_timeout = section.optional_parsed::<u64>("flush_timeout");
            (
                username,
                password,
                host,
                port,
                client_id,
                keep_alive,
                connection_timeout,
                flush_timeout,
            )
        });

        let publish = reader.section("publish").map(|mut section| {
            let topic = section.required("topic");
            let values = section.required("values");
            (topic, values)
        });

        if !reader.issues.is_empty() {
            return Err(ConfigError::Incomplete(reader.issues));
        }

        let (
            Some((
                Some(username),
                Some(password),
                Some(host),
                Some(port),
                client_id,
                keep_alive,
                connection_timeout,
                flush_timeout,
            )),
            Some((Some(topic), Some(values))),
        ) = (mqtt, publish)
        else {
            // Every `None` above recorded an issue.
            return Err(ConfigError::Incomplete(Vec::new()));
        };

        let mut mqtt = MqttSettings::new(host, port, username, password);
        if let Some(client_id) = client_id {
            mqtt.client_id = client_id.to_string();
        }
        if let Some(Some(secs)) = keep_alive {
            mqtt.keep_alive = secs;
        }
        if let Some(Some(secs)) = connection_timeout {
            mqtt.connection_timeout = secs;
        }
        if let Some(Some(secs)) = flush_timeout {
            mqtt.flush_timeout = secs;
        }

        let config = AppConfig {
            mqtt,
            publish: PublishSettings::new(topic, values),
        };
        config.validate()?;
        Ok(config)
    }
}

/// Walks an `Ini` document and records presence problems.
struct IniReader<'a> {
    ini: &'a Ini,
    issues: Vec<ConfigIssue>,
}

impl<'a> IniReader<'a> {
    fn new(ini: &'a Ini) -> Self {
        Self {
            ini,
            issues: Vec::new(),
        }
    }

    fn section(&mut self, name: &'static str) -> Option<SectionReader<'a, '_>> {
        match self.ini.section(Some(name)) {
            Some(props) => Some(SectionReader {
                name,
                props,
                issues: &mut self.issues,
            }),
            None => {
                self.issues.push(ConfigIssue::MissingSection(name));
                None
            }
        }
    }
}

fn strip_inline_comment(value: &str) -> &str {
    let end = value
        .char_indices()
        .find(|&(i, c)| c == ';' && i > 0 && value[..i].ends_with(char::is_whitespace))
        .map_or(value.len(), |(i, _)| i);
    value[..end].trim_end()
}

struct SectionReader<'a, 'r> {
    name: &'static str,
    props: &'a Properties,
    issues: &'r mut Vec<ConfigIssue>,
}

impl<'a> SectionReader<'a, '_> {
    /// Keys match case-insensitively; a ` ;` starts an inline comment.
    fn optional(&self, key: &'static str) -> Option<&'a str> {
        self.props
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(key))
            .map(|(_, value)| strip_inline_comment(value))
    }

    fn required(&mut self, key: &'static str) -> Option<&'a str> {
        let value = self.optional(key);
        if value.is_none() {
            self.issues.push(ConfigIssue::MissingKey {
                section: self.name,
                key,
            });
        }
        value
    }

    fn parse<T>(&mut self, key: &'static str, raw: &str) -> Option<T>
    where
        T: FromStr,
        T::Err: fmt::Display,
    {
        match raw.parse::<T>() {
            Ok(value) => Some(value),
            Err(e) => {
                self.issues.push(ConfigIssue::InvalidValue {
                    section: self.name,
                    key,
                    reason: format!("'{}': {}", raw, e),
                });
                None
            }
        }
    }

    fn required_parsed<T>(&mut self, key: &'static str) -> Option<T>
    where
        T: FromStr,
        T::Err: fmt::Display,
    {
        let raw = self.required(key)?;
        self.parse(key, raw)
    }

    /// `None` when absent, `Some(None)` when present but unparsable.
    fn optional_parsed<T>(&mut self, key: &'static str) -> Option<Option<T>>
    where
        T: FromStr,
        T::Err: fmt::Display,
    {
        let raw = self.optional(key)?;
        Some(self.parse(key, raw))
    }
}
