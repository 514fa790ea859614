//! Configuration loader for the email bridge
//!
//! A config file is YAML or XML. The format is picked from the file extension
//! unless the caller asks for one explicitly.
//!
//! ```yaml
//! server: ""
//! port: 8080
//! staticFolder: "."
//! routes:
//!   prefix: "_api/"
//! sender:
//!   email: me@example.com
//!   smtpLogin: me@example.com
//!   smtpPassword: secret
//!   smtpHost: smtp.gmail.com
//!   smtpPort: 587
//! ```

use std::{
    fs,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::infrastructure::email::smtp::{SenderConfig, SmtpSecurity};

mod errors;
mod text;

pub use errors::{ConfigError, ParseError};
pub use text::HumanDuration;
pub(crate) use text::serde_as_str;

/// Route prefix used when the config does not set one
pub const DEFAULT_ROUTE_PREFIX: &str = "api/";

/// Port used when the config does not set one
pub const DEFAULT_PORT: u16 = 8080;

/// Root element name of XML config files
const XML_ROOT: &str = "config";

/// On-disk format of a config file
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConfigFormat {
    /// YAML document
    Yaml,
    /// XML document with a `<config>` root element
    Xml,
}

impl ConfigFormat {
    /// Picks the format from the extension of `path`, defaulting to YAML.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("xml") => ConfigFormat::Xml,
            _ => ConfigFormat::Yaml,
        }
    }
}

/// Complete configuration of a site served with email support
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct BridgeConfig {
    /// Host to bind, empty means every interface
    #[serde(default)]
    pub server: String,

    /// Port to bind
    #[serde(default = "default_port")]
    pub port: u16,

    /// Directory the static files are served from
    #[serde(default = "default_static_folder", alias = "root")]
    pub static_folder: PathBuf,

    /// Where the bridge endpoints are mounted
    #[serde(default)]
    pub routes: RoutesConfig,

    /// Identity and relay used to send mail
    pub sender: SenderConfig,
}

/// Route configuration of the email bridge
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RoutesConfig {
    /// Path prefix of the bridge endpoints, e.g. `_api/`
    #[serde(default = "default_route_prefix")]
    pub prefix: String,
}

impl Default for RoutesConfig {
    fn default() -> Self {
        Self {
            prefix: default_route_prefix(),
        }
    }
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_static_folder() -> PathBuf {
    PathBuf::from(".")
}

fn default_route_prefix() -> String {
    DEFAULT_ROUTE_PREFIX.to_string()
}

/// Returns the baseline configuration used to generate a config template.
pub fn build_default() -> BridgeConfig {
    BridgeConfig {
        server: String::new(),
        port: DEFAULT_PORT,
        static_folder: default_static_folder(),
        routes: RoutesConfig::default(),
        sender: SenderConfig {
            email: "me@example.com".to_string(),
            smtp_login: "me@example.com".to_string(),
            smtp_password: "changeme".to_string(),
            smtp_host: SenderConfig::DEFAULT_HOST.to_string(),
            smtp_port: SenderConfig::DEFAULT_PORT,
            security: SmtpSecurity::default(),
            verify_tls: true,
            timeout: SenderConfig::DEFAULT_TIMEOUT,
        },
    }
}

/// Loads a config from `path`, picking the format from its extension.
pub fn load(path: impl AsRef<Path>) -> Result<BridgeConfig, ConfigError> {
    let path = path.as_ref();
    load_with_format(path, ConfigFormat::from_path(path))
}

/// Loads a config from `path` in the given `format`.
pub fn load_with_format(
    path: impl AsRef<Path>,
    format: ConfigFormat,
) -> Result<BridgeConfig, ConfigError> {
    let path = path.as_ref();
    debug!(?path, ?format, "loading config");

    let content = fs::read_to_string(path).map_err(|source| ConfigError::File {
        path: path.to_path_buf(),
        source,
    })?;

    parse(&content, format).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Writes `config` to `path`, replacing any existing file.
pub fn write_config(path: impl AsRef<Path>, config: &BridgeConfig) -> Result<(), ConfigError> {
    let path = path.as_ref();
    let content = render(config, ConfigFormat::from_path(path)).map_err(ConfigError::Serialize)?;

    fs::write(path, content).map_err(|source| ConfigError::File {
        path: path.to_path_buf(),
        source,
    })?;

    debug!(?path, "config written");

    Ok(())
}

fn parse(content: &str, format: ConfigFormat) -> Result<BridgeConfig, ParseError> {
    Ok(match format {
        ConfigFormat::Yaml => serde_yaml::from_str(content)?,
        ConfigFormat::Xml => quick_xml::de::from_str(content)?,
    })
}

fn render(config: &BridgeConfig, format: ConfigFormat) -> Result<String, ParseError> {
    Ok(match format {
        ConfigFormat::Yaml => serde_yaml::to_string(config)?,
        ConfigFormat::Xml => quick_xml::se::to_string_with_root(XML_ROOT, config)?,
    })
}
