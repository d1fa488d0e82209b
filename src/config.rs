use anyhow::{Context, Result};
use serde::Deserialize;
use std::fmt::{Debug, Formatter};
use std::fs;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_CONFIG_PATH: &str = "config.toml";

#[derive(Debug, Default, Deserialize)]
pub struct AppConfig {
    #[cfg(feature = "sentry")]
    pub sentry: Option<SentryConfig>,

    #[serde(default)]
    pub http: HTTPConfig,

    #[serde(default)]
    pub line: LineConfig,

    #[serde(default)]
    pub generator: GeneratorConfig,

    #[serde(default)]
    pub relay: RelayConfig,
}
impl AppConfig {
    /// Loads the given config file, or `config.toml` if it exists. Without either, every
    /// section falls back to its defaults.
    pub fn load(config_filepath: Option<PathBuf>) -> Result<Self> {
        let config_path = match config_filepath {
            Some(path) => path,
            None => {
                let path = PathBuf::from(DEFAULT_CONFIG_PATH);
                if !path.exists() {
                    return Ok(AppConfig::default());
                }
                path
            }
        };

        let config_content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file: {config_path:?}"))?;

        Self::parse(&config_content)
            .with_context(|| format!("Failed to parse TOML config file: {config_path:?}"))
    }

    pub fn parse(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }
}

/// Credentials are only ever read from the environment, never the config file.
#[derive(Clone)]
pub struct Secrets {
    pub line_access_token: String,
    pub line_channel_secret: String,
    pub openai_api_key: Option<String>,
    pub openai_organization: Option<String>,
    pub openai_project: Option<String>,
}
impl Secrets {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let optional = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let required = |key: &'static str| {
            optional(key).with_context(|| format!("Missing required {key} environment variable!"))
        };

        Ok(Self {
            line_access_token: required("LINE_ACCESS_TOKEN")?,
            line_channel_secret: required("LINE_SECRET")?,
            openai_api_key: optional("OPENAI_API_KEY"),
            openai_organization: optional("OPENAI_ORGANIZATION"),
            openai_project: optional("OPENAI_PROJECT"),
        })
    }
}
impl Debug for Secrets {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Secrets")
            .field("line_access_token", &"<redacted>")
            .field("line_channel_secret", &"<redacted>")
            .field("openai_api_key", &self.openai_api_key.as_ref().map(|_| "<redacted>"))
            .field("openai_organization", &self.openai_organization)
            .field("openai_project", &self.openai_project)
            .finish()
    }
}

#[cfg(feature = "sentry")]
#[derive(Debug, Deserialize)]
pub struct SentryConfig {
    pub dsn: String,

    #[serde(default)]
    pub environment: Option<String>,

    #[serde(default)]
    pub server_name: Option<String>,

    #[serde(default)]
    pub debug: bool,

    #[serde(default = "default_true")]
    pub send_default_pii: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HTTPConfig {
    #[serde(default = "default_http_address")]
    pub address: SocketAddr,

    #[serde(default)]
    pub tls: Option<TLSConfig>,
}
impl Default for HTTPConfig {
    fn default() -> Self {
        Self {
            address: default_http_address(),
            tls: None,
        }
    }
}

#[cfg_attr(
    not(any(feature = "tls-rustls", feature = "tls-native")),
    allow(dead_code)
)]
#[derive(Debug, Clone, Deserialize)]
pub struct TLSConfig {
    #[serde(deserialize_with = "deserialize_existing_file")]
    pub certificate_path: PathBuf,

    #[serde(deserialize_with = "deserialize_existing_file")]
    pub key_path: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LineConfig {
    #[serde(default = "default_line_api_base_url")]
    pub api_base_url: String,

    #[serde(default = "default_line_request_timeout")]
    pub request_timeout_secs: u64,
}
impl LineConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}
impl Default for LineConfig {
    fn default() -> Self {
        Self {
            api_base_url: default_line_api_base_url(),
            request_timeout_secs: default_line_request_timeout(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct GeneratorConfig {
    #[serde(default = "default_generator_api_base_url")]
    pub api_base_url: String,

    #[serde(default = "default_generator_model")]
    pub model: String,

    #[serde(default)]
    pub temperature: Option<f32>,

    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,

    /// Upper bound for a single completion call, the only retry-free wait per event.
    #[serde(default = "default_generator_timeout")]
    pub timeout_secs: u64,
}
impl GeneratorConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}
impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            api_base_url: default_generator_api_base_url(),
            model: default_generator_model(),
            temperature: None,
            system_prompt: default_system_prompt(),
            timeout_secs: default_generator_timeout(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RelayConfig {
    /// Compared case-insensitively against the trimmed message text.
    #[serde(default = "default_ping_command")]
    pub ping_command: String,

    #[serde(default = "default_ping_reply")]
    pub ping_reply: String,
}
impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            ping_command: default_ping_command(),
            ping_reply: default_ping_reply(),
        }
    }
}

fn default_http_address() -> SocketAddr {
    SocketAddr::new(IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1)), 3000)
}
fn default_line_api_base_url() -> String {
    "https://api.line.me".to_string()
}
fn default_line_request_timeout() -> u64 {
    10
}
fn default_generator_api_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}
fn default_generator_model() -> String {
    "gpt-3.5-turbo".to_string()
}
fn default_system_prompt() -> String {
    "You are a friendly assistant chatting with people on LINE. Reply in the same language the user writes in, keep answers short and conversational (no more than a few sentences), and avoid long lists or heavy formatting since replies are shown as plain chat messages.".to_string()
}
fn default_generator_timeout() -> u64 {
    20
}
fn default_ping_command() -> String {
    "/ping".to_string()
}
fn default_ping_reply() -> String {
    "pong".to_string()
}

#[cfg(feature = "sentry")]
fn default_true() -> bool {
    true
}

fn deserialize_existing_file<'de, D>(deserializer: D) -> Result<PathBuf, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let path = PathBuf::deserialize(deserializer)?;
    if !path.exists() {
        return Err(serde::de::Error::custom(format!(
            "File does not exist: {}",
            path.display()
        )));
    }
    if !path.is_file() {
        return Err(serde::de::Error::custom(format!(
            "Path is not a file: {}",
            path.display()
        )));
    }
    Ok(path)
}
