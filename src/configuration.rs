use config::{Config, ConfigError, Environment as ConfigEnvironment};
use secrecy::Secret;
use serde_aux::field_attributes::deserialize_number_from_string;

#[derive(serde::Deserialize, Clone, Default)]
pub struct Settings {
    #[serde(default)]
    pub application: ApplicationSettings,
    #[serde(default)]
    pub database: DatabaseSettings,
    #[serde(default)]
    pub openai: OpenAiSettings,
}

#[derive(serde::Deserialize, Clone)]
pub struct ApplicationSettings {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(
        default = "default_app_port",
        deserialize_with = "deserialize_number_from_string"
    )]
    pub port: u16,
}

impl Default for ApplicationSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_app_port(),
        }
    }
}

#[derive(serde::Deserialize, Clone)]
pub struct DatabaseSettings {
    /// Path of the SQLite database file; created on first start.
    #[serde(default = "default_database_path")]
    pub path: String,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            path: default_database_path(),
        }
    }
}

#[derive(serde::Deserialize, Clone)]
pub struct OpenAiSettings {
    #[serde(default = "default_api_key")]
    pub api_key: Secret<String>,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Reply-length bound sent with every chat completion.
    #[serde(
        default = "default_max_reply_tokens",
        deserialize_with = "deserialize_number_from_string"
    )]
    pub max_reply_tokens: i32,
    #[serde(
        default = "default_completion_timeout",
        deserialize_with = "deserialize_number_from_string"
    )]
    pub completion_timeout_seconds: u64,
    /// Model used for the one-off session-naming call.
    #[serde(default = "default_naming_model")]
    pub naming_model: String,
}

impl Default for OpenAiSettings {
    fn default() -> Self {
        Self {
            api_key: default_api_key(),
            base_url: default_base_url(),
            max_reply_tokens: default_max_reply_tokens(),
            completion_timeout_seconds: default_completion_timeout(),
            naming_model: default_naming_model(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_app_port() -> u16 {
    8000
}

fn default_database_path() -> String {
    "parlor.db".to_string()
}

fn default_api_key() -> Secret<String> {
    Secret::new(std::env::var("OPENAI_API_KEY").unwrap_or_default())
}

fn default_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_max_reply_tokens() -> i32 {
    150
}

fn default_completion_timeout() -> u64 {
    30
}

fn default_naming_model() -> String {
    "gpt-4".to_string()
}

pub fn get_configuration() -> Result<Settings, ConfigError> {
    let settings = Config::builder()
        .add_source(
            ConfigEnvironment::with_prefix("APP")
                .prefix_separator("_")
                .separator("__"),
        )
        .build()?;

    settings.try_deserialize::<Settings>()
}
