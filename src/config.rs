use crate::error::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Переменная окружения с путём к конфигурации
pub const CONFIG_ENV: &str = "SENDTO_CONFIG";

pub const DEFAULT_GRAPH_VERSION: &str = "v18.0";

/// Учётные данные всех платформ; отсутствующая секция = платформа выключена
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    pub telegram: Option<TelegramConfig>,
    pub twitter: Option<TwitterConfig>,
    pub facebook: Option<FacebookConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramConfig {
    pub api_token: String,
    #[serde(default)]
    pub bot_username: String,
    /// Канал по умолчанию, если chat_id не указан
    #[serde(default)]
    pub channel_username: String,
    /// Подпись канала, добавляется в конец текста
    #[serde(default)]
    pub channel_signature: Option<String>,
    #[serde(default)]
    pub proxy: Option<ProxyConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TwitterConfig {
    pub consumer_key: String,
    pub consumer_secret: String,
    pub access_token: String,
    pub access_token_secret: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FacebookConfig {
    #[serde(default)]
    pub app_id: String,
    #[serde(default)]
    pub app_secret: String,
    #[serde(default = "default_graph_version")]
    pub default_graph_version: String,
    pub page_access_token: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProxyKind {
    Http,
    Https,
    Socks5,
    /// SOCKS5 с резолвом имён на стороне прокси
    #[default]
    Socks5h,
}

impl ProxyKind {
    pub fn scheme(&self) -> &'static str {
        match self {
            ProxyKind::Http => "http",
            ProxyKind::Https => "https",
            ProxyKind::Socks5 => "socks5",
            ProxyKind::Socks5h => "socks5h",
        }
    }
}

/// Прокси для транспорта Telegram
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProxyConfig {
    #[serde(default = "default_proxy_hostname")]
    pub hostname: String,
    #[serde(default = "default_proxy_port")]
    pub port: u16,
    #[serde(default, rename = "type")]
    pub kind: ProxyKind,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        ProxyConfig {
            hostname: default_proxy_hostname(),
            port: default_proxy_port(),
            kind: ProxyKind::default(),
            username: None,
            password: None,
        }
    }
}

fn default_graph_version() -> String {
    DEFAULT_GRAPH_VERSION.to_string()
}

fn default_proxy_hostname() -> String {
    "127.0.0.1".to_string()
}

fn default_proxy_port() -> u16 {
    9050
}

impl Config {
    /// Загружает конфигурацию по пути из `SENDTO_CONFIG`
    pub fn load() -> AppResult<Self> {
        let path = std::env::var(CONFIG_ENV)
            .map(PathBuf::from)
            .map_err(|_| AppError::Config(format!("{} is not set", CONFIG_ENV)))?;
        Self::load_from_path(&path)
    }

    pub fn load_from_path(path: &Path) -> AppResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> AppResult<Self> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Валидирует конфигурацию: у включённых платформ должны быть ключи
    pub fn validate(&self) -> AppResult<()> {
        if let Some(telegram) = &self.telegram {
            telegram.validate()?;
        }
        if let Some(twitter) = &self.twitter {
            twitter.validate()?;
        }
        if let Some(facebook) = &self.facebook {
            facebook.validate()?;
        }
        Ok(())
    }
}

impl TelegramConfig {
    pub fn new(api_token: impl Into<String>, channel_username: impl Into<String>) -> Self {
        TelegramConfig {
            api_token: api_token.into(),
            bot_username: String::new(),
            channel_username: channel_username.into(),
            channel_signature: None,
            proxy: None,
        }
    }

    pub fn validate(&self) -> AppResult<()> {
        require("telegram.api_token", &self.api_token)
    }
}

impl TwitterConfig {
    pub fn validate(&self) -> AppResult<()> {
        require("twitter.consumer_key", &self.consumer_key)?;
        require("twitter.consumer_secret", &self.consumer_secret)?;
        require("twitter.access_token", &self.access_token)?;
        require("twitter.access_token_secret", &self.access_token_secret)
    }
}

impl FacebookConfig {
    pub fn new(page_access_token: impl Into<String>) -> Self {
        FacebookConfig {
            app_id: String::new(),
            app_secret: String::new(),
            default_graph_version: default_graph_version(),
            page_access_token: page_access_token.into(),
        }
    }

    pub fn validate(&self) -> AppResult<()> {
        require("facebook.page_access_token", &self.page_access_token)?;
        require("facebook.default_graph_version", &self.default_graph_version)
    }
}

fn require(field: &str, value: &str) -> AppResult<()> {
    if value.trim().is_empty() {
        return Err(AppError::Config(format!("{} is missing", field)));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const FULL_CONFIG: &str = r#"
        [telegram]
        api_token = "123:abc"
        bot_username = "sendto_bot"
        channel_username = "@news"
        channel_signature = "@news"

        [telegram.proxy]
        hostname = "10.0.0.1"
        type = "http"

        [twitter]
        consumer_key = "ck"
        consumer_secret = "cs"
        access_token = "at"
        access_token_secret = "ats"

        [facebook]
        app_id = "42"
        app_secret = "secret"
        page_access_token = "page-token"
    "#;

    #[test]
    fn parses_full_config() {
        let config = Config::from_toml_str(FULL_CONFIG).unwrap();

        let telegram = config.telegram.unwrap();
        assert_eq!(telegram.channel_username, "@news");
        assert_eq!(telegram.channel_signature.as_deref(), Some("@news"));
        let proxy = telegram.proxy.unwrap();
        assert_eq!(proxy.hostname, "10.0.0.1");
        assert_eq!(proxy.port, 9050);
        assert_eq!(proxy.kind, ProxyKind::Http);

        assert_eq!(config.twitter.unwrap().access_token_secret, "ats");

        let facebook = config.facebook.unwrap();
        assert_eq!(facebook.default_graph_version, DEFAULT_GRAPH_VERSION);
    }

    #[test]
    fn empty_config_is_valid() {
        let config = Config::from_toml_str("").unwrap();
        assert!(config.telegram.is_none());
        assert!(config.twitter.is_none());
        assert!(config.facebook.is_none());
    }

    #[test]
    fn rejects_blank_credentials() {
        let result = Config::from_toml_str(
            r#"
            [twitter]
            consumer_key = "ck"
            consumer_secret = ""
            access_token = "at"
            access_token_secret = "ats"
            "#,
        );
        match result {
            Err(AppError::Config(msg)) => assert_eq!(msg, "twitter.consumer_secret is missing"),
            other => panic!("expected config error, got {:?}", other),
        }
    }

    #[test]
    fn rejects_malformed_toml() {
        let result = Config::from_toml_str("[telegram\napi_token = 1");
        assert!(matches!(result, Err(AppError::TomlError(_))));
    }

    #[test]
    fn proxy_defaults() {
        let proxy = ProxyConfig::default();
        assert_eq!(proxy.hostname, "127.0.0.1");
        assert_eq!(proxy.port, 9050);
        assert_eq!(proxy.kind.scheme(), "socks5h");
    }

    #[test]
    fn loads_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sendto.toml");
        std::fs::write(&path, FULL_CONFIG).unwrap();

        let config = Config::load_from_path(&path).unwrap();
        assert!(config.facebook.is_some());
    }
}
