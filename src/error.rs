use crate::models::Platform;
use thiserror::Error;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    /// Платформа ответила ошибкой; `message` и `code` берутся из её ответа
    #[error("{platform} API error: {message}")]
    RemoteApi {
        platform: Platform,
        message: String,
        code: Option<i64>,
    },

    /// Ответ получен, но разобрать его не удалось
    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("Timeout waiting for server response")]
    Timeout,

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON parsing error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Failed to parse config: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("Invalid URL: {0}")]
    UrlError(#[from] url::ParseError),
}

impl AppError {
    /// Ошибка транспорта: таймаут отделяется от прочих сетевых сбоев
    pub fn network(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            AppError::Timeout
        } else {
            AppError::NetworkError(e)
        }
    }

    pub fn remote(platform: Platform, message: impl Into<String>, code: Option<i64>) -> Self {
        AppError::RemoteApi {
            platform,
            message: message.into(),
            code,
        }
    }

    /// Сообщение платформы, если это ошибка удалённого API
    pub fn remote_message(&self) -> Option<&str> {
        match self {
            AppError::RemoteApi { message, .. } => Some(message),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remote_api_error_formatting() {
        let error = AppError::remote(Platform::Telegram, "Bad Request", Some(400));
        assert_eq!(error.to_string(), "Telegram API error: Bad Request");
        assert_eq!(error.remote_message(), Some("Bad Request"));
    }

    #[test]
    fn config_error_formatting() {
        let error = AppError::Config("twitter.consumer_key is missing".to_string());
        assert_eq!(
            error.to_string(),
            "Configuration error: twitter.consumer_key is missing"
        );
        assert_eq!(error.remote_message(), None);
    }

    #[test]
    fn io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "no such file");
        let error: AppError = io.into();
        assert!(matches!(error, AppError::IoError(_)));
        assert!(error.to_string().contains("no such file"));
    }

    #[test]
    fn json_error_conversion() {
        let parse = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        let error: AppError = parse.into();
        assert!(matches!(error, AppError::JsonError(_)));
    }
}
