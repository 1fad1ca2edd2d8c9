pub mod facebook;
pub mod telegram;
pub mod twitter;

use crate::error::{AppError, AppResult};
use crate::models::Platform;
use serde_json::Value;
use tracing::error;

/// Разбирает JSON тело ответа; пустое или битое тело даёт ошибку протокола
pub(crate) fn parse_body(platform: Platform, body: &str) -> AppResult<Value> {
    serde_json::from_str(body).map_err(|e| {
        error!("Failed to parse {} response: {}", platform, e);
        AppError::Protocol(format!("Invalid {} server response", platform))
    })
}

/// Строковый идентификатор из поля ответа; числа тоже принимаются
pub(crate) fn id_field(platform: Platform, value: &Value, field: &str) -> AppResult<String> {
    match &value[field] {
        Value::String(id) if !id.is_empty() => Ok(id.clone()),
        Value::Number(id) => Ok(id.to_string()),
        _ => Err(AppError::Protocol(format!(
            "No {} in {} response",
            field, platform
        ))),
    }
}
