use crate::error::{AppError, AppResult};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Инициализирует логирование; уровень берётся из `RUST_LOG`, по умолчанию info.
///
/// Повторный вызов возвращает ошибку конфигурации, а не паникует.
pub fn init_tracing() -> AppResult<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .with_thread_ids(true)
        .with_line_number(true)
        .with_file(true)
        .try_init()
        .map_err(|e| AppError::Config(format!("tracing subscriber: {}", e)))?;

    info!("Tracing initialized");
    Ok(())
}
