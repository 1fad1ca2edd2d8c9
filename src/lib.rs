//! sendto: отправка публикаций в Telegram, Twitter и Facebook
//!
//! Каждая платформа обслуживается отдельным синхронным клиентом в [`api`]; [`SendTo`]
//! маршрутизирует [`Outbound`] сообщение в нужный клиент. Запросы к Twitter
//! подписываются OAuth 1.0a ([`oauth`]). HTTP вынесен за трейт
//! [`transport::HttpTransport`], в тестах используется
//! [`transport::mock::MockTransport`].

pub mod api;
pub mod config;
pub mod error;
pub mod logging;
pub mod models;
pub mod oauth;
pub mod send_to;
pub mod transport;

pub use config::Config;
pub use error::{AppError, AppResult};
pub use models::{
    Attachment, FacebookPost, InputFile, InputMedia, Outbound, Platform, ReplyMarkup, TelegramAttachment,
    TelegramPost, TwitterPost,
};
pub use send_to::SendTo;
