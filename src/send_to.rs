use crate::api::facebook::FacebookClient;
use crate::api::telegram::{assign_signature, SendOptions, TelegramClient, TextKind};
use crate::api::twitter::TwitterClient;
use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::models::{Attachment, FacebookPost, Outbound, Platform, ReplyMarkup, TelegramAttachment};
use crate::transport::{HttpTransport, ReqwestTransport};
use std::sync::Arc;
use tracing::{debug, info};

/// Единая точка отправки во все настроенные сети.
///
/// Клиенты создаются только для секций, присутствующих в конфигурации.
pub struct SendTo {
    telegram: Option<TelegramClient>,
    channel_signature: Option<String>,
    twitter: Option<TwitterClient>,
    facebook: Option<FacebookClient>,
}

impl SendTo {
    /// Боевые транспорты; прокси применяется только к Telegram
    pub fn new(config: &Config) -> AppResult<Self> {
        let (telegram_transport, transport) = reqwest_transports(config)?;
        Self::build(config, Arc::new(telegram_transport), Arc::new(transport))
    }

    /// Один транспорт для всех платформ
    pub fn with_transport(config: &Config, transport: Arc<dyn HttpTransport>) -> AppResult<Self> {
        Self::build(config, transport.clone(), transport)
    }

    fn build(
        config: &Config,
        telegram_transport: Arc<dyn HttpTransport>,
        transport: Arc<dyn HttpTransport>,
    ) -> AppResult<Self> {
        config.validate()?;

        let telegram = config
            .telegram
            .as_ref()
            .map(|telegram| TelegramClient::new(telegram, telegram_transport))
            .transpose()?;
        let channel_signature = config
            .telegram
            .as_ref()
            .and_then(|telegram| telegram.channel_signature.clone())
            .filter(|signature| !signature.is_empty());
        let twitter = config
            .twitter
            .as_ref()
            .map(|twitter| TwitterClient::new(twitter, transport.clone()))
            .transpose()?;
        let facebook = config
            .facebook
            .as_ref()
            .map(|facebook| FacebookClient::new(facebook, transport))
            .transpose()?;

        debug!(
            "SendTo ready - telegram: {}, twitter: {}, facebook: {}",
            telegram.is_some(),
            twitter.is_some(),
            facebook.is_some()
        );

        Ok(SendTo {
            telegram,
            channel_signature,
            twitter,
            facebook,
        })
    }

    pub fn is_enabled(&self, platform: Platform) -> bool {
        match platform {
            Platform::Telegram => self.telegram.is_some(),
            Platform::Twitter => self.twitter.is_some(),
            Platform::Facebook => self.facebook.is_some(),
        }
    }

    pub fn send(&self, message: &Outbound) -> AppResult<bool> {
        match message {
            Outbound::Telegram(post) => {
                self.telegram(&post.text, post.attachment.as_ref(), post.reply_markup.clone())
            }
            Outbound::Twitter(post) => self.twitter_with_options(&post.message, &post.media, &post.options),
            Outbound::Facebook(post) => self.facebook(post),
        }
    }

    /// Текст или вложение в канал. Текст служит подписью к медиа и
    /// игнорируется для альбомов, геопозиций и контактов.
    pub fn telegram(
        &self,
        text: &str,
        attachment: Option<&TelegramAttachment>,
        reply_markup: Option<ReplyMarkup>,
    ) -> AppResult<bool> {
        let client = self.telegram.as_ref().ok_or_else(|| not_configured(Platform::Telegram))?;

        let text = match &self.channel_signature {
            Some(signature) => {
                let kind = if attachment.map_or(false, TelegramAttachment::carries_caption) {
                    TextKind::Caption
                } else {
                    TextKind::Text
                };
                assign_signature(text, signature, kind)
            }
            None => text.to_string(),
        };
        let options = SendOptions::with_markup(reply_markup);

        let message_id = match attachment {
            None => client.send_message(&text, &options)?,
            Some(TelegramAttachment::Photo { file }) => client.send_photo(file, &text, &options)?,
            Some(TelegramAttachment::Audio {
                file,
                duration,
                performer,
                title,
            }) => client.send_audio(
                file,
                &text,
                *duration,
                performer.as_deref(),
                title.as_deref(),
                &options,
            )?,
            Some(TelegramAttachment::Document { file }) => client.send_document(file, &text, &options)?,
            Some(TelegramAttachment::Video {
                file,
                duration,
                width,
                height,
            }) => client.send_video(file, *duration, *width, *height, &text, &options)?,
            Some(TelegramAttachment::Voice { file, duration }) => {
                client.send_voice(file, &text, *duration, &options)?
            }
            Some(TelegramAttachment::MediaGroup { media }) => {
                let ids = client.send_media_group(media, &options)?;
                return Ok(!ids.is_empty());
            }
            Some(TelegramAttachment::Location {
                latitude,
                longitude,
                live_period,
            }) => client.send_location(*latitude, *longitude, *live_period, &options)?,
            Some(TelegramAttachment::Venue {
                latitude,
                longitude,
                title,
                address,
                foursquare_id,
            }) => client.send_venue(
                *latitude,
                *longitude,
                title,
                address,
                foursquare_id.as_deref(),
                &options,
            )?,
            Some(TelegramAttachment::Contact {
                phone_number,
                first_name,
                last_name,
            }) => client.send_contact(phone_number, first_name, last_name.as_deref(), &options)?,
        };

        Ok(message_id > 0)
    }

    pub fn twitter(&self, message: &str, media: &[Attachment]) -> AppResult<bool> {
        self.twitter_with_options(message, media, &[])
    }

    pub fn twitter_with_options(
        &self,
        message: &str,
        media: &[Attachment],
        options: &[(String, String)],
    ) -> AppResult<bool> {
        let client = self.twitter.as_ref().ok_or_else(|| not_configured(Platform::Twitter))?;
        let status = client.send_message(message, media, options)?;
        Ok(!status.is_null())
    }

    pub fn facebook(&self, post: &FacebookPost) -> AppResult<bool> {
        let client = self.facebook.as_ref().ok_or_else(|| not_configured(Platform::Facebook))?;
        debug!("Dispatching Facebook {} post", post.operation());

        let id = match post {
            FacebookPost::Link { link, message } => client.send_link(link, message.as_deref())?,
            FacebookPost::Photo { photo, message } => client.send_photo(photo, message.as_deref(), true)?,
            FacebookPost::Photos {
                photos,
                message,
                photo_messages,
            } => client.send_photos(photos, message.as_deref(), photo_messages)?,
            FacebookPost::Video {
                video,
                title,
                description,
            } => client.send_video(video, title, description.as_deref())?,
        };

        info!("Facebook {} post delivered", post.operation());
        Ok(!id.is_empty())
    }
}

/// Транспорт Telegram (с прокси из конфигурации) и общий транспорт без прокси
fn reqwest_transports(config: &Config) -> AppResult<(ReqwestTransport, ReqwestTransport)> {
    let proxy = config.telegram.as_ref().and_then(|telegram| telegram.proxy.as_ref());
    Ok((ReqwestTransport::with_proxy(proxy)?, ReqwestTransport::new()?))
}

fn not_configured(platform: Platform) -> AppError {
    AppError::Config(format!("{} is not configured", platform.to_string().to_lowercase()))
}
