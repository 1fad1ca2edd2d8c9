use crate::error::AppResult;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Платформа, куда уходит сообщение
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Telegram,
    Twitter,
    Facebook,
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Platform::Telegram => write!(f, "Telegram"),
            Platform::Twitter => write!(f, "Twitter"),
            Platform::Facebook => write!(f, "Facebook"),
        }
    }
}

/// Локальный медиа файл, загруженный в память
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub filename: String,
    pub content_type: String,
    pub data: Vec<u8>,
}

impl Attachment {
    pub fn new(filename: impl Into<String>, content_type: impl Into<String>, data: Vec<u8>) -> Self {
        Attachment {
            filename: filename.into(),
            content_type: content_type.into(),
            data,
        }
    }

    /// Читает файл с диска, MIME тип угадывается по расширению
    pub fn from_path(path: impl AsRef<Path>) -> AppResult<Self> {
        let path = path.as_ref();
        let data = std::fs::read(path)?;
        let filename = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "file".to_string());
        let content_type = guess_content_type(&filename).to_string();

        Ok(Attachment {
            filename,
            content_type,
            data,
        })
    }
}

fn guess_content_type(filename: &str) -> &'static str {
    let extension = filename
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();

    match extension.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "mp4" => "video/mp4",
        "mov" => "video/quicktime",
        "mp3" => "audio/mpeg",
        "m4a" => "audio/mp4",
        "ogg" | "oga" => "audio/ogg",
        "pdf" => "application/pdf",
        "txt" => "text/plain",
        _ => "application/octet-stream",
    }
}

/// Файл для Telegram: ссылка (file_id или URL) или загрузка с диска
#[derive(Debug, Clone, PartialEq)]
pub enum InputFile {
    Remote(String),
    Upload(Attachment),
}

impl From<&str> for InputFile {
    fn from(value: &str) -> Self {
        InputFile::Remote(value.to_string())
    }
}

impl From<String> for InputFile {
    fn from(value: String) -> Self {
        InputFile::Remote(value)
    }
}

impl From<Attachment> for InputFile {
    fn from(value: Attachment) -> Self {
        InputFile::Upload(value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMediaKind {
    Photo,
    Video,
}

impl InputMediaKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            InputMediaKind::Photo => "photo",
            InputMediaKind::Video => "video",
        }
    }
}

/// Элемент media group
#[derive(Debug, Clone, PartialEq)]
pub struct InputMedia {
    pub kind: InputMediaKind,
    pub media: InputFile,
    pub caption: Option<String>,
    pub parse_mode: Option<String>,
}

impl InputMedia {
    pub fn photo(media: impl Into<InputFile>) -> Self {
        InputMedia {
            kind: InputMediaKind::Photo,
            media: media.into(),
            caption: None,
            parse_mode: None,
        }
    }

    pub fn video(media: impl Into<InputFile>) -> Self {
        InputMedia {
            kind: InputMediaKind::Video,
            media: media.into(),
            caption: None,
            parse_mode: None,
        }
    }

    pub fn with_caption(mut self, caption: impl Into<String>) -> Self {
        self.caption = Some(caption.into());
        self
    }

    pub fn with_parse_mode(mut self, parse_mode: impl Into<String>) -> Self {
        self.parse_mode = Some(parse_mode.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InlineKeyboardButton {
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub callback_data: Option<String>,
}

impl InlineKeyboardButton {
    pub fn url(text: impl Into<String>, url: impl Into<String>) -> Self {
        InlineKeyboardButton {
            text: text.into(),
            url: Some(url.into()),
            callback_data: None,
        }
    }

    pub fn callback(text: impl Into<String>, data: impl Into<String>) -> Self {
        InlineKeyboardButton {
            text: text.into(),
            url: None,
            callback_data: Some(data.into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyboardButton {
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_contact: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_location: Option<bool>,
}

impl KeyboardButton {
    pub fn new(text: impl Into<String>) -> Self {
        KeyboardButton {
            text: text.into(),
            request_contact: None,
            request_location: None,
        }
    }
}

/// Разметка клавиатуры, сериализуется как `{"inline_keyboard": [...]}`
/// или `{"keyboard": [...]}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplyMarkup {
    InlineKeyboard(Vec<Vec<InlineKeyboardButton>>),
    Keyboard(Vec<Vec<KeyboardButton>>),
}

impl ReplyMarkup {
    pub fn to_json(&self) -> AppResult<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Вложение сообщения Telegram; без вложения уходит обычный текст
#[derive(Debug, Clone, PartialEq)]
pub enum TelegramAttachment {
    Photo {
        file: InputFile,
    },
    Audio {
        file: InputFile,
        duration: Option<u32>,
        performer: Option<String>,
        title: Option<String>,
    },
    Document {
        file: InputFile,
    },
    Video {
        file: InputFile,
        duration: Option<u32>,
        width: Option<u32>,
        height: Option<u32>,
    },
    Voice {
        file: InputFile,
        duration: Option<u32>,
    },
    MediaGroup {
        media: Vec<InputMedia>,
    },
    Location {
        latitude: f64,
        longitude: f64,
        live_period: Option<u32>,
    },
    Venue {
        latitude: f64,
        longitude: f64,
        title: String,
        address: String,
        foursquare_id: Option<String>,
    },
    Contact {
        phone_number: String,
        first_name: String,
        last_name: Option<String>,
    },
}

impl TelegramAttachment {
    /// Подпись к медиа ограничена длиной caption, а не text
    pub fn carries_caption(&self) -> bool {
        matches!(
            self,
            TelegramAttachment::Photo { .. }
                | TelegramAttachment::Audio { .. }
                | TelegramAttachment::Document { .. }
                | TelegramAttachment::Video { .. }
                | TelegramAttachment::Voice { .. }
        )
    }
}

/// Публикация на странице Facebook
#[derive(Debug, Clone, PartialEq)]
pub enum FacebookPost {
    Link {
        link: String,
        message: Option<String>,
    },
    Photo {
        photo: Attachment,
        message: Option<String>,
    },
    Photos {
        photos: Vec<Attachment>,
        message: Option<String>,
        photo_messages: Vec<String>,
    },
    Video {
        video: Attachment,
        title: String,
        description: Option<String>,
    },
}

impl FacebookPost {
    pub fn operation(&self) -> &'static str {
        match self {
            FacebookPost::Link { .. } => "link",
            FacebookPost::Photo { .. } => "photo",
            FacebookPost::Photos { .. } => "photos",
            FacebookPost::Video { .. } => "video",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TelegramPost {
    pub text: String,
    pub attachment: Option<TelegramAttachment>,
    pub reply_markup: Option<ReplyMarkup>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct TwitterPost {
    pub message: String,
    pub media: Vec<Attachment>,
    pub options: Vec<(String, String)>,
}

/// Нормализованное исходящее сообщение для фасада
#[derive(Debug, Clone, PartialEq)]
pub enum Outbound {
    Telegram(TelegramPost),
    Twitter(TwitterPost),
    Facebook(FacebookPost),
}

impl Outbound {
    pub fn platform(&self) -> Platform {
        match self {
            Outbound::Telegram(_) => Platform::Telegram,
            Outbound::Twitter(_) => Platform::Twitter,
            Outbound::Facebook(_) => Platform::Facebook,
        }
    }
}
