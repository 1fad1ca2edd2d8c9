use super::parse_body;
use crate::config::TelegramConfig;
use crate::error::{AppError, AppResult};
use crate::models::{InputFile, InputMedia, Platform, ReplyMarkup};
use crate::transport::{FilePart, HttpRequest, HttpResponse, HttpTransport};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, error, info};

pub const API_URL: &str = "https://api.telegram.org/bot";

/// Максимальная длина текста сообщения
pub const TEXT_LENGTH: usize = 4096;

/// Максимальная длина подписи к audio, document, photo, video, voice
pub const CAPTION_LENGTH: usize = 200;

const DEFAULT_PARSE_MODE: &str = "HTML";
const GENERIC_ERROR: &str = "an error was encountered";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextKind {
    Text,
    Caption,
}

impl TextKind {
    pub fn max_length(&self) -> usize {
        match self {
            TextKind::Text => TEXT_LENGTH,
            TextKind::Caption => CAPTION_LENGTH,
        }
    }
}

/// Добавляет подпись канала в конец текста.
///
/// Длина считается в UTF-16 единицах, как её считает Telegram. Если не
/// помещается, обрезается исходный текст (по границе символа), подпись
/// остаётся целой. Подпись, которая сама длиннее лимита, не добавляется.
pub fn assign_signature(text: &str, signature: &str, kind: TextKind) -> String {
    let signature = format!("\n{}", signature);
    let max_length = kind.max_length();
    let signature_length = utf16_length(&signature);
    let text_length = utf16_length(text);

    if signature_length > max_length {
        return text.to_string();
    }
    if signature_length + text_length <= max_length {
        return format!("{}{}", text, signature);
    }

    let budget = max_length - signature_length;
    let mut used = 0;
    let truncated: String = text
        .chars()
        .take_while(|c| {
            used += c.len_utf16();
            used <= budget
        })
        .collect();
    format!("{}{}", truncated, signature)
}

/// Длина в UTF-16 единицах
pub fn utf16_length(text: &str) -> usize {
    text.encode_utf16().count()
}

/// Общие параметры отправки
#[derive(Debug, Clone, Default)]
pub struct SendOptions {
    /// По умолчанию канал из конфигурации
    pub chat_id: Option<String>,
    pub reply_markup: Option<ReplyMarkup>,
    pub disable_notification: bool,
    pub reply_to_message_id: Option<i64>,
    /// Для sendMessage по умолчанию HTML
    pub parse_mode: Option<String>,
    pub disable_web_page_preview: bool,
}

impl SendOptions {
    pub fn with_markup(reply_markup: Option<ReplyMarkup>) -> Self {
        SendOptions {
            reply_markup,
            ..Default::default()
        }
    }
}

#[derive(Debug, Default)]
struct Params {
    fields: Vec<(String, String)>,
    files: Vec<FilePart>,
}

impl Params {
    fn text(&mut self, key: &str, value: impl ToString) {
        self.fields.push((key.to_string(), value.to_string()));
    }

    fn optional<T: ToString>(&mut self, key: &str, value: Option<T>) {
        if let Some(value) = value {
            self.text(key, value);
        }
    }

    fn non_empty(&mut self, key: &str, value: &str) {
        if !value.is_empty() {
            self.text(key, value);
        }
    }

    fn file(&mut self, key: &str, file: &InputFile) {
        match file {
            InputFile::Remote(reference) => self.text(key, reference),
            InputFile::Upload(attachment) => self.files.push(FilePart::new(key, attachment.clone())),
        }
    }
}

pub struct TelegramClient {
    transport: Arc<dyn HttpTransport>,
    api_token: String,
    channel_username: String,
}

impl TelegramClient {
    pub fn new(config: &TelegramConfig, transport: Arc<dyn HttpTransport>) -> AppResult<Self> {
        config.validate()?;

        Ok(TelegramClient {
            transport,
            api_token: config.api_token.clone(),
            channel_username: config.channel_username.clone(),
        })
    }

    /// Текстовое сообщение, до 4096 символов
    pub fn send_message(&self, text: &str, options: &SendOptions) -> AppResult<i64> {
        let mut params = self.base_params(options)?;
        params.text("text", text);
        params.text(
            "parse_mode",
            options.parse_mode.as_deref().unwrap_or(DEFAULT_PARSE_MODE),
        );
        params.text("disable_web_page_preview", options.disable_web_page_preview);

        self.send_message_request("sendMessage", params)
    }

    pub fn send_photo(&self, photo: &InputFile, caption: &str, options: &SendOptions) -> AppResult<i64> {
        let mut params = self.base_params(options)?;
        params.file("photo", photo);
        self.caption(&mut params, caption, options);

        self.send_message_request("sendPhoto", params)
    }

    pub fn send_audio(
        &self,
        audio: &InputFile,
        caption: &str,
        duration: Option<u32>,
        performer: Option<&str>,
        title: Option<&str>,
        options: &SendOptions,
    ) -> AppResult<i64> {
        let mut params = self.base_params(options)?;
        params.file("audio", audio);
        self.caption(&mut params, caption, options);
        params.optional("duration", duration);
        params.optional("performer", performer);
        params.optional("title", title);

        self.send_message_request("sendAudio", params)
    }

    pub fn send_document(&self, document: &InputFile, caption: &str, options: &SendOptions) -> AppResult<i64> {
        let mut params = self.base_params(options)?;
        params.file("document", document);
        self.caption(&mut params, caption, options);

        self.send_message_request("sendDocument", params)
    }

    pub fn send_video(
        &self,
        video: &InputFile,
        duration: Option<u32>,
        width: Option<u32>,
        height: Option<u32>,
        caption: &str,
        options: &SendOptions,
    ) -> AppResult<i64> {
        let mut params = self.base_params(options)?;
        params.file("video", video);
        params.optional("duration", duration);
        params.optional("width", width);
        params.optional("height", height);
        self.caption(&mut params, caption, options);

        self.send_message_request("sendVideo", params)
    }

    pub fn send_voice(
        &self,
        voice: &InputFile,
        caption: &str,
        duration: Option<u32>,
        options: &SendOptions,
    ) -> AppResult<i64> {
        let mut params = self.base_params(options)?;
        params.file("voice", voice);
        self.caption(&mut params, caption, options);
        params.optional("duration", duration);

        self.send_message_request("sendVoice", params)
    }

    /// Альбом из нескольких фото/видео. Клавиатура к альбому не прикрепляется.
    pub fn send_media_group(&self, media: &[InputMedia], options: &SendOptions) -> AppResult<Vec<i64>> {
        let options = SendOptions {
            reply_markup: None,
            ..options.clone()
        };
        let mut params = self.base_params(&options)?;

        let mut items = Vec::with_capacity(media.len());
        for (index, item) in media.iter().enumerate() {
            let reference = match &item.media {
                InputFile::Remote(reference) => reference.clone(),
                InputFile::Upload(attachment) => {
                    let name = format!("file{}", index);
                    params.files.push(FilePart::new(name.clone(), attachment.clone()));
                    format!("attach://{}", name)
                }
            };

            let mut entry = json!({ "type": item.kind.as_str(), "media": reference });
            if let Some(caption) = &item.caption {
                entry["caption"] = Value::String(caption.clone());
            }
            if let Some(parse_mode) = &item.parse_mode {
                entry["parse_mode"] = Value::String(parse_mode.clone());
            }
            items.push(entry);
        }
        params.text("media", Value::Array(items));

        let result = self.send_request("sendMediaGroup", params)?;
        let ids: Vec<i64> = result
            .as_array()
            .map(|messages| {
                messages
                    .iter()
                    .filter_map(|message| message["message_id"].as_i64())
                    .collect()
            })
            .unwrap_or_default();

        info!("Sent Telegram media group of {} message(s)", ids.len());
        Ok(ids)
    }

    pub fn send_location(
        &self,
        latitude: f64,
        longitude: f64,
        live_period: Option<u32>,
        options: &SendOptions,
    ) -> AppResult<i64> {
        let mut params = self.base_params(options)?;
        params.text("latitude", latitude);
        params.text("longitude", longitude);
        params.optional("live_period", live_period);

        self.send_message_request("sendLocation", params)
    }

    pub fn send_venue(
        &self,
        latitude: f64,
        longitude: f64,
        title: &str,
        address: &str,
        foursquare_id: Option<&str>,
        options: &SendOptions,
    ) -> AppResult<i64> {
        let mut params = self.base_params(options)?;
        params.text("latitude", latitude);
        params.text("longitude", longitude);
        params.text("title", title);
        params.text("address", address);
        params.optional("foursquare_id", foursquare_id);

        self.send_message_request("sendVenue", params)
    }

    pub fn send_contact(
        &self,
        phone_number: &str,
        first_name: &str,
        last_name: Option<&str>,
        options: &SendOptions,
    ) -> AppResult<i64> {
        let mut params = self.base_params(options)?;
        params.text("phone_number", phone_number);
        params.text("first_name", first_name);
        params.optional("last_name", last_name);

        self.send_message_request("sendContact", params)
    }

    fn base_params(&self, options: &SendOptions) -> AppResult<Params> {
        let chat_id = options
            .chat_id
            .clone()
            .unwrap_or_else(|| self.channel_username.clone());
        if chat_id.is_empty() {
            return Err(AppError::Config(
                "chat_id is not set and telegram.channel_username is empty".to_string(),
            ));
        }

        let mut params = Params::default();
        params.text("chat_id", chat_id);
        params.text("disable_notification", options.disable_notification);
        params.optional("reply_to_message_id", options.reply_to_message_id);
        if let Some(markup) = &options.reply_markup {
            params.text("reply_markup", markup.to_json()?);
        }
        Ok(params)
    }

    fn caption(&self, params: &mut Params, caption: &str, options: &SendOptions) {
        params.non_empty("caption", caption);
        params.optional("parse_mode", options.parse_mode.as_deref());
    }

    fn send_message_request(&self, method: &str, params: Params) -> AppResult<i64> {
        let result = self.send_request(method, params)?;
        let message_id = result["message_id"].as_i64().ok_or_else(|| {
            AppError::Protocol(format!("No message_id in Telegram {} response", method))
        })?;

        info!("Telegram {} delivered, message_id: {}", method, message_id);
        Ok(message_id)
    }

    fn send_request(&self, method: &str, params: Params) -> AppResult<Value> {
        let url = format!("{}{}/{}", API_URL, self.api_token, method);
        debug!(
            "Calling Telegram {} ({} fields, {} files)",
            method,
            params.fields.len(),
            params.files.len()
        );

        let request = if params.files.is_empty() {
            HttpRequest::post_form(url, params.fields)
        } else {
            HttpRequest::post_multipart(url, params.fields, params.files)
        };

        let response = self.transport.execute(&request)?;
        if response.status != 200 {
            error!("Telegram {} returned status: {}", method, response.status);
            return Err(error_from_response(&response));
        }

        let payload = parse_body(Platform::Telegram, &response.body)?;
        if payload["ok"] == Value::Bool(false) {
            error!("Telegram {} answered ok=false", method);
            return Err(error_from_response(&response));
        }

        Ok(payload["result"].clone())
    }
}

/// Ошибка из тела ответа: поле `description`, код из `error_code` или HTTP статуса
fn error_from_response(response: &HttpResponse) -> AppError {
    let status = Some(i64::from(response.status));
    if response.body.trim().is_empty() {
        return AppError::remote(Platform::Telegram, GENERIC_ERROR, status);
    }

    match serde_json::from_str::<Value>(&response.body) {
        Ok(payload) => {
            let code = payload["error_code"].as_i64().or(status);
            let message = payload["description"].as_str().unwrap_or(GENERIC_ERROR);
            AppError::remote(Platform::Telegram, message, code)
        }
        Err(_) => AppError::Protocol(format!(
            "Invalid Telegram error response (status {})",
            response.status
        )),
    }
}
