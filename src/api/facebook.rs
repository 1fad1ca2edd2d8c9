use super::{id_field, parse_body};
use crate::config::FacebookConfig;
use crate::error::{AppError, AppResult};
use crate::models::{Attachment, Platform};
use crate::transport::{FilePart, HttpRequest, HttpResponse, HttpTransport};
use hmac::{Hmac, Mac};
use serde_json::{json, Value};
use sha2::Sha256;
use std::sync::Arc;
use tracing::{debug, error, info};

pub const GRAPH_URL: &str = "https://graph.facebook.com";
pub const GRAPH_VIDEO_URL: &str = "https://graph-video.facebook.com";

type HmacSha256 = Hmac<Sha256>;

/// Публикации от имени страницы через Graph API
pub struct FacebookClient {
    transport: Arc<dyn HttpTransport>,
    graph_version: String,
    page_access_token: String,
    appsecret_proof: Option<String>,
}

impl FacebookClient {
    pub fn new(config: &FacebookConfig, transport: Arc<dyn HttpTransport>) -> AppResult<Self> {
        config.validate()?;

        let appsecret_proof = (!config.app_secret.is_empty())
            .then(|| appsecret_proof(&config.app_secret, &config.page_access_token))
            .transpose()?;

        Ok(FacebookClient {
            transport,
            graph_version: config.default_graph_version.clone(),
            page_access_token: config.page_access_token.clone(),
            appsecret_proof,
        })
    }

    pub fn send_link(&self, link: &str, message: Option<&str>) -> AppResult<String> {
        let mut fields = vec![("link".to_string(), link.to_string())];
        push_optional(&mut fields, "message", message);

        let response = self.post(&self.graph_endpoint("me/feed"), fields, Vec::new())?;
        let id = id_field(Platform::Facebook, &response, "id")?;

        info!("Facebook link posted, id: {}", id);
        Ok(id)
    }

    /// Одно фото; `published = false` загружает его без публикации в ленту
    pub fn send_photo(&self, photo: &Attachment, message: Option<&str>, published: bool) -> AppResult<String> {
        let mut fields = vec![("published".to_string(), published.to_string())];
        push_optional(&mut fields, "message", message);
        let files = vec![FilePart::new("source", photo.clone())];

        let response = self.post(&self.graph_endpoint("me/photos"), fields, files)?;
        let id = id_field(Platform::Facebook, &response, "id")?;

        info!("Facebook photo {} uploaded (published: {}), id: {}", photo.filename, published, id);
        Ok(id)
    }

    /// Пост из нескольких фото.
    ///
    /// Каждое фото загружается неопубликованным, затем создаётся один пост
    /// с `attached_media[i]`. Если пост не создан, загруженные фото остаются на странице.
    pub fn send_photos(
        &self,
        photos: &[Attachment],
        message: Option<&str>,
        photo_messages: &[String],
    ) -> AppResult<String> {
        let mut media_ids = Vec::with_capacity(photos.len());
        for (index, photo) in photos.iter().enumerate() {
            let caption = photo_messages.get(index).map(String::as_str);
            media_ids.push(self.send_photo(photo, caption, false)?);
        }

        let mut fields = Vec::with_capacity(media_ids.len() + 1);
        push_optional(&mut fields, "message", message);
        for (index, id) in media_ids.iter().enumerate() {
            fields.push((
                format!("attached_media[{}]", index),
                json!({ "media_fbid": id }).to_string(),
            ));
        }

        let response = self.post(&self.graph_endpoint("me/feed"), fields, Vec::new())?;
        let id = id_field(Platform::Facebook, &response, "id")?;

        info!("Facebook post with {} photo(s) created, id: {}", media_ids.len(), id);
        Ok(id)
    }

    pub fn send_video(&self, video: &Attachment, title: &str, description: Option<&str>) -> AppResult<String> {
        let mut fields = vec![("title".to_string(), title.to_string())];
        push_optional(&mut fields, "description", description);
        let files = vec![FilePart::new("source", video.clone())];

        let url = format!("{}/{}/me/videos", GRAPH_VIDEO_URL, self.graph_version);
        let response = self.post(&url, fields, files)?;
        let id = id_field(Platform::Facebook, &response, "id")?;

        info!("Facebook video {} uploaded, id: {}", video.filename, id);
        Ok(id)
    }

    fn graph_endpoint(&self, path: &str) -> String {
        format!("{}/{}/{}", GRAPH_URL, self.graph_version, path)
    }

    fn post(&self, url: &str, mut fields: Vec<(String, String)>, files: Vec<FilePart>) -> AppResult<Value> {
        fields.push(("access_token".to_string(), self.page_access_token.clone()));
        if let Some(proof) = &self.appsecret_proof {
            fields.push(("appsecret_proof".to_string(), proof.clone()));
        }

        debug!("Calling Graph API {} ({} files)", url, files.len());
        let request = if files.is_empty() {
            HttpRequest::post_form(url, fields)
        } else {
            HttpRequest::post_multipart(url, fields, files)
        };

        let response = self.transport.execute(&request)?;
        if !response.is_success() {
            error!("Graph API {} returned status: {}", url, response.status);
            return Err(error_from_response(&response));
        }

        let payload = parse_body(Platform::Facebook, &response.body)?;
        if payload.get("error").is_some() {
            error!("Graph API {} answered with an error object", url);
            return Err(error_from_response(&response));
        }
        Ok(payload)
    }
}

/// hex(HMAC-SHA256(app_secret, access_token))
pub fn appsecret_proof(app_secret: &str, access_token: &str) -> AppResult<String> {
    let mut mac = HmacSha256::new_from_slice(app_secret.as_bytes())
        .map_err(|e| AppError::Config(format!("facebook.app_secret rejected: {}", e)))?;
    mac.update(access_token.as_bytes());
    Ok(mac
        .finalize()
        .into_bytes()
        .iter()
        .map(|byte| format!("{:02x}", byte))
        .collect())
}

fn push_optional(fields: &mut Vec<(String, String)>, key: &str, value: Option<&str>) {
    if let Some(value) = value {
        fields.push((key.to_string(), value.to_string()));
    }
}

fn error_from_response(response: &HttpResponse) -> AppError {
    let payload = serde_json::from_str::<Value>(&response.body).unwrap_or(Value::Null);
    let detail = payload["error"]["message"]
        .as_str()
        .map(str::to_string)
        .unwrap_or_else(|| format!("HTTP {}", response.status));
    let code = payload["error"]["code"]
        .as_i64()
        .or(Some(i64::from(response.status)));

    AppError::remote(
        Platform::Facebook,
        format!("Graph returned an error: {}", detail),
        code,
    )
}
