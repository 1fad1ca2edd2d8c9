use super::{id_field, parse_body};
use crate::config::TwitterConfig;
use crate::error::{AppError, AppResult};
use crate::models::{Attachment, Platform};
use crate::oauth::{KeyPair, OAuthSigner};
use crate::transport::{FilePart, HttpMethod, HttpRequest, HttpResponse, HttpTransport};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, error, info};
use url::Url;

pub const API_URL: &str = "https://api.twitter.com/1.1/";
pub const UPLOAD_URL: &str = "https://upload.twitter.com/1.1/media/upload.json";

/// Клиент Twitter API v1.1, каждый запрос подписан OAuth 1.0a
pub struct TwitterClient {
    transport: Arc<dyn HttpTransport>,
    signer: OAuthSigner,
}

impl TwitterClient {
    pub fn new(config: &TwitterConfig, transport: Arc<dyn HttpTransport>) -> AppResult<Self> {
        config.validate()?;

        let signer = OAuthSigner::new(
            KeyPair::new(&config.consumer_key, &config.consumer_secret),
            Some(KeyPair::new(&config.access_token, &config.access_token_secret)),
        );

        Ok(TwitterClient { transport, signer })
    }

    /// Публикует статус, предварительно загрузив медиа.
    ///
    /// `options` перекрывают `status` и `media_ids` при совпадении ключей.
    /// Загруженные медиа не удаляются, если публикация статуса не удалась.
    pub fn send_message(
        &self,
        message: &str,
        media: &[Attachment],
        options: &[(String, String)],
    ) -> AppResult<Value> {
        let mut media_ids = Vec::with_capacity(media.len());
        for attachment in media {
            media_ids.push(self.upload_media(attachment)?);
        }

        let mut data: Vec<(String, Option<String>)> = vec![
            ("status".to_string(), Some(message.to_string())),
            (
                "media_ids".to_string(),
                (!media_ids.is_empty()).then(|| media_ids.join(",")),
            ),
        ];
        for (key, value) in options {
            data.retain(|(existing, _)| existing != key);
            data.push((key.clone(), Some(value.clone())));
        }

        let status = self.request("statuses/update", HttpMethod::Post, &data, &[])?;
        info!(
            "Twitter status published with {} media, id: {}",
            media_ids.len(),
            status["id_str"].as_str().unwrap_or("?")
        );
        Ok(status)
    }

    /// Загружает один файл, возвращает `media_id_string`
    pub fn upload_media(&self, attachment: &Attachment) -> AppResult<String> {
        debug!("Uploading {} to Twitter", attachment.filename);

        let files = [FilePart::new("media", attachment.clone())];
        let response = self.request(UPLOAD_URL, HttpMethod::Post, &[], &files)?;

        id_field(Platform::Twitter, &response, "media_id_string")
    }

    /// Подписанный запрос к произвольному ресурсу.
    ///
    /// Поля со значением `None` отбрасываются. Для multipart текстовые поля
    /// уходят в query строку вместе с OAuth параметрами, тело содержит только файлы.
    pub fn request(
        &self,
        resource: &str,
        method: HttpMethod,
        data: &[(String, Option<String>)],
        files: &[FilePart],
    ) -> AppResult<Value> {
        let url = Url::parse(&resolve_resource(resource))?;
        let data: Vec<(String, String)> = data
            .iter()
            .filter_map(|(key, value)| value.as_ref().map(|value| (key.clone(), value.clone())))
            .collect();

        let signed = self.signer.sign(method, &url, &data)?;
        let request = match method {
            HttpMethod::Get => HttpRequest::get(signed.to_url()),
            HttpMethod::Post if files.is_empty() => {
                HttpRequest::post_form(signed.normalized_url(), signed.all_parameters())
            }
            HttpMethod::Post => HttpRequest::post_multipart(signed.to_url(), Vec::new(), files.to_vec()),
        };

        debug!("Calling Twitter {} {}", method.as_str(), signed.normalized_url());
        let response = self.transport.execute(&request)?;

        if response.status >= 400 {
            error!(
                "Twitter {} returned status: {}",
                signed.normalized_url(),
                response.status
            );
            return Err(error_from_response(&response));
        }

        parse_body(Platform::Twitter, &response.body)
    }
}

/// `statuses/update` -> `https://api.twitter.com/1.1/statuses/update.json`.
///
/// Ресурс с расширением дополняется только префиксом, полные URL не меняются
pub fn resolve_resource(resource: &str) -> String {
    if resource.starts_with("https://") || resource.starts_with("http://") {
        return resource.to_string();
    }

    let resource = resource.trim_start_matches('/');
    if resource.contains('.') {
        format!("{}{}", API_URL, resource)
    } else {
        format!("{}{}.json", API_URL, resource)
    }
}

fn error_from_response(response: &HttpResponse) -> AppError {
    let message = serde_json::from_str::<Value>(&response.body)
        .ok()
        .and_then(|payload| payload["errors"][0]["message"].as_str().map(str::to_string))
        .unwrap_or_else(|| {
            format!(
                "Server error #{} with answer {}",
                response.status, response.body
            )
        });

    AppError::remote(Platform::Twitter, message, Some(i64::from(response.status)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::mock::MockTransport;

    fn config() -> TwitterConfig {
        TwitterConfig {
            consumer_key: "ck".to_string(),
            consumer_secret: "cs".to_string(),
            access_token: "at".to_string(),
            access_token_secret: "ats".to_string(),
        }
    }

    fn client(transport: Arc<MockTransport>) -> TwitterClient {
        TwitterClient::new(&config(), transport).unwrap()
    }

    fn image(name: &str) -> Attachment {
        Attachment::new(name, "image/png", vec![0x89, 0x50])
    }

    #[test]
    fn resources_expand() {
        assert_eq!(
            resolve_resource("statuses/update"),
            "https://api.twitter.com/1.1/statuses/update.json"
        );
        assert_eq!(
            resolve_resource("/statuses/show.json"),
            "https://api.twitter.com/1.1/statuses/show.json"
        );
        assert_eq!(resolve_resource(UPLOAD_URL), UPLOAD_URL);
    }

    #[test]
    fn explicit_extension_is_kept() {
        assert_eq!(
            resolve_resource("media/upload.xml"),
            "https://api.twitter.com/1.1/media/upload.xml"
        );
        assert_eq!(
            resolve_resource("statuses/show/1.2"),
            "https://api.twitter.com/1.1/statuses/show/1.2"
        );
    }

    #[test]
    fn media_uploaded_before_status() {
        let transport = Arc::new(MockTransport::new());
        transport
            .push_response(200, r#"{"media_id":1,"media_id_string":"1"}"#)
            .push_response(200, r#"{"media_id":2,"media_id_string":"2"}"#)
            .push_response(200, r#"{"id_str":"900","text":"hello"}"#);

        let status = client(transport.clone())
            .send_message("hello", &[image("a.png"), image("b.png")], &[])
            .unwrap();

        assert_eq!(status["id_str"], "900");
        let requests = transport.requests();
        assert_eq!(requests.len(), 3);
        for upload in &requests[..2] {
            assert!(upload.url.starts_with(UPLOAD_URL));
            assert_eq!(upload.files()[0].field, "media");
            assert!(upload.fields().is_empty());
            assert!(upload
                .query_pairs()
                .iter()
                .any(|(key, _)| key == "oauth_signature"));
        }

        let update = &requests[2];
        assert_eq!(update.url, "https://api.twitter.com/1.1/statuses/update.json");
        assert_eq!(update.field("status"), Some("hello"));
        assert_eq!(update.field("media_ids"), Some("1,2"));
        assert_eq!(update.field("oauth_consumer_key"), Some("ck"));
        assert_eq!(update.field("oauth_token"), Some("at"));
    }

    #[test]
    fn status_without_media_omits_media_ids() {
        let transport = Arc::new(MockTransport::new());
        transport.push_response(200, r#"{"id_str":"1"}"#);

        client(transport.clone()).send_message("just text", &[], &[]).unwrap();

        let request = &transport.requests()[0];
        assert_eq!(transport.request_count(), 1);
        assert_eq!(request.field("media_ids"), None);
    }

    #[test]
    fn options_override_defaults() {
        let transport = Arc::new(MockTransport::new());
        transport.push_response(200, r#"{"id_str":"1"}"#);
        let options = vec![
            ("status".to_string(), "replaced".to_string()),
            ("in_reply_to_status_id".to_string(), "42".to_string()),
        ];

        client(transport.clone()).send_message("first draft", &[], &options).unwrap();

        let request = &transport.requests()[0];
        assert_eq!(request.field("status"), Some("replaced"));
        assert_eq!(request.field("in_reply_to_status_id"), Some("42"));
        assert_eq!(request.fields().iter().filter(|(key, _)| key == "status").count(), 1);
    }

    #[test]
    fn posted_signature_verifies() {
        let transport = Arc::new(MockTransport::new());
        transport.push_response(200, r#"{"id_str":"1"}"#);

        client(transport.clone()).send_message("Hello Ladies + Gentlemen", &[], &[]).unwrap();

        let request = &transport.requests()[0];
        let data: Vec<(String, String)> = request
            .fields()
            .iter()
            .filter(|(key, _)| !key.starts_with("oauth_"))
            .cloned()
            .collect();
        let signer = OAuthSigner::new(KeyPair::new("ck", "cs"), Some(KeyPair::new("at", "ats")));
        let expected = signer.sign_with(
            HttpMethod::Post,
            &Url::parse(&request.url).unwrap(),
            &data,
            request.field("oauth_nonce").unwrap(),
            request.field("oauth_timestamp").unwrap(),
        )
        .unwrap();

        assert_eq!(request.field("oauth_signature"), Some(expected.signature()));
    }

    #[test]
    fn get_sends_everything_in_url() {
        let transport = Arc::new(MockTransport::new());
        transport.push_response(200, r#"[]"#);
        let data = vec![
            ("count".to_string(), Some("5".to_string())),
            ("since_id".to_string(), None),
        ];

        client(transport.clone())
            .request("statuses/user_timeline", HttpMethod::Get, &data, &[])
            .unwrap();

        let request = &transport.requests()[0];
        let query = request.query_pairs();
        assert_eq!(request.method, HttpMethod::Get);
        assert!(query.contains(&("count".to_string(), "5".to_string())));
        assert!(!query.iter().any(|(key, _)| key == "since_id"));
        assert!(query.iter().any(|(key, _)| key == "oauth_signature"));
    }

    #[test]
    fn error_uses_first_message() {
        let transport = Arc::new(MockTransport::new());
        transport.push_response(
            403,
            r#"{"errors":[{"code":187,"message":"Status is a duplicate."}]}"#,
        );

        let error = client(transport).send_message("again", &[], &[]).unwrap_err();
        assert_eq!(error.remote_message(), Some("Status is a duplicate."));
    }

    #[test]
    fn error_without_payload_describes_status() {
        let transport = Arc::new(MockTransport::new());
        transport.push_response(503, "Over capacity");

        let error = client(transport).send_message("hi", &[], &[]).unwrap_err();
        assert_eq!(
            error.remote_message(),
            Some("Server error #503 with answer Over capacity")
        );
    }

    #[test]
    fn failed_upload_stops_the_flow() {
        let transport = Arc::new(MockTransport::new());
        transport.push_response(400, r#"{"errors":[{"message":"media type unrecognized."}]}"#);

        let result = client(transport.clone()).send_message("hi", &[image("a.png"), image("b.png")], &[]);

        assert!(result.is_err());
        assert_eq!(transport.request_count(), 1);
    }

    #[test]
    fn upload_without_id_is_protocol_error() {
        let transport = Arc::new(MockTransport::new());
        transport.push_response(200, r#"{"media_id_string":""}"#);

        let error = client(transport).upload_media(&image("a.png")).unwrap_err();
        assert!(matches!(error, AppError::Protocol(_)));
    }

    #[test]
    fn incomplete_credentials_rejected() {
        let mut config = config();
        config.access_token_secret.clear();
        let result = TwitterClient::new(&config, Arc::new(MockTransport::new()));
        assert!(matches!(result, Err(AppError::Config(_))));
    }
}
