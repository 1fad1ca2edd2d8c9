pub mod mock;

use crate::config::ProxyConfig;
use crate::error::{AppError, AppResult};
use crate::models::Attachment;
use crate::oauth::encode_pairs;
use reqwest::blocking::multipart::{Form, Part};
use reqwest::blocking::Client;
use reqwest::header::CONTENT_TYPE;
use std::time::Duration;
use tracing::{debug, error};
use url::Url;

const USER_AGENT: &str = "sendto/0.2";
pub const TIMEOUT_SECS: u64 = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
        }
    }
}

/// Файловая часть multipart запроса
#[derive(Debug, Clone, PartialEq)]
pub struct FilePart {
    pub field: String,
    pub attachment: Attachment,
}

impl FilePart {
    pub fn new(field: impl Into<String>, attachment: Attachment) -> Self {
        FilePart {
            field: field.into(),
            attachment,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    Empty,
    Form(Vec<(String, String)>),
    Multipart {
        fields: Vec<(String, String)>,
        files: Vec<FilePart>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub body: RequestBody,
}

impl HttpRequest {
    pub fn get(url: impl Into<String>) -> Self {
        HttpRequest {
            method: HttpMethod::Get,
            url: url.into(),
            body: RequestBody::Empty,
        }
    }

    pub fn post_form(url: impl Into<String>, fields: Vec<(String, String)>) -> Self {
        HttpRequest {
            method: HttpMethod::Post,
            url: url.into(),
            body: RequestBody::Form(fields),
        }
    }

    pub fn post_multipart(url: impl Into<String>, fields: Vec<(String, String)>, files: Vec<FilePart>) -> Self {
        HttpRequest {
            method: HttpMethod::Post,
            url: url.into(),
            body: RequestBody::Multipart { fields, files },
        }
    }

    /// Текстовые поля тела (формы или multipart)
    pub fn fields(&self) -> &[(String, String)] {
        match &self.body {
            RequestBody::Empty => &[],
            RequestBody::Form(fields) => fields,
            RequestBody::Multipart { fields, .. } => fields,
        }
    }

    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields()
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn files(&self) -> &[FilePart] {
        match &self.body {
            RequestBody::Multipart { files, .. } => files,
            _ => &[],
        }
    }

    /// Декодированные параметры query строки URL
    pub fn query_pairs(&self) -> Vec<(String, String)> {
        Url::parse(&self.url)
            .map(|url| {
                url.query_pairs()
                    .map(|(key, value)| (key.into_owned(), value.into_owned()))
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        HttpResponse {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Транспорт HTTP: один вызов = один запрос, без повторов
pub trait HttpTransport: Send + Sync {
    fn execute(&self, request: &HttpRequest) -> AppResult<HttpResponse>;
}

/// Блокирующий транспорт на reqwest
pub struct ReqwestTransport {
    http_client: Client,
    proxy_url: Option<String>,
}

impl ReqwestTransport {
    pub fn new() -> AppResult<Self> {
        Self::with_proxy(None)
    }

    pub fn with_proxy(proxy: Option<&ProxyConfig>) -> AppResult<Self> {
        let mut builder = Client::builder()
            .timeout(Duration::from_secs(TIMEOUT_SECS))
            .user_agent(USER_AGENT);

        let mut proxy_url = None;
        if let Some(proxy) = proxy {
            debug!("Using {} proxy {}:{}", proxy.kind.scheme(), proxy.hostname, proxy.port);
            builder = builder.proxy(build_proxy(proxy)?);
            proxy_url = Some(format!("{}://{}:{}", proxy.kind.scheme(), proxy.hostname, proxy.port));
        }

        Ok(ReqwestTransport {
            http_client: builder.build()?,
            proxy_url,
        })
    }

    /// Адрес прокси без учётных данных
    pub fn proxy_url(&self) -> Option<&str> {
        self.proxy_url.as_deref()
    }
}

fn build_proxy(proxy: &ProxyConfig) -> AppResult<reqwest::Proxy> {
    let mut url = Url::parse(&format!(
        "{}://{}:{}",
        proxy.kind.scheme(),
        proxy.hostname,
        proxy.port
    ))?;

    if let Some(username) = &proxy.username {
        url.set_username(username)
            .map_err(|_| AppError::Config("proxy username cannot be set".to_string()))?;
        url.set_password(proxy.password.as_deref())
            .map_err(|_| AppError::Config("proxy password cannot be set".to_string()))?;
    }

    Ok(reqwest::Proxy::all(url.as_str())?)
}

impl HttpTransport for ReqwestTransport {
    fn execute(&self, request: &HttpRequest) -> AppResult<HttpResponse> {
        let builder = match request.method {
            HttpMethod::Get => self.http_client.get(&request.url),
            HttpMethod::Post => self.http_client.post(&request.url),
        };

        let builder = match &request.body {
            RequestBody::Empty => builder,
            RequestBody::Form(fields) => builder
                .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(encode_pairs(fields)),
            RequestBody::Multipart { fields, files } => {
                let mut form = Form::new();
                for (key, value) in fields {
                    form = form.text(key.clone(), value.clone());
                }
                for file in files {
                    let part = Part::bytes(file.attachment.data.clone())
                        .file_name(file.attachment.filename.clone())
                        .mime_str(&file.attachment.content_type)?;
                    form = form.part(file.field.clone(), part);
                }
                builder.multipart(form)
            }
        };

        let response = builder.send().map_err(|e| {
            error!("{} {} failed: {}", request.method.as_str(), request.url, e);
            AppError::network(e)
        })?;

        let status = response.status().as_u16();
        let body = response.text().map_err(AppError::network)?;
        debug!("{} {} -> {}", request.method.as_str(), request.url, status);

        Ok(HttpResponse { status, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_field_lookup() {
        let request = HttpRequest::post_form(
            "https://example.com/",
            vec![("chat_id".to_string(), "@news".to_string())],
        );
        assert_eq!(request.field("chat_id"), Some("@news"));
        assert_eq!(request.field("text"), None);
        assert!(request.files().is_empty());
    }

    #[test]
    fn query_pairs_are_decoded() {
        let request = HttpRequest::get("https://example.com/a?x=1%202&y=%C3%A9");
        assert_eq!(
            request.query_pairs(),
            vec![
                ("x".to_string(), "1 2".to_string()),
                ("y".to_string(), "é".to_string())
            ]
        );
    }

    #[test]
    fn success_range() {
        assert!(HttpResponse::new(200, "").is_success());
        assert!(HttpResponse::new(201, "").is_success());
        assert!(!HttpResponse::new(400, "").is_success());
        assert!(!HttpResponse::new(302, "").is_success());
    }

    #[test]
    fn proxy_with_credentials() {
        let proxy = ProxyConfig {
            username: Some("user".to_string()),
            password: Some("p@ss".to_string()),
            ..ProxyConfig::default()
        };
        assert!(build_proxy(&proxy).is_ok());
        let transport = ReqwestTransport::with_proxy(Some(&proxy)).unwrap();
        assert_eq!(transport.proxy_url(), Some("socks5h://127.0.0.1:9050"));
        assert_eq!(ReqwestTransport::new().unwrap().proxy_url(), None);
    }
}
