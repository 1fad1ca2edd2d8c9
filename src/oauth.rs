//! Подпись запросов OAuth 1.0a (HMAC-SHA1)
//!
//! Подпись считается заново для каждого запроса: nonce и timestamp
//! генерируются при каждом вызове [`OAuthSigner::sign`]. Для проверки
//! по известным векторам есть [`OAuthSigner::sign_with`].

use crate::error::{AppError, AppResult};
use crate::transport::HttpMethod;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use hmac::{Hmac, Mac};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use sha1::Sha1;
use url::Url;

pub const SIGNATURE_METHOD: &str = "HMAC-SHA1";
pub const OAUTH_VERSION: &str = "1.0";

/// RFC 3986: без экранирования только `A-Za-z0-9-._~`
const UNRESERVED: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

type HmacSha1 = Hmac<Sha1>;

/// Percent-encoding по RFC 3986, побайтово для UTF-8
pub fn percent_encode(input: &str) -> String {
    utf8_percent_encode(input, UNRESERVED).to_string()
}

/// `key=value&key=value` с тем же кодированием, что и в подписи
pub fn encode_pairs(pairs: &[(String, String)]) -> String {
    pairs
        .iter()
        .map(|(key, value)| format!("{}={}", percent_encode(key), percent_encode(value)))
        .collect::<Vec<_>>()
        .join("&")
}

/// Ключ и секрет: consumer или token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyPair {
    pub key: String,
    pub secret: String,
}

impl KeyPair {
    pub fn new(key: impl Into<String>, secret: impl Into<String>) -> Self {
        KeyPair {
            key: key.into(),
            secret: secret.into(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct OAuthSigner {
    consumer: KeyPair,
    token: Option<KeyPair>,
}

impl OAuthSigner {
    pub fn new(consumer: KeyPair, token: Option<KeyPair>) -> Self {
        OAuthSigner { consumer, token }
    }

    /// Подписывает запрос со свежими nonce и timestamp.
    ///
    /// `parameters`: поля формы или query; файлы multipart сюда не передаются.
    /// Параметры из query строки `url` добавляются автоматически.
    pub fn sign(&self, method: HttpMethod, url: &Url, parameters: &[(String, String)]) -> AppResult<SignedRequest> {
        self.sign_with(method, url, parameters, &generate_nonce(), &generate_timestamp())
    }

    pub fn sign_with(
        &self,
        method: HttpMethod,
        url: &Url,
        parameters: &[(String, String)],
        nonce: &str,
        timestamp: &str,
    ) -> AppResult<SignedRequest> {
        let mut oauth = vec![
            ("oauth_consumer_key".to_string(), self.consumer.key.clone()),
            ("oauth_nonce".to_string(), nonce.to_string()),
            ("oauth_signature_method".to_string(), SIGNATURE_METHOD.to_string()),
            ("oauth_timestamp".to_string(), timestamp.to_string()),
            ("oauth_version".to_string(), OAUTH_VERSION.to_string()),
        ];
        if let Some(token) = &self.token {
            oauth.push(("oauth_token".to_string(), token.key.clone()));
        }

        let mut request_parameters: Vec<(String, String)> = url
            .query_pairs()
            .map(|(key, value)| (key.into_owned(), value.into_owned()))
            .collect();
        request_parameters.extend(parameters.iter().cloned());

        let normalized_url = normalize_url(url);
        let normalized_parameters = normalize_parameters(
            request_parameters
                .iter()
                .chain(oauth.iter())
                .filter(|(key, _)| key != "oauth_signature"),
        );
        let base_string = format!(
            "{}&{}&{}",
            method.as_str(),
            percent_encode(&normalized_url),
            percent_encode(&normalized_parameters)
        );

        let token_secret = self.token.as_ref().map(|token| token.secret.as_str()).unwrap_or("");
        let key = signing_key(&self.consumer.secret, token_secret);
        let signature = hmac_sha1_base64(&key, &base_string)?;
        oauth.push(("oauth_signature".to_string(), signature.clone()));

        Ok(SignedRequest {
            url: normalized_url,
            parameters: request_parameters,
            oauth,
            base_string,
            signature,
        })
    }
}

/// Подписанный запрос: готов к отправке как query, тело формы или заголовок
#[derive(Debug, Clone)]
pub struct SignedRequest {
    url: String,
    parameters: Vec<(String, String)>,
    oauth: Vec<(String, String)>,
    base_string: String,
    signature: String,
}

impl SignedRequest {
    pub fn signature(&self) -> &str {
        &self.signature
    }

    pub fn base_string(&self) -> &str {
        &self.base_string
    }

    /// URL без query, в нормализованном виде
    pub fn normalized_url(&self) -> &str {
        &self.url
    }

    /// Только `oauth_*` параметры, включая подпись
    pub fn oauth_parameters(&self) -> &[(String, String)] {
        &self.oauth
    }

    pub fn all_parameters(&self) -> Vec<(String, String)> {
        self.parameters.iter().chain(self.oauth.iter()).cloned().collect()
    }

    pub fn to_postdata(&self) -> String {
        encode_pairs(&self.all_parameters())
    }

    pub fn to_url(&self) -> String {
        format!("{}?{}", self.url, self.to_postdata())
    }

    pub fn to_header(&self) -> String {
        let fields = self
            .oauth
            .iter()
            .map(|(key, value)| format!("{}=\"{}\"", percent_encode(key), percent_encode(value)))
            .collect::<Vec<_>>()
            .join(", ");
        format!("OAuth {}", fields)
    }
}

/// Нормализованные параметры: кодирование, сортировка по ключу, затем по значению
pub fn normalize_parameters<'a, I>(parameters: I) -> String
where
    I: IntoIterator<Item = &'a (String, String)>,
{
    let mut encoded: Vec<(String, String)> = parameters
        .into_iter()
        .map(|(key, value)| (percent_encode(key), percent_encode(value)))
        .collect();
    encoded.sort();

    encoded
        .into_iter()
        .map(|(key, value)| format!("{}={}", key, value))
        .collect::<Vec<_>>()
        .join("&")
}

/// scheme://host[:port]/path, схема и хост в нижнем регистре, порт по умолчанию опускается
pub fn normalize_url(url: &Url) -> String {
    let host = url.host_str().unwrap_or_default();
    match url.port() {
        Some(port) => format!("{}://{}:{}{}", url.scheme(), host, port, url.path()),
        None => format!("{}://{}{}", url.scheme(), host, url.path()),
    }
}

fn signing_key(consumer_secret: &str, token_secret: &str) -> String {
    format!("{}&{}", percent_encode(consumer_secret), percent_encode(token_secret))
}

fn hmac_sha1_base64(key: &str, data: &str) -> AppResult<String> {
    let mut mac = HmacSha1::new_from_slice(key.as_bytes())
        .map_err(|e| AppError::Config(format!("OAuth signing key rejected: {}", e)))?;
    mac.update(data.as_bytes());
    Ok(BASE64.encode(mac.finalize().into_bytes()))
}

fn generate_nonce() -> String {
    let bytes: [u8; 32] = rand::random();
    bytes.iter().map(|byte| format!("{:02x}", byte)).collect()
}

fn generate_timestamp() -> String {
    chrono::Utc::now().timestamp().to_string()
}
