//! Minimal HTTP seam shared by the fetcher and the notifier.

use async_trait::async_trait;
use reqwest::header::{CONTENT_TYPE, HeaderValue};
use thiserror::Error;
use url::Url;
use url::form_urlencoded;

const DEFAULT_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("failed to build HTTP client: {0}")]
    Build(String),
    #[error("request to {url} failed: {reason}")]
    Request { url: String, reason: String },
}

pub type TransportResult<T> = Result<T, TransportError>;

/// Status, content type and body of a finished request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: String,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Whether the server labelled the body as JSON. Advisory only.
    pub fn declares_json(&self) -> bool {
        self.content_type
            .as_deref()
            .is_some_and(|ct| ct.to_ascii_lowercase().contains("json"))
    }
}

/// Something that can perform a GET or a form POST.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn get(&self, url: &Url) -> TransportResult<HttpResponse>;

    async fn post_form(&self, url: &Url, form: &[(String, String)])
    -> TransportResult<HttpResponse>;
}

/// Builds the shared `reqwest` client with the crate user agent.
pub fn build_reqwest_client() -> TransportResult<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(DEFAULT_USER_AGENT)
        .build()
        .map_err(|e| TransportError::Build(e.to_string()))
}

/// [`HttpTransport`] backed by `reqwest`, using the client's default timeouts.
#[derive(Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new() -> TransportResult<Self> {
        Ok(Self {
            client: build_reqwest_client()?,
        })
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    async fn read(url: &Url, res: reqwest::Response) -> TransportResult<HttpResponse> {
        let status = res.status().as_u16();
        let content_type = res
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = res.text().await.map_err(|e| TransportError::Request {
            url: redact(url),
            reason: e.to_string(),
        })?;
        Ok(HttpResponse {
            status,
            content_type,
            body,
        })
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn get(&self, url: &Url) -> TransportResult<HttpResponse> {
        let res = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| TransportError::Request {
                url: redact(url),
                reason: e.without_url().to_string(),
            })?;
        Self::read(url, res).await
    }

    async fn post_form(
        &self,
        url: &Url,
        form: &[(String, String)],
    ) -> TransportResult<HttpResponse> {
        let body = form_urlencoded::Serializer::new(String::new())
            .extend_pairs(form.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .finish();
        let res = self
            .client
            .post(url.clone())
            .header(
                CONTENT_TYPE,
                HeaderValue::from_static("application/x-www-form-urlencoded"),
            )
            .body(body)
            .send()
            .await
            .map_err(|e| TransportError::Request {
                url: redact(url),
                reason: e.without_url().to_string(),
            })?;
        Self::read(url, res).await
    }
}

/// Host and path only, so tokens in paths and signed queries stay out of logs.
pub fn redact(url: &Url) -> String {
    let host = url.host_str().unwrap_or_default();
    let path = url.path();
    // Telegram puts the bot token in the first path segment.
    if let Some(rest) = path.strip_prefix("/bot")
        && let Some(idx) = rest.find('/')
    {
        return format!("{}://{}/bot<token>{}", url.scheme(), host, &rest[idx..]);
    }
    format!("{}://{}{}", url.scheme(), host, path)
}
