//! Helpers for integration tests.
#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use hotdeal_poster::fetchers::AffiliateVerb;
use hotdeal_poster::http::{HttpResponse, HttpTransport, TransportError, TransportResult};
use hotdeal_poster::models::config::{AffiliateSettings, TelegramSettings};
use hotdeal_poster::notifiers::ParseMode;
use hotdeal_poster::signer::SignMethod;
use url::Url;

/// A request seen by [`FakeTransport`].
#[derive(Clone, Debug)]
pub enum Recorded {
    Get(Url),
    PostForm(Url, Vec<(String, String)>),
}

impl Recorded {
    pub fn url(&self) -> &Url {
        match self {
            Recorded::Get(url) | Recorded::PostForm(url, _) => url,
        }
    }

    pub fn form_value(&self, key: &str) -> Option<&str> {
        match self {
            Recorded::PostForm(_, form) => form
                .iter()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.as_str()),
            Recorded::Get(_) => None,
        }
    }
}

/// Transport that replays scripted responses in order and records requests.
#[derive(Default)]
pub struct FakeTransport {
    responses: Mutex<VecDeque<TransportResult<HttpResponse>>>,
    requests: Mutex<Vec<Recorded>>,
}

impl FakeTransport {
    pub fn new(responses: Vec<TransportResult<HttpResponse>>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<Recorded> {
        self.requests
            .lock()
            .expect("requests mutex poisoned")
            .clone()
    }

    fn next(&self, recorded: Recorded) -> TransportResult<HttpResponse> {
        let url = recorded.url().to_string();
        self.requests
            .lock()
            .expect("requests mutex poisoned")
            .push(recorded);
        self.responses
            .lock()
            .expect("responses mutex poisoned")
            .pop_front()
            .unwrap_or_else(|| {
                Err(TransportError::Request {
                    url,
                    reason: "no scripted response left".to_string(),
                })
            })
    }
}

#[async_trait]
impl HttpTransport for FakeTransport {
    async fn get(&self, url: &Url) -> TransportResult<HttpResponse> {
        self.next(Recorded::Get(url.clone()))
    }

    async fn post_form(
        &self,
        url: &Url,
        form: &[(String, String)],
    ) -> TransportResult<HttpResponse> {
        self.next(Recorded::PostForm(url.clone(), form.to_vec()))
    }
}

pub fn json(status: u16, body: &str) -> TransportResult<HttpResponse> {
    Ok(HttpResponse {
        status,
        content_type: Some("application/json;charset=UTF-8".to_string()),
        body: body.to_string(),
    })
}

pub fn html(status: u16, body: &str) -> TransportResult<HttpResponse> {
    Ok(HttpResponse {
        status,
        content_type: Some("text/html".to_string()),
        body: body.to_string(),
    })
}

pub fn connection_refused(url: &str) -> TransportResult<HttpResponse> {
    Err(TransportError::Request {
        url: url.to_string(),
        reason: "connection refused".to_string(),
    })
}

pub fn affiliate_settings(endpoints: &[&str]) -> AffiliateSettings {
    AffiliateSettings {
        app_key: "503000".to_string(),
        app_secret: "test-secret".to_string(),
        tracking_id: "hotdeals".to_string(),
        method: "aliexpress.affiliate.hotproduct.query".to_string(),
        endpoints: endpoints
            .iter()
            .map(|e| Url::parse(e).expect("valid endpoint"))
            .collect(),
        verb: AffiliateVerb::Get,
        sign_method: SignMethod::Sha256,
        target_currency: "USD".to_string(),
        target_language: "EN".to_string(),
        page_size: 1,
        fields: "product_title,product_main_image_url,product_detail_url,sale_price".to_string(),
    }
}

pub fn telegram_settings() -> TelegramSettings {
    TelegramSettings {
        token: "123456:TEST".to_string(),
        channel: "@hotdeals".to_string(),
        parse_mode: ParseMode::Html,
        api_base: Url::parse("https://api.telegram.org").expect("valid base"),
    }
}

pub const ONE_PRODUCT: &str = r#"{"resp_result":{
    "resp_code": 200,
    "resp_msg": "Call succeeds",
    "result": {"products": [{
        "product_title": "Mini Projector",
        "product_main_image_url": "https://ae01.example.com/projector.jpg",
        "product_detail_url": "https://www.aliexpress.com/item/1005001.html",
        "sale_price": "39.99"
    }]}
}}"#;

pub const NO_PRODUCTS: &str = r#"{"resp_result":{"resp_code":200,"result":{"products":[]}}}"#;

pub const BOT_OK: &str = r#"{"ok":true,"result":{"message_id":7}}"#;
