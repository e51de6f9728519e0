use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use serde::Deserialize;
use serde_json::Value;
use url::Url;

use crate::domain::params::RequestParameters;
use crate::domain::product::{Product, UNKNOWN_PRICE, UNKNOWN_TITLE};
use crate::fetchers::{AffiliateVerb, EndpointFailure, FetchError, FetchResult, ProductFetcher};
use crate::http::{HttpTransport, redact};
use crate::models::config::AffiliateSettings;
use crate::signer::Signer;

/// Either a JSON string or a JSON number; the API is not consistent.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Scalar {
    Text(String),
    Number(serde_json::Number),
}

impl Scalar {
    fn into_text(self) -> Option<String> {
        let text = match self {
            Scalar::Text(s) => s.trim().to_string(),
            Scalar::Number(n) => n.to_string(),
        };
        (!text.is_empty()).then_some(text)
    }
}

#[derive(Debug, Deserialize)]
struct ProductJson {
    product_id: Option<Scalar>,
    product_title: Option<Scalar>,
    product_main_image_url: Option<Scalar>,
    product_detail_url: Option<Scalar>,
    promotion_link: Option<Scalar>,
    sale_price: Option<Scalar>,
    target_sale_price: Option<Scalar>,
    sale_price_currency: Option<Scalar>,
    target_sale_price_currency: Option<Scalar>,
    discount: Option<Scalar>,
}

fn text(value: Option<Scalar>) -> Option<String> {
    value.and_then(Scalar::into_text)
}

fn parse_error(e: serde_json::Error) -> FetchError {
    FetchError::Parse(e.to_string())
}

impl From<ProductJson> for Product {
    fn from(p: ProductJson) -> Self {
        Product {
            product_id: text(p.product_id),
            title: text(p.product_title).unwrap_or_else(|| UNKNOWN_TITLE.to_string()),
            image_url: text(p.product_main_image_url),
            detail_url: text(p.product_detail_url).or_else(|| text(p.promotion_link)),
            sale_price: text(p.sale_price)
                .or_else(|| text(p.target_sale_price))
                .unwrap_or_else(|| UNKNOWN_PRICE.to_string()),
            sale_price_currency: text(p.sale_price_currency)
                .or_else(|| text(p.target_sale_price_currency)),
            discount: text(p.discount),
        }
    }
}

/// Extracts the first product from an affiliate API response body.
///
/// Accepts the flat `resp_result.result.products` array as well as the
/// envelope keyed by the method name, where the array sits under
/// `products.product`.
pub fn parse_first_product(body: &str, method: &str) -> FetchResult<Product> {
    let json: Value = serde_json::from_str(body).map_err(parse_error)?;

    if let Some(err) = json.get("error_response") {
        let code = match err.get("code") {
            Some(Value::String(code)) => code.clone(),
            Some(code) => code.to_string(),
            None => String::new(),
        };
        let msg = err
            .get("msg")
            .and_then(Value::as_str)
            .unwrap_or("unknown error");
        return Err(FetchError::Upstream(format!("{msg} (code {code})")));
    }

    let envelope = format!("{}_response", method.replace('.', "_"));
    let resp_result = json
        .get(&envelope)
        .and_then(|v| v.get("resp_result"))
        .or_else(|| json.get("resp_result"))
        .ok_or_else(|| FetchError::Parse("missing resp_result".to_string()))?;

    if let Some(code) = resp_result.get("resp_code").and_then(Value::as_i64)
        && code != 200
    {
        let msg = resp_result
            .get("resp_msg")
            .and_then(Value::as_str)
            .unwrap_or("no message");
        return Err(FetchError::Upstream(format!("{msg} (resp_code {code})")));
    }

    let products = match resp_result.get("result").and_then(|r| r.get("products")) {
        Some(Value::Array(items)) => items,
        Some(Value::Object(wrapper)) => match wrapper.get("product") {
            Some(Value::Array(items)) => items,
            _ => return Err(FetchError::Empty),
        },
        Some(Value::Null) | None => return Err(FetchError::Empty),
        Some(other) => {
            return Err(FetchError::Parse(format!(
                "unexpected products value: {other}"
            )));
        }
    };

    let first = products.first().ok_or(FetchError::Empty)?;
    let product: ProductJson = serde_json::from_value(first.clone()).map_err(parse_error)?;
    Ok(product.into())
}

/// Fetches hot products from the AliExpress affiliate API, trying each
/// configured endpoint in order.
pub struct AliexpressFetcher {
    settings: AffiliateSettings,
    signer: Signer,
    transport: Arc<dyn HttpTransport>,
}

impl AliexpressFetcher {
    pub fn new(settings: AffiliateSettings, transport: Arc<dyn HttpTransport>) -> Self {
        let signer = Signer::new(settings.app_secret.clone(), settings.sign_method);
        Self {
            settings,
            signer,
            transport,
        }
    }

    /// Builds the unsigned parameter set for a request made at `timestamp_ms`.
    pub fn build_params(&self, timestamp_ms: i64) -> RequestParameters {
        let s = &self.settings;
        RequestParameters::new()
            .with("app_key", s.app_key.as_str())
            .with("method", s.method.as_str())
            .with("format", "json")
            .with("sign_method", self.signer.method().param_value())
            .with("timestamp", timestamp_ms)
            .with("v", "2.0")
            .with("tracking_id", s.tracking_id.as_str())
            .with("fields", s.fields.as_str())
            .with("target_currency", s.target_currency.as_str())
            .with("target_language", s.target_language.as_str())
            .with("page_size", s.page_size)
    }

    /// Builds and signs the parameter set for a request made at `timestamp_ms`.
    pub fn signed_params(&self, timestamp_ms: i64) -> FetchResult<RequestParameters> {
        let mut params = self.build_params(timestamp_ms);
        self.signer.sign(&mut params)?;
        Ok(params)
    }

    /// Runs the endpoint fallback loop with an already signed parameter set.
    pub async fn fetch_with(&self, params: &RequestParameters) -> FetchResult<Product> {
        let mut failures = Vec::new();

        for endpoint in &self.settings.endpoints {
            match self.try_endpoint(endpoint, params).await {
                Ok(product) => {
                    log::info!("Fetched \"{}\" from {}", product.title, redact(endpoint));
                    return Ok(product);
                }
                Err(error) => {
                    log::warn!("No product from {}: {error}", redact(endpoint));
                    failures.push(EndpointFailure {
                        endpoint: redact(endpoint),
                        error,
                    });
                }
            }
        }

        Err(FetchError::NoProductAvailable(failures))
    }

    async fn try_endpoint(
        &self,
        endpoint: &Url,
        params: &RequestParameters,
    ) -> FetchResult<Product> {
        let res = match self.settings.verb {
            AffiliateVerb::Get => {
                let url = params.apply_to(endpoint);
                self.transport.get(&url).await?
            }
            AffiliateVerb::Post => {
                let form = params.to_pairs();
                self.transport.post_form(endpoint, &form).await?
            }
        };

        if !res.is_success() {
            log::debug!("Body from {}: {}", redact(endpoint), res.body);
            // Prefer the upstream error message over the bare status.
            let error = match parse_first_product(&res.body, &self.settings.method) {
                Err(upstream @ FetchError::Upstream(_)) => upstream,
                _ => FetchError::Status(res.status),
            };
            return Err(error);
        }
        if !res.declares_json() {
            log::debug!(
                "{} answered with content type {:?}, parsing as JSON anyway",
                redact(endpoint),
                res.content_type
            );
        }

        parse_first_product(&res.body, &self.settings.method)
    }
}

#[async_trait]
impl ProductFetcher for AliexpressFetcher {
    async fn fetch_product(&self) -> FetchResult<Product> {
        let params = self.signed_params(Utc::now().timestamp_millis())?;
        self.fetch_with(&params).await
    }
}
