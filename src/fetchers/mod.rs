use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::product::Product;
use crate::http::TransportError;
use crate::signer::SignError;

pub mod aliexpress;

/// HTTP verb used against the affiliate endpoint.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum AffiliateVerb {
    /// Parameters travel in the query string.
    #[default]
    Get,
    /// Parameters travel in a form-encoded body.
    Post,
}

impl FromStr for AffiliateVerb {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "GET" => Ok(AffiliateVerb::Get),
            "POST" => Ok(AffiliateVerb::Post),
            other => Err(format!("unsupported HTTP method `{other}`")),
        }
    }
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error("unexpected HTTP status {0}")]
    Status(u16),
    #[error("unusable response body: {0}")]
    Parse(String),
    #[error("upstream rejected the request: {0}")]
    Upstream(String),
    #[error("response contained no products")]
    Empty,
    #[error(transparent)]
    Sign(#[from] SignError),
    #[error("no product available after trying {} endpoint(s)", .0.len())]
    NoProductAvailable(Vec<EndpointFailure>),
}

pub type FetchResult<T> = Result<T, FetchError>;

/// Why a single candidate endpoint did not yield a product.
#[derive(Debug)]
pub struct EndpointFailure {
    pub endpoint: String,
    pub error: FetchError,
}

impl fmt::Display for EndpointFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.endpoint, self.error)
    }
}

/// A source of products to announce.
#[async_trait]
pub trait ProductFetcher: Send + Sync {
    /// Returns one product, or the reason none could be obtained.
    async fn fetch_product(&self) -> FetchResult<Product>;
}
