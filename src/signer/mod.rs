//! Request signing for the affiliate API.
//!
//! The signed text is `secret + k1 + v1 + k2 + v2 + ... + secret` with keys
//! in ascending order and values in their raw, unencoded form. The digest is
//! rendered as uppercase hex.

use std::fmt;
use std::str::FromStr;

use hmac::{Hmac, Mac};
use md5::Md5;
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::domain::params::{RequestParameters, SIGN_KEY};

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Error)]
pub enum SignError {
    #[error("invalid signing key: {0}")]
    InvalidKey(String),
}

pub type SignResult<T> = Result<T, SignError>;

/// Digest used to sign requests.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SignMethod {
    /// Plain SHA-256 over the wrapped text.
    #[default]
    Sha256,
    /// HMAC-SHA256 keyed with the secret over the wrapped text.
    HmacSha256,
    /// Legacy MD5 over the wrapped text.
    Md5,
}

impl SignMethod {
    /// Value sent upstream in the `sign_method` parameter.
    pub fn param_value(self) -> &'static str {
        match self {
            SignMethod::Sha256 | SignMethod::HmacSha256 => "sha256",
            SignMethod::Md5 => "md5",
        }
    }
}

impl FromStr for SignMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sha256" => Ok(SignMethod::Sha256),
            "hmac-sha256" | "hmac_sha256" | "hmac" => Ok(SignMethod::HmacSha256),
            "md5" => Ok(SignMethod::Md5),
            other => Err(format!("unsupported sign method `{other}`")),
        }
    }
}

impl fmt::Display for SignMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SignMethod::Sha256 => "sha256",
            SignMethod::HmacSha256 => "hmac-sha256",
            SignMethod::Md5 => "md5",
        };
        f.write_str(name)
    }
}

/// Builds the text that gets hashed: secret, sorted `key+value` pairs, secret.
///
/// Any existing `sign` entry is left out.
pub fn base_string(params: &RequestParameters, secret: &str) -> String {
    let mut text = String::with_capacity(secret.len() * 2 + params.len() * 16);
    text.push_str(secret);
    for (key, value) in params.unsigned_pairs() {
        text.push_str(key);
        text.push_str(&value);
    }
    text.push_str(secret);
    text
}

/// Signs parameter sets with a shared secret.
#[derive(Clone)]
pub struct Signer {
    secret: String,
    method: SignMethod,
}

impl fmt::Debug for Signer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signer")
            .field("secret", &"<redacted>")
            .field("method", &self.method)
            .finish()
    }
}

impl Signer {
    pub fn new(secret: impl Into<String>, method: SignMethod) -> Self {
        Self {
            secret: secret.into(),
            method,
        }
    }

    pub fn method(&self) -> SignMethod {
        self.method
    }

    /// Computes the signature without touching `params`.
    pub fn signature(&self, params: &RequestParameters) -> SignResult<String> {
        let text = base_string(params, &self.secret);
        let digest = match self.method {
            SignMethod::Sha256 => Sha256::digest(text.as_bytes()).to_vec(),
            SignMethod::HmacSha256 => {
                let mut mac = HmacSha256::new_from_slice(self.secret.as_bytes())
                    .map_err(|e| SignError::InvalidKey(e.to_string()))?;
                mac.update(text.as_bytes());
                mac.finalize().into_bytes().to_vec()
            }
            SignMethod::Md5 => Md5::digest(text.as_bytes()).to_vec(),
        };
        Ok(hex::encode_upper(digest))
    }

    /// Adds the `sign` parameter to `params`.
    pub fn sign(&self, params: &mut RequestParameters) -> SignResult<()> {
        let signature = self.signature(params)?;
        log::debug!("Signed {} parameters with {}", params.len(), self.method);
        params.insert(SIGN_KEY, signature);
        Ok(())
    }
}
