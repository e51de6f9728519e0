//! Request parameters sent to the affiliate API.

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;

use url::Url;
use url::form_urlencoded;

/// Name of the parameter carrying the computed signature.
pub const SIGN_KEY: &str = "sign";

/// A single parameter value.
///
/// Integers are kept as integers until they are rendered, and always render
/// as their decimal string so the signed text matches the transported text.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ParamValue {
    Text(String),
    Int(i64),
}

impl ParamValue {
    pub fn as_str(&self) -> Cow<'_, str> {
        match self {
            ParamValue::Text(s) => Cow::Borrowed(s),
            ParamValue::Int(n) => Cow::Owned(n.to_string()),
        }
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_str())
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        ParamValue::Text(value.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(value: String) -> Self {
        ParamValue::Text(value)
    }
}

impl From<i64> for ParamValue {
    fn from(value: i64) -> Self {
        ParamValue::Int(value)
    }
}

impl From<u32> for ParamValue {
    fn from(value: u32) -> Self {
        ParamValue::Int(i64::from(value))
    }
}

/// Key/value set for one affiliate request.
///
/// Keys are kept sorted, which is the order the signer needs. A value set is
/// built for a single request and consumed by it.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RequestParameters {
    entries: BTreeMap<String, ParamValue>,
}

impl RequestParameters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces a parameter.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<ParamValue>) {
        self.entries.insert(key.into(), value.into());
    }

    /// Builder-style [`insert`](Self::insert).
    pub fn with(mut self, key: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&ParamValue> {
        self.entries.get(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn is_signed(&self) -> bool {
        self.entries.contains_key(SIGN_KEY)
    }

    /// Parameters in ascending key order, excluding the signature itself.
    pub fn unsigned_pairs(&self) -> impl Iterator<Item = (&str, Cow<'_, str>)> {
        self.entries
            .iter()
            .filter(|(k, _)| k.as_str() != SIGN_KEY)
            .map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// All parameters rendered as owned string pairs, signature included.
    pub fn to_pairs(&self) -> Vec<(String, String)> {
        self.entries
            .iter()
            .map(|(k, v)| (k.clone(), v.as_str().into_owned()))
            .collect()
    }

    /// Form-encodes every parameter for transport.
    pub fn to_query_string(&self) -> String {
        let mut serializer = form_urlencoded::Serializer::new(String::new());
        for (key, value) in &self.entries {
            serializer.append_pair(key, &value.as_str());
        }
        serializer.finish()
    }

    /// Returns `base` with these parameters appended to its query.
    pub fn apply_to(&self, base: &Url) -> Url {
        let mut url = base.clone();
        {
            let mut query = url.query_pairs_mut();
            for (key, value) in &self.entries {
                query.append_pair(key, &value.as_str());
            }
        }
        url
    }
}
