//! Configuration model loaded from external sources.
//!
//! Settings come from an optional YAML file overlaid by the process
//! environment. Required credentials are checked once, here, so the rest of
//! the service never sees an empty key.

use std::env;
use std::fmt;
use std::path::Path;
use std::time::Duration;

use config::{Config, Environment, File, FileFormat};
use serde::Deserialize;
use thiserror::Error;
use url::Url;

use crate::fetchers::AffiliateVerb;
use crate::notifiers::ParseMode;
use crate::signer::SignMethod;

/// YAML file read when `HOTDEAL_CONFIG` is not set. It may be absent.
pub const DEFAULT_CONFIG_FILE: &str = "hotdeal.yaml";
pub const DEFAULT_AFFILIATE_ENDPOINT: &str = "https://api-sg.aliexpress.com/sync";
pub const DEFAULT_AFFILIATE_METHOD: &str = "aliexpress.affiliate.hotproduct.query";
pub const DEFAULT_PRODUCT_FIELDS: &str =
    "product_id,product_title,product_main_image_url,product_detail_url,sale_price";
pub const DEFAULT_TELEGRAM_API_BASE: &str = "https://api.telegram.org";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required setting {0}")]
    Missing(&'static str),
    #[error("invalid value for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
    #[error("failed to read configuration: {0}")]
    Source(#[from] config::ConfigError),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Raw values as they appear in the file or environment. Legacy variable
/// names are kept as separate fields and resolved in `AppConfig::from_raw`.
#[derive(Debug, Default, Deserialize)]
struct RawSettings {
    aliexpress_app_key: Option<String>,
    app_key: Option<String>,
    aliexpress_app_secret: Option<String>,
    app_secret: Option<String>,
    tracking_id: Option<String>,
    telegram_token: Option<String>,
    telegram_bot_token: Option<String>,
    telegram_channel: Option<String>,
    telegram_channel_id: Option<String>,
    affiliate_method: Option<String>,
    affiliate_endpoints: Option<String>,
    affiliate_http_method: Option<String>,
    sign_method: Option<String>,
    target_currency: Option<String>,
    target_language: Option<String>,
    page_size: Option<String>,
    product_fields: Option<String>,
    telegram_parse_mode: Option<String>,
    telegram_api_base: Option<String>,
    fetch_interval_seconds: Option<String>,
}

/// Everything the fetcher needs to build and sign an affiliate request.
#[derive(Clone)]
pub struct AffiliateSettings {
    pub app_key: String,
    pub app_secret: String,
    pub tracking_id: String,
    pub method: String,
    pub endpoints: Vec<Url>,
    pub verb: AffiliateVerb,
    pub sign_method: SignMethod,
    pub target_currency: String,
    pub target_language: String,
    pub page_size: u32,
    pub fields: String,
}

impl fmt::Debug for AffiliateSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AffiliateSettings")
            .field("app_key", &self.app_key)
            .field("app_secret", &"<redacted>")
            .field("tracking_id", &self.tracking_id)
            .field("method", &self.method)
            .field("endpoints", &self.endpoints)
            .field("verb", &self.verb)
            .field("sign_method", &self.sign_method)
            .field("target_currency", &self.target_currency)
            .field("target_language", &self.target_language)
            .field("page_size", &self.page_size)
            .field("fields", &self.fields)
            .finish()
    }
}

/// Bot credentials and message settings.
#[derive(Clone)]
pub struct TelegramSettings {
    pub token: String,
    pub channel: String,
    pub parse_mode: ParseMode,
    pub api_base: Url,
}

impl fmt::Debug for TelegramSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TelegramSettings")
            .field("token", &"<redacted>")
            .field("channel", &self.channel)
            .field("parse_mode", &self.parse_mode)
            .field("api_base", &self.api_base)
            .finish()
    }
}

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub affiliate: AffiliateSettings,
    pub telegram: TelegramSettings,
    /// `None` means run a single cycle and exit.
    pub fetch_interval: Option<Duration>,
}

impl AppConfig {
    /// Loads from `HOTDEAL_CONFIG` (or [`DEFAULT_CONFIG_FILE`]) and the
    /// process environment.
    pub fn load() -> ConfigResult<Self> {
        let path = env::var("HOTDEAL_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_FILE.to_string());
        Self::from_sources(Some(Path::new(&path)), None)
    }

    /// Loads from an optional YAML file and an environment map. When `vars`
    /// is `None` the process environment is used.
    pub fn from_sources(
        file: Option<&Path>,
        vars: Option<config::Map<String, String>>,
    ) -> ConfigResult<Self> {
        let mut builder = Config::builder();
        if let Some(path) = file {
            let file = File::from(path).format(FileFormat::Yaml).required(false);
            builder = builder.add_source(file);
        }
        builder = builder.add_source(Environment::default().source(vars));

        let raw: RawSettings = builder.build()?.try_deserialize()?;
        Self::from_raw(raw)
    }
}

impl AppConfig {
    fn from_raw(raw: RawSettings) -> ConfigResult<Self> {
        let app_key = required("ALIEXPRESS_APP_KEY", raw.aliexpress_app_key, raw.app_key)?;
        let app_secret = required(
            "ALIEXPRESS_APP_SECRET",
            raw.aliexpress_app_secret,
            raw.app_secret,
        )?;
        let tracking_id = required("TRACKING_ID", raw.tracking_id, None)?;
        let token = required("TELEGRAM_TOKEN", raw.telegram_token, raw.telegram_bot_token)?;
        let channel = required(
            "TELEGRAM_CHANNEL",
            raw.telegram_channel,
            raw.telegram_channel_id,
        )?;

        let endpoints = parse_endpoints(
            present(raw.affiliate_endpoints)
                .as_deref()
                .unwrap_or(DEFAULT_AFFILIATE_ENDPOINT),
        )?;

        let verb = parse_with("AFFILIATE_HTTP_METHOD", raw.affiliate_http_method)?;
        let sign_method = parse_with("SIGN_METHOD", raw.sign_method)?;
        let parse_mode = parse_with("TELEGRAM_PARSE_MODE", raw.telegram_parse_mode)?;

        let page_size = match present(raw.page_size) {
            Some(value) => match value.parse::<u32>() {
                Ok(0) => return Err(invalid("PAGE_SIZE", "must be at least 1")),
                Ok(n) => n,
                Err(e) => return Err(invalid("PAGE_SIZE", e)),
            },
            None => 1,
        };

        let api_base = present(raw.telegram_api_base)
            .as_deref()
            .unwrap_or(DEFAULT_TELEGRAM_API_BASE)
            .parse::<Url>()
            .map_err(|e| invalid("TELEGRAM_API_BASE", e))?;

        let fetch_interval = match present(raw.fetch_interval_seconds) {
            Some(value) => match value.parse::<u64>() {
                Ok(0) => None,
                Ok(secs) => Some(Duration::from_secs(secs)),
                Err(e) => return Err(invalid("FETCH_INTERVAL_SECONDS", e)),
            },
            None => None,
        };

        Ok(Self {
            affiliate: AffiliateSettings {
                app_key,
                app_secret,
                tracking_id,
                method: present(raw.affiliate_method)
                    .unwrap_or_else(|| DEFAULT_AFFILIATE_METHOD.to_string()),
                endpoints,
                verb,
                sign_method,
                target_currency: present(raw.target_currency).unwrap_or_else(|| "USD".to_string()),
                target_language: present(raw.target_language).unwrap_or_else(|| "EN".to_string()),
                page_size,
                fields: present(raw.product_fields)
                    .unwrap_or_else(|| DEFAULT_PRODUCT_FIELDS.to_string()),
            },
            telegram: TelegramSettings {
                token,
                channel,
                parse_mode,
                api_base,
            },
            fetch_interval,
        })
    }
}

fn present(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn required(
    name: &'static str,
    value: Option<String>,
    legacy: Option<String>,
) -> ConfigResult<String> {
    present(value)
        .or_else(|| present(legacy))
        .ok_or(ConfigError::Missing(name))
}

fn invalid(key: &'static str, reason: impl fmt::Display) -> ConfigError {
    ConfigError::Invalid {
        key,
        reason: reason.to_string(),
    }
}

fn parse_with<T>(key: &'static str, value: Option<String>) -> ConfigResult<T>
where
    T: std::str::FromStr + Default,
    T::Err: fmt::Display,
{
    match present(value) {
        Some(v) => v.parse().map_err(|e| invalid(key, e)),
        None => Ok(T::default()),
    }
}

fn parse_endpoints(list: &str) -> ConfigResult<Vec<Url>> {
    let endpoints = list
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(parse_endpoint)
        .collect::<ConfigResult<Vec<_>>>()?;
    if endpoints.is_empty() {
        return Err(invalid("AFFILIATE_ENDPOINTS", "no endpoint given"));
    }
    Ok(endpoints)
}

fn parse_endpoint(s: &str) -> ConfigResult<Url> {
    Url::parse(s).map_err(|e| invalid("AFFILIATE_ENDPOINTS", format!("{s}: {e}")))
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    fn env_map(pairs: &[(&str, &str)]) -> config::Map<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn credentials() -> Vec<(&'static str, &'static str)> {
        vec![
            ("ALIEXPRESS_APP_KEY", "key"),
            ("ALIEXPRESS_APP_SECRET", "s3cr3t-value"),
            ("TRACKING_ID", "track"),
            ("TELEGRAM_TOKEN", "123:abc"),
            ("TELEGRAM_CHANNEL", "@deals"),
        ]
    }

    fn credentials_without(keys: &[&str]) -> Vec<(&'static str, &'static str)> {
        let mut pairs = credentials();
        pairs.retain(|(k, _)| !keys.contains(k));
        pairs
    }

    fn invalid_key(err: &ConfigError) -> Option<&'static str> {
        match err {
            ConfigError::Invalid { key, .. } => Some(*key),
            _ => None,
        }
    }

    #[test]
    fn loads_defaults_with_only_credentials() {
        let config = AppConfig::from_sources(None, Some(env_map(&credentials()))).unwrap();

        assert_eq!(config.affiliate.app_key, "key");
        assert_eq!(config.affiliate.method, DEFAULT_AFFILIATE_METHOD);
        assert_eq!(config.affiliate.endpoints.len(), 1);
        assert_eq!(
            config.affiliate.endpoints[0].as_str(),
            DEFAULT_AFFILIATE_ENDPOINT
        );
        assert_eq!(config.affiliate.verb, AffiliateVerb::Get);
        assert_eq!(config.affiliate.sign_method, SignMethod::Sha256);
        assert_eq!(config.affiliate.page_size, 1);
        assert_eq!(config.telegram.parse_mode, ParseMode::Html);
        assert!(config.fetch_interval.is_none());
    }

    #[test]
    fn missing_credential_is_reported_by_name() {
        let pairs = credentials_without(&["TRACKING_ID"]);

        let err = AppConfig::from_sources(None, Some(env_map(&pairs))).unwrap_err();
        assert!(matches!(err, ConfigError::Missing("TRACKING_ID")));
        assert_eq!(err.to_string(), "missing required setting TRACKING_ID");
    }

    #[test]
    fn empty_credential_counts_as_missing() {
        let mut pairs = credentials_without(&["TELEGRAM_TOKEN"]);
        pairs.push(("TELEGRAM_TOKEN", "  "));

        let err = AppConfig::from_sources(None, Some(env_map(&pairs))).unwrap_err();
        assert!(matches!(err, ConfigError::Missing("TELEGRAM_TOKEN")));
    }

    #[test]
    fn values_are_trimmed() {
        let mut pairs = credentials_without(&["TRACKING_ID", "PAGE_SIZE"]);
        pairs.push(("TRACKING_ID", "abc "));
        pairs.push(("PAGE_SIZE", " 4"));

        let config = AppConfig::from_sources(None, Some(env_map(&pairs))).unwrap();
        assert_eq!(config.affiliate.tracking_id, "abc");
        assert_eq!(config.affiliate.page_size, 4);
    }

    #[test]
    fn legacy_names_are_accepted() {
        let pairs = [
            ("APP_KEY", "legacy-key"),
            ("APP_SECRET", "legacy-secret"),
            ("TRACKING_ID", "track"),
            ("TELEGRAM_BOT_TOKEN", "1:x"),
            ("TELEGRAM_CHANNEL_ID", "-100123"),
        ];

        let config = AppConfig::from_sources(None, Some(env_map(&pairs))).unwrap();
        assert_eq!(config.affiliate.app_key, "legacy-key");
        assert_eq!(config.affiliate.app_secret, "legacy-secret");
        assert_eq!(config.telegram.channel, "-100123");
    }

    #[test]
    fn parses_optional_settings() {
        let mut pairs = credentials();
        pairs.extend([
            (
                "AFFILIATE_ENDPOINTS",
                "https://a.example.com/sync, https://b.example.com/rest",
            ),
            ("AFFILIATE_HTTP_METHOD", "post"),
            ("SIGN_METHOD", "md5"),
            ("PAGE_SIZE", "5"),
            ("TELEGRAM_PARSE_MODE", "Markdown"),
            ("FETCH_INTERVAL_SECONDS", "3600"),
        ]);

        let config = AppConfig::from_sources(None, Some(env_map(&pairs))).unwrap();
        let endpoints = &config.affiliate.endpoints;
        assert_eq!(endpoints.len(), 2);
        assert_eq!(endpoints[1].host_str(), Some("b.example.com"));
        assert_eq!(config.affiliate.verb, AffiliateVerb::Post);
        assert_eq!(config.affiliate.sign_method, SignMethod::Md5);
        assert_eq!(config.affiliate.page_size, 5);
        assert_eq!(config.telegram.parse_mode, ParseMode::Markdown);
        assert_eq!(config.fetch_interval, Some(Duration::from_secs(3600)));
    }

    #[test]
    fn rejects_bad_values() {
        let mut pairs = credentials();
        pairs.push(("SIGN_METHOD", "sha1"));
        let err = AppConfig::from_sources(None, Some(env_map(&pairs))).unwrap_err();
        assert_eq!(invalid_key(&err), Some("SIGN_METHOD"));

        let mut pairs = credentials();
        pairs.push(("AFFILIATE_ENDPOINTS", "not a url"));
        let err = AppConfig::from_sources(None, Some(env_map(&pairs))).unwrap_err();
        assert_eq!(invalid_key(&err), Some("AFFILIATE_ENDPOINTS"));
    }

    #[test]
    fn debug_output_hides_secrets() {
        let config = AppConfig::from_sources(None, Some(env_map(&credentials()))).unwrap();
        let printed = format!("{config:?}");
        assert!(!printed.contains("s3cr3t-value"));
        assert!(!printed.contains("123:abc"));
    }

    #[test]
    fn environment_overrides_yaml_file() {
        let mut file = tempfile::NamedTempFile::with_suffix(".yaml").unwrap();
        writeln!(
            file,
            "aliexpress_app_key: from-file\ntracking_id: file-track\npage_size: 3"
        )
        .unwrap();

        let mut pairs = credentials_without(&["ALIEXPRESS_APP_KEY", "TRACKING_ID"]);
        pairs.push(("TRACKING_ID", "env-track"));

        let config = AppConfig::from_sources(Some(file.path()), Some(env_map(&pairs))).unwrap();
        assert_eq!(config.affiliate.app_key, "from-file");
        assert_eq!(config.affiliate.tracking_id, "env-track");
        assert_eq!(config.affiliate.page_size, 3);
    }
}
