use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use thiserror::Error;

use crate::http::TransportError;

pub mod format;
pub mod telegram;

/// Text formatting understood by the bot API.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ParseMode {
    #[default]
    Html,
    Markdown,
}

impl ParseMode {
    pub fn as_str(self) -> &'static str {
        match self {
            ParseMode::Html => "HTML",
            ParseMode::Markdown => "Markdown",
        }
    }
}

impl FromStr for ParseMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "html" => Ok(ParseMode::Html),
            "markdown" => Ok(ParseMode::Markdown),
            other => Err(format!("unsupported parse mode `{other}`")),
        }
    }
}

/// A message ready to post, with an optional picture.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Announcement {
    pub text: String,
    pub image_url: Option<String>,
}

/// Bot API operation used for a delivery.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BotMethod {
    SendMessage,
    SendPhoto,
}

impl BotMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            BotMethod::SendMessage => "sendMessage",
            BotMethod::SendPhoto => "sendPhoto",
        }
    }

    /// `sendPhoto` when there is a picture, `sendMessage` otherwise.
    pub fn for_announcement(announcement: &Announcement) -> Self {
        if announcement.image_url.is_some() {
            BotMethod::SendPhoto
        } else {
            BotMethod::SendMessage
        }
    }
}

impl fmt::Display for BotMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error("bot API answered {status}: {description}")]
    Status { status: u16, description: String },
    #[error("bot API rejected the message: {0}")]
    Rejected(String),
    #[error("cannot build bot API URL: {0}")]
    Url(String),
}

pub type NotifyResult<T> = Result<T, NotifyError>;

/// A destination for announcements.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Formatting the destination expects announcement text in.
    fn parse_mode(&self) -> ParseMode;

    /// Delivers one announcement and reports which operation was used.
    async fn notify(&self, announcement: &Announcement) -> NotifyResult<BotMethod>;
}
