//! Telegram Bot API delivery.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use url::Url;

use crate::http::{HttpTransport, redact};
use crate::models::config::TelegramSettings;
use crate::notifiers::{Announcement, BotMethod, Notifier, NotifyError, NotifyResult, ParseMode};

/// The parts of a bot API reply we look at.
#[derive(Debug, Deserialize)]
struct BotReply {
    ok: bool,
    description: Option<String>,
}

/// Posts announcements to one chat or channel.
pub struct TelegramNotifier {
    settings: TelegramSettings,
    transport: Arc<dyn HttpTransport>,
}

impl TelegramNotifier {
    pub fn new(settings: TelegramSettings, transport: Arc<dyn HttpTransport>) -> Self {
        Self {
            settings,
            transport,
        }
    }

    /// `{api_base}/bot{token}/{method}`.
    pub fn method_url(&self, method: BotMethod) -> NotifyResult<Url> {
        let mut url = self.settings.api_base.clone();
        url.path_segments_mut()
            .map_err(|_| NotifyError::Url(self.settings.api_base.to_string()))?
            .pop_if_empty()
            .push(&format!("bot{}", self.settings.token))
            .push(method.as_str());
        Ok(url)
    }

    /// Form fields for a single delivery.
    pub fn build_form(
        &self,
        method: BotMethod,
        announcement: &Announcement,
    ) -> Vec<(String, String)> {
        let mut form = vec![
            ("chat_id".to_string(), self.settings.channel.clone()),
            (
                "parse_mode".to_string(),
                self.parse_mode().as_str().to_string(),
            ),
        ];
        match (method, &announcement.image_url) {
            (BotMethod::SendPhoto, Some(image_url)) => {
                form.push(("photo".to_string(), image_url.clone()));
                form.push(("caption".to_string(), announcement.text.clone()));
            }
            _ => form.push(("text".to_string(), announcement.text.clone())),
        }
        form
    }
}

fn describe(body: &str) -> String {
    serde_json::from_str::<BotReply>(body)
        .ok()
        .and_then(|reply| reply.description)
        .unwrap_or_else(|| body.chars().take(200).collect())
}

#[async_trait]
impl Notifier for TelegramNotifier {
    fn parse_mode(&self) -> ParseMode {
        self.settings.parse_mode
    }

    async fn notify(&self, announcement: &Announcement) -> NotifyResult<BotMethod> {
        let method = BotMethod::for_announcement(announcement);
        let url = self.method_url(method)?;
        let form = self.build_form(method, announcement);

        let res = self.transport.post_form(&url, &form).await?;
        if !res.is_success() {
            return Err(NotifyError::Status {
                status: res.status,
                description: describe(&res.body),
            });
        }

        if let Ok(reply) = serde_json::from_str::<BotReply>(&res.body)
            && !reply.ok
        {
            return Err(NotifyError::Rejected(
                reply.description.unwrap_or_else(|| "no description".to_string()),
            ));
        }

        log::info!("Delivered via {method} to {}", redact(&url));
        Ok(method)
    }
}
