use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;

use carshare_core::notification::{NotificationError, NotificationSink};

const DEFAULT_API_BASE: &str = "https://api.telegram.org";

/// Posts every notification to one Telegram chat through the Bot API
#[derive(Clone)]
pub struct TelegramNotifier {
    http: reqwest::Client,
    endpoint: String,
    chat_id: String,
}

#[derive(Serialize)]
struct SendMessage<'a> {
    chat_id: &'a str,
    text: &'a str,
}

impl TelegramNotifier {
    pub fn new(
        api_base: Option<&str>,
        bot_token: &str,
        chat_id: &str,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        let base = api_base.unwrap_or(DEFAULT_API_BASE).trim_end_matches('/');
        Ok(Self {
            http,
            endpoint: format!("{}/bot{}/sendMessage", base, bot_token),
            chat_id: chat_id.to_string(),
        })
    }
}

#[async_trait]
impl NotificationSink for TelegramNotifier {
    async fn send(&self, message: &str) -> Result<(), NotificationError> {
        let response = self
            .http
            .post(&self.endpoint)
            .json(&SendMessage {
                chat_id: &self.chat_id,
                text: message,
            })
            .send()
            .await
            .map_err(|e| NotificationError(e.to_string()))?;

        if !response.status().is_success() {
            return Err(NotificationError(format!(
                "Telegram answered {}",
                response.status()
            )));
        }
        Ok(())
    }
}
