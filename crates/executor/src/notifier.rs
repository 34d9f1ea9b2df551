use std::env;

use teloxide::prelude::*;
use tokio::sync::broadcast;
use tracing::{error, info};

/// Pushes operator notifications (submissions, fills, failures) to a
/// Telegram chat. Optional: without credentials the pipeline runs without
/// notifications rather than refusing to start.
pub struct TelegramNotifier {
    bot: Bot,
    chat_id: ChatId,
}

impl TelegramNotifier {
    pub fn from_env() -> Option<Self> {
        let token = env::var("TELEGRAM_BOT_TOKEN").ok()?;
        let chat_id = env::var("TELEGRAM_CHAT_ID").ok()?.parse::<i64>().ok()?;

        Some(Self {
            bot: Bot::new(token),
            chat_id: ChatId(chat_id),
        })
    }

    pub async fn run(self, mut rx: broadcast::Receiver<String>) {
        info!("Starting Telegram notification service");

        loop {
            match rx.recv().await {
                Ok(msg) => {
                    if let Err(e) = self.bot.send_message(self.chat_id, msg).await {
                        error!("Failed to send Telegram message: {}", e);
                    }
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    error!("Telegram service lagged behind. Missed {} messages.", n);
                }
                Err(_) => {
                    info!("Notification channel closed. Stopping service.");
                    break;
                }
            }
        }
    }
}
