//! Telegram client using teloxide.

use teloxide::prelude::*;
use teloxide::types::{
    InlineKeyboardButton, InlineKeyboardMarkup, KeyboardButton, KeyboardMarkup, MessageId, ParseMode,
    ReplyMarkup,
};
use tracing::{info, warn};

use crate::bot::notify::Messenger;
use crate::bot::render::{Keyboard, Reply};

/// Telegram API client.
#[derive(Clone)]
pub struct TelegramClient {
    bot: Bot,
}

fn markup(keyboard: &Keyboard) -> Option<ReplyMarkup> {
    match keyboard {
        Keyboard::None => None,
        Keyboard::Buttons(rows) => {
            let rows: Vec<Vec<KeyboardButton>> = rows
                .iter()
                .map(|row| row.iter().map(KeyboardButton::new).collect())
                .collect();
            Some(
                KeyboardMarkup::new(rows)
                    .resize_keyboard()
                    .one_time_keyboard()
                    .into(),
            )
        }
        Keyboard::Inline(rows) => {
            let rows: Vec<Vec<InlineKeyboardButton>> = rows
                .iter()
                .map(|row| {
                    row.iter()
                        .map(|(label, data)| InlineKeyboardButton::callback(label, data))
                        .collect()
                })
                .collect();
            Some(InlineKeyboardMarkup::new(rows).into())
        }
    }
}

impl TelegramClient {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }

    /// Send a rendered reply with its keyboard.
    pub async fn send_reply(&self, chat_id: i64, reply: &Reply) -> Result<i64, String> {
        let mut request = self
            .bot
            .send_message(ChatId(chat_id), &reply.text)
            .parse_mode(ParseMode::Html);

        if let Some(markup) = markup(&reply.keyboard) {
            request = request.reply_markup(markup);
        }

        request.await.map(|msg| msg.id.0 as i64).map_err(|e| {
            let msg = format!("Failed to send: {e}");
            warn!("{}", msg);
            msg
        })
    }

    pub async fn edit_text(&self, chat_id: i64, message_id: i64, text: &str) -> Result<(), String> {
        self.bot
            .edit_message_text(ChatId(chat_id), MessageId(message_id as i32), text)
            .parse_mode(ParseMode::Html)
            .await
            .map_err(|e| {
                let msg = format!("Failed to edit message: {e}");
                warn!("{}", msg);
                msg
            })?;

        Ok(())
    }

    pub async fn delete_message(&self, chat_id: i64, message_id: i64) -> Result<(), String> {
        info!("🗑️ Deleting message {} in chat {}", message_id, chat_id);

        self.bot
            .delete_message(ChatId(chat_id), MessageId(message_id as i32))
            .await
            .map_err(|e| {
                let msg = format!("Failed to delete message: {e}");
                warn!("{}", msg);
                msg
            })?;

        Ok(())
    }

    pub async fn answer_callback(&self, query: &CallbackQuery) {
        if let Err(e) = self.bot.answer_callback_query(query.id.clone()).await {
            warn!("Failed to answer callback query: {e}");
        }
    }
}

impl Messenger for TelegramClient {
    async fn send_text(&self, chat_id: i64, text: &str) -> Result<i64, String> {
        self.bot
            .send_message(ChatId(chat_id), text)
            .parse_mode(ParseMode::Html)
            .await
            .map(|msg| msg.id.0 as i64)
            .map_err(|e| format!("Failed to send: {e}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_keyboard_means_no_markup() {
        assert!(markup(&Keyboard::None).is_none());
    }

    #[test]
    fn test_keyboard_kinds() {
        let buttons = Keyboard::Buttons(vec![vec!["a".into(), "b".into()]]);
        assert!(matches!(markup(&buttons), Some(ReplyMarkup::Keyboard(_))));

        let inline = Keyboard::Inline(vec![vec![("Back".into(), "show_main_menu".into())]]);
        assert!(matches!(markup(&inline), Some(ReplyMarkup::InlineKeyboard(_))));
    }
}
