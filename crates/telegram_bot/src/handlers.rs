//! Transport endpoints: teloxide updates in, [`Reply`] rendering out.
//!
//! The conversation core is synchronous; these handlers only translate wire
//! types and serialize updates per chat so two taps from the same chat cannot
//! interleave mid-flow.

use std::{collections::HashMap, sync::Arc};

use teloxide::{
    prelude::*,
    types::{
        InlineKeyboardButton, InlineKeyboardMarkup, KeyboardButton, KeyboardMarkup, ParseMode,
        User,
    },
};
use tokio::sync::OwnedMutexGuard;

use crate::{
    ConfigParameters,
    ui::{Keyboard, Reply},
    update::BotUpdate,
};

#[derive(Clone, Default)]
pub(crate) struct ChatLocks {
    inner: Arc<std::sync::Mutex<HashMap<i64, Arc<tokio::sync::Mutex<()>>>>>,
}

impl ChatLocks {
    pub(crate) async fn acquire(&self, chat_id: i64) -> OwnedMutexGuard<()> {
        let lock = {
            let mut map = self.inner.lock().unwrap_or_else(|e| e.into_inner());
            // A strong count of 1 means only the map holds the lock: no
            // guard and no in-flight acquire, so the entry can go.
            map.retain(|_, lock| Arc::strong_count(lock) > 1);
            map.entry(chat_id).or_default().clone()
        };
        lock.lock_owned().await
    }
}

pub(crate) async fn handle_message(
    bot: Bot,
    msg: Message,
    cfg: ConfigParameters,
) -> ResponseResult<()> {
    if !is_allowed(&cfg, msg.from.as_ref()) {
        return Ok(());
    }
    let Some(update) = BotUpdate::from_message(&msg) else {
        return Ok(());
    };
    dispatch_update(&bot, &cfg, update).await
}

pub(crate) async fn handle_callback(
    bot: Bot,
    q: CallbackQuery,
    cfg: ConfigParameters,
) -> ResponseResult<()> {
    if !is_allowed(&cfg, Some(&q.from)) {
        return Ok(());
    }
    // Ack first so the button stops spinning even if processing fails.
    let _ = bot.answer_callback_query(q.id.clone()).await;

    let Some(update) = BotUpdate::from_callback(&q) else {
        return Ok(());
    };
    dispatch_update(&bot, &cfg, update).await
}

async fn dispatch_update(bot: &Bot, cfg: &ConfigParameters, update: BotUpdate) -> ResponseResult<()> {
    let _guard = cfg.locks.acquire(update.chat_id).await;

    match cfg.orchestrator.handle_update(&update) {
        Ok(reply) => send_reply(bot, reply).await,
        Err(err) => {
            tracing::error!(chat_id = update.chat_id, error = %err, "failed to handle update");
            Ok(())
        }
    }
}

async fn send_reply(bot: &Bot, reply: Reply) -> ResponseResult<()> {
    let mut request = bot.send_message(ChatId(reply.chat_id), reply.text);
    if let Some(crate::ui::ParseMode::Html) = reply.parse_mode {
        request = request.parse_mode(ParseMode::Html);
    }
    match reply.keyboard {
        Some(Keyboard::Inline(rows)) => {
            let markup = InlineKeyboardMarkup::new(rows.into_iter().map(|row| {
                row.into_iter()
                    .map(|b| InlineKeyboardButton::callback(b.label, b.payload))
            }));
            request = request.reply_markup(markup);
        }
        Some(Keyboard::Menu(rows)) => {
            let markup = KeyboardMarkup::new(
                rows.into_iter()
                    .map(|row| row.into_iter().map(KeyboardButton::new)),
            )
            .resize_keyboard();
            request = request.reply_markup(markup);
        }
        None => {}
    }
    request.await?;
    Ok(())
}

fn is_allowed(cfg: &ConfigParameters, from: Option<&User>) -> bool {
    let Some(from) = from else {
        return false;
    };
    match &cfg.allowed_users {
        None => true,
        Some(ids) => ids.contains(&from.id),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn chat_locks_are_pruned_once_released() {
        let locks = ChatLocks::default();
        {
            let _guard = locks.acquire(1).await;
            let map = locks.inner.lock().unwrap();
            assert!(map.contains_key(&1));
        }

        // The next acquire drops entries nobody holds anymore.
        let _guard = locks.acquire(2).await;
        let map = locks.inner.lock().unwrap();
        assert!(!map.contains_key(&1));
        assert!(map.contains_key(&2));
    }

    #[tokio::test]
    async fn held_locks_survive_pruning() {
        let locks = ChatLocks::default();
        let _held = locks.acquire(1).await;
        let _other = locks.acquire(2).await;
        assert!(locks.inner.lock().unwrap().contains_key(&1));
    }
}
