//! Normalizes raw transport events into one uniform shape.

use teloxide::types::{CallbackQuery, Message};

/// Identity of the person behind an update, as reported by the transport.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UserRef {
    pub username: Option<String>,
    pub first_name: String,
    pub last_name: Option<String>,
}

/// A normalized inbound event: one chat, one effective text.
///
/// Typed message text and callback payloads are collapsed into a single
/// `text` field so the wizards can treat button taps and typed input
/// uniformly. Construction is side-effect free.
#[derive(Clone, Debug)]
pub struct BotUpdate {
    pub chat_id: i64,
    pub text: String,
    pub from: Option<UserRef>,
}

impl BotUpdate {
    pub fn new(chat_id: i64, text: impl Into<String>, from: Option<UserRef>) -> Self {
        Self {
            chat_id,
            text: text.into(),
            from,
        }
    }

    /// Normalizes a text message. Returns `None` for non-text messages.
    pub fn from_message(msg: &Message) -> Option<Self> {
        let text = msg.text()?;
        let from = msg.from.as_ref().map(user_ref);
        Some(Self::new(msg.chat.id.0, text, from))
    }

    /// Normalizes a button tap. Returns `None` when it carries no payload.
    ///
    /// Private chats are keyed by the tapping user's id, which doubles as the
    /// chat id.
    pub fn from_callback(q: &CallbackQuery) -> Option<Self> {
        let data = q.data.as_deref()?;
        let chat_id = q
            .message
            .as_ref()
            .map(|m| m.chat().id.0)
            .unwrap_or(q.from.id.0 as i64);
        Some(Self::new(chat_id, data, Some(user_ref(&q.from))))
    }
}

fn user_ref(user: &teloxide::types::User) -> UserRef {
    UserRef {
        username: user.username.clone(),
        first_name: user.first_name.clone(),
        last_name: user.last_name.clone(),
    }
}
