//! Telegram front-end for the personal finance tracker.
//!
//! The conversation core (orchestrator, wizards, session store) is fully
//! synchronous and transport-agnostic; teloxide enters the picture only in
//! the update handlers, which makes every flow testable without a network.

use std::{path::PathBuf, sync::Arc};

use chrono::TimeDelta;
use teloxide::prelude::*;

use crate::{handlers::ChatLocks, orchestrator::Orchestrator, session::SessionStore};

pub mod dispatch;
pub mod orchestrator;
pub mod parsing;
pub mod session;
pub mod ui;
pub mod update;
pub mod wizards;

mod handlers;

const DEFAULT_TTL_HOURS: u32 = 12;

/// Ledger services the wizards run against.
#[derive(Clone)]
pub struct Services {
    pub users: Arc<dyn ledger::UserService>,
    pub categories: Arc<dyn ledger::CategoryService>,
    pub accounts: Arc<dyn ledger::AccountService>,
    pub transactions: Arc<dyn ledger::TransactionService>,
}

/// Current calendar date in the bot's home timezone.
pub(crate) fn today() -> chrono::NaiveDate {
    chrono::Utc::now()
        .with_timezone(&chrono_tz::Europe::Warsaw)
        .date_naive()
}

#[derive(Clone)]
pub struct ConfigParameters {
    allowed_users: Option<Vec<UserId>>,
    orchestrator: Arc<Orchestrator>,
    locks: ChatLocks,
}

pub struct Bot {
    token: String,
    allowed_users: Option<Vec<UserId>>,
    services: Services,
    session_ttl: TimeDelta,
    state_path: Option<PathBuf>,
}

impl Bot {
    pub fn builder() -> BotBuilder {
        BotBuilder::default()
    }

    pub async fn run(&self) {
        tracing::info!("Starting telegram bot...");

        let bot = teloxide::Bot::new(&self.token);
        let sessions = match &self.state_path {
            Some(path) => SessionStore::load_or_empty(path.clone(), self.session_ttl),
            None => SessionStore::with_ttl(self.session_ttl),
        };

        let parameters = ConfigParameters {
            allowed_users: self.allowed_users.clone(),
            orchestrator: Arc::new(Orchestrator::standard(&self.services, sessions)),
            locks: ChatLocks::default(),
        };

        let handler = dptree::entry()
            .branch(Update::filter_message().endpoint(handlers::handle_message))
            .branch(Update::filter_callback_query().endpoint(handlers::handle_callback));

        Dispatcher::builder(bot, handler)
            .dependencies(dptree::deps![parameters])
            .default_handler(|upd| async move {
                tracing::warn!("Unhandled update: {:?}", upd);
            })
            .error_handler(LoggingErrorHandler::with_custom_text(
                "An error has occurred in the dispatcher",
            ))
            .enable_ctrlc_handler()
            .build()
            .dispatch()
            .await;
    }
}

#[derive(Default)]
pub struct BotBuilder {
    token: String,
    allowed_users: Option<Vec<UserId>>,
    services: Option<Services>,
    session_ttl_hours: Option<u32>,
    state_path: Option<PathBuf>,
}

impl BotBuilder {
    pub fn token(mut self, token: &str) -> BotBuilder {
        self.token = token.to_string();
        self
    }

    pub fn allowed_users(mut self, allowed_users: Vec<u64>) -> BotBuilder {
        if !allowed_users.is_empty() {
            self.allowed_users = Some(allowed_users.into_iter().map(UserId).collect());
        }
        self
    }

    pub fn services(mut self, services: Services) -> BotBuilder {
        self.services = Some(services);
        self
    }

    pub fn session_ttl_hours(mut self, hours: u32) -> BotBuilder {
        self.session_ttl_hours = Some(hours);
        self
    }

    pub fn state_path(mut self, path: impl Into<PathBuf>) -> BotBuilder {
        self.state_path = Some(path.into());
        self
    }

    pub fn build(self) -> Result<Bot, String> {
        tracing::info!("Initializing telegram bot...");
        if self.token.is_empty() {
            return Err("telegram token is missing".to_string());
        }
        let services = self.services.ok_or("ledger services are missing")?;
        let ttl_hours = self.session_ttl_hours.unwrap_or(DEFAULT_TTL_HOURS);
        Ok(Bot {
            token: self.token,
            allowed_users: self.allowed_users,
            services,
            session_ttl: TimeDelta::hours(i64::from(ttl_hours)),
            state_path: self.state_path,
        })
    }
}
