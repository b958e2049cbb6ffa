//! Entry point for every update: session bootstrap, `/start`, dispatch and
//! the fallback reply.

use std::sync::Arc;

use ledger::{LedgerError, UserService};

use crate::{
    dispatch::Dispatcher,
    session::{Session, SessionStore},
    ui::{self, Reply},
    update::BotUpdate,
    wizards::{
        expense::ExpenseWizard, fast_expense::FastExpenseWizard, income::IncomeWizard,
        statistics::StatisticsWizard,
    },
};

pub const WELCOME_TEXT: &str = "Добро пожаловать! Выберите действие:";
const FALLBACK: &str =
    "Извините, я не понимаю вашу команду. Пожалуйста, выберите действие из меню.";

pub struct Orchestrator {
    dispatcher: Dispatcher,
    sessions: SessionStore,
    users: Arc<dyn UserService>,
}

impl Orchestrator {
    pub fn new(dispatcher: Dispatcher, sessions: SessionStore, users: Arc<dyn UserService>) -> Self {
        Self {
            dispatcher,
            sessions,
            users,
        }
    }

    /// Wires up the stock wizard set in its fixed order.
    pub fn standard(services: &crate::Services, sessions: SessionStore) -> Self {
        let dispatcher = Dispatcher::new(vec![
            Box::new(ExpenseWizard::new(
                sessions.clone(),
                services.categories.clone(),
                services.accounts.clone(),
                services.transactions.clone(),
            )),
            Box::new(IncomeWizard::new(
                sessions.clone(),
                services.categories.clone(),
                services.accounts.clone(),
                services.transactions.clone(),
            )),
            Box::new(FastExpenseWizard::new(
                sessions.clone(),
                services.categories.clone(),
                services.accounts.clone(),
                services.transactions.clone(),
            )),
            Box::new(StatisticsWizard::new(
                sessions.clone(),
                services.transactions.clone(),
            )),
        ]);
        Self::new(dispatcher, sessions, services.users.clone())
    }

    pub fn handle_update(&self, update: &BotUpdate) -> Result<Reply, LedgerError> {
        self.initialize(update)?;

        let text = update.text.trim();
        if text.eq_ignore_ascii_case("/start") {
            self.sessions.delete(update.chat_id);
            return Ok(
                Reply::text(update.chat_id, WELCOME_TEXT).with_keyboard(ui::main_menu())
            );
        }

        if let Some(reply) = self.dispatcher.process(update) {
            return Ok(reply);
        }

        self.sessions.delete(update.chat_id);
        Ok(Reply::text(update.chat_id, FALLBACK).with_keyboard(ui::main_menu()))
    }

    /// Ensures the chat has a session and the sender is registered.
    fn initialize(&self, update: &BotUpdate) -> Result<(), LedgerError> {
        let Some(from) = &update.from else {
            return Err(LedgerError::InvalidInput(
                "update carries no user".to_string(),
            ));
        };
        if self.sessions.get(update.chat_id).is_none() {
            self.sessions.put(update.chat_id, Session::default());
        }
        if !self.users.exists(update.chat_id) {
            self.users.create(
                from.username.as_deref(),
                Some(&from.first_name),
                from.last_name.as_deref(),
                update.chat_id,
            )?;
        }
        Ok(())
    }
}
