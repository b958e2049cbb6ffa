//! Guided income entry. Same shape as the expense flow, income wording and
//! income sources instead of expense categories.

use std::sync::Arc;

use ledger::{
    AccountService, CategoryKind, CategoryService, LedgerError, TransactionService,
};

use crate::{
    dispatch::Wizard,
    parsing,
    session::{DialogState, Session, SessionStore},
    ui::{self, CATEGORY_PAGE_SIZE, RECORD_INCOME_LABEL, Reply},
    update::BotUpdate,
    wizards::account_date::{self, ACCOUNT_AND_DATE_PROMPT},
};

const AMOUNT_PROMPT: &str = "Пожалуйста, введите сумму дохода:";
const BAD_AMOUNT_PROMPT: &str = "Пожалуйста, введите корректную сумму (только цифры, \
    допустимы разделители \".\" или \",\", до двух знаков после разделителя).";
const SOURCE_PROMPT: &str = "Пожалуйста, выберите источник дохода:";
const WRONG_KIND_PROMPT: &str = "Пожалуйста, выберите корректный источник дохода из списка.";
const DEFAULT_PROMPT: &str =
    "Извините, что-то пошло не так. Пожалуйста, начните запись дохода заново.";

pub struct IncomeWizard {
    sessions: SessionStore,
    categories: Arc<dyn CategoryService>,
    accounts: Arc<dyn AccountService>,
    transactions: Arc<dyn TransactionService>,
}

impl IncomeWizard {
    pub fn new(
        sessions: SessionStore,
        categories: Arc<dyn CategoryService>,
        accounts: Arc<dyn AccountService>,
        transactions: Arc<dyn TransactionService>,
    ) -> Self {
        Self {
            sessions,
            categories,
            accounts,
            transactions,
        }
    }

    fn start(&self, chat_id: i64) -> Reply {
        self.sessions.put(
            chat_id,
            Session {
                state: DialogState::AwaitingAmount,
                is_income: true,
                ..Default::default()
            },
        );
        Reply::text(chat_id, AMOUNT_PROMPT)
    }

    fn read_amount(&self, chat_id: i64, text: &str, mut session: Session) -> Reply {
        let Some(amount) = parsing::parse_amount(text) else {
            return Reply::text(chat_id, BAD_AMOUNT_PROMPT);
        };
        session.amount = Some(amount);
        session.state = DialogState::AwaitingIncomeSource;
        self.sessions.put(chat_id, session);

        let listed = self.categories.list_by_kind(CategoryKind::Income);
        Reply::text(chat_id, SOURCE_PROMPT)
            .with_keyboard(ui::category_keyboard(0, CATEGORY_PAGE_SIZE, &listed))
    }

    fn pick_source(
        &self,
        chat_id: i64,
        text: &str,
        mut session: Session,
    ) -> Result<Option<Reply>, LedgerError> {
        if let Some(rest) = text.strip_prefix("category_page:") {
            let Ok(page) = rest.parse::<usize>() else {
                return Ok(None);
            };
            let listed = self.categories.list_by_kind(CategoryKind::Income);
            return Ok(Some(Reply::text(chat_id, SOURCE_PROMPT).with_keyboard(
                ui::category_keyboard(page, CATEGORY_PAGE_SIZE, &listed),
            )));
        }

        // Selections that name nothing become personal sources; free text
        // just re-renders the keyboard.
        if let Some(name) = text.strip_prefix("category:") {
            return match self.categories.find_by_name(name) {
                Ok(category) if !category.is_income() => {
                    Ok(Some(Reply::text(chat_id, WRONG_KIND_PROMPT)))
                }
                Ok(category) => {
                    session.category = Some(category);
                    session.state = DialogState::AwaitingAccountAndDate;
                    Ok(Some(self.account_date_prompt(chat_id, session, None)?))
                }
                Err(LedgerError::NotFound(_)) => {
                    let created = self
                        .categories
                        .create(name, CategoryKind::Income, Some(chat_id))?;
                    let note = format!(
                        "Создан новый источник дохода: {}\n\n{ACCOUNT_AND_DATE_PROMPT}",
                        created.name
                    );
                    session.category = Some(created);
                    session.state = DialogState::AwaitingAccountAndDate;
                    Ok(Some(self.account_date_prompt(chat_id, session, Some(note))?))
                }
                Err(err) => Err(err),
            };
        }

        let listed = self.categories.list_by_kind(CategoryKind::Income);
        Ok(Some(Reply::text(chat_id, SOURCE_PROMPT).with_keyboard(
            ui::category_keyboard(0, CATEGORY_PAGE_SIZE, &listed),
        )))
    }

    fn account_date_prompt(
        &self,
        chat_id: i64,
        mut session: Session,
        text: Option<String>,
    ) -> Result<Reply, LedgerError> {
        let account = match session.account.clone() {
            Some(account) => account,
            None => self.accounts.find_or_create_default(chat_id)?,
        };
        let keyboard = ui::account_date_keyboard(&account, session.date, crate::today());
        session.account = Some(account);
        self.sessions.put(chat_id, session);
        Ok(
            Reply::text(chat_id, text.unwrap_or_else(|| ACCOUNT_AND_DATE_PROMPT.to_string()))
                .with_keyboard(keyboard),
        )
    }

    fn summary(&self, session: &Session) -> String {
        let amount = session.amount.map(ui::fmt_amount).unwrap_or_default();
        let source = session
            .category
            .as_ref()
            .map(|c| c.name.clone())
            .unwrap_or_default();
        let comment = session.comment.clone().unwrap_or_default();
        format!(
            "Пожалуйста, подтвердите запись дохода:\nСумма: {amount}\nИсточник: {source}\nОписание: {comment}"
        )
    }

    fn confirm(
        &self,
        chat_id: i64,
        text: &str,
        session: Session,
    ) -> Result<Option<Reply>, LedgerError> {
        match text {
            "confirm" => {
                let (Some(amount), Some(category)) = (session.amount, session.category.as_ref())
                else {
                    return Err(LedgerError::InvalidInput(
                        "confirmation without amount or source".to_string(),
                    ));
                };
                let account = match session.account.clone() {
                    Some(account) => account,
                    None => self.accounts.find_or_create_default(chat_id)?,
                };
                let comment = session.comment.as_deref().filter(|c| !c.is_empty());
                self.transactions.add_income(
                    chat_id,
                    amount,
                    category,
                    comment,
                    session.date,
                    &account,
                )?;
                self.sessions.delete(chat_id);
                Ok(Some(Reply::text(
                    chat_id,
                    format!(
                        "Доход в размере {} успешно записан. Источник дохода - {}.",
                        ui::fmt_amount(amount),
                        category.name
                    ),
                )))
            }
            "cancel" => {
                self.sessions.delete(chat_id);
                Ok(Some(Reply::text(chat_id, "Запись дохода отменена.")))
            }
            _ => Ok(Some(Reply::text(chat_id, self.summary(&session)))),
        }
    }
}

impl Wizard for IncomeWizard {
    fn name(&self) -> &'static str {
        "income"
    }

    fn supports(&self, update: &BotUpdate) -> bool {
        if update.text.trim() == RECORD_INCOME_LABEL {
            return true;
        }
        let Some(session) = self.sessions.get(update.chat_id) else {
            return false;
        };
        session.is_income
            && matches!(
                session.state,
                DialogState::AwaitingAmount
                    | DialogState::AwaitingIncomeSource
                    | DialogState::AwaitingAccountAndDate
                    | DialogState::AwaitingDescription
                    | DialogState::AwaitingConfirmation
            )
    }

    fn handle(&self, chat_id: i64, text: &str) -> Result<Option<Reply>, LedgerError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(LedgerError::InvalidInput("empty message".to_string()));
        }
        if text == RECORD_INCOME_LABEL {
            return Ok(Some(self.start(chat_id)));
        }

        let session = self.sessions.get(chat_id).unwrap_or_default();
        match session.state {
            DialogState::AwaitingAmount => Ok(Some(self.read_amount(chat_id, text, session))),
            DialogState::AwaitingIncomeSource => self.pick_source(chat_id, text, session),
            DialogState::AwaitingAccountAndDate => {
                account_date::handle(chat_id, text, session, &self.sessions, &self.accounts)
            }
            DialogState::AwaitingDescription => {
                let mut session = session;
                account_date::apply_description(&mut session, text);
                let reply = Reply::text(chat_id, self.summary(&session))
                    .with_keyboard(ui::confirmation_keyboard());
                self.sessions.put(chat_id, session);
                Ok(Some(reply))
            }
            DialogState::AwaitingConfirmation => self.confirm(chat_id, text, session),
            _ => {
                self.sessions.delete(chat_id);
                Ok(Some(Reply::text(chat_id, DEFAULT_PROMPT)))
            }
        }
    }
}
