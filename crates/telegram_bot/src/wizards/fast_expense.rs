//! Single-line expense entry with category clarification.

use std::sync::Arc;

use chrono::Datelike;
use ledger::{
    Account, AccountService, CategoryKind, CategoryService, LedgerError, TransactionService,
};

use crate::{
    dispatch::Wizard,
    parsing::{self, FastExpense},
    session::{DialogState, Session, SessionStore},
    ui::{self, CATEGORY_PAGE_SIZE, FAST_EXPENSE_LABEL, Reply},
    update::BotUpdate,
};

const PROMPT_HTML: &str = "✍️ Введите расход одной строкой:\n\
    <code>&lt;сумма&gt; &lt;категория&gt; [комментарий] [дата] [счёт]</code>\n\n\
    Примеры:\n\
    <code>500 еда</code>\n\
    <code>450 кафе обед с коллегой</code>\n\
    <code>1200 транспорт такси 04.10</code>\n\
    <code>300 продукты ужин дома 03.10 PKO</code>\n\n\
    Для выхода введите /cancel";

const CANCELLED: &str = "❌ Операция отменена. Воспользуйтесь главным меню.";
const CATEGORY_PROMPT: &str = "Пожалуйста, выберите категорию, используя кнопки ниже.";
const RETRY_HINT: &str = "Пожалуйста, повторите ввод или введите другую категорию.";
const CLARIFY_HINT: &str = "Выберите подходящую категорию из списка ниже или введите /cancel:";

pub struct FastExpenseWizard {
    sessions: SessionStore,
    categories: Arc<dyn CategoryService>,
    accounts: Arc<dyn AccountService>,
    transactions: Arc<dyn TransactionService>,
}

impl FastExpenseWizard {
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

    fn fresh_session() -> Session {
        Session {
            state: DialogState::AwaitingFastExpense,
            is_expense: true,
            ..Default::default()
        }
    }

    fn start(&self, chat_id: i64) -> Reply {
        self.sessions.put(chat_id, Self::fresh_session());
        Reply::text(chat_id, PROMPT_HTML).html()
    }

    fn resolve_account(&self, chat_id: i64, name: Option<&str>) -> Result<Account, LedgerError> {
        if let Some(name) = name
            && let Some(account) = self.accounts.find_by_name_and_owner(name, chat_id)
        {
            return Ok(account);
        }
        self.accounts.find_or_create_default(chat_id)
    }

    fn read_line(&self, chat_id: i64, text: &str) -> Result<Option<Reply>, LedgerError> {
        let today = crate::today();
        let category_names: Vec<String> = self
            .categories
            .list_by_kind(CategoryKind::Expense)
            .into_iter()
            .map(|c| c.name)
            .collect();
        let account_names: Vec<String> = self
            .accounts
            .list_by_owner(chat_id, false)
            .into_iter()
            .map(|a| a.name)
            .collect();

        let parsed = match parsing::parse_fast_expense(text, &category_names, &account_names, today)
        {
            Ok(parsed) => parsed,
            Err(err) => {
                return Ok(Some(
                    Reply::text(
                        chat_id,
                        format!(
                            "⚠️ Не смог разобрать Ваше сообщение: {err}\n\n\
                             Попробуйте снова: <code>500 еда</code> или введите /cancel"
                        ),
                    )
                    .html(),
                ));
            }
        };

        let account = self.resolve_account(chat_id, parsed.account.as_deref())?;

        match self
            .categories
            .find_by_name_and_kind(&parsed.category, CategoryKind::Expense)
        {
            Ok(category) => {
                self.transactions.add_expense(
                    chat_id,
                    parsed.amount,
                    &category,
                    parsed.comment.as_deref(),
                    Some(parsed.date),
                    &account,
                )?;
                let reply = Reply::text(
                    chat_id,
                    success_message(&parsed, &category.name, &account),
                )
                .html();
                self.sessions.put(chat_id, Self::fresh_session());
                Ok(Some(reply))
            }
            Err(LedgerError::NotFound(_)) => Ok(Some(self.clarify(chat_id, &parsed, account))),
            Err(err) => Err(err),
        }
    }

    /// Unknown category: offer similar ones, or ask to retype when nothing
    /// even resembles the input.
    fn clarify(&self, chat_id: i64, parsed: &FastExpense, account: Account) -> Reply {
        let similar = self.categories.search_similar(&parsed.category, chat_id);
        let escaped = ui::escape_html(&parsed.category);

        let mut session = Self::fresh_session();
        session.amount = Some(parsed.amount);
        session.comment = parsed.comment.clone();
        session.date = Some(parsed.date);
        session.account = Some(account);

        if similar.is_empty() {
            self.sessions.put(chat_id, session);
            return Reply::text(
                chat_id,
                format!("❌ Категория не найдена: <b>{escaped}</b>\n{RETRY_HINT}"),
            )
            .html();
        }

        session.state = DialogState::AwaitingCategoryClarification;
        self.sessions.put(chat_id, session);
        Reply::text(
            chat_id,
            format!("❌ Категория не найдена: <b>{escaped}</b>\n{CLARIFY_HINT}"),
        )
        .html()
        .with_keyboard(ui::category_keyboard(0, similar.len().max(1), &similar))
    }

    fn clarified(
        &self,
        chat_id: i64,
        text: &str,
        session: Session,
    ) -> Result<Option<Reply>, LedgerError> {
        if let Some(rest) = text.strip_prefix("category_page:") {
            let Ok(page) = rest.parse::<usize>() else {
                return Ok(None);
            };
            let listed = self.categories.list_by_kind(CategoryKind::Expense);
            return Ok(Some(Reply::text(chat_id, CATEGORY_PROMPT).with_keyboard(
                ui::category_keyboard(page, CATEGORY_PAGE_SIZE, &listed),
            )));
        }

        if let Some(name) = text.strip_prefix("category:") {
            if !self.categories.exists(name, Some(chat_id)) {
                return Ok(None);
            }
            let category = self.categories.find_by_name(name)?;
            let Some(amount) = session.amount else {
                return Err(LedgerError::InvalidInput(
                    "clarification without a stored amount".to_string(),
                ));
            };
            let account = match session.account.clone() {
                Some(account) => account,
                None => self.accounts.find_or_create_default(chat_id)?,
            };
            self.transactions.add_expense(
                chat_id,
                amount,
                &category,
                session.comment.as_deref(),
                session.date,
                &account,
            )?;
            let parsed = FastExpense {
                amount,
                category: category.name.clone(),
                category_known: true,
                comment: session.comment.clone(),
                date: session.date.unwrap_or_else(crate::today),
                account: Some(account.name.clone()),
            };
            let reply =
                Reply::text(chat_id, success_message(&parsed, &category.name, &account)).html();
            self.sessions.put(chat_id, Self::fresh_session());
            return Ok(Some(reply));
        }

        // Anything else is a fresh attempt at the whole line.
        self.read_line(chat_id, text)
    }
}

fn success_message(parsed: &FastExpense, category: &str, account: &Account) -> String {
    let mut text = format!(
        "✅ Расход записан: <b>{}</b> {}",
        ui::fmt_amount(parsed.amount),
        ui::escape_html(category)
    );
    if let Some(comment) = parsed.comment.as_deref().filter(|c| !c.is_empty()) {
        text.push_str(&format!(" - {}", ui::escape_html(comment)));
    }
    text.push_str(&format!(
        " ({:02}.{:02})",
        parsed.date.day(),
        parsed.date.month()
    ));
    text.push_str(&format!("\nСчёт: {}", ui::escape_html(&account.display_name())));
    text
}

impl Wizard for FastExpenseWizard {
    fn name(&self) -> &'static str {
        "fast_expense"
    }

    fn supports(&self, update: &BotUpdate) -> bool {
        if update.text.trim() == FAST_EXPENSE_LABEL {
            return true;
        }
        matches!(
            self.sessions.state_of(update.chat_id),
            Some(DialogState::AwaitingFastExpense)
                | Some(DialogState::AwaitingCategoryClarification)
        )
    }

    fn handle(&self, chat_id: i64, text: &str) -> Result<Option<Reply>, LedgerError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(LedgerError::InvalidInput("empty message".to_string()));
        }
        if text == FAST_EXPENSE_LABEL {
            return Ok(Some(self.start(chat_id)));
        }
        if text.eq_ignore_ascii_case("/cancel") {
            self.sessions.delete(chat_id);
            return Ok(Some(Reply::text(chat_id, CANCELLED)));
        }

        let session = self.sessions.get(chat_id).unwrap_or_default();
        match session.state {
            DialogState::AwaitingCategoryClarification => self.clarified(chat_id, text, session),
            _ => self.read_line(chat_id, text),
        }
    }
}
