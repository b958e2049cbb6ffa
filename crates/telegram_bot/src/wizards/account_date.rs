//! Account and date selection step shared by the expense and income flows.

use std::sync::Arc;

use chrono::NaiveDate;
use ledger::{AccountService, LedgerError};

use crate::{
    session::{DialogState, Session, SessionStore},
    ui::{self, Reply},
};

pub(crate) const ACCOUNT_AND_DATE_PROMPT: &str = "Пожалуйста, выберите счёт и дату. \
    Если хотите использовать счёт по умолчанию и сегодняшнюю дату, нажмите \"Продолжить\".";

pub(crate) const DESCRIPTION_PROMPT: &str = "Если хотите, можете добавить комментарий, \
    или нажмите \"Продолжить\" чтобы пропустить этот шаг.";

const CHOOSE_ACCOUNT_PROMPT: &str = "Выберите счёт:";
const CHOOSE_DATE_PROMPT: &str = "Выберите дату:";

/// Advances the account-and-date step. Returns `Ok(None)` for payloads that
/// do not belong to this step, leaving the session untouched.
pub(crate) fn handle(
    chat_id: i64,
    text: &str,
    mut session: Session,
    sessions: &SessionStore,
    accounts: &Arc<dyn AccountService>,
) -> Result<Option<Reply>, LedgerError> {
    let today = crate::today();

    if let Some(rest) = text.strip_prefix("proceed_account_date:") {
        let Some((id_raw, date_raw)) = rest.split_once(':') else {
            return Ok(None);
        };
        let Ok(id) = id_raw.parse::<i64>() else {
            return Ok(None);
        };
        let Ok(date) = date_raw.parse::<NaiveDate>() else {
            return Ok(None);
        };
        let account = match accounts.find_by_id(id) {
            Ok(account) => account,
            Err(LedgerError::NotFound(_)) => accounts.find_or_create_default(chat_id)?,
            Err(err) => return Err(err),
        };
        session.account = Some(account);
        session.date = Some(date);
        session.state = DialogState::AwaitingDescription;
        sessions.put(chat_id, session);
        return Ok(Some(
            Reply::text(chat_id, DESCRIPTION_PROMPT).with_keyboard(ui::skip_description_keyboard()),
        ));
    }

    if text == "account:choose" {
        let owned = accounts.list_by_owner(chat_id, false);
        return Ok(Some(
            Reply::text(chat_id, CHOOSE_ACCOUNT_PROMPT).with_keyboard(ui::account_picker(&owned)),
        ));
    }

    if let Some(rest) = text.strip_prefix("account:") {
        let Ok(id) = rest.parse::<i64>() else {
            return Ok(None);
        };
        let Some(account) = accounts
            .list_by_owner(chat_id, false)
            .into_iter()
            .find(|a| a.id == id)
        else {
            return Ok(None);
        };
        let keyboard = ui::account_date_keyboard(&account, session.date, today);
        session.account = Some(account);
        sessions.put(chat_id, session);
        return Ok(Some(
            Reply::text(chat_id, ACCOUNT_AND_DATE_PROMPT).with_keyboard(keyboard),
        ));
    }

    if text.starts_with("date") {
        return handle_date(chat_id, text, session, sessions, accounts, today);
    }

    Ok(None)
}

fn handle_date(
    chat_id: i64,
    text: &str,
    mut session: Session,
    sessions: &SessionStore,
    accounts: &Arc<dyn AccountService>,
    today: NaiveDate,
) -> Result<Option<Reply>, LedgerError> {
    let mut parts = text.splitn(3, ':');
    let _ = parts.next();
    let Some(action) = parts.next() else {
        return Ok(None);
    };

    match action {
        "choose" => Ok(Some(
            Reply::text(chat_id, CHOOSE_DATE_PROMPT).with_keyboard(ui::calendar(today, None, today)),
        )),
        "accept" => {
            let Some(date) = parts.next().and_then(|raw| raw.parse::<NaiveDate>().ok()) else {
                return Ok(None);
            };
            session.date = Some(date);
            let account = match session.account.clone() {
                Some(account) => account,
                None => accounts.find_or_create_default(chat_id)?,
            };
            let keyboard = ui::account_date_keyboard(&account, Some(date), today);
            session.account = Some(account);
            sessions.put(chat_id, session);
            Ok(Some(
                Reply::text(chat_id, ACCOUNT_AND_DATE_PROMPT).with_keyboard(keyboard),
            ))
        }
        // Day tap or month arrow: redraw the calendar, nothing committed yet.
        _ => Ok(Some(
            Reply::text(chat_id, CHOOSE_DATE_PROMPT)
                .with_keyboard(ui::calendar_navigation(text, today)),
        )),
    }
}

/// Comment step shared by both flows: free text becomes the comment, the
/// skip button leaves it empty.
pub(crate) fn apply_description(session: &mut Session, text: &str) {
    let comment = if text.eq_ignore_ascii_case("skip_description") {
        String::new()
    } else {
        text.to_string()
    };
    session.comment = Some(comment);
    session.state = DialogState::AwaitingConfirmation;
}
