//! Period-based statistics: totals, balance and the top expense categories.

use std::sync::Arc;

use chrono::{Datelike, NaiveDate};
use ledger::{LedgerError, MoneyCents, TransactionKind, TransactionService};

use crate::{
    dispatch::Wizard,
    session::{DialogState, Session, SessionStore},
    ui::{self, STATISTICS_LABEL, Reply},
    update::BotUpdate,
};

const FOOTER: &str = "\n\n\nВведите /start для возврата в главное меню.";
const UNKNOWN_PERIOD: &str = "Неизвестный период. Пожалуйста, выберите период снова.";
const USE_MENU: &str = "Пожалуйста, используйте меню для навигации.";

pub struct StatisticsWizard {
    sessions: SessionStore,
    transactions: Arc<dyn TransactionService>,
}

impl StatisticsWizard {
    pub fn new(sessions: SessionStore, transactions: Arc<dyn TransactionService>) -> Self {
        Self {
            sessions,
            transactions,
        }
    }

    fn start(&self, chat_id: i64) -> Result<Reply, LedgerError> {
        self.sessions.put(
            chat_id,
            Session {
                state: DialogState::AwaitingStatsPeriod,
                ..Default::default()
            },
        );
        let today = crate::today();
        let report = self.report(chat_id, first_of_month(today), today)?;
        Ok(Reply::text(chat_id, report).with_keyboard(ui::period_keyboard()))
    }

    fn period(&self, chat_id: i64, text: &str) -> Result<Option<Reply>, LedgerError> {
        let Some(period) = text.strip_prefix("stats_period:") else {
            return Ok(None);
        };
        let today = crate::today();
        let range = match period {
            "today" => Some((today, today)),
            "month" => Some((first_of_month(today), today)),
            "last_month" => first_of_month(today)
                .pred_opt()
                .map(|end| (first_of_month(end), end)),
            "year" => Some((first_of_year(today), today)),
            "last_year" => first_of_year(today)
                .pred_opt()
                .map(|end| (first_of_year(end), end)),
            _ => None,
        };
        let Some((from, to)) = range else {
            return Ok(Some(
                Reply::text(chat_id, UNKNOWN_PERIOD).with_keyboard(ui::period_keyboard()),
            ));
        };
        let report = self.report(chat_id, from, to)?;
        Ok(Some(
            Reply::text(chat_id, format!("{report}{FOOTER}"))
                .with_keyboard(ui::period_keyboard()),
        ))
    }

    fn report(&self, chat_id: i64, from: NaiveDate, to: NaiveDate) -> Result<String, LedgerError> {
        let transactions = self.transactions.list_by_period(chat_id, from, to)?;

        let mut expenses = MoneyCents::ZERO;
        let mut incomes = MoneyCents::ZERO;
        let mut by_category: Vec<(String, MoneyCents)> = Vec::new();
        for tx in &transactions {
            match tx.kind {
                TransactionKind::Expense => {
                    expenses += tx.amount;
                    match by_category.iter_mut().find(|(n, _)| *n == tx.category.name) {
                        Some((_, total)) => *total += tx.amount,
                        None => by_category.push((tx.category.name.clone(), tx.amount)),
                    }
                }
                TransactionKind::Income => incomes += tx.amount,
            }
        }
        by_category.sort_by(|a, b| b.1.cmp(&a.1));

        let mut header = format!("📊 Статистика — {} {}", ui::month_name(from.month()), from.year());
        if (to.year(), to.month()) != (from.year(), from.month()) {
            header.push_str(&format!(" - {} {}", ui::month_name(to.month()), to.year()));
        }

        let mut text = format!(
            "{header}\n\nВсего транзакций: {}\n\n• Расходы: {} PLN\n• Доходы: {} PLN\n• Баланс: {} PLN\n\n",
            transactions.len(),
            ui::fmt_amount(expenses),
            ui::fmt_amount(incomes),
            ui::fmt_amount(incomes - expenses),
        );
        text.push_str("Топ категорий (расходы):\n");
        for (name, total) in by_category.iter().take(5) {
            text.push_str(&format!(
                "• {name}: {} PLN ({}%)\n",
                ui::fmt_amount(*total),
                percent_share(*total, expenses)
            ));
        }
        Ok(text)
    }
}

/// Share of `part` in `total` with two decimals, computed in integers.
fn percent_share(part: MoneyCents, total: MoneyCents) -> String {
    if !total.is_positive() {
        return "0".to_string();
    }
    let part = part.cents() as i128;
    let total = total.cents() as i128;
    let pct = (part * 10000 + total / 2) / total;
    format!("{}.{:02}", pct / 100, pct % 100)
}

fn first_of_month(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

fn first_of_year(date: NaiveDate) -> NaiveDate {
    date.with_ordinal(1).unwrap_or(date)
}

impl Wizard for StatisticsWizard {
    fn name(&self) -> &'static str {
        "statistics"
    }

    fn supports(&self, update: &BotUpdate) -> bool {
        update.text.trim() == STATISTICS_LABEL
            || self.sessions.state_of(update.chat_id) == Some(DialogState::AwaitingStatsPeriod)
    }

    fn handle(&self, chat_id: i64, text: &str) -> Result<Option<Reply>, LedgerError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(LedgerError::InvalidInput("empty message".to_string()));
        }
        if text == STATISTICS_LABEL {
            return Ok(Some(self.start(chat_id)?));
        }

        match self.sessions.state_of(chat_id) {
            Some(DialogState::AwaitingStatsPeriod) => self.period(chat_id, text),
            None | Some(DialogState::Idle) => Ok(Some(self.start(chat_id)?)),
            Some(_) => Ok(Some(Reply::text(chat_id, USE_MENU))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percent_is_rounded_to_two_decimals() {
        assert_eq!(
            percent_share(MoneyCents::new(1_00), MoneyCents::new(3_00)),
            "33.33"
        );
        assert_eq!(
            percent_share(MoneyCents::new(2_00), MoneyCents::new(3_00)),
            "66.67"
        );
        assert_eq!(
            percent_share(MoneyCents::new(5_00), MoneyCents::new(5_00)),
            "100.00"
        );
    }

    #[test]
    fn percent_of_zero_total_is_zero() {
        assert_eq!(percent_share(MoneyCents::new(1_00), MoneyCents::ZERO), "0");
    }
}
