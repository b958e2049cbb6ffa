//! Posted transactions and the append/query contract.

use std::sync::{Arc, Mutex};

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    LedgerError, MoneyCents,
    account::Account,
    category::{Category, CategoryService},
};

/// Comments longer than this are cut before posting.
pub const MAX_COMMENT_CHARS: usize = 512;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransactionKind {
    Expense,
    Income,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: Uuid,
    pub owner: i64,
    pub kind: TransactionKind,
    pub amount: MoneyCents,
    pub category: Category,
    pub comment: Option<String>,
    pub account_id: i64,
    pub currency: String,
    /// The day the expense/income happened, as chosen by the user.
    pub operation_date: NaiveDate,
    /// When the record was appended.
    pub posted_at: DateTime<Utc>,
}

pub trait TransactionService: Send + Sync {
    fn add_expense(
        &self,
        owner: i64,
        amount: MoneyCents,
        category: &Category,
        comment: Option<&str>,
        date: Option<NaiveDate>,
        account: &Account,
    ) -> Result<(), LedgerError>;

    fn add_income(
        &self,
        owner: i64,
        amount: MoneyCents,
        category: &Category,
        comment: Option<&str>,
        date: Option<NaiveDate>,
        account: &Account,
    ) -> Result<(), LedgerError>;

    /// All transactions of `owner` with `from <= operation_date <= to`.
    fn list_by_period(
        &self,
        owner: i64,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<Transaction>, LedgerError>;

    /// Removes the most recently posted transaction of `owner`.
    fn delete_last(&self, owner: i64) -> Result<(), LedgerError>;
}

/// In-memory transaction log. Appends also bump the category usage counter.
#[derive(Clone)]
pub struct InMemoryTransactions {
    inner: Arc<Mutex<Vec<Transaction>>>,
    categories: Arc<dyn CategoryService>,
}

impl InMemoryTransactions {
    pub fn new(categories: Arc<dyn CategoryService>) -> Self {
        Self {
            inner: Arc::default(),
            categories,
        }
    }

    fn append(
        &self,
        owner: i64,
        kind: TransactionKind,
        amount: MoneyCents,
        category: &Category,
        comment: Option<&str>,
        date: Option<NaiveDate>,
        account: &Account,
    ) -> Result<(), LedgerError> {
        if !amount.is_positive() {
            return Err(LedgerError::InvalidAmount(amount.to_string()));
        }

        let transaction = Transaction {
            id: Uuid::new_v4(),
            owner,
            kind,
            amount,
            category: category.clone(),
            comment: comment
                .map(str::trim)
                .filter(|c| !c.is_empty())
                .map(truncate_comment),
            account_id: account.id,
            currency: account.currency.clone(),
            operation_date: date.unwrap_or_else(|| Utc::now().date_naive()),
            posted_at: Utc::now(),
        };

        {
            let mut guard = self.inner.lock().unwrap_or_else(|e| e.into_inner());
            guard.push(transaction);
        }
        self.categories.increment_usage(category.id)
    }
}

fn truncate_comment(comment: &str) -> String {
    comment.chars().take(MAX_COMMENT_CHARS).collect()
}

impl TransactionService for InMemoryTransactions {
    fn add_expense(
        &self,
        owner: i64,
        amount: MoneyCents,
        category: &Category,
        comment: Option<&str>,
        date: Option<NaiveDate>,
        account: &Account,
    ) -> Result<(), LedgerError> {
        self.append(
            owner,
            TransactionKind::Expense,
            amount,
            category,
            comment,
            date,
            account,
        )
    }

    fn add_income(
        &self,
        owner: i64,
        amount: MoneyCents,
        category: &Category,
        comment: Option<&str>,
        date: Option<NaiveDate>,
        account: &Account,
    ) -> Result<(), LedgerError> {
        self.append(
            owner,
            TransactionKind::Income,
            amount,
            category,
            comment,
            date,
            account,
        )
    }

    fn list_by_period(
        &self,
        owner: i64,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<Transaction>, LedgerError> {
        if from > to {
            return Err(LedgerError::InvalidInput(format!(
                "period start {from} is after end {to}"
            )));
        }
        let guard = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        Ok(guard
            .iter()
            .filter(|t| t.owner == owner && t.operation_date >= from && t.operation_date <= to)
            .cloned()
            .collect())
    }

    fn delete_last(&self, owner: i64) -> Result<(), LedgerError> {
        let mut guard = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        let last = guard
            .iter()
            .enumerate()
            .filter(|(_, t)| t.owner == owner)
            .max_by_key(|(_, t)| t.posted_at)
            .map(|(idx, _)| idx)
            .ok_or_else(|| LedgerError::NotFound("no transactions to delete".to_string()))?;
        guard.remove(last);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::category::{CategoryKind, InMemoryCategories};

    fn fixture() -> (InMemoryTransactions, Category, Account) {
        let categories = Arc::new(InMemoryCategories::new());
        let category = categories
            .create("Еда", CategoryKind::Expense, None)
            .unwrap();
        let account = Account {
            id: 1,
            name: "Cash".to_string(),
            kind: crate::account::AccountKind::Cash,
            currency: "PLN".to_string(),
            owner: 10,
            archived: false,
        };
        (InMemoryTransactions::new(categories), category, account)
    }

    #[test]
    fn append_bumps_usage_and_truncates_comment() {
        let (transactions, category, account) = fixture();
        let long_comment = "ы".repeat(MAX_COMMENT_CHARS + 50);
        transactions
            .add_expense(
                10,
                MoneyCents::new(50_00),
                &category,
                Some(&long_comment),
                Some(NaiveDate::from_ymd_opt(2025, 10, 3).unwrap()),
                &account,
            )
            .unwrap();

        let listed = transactions
            .list_by_period(
                10,
                NaiveDate::from_ymd_opt(2025, 10, 1).unwrap(),
                NaiveDate::from_ymd_opt(2025, 10, 31).unwrap(),
            )
            .unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(
            listed[0].comment.as_ref().unwrap().chars().count(),
            MAX_COMMENT_CHARS
        );
    }

    #[test]
    fn zero_amount_is_rejected() {
        let (transactions, category, account) = fixture();
        assert!(matches!(
            transactions.add_income(10, MoneyCents::ZERO, &category, None, None, &account),
            Err(LedgerError::InvalidAmount(_))
        ));
    }

    #[test]
    fn period_filter_is_inclusive_and_per_owner() {
        let (transactions, category, account) = fixture();
        let date = NaiveDate::from_ymd_opt(2025, 3, 3).unwrap();
        transactions
            .add_expense(10, MoneyCents::new(100), &category, None, Some(date), &account)
            .unwrap();
        transactions
            .add_expense(11, MoneyCents::new(100), &category, None, Some(date), &account)
            .unwrap();

        let listed = transactions.list_by_period(10, date, date).unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].owner, 10);
    }

    #[test]
    fn delete_last_removes_most_recent() {
        let (transactions, category, account) = fixture();
        assert!(matches!(
            transactions.delete_last(10),
            Err(LedgerError::NotFound(_))
        ));
        transactions
            .add_expense(10, MoneyCents::new(100), &category, None, None, &account)
            .unwrap();
        transactions.delete_last(10).unwrap();
        let today = Utc::now().date_naive();
        assert!(transactions.list_by_period(10, today, today).unwrap().is_empty());
    }
}
