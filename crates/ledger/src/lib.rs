//! Domain layer: money, categories, accounts, users and the transaction log.
//!
//! Consumers talk to the `*Service` traits; the `InMemory*` types are the
//! reference implementations wired up by the application binary.

pub use account::{Account, AccountKind, AccountService, DEFAULT_CURRENCY, InMemoryAccounts};
pub use category::{Category, CategoryKind, CategoryService, InMemoryCategories};
pub use error::LedgerError;
pub use money::MoneyCents;
pub use transaction::{
    InMemoryTransactions, MAX_COMMENT_CHARS, Transaction, TransactionKind, TransactionService,
};
pub use user::{InMemoryUsers, User, UserService};

mod account;
mod category;
mod error;
mod money;
mod transaction;
mod user;
