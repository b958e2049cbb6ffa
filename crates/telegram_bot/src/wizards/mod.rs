//! Conversational flows, one module per menu action.

pub mod expense;
pub mod fast_expense;
pub mod income;
pub mod statistics;

mod account_date;
