//! Account balances.
//!
//! Balances only move through [`debit`] and [`credit`] inside a store
//! transaction. The debit checks and decrements in one conditional update,
//! so concurrent debits can never drive a balance negative.

pub mod balance;
pub mod models;

pub use balance::{credit, debit};
pub use models::Account;
