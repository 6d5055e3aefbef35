//! MyBank Accounts: account lifecycle and balance changes.
//!
//! [`AccountService`] holds the two ledger invariants: only a zero
//! balance account may be deleted, and a balance change made on behalf
//! of a user must target an account that user owns.

pub mod service;

pub use service::{AccessScope, AccountService, AddBalanceInput, CreateAccountInput};
