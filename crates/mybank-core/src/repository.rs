//! Repository trait definitions for data access abstraction.
//!
//! All repository operations are async and return [`BankResult`].
//! Implementations report a missing row as [`BankError::NotFound`]
//! and a unique-index violation as [`BankError::AlreadyExists`];
//! everything else is [`BankError::Database`].
//!
//! [`BankError::NotFound`]: crate::error::BankError::NotFound
//! [`BankError::AlreadyExists`]: crate::error::BankError::AlreadyExists
//! [`BankError::Database`]: crate::error::BankError::Database

use uuid::Uuid;

use crate::error::BankResult;
use crate::models::{
    account::{Account, AddBalance, CreateAccount},
    session::{CreateSession, Session},
    user::{CreateUser, User},
};
use crate::validation::{Checks, FieldError, Validate};

/// Largest page a list query may request.
pub const MAX_PAGE_SIZE: u64 = 100;

/// Pagination parameters for list queries.
#[derive(Debug, Clone)]
pub struct Pagination {
    pub offset: u64,
    pub limit: u64,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            offset: 0,
            limit: 50,
        }
    }
}

impl Validate for Pagination {
    fn validate(&self) -> Result<(), Vec<FieldError>> {
        Checks::new()
            .range("limit", self.limit, 1, MAX_PAGE_SIZE)
            .finish()
    }
}

/// A paginated result set.
#[derive(Debug, Clone)]
pub struct PaginatedResult<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub offset: u64,
    pub limit: u64,
}

// ---------------------------------------------------------------------------
// Identity
// ---------------------------------------------------------------------------

pub trait UserRepository: Send + Sync {
    fn create(&self, input: CreateUser) -> impl Future<Output = BankResult<User>> + Send;
    fn get_by_username(&self, username: &str) -> impl Future<Output = BankResult<User>> + Send;
    /// Store a new password hash and stamp `password_changed_at`.
    fn update_password(
        &self,
        username: &str,
        hashed_password: String,
    ) -> impl Future<Output = BankResult<User>> + Send;
    /// Flip the verified flag; invoked by the external verification step.
    fn mark_email_verified(&self, username: &str)
    -> impl Future<Output = BankResult<User>> + Send;
}

pub trait SessionRepository: Send + Sync {
    /// Persist a session under the caller-supplied id.
    fn create(&self, input: CreateSession) -> impl Future<Output = BankResult<Session>> + Send;
    fn get_by_id(&self, id: Uuid) -> impl Future<Output = BankResult<Session>> + Send;
    /// Administrative block/unblock.
    fn set_blocked(
        &self,
        id: Uuid,
        blocked: bool,
    ) -> impl Future<Output = BankResult<Session>> + Send;
}

// ---------------------------------------------------------------------------
// Ledger
// ---------------------------------------------------------------------------

pub trait AccountRepository: Send + Sync {
    /// Create an account with a zero balance.
    fn create(&self, input: CreateAccount) -> impl Future<Output = BankResult<Account>> + Send;
    fn get_by_id(&self, id: Uuid) -> impl Future<Output = BankResult<Account>> + Send;
    fn list_by_owner(
        &self,
        owner: &str,
        pagination: Pagination,
    ) -> impl Future<Output = BankResult<PaginatedResult<Account>>> + Send;
    /// Remove the account only if its balance is zero at the moment of
    /// deletion; otherwise [`BankError::BalanceNotZero`].
    ///
    /// [`BankError::BalanceNotZero`]: crate::error::BankError::BalanceNotZero
    fn delete(&self, id: Uuid) -> impl Future<Output = BankResult<()>> + Send;
    /// Apply `input.amount` to the balance as a single in-place update
    /// and return the account as it is afterwards.
    fn add_balance(&self, input: AddBalance) -> impl Future<Output = BankResult<Account>> + Send;
}
