//! SurrealDB implementation of [`AccountRepository`].
//!
//! Balance changes are a single `balance += $amount` statement. The
//! engine may abort one side of two overlapping writes to the same
//! record; those aborts are retried here so every delta lands exactly
//! once. A delete only matches a record whose balance is zero.

use std::time::Duration;

use chrono::{DateTime, Utc};
use mybank_core::error::{BankError, BankResult};
use mybank_core::models::account::{Account, AddBalance, CreateAccount, Currency};
use mybank_core::repository::{AccountRepository, PaginatedResult, Pagination};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use tracing::debug;
use uuid::Uuid;

use crate::error::DbError;

const ENTITY: &str = "account";

/// Attempts for a conflicting balance update before giving up.
const MAX_UPDATE_ATTEMPTS: u32 = 32;

#[derive(Debug, SurrealValue)]
struct AccountRow {
    owner: String,
    balance: i64,
    currency: String,
    created_at: DateTime<Utc>,
}

impl AccountRow {
    fn try_into_account(self, id: Uuid) -> Result<Account, DbError> {
        let currency = self
            .currency
            .parse::<Currency>()
            .map_err(|e| DbError::decode(ENTITY, e))?;
        Ok(Account {
            id,
            owner: self.owner,
            balance: self.balance,
            currency,
            created_at: self.created_at,
        })
    }
}

/// Row carrying the record key, for queries spanning many accounts.
#[derive(Debug, SurrealValue)]
struct AccountRowWithId {
    record_id: String,
    owner: String,
    balance: i64,
    currency: String,
    created_at: DateTime<Utc>,
}

impl AccountRowWithId {
    fn try_into_account(self) -> Result<Account, DbError> {
        let id = Uuid::parse_str(&self.record_id).map_err(|e| DbError::decode(ENTITY, e))?;
        AccountRow {
            owner: self.owner,
            balance: self.balance,
            currency: self.currency,
            created_at: self.created_at,
        }
        .try_into_account(id)
    }
}

#[derive(Debug, SurrealValue)]
struct CountRow {
    total: u64,
}

fn single(rows: Vec<AccountRow>, id: Uuid) -> Result<Account, DbError> {
    rows.into_iter()
        .next()
        .ok_or_else(|| not_found(id))?
        .try_into_account(id)
}

fn not_found(id: Uuid) -> DbError {
    DbError::NotFound {
        entity: ENTITY.into(),
        id: id.to_string(),
    }
}

/// SurrealDB implementation of the Account repository.
#[derive(Clone)]
pub struct SurrealAccountRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealAccountRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }

    async fn increment(&self, input: AddBalance) -> Result<Vec<AccountRow>, DbError> {
        let mut result = self
            .db
            .query("UPDATE type::record('account', $id) SET balance += $amount")
            .bind(("id", input.account_id.to_string()))
            .bind(("amount", input.amount))
            .await
            .and_then(|r| r.check())?;

        Ok(result.take(0)?)
    }
}

impl<C: Connection> AccountRepository for SurrealAccountRepository<C> {
    async fn create(&self, input: CreateAccount) -> BankResult<Account> {
        let id = Uuid::new_v4();

        let mut result = self
            .db
            .query(
                "CREATE type::record('account', $id) SET \
                 owner = $owner, \
                 balance = 0, \
                 currency = $currency",
            )
            .bind(("id", id.to_string()))
            .bind(("owner", input.owner))
            .bind(("currency", input.currency.code().to_string()))
            .await
            .and_then(|r| r.check())
            .map_err(|e| DbError::from_write(ENTITY, e))?;

        let rows: Vec<AccountRow> = result.take(0).map_err(DbError::from)?;
        Ok(single(rows, id)?)
    }

    async fn get_by_id(&self, id: Uuid) -> BankResult<Account> {
        let mut result = self
            .db
            .query("SELECT * FROM type::record('account', $id)")
            .bind(("id", id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<AccountRow> = result.take(0).map_err(DbError::from)?;
        Ok(single(rows, id)?)
    }

    async fn list_by_owner(
        &self,
        owner: &str,
        pagination: Pagination,
    ) -> BankResult<PaginatedResult<Account>> {
        let mut count_result = self
            .db
            .query("SELECT count() AS total FROM account WHERE owner = $owner GROUP ALL")
            .bind(("owner", owner.to_string()))
            .await
            .map_err(DbError::from)?;
        let count_rows: Vec<CountRow> = count_result.take(0).map_err(DbError::from)?;
        let total = count_rows.first().map(|r| r.total).unwrap_or(0);

        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * \
                 FROM account \
                 WHERE owner = $owner \
                 ORDER BY created_at ASC \
                 LIMIT $limit START $offset",
            )
            .bind(("owner", owner.to_string()))
            .bind(("limit", pagination.limit))
            .bind(("offset", pagination.offset))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<AccountRowWithId> = result.take(0).map_err(DbError::from)?;
        let items = rows
            .into_iter()
            .map(AccountRowWithId::try_into_account)
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(PaginatedResult {
            items,
            total,
            offset: pagination.offset,
            limit: pagination.limit,
        })
    }

    async fn delete(&self, id: Uuid) -> BankResult<()> {
        let mut result = self
            .db
            .query("DELETE type::record('account', $id) WHERE balance = 0 RETURN BEFORE")
            .bind(("id", id.to_string()))
            .await
            .and_then(|r| r.check())
            .map_err(DbError::from)?;

        let rows: Vec<AccountRow> = result.take(0).map_err(DbError::from)?;
        if !rows.is_empty() {
            return Ok(());
        }

        // Nothing matched: the account is either gone or holds funds.
        let account = self.get_by_id(id).await?;
        Err(BankError::BalanceNotZero {
            account_id: id.to_string(),
            balance: account.balance,
        })
    }

    async fn add_balance(&self, input: AddBalance) -> BankResult<Account> {
        let mut attempt = 1;
        let rows = loop {
            match self.increment(input).await {
                Ok(rows) => break rows,
                Err(e) if e.is_retryable() && attempt < MAX_UPDATE_ATTEMPTS => {
                    debug!(
                        account_id = %input.account_id,
                        attempt,
                        error = %e,
                        "balance update conflicted, retrying"
                    );
                    tokio::time::sleep(Duration::from_millis(u64::from(attempt))).await;
                    attempt += 1;
                }
                Err(e) => return Err(e.into()),
            }
        };

        Ok(single(rows, input.account_id)?)
    }
}
