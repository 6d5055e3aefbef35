//! Account service.

use mybank_core::context::RequestContext;
use mybank_core::error::{BankError, BankResult};
use mybank_core::models::account::{Account, AddBalance, CreateAccount, Currency};
use mybank_core::repository::{AccountRepository, PaginatedResult, Pagination};
use mybank_core::validation::{Checks, FieldError, Validate};
use tracing::{info, warn};
use uuid::Uuid;

/// On whose behalf a balance change runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessScope {
    /// A user acting on their own accounts.
    Owner(String),
    /// Trusted internal callers, e.g. a transfer orchestrator. No
    /// ownership check is made.
    System,
}

#[derive(Debug, Clone)]
pub struct CreateAccountInput {
    pub owner: String,
    /// ISO code, one of `USD`, `EUR`, `CAD`.
    pub currency: String,
}

impl CreateAccountInput {
    fn currency(&self) -> Result<Currency, FieldError> {
        self.currency
            .parse::<Currency>()
            .map_err(|reason| FieldError::new("currency", reason))
    }
}

impl Validate for CreateAccountInput {
    fn validate(&self) -> Result<(), Vec<FieldError>> {
        let mut checks = Checks::new();
        checks.required("owner", &self.owner);
        if let Err(e) = self.currency() {
            checks.push(&e.field, e.reason);
        }
        checks.finish()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct AddBalanceInput {
    pub account_id: Uuid,
    /// Signed amount in minor units.
    pub amount: i64,
}

pub struct AccountService<A: AccountRepository> {
    account_repo: A,
}

impl<A: AccountRepository> AccountService<A> {
    pub fn new(account_repo: A) -> Self {
        Self { account_repo }
    }

    /// Open a zero-balance account. One account per owner and currency.
    pub async fn create(
        &self,
        ctx: &RequestContext,
        input: CreateAccountInput,
    ) -> BankResult<Account> {
        input.ensure_valid()?;
        let currency = input
            .currency()
            .map_err(|e| BankError::InvalidParams { errors: vec![e] })?;

        let account = ctx
            .run(self.account_repo.create(CreateAccount {
                owner: input.owner,
                currency,
            }))
            .await?;

        info!(
            account_id = %account.id,
            owner = %account.owner,
            currency = %account.currency,
            "account created"
        );
        Ok(account)
    }

    pub async fn get(&self, ctx: &RequestContext, id: Uuid) -> BankResult<Account> {
        ctx.run(self.account_repo.get_by_id(id)).await
    }

    pub async fn list(
        &self,
        ctx: &RequestContext,
        owner: &str,
        pagination: Pagination,
    ) -> BankResult<PaginatedResult<Account>> {
        let mut checks = Checks::new();
        checks.required("owner", owner);
        if let Err(errors) = pagination.validate() {
            for e in errors {
                checks.push(&e.field, e.reason);
            }
        }
        checks
            .finish()
            .map_err(|errors| BankError::InvalidParams { errors })?;

        ctx.run(self.account_repo.list_by_owner(owner, pagination))
            .await
    }

    /// Delete an account whose balance is exactly zero.
    ///
    /// The repository delete is itself conditional on a zero balance, so
    /// a deposit landing after the read still blocks the delete.
    pub async fn delete(&self, ctx: &RequestContext, id: Uuid) -> BankResult<()> {
        let account = ctx.run(self.account_repo.get_by_id(id)).await?;
        if account.balance != 0 {
            return Err(BankError::BalanceNotZero {
                account_id: account.id.to_string(),
                balance: account.balance,
            });
        }

        ctx.run(self.account_repo.delete(id)).await?;
        info!(account_id = %id, owner = %account.owner, "account deleted");
        Ok(())
    }

    /// Apply a signed amount to an account balance.
    ///
    /// Under [`AccessScope::Owner`] a missing account and a foreign
    /// account both yield [`BankError::Forbidden`]. The change itself is
    /// one atomic repository update.
    pub async fn add_balance(
        &self,
        ctx: &RequestContext,
        scope: &AccessScope,
        input: AddBalanceInput,
    ) -> BankResult<Account> {
        if let AccessScope::Owner(owner) = scope {
            self.ensure_owner(ctx, owner, input.account_id).await?;
        }

        let account = ctx
            .run(self.account_repo.add_balance(AddBalance {
                account_id: input.account_id,
                amount: input.amount,
            }))
            .await?;

        info!(
            account_id = %account.id,
            amount = input.amount,
            balance = account.balance,
            "balance updated"
        );
        Ok(account)
    }

    async fn ensure_owner(
        &self,
        ctx: &RequestContext,
        owner: &str,
        account_id: Uuid,
    ) -> BankResult<()> {
        match ctx.run(self.account_repo.get_by_id(account_id)).await {
            Ok(account) if account.owner == owner => Ok(()),
            Ok(_) => {
                warn!(%account_id, caller = %owner, "balance change on foreign account");
                Err(BankError::forbidden("account belongs to another user"))
            }
            Err(BankError::NotFound { .. }) => {
                warn!(%account_id, caller = %owner, "balance change on unknown account");
                Err(BankError::forbidden("account belongs to another user"))
            }
            Err(e) => Err(e),
        }
    }
}
