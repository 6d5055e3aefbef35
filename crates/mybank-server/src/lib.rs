//! MyBank service host.
//!
//! Turns command-line / environment configuration into [`DbConfig`] and
//! [`AuthConfig`], connects and migrates the store, and wires the
//! services on top of it.

use clap::Parser;
use mybank_accounts::AccountService;
use mybank_auth::config::MAX_TOKEN_LIFETIME_SECS;
use mybank_auth::{AuthConfig, AuthService, CreateUserInput};
use mybank_core::context::RequestContext;
use mybank_core::error::{BankError, BankResult};
use mybank_core::models::user::Role;
use mybank_db::repository::{
    SurrealAccountRepository, SurrealSessionRepository, SurrealUserRepository,
};
use mybank_db::{DbConfig, DbManager};
use surrealdb::engine::any::Any;
use tracing::info;

/// CLI arguments. Every flag falls back to a `MYBANK_*` variable.
#[derive(Parser, Debug, Clone)]
#[command(name = "mybank", about = "MyBank account and authentication services")]
pub struct Args {
    /// SurrealDB endpoint (`ws://host:port` or `mem://`).
    #[arg(long, env = "MYBANK_DB_URL", default_value = "ws://127.0.0.1:8000")]
    pub db_url: String,

    #[arg(long, env = "MYBANK_DB_NAMESPACE", default_value = "mybank")]
    pub db_namespace: String,

    #[arg(long, env = "MYBANK_DB_DATABASE", default_value = "main")]
    pub db_database: String,

    #[arg(long, env = "MYBANK_DB_USERNAME", default_value = "root")]
    pub db_username: String,

    #[arg(long, env = "MYBANK_DB_PASSWORD", default_value = "root", hide_env_values = true)]
    pub db_password: String,

    /// HMAC secret for signing tokens; at least 32 bytes.
    #[arg(long, env = "MYBANK_TOKEN_SECRET", hide_env_values = true)]
    pub token_secret: String,

    #[arg(long, env = "MYBANK_TOKEN_ISSUER", default_value = "mybank")]
    pub token_issuer: String,

    /// Access token lifetime in seconds.
    #[arg(
        long,
        env = "MYBANK_ACCESS_TOKEN_TTL",
        default_value_t = 900,
        value_parser = clap::value_parser!(u64).range(1..=MAX_TOKEN_LIFETIME_SECS)
    )]
    pub access_token_ttl: u64,

    /// Refresh token (and session) lifetime in seconds.
    #[arg(
        long,
        env = "MYBANK_REFRESH_TOKEN_TTL",
        default_value_t = 86_400,
        value_parser = clap::value_parser!(u64).range(1..=MAX_TOKEN_LIFETIME_SECS)
    )]
    pub refresh_token_ttl: u64,

    /// Optional pepper mixed into every password hash.
    #[arg(long, env = "MYBANK_PASSWORD_PEPPER", hide_env_values = true)]
    pub password_pepper: Option<String>,

    #[arg(long, env = "MYBANK_MIN_PASSWORD_LENGTH", default_value_t = 6)]
    pub min_password_length: usize,

    /// Register a banker account with this username at start-up if it
    /// does not exist yet. Requires the matching password and email.
    #[arg(long, env = "MYBANK_BOOTSTRAP_BANKER", requires_all = ["bootstrap_password", "bootstrap_email"])]
    pub bootstrap_banker: Option<String>,

    #[arg(long, env = "MYBANK_BOOTSTRAP_PASSWORD", hide_env_values = true)]
    pub bootstrap_password: Option<String>,

    #[arg(long, env = "MYBANK_BOOTSTRAP_EMAIL")]
    pub bootstrap_email: Option<String>,
}

impl Args {
    pub fn db_config(&self) -> DbConfig {
        DbConfig {
            url: self.db_url.clone(),
            namespace: self.db_namespace.clone(),
            database: self.db_database.clone(),
            username: self.db_username.clone(),
            password: self.db_password.clone(),
        }
    }

    pub fn auth_config(&self) -> AuthConfig {
        AuthConfig {
            token_secret: self.token_secret.clone(),
            token_issuer: self.token_issuer.clone(),
            access_token_lifetime_secs: self.access_token_ttl,
            refresh_token_lifetime_secs: self.refresh_token_ttl,
            pepper: self.password_pepper.clone(),
            min_password_length: self.min_password_length,
        }
    }

    fn bootstrap_user(&self) -> Option<CreateUserInput> {
        let username = self.bootstrap_banker.clone()?;
        Some(CreateUserInput {
            full_name: username.clone(),
            username,
            password: self.bootstrap_password.clone()?,
            email: self.bootstrap_email.clone()?,
            role: Role::Banker,
        })
    }
}

pub type Auth = AuthService<SurrealUserRepository<Any>, SurrealSessionRepository<Any>>;
pub type Accounts = AccountService<SurrealAccountRepository<Any>>;

/// The wired services, sharing one database handle.
pub struct App {
    pub auth: Auth,
    pub accounts: Accounts,
}

impl App {
    /// Build services over an already migrated database.
    pub fn new(db: &DbManager, auth_config: AuthConfig) -> BankResult<Self> {
        let client = db.client().clone();
        let auth = AuthService::new(
            SurrealUserRepository::new(client.clone()),
            SurrealSessionRepository::new(client.clone()),
            auth_config,
        )?;
        let accounts = AccountService::new(SurrealAccountRepository::new(client));
        Ok(Self { auth, accounts })
    }

    /// Connect, migrate, wire, and run the optional banker bootstrap.
    pub async fn start(args: &Args) -> Result<Self, Box<dyn std::error::Error>> {
        let db = DbManager::connect(&args.db_config()).await?;

        let applied = mybank_db::run_migrations(db.client()).await?;
        info!(applied, "migrations complete");

        let app = Self::new(&db, args.auth_config())?;
        if let Some(input) = args.bootstrap_user() {
            app.bootstrap_banker(&RequestContext::background(), input)
                .await?;
        }
        Ok(app)
    }

    /// Create the bootstrap banker unless the username is taken.
    async fn bootstrap_banker(
        &self,
        ctx: &RequestContext,
        input: CreateUserInput,
    ) -> BankResult<()> {
        let username = input.username.clone();
        match self.auth.create_user(ctx, input).await {
            Ok(_) => Ok(()),
            Err(BankError::AlreadyExists { .. }) => {
                info!(%username, "bootstrap banker already present");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }
}
