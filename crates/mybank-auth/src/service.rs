//! Authentication service: user registration, login, and access
//! token renewal.

use chrono::{DateTime, Duration, Utc};
use mybank_core::context::RequestContext;
use mybank_core::error::{BankError, BankResult};
use mybank_core::models::session::CreateSession;
use mybank_core::models::user::{CreateUser, Role, User, UserView};
use mybank_core::repository::{SessionRepository, UserRepository};
use mybank_core::validation::{Checks, FieldError, Validate};
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::AuthConfig;
use crate::error::AuthError;
use crate::password;
use crate::session;
use crate::token::{JwtMaker, TokenMaker};

/// Input for registering a user.
#[derive(Debug, Clone)]
pub struct CreateUserInput {
    pub username: String,
    pub password: String,
    pub full_name: String,
    pub email: String,
    pub role: Role,
}

impl CreateUserInput {
    /// Field rules plus the configured password length policy.
    pub fn validate(&self, min_password_length: usize) -> Result<(), Vec<FieldError>> {
        Checks::new()
            .required("username", &self.username)
            .alphanumeric("username", &self.username)
            .required("password", &self.password)
            .min_chars("password", &self.password, min_password_length)
            .required("full_name", &self.full_name)
            .required("email", &self.email)
            .email("email", &self.email)
            .finish()
    }
}

/// Input for the login flow.
#[derive(Debug, Clone)]
pub struct LoginInput {
    pub username: String,
    pub password: String,
    pub user_agent: String,
    pub client_ip: String,
}

impl Validate for LoginInput {
    fn validate(&self) -> Result<(), Vec<FieldError>> {
        Checks::new()
            .required("username", &self.username)
            .required("password", &self.password)
            .required("user_agent", &self.user_agent)
            .required("client_ip", &self.client_ip)
            .finish()
    }
}

/// Successful login result.
#[derive(Debug, Clone, Serialize)]
pub struct LoginOutput {
    /// Equal to the id embedded in `refresh_token`.
    pub session_id: Uuid,
    pub access_token: String,
    pub access_token_expires_at: DateTime<Utc>,
    pub refresh_token: String,
    pub refresh_token_expires_at: DateTime<Utc>,
    pub user: UserView,
}

/// Input for access token renewal.
#[derive(Debug, Clone)]
pub struct RenewInput {
    pub refresh_token: String,
}

impl Validate for RenewInput {
    fn validate(&self) -> Result<(), Vec<FieldError>> {
        Checks::new()
            .required("refresh_token", &self.refresh_token)
            .finish()
    }
}

/// Successful renewal result. The refresh token is never rotated.
#[derive(Debug, Clone, Serialize)]
pub struct RenewOutput {
    pub access_token: String,
    pub access_token_expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct ChangePasswordInput {
    pub username: String,
    pub current_password: String,
    pub new_password: String,
}

impl ChangePasswordInput {
    pub fn validate(&self, min_password_length: usize) -> Result<(), Vec<FieldError>> {
        Checks::new()
            .required("username", &self.username)
            .required("current_password", &self.current_password)
            .required("new_password", &self.new_password)
            .min_chars("new_password", &self.new_password, min_password_length)
            .finish()
    }
}

/// Authentication service.
///
/// Generic over repository implementations so that the auth layer
/// has no dependency on the database crate, and over the token maker
/// so tests can swap signing.
pub struct AuthService<U: UserRepository, S: SessionRepository, M: TokenMaker = JwtMaker> {
    user_repo: U,
    session_repo: S,
    token_maker: M,
    config: AuthConfig,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl<U: UserRepository, S: SessionRepository> AuthService<U, S, JwtMaker> {
    /// Build a service signing with a [`JwtMaker`] keyed from `config`.
    pub fn new(user_repo: U, session_repo: S, config: AuthConfig) -> BankResult<Self> {
        let token_maker = JwtMaker::from_config(&config)?;
        Self::with_token_maker(user_repo, session_repo, token_maker, config)
    }
}

impl<U: UserRepository, S: SessionRepository, M: TokenMaker> AuthService<U, S, M> {
    /// Fails if either configured token lifetime is out of range.
    pub fn with_token_maker(
        user_repo: U,
        session_repo: S,
        token_maker: M,
        config: AuthConfig,
    ) -> BankResult<Self> {
        let access_ttl = config.access_token_ttl()?;
        let refresh_ttl = config.refresh_token_ttl()?;
        Ok(Self {
            user_repo,
            session_repo,
            token_maker,
            config,
            access_ttl,
            refresh_ttl,
        })
    }

    pub fn token_maker(&self) -> &M {
        &self.token_maker
    }

    /// Register a user. The verified flag always starts out false.
    pub async fn create_user(
        &self,
        ctx: &RequestContext,
        input: CreateUserInput,
    ) -> BankResult<User> {
        input
            .validate(self.config.min_password_length)
            .map_err(|errors| BankError::InvalidParams { errors })?;

        let hashed_password =
            password::hash_password(&input.password, self.config.pepper.as_deref())?;

        let user = ctx
            .run(self.user_repo.create(CreateUser {
                username: input.username,
                hashed_password,
                full_name: input.full_name,
                email: input.email,
                role: input.role,
            }))
            .await?;

        info!(username = %user.username, role = %user.role, "user created");
        Ok(user)
    }

    pub async fn get_user(&self, ctx: &RequestContext, username: &str) -> BankResult<User> {
        ctx.run(self.user_repo.get_by_username(username)).await
    }

    /// Authenticate with username + password and issue an
    /// access/refresh token pair bound to a new session.
    pub async fn login(&self, ctx: &RequestContext, input: LoginInput) -> BankResult<LoginOutput> {
        input.ensure_valid()?;

        // 1-2. Look up user and verify password. Both failures look the same.
        let user = self
            .authenticate(ctx, &input.username, &input.password)
            .await?;

        // 3. Issue both tokens.
        let (access_token, access_payload) = self.token_maker.create(
            &user.username,
            user.role,
            self.access_ttl,
        )?;
        let (refresh_token, refresh_payload) = self.token_maker.create(
            &user.username,
            user.role,
            self.refresh_ttl,
        )?;

        // 4. Persist the session under the refresh token's id. Nothing is
        //    returned unless this succeeds.
        let session = ctx
            .run(self.session_repo.create(CreateSession {
                id: refresh_payload.id,
                username: user.username.clone(),
                refresh_token: refresh_token.clone(),
                user_agent: input.user_agent,
                client_ip: input.client_ip,
                is_blocked: false,
                expires_at: refresh_payload.expires_at,
            }))
            .await?;

        info!(
            username = %user.username,
            session_id = %session.id,
            expires_at = %session.expires_at,
            "login succeeded"
        );

        Ok(LoginOutput {
            session_id: session.id,
            access_token,
            access_token_expires_at: access_payload.expires_at,
            refresh_token,
            refresh_token_expires_at: refresh_payload.expires_at,
            user: UserView::from(&user),
        })
    }

    /// Mint a new access token from a refresh token.
    ///
    /// The session row is only read; the refresh token keeps its
    /// original lifetime.
    pub async fn renew_access_token(
        &self,
        ctx: &RequestContext,
        input: RenewInput,
    ) -> BankResult<RenewOutput> {
        input.ensure_valid()?;

        // 1. Signature, shape, expiry.
        let payload = self
            .token_maker
            .verify(&input.refresh_token)
            .inspect_err(|e| warn!(error = %e, "refresh token failed verification"))?;

        // 2. The session is the source of truth; unknown means invalid.
        let session = ctx
            .run(self.session_repo.get_by_id(payload.id))
            .await
            .map_err(|e| match e {
                BankError::NotFound { .. } => {
                    warn!(session_id = %payload.id, "refresh token has no session");
                    AuthError::TokenInvalid("session not found".into()).into()
                }
                other => other,
            })?;

        // 3. Ordered session checks.
        if let Err(rejection) =
            session::check_session(&session, &payload, &input.refresh_token, Utc::now())
        {
            warn!(
                session_id = %session.id,
                username = %payload.username,
                reason = %rejection,
                "refresh token rejected"
            );
            return Err(AuthError::SessionRejected(rejection).into());
        }

        // 4. New access token only.
        let (access_token, access_payload) = self.token_maker.create(
            &payload.username,
            payload.role,
            self.access_ttl,
        )?;

        Ok(RenewOutput {
            access_token,
            access_token_expires_at: access_payload.expires_at,
        })
    }

    /// Replace a user's password after re-checking the current one.
    /// Existing sessions are left as they are.
    pub async fn change_password(
        &self,
        ctx: &RequestContext,
        input: ChangePasswordInput,
    ) -> BankResult<UserView> {
        input
            .validate(self.config.min_password_length)
            .map_err(|errors| BankError::InvalidParams { errors })?;

        let user = self
            .authenticate(ctx, &input.username, &input.current_password)
            .await?;

        let hashed_password =
            password::hash_password(&input.new_password, self.config.pepper.as_deref())?;
        let updated = ctx
            .run(self.user_repo.update_password(&user.username, hashed_password))
            .await?;

        info!(username = %updated.username, "password changed");
        Ok(UserView::from(updated))
    }

    /// Unknown user and wrong password both become
    /// [`BankError::InvalidCredentials`].
    async fn authenticate(
        &self,
        ctx: &RequestContext,
        username: &str,
        plaintext: &str,
    ) -> BankResult<User> {
        let user = match ctx.run(self.user_repo.get_by_username(username)).await {
            Ok(u) => u,
            Err(BankError::NotFound { .. }) => return Err(AuthError::InvalidCredentials.into()),
            Err(e) => return Err(e),
        };

        let valid = password::verify_password(
            plaintext,
            &user.hashed_password,
            self.config.pepper.as_deref(),
        )?;
        if !valid {
            return Err(AuthError::InvalidCredentials.into());
        }

        Ok(user)
    }
}
