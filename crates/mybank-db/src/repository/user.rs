//! SurrealDB implementation of [`UserRepository`].
//!
//! Users are keyed by username (`user:<username>`). Passwords arrive
//! already hashed; this layer never sees plaintext.

use chrono::{DateTime, Utc};
use mybank_core::error::BankResult;
use mybank_core::models::user::{CreateUser, Role, User};
use mybank_core::repository::UserRepository;
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;

use crate::error::DbError;

const ENTITY: &str = "user";

#[derive(Debug, SurrealValue)]
struct UserRow {
    username: String,
    hashed_password: String,
    full_name: String,
    email: String,
    role: String,
    is_email_verified: bool,
    password_changed_at: DateTime<Utc>,
    created_at: DateTime<Utc>,
}

impl UserRow {
    fn try_into_user(self) -> Result<User, DbError> {
        let role = self.role.parse::<Role>().map_err(|e| DbError::decode(ENTITY, e))?;
        Ok(User {
            username: self.username,
            hashed_password: self.hashed_password,
            full_name: self.full_name,
            email: self.email,
            role,
            is_email_verified: self.is_email_verified,
            password_changed_at: self.password_changed_at,
            created_at: self.created_at,
        })
    }
}

fn single(rows: Vec<UserRow>, username: &str) -> Result<User, DbError> {
    rows.into_iter()
        .next()
        .ok_or_else(|| DbError::NotFound {
            entity: ENTITY.into(),
            id: username.to_string(),
        })?
        .try_into_user()
}

/// SurrealDB implementation of the User repository.
#[derive(Clone)]
pub struct SurrealUserRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealUserRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> UserRepository for SurrealUserRepository<C> {
    async fn create(&self, input: CreateUser) -> BankResult<User> {
        let username = input.username.clone();

        let mut result = self
            .db
            .query(
                "CREATE type::record('user', $username) SET \
                 username = $username, \
                 hashed_password = $hashed_password, \
                 full_name = $full_name, \
                 email = $email, \
                 role = $role, \
                 is_email_verified = false",
            )
            .bind(("username", input.username))
            .bind(("hashed_password", input.hashed_password))
            .bind(("full_name", input.full_name))
            .bind(("email", input.email))
            .bind(("role", input.role.as_str().to_string()))
            .await
            .and_then(|r| r.check())
            .map_err(|e| DbError::from_write(ENTITY, e))?;

        let rows: Vec<UserRow> = result.take(0).map_err(DbError::from)?;
        Ok(single(rows, &username)?)
    }

    async fn get_by_username(&self, username: &str) -> BankResult<User> {
        let mut result = self
            .db
            .query("SELECT * FROM type::record('user', $username)")
            .bind(("username", username.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<UserRow> = result.take(0).map_err(DbError::from)?;
        Ok(single(rows, username)?)
    }

    async fn update_password(&self, username: &str, hashed_password: String) -> BankResult<User> {
        let mut result = self
            .db
            .query(
                "UPDATE type::record('user', $username) SET \
                 hashed_password = $hashed_password, \
                 password_changed_at = time::now()",
            )
            .bind(("username", username.to_string()))
            .bind(("hashed_password", hashed_password))
            .await
            .and_then(|r| r.check())
            .map_err(DbError::from)?;

        let rows: Vec<UserRow> = result.take(0).map_err(DbError::from)?;
        Ok(single(rows, username)?)
    }

    async fn mark_email_verified(&self, username: &str) -> BankResult<User> {
        let mut result = self
            .db
            .query("UPDATE type::record('user', $username) SET is_email_verified = true")
            .bind(("username", username.to_string()))
            .await
            .and_then(|r| r.check())
            .map_err(DbError::from)?;

        let rows: Vec<UserRow> = result.take(0).map_err(DbError::from)?;
        Ok(single(rows, username)?)
    }
}
