//! SurrealDB implementation of [`SessionRepository`].

use chrono::{DateTime, Utc};
use mybank_core::error::BankResult;
use mybank_core::models::session::{CreateSession, Session};
use mybank_core::repository::SessionRepository;
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use crate::error::DbError;

const ENTITY: &str = "session";

#[derive(Debug, SurrealValue)]
struct SessionRow {
    username: String,
    refresh_token: String,
    user_agent: String,
    client_ip: String,
    is_blocked: bool,
    expires_at: DateTime<Utc>,
    created_at: DateTime<Utc>,
}

impl SessionRow {
    fn into_session(self, id: Uuid) -> Session {
        Session {
            id,
            username: self.username,
            refresh_token: self.refresh_token,
            user_agent: self.user_agent,
            client_ip: self.client_ip,
            is_blocked: self.is_blocked,
            expires_at: self.expires_at,
            created_at: self.created_at,
        }
    }
}

fn single(rows: Vec<SessionRow>, id: Uuid) -> Result<Session, DbError> {
    rows.into_iter()
        .next()
        .map(|row| row.into_session(id))
        .ok_or_else(|| DbError::NotFound {
            entity: ENTITY.into(),
            id: id.to_string(),
        })
}

/// SurrealDB implementation of the Session repository.
#[derive(Clone)]
pub struct SurrealSessionRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealSessionRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> SessionRepository for SurrealSessionRepository<C> {
    async fn create(&self, input: CreateSession) -> BankResult<Session> {
        let id = input.id;

        let mut result = self
            .db
            .query(
                "CREATE type::record('session', $id) SET \
                 username = $username, \
                 refresh_token = $refresh_token, \
                 user_agent = $user_agent, \
                 client_ip = $client_ip, \
                 is_blocked = $is_blocked, \
                 expires_at = $expires_at",
            )
            .bind(("id", id.to_string()))
            .bind(("username", input.username))
            .bind(("refresh_token", input.refresh_token))
            .bind(("user_agent", input.user_agent))
            .bind(("client_ip", input.client_ip))
            .bind(("is_blocked", input.is_blocked))
            .bind(("expires_at", input.expires_at))
            .await
            .and_then(|r| r.check())
            .map_err(|e| DbError::from_write(ENTITY, e))?;

        let rows: Vec<SessionRow> = result.take(0).map_err(DbError::from)?;
        Ok(single(rows, id)?)
    }

    async fn get_by_id(&self, id: Uuid) -> BankResult<Session> {
        let mut result = self
            .db
            .query("SELECT * FROM type::record('session', $id)")
            .bind(("id", id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<SessionRow> = result.take(0).map_err(DbError::from)?;
        Ok(single(rows, id)?)
    }

    async fn set_blocked(&self, id: Uuid, blocked: bool) -> BankResult<Session> {
        let mut result = self
            .db
            .query("UPDATE type::record('session', $id) SET is_blocked = $blocked")
            .bind(("id", id.to_string()))
            .bind(("blocked", blocked))
            .await
            .and_then(|r| r.check())
            .map_err(DbError::from)?;

        let rows: Vec<SessionRow> = result.take(0).map_err(DbError::from)?;
        Ok(single(rows, id)?)
    }
}
