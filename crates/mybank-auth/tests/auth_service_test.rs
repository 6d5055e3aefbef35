//! Integration tests for the authentication service.

use chrono::{Duration, Utc};
use mybank_auth::config::AuthConfig;
use mybank_auth::service::{
    AuthService, ChangePasswordInput, CreateUserInput, LoginInput, LoginOutput, RenewInput,
};
use mybank_auth::token::{JwtMaker, TokenMaker};
use mybank_core::context::RequestContext;
use mybank_core::error::{BankError, BankResult, ErrorClass};
use mybank_core::models::session::{CreateSession, Session};
use mybank_core::models::user::Role;
use mybank_core::repository::{SessionRepository, UserRepository};
use mybank_db::repository::{SurrealSessionRepository, SurrealUserRepository};
use surrealdb::Surreal;
use surrealdb::engine::local::{Db, Mem};
use uuid::Uuid;

const TEST_SECRET: &str = "0123456789abcdef0123456789abcdef-test";
const PASSWORD: &str = "hunter22";

type Service = AuthService<SurrealUserRepository<Db>, SurrealSessionRepository<Db>>;

fn test_config() -> AuthConfig {
    AuthConfig {
        token_secret: TEST_SECRET.into(),
        token_issuer: "mybank-test".into(),
        ..Default::default()
    }
}

/// Spin up an in-memory DB with one registered depositor, `alice`.
async fn setup() -> (Service, SurrealSessionRepository<Db>, SurrealUserRepository<Db>) {
    let (svc, sessions, users, _) = setup_with_db().await;
    (svc, sessions, users)
}

async fn setup_with_db() -> (
    Service,
    SurrealSessionRepository<Db>,
    SurrealUserRepository<Db>,
    Surreal<Db>,
) {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    mybank_db::run_migrations(&db).await.unwrap();

    let users = SurrealUserRepository::new(db.clone());
    let sessions = SurrealSessionRepository::new(db.clone());
    let svc = AuthService::new(users.clone(), sessions.clone(), test_config()).unwrap();

    svc.create_user(
        &RequestContext::background(),
        CreateUserInput {
            username: "alice".into(),
            password: PASSWORD.into(),
            full_name: "Alice Liddell".into(),
            email: "alice@example.com".into(),
            role: Role::Depositor,
        },
    )
    .await
    .unwrap();

    (svc, sessions, users, db)
}

async fn session_count(db: &Surreal<Db>) -> usize {
    let mut result = db.query("SELECT id FROM session").await.unwrap();
    let rows: Vec<surrealdb_types::Value> = result.take(0).unwrap();
    rows.len()
}

fn login_input(username: &str, password: &str) -> LoginInput {
    LoginInput {
        username: username.into(),
        password: password.into(),
        user_agent: "integration-test".into(),
        client_ip: "127.0.0.1".into(),
    }
}

async fn login(svc: &Service) -> LoginOutput {
    svc.login(&RequestContext::background(), login_input("alice", PASSWORD))
        .await
        .unwrap()
}

async fn renew(svc: &Service, refresh_token: &str) -> Result<String, BankError> {
    svc.renew_access_token(
        &RequestContext::background(),
        RenewInput {
            refresh_token: refresh_token.into(),
        },
    )
    .await
    .map(|out| out.access_token)
}

fn token_reason(err: BankError) -> String {
    match err {
        BankError::InvalidToken { reason } => reason,
        other => panic!("expected InvalidToken, got {other:?}"),
    }
}

// -----------------------------------------------------------------------
// Login
// -----------------------------------------------------------------------

#[tokio::test]
async fn login_issues_token_pair_bound_to_session() {
    let (svc, sessions, _) = setup().await;
    let before = Utc::now();

    let out = login(&svc).await;

    let refresh = svc.token_maker().verify(&out.refresh_token).unwrap();
    let access = svc.token_maker().verify(&out.access_token).unwrap();
    assert_eq!(out.session_id, refresh.id);
    assert_ne!(access.id, refresh.id);
    assert_eq!(access.username, "alice");
    assert_eq!(access.role, Role::Depositor);

    let tolerance = Duration::seconds(5);
    let access_expected = before + Duration::seconds(900);
    let refresh_expected = before + Duration::seconds(86_400);
    assert!((out.access_token_expires_at - access_expected).abs() < tolerance);
    assert!((out.refresh_token_expires_at - refresh_expected).abs() < tolerance);

    assert_eq!(out.user.username, "alice");
    assert_eq!(out.user.email, "alice@example.com");
    assert!(!out.user.is_email_verified);

    let session = sessions.get_by_id(out.session_id).await.unwrap();
    assert_eq!(session.username, "alice");
    assert_eq!(session.refresh_token, out.refresh_token);
    assert_eq!(session.user_agent, "integration-test");
    assert_eq!(session.client_ip, "127.0.0.1");
    assert!(!session.is_blocked);
    assert_eq!(session.expires_at, out.refresh_token_expires_at);
}

#[tokio::test]
async fn login_output_never_carries_the_hash() {
    let (svc, _, _) = setup().await;
    let out = login(&svc).await;

    let json = serde_json::to_string(&out).unwrap();
    assert!(!json.contains("hashed_password"));
    assert!(!json.contains("$argon2id$"));
}

#[tokio::test]
async fn wrong_password_and_unknown_user_look_the_same() {
    let (svc, _, _, db) = setup_with_db().await;
    let ctx = RequestContext::background();

    let wrong = svc
        .login(&ctx, login_input("alice", "not-the-password"))
        .await
        .unwrap_err();
    let unknown = svc
        .login(&ctx, login_input("nobody", PASSWORD))
        .await
        .unwrap_err();

    assert!(matches!(wrong, BankError::InvalidCredentials));
    assert!(matches!(unknown, BankError::InvalidCredentials));
    assert_eq!(wrong.to_body(), unknown.to_body());
    assert_eq!(session_count(&db).await, 0);

    login(&svc).await;
    assert_eq!(session_count(&db).await, 1);
}

#[tokio::test]
async fn login_with_missing_fields_is_invalid_params() {
    let (svc, _, _) = setup().await;
    let err = svc
        .login(
            &RequestContext::background(),
            LoginInput {
                username: "alice".into(),
                password: PASSWORD.into(),
                user_agent: String::new(),
                client_ip: String::new(),
            },
        )
        .await
        .unwrap_err();

    match err {
        BankError::InvalidParams { errors } => {
            let fields: Vec<_> = errors.iter().map(|e| e.field.as_str()).collect();
            assert_eq!(fields, ["user_agent", "client_ip"]);
        }
        other => panic!("expected InvalidParams, got {other:?}"),
    }
}

#[tokio::test]
async fn cancelled_login_creates_nothing() {
    let (svc, _, _, db) = setup_with_db().await;
    let ctx = RequestContext::background();
    ctx.cancel();

    let err = svc
        .login(&ctx, login_input("alice", PASSWORD))
        .await
        .unwrap_err();
    assert_eq!(err.class(), ErrorClass::Cancelled);
    assert_eq!(session_count(&db).await, 0);
}

/// Session store whose writes always fail.
struct UnavailableSessions;

impl SessionRepository for UnavailableSessions {
    async fn create(&self, _input: CreateSession) -> BankResult<Session> {
        Err(BankError::Database("session store unavailable".into()))
    }

    async fn get_by_id(&self, id: Uuid) -> BankResult<Session> {
        Err(BankError::NotFound {
            entity: "session".into(),
            id: id.to_string(),
        })
    }

    async fn set_blocked(&self, id: Uuid, _blocked: bool) -> BankResult<Session> {
        self.get_by_id(id).await
    }
}

#[tokio::test]
async fn login_returns_no_tokens_when_session_is_not_stored() {
    let (_, _, users) = setup().await;
    let svc = AuthService::new(users, UnavailableSessions, test_config()).unwrap();

    let err = svc
        .login(&RequestContext::background(), login_input("alice", PASSWORD))
        .await
        .unwrap_err();
    assert!(matches!(err, BankError::Database(_)), "got {err:?}");
    assert_eq!(err.class(), ErrorClass::Internal);
}

// -----------------------------------------------------------------------
// Renewal
// -----------------------------------------------------------------------

#[tokio::test]
async fn renewal_mints_access_token_and_leaves_session_alone() {
    let (svc, sessions, _) = setup().await;
    let out = login(&svc).await;
    let before = sessions.get_by_id(out.session_id).await.unwrap();

    let renewed = svc
        .renew_access_token(
            &RequestContext::background(),
            RenewInput {
                refresh_token: out.refresh_token.clone(),
            },
        )
        .await
        .unwrap();

    let payload = svc.token_maker().verify(&renewed.access_token).unwrap();
    assert_eq!(payload.username, "alice");
    assert_eq!(payload.expires_at, renewed.access_token_expires_at);
    assert_ne!(payload.id, out.session_id);

    let after = sessions.get_by_id(out.session_id).await.unwrap();
    assert_eq!(after, before);

    // The refresh token stays usable.
    renew(&svc, &out.refresh_token).await.unwrap();
}

#[tokio::test]
async fn tampered_refresh_token_is_rejected() {
    let (svc, _, _) = setup().await;
    let out = login(&svc).await;

    // Refresh header and claims with the access token's signature.
    let refresh: Vec<&str> = out.refresh_token.split('.').collect();
    let access: Vec<&str> = out.access_token.split('.').collect();
    let forged = format!("{}.{}.{}", refresh[0], refresh[1], access[2]);

    let err = renew(&svc, &forged).await.unwrap_err();
    assert_eq!(err.class(), ErrorClass::InvalidToken);
}

#[tokio::test]
async fn token_from_another_secret_is_rejected() {
    let (svc, _, _) = setup().await;
    let out = login(&svc).await;

    let other = JwtMaker::new(b"ffffffffffffffffffffffffffffffff", "mybank-test").unwrap();
    let (foreign, _) = other
        .create("alice", Role::Depositor, Duration::hours(1))
        .unwrap();
    assert_ne!(foreign, out.refresh_token);

    let err = renew(&svc, &foreign).await.unwrap_err();
    assert_eq!(err.class(), ErrorClass::InvalidToken);
}

#[tokio::test]
async fn expired_refresh_token_is_rejected() {
    let (svc, sessions, _) = setup().await;
    let (token, payload) = svc
        .token_maker()
        .create("alice", Role::Depositor, Duration::seconds(-60))
        .unwrap();
    sessions
        .create(CreateSession {
            id: payload.id,
            username: "alice".into(),
            refresh_token: token.clone(),
            user_agent: "integration-test".into(),
            client_ip: "127.0.0.1".into(),
            is_blocked: false,
            expires_at: Utc::now() + Duration::hours(1),
        })
        .await
        .unwrap();

    let reason = token_reason(renew(&svc, &token).await.unwrap_err());
    assert_eq!(reason, "token has expired");
}

#[tokio::test]
async fn token_without_session_is_rejected() {
    let (svc, _, _) = setup().await;
    let (token, _) = svc
        .token_maker()
        .create("alice", Role::Depositor, Duration::hours(1))
        .unwrap();

    let err = renew(&svc, &token).await.unwrap_err();
    assert_eq!(err.class(), ErrorClass::InvalidToken);
}

#[tokio::test]
async fn blocked_session_is_rejected() {
    let (svc, sessions, _) = setup().await;
    let out = login(&svc).await;
    sessions.set_blocked(out.session_id, true).await.unwrap();

    let reason = token_reason(renew(&svc, &out.refresh_token).await.unwrap_err());
    assert_eq!(reason, "session is blocked");

    sessions.set_blocked(out.session_id, false).await.unwrap();
    renew(&svc, &out.refresh_token).await.unwrap();
}

/// Store a session for a freshly signed alice token, shaped by `edit`.
async fn planted_session(
    svc: &Service,
    sessions: &SurrealSessionRepository<Db>,
    edit: impl FnOnce(&mut CreateSession),
) -> String {
    let (token, payload) = svc
        .token_maker()
        .create("alice", Role::Depositor, Duration::hours(1))
        .unwrap();
    let mut session = CreateSession {
        id: payload.id,
        username: "alice".into(),
        refresh_token: token.clone(),
        user_agent: "integration-test".into(),
        client_ip: "127.0.0.1".into(),
        is_blocked: false,
        expires_at: payload.expires_at,
    };
    edit(&mut session);
    sessions.create(session).await.unwrap();
    token
}

#[tokio::test]
async fn session_user_mismatch_is_rejected() {
    let (svc, sessions, _) = setup().await;
    let token = planted_session(&svc, &sessions, |s| s.username = "bob".into()).await;

    let reason = token_reason(renew(&svc, &token).await.unwrap_err());
    assert_eq!(reason, "session user mismatch");
}

#[tokio::test]
async fn session_token_mismatch_is_rejected() {
    let (svc, sessions, _) = setup().await;
    let token = planted_session(&svc, &sessions, |s| {
        s.refresh_token = "some.other.token".into();
    })
    .await;

    let reason = token_reason(renew(&svc, &token).await.unwrap_err());
    assert_eq!(reason, "session token mismatch");
}

#[tokio::test]
async fn expired_session_is_rejected() {
    let (svc, sessions, _) = setup().await;
    let token = planted_session(&svc, &sessions, |s| {
        s.expires_at = Utc::now() - Duration::minutes(1);
    })
    .await;

    let reason = token_reason(renew(&svc, &token).await.unwrap_err());
    assert_eq!(reason, "session expired");
}

#[tokio::test]
async fn blocked_is_reported_before_other_failures() {
    let (svc, sessions, _) = setup().await;
    let token = planted_session(&svc, &sessions, |s| {
        s.is_blocked = true;
        s.username = "bob".into();
        s.refresh_token = "some.other.token".into();
        s.expires_at = Utc::now() - Duration::minutes(1);
    })
    .await;

    let reason = token_reason(renew(&svc, &token).await.unwrap_err());
    assert_eq!(reason, "session is blocked");
}

#[tokio::test]
async fn empty_refresh_token_is_invalid_params() {
    let (svc, _, _) = setup().await;
    let err = renew(&svc, "").await.unwrap_err();
    assert_eq!(err.class(), ErrorClass::InvalidParams);
}

// -----------------------------------------------------------------------
// Users
// -----------------------------------------------------------------------

#[tokio::test]
async fn created_user_is_unverified_and_hashed() {
    let (svc, _, users) = setup().await;
    let user = svc
        .get_user(&RequestContext::background(), "alice")
        .await
        .unwrap();

    assert!(!user.is_email_verified);
    assert_ne!(user.hashed_password, PASSWORD);
    assert!(user.hashed_password.starts_with("$argon2id$"));

    let verified = users.mark_email_verified("alice").await.unwrap();
    assert!(verified.is_email_verified);
}

#[tokio::test]
async fn duplicate_username_is_already_exists() {
    let (svc, _, _) = setup().await;
    let err = svc
        .create_user(
            &RequestContext::background(),
            CreateUserInput {
                username: "alice".into(),
                password: PASSWORD.into(),
                full_name: "Another Alice".into(),
                email: "alice2@example.com".into(),
                role: Role::Depositor,
            },
        )
        .await
        .unwrap_err();
    assert_eq!(err.class(), ErrorClass::AlreadyExists);
}

#[tokio::test]
async fn invalid_registration_reports_every_field() {
    let (svc, _, _) = setup().await;
    let err = svc
        .create_user(
            &RequestContext::background(),
            CreateUserInput {
                username: "bad name!".into(),
                password: "abc".into(),
                full_name: "Bob".into(),
                email: "not-an-email".into(),
                role: Role::Banker,
            },
        )
        .await
        .unwrap_err();

    match err {
        BankError::InvalidParams { errors } => {
            let fields: Vec<_> = errors.iter().map(|e| e.field.as_str()).collect();
            assert_eq!(fields, ["username", "password", "email"]);
        }
        other => panic!("expected InvalidParams, got {other:?}"),
    }
}

#[tokio::test]
async fn change_password_swaps_credentials() {
    let (svc, _, _) = setup().await;
    let ctx = RequestContext::background();
    let old_session = login(&svc).await;

    let view = svc
        .change_password(
            &ctx,
            ChangePasswordInput {
                username: "alice".into(),
                current_password: PASSWORD.into(),
                new_password: "correct-horse".into(),
            },
        )
        .await
        .unwrap();
    assert_eq!(view.username, "alice");

    let err = svc
        .login(&ctx, login_input("alice", PASSWORD))
        .await
        .unwrap_err();
    assert!(matches!(err, BankError::InvalidCredentials));
    svc.login(&ctx, login_input("alice", "correct-horse"))
        .await
        .unwrap();

    // Sessions opened before the change keep working.
    renew(&svc, &old_session.refresh_token).await.unwrap();
}

#[tokio::test]
async fn change_password_requires_current_password() {
    let (svc, _, _) = setup().await;
    let err = svc
        .change_password(
            &RequestContext::background(),
            ChangePasswordInput {
                username: "alice".into(),
                current_password: "wrong-one".into(),
                new_password: "correct-horse".into(),
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, BankError::InvalidCredentials));
}

#[tokio::test]
async fn short_secret_is_refused_at_construction() {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();

    let config = AuthConfig {
        token_secret: "too-short".into(),
        ..test_config()
    };
    let result = AuthService::new(
        SurrealUserRepository::new(db.clone()),
        SurrealSessionRepository::new(db),
        config,
    );
    assert!(matches!(result, Err(BankError::Crypto(_))));
}

#[tokio::test]
async fn oversized_token_lifetime_is_refused_at_construction() {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();

    let config = AuthConfig {
        access_token_lifetime_secs: u64::MAX,
        ..test_config()
    };
    let result = AuthService::new(
        SurrealUserRepository::new(db.clone()),
        SurrealSessionRepository::new(db),
        config,
    );
    assert!(matches!(result, Err(BankError::Internal(_))));
}
