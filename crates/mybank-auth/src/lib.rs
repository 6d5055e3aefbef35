//! MyBank Auth: Argon2id password handling, signed token issuance and
//! verification, and the login / access-token renewal flows.

pub mod config;
pub mod error;
pub mod password;
pub mod service;
pub mod session;
pub mod token;

pub use config::AuthConfig;
pub use error::AuthError;
pub use service::{
    AuthService, ChangePasswordInput, CreateUserInput, LoginInput, LoginOutput, RenewInput,
    RenewOutput,
};
pub use session::SessionRejection;
pub use token::{JwtMaker, Payload, TokenMaker};
