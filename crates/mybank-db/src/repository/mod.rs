//! SurrealDB repository implementations.

mod account;
mod session;
mod user;

pub use account::SurrealAccountRepository;
pub use session::SurrealSessionRepository;
pub use user::SurrealUserRepository;
