//! MyBank Core: domain models, repository traits, error taxonomy,
//! request context, and input validation shared by every crate.

pub mod context;
pub mod error;
pub mod models;
pub mod repository;
pub mod validation;

pub use context::RequestContext;
pub use error::{BankError, BankResult, ErrorBody, ErrorClass};
pub use validation::{FieldError, Validate};
