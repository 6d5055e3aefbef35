//! Explicit input validation.
//!
//! Inputs implement [`Validate`] by running a [`Checks`] builder over
//! their fields. Every failing rule is recorded, so a caller gets the
//! full list of `(field, reason)` pairs in one round trip.

use serde::Serialize;

use crate::error::{BankError, BankResult};

/// One failed validation rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub reason: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

pub trait Validate {
    fn validate(&self) -> Result<(), Vec<FieldError>>;

    /// Run [`validate`](Self::validate) and lift failures into
    /// [`BankError::InvalidParams`].
    fn ensure_valid(&self) -> BankResult<()> {
        self.validate()
            .map_err(|errors| BankError::InvalidParams { errors })
    }
}

/// Accumulates field errors.
///
/// Format rules are skipped for a field that already failed
/// `required`, so an empty value yields a single error.
#[derive(Debug, Default)]
pub struct Checks {
    errors: Vec<FieldError>,
}

impl Checks {
    pub fn new() -> Self {
        Self::default()
    }

    fn failed(&self, field: &str) -> bool {
        self.errors.iter().any(|e| e.field == field)
    }

    pub fn push(&mut self, field: &str, reason: impl Into<String>) -> &mut Self {
        self.errors.push(FieldError::new(field, reason));
        self
    }

    pub fn required(&mut self, field: &str, value: &str) -> &mut Self {
        if value.trim().is_empty() {
            self.push(field, "is required");
        }
        self
    }

    pub fn alphanumeric(&mut self, field: &str, value: &str) -> &mut Self {
        if !self.failed(field) && !value.chars().all(|c| c.is_ascii_alphanumeric()) {
            self.push(field, "must contain only letters and digits");
        }
        self
    }

    pub fn min_chars(&mut self, field: &str, value: &str, min: usize) -> &mut Self {
        if !self.failed(field) && value.chars().count() < min {
            self.push(field, format!("must be at least {min} characters"));
        }
        self
    }

    pub fn email(&mut self, field: &str, value: &str) -> &mut Self {
        if !self.failed(field) && !is_email(value) {
            self.push(field, "must be a valid email address");
        }
        self
    }

    pub fn range(&mut self, field: &str, value: u64, min: u64, max: u64) -> &mut Self {
        if value < min || value > max {
            self.push(field, format!("must be between {min} and {max}"));
        }
        self
    }

    pub fn finish(&mut self) -> Result<(), Vec<FieldError>> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(std::mem::take(&mut self.errors))
        }
    }
}

fn is_email(value: &str) -> bool {
    if value.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = value.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
}
