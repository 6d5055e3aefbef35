//! Per-request execution context: cancellation plus an optional
//! deadline.
//!
//! Services route every repository call through [`RequestContext::run`],
//! which drops the in-flight future as soon as the request is cancelled
//! or its deadline passes.

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::error::{BankError, BankResult};

#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    cancel: CancellationToken,
    deadline: Option<Instant>,
}

impl RequestContext {
    /// A context that is never cancelled and has no deadline.
    pub fn background() -> Self {
        Self::default()
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            cancel: CancellationToken::new(),
            deadline: Some(Instant::now() + timeout),
        }
    }

    /// Derive a context bound to an existing cancellation token, e.g.
    /// one owned by the connection or shutdown handler.
    pub fn with_token(cancel: CancellationToken) -> Self {
        Self {
            cancel,
            deadline: None,
        }
    }

    /// Replace the deadline, keeping the earlier of the two.
    pub fn deadline_at(mut self, deadline: Instant) -> Self {
        self.deadline = Some(match self.deadline {
            Some(existing) if existing < deadline => existing,
            _ => deadline,
        });
        self
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Fail fast if the context is already done.
    pub fn check(&self) -> BankResult<()> {
        if self.cancel.is_cancelled() {
            return Err(cancelled());
        }
        if self.deadline.is_some_and(|d| d <= Instant::now()) {
            return Err(deadline_exceeded());
        }
        Ok(())
    }

    /// Await `fut` unless the context is cancelled or its deadline
    /// passes first.
    pub async fn run<F, T>(&self, fut: F) -> BankResult<T>
    where
        F: Future<Output = BankResult<T>>,
    {
        self.check()?;

        let deadline = async {
            match self.deadline {
                Some(d) => tokio::time::sleep_until(d).await,
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(cancelled()),
            _ = deadline => Err(deadline_exceeded()),
            result = fut => result,
        }
    }
}

fn cancelled() -> BankError {
    BankError::Cancelled {
        reason: "cancelled".into(),
    }
}

fn deadline_exceeded() -> BankError {
    BankError::Cancelled {
        reason: "deadline exceeded".into(),
    }
}
