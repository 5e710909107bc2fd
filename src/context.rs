//! Cancellation and deadline handling shared by every remote and subprocess call.

use std::{future::Future, time::Duration};

use anyhow::Result;
use thiserror::Error;
use tokio::time::{self, Instant};
use tokio_util::sync::CancellationToken;

/// Why an operation stopped before it completed.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum Interrupted {
    #[error("operation was cancelled")]
    Cancelled,
    #[error("deadline exceeded")]
    DeadlineExceeded,
}

/// A cancellable, optionally deadline-bounded scope for one pipeline run.
///
/// The context is passed by reference to each operation instead of being
/// stored inside clients, so every call site shows which scope bounds it.
#[derive(Clone, Debug, Default)]
pub struct Context {
    cancel: CancellationToken,
    deadline: Option<Instant>,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bounds every operation run in this context to finish within `timeout` from now.
    ///
    /// A timeout too large to represent as an instant leaves the context
    /// without a deadline.
    pub fn with_timeout(self, timeout: Duration) -> Self {
        Self {
            deadline: Instant::now().checked_add(timeout),
            ..self
        }
    }

    /// Token that cancels this context when triggered.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Drives `operation` to completion unless the context is cancelled or
    /// its deadline passes first, in which case the future is dropped.
    pub async fn run<T, E, F>(&self, operation: F) -> Result<T>
    where
        F: Future<Output = std::result::Result<T, E>>,
        E: Into<anyhow::Error>,
    {
        let bounded = async {
            match self.deadline {
                Some(deadline) => time::timeout_at(deadline, operation)
                    .await
                    .map_err(|_| Interrupted::DeadlineExceeded),
                None => Ok(operation.await),
            }
        };

        let outcome = tokio::select! {
            biased;
            () = self.cancel.cancelled() => return Err(Interrupted::Cancelled.into()),
            outcome = bounded => outcome,
        };

        outcome?.map_err(Into::<anyhow::Error>::into)
    }
}
