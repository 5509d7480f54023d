//! Execution context for cache calls
//!
//! A [`Context`] carries a cancellation token and an optional deadline. The
//! adapter never sets a timeout of its own; it hands the caller's context to
//! the backend, which races each command against it.

use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::{CacheError, Result};

/// Cancellation and deadline for a single call (or a group of calls)
#[derive(Debug, Clone)]
pub struct Context {
    token: CancellationToken,
    deadline: Option<Instant>,
}

impl Context {
    /// Root context: never cancelled unless [`Context::cancel`] is called, no deadline
    pub fn background() -> Self {
        Self {
            token: CancellationToken::new(),
            deadline: None,
        }
    }

    /// Bound this context by a timeout measured from now
    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    /// Bound this context by an absolute deadline.
    ///
    /// An earlier deadline already present is kept.
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(match self.deadline {
            Some(current) if current <= deadline => current,
            _ => deadline,
        });
        self
    }

    /// Derive a context that is cancelled with this one but can be cancelled
    /// on its own without affecting the parent
    pub fn child(&self) -> Self {
        Self {
            token: self.token.child_token(),
            deadline: self.deadline,
        }
    }

    /// Cancel this context and every child derived from it
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Time left before the deadline, `None` when unbounded
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|deadline| deadline.saturating_duration_since(Instant::now()))
    }

    /// Underlying cancellation token
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    /// The error this context would fail a call with right now, if any
    pub fn err(&self) -> Option<CacheError> {
        if self.is_cancelled() {
            return Some(canceled());
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Some(deadline_exceeded()),
            _ => None,
        }
    }

    /// Drive `fut` to completion unless the context is cancelled or its
    /// deadline passes first. A context that is already done never polls `fut`.
    pub async fn run<F, T>(&self, fut: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        if let Some(err) = self.err() {
            return Err(err);
        }

        match self.deadline {
            Some(deadline) => tokio::select! {
                biased;
                _ = self.token.cancelled() => Err(canceled()),
                _ = tokio::time::sleep_until(deadline) => Err(deadline_exceeded()),
                result = fut => result,
            },
            None => tokio::select! {
                biased;
                _ = self.token.cancelled() => Err(canceled()),
                result = fut => result,
            },
        }
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::background()
    }
}

fn canceled() -> CacheError {
    CacheError::Backend("context canceled".to_string())
}

fn deadline_exceeded() -> CacheError {
    CacheError::Backend("context deadline exceeded".to_string())
}
