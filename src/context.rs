use std::{future::Future, time::Duration};

use tokio::time::{sleep_until, Instant};
use tokio_util::sync::CancellationToken;

use crate::{RestError, Result};

/// Deadline and cancellation signal threaded through every attempt of a call.
///
/// When a call is made without a context, the client derives one whose
/// deadline is the configured timeout from now.
#[derive(Clone, Debug, Default)]
pub struct RequestContext {
    deadline: Option<Instant>,
    cancel: Option<CancellationToken>,
}

impl RequestContext {
    /// A context with neither deadline nor cancellation.
    pub fn new() -> Self {
        Self::default()
    }

    /// A context that expires `timeout` from now.
    pub fn with_timeout(timeout: Duration) -> Self {
        match Instant::now().checked_add(timeout) {
            Some(deadline) => Self::new().deadline(deadline),
            None => Self::new(),
        }
    }

    /// Sets an absolute deadline for the whole call, retries included.
    pub fn deadline(mut self, deadline: impl Into<Instant>) -> Self {
        self.deadline = Some(deadline.into());
        self
    }

    /// Attaches a cancellation token; cancelling it stops the call.
    pub fn cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub fn deadline_at(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .is_some_and(CancellationToken::is_cancelled)
    }

    /// Time left before the deadline; zero once it has passed.
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|deadline| deadline.saturating_duration_since(Instant::now()))
    }

    /// Fails fast if the context is already cancelled or expired.
    pub(crate) fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            return Err(RestError::Cancelled);
        }
        if self.remaining().is_some_and(|left| left.is_zero()) {
            return Err(RestError::DeadlineExceeded);
        }
        Ok(())
    }

    /// Drives `fut` to completion unless the context is cancelled or its
    /// deadline passes first.
    pub(crate) async fn run<F: Future>(&self, fut: F) -> Result<F::Output> {
        let cancelled = async {
            match &self.cancel {
                Some(token) => token.cancelled().await,
                None => std::future::pending::<()>().await,
            }
        };
        let expired = async {
            match self.deadline {
                Some(deadline) => sleep_until(deadline).await,
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            biased;
            _ = cancelled => Err(RestError::Cancelled),
            _ = expired => Err(RestError::DeadlineExceeded),
            output = fut => Ok(output),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio_util::sync::CancellationToken;

    use super::RequestContext;
    use crate::RestError;

    #[test]
    fn empty_context_never_fails_check() {
        let ctx = RequestContext::new();
        assert!(ctx.check().is_ok());
        assert_eq!(ctx.remaining(), None);
    }

    #[test]
    fn cancelled_token_fails_check() {
        let token = CancellationToken::new();
        token.cancel();
        let ctx = RequestContext::new().cancellation(token);
        assert!(matches!(ctx.check(), Err(RestError::Cancelled)));
    }

    #[tokio::test(start_paused = true)]
    async fn run_stops_at_deadline() {
        let ctx = RequestContext::with_timeout(Duration::from_millis(50));
        let result = ctx
            .run(tokio::time::sleep(Duration::from_secs(10)))
            .await;
        assert!(matches!(result, Err(RestError::DeadlineExceeded)));
        assert!(matches!(ctx.check(), Err(RestError::DeadlineExceeded)));
    }

    #[tokio::test]
    async fn run_returns_output_when_future_wins() {
        let ctx = RequestContext::with_timeout(Duration::from_secs(5));
        let value = ctx.run(async { 7 }).await.expect("future must finish first");
        assert_eq!(value, 7);
    }

    #[tokio::test]
    async fn run_observes_cancellation() {
        let token = CancellationToken::new();
        let ctx = RequestContext::new().cancellation(token.clone());
        let child = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(5)).await;
            child.cancel();
        });
        let result = ctx.run(std::future::pending::<()>()).await;
        assert!(matches!(result, Err(RestError::Cancelled)));
    }
}
