//! Extension points invoked by the request pipeline.

use std::fmt;

use crate::{BoxError, Request, Response};

/// Runs once per call, before any network activity.
///
/// Returning an error aborts the call with
/// [`RestError::PreSendHook`](crate::RestError::PreSendHook).
pub trait PrepareRequest: Send + Sync {
    fn prepare_request(&self, request: &mut Request) -> Result<(), BoxError>;
}

impl<F> PrepareRequest for F
where
    F: Fn(&mut Request) -> Result<(), BoxError> + Send + Sync,
{
    fn prepare_request(&self, request: &mut Request) -> Result<(), BoxError> {
        self(request)
    }
}

/// Runs after every round-trip that produced a response, including non-2xx.
///
/// Returning an error ends the call without retrying.
pub trait InspectResponse: Send + Sync {
    fn inspect_response(&self, response: &mut Response) -> Result<(), BoxError>;
}

impl<F> InspectResponse for F
where
    F: Fn(&mut Response) -> Result<(), BoxError> + Send + Sync,
{
    fn inspect_response(&self, response: &mut Response) -> Result<(), BoxError> {
        self(response)
    }
}

/// Receives one formatted line per attempt and per failure.
pub trait Logger: Send + Sync {
    fn log(&self, args: fmt::Arguments<'_>);
}

impl<F> Logger for F
where
    F: Fn(fmt::Arguments<'_>) + Send + Sync,
{
    fn log(&self, args: fmt::Arguments<'_>) {
        self(args)
    }
}

/// Forwards log lines to `tracing` at debug level.
#[cfg(feature = "tracing")]
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingLogger;

#[cfg(feature = "tracing")]
impl Logger for TracingLogger {
    fn log(&self, args: fmt::Arguments<'_>) {
        tracing::debug!(target: "restwire", "{}", args);
    }
}
