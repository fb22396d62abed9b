use thiserror::Error;

/// Errors surfaced to application code.
///
/// Protocol-level failures (malformed requests, decode failures, transport
/// write failures) are handled inside the connection and never reach handlers;
/// this enum only covers the cases a handler or registration call can see.
#[derive(Debug, Error)]
pub enum Error {
    /// A required request argument was absent and no default was supplied.
    #[error("missing argument: {0}")]
    MissingArgument(String),

    /// A route pattern failed to compile.
    #[error("invalid route pattern {pattern:?}: {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },
}
