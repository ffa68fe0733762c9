//! Invocation error split.

/// Failure modes of the host's standard invocation path.
///
/// The engine treats the two variants very differently: a throw from inside
/// the invoked body is swallowed while forcing compilation and surfaced
/// unchanged from explicit re-entry, while a machinery failure always
/// propagates.
#[derive(Debug, thiserror::Error)]
pub enum InvokeError {
    /// The invoked body raised an exception; the payload is the host's
    /// rendering of it.
    #[error("Invoked method threw: {0}")]
    Thrown(String),

    /// The invocation machinery itself failed (bad receiver, argument
    /// marshalling, missing metadata).
    #[error("Invocation machinery failed: {0}")]
    Machinery(String),
}
