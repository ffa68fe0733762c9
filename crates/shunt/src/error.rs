//! Detour error taxonomy.

use shunt_host::InvokeError;

/// Errors surfaced by redirection construction and use.
///
/// All errors propagate to the calling frame; nothing is logged or retried
/// internally. Construction failures leave the process unchanged.
#[derive(Debug, thiserror::Error)]
pub enum DetourError {
    /// Original and replacement resolve to the same entry point.
    #[error("Original and replacement share one entry point")]
    SelfRedirect,

    /// The two entries are within the patch window of each other; writing
    /// the trampoline would clobber its own destination.
    #[error("Method bodies are within {0} bytes of each other")]
    BodiesTooClose(usize),

    /// A method could not be forced through the JIT.
    #[error("Method could not be forced through the JIT")]
    NotJitted,

    /// The current CPU is not one the trampoline builder or the precode
    /// classifier recognises.
    #[error("Unsupported architecture: {0}")]
    UnsupportedArchitecture(&'static str),

    /// The page-protection change failed; carries the OS error code.
    #[error("Memory protection change failed (os error {0})")]
    MemoryProtect(i32),

    /// None of the known reflective access paths succeeded for this
    /// runtime version.
    #[error("No known reflective access path for this runtime")]
    ResolverUnavailable,

    /// The host's invocation path failed, or an explicitly invoked body
    /// threw; surfaced unchanged.
    #[error(transparent)]
    HostInvocation(#[from] InvokeError),
}

/// Result alias for detour operations.
pub type DetourResult<T> = Result<T, DetourError>;
