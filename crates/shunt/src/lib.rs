//! Shunt - runtime method detours for JIT-compiled managed code
//!
//! Shunt transparently redirects every invocation of one already-compiled
//! method to the native body of another, without touching call sites,
//! recompiling, or cooperating with the host runtime. It works by
//! overwriting the first few bytes of the original method's JIT-emitted
//! body with an architecture-specific absolute jump to the replacement's
//! body; the overwritten bytes are preserved so the redirection can be
//! reversed or the original re-entered at any time.
//!
//! The engine decomposes the way the problem does:
//! - **mem**: make a code page writable and swap byte sequences (`mem`)
//! - **arch**: absolute-jump encodings and precode stub recognition per
//!   architecture (`arch`)
//! - **resolve**: descriptor → native entry address (`resolve`)
//! - **prepare**: force a not-yet-compiled method through the JIT
//!   (`prepare`)
//! - **redirection**: the reversible patch object composing the rest
//!   (`redirection`), with its descriptors pinned in a process-wide root
//!   set (`roots`)
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use shunt::{MethodResolver, Redirection};
//!
//! let resolver = MethodResolver::new(Arc::new(my_runtime));
//! let mut detour = Redirection::create(&resolver, original, replacement, true)?;
//!
//! // every call to `original` now lands in `replacement`
//! let before = detour.invoke_original(None, &args)?; // still reachable
//! detour.stop();                                     // original restored
//! ```
//!
//! # Caveats
//!
//! The byte swap is not atomic at instruction granularity: quiesce the
//! targeted method (or accept transient crashes) before toggling a
//! redirection under load. Hosts that inline aggressively can bypass the
//! patched entry entirely; disable inlining on targets you intend to
//! redirect.

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod arch;
pub mod error;
pub mod mem;
pub mod prepare;
pub mod redirection;
pub mod resolve;
pub mod roots;

pub use arch::Arch;
pub use error::{DetourError, DetourResult};
pub use redirection::Redirection;
pub use resolve::MethodResolver;

// Re-export the host ABI so embedders need a single import.
pub use shunt_host as host;
