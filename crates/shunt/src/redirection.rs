//! Reversible method redirection.
//!
//! A [`Redirection`] captures the first patch-window bytes of the original
//! method's native body and swaps them against an absolute jump to the
//! replacement's body. `start`/`stop` toggle which image is installed;
//! `invoke_original` briefly restores the original image, dispatches
//! through the host's normal invocation path, and re-installs the jump on
//! every exit path. Dropping the record stops it and releases its GC
//! roots.
//!
//! Nothing here is thread-safe: the byte copy spans several instructions
//! on every architecture, and a thread executing the method mid-swap
//! observes a torn entry. Quiesce the target first.

use std::fmt;
use std::sync::Arc;

use shunt_host::{HostRuntime, MethodDescriptor, Value};

use crate::arch::Arch;
use crate::error::{DetourError, DetourResult};
use crate::mem;
use crate::prepare;
use crate::resolve::MethodResolver;
use crate::roots;

/// A reversible patch redirecting one compiled method to another.
pub struct Redirection {
    host: Arc<dyn HostRuntime>,
    original: MethodDescriptor,
    replacement: MethodDescriptor,
    /// Where both byte images are written.
    entry: *mut u8,
    /// Snapshot of the original entry, taken before the first patch.
    saved: Vec<u8>,
    /// Absolute jump to the replacement's entry.
    jump: Vec<u8>,
    active: bool,
}

impl Redirection {
    /// Create a redirection from `original` to `replacement`, optionally
    /// arming it immediately.
    ///
    /// Both methods are forced through the JIT if needed and their entry
    /// addresses resolved afterwards; the original's page is made
    /// writable and its entry bytes captured for later restore. On
    /// success both descriptors are pinned in the process-wide root set
    /// until the record is dropped. A failure at any step leaves the
    /// process unchanged.
    pub fn create(
        resolver: &MethodResolver,
        original: MethodDescriptor,
        replacement: MethodDescriptor,
        start_immediately: bool,
    ) -> DetourResult<Redirection> {
        let arch = Arch::host()?;
        let patch_size = arch.patch_size();

        let original_entry = prepare::ensure_compiled(resolver, &original, arch)?;
        let replacement_entry = prepare::ensure_compiled(resolver, &replacement, arch)?;

        if original_entry == replacement_entry {
            return Err(DetourError::SelfRedirect);
        }
        // Closer than the patch window and the jump would overwrite its
        // own destination.
        if (original_entry as usize).abs_diff(replacement_entry as usize) <= patch_size {
            return Err(DetourError::BodiesTooClose(patch_size));
        }

        mem::allow_rw(original_entry, patch_size)?;

        let jump = arch.jmp_bytes(replacement_entry as usize);
        // Safety: allow_rw succeeded, so the span is readable.
        let saved = unsafe { mem::read_code(original_entry, patch_size) };

        let mut redirection = Redirection {
            host: Arc::clone(resolver.host()),
            original,
            replacement,
            entry: original_entry,
            saved,
            jump,
            active: false,
        };
        if start_immediately {
            redirection.start();
        }

        // Rooted last, so a failed construction leaves no residue.
        roots::root(original.id);
        roots::root(replacement.id);
        Ok(redirection)
    }

    /// Install the trampoline. Idempotent.
    pub fn start(&mut self) {
        if !self.active {
            // Safety: create made the span writable and `entry` stays
            // valid while the descriptors are rooted.
            unsafe { mem::write_code(self.entry, &self.jump) };
            self.active = true;
        }
    }

    /// Restore the original bytes. Idempotent.
    pub fn stop(&mut self) {
        if self.active {
            // Safety: as in `start`.
            unsafe { mem::write_code(self.entry, &self.saved) };
            self.active = false;
        }
    }

    /// Whether the trampoline is currently installed.
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// The original method's entry address - where the byte images are
    /// swapped.
    pub fn original_entry(&self) -> *const u8 {
        self.entry
    }

    /// Invoke the original method regardless of the redirection state.
    ///
    /// If the trampoline is installed it is lifted for the duration of the
    /// call and re-installed on every exit path, a throwing body included.
    /// Constructors invoked without a receiver go through construction
    /// dispatch. A throw from the body surfaces as
    /// [`DetourError::HostInvocation`] after the re-patch.
    pub fn invoke_original(
        &self,
        receiver: Option<Value>,
        args: &[Value],
    ) -> DetourResult<Value> {
        let _guard = ReentryGuard::lift(self);
        let outcome = if self.original.is_constructor() && receiver.is_none() {
            self.host.construct(self.original.id, args)
        } else {
            self.host.invoke(self.original.id, receiver, args)
        };
        outcome.map_err(DetourError::from)
    }

    /// Tear the redirection down: restore the original bytes and release
    /// the GC roots. Equivalent to dropping the record.
    pub fn dispose(self) {}
}

impl Drop for Redirection {
    fn drop(&mut self) {
        self.stop();
        roots::unroot(self.original.id);
        roots::unroot(self.replacement.id);
    }
}

impl fmt::Debug for Redirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Redirection")
            .field("original", &self.original)
            .field("replacement", &self.replacement)
            .field("entry", &self.entry)
            .field("active", &self.active)
            .finish()
    }
}

/// Scoped "unpatched" state for re-entering the original body.
///
/// Restores the original image on construction when the trampoline is
/// installed, and re-installs the trampoline on drop - which runs on every
/// exit path, unwinding included.
struct ReentryGuard<'a> {
    redirection: &'a Redirection,
    repatch: bool,
}

impl<'a> ReentryGuard<'a> {
    fn lift(redirection: &'a Redirection) -> ReentryGuard<'a> {
        let repatch = redirection.active;
        if repatch {
            // Safety: same span create validated and unlocked.
            unsafe { mem::write_code(redirection.entry, &redirection.saved) };
        }
        ReentryGuard { redirection, repatch }
    }
}

impl Drop for ReentryGuard<'_> {
    fn drop(&mut self) {
        if self.repatch {
            // Safety: as in `lift`.
            unsafe {
                mem::write_code(self.redirection.entry, &self.redirection.jump)
            };
        }
    }
}
