//! Method-address resolution.
//!
//! Regular descriptors yield their runtime handle through the descriptor's
//! natural property; dereferencing the handle's function-pointer accessor
//! gives the entry PC. Dynamically emitted methods hide their handle behind
//! non-public members whose names have varied across runtime versions, so
//! the resolver probes the known access paths once and memoises whichever
//! accessor the running host actually has.

use std::sync::{Arc, OnceLock};

use shunt_host::{HandleAccessor, HostRuntime, MethodDescriptor, MethodHandle, MethodKind};

use crate::error::{DetourError, DetourResult};

/// The non-public descriptor-returning method probed first.
const DESCRIPTOR_METHOD: &str = "GetMethodDescriptor";

/// Handle field names the runtime has used across versions, probed in
/// order when the method is absent.
const HANDLE_FIELDS: [&str; 3] = ["m_methodHandle", "mhandle", "m_method"];

/// Resolves method descriptors to native entry addresses.
///
/// Cheap to share; create one per host runtime and pass it to every
/// [`Redirection::create`](crate::Redirection::create).
pub struct MethodResolver {
    host: Arc<dyn HostRuntime>,
    dynamic_access: OnceLock<HandleAccessor>,
}

impl MethodResolver {
    /// Wrap a host runtime.
    pub fn new(host: Arc<dyn HostRuntime>) -> MethodResolver {
        MethodResolver {
            host,
            dynamic_access: OnceLock::new(),
        }
    }

    /// The embedded host runtime.
    pub fn host(&self) -> &Arc<dyn HostRuntime> {
        &self.host
    }

    /// The runtime handle behind `method`.
    pub fn method_handle(&self, method: &MethodDescriptor) -> DetourResult<MethodHandle> {
        match method.kind {
            MethodKind::Dynamic => {
                let access = self.dynamic_access()?;
                access(method.id).ok_or(DetourError::ResolverUnavailable)
            }
            MethodKind::Regular | MethodKind::Constructor => self
                .host
                .method_handle(method.id)
                .ok_or(DetourError::ResolverUnavailable),
        }
    }

    /// The address of the first byte the CPU executes when `method` is
    /// called.
    ///
    /// The value is only stable once the method has been compiled; callers
    /// re-resolve after forcing the JIT.
    pub fn entry_address(&self, method: &MethodDescriptor) -> DetourResult<*mut u8> {
        let handle = self.method_handle(method)?;
        Ok(self.host.function_pointer(handle))
    }

    /// The memoised dynamic-handle accessor, probing on first use.
    fn dynamic_access(&self) -> DetourResult<&HandleAccessor> {
        if let Some(access) = self.dynamic_access.get() {
            return Ok(access);
        }
        let access = self.probe_dynamic_access()?;
        // A racing resolver may have won the probe; either way one
        // accessor survives.
        Ok(self.dynamic_access.get_or_init(|| access))
    }

    fn probe_dynamic_access(&self) -> DetourResult<HandleAccessor> {
        if let Some(access) = self.host.probe_dynamic_method(DESCRIPTOR_METHOD) {
            return Ok(access);
        }
        for field in HANDLE_FIELDS {
            if let Some(access) = self.host.probe_dynamic_field(field) {
                return Ok(access);
            }
        }
        Err(DetourError::ResolverUnavailable)
    }
}
