//! Method descriptors, kinds, and runtime handles.

/// Identifier the host runtime assigns to a method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MethodId(pub u64);

/// Identifier the host runtime assigns to a type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TypeId(pub u32);

/// How a method came to exist, which decides how its handle is reached and
/// how it is dispatched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MethodKind {
    /// Compiled from source; the handle is reachable through the
    /// descriptor's natural property.
    Regular,
    /// Emitted at runtime by an instruction builder; the handle is only
    /// reachable through non-public members that vary across runtime
    /// versions.
    Dynamic,
    /// A constructor body; invoked through construction dispatch when no
    /// receiver is supplied.
    Constructor,
}

/// An opaque handle identifying a method within the host runtime.
///
/// The engine assumes no structure beyond the id and the kind tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MethodDescriptor {
    /// The host-assigned method identifier.
    pub id: MethodId,
    /// The dispatch/resolution variant.
    pub kind: MethodKind,
}

impl MethodDescriptor {
    /// Descriptor for a method compiled from source.
    pub const fn regular(id: MethodId) -> MethodDescriptor {
        MethodDescriptor { id, kind: MethodKind::Regular }
    }

    /// Descriptor for a dynamically emitted method.
    pub const fn dynamic(id: MethodId) -> MethodDescriptor {
        MethodDescriptor { id, kind: MethodKind::Dynamic }
    }

    /// Descriptor for a constructor.
    pub const fn constructor(id: MethodId) -> MethodDescriptor {
        MethodDescriptor { id, kind: MethodKind::Constructor }
    }

    /// Whether the handle must be reached through the dynamic-method access
    /// paths.
    pub const fn is_dynamic(&self) -> bool {
        matches!(self.kind, MethodKind::Dynamic)
    }

    /// Whether invocation without a receiver goes through construction
    /// dispatch.
    pub const fn is_constructor(&self) -> bool {
        matches!(self.kind, MethodKind::Constructor)
    }
}

/// Token for the runtime's per-method JIT bookkeeping record.
///
/// This is what the function-pointer accessor consumes; dereferencing it
/// yields the entry PC of the method's native body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MethodHandle(pub u64);
