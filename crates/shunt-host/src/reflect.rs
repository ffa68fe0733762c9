//! The reflective surface the detour engine drives.

use crate::descriptor::{MethodHandle, MethodId, TypeId};
use crate::error::InvokeError;
use crate::value::Value;

/// Parameter metadata consumed by dummy-argument synthesis.
#[derive(Debug, Clone)]
pub struct ParamInfo {
    /// The parameter's declared type.
    pub ty: TypeId,
    /// The declared default value, if the parameter has one.
    pub default: Option<Value>,
}

/// Method signature metadata consumed when synthesizing a forcing
/// invocation.
#[derive(Debug, Clone)]
pub struct MethodSignature {
    /// The type declaring the method (the receiver type for instance
    /// methods).
    pub declaring_type: TypeId,
    /// Whether the method dispatches without a receiver.
    pub is_static: bool,
    /// Declared parameters, in order.
    pub params: Vec<ParamInfo>,
}

/// Facts about a type that receiver synthesis needs.
#[derive(Debug, Clone, Copy, Default)]
pub struct TypeFacts {
    /// Value types get zero-initialized instances instead of constructed
    /// ones.
    pub is_value_type: bool,
    /// Abstract types cannot be instantiated at all.
    pub is_abstract: bool,
}

/// A resolved accessor for reading a dynamic method's runtime handle.
///
/// Built once by probing the runtime's non-public members and then reused
/// for every dynamic resolution.
pub type HandleAccessor = Box<dyn Fn(MethodId) -> Option<MethodHandle> + Send + Sync>;

/// The reflective operations a managed runtime implements so the detour
/// engine can drive it.
///
/// Three groups of operations:
///
/// - **handles and entry points**: [`method_handle`](Self::method_handle),
///   [`function_pointer`](Self::function_pointer), and the dynamic-method
///   probes for handles the regular property path cannot reach;
/// - **compilation**: [`prepare_method`](Self::prepare_method) when the
///   runtime offers a way to push a method through the JIT directly;
/// - **invocation and metadata**: the standard invocation path plus the
///   signature/type queries the engine uses to synthesize a forcing call
///   when no prepare facility exists.
///
/// Implementations must be cheap to call repeatedly; the engine does its own
/// memoisation only for the probed dynamic accessors.
pub trait HostRuntime: Send + Sync {
    /// The runtime handle behind a regular (or constructor) descriptor,
    /// reached through the descriptor's natural property.
    ///
    /// `None` means the runtime cannot produce a handle for this method.
    fn method_handle(&self, method: MethodId) -> Option<MethodHandle>;

    /// The entry PC behind a handle: the first byte the CPU executes when
    /// the method is called through normal dispatch.
    ///
    /// The returned address may change between a call made before the
    /// method is compiled and one made after.
    fn function_pointer(&self, handle: MethodHandle) -> *mut u8;

    /// Probe a non-public method of the runtime's dynamic-method
    /// implementation by name.
    ///
    /// The default is a runtime without dynamically emitted methods.
    fn probe_dynamic_method(&self, name: &str) -> Option<HandleAccessor> {
        let _ = name;
        None
    }

    /// Probe a non-public field of the runtime's dynamic-method
    /// implementation by name.
    fn probe_dynamic_field(&self, name: &str) -> Option<HandleAccessor> {
        let _ = name;
        None
    }

    /// Run a method through the JIT directly.
    ///
    /// `None` means the runtime has no such facility and the engine must
    /// force compilation by invoking the method; `Some(done)` is the
    /// facility's verdict.
    fn prepare_method(&self, handle: MethodHandle) -> Option<bool> {
        let _ = handle;
        None
    }

    /// Invoke a method through the runtime's standard invocation path.
    ///
    /// Instance methods receive `receiver`; static methods ignore it.
    fn invoke(
        &self,
        method: MethodId,
        receiver: Option<Value>,
        args: &[Value],
    ) -> Result<Value, InvokeError>;

    /// Run a constructor through construction dispatch, returning the new
    /// instance.
    fn construct(&self, ctor: MethodId, args: &[Value]) -> Result<Value, InvokeError>;

    /// Signature metadata for a method.
    fn method_signature(&self, method: MethodId) -> MethodSignature;

    /// Facts about a type.
    fn type_facts(&self, ty: TypeId) -> TypeFacts;

    /// The constructors a type declares, in no particular order.
    fn constructors(&self, ty: TypeId) -> Vec<MethodId>;

    /// A zero-initialized instance of a value type.
    fn zeroed_value(&self, ty: TypeId) -> Value;

    /// Allocate an instance without running any constructor.
    ///
    /// `None` when the runtime does not offer the primitive.
    fn uninitialized_object(&self, ty: TypeId) -> Option<Value> {
        let _ = ty;
        None
    }
}
