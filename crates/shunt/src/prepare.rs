//! Forcing methods through the JIT.
//!
//! A method entry still holding a precode stub cannot be patched; the body
//! the stub will eventually point at does not exist yet. When the host
//! offers a prepare facility the method is pushed through the JIT
//! directly; otherwise compilation is forced the only other way there is:
//! by invoking the method once with synthesized arguments. The invocation
//! is allowed to throw - the goal is compilation, not a correct call.

use shunt_host::{
    HostRuntime, InvokeError, MethodDescriptor, MethodId, MethodKind, MethodSignature, ParamInfo,
    TypeId, Value,
};

use crate::arch::{precode, Arch};
use crate::error::{DetourError, DetourResult};
use crate::resolve::MethodResolver;

/// Resolve `method` to a compiled entry address, forcing the JIT when the
/// entry still holds a stub.
///
/// The address is re-resolved after preparation because compilation moves
/// it. Fails with [`DetourError::NotJitted`] when the method cannot be
/// forced through the JIT.
pub fn ensure_compiled(
    resolver: &MethodResolver,
    method: &MethodDescriptor,
    arch: Arch,
) -> DetourResult<*mut u8> {
    let entry = resolver.entry_address(method)?;
    // Safety: the host handed out `entry` as a method entry; the runtime
    // keeps at least a stub's worth of bytes readable there.
    if unsafe { precode::is_compiled(entry, arch) } {
        return Ok(entry);
    }

    if !try_prepare(resolver, method)? {
        return Err(DetourError::NotJitted);
    }

    let entry = resolver.entry_address(method)?;
    // Safety: as above.
    if unsafe { precode::is_compiled(entry, arch) } {
        Ok(entry)
    } else {
        Err(DetourError::NotJitted)
    }
}

/// Force the JIT to produce native code for `method`.
///
/// Returns `Ok(false)` only when the method needs a receiver and every
/// construction candidate was exhausted. Throws from the invoked body are
/// swallowed; failures of the invocation machinery propagate.
pub fn try_prepare(resolver: &MethodResolver, method: &MethodDescriptor) -> DetourResult<bool> {
    let host = resolver.host();

    if let Ok(handle) = resolver.method_handle(method) {
        if let Some(done) = host.prepare_method(handle) {
            return Ok(done);
        }
    }

    invoke_with_dummies(host.as_ref(), method)
}

fn invoke_with_dummies(host: &dyn HostRuntime, method: &MethodDescriptor) -> DetourResult<bool> {
    let sig = host.method_signature(method.id);
    let args: Vec<Value> = sig.params.iter().map(|p| dummy_argument(host, p)).collect();

    let outcome = if method.kind == MethodKind::Constructor {
        host.construct(method.id, &args)
    } else if sig.is_static {
        host.invoke(method.id, None, &args)
    } else {
        let receiver = match synthesize_receiver(host, sig.declaring_type) {
            Some(receiver) => receiver,
            None => return Ok(false),
        };
        host.invoke(method.id, Some(receiver), &args)
    };

    match outcome {
        Ok(_) => Ok(true),
        // The body ran far enough to throw; compilation happened on the
        // way in.
        Err(InvokeError::Thrown(_)) => Ok(true),
        Err(err @ InvokeError::Machinery(_)) => Err(DetourError::HostInvocation(err)),
    }
}

/// A dummy value for one parameter: the declared default, a zeroed value
/// type, or the null reference.
fn dummy_argument(host: &dyn HostRuntime, param: &ParamInfo) -> Value {
    if let Some(default) = param.default {
        return default;
    }
    if host.type_facts(param.ty).is_value_type {
        return host.zeroed_value(param.ty);
    }
    Value::NULL
}

/// Obtain an instance of `ty` to invoke a non-static method on, or `None`
/// when every candidate is exhausted.
fn synthesize_receiver(host: &dyn HostRuntime, ty: TypeId) -> Option<Value> {
    let facts = host.type_facts(ty);
    if facts.is_value_type {
        return Some(host.zeroed_value(ty));
    }
    if facts.is_abstract {
        return None;
    }
    if let Some(instance) = host.uninitialized_object(ty) {
        return Some(instance);
    }

    // Parameterless constructor first, then ascending arity; a candidate
    // that fails for any reason just moves on to the next.
    let mut ctors: Vec<(MethodId, MethodSignature)> = host
        .constructors(ty)
        .into_iter()
        .map(|id| (id, host.method_signature(id)))
        .collect();
    ctors.sort_by_key(|(_, sig)| sig.params.len());

    for (id, sig) in ctors {
        let args: Vec<Value> = sig.params.iter().map(|p| dummy_argument(host, p)).collect();
        if let Ok(instance) = host.construct(id, &args) {
            return Some(instance);
        }
    }
    None
}
