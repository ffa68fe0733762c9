//! Shunt host ABI - the surface a managed runtime exposes to the detour engine
//!
//! This crate provides the minimal types and traits a JIT-compiling managed
//! runtime implements so that `shunt` can detour its methods, without
//! depending on the engine itself:
//!
//! - **Values**: an opaque 64-bit slot that crosses the host boundary
//!   (`value` module)
//! - **Descriptors**: method identifiers, kinds, and runtime handles
//!   (`descriptor` module)
//! - **Reflection**: the [`HostRuntime`] trait covering handle lookup,
//!   function-pointer access, JIT preparation, invocation, and the metadata
//!   queries needed to synthesize forcing calls (`reflect` module)
//!
//! The engine never interprets values or handles; it only moves them between
//! the host's accessors.

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

mod descriptor;
mod error;
mod reflect;
mod value;

pub use descriptor::{MethodDescriptor, MethodHandle, MethodId, MethodKind, TypeId};
pub use error::InvokeError;
pub use reflect::{HandleAccessor, HostRuntime, MethodSignature, ParamInfo, TypeFacts};
pub use value::Value;
