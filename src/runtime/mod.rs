//! The bridge's runtime object model.
//!
//! A Rust process cannot reflect over live objects inside a foreign binary, so the
//! bridge carries its own runtime view of the target's object graph, built from the
//! very classfiles the patch pipeline rewrites:
//!
//! - [`TypeDesc`] / [`MethodDesc`] - parsed JVM descriptors, the vocabulary every
//!   other layer speaks
//! - [`Value`] - dynamic values with a first-class primitive/boxed distinction
//! - [`RuntimeClass`] / [`ObjectRef`] - immutable class metadata and live instances
//! - [`ClassRegistry`] - lazy, define-once class resolution over the classpath,
//!   plus the host-bound method implementations
//! - [`compat`] - the single definition of assignability and coercion
//!
//! The registry resolves class bytes through the classpath, which is what makes a
//! patched classfile observably different here: a field or method added by the
//! pipeline shows up in the defined [`RuntimeClass`] like any original member.

pub mod compat;

mod class;
mod object;
mod registry;
mod ty;
mod value;

pub use class::{ClassAccess, MemberAccess, RuntimeClass, RuntimeField, RuntimeMethod};
pub use object::ObjectRef;
pub use registry::{ClassRegistry, NativeFn};
pub use ty::{MethodDesc, PrimitiveKind, TypeDesc};
pub use value::{ArrayValue, PrimValue, Value};
