//! Reflective member access against obfuscated classes.
//!
//! Callers speak logical names; this module translates them through the
//! [`crate::mapping::MappingTable`], walks the runtime class chain for
//! declared members, selects overloads deterministically and dispatches to the
//! implementations bound on the [`crate::runtime::ClassRegistry`].
//!
//! Resolution results are cached per `(class, logical name, arity)` - see
//! [`ReflectiveInvoker`] for the dispatch pipeline and cache semantics.

mod invoker;
pub(crate) mod resolve;

pub use invoker::ReflectiveInvoker;
