//! Typed wrappers over target-object references.
//!
//! A [`CompositeInstance`] pairs one [`ObjectRef`] with the invoker, giving
//! adapter code a handle that speaks logical names only: `invoke`, `get` and
//! `set` translate through the loaded mappings and dispatch through the shared
//! resolution cache. The wrapper is cheap to clone and carries no state of its
//! own - equality and hashing are the wrapped object's reference identity, so
//! two wrappers around the same underlying object are interchangeable as map
//! keys.

use std::hash::{Hash, Hasher};
use std::sync::Arc;

use crate::reflect::ReflectiveInvoker;
use crate::runtime::{ObjectRef, Value};
use crate::Result;

/// A logical-name view of one live target object.
#[derive(Clone)]
pub struct CompositeInstance {
    object: ObjectRef,
    invoker: Arc<ReflectiveInvoker>,
}

impl CompositeInstance {
    /// Wrap an existing instance.
    #[must_use]
    pub fn wrap(object: ObjectRef, invoker: Arc<ReflectiveInvoker>) -> Self {
        CompositeInstance { object, invoker }
    }

    /// Instantiate a logical class and wrap the result.
    ///
    /// Fields start at their descriptor defaults; a declared constructor
    /// matching the arguments runs before the wrapper is returned.
    pub fn construct(
        logical_class: &str,
        args: &[Value],
        invoker: Arc<ReflectiveInvoker>,
    ) -> Result<Self> {
        let object = invoker.construct(logical_class, args)?;
        Ok(CompositeInstance { object, invoker })
    }

    /// The wrapped object reference.
    #[must_use]
    pub fn object(&self) -> &ObjectRef {
        &self.object
    }

    /// Invoke a logical method on the wrapped object.
    pub fn invoke(&self, logical_name: &str, args: &[Value]) -> Result<Value> {
        self.invoker.invoke(&self.object, logical_name, args)
    }

    /// Read a logical field of the wrapped object.
    pub fn get(&self, logical_name: &str) -> Result<Value> {
        self.invoker.get_field(&self.object, logical_name)
    }

    /// Write a logical field of the wrapped object.
    pub fn set(&self, logical_name: &str, value: Value) -> Result<()> {
        self.invoker.set_field(&self.object, logical_name, value)
    }
}

impl PartialEq for CompositeInstance {
    fn eq(&self, other: &Self) -> bool {
        self.object == other.object
    }
}

impl Eq for CompositeInstance {}

impl Hash for CompositeInstance {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.object.hash(state);
    }
}

impl std::fmt::Debug for CompositeInstance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "CompositeInstance({:?})", self.object)
    }
}
