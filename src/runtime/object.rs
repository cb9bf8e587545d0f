//! Target-object references.
//!
//! An [`crate::runtime::ObjectRef`] is a shared handle to one live target-binary
//! object: its runtime class plus per-field value slots. The handle is deliberately
//! thin - equality and hashing are reference identity, matching the composite
//! wrapper contract that two wrappers around the same underlying object must compare
//! equal. The bridge does not own the object's lifecycle in any deeper sense; slots
//! exist so the host's native method implementations have somewhere real to keep
//! state.

use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, RwLock};

use crate::runtime::{RuntimeClass, RuntimeField, Value};

/// Field slots are keyed by declaring class and field name, so a shadowed field on
/// a superclass keeps its own storage.
type SlotKey = (String, String);

struct ObjectInner {
    class: Arc<RuntimeClass>,
    slots: RwLock<HashMap<SlotKey, Value>>,
}

/// A shared reference to one live target object.
#[derive(Clone)]
pub struct ObjectRef {
    inner: Arc<ObjectInner>,
}

impl ObjectRef {
    /// Allocate a fresh instance of the given class with every field slot at its
    /// descriptor default (zero for primitives, null for references).
    ///
    /// Slots are materialized lazily on first read, so allocation itself is cheap.
    #[must_use]
    pub(crate) fn allocate(class: Arc<RuntimeClass>) -> Self {
        ObjectRef {
            inner: Arc::new(ObjectInner {
                class,
                slots: RwLock::new(HashMap::new()),
            }),
        }
    }

    /// The runtime class this object was instantiated from.
    #[must_use]
    pub fn class(&self) -> &Arc<RuntimeClass> {
        &self.inner.class
    }

    /// Read a field slot, falling back to the declared default when the slot was
    /// never written.
    #[must_use]
    pub(crate) fn read_slot(&self, owner: &str, field: &RuntimeField) -> Value {
        let slots = read_lock!(self.inner.slots);
        match slots.get(&(owner.to_string(), field.name.clone())) {
            Some(value) => value.clone(),
            None => Value::default_of(&field.desc),
        }
    }

    /// Write a field slot. Type compatibility is checked by the invoker before the
    /// write reaches this point.
    pub(crate) fn write_slot(&self, owner: &str, field: &RuntimeField, value: Value) {
        let mut slots = write_lock!(self.inner.slots);
        slots.insert((owner.to_string(), field.name.clone()), value);
    }

    /// Stable identity of the referenced object, for hashing and diagnostics.
    #[must_use]
    pub fn identity(&self) -> usize {
        Arc::as_ptr(&self.inner) as usize
    }
}

impl PartialEq for ObjectRef {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for ObjectRef {}

impl Hash for ObjectRef {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.identity().hash(state);
    }
}

impl fmt::Debug for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ObjectRef({}@{:x})",
            self.inner.class.name(),
            self.identity()
        )
    }
}
