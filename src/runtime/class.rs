//! Runtime class metadata.
//!
//! A [`crate::runtime::RuntimeClass`] is the bridge's view of one target-binary class:
//! its obfuscated internal name, superclass, declared fields and declared methods,
//! all read out of the classfile bytes the classpath resolves (possibly the patched
//! copy). Classes are immutable after definition; behavior is bound separately on
//! the registry, so the metadata can be shared freely across threads.

use std::sync::Arc;

use bitflags::bitflags;

use crate::runtime::{MethodDesc, TypeDesc};

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    /// Class-level access flags, as stored in the classfile
    pub struct ClassAccess: u16 {
        /// Declared public
        const PUBLIC = 0x0001;
        /// Declared final; no subclasses allowed
        const FINAL = 0x0010;
        /// Treat superclass methods specially when invoked (always set by modern compilers)
        const SUPER = 0x0020;
        /// Is an interface, not a class
        const INTERFACE = 0x0200;
        /// Declared abstract
        const ABSTRACT = 0x0400;
        /// Generated by a tool, not present in source
        const SYNTHETIC = 0x1000;
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    /// Field/method access flags, as stored in the classfile
    pub struct MemberAccess: u16 {
        /// Declared public
        const PUBLIC = 0x0001;
        /// Declared private
        const PRIVATE = 0x0002;
        /// Declared protected
        const PROTECTED = 0x0004;
        /// Declared static
        const STATIC = 0x0008;
        /// Declared final
        const FINAL = 0x0010;
        /// Declared synchronized (methods only)
        const SYNCHRONIZED = 0x0020;
        /// Bridge method generated by the compiler
        const BRIDGE = 0x0040;
        /// Declared native
        const NATIVE = 0x0100;
        /// Declared abstract
        const ABSTRACT = 0x0400;
        /// Generated by a tool, not present in source
        const SYNTHETIC = 0x1000;
    }
}

/// One declared field of a runtime class.
#[derive(Debug, Clone)]
pub struct RuntimeField {
    /// Field name as it appears in the (possibly patched) classfile
    pub name: String,
    /// Declared field type
    pub desc: TypeDesc,
    /// Access flags
    pub access: MemberAccess,
}

/// One declared method of a runtime class.
#[derive(Debug, Clone)]
pub struct RuntimeMethod {
    /// Method name as it appears in the (possibly patched) classfile
    pub name: String,
    /// Parsed method descriptor
    pub desc: MethodDesc,
    /// Access flags
    pub access: MemberAccess,
}

impl RuntimeMethod {
    /// Whether this method dispatches without an instance.
    #[must_use]
    pub fn is_static(&self) -> bool {
        self.access.contains(MemberAccess::STATIC)
    }

    /// Whether a dynamic subclass may override this method.
    ///
    /// Constructors, statics, finals and privates are never overridable; these are
    /// exactly the methods a proxy cannot intercept.
    #[must_use]
    pub fn is_overridable(&self) -> bool {
        !self.is_static()
            && !self.access.contains(MemberAccess::FINAL)
            && !self.access.contains(MemberAccess::PRIVATE)
            && self.name != "<init>"
            && self.name != "<clinit>"
    }
}

/// Immutable metadata for one class known to the bridge.
#[derive(Debug)]
pub struct RuntimeClass {
    name: String,
    super_name: Option<String>,
    access: ClassAccess,
    fields: Vec<Arc<RuntimeField>>,
    methods: Vec<Arc<RuntimeMethod>>,
    /// Set for classes defined by the proxy factory rather than from classfile bytes
    synthetic: bool,
}

impl RuntimeClass {
    /// Assemble class metadata.
    ///
    /// ## Arguments
    /// * 'name' - Internal (slash-separated) class name
    /// * 'super_name' - Internal name of the superclass, `None` only for the root
    /// * 'access' - Class access flags
    /// * 'fields' - Declared fields, in classfile order
    /// * 'methods' - Declared methods, in classfile order
    #[must_use]
    pub fn new(
        name: String,
        super_name: Option<String>,
        access: ClassAccess,
        fields: Vec<RuntimeField>,
        methods: Vec<RuntimeMethod>,
    ) -> Self {
        RuntimeClass {
            name,
            super_name,
            access,
            fields: fields.into_iter().map(Arc::new).collect(),
            methods: methods.into_iter().map(Arc::new).collect(),
            synthetic: false,
        }
    }

    /// Mark this class as synthesized at runtime (proxy subclasses).
    #[must_use]
    pub(crate) fn into_synthetic(mut self) -> Self {
        self.synthetic = true;
        self
    }

    /// Internal class name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Internal name of the superclass, if any.
    #[must_use]
    pub fn super_name(&self) -> Option<&str> {
        self.super_name.as_deref()
    }

    /// Class access flags.
    #[must_use]
    pub fn access(&self) -> ClassAccess {
        self.access
    }

    /// Whether this class was synthesized at runtime rather than defined from
    /// classfile bytes.
    #[must_use]
    pub fn is_synthetic(&self) -> bool {
        self.synthetic
    }

    /// Declared fields, in classfile order.
    #[must_use]
    pub fn fields(&self) -> &[Arc<RuntimeField>] {
        &self.fields
    }

    /// Declared methods, in classfile order.
    #[must_use]
    pub fn methods(&self) -> &[Arc<RuntimeMethod>] {
        &self.methods
    }

    /// Find a declared field by name.
    #[must_use]
    pub fn declared_field(&self, name: &str) -> Option<&Arc<RuntimeField>> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Find a declared method by exact name and full descriptor.
    #[must_use]
    pub fn declared_method(&self, name: &str, desc: &MethodDesc) -> Option<&Arc<RuntimeMethod>> {
        self.methods
            .iter()
            .find(|m| m.name == name && &m.desc == desc)
    }

    /// All declared methods sharing the given name.
    pub fn declared_methods_named<'a>(
        &'a self,
        name: &'a str,
    ) -> impl Iterator<Item = &'a Arc<RuntimeMethod>> {
        self.methods.iter().filter(move |m| m.name == name)
    }
}
