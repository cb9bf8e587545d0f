//! The class registry: every class the bridge knows about.
//!
//! The [`crate::runtime::ClassRegistry`] is the single authority for runtime class
//! metadata. Classes are defined lazily: the first request for a name reads the
//! classfile bytes through the [`crate::classpath::Classpath`] (which is exactly
//! where the patched scratch directory gets its precedence), parses them, and caches
//! the immutable [`crate::runtime::RuntimeClass`]. A class is never redefined within
//! one process - the same guarantee a class loader gives.
//!
//! Behavior lives next to, not inside, the metadata: the embedding host binds
//! *native* implementations for target methods by `(class, name, descriptor)`, and
//! the proxy factory binds one interception handler per synthetic subclass. Both
//! tables are concurrent, append-only maps.
//!
//! # Concurrency
//!
//! All internal collections use `DashMap` for lock-free concurrent access. Two
//! threads racing to define the same class both parse the same bytes and produce
//! equivalent metadata; the first insert wins and the loser's copy is dropped,
//! which is safe because definitions are idempotent.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;

use crate::classfile::ClassFile;
use crate::classpath::Classpath;
use crate::proxy::ProxyHandler;
use crate::runtime::{
    ClassAccess, MemberAccess, MethodDesc, ObjectRef, RuntimeClass, RuntimeField, RuntimeMethod,
    TypeDesc, Value,
};
use crate::Result;

/// A host-bound implementation of one target method.
///
/// The instance argument is `None` for static dispatch. Failures surface to
/// callers wrapped in [`crate::Error::TargetInvocation`].
pub type NativeFn = Arc<dyn Fn(Option<&ObjectRef>, &[Value]) -> Result<Value> + Send + Sync>;

type MemberKey = (String, String, String);

/// Registry of defined classes plus the behavior bound to them.
pub struct ClassRegistry {
    classpath: Arc<Classpath>,
    classes: DashMap<String, Arc<RuntimeClass>>,
    natives: DashMap<MemberKey, NativeFn>,
    proxy_handlers: DashMap<String, ProxyHandler>,
    synthetic_counter: AtomicU64,
}

impl ClassRegistry {
    /// Create a registry over the given class search path.
    ///
    /// `java/lang/Object` is pre-defined as the hierarchy root (the target jar
    /// does not ship it), with the three methods every object answers to so that
    /// proxies can intercept them.
    #[must_use]
    pub fn new(classpath: Arc<Classpath>) -> Self {
        let registry = ClassRegistry {
            classpath,
            classes: DashMap::new(),
            natives: DashMap::new(),
            proxy_handlers: DashMap::new(),
            synthetic_counter: AtomicU64::new(0),
        };

        let object = RuntimeClass::new(
            "java/lang/Object".to_string(),
            None,
            ClassAccess::PUBLIC | ClassAccess::SUPER,
            Vec::new(),
            vec![
                RuntimeMethod {
                    name: "toString".to_string(),
                    desc: MethodDesc {
                        params: Vec::new(),
                        ret: Some(TypeDesc::Class("java/lang/String".to_string())),
                    },
                    access: MemberAccess::PUBLIC,
                },
                RuntimeMethod {
                    name: "hashCode".to_string(),
                    desc: MethodDesc {
                        params: Vec::new(),
                        ret: Some(TypeDesc::Primitive(crate::runtime::PrimitiveKind::Int)),
                    },
                    access: MemberAccess::PUBLIC,
                },
                RuntimeMethod {
                    name: "equals".to_string(),
                    desc: MethodDesc {
                        params: vec![TypeDesc::Class("java/lang/Object".to_string())],
                        ret: Some(TypeDesc::Primitive(crate::runtime::PrimitiveKind::Boolean)),
                    },
                    access: MemberAccess::PUBLIC,
                },
            ],
        );
        registry
            .classes
            .insert("java/lang/Object".to_string(), Arc::new(object));
        registry
    }

    /// The class search path this registry resolves against.
    #[must_use]
    pub fn classpath(&self) -> &Arc<Classpath> {
        &self.classpath
    }

    /// Look up an already-defined class.
    #[must_use]
    pub fn get(&self, internal_name: &str) -> Option<Arc<RuntimeClass>> {
        self.classes.get(internal_name).map(|c| c.clone())
    }

    /// Look up a class, defining it from classpath bytes on first use.
    ///
    /// # Errors
    /// [`crate::Error::ClassNotFound`] when no classpath entry provides the class,
    /// [`crate::Error::Malformed`] when the classfile does not parse or names a
    /// different class than requested.
    pub fn get_or_define(&self, internal_name: &str) -> Result<Arc<RuntimeClass>> {
        if let Some(existing) = self.classes.get(internal_name) {
            return Ok(existing.clone());
        }

        let bytes = self.classpath.read_class(internal_name)?;
        let classfile = ClassFile::parse(&bytes)?;
        let class = Self::from_classfile(&classfile)?;
        if class.name() != internal_name {
            return Err(malformed_error!(
                "Classfile for '{}' declares itself as '{}'",
                internal_name,
                class.name()
            ));
        }

        // A racing definition of the same name wins idempotently
        let entry = self
            .classes
            .entry(internal_name.to_string())
            .or_insert_with(|| Arc::new(class));
        Ok(entry.clone())
    }

    /// Convert parsed classfile structures into runtime metadata.
    fn from_classfile(classfile: &ClassFile) -> Result<RuntimeClass> {
        let name = classfile.class_name()?.to_string();
        let super_name = classfile.super_class_name()?.map(str::to_string);

        let mut fields = Vec::with_capacity(classfile.fields.len());
        for member in &classfile.fields {
            fields.push(RuntimeField {
                name: classfile.member_name(member)?.to_string(),
                desc: TypeDesc::parse(classfile.member_descriptor(member)?)?,
                access: MemberAccess::from_bits_truncate(member.access),
            });
        }

        let mut methods = Vec::with_capacity(classfile.methods.len());
        for member in &classfile.methods {
            methods.push(RuntimeMethod {
                name: classfile.member_name(member)?.to_string(),
                desc: MethodDesc::parse(classfile.member_descriptor(member)?)?,
                access: MemberAccess::from_bits_truncate(member.access),
            });
        }

        Ok(RuntimeClass::new(
            name,
            super_name,
            ClassAccess::from_bits_truncate(classfile.access),
            fields,
            methods,
        ))
    }

    /// The superclass of `class`, defining it on demand.
    pub fn superclass(&self, class: &Arc<RuntimeClass>) -> Result<Option<Arc<RuntimeClass>>> {
        match class.super_name() {
            Some(super_name) => self.get_or_define(super_name).map(Some),
            None => Ok(None),
        }
    }

    /// Whether `actual` names the same class as `expected` or a subclass of it.
    ///
    /// The walk ends silently at the first ancestor that cannot be resolved;
    /// assignability is a pure check and never fails resolution on behalf of the
    /// caller.
    #[must_use]
    pub fn is_subclass_of(&self, actual: &str, expected: &str) -> bool {
        if actual == expected || expected == "java/lang/Object" {
            return true;
        }
        let mut current = actual.to_string();
        loop {
            let Ok(class) = self.get_or_define(&current) else {
                return false;
            };
            match class.super_name() {
                Some(super_name) if super_name == expected => return true,
                Some(super_name) => current = super_name.to_string(),
                None => return false,
            }
        }
    }

    /// Allocate a fresh, default-initialized instance of the class.
    #[must_use]
    pub fn instantiate(&self, class: &Arc<RuntimeClass>) -> ObjectRef {
        ObjectRef::allocate(class.clone())
    }

    /// Register a class synthesized at runtime (proxy subclasses).
    pub(crate) fn define_synthetic(&self, class: RuntimeClass) -> Arc<RuntimeClass> {
        let arc = Arc::new(class);
        self.classes.insert(arc.name().to_string(), arc.clone());
        arc
    }

    /// A process-unique internal name for the next synthetic subclass of `super_name`.
    pub(crate) fn next_synthetic_name(&self, super_name: &str) -> String {
        let n = self.synthetic_counter.fetch_add(1, Ordering::Relaxed);
        format!("{super_name}$gate${n}")
    }

    /// Bind the host implementation of one target method.
    ///
    /// ## Arguments
    /// * 'class' - Internal name of the declaring class (obfuscated form)
    /// * 'name' - Method name as it appears in the classfile
    /// * 'descriptor' - Full method descriptor
    /// * 'body' - The implementation to dispatch to
    pub fn bind_native(&self, class: &str, name: &str, descriptor: &str, body: NativeFn) {
        self.natives.insert(
            (class.to_string(), name.to_string(), descriptor.to_string()),
            body,
        );
    }

    /// The host implementation bound for a method, if any.
    #[must_use]
    pub fn native_for(&self, class: &str, name: &str, descriptor: &str) -> Option<NativeFn> {
        self.natives
            .get(&(class.to_string(), name.to_string(), descriptor.to_string()))
            .map(|f| f.clone())
    }

    /// Bind the interception handler for a synthetic proxy class.
    pub(crate) fn bind_proxy_handler(&self, class: &str, handler: ProxyHandler) {
        self.proxy_handlers.insert(class.to_string(), handler);
    }

    /// The interception handler for a class, if it is a proxy class.
    #[must_use]
    pub fn proxy_handler(&self, class: &str) -> Option<ProxyHandler> {
        self.proxy_handlers.get(class).map(|h| h.clone())
    }
}
