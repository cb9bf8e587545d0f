//! Cached reflective dispatch.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;

use crate::mapping::MappingTable;
use crate::proxy::ProxyCall;
use crate::reflect::resolve::{self, ResolvedMethod};
use crate::runtime::{compat, ClassRegistry, ObjectRef, RuntimeClass, TypeDesc, Value};
use crate::{Error, Result};

/// Dispatch cache key: dispatch class name, logical member name, and the
/// runtime types of the arguments (`None` for the null reference).
///
/// The argument types are part of the key because overload selection is
/// type-sensitive: two same-arity calls to one logical name may legitimately
/// resolve to different overloads (an unboxed `int` versus a boxed `Integer`),
/// and a key of arity alone would replay whichever resolved first.
type CacheKey = (String, String, Vec<Option<TypeDesc>>);

/// Signature-matched reflective dispatch with a concurrent resolution cache.
///
/// Resolution (mapping lookup, chain walk, overload selection) happens once per
/// `(class, logical name, argument types)` key and is cached forever - the
/// mapping table and defined classes never change after startup, so the cache
/// needs no invalidation. Racing resolutions of the same key are idempotent:
/// both threads resolve to the same method and the first insert wins.
///
/// Dispatch itself routes through up to three layers, in order: the proxy
/// interception handler (when the dispatch class is a synthetic proxy class and
/// the method is overridable), then the most-derived native implementation
/// bound on the registry, walking the superclass chain exactly as virtual
/// dispatch would.
pub struct ReflectiveInvoker {
    mappings: Arc<MappingTable>,
    registry: Arc<ClassRegistry>,
    cache: DashMap<CacheKey, ResolvedMethod>,
    resolutions: AtomicU64,
}

impl ReflectiveInvoker {
    /// Create an invoker over a loaded mapping table and class registry.
    #[must_use]
    pub fn new(mappings: Arc<MappingTable>, registry: Arc<ClassRegistry>) -> Self {
        ReflectiveInvoker {
            mappings,
            registry,
            cache: DashMap::new(),
            resolutions: AtomicU64::new(0),
        }
    }

    /// The mapping table dispatch resolves against.
    #[must_use]
    pub fn mappings(&self) -> &Arc<MappingTable> {
        &self.mappings
    }

    /// The registry providing classes and bound implementations.
    #[must_use]
    pub fn registry(&self) -> &Arc<ClassRegistry> {
        &self.registry
    }

    /// Number of overload resolutions performed so far (cache misses).
    ///
    /// Repeat calls with the same class, name and argument types must not grow
    /// this.
    #[must_use]
    pub fn resolution_count(&self) -> u64 {
        self.resolutions.load(Ordering::Relaxed)
    }

    /// Invoke a logical method on an instance.
    ///
    /// # Errors
    /// Resolution failures ([`Error::UnmappedSymbol`], [`Error::NoMatchingOverload`],
    /// [`Error::AmbiguousOverload`]) and failures inside the bound implementation
    /// ([`Error::TargetInvocation`]).
    pub fn invoke(&self, instance: &ObjectRef, logical_name: &str, args: &[Value]) -> Result<Value> {
        let resolved = self.resolved(instance.class(), logical_name, args)?;
        self.dispatch(Some(instance), &resolved, args, true)
    }

    /// Invoke a static logical method on a logical class, without an instance.
    ///
    /// # Errors
    /// As [`ReflectiveInvoker::invoke`], plus [`Error::UnmappedClass`] when the
    /// class itself has no mapping, and a dispatch error when the resolved
    /// method is not static.
    pub fn invoke_static(
        &self,
        logical_class: &str,
        logical_name: &str,
        args: &[Value],
    ) -> Result<Value> {
        let obf = self.mappings.resolve_class(logical_class)?;
        let class = self.registry.get_or_define(obf)?;
        let resolved = self.resolved(&class, logical_name, args)?;
        if !resolved.method.is_static() {
            return Err(Error::Error(format!(
                "'{logical_name}' on '{logical_class}' is not a static method"
            )));
        }
        self.dispatch(None, &resolved, args, false)
    }

    /// Read a logical field from an instance.
    pub fn get_field(&self, instance: &ObjectRef, logical_name: &str) -> Result<Value> {
        let resolved =
            resolve::find_field(&self.registry, &self.mappings, instance.class(), logical_name)?;
        Ok(instance.read_slot(resolved.owner.name(), &resolved.field))
    }

    /// Write a logical field on an instance, coercing the value to the declared
    /// field type.
    ///
    /// # Errors
    /// [`Error::UnmappedSymbol`] when the field does not resolve,
    /// [`Error::TypeError`] when the value is not assignable to it.
    pub fn set_field(&self, instance: &ObjectRef, logical_name: &str, value: Value) -> Result<()> {
        let resolved =
            resolve::find_field(&self.registry, &self.mappings, instance.class(), logical_name)?;
        let coerced = compat::coerce(&self.registry, value, &resolved.field.desc)?;
        instance.write_slot(resolved.owner.name(), &resolved.field, coerced);
        Ok(())
    }

    /// Instantiate a logical class and run its matching constructor, if any.
    pub fn construct(&self, logical_class: &str, args: &[Value]) -> Result<ObjectRef> {
        let obf = self.mappings.resolve_class(logical_class)?;
        let class = self.registry.get_or_define(obf)?;
        self.construct_instance(&class, args)
    }

    /// Instantiate an already-defined class and run its constructor.
    ///
    /// Default initialization (every field at its descriptor default) applies
    /// when the class declares no constructor and no arguments were given.
    pub(crate) fn construct_instance(
        &self,
        class: &Arc<RuntimeClass>,
        args: &[Value],
    ) -> Result<ObjectRef> {
        let instance = self.registry.instantiate(class);
        if let Some(ctor) = resolve::find_constructor(&self.registry, class, args)? {
            // Constructors are never intercepted
            self.dispatch(Some(&instance), &ctor, args, false)?;
        }
        Ok(instance)
    }

    /// Resolve through the cache.
    fn resolved(
        &self,
        class: &Arc<RuntimeClass>,
        logical_name: &str,
        args: &[Value],
    ) -> Result<ResolvedMethod> {
        let key = (
            class.name().to_string(),
            logical_name.to_string(),
            args.iter().map(Value::type_desc).collect(),
        );
        if let Some(hit) = self.cache.get(&key) {
            return Ok(hit.clone());
        }

        let resolved =
            resolve::find_method(&self.registry, &self.mappings, class, logical_name, args)?;
        self.resolutions.fetch_add(1, Ordering::Relaxed);
        let entry = self.cache.entry(key).or_insert(resolved);
        Ok(entry.clone())
    }

    /// Route one resolved call through interception, then the bound
    /// implementation, then return coercion.
    pub(crate) fn dispatch(
        &self,
        instance: Option<&ObjectRef>,
        resolved: &ResolvedMethod,
        args: &[Value],
        intercept: bool,
    ) -> Result<Value> {
        let mut coerced = Vec::with_capacity(args.len());
        for (arg, expected) in args.iter().zip(&resolved.method.desc.params) {
            coerced.push(compat::coerce(&self.registry, arg.clone(), expected)?);
        }

        if intercept && resolved.method.is_overridable() {
            if let Some(instance) = instance {
                if let Some(handler) = self.registry.proxy_handler(instance.class().name()) {
                    let call = ProxyCall::new(instance, resolved, &coerced, self);
                    let value = handler(&call)?;
                    return self.coerce_return(value, resolved);
                }
            }
        }

        let descriptor = resolved.method.desc.descriptor();
        let mut search = match instance {
            Some(instance) => Some(instance.class().clone()),
            None => Some(resolved.owner.clone()),
        };
        while let Some(cls) = search {
            if let Some(body) =
                self.registry
                    .native_for(cls.name(), &resolved.method.name, &descriptor)
            {
                let outcome = catch_unwind(AssertUnwindSafe(|| body(instance, &coerced)));
                let value = match outcome {
                    Ok(Ok(value)) => value,
                    Ok(Err(cause)) => return Err(Error::TargetInvocation(Box::new(cause))),
                    Err(payload) => {
                        let message = payload
                            .downcast_ref::<&str>()
                            .map(|s| (*s).to_string())
                            .or_else(|| payload.downcast_ref::<String>().cloned())
                            .unwrap_or_else(|| "target implementation panicked".to_string());
                        return Err(Error::TargetInvocation(message.into()));
                    }
                };
                return self.coerce_return(value, resolved);
            }
            search = self.registry.superclass(&cls)?;
        }

        Err(Error::Error(format!(
            "No implementation bound for '{}{}' on '{}'",
            resolved.method.name,
            descriptor,
            resolved.owner.name()
        )))
    }

    /// Coerce a returned value to the declared return type.
    fn coerce_return(&self, value: Value, resolved: &ResolvedMethod) -> Result<Value> {
        match &resolved.method.desc.ret {
            Some(expected) => compat::coerce(&self.registry, value, expected),
            None => Ok(Value::Null),
        }
    }
}
