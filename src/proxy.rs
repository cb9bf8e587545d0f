//! Dynamic subclass proxies with method interception.
//!
//! A proxy is a synthetic subclass of a mapped target class whose overridable
//! method calls route to a single host-supplied handler before (or instead of)
//! the original implementation. The handler receives a [`ProxyCall`] describing
//! the invocation and may compute its own result, inspect or rewrite nothing
//! and call [`ProxyCall::proceed`], or do both. This is delegation, not
//! inheritance: the handler is a value, and the proxy instance is an ordinary
//! [`ObjectRef`] indistinguishable from an unproxied one to every other layer.
//!
//! Constructors, static, final and private methods are never intercepted -
//! the same set a dynamic subclass could not override.
//!
//! # Field copying
//!
//! `create_proxy` takes a `copy_fields` flag for callers that want a proxy
//! populated from an existing instance. That path is rejected with
//! [`crate::Error::UnsupportedCopy`] before any allocation happens: field
//! copying across an obfuscated class's private state cannot be done safely
//! without per-field semantics the mappings do not carry, and failing loudly
//! beats constructing a half-initialized object.

use std::sync::Arc;

use crate::reflect::resolve::ResolvedMethod;
use crate::reflect::ReflectiveInvoker;
use crate::runtime::{ClassAccess, ObjectRef, RuntimeClass, Value};
use crate::{Error, Result};

/// The interception handler bound to one proxy class.
///
/// Called for every overridable method invoked on instances of that class.
pub type ProxyHandler = Arc<dyn Fn(&ProxyCall<'_>) -> Result<Value> + Send + Sync>;

/// One intercepted invocation, as seen by a [`ProxyHandler`].
pub struct ProxyCall<'a> {
    instance: &'a ObjectRef,
    resolved: &'a ResolvedMethod,
    args: &'a [Value],
    invoker: &'a ReflectiveInvoker,
}

impl<'a> ProxyCall<'a> {
    pub(crate) fn new(
        instance: &'a ObjectRef,
        resolved: &'a ResolvedMethod,
        args: &'a [Value],
        invoker: &'a ReflectiveInvoker,
    ) -> Self {
        ProxyCall {
            instance,
            resolved,
            args,
            invoker,
        }
    }

    /// The proxy instance the call was made on.
    #[must_use]
    pub fn instance(&self) -> &ObjectRef {
        self.instance
    }

    /// Name of the intercepted method, as declared in the classfile.
    #[must_use]
    pub fn method_name(&self) -> &str {
        &self.resolved.method.name
    }

    /// Full descriptor of the intercepted method.
    #[must_use]
    pub fn descriptor(&self) -> String {
        self.resolved.method.desc.descriptor()
    }

    /// The arguments, already coerced to the declared parameter types.
    #[must_use]
    pub fn args(&self) -> &[Value] {
        self.args
    }

    /// Invoke the original implementation the proxy overrides.
    ///
    /// Dispatches the same resolved method on the same instance with
    /// interception disabled, so the handler does not recurse into itself.
    pub fn proceed(&self) -> Result<Value> {
        self.invoker
            .dispatch(Some(self.instance), self.resolved, self.args, false)
    }
}

/// Creates intercepting synthetic subclasses of mapped target classes.
pub struct ProxyFactory {
    invoker: Arc<ReflectiveInvoker>,
}

impl ProxyFactory {
    /// Create a factory dispatching through the given invoker.
    #[must_use]
    pub fn new(invoker: Arc<ReflectiveInvoker>) -> Self {
        ProxyFactory { invoker }
    }

    /// Define a fresh synthetic subclass of a logical target class, bind the
    /// handler to it, and construct one instance.
    ///
    /// ## Arguments
    /// * 'target_logical_class' - Logical name of the class to subclass
    /// * 'handler' - Interception handler for every overridable method
    /// * 'copy_fields' - Must be `false`; copying is rejected, see module docs
    /// * 'ctor_args' - Arguments for the superclass constructor
    ///
    /// # Errors
    /// [`Error::UnsupportedCopy`] when `copy_fields` is set,
    /// [`Error::UnmappedClass`] when the target class has no mapping, plus any
    /// constructor resolution or dispatch failure.
    pub fn create_proxy(
        &self,
        target_logical_class: &str,
        handler: ProxyHandler,
        copy_fields: bool,
        ctor_args: &[Value],
    ) -> Result<ObjectRef> {
        if copy_fields {
            return Err(Error::UnsupportedCopy);
        }

        let registry = self.invoker.registry();
        let obf = self.invoker.mappings().resolve_class(target_logical_class)?;
        let super_class = registry.get_or_define(obf)?;

        let name = registry.next_synthetic_name(super_class.name());
        let class = RuntimeClass::new(
            name.clone(),
            Some(super_class.name().to_string()),
            ClassAccess::PUBLIC | ClassAccess::SUPER | ClassAccess::SYNTHETIC,
            Vec::new(),
            Vec::new(),
        )
        .into_synthetic();
        let class = registry.define_synthetic(class);
        registry.bind_proxy_handler(&name, handler);

        self.invoker.construct_instance(&class, ctor_args)
    }
}
