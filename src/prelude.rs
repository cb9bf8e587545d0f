//! # classgate Prelude
//!
//! This module provides a convenient prelude for the most commonly used types
//! from the classgate library. Import this module to get quick access to the
//! essential types for bridging against an obfuscated target binary.

// ================================================================================================
// Core Types and Error Handling
// ================================================================================================

/// The main error type for all classgate operations
pub use crate::Error;

/// The result type used throughout classgate
pub use crate::Result;

// ================================================================================================
// Main Entry Points
// ================================================================================================

/// Startup orchestration and the assembled adapter context
pub use crate::bridge::{Bridge, BridgeConfig};

// ================================================================================================
// Mappings
// ================================================================================================

/// Name mapping: entries, signatures, sets and the loaded table
pub use crate::mapping::{
    MappingEntry, MappingSet, MappingSetBuilder, MappingTable, MethodSignature, VersionKey,
};

// ================================================================================================
// Runtime Object Model and Dispatch
// ================================================================================================

/// Runtime values and type descriptors
pub use crate::runtime::{ArrayValue, MethodDesc, PrimValue, PrimitiveKind, TypeDesc, Value};

/// Classes, instances and the registry
pub use crate::runtime::{ClassRegistry, NativeFn, ObjectRef, RuntimeClass};

/// Cached reflective dispatch
pub use crate::reflect::ReflectiveInvoker;

/// Typed wrapper over one target object
pub use crate::composite::CompositeInstance;

/// Interception proxies
pub use crate::proxy::{ProxyCall, ProxyFactory, ProxyHandler};

// ================================================================================================
// Patching and Class Resolution
// ================================================================================================

/// The class search path
pub use crate::classpath::Classpath;

/// The patch pipeline and its declarative edits
pub use crate::patch::{
    BytecodePatchPipeline, ClassTarget, HookRef, MethodTarget, PatchEdit, PatchUnit, PipelineState,
};

/// Classfile parsing and editing, for fixtures and custom tooling
pub use crate::classfile::{ClassFile, MemberAccessFlags};
