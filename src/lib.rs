// Copyright 2026 The classgate authors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//
// SPDX-License-Identifier: Apache-2.0

#![doc(html_no_source)]
#![deny(missing_docs)]
#![allow(dead_code)]
#![allow(clippy::too_many_arguments)]
//#![deny(unsafe_code)]
// - 'classpath.rs' uses mmap to map the target jar into memory

//! # classgate
//!
//! A runtime bridge for adapting a stable, versioned plugin API to the internal,
//! obfuscated, version-churning symbol set of a third-party JVM server binary -
//! a packaged jar of classfiles the adapter does not own and cannot rebuild.
//!
//! ## Features
//!
//! - **Name mapping** - Resolve logical class, field and method names to the
//!   obfuscated identifiers of one target release, validated and pinned at load
//! - **Reflective dispatch** - Signature-matched method and field access with
//!   primitive/boxed compatibility rules, deterministic overload selection and a
//!   concurrent resolution cache
//! - **Dynamic proxies** - Synthetic subclasses whose overridable methods route
//!   through a host-supplied interception handler
//! - **Bytecode patching** - Rewrite classfiles (add members, wrap methods with
//!   static hooks) in a scratch directory placed ahead of the jar on the class
//!   search path, strictly before the first class load
//!
//! ## Quick Start
//!
//! Add `classgate` to your `Cargo.toml`:
//!
//! ```toml
//! [dependencies]
//! classgate = "0.1"
//! ```
//!
//! ### Using the Prelude
//!
//! ```rust,no_run
//! use classgate::prelude::*;
//!
//! let mappings = MappingSet::builder()
//!     .class("DedicatedServer", "km")
//!     .method("DedicatedServer", "getMotd()", "a")
//!     .build();
//!
//! let config = BridgeConfig::new(VersionKey::new("1.8.1"), mappings, "server.jar");
//! let bridge = Bridge::bootstrap(config)?;
//!
//! let server = bridge.construct("DedicatedServer", &[])?;
//! let motd = server.invoke("getMotd", &[])?;
//! # Ok::<(), classgate::Error>(())
//! ```
//!
//! ### Patching before first load
//!
//! ```rust,no_run
//! use classgate::prelude::*;
//!
//! let mappings = MappingSet::builder()
//!     .class("DedicatedServer", "km")
//!     .method("DedicatedServer", "tick()", "z")
//!     .build();
//!
//! let unit = PatchUnit::new(ClassTarget::Logical("DedicatedServer".to_string()))
//!     .edit(PatchEdit::WrapMethod {
//!         method: MethodTarget::Logical(MethodSignature::new("tick", vec![])),
//!         hook: HookRef::new("gate/Hooks", "onTick"),
//!     });
//!
//! let config = BridgeConfig::new(VersionKey::new("1.8.1"), mappings, "server.jar")
//!     .patch(unit);
//! let bridge = Bridge::bootstrap(config)?;
//! # Ok::<(), classgate::Error>(())
//! ```
//!
//! ## Architecture
//!
//! - [`mapping`] - logical-to-obfuscated name resolution, loaded once per process
//! - [`runtime`] - the bridge's runtime object model: descriptors, values,
//!   classes, instances, and the assignability/coercion rules
//! - [`reflect`] - cached signature-matched dispatch over logical names
//! - [`composite`] - typed wrappers pairing one object with the invoker
//! - [`proxy`] - interception via synthetic subclasses
//! - [`classfile`] - classfile parsing and structural editing
//! - [`classpath`] - the ordered class search path
//! - [`patch`] - the extract / patch / register pipeline
//! - [`bridge`] - startup orchestration tying all of the above together
//!
//! ## Error Handling
//!
//! All operations return [`Result<T, Error>`](Result). Resolution failures are
//! deliberately fatal at first use - a wrong guess against an obfuscated binary
//! corrupts state silently - while [`Error::TargetInvocation`] wraps failures
//! inside the wrapped binary's own logic and may be caught by the caller.
//!
//! ```rust,no_run
//! use classgate::{Error, mapping::{MappingSet, MappingTable, VersionKey}};
//!
//! match MappingTable::load(VersionKey::new("1.8.1"), &MappingSet::default()) {
//!     Ok(table) => println!("Loaded mappings for {}", table.version()),
//!     Err(Error::MappingLoad(reason)) => println!("Mapping load failed: {reason}"),
//!     Err(e) => println!("Other error: {e}"),
//! }
//! ```

#[macro_use]
pub(crate) mod macros;

#[macro_use]
pub(crate) mod error;

/// Convenient re-exports of the most commonly used types.
///
/// # Example
///
/// ```rust,no_run
/// use classgate::prelude::*;
///
/// let mappings = MappingSet::builder().class("World", "aqu").build();
/// let table = MappingTable::load(VersionKey::new("1.8.1"), &mappings)?;
/// # Ok::<(), classgate::Error>(())
/// ```
pub mod prelude;

/// Startup orchestration: [`bridge::Bridge`] and [`bridge::BridgeConfig`].
pub mod bridge;

/// JVM classfile parsing and structural editing.
///
/// Parses complete classfiles (constant pool, members, attributes), keeps
/// attribute payloads as raw bytes, supports append-only pool additions, member
/// addition and method renaming, and serializes back to bytes. Used by the
/// patch pipeline to rewrite scratch copies and by the registry to define
/// runtime classes.
pub mod classfile;

/// The ordered class search path of directories and memory-mapped jars.
pub mod classpath;

/// Typed wrappers over target-object references; see
/// [`composite::CompositeInstance`].
pub mod composite;

/// Logical-to-obfuscated name resolution; see [`mapping::MappingTable`].
pub mod mapping;

/// The extract / patch / register pipeline; see
/// [`patch::BytecodePatchPipeline`].
pub mod patch;

/// Dynamic subclass proxies with method interception; see
/// [`proxy::ProxyFactory`].
pub mod proxy;

/// Cached reflective dispatch over logical names; see
/// [`reflect::ReflectiveInvoker`].
pub mod reflect;

/// The bridge's runtime object model: descriptors, values, classes, instances,
/// the class registry and the compatibility rules.
pub mod runtime;

/// `classgate` Result type
///
/// A type alias for [`std::result::Result<T, Error>`] where the error type is
/// always [`Error`]. Used consistently throughout the crate for all fallible
/// operations.
pub type Result<T> = std::result::Result<T, Error>;

/// `classgate` Error type
///
/// The main error type for all operations in this crate; see the variant
/// documentation for the failure taxonomy and recovery policy.
pub use error::Error;

/// The assembled adapter context and its configuration.
pub use bridge::{Bridge, BridgeConfig};

/// The logical-name view of one live target object.
pub use composite::CompositeInstance;
