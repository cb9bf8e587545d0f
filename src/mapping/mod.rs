//! Logical-to-obfuscated name resolution.
//!
//! Target binaries ship with obfuscated identifiers that change between
//! releases. This module provides the one translation layer the rest of the
//! bridge builds on:
//!
//! - [`VersionKey`] - identifies a target release
//! - [`MappingEntry`] / [`MethodSignature`] - the parsed mapping facts
//! - [`MappingSet`] / [`MappingSetBuilder`] - an unvalidated batch of facts
//! - [`MappingTable`] - the validated, indexed, load-once lookup table
//!
//! Method mappings are keyed by full [`MethodSignature`] so that overloads with
//! the same logical name resolve independently. The table pins its version for
//! the process lifetime: mixing mappings from two releases would silently
//! dispatch to wrong members, so a second load for a different [`VersionKey`]
//! fails instead.

mod entry;
mod table;

pub use entry::{MappingEntry, MethodSignature, VersionKey};
pub use table::{MappingSet, MappingSetBuilder, MappingTable};
