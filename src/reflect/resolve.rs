//! Member resolution over the runtime class chain.
//!
//! Turns a logical member name plus actual argument values into one declared
//! member. Resolution walks the superclass chain from the dispatch class,
//! translating each class's logical name back through the mapping table to find
//! the overloads mapped on it, then filters declared methods by resolved name,
//! arity and pairwise assignability. Among compatible candidates the one
//! requiring the fewest primitive/boxed coercions wins; an exact tie is an
//! error, because guessing between equally-specific overloads on an obfuscated
//! binary is how state gets corrupted silently.

use std::collections::HashSet;
use std::sync::Arc;

use crate::mapping::MappingTable;
use crate::runtime::{compat, ClassRegistry, RuntimeClass, RuntimeField, RuntimeMethod, Value};
use crate::{Error, Result};

/// One method selected by overload resolution, pinned to its declaring class.
#[derive(Clone)]
pub(crate) struct ResolvedMethod {
    /// The class that declares the selected method (possibly a superclass of
    /// the dispatch class)
    pub owner: Arc<RuntimeClass>,
    /// The selected method
    pub method: Arc<RuntimeMethod>,
}

/// One field located on the chain, pinned to its declaring class.
pub(crate) struct ResolvedField {
    pub owner: Arc<RuntimeClass>,
    pub field: Arc<RuntimeField>,
}

/// The logical name of the most-derived mapped class on the chain, for error
/// reporting. Falls back to the runtime name when nothing on the chain is
/// mapped (synthetic classes, unmapped internals).
fn logical_context(
    registry: &ClassRegistry,
    mappings: &MappingTable,
    class: &Arc<RuntimeClass>,
) -> String {
    let mut current = Some(class.clone());
    while let Some(cls) = current {
        if let Some(logical) = mappings.logical_class_of(cls.name()) {
            return logical.to_string();
        }
        current = registry.superclass(&cls).ok().flatten();
    }
    class.name().to_string()
}

/// Check pairwise assignability and count the coercions the call would apply.
fn match_cost(
    registry: &ClassRegistry,
    args: &[Value],
    method: &RuntimeMethod,
) -> Option<u32> {
    let mut cost = 0;
    for (arg, expected) in args.iter().zip(&method.desc.params) {
        if !compat::is_value_assignable(registry, arg, expected) {
            return None;
        }
        if let Some(actual) = arg.type_desc() {
            cost += compat::coercion_cost(&actual, expected);
        }
    }
    Some(cost)
}

/// Resolve a logical method name against the chain starting at `class`.
///
/// # Errors
/// [`Error::UnmappedSymbol`] when no class on the chain maps the name,
/// [`Error::NoMatchingOverload`] when mapped overloads exist but none accepts
/// the argument types, [`Error::AmbiguousOverload`] when two or more accept
/// them equally well.
pub(crate) fn find_method(
    registry: &ClassRegistry,
    mappings: &MappingTable,
    class: &Arc<RuntimeClass>,
    logical_name: &str,
    args: &[Value],
) -> Result<ResolvedMethod> {
    let mut candidates: Vec<(ResolvedMethod, u32)> = Vec::new();
    let mut overridden: HashSet<(String, String)> = HashSet::new();
    let mut mapped_any = false;

    let mut current = Some(class.clone());
    while let Some(cls) = current {
        if let Some(logical_class) = mappings.logical_class_of(cls.name()) {
            for (signature, obf_name) in mappings.method_overloads(logical_class, logical_name) {
                mapped_any = true;
                if signature.arity() != args.len() {
                    continue;
                }
                for method in cls.declared_methods_named(obf_name) {
                    if method.desc.params.len() != args.len() {
                        continue;
                    }
                    // A declaration lower on the chain with the same name and
                    // descriptor is an override of anything above it
                    if !overridden.insert((method.name.clone(), method.desc.descriptor())) {
                        continue;
                    }
                    if let Some(cost) = match_cost(registry, args, method) {
                        candidates.push((
                            ResolvedMethod {
                                owner: cls.clone(),
                                method: method.clone(),
                            },
                            cost,
                        ));
                    }
                }
            }
        }
        current = registry.superclass(&cls)?;
    }

    select(registry, mappings, class, logical_name, args.len(), candidates, mapped_any)
}

/// Pick the most specific candidate, or fail deterministically.
fn select(
    registry: &ClassRegistry,
    mappings: &MappingTable,
    class: &Arc<RuntimeClass>,
    logical_name: &str,
    arity: usize,
    candidates: Vec<(ResolvedMethod, u32)>,
    mapped_any: bool,
) -> Result<ResolvedMethod> {
    let context = logical_context(registry, mappings, class);
    if candidates.is_empty() {
        if !mapped_any {
            return Err(Error::UnmappedSymbol {
                class: context,
                symbol: logical_name.to_string(),
            });
        }
        return Err(Error::NoMatchingOverload {
            class: context,
            method: logical_name.to_string(),
            arity,
        });
    }

    let best = candidates.iter().map(|(_, cost)| *cost).min().unwrap_or(0);
    let mut winners: Vec<ResolvedMethod> = candidates
        .into_iter()
        .filter(|(_, cost)| *cost == best)
        .map(|(resolved, _)| resolved)
        .collect();
    if winners.len() > 1 {
        return Err(Error::AmbiguousOverload {
            class: context,
            method: logical_name.to_string(),
            candidates: winners.len(),
        });
    }
    Ok(winners.remove(0))
}

/// Resolve a constructor by arity and argument types.
///
/// Constructors are not obfuscated and not inherited; synthetic proxy classes
/// declare none, so the walk skips through them to the first class that does
/// declare one. `Ok(None)` means default initialization (no constructor, no
/// arguments).
pub(crate) fn find_constructor(
    registry: &ClassRegistry,
    class: &Arc<RuntimeClass>,
    args: &[Value],
) -> Result<Option<ResolvedMethod>> {
    let mut current = Some(class.clone());
    while let Some(cls) = current {
        let declared: Vec<_> = cls.declared_methods_named("<init>").cloned().collect();
        if !declared.is_empty() {
            let mut candidates = Vec::new();
            for method in declared {
                if method.desc.params.len() != args.len() {
                    continue;
                }
                if let Some(cost) = match_cost(registry, args, &method) {
                    candidates.push((
                        ResolvedMethod {
                            owner: cls.clone(),
                            method,
                        },
                        cost,
                    ));
                }
            }
            if candidates.is_empty() {
                if args.is_empty() {
                    return Ok(None);
                }
                return Err(Error::NoMatchingOverload {
                    class: cls.name().to_string(),
                    method: "<init>".to_string(),
                    arity: args.len(),
                });
            }
            let best = candidates.iter().map(|(_, c)| *c).min().unwrap_or(0);
            let mut winners: Vec<_> = candidates
                .into_iter()
                .filter(|(_, c)| *c == best)
                .map(|(r, _)| r)
                .collect();
            if winners.len() > 1 {
                return Err(Error::AmbiguousOverload {
                    class: cls.name().to_string(),
                    method: "<init>".to_string(),
                    candidates: winners.len(),
                });
            }
            return Ok(Some(winners.remove(0)));
        }
        if !cls.is_synthetic() {
            break;
        }
        current = registry.superclass(&cls)?;
    }

    if args.is_empty() {
        Ok(None)
    } else {
        Err(Error::NoMatchingOverload {
            class: class.name().to_string(),
            method: "<init>".to_string(),
            arity: args.len(),
        })
    }
}

/// Resolve a logical field name against the chain starting at `class`.
///
/// # Errors
/// [`Error::UnmappedSymbol`] when no mapped class on the chain maps the field.
pub(crate) fn find_field(
    registry: &ClassRegistry,
    mappings: &MappingTable,
    class: &Arc<RuntimeClass>,
    logical_name: &str,
) -> Result<ResolvedField> {
    let mut current = Some(class.clone());
    while let Some(cls) = current {
        if let Some(logical_class) = mappings.logical_class_of(cls.name()) {
            if let Ok(obf) = mappings.resolve_field(logical_class, logical_name) {
                if let Some(field) = cls.declared_field(obf) {
                    return Ok(ResolvedField {
                        owner: cls.clone(),
                        field: field.clone(),
                    });
                }
            }
        }
        current = registry.superclass(&cls)?;
    }

    Err(Error::UnmappedSymbol {
        class: logical_context(registry, mappings, class),
        symbol: logical_name.to_string(),
    })
}
