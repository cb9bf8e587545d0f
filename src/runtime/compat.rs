//! Type compatibility and value coercion rules.
//!
//! This is the single place where the bridge decides whether an actual runtime type
//! may be substituted for an expected reflective parameter or return type, and how a
//! value is adjusted when it crosses that boundary. Overload matching and the
//! invoker both call into here, so the rules are defined exactly once.
//!
//! # Rules
//!
//! `is_assignable(actual, expected)` holds when:
//!
//! - the types are identical,
//! - actual and expected are a primitive/boxed pair *of the same primitive kind*
//!   (symmetric - either side may be the boxed one),
//! - actual is a class assignable to expected by superclass walk, or expected is
//!   `java/lang/Object` and actual is any reference type,
//! - both are arrays and the element types are compatible: primitive elements must
//!   match exactly (`int[]` is not `Integer[]`), reference elements are covariant.
//!
//! The relation is symmetric only across the primitive/boxed bridge; the coercion
//! applied on a real call is directional - unboxing when the callee expects a
//! primitive, boxing when it expects an object. A failed coercion is always an
//! error, never a silent default.

use crate::runtime::{ArrayValue, ClassRegistry, TypeDesc, Value};
use crate::{Error, Result};

/// Whether a value of type `actual` may be passed where `expected` is declared.
///
/// ## Arguments
/// * 'registry' - Used to walk superclass chains for class-to-class assignability
/// * 'actual' - The runtime type of the value on hand
/// * 'expected' - The declared parameter or field type
#[must_use]
pub fn is_assignable(registry: &ClassRegistry, actual: &TypeDesc, expected: &TypeDesc) -> bool {
    if actual == expected {
        return true;
    }

    match (actual, expected) {
        // Primitive/boxed bridge, same kind only
        (TypeDesc::Primitive(a), TypeDesc::Boxed(e))
        | (TypeDesc::Boxed(a), TypeDesc::Primitive(e)) => a == e,

        // Every reference type is assignable to Object
        (actual, TypeDesc::Class(name)) if name == "java/lang/Object" => actual.is_reference(),

        // Class hierarchy walk
        (TypeDesc::Class(a), TypeDesc::Class(e)) => registry.is_subclass_of(a, e),

        // Arrays: exact for primitive elements, covariant for reference elements
        (TypeDesc::Array(a), TypeDesc::Array(e)) => {
            match (a.is_reference(), e.is_reference()) {
                (false, false) => a == e,
                (true, true) => is_assignable(registry, a, e),
                _ => false,
            }
        }

        _ => false,
    }
}

/// Whether `value` may be passed where `expected` is declared.
///
/// Null is assignable to every reference type and to no primitive type.
#[must_use]
pub fn is_value_assignable(registry: &ClassRegistry, value: &Value, expected: &TypeDesc) -> bool {
    match value.type_desc() {
        Some(actual) => is_assignable(registry, &actual, expected),
        None => expected.is_reference(),
    }
}

/// The number of primitive/boxed coercions substituting `actual` for `expected`
/// would require. Used by overload selection to prefer the most specific
/// candidate; only meaningful when the pair is already assignable.
#[must_use]
pub fn coercion_cost(actual: &TypeDesc, expected: &TypeDesc) -> u32 {
    match (actual, expected) {
        (TypeDesc::Primitive(_), TypeDesc::Boxed(_))
        | (TypeDesc::Boxed(_), TypeDesc::Primitive(_)) => 1,
        // Boxing a primitive into an Object-typed parameter is a coercion too
        (TypeDesc::Primitive(_), TypeDesc::Class(_)) => 1,
        _ => 0,
    }
}

/// Coerce `value` to the declared type `expected`.
///
/// Applies directional boxing/unboxing, passes compatible references through
/// unchanged, and narrows array element types by rebuilding the array with each
/// element coerced (the declared-return-array case of reflective calls).
///
/// # Errors
/// [`Error::TypeError`] when the value cannot represent the expected type; this is
/// always reported, never defaulted.
pub fn coerce(registry: &ClassRegistry, value: Value, expected: &TypeDesc) -> Result<Value> {
    match (value, expected) {
        (Value::Null, expected) if expected.is_reference() => Ok(Value::Null),
        (Value::Null, expected) => Err(Error::TypeError(format!(
            "Cannot pass null where primitive '{expected}' is expected"
        ))),

        // Unbox when the callee expects a primitive
        (Value::Prim(p), TypeDesc::Primitive(kind)) if p.kind() == *kind => Ok(Value::Prim(p)),
        (Value::Boxed(p), TypeDesc::Primitive(kind)) if p.kind() == *kind => Ok(Value::Prim(p)),

        // Box when the callee expects a wrapper or a plain object
        (Value::Prim(p), TypeDesc::Boxed(kind)) if p.kind() == *kind => Ok(Value::Boxed(p)),
        (Value::Boxed(p), TypeDesc::Boxed(kind)) if p.kind() == *kind => Ok(Value::Boxed(p)),
        (Value::Prim(p), TypeDesc::Class(name)) if name == "java/lang/Object" => {
            Ok(Value::Boxed(p))
        }

        // Array narrowing: re-type the array at the declared element type, coercing
        // every element
        (Value::Array(array), TypeDesc::Array(elem)) => {
            if &array.elem == elem.as_ref() {
                return Ok(Value::Array(array));
            }
            let mut narrowed = Vec::with_capacity(array.items.len());
            for item in array.items.iter() {
                narrowed.push(coerce(registry, item.clone(), elem)?);
            }
            Ok(Value::Array(ArrayValue::new(
                elem.as_ref().clone(),
                narrowed,
            )))
        }

        // Remaining reference values pass through when assignable
        (value, expected) => {
            if is_value_assignable(registry, &value, expected) {
                Ok(value)
            } else {
                let actual = value
                    .type_desc()
                    .map_or_else(|| "null".to_string(), |d| d.to_string());
                Err(Error::TypeError(format!(
                    "Cannot coerce value of type '{actual}' to '{expected}'"
                )))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classpath::Classpath;
    use crate::runtime::{PrimValue, PrimitiveKind};
    use std::sync::Arc;

    fn registry() -> ClassRegistry {
        ClassRegistry::new(Arc::new(Classpath::new()))
    }

    #[test]
    fn test_primitive_boxed_bridge_is_symmetric() {
        let reg = registry();
        let prim_int = TypeDesc::Primitive(PrimitiveKind::Int);
        let boxed_int = TypeDesc::Boxed(PrimitiveKind::Int);
        let prim_long = TypeDesc::Primitive(PrimitiveKind::Long);

        assert!(is_assignable(&reg, &boxed_int, &prim_int));
        assert!(is_assignable(&reg, &prim_int, &boxed_int));
        assert!(!is_assignable(&reg, &boxed_int, &prim_long));
        assert!(!is_assignable(&reg, &prim_int, &prim_long));
    }

    #[test]
    fn test_object_accepts_references_only() {
        let reg = registry();
        let object = TypeDesc::Class("java/lang/Object".to_string());
        assert!(is_assignable(
            &reg,
            &TypeDesc::Class("java/lang/String".to_string()),
            &object
        ));
        assert!(is_assignable(
            &reg,
            &TypeDesc::Boxed(PrimitiveKind::Int),
            &object
        ));
        assert!(is_assignable(
            &reg,
            &TypeDesc::Array(Box::new(TypeDesc::Primitive(PrimitiveKind::Int))),
            &object
        ));
        assert!(!is_assignable(
            &reg,
            &TypeDesc::Primitive(PrimitiveKind::Int),
            &object
        ));
    }

    #[test]
    fn test_array_element_rules() {
        let reg = registry();
        let int_array = TypeDesc::Array(Box::new(TypeDesc::Primitive(PrimitiveKind::Int)));
        let boxed_array = TypeDesc::Array(Box::new(TypeDesc::Boxed(PrimitiveKind::Int)));
        let object_array =
            TypeDesc::Array(Box::new(TypeDesc::Class("java/lang/Object".to_string())));

        // int[] is not Integer[], but Integer[] is Object[]
        assert!(!is_assignable(&reg, &int_array, &boxed_array));
        assert!(!is_assignable(&reg, &boxed_array, &int_array));
        assert!(is_assignable(&reg, &boxed_array, &object_array));
    }

    #[test]
    fn test_coercion_direction() {
        let reg = registry();

        // Unbox toward a primitive parameter
        let unboxed = coerce(
            &reg,
            Value::Boxed(PrimValue::Int(7)),
            &TypeDesc::Primitive(PrimitiveKind::Int),
        )
        .unwrap();
        assert_eq!(unboxed, Value::Prim(PrimValue::Int(7)));

        // Box toward an Object parameter
        let boxed = coerce(
            &reg,
            Value::from(7i32),
            &TypeDesc::Class("java/lang/Object".to_string()),
        )
        .unwrap();
        assert_eq!(boxed, Value::Boxed(PrimValue::Int(7)));

        // Null into a primitive is an error, not a default
        assert!(matches!(
            coerce(&reg, Value::Null, &TypeDesc::Primitive(PrimitiveKind::Int)),
            Err(Error::TypeError(_))
        ));
    }

    #[test]
    fn test_array_narrowing() {
        let reg = registry();
        let object_elem = TypeDesc::Class("java/lang/Object".to_string());
        let array = Value::Array(ArrayValue::new(
            object_elem,
            vec![Value::string("a"), Value::string("b")],
        ));

        let narrowed = coerce(
            &reg,
            array,
            &TypeDesc::Array(Box::new(TypeDesc::Class("java/lang/String".to_string()))),
        )
        .unwrap();
        match narrowed {
            Value::Array(a) => {
                assert_eq!(a.elem, TypeDesc::Class("java/lang/String".to_string()));
                assert_eq!(a.items.len(), 2);
            }
            other => panic!("expected array, got {other:?}"),
        }
    }
}
