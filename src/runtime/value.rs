//! Runtime values crossing the bridge.
//!
//! [`crate::runtime::Value`] is the dynamic value representation used for every
//! argument, return value and field slot that passes through reflective dispatch.
//! The one property that matters most here is that *unboxed* and *boxed* primitives
//! are distinct variants: the compatibility and coercion rules of the invoker are
//! defined over that distinction, exactly as the target VM distinguishes `int` from
//! `java.lang.Integer`.
//!
//! Reference semantics follow the target VM as well: strings compare by content,
//! arrays and objects compare by reference identity.

use std::sync::Arc;

use crate::runtime::{ObjectRef, PrimitiveKind, TypeDesc};

/// An unboxed primitive value of one of the eight JVM kinds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PrimValue {
    /// A `boolean` value
    Boolean(bool),
    /// A `byte` value
    Byte(i8),
    /// A `char` value (UTF-16 code unit)
    Char(u16),
    /// A `short` value
    Short(i16),
    /// An `int` value
    Int(i32),
    /// A `long` value
    Long(i64),
    /// A `float` value
    Float(f32),
    /// A `double` value
    Double(f64),
}

impl PrimValue {
    /// The primitive kind of this value.
    #[must_use]
    pub fn kind(&self) -> PrimitiveKind {
        match self {
            PrimValue::Boolean(_) => PrimitiveKind::Boolean,
            PrimValue::Byte(_) => PrimitiveKind::Byte,
            PrimValue::Char(_) => PrimitiveKind::Char,
            PrimValue::Short(_) => PrimitiveKind::Short,
            PrimValue::Int(_) => PrimitiveKind::Int,
            PrimValue::Long(_) => PrimitiveKind::Long,
            PrimValue::Float(_) => PrimitiveKind::Float,
            PrimValue::Double(_) => PrimitiveKind::Double,
        }
    }

    /// The zero value of the given kind, used for field slot defaults.
    #[must_use]
    pub fn default_of(kind: PrimitiveKind) -> PrimValue {
        match kind {
            PrimitiveKind::Boolean => PrimValue::Boolean(false),
            PrimitiveKind::Byte => PrimValue::Byte(0),
            PrimitiveKind::Char => PrimValue::Char(0),
            PrimitiveKind::Short => PrimValue::Short(0),
            PrimitiveKind::Int => PrimValue::Int(0),
            PrimitiveKind::Long => PrimValue::Long(0),
            PrimitiveKind::Float => PrimValue::Float(0.0),
            PrimitiveKind::Double => PrimValue::Double(0.0),
        }
    }
}

/// An array value: a declared element type plus shared element storage.
///
/// Arrays are reference values; two `ArrayValue`s are equal only when they share
/// the same storage.
#[derive(Debug, Clone)]
pub struct ArrayValue {
    /// Declared element type of the array
    pub elem: TypeDesc,
    /// Shared element storage
    pub items: Arc<Vec<Value>>,
}

impl ArrayValue {
    /// Create an array of the given element type from the given values.
    ///
    /// The elements are not checked against the declared type here; the coercion
    /// layer does that when an array crosses a typed boundary.
    #[must_use]
    pub fn new(elem: TypeDesc, items: Vec<Value>) -> Self {
        ArrayValue {
            elem,
            items: Arc::new(items),
        }
    }
}

impl PartialEq for ArrayValue {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.items, &other.items)
    }
}

/// A dynamic value passed into or out of reflective dispatch.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// The null reference
    Null,
    /// An unboxed primitive
    Prim(PrimValue),
    /// A boxed primitive (an object wrapping one primitive value)
    Boxed(PrimValue),
    /// A string (content-compared, as interned strings would)
    Str(Arc<str>),
    /// An array reference
    Array(ArrayValue),
    /// A target-object reference
    Object(ObjectRef),
}

impl Value {
    /// The runtime type of this value, or `None` for the null reference.
    #[must_use]
    pub fn type_desc(&self) -> Option<TypeDesc> {
        match self {
            Value::Null => None,
            Value::Prim(p) => Some(TypeDesc::Primitive(p.kind())),
            Value::Boxed(p) => Some(TypeDesc::Boxed(p.kind())),
            Value::Str(_) => Some(TypeDesc::Class("java/lang/String".to_string())),
            Value::Array(a) => Some(TypeDesc::Array(Box::new(a.elem.clone()))),
            Value::Object(obj) => Some(TypeDesc::Class(obj.class().name().to_string())),
        }
    }

    /// The default value for a field slot of the given declared type.
    #[must_use]
    pub fn default_of(desc: &TypeDesc) -> Value {
        match desc {
            TypeDesc::Primitive(kind) => Value::Prim(PrimValue::default_of(*kind)),
            _ => Value::Null,
        }
    }

    /// Convenience string constructor.
    #[must_use]
    pub fn string(s: impl AsRef<str>) -> Value {
        Value::Str(Arc::from(s.as_ref()))
    }

    /// Read this value as an `int`, looking through boxing.
    #[must_use]
    pub fn as_i32(&self) -> Option<i32> {
        match self {
            Value::Prim(PrimValue::Int(v)) | Value::Boxed(PrimValue::Int(v)) => Some(*v),
            _ => None,
        }
    }

    /// Read this value as a `long`, looking through boxing.
    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Prim(PrimValue::Long(v)) | Value::Boxed(PrimValue::Long(v)) => Some(*v),
            _ => None,
        }
    }

    /// Read this value as a `boolean`, looking through boxing.
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Prim(PrimValue::Boolean(v)) | Value::Boxed(PrimValue::Boolean(v)) => Some(*v),
            _ => None,
        }
    }

    /// Read this value as a `double`, looking through boxing.
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Prim(PrimValue::Double(v)) | Value::Boxed(PrimValue::Double(v)) => Some(*v),
            _ => None,
        }
    }

    /// Read this value as a string slice.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Read this value as an object reference.
    #[must_use]
    pub fn as_object(&self) -> Option<&ObjectRef> {
        match self {
            Value::Object(obj) => Some(obj),
            _ => None,
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Prim(PrimValue::Boolean(v))
    }
}

impl From<i8> for Value {
    fn from(v: i8) -> Self {
        Value::Prim(PrimValue::Byte(v))
    }
}

impl From<i16> for Value {
    fn from(v: i16) -> Self {
        Value::Prim(PrimValue::Short(v))
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Prim(PrimValue::Int(v))
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Prim(PrimValue::Long(v))
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::Prim(PrimValue::Float(v))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Prim(PrimValue::Double(v))
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::string(v)
    }
}

impl From<ObjectRef> for Value {
    fn from(v: ObjectRef) -> Self {
        Value::Object(v)
    }
}
