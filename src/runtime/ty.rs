//! JVM type descriptor grammar.
//!
//! This module provides the [`crate::runtime::TypeDesc`] and [`crate::runtime::MethodDesc`]
//! types, the parsed form of the field and method descriptors found in classfiles
//! (`I`, `Ljava/lang/String;`, `[I`, `(IJ)V`). Every other part of the bridge that has to
//! reason about types - overload matching, argument coercion, patch emission - works on
//! these parsed descriptors rather than on raw descriptor strings.
//!
//! # Architecture
//!
//! The parser is a single forward pass over the descriptor characters with no
//! backtracking. Two deliberate normalizations happen at parse time:
//!
//! - **Boxed wrappers are first-class** - `Ljava/lang/Integer;` parses to
//!   [`TypeDesc::Boxed`], not to a plain class reference, so the primitive/boxed
//!   distinction the compatibility rules depend on is a structural property of the
//!   parsed type and never needs string comparison afterwards.
//! - **Class names stay in internal form** - slash-separated binary names, exactly as
//!   they appear in the constant pool.
//!
//! # Usage Examples
//!
//! ```rust
//! use classgate::runtime::{MethodDesc, PrimitiveKind, TypeDesc};
//!
//! let desc = TypeDesc::parse("[Ljava/lang/Integer;")?;
//! assert_eq!(desc, TypeDesc::Array(Box::new(TypeDesc::Boxed(PrimitiveKind::Int))));
//!
//! let m = MethodDesc::parse("(IJ)V")?;
//! assert_eq!(m.params.len(), 2);
//! assert!(m.ret.is_none());
//! # Ok::<(), classgate::Error>(())
//! ```

use std::fmt;

use crate::{Error, Result};

/// The eight JVM primitive kinds.
///
/// `void` is not a kind; a `void` return is represented as `None` in
/// [`MethodDesc::ret`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveKind {
    /// `boolean` / `Z`
    Boolean,
    /// `byte` / `B`
    Byte,
    /// `char` / `C`
    Char,
    /// `short` / `S`
    Short,
    /// `int` / `I`
    Int,
    /// `long` / `J`
    Long,
    /// `float` / `F`
    Float,
    /// `double` / `D`
    Double,
}

impl PrimitiveKind {
    /// Descriptor character for this primitive (`I`, `J`, ...).
    #[must_use]
    pub fn descriptor(self) -> char {
        match self {
            PrimitiveKind::Boolean => 'Z',
            PrimitiveKind::Byte => 'B',
            PrimitiveKind::Char => 'C',
            PrimitiveKind::Short => 'S',
            PrimitiveKind::Int => 'I',
            PrimitiveKind::Long => 'J',
            PrimitiveKind::Float => 'F',
            PrimitiveKind::Double => 'D',
        }
    }

    /// Primitive kind for a descriptor character, if it denotes one.
    #[must_use]
    pub fn from_descriptor(c: char) -> Option<Self> {
        match c {
            'Z' => Some(PrimitiveKind::Boolean),
            'B' => Some(PrimitiveKind::Byte),
            'C' => Some(PrimitiveKind::Char),
            'S' => Some(PrimitiveKind::Short),
            'I' => Some(PrimitiveKind::Int),
            'J' => Some(PrimitiveKind::Long),
            'F' => Some(PrimitiveKind::Float),
            'D' => Some(PrimitiveKind::Double),
            _ => None,
        }
    }

    /// Internal name of the boxed wrapper class for this primitive.
    #[must_use]
    pub fn boxed_class(self) -> &'static str {
        match self {
            PrimitiveKind::Boolean => "java/lang/Boolean",
            PrimitiveKind::Byte => "java/lang/Byte",
            PrimitiveKind::Char => "java/lang/Character",
            PrimitiveKind::Short => "java/lang/Short",
            PrimitiveKind::Int => "java/lang/Integer",
            PrimitiveKind::Long => "java/lang/Long",
            PrimitiveKind::Float => "java/lang/Float",
            PrimitiveKind::Double => "java/lang/Double",
        }
    }

    /// Primitive kind for a boxed wrapper class internal name, if it is one.
    #[must_use]
    pub fn from_boxed_class(name: &str) -> Option<Self> {
        match name {
            "java/lang/Boolean" => Some(PrimitiveKind::Boolean),
            "java/lang/Byte" => Some(PrimitiveKind::Byte),
            "java/lang/Character" => Some(PrimitiveKind::Char),
            "java/lang/Short" => Some(PrimitiveKind::Short),
            "java/lang/Integer" => Some(PrimitiveKind::Int),
            "java/lang/Long" => Some(PrimitiveKind::Long),
            "java/lang/Float" => Some(PrimitiveKind::Float),
            "java/lang/Double" => Some(PrimitiveKind::Double),
            _ => None,
        }
    }

    /// Source-level name of this primitive (`int`, `boolean`, ...), as used in
    /// logical method signatures.
    #[must_use]
    pub fn logical_name(self) -> &'static str {
        match self {
            PrimitiveKind::Boolean => "boolean",
            PrimitiveKind::Byte => "byte",
            PrimitiveKind::Char => "char",
            PrimitiveKind::Short => "short",
            PrimitiveKind::Int => "int",
            PrimitiveKind::Long => "long",
            PrimitiveKind::Float => "float",
            PrimitiveKind::Double => "double",
        }
    }

    /// Primitive kind for a source-level name, if it denotes one.
    #[must_use]
    pub fn from_logical_name(name: &str) -> Option<Self> {
        match name {
            "boolean" => Some(PrimitiveKind::Boolean),
            "byte" => Some(PrimitiveKind::Byte),
            "char" => Some(PrimitiveKind::Char),
            "short" => Some(PrimitiveKind::Short),
            "int" => Some(PrimitiveKind::Int),
            "long" => Some(PrimitiveKind::Long),
            "float" => Some(PrimitiveKind::Float),
            "double" => Some(PrimitiveKind::Double),
            _ => None,
        }
    }

    /// Whether values of this kind occupy two local/stack slots.
    #[must_use]
    pub fn is_wide(self) -> bool {
        matches!(self, PrimitiveKind::Long | PrimitiveKind::Double)
    }
}

impl fmt::Display for PrimitiveKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.logical_name())
    }
}

/// A parsed JVM field type descriptor.
///
/// Boxed wrapper classes are canonicalized to [`TypeDesc::Boxed`] at parse time;
/// [`TypeDesc::Class`] therefore never holds a wrapper class name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeDesc {
    /// An unboxed primitive (`I`, `Z`, ...)
    Primitive(PrimitiveKind),
    /// A boxed wrapper class (`Ljava/lang/Integer;`, ...)
    Boxed(PrimitiveKind),
    /// Any other class reference, by internal (slash-separated) name
    Class(String),
    /// An array of the contained element type
    Array(Box<TypeDesc>),
}

impl TypeDesc {
    /// Parse a complete field descriptor.
    ///
    /// ## Arguments
    /// * 'desc' - The descriptor string, e.g. `"[Ljava/lang/String;"`
    ///
    /// # Errors
    /// [`Error::TypeError`] if the descriptor is empty, truncated, or has trailing
    /// characters.
    pub fn parse(desc: &str) -> Result<TypeDesc> {
        let bytes = desc.as_bytes();
        let (parsed, consumed) = Self::parse_at(bytes, 0)?;
        if consumed != bytes.len() {
            return Err(Error::TypeError(format!(
                "Trailing characters in type descriptor '{desc}'"
            )));
        }
        Ok(parsed)
    }

    /// Parse one field descriptor starting at `pos`, returning the parsed type and
    /// the position one past its end.
    pub(crate) fn parse_at(bytes: &[u8], pos: usize) -> Result<(TypeDesc, usize)> {
        let Some(&c) = bytes.get(pos) else {
            return Err(Error::TypeError("Truncated type descriptor".to_string()));
        };
        if let Some(kind) = PrimitiveKind::from_descriptor(c as char) {
            return Ok((TypeDesc::Primitive(kind), pos + 1));
        }
        match c {
            b'[' => {
                let (elem, end) = Self::parse_at(bytes, pos + 1)?;
                Ok((TypeDesc::Array(Box::new(elem)), end))
            }
            b'L' => {
                let Some(semi) = bytes[pos..].iter().position(|&b| b == b';') else {
                    return Err(Error::TypeError(
                        "Unterminated class reference in type descriptor".to_string(),
                    ));
                };
                let name = std::str::from_utf8(&bytes[pos + 1..pos + semi]).map_err(|_| {
                    Error::TypeError("Non-UTF8 class name in type descriptor".to_string())
                })?;
                let desc = match PrimitiveKind::from_boxed_class(name) {
                    Some(kind) => TypeDesc::Boxed(kind),
                    None => TypeDesc::Class(name.to_string()),
                };
                Ok((desc, pos + semi + 1))
            }
            other => Err(Error::TypeError(format!(
                "Invalid type descriptor character '{}'",
                other as char
            ))),
        }
    }

    /// Whether this is a reference type (anything but an unboxed primitive).
    #[must_use]
    pub fn is_reference(&self) -> bool {
        !matches!(self, TypeDesc::Primitive(_))
    }

    /// Number of local/stack slots a value of this type occupies.
    #[must_use]
    pub fn slot_width(&self) -> u16 {
        match self {
            TypeDesc::Primitive(kind) if kind.is_wide() => 2,
            _ => 1,
        }
    }

    /// Internal class name of this type when it is a reference to a class,
    /// including the wrapper class of a boxed primitive.
    #[must_use]
    pub fn class_name(&self) -> Option<&str> {
        match self {
            TypeDesc::Boxed(kind) => Some(kind.boxed_class()),
            TypeDesc::Class(name) => Some(name),
            _ => None,
        }
    }
}

impl fmt::Display for TypeDesc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeDesc::Primitive(kind) => write!(f, "{}", kind.descriptor()),
            TypeDesc::Boxed(kind) => write!(f, "L{};", kind.boxed_class()),
            TypeDesc::Class(name) => write!(f, "L{name};"),
            TypeDesc::Array(elem) => write!(f, "[{elem}"),
        }
    }
}

/// A parsed JVM method descriptor: ordered parameter types plus a return type.
///
/// A `void` return is `None`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MethodDesc {
    /// Ordered parameter types
    pub params: Vec<TypeDesc>,
    /// Return type; `None` for `void`
    pub ret: Option<TypeDesc>,
}

impl MethodDesc {
    /// Parse a complete method descriptor such as `"(ILjava/lang/String;)V"`.
    ///
    /// # Errors
    /// [`Error::TypeError`] if the descriptor is not a well-formed method descriptor.
    pub fn parse(desc: &str) -> Result<MethodDesc> {
        let bytes = desc.as_bytes();
        if bytes.first() != Some(&b'(') {
            return Err(Error::TypeError(format!(
                "Method descriptor '{desc}' does not start with '('"
            )));
        }

        let mut params = Vec::new();
        let mut pos = 1;
        loop {
            match bytes.get(pos) {
                Some(b')') => {
                    pos += 1;
                    break;
                }
                Some(_) => {
                    let (param, end) = TypeDesc::parse_at(bytes, pos)?;
                    params.push(param);
                    pos = end;
                }
                None => {
                    return Err(Error::TypeError(format!(
                        "Unterminated parameter list in method descriptor '{desc}'"
                    )))
                }
            }
        }

        let ret = if bytes.get(pos) == Some(&b'V') {
            pos += 1;
            None
        } else {
            let (ret, end) = TypeDesc::parse_at(bytes, pos)?;
            pos = end;
            Some(ret)
        };

        if pos != bytes.len() {
            return Err(Error::TypeError(format!(
                "Trailing characters in method descriptor '{desc}'"
            )));
        }
        Ok(MethodDesc { params, ret })
    }

    /// The raw descriptor string, e.g. `"(IJ)V"`.
    #[must_use]
    pub fn descriptor(&self) -> String {
        format!("{self}")
    }

    /// Just the parenthesized parameter part of the descriptor, e.g. `"(IJ)"`.
    ///
    /// Patch units locate methods by this prefix so they do not need to know the
    /// return type of the member they target.
    #[must_use]
    pub fn param_descriptor(&self) -> String {
        let mut out = String::from("(");
        for param in &self.params {
            out.push_str(&param.to_string());
        }
        out.push(')');
        out
    }

    /// Total number of local slots the parameters occupy (wide primitives count
    /// twice), not including a receiver slot.
    #[must_use]
    pub fn param_slots(&self) -> u16 {
        self.params.iter().map(TypeDesc::slot_width).sum()
    }
}

impl fmt::Display for MethodDesc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.param_descriptor())?;
        match &self.ret {
            Some(ret) => write!(f, "{ret}"),
            None => f.write_str("V"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_primitives() {
        for (desc, kind) in [
            ("Z", PrimitiveKind::Boolean),
            ("B", PrimitiveKind::Byte),
            ("C", PrimitiveKind::Char),
            ("S", PrimitiveKind::Short),
            ("I", PrimitiveKind::Int),
            ("J", PrimitiveKind::Long),
            ("F", PrimitiveKind::Float),
            ("D", PrimitiveKind::Double),
        ] {
            assert_eq!(TypeDesc::parse(desc).unwrap(), TypeDesc::Primitive(kind));
        }
    }

    #[test]
    fn test_boxed_canonicalization() {
        assert_eq!(
            TypeDesc::parse("Ljava/lang/Integer;").unwrap(),
            TypeDesc::Boxed(PrimitiveKind::Int)
        );
        assert_eq!(
            TypeDesc::parse("Ljava/lang/String;").unwrap(),
            TypeDesc::Class("java/lang/String".to_string())
        );
        // Display round-trips through the wrapper class name
        assert_eq!(
            TypeDesc::Boxed(PrimitiveKind::Int).to_string(),
            "Ljava/lang/Integer;"
        );
    }

    #[test]
    fn test_parse_arrays() {
        assert_eq!(
            TypeDesc::parse("[[I").unwrap(),
            TypeDesc::Array(Box::new(TypeDesc::Array(Box::new(TypeDesc::Primitive(
                PrimitiveKind::Int
            )))))
        );
        assert_eq!(TypeDesc::parse("[[I").unwrap().to_string(), "[[I");
    }

    #[test]
    fn test_parse_method_descriptors() {
        let m = MethodDesc::parse("(ILjava/lang/String;[J)Ljava/lang/Object;").unwrap();
        assert_eq!(m.params.len(), 3);
        assert_eq!(m.param_descriptor(), "(ILjava/lang/String;[J)");
        assert_eq!(m.descriptor(), "(ILjava/lang/String;[J)Ljava/lang/Object;");
        assert_eq!(m.param_slots(), 3); // int + string ref + array ref, one slot each

        let v = MethodDesc::parse("()V").unwrap();
        assert!(v.params.is_empty());
        assert!(v.ret.is_none());
    }

    #[test]
    fn test_malformed_descriptors() {
        assert!(TypeDesc::parse("").is_err());
        assert!(TypeDesc::parse("Ljava/lang/String").is_err());
        assert!(TypeDesc::parse("II").is_err());
        assert!(TypeDesc::parse("Q").is_err());
        assert!(MethodDesc::parse("I)V").is_err());
        assert!(MethodDesc::parse("(I").is_err());
        assert!(MethodDesc::parse("(I)VV").is_err());
    }
}
