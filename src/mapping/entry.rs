//! Mapping entries and logical method signatures.

use std::fmt;

use crate::{Error, Result};

/// Identifies one target-binary release, and therefore which mapping set is
/// active for the process.
///
/// Chosen once at startup and immutable for the process lifetime.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VersionKey(String);

impl VersionKey {
    /// Wrap a release identifier such as `"1.8.1"`.
    #[must_use]
    pub fn new(version: impl Into<String>) -> Self {
        VersionKey(version.into())
    }

    /// The raw release identifier.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VersionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for VersionKey {
    fn from(version: &str) -> Self {
        VersionKey::new(version)
    }
}

/// A logical method signature: a name plus ordered logical parameter type names.
///
/// Overloads share a name and differ in parameters. The string form is
/// `name(typeA;typeB)` - parameter types separated by semicolons, an empty pair
/// of parentheses for a niladic method - matching the form mapping definition
/// sources use.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MethodSignature {
    /// Logical method name
    pub name: String,
    /// Ordered logical parameter type names (`int`, `String`, `World[]`, ...)
    pub params: Vec<String>,
}

impl MethodSignature {
    /// Build a signature from parts.
    #[must_use]
    pub fn new(name: impl Into<String>, params: Vec<String>) -> Self {
        MethodSignature {
            name: name.into(),
            params,
        }
    }

    /// Parse the string form `name(typeA;typeB)`.
    ///
    /// # Errors
    /// [`Error::MappingLoad`] when the parentheses are missing or malformed.
    pub fn parse(signature: &str) -> Result<MethodSignature> {
        let Some(open) = signature.find('(') else {
            return Err(Error::MappingLoad(format!(
                "Method signature '{signature}' is missing its parameter list"
            )));
        };
        if !signature.ends_with(')') || open == 0 {
            return Err(Error::MappingLoad(format!(
                "Method signature '{signature}' is malformed"
            )));
        }

        let name = &signature[..open];
        let param_list = &signature[open + 1..signature.len() - 1];
        let params = if param_list.is_empty() {
            Vec::new()
        } else {
            param_list.split(';').map(str::to_string).collect()
        };

        if params.iter().any(String::is_empty) {
            return Err(Error::MappingLoad(format!(
                "Method signature '{signature}' has an empty parameter type"
            )));
        }
        Ok(MethodSignature::new(name, params))
    }

    /// Number of parameters.
    #[must_use]
    pub fn arity(&self) -> usize {
        self.params.len()
    }
}

impl fmt::Display for MethodSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.name, self.params.join(";"))
    }
}

/// One already-parsed mapping fact, as produced by an external mapping
/// definition source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MappingEntry {
    /// Maps a logical class name to its obfuscated internal name
    Class {
        /// Stable, human-chosen class name
        logical: String,
        /// Obfuscated internal name in this release
        obfuscated: String,
    },
    /// Maps a logical field name on a logical owner class
    Field {
        /// Logical name of the owning class
        owner: String,
        /// Stable field name
        logical: String,
        /// Obfuscated field name in this release
        obfuscated: String,
    },
    /// Maps a logical method signature on a logical owner class
    Method {
        /// Logical name of the owning class
        owner: String,
        /// Signature in `name(typeA;typeB)` string form, parsed at load
        signature: String,
        /// Obfuscated method name in this release
        obfuscated: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signature_string_form_round_trip() {
        let sig = MethodSignature::parse("teleport(double;double;double)").unwrap();
        assert_eq!(sig.name, "teleport");
        assert_eq!(sig.params, vec!["double", "double", "double"]);
        assert_eq!(sig.to_string(), "teleport(double;double;double)");

        let niladic = MethodSignature::parse("getWorld()").unwrap();
        assert_eq!(niladic.arity(), 0);
        assert_eq!(niladic.to_string(), "getWorld()");
    }

    #[test]
    fn test_malformed_signatures() {
        assert!(MethodSignature::parse("noParens").is_err());
        assert!(MethodSignature::parse("(int)").is_err());
        assert!(MethodSignature::parse("f(int;)").is_err());
        assert!(MethodSignature::parse("f(int").is_err());
    }
}
