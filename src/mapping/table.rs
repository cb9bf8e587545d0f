//! The loaded mapping table and its process-wide version guard.

use std::collections::HashMap;
use std::sync::OnceLock;

use crate::mapping::{MappingEntry, MethodSignature, VersionKey};
use crate::{Error, Result};

/// The version whose mappings this process committed to. Set by the first
/// successful [`MappingTable::load`] and never changed afterwards.
static LOADED_VERSION: OnceLock<VersionKey> = OnceLock::new();

/// An unvalidated collection of mapping entries for one release.
///
/// Built by an external mapping definition source (or the [`MappingSetBuilder`]
/// in embedding code) and handed to [`MappingTable::load`], which validates and
/// indexes it.
#[derive(Debug, Clone, Default)]
pub struct MappingSet {
    entries: Vec<MappingEntry>,
}

impl MappingSet {
    /// Start building a set entry by entry.
    #[must_use]
    pub fn builder() -> MappingSetBuilder {
        MappingSetBuilder {
            entries: Vec::new(),
        }
    }

    /// Wrap already-collected entries.
    #[must_use]
    pub fn from_entries(entries: Vec<MappingEntry>) -> Self {
        MappingSet { entries }
    }

    /// The raw entries, in insertion order.
    #[must_use]
    pub fn entries(&self) -> &[MappingEntry] {
        &self.entries
    }
}

/// Fluent construction of a [`MappingSet`].
///
/// Signature strings are kept raw here and parsed during [`MappingTable::load`],
/// so every validation failure surfaces through one path.
#[derive(Debug)]
pub struct MappingSetBuilder {
    entries: Vec<MappingEntry>,
}

impl MappingSetBuilder {
    /// Add a class mapping.
    #[must_use]
    pub fn class(mut self, logical: &str, obfuscated: &str) -> Self {
        self.entries.push(MappingEntry::Class {
            logical: logical.to_string(),
            obfuscated: obfuscated.to_string(),
        });
        self
    }

    /// Add a field mapping on a logical owner class.
    #[must_use]
    pub fn field(mut self, owner: &str, logical: &str, obfuscated: &str) -> Self {
        self.entries.push(MappingEntry::Field {
            owner: owner.to_string(),
            logical: logical.to_string(),
            obfuscated: obfuscated.to_string(),
        });
        self
    }

    /// Add a method mapping on a logical owner class.
    ///
    /// ## Arguments
    /// * 'owner' - Logical name of the declaring class
    /// * 'signature' - Signature in `name(typeA;typeB)` string form
    /// * 'obfuscated' - Obfuscated method name in this release
    #[must_use]
    pub fn method(mut self, owner: &str, signature: &str, obfuscated: &str) -> Self {
        self.entries.push(MappingEntry::Method {
            owner: owner.to_string(),
            signature: signature.to_string(),
            obfuscated: obfuscated.to_string(),
        });
        self
    }

    /// Finish building.
    #[must_use]
    pub fn build(self) -> MappingSet {
        MappingSet {
            entries: self.entries,
        }
    }
}

/// Immutable, validated lookup table from logical names to the obfuscated names
/// of one target release.
///
/// Loaded exactly once per process: the first successful load pins the
/// [`VersionKey`], and any later load for a *different* key fails. Reloading the
/// same key is permitted and produces an equivalent table. All lookups after
/// construction are read-only, so the table is freely shareable across threads.
#[derive(Debug)]
pub struct MappingTable {
    version: VersionKey,
    classes: HashMap<String, String>,
    classes_rev: HashMap<String, String>,
    fields: HashMap<(String, String), String>,
    methods: HashMap<(String, MethodSignature), String>,
    overloads: HashMap<(String, String), Vec<(MethodSignature, String)>>,
}

impl MappingTable {
    /// Validate and index a mapping set for `version`.
    ///
    /// # Errors
    /// [`Error::MappingLoad`] when the set is empty, a signature string does not
    /// parse, a logical class / field / method signature is defined twice, two
    /// classes share an obfuscated name, a member names an owner class with no
    /// class mapping, or a different version was already loaded in this process.
    pub fn load(version: VersionKey, set: &MappingSet) -> Result<MappingTable> {
        if set.entries().is_empty() {
            return Err(Error::MappingLoad(format!(
                "No mapping data available for version '{version}'"
            )));
        }

        let mut table = MappingTable {
            version: version.clone(),
            classes: HashMap::new(),
            classes_rev: HashMap::new(),
            fields: HashMap::new(),
            methods: HashMap::new(),
            overloads: HashMap::new(),
        };

        // Classes first so member owners can be checked in one pass
        for entry in set.entries() {
            if let MappingEntry::Class {
                logical,
                obfuscated,
            } = entry
            {
                if table.classes.contains_key(logical) {
                    return Err(Error::MappingLoad(format!(
                        "Duplicate class mapping for '{logical}'"
                    )));
                }
                if table.classes_rev.contains_key(obfuscated) {
                    return Err(Error::MappingLoad(format!(
                        "Obfuscated class name '{obfuscated}' is mapped twice"
                    )));
                }
                table
                    .classes
                    .insert(logical.clone(), obfuscated.clone());
                table
                    .classes_rev
                    .insert(obfuscated.clone(), logical.clone());
            }
        }

        for entry in set.entries() {
            match entry {
                MappingEntry::Class { .. } => {}
                MappingEntry::Field {
                    owner,
                    logical,
                    obfuscated,
                } => {
                    if !table.classes.contains_key(owner) {
                        return Err(Error::MappingLoad(format!(
                            "Field '{logical}' names unmapped owner class '{owner}'"
                        )));
                    }
                    let key = (owner.clone(), logical.clone());
                    if table.fields.contains_key(&key) {
                        return Err(Error::MappingLoad(format!(
                            "Duplicate field mapping for '{owner}.{logical}'"
                        )));
                    }
                    table.fields.insert(key, obfuscated.clone());
                }
                MappingEntry::Method {
                    owner,
                    signature,
                    obfuscated,
                } => {
                    if !table.classes.contains_key(owner) {
                        return Err(Error::MappingLoad(format!(
                            "Method '{signature}' names unmapped owner class '{owner}'"
                        )));
                    }
                    let parsed = MethodSignature::parse(signature)?;
                    let key = (owner.clone(), parsed.clone());
                    if table.methods.contains_key(&key) {
                        return Err(Error::MappingLoad(format!(
                            "Duplicate method mapping for '{owner}.{signature}'"
                        )));
                    }
                    table.methods.insert(key, obfuscated.clone());
                    table
                        .overloads
                        .entry((owner.clone(), parsed.name.clone()))
                        .or_default()
                        .push((parsed, obfuscated.clone()));
                }
            }
        }

        // Pin only once the set validated; a rejected load must not commit the
        // process to its version
        let pinned = LOADED_VERSION.get_or_init(|| version.clone());
        if *pinned != version {
            return Err(Error::MappingLoad(format!(
                "Mappings for version '{pinned}' are already loaded, cannot load '{version}'"
            )));
        }

        Ok(table)
    }

    /// The release this table describes.
    #[must_use]
    pub fn version(&self) -> &VersionKey {
        &self.version
    }

    /// The obfuscated internal name of a logical class.
    ///
    /// # Errors
    /// [`Error::UnmappedClass`] when the class has no mapping.
    pub fn resolve_class(&self, logical: &str) -> Result<&str> {
        self.classes
            .get(logical)
            .map(String::as_str)
            .ok_or_else(|| Error::UnmappedClass(logical.to_string()))
    }

    /// The logical name of an obfuscated class, if it is mapped at all.
    #[must_use]
    pub fn logical_class_of(&self, obfuscated: &str) -> Option<&str> {
        self.classes_rev.get(obfuscated).map(String::as_str)
    }

    /// Resolve a name that may be either logical or already obfuscated.
    ///
    /// Diagnostic lookups accept both forms; resolution for dispatch does not.
    #[must_use]
    pub fn resolve_class_or_obfuscated<'a>(&'a self, name: &'a str) -> &'a str {
        self.classes.get(name).map_or(name, String::as_str)
    }

    /// The obfuscated name of a logical field.
    ///
    /// # Errors
    /// [`Error::UnmappedClass`] when the owner class has no mapping,
    /// [`Error::UnmappedSymbol`] when the class is mapped but the field is not.
    pub fn resolve_field(&self, owner: &str, field: &str) -> Result<&str> {
        if !self.classes.contains_key(owner) {
            return Err(Error::UnmappedClass(owner.to_string()));
        }
        self.fields
            .get(&(owner.to_string(), field.to_string()))
            .map(String::as_str)
            .ok_or_else(|| Error::UnmappedSymbol {
                class: owner.to_string(),
                symbol: field.to_string(),
            })
    }

    /// The obfuscated name of a logical method signature.
    ///
    /// # Errors
    /// [`Error::UnmappedClass`] when the owner class has no mapping,
    /// [`Error::UnmappedSymbol`] when the class is mapped but the signature is not.
    pub fn resolve_method(&self, owner: &str, signature: &MethodSignature) -> Result<&str> {
        if !self.classes.contains_key(owner) {
            return Err(Error::UnmappedClass(owner.to_string()));
        }
        self.methods
            .get(&(owner.to_string(), signature.clone()))
            .map(String::as_str)
            .ok_or_else(|| Error::UnmappedSymbol {
                class: owner.to_string(),
                symbol: signature.to_string(),
            })
    }

    /// Every mapped overload of a logical method name on one owner class.
    ///
    /// Returns an empty slice when the name has no mappings; the caller decides
    /// whether that is an error.
    #[must_use]
    pub fn method_overloads(&self, owner: &str, name: &str) -> &[(MethodSignature, String)] {
        self.overloads
            .get(&(owner.to_string(), name.to_string()))
            .map_or(&[], Vec::as_slice)
    }

    /// Convert a logical type name into its JVM type descriptor.
    ///
    /// Handles primitives, trailing `[]` array suffixes, mapped logical classes
    /// (which become their obfuscated descriptor), dotted `java.*` names, and
    /// bare names that fall back to `java.lang`.
    ///
    /// # Errors
    /// [`Error::UnmappedClass`] when a dotted non-`java.*` name has no mapping.
    pub fn type_descriptor(&self, logical: &str) -> Result<String> {
        let mut elem = logical;
        let mut dims = 0usize;
        while let Some(stripped) = elem.strip_suffix("[]") {
            elem = stripped;
            dims += 1;
        }

        let base = match elem {
            "boolean" => "Z".to_string(),
            "byte" => "B".to_string(),
            "char" => "C".to_string(),
            "short" => "S".to_string(),
            "int" => "I".to_string(),
            "long" => "J".to_string(),
            "float" => "F".to_string(),
            "double" => "D".to_string(),
            "void" => "V".to_string(),
            _ => {
                if let Some(obf) = self.classes.get(elem) {
                    format!("L{obf};")
                } else if elem.contains('.') {
                    if elem.starts_with("java.") {
                        format!("L{};", elem.replace('.', "/"))
                    } else {
                        return Err(Error::UnmappedClass(elem.to_string()));
                    }
                } else {
                    // Bare unmapped names resolve against java.lang (String, Object)
                    format!("Ljava/lang/{elem};")
                }
            }
        };

        Ok(format!("{}{}", "[".repeat(dims), base))
    }

    /// The parameter descriptor prefix `(...)` for a logical signature, without
    /// the return type.
    ///
    /// Mapping data does not record return types, so patch targets are located
    /// by this prefix.
    pub fn param_descriptor(&self, signature: &MethodSignature) -> Result<String> {
        let mut out = String::from("(");
        for param in &signature.params {
            out.push_str(&self.type_descriptor(param)?);
        }
        out.push(')');
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Every test in the crate loads version 1.8.1; the pin is process-wide.
    fn sample_set() -> MappingSet {
        MappingSet::builder()
            .class("DedicatedServer", "km")
            .class("World", "aqu")
            .field("DedicatedServer", "propertyManager", "bS")
            .method("DedicatedServer", "getWorld(int)", "a")
            .method("DedicatedServer", "getWorld(String)", "b")
            .method("World", "getTime()", "K")
            .build()
    }

    fn table() -> MappingTable {
        MappingTable::load(VersionKey::new("1.8.1"), &sample_set()).unwrap()
    }

    #[test]
    fn test_class_resolution_both_directions() {
        let table = table();
        assert_eq!(table.resolve_class("DedicatedServer").unwrap(), "km");
        assert_eq!(table.logical_class_of("km"), Some("DedicatedServer"));
        assert_eq!(table.logical_class_of("zz"), None);
        assert!(matches!(
            table.resolve_class("Chunk"),
            Err(Error::UnmappedClass(_))
        ));
    }

    #[test]
    fn test_member_resolution() {
        let table = table();
        assert_eq!(
            table
                .resolve_field("DedicatedServer", "propertyManager")
                .unwrap(),
            "bS"
        );
        let sig = MethodSignature::parse("getWorld(int)").unwrap();
        assert_eq!(table.resolve_method("DedicatedServer", &sig).unwrap(), "a");

        assert!(matches!(
            table.resolve_field("DedicatedServer", "motd"),
            Err(Error::UnmappedSymbol { .. })
        ));
        assert!(matches!(
            table.resolve_field("Chunk", "sections"),
            Err(Error::UnmappedClass(_))
        ));
    }

    #[test]
    fn test_overload_listing() {
        let table = table();
        let overloads = table.method_overloads("DedicatedServer", "getWorld");
        assert_eq!(overloads.len(), 2);
        assert!(table.method_overloads("DedicatedServer", "shutdown").is_empty());
    }

    #[test]
    fn test_reload_same_version_allowed() {
        let _first = table();
        assert!(MappingTable::load(VersionKey::new("1.8.1"), &sample_set()).is_ok());
    }

    #[test]
    fn test_load_different_version_rejected() {
        let _pin = table();
        let result = MappingTable::load(VersionKey::new("1.7.10"), &sample_set());
        assert!(matches!(result, Err(Error::MappingLoad(_))));
    }

    #[test]
    fn test_rejected_load_does_not_pin_its_version() {
        let dangling = MappingSet::builder()
            .class("World", "aqu")
            .field("Chunk", "sections", "c")
            .build();
        let result = MappingTable::load(VersionKey::new("9.9.9-broken"), &dangling);
        assert!(matches!(result, Err(Error::MappingLoad(_))));

        // The failed load must not have committed the process to 9.9.9-broken
        assert!(MappingTable::load(VersionKey::new("1.8.1"), &sample_set()).is_ok());
    }

    #[test]
    fn test_empty_set_rejected() {
        let result = MappingTable::load(VersionKey::new("1.8.1"), &MappingSet::default());
        assert!(matches!(result, Err(Error::MappingLoad(_))));
    }

    #[test]
    fn test_duplicate_and_dangling_entries_rejected() {
        let dup_class = MappingSet::builder()
            .class("World", "aqu")
            .class("World", "aqv")
            .build();
        assert!(MappingTable::load(VersionKey::new("1.8.1"), &dup_class).is_err());

        let dup_obf = MappingSet::builder()
            .class("World", "aqu")
            .class("WorldServer", "aqu")
            .build();
        assert!(MappingTable::load(VersionKey::new("1.8.1"), &dup_obf).is_err());

        let dup_sig = MappingSet::builder()
            .class("World", "aqu")
            .method("World", "getTime()", "K")
            .method("World", "getTime()", "L")
            .build();
        assert!(MappingTable::load(VersionKey::new("1.8.1"), &dup_sig).is_err());

        let dangling = MappingSet::builder()
            .class("World", "aqu")
            .field("Chunk", "sections", "c")
            .build();
        assert!(MappingTable::load(VersionKey::new("1.8.1"), &dangling).is_err());
    }

    #[test]
    fn test_type_descriptors() {
        let table = table();
        assert_eq!(table.type_descriptor("int").unwrap(), "I");
        assert_eq!(table.type_descriptor("World").unwrap(), "Laqu;");
        assert_eq!(table.type_descriptor("String").unwrap(), "Ljava/lang/String;");
        assert_eq!(
            table.type_descriptor("java.util.List").unwrap(),
            "Ljava/util/List;"
        );
        assert_eq!(table.type_descriptor("double[]").unwrap(), "[D");
        assert_eq!(table.type_descriptor("World[][]").unwrap(), "[[Laqu;");
        assert!(table.type_descriptor("com.example.Unknown").is_err());

        let sig = MethodSignature::parse("spawn(World;int;String)").unwrap();
        assert_eq!(
            table.param_descriptor(&sig).unwrap(),
            "(Laqu;ILjava/lang/String;)"
        );
    }
}
