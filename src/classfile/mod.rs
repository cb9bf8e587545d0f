//! Classfile parsing, serialization and structural editing.
//!
//! This module is the bridge's reader/writer for the JVM classfile format: magic and
//! version words, the constant pool, access flags, the field/method tables and the
//! attribute tables. It is used from two directions:
//!
//! - the **class registry** parses classfiles resolved through the classpath to
//!   build its runtime view of a target class (fields, methods, descriptors), and
//! - the **patch pipeline** parses a classfile from the scratch directory, applies
//!   structural edits (add field, add method, rename method) against the in-memory
//!   representation, and serializes the result back over the original file.
//!
//! # Design
//!
//! Only the structures an edit can touch are parsed deeply. Attribute payloads are
//! carried as raw bytes and re-emitted verbatim, so a classfile with attributes
//! this module has never heard of round-trips untouched. Constant pool additions
//! are append-only: existing indices are never renumbered, which is what makes
//! in-place editing safe without rewriting code blobs.
//!
//! # Usage Examples
//!
//! ```rust
//! use classgate::classfile::{ClassFile, MemberAccessFlags};
//!
//! let mut class = ClassFile::synthesize("demo/Widget", "java/lang/Object");
//! class.add_field("count", "I", MemberAccessFlags::PRIVATE)?;
//!
//! let bytes = class.to_bytes();
//! let reparsed = ClassFile::parse(&bytes)?;
//! assert_eq!(reparsed.class_name()?, "demo/Widget");
//! assert!(reparsed.find_field("count", "I").is_some());
//! # Ok::<(), classgate::Error>(())
//! ```

mod parser;

pub use parser::ClassReader;

use bitflags::bitflags;

use crate::Result;

/// Classfile magic number.
pub const MAGIC: u32 = 0xCAFE_BABE;

/// Major version emitted for synthesized classes (Java 8).
///
/// Synthesized and patched method bodies are straight-line code, which pre-50.0
/// verification rules accept without stack map frames.
pub const SYNTHESIZED_MAJOR: u16 = 52;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    /// Field/method access flags in classfile encoding
    pub struct MemberAccessFlags: u16 {
        /// Declared public
        const PUBLIC = 0x0001;
        /// Declared private
        const PRIVATE = 0x0002;
        /// Declared protected
        const PROTECTED = 0x0004;
        /// Declared static
        const STATIC = 0x0008;
        /// Declared final
        const FINAL = 0x0010;
        /// Generated by a tool
        const SYNTHETIC = 0x1000;
    }
}

/// One constant pool entry.
///
/// Indices inside entries refer back into the same pool, exactly as on disk.
#[derive(Debug, Clone, PartialEq)]
pub enum CpEntry {
    /// Tag 1 - UTF-8 string data
    Utf8(String),
    /// Tag 3 - 32-bit integer constant
    Integer(i32),
    /// Tag 4 - 32-bit float constant
    Float(f32),
    /// Tag 5 - 64-bit integer constant (occupies two pool slots)
    Long(i64),
    /// Tag 6 - 64-bit float constant (occupies two pool slots)
    Double(f64),
    /// Tag 7 - class reference
    Class {
        /// Pool index of the class name
        name: u16,
    },
    /// Tag 8 - string constant
    String {
        /// Pool index of the string data
        utf8: u16,
    },
    /// Tag 9 - field reference
    FieldRef {
        /// Pool index of the owning class entry
        class: u16,
        /// Pool index of the name-and-type entry
        name_and_type: u16,
    },
    /// Tag 10 - method reference
    MethodRef {
        /// Pool index of the owning class entry
        class: u16,
        /// Pool index of the name-and-type entry
        name_and_type: u16,
    },
    /// Tag 11 - interface method reference
    InterfaceMethodRef {
        /// Pool index of the owning class entry
        class: u16,
        /// Pool index of the name-and-type entry
        name_and_type: u16,
    },
    /// Tag 12 - name and descriptor pair
    NameAndType {
        /// Pool index of the member name
        name: u16,
        /// Pool index of the member descriptor
        descriptor: u16,
    },
    /// Tag 15 - method handle
    MethodHandle {
        /// Reference kind (1-9)
        kind: u8,
        /// Pool index of the referenced member
        reference: u16,
    },
    /// Tag 16 - method type
    MethodType {
        /// Pool index of the descriptor
        descriptor: u16,
    },
    /// Tag 17 - dynamically-computed constant
    Dynamic {
        /// Index into the bootstrap methods attribute
        bootstrap: u16,
        /// Pool index of the name-and-type entry
        name_and_type: u16,
    },
    /// Tag 18 - dynamically-computed call site
    InvokeDynamic {
        /// Index into the bootstrap methods attribute
        bootstrap: u16,
        /// Pool index of the name-and-type entry
        name_and_type: u16,
    },
    /// Tag 19 - module declaration
    Module {
        /// Pool index of the module name
        name: u16,
    },
    /// Tag 20 - package declaration
    Package {
        /// Pool index of the package name
        name: u16,
    },
}

/// The constant pool: slot 0 is unused and `Long`/`Double` entries occupy two
/// slots, exactly as the format prescribes.
#[derive(Debug, Clone, Default)]
pub struct ConstantPool {
    entries: Vec<Option<CpEntry>>,
}

impl ConstantPool {
    /// A pool containing only the unused slot 0.
    #[must_use]
    pub fn empty() -> Self {
        ConstantPool {
            entries: vec![None],
        }
    }

    /// Number of pool slots including the unused slot 0, as written to disk.
    #[must_use]
    pub fn slot_count(&self) -> u16 {
        u16::try_from(self.entries.len()).unwrap_or(u16::MAX)
    }

    /// Fetch the entry at `index`.
    ///
    /// # Errors
    /// [`Error::Malformed`] for slot 0, out-of-range indices and the phantom second
    /// slot of `Long`/`Double` entries.
    pub fn get(&self, index: u16) -> Result<&CpEntry> {
        self.entries
            .get(index as usize)
            .and_then(Option::as_ref)
            .ok_or_else(|| malformed_error!("Invalid constant pool index {}", index))
    }

    /// Fetch the UTF-8 data at `index`.
    pub fn utf8(&self, index: u16) -> Result<&str> {
        match self.get(index)? {
            CpEntry::Utf8(s) => Ok(s),
            other => Err(malformed_error!(
                "Constant pool index {} holds {:?}, expected Utf8",
                index,
                other
            )),
        }
    }

    /// Resolve a `Class` entry at `index` to its internal name.
    pub fn class_name(&self, index: u16) -> Result<&str> {
        match self.get(index)? {
            CpEntry::Class { name } => self.utf8(*name),
            other => Err(malformed_error!(
                "Constant pool index {} holds {:?}, expected Class",
                index,
                other
            )),
        }
    }

    /// Append an entry, returning its index. `Long`/`Double` also claim the
    /// following phantom slot.
    pub fn push(&mut self, entry: CpEntry) -> u16 {
        let index = u16::try_from(self.entries.len()).unwrap_or(u16::MAX);
        let wide = matches!(entry, CpEntry::Long(_) | CpEntry::Double(_));
        self.entries.push(Some(entry));
        if wide {
            self.entries.push(None);
        }
        index
    }

    /// Index of the given UTF-8 data, appending it if absent.
    pub fn find_or_add_utf8(&mut self, value: &str) -> u16 {
        for (index, entry) in self.entries.iter().enumerate() {
            if let Some(CpEntry::Utf8(existing)) = entry {
                if existing == value {
                    return u16::try_from(index).unwrap_or(u16::MAX);
                }
            }
        }
        self.push(CpEntry::Utf8(value.to_string()))
    }

    /// Index of a `Class` entry for the given internal name, appending if absent.
    pub fn find_or_add_class(&mut self, internal_name: &str) -> u16 {
        for (index, entry) in self.entries.iter().enumerate() {
            if let Some(CpEntry::Class { name }) = entry {
                if self.utf8(*name).map(|n| n == internal_name).unwrap_or(false) {
                    return u16::try_from(index).unwrap_or(u16::MAX);
                }
            }
        }
        let name = self.find_or_add_utf8(internal_name);
        self.push(CpEntry::Class { name })
    }

    /// Index of a `NameAndType` entry, appending if absent.
    pub fn find_or_add_name_and_type(&mut self, name: &str, descriptor: &str) -> u16 {
        let name = self.find_or_add_utf8(name);
        let descriptor = self.find_or_add_utf8(descriptor);
        for (index, entry) in self.entries.iter().enumerate() {
            if let Some(CpEntry::NameAndType {
                name: n,
                descriptor: d,
            }) = entry
            {
                if *n == name && *d == descriptor {
                    return u16::try_from(index).unwrap_or(u16::MAX);
                }
            }
        }
        self.push(CpEntry::NameAndType { name, descriptor })
    }

    /// Index of a `MethodRef` entry for `class.name:descriptor`, appending the
    /// class, name-and-type and reference entries as needed.
    pub fn find_or_add_method_ref(&mut self, class: &str, name: &str, descriptor: &str) -> u16 {
        let class = self.find_or_add_class(class);
        let name_and_type = self.find_or_add_name_and_type(name, descriptor);
        for (index, entry) in self.entries.iter().enumerate() {
            if let Some(CpEntry::MethodRef {
                class: c,
                name_and_type: nat,
            }) = entry
            {
                if *c == class && *nat == name_and_type {
                    return u16::try_from(index).unwrap_or(u16::MAX);
                }
            }
        }
        self.push(CpEntry::MethodRef {
            class,
            name_and_type,
        })
    }
}

/// One attribute, payload kept as raw bytes and re-emitted verbatim.
#[derive(Debug, Clone)]
pub struct AttributeInfo {
    /// Pool index of the attribute name
    pub name_index: u16,
    /// Raw attribute payload
    pub data: Vec<u8>,
}

/// One field or method table entry.
#[derive(Debug, Clone)]
pub struct MemberInfo {
    /// Access flags in classfile encoding
    pub access: u16,
    /// Pool index of the member name
    pub name_index: u16,
    /// Pool index of the member descriptor
    pub descriptor_index: u16,
    /// Member attributes (`Code`, `Signature`, ...), payloads raw
    pub attributes: Vec<AttributeInfo>,
}

/// A parsed classfile, structurally editable and serializable back to bytes.
#[derive(Debug, Clone)]
pub struct ClassFile {
    /// Minor format version
    pub minor_version: u16,
    /// Major format version
    pub major_version: u16,
    /// The constant pool
    pub pool: ConstantPool,
    /// Class access flags in classfile encoding
    pub access: u16,
    /// Pool index of this class
    pub this_class: u16,
    /// Pool index of the superclass, 0 only for `java/lang/Object`
    pub super_class: u16,
    /// Pool indices of directly implemented interfaces
    pub interfaces: Vec<u16>,
    /// Declared fields
    pub fields: Vec<MemberInfo>,
    /// Declared methods
    pub methods: Vec<MemberInfo>,
    /// Class-level attributes, payloads raw
    pub attributes: Vec<AttributeInfo>,
}

impl ClassFile {
    /// Parse a complete classfile.
    ///
    /// # Errors
    /// [`Error::Malformed`] on bad magic or invalid pool structure,
    /// [`Error::OutOfBounds`] on truncation.
    pub fn parse(data: &[u8]) -> Result<ClassFile> {
        let mut reader = ClassReader::new(data);

        let magic = reader.read_u32()?;
        if magic != MAGIC {
            return Err(malformed_error!("Bad classfile magic {:#010x}", magic));
        }
        let minor_version = reader.read_u16()?;
        let major_version = reader.read_u16()?;

        let pool = Self::parse_pool(&mut reader)?;

        let access = reader.read_u16()?;
        let this_class = reader.read_u16()?;
        let super_class = reader.read_u16()?;

        let interface_count = reader.read_u16()?;
        let mut interfaces = Vec::with_capacity(interface_count as usize);
        for _ in 0..interface_count {
            interfaces.push(reader.read_u16()?);
        }

        let fields = Self::parse_members(&mut reader)?;
        let methods = Self::parse_members(&mut reader)?;
        let attributes = Self::parse_attributes(&mut reader)?;

        Ok(ClassFile {
            minor_version,
            major_version,
            pool,
            access,
            this_class,
            super_class,
            interfaces,
            fields,
            methods,
            attributes,
        })
    }

    fn parse_pool(reader: &mut ClassReader<'_>) -> Result<ConstantPool> {
        let slot_count = reader.read_u16()?;
        if slot_count == 0 {
            return Err(malformed_error!("Constant pool slot count of zero"));
        }

        let mut entries: Vec<Option<CpEntry>> = Vec::with_capacity(slot_count as usize);
        entries.push(None);
        while entries.len() < slot_count as usize {
            let tag = reader.read_u8()?;
            let entry = match tag {
                1 => {
                    let len = reader.read_u16()? as usize;
                    let bytes = reader.read_bytes(len)?;
                    CpEntry::Utf8(decode_modified_utf8(bytes)?)
                }
                3 => CpEntry::Integer(reader.read_u32()? as i32),
                4 => CpEntry::Float(f32::from_bits(reader.read_u32()?)),
                5 => CpEntry::Long(reader.read_u64()? as i64),
                6 => CpEntry::Double(f64::from_bits(reader.read_u64()?)),
                7 => CpEntry::Class {
                    name: reader.read_u16()?,
                },
                8 => CpEntry::String {
                    utf8: reader.read_u16()?,
                },
                9 => CpEntry::FieldRef {
                    class: reader.read_u16()?,
                    name_and_type: reader.read_u16()?,
                },
                10 => CpEntry::MethodRef {
                    class: reader.read_u16()?,
                    name_and_type: reader.read_u16()?,
                },
                11 => CpEntry::InterfaceMethodRef {
                    class: reader.read_u16()?,
                    name_and_type: reader.read_u16()?,
                },
                12 => CpEntry::NameAndType {
                    name: reader.read_u16()?,
                    descriptor: reader.read_u16()?,
                },
                15 => CpEntry::MethodHandle {
                    kind: reader.read_u8()?,
                    reference: reader.read_u16()?,
                },
                16 => CpEntry::MethodType {
                    descriptor: reader.read_u16()?,
                },
                17 => CpEntry::Dynamic {
                    bootstrap: reader.read_u16()?,
                    name_and_type: reader.read_u16()?,
                },
                18 => CpEntry::InvokeDynamic {
                    bootstrap: reader.read_u16()?,
                    name_and_type: reader.read_u16()?,
                },
                19 => CpEntry::Module {
                    name: reader.read_u16()?,
                },
                20 => CpEntry::Package {
                    name: reader.read_u16()?,
                },
                other => return Err(malformed_error!("Unknown constant pool tag {}", other)),
            };

            let wide = matches!(entry, CpEntry::Long(_) | CpEntry::Double(_));
            entries.push(Some(entry));
            if wide {
                entries.push(None);
            }
        }

        if entries.len() != slot_count as usize {
            return Err(malformed_error!(
                "Constant pool overran its declared slot count {}",
                slot_count
            ));
        }
        Ok(ConstantPool { entries })
    }

    fn parse_members(reader: &mut ClassReader<'_>) -> Result<Vec<MemberInfo>> {
        let count = reader.read_u16()?;
        let mut members = Vec::with_capacity(count as usize);
        for _ in 0..count {
            let access = reader.read_u16()?;
            let name_index = reader.read_u16()?;
            let descriptor_index = reader.read_u16()?;
            let attributes = Self::parse_attributes(reader)?;
            members.push(MemberInfo {
                access,
                name_index,
                descriptor_index,
                attributes,
            });
        }
        Ok(members)
    }

    fn parse_attributes(reader: &mut ClassReader<'_>) -> Result<Vec<AttributeInfo>> {
        let count = reader.read_u16()?;
        let mut attributes = Vec::with_capacity(count as usize);
        for _ in 0..count {
            let name_index = reader.read_u16()?;
            let len = reader.read_u32()? as usize;
            let data = reader.read_bytes(len)?.to_vec();
            attributes.push(AttributeInfo { name_index, data });
        }
        Ok(attributes)
    }

    /// Serialize back to classfile bytes.
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(1024);
        out.extend_from_slice(&MAGIC.to_be_bytes());
        out.extend_from_slice(&self.minor_version.to_be_bytes());
        out.extend_from_slice(&self.major_version.to_be_bytes());

        out.extend_from_slice(&self.pool.slot_count().to_be_bytes());
        for entry in self.pool.entries.iter().flatten() {
            Self::write_pool_entry(&mut out, entry);
        }

        out.extend_from_slice(&self.access.to_be_bytes());
        out.extend_from_slice(&self.this_class.to_be_bytes());
        out.extend_from_slice(&self.super_class.to_be_bytes());

        out.extend_from_slice(&u16::try_from(self.interfaces.len()).unwrap_or(0).to_be_bytes());
        for interface in &self.interfaces {
            out.extend_from_slice(&interface.to_be_bytes());
        }

        Self::write_members(&mut out, &self.fields);
        Self::write_members(&mut out, &self.methods);
        Self::write_attributes(&mut out, &self.attributes);
        out
    }

    fn write_pool_entry(out: &mut Vec<u8>, entry: &CpEntry) {
        match entry {
            CpEntry::Utf8(s) => {
                let bytes = encode_modified_utf8(s);
                out.push(1);
                out.extend_from_slice(&u16::try_from(bytes.len()).unwrap_or(0).to_be_bytes());
                out.extend_from_slice(&bytes);
            }
            CpEntry::Integer(v) => {
                out.push(3);
                out.extend_from_slice(&v.to_be_bytes());
            }
            CpEntry::Float(v) => {
                out.push(4);
                out.extend_from_slice(&v.to_bits().to_be_bytes());
            }
            CpEntry::Long(v) => {
                out.push(5);
                out.extend_from_slice(&v.to_be_bytes());
            }
            CpEntry::Double(v) => {
                out.push(6);
                out.extend_from_slice(&v.to_bits().to_be_bytes());
            }
            CpEntry::Class { name } => {
                out.push(7);
                out.extend_from_slice(&name.to_be_bytes());
            }
            CpEntry::String { utf8 } => {
                out.push(8);
                out.extend_from_slice(&utf8.to_be_bytes());
            }
            CpEntry::FieldRef {
                class,
                name_and_type,
            } => {
                out.push(9);
                out.extend_from_slice(&class.to_be_bytes());
                out.extend_from_slice(&name_and_type.to_be_bytes());
            }
            CpEntry::MethodRef {
                class,
                name_and_type,
            } => {
                out.push(10);
                out.extend_from_slice(&class.to_be_bytes());
                out.extend_from_slice(&name_and_type.to_be_bytes());
            }
            CpEntry::InterfaceMethodRef {
                class,
                name_and_type,
            } => {
                out.push(11);
                out.extend_from_slice(&class.to_be_bytes());
                out.extend_from_slice(&name_and_type.to_be_bytes());
            }
            CpEntry::NameAndType { name, descriptor } => {
                out.push(12);
                out.extend_from_slice(&name.to_be_bytes());
                out.extend_from_slice(&descriptor.to_be_bytes());
            }
            CpEntry::MethodHandle { kind, reference } => {
                out.push(15);
                out.push(*kind);
                out.extend_from_slice(&reference.to_be_bytes());
            }
            CpEntry::MethodType { descriptor } => {
                out.push(16);
                out.extend_from_slice(&descriptor.to_be_bytes());
            }
            CpEntry::Dynamic {
                bootstrap,
                name_and_type,
            } => {
                out.push(17);
                out.extend_from_slice(&bootstrap.to_be_bytes());
                out.extend_from_slice(&name_and_type.to_be_bytes());
            }
            CpEntry::InvokeDynamic {
                bootstrap,
                name_and_type,
            } => {
                out.push(18);
                out.extend_from_slice(&bootstrap.to_be_bytes());
                out.extend_from_slice(&name_and_type.to_be_bytes());
            }
            CpEntry::Module { name } => {
                out.push(19);
                out.extend_from_slice(&name.to_be_bytes());
            }
            CpEntry::Package { name } => {
                out.push(20);
                out.extend_from_slice(&name.to_be_bytes());
            }
        }
    }

    fn write_members(out: &mut Vec<u8>, members: &[MemberInfo]) {
        out.extend_from_slice(&u16::try_from(members.len()).unwrap_or(0).to_be_bytes());
        for member in members {
            out.extend_from_slice(&member.access.to_be_bytes());
            out.extend_from_slice(&member.name_index.to_be_bytes());
            out.extend_from_slice(&member.descriptor_index.to_be_bytes());
            Self::write_attributes(out, &member.attributes);
        }
    }

    fn write_attributes(out: &mut Vec<u8>, attributes: &[AttributeInfo]) {
        out.extend_from_slice(&u16::try_from(attributes.len()).unwrap_or(0).to_be_bytes());
        for attribute in attributes {
            out.extend_from_slice(&attribute.name_index.to_be_bytes());
            out.extend_from_slice(&u32::try_from(attribute.data.len()).unwrap_or(0).to_be_bytes());
            out.extend_from_slice(&attribute.data);
        }
    }

    /// Build a minimal public class with no members, suitable as a starting point
    /// for synthesized classes and test fixtures.
    #[must_use]
    pub fn synthesize(internal_name: &str, super_internal_name: &str) -> ClassFile {
        let mut pool = ConstantPool::empty();
        let this_class = pool.find_or_add_class(internal_name);
        let super_class = pool.find_or_add_class(super_internal_name);
        ClassFile {
            minor_version: 0,
            major_version: SYNTHESIZED_MAJOR,
            pool,
            access: 0x0021, // public | super
            this_class,
            super_class,
            interfaces: Vec::new(),
            fields: Vec::new(),
            methods: Vec::new(),
            attributes: Vec::new(),
        }
    }

    /// Internal name of this class.
    pub fn class_name(&self) -> Result<&str> {
        self.pool.class_name(self.this_class)
    }

    /// Internal name of the superclass, `None` for the root class.
    pub fn super_class_name(&self) -> Result<Option<&str>> {
        if self.super_class == 0 {
            return Ok(None);
        }
        self.pool.class_name(self.super_class).map(Some)
    }

    /// Name of a field/method table entry.
    pub fn member_name(&self, member: &MemberInfo) -> Result<&str> {
        self.pool.utf8(member.name_index)
    }

    /// Descriptor of a field/method table entry.
    pub fn member_descriptor(&self, member: &MemberInfo) -> Result<&str> {
        self.pool.utf8(member.descriptor_index)
    }

    /// Locate a method by name and descriptor *prefix* (the parenthesized
    /// parameter part), so callers can address a method without knowing its
    /// return type.
    #[must_use]
    pub fn find_method(&self, name: &str, descriptor_prefix: &str) -> Option<usize> {
        self.methods.iter().position(|m| {
            self.member_name(m).map(|n| n == name).unwrap_or(false)
                && self
                    .member_descriptor(m)
                    .map(|d| d.starts_with(descriptor_prefix))
                    .unwrap_or(false)
        })
    }

    /// Locate a field by exact name and descriptor.
    #[must_use]
    pub fn find_field(&self, name: &str, descriptor: &str) -> Option<usize> {
        self.fields.iter().position(|f| {
            self.member_name(f).map(|n| n == name).unwrap_or(false)
                && self
                    .member_descriptor(f)
                    .map(|d| d == descriptor)
                    .unwrap_or(false)
        })
    }

    /// Append a new field.
    ///
    /// # Errors
    /// [`Error::Malformed`] if a field with the same name and descriptor already
    /// exists - patch units must not silently double-apply.
    pub fn add_field(
        &mut self,
        name: &str,
        descriptor: &str,
        access: MemberAccessFlags,
    ) -> Result<()> {
        if self.find_field(name, descriptor).is_some() {
            return Err(malformed_error!(
                "Field '{} {}' already present in '{}'",
                descriptor,
                name,
                self.class_name().unwrap_or("<unknown>")
            ));
        }
        let name_index = self.pool.find_or_add_utf8(name);
        let descriptor_index = self.pool.find_or_add_utf8(descriptor);
        self.fields.push(MemberInfo {
            access: access.bits(),
            name_index,
            descriptor_index,
            attributes: Vec::new(),
        });
        Ok(())
    }

    /// Append a new method with the given straight-line code.
    ///
    /// The `Code` attribute is assembled here; exception and nested attribute
    /// tables stay empty, which is valid for branch-free bodies.
    pub fn add_method(
        &mut self,
        name: &str,
        descriptor: &str,
        access: MemberAccessFlags,
        max_stack: u16,
        max_locals: u16,
        code: &[u8],
    ) -> Result<()> {
        if self.find_method(name, &descriptor[..=descriptor.rfind(')').unwrap_or(0)]).is_some() {
            return Err(malformed_error!(
                "Method '{}{}' already present in '{}'",
                name,
                descriptor,
                self.class_name().unwrap_or("<unknown>")
            ));
        }
        let name_index = self.pool.find_or_add_utf8(name);
        let descriptor_index = self.pool.find_or_add_utf8(descriptor);
        let code_name_index = self.pool.find_or_add_utf8("Code");

        let mut data = Vec::with_capacity(12 + code.len());
        data.extend_from_slice(&max_stack.to_be_bytes());
        data.extend_from_slice(&max_locals.to_be_bytes());
        data.extend_from_slice(&u32::try_from(code.len()).unwrap_or(0).to_be_bytes());
        data.extend_from_slice(code);
        data.extend_from_slice(&0u16.to_be_bytes()); // exception table length
        data.extend_from_slice(&0u16.to_be_bytes()); // attribute count

        self.methods.push(MemberInfo {
            access: access.bits(),
            name_index,
            descriptor_index,
            attributes: vec![AttributeInfo {
                name_index: code_name_index,
                data,
            }],
        });
        Ok(())
    }

    /// Rename the method at `index`, keeping its descriptor, flags and body.
    ///
    /// The old name's pool entry is left in place; pool additions are append-only.
    pub fn rename_method(&mut self, index: usize, new_name: &str) -> Result<()> {
        let name_index = self.pool.find_or_add_utf8(new_name);
        let Some(method) = self.methods.get_mut(index) else {
            return Err(malformed_error!("Method index {} out of range", index));
        };
        method.name_index = name_index;
        Ok(())
    }
}

/// Decode a constant pool Utf8 payload.
///
/// Classfiles store strings in the JVM's modified UTF-8: `U+0000` as the
/// overlong two-byte sequence `C0 80`, and supplementary characters as CESU-8
/// surrogate pairs of three-byte sequences instead of one four-byte sequence.
/// Plain UTF-8 without NUL or supplementary characters is a subset and decodes
/// unchanged.
fn decode_modified_utf8(bytes: &[u8]) -> Result<String> {
    fn continuation(bytes: &[u8], index: usize) -> Result<u32> {
        match bytes.get(index) {
            Some(&b) if b & 0xC0 == 0x80 => Ok(u32::from(b & 0x3F)),
            _ => Err(malformed_error!(
                "Truncated or invalid sequence in constant pool Utf8 entry at byte {}",
                index
            )),
        }
    }

    let mut out = String::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        let a = bytes[i];
        if a & 0x80 == 0 {
            out.push(char::from(a));
            i += 1;
        } else if a & 0xE0 == 0xC0 {
            let b = continuation(bytes, i + 1)?;
            let cp = (u32::from(a & 0x1F) << 6) | b;
            // C0 80 decodes to U+0000 here; the overlong form is the point
            out.push(char::from_u32(cp).ok_or_else(|| {
                malformed_error!("Invalid code point in constant pool Utf8 entry")
            })?);
            i += 2;
        } else if a & 0xF0 == 0xE0 {
            let b = continuation(bytes, i + 1)?;
            let c = continuation(bytes, i + 2)?;
            let cp = (u32::from(a & 0x0F) << 12) | (b << 6) | c;
            if (0xD800..=0xDBFF).contains(&cp) {
                // High surrogate; a low surrogate must follow in its own
                // three-byte sequence
                if bytes.get(i + 3).is_some_and(|&d| d & 0xF0 == 0xE0) {
                    let e = continuation(bytes, i + 4)?;
                    let f = continuation(bytes, i + 5)?;
                    let low = (u32::from(bytes[i + 3] & 0x0F) << 12) | (e << 6) | f;
                    if (0xDC00..=0xDFFF).contains(&low) {
                        let combined = 0x10000 + ((cp - 0xD800) << 10) + (low - 0xDC00);
                        out.push(char::from_u32(combined).ok_or_else(|| {
                            malformed_error!("Invalid code point in constant pool Utf8 entry")
                        })?);
                        i += 6;
                        continue;
                    }
                }
                return Err(malformed_error!(
                    "Unpaired surrogate in constant pool Utf8 entry"
                ));
            }
            if (0xDC00..=0xDFFF).contains(&cp) {
                return Err(malformed_error!(
                    "Unpaired surrogate in constant pool Utf8 entry"
                ));
            }
            out.push(char::from_u32(cp).ok_or_else(|| {
                malformed_error!("Invalid code point in constant pool Utf8 entry")
            })?);
            i += 3;
        } else {
            // Four-byte standard UTF-8 and other lead bytes do not occur in
            // the modified encoding
            return Err(malformed_error!(
                "Invalid lead byte {:#04x} in constant pool Utf8 entry",
                a
            ));
        }
    }
    Ok(out)
}

/// Encode a string as a constant pool Utf8 payload (modified UTF-8).
fn encode_modified_utf8(s: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(s.len());
    for ch in s.chars() {
        let cp = ch as u32;
        match cp {
            0 => out.extend_from_slice(&[0xC0, 0x80]),
            0x01..=0x7F => out.push(cp as u8),
            0x80..=0x7FF => {
                out.push(0xC0 | (cp >> 6) as u8);
                out.push(0x80 | (cp & 0x3F) as u8);
            }
            0x800..=0xFFFF => {
                out.push(0xE0 | (cp >> 12) as u8);
                out.push(0x80 | ((cp >> 6) & 0x3F) as u8);
                out.push(0x80 | (cp & 0x3F) as u8);
            }
            _ => {
                let v = cp - 0x10000;
                for half in [0xD800 + (v >> 10), 0xDC00 + (v & 0x3FF)] {
                    out.push(0xE0 | (half >> 12) as u8);
                    out.push(0x80 | ((half >> 6) & 0x3F) as u8);
                    out.push(0x80 | (half & 0x3F) as u8);
                }
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    #[test]
    fn test_synthesize_and_round_trip() {
        let class = ClassFile::synthesize("demo/Widget", "java/lang/Object");
        let bytes = class.to_bytes();
        let reparsed = ClassFile::parse(&bytes).unwrap();
        assert_eq!(reparsed.class_name().unwrap(), "demo/Widget");
        assert_eq!(
            reparsed.super_class_name().unwrap(),
            Some("java/lang/Object")
        );
        assert_eq!(reparsed.major_version, SYNTHESIZED_MAJOR);
    }

    #[test]
    fn test_add_field_round_trip() {
        let mut class = ClassFile::synthesize("demo/Widget", "java/lang/Object");
        class
            .add_field("count", "I", MemberAccessFlags::PRIVATE)
            .unwrap();
        // Double-apply is rejected
        assert!(class
            .add_field("count", "I", MemberAccessFlags::PRIVATE)
            .is_err());

        let reparsed = ClassFile::parse(&class.to_bytes()).unwrap();
        let index = reparsed.find_field("count", "I").unwrap();
        assert_eq!(
            reparsed.member_name(&reparsed.fields[index]).unwrap(),
            "count"
        );
    }

    #[test]
    fn test_add_method_builds_code_attribute() {
        let mut class = ClassFile::synthesize("demo/Widget", "java/lang/Object");
        class
            .add_method(
                "answer",
                "()I",
                MemberAccessFlags::PUBLIC,
                1,
                1,
                &[0x10, 42, 0xAC], // bipush 42; ireturn
            )
            .unwrap();

        let reparsed = ClassFile::parse(&class.to_bytes()).unwrap();
        let index = reparsed.find_method("answer", "()").unwrap();
        let method = &reparsed.methods[index];
        assert_eq!(reparsed.member_descriptor(method).unwrap(), "()I");
        assert_eq!(method.attributes.len(), 1);
        assert_eq!(
            reparsed.pool.utf8(method.attributes[0].name_index).unwrap(),
            "Code"
        );
    }

    #[test]
    fn test_rename_method() {
        let mut class = ClassFile::synthesize("demo/Widget", "java/lang/Object");
        class
            .add_method("tick", "()V", MemberAccessFlags::PUBLIC, 0, 1, &[0xB1])
            .unwrap();
        let index = class.find_method("tick", "()").unwrap();
        class.rename_method(index, "tick$gate").unwrap();

        let reparsed = ClassFile::parse(&class.to_bytes()).unwrap();
        assert!(reparsed.find_method("tick", "()").is_none());
        assert!(reparsed.find_method("tick$gate", "()").is_some());
    }

    #[test]
    fn test_wide_pool_entries_round_trip() {
        let mut class = ClassFile::synthesize("demo/Widget", "java/lang/Object");
        let long_index = class.pool.push(CpEntry::Long(0x1234_5678_9ABC_DEF0));
        let after = class.pool.push(CpEntry::Utf8("marker".to_string()));
        assert_eq!(after, long_index + 2); // Long claims two slots

        let reparsed = ClassFile::parse(&class.to_bytes()).unwrap();
        assert_eq!(
            reparsed.pool.get(long_index).unwrap(),
            &CpEntry::Long(0x1234_5678_9ABC_DEF0)
        );
        assert!(reparsed.pool.get(long_index + 1).is_err());
        assert_eq!(reparsed.pool.utf8(after).unwrap(), "marker");
    }

    #[test]
    fn test_bad_magic_rejected() {
        assert!(matches!(
            ClassFile::parse(&[0xDE, 0xAD, 0xBE, 0xEF, 0, 0, 0, 52]),
            Err(Error::Malformed { .. })
        ));
    }

    #[test]
    fn test_modified_utf8_round_trips_nul_and_supplementary() {
        // NUL and U+1D11E (musical G clef) both have non-standard encodings
        let text = "a\u{0}b\u{1D11E}c";
        let mut class = ClassFile::synthesize("demo/Widget", "java/lang/Object");
        let index = class.pool.find_or_add_utf8(text);

        let bytes = class.to_bytes();
        let reparsed = ClassFile::parse(&bytes).unwrap();
        assert_eq!(reparsed.pool.utf8(index).unwrap(), text);

        // NUL is the overlong C0 80 pair; the supplementary character is a
        // surrogate pair of three-byte sequences, never a 4-byte lead
        assert!(bytes.windows(2).any(|w| w == [0xC0, 0x80]));
        assert!(!bytes.contains(&0xF0));
    }

    #[test]
    fn test_mutf8_overlong_nul_and_surrogate_pair_decode() {
        assert_eq!(decode_modified_utf8(&[0xC0, 0x80]).unwrap(), "\u{0}");
        assert_eq!(
            decode_modified_utf8(&[0xED, 0xA0, 0xB4, 0xED, 0xB4, 0x9E]).unwrap(),
            "\u{1D11E}"
        );
        // An unpaired high surrogate is invalid
        assert!(decode_modified_utf8(&[0xED, 0xA0, 0xB4]).is_err());
        // So is a standard 4-byte UTF-8 sequence
        assert!(decode_modified_utf8("\u{1D11E}".as_bytes()).is_err());
    }
}
