//! Patch units: declarative classfile edits.

use crate::classfile::{ClassFile, MemberAccessFlags};
use crate::mapping::{MappingTable, MethodSignature};
use crate::patch::emit::{self, HookShape};
use crate::{Error, Result};

/// Suffix appended to an original method's name when a forwarder replaces it.
pub const RENAME_SUFFIX: &str = "$gate";

/// The class a patch unit targets.
#[derive(Debug, Clone)]
pub enum ClassTarget {
    /// A logical class name, resolved through the mapping table at patch time
    Logical(String),
    /// An already-obfuscated internal name, used verbatim
    Obfuscated(String),
}

impl ClassTarget {
    /// The internal name of the targeted class.
    pub(crate) fn internal_name<'a>(&'a self, mappings: &'a MappingTable) -> Result<&'a str> {
        match self {
            ClassTarget::Logical(logical) => mappings.resolve_class(logical),
            ClassTarget::Obfuscated(name) => Ok(name),
        }
    }

    /// The name as written, for error reporting.
    pub(crate) fn display_name(&self) -> &str {
        match self {
            ClassTarget::Logical(name) | ClassTarget::Obfuscated(name) => name,
        }
    }
}

/// The method a wrap/insert edit targets within the class.
#[derive(Debug, Clone)]
pub enum MethodTarget {
    /// Logical signature, resolved through the mapping table; requires the
    /// enclosing [`ClassTarget::Logical`]
    Logical(MethodSignature),
    /// Raw method name plus parameter descriptor prefix (`(I)` form, return
    /// type omitted)
    Raw {
        /// Method name as it appears in the classfile
        name: String,
        /// Parenthesized parameter descriptor, without return type
        descriptor_prefix: String,
    },
}

/// A static method the emitted forwarder invokes.
#[derive(Debug, Clone)]
pub struct HookRef {
    /// Internal name of the class declaring the hook
    pub class: String,
    /// Name of the static hook method
    pub name: String,
}

impl HookRef {
    /// Reference a static hook method.
    #[must_use]
    pub fn new(class: impl Into<String>, name: impl Into<String>) -> Self {
        HookRef {
            class: class.into(),
            name: name.into(),
        }
    }
}

/// One edit applied to the targeted classfile.
#[derive(Debug, Clone)]
pub enum PatchEdit {
    /// Append a field
    AddField {
        /// Field name
        name: String,
        /// Field descriptor
        descriptor: String,
        /// Access flags
        flags: MemberAccessFlags,
    },
    /// Append a method with a pre-assembled straight-line body
    AddMethod {
        /// Method name
        name: String,
        /// Full method descriptor
        descriptor: String,
        /// Access flags
        flags: MemberAccessFlags,
        /// Operand stack budget
        max_stack: u16,
        /// Local variable budget
        max_locals: u16,
        /// Straight-line body bytes
        code: Vec<u8>,
    },
    /// Rename the target method and replace it with a forwarder that passes the
    /// receiver and arguments to the hook before running the original
    WrapMethod {
        /// The method to wrap
        method: MethodTarget,
        /// Static hook receiving the call context
        hook: HookRef,
    },
    /// Rename the target method and replace it with a forwarder that notifies
    /// the hook (no arguments) before running the original
    InsertCall {
        /// The method to instrument
        method: MethodTarget,
        /// Static hook invoked with no arguments
        hook: HookRef,
    },
}

/// An ordered batch of edits against one class.
///
/// Units are registered on the pipeline before extraction and applied in
/// registration order; edits within a unit apply in list order to one in-memory
/// classfile, so a later edit sees the effect of an earlier one.
#[derive(Debug, Clone)]
pub struct PatchUnit {
    target: ClassTarget,
    edits: Vec<PatchEdit>,
}

impl PatchUnit {
    /// A unit with no edits yet.
    #[must_use]
    pub fn new(target: ClassTarget) -> Self {
        PatchUnit {
            target,
            edits: Vec::new(),
        }
    }

    /// Append an edit.
    #[must_use]
    pub fn edit(mut self, edit: PatchEdit) -> Self {
        self.edits.push(edit);
        self
    }

    /// The class this unit targets.
    #[must_use]
    pub fn target(&self) -> &ClassTarget {
        &self.target
    }

    /// Apply every edit, in order, to the parsed classfile.
    pub(crate) fn apply(&self, classfile: &mut ClassFile, mappings: &MappingTable) -> Result<()> {
        for edit in &self.edits {
            match edit {
                PatchEdit::AddField {
                    name,
                    descriptor,
                    flags,
                } => classfile.add_field(name, descriptor, *flags)?,
                PatchEdit::AddMethod {
                    name,
                    descriptor,
                    flags,
                    max_stack,
                    max_locals,
                    code,
                } => classfile.add_method(name, descriptor, *flags, *max_stack, *max_locals, code)?,
                PatchEdit::WrapMethod { method, hook } => {
                    self.rewrite(classfile, mappings, method, hook, &HookShape::WithContext)?;
                }
                PatchEdit::InsertCall { method, hook } => {
                    self.rewrite(classfile, mappings, method, hook, &HookShape::Bare)?;
                }
            }
        }
        Ok(())
    }

    /// The rename-and-forward rewrite shared by wrap and insert edits.
    fn rewrite(
        &self,
        classfile: &mut ClassFile,
        mappings: &MappingTable,
        method: &MethodTarget,
        hook: &HookRef,
        shape: &HookShape,
    ) -> Result<()> {
        let (name, prefix) = self.locate(mappings, method)?;
        let Some(index) = classfile.find_method(&name, &prefix) else {
            return Err(Error::PatchTargetNotFound {
                class: self.target.display_name().to_string(),
                member: format!("{name}{prefix}"),
            });
        };

        let descriptor = classfile
            .member_descriptor(&classfile.methods[index])?
            .to_string();
        let access = MemberAccessFlags::from_bits_truncate(classfile.methods[index].access);
        let is_static = access.contains(MemberAccessFlags::STATIC);
        let is_private = access.contains(MemberAccessFlags::PRIVATE);
        let owner = classfile.class_name()?.to_string();

        let renamed = format!("{name}{RENAME_SUFFIX}");
        if classfile.find_method(&renamed, &prefix).is_some() {
            return Err(malformed_error!(
                "Method '{}' in '{}' was already rewritten",
                name,
                owner
            ));
        }
        classfile.rename_method(index, &renamed)?;

        let assembled = emit::assemble_forwarder(
            &mut classfile.pool,
            &owner,
            &renamed,
            &descriptor,
            is_static,
            is_private,
            &hook.class,
            &hook.name,
            shape,
        )?;
        classfile.add_method(
            &name,
            &descriptor,
            access,
            assembled.max_stack,
            assembled.max_locals,
            &assembled.code,
        )
    }

    /// Resolve the method target to a classfile-level name and parameter prefix.
    fn locate(
        &self,
        mappings: &MappingTable,
        method: &MethodTarget,
    ) -> Result<(String, String)> {
        match method {
            MethodTarget::Raw {
                name,
                descriptor_prefix,
            } => Ok((name.clone(), descriptor_prefix.clone())),
            MethodTarget::Logical(signature) => {
                let ClassTarget::Logical(logical_class) = &self.target else {
                    return Err(Error::PatchTargetNotFound {
                        class: self.target.display_name().to_string(),
                        member: format!(
                            "{signature} (logical signature on a non-logical class target)"
                        ),
                    });
                };
                let name = mappings.resolve_method(logical_class, signature)?.to_string();
                let prefix = mappings.param_descriptor(signature)?;
                Ok((name, prefix))
            }
        }
    }
}
