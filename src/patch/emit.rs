//! Straight-line bytecode assembly for forwarder bodies.
//!
//! Every body produced here is branch-free: a sequence of local loads, one or
//! two invocations and a typed return. Branch-free code needs no stack map
//! frames, which keeps the emitted methods verifiable on classfile versions
//! that require them without carrying a frame computer.

use crate::classfile::ConstantPool;
use crate::runtime::{MethodDesc, PrimitiveKind, TypeDesc};
use crate::{Error, Result};

const ILOAD: u8 = 0x15;
const LLOAD: u8 = 0x16;
const FLOAD: u8 = 0x17;
const DLOAD: u8 = 0x18;
const ALOAD: u8 = 0x19;
const IRETURN: u8 = 0xAC;
const LRETURN: u8 = 0xAD;
const FRETURN: u8 = 0xAE;
const DRETURN: u8 = 0xAF;
const ARETURN: u8 = 0xB0;
const RETURN: u8 = 0xB1;
const INVOKEVIRTUAL: u8 = 0xB6;
const INVOKESPECIAL: u8 = 0xB7;
const INVOKESTATIC: u8 = 0xB8;

/// An assembled method body plus its computed frame sizes.
pub(crate) struct Assembled {
    pub code: Vec<u8>,
    pub max_stack: u16,
    pub max_locals: u16,
}

/// How the hook receives the intercepted call.
pub(crate) enum HookShape {
    /// Hook takes the receiver (for instance methods) and every argument
    WithContext,
    /// Hook takes nothing
    Bare,
}

/// Emit one typed local load.
fn load(code: &mut Vec<u8>, ty: &TypeDesc, slot: u16) -> Result<()> {
    let opcode = match ty {
        TypeDesc::Primitive(kind) => match kind {
            PrimitiveKind::Long => LLOAD,
            PrimitiveKind::Float => FLOAD,
            PrimitiveKind::Double => DLOAD,
            _ => ILOAD,
        },
        _ => ALOAD,
    };
    let index = u8::try_from(slot).map_err(|_| {
        Error::TypeError(format!("Local slot {slot} exceeds the single-byte index range"))
    })?;
    code.push(opcode);
    code.push(index);
    Ok(())
}

/// Emit the loads for a receiver (slot 0) and every declared parameter.
fn load_all(code: &mut Vec<u8>, desc: &MethodDesc, is_static: bool) -> Result<u16> {
    let mut slot = 0;
    if !is_static {
        load(code, &TypeDesc::Class(String::new()), 0)?;
        slot = 1;
    }
    for param in &desc.params {
        load(code, param, slot)?;
        slot += param.slot_width();
    }
    Ok(slot)
}

/// Emit the return matching the declared return type.
fn ret(code: &mut Vec<u8>, desc: &MethodDesc) {
    let opcode = match &desc.ret {
        None => RETURN,
        Some(TypeDesc::Primitive(kind)) => match kind {
            PrimitiveKind::Long => LRETURN,
            PrimitiveKind::Float => FRETURN,
            PrimitiveKind::Double => DRETURN,
            _ => IRETURN,
        },
        Some(_) => ARETURN,
    };
    code.push(opcode);
}

fn invoke(code: &mut Vec<u8>, opcode: u8, method_ref: u16) {
    code.push(opcode);
    code.extend_from_slice(&method_ref.to_be_bytes());
}

/// The descriptor of the static hook for a given shape.
pub(crate) fn hook_descriptor(
    owner: &str,
    desc: &MethodDesc,
    is_static: bool,
    shape: &HookShape,
) -> String {
    match shape {
        HookShape::Bare => "()V".to_string(),
        HookShape::WithContext => {
            let mut out = String::from("(");
            if !is_static {
                out.push_str(&format!("L{owner};"));
            }
            for param in &desc.params {
                out.push_str(&param.to_string());
            }
            out.push_str(")V");
            out
        }
    }
}

/// Assemble a forwarder body: call the static hook, then forward every argument
/// to the renamed original and return its result.
///
/// ## Arguments
/// * 'pool' - Constant pool of the class being patched; references are appended
/// * 'owner' - Internal name of the class being patched
/// * 'target_name' - Name the original method was renamed to
/// * 'descriptor' - Original (and forwarder) method descriptor
/// * 'is_static' - Whether the patched method is static
/// * 'is_private' - Whether the patched method is private; the renamed original
///   keeps its access, so a private instance target is forwarded with
///   `invokespecial` rather than `invokevirtual`
/// * 'hook_class' / 'hook_name' - The static hook to invoke first
/// * 'shape' - Whether the hook receives the call context
pub(crate) fn assemble_forwarder(
    pool: &mut ConstantPool,
    owner: &str,
    target_name: &str,
    descriptor: &str,
    is_static: bool,
    is_private: bool,
    hook_class: &str,
    hook_name: &str,
    shape: &HookShape,
) -> Result<Assembled> {
    let desc = MethodDesc::parse(descriptor)?;
    let hook_desc = hook_descriptor(owner, &desc, is_static, shape);
    let hook_ref = pool.find_or_add_method_ref(hook_class, hook_name, &hook_desc);
    let target_ref = pool.find_or_add_method_ref(owner, target_name, descriptor);

    let mut code = Vec::new();
    let call_slots = match shape {
        HookShape::WithContext => load_all(&mut code, &desc, is_static)?,
        HookShape::Bare => 0,
    };
    invoke(&mut code, INVOKESTATIC, hook_ref);

    let forward_slots = load_all(&mut code, &desc, is_static)?;
    let forward_opcode = if is_static {
        INVOKESTATIC
    } else if is_private {
        INVOKESPECIAL
    } else {
        INVOKEVIRTUAL
    };
    invoke(&mut code, forward_opcode, target_ref);
    ret(&mut code, &desc);

    let ret_width = desc.ret.as_ref().map_or(0, TypeDesc::slot_width);
    Ok(Assembled {
        max_stack: call_slots.max(forward_slots).max(ret_width).max(1),
        max_locals: forward_slots.max(1),
        code,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forwarder_shape_for_instance_method() {
        let mut pool = ConstantPool::empty();
        let assembled = assemble_forwarder(
            &mut pool,
            "km",
            "a$gate",
            "(IJ)I",
            false,
            false,
            "hooks/Entry",
            "onCall",
            &HookShape::WithContext,
        )
        .unwrap();

        // aload_0, iload, lload, invokestatic, aload_0, iload, lload,
        // invokevirtual, ireturn
        assert_eq!(assembled.max_locals, 4); // this + int + long(2)
        assert_eq!(assembled.max_stack, 4);
        assert_eq!(*assembled.code.last().unwrap(), IRETURN);
        assert_eq!(assembled.code[0], ALOAD);
        let statics = assembled
            .code
            .iter()
            .filter(|&&op| op == INVOKESTATIC)
            .count();
        assert_eq!(statics, 1);
    }

    #[test]
    fn test_bare_hook_emits_no_leading_loads() {
        let mut pool = ConstantPool::empty();
        let assembled = assemble_forwarder(
            &mut pool,
            "km",
            "b$gate",
            "()V",
            true,
            false,
            "hooks/Entry",
            "onCall",
            &HookShape::Bare,
        )
        .unwrap();

        assert_eq!(assembled.code[0], INVOKESTATIC);
        assert_eq!(*assembled.code.last().unwrap(), RETURN);
    }

    #[test]
    fn test_private_target_forwards_with_invokespecial() {
        let mut pool = ConstantPool::empty();
        let assembled = assemble_forwarder(
            &mut pool,
            "km",
            "c$gate",
            "(I)I",
            false,
            true,
            "hooks/Entry",
            "onCall",
            &HookShape::WithContext,
        )
        .unwrap();

        // The renamed original stays private, so virtual dispatch cannot
        // reach it
        assert!(assembled.code.contains(&INVOKESPECIAL));
        assert!(!assembled.code.contains(&INVOKEVIRTUAL));
    }

    #[test]
    fn test_hook_descriptor_shapes() {
        let desc = MethodDesc::parse("(ILjava/lang/String;)V").unwrap();
        assert_eq!(
            hook_descriptor("km", &desc, false, &HookShape::WithContext),
            "(Lkm;ILjava/lang/String;)V"
        );
        assert_eq!(
            hook_descriptor("km", &desc, true, &HookShape::WithContext),
            "(ILjava/lang/String;)V"
        );
        assert_eq!(hook_descriptor("km", &desc, false, &HookShape::Bare), "()V");
    }
}
