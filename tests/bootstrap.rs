//! End-to-end bootstrap and patching integration tests.
//!
//! These tests run the full startup sequence - load mappings, extract the
//! fixture jar, apply patch units, register the scratch directory - and then
//! verify the patches are observable through the same classpath and registry
//! the rest of the bridge uses.

mod common;

use classgate::prelude::*;
use classgate::Error;

#[test]
fn test_bootstrap_without_patches_reaches_registered() {
    let dir = tempfile::tempdir().unwrap();
    let bridge = common::bootstrap(dir.path());

    assert_eq!(bridge.pipeline_state(), PipelineState::Registered);

    let class = bridge.registry().get_or_define("km").unwrap();
    assert_eq!(class.name(), "km");
    assert_eq!(class.super_name(), Some("java/lang/Object"));
    assert!(class.declared_field("bS").is_some());
}

#[test]
fn test_wrap_patch_is_visible_through_the_registry() {
    let dir = tempfile::tempdir().unwrap();
    let unit = PatchUnit::new(ClassTarget::Logical("DedicatedServer".to_string())).edit(
        PatchEdit::WrapMethod {
            method: MethodTarget::Logical(MethodSignature::new("tick", vec![])),
            hook: HookRef::new("gate/Hooks", "onTick"),
        },
    );
    let bridge = common::bootstrap_with(dir.path(), vec![unit]);

    // The registry reads through the scratch directory, so the renamed
    // original and the synthesized forwarder both appear as declared methods
    let class = bridge.registry().get_or_define("km").unwrap();
    let names: Vec<&str> = class.methods().iter().map(|m| m.name.as_str()).collect();
    assert!(names.contains(&"z"));
    assert!(names.contains(&"z$gate"));
}

#[test]
fn test_patched_classfile_round_trips_through_the_parser() {
    let dir = tempfile::tempdir().unwrap();
    let unit = PatchUnit::new(ClassTarget::Logical("DedicatedServer".to_string()))
        .edit(PatchEdit::AddField {
            name: "gateState".to_string(),
            descriptor: "I".to_string(),
            flags: MemberAccessFlags::PUBLIC,
        })
        .edit(PatchEdit::WrapMethod {
            method: MethodTarget::Logical(MethodSignature::new("tick", vec![])),
            hook: HookRef::new("gate/Hooks", "onTick"),
        });
    let bridge = common::bootstrap_with(dir.path(), vec![unit]);

    let bytes = bridge.classpath().read_class("km").unwrap();
    let classfile = ClassFile::parse(&bytes).unwrap();
    assert!(classfile.find_field("gateState", "I").is_some());
    assert!(classfile.find_method("z$gate", "()").is_some());
    assert!(classfile.find_method("z", "()").is_some());
}

#[test]
fn test_scratch_copy_wins_over_the_jar_copy() {
    let dir = tempfile::tempdir().unwrap();
    let unit =
        PatchUnit::new(ClassTarget::Logical("DedicatedServer".to_string())).edit(PatchEdit::AddField {
            name: "marker".to_string(),
            descriptor: "Z".to_string(),
            flags: MemberAccessFlags::PUBLIC,
        });
    let bridge = common::bootstrap_with(dir.path(), vec![unit]);

    // The jar still holds the pristine copy; resolution must not reach it
    let resolved = bridge.classpath().read_class("km").unwrap();
    let classfile = ClassFile::parse(&resolved).unwrap();
    assert!(classfile.find_field("marker", "Z").is_some());
}

#[test]
fn test_insert_call_keeps_the_original_descriptor() {
    let dir = tempfile::tempdir().unwrap();
    let unit = PatchUnit::new(ClassTarget::Logical("DedicatedServer".to_string())).edit(
        PatchEdit::InsertCall {
            method: MethodTarget::Raw {
                name: "a".to_string(),
                descriptor_prefix: "(I)".to_string(),
            },
            hook: HookRef::new("gate/Hooks", "onGetWorld"),
        },
    );
    let bridge = common::bootstrap_with(dir.path(), vec![unit]);

    let bytes = bridge.classpath().read_class("km").unwrap();
    let classfile = ClassFile::parse(&bytes).unwrap();
    let forwarder = classfile.find_method("a", "(I)").unwrap();
    let renamed = classfile.find_method("a$gate", "(I)").unwrap();
    assert_eq!(
        classfile
            .member_descriptor(&classfile.methods[forwarder])
            .unwrap(),
        "(I)I"
    );
    assert_eq!(
        classfile
            .member_descriptor(&classfile.methods[renamed])
            .unwrap(),
        "(I)I"
    );
}

#[test]
fn test_missing_patch_target_aborts_bootstrap() {
    let dir = tempfile::tempdir().unwrap();
    let jar = common::build_fixture_jar(dir.path());
    let unit = PatchUnit::new(ClassTarget::Logical("DedicatedServer".to_string())).edit(
        PatchEdit::WrapMethod {
            method: MethodTarget::Raw {
                name: "doesNotExist".to_string(),
                descriptor_prefix: "()".to_string(),
            },
            hook: HookRef::new("gate/Hooks", "onNothing"),
        },
    );
    let config = BridgeConfig::new(
        VersionKey::new(common::VERSION),
        common::sample_mappings(),
        jar,
    )
    .patch(unit);

    let err = match Bridge::bootstrap(config) {
        Ok(_) => panic!("bootstrap must fail on a missing patch target"),
        Err(err) => err,
    };
    match err {
        Error::PatchTargetNotFound { class, member } => {
            assert_eq!(class, "DedicatedServer");
            assert!(member.starts_with("doesNotExist"));
        }
        other => panic!("expected PatchTargetNotFound, got {other:?}"),
    }
}

#[test]
fn test_invoke_static_dispatches_without_an_instance() {
    let dir = tempfile::tempdir().unwrap();
    let bridge = common::bootstrap(dir.path());

    bridge.registry().bind_native(
        "km",
        "s",
        "()I",
        std::sync::Arc::new(|instance, _args| {
            assert!(instance.is_none());
            Ok(Value::from(41i32))
        }),
    );

    let result = bridge
        .invoke_static("DedicatedServer", "getInstance", &[])
        .unwrap();
    assert_eq!(result.as_i32(), Some(41));
}

#[test]
fn test_wrapped_method_forwarder_has_straight_line_code() {
    let dir = tempfile::tempdir().unwrap();
    let unit = PatchUnit::new(ClassTarget::Logical("DedicatedServer".to_string())).edit(
        PatchEdit::WrapMethod {
            method: MethodTarget::Logical(MethodSignature::new(
                "getWorld",
                vec!["int".to_string()],
            )),
            hook: HookRef::new("gate/Hooks", "onGetWorld"),
        },
    );
    let bridge = common::bootstrap_with(dir.path(), vec![unit]);

    let bytes = bridge.classpath().read_class("km").unwrap();
    let classfile = ClassFile::parse(&bytes).unwrap();
    let index = classfile.find_method("a", "(I)").unwrap();
    let method = &classfile.methods[index];

    // One Code attribute, ending in ireturn, no branch opcodes
    let code_attr = &method.attributes[0];
    let body = &code_attr.data[8..code_attr.data.len() - 4];
    assert_eq!(*body.last().unwrap(), 0xAC);
    assert!(!body.iter().any(|&op| (0x99..=0xA7).contains(&op)));
}
