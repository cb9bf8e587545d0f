//! Pipeline state machine and failure-path integration tests.
//!
//! The pipeline exists to guarantee ordering - extract, patch, register, all
//! before the first class load - so most of these tests are about what happens
//! when that ordering is violated or a phase fails.

mod common;

use std::sync::Arc;

use classgate::prelude::*;
use classgate::Error;

fn loaded_mappings() -> Arc<MappingTable> {
    Arc::new(
        MappingTable::load(VersionKey::new(common::VERSION), &common::sample_mappings()).unwrap(),
    )
}

#[test]
fn test_phases_must_run_in_order() {
    let dir = tempfile::tempdir().unwrap();
    let jar = common::build_fixture_jar(dir.path());
    let mappings = loaded_mappings();

    let mut pipeline = BytecodePatchPipeline::new(&jar, mappings.clone());
    assert!(matches!(pipeline.patch(), Err(Error::StartupOrder(_))));
    assert!(matches!(
        pipeline.register(&Classpath::new()),
        Err(Error::StartupOrder(_))
    ));

    let mut pipeline = BytecodePatchPipeline::new(&jar, mappings);
    pipeline.extract().unwrap();
    assert_eq!(pipeline.state(), PipelineState::Extracted);
    assert!(matches!(pipeline.extract(), Err(Error::StartupOrder(_))));
    assert!(matches!(
        pipeline.register(&Classpath::new()),
        Err(Error::StartupOrder(_))
    ));
}

#[test]
fn test_units_cannot_be_added_after_extraction() {
    let dir = tempfile::tempdir().unwrap();
    let jar = common::build_fixture_jar(dir.path());
    let mut pipeline = BytecodePatchPipeline::new(&jar, loaded_mappings());
    pipeline.extract().unwrap();

    let unit = PatchUnit::new(ClassTarget::Obfuscated("km".to_string()));
    assert!(matches!(
        pipeline.add_unit(unit),
        Err(Error::StartupOrder(_))
    ));
}

#[test]
fn test_extraction_failure_poisons_the_pipeline() {
    let mut pipeline =
        BytecodePatchPipeline::new("/nonexistent/server.jar", loaded_mappings());
    assert!(pipeline.extract().is_err());
    assert_eq!(pipeline.state(), PipelineState::Failed);

    // A poisoned pipeline makes no further progress
    assert!(matches!(pipeline.patch(), Err(Error::StartupOrder(_))));
    assert!(matches!(pipeline.extract(), Err(Error::StartupOrder(_))));
}

#[test]
fn test_patch_failure_names_class_and_member() {
    let dir = tempfile::tempdir().unwrap();
    let jar = common::build_fixture_jar(dir.path());
    let mut pipeline = BytecodePatchPipeline::new(&jar, loaded_mappings());

    let unit = PatchUnit::new(ClassTarget::Obfuscated("zz".to_string())).edit(PatchEdit::AddField {
        name: "x".to_string(),
        descriptor: "I".to_string(),
        flags: MemberAccessFlags::PUBLIC,
    });
    pipeline.add_unit(unit).unwrap();
    pipeline.extract().unwrap();

    match pipeline.patch() {
        Err(Error::PatchTargetNotFound { class, .. }) => assert_eq!(class, "zz"),
        other => panic!("expected PatchTargetNotFound, got {other:?}"),
    }
    assert_eq!(pipeline.state(), PipelineState::Failed);
}

#[test]
fn test_registration_after_first_load_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let jar = common::build_fixture_jar(dir.path());
    let mut pipeline = BytecodePatchPipeline::new(&jar, loaded_mappings());
    pipeline.extract().unwrap();
    pipeline.patch().unwrap();

    let classpath = Classpath::new();
    classpath.push_jar(&jar).unwrap();
    classpath.read_class("km").unwrap();

    assert!(matches!(
        pipeline.register(&classpath),
        Err(Error::StartupOrder(_))
    ));
}

#[test]
fn test_extraction_preserves_archive_structure() {
    let dir = tempfile::tempdir().unwrap();
    let jar = common::build_fixture_jar(dir.path());
    let mut pipeline = BytecodePatchPipeline::new(&jar, loaded_mappings());
    pipeline.extract().unwrap();

    let scratch = pipeline.scratch().unwrap().path().to_path_buf();
    assert!(scratch.join("km.class").is_file());
    assert!(scratch.join("aqu.class").is_file());
    assert!(scratch.join("aqv.class").is_file());
}

#[test]
fn test_units_apply_in_registration_order() {
    let dir = tempfile::tempdir().unwrap();
    let jar = common::build_fixture_jar(dir.path());
    let mut pipeline = BytecodePatchPipeline::new(&jar, loaded_mappings());

    // The second unit wraps a method the first unit added; order matters
    let add = PatchUnit::new(ClassTarget::Obfuscated("km".to_string())).edit(PatchEdit::AddMethod {
        name: "gateAdded".to_string(),
        descriptor: "()V".to_string(),
        flags: MemberAccessFlags::PUBLIC,
        max_stack: 1,
        max_locals: 1,
        code: vec![0xB1],
    });
    let wrap = PatchUnit::new(ClassTarget::Obfuscated("km".to_string())).edit(PatchEdit::WrapMethod {
        method: MethodTarget::Raw {
            name: "gateAdded".to_string(),
            descriptor_prefix: "()".to_string(),
        },
        hook: HookRef::new("gate/Hooks", "onAdded"),
    });
    pipeline.add_unit(add).unwrap();
    pipeline.add_unit(wrap).unwrap();
    pipeline.extract().unwrap();
    pipeline.patch().unwrap();

    let bytes = std::fs::read(pipeline.scratch().unwrap().path().join("km.class")).unwrap();
    let classfile = ClassFile::parse(&bytes).unwrap();
    assert!(classfile.find_method("gateAdded", "()").is_some());
    assert!(classfile.find_method("gateAdded$gate", "()").is_some());
}
