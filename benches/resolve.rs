//! Benchmarks for name resolution and dispatch.
//!
//! Covers the hot paths of the bridge:
//! - Logical signature and JVM descriptor parsing
//! - Mapping table lookups
//! - Classfile parsing
//! - Reflective invocation, cold (fresh cache) and warm (cached resolution)

extern crate classgate;

use criterion::{criterion_group, criterion_main, Criterion};
use std::hint::black_box;
use std::sync::Arc;

use classgate::classpath::Classpath;
use classgate::mapping::{MappingSet, MappingTable, MethodSignature, VersionKey};
use classgate::prelude::*;
use classgate::reflect::ReflectiveInvoker;
use classgate::runtime::{ClassRegistry, MethodDesc, Value};

fn mappings() -> MappingSet {
    MappingSet::builder()
        .class("DedicatedServer", "km")
        .method("DedicatedServer", "getWorld(int)", "a")
        .method("DedicatedServer", "getWorld(Integer)", "b")
        .method("DedicatedServer", "getMotd()", "m")
        .field("DedicatedServer", "propertyManager", "bS")
        .build()
}

fn table() -> Arc<MappingTable> {
    Arc::new(MappingTable::load(VersionKey::new("1.8.1"), &mappings()).unwrap())
}

fn server_class_bytes() -> Vec<u8> {
    let mut class = ClassFile::synthesize("km", "java/lang/Object");
    class
        .add_field("bS", "Ljava/lang/Object;", MemberAccessFlags::PRIVATE)
        .unwrap();
    class
        .add_method("a", "(I)I", MemberAccessFlags::PUBLIC, 1, 2, &[0xB1])
        .unwrap();
    class
        .add_method(
            "b",
            "(Ljava/lang/Integer;)I",
            MemberAccessFlags::PUBLIC,
            1,
            2,
            &[0xB1],
        )
        .unwrap();
    class
        .add_method(
            "m",
            "()Ljava/lang/String;",
            MemberAccessFlags::PUBLIC,
            1,
            1,
            &[0xB1],
        )
        .unwrap();
    class.to_bytes()
}

/// Registry over a directory classpath holding the benchmark class.
fn registry(dir: &std::path::Path) -> Arc<ClassRegistry> {
    std::fs::write(dir.join("km.class"), server_class_bytes()).unwrap();
    let classpath = Arc::new(Classpath::new());
    classpath.push_dir(dir);
    Arc::new(ClassRegistry::new(classpath))
}

/// Benchmark parsing the logical signature string form.
fn bench_signature_parse(c: &mut Criterion) {
    c.bench_function("signature_parse", |b| {
        b.iter(|| {
            let sig = MethodSignature::parse(black_box("teleport(double;double;double)")).unwrap();
            black_box(sig)
        });
    });
}

/// Benchmark parsing a JVM method descriptor.
fn bench_descriptor_parse(c: &mut Criterion) {
    c.bench_function("descriptor_parse", |b| {
        b.iter(|| {
            let desc =
                MethodDesc::parse(black_box("(ILjava/lang/String;[J)Ljava/lang/Object;")).unwrap();
            black_box(desc)
        });
    });
}

/// Benchmark a loaded-table method lookup.
fn bench_mapping_resolve(c: &mut Criterion) {
    let table = table();
    let sig = MethodSignature::parse("getWorld(int)").unwrap();

    c.bench_function("mapping_resolve_method", |b| {
        b.iter(|| {
            let obf = table.resolve_method(black_box("DedicatedServer"), &sig).unwrap();
            black_box(obf)
        });
    });
}

/// Benchmark parsing a complete classfile.
fn bench_classfile_parse(c: &mut Criterion) {
    let bytes = server_class_bytes();

    c.bench_function("classfile_parse", |b| {
        b.iter(|| {
            let class = ClassFile::parse(black_box(&bytes)).unwrap();
            black_box(class)
        });
    });
}

/// Benchmark a warm invocation: resolution cached, dispatch only.
fn bench_invoke_warm(c: &mut Criterion) {
    let dir = tempfile::tempdir().unwrap();
    let registry = registry(dir.path());
    registry.bind_native("km", "a", "(I)I", Arc::new(|_, _| Ok(Value::from(1i32))));

    let invoker = ReflectiveInvoker::new(table(), registry.clone());
    let class = registry.get_or_define("km").unwrap();
    let instance = registry.instantiate(&class);
    let args = [Value::from(5i32)];
    invoker.invoke(&instance, "getWorld", &args).unwrap();

    c.bench_function("invoke_warm", |b| {
        b.iter(|| {
            let result = invoker
                .invoke(black_box(&instance), "getWorld", &args)
                .unwrap();
            black_box(result)
        });
    });
}

/// Benchmark a cold resolution: fresh cache every iteration.
fn bench_resolve_cold(c: &mut Criterion) {
    let dir = tempfile::tempdir().unwrap();
    let registry = registry(dir.path());
    registry.bind_native("km", "a", "(I)I", Arc::new(|_, _| Ok(Value::from(1i32))));

    let table = table();
    let class = registry.get_or_define("km").unwrap();
    let instance = registry.instantiate(&class);
    let args = [Value::from(5i32)];

    c.bench_function("resolve_cold", |b| {
        b.iter(|| {
            let invoker = ReflectiveInvoker::new(table.clone(), registry.clone());
            let result = invoker
                .invoke(black_box(&instance), "getWorld", &args)
                .unwrap();
            black_box(result)
        });
    });
}

criterion_group!(
    benches,
    bench_signature_parse,
    bench_descriptor_parse,
    bench_mapping_resolve,
    bench_classfile_parse,
    bench_invoke_warm,
    bench_resolve_cold,
);
criterion_main!(benches);
