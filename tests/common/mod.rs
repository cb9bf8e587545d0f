//! Shared fixture construction for the integration tests.
//!
//! Every test runs against the same miniature target: a jar holding three
//! obfuscated classes (`km`, `aqu`, `aqv` - a server class plus a two-level
//! world hierarchy) and one mapping set for release `1.8.1`. The classfiles are
//! synthesized with the crate's own classfile writer, so the fixtures exercise
//! the same serialization path the patch pipeline uses.

#![allow(dead_code)]

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use classgate::prelude::*;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// The one release every test loads; the mapping version guard is process-wide.
pub const VERSION: &str = "1.8.1";

/// Placeholder body for fixture methods; never interpreted as bytecode.
const RETURN_ONLY: &[u8] = &[0xB1];

/// The mapping set matching [`build_fixture_jar`].
pub fn sample_mappings() -> MappingSet {
    MappingSet::builder()
        .class("DedicatedServer", "km")
        .class("World", "aqu")
        .class("WorldServer", "aqv")
        .field("DedicatedServer", "propertyManager", "bS")
        .field("World", "time", "t")
        .method("DedicatedServer", "getMotd()", "m")
        .method("DedicatedServer", "getWorld(int)", "a")
        .method("DedicatedServer", "getWorld(Integer)", "b")
        .method("DedicatedServer", "spawn(int;Integer)", "d")
        .method("DedicatedServer", "spawn(Integer;int)", "e")
        .method("DedicatedServer", "getInstance()", "s")
        .method("DedicatedServer", "tick()", "z")
        .method("World", "getTime()", "K")
        .build()
}

fn server_class() -> ClassFile {
    let mut class = ClassFile::synthesize("km", "java/lang/Object");
    class
        .add_field("bS", "Ljava/lang/Object;", MemberAccessFlags::PRIVATE)
        .unwrap();
    let public = MemberAccessFlags::PUBLIC;
    class
        .add_method("m", "()Ljava/lang/String;", public, 1, 1, RETURN_ONLY)
        .unwrap();
    class
        .add_method("a", "(I)I", public, 1, 2, RETURN_ONLY)
        .unwrap();
    class
        .add_method("b", "(Ljava/lang/Integer;)I", public, 1, 2, RETURN_ONLY)
        .unwrap();
    class
        .add_method("d", "(ILjava/lang/Integer;)V", public, 1, 3, RETURN_ONLY)
        .unwrap();
    class
        .add_method("e", "(Ljava/lang/Integer;I)V", public, 1, 3, RETURN_ONLY)
        .unwrap();
    class
        .add_method(
            "s",
            "()I",
            MemberAccessFlags::PUBLIC | MemberAccessFlags::STATIC,
            1,
            0,
            RETURN_ONLY,
        )
        .unwrap();
    class
        .add_method("z", "()V", public, 1, 1, RETURN_ONLY)
        .unwrap();
    class
}

fn world_class() -> ClassFile {
    let mut class = ClassFile::synthesize("aqu", "java/lang/Object");
    class
        .add_field("t", "J", MemberAccessFlags::PRIVATE)
        .unwrap();
    class
        .add_method("K", "()J", MemberAccessFlags::PUBLIC, 2, 1, RETURN_ONLY)
        .unwrap();
    class
}

fn world_server_class() -> ClassFile {
    ClassFile::synthesize("aqv", "aqu")
}

/// Write the fixture jar into `dir` and return its path.
pub fn build_fixture_jar(dir: &Path) -> PathBuf {
    let jar_path = dir.join("server.jar");
    let file = File::create(&jar_path).unwrap();
    let mut writer = ZipWriter::new(file);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);

    for class in [server_class(), world_class(), world_server_class()] {
        let name = class.class_name().unwrap().to_string();
        writer
            .start_file(format!("{name}.class"), options)
            .unwrap();
        writer.write_all(&class.to_bytes()).unwrap();
    }
    writer.finish().unwrap();
    jar_path
}

/// Bootstrap a bridge over a fresh fixture jar with the given patch units.
pub fn bootstrap_with(dir: &Path, units: Vec<PatchUnit>) -> Bridge {
    let jar = build_fixture_jar(dir);
    let mut config = BridgeConfig::new(VersionKey::new(VERSION), sample_mappings(), jar);
    for unit in units {
        config = config.patch(unit);
    }
    Bridge::bootstrap(config).unwrap()
}

/// Bootstrap a bridge with no patches.
pub fn bootstrap(dir: &Path) -> Bridge {
    bootstrap_with(dir, Vec::new())
}
