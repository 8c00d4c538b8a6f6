//! End-to-end tests: input directories in, per-version and unified models out.

use ofschema::config::CompileOptions;
use ofschema::error::{Error, ModelError, UnificationError};
use ofschema::pipeline::{self, discover_input_files, Compilation};
use ofschema::unified::UnifiedEntity;
use ofschema::{OFMember, OFVersion};
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

fn write(dir: &Path, name: &str, text: &str) {
    fs::write(dir.join(name), text).expect("write input");
}

fn options(input: &Path, out: &Path) -> CompileOptions {
    CompileOptions {
        input_dir: input.to_path_buf(),
        install_dir: out.to_path_buf(),
        ..CompileOptions::default()
    }
}

fn shipped_inputs() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("openflow_input")
}

const HELLO_10: &str = "1.0\n1\nstruct of_hello {\n    uint8_t version;\n    uint8_t type;\n    uint16_t length;\n    uint32_t xid;\n};\n";
const HELLO_13: &str = "OF_VERSION_1_3\n4\nstruct of_hello {\n    uint8_t version;\n    uint8_t type;\n    uint16_t length;\n    uint32_t xid;\n};\n";

#[test]
fn identical_class_in_two_versions() {
    let dir = tempfile::tempdir().expect("tempdir");
    write(dir.path(), "a", HELLO_10);
    write(dir.path(), "b", HELLO_13);
    let c = Compilation::build(&options(dir.path(), dir.path())).expect("build");
    let model = c.unified();

    assert_eq!(model.names().collect::<Vec<_>>(), vec!["of_hello"]);
    let hello = model.entity("of_hello").and_then(UnifiedEntity::as_class).expect("class");
    assert_eq!(hello.versions().collect::<Vec<_>>(), vec![OFVersion::V1_0, OFVersion::V1_3]);
    assert!(hello.is_uniform());
    let m10 = model.class("of_hello", OFVersion::V1_0).expect("1.0").members();
    let m13 = model.class("of_hello", OFVersion::V1_3).expect("1.3").members();
    assert_eq!(m10, m13);
    assert_eq!(m10.len(), 4);
    assert!(matches!(m10[2], OFMember::Length { .. }));
}

#[test]
fn divergent_class_keeps_each_layout() {
    let dir = tempfile::tempdir().expect("tempdir");
    write(dir.path(), "a", "1.0\n1\nstruct s { uint8_t a; uint8_t b; };\n");
    write(dir.path(), "b", "1.3\n4\nstruct s { uint8_t a; uint8_t b; uint16_t c; };\n");
    let c = Compilation::build(&options(dir.path(), dir.path())).expect("build");
    let model = c.unified();

    let s = model.entity("s").expect("entity");
    assert_eq!(s.versions(), vec![OFVersion::V1_0, OFVersion::V1_3]);
    assert!(!s.as_class().expect("class").is_uniform());

    let names = |v| -> Vec<String> {
        model
            .class("s", v)
            .expect("class")
            .members()
            .iter()
            .filter_map(|m| m.name().map(str::to_string))
            .collect()
    };
    assert_eq!(names(OFVersion::V1_0), vec!["a", "b"]);
    assert_eq!(names(OFVersion::V1_3), vec!["a", "b", "c"]);
}

#[test]
fn missing_wire_header_fails_with_file_name() {
    let dir = tempfile::tempdir().expect("tempdir");
    let input = dir.path().join("in");
    let out = dir.path().join("out");
    fs::create_dir(&input).expect("mkdir");
    write(&input, "good", HELLO_10);
    write(&input, "no-wire-header", "1.0\nstruct s { uint8_t a; };\n");

    let err = pipeline::run(&options(&input, &out)).unwrap_err();
    assert_eq!(err.file(), Some("no-wire-header"));
    assert!(matches!(err, Error::Parse { .. }));
    assert!(!err.is_internal());
    assert!(!out.exists());
}

#[test]
fn backup_and_hidden_files_are_ignored() {
    let dir = tempfile::tempdir().expect("tempdir");
    write(dir.path(), "b", HELLO_13);
    write(dir.path(), "a", HELLO_10);
    write(dir.path(), "a~", "garbage");
    write(dir.path(), ".swp", "garbage");
    fs::create_dir(dir.path().join("subdir")).expect("mkdir");

    let files = discover_input_files(dir.path()).expect("discover");
    let names: Vec<_> = files
        .iter()
        .map(|p| p.file_name().expect("name").to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, vec!["a", "b"]);
    assert!(Compilation::build(&options(dir.path(), dir.path())).is_ok());
}

#[test]
fn target_versions_filter_the_build() {
    let dir = tempfile::tempdir().expect("tempdir");
    write(dir.path(), "a", HELLO_10);
    write(dir.path(), "b", HELLO_13);
    let mut opts = options(dir.path(), dir.path());
    opts.target_versions = BTreeSet::from([OFVersion::V1_3]);
    let c = Compilation::build(&opts).expect("build");
    assert_eq!(c.unified().versions().collect::<Vec<_>>(), vec![OFVersion::V1_3]);
    assert!(c.protocol(OFVersion::V1_0).is_none());
}

#[test]
fn conflicting_definitions_within_a_version() {
    let dir = tempfile::tempdir().expect("tempdir");
    write(dir.path(), "a", "1.0\n1\nstruct s { uint8_t a; };\n");
    write(dir.path(), "b", "1.0\n1\nstruct s { uint16_t a; };\n");
    let err = Compilation::build(&options(dir.path(), dir.path())).unwrap_err();
    match err {
        Error::Model {
            version,
            source: ModelError::ConflictingClass { name, first, second },
        } => {
            assert_eq!(version, OFVersion::V1_0);
            assert_eq!(name, "s");
            assert_eq!((first.as_str(), second.as_str()), ("a", "b"));
        }
        other => panic!("unexpected error: {}", other),
    }
}

#[test]
fn unresolved_reference_is_a_model_error() {
    let dir = tempfile::tempdir().expect("tempdir");
    write(dir.path(), "a", "1.3\n4\nstruct s { of_missing_t m; };\n");
    let err = Compilation::build(&options(dir.path(), dir.path())).unwrap_err();
    assert!(matches!(err, Error::Model { source: ModelError::UnresolvedType { .. }, .. }));
    assert!(err.file().is_none());
}

#[test]
fn unification_errors_are_internal() {
    let err = Error::from(UnificationError::DuplicateEntity {
        version: OFVersion::V1_0,
        name: "x".into(),
    });
    assert!(err.is_internal());
    assert!(err.to_string().starts_with("internal error"));
}

#[test]
fn shipped_inputs_build() {
    let out = tempfile::tempdir().expect("tempdir");
    let c = Compilation::build(&options(&shipped_inputs(), out.path())).expect("build");
    let model = c.unified();
    assert_eq!(
        model.versions().collect::<Vec<_>>(),
        vec![OFVersion::V1_0, OFVersion::V1_3]
    );

    // Shared declarations keep one definition per version; divergent ones differ.
    let header = model.entity("of_header").and_then(UnifiedEntity::as_class).expect("of_header");
    assert!(header.is_uniform());
    assert!(header.get(OFVersion::V1_0).expect("1.0").is_virtual);
    let hello = model.entity("of_hello").and_then(UnifiedEntity::as_class).expect("of_hello");
    assert!(!hello.is_uniform());

    // Version-specific entities are kept.
    assert_eq!(model.entity("of_action_set_vlan_vid").expect("1.0 only").versions(), vec![OFVersion::V1_0]);
    assert_eq!(model.entity("of_action_group").expect("1.3 only").versions(), vec![OFVersion::V1_3]);

    // Synthesized list classes.
    let list = model.class("of_list_action", OFVersion::V1_0).expect("of_list_action");
    assert!(list.is_list());
    assert!(list.needs_length_prefix());
    assert_eq!(list.element_type().map(|t| t.to_string()).as_deref(), Some("of_action"));
    assert!(model.class("of_list_uint32", OFVersion::V1_3).is_some());
    assert!(model.class("of_list_uint32", OFVersion::V1_0).is_none());
}

#[test]
fn unified_model_shares_per_version_definitions() {
    let out = tempfile::tempdir().expect("tempdir");
    let c = Compilation::build(&options(&shipped_inputs(), out.path())).expect("build");
    let model = c.unified();
    for version in [OFVersion::V1_0, OFVersion::V1_3] {
        let protocol = model.protocol(version).expect("protocol");
        for (name, class) in &protocol.classes {
            let entity = model.entity(name).and_then(UnifiedEntity::as_class).expect("entity");
            assert!(Arc::ptr_eq(&entity.by_version[&version], class), "{} {}", name, version);
        }
        for name in protocol.enums.keys() {
            assert!(model.enum_(name, version).is_some());
        }
    }
}

#[test]
fn fixed_layouts_and_offsets() {
    let out = tempfile::tempdir().expect("tempdir");
    let c = Compilation::build(&options(&shipped_inputs(), out.path())).expect("build");

    let p10 = c.protocol(OFVersion::V1_0).expect("1.0");
    let p13 = c.protocol(OFVersion::V1_3).expect("1.3");

    let header = p10.class("of_header").expect("of_header");
    assert_eq!(p10.offsets(header), vec![Some(0), Some(1), Some(2), Some(4)]);
    assert_eq!(p10.fixed_size(header), Some(8));

    assert_eq!(p10.fixed_size(p10.class("of_port_desc").expect("port")), Some(48));
    assert_eq!(p13.fixed_size(p13.class("of_port_desc").expect("port")), Some(64));
    assert_eq!(p10.fixed_size(p10.class("of_action_output").expect("output")), Some(8));
    assert_eq!(p13.fixed_size(p13.class("of_action_output").expect("output")), Some(16));

    let packet_out = p10.class("of_packet_out").expect("packet_out");
    assert!(packet_out.needs_length_prefix());
    assert!(packet_out.has_length_member());
    assert_eq!(p10.fixed_size(packet_out), None);
    let offsets = p10.offsets(packet_out);
    assert_eq!(
        &offsets[..8],
        &[Some(0), Some(1), Some(2), Some(4), Some(8), Some(12), Some(14), Some(16)]
    );
    assert_eq!(offsets[8], None);
}

#[test]
fn dump_backend_writes_one_file_per_version() {
    let out = tempfile::tempdir().expect("tempdir");
    let target = out.path().join("dump");
    let c = pipeline::run(&options(&shipped_inputs(), &target)).expect("run");
    assert_eq!(c.unified().versions().count(), 2);

    let unified = fs::read_to_string(target.join("unified.txt")).expect("unified.txt");
    assert!(unified.starts_with("# versions: 1.0 1.3\n"));
    assert!(unified.contains("\nclass of_header [1.0 1.3]\n"));
    assert!(unified.contains("\nclass of_hello [1.0 1.3] varies\n"));
    assert!(unified.contains("\nenum ofp_hello_elem_type [1.3]\n"));

    let v10 = fs::read_to_string(target.join("1.0.txt")).expect("1.0.txt");
    assert!(v10.starts_with("# OpenFlow 1.0 (wire version 1)\n"));
    assert!(v10.contains("class of_packet_out : of_header length-prefixed\n"));
    assert!(v10.contains("uint16_t actions_len (length of actions)"));
    assert!(target.join("1.3.txt").is_file());
}

#[test]
fn unknown_backend_writes_nothing() {
    let dir = tempfile::tempdir().expect("tempdir");
    let out = dir.path().join("out");
    let mut opts = options(&shipped_inputs(), &out);
    opts.lang = "cobol".into();
    let err = pipeline::run(&opts).unwrap_err();
    assert!(matches!(err, Error::UnknownBackend(ref id) if id == "cobol"));
    assert!(!out.exists());
}
