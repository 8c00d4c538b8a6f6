//! Reference codec against the shipped OpenFlow inputs: literal wire buffers, the
//! length-prefix property and round trips in both directions.

use ofschema::codec::{Codec, CodecError};
use ofschema::config::CompileOptions;
use ofschema::pipeline::{self, Compilation};
use ofschema::{Object, OFVersion, Value};
use std::collections::BTreeSet;
use std::io::Cursor;
use std::path::PathBuf;

fn compilation() -> Compilation {
    let opts = CompileOptions {
        input_dir: PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("openflow_input"),
        ..CompileOptions::default()
    };
    Compilation::build(&opts).expect("build shipped inputs")
}

/// Encode, compare with the literal, decode the literal back and compare again.
fn check(codec: &Codec, obj: &Object, expected: &[u8]) {
    let bytes = codec.encode(obj).expect("encode");
    assert_eq!(bytes, expected, "{}", obj.show());
    let decoded = codec.decode_bytes(&obj.class, expected).expect("decode");
    assert_eq!(&decoded, obj);
    assert_eq!(codec.encode(&decoded).expect("re-encode"), expected);
}

fn hello_10() -> Object {
    Object::new("of_hello").with("version", 1u8).with("xid", 0x12345678u32)
}

#[test]
fn hello_10_wire_format() {
    let c = compilation();
    let codec = Codec::new(c.protocol(OFVersion::V1_0).expect("1.0"));
    check(&codec, &hello_10(), &[0x01, 0x00, 0x00, 0x08, 0x12, 0x34, 0x56, 0x78]);
    assert_eq!(hello_10().show(), "of_hello {\n  version = 0x1\n  xid = 0x12345678\n}");
}

#[test]
fn echo_request_carries_octets() {
    let c = compilation();
    let codec = Codec::new(c.protocol(OFVersion::V1_0).expect("1.0"));
    let obj = Object::new("of_echo_request")
        .with("version", 1u8)
        .with("xid", 1u32)
        .with("data", vec![0xabu8, 0xcd]);
    check(
        &codec,
        &obj,
        &[0x01, 0x02, 0x00, 0x0a, 0x00, 0x00, 0x00, 0x01, 0xab, 0xcd],
    );
    assert_eq!(
        obj.show(),
        "of_echo_request {\n  version = 0x1\n  xid = 0x1\n  data = 'ab cd'\n}"
    );
}

#[test]
fn packet_out_with_actions() {
    let c = compilation();
    let codec = Codec::new(c.protocol(OFVersion::V1_0).expect("1.0"));
    let output = Object::new("of_action_output").with("port", 2u16).with("max_len", 0u16);
    let strip = Object::new("of_action_strip_vlan");
    let obj = Object::new("of_packet_out")
        .with("version", 1u8)
        .with("xid", 0x10u32)
        .with("buffer_id", 0xffffffffu32)
        .with("in_port", 0xfffdu16)
        .with("actions", vec![Value::from(output), Value::from(strip)])
        .with("data", vec![0x42u8]);
    #[rustfmt::skip]
    let expected: &[u8] = &[
        0x01, 0x0d, 0x00, 0x21, 0x00, 0x00, 0x00, 0x10,
        0xff, 0xff, 0xff, 0xff,
        0xff, 0xfd,
        0x00, 0x10,
        0x00, 0x00, 0x00, 0x08, 0x00, 0x02, 0x00, 0x00,
        0x00, 0x03, 0x00, 0x08, 0x00, 0x00, 0x00, 0x00,
        0x42,
    ];
    check(&codec, &obj, expected);
}

#[test]
fn packet_out_13_has_its_own_layout() {
    let c = compilation();
    let codec = Codec::new(c.protocol(OFVersion::V1_3).expect("1.3"));
    let group = Object::new("of_action_group").with("group_id", 7u32);
    let obj = Object::new("of_packet_out")
        .with("version", 4u8)
        .with("xid", 2u32)
        .with("buffer_id", 0xffffffffu32)
        .with("in_port", 0xfffffffdu32)
        .with("actions", vec![Value::from(group)])
        .with("data", Vec::<u8>::new());
    #[rustfmt::skip]
    let expected: &[u8] = &[
        0x04, 0x0d, 0x00, 0x20, 0x00, 0x00, 0x00, 0x02,
        0xff, 0xff, 0xff, 0xff,
        0xff, 0xff, 0xff, 0xfd,
        0x00, 0x08,
        0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
        0x00, 0x16, 0x00, 0x08, 0x00, 0x00, 0x00, 0x07,
    ];
    check(&codec, &obj, expected);
}

#[test]
fn hello_13_with_version_bitmap() {
    let c = compilation();
    let codec = Codec::new(c.protocol(OFVersion::V1_3).expect("1.3"));
    let bitmap = Object::new("of_hello_elem_versionbitmap").with(
        "bitmaps",
        vec![Value::from(Object::new("of_uint32").with("value", 0x12u32))],
    );
    let obj = Object::new("of_hello")
        .with("version", 4u8)
        .with("xid", 1u32)
        .with("elements", vec![Value::from(bitmap)]);
    check(
        &codec,
        &obj,
        &[
            0x04, 0x00, 0x00, 0x10, 0x00, 0x00, 0x00, 0x01, 0x00, 0x01, 0x00, 0x08, 0x00, 0x00, 0x00, 0x12,
        ],
    );
    let expected = "\
of_hello {
  version = 0x4
  xid = 0x1
  elements = [
    of_hello_elem_versionbitmap {
      bitmaps = [
        of_uint32 {
          value = 0x12
        }
      ]
    }
  ]
}";
    assert_eq!(obj.show(), expected);
}

#[test]
fn length_member_equals_encoded_length() {
    let c = compilation();
    let codec = Codec::new(c.protocol(OFVersion::V1_0).expect("1.0"));
    let mut name = b"eth0".to_vec();
    name.resize(16, 0);
    let port = |no: u16| {
        Object::new("of_port_desc")
            .with("port_no", no)
            .with("hw_addr", vec![0x00u8, 0x11, 0x22, 0x33, 0x44, no as u8])
            .with("name", name.clone())
            .with("config", 0x1u32)
            .with("state", 0u32)
            .with("curr", 0u32)
            .with("advertised", 0u32)
            .with("supported", 0u32)
            .with("peer", 0u32)
    };
    for n in 0..3u16 {
        let ports: Vec<Value> = (1..=n).map(|i| Value::from(port(i))).collect();
        let obj = Object::new("of_features_reply")
            .with("version", 1u8)
            .with("xid", 2u32)
            .with("datapath_id", 1u64)
            .with("n_buffers", 256u32)
            .with("n_tables", 1u8)
            .with("capabilities", 0x87u32)
            .with("actions", 0xfffu32)
            .with("ports", ports);
        let bytes = codec.encode(&obj).expect("encode");
        assert_eq!(bytes.len(), 32 + 48 * n as usize);
        assert_eq!(u16::from_be_bytes([bytes[2], bytes[3]]) as usize, bytes.len());
        assert_eq!(codec.decode_bytes("of_features_reply", &bytes).expect("decode"), obj);
    }
}

#[test]
fn virtual_class_decodes_to_subclass() {
    let c = compilation();
    let codec = Codec::new(c.protocol(OFVersion::V1_0).expect("1.0"));
    let bytes = [0x01u8, 0x00, 0x00, 0x08, 0x12, 0x34, 0x56, 0x78, 0xee];
    let mut cursor = Cursor::new(&bytes[..]);
    let obj = codec.decode("of_header", &mut cursor).expect("decode");
    assert_eq!(obj, hello_10());
    assert_eq!(cursor.position(), 8);
}

#[test]
fn consecutive_messages_from_one_cursor() {
    let c = compilation();
    let codec = Codec::new(c.protocol(OFVersion::V1_0).expect("1.0"));
    let echo = Object::new("of_echo_reply")
        .with("version", 1u8)
        .with("xid", 9u32)
        .with("data", b"ping".to_vec());
    let mut stream = codec.encode(&hello_10()).expect("encode");
    stream.extend(codec.encode(&echo).expect("encode"));

    let mut cursor = Cursor::new(&stream[..]);
    assert_eq!(codec.decode("of_header", &mut cursor).expect("first"), hello_10());
    assert_eq!(codec.decode("of_header", &mut cursor).expect("second"), echo);
    assert_eq!(cursor.position() as usize, stream.len());
}

#[test]
fn encode_errors() {
    let c = compilation();
    let codec = Codec::new(c.protocol(OFVersion::V1_0).expect("1.0"));

    let err = codec.encode(&Object::new("of_action")).unwrap_err();
    assert!(matches!(err, CodecError::VirtualClass(ref n) if n == "of_action"));

    let err = codec.encode(&Object::new("of_hello").with("version", 1u8)).unwrap_err();
    assert!(matches!(err, CodecError::MissingField { ref member, .. } if member == "xid"));

    let err = codec
        .encode(&Object::new("of_action_output").with("port", 0x10000u32).with("max_len", 0u16))
        .unwrap_err();
    assert!(matches!(err, CodecError::ValueOverflow { width: 2, .. }));

    let err = codec.encode(&Object::new("of_no_such_message")).unwrap_err();
    assert!(matches!(err, CodecError::UnknownClass(_)));

    let not_an_action = Object::new("of_packet_out")
        .with("version", 1u8)
        .with("xid", 0u32)
        .with("buffer_id", 0u32)
        .with("in_port", 0u16)
        .with("actions", vec![Value::from(hello_10())])
        .with("data", Vec::<u8>::new());
    let err = codec.encode(&not_an_action).unwrap_err();
    assert!(matches!(err, CodecError::TypeMismatch { .. }));
}

#[test]
fn decode_errors() {
    let c = compilation();
    let codec = Codec::new(c.protocol(OFVersion::V1_0).expect("1.0"));

    // Truncated header.
    let err = codec.decode_bytes("of_hello", &[0x01, 0x00, 0x00]).unwrap_err();
    assert!(matches!(err, CodecError::Truncated { .. }));

    // Wrong message type.
    let err = codec
        .decode_bytes("of_hello", &[0x01, 0x02, 0x00, 0x08, 0x00, 0x00, 0x00, 0x00])
        .unwrap_err();
    assert!(matches!(err, CodecError::FixedValueMismatch { expected: 0, found: 2, .. }));

    // Length runs past the buffer.
    let err = codec
        .decode_bytes("of_hello", &[0x01, 0x00, 0x00, 0x10, 0x00, 0x00, 0x00, 0x00])
        .unwrap_err();
    assert!(matches!(err, CodecError::LengthMismatch(_)));

    // Trailing bytes.
    let err = codec
        .decode_bytes("of_hello", &[0x01, 0x00, 0x00, 0x08, 0x00, 0x00, 0x00, 0x00, 0x00])
        .unwrap_err();
    assert!(matches!(err, CodecError::LengthMismatch(_)));

    // No subclass for this type value.
    let err = codec
        .decode_bytes("of_header", &[0x01, 0x63, 0x00, 0x08, 0x00, 0x00, 0x00, 0x00])
        .unwrap_err();
    assert!(matches!(err, CodecError::UnknownDiscriminator { value: 0x63, .. }));
}

#[test]
fn field_length_past_the_instance_is_rejected() {
    let input = pipeline::parse_file(
        "blob",
        "1.3\n4\nstruct blob { uint16_t length; uint64_t data_len; of_octets_t data; };\n",
    )
    .expect("parse");
    let c = Compilation::from_inputs(&[input], &BTreeSet::from([OFVersion::V1_3])).expect("build");
    let codec = Codec::new(c.protocol(OFVersion::V1_3).expect("1.3"));

    let mut bytes = vec![0x00u8, 0x0a];
    bytes.extend_from_slice(&[0xff; 8]);
    let err = codec.decode_bytes("blob", &bytes).unwrap_err();
    assert!(matches!(err, CodecError::LengthMismatch(_)));
}
