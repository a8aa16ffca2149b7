//! Binary class container reader and writer
//!
//! This module turns class file bytes into a mutable [`ClassModel`] and back.
//! It is organised in the order a class file is laid out:
//!
//! - `constant_pool`: pool entries, lookups and append-only additions
//! - `access`: access flag sets for classes, fields and methods
//! - `attribute`: attribute bodies, including annotations and `Code`
//! - `model`: the class, field and method tree
//! - `reader` / `writer`: the binary codec
//! - `builder`: assembling a class from names, mostly for fixtures and tools
//!
//! Anything not decoded is carried as raw bytes, and the pool is never
//! reordered, so `serialize(&parse(bytes)?)` reproduces `bytes` exactly.

pub mod access;
pub mod attribute;
pub mod builder;
pub mod constant_pool;
pub mod error;
pub mod model;
pub mod mutf8;
pub mod reader;
pub mod writer;

pub use access::{ClassAccess, FieldAccess, MethodAccess};
pub use attribute::{Annotation, AttrBody, Attribute, CodeAttribute, ElementValue};
pub use builder::ClassBuilder;
pub use constant_pool::{Constant, ConstantPool, MemberRef};
pub use error::{ClassFileError, ClassFileResult};
pub use model::{ClassModel, FieldModel, Member, MethodModel};
pub use reader::parse;
pub use writer::serialize;

#[cfg(test)]
mod tests {
    use super::*;

    const OBJECT_HOLDER: &str = "Lcpw/mods/fml/common/registry/GameRegistry/ObjectHolder;";

    fn sample() -> ClassModel {
        ClassBuilder::new("com/example/Sample")
            .interface("java/io/Serializable")
            .annotation(OBJECT_HOLDER)
            .constant_field(
                FieldAccess::PUBLIC | FieldAccess::STATIC | FieldAccess::FINAL,
                "LIMIT",
                5000,
                &[OBJECT_HOLDER],
            )
            .field(FieldAccess::PRIVATE, "name", "Ljava/lang/String;")
            .method(MethodAccess::PUBLIC, "<init>", "()V", Some((1, 1, vec![0x2a, 0xb1])))
            .raw_attribute("SourceFile", vec![0x00, 0x01])
            .build()
            .unwrap()
    }

    #[test]
    fn round_trip_is_byte_exact() {
        let bytes = serialize(&sample()).unwrap();
        let parsed = parse(&bytes).unwrap();
        assert_eq!(parsed, sample());
        assert_eq!(serialize(&parsed).unwrap(), bytes);
    }

    #[test]
    fn parsed_model_resolves_names() {
        let class = parse(&serialize(&sample()).unwrap()).unwrap();
        assert_eq!(class.name().unwrap(), "com/example/Sample");
        assert_eq!(class.super_name().unwrap().unwrap(), "java/lang/Object");
        assert_eq!(class.interface_names().unwrap(), vec!["java/io/Serializable"]);
        assert_eq!(class.annotation_descriptors().unwrap(), vec![OBJECT_HOLDER]);

        let limit = &class.fields[0];
        assert_eq!(limit.name(&class.constant_pool).unwrap(), "LIMIT");
        assert!(limit.is_final());
        assert_eq!(
            class.member_annotation_descriptors(limit).unwrap(),
            vec![OBJECT_HOLDER]
        );
        let value = limit.constant_value().unwrap();
        assert_eq!(class.constant_pool.get(value), Some(&Constant::Integer(5000)));

        assert_eq!(class.find_method("<init>", "()V"), Some(0));
        assert_eq!(class.methods[0].code().unwrap().code, vec![0x2a, 0xb1]);
    }

    #[test]
    fn serialize_refuses_dangling_indices() {
        let mut class = sample();
        class.fields[1].descriptor_index = 4000;
        assert_eq!(
            serialize(&class),
            Err(ClassFileError::BadConstantIndex {
                index: 4000,
                expected: "Utf8"
            })
        );
    }

    #[test]
    fn attribute_length_mismatch_is_malformed() {
        let mut bytes = serialize(&sample()).unwrap();
        // The trailing SourceFile attribute: u2 name, u4 length (2), u2 body.
        let len_at = bytes.len() - 6;
        bytes[len_at..len_at + 4].copy_from_slice(&3u32.to_be_bytes());
        bytes.push(0);
        // Raw attributes are opaque, so a longer body is still well formed.
        assert!(parse(&bytes).is_ok());

        let mut class = sample();
        let name_index = class.constant_pool.add_utf8(attribute::CONSTANT_VALUE).unwrap();
        let value = class.constant_pool.add_integer(1).unwrap();
        class.fields[1].attributes.push(Attribute {
            name_index,
            body: AttrBody::ConstantValue(value),
        });
        let mut bytes = serialize(&class).unwrap();
        // Grow the ConstantValue length from 2 to 4 and append two bytes of
        // padding after it: field `name` is the last field, followed by the
        // method table.
        let needle = [
            &name_index.to_be_bytes()[..],
            &2u32.to_be_bytes()[..],
            &value.to_be_bytes()[..],
        ]
        .concat();
        let at = bytes
            .windows(needle.len())
            .position(|window| window == needle.as_slice())
            .unwrap();
        bytes[at + 2..at + 6].copy_from_slice(&4u32.to_be_bytes());
        bytes.splice(at + 8..at + 8, [0, 0]);
        assert_eq!(
            parse(&bytes),
            Err(ClassFileError::AttributeLength {
                name: "ConstantValue".into(),
                declared: 4,
                consumed: 2,
            })
        );
    }

    #[test]
    fn trailing_bytes_are_rejected() {
        let mut bytes = serialize(&sample()).unwrap();
        bytes.push(0);
        assert_eq!(parse(&bytes), Err(ClassFileError::TrailingBytes(1)));
    }
}
