#![allow(dead_code)]

use std::{
    io::{Cursor, Write},
    sync::{Arc, Mutex},
};

use tracing_subscriber::fmt::MakeWriter;
use unfinalize::{
    classfile::{ClassAccess, ClassBuilder, ClassModel, FieldAccess, MethodAccess},
    transform::bytecode::opcodes::RETURN,
};
use zip::{write::SimpleFileOptions, ZipWriter};

pub const STATIC_FINAL: FieldAccess = FieldAccess::PUBLIC
    .union(FieldAccess::STATIC)
    .union(FieldAccess::FINAL);
pub const OBJECT_HOLDER: &str = "Lcpw/mods/fml/common/registry/GameRegistry/ObjectHolder;";
pub const ITEM_STACK_HOLDER: &str = "Lcpw/mods/fml/common/registry/GameRegistry/ItemStackHolder;";

pub const COLOR: &str = "com/example/Color";
pub const COLOR_VALUES: &str = "[Lcom/example/Color;";

/// `net/minecraft/init/Blocks` with three plain static final fields.
pub fn blocks_class() -> Vec<u8> {
    ClassBuilder::new("net/minecraft/init/Blocks")
        .field(STATIC_FINAL, "stone", "Lnet/minecraft/block/Block;")
        .field(STATIC_FINAL, "dirt", "Lnet/minecraft/block/Block;")
        .field(STATIC_FINAL, "grass", "Lnet/minecraft/block/Block;")
        .raw_attribute("SourceFile", vec![0, 1])
        .build_bytes()
        .unwrap()
}

/// `com/example/Foo`: `bar` carries the object-holder marker, `baz` nothing.
pub fn foo_class() -> Vec<u8> {
    ClassBuilder::new("com/example/Foo")
        .annotated_field(STATIC_FINAL, "bar", "Lnet/minecraft/item/Item;", &[OBJECT_HOLDER])
        .field(STATIC_FINAL, "baz", "Lnet/minecraft/item/Item;")
        .build_bytes()
        .unwrap()
}

/// A class no rule cares about.
pub fn plain_class() -> Vec<u8> {
    ClassBuilder::new("com/example/Plain")
        .field(STATIC_FINAL, "LIMIT", "I")
        .field(FieldAccess::PRIVATE, "count", "I")
        .annotated_field(STATIC_FINAL, "old", "I", &["Ljava/lang/Deprecated;"])
        .method(MethodAccess::PUBLIC, "<init>", "()V", Some((1, 1, vec![RETURN])))
        .build_bytes()
        .unwrap()
}

/// A javac-shaped enum with one constant, a private constructor and
/// `$VALUES`. The pool already has the `Fieldref` `values()` would use.
pub fn color_enum_model() -> ClassModel {
    let mut class = ClassBuilder::new(COLOR)
        .access(ClassAccess::PUBLIC | ClassAccess::FINAL | ClassAccess::SUPER | ClassAccess::ENUM)
        .super_class("java/lang/Enum")
        .field(
            STATIC_FINAL | FieldAccess::ENUM,
            "RED",
            "Lcom/example/Color;",
        )
        .field(
            FieldAccess::PRIVATE | FieldAccess::STATIC | FieldAccess::FINAL | FieldAccess::SYNTHETIC,
            "$VALUES",
            COLOR_VALUES,
        )
        .method(
            MethodAccess::PRIVATE,
            "<init>",
            "(Ljava/lang/String;I)V",
            Some((3, 3, vec![RETURN])),
        )
        .method(MethodAccess::STATIC, "<clinit>", "()V", Some((0, 0, vec![RETURN])))
        .build()
        .unwrap();
    class
        .constant_pool
        .add_field_ref(COLOR, "$VALUES", COLOR_VALUES)
        .unwrap();
    class
}

pub fn color_enum() -> Vec<u8> {
    unfinalize::classfile::serialize(&color_enum_model()).unwrap()
}

/// Log output captured from a closure, without ANSI colors.
pub fn capture_logs<T>(run: impl FnOnce() -> T) -> (T, String) {
    let buffer = LogBuffer::default();
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_ansi(false)
        .with_writer(buffer.clone())
        .finish();
    let value = tracing::subscriber::with_default(subscriber, run);
    (value, buffer.contents())
}

#[derive(Clone, Default)]
pub struct LogBuffer(Arc<Mutex<Vec<u8>>>);

impl LogBuffer {
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl Write for LogBuffer {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for LogBuffer {
    type Writer = LogBuffer;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

/// An in-memory jar with the given entries, in order.
pub fn jar_bytes(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    for (name, data) in entries {
        writer
            .start_file(*name, SimpleFileOptions::default())
            .unwrap();
        writer.write_all(data).unwrap();
    }
    writer.finish().unwrap().into_inner()
}
