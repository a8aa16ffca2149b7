//! The handful of opcodes needed to emit straight-line helper methods.

pub mod opcodes {
    pub const ICONST_1: u8 = 0x04;
    pub const ALOAD_0: u8 = 0x2a;
    pub const ALOAD_1: u8 = 0x2b;
    pub const ALOAD_2: u8 = 0x2c;
    pub const ASTORE_1: u8 = 0x4c;
    pub const ASTORE_2: u8 = 0x4d;
    pub const AASTORE: u8 = 0x53;
    pub const IADD: u8 = 0x60;
    pub const RETURN: u8 = 0xb1;
    pub const GETSTATIC: u8 = 0xb2;
    pub const PUTSTATIC: u8 = 0xb3;
    pub const INVOKESTATIC: u8 = 0xb8;
    pub const ARRAYLENGTH: u8 = 0xbe;
    pub const CHECKCAST: u8 = 0xc0;
}

/// Appends instructions to a method body.
///
/// There are no labels: bodies built here never branch, which also means
/// they need no `StackMapTable`.
#[derive(Debug, Default)]
pub struct CodeBuilder {
    code: Vec<u8>,
}

impl CodeBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn op(&mut self, opcode: u8) -> &mut Self {
        self.code.push(opcode);
        self
    }

    /// An instruction taking a two-byte constant pool index.
    pub fn op_index(&mut self, opcode: u8, index: u16) -> &mut Self {
        self.code.push(opcode);
        self.code.extend_from_slice(&index.to_be_bytes());
        self
    }

    pub fn finish(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.code)
    }
}
