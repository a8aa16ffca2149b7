//! The constant pool: every name, descriptor and literal a class refers to.
//!
//! Entries are kept in file order and the pool only ever grows, so an index
//! that was valid when the class was read stays valid (and means the same
//! thing) until the class is written back out.

use std::borrow::Cow;

use strum_macros::IntoStaticStr;

use super::{
    error::{ClassFileError, ClassFileResult},
    mutf8,
};

mod tags {
    pub const UTF8: u8 = 1;
    pub const INTEGER: u8 = 3;
    pub const FLOAT: u8 = 4;
    pub const LONG: u8 = 5;
    pub const DOUBLE: u8 = 6;
    pub const CLASS: u8 = 7;
    pub const STRING: u8 = 8;
    pub const FIELD_REF: u8 = 9;
    pub const METHOD_REF: u8 = 10;
    pub const INTERFACE_METHOD_REF: u8 = 11;
    pub const NAME_AND_TYPE: u8 = 12;
    pub const METHOD_HANDLE: u8 = 15;
    pub const METHOD_TYPE: u8 = 16;
    pub const DYNAMIC: u8 = 17;
    pub const INVOKE_DYNAMIC: u8 = 18;
    pub const MODULE: u8 = 19;
    pub const PACKAGE: u8 = 20;
}

pub use tags::*;

/// One pool slot. Floating point values are kept as raw bits so that NaN
/// payloads survive a round trip.
#[derive(Debug, Clone, PartialEq, Eq, IntoStaticStr)]
pub enum Constant {
    /// Slot 0 and the slot following every `Long`/`Double`.
    Unusable,
    Utf8(Vec<u8>),
    Integer(i32),
    Float(u32),
    Long(i64),
    Double(u64),
    Class(u16),
    String(u16),
    FieldRef(u16, u16),
    MethodRef(u16, u16),
    InterfaceMethodRef(u16, u16),
    NameAndType(u16, u16),
    MethodHandle(u8, u16),
    MethodType(u16),
    Dynamic(u16, u16),
    InvokeDynamic(u16, u16),
    Module(u16),
    Package(u16),
}

impl Constant {
    pub fn tag(&self) -> u8 {
        match self {
            Constant::Unusable => 0,
            Constant::Utf8(_) => UTF8,
            Constant::Integer(_) => INTEGER,
            Constant::Float(_) => FLOAT,
            Constant::Long(_) => LONG,
            Constant::Double(_) => DOUBLE,
            Constant::Class(_) => CLASS,
            Constant::String(_) => STRING,
            Constant::FieldRef(..) => FIELD_REF,
            Constant::MethodRef(..) => METHOD_REF,
            Constant::InterfaceMethodRef(..) => INTERFACE_METHOD_REF,
            Constant::NameAndType(..) => NAME_AND_TYPE,
            Constant::MethodHandle(..) => METHOD_HANDLE,
            Constant::MethodType(_) => METHOD_TYPE,
            Constant::Dynamic(..) => DYNAMIC,
            Constant::InvokeDynamic(..) => INVOKE_DYNAMIC,
            Constant::Module(_) => MODULE,
            Constant::Package(_) => PACKAGE,
        }
    }

    /// `Long` and `Double` take two slots.
    pub fn is_wide(&self) -> bool {
        matches!(self, Constant::Long(_) | Constant::Double(_))
    }

    pub fn write_to(&self, out: &mut Vec<u8>) {
        if matches!(self, Constant::Unusable) {
            return;
        }
        out.push(self.tag());
        match self {
            Constant::Unusable => {}
            Constant::Utf8(bytes) => {
                out.extend_from_slice(&(bytes.len() as u16).to_be_bytes());
                out.extend_from_slice(bytes);
            }
            Constant::Integer(value) => out.extend_from_slice(&value.to_be_bytes()),
            Constant::Float(bits) => out.extend_from_slice(&bits.to_be_bytes()),
            Constant::Long(value) => out.extend_from_slice(&value.to_be_bytes()),
            Constant::Double(bits) => out.extend_from_slice(&bits.to_be_bytes()),
            Constant::Class(index)
            | Constant::String(index)
            | Constant::MethodType(index)
            | Constant::Module(index)
            | Constant::Package(index) => out.extend_from_slice(&index.to_be_bytes()),
            Constant::FieldRef(a, b)
            | Constant::MethodRef(a, b)
            | Constant::InterfaceMethodRef(a, b)
            | Constant::NameAndType(a, b)
            | Constant::Dynamic(a, b)
            | Constant::InvokeDynamic(a, b) => {
                out.extend_from_slice(&a.to_be_bytes());
                out.extend_from_slice(&b.to_be_bytes());
            }
            Constant::MethodHandle(kind, index) => {
                out.push(*kind);
                out.extend_from_slice(&index.to_be_bytes());
            }
        }
    }
}

/// A resolved `Fieldref`/`Methodref`: owner, name and descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberRef<'p> {
    pub owner: Cow<'p, str>,
    pub name: Cow<'p, str>,
    pub descriptor: Cow<'p, str>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConstantPool {
    entries: Vec<Constant>,
}

impl Default for ConstantPool {
    fn default() -> Self {
        Self::new()
    }
}

impl ConstantPool {
    pub fn new() -> Self {
        Self {
            entries: vec![Constant::Unusable],
        }
    }

    /// Builds a pool from entries in file order, slot 0 included.
    pub(crate) fn from_entries(entries: Vec<Constant>) -> Self {
        Self { entries }
    }

    /// The `constant_pool_count` value: number of slots including slot 0.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.len() <= 1
    }

    pub fn entries(&self) -> &[Constant] {
        &self.entries
    }

    /// Iterates the usable entries with their indices.
    pub fn iter(&self) -> impl Iterator<Item = (u16, &Constant)> + '_ {
        self.entries
            .iter()
            .enumerate()
            .filter(|(_, constant)| !matches!(constant, Constant::Unusable))
            .map(|(index, constant)| (index as u16, constant))
    }

    pub fn get(&self, index: u16) -> Option<&Constant> {
        match self.entries.get(index as usize) {
            Some(Constant::Unusable) | None => None,
            Some(constant) => Some(constant),
        }
    }

    pub fn utf8_bytes(&self, index: u16) -> ClassFileResult<&[u8]> {
        match self.get(index) {
            Some(Constant::Utf8(bytes)) => Ok(bytes),
            _ => Err(bad_index(index, "Utf8")),
        }
    }

    pub fn utf8(&self, index: u16) -> ClassFileResult<Cow<'_, str>> {
        self.utf8_bytes(index).map(mutf8::decode)
    }

    /// Internal name (`java/lang/Object`) of a `Class` entry.
    pub fn class_name(&self, index: u16) -> ClassFileResult<Cow<'_, str>> {
        match self.get(index) {
            Some(Constant::Class(name_index)) => self.utf8(*name_index),
            _ => Err(bad_index(index, "Class")),
        }
    }

    pub fn name_and_type(&self, index: u16) -> ClassFileResult<(Cow<'_, str>, Cow<'_, str>)> {
        match self.get(index) {
            Some(Constant::NameAndType(name, descriptor)) => {
                Ok((self.utf8(*name)?, self.utf8(*descriptor)?))
            }
            _ => Err(bad_index(index, "NameAndType")),
        }
    }

    /// Resolves a field, method or interface method reference.
    pub fn member_ref(&self, index: u16) -> ClassFileResult<MemberRef<'_>> {
        match self.get(index) {
            Some(
                Constant::FieldRef(class, nat)
                | Constant::MethodRef(class, nat)
                | Constant::InterfaceMethodRef(class, nat),
            ) => {
                let owner = self.class_name(*class)?;
                let (name, descriptor) = self.name_and_type(*nat)?;
                Ok(MemberRef {
                    owner,
                    name,
                    descriptor,
                })
            }
            _ => Err(bad_index(index, "member reference")),
        }
    }

    pub fn check_utf8(&self, index: u16) -> ClassFileResult<()> {
        self.utf8_bytes(index).map(drop)
    }

    pub fn check_class(&self, index: u16) -> ClassFileResult<()> {
        match self.get(index) {
            Some(Constant::Class(_)) => Ok(()),
            _ => Err(bad_index(index, "Class")),
        }
    }

    /// Entries a `ConstantValue` attribute may point at.
    pub fn check_constant_value(&self, index: u16) -> ClassFileResult<()> {
        match self.get(index) {
            Some(
                Constant::Integer(_)
                | Constant::Float(_)
                | Constant::Long(_)
                | Constant::Double(_)
                | Constant::String(_),
            ) => Ok(()),
            _ => Err(bad_index(index, "constant value")),
        }
    }

    fn check_kind(&self, index: u16, expected: &'static str, tag: u8) -> ClassFileResult<()> {
        match self.get(index) {
            Some(constant) if constant.tag() == tag => Ok(()),
            _ => Err(bad_index(index, expected)),
        }
    }

    /// Checks that every cross reference inside the pool lands on an entry of
    /// the kind the class file format requires.
    pub fn validate(&self) -> ClassFileResult<()> {
        for (_, constant) in self.iter() {
            match *constant {
                Constant::Unusable
                | Constant::Utf8(_)
                | Constant::Integer(_)
                | Constant::Float(_)
                | Constant::Long(_)
                | Constant::Double(_) => {}
                Constant::Class(name)
                | Constant::String(name)
                | Constant::MethodType(name)
                | Constant::Module(name)
                | Constant::Package(name) => self.check_utf8(name)?,
                Constant::FieldRef(class, nat)
                | Constant::MethodRef(class, nat)
                | Constant::InterfaceMethodRef(class, nat) => {
                    self.check_class(class)?;
                    self.check_kind(nat, "NameAndType", NAME_AND_TYPE)?;
                }
                Constant::NameAndType(name, descriptor) => {
                    self.check_utf8(name)?;
                    self.check_utf8(descriptor)?;
                }
                Constant::MethodHandle(kind, reference) => {
                    let ok = match (kind, self.get(reference)) {
                        (1..=4, Some(Constant::FieldRef(..))) => true,
                        (5 | 8, Some(Constant::MethodRef(..))) => true,
                        (6 | 7, Some(Constant::MethodRef(..) | Constant::InterfaceMethodRef(..))) => {
                            true
                        }
                        (9, Some(Constant::InterfaceMethodRef(..))) => true,
                        _ => false,
                    };
                    if !ok {
                        return Err(bad_index(reference, "method handle target"));
                    }
                }
                // The bootstrap index points into the BootstrapMethods
                // attribute, not the pool.
                Constant::Dynamic(_, nat) | Constant::InvokeDynamic(_, nat) => {
                    self.check_kind(nat, "NameAndType", NAME_AND_TYPE)?;
                }
            }
        }
        Ok(())
    }

    fn push(&mut self, constant: Constant) -> ClassFileResult<u16> {
        let slots = if constant.is_wide() { 2 } else { 1 };
        let index = self.entries.len();
        if index + slots > u16::MAX as usize {
            return Err(ClassFileError::LimitExceeded {
                what: "constant pool",
                count: index + slots,
            });
        }
        let wide = constant.is_wide();
        self.entries.push(constant);
        if wide {
            self.entries.push(Constant::Unusable);
        }
        Ok(index as u16)
    }

    fn find_or_push(&mut self, constant: Constant) -> ClassFileResult<u16> {
        match self.entries.iter().position(|existing| *existing == constant) {
            Some(index) => Ok(index as u16),
            None => self.push(constant),
        }
    }

    /// Returns the index of a `Utf8` entry holding `text`, adding one if the
    /// pool has none yet.
    pub fn add_utf8(&mut self, text: &str) -> ClassFileResult<u16> {
        let bytes = mutf8::encode(text);
        if bytes.len() > u16::MAX as usize {
            return Err(ClassFileError::LimitExceeded {
                what: "Utf8 length",
                count: bytes.len(),
            });
        }
        self.find_or_push(Constant::Utf8(bytes.into_owned()))
    }

    pub fn add_class(&mut self, internal_name: &str) -> ClassFileResult<u16> {
        let name = self.add_utf8(internal_name)?;
        self.find_or_push(Constant::Class(name))
    }

    pub fn add_string(&mut self, text: &str) -> ClassFileResult<u16> {
        let utf8 = self.add_utf8(text)?;
        self.find_or_push(Constant::String(utf8))
    }

    pub fn add_integer(&mut self, value: i32) -> ClassFileResult<u16> {
        self.find_or_push(Constant::Integer(value))
    }

    pub fn add_name_and_type(&mut self, name: &str, descriptor: &str) -> ClassFileResult<u16> {
        let name = self.add_utf8(name)?;
        let descriptor = self.add_utf8(descriptor)?;
        self.find_or_push(Constant::NameAndType(name, descriptor))
    }

    pub fn add_field_ref(
        &mut self,
        owner: &str,
        name: &str,
        descriptor: &str,
    ) -> ClassFileResult<u16> {
        let class = self.add_class(owner)?;
        let nat = self.add_name_and_type(name, descriptor)?;
        self.find_or_push(Constant::FieldRef(class, nat))
    }

    pub fn add_method_ref(
        &mut self,
        owner: &str,
        name: &str,
        descriptor: &str,
    ) -> ClassFileResult<u16> {
        let class = self.add_class(owner)?;
        let nat = self.add_name_and_type(name, descriptor)?;
        self.find_or_push(Constant::MethodRef(class, nat))
    }
}

fn bad_index(index: u16, expected: &'static str) -> ClassFileError {
    ClassFileError::BadConstantIndex { index, expected }
}
