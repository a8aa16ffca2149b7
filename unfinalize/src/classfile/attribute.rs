//! Attribute tables attached to classes, fields, methods and `Code`.
//!
//! Only the attributes this crate inspects or creates are decoded; all
//! others are carried as raw bytes. Decoded bodies are re-encoded in the
//! canonical layout, which is the only layout the format allows, so an
//! unmodified attribute is written back byte for byte.

use std::borrow::Cow;

use super::{
    constant_pool::{Constant, ConstantPool},
    error::{ClassFileError, ClassFileResult},
};

pub const CONSTANT_VALUE: &str = "ConstantValue";
pub const CODE: &str = "Code";
pub const RUNTIME_VISIBLE_ANNOTATIONS: &str = "RuntimeVisibleAnnotations";
pub const RUNTIME_INVISIBLE_ANNOTATIONS: &str = "RuntimeInvisibleAnnotations";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub name_index: u16,
    pub body: AttrBody,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttrBody {
    ConstantValue(u16),
    Code(CodeAttribute),
    VisibleAnnotations(Vec<Annotation>),
    InvisibleAnnotations(Vec<Annotation>),
    Raw(Vec<u8>),
}

impl AttrBody {
    /// The attribute name a decoded body must be stored under.
    pub fn expected_name(&self) -> Option<&'static str> {
        match self {
            AttrBody::ConstantValue(_) => Some(CONSTANT_VALUE),
            AttrBody::Code(_) => Some(CODE),
            AttrBody::VisibleAnnotations(_) => Some(RUNTIME_VISIBLE_ANNOTATIONS),
            AttrBody::InvisibleAnnotations(_) => Some(RUNTIME_INVISIBLE_ANNOTATIONS),
            AttrBody::Raw(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeAttribute {
    pub max_stack: u16,
    pub max_locals: u16,
    pub code: Vec<u8>,
    pub exception_table: Vec<ExceptionHandler>,
    pub attributes: Vec<Attribute>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExceptionHandler {
    pub start_pc: u16,
    pub end_pc: u16,
    pub handler_pc: u16,
    /// Zero catches everything.
    pub catch_type: u16,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Annotation {
    /// `Utf8` entry holding the annotation's field descriptor.
    pub type_index: u16,
    pub elements: Vec<ElementPair>,
}

impl Annotation {
    pub fn descriptor<'p>(&self, pool: &'p ConstantPool) -> ClassFileResult<Cow<'p, str>> {
        pool.utf8(self.type_index)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementPair {
    pub name_index: u16,
    pub value: ElementValue,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ElementValue {
    /// `B C D F I J S Z s`: a tag and the pool entry holding the value.
    Const { tag: u8, index: u16 },
    Enum { type_name: u16, const_name: u16 },
    Class(u16),
    Annotation(Annotation),
    Array(Vec<ElementValue>),
}

/// Deepest annotation/array nesting accepted when reading.
pub const MAX_ANNOTATION_NESTING: usize = 64;

impl ElementValue {
    pub(crate) fn validate(&self, pool: &ConstantPool) -> ClassFileResult<()> {
        match self {
            ElementValue::Const { tag, index } => match (*tag, pool.get(*index)) {
                (b'B' | b'C' | b'I' | b'S' | b'Z', Some(Constant::Integer(_)))
                | (b'J', Some(Constant::Long(_)))
                | (b'F', Some(Constant::Float(_)))
                | (b'D', Some(Constant::Double(_)))
                | (b's', Some(Constant::Utf8(_))) => Ok(()),
                (b'B' | b'C' | b'I' | b'S' | b'Z' | b'J' | b'F' | b'D' | b's', _) => {
                    Err(ClassFileError::BadConstantIndex {
                        index: *index,
                        expected: "element constant",
                    })
                }
                _ => Err(ClassFileError::UnknownElementTag(*tag)),
            },
            ElementValue::Enum {
                type_name,
                const_name,
            } => {
                pool.check_utf8(*type_name)?;
                pool.check_utf8(*const_name)
            }
            ElementValue::Class(index) => pool.check_utf8(*index),
            ElementValue::Annotation(annotation) => annotation.validate(pool),
            ElementValue::Array(values) => values.iter().try_for_each(|value| value.validate(pool)),
        }
    }
}

impl Annotation {
    pub(crate) fn validate(&self, pool: &ConstantPool) -> ClassFileResult<()> {
        pool.check_utf8(self.type_index)?;
        for pair in &self.elements {
            pool.check_utf8(pair.name_index)?;
            pair.value.validate(pool)?;
        }
        Ok(())
    }
}

impl Attribute {
    /// Checks the attribute's name and every pool index in its body.
    pub(crate) fn validate(&self, pool: &ConstantPool) -> ClassFileResult<()> {
        let name = pool.utf8(self.name_index)?;
        if let Some(expected) = self.body.expected_name() {
            if name != expected {
                return Err(ClassFileError::AttributeNameMismatch(expected));
            }
        }
        match &self.body {
            AttrBody::ConstantValue(index) => pool.check_constant_value(*index),
            AttrBody::Code(code) => {
                for handler in &code.exception_table {
                    if handler.catch_type != 0 {
                        pool.check_class(handler.catch_type)?;
                    }
                }
                code.attributes
                    .iter()
                    .try_for_each(|attribute| attribute.validate(pool))
            }
            AttrBody::VisibleAnnotations(annotations)
            | AttrBody::InvisibleAnnotations(annotations) => annotations
                .iter()
                .try_for_each(|annotation| annotation.validate(pool)),
            AttrBody::Raw(_) => Ok(()),
        }
    }
}
