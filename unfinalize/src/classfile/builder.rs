use smallvec::SmallVec;

use super::{
    access::{ClassAccess, FieldAccess, MethodAccess},
    attribute::{
        Annotation, AttrBody, Attribute, CodeAttribute, CODE, CONSTANT_VALUE,
        RUNTIME_VISIBLE_ANNOTATIONS,
    },
    constant_pool::ConstantPool,
    error::{ClassFileError, ClassFileResult},
    model::{ClassModel, FieldModel, MethodModel},
};

/// Java 8, the version most holder-carrying classes are compiled for.
pub const DEFAULT_MAJOR_VERSION: u16 = 52;

/// Assembles a [`ClassModel`] from names instead of pool indices.
///
/// Pool failures are remembered and reported by [`ClassBuilder::build`], so
/// calls can be chained.
///
/// ```
/// use unfinalize::classfile::{ClassBuilder, FieldAccess};
///
/// let bytes = ClassBuilder::new("net/minecraft/init/Blocks")
///     .field(FieldAccess::PUBLIC | FieldAccess::STATIC | FieldAccess::FINAL, "stone", "I")
///     .build_bytes()
///     .unwrap();
/// assert_eq!(&bytes[..4], &[0xca, 0xfe, 0xba, 0xbe]);
/// ```
#[derive(Debug)]
pub struct ClassBuilder {
    class: ClassModel,
    error: Option<ClassFileError>,
}

impl ClassBuilder {
    /// Starts a public class extending `java/lang/Object`.
    pub fn new(internal_name: &str) -> Self {
        let mut builder = Self {
            class: ClassModel {
                minor_version: 0,
                major_version: DEFAULT_MAJOR_VERSION,
                constant_pool: ConstantPool::new(),
                access: ClassAccess::PUBLIC | ClassAccess::SUPER,
                this_class: 0,
                super_class: 0,
                interfaces: SmallVec::new(),
                fields: Vec::new(),
                methods: Vec::new(),
                attributes: Vec::new(),
            },
            error: None,
        };
        builder.class.this_class = builder.pool(|pool| pool.add_class(internal_name));
        builder.class.super_class = builder.pool(|pool| pool.add_class("java/lang/Object"));
        builder
    }

    fn pool(&mut self, add: impl FnOnce(&mut ConstantPool) -> ClassFileResult<u16>) -> u16 {
        match add(&mut self.class.constant_pool) {
            Ok(index) => index,
            Err(err) => {
                self.error.get_or_insert(err);
                0
            }
        }
    }

    fn annotations(&mut self, descriptors: &[&str]) -> Vec<Attribute> {
        if descriptors.is_empty() {
            return Vec::new();
        }
        let name_index = self.pool(|pool| pool.add_utf8(RUNTIME_VISIBLE_ANNOTATIONS));
        let annotations = descriptors
            .iter()
            .map(|descriptor| Annotation {
                type_index: self.pool(|pool| pool.add_utf8(descriptor)),
                elements: Vec::new(),
            })
            .collect();
        vec![Attribute {
            name_index,
            body: AttrBody::VisibleAnnotations(annotations),
        }]
    }

    pub fn version(mut self, major: u16, minor: u16) -> Self {
        self.class.major_version = major;
        self.class.minor_version = minor;
        self
    }

    pub fn access(mut self, access: ClassAccess) -> Self {
        self.class.access = access;
        self
    }

    pub fn super_class(mut self, internal_name: &str) -> Self {
        self.class.super_class = self.pool(|pool| pool.add_class(internal_name));
        self
    }

    pub fn interface(mut self, internal_name: &str) -> Self {
        let index = self.pool(|pool| pool.add_class(internal_name));
        self.class.interfaces.push(index);
        self
    }

    pub fn annotation(mut self, descriptor: &str) -> Self {
        let attributes = self.annotations(&[descriptor]);
        self.class.attributes.extend(attributes);
        self
    }

    pub fn field(self, access: FieldAccess, name: &str, descriptor: &str) -> Self {
        self.annotated_field(access, name, descriptor, &[])
    }

    pub fn annotated_field(
        mut self,
        access: FieldAccess,
        name: &str,
        descriptor: &str,
        annotations: &[&str],
    ) -> Self {
        let name_index = self.pool(|pool| pool.add_utf8(name));
        let descriptor_index = self.pool(|pool| pool.add_utf8(descriptor));
        let attributes = self.annotations(annotations);
        self.class.fields.push(FieldModel {
            access,
            name_index,
            descriptor_index,
            attributes,
        });
        self
    }

    /// Adds a field carrying an `int` `ConstantValue`.
    pub fn constant_field(
        mut self,
        access: FieldAccess,
        name: &str,
        value: i32,
        annotations: &[&str],
    ) -> Self {
        let constant_name = self.pool(|pool| pool.add_utf8(CONSTANT_VALUE));
        let value_index = self.pool(|pool| pool.add_integer(value));
        self = self.annotated_field(access, name, "I", annotations);
        if let Some(field) = self.class.fields.last_mut() {
            field.attributes.insert(
                0,
                Attribute {
                    name_index: constant_name,
                    body: AttrBody::ConstantValue(value_index),
                },
            );
        }
        self
    }

    /// Adds a method; `code` is `(max_stack, max_locals, bytecode)`.
    pub fn method(
        mut self,
        access: MethodAccess,
        name: &str,
        descriptor: &str,
        code: Option<(u16, u16, Vec<u8>)>,
    ) -> Self {
        let name_index = self.pool(|pool| pool.add_utf8(name));
        let descriptor_index = self.pool(|pool| pool.add_utf8(descriptor));
        let mut attributes = Vec::new();
        if let Some((max_stack, max_locals, code)) = code {
            attributes.push(Attribute {
                name_index: self.pool(|pool| pool.add_utf8(CODE)),
                body: AttrBody::Code(CodeAttribute {
                    max_stack,
                    max_locals,
                    code,
                    exception_table: Vec::new(),
                    attributes: Vec::new(),
                }),
            });
        }
        self.class.methods.push(MethodModel {
            access,
            name_index,
            descriptor_index,
            attributes,
        });
        self
    }

    /// Adds an opaque attribute to the class, e.g. `SourceFile`.
    pub fn raw_attribute(mut self, name: &str, info: Vec<u8>) -> Self {
        let name_index = self.pool(|pool| pool.add_utf8(name));
        self.class.attributes.push(Attribute {
            name_index,
            body: AttrBody::Raw(info),
        });
        self
    }

    pub fn build(self) -> ClassFileResult<ClassModel> {
        match self.error {
            Some(err) => Err(err),
            None => {
                self.class.validate()?;
                Ok(self.class)
            }
        }
    }

    pub fn build_bytes(self) -> ClassFileResult<Vec<u8>> {
        super::serialize(&self.build()?)
    }
}
