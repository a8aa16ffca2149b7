use std::borrow::Cow;

use smallvec::SmallVec;

use super::{
    access::{ClassAccess, FieldAccess, MethodAccess},
    attribute::{Annotation, AttrBody, Attribute, CodeAttribute},
    constant_pool::ConstantPool,
    error::ClassFileResult,
};

/// Name of instance initializers.
pub const CONSTRUCTOR: &str = "<init>";
pub const STATIC_INITIALIZER: &str = "<clinit>";

/// One parsed class container.
///
/// A model is built by [`super::parse`] (or [`super::ClassBuilder`]), mutated
/// in place, and written with [`super::serialize`]. Everything symbolic is an
/// index into `constant_pool`; [`ClassModel::validate`] checks them all.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassModel {
    pub minor_version: u16,
    pub major_version: u16,
    pub constant_pool: ConstantPool,
    pub access: ClassAccess,
    pub this_class: u16,
    /// Zero only for `java/lang/Object` and `module-info`.
    pub super_class: u16,
    pub interfaces: SmallVec<[u16; 4]>,
    pub fields: Vec<FieldModel>,
    pub methods: Vec<MethodModel>,
    pub attributes: Vec<Attribute>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldModel {
    pub access: FieldAccess,
    pub name_index: u16,
    pub descriptor_index: u16,
    pub attributes: Vec<Attribute>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodModel {
    pub access: MethodAccess,
    pub name_index: u16,
    pub descriptor_index: u16,
    pub attributes: Vec<Attribute>,
}

/// Shared view of fields and methods.
pub trait Member {
    fn name_index(&self) -> u16;
    fn descriptor_index(&self) -> u16;
    fn attributes(&self) -> &[Attribute];

    fn name<'p>(&self, pool: &'p ConstantPool) -> ClassFileResult<Cow<'p, str>> {
        pool.utf8(self.name_index())
    }

    fn descriptor<'p>(&self, pool: &'p ConstantPool) -> ClassFileResult<Cow<'p, str>> {
        pool.utf8(self.descriptor_index())
    }

    /// Annotations from `RuntimeVisibleAnnotations`, across all such
    /// attributes if a class file carries more than one.
    fn visible_annotations(&self) -> Box<dyn Iterator<Item = &Annotation> + '_> {
        visible_annotations(self.attributes())
    }
}

impl Member for FieldModel {
    fn name_index(&self) -> u16 {
        self.name_index
    }

    fn descriptor_index(&self) -> u16 {
        self.descriptor_index
    }

    fn attributes(&self) -> &[Attribute] {
        &self.attributes
    }
}

impl Member for MethodModel {
    fn name_index(&self) -> u16 {
        self.name_index
    }

    fn descriptor_index(&self) -> u16 {
        self.descriptor_index
    }

    fn attributes(&self) -> &[Attribute] {
        &self.attributes
    }
}

fn visible_annotations(attributes: &[Attribute]) -> Box<dyn Iterator<Item = &Annotation> + '_> {
    Box::new(attributes.iter().flat_map(|attribute| match &attribute.body {
        AttrBody::VisibleAnnotations(annotations) => annotations.as_slice(),
        _ => &[],
    }))
}

impl FieldModel {
    pub fn is_final(&self) -> bool {
        self.access.contains(FieldAccess::FINAL)
    }

    pub fn is_static(&self) -> bool {
        self.access.contains(FieldAccess::STATIC)
    }

    /// Pool index of the `ConstantValue` attribute, if present.
    pub fn constant_value(&self) -> Option<u16> {
        self.attributes.iter().find_map(|attribute| match attribute.body {
            AttrBody::ConstantValue(index) => Some(index),
            _ => None,
        })
    }
}

impl MethodModel {
    pub fn code(&self) -> Option<&CodeAttribute> {
        self.attributes.iter().find_map(|attribute| match &attribute.body {
            AttrBody::Code(code) => Some(code),
            _ => None,
        })
    }
}

impl ClassModel {
    /// Internal name of this class, e.g. `net/minecraft/init/Blocks`.
    pub fn name(&self) -> ClassFileResult<Cow<'_, str>> {
        self.constant_pool.class_name(self.this_class)
    }

    pub fn super_name(&self) -> ClassFileResult<Option<Cow<'_, str>>> {
        if self.super_class == 0 {
            return Ok(None);
        }
        self.constant_pool.class_name(self.super_class).map(Some)
    }

    pub fn interface_names(&self) -> ClassFileResult<Vec<Cow<'_, str>>> {
        self.interfaces
            .iter()
            .map(|index| self.constant_pool.class_name(*index))
            .collect()
    }

    pub fn visible_annotations(&self) -> impl Iterator<Item = &Annotation> + '_ {
        visible_annotations(&self.attributes)
    }

    /// Descriptors of the class-level visible annotations.
    pub fn annotation_descriptors(&self) -> ClassFileResult<Vec<Cow<'_, str>>> {
        annotation_descriptors(self.visible_annotations(), &self.constant_pool)
    }

    /// Descriptors of a member's visible annotations.
    pub fn member_annotation_descriptors(
        &self,
        member: &impl Member,
    ) -> ClassFileResult<Vec<Cow<'_, str>>> {
        annotation_descriptors(member.visible_annotations(), &self.constant_pool)
    }

    pub fn find_field(&self, name: &str, descriptor: &str) -> Option<usize> {
        find_member(&self.fields, &self.constant_pool, name, descriptor)
    }

    pub fn find_method(&self, name: &str, descriptor: &str) -> Option<usize> {
        find_member(&self.methods, &self.constant_pool, name, descriptor)
    }

    /// Checks every pool index the model refers to, including the pool's own
    /// internal references. A model that passes can be written safely.
    pub fn validate(&self) -> ClassFileResult<()> {
        let pool = &self.constant_pool;
        pool.validate()?;
        pool.check_class(self.this_class)?;
        if self.super_class != 0 {
            pool.check_class(self.super_class)?;
        }
        for interface in &self.interfaces {
            pool.check_class(*interface)?;
        }
        for field in &self.fields {
            validate_member(field, pool)?;
        }
        for method in &self.methods {
            validate_member(method, pool)?;
        }
        self.attributes
            .iter()
            .try_for_each(|attribute| attribute.validate(pool))
    }
}

fn annotation_descriptors<'a, 'p>(
    annotations: impl Iterator<Item = &'a Annotation>,
    pool: &'p ConstantPool,
) -> ClassFileResult<Vec<Cow<'p, str>>> {
    annotations
        .map(|annotation| annotation.descriptor(pool))
        .collect()
}

fn find_member<M: Member>(
    members: &[M],
    pool: &ConstantPool,
    name: &str,
    descriptor: &str,
) -> Option<usize> {
    members.iter().position(|member| {
        matches!(member.name(pool), Ok(n) if n == name)
            && matches!(member.descriptor(pool), Ok(d) if d == descriptor)
    })
}

fn validate_member(member: &impl Member, pool: &ConstantPool) -> ClassFileResult<()> {
    pool.check_utf8(member.name_index())?;
    pool.check_utf8(member.descriptor_index())?;
    member
        .attributes()
        .iter()
        .try_for_each(|attribute| attribute.validate(pool))
}
