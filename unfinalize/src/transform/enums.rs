//! Making enum-shaped classes accept new constants after class init.
//!
//! An enum keeps its constants in a static array (`$VALUES` for javac,
//! `ENUM$VALUES` for ecj) that `values()` clones and that is normally final,
//! with private constructors. To let a host create and register more
//! constants later, this rule
//!
//! 1. clears `final` on the values array field,
//! 2. makes every constructor public, and
//! 3. adds a synchronized static `$addEnumValue(T)V` that grows the array
//!    by one with `Arrays.copyOf`, stores the new constant in the last slot
//!    and writes the array back.
//!
//! The field keeps its name and descriptor, so `values()`, the static
//! initializer and any other class reading the field keep working and see
//! the grown array.

use tracing::debug;

use super::{
    bytecode::{opcodes::*, CodeBuilder},
    TransformError,
};
use crate::classfile::{
    attribute::CODE, AttrBody, Attribute, ClassAccess, ClassFileResult, ClassModel,
    CodeAttribute, Constant, FieldAccess, Member, MethodAccess, MethodModel,
};

pub const ENUM_BASE: &str = "java/lang/Enum";
pub const APPEND_METHOD: &str = "$addEnumValue";
const PREFERRED_VALUES_FIELDS: [&str; 2] = ["$VALUES", "ENUM$VALUES"];
const ARRAYS: &str = "java/util/Arrays";
const COPY_OF: &str = "copyOf";
const COPY_OF_DESCRIPTOR: &str = "([Ljava/lang/Object;I)[Ljava/lang/Object;";

/// What the rule changed in one class.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EnumPatch {
    pub values_unfinalized: bool,
    pub constructors_opened: usize,
    pub append_method_added: bool,
}

impl EnumPatch {
    pub fn is_empty(&self) -> bool {
        self.mutations() == 0
    }

    pub fn mutations(&self) -> usize {
        self.values_unfinalized as usize
            + self.constructors_opened
            + self.append_method_added as usize
    }
}

/// Result of looking at a class before touching it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnumShape {
    NotEnum,
    /// Enum-shaped, but missing a piece the rule relies on.
    Unsupported(&'static str),
    Extensible {
        values_field: usize,
        constructors: Vec<usize>,
    },
}

pub fn is_enum_shaped(class: &ClassModel) -> ClassFileResult<bool> {
    Ok(class.access.contains(ClassAccess::ENUM)
        || class.super_name()?.is_some_and(|name| name == ENUM_BASE))
}

pub fn inspect(class: &ClassModel) -> ClassFileResult<EnumShape> {
    if !is_enum_shaped(class)? {
        return Ok(EnumShape::NotEnum);
    }
    if class.access.contains(ClassAccess::INTERFACE) {
        return Ok(EnumShape::Unsupported("interface flagged as enum"));
    }

    let pool = &class.constant_pool;
    let array_descriptor = format!("[L{};", class.name()?);

    let mut candidates = Vec::new();
    for (index, field) in class.fields.iter().enumerate() {
        if field.is_static() && field.descriptor(pool)? == array_descriptor {
            candidates.push((index, field.name(pool)?));
        }
    }
    let values_field = PREFERRED_VALUES_FIELDS
        .iter()
        .find_map(|preferred| {
            candidates
                .iter()
                .find(|(_, name)| name == preferred)
                .map(|(index, _)| *index)
        })
        .or_else(|| {
            candidates
                .iter()
                .map(|(index, _)| *index)
                .find(|index| class.fields[*index].access.contains(FieldAccess::SYNTHETIC))
        });
    let Some(values_field) = values_field else {
        return Ok(EnumShape::Unsupported("no values array field"));
    };

    let mut constructors = Vec::new();
    for (index, method) in class.methods.iter().enumerate() {
        if method.name(pool)? == crate::classfile::model::CONSTRUCTOR {
            constructors.push(index);
        }
    }
    if constructors.is_empty() {
        return Ok(EnumShape::Unsupported("no constructor"));
    }

    Ok(EnumShape::Extensible {
        values_field,
        constructors,
    })
}

/// Applies the rule to `class`. Classes that are not enum-shaped, or that
/// lack the expected shape, come back untouched with an empty patch.
pub fn make_extensible(class: &mut ClassModel) -> Result<EnumPatch, TransformError> {
    let (values_field, constructors) = match inspect(class)? {
        EnumShape::NotEnum => return Ok(EnumPatch::default()),
        EnumShape::Unsupported(reason) => {
            debug!("Enum {} left alone: {}", class.name()?, reason);
            return Ok(EnumPatch::default());
        }
        EnumShape::Extensible {
            values_field,
            constructors,
        } => (values_field, constructors),
    };

    let mut patch = EnumPatch::default();

    let field = &mut class.fields[values_field];
    if field.is_final() {
        field.access.remove(FieldAccess::FINAL);
        patch.values_unfinalized = true;
    }

    for index in constructors {
        let method = &mut class.methods[index];
        if !method.access.contains(MethodAccess::PUBLIC) {
            method.access.remove(MethodAccess::PRIVATE | MethodAccess::PROTECTED);
            method.access.insert(MethodAccess::PUBLIC);
            patch.constructors_opened += 1;
        }
    }

    let class_name = class.name()?.into_owned();
    let append_descriptor = format!("(L{class_name};)V");
    if class.find_method(APPEND_METHOD, &append_descriptor).is_none() {
        let method = append_method(class, &class_name, values_field, &append_descriptor)?;
        class.methods.push(method);
        patch.append_method_added = true;
    }

    check_consistency(class, &class_name, values_field)?;
    Ok(patch)
}

fn append_method(
    class: &mut ClassModel,
    class_name: &str,
    values_field: usize,
    descriptor: &str,
) -> ClassFileResult<MethodModel> {
    let values = &class.fields[values_field];
    let values_name = values.name(&class.constant_pool)?.into_owned();
    let values_descriptor = values.descriptor(&class.constant_pool)?.into_owned();

    let pool = &mut class.constant_pool;
    let values_ref = pool.add_field_ref(class_name, &values_name, &values_descriptor)?;
    let copy_of = pool.add_method_ref(ARRAYS, COPY_OF, COPY_OF_DESCRIPTOR)?;
    // Array classes are named by their descriptor.
    let array_class = pool.add_class(&values_descriptor)?;
    let code_name = pool.add_utf8(CODE)?;
    let name_index = pool.add_utf8(APPEND_METHOD)?;
    let descriptor_index = pool.add_utf8(descriptor)?;

    // locals: 0 = new constant, 1 = old array, 2 = grown array
    let code = CodeBuilder::new()
        .op_index(GETSTATIC, values_ref)
        .op(ASTORE_1)
        .op(ALOAD_1)
        .op(ALOAD_1)
        .op(ARRAYLENGTH)
        .op(ICONST_1)
        .op(IADD)
        .op_index(INVOKESTATIC, copy_of)
        .op_index(CHECKCAST, array_class)
        .op(ASTORE_2)
        .op(ALOAD_2)
        .op(ALOAD_1)
        .op(ARRAYLENGTH)
        .op(ALOAD_0)
        .op(AASTORE)
        .op(ALOAD_2)
        .op_index(PUTSTATIC, values_ref)
        .op(RETURN)
        .finish();

    Ok(MethodModel {
        access: MethodAccess::PUBLIC
            | MethodAccess::STATIC
            | MethodAccess::SYNCHRONIZED
            | MethodAccess::SYNTHETIC,
        name_index,
        descriptor_index,
        attributes: vec![Attribute {
            name_index: code_name,
            body: AttrBody::Code(CodeAttribute {
                max_stack: 3,
                max_locals: 3,
                code,
                exception_table: Vec::new(),
                attributes: Vec::new(),
            }),
        }],
    })
}

/// Every `Fieldref` naming this class's values field must agree with the
/// field's descriptor, and the whole model must still resolve.
fn check_consistency(
    class: &ClassModel,
    class_name: &str,
    values_field: usize,
) -> Result<(), TransformError> {
    let pool = &class.constant_pool;
    let field = &class.fields[values_field];
    let name = field.name(pool)?;
    let descriptor = field.descriptor(pool)?;

    for (index, constant) in pool.iter() {
        if !matches!(constant, Constant::FieldRef(..)) {
            continue;
        }
        let member = pool.member_ref(index)?;
        if member.owner == class_name && member.name == name && member.descriptor != descriptor {
            return Err(TransformError::InconsistentMutation {
                class: class_name.to_owned(),
                reason: format!(
                    "field reference #{index} reads {name} as {} but the field is {descriptor}",
                    member.descriptor
                ),
            });
        }
    }

    class
        .validate()
        .map_err(|err| TransformError::InconsistentMutation {
            class: class_name.to_owned(),
            reason: err.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classfile::{self, ClassBuilder};

    const COLOR: &str = "com/example/Color";
    const VALUES_DESCRIPTOR: &str = "[Lcom/example/Color;";

    fn color_enum() -> ClassBuilder {
        ClassBuilder::new(COLOR)
            .access(ClassAccess::PUBLIC | ClassAccess::FINAL | ClassAccess::SUPER | ClassAccess::ENUM)
            .super_class(ENUM_BASE)
            .field(
                FieldAccess::PUBLIC | FieldAccess::STATIC | FieldAccess::FINAL | FieldAccess::ENUM,
                "RED",
                "Lcom/example/Color;",
            )
            .field(
                FieldAccess::PRIVATE
                    | FieldAccess::STATIC
                    | FieldAccess::FINAL
                    | FieldAccess::SYNTHETIC,
                "$VALUES",
                VALUES_DESCRIPTOR,
            )
            .method(
                MethodAccess::PRIVATE,
                "<init>",
                "(Ljava/lang/String;I)V",
                Some((3, 3, vec![RETURN])),
            )
    }

    #[test]
    fn plain_class_is_not_enum() {
        let mut class = ClassBuilder::new("com/example/Plain")
            .method(MethodAccess::PRIVATE, "<init>", "()V", Some((1, 1, vec![RETURN])))
            .build()
            .unwrap();
        let before = class.clone();
        assert_eq!(inspect(&class).unwrap(), EnumShape::NotEnum);
        assert!(make_extensible(&mut class).unwrap().is_empty());
        assert_eq!(class, before);
    }

    #[test]
    fn enum_is_patched() {
        let mut class = color_enum().build().unwrap();
        let patch = make_extensible(&mut class).unwrap();
        assert_eq!(
            patch,
            EnumPatch {
                values_unfinalized: true,
                constructors_opened: 1,
                append_method_added: true,
            }
        );
        assert_eq!(patch.mutations(), 3);

        assert!(!class.fields[1].is_final());
        assert!(class.fields[0].is_final(), "constants themselves stay final");
        let ctor = &class.methods[0];
        assert!(ctor.access.contains(MethodAccess::PUBLIC));
        assert!(!ctor.access.contains(MethodAccess::PRIVATE));

        let index = class
            .find_method(APPEND_METHOD, "(Lcom/example/Color;)V")
            .unwrap();
        let method = &class.methods[index];
        assert!(method
            .access
            .contains(MethodAccess::STATIC | MethodAccess::SYNCHRONIZED | MethodAccess::SYNTHETIC));
        let code = method.code().unwrap();
        assert_eq!(code.code.len(), 26);
        assert_eq!(code.code[0], GETSTATIC);
        assert_eq!(*code.code.last().unwrap(), RETURN);

        let values_ref = u16::from_be_bytes([code.code[1], code.code[2]]);
        let member = class.constant_pool.member_ref(values_ref).unwrap();
        assert_eq!(member.owner, COLOR);
        assert_eq!(member.name, "$VALUES");
        assert_eq!(member.descriptor, VALUES_DESCRIPTOR);

        let checkcast_at = code.code.iter().position(|op| *op == CHECKCAST).unwrap();
        let array_class = u16::from_be_bytes([code.code[checkcast_at + 1], code.code[checkcast_at + 2]]);
        assert_eq!(
            class.constant_pool.class_name(array_class).unwrap(),
            VALUES_DESCRIPTOR
        );

        // The patched model survives a round trip.
        let bytes = classfile::serialize(&class).unwrap();
        assert_eq!(classfile::parse(&bytes).unwrap(), class);
    }

    #[test]
    fn second_run_changes_nothing() {
        let mut class = color_enum().build().unwrap();
        make_extensible(&mut class).unwrap();
        let once = class.clone();
        assert!(make_extensible(&mut class).unwrap().is_empty());
        assert_eq!(class, once);
    }

    #[test]
    fn ecj_values_field_is_found() {
        let class = ClassBuilder::new(COLOR)
            .access(ClassAccess::PUBLIC | ClassAccess::ENUM)
            .super_class(ENUM_BASE)
            .field(
                FieldAccess::PRIVATE | FieldAccess::STATIC | FieldAccess::FINAL,
                "cache",
                VALUES_DESCRIPTOR,
            )
            .field(
                FieldAccess::PRIVATE
                    | FieldAccess::STATIC
                    | FieldAccess::FINAL
                    | FieldAccess::SYNTHETIC,
                "ENUM$VALUES",
                VALUES_DESCRIPTOR,
            )
            .method(MethodAccess::PRIVATE, "<init>", "(Ljava/lang/String;I)V", None)
            .build()
            .unwrap();
        assert_eq!(
            inspect(&class).unwrap(),
            EnumShape::Extensible {
                values_field: 1,
                constructors: vec![0],
            }
        );
    }

    #[test]
    fn enum_without_values_array_is_unsupported() {
        let mut class = ClassBuilder::new(COLOR)
            .access(ClassAccess::PUBLIC | ClassAccess::ENUM)
            .super_class(ENUM_BASE)
            .method(MethodAccess::PRIVATE, "<init>", "(Ljava/lang/String;I)V", None)
            .build()
            .unwrap();
        assert_eq!(
            inspect(&class).unwrap(),
            EnumShape::Unsupported("no values array field")
        );
        assert!(make_extensible(&mut class).unwrap().is_empty());
    }

    #[test]
    fn enum_without_constructor_is_unsupported() {
        let class = color_enum().build().unwrap();
        let mut class = ClassModel {
            methods: Vec::new(),
            ..class
        };
        assert_eq!(inspect(&class).unwrap(), EnumShape::Unsupported("no constructor"));
        assert!(make_extensible(&mut class).unwrap().is_empty());
    }

    #[test]
    fn mismatched_field_reference_is_inconsistent() {
        let mut class = color_enum().build().unwrap();
        class
            .constant_pool
            .add_field_ref(COLOR, "$VALUES", "[Ljava/lang/Object;")
            .unwrap();
        assert!(matches!(
            make_extensible(&mut class),
            Err(TransformError::InconsistentMutation { .. })
        ));
    }
}
