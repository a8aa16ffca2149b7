//! Serializable overview of a class model, for the `dump` tool and for
//! eyeballing what the transform pass did.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::{
    classfile::{access::flag_names, ClassFileResult, ClassModel, Member},
    matcher::{HolderMarker, HolderMatcher},
    transform::{enums, EnumShape},
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClassSummary {
    pub name: String,
    pub super_name: Option<String>,
    pub interfaces: Vec<String>,
    pub version: String,
    pub access: Vec<&'static str>,
    pub annotations: Vec<String>,
    /// Pool entry counts by kind.
    pub constant_pool: BTreeMap<&'static str, usize>,
    pub fields: Vec<FieldSummary>,
    pub methods: Vec<MethodSummary>,
    pub attributes: Vec<String>,
    pub enum_shape: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldSummary {
    pub name: String,
    pub descriptor: String,
    pub access: Vec<&'static str>,
    pub annotations: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub holder_marker: Option<String>,
    pub has_constant_value: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MethodSummary {
    pub name: String,
    pub descriptor: String,
    pub access: Vec<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code_length: Option<usize>,
}

impl ClassSummary {
    pub fn new(class: &ClassModel, matcher: &HolderMatcher) -> ClassFileResult<Self> {
        let pool = &class.constant_pool;

        let mut constant_pool = BTreeMap::new();
        for (_, constant) in pool.iter() {
            *constant_pool
                .entry(<&'static str>::from(constant))
                .or_insert(0) += 1;
        }

        let mut fields = Vec::with_capacity(class.fields.len());
        for field in &class.fields {
            let annotations = owned(class.member_annotation_descriptors(field)?);
            let holder_marker = annotations
                .iter()
                .find_map(|descriptor| matcher.holder_marker(descriptor))
                .map(|marker: HolderMarker| marker.to_string());
            fields.push(FieldSummary {
                name: field.name(pool)?.into_owned(),
                descriptor: field.descriptor(pool)?.into_owned(),
                access: flag_names(&field.access),
                annotations,
                holder_marker,
                has_constant_value: field.constant_value().is_some(),
            });
        }

        let mut methods = Vec::with_capacity(class.methods.len());
        for method in &class.methods {
            methods.push(MethodSummary {
                name: method.name(pool)?.into_owned(),
                descriptor: method.descriptor(pool)?.into_owned(),
                access: flag_names(&method.access),
                code_length: method.code().map(|code| code.code.len()),
            });
        }

        let enum_shape = match enums::inspect(class)? {
            EnumShape::NotEnum => "not an enum".to_owned(),
            EnumShape::Unsupported(reason) => format!("unsupported: {reason}"),
            EnumShape::Extensible { values_field, .. } => {
                format!("extensible via {}", class.fields[values_field].name(pool)?)
            }
        };

        Ok(Self {
            name: class.name()?.into_owned(),
            super_name: class.super_name()?.map(|name| name.into_owned()),
            interfaces: owned(class.interface_names()?),
            version: format!("{}.{}", class.major_version, class.minor_version),
            access: flag_names(&class.access),
            annotations: owned(class.annotation_descriptors()?),
            constant_pool,
            fields,
            methods,
            attributes: class
                .attributes
                .iter()
                .map(|attribute| pool.utf8(attribute.name_index).map(|name| name.into_owned()))
                .collect::<ClassFileResult<_>>()?,
            enum_shape,
        })
    }
}

fn owned(names: Vec<std::borrow::Cow<'_, str>>) -> Vec<String> {
    names.into_iter().map(|name| name.into_owned()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classfile::{ClassBuilder, FieldAccess};

    #[test]
    fn summary_names_markers_and_pool_kinds() {
        let class = ClassBuilder::new("com/example/Foo")
            .annotated_field(
                FieldAccess::PUBLIC | FieldAccess::STATIC | FieldAccess::FINAL,
                "bar",
                "I",
                &["Lcpw/mods/fml/common/registry/GameRegistry/ObjectHolder;"],
            )
            .build()
            .unwrap();
        let summary = ClassSummary::new(&class, &HolderMatcher::default()).unwrap();

        assert_eq!(summary.name, "com/example/Foo");
        assert_eq!(summary.super_name.as_deref(), Some("java/lang/Object"));
        assert_eq!(summary.version, "52.0");
        assert_eq!(summary.enum_shape, "not an enum");
        assert_eq!(summary.fields[0].access, vec!["PUBLIC", "STATIC", "FINAL"]);
        assert_eq!(summary.fields[0].holder_marker.as_deref(), Some("ObjectHolder"));
        assert_eq!(summary.constant_pool["Class"], 2);
        assert!(!summary.constant_pool.contains_key("Unusable"));

        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["fields"][0]["name"], "bar");
    }
}
