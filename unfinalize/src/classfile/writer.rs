use super::{
    attribute::{Annotation, AttrBody, Attribute, ElementValue},
    error::{ClassFileError, ClassFileResult},
    model::{ClassModel, Member},
    reader::MAGIC,
};

trait PutBe {
    fn put_u8(&mut self, value: u8);
    fn put_u16(&mut self, value: u16);
    fn put_u32(&mut self, value: u32);
}

impl PutBe for Vec<u8> {
    fn put_u8(&mut self, value: u8) {
        self.push(value);
    }

    fn put_u16(&mut self, value: u16) {
        self.extend_from_slice(&value.to_be_bytes());
    }

    fn put_u32(&mut self, value: u32) {
        self.extend_from_slice(&value.to_be_bytes());
    }
}

fn count_u16(what: &'static str, count: usize) -> ClassFileResult<u16> {
    u16::try_from(count).map_err(|_| ClassFileError::LimitExceeded { what, count })
}

fn count_u32(what: &'static str, count: usize) -> ClassFileResult<u32> {
    u32::try_from(count).map_err(|_| ClassFileError::LimitExceeded { what, count })
}

/// Validates `class` and writes it as a class container.
pub fn serialize(class: &ClassModel) -> ClassFileResult<Vec<u8>> {
    class.validate()?;
    write_class(class)
}

/// Writes `class` without validating it first; callers must have done so.
pub(crate) fn write_class(class: &ClassModel) -> ClassFileResult<Vec<u8>> {
    let mut out = Vec::with_capacity(1024);
    out.put_u32(MAGIC);
    out.put_u16(class.minor_version);
    out.put_u16(class.major_version);

    out.put_u16(count_u16("constant pool", class.constant_pool.len())?);
    for constant in class.constant_pool.entries() {
        constant.write_to(&mut out);
    }

    out.put_u16(class.access.bits());
    out.put_u16(class.this_class);
    out.put_u16(class.super_class);

    out.put_u16(count_u16("interface", class.interfaces.len())?);
    for interface in &class.interfaces {
        out.put_u16(*interface);
    }

    out.put_u16(count_u16("field", class.fields.len())?);
    for field in &class.fields {
        out.put_u16(field.access.bits());
        write_member(&mut out, field)?;
    }

    out.put_u16(count_u16("method", class.methods.len())?);
    for method in &class.methods {
        out.put_u16(method.access.bits());
        write_member(&mut out, method)?;
    }

    write_attributes(&mut out, &class.attributes)?;
    Ok(out)
}

fn write_member(out: &mut Vec<u8>, member: &impl Member) -> ClassFileResult<()> {
    out.put_u16(member.name_index());
    out.put_u16(member.descriptor_index());
    write_attributes(out, member.attributes())
}

fn write_attributes(out: &mut Vec<u8>, attributes: &[Attribute]) -> ClassFileResult<()> {
    out.put_u16(count_u16("attribute", attributes.len())?);
    for attribute in attributes {
        out.put_u16(attribute.name_index);
        let body = attribute_body(&attribute.body)?;
        out.put_u32(count_u32("attribute length", body.len())?);
        out.extend_from_slice(&body);
    }
    Ok(())
}

fn attribute_body(body: &AttrBody) -> ClassFileResult<Vec<u8>> {
    let mut out = Vec::new();
    match body {
        AttrBody::ConstantValue(index) => out.put_u16(*index),
        AttrBody::Code(code) => {
            out.put_u16(code.max_stack);
            out.put_u16(code.max_locals);
            out.put_u32(count_u32("code length", code.code.len())?);
            out.extend_from_slice(&code.code);
            out.put_u16(count_u16("exception handler", code.exception_table.len())?);
            for handler in &code.exception_table {
                out.put_u16(handler.start_pc);
                out.put_u16(handler.end_pc);
                out.put_u16(handler.handler_pc);
                out.put_u16(handler.catch_type);
            }
            write_attributes(&mut out, &code.attributes)?;
        }
        AttrBody::VisibleAnnotations(annotations) | AttrBody::InvisibleAnnotations(annotations) => {
            out.put_u16(count_u16("annotation", annotations.len())?);
            for annotation in annotations {
                write_annotation(&mut out, annotation)?;
            }
        }
        AttrBody::Raw(bytes) => out.extend_from_slice(bytes),
    }
    Ok(out)
}

fn write_annotation(out: &mut Vec<u8>, annotation: &Annotation) -> ClassFileResult<()> {
    out.put_u16(annotation.type_index);
    out.put_u16(count_u16("annotation element", annotation.elements.len())?);
    for pair in &annotation.elements {
        out.put_u16(pair.name_index);
        write_element_value(out, &pair.value)?;
    }
    Ok(())
}

fn write_element_value(out: &mut Vec<u8>, value: &ElementValue) -> ClassFileResult<()> {
    match value {
        ElementValue::Const { tag, index } => {
            out.put_u8(*tag);
            out.put_u16(*index);
        }
        ElementValue::Enum {
            type_name,
            const_name,
        } => {
            out.put_u8(b'e');
            out.put_u16(*type_name);
            out.put_u16(*const_name);
        }
        ElementValue::Class(index) => {
            out.put_u8(b'c');
            out.put_u16(*index);
        }
        ElementValue::Annotation(annotation) => {
            out.put_u8(b'@');
            write_annotation(out, annotation)?;
        }
        ElementValue::Array(values) => {
            out.put_u8(b'[');
            out.put_u16(count_u16("array element", values.len())?);
            for value in values {
                write_element_value(out, value)?;
            }
        }
    }
    Ok(())
}
