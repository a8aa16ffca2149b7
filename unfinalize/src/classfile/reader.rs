use smallvec::SmallVec;

use super::{
    access::{ClassAccess, FieldAccess, MethodAccess},
    attribute::{
        Annotation, AttrBody, Attribute, CodeAttribute, ElementPair, ElementValue,
        ExceptionHandler, CODE, CONSTANT_VALUE, MAX_ANNOTATION_NESTING,
        RUNTIME_INVISIBLE_ANNOTATIONS, RUNTIME_VISIBLE_ANNOTATIONS,
    },
    constant_pool::{self, Constant, ConstantPool},
    error::{ClassFileError, ClassFileResult},
    model::{ClassModel, FieldModel, MethodModel},
};

pub const MAGIC: u32 = 0xcafe_babe;
pub const MIN_MAJOR_VERSION: u16 = 45;
/// Java 25.
pub const MAX_MAJOR_VERSION: u16 = 69;

/// Big-endian cursor over a byte slice.
pub(crate) struct ByteReader<'a> {
    data: &'a [u8],
    offset: usize,
}

impl<'a> ByteReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, offset: 0 }
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.offset
    }

    pub fn bytes(&mut self, len: usize) -> ClassFileResult<&'a [u8]> {
        if self.remaining() < len {
            return Err(ClassFileError::UnexpectedEof {
                offset: self.offset,
                needed: len - self.remaining(),
            });
        }
        let slice = &self.data[self.offset..self.offset + len];
        self.offset += len;
        Ok(slice)
    }

    pub fn u8(&mut self) -> ClassFileResult<u8> {
        Ok(self.bytes(1)?[0])
    }

    pub fn u16(&mut self) -> ClassFileResult<u16> {
        let b = self.bytes(2)?;
        Ok(u16::from_be_bytes([b[0], b[1]]))
    }

    pub fn u32(&mut self) -> ClassFileResult<u32> {
        let b = self.bytes(4)?;
        Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    pub fn u64(&mut self) -> ClassFileResult<u64> {
        let b = self.bytes(8)?;
        let mut buf = [0; 8];
        buf.copy_from_slice(b);
        Ok(u64::from_be_bytes(buf))
    }
}

/// Parses a complete class container.
///
/// Fails on anything structurally wrong: bad magic, unsupported version,
/// truncation, unknown pool tags, pool indices that do not resolve to an
/// entry of the required kind, decoded attributes whose declared length
/// disagrees with their content, and trailing bytes.
pub fn parse(data: &[u8]) -> ClassFileResult<ClassModel> {
    let mut reader = ByteReader::new(data);

    let magic = reader.u32()?;
    if magic != MAGIC {
        return Err(ClassFileError::BadMagic(magic));
    }
    let minor_version = reader.u16()?;
    let major_version = reader.u16()?;
    if !(MIN_MAJOR_VERSION..=MAX_MAJOR_VERSION).contains(&major_version) {
        return Err(ClassFileError::UnsupportedVersion {
            major: major_version,
            minor: minor_version,
        });
    }

    let constant_pool = read_constant_pool(&mut reader)?;
    constant_pool.validate()?;

    let access = ClassAccess::from_bits_retain(reader.u16()?);
    let this_class = reader.u16()?;
    constant_pool.check_class(this_class)?;
    let super_class = reader.u16()?;
    if super_class != 0 {
        constant_pool.check_class(super_class)?;
    }

    let interface_count = reader.u16()?;
    let mut interfaces = SmallVec::with_capacity(interface_count as usize);
    for _ in 0..interface_count {
        let interface = reader.u16()?;
        constant_pool.check_class(interface)?;
        interfaces.push(interface);
    }

    let field_count = reader.u16()?;
    let mut fields = Vec::with_capacity(field_count as usize);
    for _ in 0..field_count {
        let (access, name_index, descriptor_index, attributes) =
            read_member(&mut reader, &constant_pool)?;
        fields.push(FieldModel {
            access: FieldAccess::from_bits_retain(access),
            name_index,
            descriptor_index,
            attributes,
        });
    }

    let method_count = reader.u16()?;
    let mut methods = Vec::with_capacity(method_count as usize);
    for _ in 0..method_count {
        let (access, name_index, descriptor_index, attributes) =
            read_member(&mut reader, &constant_pool)?;
        methods.push(MethodModel {
            access: MethodAccess::from_bits_retain(access),
            name_index,
            descriptor_index,
            attributes,
        });
    }

    let attributes = read_attributes(&mut reader, &constant_pool)?;

    if reader.remaining() != 0 {
        return Err(ClassFileError::TrailingBytes(reader.remaining()));
    }

    Ok(ClassModel {
        minor_version,
        major_version,
        constant_pool,
        access,
        this_class,
        super_class,
        interfaces,
        fields,
        methods,
        attributes,
    })
}

fn read_constant_pool(reader: &mut ByteReader<'_>) -> ClassFileResult<ConstantPool> {
    let count = reader.u16()?;
    let mut entries = Vec::with_capacity(count as usize);
    entries.push(Constant::Unusable);

    while entries.len() < count as usize {
        let index = entries.len() as u16;
        let tag = reader.u8()?;
        let constant = match tag {
            constant_pool::UTF8 => {
                let len = reader.u16()? as usize;
                Constant::Utf8(reader.bytes(len)?.to_vec())
            }
            constant_pool::INTEGER => Constant::Integer(reader.u32()? as i32),
            constant_pool::FLOAT => Constant::Float(reader.u32()?),
            constant_pool::LONG => Constant::Long(reader.u64()? as i64),
            constant_pool::DOUBLE => Constant::Double(reader.u64()?),
            constant_pool::CLASS => Constant::Class(reader.u16()?),
            constant_pool::STRING => Constant::String(reader.u16()?),
            constant_pool::FIELD_REF => Constant::FieldRef(reader.u16()?, reader.u16()?),
            constant_pool::METHOD_REF => Constant::MethodRef(reader.u16()?, reader.u16()?),
            constant_pool::INTERFACE_METHOD_REF => {
                Constant::InterfaceMethodRef(reader.u16()?, reader.u16()?)
            }
            constant_pool::NAME_AND_TYPE => Constant::NameAndType(reader.u16()?, reader.u16()?),
            constant_pool::METHOD_HANDLE => Constant::MethodHandle(reader.u8()?, reader.u16()?),
            constant_pool::METHOD_TYPE => Constant::MethodType(reader.u16()?),
            constant_pool::DYNAMIC => Constant::Dynamic(reader.u16()?, reader.u16()?),
            constant_pool::INVOKE_DYNAMIC => Constant::InvokeDynamic(reader.u16()?, reader.u16()?),
            constant_pool::MODULE => Constant::Module(reader.u16()?),
            constant_pool::PACKAGE => Constant::Package(reader.u16()?),
            tag => return Err(ClassFileError::UnknownConstantTag { tag, index }),
        };
        let wide = constant.is_wide();
        entries.push(constant);
        if wide {
            // A wide entry in the last slot would claim a slot past the end.
            if entries.len() >= count as usize {
                return Err(ClassFileError::BadConstantIndex {
                    index,
                    expected: "two-slot constant within the pool",
                });
            }
            entries.push(Constant::Unusable);
        }
    }

    Ok(ConstantPool::from_entries(entries))
}

type RawMember = (u16, u16, u16, Vec<Attribute>);

fn read_member(reader: &mut ByteReader<'_>, pool: &ConstantPool) -> ClassFileResult<RawMember> {
    let access = reader.u16()?;
    let name_index = reader.u16()?;
    pool.check_utf8(name_index)?;
    let descriptor_index = reader.u16()?;
    pool.check_utf8(descriptor_index)?;
    let attributes = read_attributes(reader, pool)?;
    Ok((access, name_index, descriptor_index, attributes))
}

fn read_attributes(
    reader: &mut ByteReader<'_>,
    pool: &ConstantPool,
) -> ClassFileResult<Vec<Attribute>> {
    let count = reader.u16()?;
    let mut attributes = Vec::with_capacity(count as usize);
    for _ in 0..count {
        attributes.push(read_attribute(reader, pool)?);
    }
    Ok(attributes)
}

fn read_attribute(reader: &mut ByteReader<'_>, pool: &ConstantPool) -> ClassFileResult<Attribute> {
    let name_index = reader.u16()?;
    let name = pool.utf8(name_index)?;
    let len = reader.u32()? as usize;
    let info = reader.bytes(len)?;

    let mut body_reader = ByteReader::new(info);
    let body = match name.as_ref() {
        CONSTANT_VALUE => {
            let index = body_reader.u16()?;
            pool.check_constant_value(index)?;
            AttrBody::ConstantValue(index)
        }
        CODE => AttrBody::Code(read_code(&mut body_reader, pool)?),
        RUNTIME_VISIBLE_ANNOTATIONS => {
            AttrBody::VisibleAnnotations(read_annotations(&mut body_reader, pool)?)
        }
        RUNTIME_INVISIBLE_ANNOTATIONS => {
            AttrBody::InvisibleAnnotations(read_annotations(&mut body_reader, pool)?)
        }
        _ => {
            return Ok(Attribute {
                name_index,
                body: AttrBody::Raw(info.to_vec()),
            })
        }
    };

    if body_reader.remaining() != 0 {
        return Err(ClassFileError::AttributeLength {
            name: name.into_owned(),
            declared: len,
            consumed: len - body_reader.remaining(),
        });
    }

    Ok(Attribute { name_index, body })
}

fn read_code(reader: &mut ByteReader<'_>, pool: &ConstantPool) -> ClassFileResult<CodeAttribute> {
    let max_stack = reader.u16()?;
    let max_locals = reader.u16()?;
    let code_len = reader.u32()? as usize;
    let code = reader.bytes(code_len)?.to_vec();

    let handler_count = reader.u16()?;
    let mut exception_table = Vec::with_capacity(handler_count as usize);
    for _ in 0..handler_count {
        let handler = ExceptionHandler {
            start_pc: reader.u16()?,
            end_pc: reader.u16()?,
            handler_pc: reader.u16()?,
            catch_type: reader.u16()?,
        };
        if handler.catch_type != 0 {
            pool.check_class(handler.catch_type)?;
        }
        exception_table.push(handler);
    }

    let attributes = read_attributes(reader, pool)?;

    Ok(CodeAttribute {
        max_stack,
        max_locals,
        code,
        exception_table,
        attributes,
    })
}

fn read_annotations(
    reader: &mut ByteReader<'_>,
    pool: &ConstantPool,
) -> ClassFileResult<Vec<Annotation>> {
    let count = reader.u16()?;
    let mut annotations = Vec::with_capacity(count as usize);
    for _ in 0..count {
        annotations.push(read_annotation(reader, pool, 0)?);
    }
    Ok(annotations)
}

fn read_annotation(
    reader: &mut ByteReader<'_>,
    pool: &ConstantPool,
    depth: usize,
) -> ClassFileResult<Annotation> {
    if depth > MAX_ANNOTATION_NESTING {
        return Err(ClassFileError::AnnotationTooDeep(MAX_ANNOTATION_NESTING));
    }
    let type_index = reader.u16()?;
    pool.check_utf8(type_index)?;

    let pair_count = reader.u16()?;
    let mut elements = Vec::with_capacity(pair_count as usize);
    for _ in 0..pair_count {
        let name_index = reader.u16()?;
        pool.check_utf8(name_index)?;
        let value = read_element_value(reader, pool, depth + 1)?;
        elements.push(ElementPair { name_index, value });
    }

    Ok(Annotation {
        type_index,
        elements,
    })
}

fn read_element_value(
    reader: &mut ByteReader<'_>,
    pool: &ConstantPool,
    depth: usize,
) -> ClassFileResult<ElementValue> {
    if depth > MAX_ANNOTATION_NESTING {
        return Err(ClassFileError::AnnotationTooDeep(MAX_ANNOTATION_NESTING));
    }
    let tag = reader.u8()?;
    let value = match tag {
        b'B' | b'C' | b'D' | b'F' | b'I' | b'J' | b'S' | b'Z' | b's' => ElementValue::Const {
            tag,
            index: reader.u16()?,
        },
        b'e' => ElementValue::Enum {
            type_name: reader.u16()?,
            const_name: reader.u16()?,
        },
        b'c' => ElementValue::Class(reader.u16()?),
        b'@' => ElementValue::Annotation(read_annotation(reader, pool, depth + 1)?),
        b'[' => {
            let count = reader.u16()?;
            let mut values = Vec::with_capacity(count as usize);
            for _ in 0..count {
                values.push(read_element_value(reader, pool, depth + 1)?);
            }
            ElementValue::Array(values)
        }
        tag => return Err(ClassFileError::UnknownElementTag(tag)),
    };

    // Arrays and nested annotations were checked element by element.
    if !matches!(value, ElementValue::Array(_) | ElementValue::Annotation(_)) {
        value.validate(pool)?;
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header(major: u16) -> Vec<u8> {
        let mut data = MAGIC.to_be_bytes().to_vec();
        data.extend_from_slice(&0u16.to_be_bytes());
        data.extend_from_slice(&major.to_be_bytes());
        data
    }

    #[test]
    fn rejects_bad_magic() {
        let data = [0xde, 0xad, 0xbe, 0xef, 0, 0, 0, 52];
        assert_eq!(parse(&data), Err(ClassFileError::BadMagic(0xdead_beef)));
    }

    #[test]
    fn rejects_unknown_version() {
        assert_eq!(
            parse(&header(99)),
            Err(ClassFileError::UnsupportedVersion {
                major: 99,
                minor: 0
            })
        );
    }

    #[test]
    fn rejects_truncated_pool() {
        let mut data = header(52);
        data.extend_from_slice(&3u16.to_be_bytes());
        data.push(constant_pool::UTF8);
        data.extend_from_slice(&10u16.to_be_bytes());
        data.extend_from_slice(b"abc");
        assert!(matches!(
            parse(&data),
            Err(ClassFileError::UnexpectedEof { needed: 7, .. })
        ));
    }

    #[test]
    fn rejects_unknown_tag() {
        let mut data = header(52);
        data.extend_from_slice(&2u16.to_be_bytes());
        data.push(2);
        assert_eq!(
            parse(&data),
            Err(ClassFileError::UnknownConstantTag { tag: 2, index: 1 })
        );
    }

    #[test]
    fn rejects_class_pointing_past_the_pool() {
        let mut data = header(52);
        data.extend_from_slice(&2u16.to_be_bytes());
        data.push(constant_pool::CLASS);
        data.extend_from_slice(&9u16.to_be_bytes());
        assert_eq!(
            parse(&data),
            Err(ClassFileError::BadConstantIndex {
                index: 9,
                expected: "Utf8"
            })
        );
    }

    #[test]
    fn rejects_wide_constant_in_last_slot() {
        let mut data = header(52);
        data.extend_from_slice(&2u16.to_be_bytes());
        data.push(constant_pool::LONG);
        data.extend_from_slice(&1u64.to_be_bytes());
        assert!(matches!(
            parse(&data),
            Err(ClassFileError::BadConstantIndex { index: 1, .. })
        ));
    }
}
