use thiserror::Error;

/// Structural failures while reading or writing a class container.
///
/// Every variant means the bytes (or the model about to be written) are not a
/// well-formed class file; callers treat them all alike.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClassFileError {
    #[error("bad magic 0x{0:08x}")]
    BadMagic(u32),
    #[error("unsupported class file version {major}.{minor}")]
    UnsupportedVersion { major: u16, minor: u16 },
    #[error("unexpected end of data at offset {offset} (needed {needed} more bytes)")]
    UnexpectedEof { offset: usize, needed: usize },
    #[error("unknown constant pool tag {tag} at index {index}")]
    UnknownConstantTag { tag: u8, index: u16 },
    #[error("constant pool index {index} does not resolve to a {expected} entry")]
    BadConstantIndex { index: u16, expected: &'static str },
    #[error("attribute {name} declares {declared} bytes but {consumed} were consumed")]
    AttributeLength {
        name: String,
        declared: usize,
        consumed: usize,
    },
    #[error("attribute {0} is stored under a different name")]
    AttributeNameMismatch(&'static str),
    #[error("unknown annotation element tag 0x{0:02x}")]
    UnknownElementTag(u8),
    #[error("annotation nesting exceeds {0} levels")]
    AnnotationTooDeep(usize),
    #[error("{0} trailing bytes after class data")]
    TrailingBytes(usize),
    #[error("{what} count {count} does not fit the class file limit")]
    LimitExceeded { what: &'static str, count: usize },
}

pub type ClassFileResult<T> = Result<T, ClassFileError>;
