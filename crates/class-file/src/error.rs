use thiserror::Error;

/// Result type for class-file parsing
pub type Result<T> = std::result::Result<T, ClassFileError>;

/// Errors raised while decoding a single class file.
///
/// Every variant means the current file is unusable; callers are expected
/// to isolate the failure per file and keep importing the rest.
#[derive(Error, Debug)]
pub enum ClassFileError {
    /// The file does not start with the class-file magic number
    #[error("invalid magic number: {0:#010x}")]
    InvalidMagic(u32),

    /// A constant pool entry uses a tag this reader does not know
    #[error("unsupported constant pool tag: {0}")]
    UnsupportedConstantTag(u8),

    /// A constant pool index is out of range or points at the wrong kind of entry
    #[error("bad constant pool index {index}: expected {expected}")]
    BadConstantPoolIndex { index: u16, expected: &'static str },

    /// Structural violation that does not fit a more specific variant
    #[error("malformed class file: {0}")]
    Malformed(String),

    /// Truncated input or other read failure
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ClassFileError {
    pub(crate) fn malformed(msg: impl Into<String>) -> Self {
        Self::Malformed(msg.into())
    }

    pub(crate) fn bad_index(index: u16, expected: &'static str) -> Self {
        Self::BadConstantPoolIndex { index, expected }
    }
}
