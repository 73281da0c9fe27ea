use thiserror::Error;

#[derive(Error, Debug)]
pub enum DocumentError {
    #[error("The file's magic value does not match the expectation {magic:#x}")]
    InvalidMagicValue { magic: u32 },

    #[error("The document is violating the glTF 2.0 schema, because: {reason}")]
    SchemaViolation { reason: String },

    #[error("{kind} index {index} is out of bounds (array length {len})")]
    IndexOutOfBounds {
        kind: &'static str,
        index: usize,
        len: usize,
    },

    #[error(transparent)]
    JsonError(#[from] serde_json::Error),

    #[error(transparent)]
    IOError(#[from] std::io::Error),
}

pub mod reader;
pub mod types;
