use thiserror::Error;

/// Errors while reading or writing mesh and skeleton files.
#[derive(Debug, Error)]
pub enum Error {
    /// The file does not start with a header chunk or the version is not supported.
    #[error("Malformed file header: {0}")]
    MalformedHeader(String),

    /// A read would cross the end of the buffered data.
    #[error(
        "Attempted to {operation} at position {position} past the end of a buffer of length {length}."
    )]
    OutOfBounds {
        operation: &'static str,
        position: usize,
        length: usize,
    },

    /// A required chunk is missing or has the wrong tag.
    #[error(
        "Expected chunk {expected:#06X} at offset {offset} but found {}.",
        describe_tag(.found)
    )]
    UnexpectedChunk {
        expected: u16,
        found: Option<u16>,
        offset: usize,
    },

    /// A decoded value violates a structural invariant of the format.
    #[error("{0}")]
    ConstraintViolation(String),

    /// A name contains bytes that are not valid UTF-8.
    #[error("String at offset {offset} is not valid UTF-8: {source}")]
    InvalidString {
        offset: usize,
        source: std::string::FromUtf8Error,
    },

    /// An error occurred while reading or writing the underlying stream.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

fn describe_tag(tag: &Option<u16>) -> String {
    match tag {
        Some(tag) => format!("{:#06X}", tag),
        None => "the end of the data".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unexpected_chunk_message() {
        let error = Error::UnexpectedChunk {
            expected: 0x5000,
            found: None,
            offset: 12,
        };
        assert_eq!(
            "Expected chunk 0x5000 at offset 12 but found the end of the data.",
            error.to_string()
        );

        let error = Error::UnexpectedChunk {
            expected: 0x5000,
            found: Some(0x4010),
            offset: 12,
        };
        assert_eq!(
            "Expected chunk 0x5000 at offset 12 but found 0x4010.",
            error.to_string()
        );
    }
}
