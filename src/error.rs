use thiserror::Error;

use crate::format::TypeCode;

/// Errors raised by the binary cursor.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CursorError {
    /// A read would run past the end of the buffer
    #[error("Read out of range: requested {requested} bytes at offset {offset}, {available} available")]
    OutOfRange {
        offset: usize,
        requested: usize,
        available: usize,
    },
}

/// Errors raised by the descriptor engine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DescriptorError {
    /// Cursor error while reading descriptor bytes
    #[error("{0}")]
    Cursor(#[from] CursorError),

    /// A descriptor item carries an OSType the engine does not know
    #[error("Unrecognized descriptor field type '{0}'")]
    UnrecognizedFieldType(String),

    /// A reference item carries an OSType the engine does not know
    #[error("Unrecognized reference type '{0}'")]
    UnrecognizedReferenceType(String),

    /// Descriptors are nested deeper than the engine follows
    #[error("Descriptor nesting exceeds {0} levels")]
    NestingTooDeep(usize),
}

/// Errors raised by the engine-data parser.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineDataError {
    /// Input ended inside a structure
    #[error("Unexpected end of engine data")]
    UnexpectedEnd,

    /// A token appeared where it is not allowed
    #[error("Unexpected token '{token}' at offset {offset}")]
    UnexpectedToken { offset: usize, token: String },

    /// A dictionary key was not followed by a value
    #[error("Missing value for key '{0}'")]
    MissingValue(String),

    /// Containers are nested deeper than the parser follows
    #[error("Engine data nesting exceeds {0} levels")]
    NestingTooDeep(usize),
}

/// Errors raised by the layer-container reader.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LayerError {
    /// Cursor error while reading layer bytes
    #[error("{0}")]
    Cursor(#[from] CursorError),

    /// A layer record did not start its blend section with `8BIM`
    #[error("Invalid layer record signature: {0}")]
    InvalidSignature(TypeCode),

    /// A length field is inconsistent with the data around it
    #[error("Invalid length for {context}: {length}")]
    InvalidLength { context: &'static str, length: u64 },
}

/// Errors raised while decoding a single tagged block.
///
/// Every variant except [`BlockError::DepthExceeded`] is recoverable: the
/// dispatcher records a diagnostic and passes the original payload through.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BlockError {
    /// Cursor error (a length prefix pointed past the payload)
    #[error("{0}")]
    OutOfRange(#[from] CursorError),

    /// The block's internal version is outside the supported set
    #[error("Unsupported {block} version {version}")]
    UnsupportedVersion { block: &'static str, version: u32 },

    /// The descriptor engine rejected the payload
    #[error("Descriptor error: {0}")]
    Descriptor(#[from] DescriptorError),

    /// Expected constant bytes were absent
    #[error("Malformed signature: expected {expected}, got {found}")]
    MalformedSignature { expected: TypeCode, found: TypeCode },

    /// A path record carries a selector outside the known set
    #[error("Unrecognized path record selector {0}")]
    UnrecognizedSelector(u16),

    /// An inner length prefix disagrees with the bytes actually consumed
    #[error("Length mismatch in {context}: declared {declared}, consumed {consumed}")]
    LengthMismatch {
        context: &'static str,
        declared: usize,
        consumed: usize,
    },

    /// The block uses a parameter layout that is not decoded
    #[error("Unsupported parameters: {0}")]
    UnsupportedParameters(String),

    /// A field holds a value that cannot be represented
    #[error("Invalid value: {0}")]
    InvalidValue(String),

    /// The nested layer container could not be read
    #[error("Nested layers: {0}")]
    Layer(#[from] LayerError),

    /// The engine-data parser rejected the payload
    #[error("Engine data: {0}")]
    EngineData(#[from] EngineDataError),

    /// Nested layer containers are deeper than the configured ceiling
    #[error("Nesting depth exceeded: limit is {limit}")]
    DepthExceeded { limit: usize },
}

impl BlockError {
    /// Whether this error aborts the whole decode pass instead of falling
    /// back to the raw payload.
    pub fn is_fatal(&self) -> bool {
        matches!(self, BlockError::DepthExceeded { .. })
    }
}

/// Errors raised by the top-level document reader.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DocumentError {
    /// Cursor error while reading the file structure
    #[error("{0}")]
    Cursor(#[from] CursorError),

    /// The file does not start with `8BPS`
    #[error("Invalid document signature: {0}")]
    InvalidSignature(TypeCode),

    /// The header version is neither 1 (PSD) nor 2 (PSB)
    #[error("Unsupported document version {0}")]
    UnsupportedVersion(u16),

    /// The layer section could not be read
    #[error("Layer section: {0}")]
    Layer(#[from] LayerError),

    /// Block decoding failed fatally
    #[error("Block decoding: {0}")]
    Block(#[from] BlockError),
}
