use thiserror::Error;

/// Application-level errors
#[derive(Debug, Error)]
pub enum AppError {
    /// Invalid or unreadable configuration.
    #[error("Configuration error: {message}")]
    Config {
        /// What was wrong.
        message: String,
    },

    /// Snapshot persistence failed.
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// The generative model call failed.
    #[error("AI error: {0}")]
    Ai(#[from] AiError),

    /// A document could not be turned into text.
    #[error("Extraction error: {0}")]
    Extract(#[from] ExtractError),

    /// A backup file was rejected.
    #[error("Import error: {0}")]
    Import(#[from] ImportError),

    /// A workspace precondition did not hold.
    #[error("{0}")]
    State(#[from] StateError),
}

/// Snapshot persistence errors
#[derive(Debug, Error)]
pub enum StorageError {
    /// Opening the database failed.
    #[error("Database connection failed: {message}")]
    Connection {
        /// Driver message.
        message: String,
    },

    /// A statement failed.
    #[error("Query failed: {message}")]
    Query {
        /// Driver message.
        message: String,
    },

    /// Embedded migrations could not be applied.
    #[error("Migration failed: {message}")]
    Migration {
        /// Migrator message.
        message: String,
    },

    /// The stored snapshot is not valid JSON for [`crate::model::AppSnapshot`].
    #[error("Snapshot serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Any other sqlx failure.
    #[error("SQLx error: {0}")]
    Sqlx(#[from] sqlx::Error),
}

/// Generative model gateway errors
#[derive(Debug, Error)]
pub enum AiError {
    /// No API key configured; raised before any network traffic.
    #[error("API key is missing. Set GEMINI_API_KEY in the environment")]
    MissingCredentials,

    /// The model answered with nothing usable.
    #[error("Empty or invalid response: {message}")]
    EmptyOrInvalidResponse {
        /// What was missing or malformed.
        message: String,
    },

    /// The request never got an HTTP response.
    #[error("Transport failure: {message}")]
    TransportFailure {
        /// Underlying client error.
        message: String,
    },

    /// Non-2xx response from the API.
    #[error("API error: {status} - {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Response body or error message.
        message: String,
    },
}

/// Document text extraction errors
#[derive(Debug, Error)]
pub enum ExtractError {
    /// Neither the media type nor the extension is supported.
    #[error("Unsupported file type: {file_name}. Please upload PDF, DOCX, TXT, or RTF")]
    UnsupportedFormat {
        /// Name of the rejected file.
        file_name: String,
    },

    /// Reading the file failed.
    #[error("Failed to read file: {0}")]
    Io(#[from] std::io::Error),

    /// pdf-extract could not parse the document.
    #[error("Failed to extract PDF text: {message}")]
    Pdf {
        /// Parser message.
        message: String,
    },

    /// The DOCX archive or its document part is unreadable.
    #[error("Failed to extract DOCX text: {message}")]
    Docx {
        /// Archive or XML message.
        message: String,
    },
}

/// Export file import errors
#[derive(Debug, Error)]
pub enum ImportError {
    /// Not JSON, not an object, or no `grants` array.
    #[error("Invalid file format: {message}")]
    InvalidFormat {
        /// Parse failure detail.
        message: String,
    },
}

/// Errors raised by workspace operations before any side effect
#[derive(Debug, Error)]
pub enum StateError {
    /// No grant with this id.
    #[error("Grant not found: {grant_id}")]
    GrantNotFound {
        /// Requested id.
        grant_id: String,
    },

    /// No draft section with this id.
    #[error("Draft section not found: {section_id}")]
    SectionNotFound {
        /// Requested id.
        section_id: String,
    },

    /// No knowledge item with this id.
    #[error("Knowledge item not found: {item_id}")]
    KnowledgeItemNotFound {
        /// Requested id.
        item_id: String,
    },

    /// Comparative analysis needs more grants than are stored.
    #[error("At least {required} grant applications are required for analysis (have {actual})")]
    NotEnoughGrants {
        /// Minimum grant count.
        required: usize,
        /// Grants currently stored.
        actual: usize,
    },

    /// Chat needs at least one grant.
    #[error("No grant applications available. Add grants before querying")]
    NoGrants,

    /// An argument or state check failed.
    #[error("Validation failed: {field} - {reason}")]
    Validation {
        /// Offending field or operation.
        field: String,
        /// Why it was rejected.
        reason: String,
    },
}

impl From<reqwest::Error> for AiError {
    fn from(err: reqwest::Error) -> Self {
        AiError::TransportFailure {
            message: err.to_string(),
        }
    }
}

/// Result type alias for application errors
pub type AppResult<T> = Result<T, AppError>;

/// Result type alias for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Result type alias for gateway operations
pub type AiResult<T> = Result<T, AiError>;

/// Result type alias for extraction operations
pub type ExtractResult<T> = Result<T, ExtractError>;

/// Result type alias for workspace state operations
pub type StateResult<T> = Result<T, StateError>;
