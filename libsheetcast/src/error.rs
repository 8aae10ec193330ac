//! Error types for Sheetcast

use thiserror::Error;

pub type Result<T> = std::result::Result<T, SheetcastError>;

#[derive(Error, Debug)]
pub enum SheetcastError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Credential error: {0}")]
    Credential(#[from] CredentialError),

    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),

    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    #[error("Platform error: {0}")]
    Platform(#[from] PlatformError),

    #[error("Watch registration failed: {0}")]
    Watch(String),

    #[error("Sweep already running: {0}")]
    Locked(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl SheetcastError {
    /// Returns the appropriate exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            SheetcastError::InvalidInput(_) => 3,
            SheetcastError::Config(_) => 2,
            SheetcastError::Credential(_) => 2,
            SheetcastError::Platform(PlatformError::Authentication(_)) => 2,
            SheetcastError::Platform(_) => 1,
            SheetcastError::Ledger(_) => 1,
            SheetcastError::Fetch(_) => 1,
            SheetcastError::Watch(_) => 1,
            SheetcastError::Locked(_) => 1,
        }
    }

    /// Whether this error only affects the row being processed.
    ///
    /// Row-local errors are written to the row's error cell and the sweep
    /// moves on. Everything else aborts the sweep.
    pub fn is_row_local(&self) -> bool {
        matches!(
            self,
            SheetcastError::Fetch(_) | SheetcastError::Platform(_)
        )
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Missing required field: {0}")]
    MissingField(String),
}

#[derive(Error, Debug, Clone)]
pub enum CredentialError {
    #[error("Could not resolve ambient identity: {0}")]
    AmbientIdentity(String),

    #[error("Secret access failed: {0}")]
    SecretAccess(String),

    #[error("Malformed service account key: {0}")]
    Malformed(String),

    #[error("Token exchange failed: {0}")]
    TokenExchange(String),
}

#[derive(Error, Debug, Clone)]
pub enum LedgerError {
    #[error("Ledger document not found: {0}")]
    DocumentNotFound(String),

    #[error("Missing ledger column: {0}")]
    MissingColumn(String),

    #[error("Failed to read ledger: {0}")]
    Read(String),

    #[error("Failed to write ledger: {0}")]
    Write(String),
}

#[derive(Error, Debug, Clone)]
pub enum FetchError {
    #[error("Download of {locator} failed with HTTP {status}")]
    Http { locator: String, status: u16 },

    #[error("Download of {locator} failed: {message}")]
    Network { locator: String, message: String },

    #[error("Download of {locator} is not an image (Content-Type: {content_type})")]
    NotAnImage {
        locator: String,
        content_type: String,
    },

    #[error("Failed to store image: {0}")]
    Io(String),
}

#[derive(Error, Debug, Clone)]
pub enum PlatformError {
    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Content validation failed: {0}")]
    Validation(String),

    #[error("Posting failed: {0}")]
    Posting(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Rate limit exceeded: {0}")]
    RateLimit(String),
}
