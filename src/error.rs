//! Error types for Stellari
//!
//! Provides structured error handling with:
//! - Numeric error codes for machine parsing
//! - User-friendly messages with suggestions
//! - Exit codes for CLI

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for Stellari operations
pub type Result<T> = std::result::Result<T, Error>;

/// Numeric error codes for machine parsing and documentation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum ErrorCode {
    // Configuration errors (1xx)
    ConfigNotFound = 100,
    ConfigParseError = 101,
    ConfigValidation = 102,

    // IO errors (2xx)
    IoRead = 200,
    IoWrite = 201,
    IoNotFound = 203,

    // Store errors (3xx)
    StoreNotConfigured = 300,
    StoreRequest = 301,
    StoreStatus = 302,
    StoreDecode = 303,

    // Generator errors (4xx)
    GeneratorRequest = 400,
    GeneratorStatus = 401,
    GeneratorResponse = 402,

    // Form errors (5xx)
    FormValidation = 500,
    FormBusy = 501,
    UnknownIndustry = 502,
    ConfirmationRequired = 503,

    // Persona errors (6xx)
    PersonaNotFound = 600,
    VersionNotFound = 601,
    PersonaInconsistent = 602,

    // Internal errors (9xx)
    InternalError = 900,
}

impl ErrorCode {
    /// Get the string code (e.g., "E100")
    pub fn as_str(&self) -> String {
        format!("E{}", *self as u16)
    }

    /// Get the exit code for CLI (maps to 1-125 range)
    pub fn exit_code(&self) -> i32 {
        match *self as u16 {
            100..=199 => 10,
            200..=299 => 20,
            300..=399 => 30,
            400..=499 => 40,
            500..=599 => 50,
            600..=699 => 60,
            900..=999 => 90,
            _ => 1,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Main error type
#[derive(Error, Debug)]
pub enum Error {
    // ─────────────────────────────────────────────────────────────
    // Configuration Errors
    // ─────────────────────────────────────────────────────────────

    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: PathBuf },

    /// Configuration parse error
    #[error("Failed to parse configuration: {message}")]
    ConfigParse {
        message: String,
        #[source]
        source: Option<toml::de::Error>,
    },

    /// Configuration validation error
    #[error("Configuration validation failed: {message}")]
    ConfigValidation { message: String, field: Option<String> },

    // ─────────────────────────────────────────────────────────────
    // IO Errors
    // ─────────────────────────────────────────────────────────────

    #[error("Failed to read file: {path}")]
    IoRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write file: {path}")]
    IoWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML serialization error: {0}")]
    Toml(#[from] toml::ser::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // ─────────────────────────────────────────────────────────────
    // Store Errors
    // ─────────────────────────────────────────────────────────────

    /// No database URL / key configured
    #[error("Persona store is not configured")]
    StoreNotConfigured,

    /// Transport-level failure talking to the database service
    #[error("Store request on '{table}' failed: {message}")]
    StoreRequest { table: String, message: String },

    /// The database service answered with a non-success status
    #[error("Store returned {status} for '{table}': {body}")]
    StoreStatus {
        table: String,
        status: u16,
        body: String,
    },

    /// A row could not be decoded into its typed shape
    #[error("Malformed row in '{table}': {message}")]
    StoreDecode { table: String, message: String },

    // ─────────────────────────────────────────────────────────────
    // Generator Errors
    // ─────────────────────────────────────────────────────────────

    #[error("Generation request failed: {message}")]
    GeneratorRequest { message: String },

    #[error("Generation API returned {status}: {body}")]
    GeneratorStatus { status: u16, body: String },

    #[error("Unreadable generation response: {message}")]
    GeneratorResponse { message: String },

    // ─────────────────────────────────────────────────────────────
    // Form Errors
    // ─────────────────────────────────────────────────────────────

    /// Client-side form gate (e.g. missing persona name)
    #[error("Form is incomplete: {message}")]
    FormValidation { field: String, message: String },

    /// A generation request for this form is still running
    #[error("Instructions are already being generated for this form")]
    FormBusy,

    #[error("Unknown industry: {id}")]
    UnknownIndustry { id: String },

    /// A destructive command was run without its confirmation flag
    #[error("Refusing to {action} without confirmation")]
    ConfirmationRequired { action: String },

    // ─────────────────────────────────────────────────────────────
    // Persona Errors
    // ─────────────────────────────────────────────────────────────

    #[error("Persona not found: {id}")]
    PersonaNotFound { id: String },

    #[error("Persona {persona_id} has no version {version}")]
    VersionNotFound { persona_id: String, version: u32 },

    #[error("Persona {id} is inconsistent: {reason}")]
    PersonaInconsistent { id: String, reason: String },

    // ─────────────────────────────────────────────────────────────
    // Internal Errors
    // ─────────────────────────────────────────────────────────────

    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Get the numeric error code
    pub fn code(&self) -> ErrorCode {
        match self {
            Error::ConfigNotFound { .. } => ErrorCode::ConfigNotFound,
            Error::ConfigParse { .. } => ErrorCode::ConfigParseError,
            Error::ConfigValidation { .. } => ErrorCode::ConfigValidation,

            Error::IoRead { .. } => ErrorCode::IoRead,
            Error::IoWrite { .. } => ErrorCode::IoWrite,
            Error::Io(e) => match e.kind() {
                std::io::ErrorKind::NotFound => ErrorCode::IoNotFound,
                _ => ErrorCode::IoRead,
            },
            Error::Toml(_) => ErrorCode::ConfigParseError,
            Error::Json(_) => ErrorCode::InternalError,

            Error::StoreNotConfigured => ErrorCode::StoreNotConfigured,
            Error::StoreRequest { .. } => ErrorCode::StoreRequest,
            Error::StoreStatus { .. } => ErrorCode::StoreStatus,
            Error::StoreDecode { .. } => ErrorCode::StoreDecode,

            Error::GeneratorRequest { .. } => ErrorCode::GeneratorRequest,
            Error::GeneratorStatus { .. } => ErrorCode::GeneratorStatus,
            Error::GeneratorResponse { .. } => ErrorCode::GeneratorResponse,

            Error::FormValidation { .. } => ErrorCode::FormValidation,
            Error::FormBusy => ErrorCode::FormBusy,
            Error::UnknownIndustry { .. } => ErrorCode::UnknownIndustry,
            Error::ConfirmationRequired { .. } => ErrorCode::ConfirmationRequired,

            Error::PersonaNotFound { .. } => ErrorCode::PersonaNotFound,
            Error::VersionNotFound { .. } => ErrorCode::VersionNotFound,
            Error::PersonaInconsistent { .. } => ErrorCode::PersonaInconsistent,

            Error::Internal(_) => ErrorCode::InternalError,
        }
    }

    /// Get the exit code for CLI
    pub fn exit_code(&self) -> i32 {
        self.code().exit_code()
    }

    // ─────────────────────────────────────────────────────────────
    // User-Friendly Messages
    // ─────────────────────────────────────────────────────────────

    /// Get a user-friendly suggestion for how to fix this error
    pub fn suggestion(&self) -> Option<&'static str> {
        match self {
            Error::ConfigNotFound { .. } => {
                Some("Run 'stellari config init' to create a default configuration file.")
            }
            Error::ConfigParse { .. } => Some(
                "Check your configuration file syntax. Run 'stellari config validate' to see details.",
            ),
            Error::ConfigValidation { .. } => {
                Some("Review the configuration file and fix the invalid values.")
            }
            Error::StoreNotConfigured => Some(
                "Set [store] url and anon_key in the config file, or STELLARI_STORE_URL and STELLARI_STORE_ANON_KEY.",
            ),
            Error::StoreRequest { .. } => {
                Some("Check your network connection and verify the store URL is correct.")
            }
            Error::StoreStatus { status: 401 | 403, .. } => {
                Some("The store rejected the credentials. Verify anon_key / access_token.")
            }
            Error::GeneratorRequest { .. } => {
                Some("The generation service is unreachable. Re-run the command to try again.")
            }
            Error::GeneratorStatus { status: 401 | 403, .. } => {
                Some("The generation service rejected the API key. Check [llm] api_key.")
            }
            Error::FormValidation { .. } => Some("Provide a value with --set <field>=<value>."),
            Error::UnknownIndustry { .. } => {
                Some("Run 'stellari industries' to list the available industry templates.")
            }
            Error::ConfirmationRequired { .. } => Some("Re-run the command with --yes to confirm."),
            Error::PersonaNotFound { .. } => {
                Some("Run 'stellari persona list' to see the stored personas.")
            }
            Error::VersionNotFound { .. } => {
                Some("Run 'stellari persona history <id>' to see the available versions.")
            }
            Error::PersonaInconsistent { .. } => Some(
                "The newest stored version is not current. Re-run the rollback or save an edit to repair it.",
            ),
            _ => None,
        }
    }

    /// Format the error for terminal display with colors
    pub fn format_for_terminal(&self) -> String {
        let mut output = format!("\x1b[31mError [{}]\x1b[0m: {}\n", self.code().as_str(), self);

        if let Some(hint) = self.suggestion() {
            output.push_str(&format!("\n\x1b[33mHint\x1b[0m: {}\n", hint));
        }

        output
    }

    /// Format the error for logging (no colors)
    pub fn format_for_log(&self) -> String {
        format!("[{}] {}", self.code().as_str(), self)
    }
}

// ─────────────────────────────────────────────────────────────────
// Error Constructors (for ergonomic error creation)
// ─────────────────────────────────────────────────────────────────

impl Error {
    pub fn config_not_found(path: impl Into<PathBuf>) -> Self {
        Error::ConfigNotFound { path: path.into() }
    }

    pub fn config_parse(message: impl Into<String>, source: toml::de::Error) -> Self {
        Error::ConfigParse {
            message: message.into(),
            source: Some(source),
        }
    }

    pub fn config_validation(message: impl Into<String>) -> Self {
        Error::ConfigValidation {
            message: message.into(),
            field: None,
        }
    }

    pub fn config_field_invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        Error::ConfigValidation {
            message: message.into(),
            field: Some(field.into()),
        }
    }

    pub fn store_request(table: impl Into<String>, message: impl Into<String>) -> Self {
        Error::StoreRequest {
            table: table.into(),
            message: message.into(),
        }
    }

    pub fn store_decode(table: impl Into<String>, message: impl Into<String>) -> Self {
        Error::StoreDecode {
            table: table.into(),
            message: message.into(),
        }
    }

    pub fn generator_request(message: impl Into<String>) -> Self {
        Error::GeneratorRequest {
            message: message.into(),
        }
    }

    pub fn form_validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Error::FormValidation {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn persona_not_found(id: impl Into<String>) -> Self {
        Error::PersonaNotFound { id: id.into() }
    }
}

// ─────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────
