use std::fmt;

/// Failure taxonomy for the cleaning pipeline.
///
/// `Validation` aborts the whole file before any row is processed. `Auth`,
/// `Http` and `Parse` are row-scoped: the orchestrator degrades them into a
/// placeholder row instead of aborting the batch.
#[derive(Debug)]
pub enum CleanError {
    Validation(String),
    Auth(String),
    Http { status: u16, message: String },
    Parse(String),
    Network(String),
    Io(String),
}

impl fmt::Display for CleanError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CleanError::Validation(msg) => write!(f, "Validation error: {}", msg),
            CleanError::Auth(msg) => write!(f, "Auth error: {}", msg),
            CleanError::Http { status, message } => {
                write!(f, "HTTP error ({}): {}", status, message)
            }
            CleanError::Parse(msg) => write!(f, "Parse error: {}", msg),
            CleanError::Network(msg) => write!(f, "Network error: {}", msg),
            CleanError::Io(msg) => write!(f, "IO error: {}", msg),
        }
    }
}

impl std::error::Error for CleanError {}

impl From<std::io::Error> for CleanError {
    fn from(err: std::io::Error) -> Self {
        CleanError::Io(err.to_string())
    }
}

impl From<reqwest::Error> for CleanError {
    fn from(err: reqwest::Error) -> Self {
        CleanError::Network(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, CleanError>;
