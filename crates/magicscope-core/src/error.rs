use std::fmt;

use thiserror::Error;

/// Error state reported by libmagic for the call that just failed.
///
/// Captured inside the failing call, so it can't be clobbered by a later
/// successful operation on the same handle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineError {
    pub errno: i32,
    pub message: String,
}

impl EngineError {
    pub fn new(errno: i32, message: impl Into<String>) -> Self {
        Self { errno, message: message.into() }
    }
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.message.is_empty(), self.errno) {
            (true, 0) => f.write_str("unknown error"),
            (true, errno) => write!(f, "errno {errno}"),
            (false, 0) => f.write_str(&self.message),
            (false, errno) => write!(f, "{} (errno {errno})", self.message),
        }
    }
}

impl std::error::Error for EngineError {}

/// All errors that can occur in magicscope-core.
#[derive(Debug, Error)]
pub enum MagicError {
    #[error("Failed to initialize magic library: {0}")]
    Init(EngineError),

    #[error("Failed to load database files {target}: {source}")]
    Load { target: String, source: EngineError },

    #[error("Failed to compile database files {target}: {source}")]
    Compile { target: String, source: EngineError },

    #[error("Database check failed for {target}: {source}")]
    Validation { target: String, source: EngineError },

    #[error("Failed to list the content of database files {target}: {source}")]
    List { target: String, source: EngineError },

    #[error("Failed to determine type for {target}: {source}")]
    Classify { target: String, source: EngineError },

    #[error("Parameter {param}: {source}")]
    Param { param: String, source: EngineError },

    #[error("Failed to set flags {flags:#x}: {source}")]
    Flag { flags: i32, source: EngineError },

    #[error("Path contains an interior NUL byte: {0}")]
    InvalidPath(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}

impl MagicError {
    /// Engine-level context of the failure, if it came from libmagic.
    pub fn engine(&self) -> Option<&EngineError> {
        match self {
            MagicError::Init(source)
            | MagicError::Load { source, .. }
            | MagicError::Compile { source, .. }
            | MagicError::Validation { source, .. }
            | MagicError::List { source, .. }
            | MagicError::Classify { source, .. }
            | MagicError::Param { source, .. }
            | MagicError::Flag { source, .. } => Some(source),
            _ => None,
        }
    }

    /// OS error number recorded by libmagic, or zero.
    pub fn errno(&self) -> i32 {
        match self {
            MagicError::Io(e) => e.raw_os_error().unwrap_or(0),
            other => other.engine().map_or(0, |e| e.errno),
        }
    }

    /// Human-readable engine message, or the error's own rendering.
    pub fn message(&self) -> String {
        match self.engine() {
            Some(e) if !e.message.is_empty() => e.message.clone(),
            _ => self.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, MagicError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_error_display() {
        assert_eq!(EngineError::new(0, "").to_string(), "unknown error");
        assert_eq!(EngineError::new(2, "").to_string(), "errno 2");
        assert_eq!(EngineError::new(0, "bad magic").to_string(), "bad magic");
        assert_eq!(
            EngineError::new(2, "cannot open").to_string(),
            "cannot open (errno 2)"
        );
    }

    #[test]
    fn test_error_carries_engine_context() {
        let err = MagicError::Load {
            target: "missing.mgc".to_string(),
            source: EngineError::new(2, "could not find any valid magic files!"),
        };
        assert_eq!(err.errno(), 2);
        assert_eq!(err.message(), "could not find any valid magic files!");
        assert!(err.to_string().contains("missing.mgc"));
    }

    #[test]
    fn test_non_engine_error_has_no_errno() {
        let err = MagicError::InvalidPath("a\0b".to_string());
        assert!(err.engine().is_none());
        assert_eq!(err.errno(), 0);
        assert!(err.message().contains("interior NUL"));
    }
}
