//! Error types for the SMA bridge
//!
//! Three failure classes can occur around a native call: the library cannot be
//! loaded, the call does not yield a buffer, or the buffer is not valid text.

use std::fmt;
use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, SmaError>;

/// Library resolution and loading errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadError {
    UnsupportedPlatform { os: String, arch: String },
    NotFound { searched: Vec<PathBuf> },
    Open { path: PathBuf, message: String },
    MissingSymbol { symbol: String, message: String },
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnsupportedPlatform { os, arch } => {
                write!(f, "Unsupported platform: {}/{}", os, arch)
            }
            Self::NotFound { searched } => {
                let paths: Vec<String> = searched
                    .iter()
                    .map(|p| p.display().to_string())
                    .collect();
                write!(f, "SMA library not found, searched: [{}]", paths.join(", "))
            }
            Self::Open { path, message } => {
                write!(f, "Failed to load library {}: {}", path.display(), message)
            }
            Self::MissingSymbol { symbol, message } => {
                write!(f, "Symbol '{}' not found: {}", symbol, message)
            }
        }
    }
}

impl std::error::Error for LoadError {}

/// Foreign call errors (no buffer was obtained)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallError {
    /// Payload contains a NUL byte at `position` and cannot cross the C boundary
    InvalidPayload { position: usize },
    /// Native entry point returned a null pointer
    NullBuffer,
}

impl fmt::Display for CallError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidPayload { position } => {
                write!(f, "Payload contains a NUL byte at offset {}", position)
            }
            Self::NullBuffer => write!(f, "Native call returned a null buffer"),
        }
    }
}

impl std::error::Error for CallError {}

/// Response decoding errors (the buffer has already been released)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeError {
    InvalidUtf8 { valid_up_to: usize },
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidUtf8 { valid_up_to } => {
                write!(f, "Response is not valid UTF-8 (valid up to byte {})", valid_up_to)
            }
        }
    }
}

impl std::error::Error for DecodeError {}

/// Configuration loading errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    Io { path: PathBuf, message: String },
    Parse(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io { path, message } => {
                write!(f, "Failed to read config {}: {}", path.display(), message)
            }
            Self::Parse(msg) => write!(f, "Failed to parse config: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Top-level bridge error
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SmaError {
    Load(LoadError),
    Call(CallError),
    Decode(DecodeError),
    Config(ConfigError),
}

impl SmaError {
    pub fn is_load(&self) -> bool {
        matches!(self, Self::Load(_))
    }

    pub fn is_call(&self) -> bool {
        matches!(self, Self::Call(_))
    }

    pub fn is_decode(&self) -> bool {
        matches!(self, Self::Decode(_))
    }
}

impl fmt::Display for SmaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Load(e) => write!(f, "load failure: {}", e),
            Self::Call(e) => write!(f, "foreign-call failure: {}", e),
            Self::Decode(e) => write!(f, "decode failure: {}", e),
            Self::Config(e) => write!(f, "configuration error: {}", e),
        }
    }
}

impl std::error::Error for SmaError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Load(e) => Some(e),
            Self::Call(e) => Some(e),
            Self::Decode(e) => Some(e),
            Self::Config(e) => Some(e),
        }
    }
}

impl From<LoadError> for SmaError {
    fn from(e: LoadError) -> Self {
        Self::Load(e)
    }
}

impl From<CallError> for SmaError {
    fn from(e: CallError) -> Self {
        Self::Call(e)
    }
}

impl From<DecodeError> for SmaError {
    fn from(e: DecodeError) -> Self {
        Self::Decode(e)
    }
}

impl From<ConfigError> for SmaError {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn test_error_display() {
        let err = SmaError::from(CallError::NullBuffer);
        assert_eq!(err.to_string(), "foreign-call failure: Native call returned a null buffer");

        let err = SmaError::from(DecodeError::InvalidUtf8 { valid_up_to: 3 });
        assert!(err.to_string().starts_with("decode failure:"));
    }

    #[test]
    fn test_not_found_lists_paths() {
        let err = LoadError::NotFound {
            searched: vec![PathBuf::from("/a/lib.so"), PathBuf::from("/b/lib.so")],
        };
        assert_eq!(err.to_string(), "SMA library not found, searched: [/a/lib.so, /b/lib.so]");
    }

    #[test]
    fn test_error_source_chain() {
        let err = SmaError::from(LoadError::UnsupportedPlatform {
            os: "plan9".to_string(),
            arch: "mips".to_string(),
        });
        assert!(err.is_load());
        assert!(!err.is_call());
        assert_eq!(err.source().unwrap().to_string(), "Unsupported platform: plan9/mips");
    }
}
