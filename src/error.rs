//! Structured error types for the folio rendering engine.
//!
//! Only hard failures live here. Everything a renderer can recover from
//! (layout overflow, a missing image, an unknown layout id) is reported as a
//! [`RenderWarning`](crate::diagnostics::RenderWarning) next to the output instead.

use thiserror::Error;

use crate::model::ProjectStatus;

pub type Result<T> = std::result::Result<T, FolioError>;

/// The unified error type returned by all public folio API functions.
#[derive(Debug, Error)]
pub enum FolioError {
    /// JSON input failed to parse as a valid project document.
    #[error("Failed to parse project: {source}{}", format_hint(.hint))]
    Parse {
        #[source]
        source: serde_json::Error,
        hint: String,
    },
    /// An image could not be fetched or decoded.
    #[error("Image error: {0}")]
    Image(String),
    /// The raster backend could not provide a surface.
    #[error("Raster error: {0}")]
    Raster(String),
    /// Reading or writing a file failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// The persistence collaborator rejected a load or save.
    #[error("Store error: {0}")]
    Store(String),
    /// A project status change that the lifecycle does not allow.
    #[error("Cannot move project from {from:?} to {to:?}")]
    Lifecycle {
        from: ProjectStatus,
        to: ProjectStatus,
    },
}

fn format_hint(hint: &str) -> String {
    if hint.is_empty() {
        String::new()
    } else {
        format!("\n  Hint: {}", hint)
    }
}

impl From<serde_json::Error> for FolioError {
    fn from(e: serde_json::Error) -> Self {
        let hint = match e.classify() {
            serde_json::error::Category::Syntax => {
                "Check for trailing commas, missing quotes, or unescaped characters.".to_string()
            }
            serde_json::error::Category::Data => {
                "The JSON is valid but doesn't match the project schema. Check field names and types.".to_string()
            }
            serde_json::error::Category::Eof => {
                "Unexpected end of input, is the JSON truncated?".to_string()
            }
            serde_json::error::Category::Io => String::new(),
        };
        FolioError::Parse { source: e, hint }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_error_carries_hint() {
        let err: FolioError = serde_json::from_str::<serde_json::Value>("{\"a\": 1,}")
            .unwrap_err()
            .into();
        let msg = err.to_string();
        assert!(msg.starts_with("Failed to parse project"));
        assert!(msg.contains("Hint: Check for trailing commas"));
    }

    #[test]
    fn test_eof_hint() {
        let err: FolioError = serde_json::from_str::<serde_json::Value>("{\"pages\": [")
            .unwrap_err()
            .into();
        assert!(err.to_string().contains("truncated"));
    }

    #[test]
    fn test_lifecycle_message() {
        let err = FolioError::Lifecycle {
            from: ProjectStatus::Exported,
            to: ProjectStatus::Draft,
        };
        assert_eq!(err.to_string(), "Cannot move project from Exported to Draft");
    }
}
