//! Error types for xdm.

use thiserror::Error;

/// Result type alias for xdm operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during diff construction or patch application.
#[derive(Error, Debug)]
pub enum Error {
    /// XML parsing error.
    #[error("XML parse error: {0}")]
    Parse(String),

    /// Malformed path expression encountered while materializing an Add.
    ///
    /// Misses during Remove/Change resolution are not errors (the target has
    /// simply diverged); this fires only for grammar defects such as an
    /// unterminated quote or bracket.
    #[error("malformed path expression `{path}`: {reason}")]
    PathFormat {
        /// The offending path expression.
        path: String,
        /// What was wrong with it.
        reason: String,
    },

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// XML error from quick-xml.
    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),
}

impl Error {
    pub(crate) fn path_format(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::PathFormat {
            path: path.into(),
            reason: reason.into(),
        }
    }
}
