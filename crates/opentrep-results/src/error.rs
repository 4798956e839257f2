use thiserror::Error;

use crate::{format::WireFormat, protobuf::WireError};

pub type Result<T> = std::result::Result<T, ParseError>;

#[derive(Error, Debug)]
pub enum ParseError {
    #[error("Malformed {format} payload: {reason}")]
    Format { format: WireFormat, reason: String },
    #[error("Unsupported output format '{0}', expected one of S, F, J, I, P")]
    UnsupportedFormat(String),
    #[error("The {0} output is meant for display and cannot be decoded")]
    NotDecodable(WireFormat),
    #[error("The {0} payload is not valid UTF-8")]
    InvalidUtf8(WireFormat),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Protobuf error: {0}")]
    Wire(#[from] WireError),
}

impl ParseError {
    pub(crate) fn malformed(format: WireFormat, reason: impl Into<String>) -> Self {
        Self::Format {
            format,
            reason: reason.into(),
        }
    }

    /// True when the payload did not follow the grammar of its declared format.
    #[must_use]
    pub fn is_format_error(&self) -> bool {
        matches!(
            self,
            Self::Format { .. } | Self::InvalidUtf8(_) | Self::Json(_) | Self::Wire(_)
        )
    }
}
