//! Output format tags understood by the OpenTrep engine and its clients.

use std::{fmt, str::FromStr};

use serde::Serialize;

use crate::error::ParseError;

/// A serialization the engine itself can emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WireFormat {
    /// `nce/100,sfo/100-emb/98;unmatched`
    Compact,
    /// Free-form dump of every field, for humans only.
    Full,
    Json,
    Protobuf,
}

impl WireFormat {
    /// Single-letter code the engine expects on its `search` call.
    #[must_use]
    pub fn code(self) -> char {
        match self {
            Self::Compact => 'S',
            Self::Full => 'F',
            Self::Json => 'J',
            Self::Protobuf => 'P',
        }
    }

    /// Whether the payload carries bytes rather than UTF-8 text.
    #[must_use]
    pub fn is_binary(self) -> bool {
        matches!(self, Self::Protobuf)
    }
}

impl fmt::Display for WireFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Compact => "compact",
            Self::Full => "full",
            Self::Json => "JSON",
            Self::Protobuf => "protobuf",
        };
        f.write_str(name)
    }
}

/// Formats a caller may ask for.
///
/// `Interpreted` is a presentation built on top of the JSON output: the
/// engine is queried for JSON and the result is rendered one line per place.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Compact,
    Full,
    Json,
    Interpreted,
    Protobuf,
}

impl OutputFormat {
    pub const ALL: [Self; 5] = [
        Self::Compact,
        Self::Full,
        Self::Json,
        Self::Interpreted,
        Self::Protobuf,
    ];

    #[must_use]
    pub fn code(self) -> char {
        match self {
            Self::Interpreted => 'I',
            other => other.wire_format().code(),
        }
    }

    /// The serialization to request from the engine for this format.
    #[must_use]
    pub fn wire_format(self) -> WireFormat {
        match self {
            Self::Compact => WireFormat::Compact,
            Self::Full => WireFormat::Full,
            Self::Json | Self::Interpreted => WireFormat::Json,
            Self::Protobuf => WireFormat::Protobuf,
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

impl FromStr for OutputFormat {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "s" | "compact" => Ok(Self::Compact),
            "f" | "full" => Ok(Self::Full),
            "j" | "json" => Ok(Self::Json),
            "i" | "interpreted" => Ok(Self::Interpreted),
            "p" | "protobuf" => Ok(Self::Protobuf),
            _ => Err(ParseError::UnsupportedFormat(s.to_owned())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_letter_codes_round_trip() {
        for format in OutputFormat::ALL {
            let parsed: OutputFormat = format.code().to_string().parse().unwrap();
            assert_eq!(parsed, format);
        }
    }

    #[test]
    fn test_long_names_are_case_insensitive() {
        assert_eq!(
            "Protobuf".parse::<OutputFormat>().unwrap(),
            OutputFormat::Protobuf
        );
        assert_eq!(
            "interpreted".parse::<OutputFormat>().unwrap(),
            OutputFormat::Interpreted
        );
    }

    #[test]
    fn test_unknown_tag_is_unsupported() {
        let err = "X".parse::<OutputFormat>().unwrap_err();
        assert!(matches!(err, ParseError::UnsupportedFormat(ref tag) if tag == "X"));
        assert!(!err.is_format_error());
    }

    #[test]
    fn test_interpreted_requests_json() {
        assert_eq!(OutputFormat::Interpreted.wire_format(), WireFormat::Json);
        assert_eq!(OutputFormat::Interpreted.code(), 'I');
        assert_eq!(OutputFormat::Json.code(), 'J');
        assert!(WireFormat::Protobuf.is_binary());
    }
}
