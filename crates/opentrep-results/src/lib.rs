//! Decoders for the answers of the OpenTrep travel search engine.
//!
//! The engine resolves free text such as `"nice sna francisco"` into points of
//! reference (airports, cities, ...) identified by IATA/ICAO codes. It can
//! answer in three serializations; this crate turns any of them into the same
//! normalized [`ParseResult`].
//!
//! ```rust
//! use opentrep_results::{OutputFormat, ResultParser};
//!
//! let result = ResultParser::parse(
//!     b"nce/100,sfo/100-emb/98-jcc/97;niznayou",
//!     OutputFormat::Compact,
//! )?;
//! assert_eq!(result.codes(), vec!["NCE", "SFO"]);
//! assert_eq!(result.unmatched_text(), "niznayou");
//! # Ok::<(), opentrep_results::ParseError>(())
//! ```
//!
//! # Score scales
//!
//! Compact and JSON answers give a percentage which is divided by 100. The
//! protobuf answer carries the engine's native page rank, which is kept as
//! is; [`ParseResult::score_scale`] says which one applies.
//!
//! Decoding is pure: no I/O, no shared state, safe to call from any thread.

pub mod compact;
pub mod error;
pub mod format;
pub mod json;
mod model;
pub mod protobuf;

pub use compact::{CompactDecoder, parse_compact};
pub use error::{ParseError, Result};
pub use format::{OutputFormat, WireFormat};
pub use json::{JsonDecoder, interpret_json, parse_json};
pub use model::{DecodeStatus, ParseResult, PlaceMatch, ScoreScale};
pub use protobuf::{ProtobufDecoder, WireError, parse_protobuf};

/// Turns the raw bytes of one engine answer into a [`ParseResult`].
pub trait PayloadDecoder: std::fmt::Debug + Send + Sync {
    /// The serialization this decoder understands.
    fn format(&self) -> WireFormat;

    fn decode(&self, payload: &[u8]) -> Result<ParseResult>;
}

/// Entry point choosing the decoder from a format tag.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResultParser;

impl ResultParser {
    /// The decoder for `format`.
    ///
    /// The full (`F`) output is a human-oriented dump with no grammar and has
    /// no decoder.
    pub fn decoder(format: WireFormat) -> Result<&'static dyn PayloadDecoder> {
        match format {
            WireFormat::Compact => Ok(&CompactDecoder),
            WireFormat::Json => Ok(&JsonDecoder),
            WireFormat::Protobuf => Ok(&ProtobufDecoder),
            WireFormat::Full => Err(ParseError::NotDecodable(WireFormat::Full)),
        }
    }

    /// Decodes `payload` as produced by the engine for `format`.
    pub fn parse(payload: &[u8], format: OutputFormat) -> Result<ParseResult> {
        Self::decoder(format.wire_format())?.decode(payload)
    }

    /// Same as [`ResultParser::parse`] with a textual tag (`"S"`, `"json"`, ...).
    pub fn parse_tagged(payload: &[u8], tag: &str) -> Result<ParseResult> {
        Self::parse(payload, tag.parse()?)
    }
}
