//! Decoder for the compact (`S`) output.
//!
//! ```text
//! nce/100,sfo/100-emb/98-jcc/97,yvr/100-cxh/83-xea/83-ydt/83;niznayou
//! ```
//!
//! `;` splits recognised places from unmatched words, `,` splits query
//! tokens, `-` splits lower-ranked alternates, `:` splits co-ranked codes and
//! `/` precedes the percentage score.

use tracing::debug;

use crate::{
    PayloadDecoder,
    error::{ParseError, Result},
    format::WireFormat,
    model::{ParseResult, PlaceMatch, ScoreScale},
};

const UNMATCHED_SEPARATOR: char = ';';
const GROUP_SEPARATOR: char = ',';
const ALTERNATE_SEPARATOR: char = '-';
const CO_RANKED_SEPARATOR: char = ':';
const SCORE_SEPARATOR: char = '/';

#[derive(Debug, Clone, Copy, Default)]
pub struct CompactDecoder;

impl PayloadDecoder for CompactDecoder {
    fn format(&self) -> WireFormat {
        WireFormat::Compact
    }

    fn decode(&self, payload: &[u8]) -> Result<ParseResult> {
        let text = std::str::from_utf8(payload)
            .map_err(|_| ParseError::InvalidUtf8(WireFormat::Compact))?;
        parse_compact(text)
    }
}

/// Decodes a compact answer, keeping the best alternate of every query token.
///
/// All co-ranked codes of that best alternate are reported, each with the
/// shared score. The unmatched section is kept verbatim.
pub fn parse_compact(payload: &str) -> Result<ParseResult> {
    let (matched, unmatched) = payload
        .split_once(UNMATCHED_SEPARATOR)
        .unwrap_or((payload, ""));

    let unmatched = if unmatched.is_empty() {
        Vec::new()
    } else {
        vec![unmatched.to_owned()]
    };

    if matched.is_empty() {
        return Ok(ParseResult::complete(
            Vec::new(),
            unmatched,
            ScoreScale::Fraction,
        ));
    }

    let mut matches = Vec::new();
    for group in matched.split(GROUP_SEPARATOR) {
        matches.extend(decode_group(group)?);
    }

    debug!(
        places = matches.len(),
        unmatched = unmatched.len(),
        "Decoded compact answer"
    );
    Ok(ParseResult::complete(
        matches,
        unmatched,
        ScoreScale::Fraction,
    ))
}

fn decode_group(group: &str) -> Result<Vec<PlaceMatch>> {
    // Alternates come best first; lower-ranked ones are not reported.
    let best = group
        .split_once(ALTERNATE_SEPARATOR)
        .map_or(group, |(best, _)| best);

    let (codes, percentage) = best.split_once(SCORE_SEPARATOR).ok_or_else(|| {
        ParseError::malformed(
            WireFormat::Compact,
            format!("group '{group}' has no '{SCORE_SEPARATOR}' before its score"),
        )
    })?;
    let score = parse_percentage(percentage, group)?;

    codes
        .split(CO_RANKED_SEPARATOR)
        .map(|code| {
            if code.is_empty() {
                Err(ParseError::malformed(
                    WireFormat::Compact,
                    format!("group '{group}' contains an empty code"),
                ))
            } else {
                Ok(PlaceMatch::new(score, code))
            }
        })
        .collect()
}

fn parse_percentage(percentage: &str, group: &str) -> Result<f64> {
    let value: f64 = percentage.parse().map_err(|_| {
        ParseError::malformed(
            WireFormat::Compact,
            format!("score '{percentage}' of group '{group}' is not a number"),
        )
    })?;
    // The engine may report ranks well above 100; only non-numbers are refused
    if !value.is_finite() {
        return Err(ParseError::malformed(
            WireFormat::Compact,
            format!("score '{percentage}' of group '{group}' is not finite"),
        ));
    }
    Ok(value / 100.0)
}
