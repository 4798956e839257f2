use std::fmt;

use itertools::Itertools;
use serde::Serialize;

use crate::{
    error::{ParseError, Result},
    protobuf::WireError,
};

/// Unit of [`PlaceMatch::score`].
///
/// The compact and JSON outputs express relevance as a percentage, which is
/// divided by 100 on decode. The protobuf output carries the engine's native
/// page rank, which is kept untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreScale {
    /// Percentage divided by 100, usually within `[0.0, 1.0]`.
    Fraction,
    /// Raw page rank as reported by the engine.
    NativeRank,
}

impl ScoreScale {
    /// Converts a score in this scale to the percentage figure shown to users.
    #[must_use]
    pub fn as_percentage(self, score: f64) -> f64 {
        match self {
            Self::Fraction => score * 100.0,
            Self::NativeRank => score,
        }
    }
}

/// Whether every byte of the payload was understood.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(tag = "status", content = "error", rename_all = "snake_case")]
pub enum DecodeStatus {
    #[default]
    Complete,
    /// The payload could not be decoded; the result holds no places.
    Degraded(WireError),
}

/// One recognised point of reference (airport, city, heliport, ...).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlaceMatch {
    /// Relevance, see [`ScoreScale`] for the unit.
    pub score: f64,
    /// IATA-style travel code, always uppercase and non-empty.
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icao_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub geonames_id: Option<u64>,
    /// IATA code of the city served by the place.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
}

impl PlaceMatch {
    pub(crate) fn new(score: f64, code: &str) -> Self {
        Self {
            score,
            code: code.to_uppercase(),
            icao_code: None,
            geonames_id: None,
            city_code: None,
            latitude: None,
            longitude: None,
        }
    }

    #[must_use]
    pub fn score(&self) -> f64 {
        self.score
    }

    #[must_use]
    pub fn code(&self) -> &str {
        &self.code
    }

    /// Returns coordinates as a tuple (latitude, longitude) if both are available.
    #[must_use]
    pub fn coordinates(&self) -> Option<(f64, f64)> {
        self.latitude.zip(self.longitude)
    }

    /// The `(score, code)` pair reported by the compact parser.
    #[must_use]
    pub fn as_pair(&self) -> (f64, &str) {
        (self.score, &self.code)
    }

    /// Renders `IATA-ICAO-GEONAMESID-SS.SS%-CITY-LAT-LON`.
    ///
    /// Missing attributes leave their slot empty so the field positions stay
    /// stable for consumers splitting on `-`.
    #[must_use]
    pub fn render(&self, scale: ScoreScale) -> String {
        let two_decimals = |value: Option<f64>| value.map(|v| format!("{v:.2}")).unwrap_or_default();
        [
            self.code.clone(),
            self.icao_code.clone().unwrap_or_default(),
            self.geonames_id.map(|id| id.to_string()).unwrap_or_default(),
            format!("{:.2}%", scale.as_percentage(self.score)),
            self.city_code.clone().unwrap_or_default(),
            two_decimals(self.latitude),
            two_decimals(self.longitude),
        ]
        .join("-")
    }
}

impl fmt::Display for PlaceMatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, '{}')", self.score, self.code)
    }
}

/// Normalized outcome of decoding one engine answer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParseResult {
    matches: Vec<PlaceMatch>,
    unmatched: Vec<String>,
    score_scale: ScoreScale,
    #[serde(flatten)]
    status: DecodeStatus,
}

impl ParseResult {
    pub(crate) fn complete(
        matches: Vec<PlaceMatch>,
        unmatched: Vec<String>,
        score_scale: ScoreScale,
    ) -> Self {
        Self {
            matches,
            unmatched,
            score_scale,
            status: DecodeStatus::Complete,
        }
    }

    pub(crate) fn degraded(error: WireError, score_scale: ScoreScale) -> Self {
        Self {
            matches: Vec::new(),
            unmatched: Vec::new(),
            score_scale,
            status: DecodeStatus::Degraded(error),
        }
    }

    /// Places in payload order.
    #[must_use]
    pub fn matches(&self) -> &[PlaceMatch] {
        &self.matches
    }

    /// Query words the engine could not resolve, as reported by the engine.
    #[must_use]
    pub fn unmatched(&self) -> &[String] {
        &self.unmatched
    }

    /// Unmatched words concatenated without separator, the way the engine
    /// clients print them.
    #[must_use]
    pub fn unmatched_text(&self) -> String {
        self.unmatched.concat()
    }

    #[must_use]
    pub fn codes(&self) -> Vec<&str> {
        self.matches.iter().map(PlaceMatch::code).collect()
    }

    #[must_use]
    pub fn score_scale(&self) -> ScoreScale {
        self.score_scale
    }

    #[must_use]
    pub fn status(&self) -> &DecodeStatus {
        &self.status
    }

    #[must_use]
    pub fn is_degraded(&self) -> bool {
        matches!(self.status, DecodeStatus::Degraded(_))
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }

    /// Turns a degraded decode into an error for callers that cannot work
    /// with a partial answer.
    pub fn require_complete(self) -> Result<Self> {
        match self.status {
            DecodeStatus::Complete => Ok(self),
            DecodeStatus::Degraded(err) => Err(ParseError::Wire(err)),
        }
    }

    /// One rendered line per place, joined with `"; "`.
    #[must_use]
    pub fn render_interpreted(&self) -> String {
        self.matches
            .iter()
            .map(|place| place.render(self.score_scale))
            .join("; ")
    }

    /// Splits into `(score, code)` pairs and the unmatched text.
    #[must_use]
    pub fn into_pairs(self) -> (Vec<(f64, String)>, String) {
        let unmatched = self.unmatched_text();
        let pairs = self
            .matches
            .into_iter()
            .map(|place| (place.score, place.code))
            .collect();
        (pairs, unmatched)
    }
}

impl fmt::Display for ParseResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "([{}], '{}')",
            self.matches.iter().join(", "),
            self.unmatched_text()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn orly() -> PlaceMatch {
        PlaceMatch {
            icao_code: Some("LFPO".into()),
            geonames_id: Some(2_988_500),
            city_code: Some("PAR".into()),
            latitude: Some(48.725_278),
            longitude: Some(2.359_444),
            ..PlaceMatch::new(0.2353, "ory")
        }
    }

    #[test]
    fn test_code_is_uppercased() {
        assert_eq!(PlaceMatch::new(1.0, "nce").code(), "NCE");
    }

    #[test]
    fn test_render_fraction_scale() {
        assert_eq!(
            orly().render(ScoreScale::Fraction),
            "ORY-LFPO-2988500-23.53%-PAR-48.73-2.36"
        );
    }

    #[test]
    fn test_render_native_rank_is_not_rescaled() {
        let place = PlaceMatch {
            score: 89.8466,
            ..orly()
        };
        assert_eq!(
            place.render(ScoreScale::NativeRank),
            "ORY-LFPO-2988500-89.85%-PAR-48.73-2.36"
        );
    }

    #[test]
    fn test_render_keeps_empty_slots() {
        assert_eq!(
            PlaceMatch::new(1.0, "nce").render(ScoreScale::Fraction),
            "NCE---100.00%---"
        );
    }

    #[test]
    fn test_display_matches_pair_listing() {
        let result = ParseResult::complete(
            vec![PlaceMatch::new(1.0, "nce"), PlaceMatch::new(0.5, "sfo")],
            vec!["niznayou".into()],
            ScoreScale::Fraction,
        );
        assert_eq!(result.to_string(), "([(1, 'NCE'), (0.5, 'SFO')], 'niznayou')");
    }

    #[test]
    fn test_require_complete_surfaces_wire_error() {
        let result = ParseResult::degraded(WireError::Truncated, ScoreScale::NativeRank);
        assert!(result.is_degraded());
        let err = result.require_complete().unwrap_err();
        assert!(matches!(err, ParseError::Wire(WireError::Truncated)));
    }

    #[test]
    fn test_into_pairs() {
        let result = ParseResult::complete(
            vec![PlaceMatch::new(1.0, "yvr")],
            vec!["foo".into(), "bar".into()],
            ScoreScale::Fraction,
        );
        let (pairs, unmatched) = result.into_pairs();
        assert_eq!(pairs, vec![(1.0, "YVR".to_string())]);
        assert_eq!(unmatched, "foobar");
    }
}
