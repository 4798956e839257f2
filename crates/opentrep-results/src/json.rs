//! Decoder for the JSON (`J`) output and the interpreted (`I`) view built on it.

use serde::Deserialize;
use tracing::debug;

use crate::{
    PayloadDecoder,
    error::{ParseError, Result},
    format::WireFormat,
    model::{ParseResult, PlaceMatch, ScoreScale},
};

#[derive(Debug, Deserialize)]
struct JsonAnswer {
    locations: Vec<JsonLocation>,
}

#[derive(Debug, Deserialize)]
struct JsonLocation {
    #[serde(default)]
    iata_code: Option<String>,
    #[serde(default)]
    icao_code: Option<String>,
    #[serde(default)]
    geonames_id: Option<NumericField>,
    #[serde(default)]
    page_rank: Option<NumericField>,
    #[serde(default)]
    cities: Option<JsonCities>,
    #[serde(default)]
    city_details: Option<JsonCityDetails>,
    #[serde(default)]
    city_code: Option<String>,
    #[serde(default)]
    lat: Option<NumericField>,
    #[serde(default)]
    lon: Option<NumericField>,
}

#[derive(Debug, Deserialize)]
struct JsonCities {
    #[serde(default)]
    city_details: Option<JsonCityDetails>,
}

#[derive(Debug, Deserialize)]
struct JsonCityDetails {
    #[serde(default)]
    iata_code: Option<String>,
}

/// The engine writes numbers as strings; plain JSON numbers are accepted too.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum NumericField {
    Text(String),
    Number(serde_json::Number),
}

impl NumericField {
    fn to_f64(&self, field: &str) -> Result<f64> {
        let value = match self {
            Self::Text(text) => text.trim().parse::<f64>().ok(),
            Self::Number(number) => number.as_f64(),
        };
        value
            .filter(|v| v.is_finite())
            .ok_or_else(|| self.invalid(field))
    }

    fn to_u64(&self, field: &str) -> Result<u64> {
        let value = match self {
            Self::Text(text) => text.trim().parse::<u64>().ok(),
            Self::Number(number) => number.as_u64(),
        };
        value.ok_or_else(|| self.invalid(field))
    }

    fn invalid(&self, field: &str) -> ParseError {
        let shown = match self {
            Self::Text(text) => text.clone(),
            Self::Number(number) => number.to_string(),
        };
        ParseError::malformed(
            WireFormat::Json,
            format!("field '{field}' has non-numeric value '{shown}'"),
        )
    }
}

impl JsonLocation {
    /// The city's own IATA code, wherever this payload shape keeps it.
    fn city_code(&self) -> Option<String> {
        self.cities
            .as_ref()
            .and_then(|cities| cities.city_details.as_ref())
            .and_then(|details| details.iata_code.clone())
            .or_else(|| {
                self.city_details
                    .as_ref()
                    .and_then(|details| details.iata_code.clone())
            })
            .or_else(|| self.city_code.clone())
    }

    fn into_place(self, position: usize) -> Result<PlaceMatch> {
        let code = self
            .iata_code
            .as_deref()
            .filter(|code| !code.is_empty())
            .ok_or_else(|| {
                ParseError::malformed(
                    WireFormat::Json,
                    format!("location #{position} has no 'iata_code'"),
                )
            })?;
        let page_rank = self.page_rank.as_ref().ok_or_else(|| {
            ParseError::malformed(
                WireFormat::Json,
                format!("location #{position} has no 'page_rank'"),
            )
        })?;

        Ok(PlaceMatch {
            icao_code: self.icao_code.clone(),
            geonames_id: self
                .geonames_id
                .as_ref()
                .map(|id| id.to_u64("geonames_id"))
                .transpose()?,
            city_code: self.city_code(),
            latitude: self.lat.as_ref().map(|v| v.to_f64("lat")).transpose()?,
            longitude: self.lon.as_ref().map(|v| v.to_f64("lon")).transpose()?,
            ..PlaceMatch::new(page_rank.to_f64("page_rank")? / 100.0, code)
        })
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct JsonDecoder;

impl PayloadDecoder for JsonDecoder {
    fn format(&self) -> WireFormat {
        WireFormat::Json
    }

    fn decode(&self, payload: &[u8]) -> Result<ParseResult> {
        let text =
            std::str::from_utf8(payload).map_err(|_| ParseError::InvalidUtf8(WireFormat::Json))?;
        parse_json(text)
    }
}

/// Decodes a JSON answer, one place per entry of `locations`.
///
/// The JSON output does not list unmatched words, so the result never has
/// any.
pub fn parse_json(payload: &str) -> Result<ParseResult> {
    let answer: JsonAnswer = serde_json::from_str(payload)?;
    let matches = answer
        .locations
        .into_iter()
        .enumerate()
        .map(|(position, location)| location.into_place(position))
        .collect::<Result<Vec<_>>>()?;

    debug!(places = matches.len(), "Decoded JSON answer");
    Ok(ParseResult::complete(
        matches,
        Vec::new(),
        ScoreScale::Fraction,
    ))
}

/// Decodes a JSON answer and renders it one place per `"; "`-joined entry:
/// `ORY-LFPO-2988500-23.53%-PAR-48.73-2.36; CDG-...`.
pub fn interpret_json(payload: &str) -> Result<String> {
    Ok(parse_json(payload)?.render_interpreted())
}
