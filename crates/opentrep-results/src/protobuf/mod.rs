//! Decoder for the protobuf (`P`) output, the `QueryAnswer` message of the
//! engine's travel schema.
//!
//! Only the fields the wrapper reports are read; everything else is skipped.
//! The decode is tolerant: a malformed answer yields an empty, degraded
//! [`ParseResult`] instead of an error.

mod wire;

use tracing::{debug, warn};
pub use wire::WireError;
use wire::{FieldReader, WireResult};

use crate::{
    PayloadDecoder,
    error::Result,
    format::WireFormat,
    model::{ParseResult, PlaceMatch, ScoreScale},
};

/// Field numbers of the travel schema.
mod field {
    pub(super) const ANSWER_PLACE_LIST: u32 = 3;
    pub(super) const ANSWER_UNMATCHED_KEYWORDS: u32 = 4;

    pub(super) const PLACE_LIST_PLACE: u32 = 1;
    pub(super) const KEYWORD_LIST_WORD: u32 = 1;

    pub(super) const PLACE_GEONAMES_ID: u32 = 2;
    pub(super) const PLACE_TVL_CODE: u32 = 3;
    pub(super) const PLACE_ICAO_CODE: u32 = 4;
    pub(super) const PLACE_CITY_LIST: u32 = 9;
    pub(super) const PLACE_COORD: u32 = 13;
    pub(super) const PLACE_PAGE_RANK: u32 = 17;

    pub(super) const CITY_LIST_CITY: u32 = 1;
    pub(super) const CITY_CODE: u32 = 1;

    /// `IATACode.code`, `ICAOCode.code`, `GeonamesID.id` and `PageRank.rank`.
    pub(super) const WRAPPED_VALUE: u32 = 1;

    pub(super) const GEO_POINT_LATITUDE: u32 = 1;
    pub(super) const GEO_POINT_LONGITUDE: u32 = 2;
}

#[derive(Debug, Default)]
struct AnswerRecord {
    places: Vec<PlaceRecord>,
    unmatched: String,
}

#[derive(Debug, Default)]
struct PlaceRecord {
    tvl_code: String,
    icao_code: String,
    geonames_id: u64,
    page_rank: f64,
    city_code: Option<String>,
    coord: Option<(f64, f64)>,
}

/// Reads the single wrapped value (field 1) of `IATACode`-like messages.
fn wrapped_string(buf: &[u8]) -> WireResult<String> {
    let mut value = String::new();
    let mut reader = FieldReader::new(buf);
    while let Some((number, field_value)) = reader.next_field()? {
        if number == field::WRAPPED_VALUE {
            field_value.string(number)?.clone_into(&mut value);
        }
    }
    Ok(value)
}

fn wrapped_varint(buf: &[u8]) -> WireResult<u64> {
    let mut value = 0;
    let mut reader = FieldReader::new(buf);
    while let Some((number, field_value)) = reader.next_field()? {
        if number == field::WRAPPED_VALUE {
            value = field_value.varint(number)?;
        }
    }
    Ok(value)
}

fn wrapped_double(buf: &[u8]) -> WireResult<f64> {
    let mut value = 0.0;
    let mut reader = FieldReader::new(buf);
    while let Some((number, field_value)) = reader.next_field()? {
        if number == field::WRAPPED_VALUE {
            value = field_value.double(number)?;
        }
    }
    Ok(value)
}

fn decode_geo_point(buf: &[u8]) -> WireResult<(f64, f64)> {
    let (mut latitude, mut longitude) = (0.0, 0.0);
    let mut reader = FieldReader::new(buf);
    while let Some((number, value)) = reader.next_field()? {
        match number {
            field::GEO_POINT_LATITUDE => latitude = value.double(number)?,
            field::GEO_POINT_LONGITUDE => longitude = value.double(number)?,
            _ => {}
        }
    }
    Ok((latitude, longitude))
}

/// Code of the last city in a `CityList`; later entries override earlier ones.
fn decode_city_list(buf: &[u8]) -> WireResult<Option<String>> {
    let mut last_city = None;
    let mut reader = FieldReader::new(buf);
    while let Some((number, value)) = reader.next_field()? {
        if number == field::CITY_LIST_CITY {
            let mut code = String::new();
            let mut city = FieldReader::new(value.bytes(number)?);
            while let Some((city_number, city_value)) = city.next_field()? {
                if city_number == field::CITY_CODE {
                    code = wrapped_string(city_value.bytes(city_number)?)?;
                }
            }
            last_city = Some(code);
        }
    }
    Ok(last_city.filter(|code| !code.is_empty()))
}

fn decode_place(buf: &[u8]) -> WireResult<PlaceRecord> {
    let mut place = PlaceRecord::default();
    let mut reader = FieldReader::new(buf);
    while let Some((number, value)) = reader.next_field()? {
        match number {
            field::PLACE_TVL_CODE => place.tvl_code = wrapped_string(value.bytes(number)?)?,
            field::PLACE_ICAO_CODE => place.icao_code = wrapped_string(value.bytes(number)?)?,
            field::PLACE_GEONAMES_ID => {
                place.geonames_id = wrapped_varint(value.bytes(number)?)?;
            }
            field::PLACE_PAGE_RANK => place.page_rank = wrapped_double(value.bytes(number)?)?,
            field::PLACE_CITY_LIST => place.city_code = decode_city_list(value.bytes(number)?)?,
            field::PLACE_COORD => place.coord = Some(decode_geo_point(value.bytes(number)?)?),
            _ => {}
        }
    }
    Ok(place)
}

fn decode_answer(buf: &[u8]) -> WireResult<AnswerRecord> {
    let mut answer = AnswerRecord::default();
    let mut reader = FieldReader::new(buf);
    while let Some((number, value)) = reader.next_field()? {
        match number {
            field::ANSWER_PLACE_LIST => {
                let mut list = FieldReader::new(value.bytes(number)?);
                while let Some((list_number, list_value)) = list.next_field()? {
                    if list_number == field::PLACE_LIST_PLACE {
                        answer
                            .places
                            .push(decode_place(list_value.bytes(list_number)?)?);
                    }
                }
            }
            field::ANSWER_UNMATCHED_KEYWORDS => {
                let mut list = FieldReader::new(value.bytes(number)?);
                while let Some((list_number, list_value)) = list.next_field()? {
                    if list_number == field::KEYWORD_LIST_WORD {
                        // Words are glued together without any separator.
                        answer.unmatched.push_str(list_value.string(list_number)?);
                    }
                }
            }
            _ => {}
        }
    }
    Ok(answer)
}

impl PlaceRecord {
    fn into_place(self) -> WireResult<PlaceMatch> {
        if self.tvl_code.is_empty() {
            return Err(WireError::MissingCode);
        }
        Ok(PlaceMatch {
            icao_code: Some(self.icao_code).filter(|code| !code.is_empty()),
            geonames_id: Some(self.geonames_id).filter(|&id| id != 0),
            city_code: self.city_code,
            latitude: self.coord.map(|(latitude, _)| latitude),
            longitude: self.coord.map(|(_, longitude)| longitude),
            // The rank is on the engine's native scale, not a percentage.
            ..PlaceMatch::new(self.page_rank, &self.tvl_code)
        })
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ProtobufDecoder;

impl PayloadDecoder for ProtobufDecoder {
    fn format(&self) -> WireFormat {
        WireFormat::Protobuf
    }

    fn decode(&self, payload: &[u8]) -> Result<ParseResult> {
        Ok(parse_protobuf(payload))
    }
}

/// Decodes a serialized `QueryAnswer`.
///
/// Never fails: malformed bytes are logged and reported through
/// [`ParseResult::status`] with an empty place list.
#[must_use]
pub fn parse_protobuf(payload: &[u8]) -> ParseResult {
    let decoded = decode_answer(payload).and_then(|answer| {
        let matches = answer
            .places
            .into_iter()
            .map(PlaceRecord::into_place)
            .collect::<WireResult<Vec<_>>>()?;
        Ok((matches, answer.unmatched))
    });

    match decoded {
        Ok((matches, unmatched)) => {
            debug!(
                places = matches.len(),
                unmatched = %unmatched,
                "Decoded protobuf answer"
            );
            let unmatched = if unmatched.is_empty() {
                Vec::new()
            } else {
                vec![unmatched]
            };
            ParseResult::complete(matches, unmatched, ScoreScale::NativeRank)
        }
        Err(err) => {
            warn!(
                error = %err,
                bytes = payload.len(),
                "Issue decoding the protobuf answer, continuing with an empty place list"
            );
            ParseResult::degraded(err, ScoreScale::NativeRank)
        }
    }
}
