use std::sync::Arc;

use crate::bson::BsonType;
use crate::codec::{BsonCodable, Codec, RepresentationConfigurable};
use crate::error::{CodecError, Result};
use crate::io::{BsonReader, BsonWriter};
use crate::registry::CodecRegistry;
use crate::representation::{catalog, unsupported, CodecOptions, LogicalType, Representation};
use crate::time::{
    DateTime, DateTimeKind, TICKS_PER_HOUR, TICKS_PER_MINUTE, TICKS_PER_SECOND,
};

const DATE_TIME_FIELD: &str = "DateTime";
const TICKS_FIELD: &str = "Ticks";

/// Calendar instants.
///
/// Everything is stored as UTC. On the way back the value is converted to
/// the configured [`DateTimeKind`]; a date-only codec instead requires
/// midnight and just stamps the kind.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DateTimeCodec {
    representation: Representation,
    date_only: bool,
    kind: DateTimeKind,
}

impl DateTimeCodec {
    pub fn new(representation: Representation, date_only: bool, kind: DateTimeKind) -> Result<Self> {
        Ok(DateTimeCodec {
            representation: catalog::resolve(LogicalType::DateTime, representation)?,
            date_only,
            kind,
        })
    }

    pub fn date_only(&self) -> bool {
        self.date_only
    }

    pub fn kind(&self) -> DateTimeKind {
        self.kind
    }

    fn adjust_decoded(&self, value: DateTime) -> Result<DateTime> {
        if self.date_only {
            if value.time_of_day_ticks() != 0 {
                return Err(CodecError::format(
                    "a date-only DateTime cannot have a time of day",
                ));
            }
            return Ok(value.specify_kind(self.kind));
        }
        Ok(match self.kind {
            DateTimeKind::Utc => value.to_universal(),
            DateTimeKind::Local => value.to_local(),
            DateTimeKind::Unspecified => value.to_local().specify_kind(DateTimeKind::Unspecified),
        })
    }
}

impl Default for DateTimeCodec {
    fn default() -> Self {
        DateTimeCodec {
            representation: Representation::DateTime,
            date_only: false,
            kind: DateTimeKind::Utc,
        }
    }
}

impl RepresentationConfigurable for DateTimeCodec {
    fn representation(&self) -> Representation {
        self.representation
    }

    fn with_representation(self: &Arc<Self>, representation: Representation) -> Result<Arc<Self>> {
        let representation = catalog::resolve(LogicalType::DateTime, representation)?;
        if representation == self.representation {
            return Ok(Arc::clone(self));
        }
        Ok(Arc::new(DateTimeCodec {
            representation,
            ..(**self).clone()
        }))
    }
}

impl Codec<DateTime> for DateTimeCodec {
    fn encode(&self, writer: &mut dyn BsonWriter, value: &DateTime) -> Result<()> {
        let utc = if self.date_only {
            if value.time_of_day_ticks() != 0 {
                return Err(CodecError::serialization(
                    "TimeOfDay component is not zero for a date-only DateTime",
                ));
            }
            value.specify_kind(DateTimeKind::Utc)
        } else {
            value.to_universal()
        };

        match self.representation {
            Representation::DateTime => writer.write_date_time(utc.millis_since_epoch()),
            Representation::Document => {
                writer.write_start_document()?;
                writer.write_name(DATE_TIME_FIELD)?;
                writer.write_date_time(utc.millis_since_epoch())?;
                writer.write_name(TICKS_FIELD)?;
                writer.write_int64(utc.ticks())?;
                writer.write_end_document()
            }
            Representation::Int64 => writer.write_int64(utc.ticks()),
            Representation::String if self.date_only => {
                let (year, month, day) = value.ymd();
                writer.write_string(&format!("{year:04}-{month:02}-{day:02}"))
            }
            Representation::String => {
                let value = if value.is_min_or_max() {
                    value.specify_kind(DateTimeKind::Unspecified)
                } else if value.kind() == DateTimeKind::Unspecified {
                    value.specify_kind(DateTimeKind::Local)
                } else {
                    *value
                };
                writer.write_string(&format_round_trip(&value))
            }
            other => Err(unsupported(LogicalType::DateTime, other)),
        }
    }

    fn decode(&self, reader: &mut dyn BsonReader) -> Result<DateTime> {
        let value = match reader.current_bson_type()? {
            BsonType::DateTime => {
                let millis = reader.read_date_time()?;
                DateTime::from_millis_since_epoch(millis).ok_or_else(|| {
                    CodecError::overflow(format!(
                        "{millis} milliseconds since the epoch is outside the DateTime range"
                    ))
                })?
            }
            BsonType::Document => read_ticks_document(reader)?,
            BsonType::Int64 => {
                let ticks = reader.read_int64()?;
                from_utc_ticks(ticks)?
            }
            BsonType::String if self.date_only => {
                let text = reader.read_string()?;
                parse_date(&text)
                    .ok_or_else(|| invalid(&text))?
            }
            BsonType::String => parse_round_trip(&reader.read_string()?)?,
            other => return Err(CodecError::unexpected_type("DateTime", other)),
        };
        self.adjust_decoded(value)
    }
}

impl BsonCodable for DateTime {
    type Codec = DateTimeCodec;

    fn build_codec(_registry: &CodecRegistry, options: &CodecOptions) -> Result<DateTimeCodec> {
        DateTimeCodec::new(options.representation, options.date_only, options.kind)
    }
}

fn from_utc_ticks(ticks: i64) -> Result<DateTime> {
    DateTime::from_ticks(ticks, DateTimeKind::Utc)
        .ok_or_else(|| CodecError::overflow(format!("{ticks} ticks is outside the DateTime range")))
}

fn read_ticks_document(reader: &mut dyn BsonReader) -> Result<DateTime> {
    reader.read_start_document()?;
    let mut ticks = None;
    while reader.read_bson_type()? != BsonType::EndOfDocument {
        let name = reader.read_name()?;
        match name.as_str() {
            DATE_TIME_FIELD => reader.skip_value()?,
            TICKS_FIELD => ticks = Some(reader.read_int64()?),
            _ => {
                return Err(CodecError::format(format!(
                    "unexpected field `{name}` in a DateTime document"
                )));
            }
        }
    }
    reader.read_end_document()?;
    let ticks = ticks.ok_or_else(|| {
        CodecError::format(format!("a DateTime document requires a `{TICKS_FIELD}` field"))
    })?;
    from_utc_ticks(ticks)
}

fn invalid(text: &str) -> CodecError {
    CodecError::format(format!("'{text}' is not a valid DateTime"))
}

/// `yyyy-MM-ddTHH:mm:ss[.FFFFFFF][K]`, with trailing fraction zeros trimmed and
/// `K` being `Z`, a `+hh:mm` offset, or nothing for unspecified values.
fn format_round_trip(value: &DateTime) -> String {
    let (year, month, day) = value.ymd();
    let time = value.time_of_day_ticks();
    let mut out = format!(
        "{year:04}-{month:02}-{day:02}T{:02}:{:02}:{:02}",
        time / TICKS_PER_HOUR,
        time / TICKS_PER_MINUTE % 60,
        time / TICKS_PER_SECOND % 60,
    );
    let fraction = time % TICKS_PER_SECOND;
    if fraction > 0 {
        let digits = format!("{fraction:07}");
        out.push('.');
        out.push_str(digits.trim_end_matches('0'));
    }
    match value.kind() {
        DateTimeKind::Utc => out.push('Z'),
        DateTimeKind::Local => {
            let minutes = value.offset_ticks() / TICKS_PER_MINUTE;
            let sign = if minutes < 0 { '-' } else { '+' };
            let minutes = minutes.abs();
            out.push_str(&format!("{sign}{:02}:{:02}", minutes / 60, minutes % 60));
        }
        DateTimeKind::Unspecified => {}
    }
    out
}

fn fixed_digits(text: &str, len: usize) -> Option<u32> {
    if text.len() != len || !text.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    text.parse().ok()
}

/// `yyyy-MM-dd` as UTC midnight.
fn parse_date(text: &str) -> Option<DateTime> {
    let mut parts = text.split('-');
    let year = fixed_digits(parts.next()?, 4)?;
    let month = fixed_digits(parts.next()?, 2)?;
    let day = fixed_digits(parts.next()?, 2)?;
    if parts.next().is_some() {
        return None;
    }
    DateTime::from_date(year as i32, month, day, DateTimeKind::Utc)
}

/// Splits a trailing `Z` or `±hh:mm` from `text`, returning the offset in ticks.
fn split_zone(text: &str) -> Option<(&str, i64)> {
    if let Some(body) = text.strip_suffix('Z') {
        return Some((body, 0));
    }
    let len = text.len();
    if len > 6 {
        let (body, zone) = text.split_at(len - 6);
        let sign = match zone.as_bytes()[0] {
            b'+' => 1,
            b'-' => -1,
            _ => return Some((text, 0)),
        };
        if zone.as_bytes()[3] != b':' {
            return Some((text, 0));
        }
        let hours = fixed_digits(&zone[1..3], 2)? as i64;
        let minutes = fixed_digits(&zone[4..6], 2)? as i64;
        if hours > 14 || minutes > 59 {
            return None;
        }
        return Some((body, sign * (hours * TICKS_PER_HOUR + minutes * TICKS_PER_MINUTE)));
    }
    Some((text, 0))
}

/// Parses `yyyy-MM-dd[THH:mm:ss[.F{1,7}]][K]`, assuming UTC when no zone is given.
fn parse_round_trip(text: &str) -> Result<DateTime> {
    if !text.is_ascii() {
        return Err(invalid(text));
    }
    let (body, offset) = split_zone(text).ok_or_else(|| invalid(text))?;
    let (date, time) = match body.split_once('T') {
        Some((date, time)) => (date, Some(time)),
        None => (body, None),
    };
    let midnight = parse_date(date).ok_or_else(|| invalid(text))?;
    let time_ticks = match time {
        Some(time) => parse_time(time).ok_or_else(|| invalid(text))?,
        None => 0,
    };
    midnight
        .add_ticks(time_ticks)
        .and_then(|local| local.add_ticks(-offset))
        .ok_or_else(|| {
            CodecError::overflow(format!("'{text}' is outside the DateTime range"))
        })
}

fn parse_time(text: &str) -> Option<i64> {
    let (clock, fraction) = match text.split_once('.') {
        Some((clock, fraction)) => (clock, Some(fraction)),
        None => (text, None),
    };
    let mut fields = clock.split(':');
    let hour = fixed_digits(fields.next()?, 2)? as i64;
    let minute = fixed_digits(fields.next()?, 2)? as i64;
    let second = fixed_digits(fields.next()?, 2)? as i64;
    if fields.next().is_some() || hour > 23 || minute > 59 || second > 59 {
        return None;
    }
    let fraction = match fraction {
        Some(digits) if (1..=7).contains(&digits.len()) => {
            let value = fixed_digits(digits, digits.len())? as i64;
            value * 10i64.pow(7 - digits.len() as u32)
        }
        Some(_) => return None,
        None => 0,
    };
    Some(hour * TICKS_PER_HOUR + minute * TICKS_PER_MINUTE + second * TICKS_PER_SECOND + fraction)
}
