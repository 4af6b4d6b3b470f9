use std::sync::Arc;

use crate::bson::BsonType;
use crate::codec::{BsonCodable, Codec, RepresentationConfigurable};
use crate::convert::{Numeric, NumericConverter};
use crate::error::{CodecError, Result};
use crate::io::{BsonReader, BsonWriter};
use crate::registry::CodecRegistry;
use crate::representation::{catalog, unsupported, CodecOptions, LogicalType, Representation};
use crate::time::{TimeSpan, TimeUnit};

/// Durations, as constant-format text or a count of [`TimeUnit`]s.
///
/// Integer counts truncate toward zero; floating counts keep the fraction
/// and are rounded to the nearest tick when read back.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TimeSpanCodec {
    representation: Representation,
    unit: TimeUnit,
}

impl TimeSpanCodec {
    pub fn new(representation: Representation, unit: TimeUnit) -> Result<Self> {
        Ok(TimeSpanCodec {
            representation: catalog::resolve(LogicalType::TimeSpan, representation)?,
            unit,
        })
    }

    pub fn unit(&self) -> TimeUnit {
        self.unit
    }

    fn from_units(&self, units: i128) -> Result<TimeSpan> {
        self.unit
            .ticks_in(units)
            .and_then(|ticks| i64::try_from(ticks).ok())
            .map(TimeSpan::from_ticks)
            .ok_or_else(|| self.out_of_range(units))
    }

    fn from_fractional_units(&self, units: f64) -> Result<TimeSpan> {
        self.unit
            .ticks_in_fractional(units)
            .map(TimeSpan::from_ticks)
            .ok_or_else(|| self.out_of_range(units))
    }

    fn out_of_range(&self, units: impl std::fmt::Display) -> CodecError {
        CodecError::overflow(format!(
            "{units} {:?} is outside the TimeSpan range",
            self.unit
        ))
    }
}

impl Default for TimeSpanCodec {
    fn default() -> Self {
        TimeSpanCodec {
            representation: Representation::String,
            unit: TimeUnit::Ticks,
        }
    }
}

impl RepresentationConfigurable for TimeSpanCodec {
    fn representation(&self) -> Representation {
        self.representation
    }

    fn with_representation(self: &Arc<Self>, representation: Representation) -> Result<Arc<Self>> {
        let representation = catalog::resolve(LogicalType::TimeSpan, representation)?;
        if representation == self.representation {
            return Ok(Arc::clone(self));
        }
        Ok(Arc::new(TimeSpanCodec {
            representation,
            unit: self.unit,
        }))
    }
}

impl Codec<TimeSpan> for TimeSpanCodec {
    fn encode(&self, writer: &mut dyn BsonWriter, value: &TimeSpan) -> Result<()> {
        match self.representation {
            Representation::String => writer.write_string(&value.to_string()),
            Representation::Int32 => {
                let units = Numeric::Int(self.unit.units_in(value.ticks()));
                writer.write_int32(NumericConverter::STRICT.to_int::<i32>(units)?)
            }
            Representation::Int64 => {
                let units = Numeric::Int(self.unit.units_in(value.ticks()));
                writer.write_int64(NumericConverter::STRICT.to_int::<i64>(units)?)
            }
            Representation::Double => writer.write_double(self.unit.fractional_units_in(value.ticks())),
            other => Err(unsupported(LogicalType::TimeSpan, other)),
        }
    }

    fn decode(&self, reader: &mut dyn BsonReader) -> Result<TimeSpan> {
        match reader.current_bson_type()? {
            BsonType::String => reader.read_string()?.parse(),
            BsonType::Int32 => self.from_units(reader.read_int32()? as i128),
            BsonType::Int64 => self.from_units(reader.read_int64()? as i128),
            BsonType::Double => self.from_fractional_units(reader.read_double()?),
            other => Err(CodecError::unexpected_type("TimeSpan", other)),
        }
    }
}

impl BsonCodable for TimeSpan {
    type Codec = TimeSpanCodec;

    fn build_codec(_registry: &CodecRegistry, options: &CodecOptions) -> Result<TimeSpanCodec> {
        TimeSpanCodec::new(options.representation, options.time_unit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bson::Bson;
    use crate::codec::{decode_from_bson, encode_to_bson};
    use crate::error::ErrorKind;
    use crate::time::{TICKS_PER_DAY, TICKS_PER_MILLISECOND};

    #[test]
    fn default_is_constant_format_text() {
        let codec = TimeSpanCodec::default();
        let span = TimeSpan::from_parts(1, 2, 3, 4).unwrap();
        let encoded = encode_to_bson(&codec, &span).unwrap();
        assert_eq!(encoded, Bson::String("1.02:03:04".into()));
        assert_eq!(decode_from_bson(&codec, encoded).unwrap(), span);
    }

    #[test]
    fn integer_units_truncate_toward_zero() {
        let codec = TimeSpanCodec::new(Representation::Int64, TimeUnit::Milliseconds).unwrap();
        let span = TimeSpan::from_ticks(-15_999);
        assert_eq!(encode_to_bson(&codec, &span).unwrap(), Bson::Int64(-1));
        assert_eq!(
            decode_from_bson(&codec, Bson::Int64(250)).unwrap(),
            TimeSpan::from_ticks(250 * TICKS_PER_MILLISECOND)
        );
    }

    #[test]
    fn int32_overflow_is_reported() {
        let codec = TimeSpanCodec::new(Representation::Int32, TimeUnit::Ticks).unwrap();
        let err = encode_to_bson(&codec, &TimeSpan::from_ticks(TICKS_PER_DAY)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Overflow);
        let days = TimeSpanCodec::new(Representation::Int32, TimeUnit::Days).unwrap();
        assert_eq!(encode_to_bson(&days, &TimeSpan::from_ticks(TICKS_PER_DAY * 3)).unwrap(), Bson::Int32(3));
    }

    #[test]
    fn reading_large_counts_overflows() {
        let codec = TimeSpanCodec::new(Representation::Int64, TimeUnit::Days).unwrap();
        let err = decode_from_bson(&codec, Bson::Int64(i64::MAX)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Overflow);
    }

    #[test]
    fn nanoseconds_are_hundredths_of_a_tick() {
        let codec = TimeSpanCodec::new(Representation::Int64, TimeUnit::Nanoseconds).unwrap();
        let span = TimeSpan::from_ticks(12);
        assert_eq!(encode_to_bson(&codec, &span).unwrap(), Bson::Int64(1200));
        assert_eq!(decode_from_bson(&codec, Bson::Int64(1299)).unwrap(), span);
    }

    #[test]
    fn doubles_keep_fractions() {
        let codec = TimeSpanCodec::new(Representation::Double, TimeUnit::Seconds).unwrap();
        let span = TimeSpan::from_ticks(15_000_000);
        assert_eq!(encode_to_bson(&codec, &span).unwrap(), Bson::Double(1.5));
        assert_eq!(decode_from_bson(&codec, Bson::Double(1.5)).unwrap(), span);
        assert!(decode_from_bson(&codec, Bson::Double(f64::INFINITY)).is_err());
        assert!(decode_from_bson(&codec, Bson::Double(1e300)).is_err());
    }

    #[test]
    fn decimal_is_not_a_time_span_representation() {
        assert!(TimeSpanCodec::new(Representation::Decimal128, TimeUnit::Ticks).is_err());
    }
}
