use std::sync::Arc;

use crate::bson::BsonType;
use crate::codec::{BsonCodable, Codec, RepresentationConfigurable};
use crate::convert::{Numeric, NumericConverter};
use crate::error::{CodecError, Result};
use crate::io::{BsonReader, BsonWriter};
use crate::registry::CodecRegistry;
use crate::representation::{catalog, unsupported, CodecOptions, LogicalType, Representation};
use crate::time::{TimeOfDay, TimeUnit, TICKS_PER_DAY};

/// Times of day, as a count of [`TimeUnit`]s since midnight or as
/// `HH:mm:ss.fffffff` text.
///
/// Any of the four forms is read back regardless of the configured one.
/// Counts that land outside a single day are an `Argument` error.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TimeOfDayCodec {
    representation: Representation,
    unit: TimeUnit,
}

impl TimeOfDayCodec {
    pub fn new(representation: Representation, unit: TimeUnit) -> Result<Self> {
        Ok(TimeOfDayCodec {
            representation: catalog::resolve(LogicalType::TimeOfDay, representation)?,
            unit,
        })
    }

    pub fn unit(&self) -> TimeUnit {
        self.unit
    }

    fn from_ticks(ticks: Option<i128>) -> Result<TimeOfDay> {
        ticks
            .and_then(|ticks| i64::try_from(ticks).ok())
            .and_then(TimeOfDay::from_ticks)
            .ok_or_else(|| {
                CodecError::argument(
                    "ticks",
                    format!("ticks must be between 0 and {}", TICKS_PER_DAY - 1),
                )
            })
    }
}

impl Default for TimeOfDayCodec {
    fn default() -> Self {
        TimeOfDayCodec {
            representation: Representation::Int64,
            unit: TimeUnit::Ticks,
        }
    }
}

impl RepresentationConfigurable for TimeOfDayCodec {
    fn representation(&self) -> Representation {
        self.representation
    }

    fn with_representation(self: &Arc<Self>, representation: Representation) -> Result<Arc<Self>> {
        let representation = catalog::resolve(LogicalType::TimeOfDay, representation)?;
        if representation == self.representation {
            return Ok(Arc::clone(self));
        }
        Ok(Arc::new(TimeOfDayCodec {
            representation,
            unit: self.unit,
        }))
    }
}

impl Codec<TimeOfDay> for TimeOfDayCodec {
    fn encode(&self, writer: &mut dyn BsonWriter, value: &TimeOfDay) -> Result<()> {
        let units = || Numeric::Int(self.unit.units_in(value.ticks()));
        match self.representation {
            Representation::String => writer.write_string(&value.to_string()),
            Representation::Int32 => writer.write_int32(NumericConverter::STRICT.to_int::<i32>(units())?),
            Representation::Int64 => writer.write_int64(NumericConverter::STRICT.to_int::<i64>(units())?),
            Representation::Double => writer.write_double(self.unit.fractional_units_in(value.ticks())),
            other => Err(unsupported(LogicalType::TimeOfDay, other)),
        }
    }

    fn decode(&self, reader: &mut dyn BsonReader) -> Result<TimeOfDay> {
        match reader.current_bson_type()? {
            BsonType::String => reader.read_string()?.parse(),
            BsonType::Int32 => Self::from_ticks(self.unit.ticks_in(reader.read_int32()? as i128)),
            BsonType::Int64 => Self::from_ticks(self.unit.ticks_in(reader.read_int64()? as i128)),
            BsonType::Double => {
                let ticks = self.unit.ticks_in_fractional(reader.read_double()?);
                Self::from_ticks(ticks.map(i128::from))
            }
            other => Err(CodecError::unexpected_type("TimeOfDay", other)),
        }
    }
}

impl BsonCodable for TimeOfDay {
    type Codec = TimeOfDayCodec;

    fn build_codec(_registry: &CodecRegistry, options: &CodecOptions) -> Result<TimeOfDayCodec> {
        TimeOfDayCodec::new(options.representation, options.time_unit)
    }
}
