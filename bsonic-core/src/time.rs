//! Tick-based temporal values: 100 nanosecond ticks counted from 0001-01-01T00:00:00.

use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Timelike};
use serde::{Deserialize, Serialize};

use crate::error::CodecError;

pub const TICKS_PER_MILLISECOND: i64 = 10_000;
pub const TICKS_PER_SECOND: i64 = 10_000_000;
pub const TICKS_PER_MINUTE: i64 = 600_000_000;
pub const TICKS_PER_HOUR: i64 = 36_000_000_000;
pub const TICKS_PER_DAY: i64 = 864_000_000_000;
const NANOS_PER_TICK: i64 = 100;

const MAX_TICKS: i64 = 3_155_378_975_999_999_999;
const UNIX_EPOCH_TICKS: i64 = 621_355_968_000_000_000;
const MAX_MILLIS_SINCE_EPOCH: i64 = (MAX_TICKS - UNIX_EPOCH_TICKS) / TICKS_PER_MILLISECOND;

/// How a [`DateTime`]'s ticks relate to UTC.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DateTimeKind {
    #[default]
    Utc,
    Local,
    Unspecified,
}

/// A calendar instant between 0001-01-01 and 9999-12-31T23:59:59.9999999.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DateTime {
    ticks: i64,
    kind: DateTimeKind,
}

impl DateTime {
    pub const MIN: DateTime = DateTime {
        ticks: 0,
        kind: DateTimeKind::Unspecified,
    };
    pub const MAX: DateTime = DateTime {
        ticks: MAX_TICKS,
        kind: DateTimeKind::Unspecified,
    };
    pub const UNIX_EPOCH: DateTime = DateTime {
        ticks: UNIX_EPOCH_TICKS,
        kind: DateTimeKind::Utc,
    };

    pub fn from_ticks(ticks: i64, kind: DateTimeKind) -> Option<Self> {
        (0..=MAX_TICKS)
            .contains(&ticks)
            .then_some(DateTime { ticks, kind })
    }

    pub fn from_ymd_hms(
        year: i32,
        month: u32,
        day: u32,
        hour: u32,
        minute: u32,
        second: u32,
        kind: DateTimeKind,
    ) -> Option<Self> {
        if hour > 23 || minute > 59 || second > 59 {
            return None;
        }
        let date = Self::from_date(year, month, day, kind)?;
        date.add_ticks(
            hour as i64 * TICKS_PER_HOUR
                + minute as i64 * TICKS_PER_MINUTE
                + second as i64 * TICKS_PER_SECOND,
        )
    }

    /// Midnight at the start of the given calendar day.
    pub fn from_date(year: i32, month: u32, day: u32, kind: DateTimeKind) -> Option<Self> {
        let date = NaiveDate::from_ymd_opt(year, month, day)?;
        let days = date.num_days_from_ce() as i64 - 1;
        Self::from_ticks(days.checked_mul(TICKS_PER_DAY)?, kind)
    }

    /// Interprets milliseconds since the Unix epoch as a UTC instant.
    ///
    /// The millisecond value of [`DateTime::MAX`] maps back to `MAX` itself.
    pub fn from_millis_since_epoch(millis: i64) -> Option<Self> {
        if millis == MAX_MILLIS_SINCE_EPOCH {
            return Some(DateTime::MAX.specify_kind(DateTimeKind::Utc));
        }
        let ticks = millis
            .checked_mul(TICKS_PER_MILLISECOND)?
            .checked_add(UNIX_EPOCH_TICKS)?;
        Self::from_ticks(ticks, DateTimeKind::Utc)
    }

    pub fn ticks(&self) -> i64 {
        self.ticks
    }

    pub fn kind(&self) -> DateTimeKind {
        self.kind
    }

    /// Same ticks, different kind.
    pub fn specify_kind(&self, kind: DateTimeKind) -> Self {
        DateTime {
            ticks: self.ticks,
            kind,
        }
    }

    pub fn add_ticks(&self, ticks: i64) -> Option<Self> {
        Self::from_ticks(self.ticks.checked_add(ticks)?, self.kind)
    }

    /// Whole milliseconds since the Unix epoch, truncated toward zero.
    pub fn millis_since_epoch(&self) -> i64 {
        (self.ticks - UNIX_EPOCH_TICKS) / TICKS_PER_MILLISECOND
    }

    pub fn is_min_or_max(&self) -> bool {
        self.ticks == 0 || self.ticks == MAX_TICKS
    }

    pub fn time_of_day_ticks(&self) -> i64 {
        self.ticks % TICKS_PER_DAY
    }

    /// Midnight of the same day.
    pub fn date(&self) -> Self {
        DateTime {
            ticks: self.ticks - self.time_of_day_ticks(),
            kind: self.kind,
        }
    }

    /// Calendar year, month and day.
    pub fn ymd(&self) -> (i32, u32, u32) {
        let days = (self.ticks / TICKS_PER_DAY) as i32;
        match NaiveDate::from_num_days_from_ce_opt(days + 1) {
            Some(date) => (date.year(), date.month(), date.day()),
            None => (1, 1, 1),
        }
    }

    /// Converts to UTC. Local and unspecified values are read as local time.
    pub fn to_universal(&self) -> Self {
        if self.is_min_or_max() {
            return self.specify_kind(DateTimeKind::Utc);
        }
        match self.kind {
            DateTimeKind::Utc => *self,
            DateTimeKind::Local | DateTimeKind::Unspecified => {
                let offset = local_offset_at_local(self.ticks);
                clamped(self.ticks - offset, DateTimeKind::Utc)
            }
        }
    }

    /// Converts to local time. Unspecified values are read as UTC.
    pub fn to_local(&self) -> Self {
        if self.is_min_or_max() {
            return self.specify_kind(DateTimeKind::Local);
        }
        match self.kind {
            DateTimeKind::Local => *self,
            DateTimeKind::Utc | DateTimeKind::Unspecified => {
                let offset = local_offset_at_utc(self.ticks);
                clamped(self.ticks + offset, DateTimeKind::Local)
            }
        }
    }

    /// UTC offset in ticks that applies to this value when written out.
    pub(crate) fn offset_ticks(&self) -> i64 {
        match self.kind {
            DateTimeKind::Utc | DateTimeKind::Unspecified => 0,
            DateTimeKind::Local => local_offset_at_local(self.ticks),
        }
    }
}

fn clamped(ticks: i64, kind: DateTimeKind) -> DateTime {
    DateTime {
        ticks: ticks.clamp(0, MAX_TICKS),
        kind,
    }
}

fn naive(ticks: i64) -> Option<NaiveDateTime> {
    let days = (ticks / TICKS_PER_DAY) as i32;
    let rem = ticks % TICKS_PER_DAY;
    let date = NaiveDate::from_num_days_from_ce_opt(days + 1)?;
    let secs = (rem / TICKS_PER_SECOND) as u32;
    let nanos = ((rem % TICKS_PER_SECOND) * 100) as u32;
    date.and_hms_nano_opt(secs / 3600, secs / 60 % 60, secs % 60, nanos)
}

fn local_offset_at_utc(utc_ticks: i64) -> i64 {
    naive(utc_ticks)
        .map(|utc| chrono::Local.offset_from_utc_datetime(&utc).local_minus_utc() as i64)
        .unwrap_or(0)
        * TICKS_PER_SECOND
}

fn local_offset_at_local(local_ticks: i64) -> i64 {
    let Some(local) = naive(local_ticks) else {
        return 0;
    };
    let seconds = match chrono::Local.offset_from_local_datetime(&local).earliest() {
        Some(offset) => offset.local_minus_utc(),
        // inside a daylight-saving gap
        None => chrono::Local.offset_from_utc_datetime(&local).local_minus_utc(),
    };
    seconds as i64 * TICKS_PER_SECOND
}

/// Unit an integer or floating time span is counted in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeUnit {
    #[default]
    Ticks,
    Nanoseconds,
    Microseconds,
    Milliseconds,
    Seconds,
    Minutes,
    Hours,
    Days,
}

impl TimeUnit {
    /// Ticks in one unit. Nanoseconds are a hundredth of a tick and report `None`.
    pub fn ticks_per_unit(self) -> Option<i64> {
        match self {
            TimeUnit::Ticks => Some(1),
            TimeUnit::Nanoseconds => None,
            TimeUnit::Microseconds => Some(10),
            TimeUnit::Milliseconds => Some(TICKS_PER_MILLISECOND),
            TimeUnit::Seconds => Some(TICKS_PER_SECOND),
            TimeUnit::Minutes => Some(TICKS_PER_MINUTE),
            TimeUnit::Hours => Some(TICKS_PER_HOUR),
            TimeUnit::Days => Some(TICKS_PER_DAY),
        }
    }

    /// Whole units in `ticks`, truncated toward zero.
    pub(crate) fn units_in(self, ticks: i64) -> i128 {
        match self.ticks_per_unit() {
            Some(per_unit) => ticks as i128 / per_unit as i128,
            None => ticks as i128 * NANOS_PER_TICK as i128,
        }
    }

    /// Ticks in `units`; nanoseconds truncate to the tick.
    pub(crate) fn ticks_in(self, units: i128) -> Option<i128> {
        match self.ticks_per_unit() {
            Some(per_unit) => units.checked_mul(per_unit as i128),
            None => Some(units / NANOS_PER_TICK as i128),
        }
    }

    pub(crate) fn fractional_units_in(self, ticks: i64) -> f64 {
        match self.ticks_per_unit() {
            Some(per_unit) => ticks as f64 / per_unit as f64,
            None => ticks as f64 * NANOS_PER_TICK as f64,
        }
    }

    /// Ticks in a fractional count, rounded to the nearest tick. `None` when
    /// the result is not finite or does not fit an `i64`.
    pub(crate) fn ticks_in_fractional(self, units: f64) -> Option<i64> {
        let ticks = match self.ticks_per_unit() {
            Some(per_unit) => units * per_unit as f64,
            None => units / NANOS_PER_TICK as f64,
        }
        .round();
        // i64::MAX as f64 rounds up to 2^63, which is already out of range
        if !ticks.is_finite() || ticks < i64::MIN as f64 || ticks >= i64::MAX as f64 {
            return None;
        }
        Some(ticks as i64)
    }
}

/// A signed duration in ticks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimeSpan {
    ticks: i64,
}

impl TimeSpan {
    pub const ZERO: TimeSpan = TimeSpan { ticks: 0 };
    pub const MIN: TimeSpan = TimeSpan { ticks: i64::MIN };
    pub const MAX: TimeSpan = TimeSpan { ticks: i64::MAX };

    pub const fn from_ticks(ticks: i64) -> Self {
        TimeSpan { ticks }
    }

    pub fn from_parts(days: i64, hours: i64, minutes: i64, seconds: i64) -> Option<Self> {
        let ticks = days
            .checked_mul(TICKS_PER_DAY)?
            .checked_add(hours.checked_mul(TICKS_PER_HOUR)?)?
            .checked_add(minutes.checked_mul(TICKS_PER_MINUTE)?)?
            .checked_add(seconds.checked_mul(TICKS_PER_SECOND)?)?;
        Some(TimeSpan { ticks })
    }

    pub fn ticks(&self) -> i64 {
        self.ticks
    }
}

impl fmt::Display for TimeSpan {
    /// Constant format: `[-][d.]hh:mm:ss[.fffffff]`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let magnitude = self.ticks.unsigned_abs();
        let day = TICKS_PER_DAY as u64;
        let days = magnitude / day;
        let rem = magnitude % day;
        let hours = rem / TICKS_PER_HOUR as u64;
        let minutes = rem / TICKS_PER_MINUTE as u64 % 60;
        let seconds = rem / TICKS_PER_SECOND as u64 % 60;
        let fraction = rem % TICKS_PER_SECOND as u64;

        if self.ticks < 0 {
            f.write_str("-")?;
        }
        if days > 0 {
            write!(f, "{days}.")?;
        }
        write!(f, "{hours:02}:{minutes:02}:{seconds:02}")?;
        if fraction > 0 {
            write!(f, ".{fraction:07}")?;
        }
        Ok(())
    }
}

impl FromStr for TimeSpan {
    type Err = CodecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || CodecError::format(format!("'{s}' is not a valid TimeSpan"));

        let (negative, body) = match s.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, s),
        };
        let (clock, fraction) = match body.split_once('.') {
            // "d.hh:mm:ss" puts the day before the first dot
            Some((head, tail)) if !head.contains(':') => match tail.split_once('.') {
                Some((clock, fraction)) => (format!("{head}.{clock}"), Some(fraction)),
                None => (format!("{head}.{tail}"), None),
            },
            Some((clock, fraction)) => (clock.to_string(), Some(fraction)),
            None => (body.to_string(), None),
        };
        let (days, hms) = match clock.split_once('.') {
            Some((days, hms)) => (days.parse::<u64>().map_err(|_| invalid())?, hms.to_string()),
            None => (0, clock),
        };
        let fields: Vec<&str> = hms.split(':').collect();
        let [h, m, sec] = fields.as_slice() else {
            return Err(invalid());
        };
        let parse = |v: &str, max: u64| -> Result<u64, CodecError> {
            if v.is_empty() || v.len() > 2 {
                return Err(invalid());
            }
            let n: u64 = v.parse().map_err(|_| invalid())?;
            if n > max {
                return Err(invalid());
            }
            Ok(n)
        };
        let (h, m, sec) = (parse(h, 23)?, parse(m, 59)?, parse(sec, 59)?);
        let fraction_ticks = match fraction {
            Some(digits) if !digits.is_empty() && digits.len() <= 7 => {
                let n: u64 = digits.parse().map_err(|_| invalid())?;
                n * 10u64.pow(7 - digits.len() as u32)
            }
            Some(_) => return Err(invalid()),
            None => 0,
        };

        let magnitude = (days as u128) * TICKS_PER_DAY as u128
            + (h as u128) * TICKS_PER_HOUR as u128
            + (m as u128) * TICKS_PER_MINUTE as u128
            + (sec as u128) * TICKS_PER_SECOND as u128
            + fraction_ticks as u128;
        let ticks = if negative {
            0i64.checked_sub_unsigned(u64::try_from(magnitude).map_err(|_| overflow(s))?)
        } else {
            i64::try_from(magnitude).ok()
        };
        ticks
            .map(TimeSpan::from_ticks)
            .ok_or_else(|| overflow(s))
    }
}

/// A wall-clock time in ticks since midnight, `00:00:00` through `23:59:59.9999999`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimeOfDay {
    ticks: i64,
}

impl TimeOfDay {
    pub const MIDNIGHT: TimeOfDay = TimeOfDay { ticks: 0 };
    pub const MAX: TimeOfDay = TimeOfDay {
        ticks: TICKS_PER_DAY - 1,
    };

    pub fn from_ticks(ticks: i64) -> Option<Self> {
        (0..TICKS_PER_DAY)
            .contains(&ticks)
            .then_some(TimeOfDay { ticks })
    }

    pub fn from_hms(hour: u32, minute: u32, second: u32) -> Option<Self> {
        if minute > 59 || second > 59 {
            return None;
        }
        let ticks = hour as i64 * TICKS_PER_HOUR
            + minute as i64 * TICKS_PER_MINUTE
            + second as i64 * TICKS_PER_SECOND;
        TimeOfDay::from_ticks(ticks)
    }

    pub fn ticks(&self) -> i64 {
        self.ticks
    }
}

impl From<NaiveTime> for TimeOfDay {
    fn from(time: NaiveTime) -> Self {
        // a leap second reports a nanosecond count past one billion
        let nanos = time.nanosecond().min(999_999_999) as i64;
        TimeOfDay {
            ticks: time.num_seconds_from_midnight() as i64 * TICKS_PER_SECOND + nanos / NANOS_PER_TICK,
        }
    }
}

impl fmt::Display for TimeOfDay {
    /// Always `HH:mm:ss.fffffff`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let hours = self.ticks / TICKS_PER_HOUR;
        let minutes = self.ticks / TICKS_PER_MINUTE % 60;
        let seconds = self.ticks / TICKS_PER_SECOND % 60;
        let fraction = self.ticks % TICKS_PER_SECOND;
        write!(f, "{hours:02}:{minutes:02}:{seconds:02}.{fraction:07}")
    }
}

impl FromStr for TimeOfDay {
    type Err = CodecError;

    /// Accepts `HH:mm:ss` with an optional fraction of up to seven digits.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || CodecError::format(format!("'{s}' is not a valid time of day"));
        let hours = s.split(':').next().unwrap_or_default();
        if s.starts_with('-') || hours.contains('.') {
            return Err(invalid());
        }
        let span: TimeSpan = s.parse().map_err(|_| invalid())?;
        TimeOfDay::from_ticks(span.ticks()).ok_or_else(invalid)
    }
}

fn overflow(s: &str) -> CodecError {
    CodecError::overflow(format!("'{s}' is outside the TimeSpan range"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn min_and_max_bound_the_tick_range() {
        assert!(DateTime::from_ticks(-1, DateTimeKind::Utc).is_none());
        assert!(DateTime::from_ticks(MAX_TICKS + 1, DateTimeKind::Utc).is_none());
        assert_eq!(DateTime::MAX.ymd(), (9999, 12, 31));
        assert_eq!(DateTime::MIN.ymd(), (1, 1, 1));
    }

    #[test]
    fn unix_epoch_matches_calendar() {
        let epoch = DateTime::from_ymd_hms(1970, 1, 1, 0, 0, 0, DateTimeKind::Utc).unwrap();
        assert_eq!(epoch, DateTime::UNIX_EPOCH);
        assert_eq!(epoch.millis_since_epoch(), 0);
    }

    #[test]
    fn max_value_survives_millisecond_round_trip() {
        let ms = DateTime::MAX.millis_since_epoch();
        let back = DateTime::from_millis_since_epoch(ms).unwrap();
        assert_eq!(back.ticks(), DateTime::MAX.ticks());
        assert_eq!(back.kind(), DateTimeKind::Utc);
        assert!(DateTime::from_millis_since_epoch(ms + 1).is_none());
    }

    #[test]
    fn utc_conversion_is_identity_for_utc() {
        let dt = DateTime::from_ymd_hms(2020, 2, 29, 12, 30, 0, DateTimeKind::Utc).unwrap();
        assert_eq!(dt.to_universal(), dt);
        assert_eq!(dt.to_local().to_universal(), dt);
    }

    #[test]
    fn date_drops_time_of_day() {
        let dt = DateTime::from_ymd_hms(2011, 3, 4, 5, 6, 7, DateTimeKind::Utc).unwrap();
        assert_eq!(
            dt.date(),
            DateTime::from_date(2011, 3, 4, DateTimeKind::Utc).unwrap()
        );
        assert_eq!(dt.date().time_of_day_ticks(), 0);
    }

    #[test]
    fn time_span_constant_format() {
        let span = TimeSpan::from_ticks(
            TICKS_PER_DAY + 2 * TICKS_PER_HOUR + 3 * TICKS_PER_MINUTE + 4 * TICKS_PER_SECOND + 5_000_000,
        );
        assert_eq!(span.to_string(), "1.02:03:04.5000000");
        assert_eq!("1.02:03:04.5000000".parse::<TimeSpan>().unwrap(), span);
        assert_eq!(TimeSpan::ZERO.to_string(), "00:00:00");
        assert_eq!(TimeSpan::from_ticks(-1).to_string(), "-00:00:00.0000001");
        assert_eq!("-00:00:00.0000001".parse::<TimeSpan>().unwrap().ticks(), -1);
    }

    #[test]
    fn time_span_extremes_round_trip_through_text() {
        for span in [TimeSpan::MIN, TimeSpan::MAX] {
            assert_eq!(span.to_string().parse::<TimeSpan>().unwrap(), span);
        }
    }

    #[test]
    fn time_of_day_text_always_carries_seven_digits() {
        let time = TimeOfDay::from_ticks(307_255_946_583).unwrap();
        assert_eq!(time.to_string(), "08:32:05.5946583");
        assert_eq!(TimeOfDay::MIDNIGHT.to_string(), "00:00:00.0000000");
        assert_eq!(TimeOfDay::MAX.to_string(), "23:59:59.9999999");
        assert_eq!("08:32:05.5946583".parse::<TimeOfDay>().unwrap(), time);
        assert_eq!("14:00:00".parse::<TimeOfDay>().unwrap(), TimeOfDay::from_hms(14, 0, 0).unwrap());
        for bad in ["-00:00:01", "1.00:00:00", "24:00:00", "12:00", "noon"] {
            assert!(bad.parse::<TimeOfDay>().is_err(), "{bad}");
        }
    }

    #[test]
    fn time_of_day_is_bounded_by_one_day() {
        assert!(TimeOfDay::from_ticks(-1).is_none());
        assert!(TimeOfDay::from_ticks(TICKS_PER_DAY).is_none());
        assert_eq!(TimeOfDay::from_ticks(TICKS_PER_DAY - 1), Some(TimeOfDay::MAX));
        assert!(TimeOfDay::from_hms(24, 0, 0).is_none());
        assert!(TimeOfDay::from_hms(10, 60, 0).is_none());
    }

    #[test]
    fn time_of_day_from_chrono() {
        let time = NaiveTime::from_hms_nano_opt(13, 24, 53, 123_456_789).unwrap();
        let converted = TimeOfDay::from(time);
        assert_eq!(converted.to_string(), "13:24:53.1234567");
    }

    #[test]
    fn unit_counts_truncate_and_fractions_round() {
        assert_eq!(TimeUnit::Minutes.units_in(TICKS_PER_HOUR * 2 + TICKS_PER_MINUTE * 25 + TICKS_PER_SECOND * 30), 145);
        assert_eq!(TimeUnit::Nanoseconds.units_in(3), 300);
        assert_eq!(TimeUnit::Nanoseconds.ticks_in(870_000_099), Some(8_700_000));
        assert_eq!(TimeUnit::Hours.ticks_in_fractional(15.54), Some(559_440_000_000));
        assert_eq!(TimeUnit::Days.ticks_in(i128::MAX), None);
        assert_eq!(TimeUnit::Ticks.ticks_in_fractional(f64::NAN), None);
    }

    #[test]
    fn time_span_rejects_bad_text() {
        for bad in ["", "1:2", "25:00:00", "00:60:00", "00:00:00.12345678", "x.00:00:00"] {
            assert!(bad.parse::<TimeSpan>().is_err(), "{bad}");
        }
    }
}
