//! Wall-clock primitives for a service day that runs past midnight.
//!
//! Everything on the wire is a plain `HH:MM` string. Inside the engine a
//! wall-clock time is placed on the service day with [`ServiceClock`], which
//! turns "00:30 after a 23:00 start" into an ordinary integer comparison.

use std::fmt;
use std::str::FromStr;

use chrono::{Duration, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

pub const MINUTES_PER_DAY: u16 = 1440;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid time of day: {0:?}")]
pub struct TimeParseError(pub String);

/// Minutes since midnight, `0..1440`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimeOfDay(u16);

impl TimeOfDay {
    pub const MIDNIGHT: TimeOfDay = TimeOfDay(0);

    pub fn from_minutes(minutes: u16) -> Option<Self> {
        (minutes < MINUTES_PER_DAY).then_some(Self(minutes))
    }

    pub fn hm(hour: u16, minute: u16) -> Option<Self> {
        if hour >= 24 || minute >= 60 {
            return None;
        }
        Some(Self(hour * 60 + minute))
    }

    /// Wraps any minute count onto the 24-hour dial.
    pub(crate) fn wrapping(minutes: u32) -> Self {
        Self((minutes % MINUTES_PER_DAY as u32) as u16)
    }

    pub fn minutes(self) -> u16 {
        self.0
    }

    pub fn hour(self) -> u16 {
        self.0 / 60
    }

    pub fn minute(self) -> u16 {
        self.0 % 60
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour(), self.minute())
    }
}

/// Accepts `HH:MM` and `HH:MM:SS`; seconds are dropped.
impl FromStr for TimeOfDay {
    type Err = TimeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || TimeParseError(s.to_string());
        let mut parts = s.trim().split(':');
        let hour = parts.next().ok_or_else(err)?;
        let minute = parts.next().ok_or_else(err)?;
        if let Some(seconds) = parts.next() {
            if seconds.len() != 2 || seconds.parse::<u8>().map_or(true, |s| s >= 60) {
                return Err(err());
            }
        }
        if parts.next().is_some() || hour.len() != 2 || minute.len() != 2 {
            return Err(err());
        }
        let hour: u16 = hour.parse().map_err(|_| err())?;
        let minute: u16 = minute.parse().map_err(|_| err())?;
        TimeOfDay::hm(hour, minute).ok_or_else(err)
    }
}

impl Serialize for TimeOfDay {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for TimeOfDay {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// One bookable interval. `end < start` means the slot crosses midnight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Slot {
    pub start: TimeOfDay,
    pub end: TimeOfDay,
}

impl Slot {
    pub fn new(start: TimeOfDay, end: TimeOfDay) -> Option<Self> {
        (start != end).then_some(Self { start, end })
    }

    pub fn crosses_midnight(&self) -> bool {
        self.end < self.start
    }

    pub fn span(&self, clock: ServiceClock) -> ServiceSpan {
        clock.span(self.start, self.end)
    }
}

/// A wall-clock time placed on a service day: `(day_offset, minute_of_day)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ServiceTime {
    pub day_offset: u8,
    pub minute: TimeOfDay,
}

impl ServiceTime {
    pub fn absolute(self) -> u32 {
        self.day_offset as u32 * MINUTES_PER_DAY as u32 + self.minute.minutes() as u32
    }

    fn next_day(self) -> Self {
        Self {
            day_offset: self.day_offset + 1,
            minute: self.minute,
        }
    }
}

/// Half-open `[start, end)` in absolute service-day minutes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ServiceSpan {
    pub start: u32,
    pub end: u32,
}

impl ServiceSpan {
    pub fn duration_minutes(&self) -> u32 {
        self.end - self.start
    }
}

/// Places wall-clock times on a service day.
///
/// Times strictly before `rollover` belong to the next calendar day. For a
/// window such as 15:30 → 05:00 the rollover is 05:00, so 00:30 sorts after
/// 23:00 while 13:00 stays on the booking date. A window that does not wrap
/// uses midnight, which leaves every time on day zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServiceClock {
    rollover: TimeOfDay,
}

impl ServiceClock {
    pub fn new(rollover: TimeOfDay) -> Self {
        Self { rollover }
    }

    pub fn for_window(start: TimeOfDay, end: TimeOfDay) -> Self {
        if end < start {
            Self::new(end)
        } else {
            Self::new(TimeOfDay::MIDNIGHT)
        }
    }

    pub fn rollover(&self) -> TimeOfDay {
        self.rollover
    }

    pub fn locate(&self, time: TimeOfDay) -> ServiceTime {
        ServiceTime {
            day_offset: u8::from(time < self.rollover),
            minute: time,
        }
    }

    /// An end that does not land after the start is read as the following day.
    pub fn span(&self, start: TimeOfDay, end: TimeOfDay) -> ServiceSpan {
        let start = self.locate(start);
        let mut end = self.locate(end);
        if end.absolute() <= start.absolute() {
            end = end.next_day();
        }
        ServiceSpan {
            start: start.absolute(),
            end: end.absolute(),
        }
    }

    /// Strict placement for a requested range: an end at or before the
    /// rollover lands on the next day, any other end stays on day zero.
    /// `None` when the placed end is not after the placed start.
    pub fn checked_span(&self, start: TimeOfDay, end: TimeOfDay) -> Option<ServiceSpan> {
        let start = self.locate(start).absolute();
        let end = ServiceTime {
            day_offset: u8::from(end <= self.rollover),
            minute: end,
        }
        .absolute();
        (end > start).then_some(ServiceSpan { start, end })
    }

    /// Calendar moment at which `time` happens for a booking dated `date`.
    pub fn instant(&self, date: NaiveDate, time: TimeOfDay) -> NaiveDateTime {
        let located = self.locate(time);
        let wall = NaiveTime::MIN + Duration::minutes(time.minutes() as i64);
        date.and_time(wall) + Duration::days(located.day_offset as i64)
    }
}

/// Venue-local wall clock. All stored times are local to the venue.
#[derive(Debug, Clone, Copy)]
pub struct VenueTime {
    offset: FixedOffset,
}

impl VenueTime {
    pub fn new(offset: FixedOffset) -> Self {
        Self { offset }
    }

    pub fn now(&self) -> NaiveDateTime {
        Utc::now().with_timezone(&self.offset).naive_local()
    }

    pub fn today(&self) -> NaiveDate {
        self.now().date()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(s: &str) -> TimeOfDay {
        s.parse().unwrap()
    }

    #[test]
    fn parses_and_formats_zero_padded() {
        assert_eq!(t("05:00").minutes(), 300);
        assert_eq!(t("23:59").to_string(), "23:59");
        assert_eq!(TimeOfDay::hm(0, 30).unwrap().to_string(), "00:30");
    }

    #[test]
    fn seconds_are_truncated() {
        assert_eq!(t("17:30:45"), t("17:30"));
        assert_eq!(t("00:00:00"), TimeOfDay::MIDNIGHT);
    }

    #[test]
    fn rejects_malformed_times() {
        for bad in ["", "7:30", "24:00", "12:60", "12", "12:30:99", "ab:cd", "12:30:00:00"] {
            assert!(bad.parse::<TimeOfDay>().is_err(), "{bad} should not parse");
        }
    }

    #[test]
    fn slot_serializes_as_hh_mm_pair() {
        let slot = Slot::new(t("23:00"), t("00:30")).unwrap();
        let json = serde_json::to_value(slot).unwrap();
        assert_eq!(json, serde_json::json!({ "start": "23:00", "end": "00:30" }));

        let back: Slot = serde_json::from_str(r#"{"start":"23:00:00","end":"00:30"}"#).unwrap();
        assert_eq!(back, slot);
        assert!(back.crosses_midnight());
    }

    #[test]
    fn slot_requires_distinct_bounds() {
        assert!(Slot::new(t("10:00"), t("10:00")).is_none());
    }

    #[test]
    fn clock_places_early_hours_on_next_day() {
        let clock = ServiceClock::for_window(t("15:30"), t("05:00"));
        assert_eq!(clock.locate(t("23:00")).day_offset, 0);
        assert_eq!(clock.locate(t("00:30")).day_offset, 1);
        assert_eq!(clock.locate(t("04:59")).day_offset, 1);
        assert_eq!(clock.locate(t("13:00")).day_offset, 0);
        assert!(clock.locate(t("00:30")) > clock.locate(t("23:00")));
    }

    #[test]
    fn span_across_midnight_is_contiguous() {
        let clock = ServiceClock::for_window(t("15:30"), t("05:00"));
        let span = clock.span(t("23:00"), t("00:30"));
        assert_eq!(span.start, 23 * 60);
        assert_eq!(span.end, 1440 + 30);
        assert_eq!(span.duration_minutes(), 90);

        let last = clock.span(t("03:30"), t("05:00"));
        assert_eq!(last.start, 1440 + 210);
        assert_eq!(last.end, 1440 + 300);
    }

    #[test]
    fn checked_span_refuses_inverted_ranges() {
        let clock = ServiceClock::for_window(t("15:30"), t("05:00"));
        assert_eq!(
            clock.checked_span(t("23:00"), t("00:30")),
            Some(ServiceSpan { start: 1380, end: 1470 })
        );
        assert_eq!(
            clock.checked_span(t("03:30"), t("05:00")),
            Some(ServiceSpan { start: 1650, end: 1740 })
        );
        assert!(clock.checked_span(t("13:00"), t("16:00")).is_some());

        assert_eq!(clock.checked_span(t("17:00"), t("16:00")), None);
        assert_eq!(clock.checked_span(t("04:00"), t("06:00")), None);
        assert_eq!(clock.checked_span(t("03:00"), t("03:00")), None);
    }

    #[test]
    fn checked_span_on_daytime_clock() {
        let clock = ServiceClock::for_window(t("08:00"), t("20:00"));
        assert!(clock.checked_span(t("08:00"), t("09:30")).is_some());
        assert!(clock.checked_span(t("22:00"), t("00:00")).is_some());
        assert_eq!(clock.checked_span(t("09:30"), t("08:00")), None);
    }

    #[test]
    fn non_wrapping_window_keeps_everything_on_day_zero() {
        let clock = ServiceClock::for_window(t("08:00"), t("20:00"));
        assert_eq!(clock.rollover(), TimeOfDay::MIDNIGHT);
        assert_eq!(clock.span(t("08:00"), t("09:30")), ServiceSpan { start: 480, end: 570 });
    }

    #[test]
    fn instant_rolls_after_midnight_starts_to_next_date() {
        let clock = ServiceClock::for_window(t("15:30"), t("05:00"));
        let date = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap();
        assert_eq!(
            clock.instant(date, t("02:00")).to_string(),
            "2025-06-02 02:00:00"
        );
        assert_eq!(
            clock.instant(date, t("17:00")).to_string(),
            "2025-06-01 17:00:00"
        );
    }
}
