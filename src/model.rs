use chrono::{NaiveDate, NaiveDateTime, NaiveTime, Weekday};
use serde::{Deserialize, Serialize};
use ulid::Ulid;

/// Minutes since local midnight — the only time-of-day type.
pub type Minute = i32;

pub const MINUTES_PER_DAY: Minute = 24 * 60;

/// Half-open window `[start, end)` in minutes since local midnight.
///
/// Configured windows always lie within a single day; buffer-expanded
/// booking intervals may reach past either midnight during conflict checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub start: Minute,
    pub end: Minute,
}

impl TimeWindow {
    pub fn new(start: Minute, end: Minute) -> Self {
        debug_assert!(start < end, "TimeWindow start must be before end");
        Self { start, end }
    }

    pub fn duration_minutes(&self) -> Minute {
        self.end - self.start
    }

    pub fn overlaps(&self, other: &TimeWindow) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// Returns true if `self` fully contains `other`.
    pub fn contains(&self, other: &TimeWindow) -> bool {
        self.start <= other.start && other.end <= self.end
    }
}

pub fn minute_to_time(m: Minute) -> NaiveTime {
    NaiveTime::from_num_seconds_from_midnight_opt(m as u32 * 60, 0)
        .expect("minute within a single day")
}

pub fn time_to_minute(t: NaiveTime) -> Minute {
    use chrono::Timelike;
    (t.hour() * 60 + t.minute()) as Minute
}

/// A configured appointment offering and its booking constraints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingType {
    pub id: Ulid,
    pub name: String,
    pub duration_minutes: Minute,
    pub buffer_before_minutes: Minute,
    pub buffer_after_minutes: Minute,
    pub min_notice_hours: i64,
    pub max_advance_days: i64,
    pub max_per_day: Option<u32>,
    pub requires_confirmation: bool,
}

impl BookingType {
    pub fn initial_status(&self) -> BookingStatus {
        if self.requires_confirmation {
            BookingStatus::Pending
        } else {
            BookingStatus::Confirmed
        }
    }
}

/// One recurring weekly window of bookable time.
/// Lifecycle is deactivation, never deletion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateEntry {
    pub id: Ulid,
    /// 0 = Monday .. 6 = Sunday on the wire.
    #[serde(with = "weekday_serde")]
    pub day_of_week: Weekday,
    pub window: TimeWindow,
    pub is_active: bool,
}

/// Serde adapter for `chrono::Weekday`: serializes as 0=Monday..6=Sunday,
/// deserializes from that integer form or a day name ("sun", "Sunday").
/// chrono's own `Weekday` impl is name-only, which cannot express the
/// numeric wire format.
pub mod weekday_serde {
    use chrono::Weekday;
    use serde::de::{self, Deserializer, Visitor};
    use serde::ser::Serializer;

    pub fn serialize<S: Serializer>(day: &Weekday, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(day.num_days_from_monday() as u8)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Weekday, D::Error> {
        struct WeekdayVisitor;

        impl<'de> Visitor<'de> for WeekdayVisitor {
            type Value = Weekday;

            fn expecting(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str("a weekday number (0 = Monday) or day name")
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<Weekday, E> {
                match v {
                    0 => Ok(Weekday::Mon),
                    1 => Ok(Weekday::Tue),
                    2 => Ok(Weekday::Wed),
                    3 => Ok(Weekday::Thu),
                    4 => Ok(Weekday::Fri),
                    5 => Ok(Weekday::Sat),
                    6 => Ok(Weekday::Sun),
                    _ => Err(E::invalid_value(de::Unexpected::Unsigned(v), &self)),
                }
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<Weekday, E> {
                match u64::try_from(v) {
                    Ok(v) => self.visit_u64(v),
                    Err(_) => Err(E::invalid_value(de::Unexpected::Signed(v), &self)),
                }
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Weekday, E> {
                v.parse()
                    .map_err(|_| E::invalid_value(de::Unexpected::Str(v), &self))
            }
        }

        deserializer.deserialize_any(WeekdayVisitor)
    }
}

/// A date-specific exception. An override fully replaces the weekly
/// template for its date — it never merges with it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateOverride {
    pub date: NaiveDate,
    pub kind: OverrideKind,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OverrideKind {
    /// No slots at all on this date, regardless of the template.
    Blocked,
    /// The only bookable window on this date.
    Window(TimeWindow),
}

impl OverrideKind {
    /// Collapse the flag-plus-optional-window input shape. An "available"
    /// override without an explicit window still blocks the whole day.
    pub fn from_parts(is_available: bool, window: Option<TimeWindow>) -> Self {
        match (is_available, window) {
            (true, Some(w)) => OverrideKind::Window(w),
            _ => OverrideKind::Blocked,
        }
    }
}

/// Where a date's windows came from after override/template reconciliation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AvailabilitySource {
    Blocked,
    Template(Vec<TimeWindow>),
    Override(TimeWindow),
}

impl AvailabilitySource {
    pub fn windows(&self) -> Vec<TimeWindow> {
        match self {
            AvailabilitySource::Blocked => Vec::new(),
            AvailabilitySource::Template(windows) => windows.clone(),
            AvailabilitySource::Override(window) => vec![*window],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Cancelled,
    Completed,
    NoShow,
}

impl BookingStatus {
    /// Active bookings hold their slot; everything else frees it.
    pub fn is_active(self) -> bool {
        matches!(self, BookingStatus::Pending | BookingStatus::Confirmed)
    }

    pub fn is_terminal(self) -> bool {
        !self.is_active()
    }

    pub fn can_transition_to(self, next: BookingStatus) -> bool {
        use BookingStatus::*;
        matches!(
            (self, next),
            (Pending, Confirmed | Cancelled) | (Confirmed, Cancelled | Completed | NoShow)
        )
    }
}

impl std::fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            BookingStatus::Pending => "pending",
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::Cancelled => "cancelled",
            BookingStatus::Completed => "completed",
            BookingStatus::NoShow => "no_show",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Booking {
    pub id: Ulid,
    pub booking_type_id: Ulid,
    pub start: NaiveDateTime,
    /// Always `start + duration` of the booking type at creation time.
    pub end: NaiveDateTime,
    pub status: BookingStatus,
    pub confirmation_token: String,
}

impl Booking {
    pub fn date(&self) -> NaiveDate {
        self.start.date()
    }

    pub fn start_minute(&self) -> Minute {
        time_to_minute(self.start.time())
    }

    /// End as minutes from the booking date's midnight. May exceed
    /// `MINUTES_PER_DAY` when the appointment ends exactly at midnight.
    pub fn end_minute(&self) -> Minute {
        (self.end - self.date().and_time(NaiveTime::MIN)).num_minutes() as Minute
    }
}
