use crate::model::Minute;

/// Upper bound on `days_ahead` for date scans, regardless of booking type.
pub const MAX_SCAN_DAYS: i64 = 366;

/// A provider template larger than this is a configuration mistake.
pub const MAX_TEMPLATE_ENTRIES: usize = 64;

pub const MAX_NAME_LEN: usize = 128;
pub const MAX_REASON_LEN: usize = 256;

/// Clock-skew tolerance when matching a requested start against the
/// freshly recomputed slot set.
pub const SLOT_MATCH_TOLERANCE_SECS: i64 = 60;

/// Buffers beyond this are almost certainly a unit mix-up (hours vs minutes).
pub const MAX_BUFFER_MINUTES: Minute = 24 * 60;
