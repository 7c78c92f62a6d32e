use chrono::{Duration, NaiveDateTime};

use crate::model::Booking;

/// Self-service cancel/reschedule must happen at least this long before start.
pub const MODIFICATION_NOTICE_HOURS: i64 = 24;

/// Pure policy-window check. Callers additionally forbid the operation on
/// terminal statuses; that is a state-machine rule, not a policy rule.
pub fn can_cancel(booking: &Booking, now: NaiveDateTime, hours_notice: i64) -> bool {
    booking.start - now >= Duration::hours(hours_notice)
}

/// Rescheduling is gated by the same notice threshold as cancellation.
pub fn can_reschedule(booking: &Booking, now: NaiveDateTime, hours_notice: i64) -> bool {
    can_cancel(booking, now, hours_notice)
}
