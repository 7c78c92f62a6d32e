use chrono::{Duration, NaiveDate, NaiveDateTime};
use ulid::Ulid;

use crate::limits::*;
use crate::model::*;

use super::SchedulingError;

pub(crate) fn now_local() -> NaiveDateTime {
    chrono::Local::now().naive_local()
}

pub(crate) fn validate_window(window: &TimeWindow) -> Result<(), SchedulingError> {
    if window.start < 0 || window.end > MINUTES_PER_DAY || window.start >= window.end {
        return Err(SchedulingError::InvalidWindow {
            start: window.start,
            end: window.end,
        });
    }
    Ok(())
}

pub(crate) fn validate_booking_type(bt: &BookingType) -> Result<(), SchedulingError> {
    if bt.name.is_empty() || bt.name.len() > MAX_NAME_LEN {
        return Err(SchedulingError::InvalidConfig("booking type name length"));
    }
    if bt.duration_minutes <= 0 || bt.duration_minutes > MINUTES_PER_DAY {
        return Err(SchedulingError::InvalidConfig("duration out of range"));
    }
    if bt.buffer_before_minutes < 0 || bt.buffer_before_minutes > MAX_BUFFER_MINUTES {
        return Err(SchedulingError::InvalidConfig("buffer_before out of range"));
    }
    if bt.buffer_after_minutes < 0 || bt.buffer_after_minutes > MAX_BUFFER_MINUTES {
        return Err(SchedulingError::InvalidConfig("buffer_after out of range"));
    }
    if bt.min_notice_hours < 0 {
        return Err(SchedulingError::InvalidConfig("negative min_notice_hours"));
    }
    if bt.max_advance_days <= 0 {
        return Err(SchedulingError::InvalidConfig("max_advance_days must be positive"));
    }
    if bt.max_per_day == Some(0) {
        return Err(SchedulingError::InvalidConfig("max_per_day must be positive"));
    }
    Ok(())
}

// ── Notice Window Guard ───────────────────────────────────────────

/// Date-level tier: the whole day is out of range. Same-day candidates
/// that are too soon are handled separately by `drop_below_notice`.
pub fn date_in_horizon(date: NaiveDate, now: NaiveDateTime, bt: &BookingType) -> bool {
    let earliest = now + Duration::hours(bt.min_notice_hours);
    date >= earliest.date() && date <= now.date() + Duration::days(bt.max_advance_days)
}

/// Per-slot tier: drop candidates whose start lands before `earliest`
/// (`now + min_notice_hours`). A no-op for dates past the notice boundary.
pub fn drop_below_notice(date: NaiveDate, candidates: Vec<Minute>, earliest: NaiveDateTime) -> Vec<Minute> {
    candidates
        .into_iter()
        .filter(|&m| date.and_time(minute_to_time(m)) >= earliest)
        .collect()
}

// ── Capacity Guard ────────────────────────────────────────────────

/// Day-level cutoff, not a per-slot filter: once the active-booking count
/// reaches the cap, the entire day is closed.
pub fn day_at_capacity(bookings: &[Booking], max_per_day: Option<u32>) -> bool {
    let Some(cap) = max_per_day else {
        return false;
    };
    let active = bookings.iter().filter(|b| b.status.is_active()).count();
    active as u32 >= cap
}

// ── Conflict Filter ───────────────────────────────────────────────

/// Drop candidates whose `[candidate, candidate + duration)` interval
/// overlaps any active booking's buffer-expanded interval
/// `[start − buffer_before, end + buffer_after]`.
///
/// Asymmetric on purpose: the candidate's own buffers are not applied here,
/// because its trailing buffer is already baked into the generator's
/// spacing, and its leading buffer is the existing booking's concern.
pub fn drop_conflicts(
    date: NaiveDate,
    candidates: Vec<Minute>,
    bt: &BookingType,
    bookings: &[Booking],
    exclude: Option<Ulid>,
) -> Vec<Minute> {
    let expanded: Vec<TimeWindow> = bookings
        .iter()
        .filter(|b| b.status.is_active() && b.date() == date && Some(b.id) != exclude)
        .map(|b| {
            TimeWindow::new(
                b.start_minute() - bt.buffer_before_minutes,
                b.end_minute() + bt.buffer_after_minutes,
            )
        })
        .collect();

    candidates
        .into_iter()
        .filter(|&m| {
            let own = TimeWindow::new(m, m + bt.duration_minutes);
            !expanded.iter().any(|e| own.overlaps(e))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn booking_type(duration: Minute, before: Minute, after: Minute) -> BookingType {
        BookingType {
            id: Ulid::new(),
            name: "consultation".into(),
            duration_minutes: duration,
            buffer_before_minutes: before,
            buffer_after_minutes: after,
            min_notice_hours: 2,
            max_advance_days: 14,
            max_per_day: None,
            requires_confirmation: false,
        }
    }

    fn booking_on(date: NaiveDate, start: Minute, end: Minute, status: BookingStatus) -> Booking {
        Booking {
            id: Ulid::new(),
            booking_type_id: Ulid::new(),
            start: date.and_time(minute_to_time(start)),
            end: date.and_time(minute_to_time(end)),
            status,
            confirmation_token: Ulid::new().to_string(),
        }
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, 2).unwrap()
    }

    // ── validation ───────────────────────────────────────

    #[test]
    fn rejects_inverted_window() {
        let err = validate_window(&TimeWindow { start: 600, end: 540 }).unwrap_err();
        assert_eq!(err, SchedulingError::InvalidWindow { start: 600, end: 540 });
        assert!(validate_window(&TimeWindow { start: 540, end: 540 }).is_err());
        assert!(validate_window(&TimeWindow::new(0, MINUTES_PER_DAY)).is_ok());
    }

    #[test]
    fn rejects_bad_booking_type() {
        let mut bt = booking_type(30, 0, 10);
        assert!(validate_booking_type(&bt).is_ok());
        bt.duration_minutes = 0;
        assert!(validate_booking_type(&bt).is_err());
        bt.duration_minutes = 30;
        bt.max_per_day = Some(0);
        assert!(validate_booking_type(&bt).is_err());
        bt.max_per_day = None;
        bt.max_advance_days = 0;
        assert!(validate_booking_type(&bt).is_err());
    }

    // ── notice window ────────────────────────────────────

    #[test]
    fn past_and_far_future_dates_out_of_horizon() {
        let bt = booking_type(30, 0, 0);
        let now = date().and_hms_opt(12, 0, 0).unwrap();
        assert!(!date_in_horizon(date() - Duration::days(1), now, &bt));
        assert!(date_in_horizon(date(), now, &bt));
        assert!(date_in_horizon(date() + Duration::days(14), now, &bt));
        assert!(!date_in_horizon(date() + Duration::days(15), now, &bt));
    }

    #[test]
    fn notice_crossing_midnight_closes_today() {
        // 23:30 with 2h notice → earliest bookable moment is tomorrow.
        let bt = booking_type(30, 0, 0);
        let now = date().and_hms_opt(23, 30, 0).unwrap();
        assert!(!date_in_horizon(date(), now, &bt));
        assert!(date_in_horizon(date() + Duration::days(1), now, &bt));
    }

    #[test]
    fn same_day_slots_below_notice_dropped() {
        let now = date().and_hms_opt(8, 0, 0).unwrap();
        let earliest = now + Duration::hours(2);
        let kept = drop_below_notice(date(), vec![540, 600, 660], earliest);
        // 09:00 < 10:00 is dropped; 10:00 itself clears the threshold.
        assert_eq!(kept, vec![600, 660]);
    }

    #[test]
    fn future_day_unaffected_by_notice_tier() {
        let now = date().and_hms_opt(8, 0, 0).unwrap();
        let earliest = now + Duration::hours(2);
        let kept = drop_below_notice(date() + Duration::days(3), vec![540, 600], earliest);
        assert_eq!(kept, vec![540, 600]);
    }

    // ── capacity ─────────────────────────────────────────

    #[test]
    fn capacity_counts_only_active_bookings() {
        let d = date();
        let bookings = vec![
            booking_on(d, 540, 570, BookingStatus::Confirmed),
            booking_on(d, 600, 630, BookingStatus::Cancelled),
            booking_on(d, 660, 690, BookingStatus::NoShow),
        ];
        assert!(day_at_capacity(&bookings, Some(1)));
        assert!(!day_at_capacity(&bookings, Some(2)));
        assert!(!day_at_capacity(&bookings, None));
    }

    // ── conflicts ────────────────────────────────────────

    #[test]
    fn candidate_overlapping_booking_dropped() {
        let bt = booking_type(30, 0, 10);
        let bookings = vec![booking_on(date(), 540, 570, BookingStatus::Confirmed)];
        // 09:00 collides; 09:40 starts exactly at the buffer's edge and survives.
        let kept = drop_conflicts(date(), vec![540, 580], &bt, &bookings, None);
        assert_eq!(kept, vec![580]);
    }

    #[test]
    fn buffer_before_extends_backwards() {
        let bt = booking_type(30, 15, 0);
        let bookings = vec![booking_on(date(), 600, 630, BookingStatus::Confirmed)];
        // Expanded interval starts 09:45; a 09:20–09:50 candidate now collides.
        let kept = drop_conflicts(date(), vec![560, 540], &bt, &bookings, None);
        assert_eq!(kept, vec![540]);
    }

    #[test]
    fn cancelled_and_no_show_never_conflict() {
        let bt = booking_type(30, 0, 0);
        let bookings = vec![
            booking_on(date(), 540, 570, BookingStatus::Cancelled),
            booking_on(date(), 540, 570, BookingStatus::NoShow),
        ];
        let kept = drop_conflicts(date(), vec![540], &bt, &bookings, None);
        assert_eq!(kept, vec![540]);
    }

    #[test]
    fn excluded_booking_ignored() {
        let bt = booking_type(30, 0, 0);
        let b = booking_on(date(), 540, 570, BookingStatus::Confirmed);
        let id = b.id;
        let kept = drop_conflicts(date(), vec![540], &bt, &[b], Some(id));
        assert_eq!(kept, vec![540]);
    }

    #[test]
    fn candidate_own_buffer_not_applied_to_itself() {
        // Booking 10:00–10:30 with no buffers configured on it; candidate
        // 09:30–10:00 touches but does not overlap → kept.
        let bt = booking_type(30, 0, 0);
        let bookings = vec![booking_on(date(), 600, 630, BookingStatus::Confirmed)];
        let kept = drop_conflicts(date(), vec![570], &bt, &bookings, None);
        assert_eq!(kept, vec![570]);
    }
}
