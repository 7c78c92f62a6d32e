mod availability;
mod conflict;
mod error;
pub mod policy;
mod store;

pub use availability::{generate_slots, resolve_windows};
pub use conflict::{date_in_horizon, day_at_capacity, drop_below_notice, drop_conflicts};
pub use error::SchedulingError;
pub use store::{
    AvailabilityStore, BookingStore, InMemoryAvailability, InMemoryBookings,
};

use std::sync::Arc;

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use tokio::sync::Mutex;
use tracing::{debug, info};
use ulid::Ulid;

use crate::limits::*;
use crate::model::*;
use crate::observability;

use conflict::{now_local, validate_booking_type, validate_window};

/// Orchestrates availability resolution, slot generation, guards, and the
/// booking lifecycle over the two repository seams.
///
/// Slot reads are lock-free and stateless. Booking creation and reschedule
/// serialize on `write_lock` and re-run the full availability computation
/// inside the critical section — the earlier read is never trusted.
pub struct SchedulingService {
    availability: Arc<dyn AvailabilityStore>,
    bookings: Arc<dyn BookingStore>,
    /// One provider, one write lock.
    write_lock: Mutex<()>,
}

impl SchedulingService {
    pub fn new(availability: Arc<dyn AvailabilityStore>, bookings: Arc<dyn BookingStore>) -> Self {
        Self {
            availability,
            bookings,
            write_lock: Mutex::new(()),
        }
    }

    pub async fn booking_type(&self, id: Ulid) -> Result<BookingType, SchedulingError> {
        self.availability
            .booking_type(id)
            .await?
            .ok_or(SchedulingError::NotFound(id))
    }

    // ── Slot reads ───────────────────────────────────────

    /// The authoritative set of bookable start times for a date.
    pub async fn get_available_slots(
        &self,
        booking_type_id: Ulid,
        date: NaiveDate,
    ) -> Result<Vec<NaiveTime>, SchedulingError> {
        let bt = self.booking_type(booking_type_id).await?;
        let started = std::time::Instant::now();
        let slots = self.slots_for_date(&bt, date, now_local(), None).await?;
        metrics::counter!(observability::SLOT_QUERIES_TOTAL).increment(1);
        metrics::histogram!(observability::SLOT_QUERY_DURATION_SECONDS)
            .record(started.elapsed().as_secs_f64());
        debug!(%date, booking_type = %bt.name, count = slots.len(), "resolved slots");
        Ok(slots.into_iter().map(minute_to_time).collect())
    }

    /// Dates in `[today, today + days_ahead]` with at least one open slot.
    /// Days are independent and scanned concurrently.
    pub async fn get_available_dates(
        &self,
        booking_type_id: Ulid,
        days_ahead: i64,
    ) -> Result<Vec<NaiveDate>, SchedulingError> {
        let bt = self.booking_type(booking_type_id).await?;
        let now = now_local();
        let today = now.date();
        let span = days_ahead.clamp(0, MAX_SCAN_DAYS);

        let scans = (0..=span).map(|offset| {
            let bt = &bt;
            let date = today + Duration::days(offset);
            async move {
                let slots = self.slots_for_date(bt, date, now, None).await?;
                Ok::<_, SchedulingError>((date, slots))
            }
        });

        let mut dates = Vec::new();
        for result in futures::future::join_all(scans).await {
            let (date, slots) = result?;
            if !slots.is_empty() {
                dates.push(date);
            }
        }
        Ok(dates)
    }

    /// Resolver → generator → notice tiers → capacity → conflict filter.
    ///
    /// The date-level notice guard runs first: it is the cheapest check and
    /// needs no store access. `exclude` removes one booking from conflict
    /// consideration (the booking being rescheduled).
    async fn slots_for_date(
        &self,
        bt: &BookingType,
        date: NaiveDate,
        now: NaiveDateTime,
        exclude: Option<Ulid>,
    ) -> Result<Vec<Minute>, SchedulingError> {
        if !date_in_horizon(date, now, bt) {
            return Ok(Vec::new());
        }

        let override_row = self.availability.override_for(date).await?;
        let template = self.availability.template_entries().await?;
        // Malformed configuration must fail fast, never silently produce
        // wrong availability.
        for entry in &template {
            validate_window(&entry.window)?;
        }
        if let Some(o) = &override_row
            && let OverrideKind::Window(w) = &o.kind
        {
            validate_window(w)?;
        }

        let source = resolve_windows(date, override_row.as_ref(), &template);
        let candidates =
            generate_slots(&source.windows(), bt.duration_minutes, bt.buffer_after_minutes);
        if candidates.is_empty() {
            return Ok(candidates);
        }

        let earliest = now + Duration::hours(bt.min_notice_hours);
        let candidates = drop_below_notice(date, candidates, earliest);

        let day = self.bookings.on_date(date).await?;
        if day_at_capacity(&day, bt.max_per_day) {
            return Ok(Vec::new());
        }
        Ok(drop_conflicts(date, candidates, bt, &day, exclude))
    }

    // ── Booking lifecycle ────────────────────────────────

    /// Create a booking at a previously offered slot.
    ///
    /// Optimistic concurrency: the request carries the start the client saw;
    /// under the write lock the slot set is recomputed and the request must
    /// match a fresh slot (±`SLOT_MATCH_TOLERANCE_SECS` for clock skew).
    /// The stored booking snaps to the canonical slot time.
    pub async fn create_booking(
        &self,
        booking_type_id: Ulid,
        requested_start: NaiveDateTime,
    ) -> Result<Booking, SchedulingError> {
        let bt = self.booking_type(booking_type_id).await?;
        let _guard = self.write_lock.lock().await;

        let now = now_local();
        let date = requested_start.date();
        let slot = self
            .match_slot(&bt, date, requested_start, now, None)
            .await?;

        let start = date.and_time(minute_to_time(slot));
        let booking = Booking {
            id: Ulid::new(),
            booking_type_id: bt.id,
            start,
            end: start + Duration::minutes(bt.duration_minutes as i64),
            status: bt.initial_status(),
            confirmation_token: Ulid::new().to_string(),
        };
        self.bookings.insert(booking.clone()).await?;

        metrics::counter!(observability::BOOKINGS_CREATED_TOTAL).increment(1);
        info!(id = %booking.id, %start, status = %booking.status, "booking created");
        Ok(booking)
    }

    /// Self-service cancellation, token-authenticated.
    pub async fn cancel_by_token(&self, token: &str) -> Result<Booking, SchedulingError> {
        let booking = self.find_by_token(token).await?;
        self.check_modifiable(&booking, BookingStatus::Cancelled)?;
        let cancelled = self
            .apply_transition(booking, BookingStatus::Cancelled)
            .await?;
        metrics::counter!(observability::BOOKINGS_CANCELLED_TOTAL).increment(1);
        info!(id = %cancelled.id, "booking cancelled");
        Ok(cancelled)
    }

    /// Self-service reschedule: same policy gate as cancellation, then the
    /// full availability re-check for the new start, excluding the booking
    /// being moved from its own conflict set.
    pub async fn reschedule_by_token(
        &self,
        token: &str,
        new_start: NaiveDateTime,
    ) -> Result<Booking, SchedulingError> {
        let booking = self.find_by_token(token).await?;
        // Keeping the current status, so gate on "still active" directly.
        if !booking.status.is_active() {
            return Err(SchedulingError::InvalidTransition {
                from: booking.status,
                to: booking.status,
            });
        }
        if !policy::can_reschedule(&booking, now_local(), policy::MODIFICATION_NOTICE_HOURS) {
            return Err(SchedulingError::ModificationWindowClosed {
                hours: policy::MODIFICATION_NOTICE_HOURS,
            });
        }

        let bt = self.booking_type(booking.booking_type_id).await?;
        let _guard = self.write_lock.lock().await;

        let now = now_local();
        let date = new_start.date();
        let slot = self
            .match_slot(&bt, date, new_start, now, Some(booking.id))
            .await?;

        let start = date.and_time(minute_to_time(slot));
        let end = start + Duration::minutes(bt.duration_minutes as i64);
        let moved = self
            .bookings
            .move_booking(booking.id, start, end)
            .await?
            .ok_or(SchedulingError::NotFound(booking.id))?;

        metrics::counter!(observability::BOOKINGS_RESCHEDULED_TOTAL).increment(1);
        info!(id = %moved.id, %start, "booking rescheduled");
        Ok(moved)
    }

    pub async fn can_cancel(&self, token: &str) -> Result<bool, SchedulingError> {
        let booking = self.find_by_token(token).await?;
        Ok(booking.status.is_active()
            && policy::can_cancel(&booking, now_local(), policy::MODIFICATION_NOTICE_HOURS))
    }

    pub async fn can_reschedule(&self, token: &str) -> Result<bool, SchedulingError> {
        let booking = self.find_by_token(token).await?;
        Ok(booking.status.is_active()
            && policy::can_reschedule(&booking, now_local(), policy::MODIFICATION_NOTICE_HOURS))
    }

    /// Admin/state-machine transition: confirm, cancel, complete, no-show.
    pub async fn transition(
        &self,
        id: Ulid,
        to: BookingStatus,
    ) -> Result<Booking, SchedulingError> {
        let booking = self
            .bookings
            .get(id)
            .await?
            .ok_or(SchedulingError::NotFound(id))?;
        self.apply_transition(booking, to).await
    }

    async fn apply_transition(
        &self,
        booking: Booking,
        to: BookingStatus,
    ) -> Result<Booking, SchedulingError> {
        if !booking.status.can_transition_to(to) {
            return Err(SchedulingError::InvalidTransition {
                from: booking.status,
                to,
            });
        }
        self.bookings
            .update_status(booking.id, to)
            .await?
            .ok_or(SchedulingError::NotFound(booking.id))
    }

    async fn find_by_token(&self, token: &str) -> Result<Booking, SchedulingError> {
        self.bookings
            .find_by_token(token)
            .await?
            .ok_or(SchedulingError::UnknownToken)
    }

    fn check_modifiable(
        &self,
        booking: &Booking,
        to: BookingStatus,
    ) -> Result<(), SchedulingError> {
        if !booking.status.can_transition_to(to) {
            return Err(SchedulingError::InvalidTransition {
                from: booking.status,
                to,
            });
        }
        if !policy::can_cancel(booking, now_local(), policy::MODIFICATION_NOTICE_HOURS) {
            return Err(SchedulingError::ModificationWindowClosed {
                hours: policy::MODIFICATION_NOTICE_HOURS,
            });
        }
        Ok(())
    }

    /// Recompute slots for the date and match the requested start against
    /// them within the clock-skew tolerance.
    async fn match_slot(
        &self,
        bt: &BookingType,
        date: NaiveDate,
        requested: NaiveDateTime,
        now: NaiveDateTime,
        exclude: Option<Ulid>,
    ) -> Result<Minute, SchedulingError> {
        let slots = self.slots_for_date(bt, date, now, exclude).await?;
        let matched = slots.into_iter().find(|&m| {
            let slot_start = date.and_time(minute_to_time(m));
            (slot_start - requested).num_seconds().abs() <= SLOT_MATCH_TOLERANCE_SECS
        });
        matched.ok_or_else(|| {
            metrics::counter!(observability::BOOKINGS_REJECTED_TOTAL).increment(1);
            debug!(%requested, "requested start not in fresh slot set");
            SchedulingError::SlotUnavailable
        })
    }

    // ── Provider configuration ───────────────────────────

    pub async fn upsert_booking_type(&self, bt: BookingType) -> Result<(), SchedulingError> {
        validate_booking_type(&bt)?;
        self.availability.upsert_booking_type(bt).await
    }

    pub async fn upsert_template_entry(&self, entry: TemplateEntry) -> Result<(), SchedulingError> {
        validate_window(&entry.window)?;
        let existing = self.availability.template_entries().await?;
        if existing.len() >= MAX_TEMPLATE_ENTRIES && !existing.iter().any(|e| e.id == entry.id) {
            return Err(SchedulingError::InvalidConfig("too many template entries"));
        }
        self.availability.upsert_template_entry(entry).await
    }

    pub async fn set_override(&self, o: DateOverride) -> Result<(), SchedulingError> {
        if let OverrideKind::Window(w) = &o.kind {
            validate_window(w)?;
        }
        if let Some(reason) = &o.reason
            && reason.len() > MAX_REASON_LEN
        {
            return Err(SchedulingError::InvalidConfig("override reason too long"));
        }
        self.availability.set_override(o).await
    }

    pub async fn clear_override(&self, date: NaiveDate) -> Result<bool, SchedulingError> {
        self.availability.clear_override(date).await
    }
}
