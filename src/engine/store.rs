use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use dashmap::DashMap;
use ulid::Ulid;

use crate::model::*;

use super::SchedulingError;

/// Read/write access to the provider's availability configuration.
#[async_trait]
pub trait AvailabilityStore: Send + Sync {
    async fn booking_type(&self, id: Ulid) -> Result<Option<BookingType>, SchedulingError>;
    async fn upsert_booking_type(&self, bt: BookingType) -> Result<(), SchedulingError>;

    async fn template_entries(&self) -> Result<Vec<TemplateEntry>, SchedulingError>;
    async fn upsert_template_entry(&self, entry: TemplateEntry) -> Result<(), SchedulingError>;

    async fn override_for(&self, date: NaiveDate) -> Result<Option<DateOverride>, SchedulingError>;
    async fn set_override(&self, o: DateOverride) -> Result<(), SchedulingError>;
    async fn clear_override(&self, date: NaiveDate) -> Result<bool, SchedulingError>;
}

/// Read/write access to the provider's bookings.
#[async_trait]
pub trait BookingStore: Send + Sync {
    async fn insert(&self, booking: Booking) -> Result<(), SchedulingError>;
    async fn get(&self, id: Ulid) -> Result<Option<Booking>, SchedulingError>;
    async fn find_by_token(&self, token: &str) -> Result<Option<Booking>, SchedulingError>;
    async fn on_date(&self, date: NaiveDate) -> Result<Vec<Booking>, SchedulingError>;
    async fn update_status(
        &self,
        id: Ulid,
        status: BookingStatus,
    ) -> Result<Option<Booking>, SchedulingError>;
    async fn move_booking(
        &self,
        id: Ulid,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Result<Option<Booking>, SchedulingError>;
}

// ── In-memory implementations ─────────────────────────────────────

#[derive(Default)]
pub struct InMemoryAvailability {
    booking_types: DashMap<Ulid, BookingType>,
    template: DashMap<Ulid, TemplateEntry>,
    overrides: DashMap<NaiveDate, DateOverride>,
}

impl InMemoryAvailability {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AvailabilityStore for InMemoryAvailability {
    async fn booking_type(&self, id: Ulid) -> Result<Option<BookingType>, SchedulingError> {
        Ok(self.booking_types.get(&id).map(|e| e.value().clone()))
    }

    async fn upsert_booking_type(&self, bt: BookingType) -> Result<(), SchedulingError> {
        self.booking_types.insert(bt.id, bt);
        Ok(())
    }

    async fn template_entries(&self) -> Result<Vec<TemplateEntry>, SchedulingError> {
        Ok(self.template.iter().map(|e| e.value().clone()).collect())
    }

    async fn upsert_template_entry(&self, entry: TemplateEntry) -> Result<(), SchedulingError> {
        self.template.insert(entry.id, entry);
        Ok(())
    }

    async fn override_for(&self, date: NaiveDate) -> Result<Option<DateOverride>, SchedulingError> {
        Ok(self.overrides.get(&date).map(|e| e.value().clone()))
    }

    async fn set_override(&self, o: DateOverride) -> Result<(), SchedulingError> {
        // One override per date: a second write replaces the first.
        self.overrides.insert(o.date, o);
        Ok(())
    }

    async fn clear_override(&self, date: NaiveDate) -> Result<bool, SchedulingError> {
        Ok(self.overrides.remove(&date).is_some())
    }
}

#[derive(Default)]
pub struct InMemoryBookings {
    bookings: DashMap<Ulid, Booking>,
    by_token: DashMap<String, Ulid>,
}

impl InMemoryBookings {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BookingStore for InMemoryBookings {
    async fn insert(&self, booking: Booking) -> Result<(), SchedulingError> {
        self.by_token
            .insert(booking.confirmation_token.clone(), booking.id);
        self.bookings.insert(booking.id, booking);
        Ok(())
    }

    async fn get(&self, id: Ulid) -> Result<Option<Booking>, SchedulingError> {
        Ok(self.bookings.get(&id).map(|e| e.value().clone()))
    }

    async fn find_by_token(&self, token: &str) -> Result<Option<Booking>, SchedulingError> {
        let Some(id) = self.by_token.get(token).map(|e| *e.value()) else {
            return Ok(None);
        };
        self.get(id).await
    }

    async fn on_date(&self, date: NaiveDate) -> Result<Vec<Booking>, SchedulingError> {
        // Full scan; fine for an in-memory store sized to one provider.
        let mut day: Vec<Booking> = self
            .bookings
            .iter()
            .filter(|e| e.value().date() == date)
            .map(|e| e.value().clone())
            .collect();
        day.sort_by_key(|b| b.start);
        Ok(day)
    }

    async fn update_status(
        &self,
        id: Ulid,
        status: BookingStatus,
    ) -> Result<Option<Booking>, SchedulingError> {
        let Some(mut entry) = self.bookings.get_mut(&id) else {
            return Ok(None);
        };
        entry.value_mut().status = status;
        Ok(Some(entry.value().clone()))
    }

    async fn move_booking(
        &self,
        id: Ulid,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Result<Option<Booking>, SchedulingError> {
        let Some(mut entry) = self.bookings.get_mut(&id) else {
            return Ok(None);
        };
        let b = entry.value_mut();
        b.start = start;
        b.end = end;
        Ok(Some(b.clone()))
    }
}
