use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post, put},
};
use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use serde_json::json;
use ulid::Ulid;

use crate::engine::{SchedulingError, SchedulingService};
use crate::model::*;

pub fn router(service: Arc<SchedulingService>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/booking-types/{id}/slots", get(slots_for_date))
        .route("/booking-types/{id}/dates", get(available_dates))
        .route("/bookings", post(create_booking))
        .route("/bookings/{token}/cancel", post(cancel_booking))
        .route("/bookings/{token}/reschedule", post(reschedule_booking))
        .route("/admin/booking-types", post(upsert_booking_type))
        .route("/admin/template", post(add_template_entry))
        .route(
            "/admin/overrides/{date}",
            put(set_override).delete(clear_override),
        )
        .with_state(service)
}

// ── Error mapping ─────────────────────────────────────────────────

struct ApiError(SchedulingError);

impl From<SchedulingError> for ApiError {
    fn from(e: SchedulingError) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            SchedulingError::InvalidWindow { .. } | SchedulingError::InvalidConfig(_) => {
                StatusCode::BAD_REQUEST
            }
            SchedulingError::NotFound(_) | SchedulingError::UnknownToken => StatusCode::NOT_FOUND,
            SchedulingError::SlotUnavailable | SchedulingError::InvalidTransition { .. } => {
                StatusCode::CONFLICT
            }
            SchedulingError::ModificationWindowClosed { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            SchedulingError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!("request failed: {}", self.0);
        }
        let body = Json(json!({ "error": { "message": self.0.to_string() } }));
        (status, body).into_response()
    }
}

// ── Read endpoints ────────────────────────────────────────────────

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok", "version": env!("CARGO_PKG_VERSION") }))
}

#[derive(Deserialize)]
struct SlotsQuery {
    date: NaiveDate,
}

#[derive(Serialize)]
struct SlotEntry {
    start_time: NaiveTime,
    end_time: NaiveTime,
    available: bool,
}

#[derive(Serialize)]
struct SlotsResponse {
    date: NaiveDate,
    slots: Vec<SlotEntry>,
}

async fn slots_for_date(
    State(service): State<Arc<SchedulingService>>,
    Path(id): Path<Ulid>,
    Query(q): Query<SlotsQuery>,
) -> Result<Json<SlotsResponse>, ApiError> {
    let bt = service.booking_type(id).await?;
    let starts = service.get_available_slots(id, q.date).await?;
    let slots = starts
        .into_iter()
        .map(|start_time| SlotEntry {
            start_time,
            // Through the datetime so a slot ending at midnight wraps cleanly.
            end_time: (q.date.and_time(start_time)
                + Duration::minutes(bt.duration_minutes as i64))
            .time(),
            available: true,
        })
        .collect();
    Ok(Json(SlotsResponse { date: q.date, slots }))
}

#[derive(Deserialize)]
struct DatesQuery {
    #[serde(default = "default_days_ahead")]
    days_ahead: i64,
}

fn default_days_ahead() -> i64 {
    30
}

async fn available_dates(
    State(service): State<Arc<SchedulingService>>,
    Path(id): Path<Ulid>,
    Query(q): Query<DatesQuery>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let dates = service.get_available_dates(id, q.days_ahead).await?;
    Ok(Json(json!({ "dates": dates })))
}

// ── Booking endpoints ─────────────────────────────────────────────

#[derive(Deserialize)]
struct CreateBookingRequest {
    booking_type_id: Ulid,
    start_time: NaiveDateTime,
}

#[derive(Serialize)]
struct BookingResponse {
    id: Ulid,
    booking_type_id: Ulid,
    start_time: NaiveDateTime,
    end_time: NaiveDateTime,
    status: BookingStatus,
    confirmation_token: String,
}

impl From<Booking> for BookingResponse {
    fn from(b: Booking) -> Self {
        Self {
            id: b.id,
            booking_type_id: b.booking_type_id,
            start_time: b.start,
            end_time: b.end,
            status: b.status,
            confirmation_token: b.confirmation_token,
        }
    }
}

async fn create_booking(
    State(service): State<Arc<SchedulingService>>,
    Json(req): Json<CreateBookingRequest>,
) -> Result<(StatusCode, Json<BookingResponse>), ApiError> {
    let booking = service
        .create_booking(req.booking_type_id, req.start_time)
        .await?;
    Ok((StatusCode::CREATED, Json(booking.into())))
}

async fn cancel_booking(
    State(service): State<Arc<SchedulingService>>,
    Path(token): Path<String>,
) -> Result<Json<BookingResponse>, ApiError> {
    let booking = service.cancel_by_token(&token).await?;
    Ok(Json(booking.into()))
}

#[derive(Deserialize)]
struct RescheduleRequest {
    start_time: NaiveDateTime,
}

async fn reschedule_booking(
    State(service): State<Arc<SchedulingService>>,
    Path(token): Path<String>,
    Json(req): Json<RescheduleRequest>,
) -> Result<Json<BookingResponse>, ApiError> {
    let booking = service.reschedule_by_token(&token, req.start_time).await?;
    Ok(Json(booking.into()))
}

// ── Provider admin endpoints ──────────────────────────────────────

#[derive(Deserialize)]
struct BookingTypeRequest {
    id: Option<Ulid>,
    name: String,
    duration_minutes: Minute,
    #[serde(default)]
    buffer_before_minutes: Minute,
    #[serde(default)]
    buffer_after_minutes: Minute,
    #[serde(default)]
    min_notice_hours: i64,
    max_advance_days: i64,
    max_per_day: Option<u32>,
    #[serde(default)]
    requires_confirmation: bool,
}

async fn upsert_booking_type(
    State(service): State<Arc<SchedulingService>>,
    Json(req): Json<BookingTypeRequest>,
) -> Result<(StatusCode, Json<BookingType>), ApiError> {
    let bt = BookingType {
        id: req.id.unwrap_or_else(Ulid::new),
        name: req.name,
        duration_minutes: req.duration_minutes,
        buffer_before_minutes: req.buffer_before_minutes,
        buffer_after_minutes: req.buffer_after_minutes,
        min_notice_hours: req.min_notice_hours,
        max_advance_days: req.max_advance_days,
        max_per_day: req.max_per_day,
        requires_confirmation: req.requires_confirmation,
    };
    service.upsert_booking_type(bt.clone()).await?;
    Ok((StatusCode::CREATED, Json(bt)))
}

#[derive(Deserialize)]
struct TemplateEntryRequest {
    id: Option<Ulid>,
    #[serde(with = "crate::model::weekday_serde")]
    day_of_week: chrono::Weekday,
    window: TimeWindow,
    #[serde(default = "default_true")]
    is_active: bool,
}

fn default_true() -> bool {
    true
}

async fn add_template_entry(
    State(service): State<Arc<SchedulingService>>,
    Json(req): Json<TemplateEntryRequest>,
) -> Result<(StatusCode, Json<TemplateEntry>), ApiError> {
    let entry = TemplateEntry {
        id: req.id.unwrap_or_else(Ulid::new),
        day_of_week: req.day_of_week,
        window: req.window,
        is_active: req.is_active,
    };
    service.upsert_template_entry(entry.clone()).await?;
    Ok((StatusCode::CREATED, Json(entry)))
}

#[derive(Deserialize)]
struct OverrideRequest {
    is_available: bool,
    window: Option<TimeWindow>,
    reason: Option<String>,
}

async fn set_override(
    State(service): State<Arc<SchedulingService>>,
    Path(date): Path<NaiveDate>,
    Json(req): Json<OverrideRequest>,
) -> Result<Json<DateOverride>, ApiError> {
    let o = DateOverride {
        date,
        kind: OverrideKind::from_parts(req.is_available, req.window),
        reason: req.reason,
    };
    service.set_override(o.clone()).await?;
    Ok(Json(o))
}

async fn clear_override(
    State(service): State<Arc<SchedulingService>>,
    Path(date): Path<NaiveDate>,
) -> Result<StatusCode, ApiError> {
    if service.clear_override(date).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Ok(StatusCode::NOT_FOUND)
    }
}
