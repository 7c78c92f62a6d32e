use ulid::Ulid;

use crate::model::{BookingStatus, Minute};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchedulingError {
    /// Malformed template/override window — fatal configuration error.
    InvalidWindow { start: Minute, end: Minute },
    /// Malformed booking-type configuration.
    InvalidConfig(&'static str),
    NotFound(Ulid),
    UnknownToken,
    /// The requested start is not in the authoritative slot set — either it
    /// never was, or a concurrent writer took it first.
    SlotUnavailable,
    /// Cancel/reschedule attempted inside the modification notice window.
    ModificationWindowClosed { hours: i64 },
    InvalidTransition { from: BookingStatus, to: BookingStatus },
    Storage(String),
}

impl std::fmt::Display for SchedulingError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SchedulingError::InvalidWindow { start, end } => {
                write!(f, "invalid availability window [{start}, {end})")
            }
            SchedulingError::InvalidConfig(msg) => write!(f, "invalid configuration: {msg}"),
            SchedulingError::NotFound(id) => write!(f, "not found: {id}"),
            SchedulingError::UnknownToken => write!(f, "unknown confirmation token"),
            SchedulingError::SlotUnavailable => write!(f, "slot no longer available"),
            SchedulingError::ModificationWindowClosed { hours } => {
                write!(f, "cannot modify within {hours} hours of start")
            }
            SchedulingError::InvalidTransition { from, to } => {
                write!(f, "cannot move booking from {from} to {to}")
            }
            SchedulingError::Storage(e) => write!(f, "storage error: {e}"),
        }
    }
}

impl std::error::Error for SchedulingError {}
