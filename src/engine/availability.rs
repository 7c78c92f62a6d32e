use chrono::{Datelike, NaiveDate};

use crate::model::*;

// ── Availability Resolution ───────────────────────────────────────

/// Reconcile the weekly template against a date-specific override.
///
/// Precedence is binary: an override always wins and never merges with the
/// template. Without an override, all active template entries matching the
/// date's weekday apply, ascending by start time.
pub fn resolve_windows(
    date: NaiveDate,
    override_row: Option<&DateOverride>,
    template: &[TemplateEntry],
) -> AvailabilitySource {
    if let Some(o) = override_row {
        return match o.kind {
            OverrideKind::Blocked => AvailabilitySource::Blocked,
            OverrideKind::Window(w) => AvailabilitySource::Override(w),
        };
    }

    let mut windows: Vec<TimeWindow> = template
        .iter()
        .filter(|e| e.is_active && e.day_of_week == date.weekday())
        .map(|e| e.window)
        .collect();
    windows.sort_by_key(|w| w.start);
    AvailabilitySource::Template(windows)
}

/// Candidate start times within the given windows.
///
/// Each window is scanned independently: starts at `window.start` and
/// advances by `duration + buffer_after`. A candidate fits while
/// `candidate + duration <= window.end + buffer_after` — the last
/// appointment may run into its own trailing buffer, which belongs to the
/// slot, not to the window. `buffer_before` plays no role here — it only
/// matters against pre-existing bookings, never between slots of the same
/// scan.
pub fn generate_slots(windows: &[TimeWindow], duration: Minute, buffer_after: Minute) -> Vec<Minute> {
    let mut slots = Vec::new();
    for window in windows {
        let mut candidate = window.start;
        while candidate + duration <= window.end + buffer_after {
            slots.push(candidate);
            candidate += duration + buffer_after;
        }
    }
    slots
}
