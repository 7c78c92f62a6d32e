use std::io;
use std::path::Path;
use std::sync::Arc;

use chrono::NaiveDate;
use serde::Deserialize;
use ulid::Ulid;

use crate::engine::{SchedulingError, SchedulingService};
use crate::model::*;

/// Startup seed: the provider's catalog and weekly template, applied
/// through the validated service operations so a malformed seed fails
/// the boot instead of producing wrong availability.
#[derive(Debug, Default, Deserialize)]
pub struct Seed {
    #[serde(default)]
    pub booking_types: Vec<BookingType>,
    #[serde(default)]
    pub template: Vec<SeedTemplateEntry>,
    #[serde(default)]
    pub overrides: Vec<SeedOverride>,
}

#[derive(Debug, Deserialize)]
pub struct SeedTemplateEntry {
    #[serde(with = "crate::model::weekday_serde")]
    pub day_of_week: chrono::Weekday,
    pub window: TimeWindow,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

/// Flag-plus-optional-window input shape; collapses to `OverrideKind`.
#[derive(Debug, Deserialize)]
pub struct SeedOverride {
    pub date: NaiveDate,
    pub is_available: bool,
    pub window: Option<TimeWindow>,
    pub reason: Option<String>,
}

fn default_true() -> bool {
    true
}

impl SeedOverride {
    pub fn into_override(self) -> DateOverride {
        DateOverride {
            kind: OverrideKind::from_parts(self.is_available, self.window),
            date: self.date,
            reason: self.reason,
        }
    }
}

pub fn load(path: &Path) -> io::Result<Seed> {
    let raw = std::fs::read_to_string(path)?;
    serde_json::from_str(&raw).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
}

pub async fn apply(seed: Seed, service: &Arc<SchedulingService>) -> Result<(), SchedulingError> {
    for bt in seed.booking_types {
        service.upsert_booking_type(bt).await?;
    }
    for entry in seed.template {
        service
            .upsert_template_entry(TemplateEntry {
                id: Ulid::new(),
                day_of_week: entry.day_of_week,
                window: entry.window,
                is_active: entry.is_active,
            })
            .await?;
    }
    for o in seed.overrides {
        service.set_override(o.into_override()).await?;
    }
    Ok(())
}
