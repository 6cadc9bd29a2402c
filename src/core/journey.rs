// File: src/core/journey.rs
use crate::config::Catalog;
use crate::core::types::{JourneyProgress, LocationProgress};
use crate::storage::{keys, load_json, persist, KeyValueStore};
use tracing::warn;

/// `round(completed / total * 100)`, with halves rounded up and 0 for an
/// empty total. Completed counts beyond the total saturate at 100.
pub fn completion_percentage(completed: u32, total: u32) -> u32 {
    if total == 0 {
        return 0;
    }
    let completed = completed.min(total);
    (f64::from(completed) / f64::from(total) * 100.0).round() as u32
}

pub(crate) fn read_journey<S: KeyValueStore + ?Sized>(storage: &S, journey_id: &str) -> JourneyProgress {
    load_json(storage, &keys::journey_progress(journey_id))
        .unwrap_or_else(|| JourneyProgress::new(journey_id))
}

/// Per-journey completed locations and per-location lesson counts.
/// Completed lists only ever hold locations the catalog places in that journey.
pub struct JourneyStore<'a, S: KeyValueStore + ?Sized> {
    storage: &'a mut S,
    catalog: &'a Catalog,
}

impl<'a, S: KeyValueStore + ?Sized> JourneyStore<'a, S> {
    pub fn new(storage: &'a mut S, catalog: &'a Catalog) -> Self {
        Self { storage, catalog }
    }

    pub fn read(&self, journey_id: &str) -> JourneyProgress {
        read_journey(&*self.storage, journey_id)
    }

    pub fn write(&mut self, journey_id: &str, progress: &JourneyProgress) -> bool {
        persist(&mut *self.storage, &keys::journey_progress(journey_id), progress)
    }

    /// Adds the location to the journey's completed set. Repeat calls are no-ops;
    /// locations outside the journey are rejected.
    pub fn mark_location_completed(&mut self, journey_id: &str, location_id: &str) -> bool {
        let belongs = self
            .catalog
            .journey(journey_id)
            .is_some_and(|j| j.locations.iter().any(|l| l.id == location_id));
        if !belongs {
            warn!(journey_id, location_id, "location is not part of the journey");
            return false;
        }
        let mut progress = self.read(journey_id);
        if progress.contains(location_id) {
            return true;
        }
        progress.completed_locations.push(location_id.to_string());
        self.write(journey_id, &progress)
    }

    pub fn location_detail(&self, location_id: &str) -> LocationProgress {
        load_json(&*self.storage, &keys::location_progress(location_id))
            .unwrap_or_else(|| LocationProgress::new(location_id))
    }

    /// Replaces the location's record. Completed lessons are clamped to the total.
    pub fn update_location_detail(
        &mut self,
        location_id: &str,
        completed_lessons: u32,
        total_lessons: u32,
        is_unlocked: bool,
    ) -> bool {
        let detail = LocationProgress {
            location_id: location_id.to_string(),
            completed_lessons: completed_lessons.min(total_lessons),
            total_lessons,
            is_unlocked,
        };
        persist(&mut *self.storage, &keys::location_progress(location_id), &detail)
    }

    pub fn location_percentage(&self, location_id: &str) -> u32 {
        let detail = self.location_detail(location_id);
        completion_percentage(detail.completed_lessons, detail.total_lessons)
    }

    pub fn journey_percentage(&self, journey_id: &str) -> u32 {
        let progress = self.read(journey_id);
        completion_percentage(progress.completed_locations.len() as u32, progress.total_locations)
    }
}
