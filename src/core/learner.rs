// File: src/core/learner.rs
//! The learner record (`userProgress`) and the coarse world-map percentages
//! (`journeyProgress`).

use crate::core::types::{LearnerProgress, SimpleJourneyProgress};
use crate::storage::{keys, load_json, persist, KeyValueStore, StoreTransaction};
use tracing::warn;

pub(crate) fn read_learner<S: KeyValueStore + ?Sized>(storage: &S) -> LearnerProgress {
    load_json(storage, keys::USER_PROGRESS).unwrap_or_default()
}

pub(crate) fn read_map<S: KeyValueStore + ?Sized>(storage: &S) -> SimpleJourneyProgress {
    load_json(storage, keys::SIMPLE_JOURNEY_PROGRESS).unwrap_or_default()
}

pub struct LearnerStore<'a, S: KeyValueStore + ?Sized> {
    storage: &'a mut S,
}

impl<'a, S: KeyValueStore + ?Sized> LearnerStore<'a, S> {
    pub fn new(storage: &'a mut S) -> Self {
        Self { storage }
    }

    pub fn read(&self) -> LearnerProgress {
        read_learner(&*self.storage)
    }

    pub fn write(&mut self, progress: &LearnerProgress) -> bool {
        persist(&mut *self.storage, keys::USER_PROGRESS, progress)
    }

    pub fn journey_map(&self) -> SimpleJourneyProgress {
        read_map(&*self.storage)
    }

    pub fn write_journey_map(&mut self, map: &SimpleJourneyProgress) -> bool {
        persist(&mut *self.storage, keys::SIMPLE_JOURNEY_PROGRESS, map)
    }

    pub fn set_level(&mut self, level: u32) -> bool {
        let mut progress = self.read();
        progress.level = level;
        self.write(&progress)
    }

    /// Appends the location to the completed list unless it is already there.
    pub fn mark_completed(&mut self, location_id: &str) -> bool {
        let mut progress = self.read();
        if progress.completed_locations.iter().any(|l| l == location_id) {
            return true;
        }
        progress.completed_locations.push(location_id.to_string());
        self.write(&progress)
    }

    /// Sets the map percentage of a location (clamped to 100). Reaching 100
    /// also records the location as completed, in the same transaction.
    pub fn update_location_progress(&mut self, location_id: &str, percentage: u32) -> bool {
        let percentage = percentage.min(100);
        let mut map = self.journey_map();
        map.insert(location_id.to_string(), percentage);

        let mut tx = StoreTransaction::new();
        if let Err(e) = tx.stage_json(keys::SIMPLE_JOURNEY_PROGRESS, &map) {
            warn!(error = %e, "could not encode journey map");
            return false;
        }
        if percentage == 100 {
            let mut progress = self.read();
            if !progress.completed_locations.iter().any(|l| l == location_id) {
                progress.completed_locations.push(location_id.to_string());
                if let Err(e) = tx.stage_json(keys::USER_PROGRESS, &progress) {
                    warn!(error = %e, "could not encode learner progress");
                    return false;
                }
            }
        }

        match tx.commit(&mut *self.storage) {
            Ok(()) => true,
            Err(e) => {
                warn!(location_id, error = %e, "location progress not persisted");
                false
            }
        }
    }

    /// Journey chosen on the selection screen, stored as a bare id.
    pub fn selected_journey(&self) -> Option<String> {
        self.storage
            .get(keys::SELECTED_JOURNEY)
            .map(|raw| raw.trim().to_string())
            .filter(|id| !id.is_empty())
    }

    pub fn select_journey(&mut self, journey_id: &str) -> bool {
        match self.storage.set(keys::SELECTED_JOURNEY, journey_id.to_string()) {
            Ok(()) => true,
            Err(e) => {
                warn!(journey_id, error = %e, "journey selection not persisted");
                false
            }
        }
    }
}
