// File: src/core/engine.rs
use crate::config::ProgressConfig;
use crate::core::avatar::AvatarStore;
use crate::core::journey::{read_journey, JourneyStore};
use crate::core::learner::{read_learner, read_map, LearnerStore};
use crate::core::types::{LocationProgress, WorkflowState};
use crate::core::unlock::{self, PrerequisiteGraph, UnlockDecision, UnlockSnapshot};
use crate::core::user::UserStore;
use crate::core::workflow::{self, read_state, WorkflowStore};
use crate::error::StorageError;
use crate::persistence::FileStore;
use crate::storage::{keys, KeyValueStore, StoreTransaction};
use std::path::Path;
use tracing::{debug, info, warn};

/// Chat and flashcards each count as one lesson of a location.
const LESSONS_PER_LOCATION: u32 = 2;

/// Where a location stands for the learner.
#[derive(Debug, Clone, PartialEq)]
pub struct LocationStatus {
    pub location_id: String,
    pub name: String,
    pub percentage: u32,
    pub fully_completed: bool,
    pub unlock: UnlockDecision,
}

/// Owns the storage port and the curriculum, and runs the flows that touch
/// more than one store.
///
/// The workflow state is the canonical record of activity progress; after
/// every chat or flashcard update the location is re-projected into the map
/// percentages, the learner's completed list, the journey record and the
/// lesson detail.
pub struct ProgressEngine<S: KeyValueStore> {
    storage: S,
    config: ProgressConfig,
    graph: PrerequisiteGraph,
}

impl ProgressEngine<FileStore> {
    pub fn from_file_or_new(path: impl AsRef<Path>, config: ProgressConfig) -> Self {
        Self::new(FileStore::open(path.as_ref()), config)
    }
}

impl<S: KeyValueStore> ProgressEngine<S> {
    pub fn new(storage: S, config: ProgressConfig) -> Self {
        let graph = config.catalog.prerequisite_graph();
        Self {
            storage,
            config,
            graph,
        }
    }

    pub fn config(&self) -> &ProgressConfig {
        &self.config
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn into_storage(self) -> S {
        self.storage
    }

    pub fn avatar(&mut self) -> AvatarStore<'_, S> {
        AvatarStore::new(&mut self.storage, &self.config)
    }

    pub fn user(&mut self) -> UserStore<'_, S> {
        UserStore::new(&mut self.storage, &self.config)
    }

    pub fn workflow(&mut self) -> WorkflowStore<'_, S> {
        WorkflowStore::new(&mut self.storage, &self.config)
    }

    pub fn journeys(&mut self) -> JourneyStore<'_, S> {
        JourneyStore::new(&mut self.storage, &self.config.catalog)
    }

    pub fn learner(&mut self) -> LearnerStore<'_, S> {
        LearnerStore::new(&mut self.storage)
    }

    pub fn workflow_state(&self) -> WorkflowState {
        read_state(&self.storage)
    }

    /// Records the journey choice and sizes its progress record from the
    /// catalog, in one transaction.
    pub fn select_journey(&mut self, journey_id: &str) -> bool {
        let Some(journey) = self.config.catalog.journey(journey_id) else {
            warn!(journey_id, "unknown journey");
            return false;
        };
        let total = journey.locations.len() as u32;

        let mut progress = read_journey(&self.storage, journey_id);
        progress.total_locations = total;

        let mut tx = StoreTransaction::new();
        tx.stage(keys::SELECTED_JOURNEY, journey_id.to_string());
        if let Err(e) = tx.stage_json(keys::journey_progress(journey_id), &progress) {
            warn!(journey_id, error = %e, "could not encode journey progress");
            return false;
        }
        match tx.commit(&mut self.storage) {
            Ok(()) => {
                info!(journey_id, total, "journey selected");
                true
            }
            Err(e) => {
                warn!(journey_id, error = %e, "journey selection not persisted");
                false
            }
        }
    }

    pub fn enter_location(&mut self, location_id: &str) -> bool {
        self.workflow().set_current_location(location_id)
    }

    pub fn record_chat(&mut self, location_id: &str, completed: bool, score: f64) -> LocationStatus {
        self.workflow().record_chat_progress(location_id, completed, score);
        self.sync_location(location_id)
    }

    pub fn finish_chat(&mut self, location_id: &str, score: f64) -> LocationStatus {
        self.record_chat(location_id, true, score)
    }

    pub fn review_flashcards<I>(&mut self, location_id: &str, remembered: I) -> LocationStatus
    where
        I: IntoIterator<Item = u32>,
    {
        self.workflow().record_flashcard_progress(location_id, remembered);
        self.sync_location(location_id)
    }

    /// Projects the canonical workflow progress of one location into the
    /// derived stores, as a single transaction.
    pub fn sync_location(&mut self, location_id: &str) -> LocationStatus {
        let state = read_state(&self.storage);
        let fully_completed = workflow::is_fully_completed(&state, location_id);
        let percentage = self.map_percentage(&state, location_id);

        if let Err(e) = self.commit_projection(&state, location_id, percentage, fully_completed) {
            warn!(location_id, error = %e, "derived progress not persisted");
        }
        self.status(location_id, percentage, fully_completed)
    }

    /// Map percentage of a location. Only a fully completed location shows
    /// 100, so rounding can never satisfy a prerequisite early.
    fn map_percentage(&self, state: &WorkflowState, location_id: &str) -> u32 {
        if workflow::is_fully_completed(state, location_id) {
            return 100;
        }
        let rounded = workflow::completion_percentage(state, location_id, &self.config).round() as u32;
        rounded.min(99)
    }

    fn commit_projection(
        &mut self,
        state: &WorkflowState,
        location_id: &str,
        percentage: u32,
        fully_completed: bool,
    ) -> Result<(), StorageError> {
        let mut tx = StoreTransaction::new();

        let mut map = read_map(&self.storage);
        map.insert(location_id.to_string(), percentage);
        tx.stage_json(keys::SIMPLE_JOURNEY_PROGRESS, &map)?;

        if fully_completed {
            let mut learner = read_learner(&self.storage);
            if !learner.completed_locations.iter().any(|l| l == location_id) {
                learner.completed_locations.push(location_id.to_string());
                tx.stage_json(keys::USER_PROGRESS, &learner)?;
            }
            if let Some(journey) = self.config.catalog.journey_of(location_id) {
                let mut progress = read_journey(&self.storage, &journey.id);
                if !progress.contains(location_id) {
                    progress.completed_locations.push(location_id.to_string());
                    progress.total_locations = journey.locations.len() as u32;
                    tx.stage_json(keys::journey_progress(&journey.id), &progress)?;
                }
            }
        }

        let chat_done = state.chat_progress.get(location_id).is_some_and(|c| c.completed);
        let cards_done = state.flashcard_progress.get(location_id).is_some_and(|f| f.completed);
        let detail = LocationProgress {
            location_id: location_id.to_string(),
            completed_lessons: u32::from(chat_done) + u32::from(cards_done),
            total_lessons: LESSONS_PER_LOCATION,
            is_unlocked: fully_completed || self.evaluate_unlock(location_id).is_unlocked(),
        };
        tx.stage_json(keys::location_progress(location_id), &detail)?;

        tx.commit(&mut self.storage)?;
        debug!(location_id, percentage, fully_completed, "location progress synced");
        Ok(())
    }

    /// Learner level, completed locations from every record that keeps them,
    /// and the map percentages.
    pub fn unlock_snapshot(&self) -> UnlockSnapshot {
        let learner = read_learner(&self.storage);
        let mut snapshot = UnlockSnapshot::new(&learner, read_map(&self.storage));
        for journey in &self.config.catalog.journeys {
            let progress = read_journey(&self.storage, &journey.id);
            snapshot.completed.extend(
                progress
                    .completed_locations
                    .into_iter()
                    .filter(|id| journey.locations.iter().any(|l| &l.id == id)),
            );
        }
        snapshot
    }

    /// Unlock evaluation against an explicit level requirement.
    pub fn is_unlocked(&self, location_id: &str, required_level: u32) -> bool {
        unlock::is_unlocked(&self.unlock_snapshot(), &self.graph, location_id, required_level)
    }

    /// Unlock evaluation using the level the catalog requires. Locations the
    /// catalog does not know require level 1.
    pub fn evaluate_unlock(&self, location_id: &str) -> UnlockDecision {
        let required = self
            .config
            .catalog
            .location(location_id)
            .map_or(1, |l| l.required_level);
        unlock::evaluate(&self.unlock_snapshot(), &self.graph, location_id, required)
    }

    /// Every location of a journey in curriculum order. Unknown journeys give
    /// an empty list.
    pub fn location_overview(&self, journey_id: &str) -> Vec<LocationStatus> {
        let Some(journey) = self.config.catalog.journey(journey_id) else {
            return Vec::new();
        };
        let state = read_state(&self.storage);
        let snapshot = self.unlock_snapshot();
        journey
            .locations
            .iter()
            .map(|location| LocationStatus {
                location_id: location.id.clone(),
                name: location.name.clone(),
                percentage: self.map_percentage(&state, &location.id),
                fully_completed: workflow::is_fully_completed(&state, &location.id),
                unlock: unlock::evaluate(&snapshot, &self.graph, &location.id, location.required_level),
            })
            .collect()
    }

    fn status(&self, location_id: &str, percentage: u32, fully_completed: bool) -> LocationStatus {
        let name = self
            .config
            .catalog
            .location(location_id)
            .map_or_else(|| location_id.to_string(), |l| l.name.clone());
        LocationStatus {
            location_id: location_id.to_string(),
            name,
            percentage,
            fully_completed,
            unlock: self.evaluate_unlock(location_id),
        }
    }
}
