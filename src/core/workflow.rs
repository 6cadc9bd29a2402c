// File: src/core/workflow.rs
//! The canonical progress aggregate, stored under `workflowState`.
//!
//! Chat and flashcard activities write here first; every other progress shape
//! (the world-map percentages, completed-location lists) is projected from it.

use crate::config::ProgressConfig;
use crate::core::types::{AvatarProfile, ChatProgress, FlashcardProgress, WorkflowState};
use crate::storage::{keys, load_json, persist, KeyValueStore};
use std::collections::BTreeSet;
use tracing::warn;

pub(crate) fn read_state<S: KeyValueStore + ?Sized>(storage: &S) -> WorkflowState {
    load_json(storage, keys::WORKFLOW_STATE).unwrap_or_default()
}

/// True iff both the chat and the flashcard set of the location are done.
pub fn is_fully_completed(state: &WorkflowState, location_id: &str) -> bool {
    let chat_done = state
        .chat_progress
        .get(location_id)
        .is_some_and(|c| c.completed);
    let cards_done = state
        .flashcard_progress
        .get(location_id)
        .is_some_and(|f| f.completed);
    chat_done && cards_done
}

/// Chat is worth `chat_weight` points, all or nothing; flashcards earn the
/// remaining points in proportion to the cards remembered.
pub fn completion_percentage(state: &WorkflowState, location_id: &str, config: &ProgressConfig) -> f64 {
    let chat = state.chat_progress.get(location_id);
    let cards = state.flashcard_progress.get(location_id);

    let mut progress = 0.0;
    if chat.is_some_and(|c| c.completed) {
        progress += f64::from(config.chat_weight.min(100));
    }
    if let Some(cards) = cards {
        if config.cards_per_location > 0 {
            let ratio = cards.remembered_cards.len() as f64 / config.cards_per_location as f64;
            progress += ratio.min(1.0) * f64::from(config.flashcard_weight());
        }
    }
    progress.min(100.0)
}

pub struct WorkflowStore<'a, S: KeyValueStore + ?Sized> {
    storage: &'a mut S,
    config: &'a ProgressConfig,
}

impl<'a, S: KeyValueStore + ?Sized> WorkflowStore<'a, S> {
    pub fn new(storage: &'a mut S, config: &'a ProgressConfig) -> Self {
        Self { storage, config }
    }

    pub fn read(&self) -> WorkflowState {
        read_state(&*self.storage)
    }

    pub fn write(&mut self, state: &WorkflowState) -> bool {
        persist(&mut *self.storage, keys::WORKFLOW_STATE, state)
    }

    pub fn update_avatar(&mut self, avatar: AvatarProfile) -> bool {
        let mut state = self.read();
        state.avatar = avatar;
        self.write(&state)
    }

    pub fn set_current_location(&mut self, location_id: &str) -> bool {
        let mut state = self.read();
        state.current_location = Some(location_id.to_string());
        self.write(&state)
    }

    pub fn record_chat_progress(&mut self, location_id: &str, completed: bool, score: f64) -> bool {
        let mut state = self.read();
        state
            .chat_progress
            .insert(location_id.to_string(), ChatProgress { completed, score });
        self.write(&state)
    }

    /// Stores the remembered card indices of a location. Indices outside the
    /// location's card range are dropped; the set is complete once every card
    /// is remembered.
    pub fn record_flashcard_progress<I>(&mut self, location_id: &str, remembered: I) -> bool
    where
        I: IntoIterator<Item = u32>,
    {
        let total = self.config.cards_per_location;
        let (remembered_cards, out_of_range): (BTreeSet<u32>, BTreeSet<u32>) = remembered
            .into_iter()
            .partition(|&index| (index as usize) < total);
        if !out_of_range.is_empty() {
            warn!(location_id, ?out_of_range, total, "ignoring card indices outside the deck");
        }

        let mut state = self.read();
        let completed = total > 0 && remembered_cards.len() == total;
        state.flashcard_progress.insert(
            location_id.to_string(),
            FlashcardProgress {
                completed,
                remembered_cards,
            },
        );
        self.write(&state)
    }

    pub fn is_location_fully_completed(&self, location_id: &str) -> bool {
        is_fully_completed(&self.read(), location_id)
    }

    pub fn location_completion_percentage(&self, location_id: &str) -> f64 {
        completion_percentage(&self.read(), location_id, self.config)
    }
}
