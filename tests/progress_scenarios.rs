use verse_core::config::ProgressConfig;
use verse_core::core::avatar::AvatarStore;
use verse_core::core::types::{AvatarProfile, Gender, UserIdentity, WorkflowState};
use verse_core::core::unlock::UnlockDecision;
use verse_core::error::StorageError;
use verse_core::storage::keys;
use verse_core::{KeyValueStore, MemoryStore, ProgressEngine};

fn engine() -> ProgressEngine<MemoryStore> {
    ProgressEngine::new(MemoryStore::new(), ProgressConfig::default())
}

fn login(engine: &mut ProgressEngine<impl KeyValueStore>) {
    engine.user().write(&UserIdentity {
        email: "an@example.com".to_string(),
        name: "An".to_string(),
        role: "A".to_string(),
        avatar: String::new(),
    });
}

#[test]
fn fresh_workflow_state_is_empty() {
    let mut engine = engine();
    let state = engine.workflow().read();
    assert_eq!(state, WorkflowState::default());
    assert_eq!(state.avatar, AvatarProfile::default());
    assert!(state.current_location.is_none());
    assert!(state.chat_progress.is_empty());
    assert!(state.flashcard_progress.is_empty());
}

#[test]
fn chat_alone_is_half_a_location() {
    let mut engine = engine();
    engine.workflow().record_chat_progress("restaurant", true, 90.0);
    assert_eq!(engine.workflow().location_completion_percentage("restaurant"), 50.0);
}

#[test]
fn chat_and_half_the_cards_is_three_quarters() {
    let mut engine = engine();
    engine.workflow().record_chat_progress("restaurant", true, 90.0);
    engine.workflow().record_flashcard_progress("restaurant", [0, 1, 2, 3, 4]);
    assert_eq!(engine.workflow().location_completion_percentage("restaurant"), 75.0);
}

#[test]
fn avatar_update_reaches_identity_and_workflow() {
    let mut engine = engine();
    login(&mut engine);
    assert!(engine.user().update_avatar("https://example/img.png"));

    let stored: UserIdentity =
        serde_json::from_str(&engine.storage().get(keys::USER).unwrap()).unwrap();
    assert_eq!(stored.avatar, "https://example/img.png");
    assert_eq!(
        engine.workflow().read().avatar.custom_image.as_deref(),
        Some("https://example/img.png")
    );
    assert_eq!(engine.user().read().unwrap().avatar, "https://example/img.png");
}

#[test]
fn level_gate_wins_over_ordering() {
    let mut engine = engine();
    engine.learner().set_level(2);
    engine.learner().update_location_progress("restaurant", 100);
    assert!(!engine.is_unlocked("hotel", 3));
    assert!(engine.is_unlocked("hotel", 2));
}

#[test]
fn marking_a_location_twice_matches_marking_once() {
    let mut engine = engine();
    engine.journeys().mark_location_completed("city", "hotel");
    let once = engine.journeys().read("city");
    engine.journeys().mark_location_completed("city", "hotel");
    assert_eq!(engine.journeys().read("city"), once);
}

#[test]
fn flashcard_set_completes_only_with_all_ten() {
    let mut engine = engine();
    engine.workflow().record_flashcard_progress("hotel", 0..10);
    assert!(engine.workflow().read().flashcard_progress["hotel"].completed);
    for size in 0..10 {
        engine.workflow().record_flashcard_progress("hotel", 0..size);
        assert!(!engine.workflow().read().flashcard_progress["hotel"].completed);
    }
}

#[test]
fn completed_location_never_relocks() {
    let mut engine = engine();
    engine.finish_chat("hotel", 60.0);
    engine.review_flashcards("hotel", 0..10);
    assert!(engine.is_unlocked("hotel", 99));

    engine.learner().set_level(1);
    engine.review_flashcards("hotel", [0, 1]);
    assert!(engine.is_unlocked("hotel", 99));
    assert_eq!(engine.evaluate_unlock("hotel"), UnlockDecision::Completed);
}

#[test]
fn generated_avatar_is_used_until_a_custom_image_exists() {
    let mut engine = engine();
    login(&mut engine);
    engine.avatar().write(&AvatarProfile {
        face: "face3".to_string(),
        gender: Gender::Female,
        ..AvatarProfile::default()
    });
    assert_eq!(engine.user().read().unwrap().avatar, "/avatars/preview/female/face3.png");

    engine.avatar().write(&AvatarProfile {
        face: "face3".to_string(),
        gender: Gender::Female,
        custom_image: Some("https://cdn/me.jpg".to_string()),
        ..AvatarProfile::default()
    });
    assert_eq!(engine.user().read().unwrap().avatar, "https://cdn/me.jpg");
    let profile = engine.avatar().read();
    assert_eq!(engine.avatar().derived_image_url(&profile), "https://cdn/me.jpg");
}

#[test]
fn malformed_records_fall_back_to_defaults() {
    let mut storage = MemoryStore::new();
    for key in [keys::AVATAR_STATE, keys::WORKFLOW_STATE, keys::USER_PROGRESS, keys::SIMPLE_JOURNEY_PROGRESS] {
        storage.set(key, "}{".to_string()).unwrap();
    }
    storage.set(&keys::journey_progress("city"), "null".to_string()).unwrap();

    let config = ProgressConfig::default();
    assert_eq!(AvatarStore::new(&mut storage, &config).read(), AvatarProfile::default());

    let mut engine = ProgressEngine::new(storage, config);
    assert_eq!(engine.workflow().read(), WorkflowState::default());
    assert_eq!(engine.learner().read().level, 1);
    assert!(engine.learner().journey_map().is_empty());
    assert!(engine.journeys().read("city").completed_locations.is_empty());
    assert!(engine.is_unlocked("restaurant", 1));
}

/// Rejects every write to one key, like a browser profile whose quota runs
/// out halfway through a multi-record update.
struct FailingStore {
    inner: MemoryStore,
    failing_key: &'static str,
}

impl KeyValueStore for FailingStore {
    fn get(&self, key: &str) -> Option<String> {
        self.inner.get(key)
    }

    fn set(&mut self, key: &str, value: String) -> Result<(), StorageError> {
        if key == self.failing_key {
            return Err(StorageError::QuotaExceeded {
                key: key.to_string(),
                needed: value.len(),
                limit: 0,
            });
        }
        self.inner.set(key, value)
    }

    fn remove(&mut self, key: &str) -> Result<(), StorageError> {
        self.inner.remove(key)
    }
}

#[test]
fn failed_avatar_update_leaves_both_stores_untouched() {
    let storage = FailingStore {
        inner: MemoryStore::new(),
        failing_key: keys::WORKFLOW_STATE,
    };
    let mut engine = ProgressEngine::new(storage, ProgressConfig::default());
    login(&mut engine);
    let before = engine.storage().get(keys::USER);

    assert!(!engine.user().update_avatar("https://example/new.png"));

    assert_eq!(engine.storage().get(keys::USER), before);
    assert!(engine.storage().get(keys::WORKFLOW_STATE).is_none());
    assert_ne!(engine.user().read().unwrap().avatar, "https://example/new.png");
}

#[test]
fn failed_projection_keeps_canonical_progress() {
    let storage = FailingStore {
        inner: MemoryStore::new(),
        failing_key: keys::USER_PROGRESS,
    };
    let mut engine = ProgressEngine::new(storage, ProgressConfig::default());
    engine.finish_chat("restaurant", 75.0);
    let status = engine.review_flashcards("restaurant", 0..10);

    assert!(status.fully_completed);
    assert!(engine.workflow().is_location_fully_completed("restaurant"));
    // The map write was part of the rolled back transaction.
    assert_eq!(engine.learner().journey_map().get("restaurant"), Some(&50));
    assert!(engine.journeys().read("city").completed_locations.is_empty());
}
