// src/core/types.rs
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Identifier of a themed lesson unit, e.g. "restaurant".
pub type LocationId = String;
pub type JourneyId = String;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    #[default]
    Male,
    Female,
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Gender::Male => f.write_str("male"),
            Gender::Female => f.write_str("female"),
        }
    }
}

/// The learner's cosmetic choices.
/// A `custom_image` overrides the generated face/gender composite wherever the
/// avatar is shown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvatarProfile {
    pub face: String,
    pub hair: String,
    pub clothes: String,
    pub gender: Gender,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_image: Option<String>,
}

impl Default for AvatarProfile {
    fn default() -> Self {
        Self {
            face: "face1".to_string(),
            hair: "hair1".to_string(),
            clothes: "clothes1".to_string(),
            gender: Gender::Male,
            custom_image: None,
        }
    }
}

impl AvatarProfile {
    /// The custom image, ignoring an empty string left behind by older clients.
    pub fn custom_image_url(&self) -> Option<&str> {
        self.custom_image.as_deref().filter(|url| !url.is_empty())
    }
}

/// Login identity. `avatar` is a cached URL, never a source of truth.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserIdentity {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub avatar: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChatProgress {
    pub completed: bool,
    pub score: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlashcardProgress {
    pub completed: bool,
    /// Indices of the cards the learner marked as remembered.
    pub remembered_cards: BTreeSet<u32>,
}

/// The session aggregate: avatar plus all per-location activity progress.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct WorkflowState {
    pub avatar: AvatarProfile,
    pub current_location: Option<LocationId>,
    pub chat_progress: BTreeMap<LocationId, ChatProgress>,
    pub flashcard_progress: BTreeMap<LocationId, FlashcardProgress>,
}

/// Completed locations of one journey. `completed_locations` keeps insertion
/// order and never holds duplicates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JourneyProgress {
    pub journey_id: JourneyId,
    #[serde(default)]
    pub completed_locations: Vec<LocationId>,
    #[serde(default)]
    pub total_locations: u32,
}

impl JourneyProgress {
    pub fn new(journey_id: &str) -> Self {
        Self {
            journey_id: journey_id.to_string(),
            completed_locations: Vec::new(),
            total_locations: 0,
        }
    }

    pub fn contains(&self, location_id: &str) -> bool {
        self.completed_locations.iter().any(|l| l == location_id)
    }
}

/// Lesson-level detail of one location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationProgress {
    pub location_id: LocationId,
    #[serde(default)]
    pub completed_lessons: u32,
    #[serde(default)]
    pub total_lessons: u32,
    #[serde(default)]
    pub is_unlocked: bool,
}

impl LocationProgress {
    pub fn new(location_id: &str) -> Self {
        Self {
            location_id: location_id.to_string(),
            completed_lessons: 0,
            total_lessons: 0,
            is_unlocked: false,
        }
    }
}

/// Coarse per-location percentages shown on the world map.
pub type SimpleJourneyProgress = BTreeMap<LocationId, u32>;

/// Level, xp and achievements of the learner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LearnerProgress {
    pub level: u32,
    pub xp: u64,
    pub completed_locations: Vec<LocationId>,
    pub current_streak: u32,
    pub badges: Vec<String>,
}

impl Default for LearnerProgress {
    fn default() -> Self {
        Self {
            level: 1,
            xp: 0,
            completed_locations: Vec::new(),
            current_streak: 0,
            badges: Vec::new(),
        }
    }
}
