// File: src/config.rs
//! Tunables of the progress model and the curriculum catalog.
//!
//! Everything is optional in the JSON file; missing fields take the values the
//! web app hardcoded.

use crate::core::unlock::PrerequisiteGraph;
use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

pub const CARDS_PER_LOCATION: usize = 10;
pub const CHAT_WEIGHT: u32 = 50;
pub const DEFAULT_PLACEHOLDER_AVATAR: &str =
    "https://ugc.same-assets.com/7zP4_sZbv34rMijHgssmeEzsEDxkK-cw.jpeg";
pub const DEFAULT_AVATAR_PREVIEW_ROOT: &str = "/avatars/preview";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ProgressConfig {
    /// A flashcard set is complete once this many distinct cards are remembered.
    pub cards_per_location: usize,
    /// Points a finished chat contributes to a location; flashcards share the rest.
    pub chat_weight: u32,
    pub placeholder_avatar: String,
    pub avatar_preview_root: String,
    pub catalog: Catalog,
}

impl Default for ProgressConfig {
    fn default() -> Self {
        Self {
            cards_per_location: CARDS_PER_LOCATION,
            chat_weight: CHAT_WEIGHT,
            placeholder_avatar: DEFAULT_PLACEHOLDER_AVATAR.to_string(),
            avatar_preview_root: DEFAULT_AVATAR_PREVIEW_ROOT.to_string(),
            catalog: Catalog::default(),
        }
    }
}

impl ProgressConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        let config: ProgressConfig = serde_json::from_str(&raw)?;
        config.catalog.validate()?;
        Ok(config)
    }

    /// Points the flashcard half of a location is worth.
    pub fn flashcard_weight(&self) -> u32 {
        100u32.saturating_sub(self.chat_weight.min(100))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationSpec {
    pub id: String,
    pub name: String,
    #[serde(default = "default_required_level")]
    pub required_level: u32,
    /// Locations that must reach 100% before this one opens.
    #[serde(default)]
    pub prerequisites: Vec<String>,
}

fn default_required_level() -> u32 {
    1
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Journey {
    pub id: String,
    pub title: String,
    pub locations: Vec<LocationSpec>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Catalog {
    pub journeys: Vec<Journey>,
}

impl Catalog {
    pub fn journey(&self, journey_id: &str) -> Option<&Journey> {
        self.journeys.iter().find(|j| j.id == journey_id)
    }

    pub fn location(&self, location_id: &str) -> Option<&LocationSpec> {
        self.journeys
            .iter()
            .flat_map(|j| j.locations.iter())
            .find(|l| l.id == location_id)
    }

    /// The journey a location belongs to.
    pub fn journey_of(&self, location_id: &str) -> Option<&Journey> {
        self.journeys
            .iter()
            .find(|j| j.locations.iter().any(|l| l.id == location_id))
    }

    pub fn prerequisite_graph(&self) -> PrerequisiteGraph {
        let mut graph = PrerequisiteGraph::new();
        for location in self.journeys.iter().flat_map(|j| j.locations.iter()) {
            graph.insert(&location.id, location.prerequisites.iter().cloned());
        }
        graph
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut seen = HashSet::new();
        for location in self.journeys.iter().flat_map(|j| j.locations.iter()) {
            if !seen.insert(location.id.as_str()) {
                return Err(ConfigError::DuplicateLocation(location.id.clone()));
            }
        }
        for location in self.journeys.iter().flat_map(|j| j.locations.iter()) {
            if let Some(missing) = location
                .prerequisites
                .iter()
                .find(|p| !seen.contains(p.as_str()))
            {
                return Err(ConfigError::UnknownPrerequisite {
                    location: location.id.clone(),
                    prerequisite: missing.clone(),
                });
            }
        }
        Ok(())
    }
}

fn chain(specs: &[(&str, &str, u32)]) -> Vec<LocationSpec> {
    let mut previous: Option<&str> = None;
    specs
        .iter()
        .map(|&(id, name, required_level)| {
            let location = LocationSpec {
                id: id.to_string(),
                name: name.to_string(),
                required_level,
                prerequisites: previous.map(|p| vec![p.to_string()]).unwrap_or_default(),
            };
            previous = Some(id);
            location
        })
        .collect()
}

impl Default for Catalog {
    fn default() -> Self {
        Self {
            journeys: vec![
                Journey {
                    id: "city".to_string(),
                    title: "Multicultural City Adventure".to_string(),
                    locations: chain(&[
                        ("restaurant", "Restaurant", 1),
                        ("hotel", "Hotel", 2),
                        ("supermarket", "Supermarket", 2),
                        ("hospital", "Hospital", 3),
                    ]),
                },
                Journey {
                    id: "airport".to_string(),
                    title: "International Airport Discovery".to_string(),
                    locations: chain(&[
                        ("check-in", "Check-in Desk", 1),
                        ("security", "Security Control", 1),
                        ("boarding", "Boarding Gate", 2),
                        ("customs", "Customs", 3),
                    ]),
                },
            ],
        }
    }
}
