// File: src/core/unlock.rs
//! Location unlock rules.
//!
//! Rules apply in order and the first one that decides wins:
//! a completed location stays open, a learner below the required level is
//! kept out, and otherwise every prerequisite must be at 100% on the map.

use crate::core::types::{LearnerProgress, LocationId, SimpleJourneyProgress};
use std::collections::{BTreeMap, BTreeSet};

/// Which locations must be finished before a location opens.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PrerequisiteGraph {
    requires: BTreeMap<LocationId, Vec<LocationId>>,
}

impl PrerequisiteGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert<I>(&mut self, location_id: &str, prerequisites: I)
    where
        I: IntoIterator<Item = LocationId>,
    {
        self.requires
            .insert(location_id.to_string(), prerequisites.into_iter().collect());
    }

    /// The positional chain older clients used: ids sorted as strings, each
    /// requiring the one sorted right before it.
    pub fn lexicographic<I, T>(ids: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<LocationId>,
    {
        let sorted: BTreeSet<LocationId> = ids.into_iter().map(Into::into).collect();
        let mut graph = Self::new();
        let mut previous: Option<&LocationId> = None;
        for id in &sorted {
            graph.insert(id, previous.cloned());
            previous = Some(id);
        }
        graph
    }

    /// Prerequisites of a location; unknown ids have none.
    pub fn prerequisites(&self, location_id: &str) -> &[LocationId] {
        self.requires
            .get(location_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

/// The learner state the rules look at.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UnlockSnapshot {
    pub level: u32,
    pub completed: BTreeSet<LocationId>,
    pub progress: SimpleJourneyProgress,
}

impl UnlockSnapshot {
    pub fn new(learner: &LearnerProgress, progress: SimpleJourneyProgress) -> Self {
        Self {
            level: learner.level,
            completed: learner.completed_locations.iter().cloned().collect(),
            progress,
        }
    }

    fn percentage(&self, location_id: &str) -> u32 {
        self.progress.get(location_id).copied().unwrap_or(0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnlockDecision {
    /// Already completed; completion never re-locks.
    Completed,
    LevelTooLow { required: u32, current: u32 },
    /// Level is sufficient and every prerequisite is finished.
    Open,
    AwaitingPrerequisite(LocationId),
}

impl UnlockDecision {
    pub fn is_unlocked(&self) -> bool {
        matches!(self, UnlockDecision::Completed | UnlockDecision::Open)
    }
}

pub fn evaluate(
    snapshot: &UnlockSnapshot,
    graph: &PrerequisiteGraph,
    location_id: &str,
    required_level: u32,
) -> UnlockDecision {
    if snapshot.completed.contains(location_id) {
        return UnlockDecision::Completed;
    }
    if snapshot.level < required_level {
        return UnlockDecision::LevelTooLow {
            required: required_level,
            current: snapshot.level,
        };
    }
    match graph
        .prerequisites(location_id)
        .iter()
        .find(|p| snapshot.percentage(p) != 100)
    {
        Some(pending) => UnlockDecision::AwaitingPrerequisite(pending.clone()),
        None => UnlockDecision::Open,
    }
}

pub fn is_unlocked(
    snapshot: &UnlockSnapshot,
    graph: &PrerequisiteGraph,
    location_id: &str,
    required_level: u32,
) -> bool {
    evaluate(snapshot, graph, location_id, required_level).is_unlocked()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(level: u32, completed: &[&str], progress: &[(&str, u32)]) -> UnlockSnapshot {
        UnlockSnapshot {
            level,
            completed: completed.iter().map(|s| s.to_string()).collect(),
            progress: progress.iter().map(|&(k, v)| (k.to_string(), v)).collect(),
        }
    }

    fn city_chain() -> PrerequisiteGraph {
        let mut graph = PrerequisiteGraph::new();
        graph.insert("restaurant", Vec::new());
        graph.insert("hotel", ["restaurant".to_string()]);
        graph.insert("hospital", ["hotel".to_string()]);
        graph
    }

    #[test]
    fn test_level_gate_short_circuits() {
        let snap = snapshot(2, &[], &[("restaurant", 100)]);
        assert_eq!(
            evaluate(&snap, &city_chain(), "hotel", 3),
            UnlockDecision::LevelTooLow { required: 3, current: 2 }
        );
    }

    #[test]
    fn test_completed_location_stays_open_below_level() {
        let snap = snapshot(1, &["hospital"], &[]);
        assert!(is_unlocked(&snap, &city_chain(), "hospital", 9));
    }

    #[test]
    fn test_first_location_is_open() {
        let snap = snapshot(1, &[], &[]);
        assert_eq!(evaluate(&snap, &city_chain(), "restaurant", 1), UnlockDecision::Open);
    }

    #[test]
    fn test_prerequisite_must_be_full() {
        let graph = city_chain();
        let snap = snapshot(3, &[], &[("restaurant", 95)]);
        assert_eq!(
            evaluate(&snap, &graph, "hotel", 1),
            UnlockDecision::AwaitingPrerequisite("restaurant".to_string())
        );
        let snap = snapshot(3, &[], &[("restaurant", 100)]);
        assert!(is_unlocked(&snap, &graph, "hotel", 1));
    }

    #[test]
    fn test_multiple_prerequisites_all_required() {
        let mut graph = PrerequisiteGraph::new();
        graph.insert("customs", ["security".to_string(), "boarding".to_string()]);
        let snap = snapshot(5, &[], &[("security", 100), ("boarding", 50)]);
        assert_eq!(
            evaluate(&snap, &graph, "customs", 1),
            UnlockDecision::AwaitingPrerequisite("boarding".to_string())
        );
    }

    #[test]
    fn test_lexicographic_chain_follows_string_order() {
        let graph = PrerequisiteGraph::lexicographic(["restaurant", "airport", "hotel"]);
        assert!(graph.prerequisites("airport").is_empty());
        assert_eq!(graph.prerequisites("hotel"), ["airport".to_string()]);
        assert_eq!(graph.prerequisites("restaurant"), ["hotel".to_string()]);
    }

    #[test]
    fn test_unknown_location_has_no_prerequisites() {
        let snap = snapshot(1, &[], &[]);
        assert!(is_unlocked(&snap, &city_chain(), "museum", 1));
    }

    #[test]
    fn test_lexicographic_chain_gates_on_predecessor() {
        let graph = PrerequisiteGraph::lexicographic(["restaurant", "airport", "hotel"]);

        let snap = snapshot(1, &[], &[]);
        assert_eq!(evaluate(&snap, &graph, "airport", 1), UnlockDecision::Open);
        assert_eq!(evaluate(&snap, &graph, "museum", 1), UnlockDecision::Open);

        let snap = snapshot(1, &[], &[("airport", 99)]);
        assert_eq!(
            evaluate(&snap, &graph, "hotel", 1),
            UnlockDecision::AwaitingPrerequisite("airport".to_string())
        );

        let snap = snapshot(1, &[], &[("airport", 100)]);
        assert_eq!(evaluate(&snap, &graph, "hotel", 1), UnlockDecision::Open);
        assert_eq!(
            evaluate(&snap, &graph, "restaurant", 1),
            UnlockDecision::AwaitingPrerequisite("hotel".to_string())
        );
    }
}
