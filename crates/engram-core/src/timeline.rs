//! # Observation Timeline
//!
//! Chronological retrieval of an entity's observations, filtered by an
//! inclusive time window, an observation type, and a tag set.

use crate::types::{EngramError, Observation};
use chrono::{DateTime, Utc};

impl crate::GraphStore {
    /// Retrieve an entity's observations sorted by timestamp ascending.
    ///
    /// `start`/`end` bound the window inclusively; `None` leaves that
    /// side unbounded. A non-empty `observation_type` must match exactly;
    /// a non-empty `tags` list matches observations sharing at least one
    /// tag. An unknown entity id is an error.
    pub fn entity_timeline(
        &self,
        entity_id: &str,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
        observation_type: &str,
        tags: &[String],
    ) -> Result<Vec<Observation>, EngramError> {
        let graph = self.graph().read();

        if !graph.entities.contains_key(entity_id) {
            return Err(EngramError::NotFound(format!(
                "entity with id {entity_id} does not exist"
            )));
        }

        let mut timeline: Vec<Observation> = Vec::new();
        for observation in graph.observations.values() {
            if observation.entity_id != entity_id {
                continue;
            }

            let timestamp = observation.timestamp.unwrap_or(DateTime::UNIX_EPOCH);
            if start.is_some_and(|window_start| timestamp < window_start) {
                continue;
            }
            if end.is_some_and(|window_end| timestamp > window_end) {
                continue;
            }

            if !observation_type.is_empty() && observation.observation_type != observation_type {
                continue;
            }

            if !tags.is_empty() && !tags.iter().any(|tag| observation.tags.contains(tag)) {
                continue;
            }

            timeline.push(observation.clone());
        }

        timeline.sort_by_key(|observation| observation.timestamp);
        Ok(timeline)
    }
}

// =============================================================================
// TESTS
// =============================================================================
