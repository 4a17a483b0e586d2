//! Immutable evolutionary events: the scientific record of every lifecycle
//! transition.

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use super::types::{AgentId, GenomeId, SESSION_END_AGENT_ID, SESSION_END_GENOME_ID};

// ============================================================================
// Event Types
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    Spawn,
    Mutate,
    GymEval,
    Death,
    Survival,
    SessionEnd,
}

impl EventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::Spawn => "spawn",
            EventType::Mutate => "mutate",
            EventType::GymEval => "gym_eval",
            EventType::Death => "death",
            EventType::Survival => "survival",
            EventType::SessionEnd => "session_end",
        }
    }
}

/// Fitness data attached to an event. `score` may be null when an
/// evaluation produced only auxiliary metrics.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FitnessMetrics {
    #[serde(default)]
    pub score: Option<f64>,
    #[serde(default)]
    pub metrics: BTreeMap<String, f64>,
}

impl FitnessMetrics {
    pub fn score(score: f64) -> Self {
        Self {
            score: Some(score),
            metrics: BTreeMap::new(),
        }
    }

    pub fn with_metric(mut self, name: impl Into<String>, value: f64) -> Self {
        self.metrics.insert(name.into(), value);
        self
    }
}

// ============================================================================
// Event Record
// ============================================================================

/// One line of the event log. Never edited once appended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvolutionaryEvent {
    /// UTC, RFC 3339 with microseconds and a `Z` suffix; sorts lexically.
    pub timestamp: String,
    pub genome_id: GenomeId,
    pub parent_id: Option<GenomeId>,
    pub generation: u32,
    pub event_type: EventType,
    #[serde(default)]
    pub payload: BTreeMap<String, Value>,
    #[serde(default)]
    pub fitness: Option<FitnessMetrics>,
    pub agent_id: AgentId,
    #[serde(default)]
    pub lineage_path: Vec<GenomeId>,
}

pub fn utc_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

impl EvolutionaryEvent {
    /// The session boundary marker, the only event without an organism author.
    pub fn session_end(payload: BTreeMap<String, Value>) -> Self {
        Self {
            timestamp: utc_timestamp(),
            genome_id: SESSION_END_GENOME_ID.to_string(),
            parent_id: None,
            generation: 0,
            event_type: EventType::SessionEnd,
            payload,
            fitness: None,
            agent_id: SESSION_END_AGENT_ID.to_string(),
            lineage_path: Vec::new(),
        }
    }

    pub fn with_payload(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.payload.insert(key.into(), value.into());
        self
    }

    pub fn with_fitness(mut self, fitness: FitnessMetrics) -> Self {
        self.fitness = Some(fitness);
        self
    }

    pub fn fitness_score(&self) -> Option<f64> {
        self.fitness.as_ref().and_then(|fitness| fitness.score)
    }

    pub fn payload_str(&self, key: &str) -> Option<&str> {
        self.payload.get(key).and_then(Value::as_str)
    }

    pub fn is_session_marker(&self) -> bool {
        self.event_type == EventType::SessionEnd && self.genome_id == SESSION_END_GENOME_ID
    }
}
