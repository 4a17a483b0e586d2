//! Family tree rebuilt from a replayed event log.
//!
//! Agent ids restart with every run, so a log shared by several runs is read
//! as a sequence of sessions. A `session_end` marker closes the current
//! session and the next `spawn` opens a new one; the survivor events written
//! after the marker still belong to the closing session. A second `spawn`
//! for an id already born in the open session also starts a new one (a run
//! that ended without its marker). Records are keyed by
//! `(session, agent_id)`.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::events::{EventType, EvolutionaryEvent};
use super::reaper::DeathType;
use super::types::{AgentId, GenomeId};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeathRecord {
    pub timestamp: String,
    pub death_type: Option<DeathType>,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineageRecord {
    /// Ordinal of the session the organism lived in, from 0.
    pub session: u32,
    pub agent_id: AgentId,
    /// Genome at birth.
    pub birth_genome_id: GenomeId,
    /// Latest genome, after any mutations.
    pub genome_id: GenomeId,
    pub parent_id: Option<GenomeId>,
    pub generation: u32,
    pub lineage_path: Vec<GenomeId>,
    pub born_at: Option<String>,
    pub death: Option<DeathRecord>,
}

impl LineageRecord {
    fn from_event(session: u32, event: &EvolutionaryEvent) -> Self {
        Self {
            session,
            agent_id: event.agent_id.clone(),
            birth_genome_id: event.genome_id.clone(),
            genome_id: event.genome_id.clone(),
            parent_id: event.parent_id.clone(),
            generation: event.generation,
            lineage_path: event.lineage_path.clone(),
            born_at: None,
            death: None,
        }
    }

    pub fn is_alive(&self) -> bool {
        self.death.is_none()
    }

    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }
}

type RecordKey = (u32, AgentId);

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LineageIndex {
    records: BTreeMap<RecordKey, LineageRecord>,
    birth_order: Vec<RecordKey>,
    /// Latest session each agent id appeared in.
    latest: BTreeMap<AgentId, u32>,
    session: u32,
    closed: bool,
}

impl LineageIndex {
    pub fn from_events(events: &[EvolutionaryEvent]) -> Self {
        let mut index = Self::default();
        for event in events {
            index.apply(event);
        }
        index
    }

    /// Fold one event into the index.
    pub fn apply(&mut self, event: &EvolutionaryEvent) {
        if event.is_session_marker() {
            self.closed = true;
            return;
        }
        if event.event_type == EventType::Spawn {
            let reborn = self
                .records
                .get(&(self.session, event.agent_id.clone()))
                .is_some_and(|record| record.born_at.is_some());
            if (self.closed || reborn) && self.has_records_in(self.session) {
                self.session += 1;
            }
            self.closed = false;
        }

        let session = self.session;
        let key = (session, event.agent_id.clone());
        if !self.records.contains_key(&key) {
            self.birth_order.push(key.clone());
        }
        self.latest.insert(event.agent_id.clone(), session);
        let record = self
            .records
            .entry(key)
            .or_insert_with(|| LineageRecord::from_event(session, event));
        match event.event_type {
            EventType::Spawn => {
                record.birth_genome_id = event.genome_id.clone();
                record.born_at = Some(event.timestamp.clone());
            }
            EventType::Death => {
                record.death = Some(DeathRecord {
                    timestamp: event.timestamp.clone(),
                    death_type: event
                        .payload
                        .get("death_type")
                        .and_then(|value| serde_json::from_value(value.clone()).ok()),
                    reason: event.payload_str("reason").map(str::to_string),
                });
            }
            _ => {}
        }
        record.genome_id = event.genome_id.clone();
        record.lineage_path = event.lineage_path.clone();
        record.generation = event.generation;
        record.parent_id = event.parent_id.clone();
    }

    fn has_records_in(&self, session: u32) -> bool {
        self.birth_order
            .last()
            .is_some_and(|(last, _)| *last == session)
    }

    /// The organism's record from the latest session it appeared in.
    pub fn get(&self, agent_id: &str) -> Option<&LineageRecord> {
        let session = *self.latest.get(agent_id)?;
        self.get_in_session(session, agent_id)
    }

    pub fn get_in_session(&self, session: u32, agent_id: &str) -> Option<&LineageRecord> {
        self.records.get(&(session, agent_id.to_string()))
    }

    /// Organisms across every session.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Number of sessions holding at least one organism.
    pub fn session_count(&self) -> u32 {
        self.last_session().map_or(0, |session| session + 1)
    }

    pub fn last_session(&self) -> Option<u32> {
        self.birth_order.last().map(|(session, _)| *session)
    }

    /// Records in order of first appearance, across sessions.
    pub fn records(&self) -> impl Iterator<Item = &LineageRecord> {
        self.birth_order
            .iter()
            .filter_map(|key| self.records.get(key))
    }

    pub fn session_records(&self, session: u32) -> Vec<&LineageRecord> {
        self.records()
            .filter(|record| record.session == session)
            .collect()
    }

    pub fn roots(&self) -> Vec<&LineageRecord> {
        self.records().filter(|record| record.is_root()).collect()
    }

    pub fn children_of(&self, genome_id: &str) -> Vec<&LineageRecord> {
        self.records()
            .filter(|record| record.parent_id.as_deref() == Some(genome_id))
            .collect()
    }

    /// Genome path from the root ancestor to the organism's latest genome,
    /// in the latest session the id appeared in.
    pub fn ancestry(&self, agent_id: &str) -> Option<&[GenomeId]> {
        self.get(agent_id)
            .map(|record| record.lineage_path.as_slice())
    }

    pub fn living(&self) -> Vec<&LineageRecord> {
        self.records().filter(|record| record.is_alive()).collect()
    }

    pub fn dead(&self) -> Vec<&LineageRecord> {
        self.records().filter(|record| !record.is_alive()).collect()
    }

    /// Records whose lineage path does not line up with their parent and
    /// own genome.
    pub fn inconsistencies(&self) -> Vec<AgentId> {
        self.records()
            .filter(|record| {
                let path = &record.lineage_path;
                if path.last() != Some(&record.genome_id) || !path.contains(&record.birth_genome_id)
                {
                    return true;
                }
                match &record.parent_id {
                    None => record.generation != 0,
                    Some(parent) => record.generation == 0 || !path.contains(parent),
                }
            })
            .map(|record| record.agent_id.clone())
            .collect()
    }
}
