//! Tests for the simulator module.

use super::*;
use crate::geometry::GridPos;
use std::collections::VecDeque;
use std::sync::Arc;

const TEST_CODE: &[u8] = b"scripted test behavior";

/// Replays a fixed queue of decisions, then idles.
struct Scripted {
    decisions: VecDeque<Result<Decision, BehaviorError>>,
}

impl Scripted {
    fn idle() -> Box<dyn OrganismBehavior> {
        Box::new(Self {
            decisions: VecDeque::new(),
        })
    }

    fn with(decisions: Vec<Decision>) -> Box<dyn OrganismBehavior> {
        Box::new(Self {
            decisions: decisions.into_iter().map(Ok).collect(),
        })
    }

    fn failing(message: &str) -> Box<dyn OrganismBehavior> {
        Box::new(Self {
            decisions: VecDeque::from(vec![Err(BehaviorError::Decision(message.to_string()))]),
        })
    }
}

impl OrganismBehavior for Scripted {
    fn decide(&mut self, _observation: &Observation) -> Result<Decision, BehaviorError> {
        self.decisions
            .pop_front()
            .unwrap_or_else(|| Ok(Decision::idle()))
    }

    fn perform(&mut self, action: &ProposedAction) -> Result<serde_json::Value, BehaviorError> {
        Ok(serde_json::json!({ "performed": action.kind() }))
    }

    fn reflect(&mut self, outcomes: &[ActionOutcome]) -> Option<String> {
        if outcomes.is_empty() {
            None
        } else {
            Some(format!("{} outcomes", outcomes.len()))
        }
    }

    fn fork(&self) -> Box<dyn OrganismBehavior> {
        Scripted::idle()
    }
}

fn fingerprint() -> String {
    code_fingerprint(TEST_CODE)
}

fn config(name: &str) -> AgentConfig {
    AgentConfig::new(name, "Explore the dish. Rest when tired.").with_capability("walk")
}

fn organism(agent_id: &str, name: &str) -> Organism {
    Organism::birth(agent_id, config(name), fingerprint(), Scripted::idle())
        .expect("valid test organism")
}

/// First organism (by name suffix) whose genome maps to `archetype`.
fn organism_with_archetype(agent_id: &str, archetype: Archetype) -> Organism {
    for index in 0..1_000 {
        let candidate = organism(agent_id, &format!("probe-{index}"));
        if candidate.archetype() == archetype {
            return candidate;
        }
    }
    panic!("no probe config maps to {archetype:?}");
}

fn at(x: u32, y: u32) -> GridPos {
    GridPos::new(x, y)
}

/// A biome with one `width x height` dish called `dish-0`, an in-memory log
/// and a slicer over it.
fn world(
    width: u32,
    height: u32,
    abiotic: AbioticFactors,
) -> (Biome, Arc<InMemoryEventLog>, Slicer) {
    let mut biome = Biome::new("test-biome", abiotic).expect("valid abiotic factors");
    biome.add_dish("dish-0", width, height).expect("add dish");
    let log = InMemoryEventLog::shared();
    let slicer = Slicer::new(log.clone(), 7);
    (biome, log, slicer)
}

fn spawn(
    slicer: &mut Slicer,
    biome: &mut Biome,
    name: &str,
    energy: f64,
    behavior: Box<dyn OrganismBehavior>,
    pos: GridPos,
) -> AgentId {
    let agent_id = biome.allocate_agent_id();
    let organism = Organism::birth(agent_id, config(name), fingerprint(), behavior)
        .expect("valid organism")
        .with_energy(energy);
    slicer
        .place(biome, "dish-0", organism, pos)
        .expect("place organism")
}

fn events_of(log: &InMemoryEventLog, event_type: EventType) -> Vec<EvolutionaryEvent> {
    log.replay()
        .expect("replay")
        .into_iter()
        .filter(|event| event.event_type == event_type)
        .collect()
}

fn metabolic_entries(log: &InMemoryEventLog) -> Vec<EvolutionaryEvent> {
    events_of(log, EventType::Survival)
        .into_iter()
        .filter(|event| event.payload_str("kind") == Some("metabolic_action"))
        .collect()
}

/// In-memory log that refuses every event whose payload `kind` matches.
struct RefusingLog {
    inner: InMemoryEventLog,
    kind: &'static str,
}

impl RefusingLog {
    fn shared(kind: &'static str) -> Arc<Self> {
        Arc::new(Self {
            inner: InMemoryEventLog::new(),
            kind,
        })
    }
}

impl EventLog for RefusingLog {
    fn append(&self, event: &EvolutionaryEvent) -> Result<(), ObserverError> {
        if event.payload_str("kind") == Some(self.kind) {
            return Err(ObserverError::Io("disk full".to_string()));
        }
        self.inner.append(event)
    }

    fn replay(&self) -> Result<Vec<EvolutionaryEvent>, ObserverError> {
        self.inner.replay()
    }
}

mod identity;
mod slicer;
