#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Arc;

use agent_biome::{
    code_fingerprint, AbioticFactors, AgentConfig, BehaviorError, Biome, Decision, EventLog,
    FileEventLog, GridPos, Observation, Organism, OrganismBehavior, ProposedAction, SharedEventLog, Slicer,
    MOORE_OFFSETS,
};

pub const DISH: &str = "dish-0";

/// Plays back a fixed list of decisions, then idles.
pub struct Script {
    decisions: VecDeque<Decision>,
}

impl Script {
    pub fn boxed(decisions: Vec<Decision>) -> Box<dyn OrganismBehavior> {
        Box::new(Self {
            decisions: decisions.into(),
        })
    }

    pub fn idle() -> Box<dyn OrganismBehavior> {
        Self::boxed(Vec::new())
    }
}

impl OrganismBehavior for Script {
    fn decide(&mut self, _observation: &Observation) -> Result<Decision, BehaviorError> {
        Ok(self.decisions.pop_front().unwrap_or_else(Decision::idle))
    }

    fn fork(&self) -> Box<dyn OrganismBehavior> {
        Self::idle()
    }
}

/// Seeds with rich neighbors, rests when low, otherwise walks the Moore ring.
pub struct Breeder {
    step: usize,
}

impl Breeder {
    pub fn boxed(step: usize) -> Box<dyn OrganismBehavior> {
        Box::new(Self { step })
    }
}

impl OrganismBehavior for Breeder {
    fn decide(&mut self, observation: &Observation) -> Result<Decision, BehaviorError> {
        self.step += 1;
        let state = &observation.state;
        if state.energy > 80.0 && state.gestating_seeds == 0 {
            if let Some(partner) = observation.neighbors.iter().find(|n| n.energy > 70.0) {
                return Ok(Decision::act(vec![ProposedAction::Conjugate {
                    partner: partner.agent_id.clone(),
                }]));
            }
        }
        if state.energy < 75.0 {
            return Ok(Decision::act(vec![ProposedAction::Rest]));
        }
        let (dx, dy) = MOORE_OFFSETS[self.step % MOORE_OFFSETS.len()];
        Ok(Decision::act(vec![ProposedAction::Move { dx, dy }]))
    }

    fn fork(&self) -> Box<dyn OrganismBehavior> {
        Breeder::boxed(self.step)
    }
}

pub fn fingerprint() -> String {
    code_fingerprint(b"integration test behaviors")
}

pub fn config(name: &str) -> AgentConfig {
    AgentConfig::new(name, "Stay alive. Find a partner.").with_capability("walk")
}

/// A biome with one dish, backed by a JSONL log in `dir`.
pub fn file_world(
    dir: &std::path::Path,
    width: u32,
    height: u32,
    abiotic: AbioticFactors,
    rng_seed: u64,
) -> (Biome, Arc<FileEventLog>, Slicer) {
    let mut biome = Biome::new("integration", abiotic).expect("biome");
    biome.add_dish(DISH, width, height).expect("dish");
    let log = Arc::new(FileEventLog::open(dir.join("events.jsonl")).expect("open log"));
    let shared: SharedEventLog = log.clone();
    (biome, log, Slicer::new(shared, rng_seed))
}

pub fn birth(
    slicer: &mut Slicer,
    biome: &mut Biome,
    name: &str,
    behavior: Box<dyn OrganismBehavior>,
    pos: GridPos,
) -> String {
    slicer
        .birth(biome, DISH, config(name), &fingerprint(), behavior, pos)
        .expect("birth")
}

/// Place an idle root organism with a chosen starting energy.
pub fn place_with_energy(
    slicer: &mut Slicer,
    biome: &mut Biome,
    name: &str,
    energy: f64,
    pos: GridPos,
) -> String {
    let agent_id = biome.allocate_agent_id();
    let organism = Organism::birth(agent_id, config(name), fingerprint(), Script::idle())
        .expect("organism")
        .with_energy(energy);
    slicer.place(biome, DISH, organism, pos).expect("place")
}

pub fn count_kind(log: &dyn EventLog, kind: &str) -> usize {
    log.replay()
        .expect("replay")
        .iter()
        .filter(|event| event.payload_str("kind") == Some(kind))
        .count()
}
