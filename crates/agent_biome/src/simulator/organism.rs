//! Organisms: identity, lineage, energy, inventory and the flight recorder.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

use crate::geometry::GridPos;

use super::agent::{ActionOutcome, Decision, Observation, OrganismBehavior, OrganismView};
use super::error::{
    BehaviorError, ConfigError, InventoryError, ObserverError, Rejected, SimulationError,
};
use super::events::{EventType, EvolutionaryEvent};
use super::identity::{compute_genome_id, genome_digest_bytes};
use super::item::{take_by_id, Item};
use super::memory::{MemoryEntry, OrganismMemory};
use super::naming::generate_name;
use super::observer::EventLog;
use super::types::{
    AgentId, GenomeId, Pulse, DEFAULT_CHILD_ENERGY, DEFAULT_ROOT_ENERGY, GESTATION_PULSES,
    GENOME_STATE_VERSION, MAX_ENERGY, MIN_ENERGY,
};

// ============================================================================
// Archetype
// ============================================================================

/// Body plan. Fixes how many items an organism can hold and store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Archetype {
    Orb,
    Hook,
    Pincer,
    Tendril,
}

impl Archetype {
    pub const ALL: [Archetype; 4] = [
        Archetype::Orb,
        Archetype::Hook,
        Archetype::Pincer,
        Archetype::Tendril,
    ];

    /// Roots take their body plan from digest bytes 4..8 of their genome id.
    pub fn from_genome(genome_id: &str) -> Self {
        let bytes = genome_digest_bytes(genome_id);
        let word = u32::from_be_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]);
        Archetype::ALL[(word % 4) as usize]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Archetype::Orb => "orb",
            Archetype::Hook => "hook",
            Archetype::Pincer => "pincer",
            Archetype::Tendril => "tendril",
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            Archetype::Orb => "◯",
            Archetype::Hook => "◔",
            Archetype::Pincer => "◑",
            Archetype::Tendril => "◕",
        }
    }

    pub fn appendage_capacity(&self) -> usize {
        match self {
            Archetype::Orb => 0,
            Archetype::Hook => 1,
            Archetype::Pincer => 2,
            Archetype::Tendril => 2,
        }
    }

    pub fn pocket_capacity(&self) -> usize {
        match self {
            Archetype::Orb => 5,
            Archetype::Hook => 3,
            Archetype::Pincer => 2,
            Archetype::Tendril => 1,
        }
    }
}

// ============================================================================
// Agent Config
// ============================================================================

const REQUIRED_CONFIG_FIELDS: [&str; 2] = ["name", "directive"];

/// Identity-bearing configuration. Every field feeds the genome digest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentConfig {
    pub name: String,
    /// Free-text behavioral descriptor, recombined sentence by sentence.
    pub directive: String,
    #[serde(default)]
    pub capabilities: Vec<String>,
    #[serde(default)]
    pub traits: BTreeMap<String, Value>,
}

impl AgentConfig {
    pub fn new(name: impl Into<String>, directive: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            directive: directive.into(),
            capabilities: Vec::new(),
            traits: BTreeMap::new(),
        }
    }

    pub fn with_capability(mut self, capability: impl Into<String>) -> Self {
        self.capabilities.push(capability.into());
        self
    }

    pub fn with_trait(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.traits.insert(key.into(), value.into());
        self
    }

    /// Shape-check and decode a config supplied as plain JSON.
    pub fn from_value(value: Value) -> Result<Self, ConfigError> {
        let object = value.as_object().ok_or_else(|| ConfigError::Malformed {
            message: "agent config must be a JSON object".to_string(),
        })?;
        for field in REQUIRED_CONFIG_FIELDS {
            if !object.contains_key(field) {
                return Err(ConfigError::MissingField { field });
            }
        }
        let config: Self =
            serde_json::from_value(value).map_err(|err| ConfigError::Malformed {
                message: err.to_string(),
            })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.name.trim().is_empty() {
            return Err(ConfigError::EmptyField { field: "name" });
        }
        if self.directive.trim().is_empty() {
            return Err(ConfigError::EmptyField { field: "directive" });
        }
        Ok(())
    }

    /// Sentences and lines of the directive, trimmed, in order.
    pub fn directive_segments(&self) -> Vec<&str> {
        self.directive
            .split_inclusive(['.', '!', '?', '\n'])
            .map(str::trim)
            .filter(|segment| !segment.is_empty())
            .collect()
    }
}

// ============================================================================
// Developing Seed
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeedParent {
    pub agent_id: AgentId,
    pub genome_id: GenomeId,
}

/// An in-progress offspring carried in one parent's pocket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DevelopingSeed {
    pub seed_id: String,
    /// The initiator; the child is placed next to this parent.
    pub parent_a: SeedParent,
    pub parent_b: SeedParent,
    pub seeded_at_pulse: Pulse,
    pub gestation_pulses: u32,
}

impl DevelopingSeed {
    pub fn is_ready(&self) -> bool {
        self.gestation_pulses >= GESTATION_PULSES
    }
}

// ============================================================================
// Organism
// ============================================================================

pub struct Organism {
    agent_id: AgentId,
    genome_id: GenomeId,
    parent_id: Option<GenomeId>,
    generation: u32,
    lineage_path: Vec<GenomeId>,
    designation: String,
    config: AgentConfig,
    code_fingerprint: String,
    energy: f64,
    archetype: Archetype,
    appendage: Vec<Item>,
    pocket: Vec<Item>,
    developing_seeds: Vec<DevelopingSeed>,
    memory: OrganismMemory,
    flight_recorder: Vec<EvolutionaryEvent>,
    behavior: Box<dyn OrganismBehavior>,
}

impl fmt::Debug for Organism {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Organism")
            .field("agent_id", &self.agent_id)
            .field("genome_id", &self.genome_id)
            .field("generation", &self.generation)
            .field("energy", &self.energy)
            .field("archetype", &self.archetype)
            .finish_non_exhaustive()
    }
}

impl Organism {
    /// Create a generation-0 organism.
    pub fn birth(
        agent_id: impl Into<AgentId>,
        config: AgentConfig,
        code_fingerprint: impl Into<String>,
        behavior: Box<dyn OrganismBehavior>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let code_fingerprint = code_fingerprint.into();
        let genome_id = compute_genome_id(&config, &code_fingerprint, GENOME_STATE_VERSION)?;
        Ok(Self {
            agent_id: agent_id.into(),
            parent_id: None,
            generation: 0,
            lineage_path: vec![genome_id.clone()],
            designation: generate_name(&genome_id),
            archetype: Archetype::from_genome(&genome_id),
            genome_id,
            config,
            code_fingerprint,
            energy: DEFAULT_ROOT_ENERGY,
            appendage: Vec::new(),
            pocket: Vec::new(),
            developing_seeds: Vec::new(),
            memory: OrganismMemory::default(),
            flight_recorder: Vec::new(),
            behavior,
        })
    }

    /// Create a generation-0 organism from an untyped config record.
    pub fn birth_from_value(
        agent_id: impl Into<AgentId>,
        config: Value,
        code_fingerprint: impl Into<String>,
        behavior: Box<dyn OrganismBehavior>,
    ) -> Result<Self, ConfigError> {
        let config = AgentConfig::from_value(config)?;
        Self::birth(agent_id, config, code_fingerprint, behavior)
    }

    /// Child of `parent` (parent A of a conjugation).
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn offspring(
        agent_id: AgentId,
        genome_id: GenomeId,
        config: AgentConfig,
        code_fingerprint: String,
        archetype: Archetype,
        designation: String,
        parent: &Organism,
        generation: u32,
        behavior: Box<dyn OrganismBehavior>,
    ) -> Self {
        let mut lineage_path = parent.lineage_path.clone();
        lineage_path.push(genome_id.clone());
        Self {
            agent_id,
            genome_id,
            parent_id: Some(parent.genome_id.clone()),
            generation,
            lineage_path,
            designation,
            config,
            code_fingerprint,
            energy: DEFAULT_CHILD_ENERGY,
            archetype,
            appendage: Vec::new(),
            pocket: Vec::new(),
            developing_seeds: Vec::new(),
            memory: OrganismMemory::default(),
            flight_recorder: Vec::new(),
            behavior,
        }
    }

    pub fn with_energy(mut self, energy: f64) -> Self {
        self.energy = energy.clamp(MIN_ENERGY, MAX_ENERGY);
        self
    }

    pub fn agent_id(&self) -> &str {
        &self.agent_id
    }

    pub fn genome_id(&self) -> &str {
        &self.genome_id
    }

    pub fn parent_id(&self) -> Option<&str> {
        self.parent_id.as_deref()
    }

    pub fn generation(&self) -> u32 {
        self.generation
    }

    pub fn lineage_path(&self) -> &[GenomeId] {
        &self.lineage_path
    }

    pub fn designation(&self) -> &str {
        &self.designation
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    pub fn code_fingerprint(&self) -> &str {
        &self.code_fingerprint
    }

    pub fn archetype(&self) -> Archetype {
        self.archetype
    }

    pub fn memory(&self) -> &OrganismMemory {
        &self.memory
    }

    // ------------------------------------------------------------------------
    // Energy
    // ------------------------------------------------------------------------

    pub fn energy(&self) -> f64 {
        self.energy
    }

    /// Add energy from an external source. Returns the new level.
    pub fn replenish(&mut self, amount: f64) -> f64 {
        self.energy = (self.energy + amount.max(0.0)).clamp(MIN_ENERGY, MAX_ENERGY);
        self.energy
    }

    /// Deduct `amount` if available. Returns false and leaves energy untouched
    /// otherwise.
    pub fn spend_energy(&mut self, amount: f64) -> bool {
        let amount = amount.max(0.0);
        if self.energy < amount {
            return false;
        }
        self.energy = (self.energy - amount).clamp(MIN_ENERGY, MAX_ENERGY);
        true
    }

    // ------------------------------------------------------------------------
    // Inventory
    // ------------------------------------------------------------------------

    pub fn appendage(&self) -> &[Item] {
        &self.appendage
    }

    pub fn pocket(&self) -> &[Item] {
        &self.pocket
    }

    pub fn appendage_free(&self) -> usize {
        self.archetype
            .appendage_capacity()
            .saturating_sub(self.appendage.len())
    }

    /// Free pocket slots. Developing seeds occupy pocket slots too.
    pub fn pocket_free(&self) -> usize {
        self.archetype
            .pocket_capacity()
            .saturating_sub(self.pocket.len() + self.developing_seeds.len())
    }

    /// Put an item in hand.
    pub fn hold(&mut self, item: Item) -> Result<(), Rejected<Item, InventoryError>> {
        let capacity = self.archetype.appendage_capacity();
        if capacity == 0 {
            return Err(Rejected::new(InventoryError::NoAppendage, item));
        }
        if self.appendage_free() == 0 {
            return Err(Rejected::new(InventoryError::AppendageFull { capacity }, item));
        }
        self.appendage.push(item);
        Ok(())
    }

    /// Put an item straight into the pocket.
    pub fn pocket_item(&mut self, item: Item) -> Result<(), Rejected<Item, InventoryError>> {
        if self.pocket_free() == 0 {
            let capacity = self.archetype.pocket_capacity();
            return Err(Rejected::new(InventoryError::PocketFull { capacity }, item));
        }
        self.pocket.push(item);
        Ok(())
    }

    /// Take an item out of hand.
    pub fn release(&mut self, item_id: &str) -> Result<Item, InventoryError> {
        take_by_id(&mut self.appendage, item_id).ok_or_else(|| InventoryError::ItemNotFound {
            item_id: item_id.to_string(),
        })
    }

    /// Move an item from hand to pocket.
    pub fn stow(&mut self, item_id: &str) -> Result<(), InventoryError> {
        if !self.appendage.iter().any(|item| item.id == item_id) {
            return Err(InventoryError::ItemNotFound {
                item_id: item_id.to_string(),
            });
        }
        if self.pocket_free() == 0 {
            return Err(InventoryError::PocketFull {
                capacity: self.archetype.pocket_capacity(),
            });
        }
        let item = self.release(item_id)?;
        self.pocket.push(item);
        Ok(())
    }

    /// Move an item from pocket to hand.
    pub fn retrieve(&mut self, item_id: &str) -> Result<(), InventoryError> {
        if !self.pocket.iter().any(|item| item.id == item_id) {
            return Err(InventoryError::ItemNotFound {
                item_id: item_id.to_string(),
            });
        }
        let capacity = self.archetype.appendage_capacity();
        if capacity == 0 {
            return Err(InventoryError::NoAppendage);
        }
        if self.appendage_free() == 0 {
            return Err(InventoryError::AppendageFull { capacity });
        }
        let item = take_by_id(&mut self.pocket, item_id).ok_or_else(|| {
            InventoryError::ItemNotFound {
                item_id: item_id.to_string(),
            }
        })?;
        self.appendage.push(item);
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Gestation
    // ------------------------------------------------------------------------

    pub fn developing_seeds(&self) -> &[DevelopingSeed] {
        &self.developing_seeds
    }

    pub(crate) fn implant_seed(&mut self, seed: DevelopingSeed) -> Result<(), InventoryError> {
        if self.pocket_free() == 0 {
            return Err(InventoryError::PocketFull {
                capacity: self.archetype.pocket_capacity(),
            });
        }
        self.developing_seeds.push(seed);
        Ok(())
    }

    /// Count one granted pulse on every seed not planted during `pulse`.
    pub fn advance_gestation(&mut self, pulse: Pulse) -> usize {
        let mut advanced = 0;
        for seed in &mut self.developing_seeds {
            if seed.seeded_at_pulse < pulse {
                seed.gestation_pulses += 1;
                advanced += 1;
            }
        }
        advanced
    }

    pub fn ready_seed_ids(&self) -> Vec<String> {
        self.developing_seeds
            .iter()
            .filter(|seed| seed.is_ready())
            .map(|seed| seed.seed_id.clone())
            .collect()
    }

    /// Remove a seed, releasing its pocket slot.
    pub(crate) fn take_seed(&mut self, seed_id: &str) -> Option<DevelopingSeed> {
        let index = self
            .developing_seeds
            .iter()
            .position(|seed| seed.seed_id == seed_id)?;
        Some(self.developing_seeds.remove(index))
    }

    pub(crate) fn seed(&self, seed_id: &str) -> Option<&DevelopingSeed> {
        self.developing_seeds
            .iter()
            .find(|seed| seed.seed_id == seed_id)
    }

    // ------------------------------------------------------------------------
    // Cycle
    // ------------------------------------------------------------------------

    pub fn view(&self, position: GridPos) -> OrganismView {
        OrganismView {
            agent_id: self.agent_id.clone(),
            genome_id: self.genome_id.clone(),
            designation: self.designation.clone(),
            generation: self.generation,
            energy: self.energy,
            archetype: self.archetype,
            position,
            appendage: self.appendage.iter().map(|item| item.id.clone()).collect(),
            pocket: self.pocket.iter().map(|item| item.id.clone()).collect(),
            gestating_seeds: self.developing_seeds.len(),
            config: self.config.clone(),
            memory_summary: self.memory.summarize(8),
        }
    }

    pub fn observe(&mut self, observation: &Observation) {
        let summary = format!(
            "{} neighbors, density {:.2}, {} items here",
            observation.social.neighbor_count,
            observation.social.population_density,
            observation.items_here.len()
        );
        self.memory
            .add(MemoryEntry::observation(observation.social.pulse, summary));
        self.behavior.observe(observation);
    }

    pub fn decide(&mut self, observation: &Observation) -> Result<Decision, BehaviorError> {
        let decision = self.behavior.decide(observation)?;
        self.memory
            .add(MemoryEntry::decision(observation.social.pulse, &decision));
        Ok(decision)
    }

    pub(crate) fn perform(
        &mut self,
        action: &super::agent::ProposedAction,
    ) -> Result<Value, BehaviorError> {
        self.behavior.perform(action)
    }

    pub fn reflect(&mut self, pulse: Pulse, outcomes: &[ActionOutcome]) {
        for outcome in outcomes {
            self.memory.add(MemoryEntry::outcome(pulse, outcome));
        }
        if let Some(note) = self.behavior.reflect(outcomes) {
            self.memory.add(MemoryEntry::reflection(pulse, note));
        }
    }

    pub(crate) fn fork_behavior(&self) -> Box<dyn OrganismBehavior> {
        self.behavior.fork()
    }

    // ------------------------------------------------------------------------
    // Events
    // ------------------------------------------------------------------------

    /// A fresh event authored by this organism, stamped with its current
    /// identity and a lineage snapshot.
    pub fn event(&self, event_type: EventType) -> EvolutionaryEvent {
        EvolutionaryEvent {
            timestamp: super::events::utc_timestamp(),
            genome_id: self.genome_id.clone(),
            parent_id: self.parent_id.clone(),
            generation: self.generation,
            event_type,
            payload: BTreeMap::new(),
            fitness: None,
            agent_id: self.agent_id.clone(),
            lineage_path: self.lineage_path.clone(),
        }
    }

    /// Append to the global log first, then mirror into the flight recorder.
    pub fn emit(
        &mut self,
        log: &dyn EventLog,
        event: EvolutionaryEvent,
    ) -> Result<(), ObserverError> {
        log.append(&event)?;
        self.flight_recorder.push(event);
        Ok(())
    }

    pub fn flight_recorder(&self) -> &[EvolutionaryEvent] {
        &self.flight_recorder
    }

    /// Most recent non-null fitness score in the flight recorder.
    pub fn latest_fitness(&self) -> Option<f64> {
        self.flight_recorder
            .iter()
            .rev()
            .find_map(EvolutionaryEvent::fitness_score)
    }

    // ------------------------------------------------------------------------
    // Mutation
    // ------------------------------------------------------------------------

    /// Apply a JSON merge patch to the config and re-derive identity.
    ///
    /// A patch that leaves the canonical config unchanged is a no-op and
    /// emits nothing. Returns the (possibly new) genome id.
    pub fn mutate(
        &mut self,
        patch: &Value,
        log: &dyn EventLog,
    ) -> Result<GenomeId, SimulationError> {
        let mut merged = serde_json::to_value(&self.config).map_err(|err| {
            ConfigError::Malformed {
                message: err.to_string(),
            }
        })?;
        merge_patch(&mut merged, patch);
        let config = AgentConfig::from_value(merged)?;
        let genome_id = compute_genome_id(&config, &self.code_fingerprint, GENOME_STATE_VERSION)?;
        if genome_id == self.genome_id {
            return Ok(genome_id);
        }

        let mut lineage_path = self.lineage_path.clone();
        lineage_path.push(genome_id.clone());
        let mut event = self
            .event(EventType::Mutate)
            .with_payload("kind", "mutation")
            .with_payload("previous_genome_id", self.genome_id.as_str())
            .with_payload("patch", patch.clone());
        event.genome_id = genome_id.clone();
        event.lineage_path = lineage_path.clone();

        // Identity changes only once the log holds the event explaining it.
        log.append(&event)?;
        self.genome_id = genome_id.clone();
        self.config = config;
        self.designation = generate_name(&genome_id);
        self.lineage_path = lineage_path;
        self.flight_recorder.push(event);
        Ok(genome_id)
    }
}

/// RFC 7396 merge patch: objects merge recursively, `null` deletes a key,
/// anything else replaces.
fn merge_patch(target: &mut Value, patch: &Value) {
    let Value::Object(patch_map) = patch else {
        *target = patch.clone();
        return;
    };
    if !target.is_object() {
        *target = Value::Object(serde_json::Map::new());
    }
    if let Value::Object(target_map) = target {
        for (key, value) in patch_map {
            if value.is_null() {
                target_map.remove(key);
            } else {
                merge_patch(
                    target_map.entry(key.clone()).or_insert(Value::Null),
                    value,
                );
            }
        }
    }
}
