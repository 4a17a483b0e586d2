//! Biome simulator - the evolutionary lifecycle core.
//!
//! This module is organized into submodules:
//! - `types`: Core type definitions (IDs, lifecycle constants)
//! - `identity` / `naming`: Genome digests and deterministic designations
//! - `events` / `observer`: Event records and append-only log sinks
//! - `dish` / `biome`: Occupancy grids and the abiotic factors they share
//! - `agent` / `memory` / `organism`: Behavior contract and organism state
//! - `slicer`: Pulse scheduler
//! - `reaper`: Fitness and boundary mortality
//! - `conjugation`: Seeding, gestation and recombination
//! - `lineage`: Family tree rebuilt from a replayed log
//! - `config`: `biome.toml` / environment loading

mod agent;
mod biome;
mod config;
mod conjugation;
mod dish;
mod error;
mod events;
mod identity;
mod item;
mod lineage;
mod memory;
mod naming;
mod observer;
mod organism;
mod reaper;
mod slicer;
mod types;

#[cfg(test)]
mod tests;

pub use agent::{
    ActionOutcome, Decision, ObservedItem, ObservedNeighbor, Observation, OrganismBehavior,
    OrganismView, ProposedAction, SocialContext,
};
pub use biome::{AbioticFactors, AgentIdAllocator, Biome, DishContext};
pub use config::{
    BiomeConfig, DEFAULT_BIOME_NAME, DEFAULT_CONFIG_FILE_NAME, DEFAULT_DISH_COUNT,
    DEFAULT_DISH_SIZE, DEFAULT_LOG_PATH, ENV_ACTION_ENERGY_COST, ENV_ALLOWED_PATHS,
    ENV_ALLOWED_TOOLS, ENV_BIOME_NAME, ENV_BLOCKED_PATHS, ENV_BLOCKED_TOOLS,
    ENV_CONJUGATION_ENERGY_COST, ENV_DISH_COUNT, ENV_DISH_HEIGHT, ENV_DISH_WIDTH,
    ENV_FITNESS_FLOOR, ENV_LOG_PATH, ENV_MAX_FILE_OPS, ENV_MAX_GENERATIONS,
    ENV_MAX_NETWORK_CALLS, ENV_MAX_TOOL_CALLS, ENV_REST_ENERGY_GAIN, ENV_RNG_SEED,
};
pub use conjugation::{
    complete_ready_seeds, inherit_archetype, merge_directives, recombine, record_seeding, seed,
    SeedingOutcome,
};
pub use dish::Dish;
pub use error::{
    BehaviorError, ConfigError, ConjugationError, IdentityError, InventoryError, ObserverError,
    PlacementError, Rejected, SimulationError,
};
pub use events::{utc_timestamp, EventType, EvolutionaryEvent, FitnessMetrics};
pub use identity::{
    canonical_json, code_fingerprint, compute_genome_id, compute_item_id, genome_digest_bytes,
    sha256_hex,
};
pub use item::Item;
pub use lineage::{DeathRecord, LineageIndex, LineageRecord};
pub use memory::{MemoryEntry, MemoryEntryKind, OrganismMemory, DEFAULT_MEMORY_CAPACITY};
pub use naming::{culture_of, generate_hybrid_name, generate_name, Culture};
pub use observer::{read_jsonl_events, EventLog, FileEventLog, InMemoryEventLog, SharedEventLog};
pub use organism::{AgentConfig, Archetype, DevelopingSeed, Organism, SeedParent};
pub use reaper::{BoundaryVerdict, DeathType, Reaper, SliceActionTally};
pub use slicer::{PulseReport, SliceResult, Slicer};
pub use types::{
    AgentId, DishId, GenomeId, ItemId, Pulse, SliceNumber, CONJUGATION_ENERGY_THRESHOLD,
    DEFAULT_CHILD_ENERGY, DEFAULT_NEIGHBORHOOD_RADIUS, DEFAULT_ROOT_ENERGY, GESTATION_PULSES,
    GENOME_STATE_VERSION, MAX_ENERGY, MIN_ENERGY, SESSION_END_AGENT_ID, SESSION_END_GENOME_ID,
};
