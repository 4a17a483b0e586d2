pub mod geometry;
pub mod simulator;

pub use geometry::{chebyshev_distance, is_moore_adjacent, GridPos, MOORE_OFFSETS};

// Organisms and their behavior contract (observe → decide → act → reflect)
pub use simulator::{
    ActionOutcome, AgentConfig, Archetype, Decision, DevelopingSeed, MemoryEntry,
    MemoryEntryKind, ObservedItem, ObservedNeighbor, Observation, Organism, OrganismBehavior,
    OrganismMemory, OrganismView, ProposedAction, SeedParent, SocialContext,
};

// Environment
pub use simulator::{AbioticFactors, Biome, BiomeConfig, Dish, Item};

// Lifecycle engine
pub use simulator::{
    BoundaryVerdict, DeathType, PulseReport, Reaper, SeedingOutcome, SliceResult, Slicer,
};

// Event log and lineage
pub use simulator::{
    read_jsonl_events, EventLog, EventType, EvolutionaryEvent, FileEventLog, FitnessMetrics,
    InMemoryEventLog, LineageIndex, LineageRecord, SharedEventLog,
};

// Identity
pub use simulator::{
    code_fingerprint, compute_genome_id, generate_hybrid_name, generate_name, Culture,
};

pub use simulator::{
    BehaviorError, ConfigError, ConjugationError, IdentityError, InventoryError, ObserverError,
    PlacementError, Rejected, SimulationError,
};
