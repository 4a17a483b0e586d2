//! Core type definitions: IDs and lifecycle constants.

// ============================================================================
// Type Aliases
// ============================================================================

pub type AgentId = String;
pub type GenomeId = String;
pub type ItemId = String;
pub type DishId = String;
pub type Pulse = u64;
pub type SliceNumber = u64;

// ============================================================================
// Constants
// ============================================================================

pub const MIN_ENERGY: f64 = 0.0;
pub const MAX_ENERGY: f64 = 100.0;
pub const DEFAULT_ROOT_ENERGY: f64 = 100.0;
pub const DEFAULT_CHILD_ENERGY: f64 = 50.0;

/// Both participants must hold strictly more energy than this to seed.
pub const CONJUGATION_ENERGY_THRESHOLD: f64 = 70.0;

/// Pulses a seed must accumulate on its carrier before the child is born.
pub const GESTATION_PULSES: u32 = 5;

pub const DEFAULT_NEIGHBORHOOD_RADIUS: u32 = 1;

/// Reserved genome id of the session boundary marker. Never a real digest.
pub const SESSION_END_GENOME_ID: &str = "SESSION_END";
pub const SESSION_END_AGENT_ID: &str = "session";

/// Mixed into every genome digest; bump when the canonical form changes.
pub const GENOME_STATE_VERSION: u32 = 1;

/// Archetype inheritance split, in percent: parent A, parent B, mutation.
pub const INHERIT_PARENT_A_PERCENT: u32 = 49;
pub const INHERIT_PARENT_B_PERCENT: u32 = 49;
