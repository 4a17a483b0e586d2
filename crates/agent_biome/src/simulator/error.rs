//! Error types for the simulation core.

use std::io;
use thiserror::Error;

use crate::geometry::GridPos;

use super::types::{AgentId, DishId, ItemId};

/// Genome digest could not be derived.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdentityError {
    #[error("canonicalize config failed: {0}")]
    Canonicalize(String),
}

impl From<serde_json::Error> for IdentityError {
    fn from(err: serde_json::Error) -> Self {
        IdentityError::Canonicalize(err.to_string())
    }
}

/// Malformed configuration. Raised at construction time, never defaulted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("missing required field: {field}")]
    MissingField { field: &'static str },
    #[error("required field is empty: {field}")]
    EmptyField { field: &'static str },
    #[error("invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },
    #[error("malformed agent config: {message}")]
    Malformed { message: String },
    #[error("read config file failed ({path}): {message}")]
    ReadConfigFile { path: String, message: String },
    #[error("parse config file failed ({path}): {message}")]
    ParseConfigFile { path: String, message: String },
    #[error(transparent)]
    Identity(#[from] IdentityError),
}

/// The event log could not durably record an event.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ObserverError {
    #[error("event log io failed: {0}")]
    Io(String),
    #[error("event log serde failed: {0}")]
    Serde(String),
    #[error("event log lock poisoned: {0}")]
    LockPoisoned(&'static str),
}

impl From<io::Error> for ObserverError {
    fn from(err: io::Error) -> Self {
        ObserverError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for ObserverError {
    fn from(err: serde_json::Error) -> Self {
        ObserverError::Serde(err.to_string())
    }
}

/// A value handed back to the caller together with the reason it was
/// refused, so ownership is never silently lost.
#[derive(Debug, PartialEq)]
pub struct Rejected<T, E> {
    pub reason: E,
    pub value: T,
}

impl<T, E> Rejected<T, E> {
    pub fn new(reason: E, value: T) -> Self {
        Self { reason, value }
    }

    pub fn into_inner(self) -> T {
        self.value
    }
}

/// Expected, recoverable spatial failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlacementError {
    #[error("position {pos} is outside the {width}x{height} dish")]
    OutOfBounds { pos: GridPos, width: u32, height: u32 },
    #[error("position {pos} is occupied by {occupant}")]
    Occupied { pos: GridPos, occupant: AgentId },
    #[error("organism {agent_id} is already in the dish")]
    AlreadyPresent { agent_id: AgentId },
    #[error("organism {agent_id} is not in the dish")]
    UnknownOrganism { agent_id: AgentId },
    #[error("no free cell around {pos}")]
    NoFreeNeighbor { pos: GridPos },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InventoryError {
    #[error("item {item_id} not found")]
    ItemNotFound { item_id: ItemId },
    #[error("archetype has no appendage")]
    NoAppendage,
    #[error("appendage full (capacity {capacity})")]
    AppendageFull { capacity: usize },
    #[error("pocket full (capacity {capacity})")]
    PocketFull { capacity: usize },
}

/// Failure inside an organism's own cycle. Captured into the slice event.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BehaviorError {
    #[error("decision failed: {0}")]
    Decision(String),
    #[error("effect failed: {0}")]
    Effect(String),
    #[error("action not handled: {action}")]
    Unhandled { action: String },
    #[error(transparent)]
    Placement(#[from] PlacementError),
    #[error(transparent)]
    Inventory(#[from] InventoryError),
    #[error(transparent)]
    Conjugation(#[from] ConjugationError),
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConjugationError {
    #[error("an organism cannot conjugate with itself")]
    SameOrganism,
    #[error("organism {agent_id} is not in the dish")]
    UnknownOrganism { agent_id: AgentId },
    #[error("participants are not Moore-adjacent (distance {distance})")]
    NotAdjacent { distance: u32 },
    #[error("organism {agent_id} has insufficient energy ({energy})")]
    InsufficientEnergy { agent_id: AgentId, energy: f64 },
    #[error("neither participant has a free pocket slot")]
    NoPocketSpace,
    #[error("child generation {generation} exceeds the limit of {max}")]
    GenerationLimit { generation: u32, max: u32 },
}

/// Errors that abort a pulse. Everything else degrades to a log entry.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SimulationError {
    #[error(transparent)]
    Observer(#[from] ObserverError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Identity(#[from] IdentityError),
    #[error("dish {dish_id} not found")]
    UnknownDish { dish_id: DishId },
    #[error(transparent)]
    Placement(#[from] PlacementError),
    #[error(transparent)]
    Conjugation(#[from] ConjugationError),
}
