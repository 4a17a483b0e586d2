//! Organism behavior contract: observe → decide → act → reflect.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::geometry::GridPos;

use super::error::BehaviorError;
use super::organism::{AgentConfig, Archetype};
use super::types::{AgentId, GenomeId, ItemId, Pulse, SliceNumber};

// ============================================================================
// Behavior Interface
// ============================================================================

/// Decision logic injected into an organism.
///
/// The core only inspects the `stop` flag and the proposed actions of a
/// [`Decision`]; everything else about how a behavior reaches its decision is
/// opaque. Implementations range from scripted test behaviors to remote
/// model-backed policies.
pub trait OrganismBehavior: Send {
    /// Called with the slice's observation before `decide`.
    fn observe(&mut self, _observation: &Observation) {
        // Default: no-op
    }

    /// Decide what to do this slice.
    fn decide(&mut self, observation: &Observation) -> Result<Decision, BehaviorError>;

    /// Execute an external action (tool, file, network) that already passed
    /// the boundary check. Core actions never reach this method.
    fn perform(&mut self, action: &ProposedAction) -> Result<Value, BehaviorError> {
        Err(BehaviorError::Unhandled {
            action: action.kind().to_string(),
        })
    }

    /// Called with the outcomes of the acted actions. A returned note is kept
    /// in the organism's memory.
    fn reflect(&mut self, _outcomes: &[ActionOutcome]) -> Option<String> {
        None
    }

    /// Behavior handed to a child born from this organism.
    fn fork(&self) -> Box<dyn OrganismBehavior>;
}

// ============================================================================
// Observation
// ============================================================================

/// Per-slice social context computed by the slicer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SocialContext {
    pub pulse: Pulse,
    pub slice: SliceNumber,
    /// Occupied cells within radius 1.
    pub neighbor_count: usize,
    /// Dish population divided by total cell count.
    pub population_density: f64,
}

/// Public state of an organism as its behavior sees it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrganismView {
    pub agent_id: AgentId,
    pub genome_id: GenomeId,
    pub designation: String,
    pub generation: u32,
    pub energy: f64,
    pub archetype: Archetype,
    pub position: GridPos,
    pub appendage: Vec<ItemId>,
    pub pocket: Vec<ItemId>,
    pub gestating_seeds: usize,
    pub config: AgentConfig,
    pub memory_summary: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObservedNeighbor {
    pub pos: GridPos,
    pub agent_id: AgentId,
    pub genome_id: GenomeId,
    pub energy: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObservedItem {
    pub item_id: ItemId,
    pub name: String,
    pub weight: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub state: OrganismView,
    pub social: SocialContext,
    pub neighbors: Vec<ObservedNeighbor>,
    pub items_here: Vec<ObservedItem>,
}

// ============================================================================
// Decision
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum ProposedAction {
    /// Step one cell; `dx` and `dy` are each in -1..=1 and not both zero.
    Move { dx: i32, dy: i32 },
    Grab { item_id: ItemId },
    Drop { item_id: ItemId },
    Stow { item_id: ItemId },
    Retrieve { item_id: ItemId },
    Conjugate { partner: AgentId },
    Rest,
    UseTool {
        tool: String,
        #[serde(default)]
        args: Value,
    },
    ReadFile { path: String },
    WriteFile { path: String, content: String },
    NetworkRequest { method: String, url: String },
}

impl ProposedAction {
    pub fn kind(&self) -> &'static str {
        match self {
            ProposedAction::Move { .. } => "move",
            ProposedAction::Grab { .. } => "grab",
            ProposedAction::Drop { .. } => "drop",
            ProposedAction::Stow { .. } => "stow",
            ProposedAction::Retrieve { .. } => "retrieve",
            ProposedAction::Conjugate { .. } => "conjugate",
            ProposedAction::Rest => "rest",
            ProposedAction::UseTool { .. } => "use_tool",
            ProposedAction::ReadFile { .. } => "read_file",
            ProposedAction::WriteFile { .. } => "write_file",
            ProposedAction::NetworkRequest { .. } => "network_request",
        }
    }

    /// Actions whose effects leave the simulation and go through `perform`.
    pub fn is_external(&self) -> bool {
        matches!(
            self,
            ProposedAction::UseTool { .. }
                | ProposedAction::ReadFile { .. }
                | ProposedAction::WriteFile { .. }
                | ProposedAction::NetworkRequest { .. }
        )
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Decision {
    /// Voluntary halt: the slice ends before any action is taken.
    #[serde(default)]
    pub stop: bool,
    #[serde(default)]
    pub actions: Vec<ProposedAction>,
    #[serde(default)]
    pub rationale: Option<String>,
}

impl Decision {
    pub fn act(actions: Vec<ProposedAction>) -> Self {
        Self {
            stop: false,
            actions,
            rationale: None,
        }
    }

    pub fn idle() -> Self {
        Self::default()
    }

    pub fn halt() -> Self {
        Self {
            stop: true,
            actions: Vec::new(),
            rationale: None,
        }
    }

    pub fn with_rationale(mut self, rationale: impl Into<String>) -> Self {
        self.rationale = Some(rationale.into());
        self
    }
}

/// Result of one acted action, fed back to `reflect` and into the slice event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionOutcome {
    pub action: ProposedAction,
    pub success: bool,
    #[serde(default)]
    pub result: Value,
    #[serde(default)]
    pub error: Option<String>,
}

impl ActionOutcome {
    pub fn ok(action: ProposedAction, result: Value) -> Self {
        Self {
            action,
            success: true,
            result,
            error: None,
        }
    }

    pub fn failed(action: ProposedAction, error: impl Into<String>) -> Self {
        Self {
            action,
            success: false,
            result: Value::Null,
            error: Some(error.into()),
        }
    }
}
