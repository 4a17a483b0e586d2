//! Biome: the dishes of one run plus the abiotic factors they all share.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::dish::Dish;
use super::error::ConfigError;
use super::types::{AgentId, DishId};

// ============================================================================
// Abiotic Factors
// ============================================================================

/// Global thresholds and policy lists. Fixed once the biome is built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AbioticFactors {
    /// Organisms whose latest fitness score is below this are reaped.
    pub fitness_floor: f64,
    /// Seeding is refused when the child's generation would exceed this.
    pub max_generations: u32,
    pub max_tool_calls_per_slice: u32,
    pub max_file_ops_per_slice: u32,
    pub max_network_calls_per_slice: u32,
    /// Exact tool names. Empty means every tool not blocked is allowed.
    pub allowed_tools: Vec<String>,
    pub blocked_tools: Vec<String>,
    /// Path prefixes. Empty means every path not blocked is allowed.
    pub allowed_paths: Vec<String>,
    pub blocked_paths: Vec<String>,
    pub action_energy_cost: f64,
    pub rest_energy_gain: f64,
    pub conjugation_energy_cost: f64,
}

impl Default for AbioticFactors {
    fn default() -> Self {
        Self {
            fitness_floor: 0.0,
            max_generations: 64,
            max_tool_calls_per_slice: 16,
            max_file_ops_per_slice: 16,
            max_network_calls_per_slice: 8,
            allowed_tools: Vec::new(),
            blocked_tools: Vec::new(),
            allowed_paths: Vec::new(),
            blocked_paths: Vec::new(),
            action_energy_cost: 1.0,
            rest_energy_gain: 5.0,
            conjugation_energy_cost: 10.0,
        }
    }
}

impl AbioticFactors {
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_finite("fitness_floor", self.fitness_floor)?;
        check_non_negative("action_energy_cost", self.action_energy_cost)?;
        check_non_negative("rest_energy_gain", self.rest_energy_gain)?;
        check_non_negative("conjugation_energy_cost", self.conjugation_energy_cost)?;
        Ok(())
    }
}

fn check_finite(key: &str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(ConfigError::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
        })
    }
}

fn check_non_negative(key: &str, value: f64) -> Result<(), ConfigError> {
    check_finite(key, value)?;
    if value < 0.0 {
        return Err(ConfigError::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
        });
    }
    Ok(())
}

// ============================================================================
// Agent Ids
// ============================================================================

/// Hands out operational agent ids, unique across every dish of a biome.
#[derive(Debug, Clone, Default)]
pub struct AgentIdAllocator {
    next: u64,
}

impl AgentIdAllocator {
    pub fn next_id(&mut self) -> AgentId {
        self.next += 1;
        format!("org-{:06}", self.next)
    }
}

// ============================================================================
// Biome
// ============================================================================

/// Mutable access to one dish alongside the biome-wide state a slice needs.
pub struct DishContext<'a> {
    pub abiotic: &'a AbioticFactors,
    pub dish: &'a mut Dish,
    pub ids: &'a mut AgentIdAllocator,
}

#[derive(Debug)]
pub struct Biome {
    name: String,
    abiotic: AbioticFactors,
    dishes: BTreeMap<DishId, Dish>,
    ids: AgentIdAllocator,
}

impl Biome {
    pub fn new(name: impl Into<String>, abiotic: AbioticFactors) -> Result<Self, ConfigError> {
        abiotic.validate()?;
        Ok(Self {
            name: name.into(),
            abiotic,
            dishes: BTreeMap::new(),
            ids: AgentIdAllocator::default(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn abiotic(&self) -> &AbioticFactors {
        &self.abiotic
    }

    /// Create an empty dish. Ids must be unique and dimensions non-zero.
    pub fn add_dish(
        &mut self,
        dish_id: impl Into<DishId>,
        width: u32,
        height: u32,
    ) -> Result<&mut Dish, ConfigError> {
        let dish_id = dish_id.into();
        if width == 0 || height == 0 {
            return Err(ConfigError::InvalidValue {
                key: format!("dish {dish_id} dimensions"),
                value: format!("{width}x{height}"),
            });
        }
        if self.dishes.contains_key(&dish_id) {
            return Err(ConfigError::InvalidValue {
                key: "dish_id".to_string(),
                value: dish_id,
            });
        }
        let dish = Dish::new(dish_id.clone(), width, height);
        Ok(self.dishes.entry(dish_id).or_insert(dish))
    }

    pub fn dish(&self, dish_id: &str) -> Option<&Dish> {
        self.dishes.get(dish_id)
    }

    pub fn dish_mut(&mut self, dish_id: &str) -> Option<&mut Dish> {
        self.dishes.get_mut(dish_id)
    }

    pub fn dish_ids(&self) -> Vec<DishId> {
        self.dishes.keys().cloned().collect()
    }

    pub fn dishes(&self) -> impl Iterator<Item = &Dish> {
        self.dishes.values()
    }

    pub fn allocate_agent_id(&mut self) -> AgentId {
        self.ids.next_id()
    }

    pub fn dish_context(&mut self, dish_id: &str) -> Option<DishContext<'_>> {
        let dish = self.dishes.get_mut(dish_id)?;
        Some(DishContext {
            abiotic: &self.abiotic,
            dish,
            ids: &mut self.ids,
        })
    }

    pub fn population(&self) -> usize {
        self.dishes.values().map(Dish::population).sum()
    }

    /// Living organism ids per dish, in arrival order.
    pub fn living(&self) -> BTreeMap<DishId, Vec<AgentId>> {
        self.dishes
            .iter()
            .map(|(dish_id, dish)| (dish_id.clone(), dish.organism_ids()))
            .collect()
    }
}
