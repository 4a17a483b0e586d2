//! Pulse scheduler.
//!
//! A pulse visits every dish; within a dish every organism present at the
//! start of the pulse gets one slice, in arrival order. Each slice logs
//! exactly one `survival` event with payload kind `metabolic_action`, even
//! when the organism halted or its behavior failed. Only event-log failures
//! abort a pulse.

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use tracing::{debug, info};

use crate::geometry::GridPos;

use super::agent::{ActionOutcome, OrganismBehavior, ProposedAction, SocialContext};
use super::biome::{Biome, DishContext};
use super::conjugation::{self, SeedingOutcome};
use super::error::{BehaviorError, ObserverError, PlacementError, SimulationError};
use super::events::{EventType, EvolutionaryEvent, FitnessMetrics};
use super::observer::SharedEventLog;
use super::organism::{AgentConfig, Organism};
use super::reaper::{DeathType, Reaper, SliceActionTally};
use super::types::{
    AgentId, DishId, GenomeId, Pulse, SliceNumber, DEFAULT_NEIGHBORHOOD_RADIUS,
};

// ============================================================================
// Reports
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SliceResult {
    pub dish_id: DishId,
    pub agent_id: AgentId,
    pub genome_id: GenomeId,
    pub pulse: Pulse,
    pub slice: SliceNumber,
    /// Voluntary halt: no action was acted.
    pub halted: bool,
    pub outcomes: Vec<ActionOutcome>,
    /// Behavior failure captured instead of raised.
    pub error: Option<String>,
    pub breach: Option<String>,
    pub reaped: bool,
    pub born: Vec<AgentId>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PulseReport {
    pub pulse: Pulse,
    pub slices: Vec<SliceResult>,
    /// Organisms removed by the end-of-pulse fitness sweep.
    pub unfit: Vec<AgentId>,
}

impl PulseReport {
    pub fn births(&self) -> usize {
        self.slices.iter().map(|slice| slice.born.len()).sum()
    }

    pub fn deaths(&self) -> usize {
        self.unfit.len() + self.slices.iter().filter(|slice| slice.reaped).count()
    }
}

// ============================================================================
// Slicer
// ============================================================================

pub struct Slicer {
    log: SharedEventLog,
    reaper: Reaper,
    rng: StdRng,
    pulse: Pulse,
    slice_counter: SliceNumber,
    seed_counter: u64,
    radius: u32,
}

impl Slicer {
    /// `rng_seed` drives recombination only; everything else is
    /// deterministic.
    pub fn new(log: SharedEventLog, rng_seed: u64) -> Self {
        Self {
            reaper: Reaper::new(log.clone()),
            log,
            rng: StdRng::seed_from_u64(rng_seed),
            pulse: 0,
            slice_counter: 0,
            seed_counter: 0,
            radius: DEFAULT_NEIGHBORHOOD_RADIUS,
        }
    }

    /// Radius of the neighbor count in the social context.
    pub fn with_radius(mut self, radius: u32) -> Self {
        self.radius = radius;
        self
    }

    /// Pulses run so far.
    pub fn pulse(&self) -> Pulse {
        self.pulse
    }

    /// Slices granted so far, across every pulse and dish.
    pub fn slice_counter(&self) -> SliceNumber {
        self.slice_counter
    }

    pub fn reaper(&self) -> &Reaper {
        &self.reaper
    }

    pub fn log(&self) -> &SharedEventLog {
        &self.log
    }

    // ------------------------------------------------------------------------
    // Population
    // ------------------------------------------------------------------------

    /// Build a root organism and place it.
    pub fn birth(
        &mut self,
        biome: &mut Biome,
        dish_id: &str,
        config: AgentConfig,
        code_fingerprint: &str,
        behavior: Box<dyn OrganismBehavior>,
        pos: GridPos,
    ) -> Result<AgentId, SimulationError> {
        let agent_id = biome.allocate_agent_id();
        let organism = Organism::birth(agent_id, config, code_fingerprint, behavior)?;
        self.place(biome, dish_id, organism, pos)
    }

    /// Place a constructed organism and record its `spawn` event. A failed
    /// append takes the organism back out of the dish.
    pub fn place(
        &mut self,
        biome: &mut Biome,
        dish_id: &str,
        organism: Organism,
        pos: GridPos,
    ) -> Result<AgentId, SimulationError> {
        let dish = dish_or_err(biome, dish_id)?.dish;
        let agent_id = organism.agent_id().to_string();
        dish.add_organism(organism, pos)
            .map_err(|rejected| SimulationError::Placement(rejected.reason))?;

        let dish_id = dish.id().to_string();
        let Some(organism) = dish.organism_mut(&agent_id) else {
            return Err(unknown_organism(&agent_id).into());
        };
        let event = organism
            .event(EventType::Spawn)
            .with_payload("kind", "birth")
            .with_payload("dish_id", dish_id.as_str())
            .with_payload("archetype", organism.archetype().as_str())
            .with_payload("designation", organism.designation())
            .with_payload("energy", organism.energy())
            .with_payload("x", pos.x)
            .with_payload("y", pos.y);
        if let Err(err) = organism.emit(self.log.as_ref(), event) {
            dish.remove_organism(&agent_id);
            return Err(err.into());
        }
        info!(
            dish_id = %dish_id,
            agent_id = %agent_id,
            genome_id = organism.genome_id(),
            "organism born"
        );
        Ok(agent_id)
    }

    // ------------------------------------------------------------------------
    // Pulses
    // ------------------------------------------------------------------------

    pub fn run(
        &mut self,
        biome: &mut Biome,
        pulses: u64,
    ) -> Result<Vec<PulseReport>, SimulationError> {
        (0..pulses).map(|_| self.run_pulse(biome)).collect()
    }

    pub fn run_pulse(&mut self, biome: &mut Biome) -> Result<PulseReport, SimulationError> {
        self.pulse += 1;
        let mut report = PulseReport {
            pulse: self.pulse,
            ..PulseReport::default()
        };
        for dish_id in biome.dish_ids() {
            let mut ctx = dish_or_err(biome, &dish_id)?;
            for agent_id in ctx.dish.organism_ids() {
                if !ctx.dish.contains(&agent_id) {
                    continue;
                }
                report.slices.push(self.run_slice(&mut ctx, &agent_id)?);
            }
            let unfit = self.reaper.reap_unfit(ctx.dish, ctx.abiotic)?;
            report
                .unfit
                .extend(unfit.iter().map(|organism| organism.agent_id().to_string()));
        }
        info!(
            pulse = self.pulse,
            slices = report.slices.len(),
            births = report.births(),
            deaths = report.deaths(),
            "pulse complete"
        );
        Ok(report)
    }

    fn run_slice(
        &mut self,
        ctx: &mut DishContext<'_>,
        agent_id: &str,
    ) -> Result<SliceResult, SimulationError> {
        self.slice_counter += 1;
        let pulse = self.pulse;
        let slice = self.slice_counter;
        let dish_id = ctx.dish.id().to_string();

        let social = ctx
            .dish
            .social_context(agent_id, pulse, slice, self.radius)
            .ok_or_else(|| unknown_organism(agent_id))?;
        let observation = ctx
            .dish
            .observe(agent_id, social)
            .ok_or_else(|| unknown_organism(agent_id))?;
        let organism = ctx
            .dish
            .organism_mut(agent_id)
            .ok_or_else(|| unknown_organism(agent_id))?;

        let mut result = SliceResult {
            dish_id: dish_id.clone(),
            agent_id: agent_id.to_string(),
            genome_id: organism.genome_id().to_string(),
            pulse,
            slice,
            halted: false,
            outcomes: Vec::new(),
            error: None,
            breach: None,
            reaped: false,
            born: Vec::new(),
        };

        organism.observe(&observation);
        let mut rationale = None;
        match organism.decide(&observation) {
            Err(err) => result.error = Some(err.to_string()),
            Ok(decision) if decision.stop => {
                result.halted = true;
                rationale = decision.rationale;
            }
            Ok(decision) => {
                rationale = decision.rationale.clone();
                self.act_all(ctx, agent_id, &decision.actions, &mut result)?;
            }
        }

        if result.breach.is_none() {
            if let Some(organism) = ctx.dish.organism_mut(agent_id) {
                if !result.halted {
                    organism.reflect(pulse, &result.outcomes);
                }
                organism.advance_gestation(pulse);
            }
            if !result.halted {
                result.born = conjugation::complete_ready_seeds(
                    ctx.dish,
                    agent_id,
                    ctx.ids,
                    &mut self.rng,
                    self.log.as_ref(),
                    pulse,
                )?;
            }
        }

        self.log_slice(ctx, &result, social, rationale)?;

        if let Some(reason) = result.breach.clone() {
            let reaped =
                self.reaper
                    .reap(ctx.dish, agent_id, DeathType::Boundary, &reason)?;
            result.reaped = reaped.is_some();
        }

        debug!(
            pulse,
            slice,
            dish_id = %dish_id,
            agent_id,
            halted = result.halted,
            actions = result.outcomes.len(),
            "slice complete"
        );
        Ok(result)
    }

    /// Act proposed actions in order, stopping at the first boundary breach.
    fn act_all(
        &mut self,
        ctx: &mut DishContext<'_>,
        agent_id: &str,
        actions: &[ProposedAction],
        result: &mut SliceResult,
    ) -> Result<(), SimulationError> {
        let mut tally = SliceActionTally::default();
        for action in actions {
            let verdict = self.reaper.check_boundary(action, &tally, ctx.abiotic);
            if verdict.breached {
                result.breach = verdict.reason;
                break;
            }
            let outcome = self.act(ctx, agent_id, action)?;
            tally.record(action);
            result.outcomes.push(outcome);
        }
        Ok(())
    }

    fn act(
        &mut self,
        ctx: &mut DishContext<'_>,
        agent_id: &str,
        action: &ProposedAction,
    ) -> Result<ActionOutcome, ObserverError> {
        let cost = ctx.abiotic.action_energy_cost;
        let is_rest = matches!(action, ProposedAction::Rest);
        let energy = ctx
            .dish
            .organism(agent_id)
            .map(Organism::energy)
            .unwrap_or_default();
        if !is_rest && energy < cost {
            return Ok(ActionOutcome::failed(
                action.clone(),
                format!("exhausted: energy {energy} below action cost {cost}"),
            ));
        }

        let effect = self.execute(ctx, agent_id, action)?;
        if !is_rest {
            if let Some(organism) = ctx.dish.organism_mut(agent_id) {
                organism.spend_energy(cost);
            }
        }
        Ok(match effect {
            Ok(value) => ActionOutcome::ok(action.clone(), value),
            Err(err) => ActionOutcome::failed(action.clone(), err.to_string()),
        })
    }

    /// Outer error: the event log failed. Inner error: the action failed.
    fn execute(
        &mut self,
        ctx: &mut DishContext<'_>,
        agent_id: &str,
        action: &ProposedAction,
    ) -> Result<Result<Value, BehaviorError>, ObserverError> {
        let dish = &mut *ctx.dish;
        let effect = match action {
            ProposedAction::Move { dx, dy } => step(dish, agent_id, *dx, *dy),
            ProposedAction::Grab { item_id } => dish
                .grab_item(agent_id, item_id)
                .map(|()| json!({ "item_id": item_id })),
            ProposedAction::Drop { item_id } => dish
                .drop_item(agent_id, item_id)
                .map(|()| json!({ "item_id": item_id })),
            ProposedAction::Stow { item_id } => with_organism(dish, agent_id, |organism| {
                organism.stow(item_id)?;
                Ok(json!({ "item_id": item_id }))
            }),
            ProposedAction::Retrieve { item_id } => with_organism(dish, agent_id, |organism| {
                organism.retrieve(item_id)?;
                Ok(json!({ "item_id": item_id }))
            }),
            ProposedAction::Rest => {
                let gain = ctx.abiotic.rest_energy_gain;
                with_organism(dish, agent_id, |organism| {
                    Ok(json!({ "energy": organism.replenish(gain) }))
                })
            }
            ProposedAction::Conjugate { partner } => {
                self.seed_counter += 1;
                let seed_id = format!("seed-{:06}", self.seed_counter);
                match conjugation::seed(dish, agent_id, partner, ctx.abiotic, self.pulse, seed_id)
                {
                    Ok(outcome) => {
                        conjugation::record_seeding(dish, &outcome, self.log.as_ref())?;
                        Ok(json!({
                            "seed_id": outcome.seed_id,
                            "carrier": outcome.carrier,
                        }))
                    }
                    Err(err) => Err(err.into()),
                }
            }
            ProposedAction::UseTool { .. }
            | ProposedAction::ReadFile { .. }
            | ProposedAction::WriteFile { .. }
            | ProposedAction::NetworkRequest { .. } => {
                with_organism(dish, agent_id, |organism| organism.perform(action))
            }
        };
        Ok(effect)
    }

    fn log_slice(
        &self,
        ctx: &mut DishContext<'_>,
        result: &SliceResult,
        social: SocialContext,
        rationale: Option<String>,
    ) -> Result<(), ObserverError> {
        let Some(organism) = ctx.dish.organism_mut(&result.agent_id) else {
            return Ok(());
        };
        let event = organism
            .event(EventType::Survival)
            .with_payload("kind", "metabolic_action")
            .with_payload("pulse", result.pulse)
            .with_payload("slice", result.slice)
            .with_payload("dish_id", result.dish_id.as_str())
            .with_payload("halted", result.halted)
            .with_payload("context", serde_json::to_value(social)?)
            .with_payload("outcomes", serde_json::to_value(&result.outcomes)?)
            .with_payload("error", result.error.clone())
            .with_payload("breach", result.breach.clone())
            .with_payload("born", result.born.clone())
            .with_payload("rationale", rationale)
            .with_payload("energy", organism.energy());
        organism.emit(self.log.as_ref(), event)
    }

    // ------------------------------------------------------------------------
    // Lifecycle operations
    // ------------------------------------------------------------------------

    /// Seed a conjugation outside of any slice. The seed's first counted
    /// pulse is the next one run.
    pub fn trigger_conjugation(
        &mut self,
        biome: &mut Biome,
        dish_id: &str,
        initiator: &str,
        partner: &str,
    ) -> Result<SeedingOutcome, SimulationError> {
        let ctx = dish_or_err(biome, dish_id)?;
        self.seed_counter += 1;
        let seed_id = format!("seed-{:06}", self.seed_counter);
        let outcome =
            conjugation::seed(ctx.dish, initiator, partner, ctx.abiotic, self.pulse, seed_id)?;
        conjugation::record_seeding(ctx.dish, &outcome, self.log.as_ref())?;
        Ok(outcome)
    }

    /// Record an evaluation result as a `gym_eval` event.
    pub fn record_fitness(
        &mut self,
        biome: &mut Biome,
        dish_id: &str,
        agent_id: &str,
        fitness: FitnessMetrics,
    ) -> Result<(), SimulationError> {
        let ctx = dish_or_err(biome, dish_id)?;
        let organism = ctx
            .dish
            .organism_mut(agent_id)
            .ok_or_else(|| unknown_organism(agent_id))?;
        let event = organism
            .event(EventType::GymEval)
            .with_payload("pulse", self.pulse)
            .with_payload("dish_id", dish_id)
            .with_fitness(fitness);
        organism.emit(self.log.as_ref(), event)?;
        Ok(())
    }

    pub fn mutate(
        &mut self,
        biome: &mut Biome,
        dish_id: &str,
        agent_id: &str,
        patch: &Value,
    ) -> Result<GenomeId, SimulationError> {
        let ctx = dish_or_err(biome, dish_id)?;
        let organism = ctx
            .dish
            .organism_mut(agent_id)
            .ok_or_else(|| unknown_organism(agent_id))?;
        organism.mutate(patch, self.log.as_ref())
    }

    /// Close the session: the `session_end` marker listing every living
    /// organism per dish, then a `survival` event for each of them.
    pub fn end_session(&mut self, biome: &mut Biome) -> Result<EvolutionaryEvent, SimulationError> {
        let mut living = serde_json::Map::new();
        for dish in biome.dishes() {
            let members: Vec<Value> = dish
                .organisms()
                .map(|organism| {
                    let pos = dish.organism_position(organism.agent_id());
                    json!({
                        "agent_id": organism.agent_id(),
                        "genome_id": organism.genome_id(),
                        "generation": organism.generation(),
                        "energy": organism.energy(),
                        "position": pos,
                    })
                })
                .collect();
            living.insert(dish.id().to_string(), Value::Array(members));
        }
        let mut payload = BTreeMap::new();
        payload.insert("biome".to_string(), Value::from(biome.name()));
        payload.insert("pulse".to_string(), Value::from(self.pulse));
        payload.insert("slices".to_string(), Value::from(self.slice_counter));
        payload.insert("population".to_string(), Value::from(biome.population()));
        payload.insert("living".to_string(), Value::Object(living));
        let marker = EvolutionaryEvent::session_end(payload);
        self.log.append(&marker)?;

        for dish_id in biome.dish_ids() {
            let ctx = dish_or_err(biome, &dish_id)?;
            for agent_id in ctx.dish.organism_ids() {
                let Some(organism) = ctx.dish.organism_mut(&agent_id) else {
                    continue;
                };
                let event = organism
                    .event(EventType::Survival)
                    .with_payload("kind", "session_survivor")
                    .with_payload("pulse", self.pulse)
                    .with_payload("dish_id", dish_id.as_str())
                    .with_payload("energy", organism.energy());
                organism.emit(self.log.as_ref(), event)?;
            }
        }
        info!(
            pulse = self.pulse,
            population = biome.population(),
            "session closed"
        );
        Ok(marker)
    }
}

// ============================================================================
// Helpers
// ============================================================================

fn dish_or_err<'a>(
    biome: &'a mut Biome,
    dish_id: &str,
) -> Result<DishContext<'a>, SimulationError> {
    biome
        .dish_context(dish_id)
        .ok_or_else(|| SimulationError::UnknownDish {
            dish_id: dish_id.to_string(),
        })
}

fn unknown_organism(agent_id: &str) -> PlacementError {
    PlacementError::UnknownOrganism {
        agent_id: agent_id.to_string(),
    }
}

fn with_organism<F>(
    dish: &mut super::dish::Dish,
    agent_id: &str,
    apply: F,
) -> Result<Value, BehaviorError>
where
    F: FnOnce(&mut Organism) -> Result<Value, BehaviorError>,
{
    let organism = dish
        .organism_mut(agent_id)
        .ok_or_else(|| unknown_organism(agent_id))?;
    apply(organism)
}

/// One Moore step. Both components must lie in -1..=1 and not both be zero.
fn step(
    dish: &mut super::dish::Dish,
    agent_id: &str,
    dx: i32,
    dy: i32,
) -> Result<Value, BehaviorError> {
    if !(-1..=1).contains(&dx) || !(-1..=1).contains(&dy) || (dx == 0 && dy == 0) {
        return Err(BehaviorError::Effect(format!(
            "invalid step ({dx}, {dy})"
        )));
    }
    let from = dish
        .organism_position(agent_id)
        .ok_or_else(|| unknown_organism(agent_id))?;
    let to = from.offset(dx, dy).ok_or(PlacementError::OutOfBounds {
        pos: from,
        width: dish.width(),
        height: dish.height(),
    })?;
    dish.move_organism(agent_id, to)?;
    Ok(json!({ "x": to.x, "y": to.y }))
}
