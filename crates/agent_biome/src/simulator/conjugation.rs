//! Two-phase reproduction: seeding, then gestation and birth.
//!
//! Seeding is gated on Moore adjacency and energy. The seed rides in one
//! parent's pocket until that parent has been granted enough pulses, then a
//! recombined child is placed next to parent A.

use rand::Rng;
use serde_json::Value;
use tracing::{debug, info};

use crate::geometry::{chebyshev_distance, GridPos};

use super::biome::{AbioticFactors, AgentIdAllocator};
use super::dish::Dish;
use super::error::{ConjugationError, IdentityError, ObserverError, SimulationError};
use super::events::EventType;
use super::identity::compute_genome_id;
use super::naming::{culture_of, generate_hybrid_name, generate_name};
use super::observer::EventLog;
use super::organism::{AgentConfig, Archetype, DevelopingSeed, Organism, SeedParent};
use super::types::{
    AgentId, Pulse, CONJUGATION_ENERGY_THRESHOLD, GENOME_STATE_VERSION,
    INHERIT_PARENT_A_PERCENT, INHERIT_PARENT_B_PERCENT,
};

/// Trait key recording the parents of a conjugation child.
const CONJUGATION_TRAIT: &str = "conjugation";
const CONJUGATION_NONCE_TRAIT: &str = "conjugation_nonce";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeedingOutcome {
    pub seed_id: String,
    pub parent_a: AgentId,
    pub parent_b: AgentId,
    pub carrier: AgentId,
}

// ============================================================================
// Seeding
// ============================================================================

/// Plant a developing seed. `initiator` becomes parent A.
///
/// Both parents pay the conjugation energy cost. The seed goes to the parent
/// with more free pocket slots; on a tie, to the one with the smaller genome
/// id (then the smaller agent id).
pub fn seed(
    dish: &mut Dish,
    initiator: &str,
    partner: &str,
    factors: &AbioticFactors,
    pulse: Pulse,
    seed_id: String,
) -> Result<SeedingOutcome, ConjugationError> {
    if initiator == partner {
        return Err(ConjugationError::SameOrganism);
    }
    let pos_a = locate(dish, initiator)?;
    let pos_b = locate(dish, partner)?;
    let distance = chebyshev_distance(pos_a, pos_b);
    if distance != 1 {
        return Err(ConjugationError::NotAdjacent { distance });
    }

    let (a, b) = match (dish.organism(initiator), dish.organism(partner)) {
        (Some(a), Some(b)) => (a, b),
        (None, _) => return Err(unknown(initiator)),
        (_, None) => return Err(unknown(partner)),
    };
    for organism in [a, b] {
        if organism.energy() <= CONJUGATION_ENERGY_THRESHOLD
            || organism.energy() < factors.conjugation_energy_cost
        {
            return Err(ConjugationError::InsufficientEnergy {
                agent_id: organism.agent_id().to_string(),
                energy: organism.energy(),
            });
        }
    }
    let generation = a.generation().max(b.generation()) + 1;
    if generation > factors.max_generations {
        return Err(ConjugationError::GenerationLimit {
            generation,
            max: factors.max_generations,
        });
    }

    let (a_free, b_free) = (a.pocket_free(), b.pocket_free());
    if a_free == 0 && b_free == 0 {
        return Err(ConjugationError::NoPocketSpace);
    }
    let carrier = if a_free != b_free {
        if a_free > b_free {
            initiator
        } else {
            partner
        }
    } else if (a.genome_id(), a.agent_id()) <= (b.genome_id(), b.agent_id()) {
        initiator
    } else {
        partner
    };

    let seed = DevelopingSeed {
        seed_id: seed_id.clone(),
        parent_a: SeedParent {
            agent_id: a.agent_id().to_string(),
            genome_id: a.genome_id().to_string(),
        },
        parent_b: SeedParent {
            agent_id: b.agent_id().to_string(),
            genome_id: b.genome_id().to_string(),
        },
        seeded_at_pulse: pulse,
        gestation_pulses: 0,
    };

    dish.organism_mut(carrier)
        .ok_or_else(|| unknown(carrier))?
        .implant_seed(seed)
        .map_err(|_| ConjugationError::NoPocketSpace)?;
    for agent_id in [initiator, partner] {
        if let Some(organism) = dish.organism_mut(agent_id) {
            organism.spend_energy(factors.conjugation_energy_cost);
        }
    }

    Ok(SeedingOutcome {
        seed_id,
        parent_a: initiator.to_string(),
        parent_b: partner.to_string(),
        carrier: carrier.to_string(),
    })
}

/// Record the conjugation on both parents.
pub fn record_seeding(
    dish: &mut Dish,
    outcome: &SeedingOutcome,
    log: &dyn EventLog,
) -> Result<(), ObserverError> {
    let partner_genomes = [
        (&outcome.parent_a, &outcome.parent_b),
        (&outcome.parent_b, &outcome.parent_a),
    ]
    .map(|(own, other)| {
        let genome = dish
            .organism(other)
            .map(|organism| organism.genome_id().to_string());
        (own.clone(), other.clone(), genome)
    });
    for (own, other, other_genome) in partner_genomes {
        let Some(organism) = dish.organism_mut(&own) else {
            continue;
        };
        let event = organism
            .event(EventType::Survival)
            .with_payload("kind", "conjugation_seeded")
            .with_payload("seed_id", outcome.seed_id.as_str())
            .with_payload("partner_agent_id", other)
            .with_payload("partner_genome_id", other_genome)
            .with_payload("carrier", outcome.carrier.as_str())
            .with_payload("energy", organism.energy());
        organism.emit(log, event)?;
    }
    info!(
        seed_id = %outcome.seed_id,
        parent_a = %outcome.parent_a,
        parent_b = %outcome.parent_b,
        carrier = %outcome.carrier,
        "conjugation seeded"
    );
    Ok(())
}

fn locate(dish: &Dish, agent_id: &str) -> Result<GridPos, ConjugationError> {
    dish.organism_position(agent_id)
        .ok_or_else(|| unknown(agent_id))
}

fn unknown(agent_id: &str) -> ConjugationError {
    ConjugationError::UnknownOrganism {
        agent_id: agent_id.to_string(),
    }
}

// ============================================================================
// Recombination
// ============================================================================

/// Sentence-wise alternating merge: A's first segment, B's second, A's third
/// and so on, falling back to whichever parent still has a segment.
pub fn merge_directives(a: &AgentConfig, b: &AgentConfig) -> String {
    let segments_a = a.directive_segments();
    let segments_b = b.directive_segments();
    let longest = segments_a.len().max(segments_b.len());
    let mut merged = Vec::with_capacity(longest);
    for index in 0..longest {
        let (first, second) = if index % 2 == 0 {
            (&segments_a, &segments_b)
        } else {
            (&segments_b, &segments_a)
        };
        if let Some(segment) = first.get(index).or_else(|| second.get(index)) {
            merged.push(*segment);
        }
    }
    merged.join(" ")
}

/// 49% parent A, 49% parent B, 2% a uniformly random archetype.
pub fn inherit_archetype<R: Rng + ?Sized>(a: Archetype, b: Archetype, rng: &mut R) -> Archetype {
    let roll: u32 = rng.gen_range(0..100);
    if roll < INHERIT_PARENT_A_PERCENT {
        a
    } else if roll < INHERIT_PARENT_A_PERCENT + INHERIT_PARENT_B_PERCENT {
        b
    } else {
        Archetype::ALL[rng.gen_range(0..Archetype::ALL.len())]
    }
}

/// Synthesize the child of `a` and `b`. The child's genome id never equals
/// either parent's.
pub fn recombine<R: Rng + ?Sized>(
    a: &Organism,
    b: &Organism,
    agent_id: AgentId,
    rng: &mut R,
) -> Result<Organism, IdentityError> {
    let mut config = AgentConfig::new(a.config().name.clone(), merge_directives(a.config(), b.config()));
    config.capabilities = a.config().capabilities.clone();
    for capability in &b.config().capabilities {
        if !config.capabilities.contains(capability) {
            config.capabilities.push(capability.clone());
        }
    }
    config.traits = b.config().traits.clone();
    config.traits.extend(a.config().traits.clone());
    config.traits.insert(
        CONJUGATION_TRAIT.to_string(),
        Value::from(vec![a.genome_id(), b.genome_id()]),
    );
    config.traits.remove(CONJUGATION_NONCE_TRAIT);

    let archetype = inherit_archetype(a.archetype(), b.archetype(), rng);
    let fingerprint = a.code_fingerprint().to_string();
    let mut genome_id = compute_genome_id(&config, &fingerprint, GENOME_STATE_VERSION)?;
    let mut nonce: u64 = 0;
    while genome_id == a.genome_id() || genome_id == b.genome_id() {
        nonce += 1;
        config
            .traits
            .insert(CONJUGATION_NONCE_TRAIT.to_string(), Value::from(nonce));
        genome_id = compute_genome_id(&config, &fingerprint, GENOME_STATE_VERSION)?;
    }

    let designation = if culture_of(a.genome_id()) != culture_of(b.genome_id()) {
        generate_hybrid_name(a.genome_id(), b.genome_id())
    } else {
        generate_name(&genome_id)
    };
    let generation = a.generation().max(b.generation()) + 1;
    Ok(Organism::offspring(
        agent_id,
        genome_id,
        config,
        fingerprint,
        archetype,
        designation,
        a,
        generation,
        a.fork_behavior(),
    ))
}

// ============================================================================
// Gestation
// ============================================================================

/// Resolve every ready seed carried by `carrier_id`.
///
/// A seed whose parent is gone is cancelled. A seed with no free cell around
/// parent A stays in the pocket and is retried on a later pulse. Returns the
/// agent ids of children born.
pub fn complete_ready_seeds<R: Rng + ?Sized>(
    dish: &mut Dish,
    carrier_id: &str,
    ids: &mut AgentIdAllocator,
    rng: &mut R,
    log: &dyn EventLog,
    pulse: Pulse,
) -> Result<Vec<AgentId>, SimulationError> {
    let ready = match dish.organism(carrier_id) {
        Some(carrier) => carrier.ready_seed_ids(),
        None => return Ok(Vec::new()),
    };
    let mut born = Vec::new();
    for seed_id in ready {
        let Some(seed) = dish
            .organism(carrier_id)
            .and_then(|carrier| carrier.seed(&seed_id))
            .cloned()
        else {
            continue;
        };
        let parent_a = dish.find_by_genome(&seed.parent_a.genome_id, &seed.parent_a.agent_id);
        let parent_b = dish.find_by_genome(&seed.parent_b.genome_id, &seed.parent_b.agent_id);
        let (Some(parent_a), Some(parent_b)) = (parent_a, parent_b) else {
            cancel_seed(dish, carrier_id, &seed, log)?;
            continue;
        };
        let Some(pos_a) = dish.organism_position(&parent_a) else {
            continue;
        };
        let Some(target) = dish.free_moore_cell(pos_a) else {
            debug!(
                pulse,
                seed_id = %seed.seed_id,
                agent_id = %parent_a,
                "no free cell for child, birth deferred"
            );
            continue;
        };

        let mut child = match (dish.organism(&parent_a), dish.organism(&parent_b)) {
            (Some(a), Some(b)) => recombine(a, b, ids.next_id(), rng)?,
            _ => continue,
        };
        let spawn = child
            .event(EventType::Spawn)
            .with_payload("kind", "conjugation_birth")
            .with_payload("seed_id", seed.seed_id.as_str())
            .with_payload("dish_id", dish.id())
            .with_payload("parent_b_genome_id", seed.parent_b.genome_id.as_str())
            .with_payload("parent_b_agent_id", parent_b.as_str())
            .with_payload("carrier", carrier_id)
            .with_payload("archetype", child.archetype().as_str())
            .with_payload("designation", child.designation())
            .with_payload("pulse", pulse)
            .with_payload("x", target.x)
            .with_payload("y", target.y);
        child.emit(log, spawn)?;

        if let Some(carrier) = dish.organism_mut(carrier_id) {
            carrier.take_seed(&seed.seed_id);
        }
        let child_id = child.agent_id().to_string();
        info!(
            pulse,
            seed_id = %seed.seed_id,
            agent_id = %child_id,
            genome_id = child.genome_id(),
            generation = child.generation(),
            "child born"
        );
        dish.add_organism(child, target)
            .map_err(|rejected| SimulationError::Placement(rejected.reason))?;
        born.push(child_id);
    }
    Ok(born)
}

fn cancel_seed(
    dish: &mut Dish,
    carrier_id: &str,
    seed: &DevelopingSeed,
    log: &dyn EventLog,
) -> Result<(), ObserverError> {
    let Some(carrier) = dish.organism_mut(carrier_id) else {
        return Ok(());
    };
    let event = carrier
        .event(EventType::Mutate)
        .with_payload("kind", "gestation_cancelled")
        .with_payload("seed_id", seed.seed_id.as_str())
        .with_payload("parent_a_genome_id", seed.parent_a.genome_id.as_str())
        .with_payload("parent_b_genome_id", seed.parent_b.genome_id.as_str());
    carrier.emit(log, event)?;
    carrier.take_seed(&seed.seed_id);
    info!(seed_id = %seed.seed_id, agent_id = carrier_id, "gestation cancelled");
    Ok(())
}
