use super::*;
use crate::geometry::MOORE_OFFSETS;
use serde_json::json;

fn slice_numbers(log: &InMemoryEventLog) -> Vec<u64> {
    metabolic_entries(log)
        .iter()
        .filter_map(|event| event.payload.get("slice").and_then(|value| value.as_u64()))
        .collect()
}

fn dish0(biome: &Biome) -> &Dish {
    biome.dish("dish-0").expect("dish-0")
}

// ============================================================================
// Scheduling
// ============================================================================

#[test]
fn every_slice_logs_exactly_one_metabolic_entry() {
    let (mut biome, log, mut slicer) = world(6, 6, AbioticFactors::default());
    for (index, name) in ["a", "b", "c"].into_iter().enumerate() {
        spawn(&mut slicer, &mut biome, name, 100.0, Scripted::idle(), at(index as u32 * 2, 0));
    }

    let reports = slicer.run(&mut biome, 4).expect("run");
    assert_eq!(reports.len(), 4);
    assert!(reports.iter().all(|report| report.slices.len() == 3));
    assert_eq!(slicer.pulse(), 4);
    assert_eq!(slicer.slice_counter(), 12);

    assert_eq!(metabolic_entries(&log).len(), 12);
    assert_eq!(slice_numbers(&log), (1..=12).collect::<Vec<_>>());
}

#[test]
fn slices_follow_arrival_order() {
    let (mut biome, _log, mut slicer) = world(6, 6, AbioticFactors::default());
    let late = spawn(&mut slicer, &mut biome, "late", 100.0, Scripted::idle(), at(5, 5));
    let early = spawn(&mut slicer, &mut biome, "early", 100.0, Scripted::idle(), at(0, 0));

    let report = slicer.run_pulse(&mut biome).expect("pulse");
    let order: Vec<&str> = report
        .slices
        .iter()
        .map(|slice| slice.agent_id.as_str())
        .collect();
    assert_eq!(order, [late.as_str(), early.as_str()]);
}

#[test]
fn halted_slice_acts_nothing_but_is_logged() {
    let (mut biome, log, mut slicer) = world(4, 4, AbioticFactors::default());
    let behavior = Scripted::with(vec![
        Decision::halt().with_rationale("waiting"),
    ]);
    let agent_id = spawn(&mut slicer, &mut biome, "still", 100.0, behavior, at(1, 1));

    let report = slicer.run_pulse(&mut biome).expect("pulse");
    let slice = &report.slices[0];
    assert!(slice.halted);
    assert!(slice.outcomes.is_empty());
    assert_eq!(dish0(&biome).organism_position(&agent_id), Some(at(1, 1)));

    let entries = metabolic_entries(&log);
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].payload.get("halted"), Some(&json!(true)));
    assert_eq!(entries[0].payload_str("rationale"), Some("waiting"));
}

#[test]
fn behavior_errors_are_captured_and_the_pulse_continues() {
    let (mut biome, log, mut slicer) = world(4, 4, AbioticFactors::default());
    let broken = spawn(&mut slicer, &mut biome, "broken", 100.0, Scripted::failing("lost"), at(0, 0));
    let mover = spawn(
        &mut slicer,
        &mut biome,
        "mover",
        100.0,
        Scripted::with(vec![Decision::act(vec![ProposedAction::Move { dx: 1, dy: 1 }])]),
        at(2, 2),
    );

    let report = slicer.run_pulse(&mut biome).expect("pulse");
    assert_eq!(report.slices.len(), 2);
    let error = report.slices[0].error.clone().expect("captured error");
    assert!(error.contains("lost"), "{error}");
    assert!(dish0(&biome).contains(&broken));
    assert_eq!(dish0(&biome).organism_position(&mover), Some(at(3, 3)));

    let entries = metabolic_entries(&log);
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].agent_id, broken);
    assert!(entries[0].payload_str("error").is_some());
}

#[test]
fn social_context_reports_neighbors_and_density() {
    let (mut biome, log, mut slicer) = world(4, 4, AbioticFactors::default());
    spawn(&mut slicer, &mut biome, "a", 100.0, Scripted::idle(), at(0, 0));
    spawn(&mut slicer, &mut biome, "b", 100.0, Scripted::idle(), at(1, 1));

    slicer.run_pulse(&mut biome).expect("pulse");
    let entries = metabolic_entries(&log);
    let context = entries[0].payload.get("context").expect("context");
    assert_eq!(context["neighbor_count"], json!(1));
    assert_eq!(context["population_density"], json!(2.0 / 16.0));
    assert_eq!(context["pulse"], json!(1));
    assert_eq!(context["slice"], json!(1));
}

#[test]
fn unbounded_radius_counts_every_other_organism() {
    let (mut biome, log, slicer) = world(5, 5, AbioticFactors::default());
    let mut slicer = slicer.with_radius(u32::MAX);
    spawn(&mut slicer, &mut biome, "a", 100.0, Scripted::idle(), at(0, 0));
    spawn(&mut slicer, &mut biome, "b", 100.0, Scripted::idle(), at(4, 4));
    spawn(&mut slicer, &mut biome, "c", 100.0, Scripted::idle(), at(2, 0));

    slicer.run_pulse(&mut biome).expect("pulse");
    let entries = metabolic_entries(&log);
    assert_eq!(entries.len(), 3);
    for entry in entries {
        let context = entry.payload.get("context").expect("context");
        assert_eq!(context["neighbor_count"], json!(2));
    }
}

// ============================================================================
// Event log failures
// ============================================================================

fn refusing_world(kind: &'static str) -> (Biome, Arc<RefusingLog>, Slicer) {
    let mut biome = Biome::new("test-biome", AbioticFactors::default()).expect("biome");
    biome.add_dish("dish-0", 4, 4).expect("add dish");
    let log = RefusingLog::shared(kind);
    let slicer = Slicer::new(log.clone(), 7);
    (biome, log, slicer)
}

#[test]
fn failed_metabolic_append_aborts_the_pulse() {
    let (mut biome, log, mut slicer) = refusing_world("metabolic_action");
    let first = spawn(&mut slicer, &mut biome, "a", 100.0, Scripted::idle(), at(0, 0));
    let second = spawn(&mut slicer, &mut biome, "b", 100.0, Scripted::idle(), at(3, 3));

    let err = slicer.run_pulse(&mut biome).expect_err("append fails");
    assert_eq!(
        err,
        SimulationError::Observer(ObserverError::Io("disk full".to_string()))
    );
    assert_eq!(slicer.slice_counter(), 1);
    assert!(dish0(&biome).contains(&first));
    assert!(dish0(&biome).contains(&second));

    let events = log.replay().expect("replay");
    assert_eq!(events.len(), 2);
    assert!(events
        .iter()
        .all(|event| event.event_type == EventType::Spawn));
}

#[test]
fn failed_spawn_append_takes_the_organism_back_out() {
    let (mut biome, log, mut slicer) = refusing_world("birth");
    let organism = Organism::birth("org-x", config("a"), fingerprint(), Scripted::idle())
        .expect("valid organism");

    let err = slicer
        .place(&mut biome, "dish-0", organism, at(1, 1))
        .expect_err("append fails");
    assert!(matches!(err, SimulationError::Observer(ObserverError::Io(_))));

    let dish = dish0(&biome);
    assert!(!dish.contains("org-x"));
    assert_eq!(dish.occupant_at(at(1, 1)), None);
    assert_eq!(dish.population(), 0);
    assert!(dish.is_consistent());
    assert!(log.is_empty().expect("is_empty"));
}

// ============================================================================
// Actions and energy
// ============================================================================

#[test]
fn actions_cost_energy_and_rest_restores_it() {
    let (mut biome, _log, mut slicer) = world(4, 4, AbioticFactors::default());
    let walker = spawn(
        &mut slicer,
        &mut biome,
        "walker",
        60.0,
        Scripted::with(vec![Decision::act(vec![
            ProposedAction::Move { dx: 1, dy: 0 },
            ProposedAction::Move { dx: 2, dy: 0 },
            ProposedAction::Move { dx: 0, dy: -1 },
        ])]),
        at(0, 0),
    );
    let sleeper = spawn(
        &mut slicer,
        &mut biome,
        "sleeper",
        50.0,
        Scripted::with(vec![Decision::act(vec![ProposedAction::Rest])]),
        at(3, 3),
    );

    let report = slicer.run_pulse(&mut biome).expect("pulse");
    let outcomes = &report.slices[0].outcomes;
    assert!(outcomes[0].success);
    assert!(!outcomes[1].success, "step of two cells is refused");
    assert!(!outcomes[2].success, "step off the grid is refused");

    let dish = dish0(&biome);
    assert_eq!(dish.organism_position(&walker), Some(at(1, 0)));
    assert_eq!(dish.organism(&walker).expect("walker").energy(), 57.0);
    assert_eq!(dish.organism(&sleeper).expect("sleeper").energy(), 55.0);
}

#[test]
fn exhausted_organisms_cannot_act() {
    let (mut biome, _log, mut slicer) = world(4, 4, AbioticFactors::default());
    let tired = spawn(
        &mut slicer,
        &mut biome,
        "tired",
        0.5,
        Scripted::with(vec![Decision::act(vec![
            ProposedAction::Move { dx: 1, dy: 0 },
            ProposedAction::Rest,
        ])]),
        at(0, 0),
    );

    let report = slicer.run_pulse(&mut biome).expect("pulse");
    let outcomes = &report.slices[0].outcomes;
    let error = outcomes[0].error.clone().unwrap_or_default();
    assert!(error.contains("exhausted"), "{error}");
    assert!(outcomes[1].success);

    let organism = dish0(&biome).organism(&tired).expect("tired");
    assert_eq!(organism.energy(), 5.5);
    assert_eq!(dish0(&biome).organism_position(&tired), Some(at(0, 0)));
}

#[test]
fn external_actions_go_through_perform() {
    let (mut biome, _log, mut slicer) = world(4, 4, AbioticFactors::default());
    spawn(
        &mut slicer,
        &mut biome,
        "reader",
        100.0,
        Scripted::with(vec![Decision::act(vec![ProposedAction::ReadFile {
            path: "notes/today.txt".to_string(),
        }])]),
        at(0, 0),
    );

    let report = slicer.run_pulse(&mut biome).expect("pulse");
    let outcome = &report.slices[0].outcomes[0];
    assert!(outcome.success);
    assert_eq!(outcome.result, json!({ "performed": "read_file" }));
}

#[test]
fn items_can_be_grabbed_and_stowed() {
    let (mut biome, _log, mut slicer) = world(4, 4, AbioticFactors::default());
    let item = Item::plain("pebble", 0.5).expect("item");
    let item_id = item.id.clone();
    biome
        .dish_mut("dish-0")
        .expect("dish")
        .add_item(item, at(1, 1))
        .expect("add item");

    let holder = (0..1_000)
        .map(|index| format!("holder-{index}"))
        .find(|name| {
            let probe = organism("probe", name);
            probe.archetype().appendage_capacity() > 0 && probe.archetype().pocket_capacity() > 0
        })
        .expect("archetype with an appendage");
    let agent_id = spawn(
        &mut slicer,
        &mut biome,
        &holder,
        100.0,
        Scripted::with(vec![Decision::act(vec![
            ProposedAction::Grab { item_id: item_id.clone() },
            ProposedAction::Stow { item_id: item_id.clone() },
        ])]),
        at(1, 1),
    );

    let report = slicer.run_pulse(&mut biome).expect("pulse");
    assert!(report.slices[0].outcomes.iter().all(|outcome| outcome.success));
    let organism = dish0(&biome).organism(&agent_id).expect("holder");
    assert!(organism.appendage().is_empty());
    assert_eq!(organism.pocket().len(), 1);
    assert!(dish0(&biome).items_at(at(1, 1)).is_empty());
}

// ============================================================================
// Conjugation and gestation
// ============================================================================

#[test]
fn conjugate_action_seeds_both_parents() {
    let (mut biome, log, mut slicer) = world(6, 6, AbioticFactors::default());
    let b = spawn(&mut slicer, &mut biome, "b", 90.0, Scripted::idle(), at(3, 2));
    let a = spawn(
        &mut slicer,
        &mut biome,
        "a",
        90.0,
        Scripted::with(vec![Decision::act(vec![ProposedAction::Conjugate {
            partner: b.clone(),
        }])]),
        at(2, 2),
    );

    let report = slicer.run_pulse(&mut biome).expect("pulse");
    let outcome = &report.slices[1].outcomes[0];
    assert!(outcome.success, "{:?}", outcome.error);
    assert_eq!(outcome.result["seed_id"], json!("seed-000001"));

    let dish = dish0(&biome);
    assert_eq!(dish.organism(&a).expect("a").energy(), 79.0);
    assert_eq!(dish.organism(&b).expect("b").energy(), 80.0);
    let seeded: Vec<_> = events_of(&log, EventType::Survival)
        .into_iter()
        .filter(|event| event.payload_str("kind") == Some("conjugation_seeded"))
        .collect();
    assert_eq!(seeded.len(), 2);
}

#[test]
fn failed_conjugation_is_an_ordinary_failed_action() {
    let (mut biome, _log, mut slicer) = world(6, 6, AbioticFactors::default());
    let far = spawn(&mut slicer, &mut biome, "far", 90.0, Scripted::idle(), at(5, 5));
    spawn(
        &mut slicer,
        &mut biome,
        "lonely",
        90.0,
        Scripted::with(vec![Decision::act(vec![ProposedAction::Conjugate { partner: far }])]),
        at(0, 0),
    );

    let report = slicer.run_pulse(&mut biome).expect("pulse");
    let outcome = &report.slices[1].outcomes[0];
    assert!(!outcome.success);
    assert_eq!(report.deaths(), 0);
}

/// Seeds `a` at (2, 2) and `b` at (3, 2) before any pulse has run.
fn seeded_pair(
    width: u32,
    height: u32,
) -> (Biome, Arc<InMemoryEventLog>, Slicer, AgentId, AgentId, SeedingOutcome) {
    let (mut biome, log, mut slicer) = world(width, height, AbioticFactors::default());
    let a = spawn(&mut slicer, &mut biome, "a", 75.0, Scripted::idle(), at(2, 2));
    let b = spawn(&mut slicer, &mut biome, "b", 80.0, Scripted::idle(), at(3, 2));
    let outcome = slicer
        .trigger_conjugation(&mut biome, "dish-0", &a, &b)
        .expect("seed");
    (biome, log, slicer, a, b, outcome)
}

#[test]
fn child_is_born_after_exactly_five_granted_pulses() {
    let (mut biome, log, mut slicer, a, _b, outcome) = seeded_pair(6, 6);
    {
        let dish = dish0(&biome);
        assert_eq!(dish.organism(&a).expect("a").energy(), 65.0);
        let carrier = dish.organism(&outcome.carrier).expect("carrier");
        assert_eq!(carrier.developing_seeds()[0].seeded_at_pulse, 0);
    }

    let reports = slicer.run(&mut biome, 4).expect("four pulses");
    assert!(reports.iter().all(|report| report.births() == 0));
    assert_eq!(biome.population(), 2);

    let report = slicer.run_pulse(&mut biome).expect("fifth pulse");
    assert_eq!(report.births(), 1);
    assert_eq!(report.slices.len(), 2, "newborns get no slice in their birth pulse");
    assert_eq!(biome.population(), 3);

    let dish = dish0(&biome);
    let child_id = report
        .slices
        .iter()
        .flat_map(|slice| slice.born.iter())
        .next()
        .expect("child id")
        .clone();
    let child = dish.organism(&child_id).expect("child in dish");
    let parent_a = dish.organism(&a).expect("parent a");
    assert_eq!(child.parent_id(), Some(parent_a.genome_id()));
    assert_eq!(child.generation(), 1);
    assert_eq!(dish.organism_position(&child_id), Some(at(1, 1)));
    assert!(dish
        .organism(&outcome.carrier)
        .expect("carrier")
        .developing_seeds()
        .is_empty());

    let births: Vec<_> = events_of(&log, EventType::Spawn)
        .into_iter()
        .filter(|event| event.payload_str("kind") == Some("conjugation_birth"))
        .collect();
    assert_eq!(births.len(), 1);
    assert_eq!(births[0].agent_id, child_id);

    let next = slicer.run_pulse(&mut biome).expect("sixth pulse");
    assert_eq!(next.slices.len(), 3);
}

#[test]
fn birth_waits_for_a_free_cell() {
    let (mut biome, log, mut slicer, a, b, outcome) = seeded_pair(5, 5);
    let mut fillers = Vec::new();
    for (dx, dy) in MOORE_OFFSETS {
        let pos = at(2, 2).offset(dx, dy).expect("inside");
        if pos == at(3, 2) {
            continue;
        }
        fillers.push(spawn(
            &mut slicer,
            &mut biome,
            &format!("filler-{dx}-{dy}"),
            100.0,
            Scripted::idle(),
            pos,
        ));
    }

    let reports = slicer.run(&mut biome, 6).expect("six pulses");
    assert!(reports.iter().all(|report| report.births() == 0));
    let carrier = dish0(&biome).organism(&outcome.carrier).expect("carrier");
    assert_eq!(carrier.developing_seeds().len(), 1);
    assert!(carrier.developing_seeds()[0].is_ready());

    let freed = dish0(&biome)
        .organism_position(&fillers[0])
        .expect("filler position");
    Reaper::new(log.clone())
        .reap(
            biome.dish_mut("dish-0").expect("dish"),
            &fillers[0],
            DeathType::Fitness,
            "cleared for the test",
        )
        .expect("reap");

    let report = slicer.run_pulse(&mut biome).expect("pulse");
    assert_eq!(report.births(), 1);
    let child_id = report
        .slices
        .iter()
        .flat_map(|slice| slice.born.clone())
        .next()
        .expect("child");
    assert_eq!(dish0(&biome).organism_position(&child_id), Some(freed));
    assert!(dish0(&biome).contains(&a) && dish0(&biome).contains(&b));
    assert!(dish0(&biome).is_consistent());
    assert_eq!(
        events_of(&log, EventType::Spawn)
            .iter()
            .filter(|event| event.payload_str("kind") == Some("conjugation_birth"))
            .count(),
        1
    );
}

#[test]
fn losing_a_parent_cancels_the_seed() {
    let (mut biome, log, mut slicer, a, b, outcome) = seeded_pair(6, 6);
    let doomed = if outcome.carrier == a { b } else { a };
    Reaper::new(log.clone())
        .reap(
            biome.dish_mut("dish-0").expect("dish"),
            &doomed,
            DeathType::Fitness,
            "removed",
        )
        .expect("reap");

    let reports = slicer.run(&mut biome, 5).expect("five pulses");
    assert!(reports.iter().all(|report| report.births() == 0));
    assert_eq!(biome.population(), 1);
    let carrier = dish0(&biome).organism(&outcome.carrier).expect("carrier");
    assert!(carrier.developing_seeds().is_empty());

    let cancelled: Vec<_> = events_of(&log, EventType::Mutate)
        .into_iter()
        .filter(|event| event.payload_str("kind") == Some("gestation_cancelled"))
        .collect();
    assert_eq!(cancelled.len(), 1);
    assert_eq!(cancelled[0].agent_id, outcome.carrier);
}

// ============================================================================
// Mortality
// ============================================================================

#[test]
fn boundary_breach_stops_the_slice_and_reaps() {
    let abiotic = AbioticFactors {
        blocked_tools: vec!["rm".to_string()],
        ..AbioticFactors::default()
    };
    let (mut biome, log, mut slicer) = world(4, 4, abiotic);
    let agent_id = spawn(
        &mut slicer,
        &mut biome,
        "vandal",
        100.0,
        Scripted::with(vec![Decision::act(vec![
            ProposedAction::Move { dx: 1, dy: 0 },
            ProposedAction::UseTool {
                tool: "rm".to_string(),
                args: json!({ "path": "/" }),
            },
            ProposedAction::Move { dx: 1, dy: 0 },
        ])]),
        at(0, 0),
    );

    let report = slicer.run_pulse(&mut biome).expect("pulse");
    let slice = &report.slices[0];
    assert_eq!(slice.outcomes.len(), 1);
    assert!(slice.reaped);
    assert!(slice.breach.as_deref().unwrap_or_default().contains("rm"));
    assert_eq!(report.deaths(), 1);
    assert!(!dish0(&biome).contains(&agent_id));

    let events = log.replay().expect("replay");
    let tail: Vec<EventType> = events.iter().rev().take(2).map(|event| event.event_type).collect();
    assert_eq!(tail, [EventType::Death, EventType::Survival]);
    let death = events.last().expect("death");
    assert_eq!(death.payload_str("death_type"), Some("boundary"));
    assert_eq!(metabolic_entries(&log).len(), 1);
}

#[test]
fn path_traversal_kills_on_first_offense() {
    let (mut biome, log, mut slicer) = world(4, 4, AbioticFactors::default());
    spawn(
        &mut slicer,
        &mut biome,
        "escapee",
        100.0,
        Scripted::with(vec![Decision::act(vec![ProposedAction::WriteFile {
            path: "../outside.txt".to_string(),
            content: "hello".to_string(),
        }])]),
        at(0, 0),
    );

    let report = slicer.run_pulse(&mut biome).expect("pulse");
    assert!(report.slices[0].outcomes.is_empty());
    assert!(report.slices[0].reaped);
    assert_eq!(biome.population(), 0);
    assert_eq!(events_of(&log, EventType::Death).len(), 1);
}

#[test]
fn unfit_organisms_are_reaped_at_the_end_of_the_pulse() {
    let abiotic = AbioticFactors {
        fitness_floor: 0.5,
        ..AbioticFactors::default()
    };
    let (mut biome, log, mut slicer) = world(4, 4, abiotic);
    let weak = spawn(&mut slicer, &mut biome, "weak", 100.0, Scripted::idle(), at(0, 0));
    let strong = spawn(&mut slicer, &mut biome, "strong", 100.0, Scripted::idle(), at(2, 0));
    let untested = spawn(&mut slicer, &mut biome, "untested", 100.0, Scripted::idle(), at(0, 2));
    slicer
        .record_fitness(&mut biome, "dish-0", &weak, FitnessMetrics::score(0.2))
        .expect("weak score");
    slicer
        .record_fitness(&mut biome, "dish-0", &strong, FitnessMetrics::score(0.9))
        .expect("strong score");

    let report = slicer.run_pulse(&mut biome).expect("pulse");
    assert_eq!(report.slices.len(), 3, "the sweep runs after every slice");
    assert_eq!(report.unfit, vec![weak.clone()]);
    assert!(dish0(&biome).contains(&strong));
    assert!(dish0(&biome).contains(&untested));

    let deaths = events_of(&log, EventType::Death);
    assert_eq!(deaths.len(), 1);
    assert_eq!(deaths[0].agent_id, weak);
    assert_eq!(deaths[0].payload_str("death_type"), Some("fitness"));
    assert_eq!(events_of(&log, EventType::GymEval).len(), 2);
}

// ============================================================================
// Session and errors
// ============================================================================

#[test]
fn end_session_writes_marker_then_survivors() {
    let (mut biome, log, mut slicer) = world(4, 4, AbioticFactors::default());
    spawn(&mut slicer, &mut biome, "a", 100.0, Scripted::idle(), at(0, 0));
    spawn(&mut slicer, &mut biome, "b", 100.0, Scripted::idle(), at(3, 3));
    slicer.run(&mut biome, 2).expect("run");

    let marker = slicer.end_session(&mut biome).expect("end session");
    assert!(marker.is_session_marker());
    assert_eq!(marker.payload.get("population"), Some(&json!(2)));
    assert_eq!(marker.payload.get("pulse"), Some(&json!(2)));
    let living = &marker.payload["living"]["dish-0"];
    assert_eq!(living.as_array().map(Vec::len), Some(2));

    let events = log.tail(3).expect("tail");
    assert!(events[0].is_session_marker());
    for survivor in &events[1..] {
        assert_eq!(survivor.event_type, EventType::Survival);
        assert_eq!(survivor.payload_str("kind"), Some("session_survivor"));
    }
}

#[test]
fn slicer_mutation_is_logged() {
    let (mut biome, log, mut slicer) = world(4, 4, AbioticFactors::default());
    let agent_id = spawn(&mut slicer, &mut biome, "a", 100.0, Scripted::idle(), at(0, 0));
    let before = dish0(&biome).organism(&agent_id).expect("a").genome_id().to_string();

    let after = slicer
        .mutate(&mut biome, "dish-0", &agent_id, &json!({ "traits": { "bold": true } }))
        .expect("mutate");
    assert_ne!(after, before);
    let mutations = events_of(&log, EventType::Mutate);
    assert_eq!(mutations.len(), 1);
    assert_eq!(
        mutations[0].payload_str("previous_genome_id"),
        Some(before.as_str())
    );
}

#[test]
fn unknown_dish_and_occupied_cells_are_errors() {
    let (mut biome, log, mut slicer) = world(4, 4, AbioticFactors::default());
    let err = slicer
        .birth(
            &mut biome,
            "nowhere",
            config("x"),
            &fingerprint(),
            Scripted::idle(),
            at(0, 0),
        )
        .expect_err("unknown dish");
    assert!(matches!(err, SimulationError::UnknownDish { .. }));

    spawn(&mut slicer, &mut biome, "a", 100.0, Scripted::idle(), at(0, 0));
    let err = slicer
        .birth(
            &mut biome,
            "dish-0",
            config("b"),
            &fingerprint(),
            Scripted::idle(),
            at(0, 0),
        )
        .expect_err("occupied");
    assert!(matches!(
        err,
        SimulationError::Placement(PlacementError::Occupied { .. })
    ));
    assert_eq!(events_of(&log, EventType::Spawn).len(), 1);
}
