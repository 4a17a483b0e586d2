use std::sync::Arc;

use agent_biome::{
    code_fingerprint, AgentConfig, BehaviorError, BiomeConfig, Decision, EventLog, GridPos,
    LineageIndex, Observation, OrganismBehavior, ProposedAction, SharedEventLog, Slicer,
    MOORE_OFFSETS,
};
use tracing_subscriber::EnvFilter;

const DEFAULT_PULSES: u64 = 20;
const WANDERER_SOURCE: &[u8] = b"wanderer: conjugate when rich, rest when poor, otherwise walk";

/// Walks the Moore ring, rests when low and seeds with a rich neighbor.
struct Wanderer {
    step: usize,
}

impl OrganismBehavior for Wanderer {
    fn decide(&mut self, observation: &Observation) -> Result<Decision, BehaviorError> {
        self.step += 1;
        let state = &observation.state;
        if state.energy > 80.0 && state.gestating_seeds == 0 {
            if let Some(partner) = observation.neighbors.iter().find(|n| n.energy > 70.0) {
                return Ok(Decision::act(vec![ProposedAction::Conjugate {
                    partner: partner.agent_id.clone(),
                }]));
            }
        }
        if state.energy < 40.0 {
            return Ok(Decision::act(vec![ProposedAction::Rest]).with_rationale("recovering"));
        }
        let (dx, dy) = MOORE_OFFSETS[self.step % MOORE_OFFSETS.len()];
        Ok(Decision::act(vec![ProposedAction::Move { dx, dy }]))
    }

    fn fork(&self) -> Box<dyn OrganismBehavior> {
        Box::new(Wanderer { step: 0 })
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args: Vec<String> = std::env::args().collect();
    if matches!(args.get(1).map(|s| s.as_str()), Some("--help") | Some("-h")) {
        println!("Usage: biome_demo [pulses]");
        println!("Reads biome.toml or AGENT_BIOME_* variables.");
        return;
    }
    let pulses = match args.get(1) {
        Some(value) => match value.parse::<u64>() {
            Ok(pulses) => pulses,
            Err(_) => {
                eprintln!("Invalid pulse count: {value}");
                std::process::exit(1);
            }
        },
        None => DEFAULT_PULSES,
    };

    if let Err(err) = run(pulses) {
        eprintln!("biome_demo failed: {err}");
        std::process::exit(1);
    }
}

fn run(pulses: u64) -> Result<(), Box<dyn std::error::Error>> {
    let config = BiomeConfig::from_default_sources()?;
    let mut biome = config.build_biome()?;
    let log: SharedEventLog = Arc::new(config.open_event_log()?);
    let mut slicer = Slicer::new(log.clone(), config.rng_seed);
    let fingerprint = code_fingerprint(WANDERER_SOURCE);

    let directives = [
        ("scout", "Explore the dish. Avoid crowds."),
        ("keeper", "Hold position. Share energy with kin."),
        ("drifter", "Follow the gradient. Rest often."),
        ("weaver", "Seek partners. Carry seeds to term."),
    ];
    let center = GridPos::new(config.dish_width / 2, config.dish_height / 2);
    for dish_id in config.dish_ids() {
        for (index, (name, directive)) in directives.iter().enumerate() {
            let pos = GridPos::new(
                (center.x + index as u32 % 2).min(config.dish_width - 1),
                (center.y + index as u32 / 2).min(config.dish_height - 1),
            );
            let agent_config = AgentConfig::new(*name, *directive).with_capability("walk");
            if let Err(err) = slicer.birth(
                &mut biome,
                &dish_id,
                agent_config,
                &fingerprint,
                Box::new(Wanderer { step: index }),
                pos,
            ) {
                eprintln!("skipping {name} in {dish_id}: {err}");
            }
        }
    }

    slicer.run(&mut biome, pulses)?;
    slicer.end_session(&mut biome)?;

    let events = log.replay()?;
    let lineage = LineageIndex::from_events(&events);
    println!("biome: {}", biome.name());
    println!("pulses: {}", slicer.pulse());
    println!("slices: {}", slicer.slice_counter());
    println!("events: {}", events.len());
    let session = lineage.last_session().unwrap_or_default();
    let records = lineage.session_records(session);
    let living = records.iter().filter(|record| record.is_alive()).count();
    println!("sessions in log: {}", lineage.session_count());
    println!("organisms seen: {}", records.len());
    println!("living: {living}");
    println!("dead: {}", records.len() - living);
    println!("log: {}", config.log_path.display());
    Ok(())
}
