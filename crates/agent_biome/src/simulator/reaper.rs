//! Mortality: fitness selection and boundary enforcement.
//!
//! The two checks are independent and a death event carries exactly one
//! death type. Reaping records the death in the global log before the
//! organism leaves its dish, so a failed append leaves it alive and in place.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

use super::agent::ProposedAction;
use super::biome::AbioticFactors;
use super::dish::Dish;
use super::error::ObserverError;
use super::events::EventType;
use super::observer::SharedEventLog;
use super::organism::Organism;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeathType {
    Fitness,
    Boundary,
}

impl DeathType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeathType::Fitness => "fitness",
            DeathType::Boundary => "boundary",
        }
    }
}

/// Outcome of a boundary check. `reason` is set exactly when `breached`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundaryVerdict {
    pub breached: bool,
    pub reason: Option<String>,
}

impl BoundaryVerdict {
    pub fn clear() -> Self {
        Self {
            breached: false,
            reason: None,
        }
    }

    pub fn breach(reason: impl Into<String>) -> Self {
        Self {
            breached: true,
            reason: Some(reason.into()),
        }
    }
}

/// External actions already acted during the current slice.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SliceActionTally {
    pub tool_calls: u32,
    pub file_ops: u32,
    pub network_calls: u32,
}

impl SliceActionTally {
    pub fn record(&mut self, action: &ProposedAction) {
        match action {
            ProposedAction::UseTool { .. } => self.tool_calls += 1,
            ProposedAction::ReadFile { .. } | ProposedAction::WriteFile { .. } => {
                self.file_ops += 1
            }
            ProposedAction::NetworkRequest { .. } => self.network_calls += 1,
            _ => {}
        }
    }
}

// ============================================================================
// Reaper
// ============================================================================

pub struct Reaper {
    log: SharedEventLog,
}

impl Reaper {
    pub fn new(log: SharedEventLog) -> Self {
        Self { log }
    }

    /// Reason for a fitness death, if any. Organisms without a fitness score
    /// are never selected against.
    pub fn check_fitness(&self, organism: &Organism, factors: &AbioticFactors) -> Option<String> {
        let score = organism.latest_fitness()?;
        if score < factors.fitness_floor {
            Some(format!(
                "fitness {score} below floor {}",
                factors.fitness_floor
            ))
        } else {
            None
        }
    }

    /// Check one proposed action against the biome's policy. `tally` holds the
    /// external actions the organism already acted this slice.
    pub fn check_boundary(
        &self,
        action: &ProposedAction,
        tally: &SliceActionTally,
        factors: &AbioticFactors,
    ) -> BoundaryVerdict {
        let reason = match action {
            ProposedAction::UseTool { tool, args } => check_tool(tool, args, factors).or_else(|| {
                ceiling(
                    "tool call",
                    tally.tool_calls,
                    factors.max_tool_calls_per_slice,
                )
            }),
            ProposedAction::ReadFile { path } | ProposedAction::WriteFile { path, .. } => {
                check_path(path, factors).or_else(|| {
                    ceiling("file op", tally.file_ops, factors.max_file_ops_per_slice)
                })
            }
            ProposedAction::NetworkRequest { method, url } => check_network(method, url)
                .or_else(|| {
                    ceiling(
                        "network call",
                        tally.network_calls,
                        factors.max_network_calls_per_slice,
                    )
                }),
            _ => None,
        };
        match reason {
            Some(reason) => BoundaryVerdict::breach(reason),
            None => BoundaryVerdict::clear(),
        }
    }

    /// Record a death, then remove the organism from its dish.
    ///
    /// Returns `Ok(None)` when the organism is not in the dish. On an append
    /// failure the organism stays where it is.
    pub fn reap(
        &self,
        dish: &mut Dish,
        agent_id: &str,
        death_type: DeathType,
        reason: &str,
    ) -> Result<Option<Organism>, ObserverError> {
        let dish_id = dish.id().to_string();
        let Some(organism) = dish.organism_mut(agent_id) else {
            return Ok(None);
        };
        let event = organism
            .event(EventType::Death)
            .with_payload("death_type", death_type.as_str())
            .with_payload("reason", reason)
            .with_payload("dish_id", dish_id.as_str());
        organism.emit(self.log.as_ref(), event)?;
        info!(
            dish_id = %dish_id,
            agent_id,
            death_type = death_type.as_str(),
            reason,
            "organism reaped"
        );
        Ok(dish.remove_organism(agent_id))
    }

    /// Apply the fitness check to every organism in the dish and reap the
    /// ones below the floor.
    pub fn reap_unfit(
        &self,
        dish: &mut Dish,
        factors: &AbioticFactors,
    ) -> Result<Vec<Organism>, ObserverError> {
        let mut reaped = Vec::new();
        for agent_id in dish.organism_ids() {
            let reason = match dish.organism(&agent_id) {
                Some(organism) => self.check_fitness(organism, factors),
                None => None,
            };
            if let Some(reason) = reason {
                if let Some(organism) = self.reap(dish, &agent_id, DeathType::Fitness, &reason)? {
                    reaped.push(organism);
                }
            }
        }
        Ok(reaped)
    }
}

// ============================================================================
// Policy Checks
// ============================================================================

fn ceiling(label: &str, already: u32, max: u32) -> Option<String> {
    if already >= max {
        Some(format!("{label} ceiling exceeded: {} > {max} per slice", already + 1))
    } else {
        None
    }
}

fn check_tool(tool: &str, args: &Value, factors: &AbioticFactors) -> Option<String> {
    if factors.blocked_tools.iter().any(|blocked| blocked == tool) {
        return Some(format!("tool {tool} is blocked"));
    }
    if !factors.allowed_tools.is_empty() && !factors.allowed_tools.iter().any(|t| t == tool) {
        return Some(format!("tool {tool} is not in the allowed tools"));
    }
    let mut paths = Vec::new();
    collect_path_args(args, false, &mut paths);
    paths
        .into_iter()
        .find_map(|path| check_path(path, factors))
}

/// String arguments that name a filesystem location: any string under a key
/// containing `path`, `file` or `dir`.
fn collect_path_args<'a>(value: &'a Value, path_key: bool, out: &mut Vec<&'a str>) {
    match value {
        Value::String(text) if path_key => out.push(text),
        Value::Array(values) => {
            for value in values {
                collect_path_args(value, path_key, out);
            }
        }
        Value::Object(map) => {
            for (key, value) in map {
                let key = key.to_ascii_lowercase();
                let is_path = key.contains("path") || key.contains("file") || key.contains("dir");
                collect_path_args(value, is_path, out);
            }
        }
        _ => {}
    }
}

/// `..` is matched literally, so names like `notes..txt` are refused too.
fn check_path(path: &str, factors: &AbioticFactors) -> Option<String> {
    if path.contains("..") {
        return Some(format!("path traversal sequence '..' in {path}"));
    }
    if let Some(prefix) = factors
        .blocked_paths
        .iter()
        .find(|prefix| path.starts_with(prefix.as_str()))
    {
        return Some(format!("path {path} is blocked by {prefix}"));
    }
    if !factors.allowed_paths.is_empty()
        && !factors
            .allowed_paths
            .iter()
            .any(|prefix| path.starts_with(prefix.as_str()))
    {
        return Some(format!("path {path} is outside the allowed paths"));
    }
    None
}

fn check_network(method: &str, url: &str) -> Option<String> {
    if method.is_empty() || !method.chars().all(|c| c.is_ascii_alphabetic()) {
        return Some(format!("malformed network request method {method:?}"));
    }
    malformed_url(url).map(|problem| format!("malformed network url {url:?}: {problem}"))
}

fn malformed_url(url: &str) -> Option<&'static str> {
    if url.chars().any(char::is_whitespace) {
        return Some("contains whitespace");
    }
    let Some((scheme, rest)) = url.split_once("://") else {
        return Some("missing scheme");
    };
    let mut scheme_chars = scheme.chars();
    match scheme_chars.next() {
        Some(first) if first.is_ascii_alphabetic() => {}
        _ => return Some("invalid scheme"),
    }
    if !scheme_chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.')) {
        return Some("invalid scheme");
    }
    let authority_end = rest.find(['/', '?', '#']).unwrap_or(rest.len());
    let authority = &rest[..authority_end];
    let host_port = authority.rsplit_once('@').map_or(authority, |(_, host)| host);
    let (host, port) = if let Some(bracketed) = host_port.strip_prefix('[') {
        match bracketed.split_once(']') {
            Some((host, tail)) => (host, tail.strip_prefix(':')),
            None => return Some("unterminated ipv6 host"),
        }
    } else {
        match host_port.rsplit_once(':') {
            Some((host, port)) => (host, Some(port)),
            None => (host_port, None),
        }
    };
    if host.is_empty() {
        return Some("missing host");
    }
    if let Some(port) = port {
        if port.parse::<u16>().is_err() {
            return Some("invalid port");
        }
    }
    None
}
