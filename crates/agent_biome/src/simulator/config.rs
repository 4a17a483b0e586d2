//! Biome configuration from `biome.toml` and `AGENT_BIOME_*` variables.

use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use super::biome::{AbioticFactors, Biome};
use super::error::{ConfigError, ObserverError};
use super::observer::FileEventLog;

pub const ENV_BIOME_NAME: &str = "AGENT_BIOME_NAME";
pub const ENV_DISH_WIDTH: &str = "AGENT_BIOME_DISH_WIDTH";
pub const ENV_DISH_HEIGHT: &str = "AGENT_BIOME_DISH_HEIGHT";
pub const ENV_DISH_COUNT: &str = "AGENT_BIOME_DISH_COUNT";
pub const ENV_RNG_SEED: &str = "AGENT_BIOME_RNG_SEED";
pub const ENV_LOG_PATH: &str = "AGENT_BIOME_LOG_PATH";
pub const ENV_FITNESS_FLOOR: &str = "AGENT_BIOME_FITNESS_FLOOR";
pub const ENV_MAX_GENERATIONS: &str = "AGENT_BIOME_MAX_GENERATIONS";
pub const ENV_MAX_TOOL_CALLS: &str = "AGENT_BIOME_MAX_TOOL_CALLS";
pub const ENV_MAX_FILE_OPS: &str = "AGENT_BIOME_MAX_FILE_OPS";
pub const ENV_MAX_NETWORK_CALLS: &str = "AGENT_BIOME_MAX_NETWORK_CALLS";
pub const ENV_ALLOWED_TOOLS: &str = "AGENT_BIOME_ALLOWED_TOOLS";
pub const ENV_BLOCKED_TOOLS: &str = "AGENT_BIOME_BLOCKED_TOOLS";
pub const ENV_ALLOWED_PATHS: &str = "AGENT_BIOME_ALLOWED_PATHS";
pub const ENV_BLOCKED_PATHS: &str = "AGENT_BIOME_BLOCKED_PATHS";
pub const ENV_ACTION_ENERGY_COST: &str = "AGENT_BIOME_ACTION_ENERGY_COST";
pub const ENV_REST_ENERGY_GAIN: &str = "AGENT_BIOME_REST_ENERGY_GAIN";
pub const ENV_CONJUGATION_ENERGY_COST: &str = "AGENT_BIOME_CONJUGATION_ENERGY_COST";

pub const DEFAULT_CONFIG_FILE_NAME: &str = "biome.toml";
pub const DEFAULT_BIOME_NAME: &str = "biome";
pub const DEFAULT_DISH_SIZE: u32 = 16;
pub const DEFAULT_DISH_COUNT: u32 = 1;
pub const DEFAULT_LOG_PATH: &str = "biome_events.jsonl";

#[derive(Debug, Clone, PartialEq)]
pub struct BiomeConfig {
    pub name: String,
    pub dish_width: u32,
    pub dish_height: u32,
    pub dish_count: u32,
    pub rng_seed: u64,
    pub log_path: PathBuf,
    pub abiotic: AbioticFactors,
}

impl Default for BiomeConfig {
    fn default() -> Self {
        Self {
            name: DEFAULT_BIOME_NAME.to_string(),
            dish_width: DEFAULT_DISH_SIZE,
            dish_height: DEFAULT_DISH_SIZE,
            dish_count: DEFAULT_DISH_COUNT,
            rng_seed: 0,
            log_path: PathBuf::from(DEFAULT_LOG_PATH),
            abiotic: AbioticFactors::default(),
        }
    }
}

impl BiomeConfig {
    pub fn from_default_sources() -> Result<Self, ConfigError> {
        let config_path = Path::new(DEFAULT_CONFIG_FILE_NAME);
        if config_path.exists() {
            return Self::from_config_file(config_path);
        }
        Self::from_env()
    }

    /// Keys in the TOML root table take precedence over the environment.
    pub fn from_config_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|err| ConfigError::ReadConfigFile {
            path: path.display().to_string(),
            message: err.to_string(),
        })?;
        let value: toml::Value =
            toml::from_str(&content).map_err(|err: toml::de::Error| ConfigError::ParseConfigFile {
                path: path.display().to_string(),
                message: err.to_string(),
            })?;
        let table = value
            .as_table()
            .ok_or_else(|| ConfigError::ParseConfigFile {
                path: path.display().to_string(),
                message: "root is not a TOML table".to_string(),
            })?;

        Self::from_env_with(|key| {
            table
                .get(key)
                .and_then(toml_value_to_string)
                .or_else(|| std::env::var(key).ok())
        })
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_env_with(|key| std::env::var(key).ok())
    }

    /// Build from a key lookup. Absent keys take their defaults; present keys
    /// must parse.
    pub fn from_env_with<F>(mut getter: F) -> Result<Self, ConfigError>
    where
        F: FnMut(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let factors = AbioticFactors::default();

        let name = getter(ENV_BIOME_NAME)
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .unwrap_or(defaults.name);
        let dish_width = parse_positive(&mut getter, ENV_DISH_WIDTH, defaults.dish_width)?;
        let dish_height = parse_positive(&mut getter, ENV_DISH_HEIGHT, defaults.dish_height)?;
        let dish_count = parse_positive(&mut getter, ENV_DISH_COUNT, defaults.dish_count)?;
        let rng_seed = parse_or(&mut getter, ENV_RNG_SEED, defaults.rng_seed)?;
        let log_path = getter(ENV_LOG_PATH)
            .filter(|value| !value.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or(defaults.log_path);

        let abiotic = AbioticFactors {
            fitness_floor: parse_or(&mut getter, ENV_FITNESS_FLOOR, factors.fitness_floor)?,
            max_generations: parse_or(&mut getter, ENV_MAX_GENERATIONS, factors.max_generations)?,
            max_tool_calls_per_slice: parse_or(
                &mut getter,
                ENV_MAX_TOOL_CALLS,
                factors.max_tool_calls_per_slice,
            )?,
            max_file_ops_per_slice: parse_or(
                &mut getter,
                ENV_MAX_FILE_OPS,
                factors.max_file_ops_per_slice,
            )?,
            max_network_calls_per_slice: parse_or(
                &mut getter,
                ENV_MAX_NETWORK_CALLS,
                factors.max_network_calls_per_slice,
            )?,
            allowed_tools: list_or_empty(&mut getter, ENV_ALLOWED_TOOLS),
            blocked_tools: list_or_empty(&mut getter, ENV_BLOCKED_TOOLS),
            allowed_paths: list_or_empty(&mut getter, ENV_ALLOWED_PATHS),
            blocked_paths: list_or_empty(&mut getter, ENV_BLOCKED_PATHS),
            action_energy_cost: parse_or(
                &mut getter,
                ENV_ACTION_ENERGY_COST,
                factors.action_energy_cost,
            )?,
            rest_energy_gain: parse_or(&mut getter, ENV_REST_ENERGY_GAIN, factors.rest_energy_gain)?,
            conjugation_energy_cost: parse_or(
                &mut getter,
                ENV_CONJUGATION_ENERGY_COST,
                factors.conjugation_energy_cost,
            )?,
        };
        abiotic.validate()?;

        Ok(Self {
            name,
            dish_width,
            dish_height,
            dish_count,
            rng_seed,
            log_path,
            abiotic,
        })
    }

    pub fn dish_ids(&self) -> Vec<String> {
        (0..self.dish_count).map(|index| format!("dish-{index}")).collect()
    }

    /// A biome with `dish_count` empty dishes of the configured size.
    pub fn build_biome(&self) -> Result<Biome, ConfigError> {
        let mut biome = Biome::new(self.name.clone(), self.abiotic.clone())?;
        for dish_id in self.dish_ids() {
            biome.add_dish(dish_id, self.dish_width, self.dish_height)?;
        }
        Ok(biome)
    }

    pub fn open_event_log(&self) -> Result<FileEventLog, ObserverError> {
        FileEventLog::open(self.log_path.clone())
    }
}

/// Scalars as text; arrays of scalars as a comma-separated list.
fn toml_value_to_string(value: &toml::Value) -> Option<String> {
    match value {
        toml::Value::String(value) => Some(value.clone()),
        toml::Value::Integer(value) => Some(value.to_string()),
        toml::Value::Float(value) => Some(value.to_string()),
        toml::Value::Boolean(value) => Some(value.to_string()),
        toml::Value::Array(values) => {
            let parts: Option<Vec<String>> = values.iter().map(toml_value_to_string).collect();
            parts.map(|parts| parts.join(","))
        }
        _ => None,
    }
}

fn parse_or<F, T>(getter: &mut F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: FnMut(&str) -> Option<String>,
    T: FromStr,
{
    match getter(key) {
        Some(value) => value
            .trim()
            .parse::<T>()
            .map_err(|_| ConfigError::InvalidValue {
                key: key.to_string(),
                value,
            }),
        None => Ok(default),
    }
}

fn parse_positive<F>(getter: &mut F, key: &'static str, default: u32) -> Result<u32, ConfigError>
where
    F: FnMut(&str) -> Option<String>,
{
    let parsed = parse_or(getter, key, default)?;
    if parsed == 0 {
        return Err(ConfigError::InvalidValue {
            key: key.to_string(),
            value: parsed.to_string(),
        });
    }
    Ok(parsed)
}

fn list_or_empty<F>(getter: &mut F, key: &str) -> Vec<String>
where
    F: FnMut(&str) -> Option<String>,
{
    getter(key)
        .map(|value| {
            value
                .split(',')
                .map(str::trim)
                .filter(|part| !part.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}
