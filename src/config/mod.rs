use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::TimeDelta;

fn config_paths(filename: &str) -> Vec<PathBuf> {
	let mut paths = Vec::new();

	if let Some(home) = std::env::var_os("HOME") {
		let user_config = PathBuf::from(home).join(".config/duchy-casino").join(filename);
		paths.push(user_config);
	}

	paths.push(PathBuf::from("config").join(filename));

	paths
}

fn find_config(filename: &str) -> Option<PathBuf> {
	config_paths(filename).into_iter().find(|p| p.exists())
}

pub fn resolve_config(filename: &str) -> Result<PathBuf, String> {
	find_config(filename).ok_or_else(|| {
		let searched: Vec<_> = config_paths(filename)
			.iter()
			.map(|p| p.display().to_string())
			.collect();
		format!("Config file '{}' not found. Searched: {}", filename, searched.join(", "))
	})
}

#[derive(Debug, Clone, Deserialize)]
pub struct BankConfig {
	#[serde(default = "default_starting_balance")]
	pub starting_balance: i64,
	#[serde(default = "default_bankruptcy_floor")]
	pub bankruptcy_floor: i64,
	#[serde(default = "default_work_bonus")]
	pub work_bonus: i64,
	#[serde(default = "default_hourly")]
	pub work_cooldown_secs: u64,
	#[serde(default = "default_hourly")]
	pub stats_cooldown_secs: u64,
	#[serde(default = "default_hourly")]
	pub autosave_secs: u64,
	#[serde(default)]
	pub store: Option<PathBuf>,
}

fn default_starting_balance() -> i64 { 10_000 }
fn default_bankruptcy_floor() -> i64 { 100 }
fn default_work_bonus() -> i64 { 5_000 }
fn default_hourly() -> u64 { 3600 }

impl Default for BankConfig {
	fn default() -> Self {
		Self {
			starting_balance: default_starting_balance(),
			bankruptcy_floor: default_bankruptcy_floor(),
			work_bonus: default_work_bonus(),
			work_cooldown_secs: default_hourly(),
			stats_cooldown_secs: default_hourly(),
			autosave_secs: default_hourly(),
			store: None,
		}
	}
}

impl BankConfig {
	pub fn work_cooldown(&self) -> TimeDelta {
		TimeDelta::seconds(self.work_cooldown_secs as i64)
	}

	pub fn stats_cooldown(&self) -> TimeDelta {
		TimeDelta::seconds(self.stats_cooldown_secs as i64)
	}

	pub fn autosave_interval(&self) -> Duration {
		Duration::from_secs(self.autosave_secs.max(1))
	}
}

#[derive(Debug, Clone, Deserialize)]
pub struct WagerConfig {
	#[serde(default = "default_multipliers")]
	pub multipliers: Vec<i64>,
}

fn default_multipliers() -> Vec<i64> {
	vec![2, 10, 50]
}

impl Default for WagerConfig {
	fn default() -> Self {
		Self {
			multipliers: default_multipliers(),
		}
	}
}

#[derive(Debug, Clone, Deserialize)]
pub struct RaceConfig {
	#[serde(default = "default_base_reward")]
	pub base_reward: i64,
	#[serde(default = "default_reward_growth")]
	pub reward_growth: f64,
	#[serde(default = "default_time_limit")]
	pub time_limit_secs: u64,
	#[serde(default = "default_max_timeouts")]
	pub max_timeouts: u32,
}

fn default_base_reward() -> i64 { 100 }
fn default_reward_growth() -> f64 { 3.14 }
fn default_time_limit() -> u64 { 10 }
fn default_max_timeouts() -> u32 { 3 }

impl Default for RaceConfig {
	fn default() -> Self {
		Self {
			base_reward: default_base_reward(),
			reward_growth: default_reward_growth(),
			time_limit_secs: default_time_limit(),
			max_timeouts: default_max_timeouts(),
		}
	}
}

impl RaceConfig {
	pub fn time_limit(&self) -> Duration {
		Duration::from_secs(self.time_limit_secs)
	}
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CasinoConfig {
	#[serde(default)]
	pub bank: BankConfig,
	#[serde(default)]
	pub wager: WagerConfig,
	#[serde(default)]
	pub race: RaceConfig,
	#[serde(default)]
	pub seed: Option<u64>,
}

const MAX_RACE_TIME_LIMIT_SECS: u64 = 24 * 3600;
const MAX_COOLDOWN_SECS: u64 = 365 * 24 * 3600;

pub fn load_config<P: AsRef<Path>>(path: P) -> Result<CasinoConfig, String> {
	let content = fs::read_to_string(&path)
		.map_err(|e| format!("Failed to read {}: {}", path.as_ref().display(), e))?;

	parse_config(&content)
}

pub fn parse_config(content: &str) -> Result<CasinoConfig, String> {
	let config: CasinoConfig = toml::from_str(content)
		.map_err(|e| format!("Failed to parse casino config: {}", e))?;

	if config.bank.bankruptcy_floor < 0 {
		return Err("bankruptcy_floor must not be negative".to_string());
	}
	if config.race.max_timeouts == 0 {
		return Err("race.max_timeouts must be at least 1".to_string());
	}
	if config.race.time_limit_secs > MAX_RACE_TIME_LIMIT_SECS {
		return Err(format!(
			"race.time_limit_secs must be at most {}",
			MAX_RACE_TIME_LIMIT_SECS
		));
	}
	if config.bank.work_cooldown_secs > MAX_COOLDOWN_SECS
		|| config.bank.stats_cooldown_secs > MAX_COOLDOWN_SECS
	{
		return Err(format!("bank cooldowns must be at most {} seconds", MAX_COOLDOWN_SECS));
	}
	if config.wager.multipliers.iter().any(|&m| m < 1) {
		return Err("wager.multipliers must all be positive".to_string());
	}
	Ok(config)
}

/// Loads `casino.toml` from the usual places, or the built-in defaults when
/// there is none.
pub fn load_config_auto() -> Result<CasinoConfig, String> {
	match find_config("casino.toml") {
		Some(path) => load_config(&path),
		None => Ok(CasinoConfig::default()),
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_empty_config_uses_defaults() {
		let config = parse_config("").unwrap();
		assert_eq!(config.bank.starting_balance, 10_000);
		assert_eq!(config.bank.bankruptcy_floor, 100);
		assert_eq!(config.bank.work_bonus, 5_000);
		assert_eq!(config.wager.multipliers, vec![2, 10, 50]);
		assert_eq!(config.race.base_reward, 100);
		assert_eq!(config.race.max_timeouts, 3);
		assert_eq!(config.race.time_limit(), Duration::from_secs(10));
		assert!(config.seed.is_none());
	}

	#[test]
	fn test_partial_section_keeps_other_defaults() {
		let config = parse_config(
			r#"
			seed = 7

			[race]
			time_limit_secs = 5
			"#,
		)
		.unwrap();
		assert_eq!(config.seed, Some(7));
		assert_eq!(config.race.time_limit_secs, 5);
		assert_eq!(config.race.base_reward, 100);
		assert!((config.race.reward_growth - 3.14).abs() < f64::EPSILON);
	}

	#[test]
	fn test_rejects_zero_timeouts() {
		let err = parse_config("[race]\nmax_timeouts = 0\n").unwrap_err();
		assert!(err.contains("max_timeouts"));
	}

	#[test]
	fn test_rejects_oversized_time_limit() {
		let err = parse_config("[race]\ntime_limit_secs = 9223372036854775807\n").unwrap_err();
		assert!(err.contains("time_limit_secs"));
		assert!(parse_config("[race]\ntime_limit_secs = 86400\n").is_ok());
	}

	#[test]
	fn test_rejects_oversized_cooldown() {
		let err = parse_config("[bank]\nwork_cooldown_secs = 9223372036854775807\n").unwrap_err();
		assert!(err.contains("cooldowns"));
	}

	#[test]
	fn test_rejects_bad_multiplier() {
		assert!(parse_config("[wager]\nmultipliers = [2, 0]\n").is_err());
	}

	#[test]
	fn test_default_matches_serde_defaults() {
		let from_serde = parse_config("").unwrap();
		let built = CasinoConfig::default();
		assert_eq!(from_serde.bank.work_cooldown_secs, built.bank.work_cooldown_secs);
		assert_eq!(from_serde.wager.multipliers, built.wager.multipliers);
		assert_eq!(from_serde.race.time_limit_secs, built.race.time_limit_secs);
	}

	#[test]
	fn test_cooldowns_as_time_deltas() {
		let config = BankConfig::default();
		assert_eq!(config.work_cooldown(), TimeDelta::hours(1));
		assert_eq!(config.stats_cooldown(), TimeDelta::hours(1));
	}
}
