use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, TimeDelta, Utc};

use crate::config::BankConfig;
use crate::error::{InsufficientFunds, StoreError};
use crate::events::UserId;
use crate::{defaults, lock_mutex, logging};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Faction {
	White,
	Red,
	Blue,
	Green,
	Black,
	/// Subscribed to every faction's news.
	Clear,
}

impl Faction {
	pub const ALL: [Faction; 6] = [
		Faction::Clear,
		Faction::Red,
		Faction::Green,
		Faction::White,
		Faction::Blue,
		Faction::Black,
	];

	pub fn as_str(self) -> &'static str {
		match self {
			Faction::White => "white",
			Faction::Red => "red",
			Faction::Blue => "blue",
			Faction::Green => "green",
			Faction::Black => "black",
			Faction::Clear => "clear",
		}
	}
}

impl std::fmt::Display for Faction {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "{}", self.as_str())
	}
}

impl FromStr for Faction {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Faction::ALL
			.into_iter()
			.find(|f| f.as_str().eq_ignore_ascii_case(s))
			.ok_or_else(|| format!("unknown faction '{}'", s))
	}
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserAccount {
	pub balance: i64,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub faction: Option<Faction>,
	pub first_seen: DateTime<Utc>,
	pub last_seen: DateTime<Utc>,
	#[serde(default)]
	pub interaction_count: u64,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub last_work: Option<DateTime<Utc>>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub last_stats: Option<DateTime<Utc>>,
	#[serde(default)]
	pub auto_bankruptcy: bool,
}

impl UserAccount {
	pub fn new(balance: i64, now: DateTime<Utc>) -> Self {
		Self {
			balance,
			faction: None,
			first_seen: now,
			last_seen: now,
			interaction_count: 0,
			last_work: None,
			last_stats: None,
			auto_bankruptcy: false,
		}
	}

	fn cooldown_slot(&mut self, kind: Cooldown) -> &mut Option<DateTime<Utc>> {
		match kind {
			Cooldown::Work => &mut self.last_work,
			Cooldown::Stats => &mut self.last_stats,
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cooldown {
	Work,
	Stats,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BankSummary {
	pub users: usize,
	pub interactions: u64,
	pub factions: BTreeMap<Faction, usize>,
	pub unaffiliated: usize,
}

/// Where the ledger lives between restarts.
pub trait LedgerStore: Send + Sync {
	fn load(&self) -> Result<HashMap<UserId, UserAccount>, StoreError>;
	fn save(&self, accounts: &HashMap<UserId, UserAccount>) -> Result<(), StoreError>;
}

/// The per-user balance ledger.
///
/// Each account sits behind its own lock, so a debit's read-decide-write is
/// atomic for that user while other users' writes proceed independently.
/// Mutations only mark the ledger dirty; `flush` persists it.
pub struct Bank {
	accounts: Mutex<HashMap<UserId, Arc<Mutex<UserAccount>>>>,
	starting_balance: i64,
	floor: i64,
	work_bonus: i64,
	work_cooldown: TimeDelta,
	stats_cooldown: TimeDelta,
	dirty: AtomicBool,
	flush_lock: Mutex<()>,
	store: Arc<dyn LedgerStore>,
}

impl Bank {
	pub fn load(store: Arc<dyn LedgerStore>, config: &BankConfig) -> Result<Self, StoreError> {
		let accounts = store.load()?;
		Ok(Self::with_accounts(store, accounts, config))
	}

	pub fn in_memory(config: &BankConfig) -> Self {
		Self::with_accounts(Arc::new(MemoryStore::default()), HashMap::new(), config)
	}

	fn with_accounts(
		store: Arc<dyn LedgerStore>,
		accounts: HashMap<UserId, UserAccount>,
		config: &BankConfig,
	) -> Self {
		let accounts = accounts
			.into_iter()
			.map(|(id, account)| (id, Arc::new(Mutex::new(account))))
			.collect();

		Self {
			accounts: Mutex::new(accounts),
			starting_balance: config.starting_balance,
			floor: config.bankruptcy_floor,
			work_bonus: config.work_bonus,
			work_cooldown: config.work_cooldown(),
			stats_cooldown: config.stats_cooldown(),
			dirty: AtomicBool::new(false),
			flush_lock: Mutex::new(()),
			store,
		}
	}

	pub fn floor(&self) -> i64 {
		self.floor
	}

	fn account(&self, user: UserId) -> Arc<Mutex<UserAccount>> {
		let mut accounts = lock_mutex(&self.accounts);
		if let Some(account) = accounts.get(&user) {
			return Arc::clone(account);
		}
		let account = Arc::new(Mutex::new(UserAccount::new(self.starting_balance, Utc::now())));
		accounts.insert(user, Arc::clone(&account));
		self.mark_dirty();
		account
	}

	/// Reads without creating: an unknown user sees a fresh account that is
	/// not stored.
	fn read<T>(&self, user: UserId, f: impl FnOnce(&UserAccount) -> T) -> T {
		let account = lock_mutex(&self.accounts).get(&user).cloned();
		match account {
			Some(account) => f(&lock_mutex(&account)),
			None => f(&UserAccount::new(self.starting_balance, Utc::now())),
		}
	}

	fn write<T>(&self, user: UserId, f: impl FnOnce(&mut UserAccount) -> T) -> T {
		let account = self.account(user);
		let mut guard = lock_mutex(&account);
		let result = f(&mut guard);
		self.mark_dirty();
		result
	}

	fn mark_dirty(&self) {
		self.dirty.store(true, Ordering::SeqCst);
	}

	pub fn is_dirty(&self) -> bool {
		self.dirty.load(Ordering::SeqCst)
	}

	pub fn get(&self, user: UserId) -> UserAccount {
		self.read(user, |a| a.clone())
	}

	pub fn balance(&self, user: UserId) -> i64 {
		self.read(user, |a| a.balance)
	}

	/// Records one interaction, creating the account on first contact.
	pub fn touch(&self, user: UserId, now: DateTime<Utc>) {
		self.write(user, |a| {
			if a.interaction_count == 0 {
				a.first_seen = now;
			}
			a.interaction_count += 1;
			a.last_seen = now;
		});
	}

	/// Applies a signed delta with no floor. Saturates at the `i64` bounds.
	/// Returns the new balance.
	pub fn adjust(&self, user: UserId, delta: i64) -> i64 {
		let balance = self.write(user, |a| {
			a.balance = a.balance.saturating_add(delta);
			a.balance
		});
		if delta < 0 {
			logging::bank::debit(user, -delta, balance);
		} else {
			logging::bank::credit(user, delta, balance);
		}
		balance
	}

	/// Takes `amount` only if the balance covers it, checked and applied
	/// under the account lock.
	pub fn debit(&self, user: UserId, amount: i64) -> Result<i64, InsufficientFunds> {
		let account = self.account(user);
		let mut guard = lock_mutex(&account);

		if guard.balance < amount {
			return Err(InsufficientFunds {
				user,
				required: amount,
				available: guard.balance,
			});
		}

		guard.balance = guard.balance.saturating_sub(amount);
		let balance = guard.balance;
		drop(guard);
		self.mark_dirty();
		logging::bank::debit(user, amount, balance);
		Ok(balance)
	}

	pub fn credit(&self, user: UserId, amount: i64) -> i64 {
		self.adjust(user, amount)
	}

	/// Bankruptcy: lifts a balance below the floor up to it.
	pub fn reset_to_floor(&self, user: UserId) -> bool {
		let floor = self.floor;
		let applied = self.write(user, |a| {
			if a.balance < floor {
				a.balance = floor;
				true
			} else {
				false
			}
		});
		if applied {
			logging::bank::bankruptcy(user, floor, false);
		}
		applied
	}

	pub fn set_auto_bankruptcy(&self, user: UserId, enabled: bool) {
		self.write(user, |a| a.auto_bankruptcy = enabled);
	}

	pub fn toggle_auto_bankruptcy(&self, user: UserId) -> bool {
		self.write(user, |a| {
			a.auto_bankruptcy = !a.auto_bankruptcy;
			a.auto_bankruptcy
		})
	}

	/// Same as `reset_to_floor`, but only for users who opted in.
	pub fn apply_auto_bankruptcy(&self, user: UserId) -> bool {
		let floor = self.floor;
		let applied = self.write(user, |a| {
			if a.auto_bankruptcy && a.balance < floor {
				a.balance = floor;
				true
			} else {
				false
			}
		});
		if applied {
			logging::bank::bankruptcy(user, floor, true);
		}
		applied
	}

	/// Stamps the cooldown if it has elapsed, otherwise returns the time
	/// left.
	pub fn claim_cooldown(
		&self,
		user: UserId,
		kind: Cooldown,
		period: TimeDelta,
		now: DateTime<Utc>,
	) -> Result<(), TimeDelta> {
		self.write(user, |a| claim(a, kind, period, now))
	}

	/// Pays the work bonus once per work cooldown, or returns the wait.
	pub fn try_work(&self, user: UserId, now: DateTime<Utc>) -> Result<i64, TimeDelta> {
		let (bonus, period) = (self.work_bonus, self.work_cooldown);
		let balance = self.write(user, |a| {
			claim(a, Cooldown::Work, period, now)?;
			a.balance += bonus;
			Ok(a.balance)
		})?;
		logging::bank::credit(user, bonus, balance);
		Ok(balance)
	}

	pub fn try_stats(&self, user: UserId, now: DateTime<Utc>) -> Result<(), TimeDelta> {
		self.claim_cooldown(user, Cooldown::Stats, self.stats_cooldown, now)
	}

	pub fn set_faction(&self, user: UserId, faction: Faction) {
		self.write(user, |a| a.faction = Some(faction));
	}

	pub fn summary(&self) -> BankSummary {
		let mut summary = BankSummary::default();
		for account in self.snapshot().values() {
			summary.users += 1;
			summary.interactions += account.interaction_count;
			match account.faction {
				Some(faction) => *summary.factions.entry(faction).or_insert(0) += 1,
				None => summary.unaffiliated += 1,
			}
		}
		summary
	}

	pub fn snapshot(&self) -> HashMap<UserId, UserAccount> {
		let accounts: Vec<(UserId, Arc<Mutex<UserAccount>>)> = lock_mutex(&self.accounts)
			.iter()
			.map(|(id, a)| (*id, Arc::clone(a)))
			.collect();

		accounts
			.into_iter()
			.map(|(id, a)| (id, lock_mutex(&a).clone()))
			.collect()
	}

	/// Writes the ledger through the store if anything changed since the
	/// last successful flush. Returns whether a write happened.
	pub fn flush(&self) -> Result<bool, StoreError> {
		let _guard = lock_mutex(&self.flush_lock);
		if !self.dirty.swap(false, Ordering::SeqCst) {
			return Ok(false);
		}

		let snapshot = self.snapshot();
		match self.store.save(&snapshot) {
			Ok(()) => {
				logging::bank::flushed(snapshot.len());
				Ok(true)
			}
			Err(e) => {
				self.mark_dirty();
				logging::bank::error(&format!("flush failed: {}", e));
				Err(e)
			}
		}
	}
}

fn claim(
	account: &mut UserAccount,
	kind: Cooldown,
	period: TimeDelta,
	now: DateTime<Utc>,
) -> Result<(), TimeDelta> {
	let slot = account.cooldown_slot(kind);
	if let Some(last) = *slot {
		let ready_at = last + period;
		if now < ready_at {
			return Err(ready_at - now);
		}
	}
	*slot = Some(now);
	Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreFormat {
	Toml,
	Json,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct LedgerFile {
	#[serde(default)]
	users: BTreeMap<String, UserAccount>,
}

/// Ledger persisted as a single TOML or JSON document, chosen by extension.
pub struct FileStore {
	path: PathBuf,
	format: StoreFormat,
}

impl FileStore {
	pub fn new(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
		let path = path.into();
		let format = match path.extension().and_then(|e| e.to_str()) {
			Some("toml") => StoreFormat::Toml,
			Some("json") => StoreFormat::Json,
			other => return Err(StoreError::UnsupportedFormat(other.unwrap_or("").to_string())),
		};
		Ok(Self { path, format })
	}

	pub fn default_path() -> PathBuf {
		defaults::user_config_dir()
			.map(|dir| dir.join("ledger.toml"))
			.unwrap_or_else(|| PathBuf::from("config/ledger.toml"))
	}

	pub fn path(&self) -> &Path {
		&self.path
	}

	fn io_error(&self, source: std::io::Error) -> StoreError {
		StoreError::Io {
			path: self.path.display().to_string(),
			source,
		}
	}
}

impl LedgerStore for FileStore {
	fn load(&self) -> Result<HashMap<UserId, UserAccount>, StoreError> {
		if !self.path.exists() {
			return Ok(HashMap::new());
		}

		let content = fs::read_to_string(&self.path).map_err(|e| self.io_error(e))?;
		let file: LedgerFile = match self.format {
			StoreFormat::Toml => toml::from_str(&content)?,
			StoreFormat::Json => serde_json::from_str(&content)?,
		};

		let mut accounts = HashMap::new();
		for (key, account) in file.users {
			match key.parse::<i64>() {
				Ok(id) => {
					accounts.insert(UserId(id), account);
				}
				Err(_) => logging::bank::error(&format!("skipping ledger entry with bad id '{}'", key)),
			}
		}
		Ok(accounts)
	}

	fn save(&self, accounts: &HashMap<UserId, UserAccount>) -> Result<(), StoreError> {
		let file = LedgerFile {
			users: accounts
				.iter()
				.map(|(id, account)| (id.to_string(), account.clone()))
				.collect(),
		};

		let content = match self.format {
			StoreFormat::Toml => toml::to_string_pretty(&file)?,
			StoreFormat::Json => serde_json::to_string_pretty(&file)?,
		};

		if let Some(parent) = self.path.parent() {
			if !parent.as_os_str().is_empty() {
				fs::create_dir_all(parent).map_err(|e| self.io_error(e))?;
			}
		}

		let tmp = self.path.with_extension("tmp");
		fs::write(&tmp, content).map_err(|e| self.io_error(e))?;
		fs::rename(&tmp, &self.path).map_err(|e| self.io_error(e))?;
		Ok(())
	}
}

#[derive(Default)]
pub struct MemoryStore {
	saved: Mutex<HashMap<UserId, UserAccount>>,
	saves: AtomicUsize,
	failing: AtomicBool,
}

impl MemoryStore {
	pub fn with_accounts(accounts: HashMap<UserId, UserAccount>) -> Self {
		Self {
			saved: Mutex::new(accounts),
			..Self::default()
		}
	}

	pub fn saved(&self) -> HashMap<UserId, UserAccount> {
		lock_mutex(&self.saved).clone()
	}

	pub fn save_count(&self) -> usize {
		self.saves.load(Ordering::SeqCst)
	}

	pub fn set_failing(&self, failing: bool) {
		self.failing.store(failing, Ordering::SeqCst);
	}
}

impl LedgerStore for MemoryStore {
	fn load(&self) -> Result<HashMap<UserId, UserAccount>, StoreError> {
		Ok(self.saved())
	}

	fn save(&self, accounts: &HashMap<UserId, UserAccount>) -> Result<(), StoreError> {
		if self.failing.load(Ordering::SeqCst) {
			return Err(StoreError::Unavailable("memory store set to fail".to_string()));
		}
		*lock_mutex(&self.saved) = accounts.clone();
		self.saves.fetch_add(1, Ordering::SeqCst);
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	const ALICE: UserId = UserId(1);
	const BOB: UserId = UserId(2);

	fn test_bank() -> Bank {
		Bank::in_memory(&BankConfig {
			starting_balance: 1000,
			..BankConfig::default()
		})
	}

	fn at(secs: i64) -> DateTime<Utc> {
		DateTime::<Utc>::UNIX_EPOCH + TimeDelta::seconds(secs)
	}

	#[test]
	fn test_debit_credit() {
		let bank = test_bank();

		bank.credit(ALICE, 500);
		assert_eq!(bank.balance(ALICE), 1500);

		bank.debit(ALICE, 200).unwrap();
		assert_eq!(bank.balance(ALICE), 1300);

		let err = bank.debit(ALICE, 2000).unwrap_err();
		assert_eq!(err.available, 1300);
		assert_eq!(err.required, 2000);
		assert_eq!(bank.balance(ALICE), 1300);
	}

	#[test]
	fn test_adjust_allows_negative_balance() {
		let bank = test_bank();
		assert_eq!(bank.adjust(ALICE, -1500), -500);
		assert_eq!(bank.balance(ALICE), -500);
	}

	#[test]
	fn test_get_default_balance() {
		let bank = test_bank();
		assert_eq!(bank.balance(UserId(999)), 1000);
		assert_eq!(bank.get(UserId(999)).interaction_count, 0);
		assert!(!bank.is_dirty());
		assert!(bank.snapshot().is_empty());
	}

	#[test]
	fn test_adjust_saturates_instead_of_wrapping() {
		let bank = test_bank();
		assert_eq!(bank.credit(ALICE, i64::MAX), i64::MAX);
		assert_eq!(bank.credit(ALICE, 1_000), i64::MAX);
		assert_eq!(bank.debit(ALICE, 1_000).unwrap(), i64::MAX - 1_000);
	}

	#[test]
	fn test_reset_to_floor_only_below_floor() {
		let bank = test_bank();
		assert!(!bank.reset_to_floor(ALICE));
		assert_eq!(bank.balance(ALICE), 1000);

		bank.adjust(ALICE, -950);
		assert!(bank.reset_to_floor(ALICE));
		assert_eq!(bank.balance(ALICE), 100);

		assert!(!bank.reset_to_floor(ALICE));
	}

	#[test]
	fn test_auto_bankruptcy_requires_opt_in() {
		let bank = test_bank();
		bank.adjust(ALICE, -1000);
		assert!(!bank.apply_auto_bankruptcy(ALICE));
		assert_eq!(bank.balance(ALICE), 0);

		assert!(bank.toggle_auto_bankruptcy(ALICE));
		assert!(bank.apply_auto_bankruptcy(ALICE));
		assert_eq!(bank.balance(ALICE), 100);

		assert!(!bank.toggle_auto_bankruptcy(ALICE));
	}

	#[test]
	fn test_touch_tracks_activity() {
		let bank = test_bank();
		bank.touch(ALICE, at(10));
		bank.touch(ALICE, at(20));

		let account = bank.get(ALICE);
		assert_eq!(account.interaction_count, 2);
		assert_eq!(account.first_seen, at(10));
		assert_eq!(account.last_seen, at(20));
	}

	#[test]
	fn test_work_cooldown() {
		let bank = test_bank();

		assert_eq!(bank.try_work(ALICE, at(0)), Ok(6000));

		let wait = bank.try_work(ALICE, at(600)).unwrap_err();
		assert_eq!(wait, TimeDelta::seconds(3000));
		assert_eq!(bank.balance(ALICE), 6000);

		assert_eq!(bank.try_work(ALICE, at(3600)), Ok(11000));
	}

	#[test]
	fn test_cooldowns_are_independent() {
		let bank = test_bank();
		assert!(bank.try_stats(ALICE, at(0)).is_ok());
		assert!(bank.try_stats(ALICE, at(1)).is_err());
		assert!(bank.try_work(ALICE, at(1)).is_ok());
		assert!(bank.claim_cooldown(ALICE, Cooldown::Stats, TimeDelta::seconds(1), at(1)).is_ok());
	}

	#[test]
	fn test_summary_counts_factions() {
		let bank = test_bank();
		bank.touch(ALICE, at(0));
		bank.touch(ALICE, at(1));
		bank.touch(BOB, at(2));
		bank.set_faction(ALICE, Faction::Red);

		let summary = bank.summary();
		assert_eq!(summary.users, 2);
		assert_eq!(summary.interactions, 3);
		assert_eq!(summary.factions.get(&Faction::Red), Some(&1));
		assert_eq!(summary.unaffiliated, 1);
	}

	#[test]
	fn test_flush_only_when_dirty() {
		let store = Arc::new(MemoryStore::default());
		let bank = Bank::load(store.clone(), &BankConfig::default()).unwrap();

		assert!(!bank.flush().unwrap());
		assert_eq!(store.save_count(), 0);

		bank.credit(ALICE, 5);
		assert!(bank.is_dirty());
		assert!(bank.flush().unwrap());
		assert!(!bank.is_dirty());
		assert_eq!(store.saved()[&ALICE].balance, 10_005);

		assert!(!bank.flush().unwrap());
		assert_eq!(store.save_count(), 1);
	}

	#[test]
	fn test_failed_flush_stays_dirty() {
		let store = Arc::new(MemoryStore::default());
		let bank = Bank::load(store.clone(), &BankConfig::default()).unwrap();
		bank.credit(ALICE, 5);

		store.set_failing(true);
		assert!(bank.flush().is_err());
		assert!(bank.is_dirty());

		store.set_failing(false);
		assert!(bank.flush().unwrap());
	}

	#[test]
	fn test_load_existing_accounts() {
		let mut accounts = HashMap::new();
		accounts.insert(ALICE, UserAccount::new(42, at(0)));
		let store = Arc::new(MemoryStore::with_accounts(accounts));

		let bank = Bank::load(store, &BankConfig::default()).unwrap();
		assert_eq!(bank.balance(ALICE), 42);
		assert!(!bank.is_dirty());
	}

	#[test]
	fn test_file_store_round_trip_toml_and_json() {
		let dir = tempfile::tempdir().unwrap();
		for name in ["ledger.toml", "ledger.json"] {
			let store = Arc::new(FileStore::new(dir.path().join(name)).unwrap());
			let bank = Bank::load(store.clone(), &BankConfig::default()).unwrap();
			bank.touch(ALICE, at(5));
			bank.set_faction(ALICE, Faction::Green);
			bank.debit(ALICE, 250).unwrap();
			bank.flush().unwrap();

			let reloaded = store.load().unwrap();
			let account = &reloaded[&ALICE];
			assert_eq!(account.balance, 9_750, "{}", name);
			assert_eq!(account.faction, Some(Faction::Green));
			assert_eq!(account.last_seen, at(5));
		}
	}

	#[test]
	fn test_file_store_rejects_unknown_extension() {
		assert!(matches!(
			FileStore::new("ledger.xml"),
			Err(StoreError::UnsupportedFormat(_))
		));
	}

	#[test]
	fn test_missing_file_loads_empty() {
		let dir = tempfile::tempdir().unwrap();
		let store = FileStore::new(dir.path().join("absent.json")).unwrap();
		assert!(store.load().unwrap().is_empty());
	}

	#[test]
	fn test_faction_parse() {
		assert_eq!("RED".parse::<Faction>(), Ok(Faction::Red));
		assert!("purple".parse::<Faction>().is_err());
	}

	#[test]
	fn test_concurrent_debits_never_overdraw() {
		let bank = Arc::new(test_bank());
		let handles: Vec<_> = (0..8)
			.map(|_| {
				let bank = Arc::clone(&bank);
				std::thread::spawn(move || {
					(0..50).filter(|_| bank.debit(ALICE, 10).is_ok()).count()
				})
			})
			.collect();

		let successes: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();
		assert_eq!(successes, 100);
		assert_eq!(bank.balance(ALICE), 0);
	}
}
