use thiserror::Error;

use crate::events::UserId;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{user} has insufficient funds: needs {required}, has {available}")]
pub struct InsufficientFunds {
	pub user: UserId,
	pub required: i64,
	pub available: i64,
}

/// Everything that can go wrong while handling one inbound action.
///
/// None of these are fatal: the router turns each into a notice for the
/// user and leaves the session in `Idle` or unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CasinoError {
	#[error("Please send a number, got {0:?}")]
	InputFormat(String),

	#[error("The bet must be greater than zero and no more than your balance ({balance} ducats)")]
	BetOutOfRange { balance: i64 },

	#[error("Place a bet first!")]
	NoBet,

	#[error(transparent)]
	InsufficientFunds(#[from] InsufficientFunds),

	#[error("{0}")]
	StaleState(&'static str),

	#[error("unrecognized action: {0}")]
	UnknownAction(String),
}

#[derive(Debug, Error)]
pub enum StoreError {
	#[error("failed to access {path}: {source}")]
	Io {
		path: String,
		#[source]
		source: std::io::Error,
	},

	#[error("failed to parse ledger: {0}")]
	TomlDecode(#[from] toml::de::Error),

	#[error("failed to serialize ledger: {0}")]
	TomlEncode(#[from] toml::ser::Error),

	#[error("ledger json error: {0}")]
	Json(#[from] serde_json::Error),

	#[error("unsupported ledger format: {0}")]
	UnsupportedFormat(String),

	#[error("{0}")]
	Unavailable(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
	#[error("delivery to {user} failed: {reason}")]
	Delivery { user: UserId, reason: String },

	#[error("transport closed")]
	Closed,
}
