use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::runtime::Handle;
use tokio::sync::mpsc;

use duchy_casino::bank::{Bank, FileStore};
use duchy_casino::clock::SystemClock;
use duchy_casino::config::{load_config, load_config_auto};
use duchy_casino::defaults;
use duchy_casino::engine::Casino;
use duchy_casino::error::TransportError;
use duchy_casino::events::{Action, Envelope, MessageId, Reply, ReplyKind, UserId};
use duchy_casino::server::CasinoServer;
use duchy_casino::session::MemorySessionStore;
use duchy_casino::timer::TokioScheduler;
use duchy_casino::transport::Transport;

#[derive(Parser)]
#[command(name = "casino-console")]
#[command(about = "Play the Duchy Casino from a terminal")]
struct Cli {
	/// Chat user id to play as
	#[arg(short, long, default_value_t = 1)]
	user: i64,

	#[arg(short, long, env = "CASINO_CONFIG")]
	config: Option<PathBuf>,

	/// Fixed RNG seed, overrides the config
	#[arg(long)]
	seed: Option<u64>,

	/// Ledger file (.toml or .json)
	#[arg(long, env = "CASINO_LEDGER")]
	ledger: Option<PathBuf>,

	/// Print replies as JSON lines
	#[arg(long)]
	json: bool,
}

struct ConsoleTransport {
	json: bool,
	next_id: AtomicI64,
}

#[async_trait]
impl Transport for ConsoleTransport {
	async fn deliver(&self, _user: UserId, reply: &Reply) -> Result<MessageId, TransportError> {
		let id = match reply.kind {
			ReplyKind::Edit(id) => id,
			_ => MessageId(self.next_id.fetch_add(1, Ordering::SeqCst)),
		};

		if self.json {
			let line = serde_json::to_string(reply).map_err(|_| TransportError::Closed)?;
			println!("{}", line);
			return Ok(id);
		}

		match reply.kind {
			ReplyKind::Notice => println!("  ({})", reply.text),
			ReplyKind::Send => println!("\n#{} {}", id.0, reply.text),
			ReplyKind::Edit(_) => println!("\n#{} (edited) {}", id.0, reply.text),
		}
		for row in &reply.controls {
			let buttons: Vec<String> = row
				.iter()
				.map(|b| format!("[{}] /{}", b.label, b.action))
				.collect();
			println!("  {}", buttons.join("   "));
		}
		Ok(id)
	}
}

#[tokio::main]
async fn main() {
	let cli = Cli::parse();
	if let Err(e) = run(cli).await {
		eprintln!("Error: {}", e);
		std::process::exit(1);
	}
}

async fn run(cli: Cli) -> Result<(), String> {
	defaults::ensure_config();

	let mut config = match &cli.config {
		Some(path) => load_config(path)?,
		None => load_config_auto()?,
	};
	if cli.seed.is_some() {
		config.seed = cli.seed;
	}

	let ledger = cli
		.ledger
		.clone()
		.or_else(|| config.bank.store.clone())
		.unwrap_or_else(FileStore::default_path);
	let store = FileStore::new(ledger).map_err(|e| e.to_string())?;
	let bank = Bank::load(Arc::new(store), &config.bank).map_err(|e| e.to_string())?;

	let (scheduler, timers) = TokioScheduler::new(Handle::current());
	let casino = Casino::new(
		config,
		Arc::new(bank),
		Arc::new(MemorySessionStore::new()),
		Arc::new(scheduler),
		Arc::new(SystemClock),
	);
	let transport = ConsoleTransport {
		json: cli.json,
		next_id: AtomicI64::new(1),
	};
	let server = CasinoServer::new(Arc::new(casino), Arc::new(transport));

	let user = UserId(cli.user);
	let (tx, rx) = mpsc::channel(32);
	tokio::spawn(async move {
		if tx.send(Envelope::button(user, None, Action::Main)).await.is_err() {
			return;
		}

		let mut lines = BufReader::new(tokio::io::stdin()).lines();
		while let Ok(Some(line)) = lines.next_line().await {
			let line = line.trim();
			if line.is_empty() {
				continue;
			}
			if line == "/quit" {
				break;
			}

			let envelope = match line.strip_prefix('/') {
				Some(data) => match data.parse::<Action>() {
					Ok(action) => Envelope::button(user, None, action),
					Err(e) => {
						eprintln!("{}", e);
						continue;
					}
				},
				None => Envelope::text(user, line),
			};
			if tx.send(envelope).await.is_err() {
				break;
			}
		}
	});

	server.run(rx, timers).await;
	Ok(())
}
