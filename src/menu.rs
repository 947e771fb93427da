use crate::bank::{BankSummary, Faction};
use crate::events::{Action, Button, Controls};
use crate::games::GameId;

pub fn main_menu(balance: i64) -> (String, Controls) {
	let text = format!(
		"🏰 Welcome to the Duchy Casino!\n\nYour balance: {} ducats.",
		balance
	);
	let controls = vec![
		vec![Button::new("🎰 Games", Action::Games)],
		vec![
			Button::new("💼 Work", Action::Work),
			Button::new("📊 Stats", Action::Stats),
		],
		vec![
			Button::new("📰 News", Action::News),
			Button::new("⚙ Settings", Action::Settings),
		],
	];
	(text, controls)
}

pub fn games_menu(balance: i64) -> (String, Controls) {
	let text = format!("🎰 Pick a game.\n\nYour balance: {} ducats.", balance);
	let mut controls: Controls = GameId::ALL
		.iter()
		.map(|&game| {
			vec![Button::new(
				game.name(),
				Action::StartGame { game, fresh: false },
			)]
		})
		.collect();
	controls.push(vec![
		Button::new("🆘 Bankruptcy", Action::Bankruptcy),
		Button::new("⬅ Main menu", Action::Main),
	]);
	(text, controls)
}

pub fn settings_menu(auto_bankruptcy: bool) -> (String, Controls) {
	let state = if auto_bankruptcy { "on" } else { "off" };
	let text = format!(
		"⚙ Settings\n\nAutomatic bankruptcy is {}. When on, opening the games menu with less than the floor resets your balance to it.",
		state
	);
	let controls = vec![
		vec![Button::new(
			format!("Auto-bankruptcy: {}", state),
			Action::ToggleAutoBankruptcy,
		)],
		vec![Button::new("⬅ Main menu", Action::Main)],
	];
	(text, controls)
}

fn faction_label(faction: Faction) -> &'static str {
	match faction {
		Faction::White => "⚪ White",
		Faction::Red => "🔴 Red",
		Faction::Blue => "🔵 Blue",
		Faction::Green => "🟢 Green",
		Faction::Black => "⚫ Black",
		Faction::Clear => "🔘 Clear (all news)",
	}
}

pub fn news_menu(current: Option<Faction>) -> (String, Controls) {
	let text = match current {
		Some(faction) => format!("📰 You follow {} news.", faction_label(faction)),
		None => "📰 Pick a faction to follow its news.".to_string(),
	};
	let mut controls: Controls = Faction::ALL
		.chunks(2)
		.map(|row| {
			row.iter()
				.map(|&f| Button::new(faction_label(f), Action::Subscribe(f)))
				.collect()
		})
		.collect();
	controls.push(vec![Button::new("⬅ Main menu", Action::Main)]);
	(text, controls)
}

pub fn stats_report(summary: &BankSummary) -> String {
	let mut lines = vec![
		"📊 Casino statistics".to_string(),
		format!("Players: {}", summary.users),
		format!("Interactions: {}", summary.interactions),
	];
	for faction in Faction::ALL {
		let count = summary.factions.get(&faction).copied().unwrap_or(0);
		lines.push(format!("{}: {}", faction_label(faction), count));
	}
	lines.push(format!("No faction: {}", summary.unaffiliated));
	lines.join("\n")
}

pub fn wait_text(remaining: chrono::TimeDelta) -> String {
	let secs = remaining.num_seconds().max(1);
	if secs >= 60 {
		format!("{}m {}s", secs / 60, secs % 60)
	} else {
		format!("{}s", secs)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_games_menu_lists_every_game() {
		let (text, controls) = games_menu(250);
		assert!(text.contains("250"));
		for game in GameId::ALL {
			assert!(controls.iter().flatten().any(|b| b.action == Action::StartGame { game, fresh: false }));
		}
	}

	#[test]
	fn test_news_menu_offers_all_factions() {
		let (_, controls) = news_menu(Some(Faction::Blue));
		let subs = controls
			.iter()
			.flatten()
			.filter(|b| matches!(b.action, Action::Subscribe(_)))
			.count();
		assert_eq!(subs, Faction::ALL.len());
	}

	#[test]
	fn test_wait_text() {
		assert_eq!(wait_text(chrono::TimeDelta::seconds(3000)), "50m 0s");
		assert_eq!(wait_text(chrono::TimeDelta::seconds(5)), "5s");
	}
}
