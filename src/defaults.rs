use include_dir::{include_dir, Dir};
use std::fs;
use std::path::{Path, PathBuf};

static CONFIG_DIR: Dir = include_dir!("$CARGO_MANIFEST_DIR/config");

pub fn user_config_dir() -> Option<PathBuf> {
	dirs::config_dir().map(|dir| dir.join("duchy-casino"))
}

/// Copies the bundled config files into the user's config directory,
/// leaving any file that already exists alone.
pub fn ensure_config() {
	let Some(dest) = user_config_dir() else {
		return;
	};

	extract_dir(&CONFIG_DIR, &dest);
}

fn extract_dir(dir: &Dir, dest: &Path) {
	for file in dir.files() {
		let file_dest = dest.join(file.path());
		if !file_dest.exists() {
			if let Some(parent) = file_dest.parent() {
				let _ = fs::create_dir_all(parent);
			}
			let _ = fs::write(&file_dest, file.contents());
		}
	}

	for subdir in dir.dirs() {
		extract_dir(subdir, dest);
	}
}

pub fn bundled_config() -> Option<&'static str> {
	CONFIG_DIR.get_file("casino.toml").and_then(|f| f.contents_utf8())
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_bundled_config_parses() {
		let content = bundled_config().expect("casino.toml is bundled");
		let config = crate::config::parse_config(content).unwrap();
		assert_eq!(config.bank.starting_balance, 10_000);
		assert_eq!(config.race.max_timeouts, 3);
	}

	#[test]
	fn test_extract_does_not_overwrite() {
		let dir = tempfile::tempdir().unwrap();
		let existing = dir.path().join("casino.toml");
		fs::write(&existing, "seed = 1\n").unwrap();

		extract_dir(&CONFIG_DIR, dir.path());

		assert_eq!(fs::read_to_string(&existing).unwrap(), "seed = 1\n");
	}
}
