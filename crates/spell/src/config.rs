use std::time::Duration;

use serde::Deserialize;

use crate::error::{Result, SpellError};

/// Runtime configuration for the spell-check core.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SpellConfig {
	/// Size of the bounded pool shared by background files.
	pub background_threads: usize,
	/// Upper bound on how long `cancel_all` waits for in-flight jobs to stop.
	pub drain_timeout_ms: u64,
	/// Projects whose files are never tracked.
	pub ignored_projects: Vec<String>,
	/// Context-menu replacement applies to every occurrence in the file.
	pub replace_all_from_context_menu: bool,
	/// Number of suggestion slots offered in the context menu.
	pub max_context_suggestions: usize,
}

impl Default for SpellConfig {
	fn default() -> Self {
		Self {
			background_threads: 2,
			drain_timeout_ms: 5_000,
			ignored_projects: Vec::new(),
			replace_all_from_context_menu: false,
			max_context_suggestions: 5,
		}
	}
}

impl SpellConfig {
	/// Parses and validates a TOML document. Missing keys keep their defaults.
	pub fn from_toml_str(input: &str) -> Result<Self> {
		let config: Self = toml::from_str(input)?;
		config.validate()?;
		Ok(config)
	}

	pub fn validate(&self) -> Result<()> {
		if self.background_threads == 0 {
			return Err(SpellError::InvalidConfig("background_threads must be > 0".into()));
		}
		Ok(())
	}

	pub fn drain_timeout(&self) -> Duration {
		Duration::from_millis(self.drain_timeout_ms)
	}

	pub fn is_project_ignored(&self, name: &str) -> bool {
		self.ignored_projects.iter().any(|ignored| ignored == name)
	}
}
