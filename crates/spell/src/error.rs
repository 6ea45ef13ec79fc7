/// Errors surfaced by construction, configuration and checker selection.
///
/// Scheduling conditions (stale completions, late submits during shutdown,
/// empty input) are absorbed and reported through outcome enums instead.
#[derive(Debug, thiserror::Error)]
pub enum SpellError {
	#[error("failed to start worker pool: {0}")]
	Runtime(#[from] std::io::Error),
	#[error("invalid configuration: {0}")]
	Config(#[from] toml::de::Error),
	#[error("invalid configuration: {0}")]
	InvalidConfig(String),
	#[error("spell checker failed: {0}")]
	Checker(String),
	#[error("unknown spell checker: {0}")]
	UnknownChecker(String),
}

pub type Result<T> = std::result::Result<T, SpellError>;
