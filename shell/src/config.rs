use thiserror::Error;

pub const DEFAULT_PROMPT: &str = "pipesh> ";
pub const DEFAULT_MAX_LINE_LENGTH: usize = 2048;

const PROMPT_VAR: &str = "PIPESH_PROMPT";
const MAX_LINE_VAR: &str = "PIPESH_MAX_LINE";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
	#[error("{0} requires an argument")]
	MissingArgument(&'static str),
	#[error("unknown option: {0}")]
	UnknownOption(String),
	#[error("{var}: not a positive number: {value}")]
	InvalidNumber { var: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
	pub prompt: String,
	/// `None` means "interactive if stdin is a terminal".
	pub interactive: Option<bool>,
	pub max_line_length: usize,
	/// A single line given with `-c`.
	pub command: Option<String>,
}

impl Default for Config {
	fn default() -> Config {
		Config {
			prompt: DEFAULT_PROMPT.to_string(),
			interactive: None,
			max_line_length: DEFAULT_MAX_LINE_LENGTH,
			command: None,
		}
	}
}

#[derive(Debug, PartialEq, Eq)]
pub enum Invocation {
	Run(Config),
	Help,
	Version,
}

impl Config {
	/// Builds the configuration from the arguments (program name excluded) and an
	/// environment lookup.
	pub fn load<I, E>(args: I, env: E) -> Result<Invocation, ConfigError>
	where I: IntoIterator<Item = String>, E: Fn(&str) -> Option<String> {
		let mut config = Config::default();
		if let Some(prompt) = env(PROMPT_VAR) {
			config.prompt = prompt;
		}
		if let Some(value) = env(MAX_LINE_VAR) {
			config.max_line_length = match value.parse() {
				Ok(n) if n > 0 => n,
				_ => return Err(ConfigError::InvalidNumber { var: MAX_LINE_VAR, value }),
			};
		}

		let mut args = args.into_iter();
		while let Some(arg) = args.next() {
			match arg.as_str() {
				"-h" | "--help" => return Ok(Invocation::Help),
				"-V" | "--version" => return Ok(Invocation::Version),
				"-i" => config.interactive = Some(true),
				"-c" => config.command = Some(args.next().ok_or(ConfigError::MissingArgument("-c"))?),
				_ => return Err(ConfigError::UnknownOption(arg)),
			}
		}
		Ok(Invocation::Run(config))
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn no_env(_: &str) -> Option<String> {
		None
	}

	fn args(list: &[&str]) -> Vec<String> {
		list.iter().map(|s| s.to_string()).collect()
	}

	#[test]
	fn defaults() {
		assert_eq!(Config::load(args(&[]), no_env).unwrap(), Invocation::Run(Config::default()));
	}

	#[test]
	fn options() {
		let Invocation::Run(config) = Config::load(args(&["-i", "-c", "echo hi"]), no_env).unwrap() else {
			panic!("expected a run configuration");
		};
		assert_eq!(config.interactive, Some(true));
		assert_eq!(config.command.as_deref(), Some("echo hi"));
		assert_eq!(Config::load(args(&["--help"]), no_env).unwrap(), Invocation::Help);
		assert_eq!(Config::load(args(&["-c"]), no_env).unwrap_err(), ConfigError::MissingArgument("-c"));
		assert!(matches!(Config::load(args(&["-x"]), no_env), Err(ConfigError::UnknownOption(_))));
	}

	#[test]
	fn environment() {
		let env = |key: &str| match key {
			"PIPESH_PROMPT" => Some("$ ".to_string()),
			"PIPESH_MAX_LINE" => Some("64".to_string()),
			_ => None,
		};
		let Invocation::Run(config) = Config::load(args(&[]), env).unwrap() else {
			panic!("expected a run configuration");
		};
		assert_eq!(config.prompt, "$ ");
		assert_eq!(config.max_line_length, 64);

		let bad = |key: &str| (key == "PIPESH_MAX_LINE").then(|| "0".to_string());
		assert!(matches!(Config::load(args(&[]), bad), Err(ConfigError::InvalidNumber { .. })));
	}
}
