use thiserror::Error;

/// A line that cannot be executed as written. The line is discarded and the shell goes on.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum StructuralError {
	#[error("{0}")]
	Parse(String),
	#[error("empty command in pipeline")]
	EmptyCommand,
	#[error("line longer than {0} bytes")]
	TooLong(usize),
}

/// A system call failed in the shell's own process. Fatal.
#[derive(Debug, Error)]
#[error("{call}() failed: {source}")]
pub struct ResourceError {
	pub call: &'static str,
	#[source]
	pub source: nix::Error,
}

pub fn resource(call: &'static str) -> impl FnOnce(nix::Error) -> ResourceError {
	move |source| ResourceError { call, source }
}
