use std::io::{self, Write};

use crate::error::{ResourceError, StructuralError};
use crate::eval;
use crate::global;
use crate::parser;
use crate::types::{Line, ParsedPipeline, Pipeline};

pub const SYNTAX_ERROR: &str = "Syntax error.";

fn is_empty_pipeline(pipeline: &ParsedPipeline) -> bool {
	matches!(pipeline.commands.as_slice(), [None])
}

/// Drops the no-op pipelines of `line` and checks the rest. One pipeline with an empty
/// command slot next to real commands rejects the whole line.
pub fn validate(line: Line<'_>) -> Result<Vec<Pipeline<'_>>, StructuralError> {
	line.pipelines.into_iter()
		.filter(|p| !is_empty_pipeline(p))
		.map(|p| match p.commands.into_iter().collect::<Option<Vec<_>>>() {
			Some(commands) => Ok(Pipeline { commands, is_background: p.is_background }),
			None => Err(StructuralError::EmptyCommand),
		})
		.collect()
}

/// Runs `pipelines` in order. Stops early once a builtin has asked the shell to exit.
pub fn execute(state: &mut global::State, pipelines: &[Pipeline]) -> Result<(), ResourceError> {
	for pipeline in pipelines {
		tracing::debug!(commands = pipeline.commands.len(), background = pipeline.is_background, "dispatching pipeline");
		eval::eval(state, pipeline)?;
		if state.exit_requested.is_some() {
			break;
		}
	}
	Ok(())
}

pub fn report_syntax_error(err: &StructuralError) {
	tracing::debug!(error = %err, "line rejected");
	let _ = writeln!(&mut io::stderr(), "{}", SYNTAX_ERROR);
}

/// Parses, validates and executes one input line. Structural problems are reported and
/// swallowed; only a failure of the shell's own process comes back as an error.
pub fn run_line(state: &mut global::State, text: &[u8]) -> Result<(), ResourceError> {
	match parser::parse(text).and_then(validate) {
		Ok(pipelines) => execute(state, &pipelines),
		Err(e) => {
			report_syntax_error(&e);
			Ok(())
		},
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn names(pipelines: &[Pipeline]) -> Vec<Vec<Vec<u8>>> {
		pipelines.iter()
			.map(|p| p.commands.iter().map(|c| c.name().to_vec()).collect())
			.collect()
	}

	#[test]
	fn empty_pipelines_are_skipped() {
		let pipelines = validate(parser::parse(b"true ; ; false").unwrap()).unwrap();
		assert_eq!(names(&pipelines), vec![vec![b"true".to_vec()], vec![b"false".to_vec()]]);
	}

	#[test]
	fn missing_pipe_side_rejects_line() {
		let err = validate(parser::parse(b"cmd1 | | cmd2").unwrap()).unwrap_err();
		assert_eq!(err, StructuralError::EmptyCommand);
		assert!(validate(parser::parse(b"echo ok ; cmd1 |").unwrap()).is_err());
		assert!(validate(parser::parse(b"| cmd2").unwrap()).is_err());
	}

	#[test]
	fn blank_line_is_nothing_to_do() {
		assert!(validate(parser::parse(b"").unwrap()).unwrap().is_empty());
		assert!(validate(parser::parse(b" ; ;\n").unwrap()).unwrap().is_empty());
		assert!(validate(parser::parse(b"&").unwrap()).unwrap().is_empty());
	}

	#[test]
	fn background_flag_survives() {
		let pipelines = validate(parser::parse(b"sleep 5 & echo hi").unwrap()).unwrap();
		assert_eq!(pipelines.len(), 2);
		assert!(pipelines[0].is_background);
		assert!(!pipelines[1].is_background);
	}
}
