//! pipesh entry point.
//!
//! Usage:
//!   pipesh              # read lines from stdin (prompt if it is a terminal)
//!   pipesh -i           # always prompt and report finished background jobs
//!   pipesh -c <line>    # execute one line and exit

use std::env;
use std::io::{self, IsTerminal, Write};
use std::process::ExitCode;

use anyhow::{Context, Result};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use pipesh::config::{Config, Invocation};
use pipesh::reader::{self, Input, LineReader};
use pipesh::{dispatch, error::StructuralError, global, signals};

const LOG_VAR: &str = "PIPESH_LOG";

fn main() -> ExitCode {
	tracing_subscriber::registry()
		.with(fmt::layer().with_writer(io::stderr))
		.with(EnvFilter::try_from_env(LOG_VAR).unwrap_or_else(|_| EnvFilter::new("warn")))
		.init();

	match run() {
		Ok(code) => code,
		Err(e) => {
			eprintln!("pipesh: {e:#}");
			ExitCode::FAILURE
		}
	}
}

fn exit_code(status: i32) -> ExitCode {
	ExitCode::from((status & 0xff) as u8)
}

fn run() -> Result<ExitCode> {
	let config = match Config::load(env::args().skip(1), |key| env::var(key).ok())? {
		Invocation::Run(config) => config,
		Invocation::Help => {
			print_help();
			return Ok(ExitCode::SUCCESS);
		}
		Invocation::Version => {
			println!("pipesh {}", env!("CARGO_PKG_VERSION"));
			return Ok(ExitCode::SUCCESS);
		}
	};

	let dispositions = signals::Dispositions::install().context("installing signal handlers")?;
	let mut state = global::State::new(dispositions);

	if let Some(line) = &config.command {
		dispatch::run_line(&mut state, line.as_bytes())?;
		return Ok(exit_code(state.exit_requested.unwrap_or(0)));
	}

	let interactive = config.interactive.unwrap_or_else(|| io::stdin().is_terminal());
	tracing::debug!(interactive, prompt = %config.prompt, "starting");
	repl(&mut state, &config, interactive)
}

fn repl(state: &mut global::State, config: &Config, interactive: bool) -> Result<ExitCode> {
	let source = reader::stdin_source().context("opening stdin")?;
	let mut reader = LineReader::new(source, config.max_line_length);
	let mut stdout = io::stdout();

	loop {
		if interactive {
			state.job_table.report_background_completions(&mut stdout)?;
			let _ = stdout.write_all(config.prompt.as_bytes());
			let _ = stdout.flush();
		} else {
			let n = state.job_table.report_background_completions(&mut io::sink())?;
			if n > 0 {
				tracing::debug!(count = n, "background jobs finished");
			}
		}

		match reader.next_line().context("reading input")? {
			Input::Eof => return Ok(ExitCode::SUCCESS),
			Input::Malformed => {
				dispatch::report_syntax_error(&StructuralError::TooLong(config.max_line_length));
			}
			Input::Line(line) => dispatch::run_line(state, &line)?,
		}

		if let Some(status) = state.exit_requested {
			return Ok(exit_code(status));
		}
	}
}

fn print_help() {
	println!("pipesh - a small job-control shell");
	println!();
	println!("Usage:");
	println!("  pipesh              Read commands from stdin");
	println!("  pipesh -i           Force interactive mode");
	println!("  pipesh -c <line>    Execute one line and exit");
	println!();
	println!("Environment:");
	println!("  PIPESH_PROMPT       Prompt string (default \"pipesh> \")");
	println!("  PIPESH_MAX_LINE     Longest accepted line in bytes (default 2048)");
	println!("  PIPESH_LOG          Log filter, e.g. \"debug\" (default \"warn\")");
}
