use std::io::{self, Write};
use std::os::fd::{FromRawFd, IntoRawFd, OwnedFd};

use nix::unistd::{self, Pid};

use crate::builtin;
use crate::error::{resource, ResourceError};
use crate::global;
use crate::job;
use crate::launch;
use crate::types::{Classification, Command, Pipeline};

/// The builtin to run in-process for `pipeline`, if any. Only a lone foreground command
/// without redirections qualifies; everything else forks even when the name is a builtin.
pub fn builtin_fast_path(pipeline: &Pipeline) -> Option<builtin::Builtin> {
	match pipeline.commands.as_slice() {
		[command] if command.redirects.is_empty() && !pipeline.is_background => builtin::match_builtin(command.name()),
		_ => None,
	}
}

fn run_builtin(state: &mut global::State, func: builtin::Builtin, command: &Command) {
	let name = String::from_utf8_lossy(command.name());
	tracing::debug!(builtin = %name, "running in-process");
	if let Err(e) = func(state, &command.argv) {
		tracing::warn!(builtin = %name, error = %e, "builtin failed");
		let _ = writeln!(&mut io::stderr(), "Builtin {} error: {}", name, e);
	}
}

fn dup_stdin() -> Result<OwnedFd, ResourceError> {
	let fd = unistd::dup(libc::STDIN_FILENO).map_err(resource("dup"))?;
	// dup returned a fresh descriptor that nothing else owns.
	Ok(unsafe { OwnedFd::from_raw_fd(fd) })
}

fn close(fd: OwnedFd) -> Result<(), ResourceError> {
	unistd::close(fd.into_raw_fd()).map_err(resource("close"))
}

fn track(scope: &mut job::Blocked, pid: Pid, classification: Classification) {
	match classification {
		Classification::Foreground => scope.register_foreground(pid),
		Classification::Background => scope.register_background(pid),
	}
}

/// Forks every stage of `pipeline`, chaining them with pipes. Stage 0 reads `input`; each
/// descriptor is closed here as soon as the child that needs it has been forked.
fn spawn_commands(state: &global::State, pipeline: &Pipeline, input: OwnedFd,
                  scope: &mut job::Blocked) -> Result<(), ResourceError> {
	let classification = pipeline.classification();
	let Some((last, init)) = pipeline.commands.split_last() else {
		return close(input);
	};

	let mut read_fd = input;
	for command in init {
		let (pipe_read, pipe_write) = unistd::pipe().map_err(resource("pipe"))?;
		let pid = launch::launch(command, &read_fd, Some((&pipe_read, &pipe_write)), classification, &state.dispositions)?;
		track(scope, pid, classification);
		close(read_fd)?;
		close(pipe_write)?;
		read_fd = pipe_read;
	}
	let pid = launch::launch(last, &read_fd, None, classification, &state.dispositions)?;
	track(scope, pid, classification);
	close(read_fd)
}

/// Runs one pipeline. Returns once every stage has exited for a foreground pipeline, or as
/// soon as every stage has been forked for a background one.
pub fn eval(state: &mut global::State, pipeline: &Pipeline) -> Result<(), ResourceError> {
	if let Some(func) = builtin_fast_path(pipeline) {
		run_builtin(state, func, &pipeline.commands[0]);
		return Ok(());
	}

	let input = dup_stdin()?;
	let state = &*state;
	let mut scope = state.job_table.block()?;
	scope.reap_if_notified()?;
	spawn_commands(state, pipeline, input, &mut scope)?;
	if !pipeline.is_background {
		scope.wait_foreground_all()?;
	}
	Ok(())
}
