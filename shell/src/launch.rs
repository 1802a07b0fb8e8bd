use std::convert::Infallible;
use std::ffi::{self, CStr, CString};
use std::io::{self, Write};
use std::os::fd::{AsRawFd, OwnedFd, RawFd};

use nix::errno::Errno;
use nix::fcntl::{self, OFlag};
use nix::sys::stat::Mode;
use nix::unistd::{self, ForkResult, Pid};
use thiserror::Error;

use crate::error::{resource, ResourceError};
use crate::signals::Dispositions;
use crate::types::{Classification, Command, RedirectType};

/// Exit status of a child that could not get as far as running its program.
pub const LAUNCH_FAILURE: i32 = 127;

#[derive(Debug, Error)]
enum LaunchError {
	#[error("{}: {}", .name, describe(.errno))]
	Open { name: String, errno: Errno },
	#[error("{}: {}", .name, exec_reason(.errno))]
	Exec { name: String, errno: Errno },
	#[error("{call}() failed: {errno}")]
	Descriptor { call: &'static str, errno: Errno },
	#[error("signal setup failed: {0}")]
	Signals(Errno),
	#[error("{0}")]
	Nul(#[from] ffi::NulError),
}

fn describe(errno: &Errno) -> &'static str {
	match *errno {
		Errno::ENOENT => "no such file or directory",
		Errno::EACCES => "permission denied",
		Errno::EISDIR => "is a directory",
		e => e.desc(),
	}
}

fn exec_reason(errno: &Errno) -> &'static str {
	match *errno {
		Errno::ENOENT => "no such file or directory",
		Errno::EACCES => "permission denied",
		_ => "exec error",
	}
}

/// The C strings a child needs, built before `fork`. The child itself only allocates on
/// its error path, to format the diagnostic it prints before `_exit`.
struct Prepared {
	argv: Vec<CString>,
	redirects: Vec<(RedirectType, CString)>,
}

impl Prepared {
	fn new(command: &Command) -> Result<Prepared, ffi::NulError> {
		let argv = command.argv.iter().map(|&s| CString::new(s)).collect::<Result<Vec<_>, _>>()?;
		let redirects = command.redirects.iter()
			.map(|r| CString::new(r.target).map(|path| (r.typ, path)))
			.collect::<Result<Vec<_>, _>>()?;
		Ok(Prepared { argv, redirects })
	}
}

fn move_fd(from: RawFd, to: RawFd) -> Result<(), LaunchError> {
	if from == to {
		return Ok(());
	}
	unistd::dup2(from, to).map_err(|errno| LaunchError::Descriptor { call: "dup2", errno })?;
	close_fd(from)
}

fn close_fd(fd: RawFd) -> Result<(), LaunchError> {
	unistd::close(fd).map_err(|errno| LaunchError::Descriptor { call: "close", errno })
}

fn open_redirect(typ: RedirectType, name: &CStr) -> Result<(), LaunchError> {
	let mode = Mode::S_IRUSR | Mode::S_IWUSR | Mode::S_IRGRP | Mode::S_IROTH;
	let (flags, target) = match typ {
		RedirectType::Input => (OFlag::O_RDONLY, libc::STDIN_FILENO),
		RedirectType::Output => (OFlag::O_WRONLY | OFlag::O_CREAT | OFlag::O_TRUNC, libc::STDOUT_FILENO),
		RedirectType::Append => (OFlag::O_WRONLY | OFlag::O_CREAT | OFlag::O_APPEND, libc::STDOUT_FILENO),
	};
	let fd = fcntl::open(name, flags, mode)
		.map_err(|errno| LaunchError::Open { name: name.to_string_lossy().into_owned(), errno })?;
	move_fd(fd, target)
}

/// Everything the child does between `fork` and `exec`. Only returns on failure.
fn do_exec_command(prepared: Result<Prepared, ffi::NulError>, input: RawFd, pipe: Option<(RawFd, RawFd)>,
                   classification: Classification, dispositions: &Dispositions) -> Result<Infallible, LaunchError> {
	if classification == Classification::Background {
		unistd::setsid().map_err(|errno| LaunchError::Descriptor { call: "setsid", errno })?;
	}
	dispositions.restore().map_err(LaunchError::Signals)?;

	move_fd(input, libc::STDIN_FILENO)?;
	if let Some((pipe_read, pipe_write)) = pipe {
		move_fd(pipe_write, libc::STDOUT_FILENO)?;
		close_fd(pipe_read)?;
	}

	let prepared = prepared?;
	for (typ, name) in &prepared.redirects {
		open_redirect(*typ, name)?;
	}

	let program = &prepared.argv[0];
	unistd::execvp(program, &prepared.argv)
		.map_err(|errno| LaunchError::Exec { name: program.to_string_lossy().into_owned(), errno })
}

fn exec_command(prepared: Result<Prepared, ffi::NulError>, input: RawFd, pipe: Option<(RawFd, RawFd)>,
                classification: Classification, dispositions: &Dispositions) -> ! {
	let Err(e) = do_exec_command(prepared, input, pipe, classification, dispositions);
	let _ = writeln!(&mut io::stderr(), "{}", e);
	unsafe { libc::_exit(LAUNCH_FAILURE) }
}

/// Forks one process for `command`.
///
/// The child reads from `input` and writes to the write end of `pipe` when given (its own
/// stdout otherwise), then applies the command's redirections and execs the program found
/// on `PATH`. Anything that goes wrong after the fork stays in the child, which reports it
/// and exits with [`LAUNCH_FAILURE`]. The parent only sees a failed `fork`.
pub fn launch(command: &Command, input: &OwnedFd, pipe: Option<(&OwnedFd, &OwnedFd)>,
              classification: Classification, dispositions: &Dispositions) -> Result<Pid, ResourceError> {
	let prepared = Prepared::new(command);
	let pipe = pipe.map(|(r, w)| (r.as_raw_fd(), w.as_raw_fd()));
	let _ = io::stdout().flush();

	// The child only rearranges descriptors and signals before exec or _exit.
	match unsafe { unistd::fork() }.map_err(resource("fork"))? {
		ForkResult::Parent { child } => {
			tracing::debug!(pid = child.as_raw(), program = %String::from_utf8_lossy(command.name()),
				?classification, "launched");
			Ok(child)
		},
		ForkResult::Child => exec_command(prepared, input.as_raw_fd(), pipe, classification, dispositions),
	}
}
