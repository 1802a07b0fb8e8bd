use std::ffi::OsStr;
use std::io::{self, Write};
use std::os::unix::ffi::OsStrExt;
use std::path::PathBuf;
use std::{env, str};

use nix::sys::signal::{self, Signal};
use nix::unistd::Pid;
use thiserror::Error;

use crate::global;

#[derive(Debug, Error)]
pub enum BuiltinError {
	#[error("usage: {0}")]
	Usage(&'static str),
	#[error("invalid number: {0}")]
	Number(String),
	#[error("HOME is not set")]
	NoHome,
	#[error("{0}")]
	Io(#[from] io::Error),
	#[error("{0}")]
	Sys(#[from] nix::Error),
}

/// An in-process command. Gets the whole argument vector, name included.
pub type Builtin = fn(&mut global::State, &[&[u8]]) -> Result<(), BuiltinError>;

fn parse_number(arg: &[u8]) -> Result<i32, BuiltinError> {
	str::from_utf8(arg).ok()
		.and_then(|s| s.parse().ok())
		.ok_or_else(|| BuiltinError::Number(String::from_utf8_lossy(arg).into_owned()))
}

pub fn builtin_exit(state: &mut global::State, argv: &[&[u8]]) -> Result<(), BuiltinError> {
	let status = match argv {
		[_] => 0,
		[_, status] => parse_number(status)?,
		_ => return Err(BuiltinError::Usage("exit [status]")),
	};
	state.exit_requested = Some(status);
	Ok(())
}

pub fn builtin_cd(_: &mut global::State, argv: &[&[u8]]) -> Result<(), BuiltinError> {
	let target = match argv {
		[_] => PathBuf::from(env::var_os("HOME").ok_or(BuiltinError::NoHome)?),
		[_, dir] => PathBuf::from(OsStr::from_bytes(dir)),
		_ => return Err(BuiltinError::Usage("cd [dir]")),
	};
	env::set_current_dir(target)?;
	Ok(())
}

pub fn builtin_pwd(_: &mut global::State, argv: &[&[u8]]) -> Result<(), BuiltinError> {
	if argv.len() != 1 {
		return Err(BuiltinError::Usage("pwd"));
	}
	let dir = env::current_dir()?;
	let mut stdout = io::stdout();
	stdout.write_all(dir.as_os_str().as_bytes())?;
	stdout.write_all(b"\n")?;
	stdout.flush()?;
	Ok(())
}

fn parse_kill_args(argv: &[&[u8]]) -> Result<(Signal, Pid), BuiltinError> {
	let (signal, pid) = match argv {
		[_, pid] => (Signal::SIGTERM, pid),
		[_, sig, pid] if sig.first() == Some(&b'-') => {
			let n = parse_number(&sig[1..])?;
			(Signal::try_from(n)?, pid)
		},
		_ => return Err(BuiltinError::Usage("kill [-signum] pid")),
	};
	Ok((signal, Pid::from_raw(parse_number(pid)?)))
}

pub fn builtin_kill(_: &mut global::State, argv: &[&[u8]]) -> Result<(), BuiltinError> {
	let (sig, pid) = parse_kill_args(argv)?;
	signal::kill(pid, sig)?;
	Ok(())
}

pub fn match_builtin(name: &[u8]) -> Option<Builtin> {
	match name {
		b"exit" => Some(builtin_exit),
		b"cd" => Some(builtin_cd),
		b"pwd" => Some(builtin_pwd),
		b"kill" => Some(builtin_kill),
		_ => None,
	}
}
