//! Tracking of child processes.
//!
//! All job state lives behind a [`JobTable`] and can only be touched through a [`Blocked`]
//! scope, which holds SIGCHLD blocked and the table locked for as long as it lives.

use std::io::Write;
use std::sync::{Mutex, MutexGuard, PoisonError};

use nix::errno::Errno;
use nix::sys::wait::{self, WaitPidFlag, WaitStatus};
use nix::unistd::Pid;

use crate::error::{resource, ResourceError};
use crate::signals::{self, ChildSignalBlock};
use crate::types::Classification;

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum State { Created, Running, Terminated(WaitStatus), Reaped(WaitStatus) }

pub trait WaitStatusExt {
	fn describe(self) -> String;
}

impl WaitStatusExt for WaitStatus {
	fn describe(self) -> String {
		match self {
			WaitStatus::Exited(_, code) => format!("exited with status {}", code),
			WaitStatus::Signaled(_, sig, _) => format!("killed by signal {}", sig as i32),
			other => format!("{:?}", other),
		}
	}
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct Job {
	pub pid: Pid,
	pub classification: Classification,
	pub state: State,
}

impl Job {
	pub fn new(pid: Pid, classification: Classification) -> Job {
		Job { pid, classification, state: State::Created }
	}
}

#[derive(Debug, Default)]
struct Tracking {
	running: Vec<Job>,
	completed: Vec<Job>,
}

impl Tracking {
	fn register(&mut self, mut job: Job) {
		debug_assert!(self.running.iter().all(|j| j.pid != job.pid));
		job.state = State::Running;
		self.running.push(job);
	}

	fn has_foreground(&self) -> bool {
		self.running.iter().any(|j| j.classification == Classification::Foreground)
	}

	/// Books one reaped status. A foreground job is done with right away and handed back;
	/// everything else, including pids nobody registered, waits on the completed list for
	/// the next prompt.
	fn record(&mut self, status: WaitStatus) -> Option<Job> {
		let pid = status.pid()?;
		let mut job = match self.running.iter().position(|j| j.pid == pid) {
			Some(i) => self.running.swap_remove(i),
			None => Job::new(pid, Classification::Background),
		};
		job.state = State::Terminated(status);
		tracing::debug!(pid = pid.as_raw(), ?status, classification = ?job.classification, "reaped");
		match job.classification {
			Classification::Foreground => {
				job.state = State::Reaped(status);
				Some(job)
			},
			Classification::Background => {
				self.completed.push(job);
				None
			},
		}
	}

	fn take_completed(&mut self) -> Vec<Job> {
		let mut done = std::mem::take(&mut self.completed);
		for job in &mut done {
			if let State::Terminated(status) = job.state {
				job.state = State::Reaped(status);
			}
		}
		done
	}
}

#[derive(Debug, Default)]
pub struct JobTable {
	tracking: Mutex<Tracking>,
}

impl JobTable {
	pub fn new() -> JobTable {
		JobTable::default()
	}

	/// Enters the exclusive scope. SIGCHLD stays blocked until the returned value is dropped.
	pub fn block(&self) -> Result<Blocked<'_>, ResourceError> {
		let signals = ChildSignalBlock::new()?;
		let tracking = self.tracking.lock().unwrap_or_else(PoisonError::into_inner);
		Ok(Blocked { tracking, _signals: signals })
	}

	/// Reaps whatever has finished and prints one line per background completion.
	/// Runs once per prompt, never while a pipeline is executing.
	pub fn report_background_completions<W: Write>(&self, out: &mut W) -> Result<usize, ResourceError> {
		let done = {
			let mut scope = self.block()?;
			scope.reap_terminated()?;
			scope.take_completed()
		};
		for job in &done {
			let _ = writeln!(out, "{}", completion_message(job));
		}
		let _ = out.flush();
		Ok(done.len())
	}
}

fn completion_message(job: &Job) -> String {
	let what = match job.state {
		State::Terminated(status) | State::Reaped(status) => status.describe(),
		_ => "terminated".to_string(),
	};
	format!("Background process {} terminated. ({})", job.pid, what)
}

/// Exclusive access to the tracking state with child notifications held off.
pub struct Blocked<'a> {
	tracking: MutexGuard<'a, Tracking>,
	_signals: ChildSignalBlock,
}

impl<'a> Blocked<'a> {
	pub fn register(&mut self, pid: Pid, classification: Classification) {
		self.tracking.register(Job::new(pid, classification));
	}

	/// Adds `pid` to the set that [`Blocked::wait_foreground_all`] waits for.
	pub fn register_foreground(&mut self, pid: Pid) {
		self.register(pid, Classification::Foreground);
	}

	pub fn register_background(&mut self, pid: Pid) {
		self.register(pid, Classification::Background);
	}

	/// Reaps every child that has already terminated, without blocking.
	pub fn reap_terminated(&mut self) -> Result<(), ResourceError> {
		signals::take_child_pending();
		loop {
			match wait::waitpid(None, Some(WaitPidFlag::WNOHANG)) {
				Ok(WaitStatus::StillAlive) | Err(Errno::ECHILD) => return Ok(()),
				Ok(status) => { self.tracking.record(status); },
				Err(Errno::EINTR) => continue,
				Err(e) => return Err(resource("waitpid")(e)),
			}
		}
	}

	/// Like [`Blocked::reap_terminated`], but only if a SIGCHLD arrived since the last reap.
	pub fn reap_if_notified(&mut self) -> Result<(), ResourceError> {
		if signals::take_child_pending() {
			self.reap_terminated()?;
		}
		Ok(())
	}

	/// Blocks until every foreground child registered in this table has been reaped.
	pub fn wait_foreground_all(&mut self) -> Result<(), ResourceError> {
		while self.tracking.has_foreground() {
			match wait::waitpid(None, None) {
				Ok(status) => { self.tracking.record(status); },
				Err(Errno::EINTR) => continue,
				Err(e) => return Err(resource("waitpid")(e)),
			}
		}
		Ok(())
	}

	pub fn take_completed(&mut self) -> Vec<Job> {
		self.tracking.take_completed()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use nix::sys::signal::Signal;

	fn pid(n: i32) -> Pid {
		Pid::from_raw(n)
	}

	#[test]
	fn foreground_reap_clears_wait_set() {
		let mut t = Tracking::default();
		t.register(Job::new(pid(10), Classification::Foreground));
		t.register(Job::new(pid(11), Classification::Foreground));
		assert!(t.has_foreground());
		let done = t.record(WaitStatus::Exited(pid(11), 0)).unwrap();
		assert_eq!(done.state, State::Reaped(WaitStatus::Exited(pid(11), 0)));
		assert!(t.has_foreground());
		let killed = WaitStatus::Signaled(pid(10), Signal::SIGPIPE, false);
		assert_eq!(t.record(killed).map(|j| j.state), Some(State::Reaped(killed)));
		assert!(!t.has_foreground());
		assert!(t.take_completed().is_empty());
	}

	#[test]
	fn stray_pid_goes_to_completed_list() {
		let mut t = Tracking::default();
		t.register(Job::new(pid(10), Classification::Foreground));
		assert!(t.record(WaitStatus::Exited(pid(42), 3)).is_none());
		assert!(t.has_foreground());
		let done = t.take_completed();
		assert_eq!(done.len(), 1);
		assert_eq!(done[0].pid, pid(42));
		assert_eq!(done[0].classification, Classification::Background);
		assert_eq!(done[0].state, State::Reaped(WaitStatus::Exited(pid(42), 3)));
	}

	#[test]
	fn background_completion_is_reported_once() {
		let mut t = Tracking::default();
		t.register(Job::new(pid(20), Classification::Background));
		assert!(!t.has_foreground());
		t.record(WaitStatus::Exited(pid(20), 0));
		assert!(t.running.is_empty());
		assert_eq!(t.take_completed().len(), 1);
		assert!(t.take_completed().is_empty());
	}

	#[test]
	fn still_alive_is_ignored() {
		let mut t = Tracking::default();
		assert!(t.record(WaitStatus::StillAlive).is_none());
		assert!(t.completed.is_empty());
	}

	#[test]
	fn completion_messages() {
		let mut job = Job::new(pid(7), Classification::Background);
		job.state = State::Terminated(WaitStatus::Exited(pid(7), 2));
		assert_eq!(completion_message(&job), "Background process 7 terminated. (exited with status 2)");
		job.state = State::Terminated(WaitStatus::Signaled(pid(7), Signal::SIGKILL, false));
		assert_eq!(completion_message(&job), "Background process 7 terminated. (killed by signal 9)");
	}
}
