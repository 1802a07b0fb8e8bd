//! Signal dispositions of the shell process.
//!
//! The shell ignores SIGINT so that a terminal interrupt only reaches the foreground
//! children, and installs a SIGCHLD handler that does nothing but raise a flag. Reaping
//! itself happens at safe points in the main thread (see `job`).

use std::sync::atomic::{AtomicBool, Ordering};

use libc::c_int;
use nix::sys::signal::{self, SaFlags, SigAction, SigHandler, SigSet, SigmaskHow, Signal};

use crate::error::{resource, ResourceError};

static CHILD_PENDING: AtomicBool = AtomicBool::new(false);

extern "C" fn note_child(_: c_int) {
	CHILD_PENDING.store(true, Ordering::SeqCst);
}

/// Clears and returns the "a child changed state" flag.
pub fn take_child_pending() -> bool {
	CHILD_PENDING.swap(false, Ordering::SeqCst)
}

fn child_set() -> SigSet {
	let mut set = SigSet::empty();
	set.add(Signal::SIGCHLD);
	set
}

/// Dispositions that were in effect before the shell installed its own.
/// Children get these back before exec.
pub struct Dispositions {
	sigint: SigAction,
	sigchld: SigAction,
}

fn default_action() -> SigAction {
	SigAction::new(SigHandler::SigDfl, SaFlags::empty(), SigSet::empty())
}

impl Dispositions {
	pub fn install() -> Result<Dispositions, ResourceError> {
		let ignore = SigAction::new(SigHandler::SigIgn, SaFlags::empty(), SigSet::empty());
		let notify = SigAction::new(
			SigHandler::Handler(note_child),
			SaFlags::SA_NOCLDSTOP | SaFlags::SA_RESTART,
			SigSet::empty(),
		);
		// note_child only touches an atomic.
		let sigint = unsafe { signal::sigaction(Signal::SIGINT, &ignore) }.map_err(resource("sigaction"))?;
		let sigchld = unsafe { signal::sigaction(Signal::SIGCHLD, &notify) }.map_err(resource("sigaction"))?;
		Ok(Dispositions { sigint, sigchld })
	}

	/// Puts the saved dispositions back and unblocks SIGCHLD. Meant for a freshly forked child.
	pub fn restore(&self) -> nix::Result<()> {
		unsafe {
			signal::sigaction(Signal::SIGINT, &self.sigint)?;
			signal::sigaction(Signal::SIGCHLD, &self.sigchld)?;
			// The Rust runtime ignores SIGPIPE before main runs; programs expect the default.
			signal::sigaction(Signal::SIGPIPE, &default_action())?;
		}
		child_set().thread_unblock()
	}
}

/// Blocks SIGCHLD on the current thread until dropped, then restores the previous mask.
#[derive(Debug)]
pub struct ChildSignalBlock {
	previous: SigSet,
}

impl ChildSignalBlock {
	pub fn new() -> Result<ChildSignalBlock, ResourceError> {
		let mut previous = SigSet::empty();
		signal::pthread_sigmask(SigmaskHow::SIG_BLOCK, Some(&child_set()), Some(&mut previous))
			.map_err(resource("sigprocmask"))?;
		Ok(ChildSignalBlock { previous })
	}
}

impl Drop for ChildSignalBlock {
	fn drop(&mut self) {
		let _ = self.previous.thread_set_mask();
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn block_scope_restores_previous_mask() {
		let before = SigSet::thread_get_mask().unwrap();
		{
			let _outer = ChildSignalBlock::new().unwrap();
			assert!(SigSet::thread_get_mask().unwrap().contains(Signal::SIGCHLD));
			{
				let _inner = ChildSignalBlock::new().unwrap();
			}
			assert!(SigSet::thread_get_mask().unwrap().contains(Signal::SIGCHLD));
		}
		assert_eq!(
			SigSet::thread_get_mask().unwrap().contains(Signal::SIGCHLD),
			before.contains(Signal::SIGCHLD),
		);
	}
}
