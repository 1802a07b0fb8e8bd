use std::fs::File;
use std::io::{self, BufRead, BufReader, IsTerminal, Read};
use std::os::fd::{AsFd, OwnedFd};

#[derive(Debug, PartialEq, Eq)]
pub enum Input {
	Line(Vec<u8>),
	/// The line was too long. It has been read up to its newline and thrown away.
	Malformed,
	Eof,
}

/// Reads newline-terminated lines of at most `max_len` bytes (newline not counted).
pub struct LineReader<R> {
	inner: R,
	max_len: usize,
}

impl<R: BufRead> LineReader<R> {
	pub fn new(inner: R, max_len: usize) -> LineReader<R> {
		LineReader { inner, max_len }
	}

	pub fn next_line(&mut self) -> io::Result<Input> {
		let mut line = vec![];
		let limit = self.max_len as u64 + 1;
		let n = self.inner.by_ref().take(limit).read_until(b'\n', &mut line)?;
		if n == 0 {
			return Ok(Input::Eof);
		}
		if line.last() != Some(&b'\n') && n as u64 == limit {
			self.discard_line()?;
			return Ok(Input::Malformed);
		}
		Ok(Input::Line(line))
	}

	fn discard_line(&mut self) -> io::Result<()> {
		loop {
			let buf = self.inner.fill_buf()?;
			if buf.is_empty() {
				return Ok(());
			}
			match buf.iter().position(|&c| c == b'\n') {
				Some(i) => {
					self.inner.consume(i + 1);
					return Ok(());
				},
				None => {
					let len = buf.len();
					self.inner.consume(len);
				},
			}
		}
	}
}

/// A reader over `fd` that never takes more than one byte at a time, so whatever follows
/// the current line is still there for the next process that reads the descriptor.
pub fn unbuffered(fd: OwnedFd) -> BufReader<File> {
	BufReader::with_capacity(1, File::from(fd))
}

/// The shell's command source. A terminal hands over one line per read anyway and keeps
/// std's buffered handle; anything else shares its bytes with the children that inherit
/// stdin and is read unbuffered.
pub fn stdin_source() -> io::Result<Box<dyn BufRead>> {
	let stdin = io::stdin();
	if stdin.is_terminal() {
		return Ok(Box::new(stdin.lock()));
	}
	let fd = stdin.as_fd().try_clone_to_owned()?;
	Ok(Box::new(unbuffered(fd)))
}
