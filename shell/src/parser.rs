use crate::error::StructuralError;
use crate::types::*;

type ParseResult<T> = Result<T, StructuralError>;

fn error<T>(msg: impl Into<String>) -> ParseResult<T> {
	Err(StructuralError::Parse(msg.into()))
}

struct Parser<'a> {
	line: &'a [u8],
	i: usize,
}

impl<'a> Parser<'a> {
	fn proceed_while<F>(&mut self, f: F) where F: Fn(u8) -> bool {
		while let Some(c) = self.line.get(self.i) {
			if !f(*c) { break; }
			self.i += 1;
		}
	}

	fn is_whitespace(c: u8) -> bool {
		matches!(c, b' ' | b'\t' | b'\r' | b'\n')
	}

	fn is_letter(c: u8) -> bool {
		match c {
			b'>' | b'<' | b'&' | b'|' | b';' => false,
			_ => !Parser::is_whitespace(c),
		}
	}

	fn skip_whitespaces(&mut self) {
		self.proceed_while(Parser::is_whitespace);
	}

	fn read_word(&mut self) -> &'a [u8] {
		let orig = self.i;
		self.proceed_while(Parser::is_letter);
		&self.line[orig .. self.i]
	}

	fn parse_redirect(&mut self) -> ParseResult<Option<Redirect<'a>>> {
		let typ = match self.line.get(self.i) {
			Some(&b'<') => {
				self.i += 1;
				RedirectType::Input
			},
			Some(&b'>') => if self.line.get(self.i+1) == Some(&b'>') {
				self.i += 2;
				RedirectType::Append
			} else {
				self.i += 1;
				RedirectType::Output
			},
			_ => {
				return Ok(None);
			},
		};

		self.skip_whitespaces();
		let target = self.read_word();
		if target.is_empty() {
			return error("empty redirect");
		}

		Ok(Some(Redirect { target, typ }))
	}

	/// Returns `None` for a slot with neither words nor redirections.
	fn parse_command(&mut self) -> ParseResult<Option<Command<'a>>> {
		let mut redirects: Vec<Redirect<'a>> = vec![];
		let mut argv: Vec<&'a [u8]> = vec![];

		loop {
			self.skip_whitespaces();
			if let Some(redirect) = self.parse_redirect()? {
				redirects.push(redirect);
				continue;
			}
			let word = self.read_word();
			if word.is_empty() {
				break;
			}
			argv.push(word);
		}

		if argv.is_empty() {
			if redirects.is_empty() {
				return Ok(None);
			}
			return error("redirection without command");
		}
		Ok(Some(Command { argv, redirects }))
	}

	/// Parses one pipeline and reports whether a separator followed it.
	fn parse_pipeline(&mut self) -> ParseResult<(ParsedPipeline<'a>, bool)> {
		let mut commands: Vec<Option<Command<'a>>> = vec![];
		let mut is_background = false;

		let more = loop {
			commands.push(self.parse_command()?);
			self.skip_whitespaces();
			match self.line.get(self.i) {
				Some(&b'|') => { self.i += 1; },
				Some(&b'&') => {
					self.i += 1;
					is_background = true;
					break true;
				},
				Some(&b';') => {
					self.i += 1;
					break true;
				},
				Some(&c) => { return error(format!("unknown command separator: '{}'", c as char)); },
				None => { break false; },
			}
		};
		Ok((ParsedPipeline { commands, is_background }, more))
	}

	fn parse_line(&mut self) -> ParseResult<Line<'a>> {
		let mut pipelines = vec![];
		loop {
			let (pipeline, more) = self.parse_pipeline()?;
			pipelines.push(pipeline);
			if !more { break; }
		}
		Ok(Line { pipelines })
	}
}

pub fn parse(line: &[u8]) -> ParseResult<Line<'_>> {
	let mut parser = Parser { line, i: 0 };
	parser.parse_line()
}

#[cfg(test)]
mod tests {
	use super::*;

	fn command<'a>(argv: &[&'a [u8]]) -> Option<Command<'a>> {
		Some(Command { argv: argv.to_vec(), redirects: vec![] })
	}

	#[test]
	fn pipeline_with_arguments() {
		let line = parse(b"ls -l | wc -l\n").unwrap();
		assert_eq!(line.pipelines, vec![ParsedPipeline {
			commands: vec![command(&[b"ls", b"-l"]), command(&[b"wc", b"-l"])],
			is_background: false,
		}]);
	}

	#[test]
	fn redirects_keep_their_order() {
		let line = parse(b"cat <in >a >>b x").unwrap();
		let cmd = line.pipelines[0].commands[0].clone().unwrap();
		assert_eq!(cmd.argv, vec![&b"cat"[..], &b"x"[..]]);
		assert_eq!(cmd.redirects, vec![
			Redirect { target: b"in", typ: RedirectType::Input },
			Redirect { target: b"a", typ: RedirectType::Output },
			Redirect { target: b"b", typ: RedirectType::Append },
		]);
	}

	#[test]
	fn empty_slots_are_kept() {
		let line = parse(b"true ; ; false").unwrap();
		assert_eq!(line.pipelines.len(), 3);
		assert_eq!(line.pipelines[1].commands, vec![None]);

		let line = parse(b"a | | b").unwrap();
		assert_eq!(line.pipelines[0].commands, vec![command(&[b"a"]), None, command(&[b"b"])]);
	}

	#[test]
	fn ampersand_separates_background_pipeline() {
		let line = parse(b"sleep 5 & echo hi").unwrap();
		assert!(line.pipelines[0].is_background);
		assert!(!line.pipelines[1].is_background);
		assert_eq!(line.pipelines[1].commands, vec![command(&[b"echo", b"hi"])]);
	}

	#[test]
	fn empty_line_is_one_empty_pipeline() {
		let line = parse(b"\n").unwrap();
		assert_eq!(line.pipelines, vec![ParsedPipeline { commands: vec![None], is_background: false }]);
	}

	#[test]
	fn malformed_redirects() {
		assert!(parse(b"cat >").is_err());
		assert!(parse(b"> out").is_err());
		assert!(parse(b"cat < | wc").is_err());
	}
}
