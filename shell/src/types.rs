#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum RedirectType { Input, Output, Append }

#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Redirect<'a> {
	pub target: &'a [u8],
	pub typ: RedirectType,
}

/// One external or builtin command. `argv[0]` is the program name and is always present.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Command<'a> {
	pub argv: Vec<&'a [u8]>,
	pub redirects: Vec<Redirect<'a>>,
}

impl<'a> Command<'a> {
	pub fn name(&self) -> &'a [u8] {
		self.argv[0]
	}
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Classification { Foreground, Background }

#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Pipeline<'a> {
	pub commands: Vec<Command<'a>>,
	pub is_background: bool,
}

impl<'a> Pipeline<'a> {
	pub fn classification(&self) -> Classification {
		if self.is_background { Classification::Background } else { Classification::Foreground }
	}
}

/// A pipeline as written; `None` marks a command slot with nothing in it.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct ParsedPipeline<'a> {
	pub commands: Vec<Option<Command<'a>>>,
	pub is_background: bool,
}

#[derive(Debug, PartialEq, Eq, Clone, Default)]
pub struct Line<'a> {
	pub pipelines: Vec<ParsedPipeline<'a>>,
}
