//! dcx: a stack-based calculator language in the tradition of Unix dc, with exact rational arithmetic.
//!
//! Programs are evaluated with [`exec`] (or [`exec_str`], [`exec_file`]) against a [`State`] that persists
//! between calls, so a REPL or a sequence of files share one stack and one set of registers.

use std::collections::HashMap;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Write};
use std::path::Path;
use log::{debug, trace};
#[macro_use]
extern crate lazy_static;

pub mod errors;
pub mod num;
pub mod scan;
pub mod structs;
mod cmds;

use errors::Fault;
use scan::{Scanner, Token};
use structs::{Datum, Stack};

///deepest allowed macro nesting
pub const MAX_DEPTH: usize = 1000;

///largest accepted array index
pub const MAX_INDEX: usize = (1 << 20) - 1;

///largest accepted output precision
pub const MAX_PRECISION: u32 = 1 << 16;

///Bundled state storage for one instance of dcx
pub struct State {
	///main stack
	mstk: Stack,
	///registers, created on first write
	regs: HashMap<char, Stack>,
	///output precision K
	prec: u32,
	///current macro nesting
	depth: usize,
	///pending levels to unwind (q, Q)
	target: usize,
	///OS interaction disabled
	safe: bool,
	///prefix of diagnostics
	name: String,
}
impl Default for State {
	///Empty stack, no registers, precision 0, OS commands enabled, named "dcx".
	fn default() -> Self {
		Self {
			mstk: Stack::new(),
			regs: HashMap::new(),
			prec: 0,
			depth: 0,
			target: 0,
			safe: false,
			name: String::from("dcx"),
		}
	}
}
impl State {
	///custom initial precision, cleaner than exec, capped at [`MAX_PRECISION`]
	pub fn custom_precision(mut self, prec: u32) -> Self {
		self.prec = prec.min(MAX_PRECISION);
		self
	}
	///custom program name for diagnostics
	pub fn custom_name(mut self, name: impl Into<String>) -> Self {
		self.name = name.into();
		self
	}
	///disable the shell escape
	pub fn safe(mut self, safe: bool) -> Self {
		self.safe = safe;
		self
	}

	pub fn stack(&self) -> &Stack {&self.mstk}
	pub fn register(&self, name: char) -> Option<&Stack> {self.regs.get(&name)}
	pub fn precision(&self) -> u32 {self.prec}
	pub fn depth(&self) -> usize {self.depth}

	///register for writing, created if missing
	pub(crate) fn reg_mut(&mut self, name: char) -> &mut Stack {
		self.regs.entry(name).or_default()
	}
}

///Bundle of generic IO streams, for brevity.
pub struct IOTriple<'a> {
	pub input: &'a mut dyn BufRead,
	pub output: &'a mut dyn Write,
	pub error: &'a mut dyn Write
}
#[macro_export]
///Default IO triple using stdin, stdout, stderr
macro_rules! stdio {
	() => {
		::dcx::IOTriple {
			input: &mut ::std::io::BufReader::new(::std::io::stdin()),
			output: &mut ::std::io::stdout(),
			error: &mut ::std::io::stderr()
		}
	}
}

///How a top-level evaluation ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Status {
	///input exhausted, more programs may follow
	Finished,
	///`q` unwound past the top level, the caller should stop
	Quit
}

///Evaluates a whole program from `src` on the given state.
///
///Usage of the provided IO streams:
///- input: Read by the command `?` one line at a time.
///- output: Printing by the commands `pnfP`.
///- error: Diagnostics (`name[line:col]: message`) and the command `e`.
///
///Faults in single commands are reported and evaluation continues with the next token.
///Terminates with `Err` only if reading the program or an IO stream fails.
pub fn exec(st: &mut State, io: &mut IOTriple, src: &mut dyn BufRead) -> io::Result<Status> {
	let mut sc = Scanner::new(src, st.depth);
	if run(st, io, &mut sc)? {
		st.target = 0;
		debug!("quit at top level");
		Ok(Status::Quit)
	}
	else {Ok(Status::Finished)}
}

///[`exec`] on a string
pub fn exec_str(st: &mut State, io: &mut IOTriple, src: &str) -> io::Result<Status> {
	exec(st, io, &mut src.as_bytes())
}

///[`exec`] on the contents of a file
pub fn exec_file(st: &mut State, io: &mut IOTriple, path: &Path) -> io::Result<Status> {
	debug!("evaluating file {}", path.display());
	exec(st, io, &mut BufReader::new(File::open(path)?))
}

///Scanning loop shared by top level and macros. Returns whether it was cut short by a quit request.
fn run(st: &mut State, io: &mut IOTriple, sc: &mut Scanner) -> io::Result<bool> {
	loop {
		if st.target > 0 {
			st.target -= 1;
			return Ok(true);
		}
		match step(st, io, sc) {
			Ok(true) => {},
			Ok(false) => return Ok(false),
			Err(Fault::Io(e)) => return Err(e),
			Err(f) => {
				writeln!(io.error, "{}[{}:{}]: {f}", st.name, sc.line(), sc.col())?;
			}
		}
	}
}

///one token, false at end of input
fn step(st: &mut State, io: &mut IOTriple, sc: &mut Scanner) -> Result<bool, Fault> {
	match sc.token()? {
		Token::End => return Ok(false),
		Token::Num(n) => st.mstk.push(Datum::Num(n)),
		Token::Str(s) => st.mstk.push(Datum::Str(s)),
		Token::Cmd(c) => {
			trace!("'{c}' at depth {}", sc.depth());
			let cmd = cmds::CMDS.get(&c).ok_or(Fault::UnimplementedCommand(c))?;
			(cmd.0)(st, io, sc)?;
		}
	}
	Ok(true)
}

///Evaluates `body` one macro level deeper on the shared state.
pub(crate) fn run_macro(st: &mut State, io: &mut IOTriple, body: &str) -> Result<(), Fault> {
	check_depth(st)?;
	st.depth += 1;
	let depth = st.depth;
	debug!("enter macro at depth {depth}");
	let mut src = body.as_bytes();
	let res = run(st, io, &mut Scanner::new(&mut src, depth));
	debug!("leave macro at depth {depth}");
	st.depth = depth - 1;
	res?;
	Ok(())
}

///fails if another macro level would exceed [`MAX_DEPTH`]
pub(crate) fn check_depth(st: &State) -> Result<(), Fault> {
	if st.depth >= MAX_DEPTH {Err(Fault::RecursionLimit)} else {Ok(())}
}
