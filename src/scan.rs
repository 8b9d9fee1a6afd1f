//! Program reader: turns a byte stream into literals and command characters.

use std::io::{self, BufRead};
use crate::errors::Fault;
use crate::num::Number;

///One lexical unit of program text.
#[derive(Debug, PartialEq, Eq)]
pub enum Token {
	Num(Number),
	Str(String),
	Cmd(char),
	End
}

///Line-buffered char reader with one char of pushback.
///
///Lines are 1-based, columns count the chars read on the current line (0 right after a newline).
pub struct Scanner<'a> {
	src: &'a mut dyn BufRead,
	buf: Vec<char>,
	pos: usize,
	line: usize,
	col: usize,
	last_col: usize,
	depth: usize,
	backed: bool,
}

impl<'a> Scanner<'a> {
	///`depth` is the macro nesting level this source is evaluated at
	pub fn new(src: &'a mut dyn BufRead, depth: usize) -> Self {
		Self {src, buf: Vec::new(), pos: 0, line: 1, col: 0, last_col: 0, depth, backed: false}
	}

	pub fn line(&self) -> usize {self.line}
	pub fn col(&self) -> usize {self.col}
	pub fn depth(&self) -> usize {self.depth}

	///next char, `None` at end of input
	pub fn next_char(&mut self) -> io::Result<Option<char>> {
		if self.pos >= self.buf.len() {
			let line = read_lossy(self.src)?;
			if line.is_empty() {
				return Ok(None);
			}
			self.buf = line.chars().collect();
			self.pos = 0;
		}
		let ch = self.buf[self.pos];
		self.pos += 1;
		self.backed = false;
		if ch == '\n' {
			self.last_col = self.col;
			self.line += 1;
			self.col = 0;
		}
		else {self.col += 1;}
		Ok(Some(ch))
	}

	///Un-reads the last char. Only valid once after each successful [`Scanner::next_char`].
	pub fn back(&mut self) {
		debug_assert!(!self.backed, "two pushbacks without a read in between");
		if self.pos == 0 {return;}
		self.pos -= 1;
		self.backed = true;
		if self.buf[self.pos] == '\n' {
			self.line -= 1;
			self.col = self.last_col;
		}
		else {self.col -= 1;}
	}

	///rest of the current line verbatim, including the newline if there is one
	pub fn finish_line(&mut self) -> io::Result<String> {
		let mut line = String::new();
		while let Some(ch) = self.next_char()? {
			line.push(ch);
			if ch == '\n' {break;}
		}
		Ok(line)
	}

	///Next token, skipping whitespace.
	pub fn token(&mut self) -> Result<Token, Fault> {
		loop {
			return match self.next_char()? {
				None => Ok(Token::End),
				Some(ch) if ch.is_whitespace() => continue,
				Some(ch) if is_numeric(ch) => self.number(ch),
				Some('[') => self.string(),
				Some(ch) => Ok(Token::Cmd(ch)),
			};
		}
	}

	///Maximal munch: digits and at most one '.', '_' only as a leading sign.
	fn number(&mut self, first: char) -> Result<Token, Fault> {
		let mut text = String::new();
		let mut dot = first == '.';
		text.push(if first == '_' {'-'} else {first});
		while let Some(ch) = self.next_char()? {
			match ch {
				'.' if !dot => {dot = true;}
				'0'..='9' => {}
				_ => {	//second '.', inner '_' or anything else ends the literal
					self.back();
					break;
				}
			}
			text.push(ch);
		}
		Number::parse(&text).map(Token::Num)
	}

	///Bracketed string with nesting, an unterminated one ends at end of input.
	fn string(&mut self) -> Result<Token, Fault> {
		let mut res = String::new();
		let mut nest: usize = 1;
		while let Some(ch) = self.next_char()? {
			match ch {
				'[' => {nest += 1;}
				']' => {
					nest -= 1;
					if nest == 0 {break;}
				}
				_ => {}
			}
			res.push(ch);
		}
		Ok(Token::Str(res))
	}
}

///One line including its newline, empty at end of input. Invalid UTF-8 becomes U+FFFD.
pub fn read_lossy(src: &mut dyn BufRead) -> io::Result<String> {
	let mut bytes = Vec::new();
	src.read_until(b'\n', &mut bytes)?;
	Ok(String::from_utf8_lossy(&bytes).into_owned())
}

fn is_numeric(ch: char) -> bool {
	ch.is_ascii_digit() || ch == '.' || ch == '_'
}
