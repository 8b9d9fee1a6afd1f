//! Command table and command implementations.
//!
//! Every command either commits completely or leaves the stack as it found it: operands are
//! borrowed and validated with [`Stack::numbers`] before anything is popped.

use std::cmp::Ordering;
use std::io::Write;
use std::process::Command;
use log::debug;
use phf::phf_map;
use crate::{State, IOTriple, MAX_INDEX, MAX_PRECISION, check_depth, run_macro};
use crate::errors::Fault;
use crate::num::Number;
use crate::scan::{self, Scanner};
use crate::structs::{Datum::{self, *}, Stack};

type Res = Result<(), Fault>;

///command implementation, gets the scanner it was read from for trailing arguments
pub(crate) struct Cmd(pub(crate) fn(&mut State, &mut IOTriple<'_>, &mut Scanner<'_>) -> Res);

///all implemented commands, anything else is reported as unimplemented
pub(crate) static CMDS: phf::Map<char, Cmd> = phf_map! {
	//control
	'q' => Cmd(quit),
	'Q' => Cmd(quit_levels),
	//stack
	'c' => Cmd(clear),
	'd' => Cmd(dup),
	'r' => Cmd(swap),
	'z' => Cmd(depth),
	//parameters
	'k' => Cmd(set_k),
	'K' => Cmd(get_k),
	//registers
	'l' => Cmd(load),
	'L' => Cmd(pop_reg),
	's' => Cmd(store),
	'S' => Cmd(push_reg),
	':' => Cmd(array_store),
	';' => Cmd(array_load),
	//arithmetic
	'+' => Cmd(add),
	'-' => Cmd(sub),
	'*' => Cmd(mul),
	'/' => Cmd(div),
	'%' => Cmd(rem),
	'~' => Cmd(divmod),
	'^' => Cmd(pow),
	'|' => Cmd(modexp),
	'v' => Cmd(sqrt),
	//strings and macros
	'a' => Cmd(to_char),
	'x' => Cmd(execute),
	'>' => Cmd(greater),
	'<' => Cmd(less),
	'=' => Cmd(equal),
	'!' => Cmd(bang),
	'?' => Cmd(prompt),
	//printing
	'n' => Cmd(print_pop),
	'p' => Cmd(print_top),
	'e' => Cmd(print_err),
	'f' => Cmd(print_stack),
	'P' => Cmd(print_raw),
	//misc
	'Z' => Cmd(length),
	'X' => Cmd(frac_digits),
	'#' => Cmd(comment),
};

/*--------------
	HELPERS
--------------*/
///binary operation on the top two numbers, second-from-top is the left operand
fn arith(st: &mut State, op: impl FnOnce(&Number, &Number) -> Result<Number, Fault>) -> Res {
	let [a, b] = st.mstk.numbers()?;
	let res = op(a, b)?;
	st.mstk.replace(2, [Num(res)]);
	Ok(())
}

///array index, an integer from 0 to [`MAX_INDEX`]
fn index(n: &Number) -> Result<usize, Fault> {
	if n.is_negative() || !n.is_integer() {return Err(Fault::InvalidIndex);}
	n.trunc().to_usize().filter(|&i| i <= MAX_INDEX).ok_or(Fault::InvalidIndex)
}

///register name following the command, `None` at end of input
fn reg_name(sc: &mut Scanner) -> Result<Option<char>, Fault> {
	Ok(sc.next_char()?)
}

///run the top of register `name` as a macro, non-strings are ignored
fn exec_register(st: &mut State, io: &mut IOTriple, name: char) -> Res {
	let body = match st.regs.get(&name).map(Stack::peek) {
		Some(Ok(Str(s))) => s.clone(),
		Some(Ok(Num(_))) => return Ok(()),
		_ => return Err(Fault::UnknownRegister(name)),
	};
	run_macro(st, io, &body)
}

///Compare top against second-from-top, run register on `want` (or anything else if `negate`).
fn conditional(st: &mut State, io: &mut IOTriple, sc: &mut Scanner, want: Ordering, negate: bool) -> Res {
	let Some(name) = reg_name(sc)? else {return Ok(())};
	let [second, top] = st.mstk.numbers()?;
	let hit = (top.cmp(second) == want) != negate;
	if hit {check_depth(st)?;}
	st.mstk.discard(2);
	if hit {exec_register(st, io, name)} else {Ok(())}
}

/*--------------
	CONTROL
--------------*/
fn quit(st: &mut State, _: &mut IOTriple, _: &mut Scanner) -> Res {
	debug!("quit requested at depth {}", st.depth);
	st.target = 2;	//this level and the caller
	Ok(())
}

fn quit_levels(st: &mut State, _: &mut IOTriple, _: &mut Scanner) -> Res {
	let [n] = st.mstk.numbers()?;
	if n.is_negative() {return Err(Fault::InvalidCount);}
	let n = n.trunc().to_usize().unwrap_or(usize::MAX);
	let levels = if n > st.depth {st.depth.saturating_sub(1)} else {n};
	st.mstk.discard(1);
	debug!("unwinding {levels} of {} levels", st.depth);
	st.target = levels;
	Ok(())
}

/*------------
	STACK
------------*/
fn clear(st: &mut State, _: &mut IOTriple, _: &mut Scanner) -> Res {
	st.mstk.clear();
	Ok(())
}

fn dup(st: &mut State, _: &mut IOTriple, _: &mut Scanner) -> Res {
	let copy = st.mstk.peek()?.clone();
	st.mstk.push(copy);
	Ok(())
}

fn swap(st: &mut State, _: &mut IOTriple, _: &mut Scanner) -> Res {
	st.mstk.swap()
}

fn depth(st: &mut State, _: &mut IOTriple, _: &mut Scanner) -> Res {
	st.mstk.push(Num(Number::from(st.mstk.len())));
	Ok(())
}

/*-----------------
	PARAMETERS
-----------------*/
fn set_k(st: &mut State, _: &mut IOTriple, _: &mut Scanner) -> Res {
	let [n] = st.mstk.numbers()?;
	if !n.is_integer() {return Err(Fault::InvalidPrecision);}
	st.prec = n.trunc().to_u32().filter(|&k| k <= MAX_PRECISION).ok_or(Fault::InvalidPrecision)?;
	st.mstk.discard(1);
	Ok(())
}

fn get_k(st: &mut State, _: &mut IOTriple, _: &mut Scanner) -> Res {
	st.mstk.push(Num(Number::from(st.prec)));
	Ok(())
}

/*----------------
	REGISTERS
----------------*/
fn load(st: &mut State, _: &mut IOTriple, sc: &mut Scanner) -> Res {
	let Some(name) = reg_name(sc)? else {return Ok(())};
	let top = st.regs.get(&name)
		.and_then(|r| r.peek().ok())
		.ok_or(Fault::UnknownRegister(name))?
		.clone();
	st.mstk.push(top);
	Ok(())
}

fn pop_reg(st: &mut State, _: &mut IOTriple, sc: &mut Scanner) -> Res {
	let Some(name) = reg_name(sc)? else {return Ok(())};
	let top = st.regs.get_mut(&name)
		.and_then(|r| r.pop().ok())
		.ok_or(Fault::UnknownRegister(name))?;
	st.mstk.push(top);
	Ok(())
}

fn store(st: &mut State, _: &mut IOTriple, sc: &mut Scanner) -> Res {
	let Some(name) = reg_name(sc)? else {return Ok(())};
	let d = st.mstk.pop()?;
	st.reg_mut(name).set(d);
	Ok(())
}

fn push_reg(st: &mut State, _: &mut IOTriple, sc: &mut Scanner) -> Res {
	let Some(name) = reg_name(sc)? else {return Ok(())};
	let d = st.mstk.pop()?;
	st.reg_mut(name).push(d);
	Ok(())
}

fn array_store(st: &mut State, _: &mut IOTriple, sc: &mut Scanner) -> Res {
	let Some(name) = reg_name(sc)? else {return Ok(())};
	if st.mstk.len() < 2 {return Err(Fault::NotEnoughStack(2));}
	let [idx] = st.mstk.numbers()?;
	let i = index(idx)?;
	st.mstk.discard(1);
	let value = st.mstk.pop()?;
	st.reg_mut(name).array_set(i, value)
}

fn array_load(st: &mut State, _: &mut IOTriple, sc: &mut Scanner) -> Res {
	let Some(name) = reg_name(sc)? else {return Ok(())};
	let [idx] = st.mstk.numbers()?;
	let i = index(idx)?;
	let value = st.regs.get(&name).map_or_else(Datum::zero, |r| r.array_get(i));
	st.mstk.replace(1, [value]);
	Ok(())
}

/*-----------------
	ARITHMETIC
-----------------*/
fn add(st: &mut State, _: &mut IOTriple, _: &mut Scanner) -> Res {
	arith(st, |a, b| Ok(a.add(b)))
}

fn sub(st: &mut State, _: &mut IOTriple, _: &mut Scanner) -> Res {
	arith(st, |a, b| Ok(a.sub(b)))
}

fn mul(st: &mut State, _: &mut IOTriple, _: &mut Scanner) -> Res {
	arith(st, |a, b| Ok(a.mul(b)))
}

fn div(st: &mut State, _: &mut IOTriple, _: &mut Scanner) -> Res {
	arith(st, Number::div)
}

fn rem(st: &mut State, _: &mut IOTriple, _: &mut Scanner) -> Res {
	arith(st, Number::rem)
}

fn pow(st: &mut State, _: &mut IOTriple, _: &mut Scanner) -> Res {
	arith(st, Number::pow)
}

//quotient, then remainder on top
fn divmod(st: &mut State, _: &mut IOTriple, _: &mut Scanner) -> Res {
	let [a, b] = st.mstk.numbers()?;
	let quot = a.div_trunc(b)?;
	let rem = a.rem(b)?;
	st.mstk.replace(2, [Num(quot), Num(rem)]);
	Ok(())
}

//base exponent modulus |
fn modexp(st: &mut State, _: &mut IOTriple, _: &mut Scanner) -> Res {
	let [a, b, c] = st.mstk.numbers()?;
	let modulus = c.trunc();
	if modulus == 0 {return Err(Fault::DivisionByZero);}
	let res = a.trunc().pow_mod(&b.trunc(), &modulus).map_err(|_| Fault::NoInverse)?;
	st.mstk.replace(3, [Num(Number::from(res))]);
	Ok(())
}

fn sqrt(st: &mut State, _: &mut IOTriple, _: &mut Scanner) -> Res {
	let [n] = st.mstk.numbers()?;
	let res = n.sqrt()?;
	st.mstk.replace(1, [Num(res)]);
	Ok(())
}

/*------------------------
	STRINGS AND MACROS
------------------------*/
//first char of a string (U+FFFD if empty), or the char with a numeric code point
fn to_char(st: &mut State, _: &mut IOTriple, _: &mut Scanner) -> Res {
	let res = match st.mstk.peek()? {
		Str(s) => s.chars().next().unwrap_or(char::REPLACEMENT_CHARACTER).to_string(),
		Num(n) => n.trunc().to_u32()
			.and_then(char::from_u32)
			.ok_or(Fault::InvalidCodePoint)?
			.to_string(),
	};
	st.mstk.replace(1, [Str(res)]);
	Ok(())
}

fn execute(st: &mut State, io: &mut IOTriple, _: &mut Scanner) -> Res {
	let body = match st.mstk.peek()? {
		Str(s) => s.clone(),
		Num(_) => return Ok(()),
	};
	check_depth(st)?;
	st.mstk.discard(1);
	run_macro(st, io, &body)
}

fn greater(st: &mut State, io: &mut IOTriple, sc: &mut Scanner) -> Res {
	conditional(st, io, sc, Ordering::Greater, false)
}

fn less(st: &mut State, io: &mut IOTriple, sc: &mut Scanner) -> Res {
	conditional(st, io, sc, Ordering::Less, false)
}

fn equal(st: &mut State, io: &mut IOTriple, sc: &mut Scanner) -> Res {
	conditional(st, io, sc, Ordering::Equal, false)
}

//negated conditional, or shell escape for the rest of the line
fn bang(st: &mut State, io: &mut IOTriple, sc: &mut Scanner) -> Res {
	match sc.next_char()? {
		None => Ok(()),
		Some('>') => conditional(st, io, sc, Ordering::Greater, true),
		Some('<') => conditional(st, io, sc, Ordering::Less, true),
		Some('=') => conditional(st, io, sc, Ordering::Equal, true),
		Some(_) => {
			sc.back();
			let line = sc.finish_line()?;
			shell(st, io, line.trim_end())
		}
	}
}

fn shell(st: &State, io: &mut IOTriple, line: &str) -> Res {
	if st.safe {return Err(Fault::Disabled('!'));}
	if line.trim().is_empty() {return Ok(());}
	io.output.flush()?;
	debug!("shell: {line}");
	let status = Command::new("sh").arg("-c").arg(line).status()
		.map_err(|e| Fault::SubprocessFailure(format!("{line}: {e}")))?;
	if status.success() {Ok(())}
	else {Err(Fault::SubprocessFailure(format!("{line}: {status}")))}
}

//read a line from input and run it
fn prompt(st: &mut State, io: &mut IOTriple, _: &mut Scanner) -> Res {
	let line = scan::read_lossy(io.input)?;
	run_macro(st, io, &line)
}

/*---------------
	PRINTING
---------------*/
fn print_pop(st: &mut State, io: &mut IOTriple, _: &mut Scanner) -> Res {
	let d = st.mstk.pop()?;
	write!(io.output, "{}", d.display(st.prec))?;
	io.output.flush()?;
	Ok(())
}

fn print_top(st: &mut State, io: &mut IOTriple, _: &mut Scanner) -> Res {
	writeln!(io.output, "{}", st.mstk.peek()?.display(st.prec))?;
	Ok(())
}

fn print_err(st: &mut State, io: &mut IOTriple, _: &mut Scanner) -> Res {
	let d = st.mstk.pop()?;
	writeln!(io.error, "{}", d.display(st.prec))?;
	Ok(())
}

fn print_stack(st: &mut State, io: &mut IOTriple, _: &mut Scanner) -> Res {
	for d in st.mstk.iter() {
		writeln!(io.output, "{}", d.display(st.prec))?;
	}
	Ok(())
}

//strings verbatim, numbers as the shortest little-endian encoding of their low 32 bits
fn print_raw(st: &mut State, io: &mut IOTriple, _: &mut Scanner) -> Res {
	match st.mstk.pop()? {
		Str(s) => write!(io.output, "{s}")?,
		Num(n) => {
			let bits = n.trunc().to_u32_wrapping();
			let size = match bits {
				0..=0xff => 1,
				0x100..=0xffff => 2,
				0x1_0000..=0xff_ffff => 3,
				_ => 4,
			};
			io.output.write_all(&bits.to_le_bytes()[..size])?;
		}
	}
	io.output.flush()?;
	Ok(())
}

/*-----------
	MISC
-----------*/
fn length(st: &mut State, _: &mut IOTriple, _: &mut Scanner) -> Res {
	let d = st.mstk.pop()?;
	st.mstk.push(Num(Number::from(d.semantic_len(st.prec))));
	Ok(())
}

fn frac_digits(st: &mut State, _: &mut IOTriple, _: &mut Scanner) -> Res {
	let digits = match st.mstk.pop()? {
		Str(_) => 0,
		Num(n) => n.frac_digits(st.prec),
	};
	st.mstk.push(Num(Number::from(digits)));
	Ok(())
}

fn comment(_: &mut State, _: &mut IOTriple, sc: &mut Scanner) -> Res {
	sc.finish_line()?;
	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;
	use pretty_assertions::assert_eq;
	use crate::exec_str;

	///state after running `src`, with output and error text
	fn eval_in(st: &mut State, src: &str) -> (String, String) {
		let mut input: &[u8] = b"";
		let (mut out, mut err) = (Vec::<u8>::new(), Vec::<u8>::new());
		exec_str(st, &mut IOTriple {input: &mut input, output: &mut out, error: &mut err}, src).unwrap();
		(String::from_utf8(out).unwrap(), String::from_utf8(err).unwrap())
	}

	fn top(st: &State) -> Datum {st.stack().peek().unwrap().clone()}

	fn num(s: &str) -> Datum {Num(Number::parse(s).unwrap())}

	#[test]
	fn every_command_char_is_mapped_once() {
		assert_eq!(CMDS.len(), 38);
		for c in "qQcdrzkKlLsS:;+-*/%~^|vax><=!?nepfPZX#".chars() {
			assert!(CMDS.contains_key(&c), "{c}");
		}
	}

	#[test]
	fn binary_ops_leave_short_stack_alone() {
		for op in ["+", "-", "*", "/", "%", "^", "~"] {
			let mut st = State::default();
			let (_, err) = eval_in(&mut st, &format!("5{op}"));
			assert!(err.contains("less than 2 values on stack"), "{op}: {err}");
			assert_eq!(st.stack().len(), 1);
			assert_eq!(top(&st), num("5"));
		}
	}

	#[test]
	fn division_by_zero_keeps_operands() {
		for op in ["/", "%", "~"] {
			let mut st = State::default();
			let (_, err) = eval_in(&mut st, &format!("7 0{op}"));
			assert!(err.contains("division by zero"), "{op}: {err}");
			assert_eq!(st.stack().iter().cloned().collect::<Vec<_>>(), vec![num("0"), num("7")]);
		}
	}

	#[test]
	fn strings_are_not_numbers() {
		let mut st = State::default();
		let (_, err) = eval_in(&mut st, "1[a]+");
		assert!(err.contains("not a number"));
		assert_eq!(st.stack().len(), 2);
	}

	#[test]
	fn divmod_and_modexp() {
		let mut st = State::default();
		eval_in(&mut st, "_17 5~");
		assert_eq!(st.stack().iter().cloned().collect::<Vec<_>>(), vec![num("-2"), num("-3")]);
		let mut st = State::default();
		eval_in(&mut st, "4 13 497|");
		assert_eq!(top(&st), num("445"));
		let mut st = State::default();
		let (_, err) = eval_in(&mut st, "2 _1 4|");
		assert!(err.contains("no inverse"));
		assert_eq!(st.stack().len(), 3);
	}

	#[test]
	fn precision_rejects_bad_values() {
		for bad in ["_1k", "1.5k", "4000000000k", "65537k"] {
			let mut st = State::default();
			let (_, err) = eval_in(&mut st, bad);
			assert!(err.contains("precision"), "{bad}");
			assert_eq!(st.precision(), 0);
			assert_eq!(st.stack().len(), 1);
		}
		let mut st = State::default();
		eval_in(&mut st, "3kK");
		assert_eq!(st.precision(), 3);
		assert_eq!(top(&st), num("3"));
		eval_in(&mut st, "65536k");
		assert_eq!(st.precision(), MAX_PRECISION);
	}

	#[test]
	fn register_stack_discipline() {
		let mut st = State::default();
		eval_in(&mut st, "1sa 2Sa 3sa");
		assert_eq!(st.register('a').unwrap().len(), 2);
		eval_in(&mut st, "la La La");
		assert_eq!(st.stack().iter().cloned().collect::<Vec<_>>(), vec![num("1"), num("3"), num("3")]);
		let (_, err) = eval_in(&mut st, "La");
		assert!(err.contains("register 'a' is empty"));
		let (_, err) = eval_in(&mut st, "lb");
		assert!(err.contains("register 'b' is empty"));
		assert!(st.register('b').is_none());
	}

	#[test]
	fn register_name_at_end_of_input_is_a_no_op() {
		let mut st = State::default();
		let (_, err) = eval_in(&mut st, "1s");
		assert_eq!(err, "");
		assert_eq!(st.stack().len(), 1);
	}

	#[test]
	fn arrays() {
		let mut st = State::default();
		eval_in(&mut st, "[x]5:a 3;a 5;a 9;b");
		assert_eq!(st.stack().iter().cloned().collect::<Vec<_>>(), vec![num("0"), Str("x".into()), num("0")]);
		assert!(st.register('b').is_none());
		assert!(st.register('a').unwrap().is_empty());

		for bad in ["_1", "1.5", "18446744073709551615", "4000000000"] {
			let mut st = State::default();
			let (_, err) = eval_in(&mut st, &format!("1 {bad}:a {bad};a"));
			assert_eq!(err.matches("array index").count(), 2, "{bad}: {err}");
			assert_eq!(st.stack().len(), 3);
			assert!(st.register('a').is_none());
		}
	}

	#[test]
	fn conditionals() {
		let mut st = State::default();
		eval_in(&mut st, "[[yes]]st 1 2>t 2 1>t 3 3=t 3 3!=t");
		assert_eq!(st.stack().iter().cloned().collect::<Vec<_>>(), vec![Str("yes".into()), Str("yes".into())]);

		let mut st = State::default();
		let (_, err) = eval_in(&mut st, "2 1<u");
		assert!(err.contains("register 'u' is empty"));
		assert!(st.stack().is_empty());
	}

	#[test]
	fn to_char_both_ways() {
		let mut st = State::default();
		eval_in(&mut st, "[héllo]a 233a");
		assert_eq!(st.stack().iter().cloned().collect::<Vec<_>>(), vec![Str("é".into()), Str("h".into())]);
		let (_, err) = eval_in(&mut st, "c 55296a");
		assert!(err.contains("code point"));
		assert_eq!(top(&st), num("55296"));
		eval_in(&mut st, "c []a");
		assert_eq!(top(&st), Str("\u{fffd}".into()));
	}

	#[test]
	fn length_and_fraction_digits() {
		let mut st = State::default();
		eval_in(&mut st, "[日本]Z 12345Z _1.25X [s]X");
		assert_eq!(st.stack().iter().cloned().collect::<Vec<_>>(), vec![num("0"), num("2"), num("5"), num("2")]);
		let mut st = State::default().custom_precision(5);
		eval_in(&mut st, "1 3/Z");
		assert_eq!(top(&st), num("6"));
	}

	#[test]
	fn raw_printing() {
		let mut st = State::default();
		let (out, _) = eval_in(&mut st, "[hi]P 65P");
		assert_eq!(out, "hiA");
		let mut input: &[u8] = b"";
		let (mut out, mut err) = (Vec::<u8>::new(), Vec::<u8>::new());
		exec_str(&mut st, &mut IOTriple {input: &mut input, output: &mut out, error: &mut err}, "16706P").unwrap();
		assert_eq!(out, vec![0x42, 0x41]);
	}

	#[test]
	fn shell_is_disabled_in_safe_mode() {
		let mut st = State::default().safe(true);
		let (_, err) = eval_in(&mut st, "!echo hi\n1");
		assert!(err.contains("disabled in safe mode"));
		assert_eq!(top(&st), num("1"));
	}

	#[test]
	fn shell_failure_is_recoverable() {
		let mut st = State::default();
		let (_, err) = eval_in(&mut st, "!exit 3\n2");
		assert!(err.contains("shell command failed: exit 3"), "{err}");
		assert_eq!(top(&st), num("2"));
	}
}
