//! Recoverable faults raised by commands and by the scanner.

use thiserror::Error;

///Everything that can abort a single command. All variants except [`Fault::Io`] are reported
///at the statement boundary and evaluation resumes with the next token.
#[derive(Debug, Error)]
pub enum Fault {
	#[error("stack empty")]
	StackUnderflow,
	#[error("less than {0} values on stack")]
	NotEnoughStack(usize),
	#[error("not a number")]
	NotANumber,
	#[error("division by zero")]
	DivisionByZero,
	#[error("register '{0}' is empty")]
	UnknownRegister(char),
	#[error("{0}: unimplemented")]
	UnimplementedCommand(char),
	#[error("failed to parse numeric '{0}'")]
	MalformedLiteral(String),
	#[error("precision must be an integer from 0 to {}", crate::MAX_PRECISION)]
	InvalidPrecision,
	#[error("shell command failed: {0}")]
	SubprocessFailure(String),
	#[error("array index must be an integer from 0 to {}", crate::MAX_INDEX)]
	InvalidIndex,
	#[error("cannot quit a negative number of levels")]
	InvalidCount,
	#[error("not a valid Unicode code point")]
	InvalidCodePoint,
	#[error("square root of negative number")]
	NegativeRoot,
	#[error("result is not a finite number")]
	NotFinite,
	#[error("base has no inverse for this modulus")]
	NoInverse,
	#[error("{0}: disabled in safe mode")]
	Disabled(char),
	#[error("macros nested deeper than {}", crate::MAX_DEPTH)]
	RecursionLimit,
	#[error(transparent)]
	Io(#[from] std::io::Error),
}
