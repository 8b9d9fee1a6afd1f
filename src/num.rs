//! Exact rational numbers.
//!
//! Every operation except [`Number::pow`] and [`Number::sqrt`] is exact. Those two go through a
//! [`rug::Float`] with [`WORK_PREC`] bits of mantissa and convert the result back to a rational.

use std::cmp::Ordering;
use rug::{Integer, Rational, Float, Complete, ops::Pow};
use regex::Regex;
use crate::errors::Fault;

///mantissa bits used by the approximate operations
pub const WORK_PREC: u32 = 256;

lazy_static! {
	///numeric literal, '_' already replaced with '-'
	static ref LITERAL: Regex = Regex::new(r"^(-?)([0-9]*)(?:\.([0-9]*))?$").unwrap();
}

///Exact fraction, always in lowest terms with a positive denominator.
#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct Number(Rational);

impl From<Integer> for Number {
	fn from(i: Integer) -> Self {Self(Rational::from(i))}
}
impl From<i64> for Number {
	fn from(i: i64) -> Self {Self(Rational::from(i))}
}
impl From<usize> for Number {
	fn from(u: usize) -> Self {Self(Rational::from(u))}
}
impl From<u32> for Number {
	fn from(u: u32) -> Self {Self(Rational::from(u))}
}

impl Number {
	///numerator/denominator, fails on a zero denominator
	pub fn new(num: Integer, den: Integer) -> Result<Self, Fault> {
		if den == 0 {return Err(Fault::DivisionByZero);}
		Ok(Self(Rational::from((num, den))))
	}

	///Parses a literal as produced by the scanner: optional `-`, digits, at most one `.`.
	///
	///At least one digit is required, so `-`, `.` and `-.` are malformed.
	pub fn parse(text: &str) -> Result<Self, Fault> {
		let bad = || Fault::MalformedLiteral(text.to_string());
		let caps = LITERAL.captures(text).ok_or_else(bad)?;
		let int = caps.get(2).map_or("", |m| m.as_str());
		let frac = caps.get(3).map_or("", |m| m.as_str());
		if int.is_empty() && frac.is_empty() {return Err(bad());}

		let mut num: Integer = format!("{int}{frac}").parse().map_err(|_| bad())?;
		if !caps[1].is_empty() {num = -num;}
		let den = Integer::u_pow_u(10, u32::try_from(frac.len()).map_err(|_| bad())?).complete();
		Self::new(num, den)
	}

	pub fn numer(&self) -> &Integer {self.0.numer()}
	pub fn denom(&self) -> &Integer {self.0.denom()}

	pub fn is_zero(&self) -> bool {self.0.cmp0() == Ordering::Equal}
	pub fn is_negative(&self) -> bool {self.0.cmp0() == Ordering::Less}
	pub fn is_integer(&self) -> bool {*self.0.denom() == 1}

	pub fn add(&self, other: &Self) -> Self {Self(Rational::from(&self.0 + &other.0))}
	pub fn sub(&self, other: &Self) -> Self {Self(Rational::from(&self.0 - &other.0))}
	pub fn mul(&self, other: &Self) -> Self {Self(Rational::from(&self.0 * &other.0))}

	pub fn div(&self, other: &Self) -> Result<Self, Fault> {
		if other.is_zero() {return Err(Fault::DivisionByZero);}
		Ok(Self(Rational::from(&self.0 / &other.0)))
	}

	///Remainder of `self / other`, with the sign of `self`.
	///
	///Integers use truncating `%`. Otherwise both numerators are scaled to the common
	///denominator `d1*d2`, reduced with `%`, and put back over `d1*d2`.
	pub fn rem(&self, other: &Self) -> Result<Self, Fault> {
		if other.is_zero() {return Err(Fault::DivisionByZero);}
		if self.is_integer() && other.is_integer() {
			return Ok(Self::from(Integer::from(self.numer() % other.numer())));
		}
		let lhs = Integer::from(self.numer() * other.denom());
		let rhs = Integer::from(other.numer() * self.denom());
		Self::new(lhs % rhs, Integer::from(self.denom() * other.denom()))
	}

	///quotient truncated toward zero, companion of [`Number::rem`]
	pub fn div_trunc(&self, other: &Self) -> Result<Self, Fault> {
		Ok(Self::from(self.div(other)?.trunc()))
	}

	///approximate `self^exp`
	pub fn pow(&self, exp: &Self) -> Result<Self, Fault> {
		let base = Float::with_val(WORK_PREC, &self.0);
		let res = base.pow(&Float::with_val(WORK_PREC, &exp.0));
		res.to_rational().map(Self).ok_or(Fault::NotFinite)
	}

	///approximate square root
	pub fn sqrt(&self) -> Result<Self, Fault> {
		if self.is_negative() {return Err(Fault::NegativeRoot);}
		Float::with_val(WORK_PREC, &self.0).sqrt().to_rational().map(Self).ok_or(Fault::NotFinite)
	}

	///integer part, truncated toward zero
	pub fn trunc(&self) -> Integer {
		Integer::from(self.numer() / self.denom())
	}

	///Fixed-point decimal with exactly `precision` fractional digits.
	///
	///Rounds half away from zero. Values that round to zero carry no sign.
	pub fn render(&self, precision: u32) -> String {
		let scale = Integer::u_pow_u(10, precision).complete();
		let (mut quot, rem) = (Integer::from(self.numer().abs_ref()) * scale).div_rem(self.denom().clone());
		if rem * 2_u32 >= *self.denom() {quot += 1;}

		let prec = precision as usize;
		let mut out = quot.to_string();
		if prec > 0 {
			if out.len() <= prec {
				out.insert_str(0, &"0".repeat(prec + 1 - out.len()));	//leading "0." and zeros
			}
			out.insert(out.len() - prec, '.');
		}
		if self.is_negative() && quot != 0 {out.insert(0, '-');}
		out
	}

	///Fractional digits needed to write the value exactly, `precision` if the expansion doesn't terminate.
	pub fn frac_digits(&self, precision: u32) -> u32 {
		let mut den = self.denom().clone();
		let (mut twos, mut fives) = (0_u32, 0_u32);
		while den.is_divisible_u(2) {
			den.div_exact_u_mut(2);
			twos += 1;
		}
		while den.is_divisible_u(5) {
			den.div_exact_u_mut(5);
			fives += 1;
		}
		if den == 1 {twos.max(fives)} else {precision}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use pretty_assertions::assert_eq;

	fn n(s: &str) -> Number {Number::parse(s).unwrap()}

	#[test]
	fn parse_literals() {
		assert_eq!(n("42"), Number::from(42_i64));
		assert_eq!(n("-7"), Number::from(-7_i64));
		assert_eq!(n(".5"), Number::new(Integer::from(1), Integer::from(2)).unwrap());
		assert_eq!(n("-1.25"), Number::new(Integer::from(-5), Integer::from(4)).unwrap());
		assert_eq!(n("5."), Number::from(5_i64));
		assert_eq!(n("007"), Number::from(7_i64));
	}

	#[test]
	fn malformed_literals() {
		for bad in ["-", ".", "-.", "", "1.2.3", "1-"] {
			assert!(matches!(Number::parse(bad), Err(Fault::MalformedLiteral(s)) if s == bad), "{bad}");
		}
	}

	#[test]
	fn lowest_terms() {
		let x = Number::new(Integer::from(6), Integer::from(-4)).unwrap();
		assert_eq!(x.numer(), &Integer::from(-3));
		assert_eq!(x.denom(), &Integer::from(2));
		assert!(matches!(Number::new(Integer::from(1), Integer::ZERO), Err(Fault::DivisionByZero)));
	}

	#[test]
	fn exact_arithmetic() {
		let third = n("1").div(&n("3")).unwrap();
		assert_eq!(third.mul(&n("3")), n("1"));
		assert_eq!(n("0.1").add(&n("0.2")), n("0.3"));
		assert_eq!(n("1").sub(&n("2.5")), n("-1.5"));
		assert!(matches!(n("2").div(&n("0")), Err(Fault::DivisionByZero)));
	}

	#[test]
	fn division_roundtrip() {
		for (a, b) in [("7", "3"), ("-2.5", "0.7"), ("1", "-9"), ("123.456", "0.001")] {
			let (a, b) = (n(a), n(b));
			let back = a.div(&b).unwrap().mul(&b);
			for prec in [0, 3, 10] {
				assert_eq!(back.render(prec), a.render(prec));
			}
		}
	}

	#[test]
	fn integer_remainder_follows_dividend() {
		assert_eq!(n("7").rem(&n("3")).unwrap(), n("1"));
		assert_eq!(n("-7").rem(&n("3")).unwrap(), n("-1"));
		assert_eq!(n("7").rem(&n("-3")).unwrap(), n("1"));
		assert!(matches!(n("7").rem(&n("0")), Err(Fault::DivisionByZero)));
	}

	#[test]
	fn rational_remainder() {
		//5.5 = 2*2 + 1.5
		assert_eq!(n("5.5").rem(&n("2")).unwrap(), n("1.5"));
		//(7/2) % (1/3): 21/6 % 2/6 = 1/6
		let third = n("1").div(&n("3")).unwrap();
		assert_eq!(n("3.5").rem(&third).unwrap(), n("1").div(&n("6")).unwrap());
		assert_eq!(n("-5.5").rem(&n("2")).unwrap(), n("-1.5"));
	}

	#[test]
	fn quotient_and_remainder_recombine() {
		let (a, b) = (n("-17.25"), n("4"));
		let q = a.div_trunc(&b).unwrap();
		assert_eq!(q, n("-4"));
		assert_eq!(q.mul(&b).add(&a.rem(&b).unwrap()), a);
	}

	#[test]
	fn truncation() {
		assert_eq!(n("2.9").trunc(), 2);
		assert_eq!(n("-2.9").trunc(), -2);
		assert_eq!(n("-0.5").trunc(), 0);
	}

	#[test]
	fn render_fixed_point() {
		let third = n("1").div(&n("3")).unwrap();
		assert_eq!(third.render(5), "0.33333");
		assert_eq!(third.render(0), "0");
		assert_eq!(n("7").render(0), "7");
		assert_eq!(n("7").render(2), "7.00");
		assert_eq!(n("-1.5").render(1), "-1.5");
		assert_eq!(n("0.05").render(3), "0.050");
		assert_eq!(n("123.456").render(1), "123.5");
	}

	#[test]
	fn render_rounds_half_away_from_zero() {
		assert_eq!(n("0.5").render(0), "1");
		assert_eq!(n("1.5").render(0), "2");
		assert_eq!(n("2.5").render(0), "3");
		assert_eq!(n("-2.5").render(0), "-3");
		assert_eq!(n("0.125").render(2), "0.13");
		assert_eq!(n("-0.4").render(0), "0");
		let two_thirds = n("2").div(&n("3")).unwrap();
		assert_eq!(two_thirds.render(3), "0.667");
	}

	#[test]
	fn approximate_ops() {
		assert_eq!(n("2").pow(&n("10")).unwrap(), n("1024"));
		assert_eq!(n("2").pow(&n("-1")).unwrap(), n("0.5"));
		assert_eq!(n("16").sqrt().unwrap(), n("4"));
		assert_eq!(n("2").sqrt().unwrap().render(10), "1.4142135624");
		assert!(matches!(n("-4").sqrt(), Err(Fault::NegativeRoot)));
		assert!(matches!(n("0").pow(&n("-1")), Err(Fault::NotFinite)));
		assert!(matches!(n("-8").pow(&n("0.5")), Err(Fault::NotFinite)));
	}

	#[test]
	fn fractional_digits() {
		assert_eq!(n("12").frac_digits(7), 0);
		assert_eq!(n("1.25").frac_digits(7), 2);
		assert_eq!(n("-0.001").frac_digits(7), 3);
		assert_eq!(n("1").div(&n("3")).unwrap().frac_digits(7), 7);
	}
}
