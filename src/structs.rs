//! Stack values and the stack/register storage unit.

use crate::errors::Fault;
use crate::num::Number;
use crate::MAX_INDEX;

///basic object: either number or string
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Datum {
	Num(Number),
	Str(String)
}
use Datum::*;

impl Datum {
	///the Number zero, default value of array slots
	pub fn zero() -> Self {Num(Number::default())}

	///display form: numbers at the given precision, strings verbatim
	pub fn display(&self, precision: u32) -> String {
		match self {
			Num(n) => n.render(precision),
			Str(s) => s.clone(),
		}
	}

	///Code points for strings, rendered decimal digits (sign and point excluded) for numbers.
	pub fn semantic_len(&self, precision: u32) -> usize {
		match self {
			Num(n) => n.render(precision).chars().filter(char::is_ascii_digit).count(),
			Str(s) => s.chars().count(),
		}
	}
}

///LIFO stack of [`Datum`], used for the main stack and for every register.
///
///Registers additionally use the sparse array, which is independent of the LIFO contents.
#[derive(Clone, Debug, Default)]
pub struct Stack {
	data: Vec<Datum>,
	array: Option<Vec<Datum>>,
}

impl Stack {
	pub fn new() -> Self {Self::default()}

	pub fn push(&mut self, d: Datum) {self.data.push(d);}

	pub fn pop(&mut self) -> Result<Datum, Fault> {
		self.data.pop().ok_or(Fault::StackUnderflow)
	}

	pub fn peek(&self) -> Result<&Datum, Fault> {
		self.data.last().ok_or(Fault::StackUnderflow)
	}

	///overwrite the top slot, push if empty
	pub fn set(&mut self, d: Datum) {
		if let Some(top) = self.data.last_mut() {*top = d;}
		else {self.data.push(d);}
	}

	pub fn clear(&mut self) {self.data.clear();}

	pub fn len(&self) -> usize {self.data.len()}

	pub fn is_empty(&self) -> bool {self.data.is_empty()}

	///swap the top two slots
	pub fn swap(&mut self) -> Result<(), Fault> {
		let len = self.data.len();
		if len < 2 {return Err(Fault::NotEnoughStack(2));}
		self.data.swap(len - 2, len - 1);
		Ok(())
	}

	///top to bottom
	pub fn iter(&self) -> impl Iterator<Item = &Datum> {
		self.data.iter().rev()
	}

	///Borrows the top `N` slots as numbers, deepest first, without popping anything.
	///
	///Fails if there are fewer than `N` slots or any of them is a string.
	pub fn numbers<const N: usize>(&self) -> Result<[&Number; N], Fault> {
		let len = self.data.len();
		if len < N {
			return Err(if N == 1 {Fault::StackUnderflow} else {Fault::NotEnoughStack(N)});
		}
		let nums = self.data[len - N..].iter()
			.map(|d| match d {
				Num(n) => Ok(n),
				Str(_) => Err(Fault::NotANumber),
			})
			.collect::<Result<Vec<&Number>, Fault>>()?;
		nums.try_into().map_err(|_| Fault::NotEnoughStack(N))
	}

	///drop the top `n` slots
	pub fn discard(&mut self, n: usize) {
		self.data.truncate(self.data.len().saturating_sub(n));
	}

	///replace the top `n` slots with `with`
	pub fn replace<I: IntoIterator<Item = Datum>>(&mut self, n: usize, with: I) {
		self.discard(n);
		self.data.extend(with);
	}

	///Array slot `index`, zero if never written.
	pub fn array_get(&self, index: usize) -> Datum {
		self.array.as_ref()
			.and_then(|a| a.get(index))
			.cloned()
			.unwrap_or_else(Datum::zero)
	}

	///Stores into array slot `index`, filling any gap with zeros. Indices above [`MAX_INDEX`] are rejected.
	pub fn array_set(&mut self, index: usize, value: Datum) -> Result<(), Fault> {
		if index > MAX_INDEX {return Err(Fault::InvalidIndex);}
		let arr = self.array.get_or_insert_with(Vec::new);
		if index >= arr.len() {
			arr.resize(index + 1, Datum::zero());
		}
		arr[index] = value;
		Ok(())
	}
}
