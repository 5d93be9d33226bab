/*!
# Strings and the text accumulator

[`Name`] is used for element names, attribute names and namespace prefixes.
Those are typically short, so the inline storage of [`smartstring`] avoids
most allocations for them.

[`TextBuf`] is the scratch buffer into which all sub-lexers write. It is
owned by the lexer, reused across events and only ever truncated back to a
[`Mark`], never shrunk.
*/
use std::fmt;

use smartstring::alias::String as SmartString;

/// Element names, attribute names and namespace prefixes.
pub type Name = SmartString;

const INITIAL_CAPACITY: usize = 128;

/// Remembered state of a [`TextBuf`], see [`TextBuf::mark`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Mark {
	len: usize,
	whitespace: bool,
}

/// Growable character accumulator with mark/rollback.
///
/// Besides the text itself, the buffer tracks whether everything pushed
/// since the last [`TextBuf::clear`] was whitespace (any char up to and
/// including U+20).
pub(crate) struct TextBuf {
	buf: String,
	whitespace: bool,
}

impl TextBuf {
	pub(crate) fn new() -> TextBuf {
		TextBuf {
			buf: String::with_capacity(INITIAL_CAPACITY),
			whitespace: true,
		}
	}

	#[inline]
	fn grow_for(&mut self, additional: usize) {
		let cap = self.buf.capacity();
		let required = self.buf.len() + additional;
		if required <= cap {
			return;
		}
		// grow by a third instead of doubling, the buffer lives as long as
		// the parser
		let target = (cap * 4 / 3 + 4).max(required);
		self.buf.reserve_exact(target - self.buf.len());
	}

	pub(crate) fn push(&mut self, c: char) {
		self.whitespace &= c <= ' ';
		self.grow_for(c.len_utf8());
		self.buf.push(c);
	}

	pub(crate) fn push_str(&mut self, s: &str) {
		for c in s.chars() {
			self.push(c);
		}
	}

	pub(crate) fn mark(&self) -> Mark {
		Mark {
			len: self.buf.len(),
			whitespace: self.whitespace,
		}
	}

	/// Text pushed after `m` was taken.
	pub(crate) fn since(&self, m: Mark) -> &str {
		&self.buf[m.len..]
	}

	/// Restore the exact state at the time `m` was taken.
	pub(crate) fn rollback(&mut self, m: Mark) {
		debug_assert!(m.len <= self.buf.len());
		self.buf.truncate(m.len);
		self.whitespace = m.whitespace;
	}

	/// Copy out the text pushed after `m` and roll back to `m`.
	pub(crate) fn take_since<T: for<'a> From<&'a str>>(&mut self, m: Mark) -> T {
		let result = T::from(self.since(m));
		self.rollback(m);
		result
	}

	pub(crate) fn clear(&mut self) {
		self.buf.clear();
		self.whitespace = true;
	}

	pub(crate) fn as_str(&self) -> &str {
		&self.buf
	}

	pub(crate) fn is_whitespace(&self) -> bool {
		self.whitespace
	}

	#[cfg(test)]
	pub(crate) fn capacity(&self) -> usize {
		self.buf.capacity()
	}
}

impl fmt::Debug for TextBuf {
	fn fmt<'f>(&self, f: &'f mut fmt::Formatter) -> fmt::Result {
		f.debug_struct("TextBuf")
			.field("buf", &self.buf)
			.field("whitespace", &self.whitespace)
			.finish()
	}
}
