use std::fmt;
use std::io;

/**
# Source of decoded characters

Analogous to [`std::io::Read`], but for Unicode scalar values instead of
bytes. Implementations may return fewer characters than requested; the
parser copes with arbitrary splits.
*/
pub trait CharRead {
	/// Fill the front of `buf` with the next characters of the stream.
	///
	/// Return the number of characters written. Zero signals the end of the
	/// stream (unless `buf` is empty).
	fn read_chars(&mut self, buf: &mut [char]) -> io::Result<usize>;
}

impl CharRead for &str {
	fn read_chars(&mut self, buf: &mut [char]) -> io::Result<usize> {
		let mut chars = self.chars();
		let mut n = 0;
		for slot in buf.iter_mut() {
			match chars.next() {
				Some(c) => {
					*slot = c;
					n += 1;
				}
				None => break,
			}
		}
		*self = chars.as_str();
		Ok(n)
	}
}

impl<R: CharRead + ?Sized> CharRead for Box<R> {
	fn read_chars(&mut self, buf: &mut [char]) -> io::Result<usize> {
		(**self).read_chars(buf)
	}
}

impl<R: CharRead + ?Sized> CharRead for &mut R {
	fn read_chars(&mut self, buf: &mut [char]) -> io::Result<usize> {
		(**self).read_chars(buf)
	}
}

/// Adapter to use any `char` iterator as a [`CharRead`].
pub struct CharIter<I>(pub I);

impl<I: Iterator<Item = char>> CharRead for CharIter<I> {
	fn read_chars(&mut self, buf: &mut [char]) -> io::Result<usize> {
		let mut n = 0;
		for slot in buf.iter_mut() {
			match self.0.next() {
				Some(c) => {
					*slot = c;
					n += 1;
				}
				None => break,
			}
		}
		Ok(n)
	}
}

/// Line and column in the decoded character stream, both starting at one.
///
/// A position always designates the next character which has not been
/// consumed yet.
#[derive(Copy, Debug, Clone, PartialEq, Eq, Hash)]
pub struct Position {
	line: usize,
	column: usize,
}

impl Position {
	pub const fn new(line: usize, column: usize) -> Position {
		Position { line, column }
	}

	/// Line number, starting at 1.
	pub fn line(&self) -> usize {
		self.line
	}

	/// Column number, starting at 1.
	pub fn column(&self) -> usize {
		self.column
	}
}

impl Default for Position {
	fn default() -> Self {
		Position::new(1, 1)
	}
}

impl fmt::Display for Position {
	fn fmt<'f>(&self, f: &'f mut fmt::Formatter) -> fmt::Result {
		write!(f, "{}:{}", self.line, self.column)
	}
}

const BLOCK_SIZE: usize = 8192;

/// Two-character lookahead window over a [`CharRead`].
///
/// `peek` shows line breaks as `'\n'` but leaves them unconsumed. The
/// collapse of CR LF into a single line feed and the position update both
/// happen in `read`, when the character is actually consumed.
///
/// If slot 0 holds a CR, slot 1 may show the LF which `read` is going to
/// swallow together with the CR.
pub(crate) struct Lookahead<R> {
	src: R,
	block: Vec<char>,
	block_pos: usize,
	block_len: usize,
	eof: bool,
	window: [Option<char>; 2],
	nwindow: usize,
	/// The last consumed char was a CR and the window was empty at that
	/// time, so the next fetched LF belongs to it.
	skip_lf: bool,
	pos: Position,
}

impl<R: CharRead> Lookahead<R> {
	pub(crate) fn new(src: R) -> Self {
		Self {
			src,
			block: vec!['\0'; BLOCK_SIZE],
			block_pos: 0,
			block_len: 0,
			eof: false,
			window: [None, None],
			nwindow: 0,
			skip_lf: false,
			pos: Position::default(),
		}
	}

	pub(crate) fn position(&self) -> Position {
		self.pos
	}

	fn fetch(&mut self) -> io::Result<Option<char>> {
		if self.block_pos >= self.block_len {
			if self.eof {
				return Ok(None);
			}
			loop {
				match self.src.read_chars(&mut self.block[..]) {
					Ok(0) => {
						self.eof = true;
						return Ok(None);
					}
					Ok(n) => {
						self.block_pos = 0;
						self.block_len = n;
						break;
					}
					Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
					Err(e) => return Err(e),
				}
			}
		}
		let c = self.block[self.block_pos];
		self.block_pos += 1;
		Ok(Some(c))
	}

	fn fill(&mut self, upto: usize) -> io::Result<()> {
		while self.nwindow <= upto {
			let mut c = self.fetch()?;
			if self.skip_lf {
				self.skip_lf = false;
				if c == Some('\n') {
					c = self.fetch()?;
				}
			}
			self.window[self.nwindow] = c;
			self.nwindow += 1;
		}
		Ok(())
	}

	fn shift(&mut self) {
		debug_assert!(self.nwindow > 0);
		self.window[0] = self.window[1];
		self.window[1] = None;
		self.nwindow -= 1;
	}

	/// Return the character at `offset` (0 or 1) without consuming it.
	///
	/// `None` signals the end of the stream.
	pub(crate) fn peek(&mut self, offset: usize) -> io::Result<Option<char>> {
		debug_assert!(offset < 2);
		self.fill(offset)?;
		Ok(match self.window[offset] {
			Some('\r') => Some('\n'),
			other => other,
		})
	}

	/// Consume and return the next character.
	pub(crate) fn read(&mut self) -> io::Result<Option<char>> {
		self.fill(0)?;
		let raw = match self.window[0] {
			None => return Ok(None),
			Some(c) => c,
		};
		self.shift();
		match raw {
			'\r' => {
				if self.nwindow > 0 {
					if self.window[0] == Some('\n') {
						self.shift();
					}
				} else {
					self.skip_lf = true;
				}
				self.newline();
				Ok(Some('\n'))
			}
			'\n' => {
				self.newline();
				Ok(Some('\n'))
			}
			c => {
				self.pos.column += 1;
				Ok(Some(c))
			}
		}
	}

	#[inline]
	fn newline(&mut self) {
		self.pos.line += 1;
		self.pos.column = 1;
	}
}
