/*!
# Byte streams and character encodings

[`DecodingReader`] turns an [`io::Read`] byte source into a [`CharRead`]
character source. Unless the caller names the encoding, it is detected
from the first bytes of the stream: byte order marks, the layout of the
initial `<` in the UTF-16 and UTF-32 families, and the `encoding`
pseudo-attribute of an XML declaration.

Decoding is done by [`encoding_rs`]. UTF-32 is not part of the WHATWG
encoding standard and is decoded by a small built-in decoder instead.
Malformed byte sequences decode to U+FFFD.
*/
use std::io;
use std::mem;

use encoding_rs::{CoderResult, Decoder, Encoding, UTF_16BE, UTF_16LE, UTF_8};
use log::debug;

use crate::error::{Error, Result};
use crate::lexer::CharRead;

const BLOCK_SIZE: usize = 4096;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Detected {
	Whatwg(&'static Encoding),
	Utf32 { big_endian: bool },
}

impl Detected {
	fn name(&self) -> &'static str {
		match self {
			Self::Whatwg(enc) => enc.name(),
			Self::Utf32 { big_endian: true } => "UTF-32BE",
			Self::Utf32 { big_endian: false } => "UTF-32LE",
		}
	}
}

/// Look up an encoding label, including the UTF-32 labels unknown to the
/// WHATWG registry.
fn lookup_label(label: &str) -> Option<Detected> {
	let trimmed = label.trim();
	if trimmed.eq_ignore_ascii_case("utf-32") || trimmed.eq_ignore_ascii_case("utf-32be") {
		return Some(Detected::Utf32 { big_endian: true });
	}
	if trimmed.eq_ignore_ascii_case("utf-32le") {
		return Some(Detected::Utf32 { big_endian: false });
	}
	Encoding::for_label(trimmed.as_bytes()).map(Detected::Whatwg)
}

fn unsupported(label: &str) -> Error {
	Error::Encoding(format!("unsupported encoding {:?}", label))
}

struct Utf32Decoder {
	big_endian: bool,
	/// Bytes of an incomplete code unit.
	partial: Vec<u8>,
	/// Drop a leading U+FEFF.
	strip_bom: bool,
	/// Switch to little endian if the stream starts with `FF FE 00 00`.
	detect_bom: bool,
}

impl Utf32Decoder {
	fn decode(&mut self, input: &[u8], out: &mut String, last: bool) {
		let mut input = input;
		if !self.partial.is_empty() {
			let take = (4 - self.partial.len()).min(input.len());
			self.partial.extend_from_slice(&input[..take]);
			input = &input[take..];
			if self.partial.len() == 4 {
				let unit = mem::take(&mut self.partial);
				self.push_unit(&unit, out);
			}
		}
		let mut chunks = input.chunks_exact(4);
		for unit in &mut chunks {
			self.push_unit(unit, out);
		}
		self.partial.extend_from_slice(chunks.remainder());
		if last && !self.partial.is_empty() {
			self.partial.clear();
			out.push(char::REPLACEMENT_CHARACTER);
		}
	}

	fn push_unit(&mut self, unit: &[u8], out: &mut String) {
		let mut bytes = [unit[0], unit[1], unit[2], unit[3]];
		if self.detect_bom {
			self.detect_bom = false;
			if bytes == [0xff, 0xfe, 0, 0] {
				self.big_endian = false;
			}
		}
		if !self.big_endian {
			bytes.reverse();
		}
		let ch = std::char::from_u32(u32::from_be_bytes(bytes)).unwrap_or(char::REPLACEMENT_CHARACTER);
		if self.strip_bom {
			self.strip_bom = false;
			if ch == '\u{feff}' {
				return;
			}
		}
		out.push(ch);
	}
}

enum CharDecoder {
	Whatwg(Decoder),
	Utf32(Utf32Decoder),
}

impl CharDecoder {
	fn new(detected: Detected, strip_bom: bool) -> Self {
		match detected {
			Detected::Whatwg(enc) if strip_bom => Self::Whatwg(enc.new_decoder_with_bom_removal()),
			Detected::Whatwg(enc) => Self::Whatwg(enc.new_decoder_without_bom_handling()),
			Detected::Utf32 { big_endian } => Self::Utf32(Utf32Decoder {
				big_endian,
				partial: Vec::new(),
				strip_bom,
				detect_bom: strip_bom && big_endian,
			}),
		}
	}

	fn decode(&mut self, input: &[u8], out: &mut String, last: bool) {
		match self {
			Self::Whatwg(dec) => {
				let mut input = input;
				loop {
					let needed = dec.max_utf8_buffer_length(input.len()).unwrap_or(BLOCK_SIZE);
					out.reserve(needed);
					let (result, read, _) = dec.decode_to_string(input, out, last);
					input = &input[read..];
					match result {
						CoderResult::InputEmpty => return,
						CoderResult::OutputFull => continue,
					}
				}
			}
			Self::Utf32(dec) => dec.decode(input, out, last),
		}
	}
}

fn read_byte<R: io::Read>(r: &mut R) -> io::Result<Option<u8>> {
	let mut b = [0u8; 1];
	loop {
		match r.read(&mut b) {
			Ok(0) => return Ok(None),
			Ok(_) => return Ok(Some(b[0])),
			Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
			Err(e) => return Err(e),
		}
	}
}

/// Read until `head` holds `n` bytes or the stream ends.
fn read_head<R: io::Read>(r: &mut R, head: &mut Vec<u8>, n: usize) -> io::Result<()> {
	while head.len() < n {
		match read_byte(r)? {
			Some(b) => head.push(b),
			None => break,
		}
	}
	Ok(())
}

/// Read up to and including the `>` closing the XML declaration.
fn read_declaration<R: io::Read>(r: &mut R, head: &mut Vec<u8>) -> io::Result<()> {
	if head.last() == Some(&b'>') {
		return Ok(());
	}
	while let Some(b) = read_byte(r)? {
		head.push(b);
		if b == b'>' {
			break;
		}
	}
	Ok(())
}

/// Extract the value of the `encoding` pseudo-attribute from an ASCII XML
/// declaration.
fn declared_encoding(decl: &[u8]) -> Option<String> {
	let key = b"encoding";
	let start = decl.windows(key.len()).position(|w| w == key)? + key.len();
	let mut rest = decl[start..].iter().skip_while(|b| b.is_ascii_whitespace());
	if *rest.next()? != b'=' {
		return None;
	}
	let mut rest = rest.skip_while(|b| b.is_ascii_whitespace());
	let quote = *rest.next()?;
	if quote != b'"' && quote != b'\'' {
		return None;
	}
	let value: Vec<u8> = rest.take_while(|b| **b != quote).cloned().collect();
	Some(String::from_utf8_lossy(&value).into_owned())
}

/// Determine the encoding from the start of the stream.
///
/// Returns the encoding and the consumed bytes which still have to be
/// decoded (everything except a byte order mark).
fn sniff<R: io::Read>(r: &mut R) -> Result<(Detected, Vec<u8>)> {
	let mut head = Vec::with_capacity(64);
	read_head(r, &mut head, 4)?;
	let lead = head.clone();
	let (detected, skip) = match &lead[..] {
		[0x00, 0x00, 0xfe, 0xff] => (Detected::Utf32 { big_endian: true }, 4),
		[0xff, 0xfe, 0x00, 0x00] => (Detected::Utf32 { big_endian: false }, 4),
		[0x00, 0x00, 0x00, 0x3c] => (Detected::Utf32 { big_endian: true }, 0),
		[0x3c, 0x00, 0x00, 0x00] => (Detected::Utf32 { big_endian: false }, 0),
		[0x00, 0x3c, 0x00, 0x3f] => (Detected::Whatwg(UTF_16BE), 0),
		[0x3c, 0x00, 0x3f, 0x00] => (Detected::Whatwg(UTF_16LE), 0),
		b"<?xm" => {
			read_declaration(r, &mut head)?;
			(detect_from_declaration(&head)?, 0)
		}
		[0xfe, 0xff, ..] => (Detected::Whatwg(UTF_16BE), 2),
		[0xff, 0xfe, ..] => (Detected::Whatwg(UTF_16LE), 2),
		[0xef, 0xbb, 0xbf, ..] => {
			read_head(r, &mut head, 7)?;
			if &head[3..] == b"<?xm" {
				read_declaration(r, &mut head)?;
				(detect_from_declaration(&head[3..])?, 3)
			} else {
				(Detected::Whatwg(UTF_8), 3)
			}
		}
		_ => (Detected::Whatwg(UTF_8), 0),
	};
	head.drain(..skip);
	Ok((detected, head))
}

fn detect_from_declaration(decl: &[u8]) -> Result<Detected> {
	let label = match declared_encoding(decl) {
		Some(label) => label,
		None => return Ok(Detected::Whatwg(UTF_8)),
	};
	match lookup_label(&label) {
		Some(Detected::Whatwg(enc)) if enc.is_ascii_compatible() => Ok(Detected::Whatwg(enc)),
		Some(other) => {
			// the declaration itself was readable as ASCII, so the stream
			// cannot be in this encoding
			debug!(
				"ignoring declared encoding {:?} ({}) for an ASCII-compatible stream",
				label,
				other.name()
			);
			Ok(Detected::Whatwg(UTF_8))
		}
		None => Err(unsupported(&label)),
	}
}

/**
# Decoding character source

Wraps an [`io::Read`] and implements [`CharRead`] on top of it.

```
use pullxml::{CharRead, DecodingReader};
let bytes: &[u8] = b"\xff\xfe<\x00a\x00/\x00>\x00";
let mut r = DecodingReader::new(bytes, None).unwrap();
assert_eq!(r.encoding(), "UTF-16LE");
let mut buf = ['\0'; 8];
let n = r.read_chars(&mut buf).unwrap();
assert_eq!(&buf[..n], &['<', 'a', '/', '>']);
```
*/
pub struct DecodingReader<R> {
	inner: R,
	decoder: CharDecoder,
	encoding: &'static str,
	/// Bytes consumed while sniffing which still need decoding.
	pending: Vec<u8>,
	bytes: Vec<u8>,
	decoded: String,
	decoded_pos: usize,
	eof: bool,
}

impl<R: io::Read> DecodingReader<R> {
	/// Create a decoding reader.
	///
	/// If `encoding` is given, it is used without any detection and a byte
	/// order mark of that encoding is removed. Otherwise, the encoding is
	/// detected from the start of the stream, which may read from `inner`.
	///
	/// Fails with [`Error::Encoding`] if the given or declared encoding is
	/// not supported.
	pub fn new(mut inner: R, encoding: Option<&str>) -> Result<Self> {
		let (detected, pending, strip_bom) = match encoding {
			Some(label) => match lookup_label(label) {
				Some(detected) => (detected, Vec::new(), true),
				None => return Err(unsupported(label)),
			},
			None => {
				let (detected, pending) = sniff(&mut inner)?;
				(detected, pending, false)
			}
		};
		debug!(
			"decoding input as {} ({})",
			detected.name(),
			if encoding.is_some() {
				"requested"
			} else {
				"detected"
			}
		);
		Ok(Self {
			inner,
			decoder: CharDecoder::new(detected, strip_bom),
			encoding: detected.name(),
			pending,
			bytes: vec![0u8; BLOCK_SIZE],
			decoded: String::new(),
			decoded_pos: 0,
			eof: false,
		})
	}

	/// Name of the encoding used for decoding.
	pub fn encoding(&self) -> &'static str {
		self.encoding
	}

	fn fill_decoded(&mut self) -> io::Result<()> {
		self.decoded.clear();
		self.decoded_pos = 0;
		if !self.pending.is_empty() {
			let pending = mem::take(&mut self.pending);
			self.decoder.decode(&pending, &mut self.decoded, false);
			return Ok(());
		}
		let n = loop {
			match self.inner.read(&mut self.bytes[..]) {
				Ok(n) => break n,
				Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
				Err(e) => return Err(e),
			}
		};
		if n == 0 {
			self.eof = true;
			self.decoder.decode(&[], &mut self.decoded, true);
		} else {
			self.decoder.decode(&self.bytes[..n], &mut self.decoded, false);
		}
		Ok(())
	}
}

impl<R: io::Read> CharRead for DecodingReader<R> {
	fn read_chars(&mut self, buf: &mut [char]) -> io::Result<usize> {
		if buf.is_empty() {
			return Ok(0);
		}
		loop {
			if self.decoded_pos < self.decoded.len() {
				let mut n = 0;
				for c in self.decoded[self.decoded_pos..].chars() {
					if n == buf.len() {
						break;
					}
					buf[n] = c;
					n += 1;
					self.decoded_pos += c.len_utf8();
				}
				return Ok(n);
			}
			if self.eof {
				return Ok(0);
			}
			self.fill_decoded()?;
		}
	}
}
