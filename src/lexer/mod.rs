/*!
# Character-level lexer

The [`Lexer`] sits on top of the [`Lookahead`] window and knows how to
consume each kind of construct: names, text runs, entity references, start
and end tags and the "legacy" constructs introduced by `<!` or `<?`
(comments, CDATA sections, processing instructions and document type
declarations).

All textual output goes into a single [`TextBuf`] owned by the lexer. The
parser decides when that buffer is cleared, which is how adjacent text
constructs get coalesced.
*/
use std::collections::HashMap;

use log::warn;

mod read;
mod selectors;

pub use read::{CharIter, CharRead, Position};
pub(crate) use read::Lookahead;

use crate::errctx::*;
use crate::error::{Error, MarkupError, Result};
use crate::strings::{Name, TextBuf};
use selectors::*;

/// Kind of the construct starting at the current input position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Construct {
	Eof,
	EntityRef,
	StartTag,
	EndTag,
	/// `<!` or `<?`
	Legacy,
	Text,
}

/// Kind of construct consumed by [`Lexer::lex_legacy`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LegacyKind {
	ProcessingInstruction,
	Comment,
	CData,
	DocType,
}

/// Outcome of [`Lexer::push_entity`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Reference {
	/// The replacement text was pushed. Carries the reference body.
	Resolved(String),
	/// Unknown entity, nothing was pushed. Carries the entity name.
	Unresolved(String),
	/// Relaxed recovery: the reference was pushed as literal text.
	Raw,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct RawAttribute {
	pub name: Name,
	pub value: String,
}

/// Start tag as it appears in the document, before namespace processing.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct RawStartTag {
	pub name: Name,
	pub attributes: Vec<RawAttribute>,
	/// The tag was closed with `/>`.
	pub empty: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AttValueDelimiter {
	Quoted(char),
	/// Relaxed mode only: the value ends at whitespace, `>` or `/>`.
	Unquoted,
}

const BUILTIN_ENTITIES: &'static [(&'static str, &'static str)] = &[
	("amp", "&"),
	("apos", "'"),
	("gt", ">"),
	("lt", "<"),
	("quot", "\""),
];

fn resolve_char_reference(body: &str) -> Option<char> {
	let (digits, radix) = match body.strip_prefix("#x") {
		Some(hex) => (hex, 16),
		None => (body.strip_prefix('#')?, 10),
	};
	if digits.is_empty() {
		return None;
	}
	let codepoint = u32::from_str_radix(digits, radix).ok()?;
	let ch = std::char::from_u32(codepoint)?;
	if is_xml_char(ch) {
		Some(ch)
	} else {
		None
	}
}

pub(crate) struct Lexer<'x> {
	src: Lookahead<Box<dyn CharRead + 'x>>,
	text: TextBuf,
	entities: HashMap<String, String>,
	relaxed: bool,
}

impl<'x> Lexer<'x> {
	pub(crate) fn new(src: Box<dyn CharRead + 'x>, relaxed: bool) -> Self {
		let entities = BUILTIN_ENTITIES
			.iter()
			.map(|(name, value)| (name.to_string(), value.to_string()))
			.collect();
		Self {
			src: Lookahead::new(src),
			text: TextBuf::new(),
			entities,
			relaxed,
		}
	}

	pub(crate) fn set_relaxed(&mut self, relaxed: bool) {
		self.relaxed = relaxed;
	}

	pub(crate) fn define_entity(&mut self, name: String, replacement: String) {
		self.entities.insert(name, replacement);
	}

	pub(crate) fn position(&self) -> Position {
		self.src.position()
	}

	pub(crate) fn text(&self) -> &TextBuf {
		&self.text
	}

	pub(crate) fn text_mut(&mut self) -> &mut TextBuf {
		&mut self.text
	}

	fn malformed(&self, e: MarkupError) -> Error {
		Error::Malformed(e, self.position())
	}

	fn wfeof(&self, ctx: &'static str) -> Error {
		Error::UnexpectedEof(ctx, self.position())
	}

	fn peek_or_eof(&mut self, ctx: &'static str) -> Result<char> {
		match self.peek(0)? {
			Some(c) => Ok(c),
			None => Err(self.wfeof(ctx)),
		}
	}

	fn read_or_eof(&mut self, ctx: &'static str) -> Result<char> {
		match self.read()? {
			Some(c) => Ok(c),
			None => Err(self.wfeof(ctx)),
		}
	}

	fn peek(&mut self, offset: usize) -> Result<Option<char>> {
		Ok(self.src.peek(offset)?)
	}

	fn read(&mut self) -> Result<Option<char>> {
		Ok(self.src.read()?)
	}

	/// Consume the literal `s` or fail.
	fn read_literal(&mut self, s: &'static str, ctx: &'static str) -> Result<()> {
		for expected in s.chars() {
			let c = self.read()?;
			match c {
				Some(c) if c == expected => (),
				Some(c) => return Err(self.malformed(MarkupError::UnexpectedChar(ctx, c, None))),
				None => return Err(self.wfeof(ctx)),
			}
		}
		Ok(())
	}

	/// Consume `c` or fail, naming `expected` in the error.
	fn read_expected(
		&mut self,
		c: char,
		ctx: &'static str,
		expected: &'static [&'static str],
	) -> Result<()> {
		match self.read()? {
			Some(found) if found == c => Ok(()),
			Some(found) => Err(self.malformed(MarkupError::UnexpectedChar(ctx, found, Some(expected)))),
			None => Err(self.wfeof(ctx)),
		}
	}

	/// Push characters while `sel` matches; return the first one which
	/// does not (unconsumed), or `None` at the end of the stream.
	fn push_while<S: CharSelector>(&mut self, sel: &S) -> Result<Option<char>> {
		loop {
			match self.peek(0)? {
				Some(c) if sel.select(c) => {
					self.read()?;
					self.text.push(c);
				}
				other => return Ok(other),
			}
		}
	}

	pub(crate) fn skip_whitespace(&mut self) -> Result<()> {
		while let Some(c) = self.peek(0)? {
			if !Whitespace.select(c) {
				break;
			}
			self.read()?;
		}
		Ok(())
	}

	/// Classify the next construct without consuming anything.
	pub(crate) fn peek_construct(&mut self) -> Result<Construct> {
		Ok(match self.peek(0)? {
			None => Construct::Eof,
			Some('&') => Construct::EntityRef,
			Some('<') => match self.peek(1)? {
				Some('/') => Construct::EndTag,
				Some('?') | Some('!') => Construct::Legacy,
				_ => Construct::StartTag,
			},
			Some(_) => Construct::Text,
		})
	}

	pub(crate) fn read_name(&mut self, ctx: &'static str) -> Result<Name> {
		match self.peek(0)? {
			None => return Err(self.wfeof(ctx)),
			Some(c) if !CLASS_XML_NAMESTART.select(c) => {
				return Err(self.malformed(MarkupError::NameExpected(ctx, c)))
			}
			Some(_) => (),
		}
		let m = self.text.mark();
		self.push_while(&CLASS_XML_NAME)?;
		Ok(self.text.take_since(m))
	}

	/// Push character data up to the next `<` or `&` (or the end of the
	/// stream).
	pub(crate) fn push_content_text(&mut self) -> Result<()> {
		self.push_while(&InvertDelimiters(DELIM_TEXT_STATE_EXIT))?;
		Ok(())
	}

	/**
	Consume an entity or character reference at the current position.

	The replacement text is pushed to the text buffer. Unknown entities push
	nothing and are reported as [`Reference::Unresolved`] in content; inside
	attribute values they are an error (or kept literally when relaxed).
	*/
	pub(crate) fn push_entity(&mut self, in_attribute: bool) -> Result<Reference> {
		self.read_expected('&', ERRCTX_REF, &["'&'"])?;
		let outer = self.text.mark();
		self.text.push('&');
		let body = self.text.mark();
		loop {
			match self.peek(0)? {
				Some(';') => {
					self.read()?;
					break;
				}
				Some('#') if self.text.since(body).is_empty() => {
					self.read()?;
					self.text.push('#');
				}
				Some(c) if CLASS_XML_NAME.select(c) => {
					self.read()?;
					self.text.push(c);
				}
				Some(c) => {
					if !self.relaxed {
						return Err(self.malformed(MarkupError::UnexpectedChar(
							ERRCTX_REF,
							c,
							Some(&["';'"]),
						)));
					}
					warn!(
						"unterminated reference {:?} at {}, keeping it as text",
						self.text.since(outer),
						self.position()
					);
					return Ok(Reference::Raw);
				}
				None => {
					if !self.relaxed {
						return Err(self.wfeof(ERRCTX_REF));
					}
					warn!("reference cut off by end of stream, keeping it as text");
					return Ok(Reference::Raw);
				}
			}
		}
		let name = self.text.since(body).to_string();
		self.text.rollback(outer);

		if name.starts_with('#') {
			return match resolve_char_reference(&name) {
				Some(ch) => {
					self.text.push(ch);
					Ok(Reference::Resolved(name))
				}
				None => Err(self.malformed(MarkupError::InvalidReference(name))),
			};
		}
		if name.is_empty() {
			if !self.relaxed {
				return Err(self.malformed(MarkupError::InvalidReference(name)));
			}
			warn!("empty reference at {}, keeping it as text", self.position());
			self.text.push_str("&;");
			return Ok(Reference::Raw);
		}

		match self.entities.get(&name) {
			Some(replacement) => {
				self.text.push_str(replacement);
				Ok(Reference::Resolved(name))
			}
			None if !in_attribute => Ok(Reference::Unresolved(name)),
			None if self.relaxed => {
				warn!(
					"unresolved entity &{}; in attribute value at {}, keeping it as text",
					name,
					self.position()
				);
				self.text.push('&');
				self.text.push_str(&name);
				self.text.push(';');
				Ok(Reference::Raw)
			}
			None => Err(Error::UnresolvedEntity(name, self.position())),
		}
	}

	fn push_attribute_value(&mut self, delim: AttValueDelimiter) -> Result<()> {
		loop {
			let c = self.peek_or_eof(ERRCTX_ATTVAL)?;
			match delim {
				AttValueDelimiter::Quoted(q) if c == q => {
					self.read()?;
					return Ok(());
				}
				AttValueDelimiter::Unquoted => {
					if c <= ' ' || c == '>' || (c == '/' && self.peek(1)? == Some('>')) {
						return Ok(());
					}
				}
				_ => (),
			}
			match c {
				'&' => {
					self.push_entity(true)?;
				}
				'\n' => {
					// line breaks in attribute values are normalized to a space
					self.read()?;
					self.text.push(' ');
				}
				c => {
					self.read()?;
					self.text.push(c);
				}
			}
		}
	}

	/// Consume a start tag including its attributes.
	///
	/// Attribute names must be unique in their raw (unresolved) form.
	pub(crate) fn lex_start_tag(&mut self) -> Result<RawStartTag> {
		self.read_expected('<', ERRCTX_ELEMENT, &["'<'"])?;
		let name = self.read_name(ERRCTX_NAME)?;
		let mut attributes: Vec<RawAttribute> = Vec::new();
		loop {
			self.skip_whitespace()?;
			match self.peek(0)? {
				None => return Err(self.wfeof(ERRCTX_ELEMENT)),
				Some('/') => {
					self.read()?;
					self.skip_whitespace()?;
					self.read_expected('>', ERRCTX_ELEMENT, &["'>'"])?;
					return Ok(RawStartTag {
						name,
						attributes,
						empty: true,
					});
				}
				Some('>') => {
					self.read()?;
					return Ok(RawStartTag {
						name,
						attributes,
						empty: false,
					});
				}
				Some(_) => (),
			}

			let attname = self.read_name(ERRCTX_ATTNAME)?;
			self.skip_whitespace()?;
			self.read_expected('=', ERRCTX_ELEMENT, &["'='"])?;
			self.skip_whitespace()?;

			let delim = match self.peek_or_eof(ERRCTX_ATTVAL)? {
				q @ '"' | q @ '\'' => {
					self.read()?;
					AttValueDelimiter::Quoted(q)
				}
				other if self.relaxed => {
					warn!(
						"attribute {:?} of <{}> has no quotes (starts with {:?}) at {}",
						attname,
						name,
						other,
						self.position()
					);
					AttValueDelimiter::Unquoted
				}
				other => return Err(self.malformed(MarkupError::InvalidDelimiter(other))),
			};

			let m = self.text.mark();
			self.push_attribute_value(delim)?;
			let value: String = self.text.take_since(m);

			if attributes.iter().any(|a| a.name == attname) {
				return Err(Error::DuplicateAttribute(attname.to_string(), self.position()));
			}
			attributes.push(RawAttribute {
				name: attname,
				value,
			});
		}
	}

	/// Consume an end tag and return its raw name.
	pub(crate) fn lex_end_tag(&mut self) -> Result<Name> {
		self.read_literal("</", ERRCTX_ELEMENT_FOOT)?;
		let name = self.read_name(ERRCTX_NAME)?;
		self.skip_whitespace()?;
		self.read_expected('>', ERRCTX_ELEMENT_FOOT, &["'>'"])?;
		Ok(name)
	}

	/**
	Consume a comment, CDATA section, processing instruction or document type
	declaration.

	The content is pushed to the text buffer if `push` is true. CDATA
	sections are always pushed.
	*/
	pub(crate) fn lex_legacy(&mut self, push: bool) -> Result<LegacyKind> {
		self.read_expected('<', ERRCTX_UNKNOWN, &["'<'"])?;
		let c = self.read_or_eof(ERRCTX_MARKUP_DECL)?;
		let kind = match c {
			'?' => LegacyKind::ProcessingInstruction,
			'!' => match self.peek(0)? {
				Some('-') => {
					self.read_literal("--", ERRCTX_COMMENT)?;
					LegacyKind::Comment
				}
				Some('[') => {
					self.read_literal("[CDATA[", ERRCTX_CDATA_SECTION)?;
					LegacyKind::CData
				}
				Some(_) => {
					self.read_literal("DOCTYPE", ERRCTX_MARKUP_DECL)?;
					LegacyKind::DocType
				}
				None => return Err(self.wfeof(ERRCTX_MARKUP_DECL)),
			},
			other => {
				return Err(self.malformed(MarkupError::UnexpectedChar(
					ERRCTX_MARKUP_DECL,
					other,
					Some(&["'?'", "'!'"]),
				)))
			}
		};

		match kind {
			LegacyKind::ProcessingInstruction => self.lex_until_pi_end(push)?,
			LegacyKind::Comment => self.lex_until_double(push, '-', ERRCTX_COMMENT)?,
			LegacyKind::CData => self.lex_until_double(true, ']', ERRCTX_CDATA_SECTION)?,
			LegacyKind::DocType => self.lex_doctype(push)?,
		}
		Ok(kind)
	}

	fn lex_until_pi_end(&mut self, push: bool) -> Result<()> {
		loop {
			if self.peek(0)? == Some('?') && self.peek(1)? == Some('>') {
				self.read()?;
				self.read()?;
				return Ok(());
			}
			let c = self.read_or_eof(ERRCTX_PI)?;
			if push {
				self.text.push(c);
			}
		}
	}

	/// Consume up to and including `term term '>'` (`-->` or `]]>`).
	fn lex_until_double(&mut self, push: bool, term: char, ctx: &'static str) -> Result<()> {
		loop {
			let c = self.read_or_eof(ctx)?;
			if c == term && self.peek(0)? == Some(term) && self.peek(1)? == Some('>') {
				self.read()?;
				self.read()?;
				return Ok(());
			}
			if push {
				self.text.push(c);
			}
		}
	}

	/// Consume the rest of a document type declaration.
	///
	/// Nested `<...>` (markup declarations in the internal subset) are
	/// counted, ignoring brackets inside quoted literals.
	fn lex_doctype(&mut self, push: bool) -> Result<()> {
		let mut nesting = 1usize;
		let mut quote: Option<char> = None;
		loop {
			let c = self.read_or_eof(ERRCTX_DOCTYPE)?;
			match (c, quote) {
				('\'', None) | ('"', None) => quote = Some(c),
				(c, Some(q)) if c == q => quote = None,
				('<', None) => nesting += 1,
				('>', None) => {
					nesting -= 1;
					if nesting == 0 {
						return Ok(());
					}
				}
				_ => (),
			}
			if push {
				self.text.push(c);
			}
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::error::ErrorKind;

	fn lexer<'x>(src: &'x str) -> Lexer<'x> {
		Lexer::new(Box::new(src), false)
	}

	fn relaxed<'x>(src: &'x str) -> Lexer<'x> {
		Lexer::new(Box::new(src), true)
	}

	#[test]
	fn peek_construct_classifies_without_consuming() {
		let mut l = lexer("<a></a><!-- --><?pi?>&amp;text");
		assert_eq!(l.peek_construct().unwrap(), Construct::StartTag);
		assert_eq!(l.peek_construct().unwrap(), Construct::StartTag);
		l.lex_start_tag().unwrap();
		assert_eq!(l.peek_construct().unwrap(), Construct::EndTag);
		l.lex_end_tag().unwrap();
		assert_eq!(l.peek_construct().unwrap(), Construct::Legacy);
		l.lex_legacy(false).unwrap();
		assert_eq!(l.peek_construct().unwrap(), Construct::Legacy);
		l.lex_legacy(false).unwrap();
		assert_eq!(l.peek_construct().unwrap(), Construct::EntityRef);
		l.push_entity(false).unwrap();
		assert_eq!(l.peek_construct().unwrap(), Construct::Text);
		l.push_content_text().unwrap();
		assert_eq!(l.peek_construct().unwrap(), Construct::Eof);
	}

	#[test]
	fn read_name_stops_at_non_name_char() {
		let mut l = lexer("foo:bar-1.x=");
		assert_eq!(l.read_name(ERRCTX_NAME).unwrap(), "foo:bar-1.x");
		assert_eq!(l.text().as_str(), "");
	}

	#[test]
	fn read_name_rejects_digit_start() {
		let mut l = lexer("1foo");
		match l.read_name(ERRCTX_NAME) {
			Err(Error::Malformed(MarkupError::NameExpected(_, '1'), _)) => (),
			other => panic!("unexpected result: {:?}", other),
		}
	}

	#[test]
	fn start_tag_with_attributes() {
		let mut l = lexer("<a x='1' y = \"2&lt;\"\n z='a\r\nb'>");
		let tag = l.lex_start_tag().unwrap();
		assert_eq!(tag.name, "a");
		assert!(!tag.empty);
		let attrs: Vec<_> = tag
			.attributes
			.iter()
			.map(|a| (a.name.as_str(), a.value.as_str()))
			.collect();
		assert_eq!(attrs, vec![("x", "1"), ("y", "2<"), ("z", "a b")]);
	}

	#[test]
	fn self_closing_start_tag() {
		let mut l = lexer("<br / >");
		let tag = l.lex_start_tag().unwrap();
		assert_eq!(tag.name, "br");
		assert!(tag.empty);
		assert_eq!(l.peek_construct().unwrap(), Construct::Eof);
	}

	#[test]
	fn start_tag_requires_equals_sign() {
		let mut l = relaxed("<a x>");
		let err = l.lex_start_tag().unwrap_err();
		assert_eq!(err.kind(), ErrorKind::MalformedMarkup);
	}

	#[test]
	fn unquoted_value_is_malformed_when_strict() {
		let mut l = lexer("<a x=1>");
		match l.lex_start_tag() {
			Err(Error::Malformed(MarkupError::InvalidDelimiter('1'), _)) => (),
			other => panic!("unexpected result: {:?}", other),
		}
	}

	#[test]
	fn unquoted_value_is_accepted_when_relaxed() {
		let mut l = relaxed("<a x=10 y=abc/>");
		let tag = l.lex_start_tag().unwrap();
		assert_eq!(tag.attributes[0].value, "10");
		assert_eq!(tag.attributes[1].value, "abc");
		assert!(tag.empty);
	}

	#[test]
	fn duplicate_raw_attribute_is_rejected_even_when_relaxed() {
		let mut l = relaxed("<a x='1' x='2'>");
		let err = l.lex_start_tag().unwrap_err();
		assert_eq!(err.kind(), ErrorKind::DuplicateAttribute);
	}

	#[test]
	fn eof_in_start_tag() {
		let mut l = lexer("<a x='1'");
		let err = l.lex_start_tag().unwrap_err();
		assert_eq!(err.kind(), ErrorKind::UnexpectedEof);
		let mut l = lexer("<a x='1");
		let err = l.lex_start_tag().unwrap_err();
		assert_eq!(err.kind(), ErrorKind::UnexpectedEof);
	}

	#[test]
	fn end_tag_allows_trailing_whitespace() {
		let mut l = lexer("</foo:bar \n>");
		assert_eq!(l.lex_end_tag().unwrap(), "foo:bar");
	}

	#[test]
	fn entities_resolve_into_text_buffer() {
		let mut l = lexer("&amp;&#65;&#x42;&apos;");
		for expected in &["amp", "#65", "#x42", "apos"] {
			match l.push_entity(false).unwrap() {
				Reference::Resolved(name) => assert_eq!(&name, expected),
				other => panic!("unexpected reference: {:?}", other),
			}
		}
		assert_eq!(l.text().as_str(), "&AB'");
	}

	#[test]
	fn unknown_entity_in_content_is_unresolved() {
		let mut l = lexer("&zzz;x");
		assert_eq!(
			l.push_entity(false).unwrap(),
			Reference::Unresolved("zzz".to_string())
		);
		assert_eq!(l.text().as_str(), "");
		assert_eq!(l.peek_construct().unwrap(), Construct::Text);
	}

	#[test]
	fn registered_entity_is_resolved() {
		let mut l = lexer("&nbsp;");
		l.define_entity("nbsp".to_string(), "\u{a0}".to_string());
		l.push_entity(false).unwrap();
		assert_eq!(l.text().as_str(), "\u{a0}");
	}

	#[test]
	fn invalid_character_references() {
		for src in &["&#;", "&#x;", "&#0;", "&#xd800;", "&#12a;", "&#x110000;"] {
			let mut l = lexer(src);
			match l.push_entity(false) {
				Err(Error::Malformed(MarkupError::InvalidReference(_), _)) => (),
				other => panic!("unexpected result for {:?}: {:?}", src, other),
			}
		}
	}

	#[test]
	fn unterminated_reference() {
		let mut l = lexer("&a b");
		let err = l.push_entity(false).unwrap_err();
		assert_eq!(err.kind(), ErrorKind::MalformedMarkup);

		let mut l = relaxed("&a b");
		assert_eq!(l.push_entity(false).unwrap(), Reference::Raw);
		assert_eq!(l.text().as_str(), "&a");
		l.push_content_text().unwrap();
		assert_eq!(l.text().as_str(), "&a b");
	}

	#[test]
	fn unknown_entity_in_attribute_value() {
		let mut l = lexer("<a x='&zzz;'>");
		match l.lex_start_tag() {
			Err(Error::UnresolvedEntity(name, _)) => assert_eq!(name, "zzz"),
			other => panic!("unexpected result: {:?}", other),
		}

		let mut l = relaxed("<a x='&zzz;'>");
		let tag = l.lex_start_tag().unwrap();
		assert_eq!(tag.attributes[0].value, "&zzz;");
	}

	#[test]
	fn comment_body_is_pushed_on_request() {
		let mut l = lexer("<!-- a - b --><!---->");
		assert_eq!(l.lex_legacy(true).unwrap(), LegacyKind::Comment);
		assert_eq!(l.text().as_str(), " a - b ");
		l.text_mut().clear();
		assert_eq!(l.lex_legacy(true).unwrap(), LegacyKind::Comment);
		assert_eq!(l.text().as_str(), "");
	}

	#[test]
	fn cdata_is_always_pushed() {
		let mut l = lexer("<![CDATA[<x>&amp;]]]>");
		assert_eq!(l.lex_legacy(false).unwrap(), LegacyKind::CData);
		assert_eq!(l.text().as_str(), "<x>&amp;]");
	}

	#[test]
	fn processing_instruction() {
		let mut l = lexer("<?xml version='1.0'?><??>");
		assert_eq!(l.lex_legacy(true).unwrap(), LegacyKind::ProcessingInstruction);
		assert_eq!(l.text().as_str(), "xml version='1.0'");
		l.text_mut().clear();
		assert_eq!(l.lex_legacy(true).unwrap(), LegacyKind::ProcessingInstruction);
		assert_eq!(l.text().as_str(), "");
	}

	#[test]
	fn doctype_counts_nesting_outside_quotes() {
		let mut l = lexer("<!DOCTYPE a [<!ENTITY x \"a>b\"><!ENTITY y 'c\"d>'>]>rest");
		assert_eq!(l.lex_legacy(true).unwrap(), LegacyKind::DocType);
		assert_eq!(
			l.text().as_str(),
			" a [<!ENTITY x \"a>b\"><!ENTITY y 'c\"d>'>]"
		);
		assert_eq!(l.peek_construct().unwrap(), Construct::Text);
	}

	#[test]
	fn legacy_constructs_fail_on_eof() {
		for src in &["<!-- x", "<![CDATA[x]]", "<?pi", "<!DOCTYPE a [", "<!"] {
			let mut l = lexer(src);
			let err = l.lex_legacy(false).unwrap_err();
			assert_eq!(err.kind(), ErrorKind::UnexpectedEof, "{:?}", src);
		}
	}

	#[test]
	fn malformed_markup_declaration() {
		let mut l = lexer("<!ELEMENT a>");
		let err = l.lex_legacy(false).unwrap_err();
		assert_eq!(err.kind(), ErrorKind::MalformedMarkup);
		let mut l = lexer("<!-x->");
		let err = l.lex_legacy(false).unwrap_err();
		assert_eq!(err.kind(), ErrorKind::MalformedMarkup);
	}

	#[test]
	fn content_text_stops_at_markup() {
		let mut l = lexer("a\r\nb&amp;c");
		l.push_content_text().unwrap();
		assert_eq!(l.text().as_str(), "a\nb");
		assert_eq!(l.position(), Position::new(2, 2));
	}
}
