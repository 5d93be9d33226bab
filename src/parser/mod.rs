/*!
# Pull parser

The [`Parser`] drives the lexer one construct at a time and keeps the state
which the XmlPull accessor methods expose: the current event type, the name
and namespace of the current tag, its attributes, the element depth and the
in-scope namespace declarations.

Two stepping modes exist. [`Parser::next_token`] reports every construct as
its own event. [`Parser::next`] skips comments, processing instructions and
document type declarations and merges adjacent character data, CDATA
sections and entity references into a single text event.

Self-closing tags produce a start tag event followed by a synthetic end tag
event. An end tag leaves the depth unchanged; the element is popped at the
beginning of the following step.
*/
use std::fmt;
use std::io;

use log::{debug, trace, warn};

mod common;
mod namespaces;

pub use common::*;

use crate::context::Context;
use crate::encoding::DecodingReader;
use crate::errctx::*;
use crate::error::{Error, MarkupError, Result};
use crate::lexer::{CharRead, Construct, LegacyKind, Lexer, Position, Reference};
use crate::strings::Name;
use namespaces::{resolve_start_tag, ElementFrame, NamespaceStack};

/**
# XmlPull-style parser

Attach an input with [`Parser::attach`] (decoded characters) or
[`Parser::attach_bytes`] (bytes with encoding detection), then step through
the document with [`Parser::next`] or [`Parser::next_token`] and inspect
the current event through the accessor methods.

Errors while reading the document are fatal: once a step failed, every
further step returns the same error until a new input is attached.

## Example

```
use pullxml::{EventType, Parser, ParserOptions};
let mut p = Parser::with_options(ParserOptions::default().process_namespaces(true));
p.attach("<a xmlns='urn:x' k='v'>hi</a>");
assert_eq!(p.next().unwrap(), EventType::StartTag);
assert_eq!(p.name(), Some("a"));
assert_eq!(p.namespace(), Some("urn:x"));
assert_eq!(p.attribute_value_by_name(None, "k"), Some("v"));
assert_eq!(p.next().unwrap(), EventType::Text);
assert_eq!(p.text(), Some("hi"));
assert_eq!(p.next().unwrap(), EventType::EndTag);
assert_eq!(p.next().unwrap(), EventType::EndDocument);
```
*/
pub struct Parser<'x> {
	opts: ParserOptions,
	ctx: RcPtr<Context>,
	lexer: Option<Lexer<'x>>,
	encoding: Option<&'static str>,
	nss: NamespaceStack,
	elements: Vec<ElementFrame>,
	depth: usize,
	ty: EventType,
	namespace: Option<NamespaceName>,
	prefix: Option<Name>,
	name: Option<Name>,
	attributes: Vec<Attribute>,
	/// The current start tag was self-closing; the next step emits its end
	/// tag.
	degenerate: bool,
	/// The current entity reference could not be resolved.
	unresolved: bool,
	/// The current end tag still has to be popped off the element stack.
	pending_pop: bool,
	/// An end tag was consumed while merging text; the next step emits it.
	pending_end: bool,
	err: Option<Box<Error>>,
}

impl<'x> Parser<'x> {
	/// Create a parser with default options and a private [`Context`].
	pub fn new() -> Parser<'x> {
		Self::with_context_and_options(RcPtr::new(Context::new()), ParserOptions::default())
	}

	/// Create a parser with the given options and a private [`Context`].
	pub fn with_options(opts: ParserOptions) -> Parser<'x> {
		Self::with_context_and_options(RcPtr::new(Context::new()), opts)
	}

	/// Create a parser which interns namespace URIs in a shared context.
	pub fn with_context(ctx: RcPtr<Context>) -> Parser<'x> {
		Self::with_context_and_options(ctx, ParserOptions::default())
	}

	fn with_context_and_options(ctx: RcPtr<Context>, opts: ParserOptions) -> Parser<'x> {
		let nss = NamespaceStack::new(&ctx);
		Parser {
			opts,
			ctx,
			lexer: None,
			encoding: None,
			nss,
			elements: Vec::new(),
			depth: 0,
			ty: EventType::StartDocument,
			namespace: None,
			prefix: None,
			name: None,
			attributes: Vec::new(),
			degenerate: false,
			unresolved: false,
			pending_pop: false,
			pending_end: false,
			err: None,
		}
	}

	/// Start parsing from a source of decoded characters.
	///
	/// Resets all parsing state, including registered entities and a
	/// previous error.
	pub fn attach<R: CharRead + 'x>(&mut self, src: R) {
		self.reset(Lexer::new(Box::new(src), self.opts.relaxed), None);
	}

	/**
	Start parsing from a byte stream.

	With `encoding` set to `None`, the encoding is detected from byte order
	marks and the XML declaration (falling back to UTF-8). This may read the
	first bytes of the stream right away.

	Fails with [`Error::Encoding`] if the requested or declared encoding is
	not supported. On failure, the previous input remains attached.
	*/
	pub fn attach_bytes<R: io::Read + 'x>(&mut self, src: R, encoding: Option<&str>) -> Result<()> {
		let reader = DecodingReader::new(src, encoding)?;
		let encoding = reader.encoding();
		self.reset(Lexer::new(Box::new(reader), self.opts.relaxed), Some(encoding));
		Ok(())
	}

	fn reset(&mut self, lexer: Lexer<'x>, encoding: Option<&'static str>) {
		debug!(
			"attaching input (encoding: {}, namespaces: {}, relaxed: {})",
			encoding.unwrap_or("n/a"),
			self.opts.process_namespaces,
			self.opts.relaxed
		);
		self.lexer = Some(lexer);
		self.encoding = encoding;
		self.nss.reset();
		self.elements.clear();
		self.depth = 0;
		self.ty = EventType::StartDocument;
		self.namespace = None;
		self.prefix = None;
		self.name = None;
		self.attributes.clear();
		self.degenerate = false;
		self.unresolved = false;
		self.pending_pop = false;
		self.pending_end = false;
		self.err = None;
	}

	fn precondition<T: Into<String>>(&self, msg: T) -> Error {
		Error::Precondition(msg.into(), self.position())
	}

	fn check_poison(&self) -> Result<()> {
		match self.err.as_ref() {
			Some(e) => Err((**e).clone()),
			None => Ok(()),
		}
	}

	/// Run `f` with the lexer temporarily moved out of `self`.
	fn with_lexer<F>(&mut self, f: F) -> Result<EventType>
	where
		F: FnOnce(&mut Self, &mut Lexer<'x>) -> Result<EventType>,
	{
		self.check_poison()?;
		let mut lx = match self.lexer.take() {
			Some(lx) => lx,
			None => return Err(self.precondition("no input attached")),
		};
		let result = f(self, &mut lx);
		self.lexer = Some(lx);
		match result {
			Ok(ty) => {
				trace!("{}", self.position_description());
				Ok(ty)
			}
			Err(e) => {
				self.err = Some(Box::new(e.clone()));
				Err(e)
			}
		}
	}

	fn text_type(&self, lx: &Lexer<'x>) -> EventType {
		if self.depth == 0 && lx.text().is_whitespace() {
			EventType::IgnorableWhitespace
		} else {
			EventType::Text
		}
	}

	/// Consume one construct and update the current event.
	///
	/// The text buffer is not cleared here; that is up to the caller.
	fn step(&mut self, lx: &mut Lexer<'x>, token: bool) -> Result<EventType> {
		if self.pending_pop {
			self.pending_pop = false;
			self.elements.pop();
			self.depth = self.depth.saturating_sub(1);
			self.nss.pop_level(self.depth);
		}
		self.attributes.clear();
		self.unresolved = false;

		if self.degenerate {
			self.degenerate = false;
			self.ty = EventType::EndTag;
			self.pending_pop = true;
			return Ok(self.ty);
		}
		if self.pending_end {
			self.pending_end = false;
			self.ty = self.end_tag_event();
			return Ok(self.ty);
		}

		self.namespace = None;
		self.prefix = None;
		self.name = None;

		let ty = loop {
			match lx.peek_construct()? {
				Construct::Eof => {
					if let Some(top) = self.elements.last() {
						if !self.opts.relaxed {
							return Err(Error::UnexpectedEof(ERRCTX_CONTENT, lx.position()));
						}
						warn!(
							"end of stream with {} open element(s), innermost <{}>",
							self.elements.len(),
							top.raw_name
						);
						self.elements.clear();
						self.depth = 0;
						self.nss.reset();
					}
					break EventType::EndDocument;
				}
				Construct::StartTag => {
					let raw = lx.lex_start_tag()?;
					self.depth += 1;
					self.nss.push_level(self.depth);
					let (frame, attributes) = resolve_start_tag(
						&self.ctx,
						&mut self.nss,
						raw.name,
						raw.attributes,
						self.opts.process_namespaces,
						self.opts.relaxed,
						lx.position(),
					)?;
					self.namespace = frame.namespace.clone();
					self.prefix = frame.prefix.clone();
					self.name = Some(frame.local_name.clone());
					self.attributes = attributes;
					self.elements.push(frame);
					self.degenerate = raw.empty;
					break EventType::StartTag;
				}
				Construct::EndTag => {
					if !self.consume_end_tag(lx)? {
						continue;
					}
					break self.end_tag_event();
				}
				Construct::EntityRef => match lx.push_entity(false)? {
					Reference::Resolved(name) => {
						self.name = Some(Name::from(name));
						break EventType::EntityRef;
					}
					Reference::Unresolved(name) => {
						if !token {
							return Err(Error::UnresolvedEntity(name, lx.position()));
						}
						self.unresolved = true;
						self.name = Some(Name::from(name));
						break EventType::EntityRef;
					}
					Reference::Raw => break self.text_type(lx),
				},
				Construct::Text => {
					lx.push_content_text()?;
					break self.text_type(lx);
				}
				Construct::Legacy => {
					break match lx.lex_legacy(token)? {
						LegacyKind::ProcessingInstruction => EventType::ProcessingInstruction,
						LegacyKind::Comment => EventType::Comment,
						LegacyKind::CData => EventType::CdSect,
						LegacyKind::DocType => EventType::DocDecl,
					}
				}
			}
		};
		self.ty = ty;
		Ok(ty)
	}

	/// Consume an end tag and check it against the innermost element.
	///
	/// Returns false if the tag was skipped (relaxed mode only).
	fn consume_end_tag(&mut self, lx: &mut Lexer<'x>) -> Result<bool> {
		let found = lx.lex_end_tag()?;
		let matched = match self.elements.last() {
			Some(top) => {
				top.raw_name == found
					|| (self.opts.relaxed && top.raw_name.to_lowercase() == found.to_lowercase())
			}
			None => false,
		};
		if matched {
			return Ok(true);
		}
		if self.opts.relaxed {
			warn!("skipping unmatched end tag </{}> at {}", found, lx.position());
			return Ok(false);
		}
		let e = match self.elements.last() {
			Some(top) => MarkupError::ElementMismatch {
				expected: top.raw_name.clone(),
				found,
			},
			None => MarkupError::UnbalancedEndTag(found),
		};
		Err(Error::Malformed(e, lx.position()))
	}

	/// Report the innermost element as closed.
	fn end_tag_event(&mut self) -> EventType {
		if let Some(top) = self.elements.last() {
			self.namespace = top.namespace.clone();
			self.prefix = top.prefix.clone();
			self.name = Some(top.local_name.clone());
		}
		self.pending_pop = true;
		EventType::EndTag
	}

	fn coarse_step(&mut self, lx: &mut Lexer<'x>) -> Result<EventType> {
		lx.text_mut().clear();
		let mut text_like = false;
		loop {
			if text_like {
				match lx.peek_construct()? {
					Construct::Text | Construct::EntityRef | Construct::Legacy => (),
					// a skipped end tag must not split the text run
					Construct::EndTag if self.opts.relaxed => {
						if self.consume_end_tag(lx)? {
							self.pending_end = true;
							break;
						}
						continue;
					}
					_ => break,
				}
			}
			match self.step(lx, false)? {
				ty @ EventType::StartTag | ty @ EventType::EndTag | ty @ EventType::EndDocument => {
					return Ok(ty)
				}
				EventType::Comment | EventType::ProcessingInstruction | EventType::DocDecl => (),
				_ => text_like = true,
			}
		}
		self.name = None;
		self.ty = self.text_type(lx);
		Ok(self.ty)
	}

	/**
	Advance to the next structural event.

	Returns one of [`EventType::StartTag`], [`EventType::EndTag`],
	[`EventType::Text`], [`EventType::IgnorableWhitespace`] or
	[`EventType::EndDocument`]. Comments, processing instructions and the
	document type declaration are skipped. Adjacent character data, CDATA
	sections and entity references are reported as one text event.

	An entity reference which is neither built in nor registered is an
	[`Error::UnresolvedEntity`].
	*/
	pub fn next(&mut self) -> Result<EventType> {
		self.with_lexer(|p, lx| p.coarse_step(lx))
	}

	/**
	Advance to the next construct, whatever it is.

	Unlike [`Parser::next`], every comment, processing instruction, CDATA
	section and entity reference is reported on its own. Unknown entities
	are reported as [`EventType::EntityRef`] without text.
	*/
	pub fn next_token(&mut self) -> Result<EventType> {
		self.with_lexer(|p, lx| {
			lx.text_mut().clear();
			p.step(lx, true)
		})
	}

	/// Call [`Parser::next`], skipping a single whitespace-only text event,
	/// and require the result to be a start or end tag.
	pub fn next_tag(&mut self) -> Result<EventType> {
		let mut ty = self.next()?;
		if ty == EventType::IgnorableWhitespace || (ty == EventType::Text && self.is_whitespace()?) {
			ty = self.next()?;
		}
		match ty {
			EventType::StartTag | EventType::EndTag => Ok(ty),
			other => Err(self.precondition(format!("expected START_TAG or END_TAG, found {}", other))),
		}
	}

	/**
	Read the text content of a simple element.

	The current event must be a start tag. The element may contain text only;
	afterwards the parser is positioned on its end tag. An element without
	content yields the empty string.
	*/
	pub fn next_text(&mut self) -> Result<String> {
		if self.ty != EventType::StartTag {
			return Err(self.precondition(format!("expected START_TAG, found {}", self.ty)));
		}
		let mut ty = self.next()?;
		let result = if ty == EventType::Text {
			let text = self.text().unwrap_or("").to_string();
			ty = self.next()?;
			text
		} else {
			String::new()
		};
		if ty != EventType::EndTag {
			return Err(self.precondition(format!("expected END_TAG, found {}", ty)));
		}
		Ok(result)
	}

	/// Check the current event against type, namespace and name. `None`
	/// matches anything.
	pub fn require(&self, ty: EventType, namespace: Option<&str>, name: Option<&str>) -> Result<()> {
		let ns_ok = namespace.map_or(true, |ns| self.namespace() == Some(ns));
		let name_ok = name.map_or(true, |name| self.name() == Some(name));
		if self.ty == ty && ns_ok && name_ok {
			return Ok(());
		}
		Err(self.precondition(format!(
			"expected {} {{{}}}{}, found {}",
			ty,
			namespace.unwrap_or("*"),
			name.unwrap_or("*"),
			self.position_description()
		)))
	}

	/// Define an additional entity for the attached input.
	pub fn register_entity<N: Into<String>, V: Into<String>>(&mut self, name: N, replacement: V) -> Result<()> {
		let pos = self.position();
		match self.lexer.as_mut() {
			Some(lx) => {
				lx.define_entity(name.into(), replacement.into());
				Ok(())
			}
			None => Err(Error::Precondition("no input attached".to_string(), pos)),
		}
	}

	pub fn event_type(&self) -> EventType {
		self.ty
	}

	/// Local name of the current tag, or the name of the current entity
	/// reference.
	pub fn name(&self) -> Option<&str> {
		self.name.as_deref()
	}

	/// Namespace URI of the current tag.
	///
	/// Without namespace processing this is the empty string for every tag.
	pub fn namespace(&self) -> Option<&str> {
		self.namespace.as_deref()
	}

	pub fn prefix(&self) -> Option<&str> {
		self.prefix.as_deref()
	}

	/// Text of the current event.
	///
	/// `None` for tags, the document boundaries and unresolved entity
	/// references.
	pub fn text(&self) -> Option<&str> {
		if self.ty.is_structural() || self.unresolved {
			return None;
		}
		self.lexer.as_ref().map(|lx| lx.text().as_str())
	}

	/// Like [`Parser::text`], but yields the entity name for entity
	/// references.
	pub fn text_characters(&self) -> Option<&str> {
		match self.ty {
			EventType::EntityRef => self.name(),
			ty if ty.is_structural() => None,
			_ => self.lexer.as_ref().map(|lx| lx.text().as_str()),
		}
	}

	/// Whether the current text consists of whitespace only.
	///
	/// Only valid on text, ignorable whitespace and CDATA events.
	pub fn is_whitespace(&self) -> Result<bool> {
		match self.ty {
			EventType::Text | EventType::IgnorableWhitespace | EventType::CdSect => Ok(self
				.lexer
				.as_ref()
				.map_or(true, |lx| lx.text().is_whitespace())),
			other => Err(self.precondition(format!("is_whitespace() called on {}", other))),
		}
	}

	/// Whether the current start tag is self-closing.
	pub fn is_empty_element_tag(&self) -> Result<bool> {
		match self.ty {
			EventType::StartTag => Ok(self.degenerate),
			other => Err(self.precondition(format!("is_empty_element_tag() called on {}", other))),
		}
	}

	/// Element depth: 1 inside the root element (including its start and end
	/// tag), 0 outside.
	pub fn depth(&self) -> usize {
		self.depth
	}

	pub fn attribute_count(&self) -> usize {
		self.attributes.len()
	}

	pub fn attribute_name(&self, index: usize) -> Option<&str> {
		self.attributes.get(index).map(|a| a.name.as_str())
	}

	pub fn attribute_namespace(&self, index: usize) -> Option<&str> {
		self.attributes.get(index).and_then(|a| a.namespace.as_deref())
	}

	pub fn attribute_prefix(&self, index: usize) -> Option<&str> {
		self.attributes.get(index).and_then(|a| a.prefix.as_deref())
	}

	pub fn attribute_value(&self, index: usize) -> Option<&str> {
		self.attributes.get(index).map(|a| a.value.as_str())
	}

	/// Value of the attribute with the given local name. A `namespace` of
	/// `None` matches attributes in any namespace.
	pub fn attribute_value_by_name(&self, namespace: Option<&str>, name: &str) -> Option<&str> {
		self.attributes
			.iter()
			.find(|a| {
				a.name.as_str() == name && namespace.map_or(true, |ns| a.namespace.as_deref() == Some(ns))
			})
			.map(|a| a.value.as_str())
	}

	pub fn attributes(&self) -> &[Attribute] {
		&self.attributes
	}

	/// Number of namespace declarations in scope at `depth`, or `None` if
	/// `depth` exceeds the current depth.
	pub fn namespace_count(&self, depth: usize) -> Option<usize> {
		if depth > self.depth {
			return None;
		}
		self.nss.count(depth)
	}

	/// Prefix of the `pos`-th declaration; `Some(None)` for the default
	/// namespace.
	pub fn namespace_prefix(&self, pos: usize) -> Option<Option<&str>> {
		self.nss.prefix(pos)
	}

	pub fn namespace_uri(&self, pos: usize) -> Option<&str> {
		self.nss.uri(pos)
	}

	/// Resolve `prefix` (`None` for the default namespace) in the current
	/// scope.
	pub fn namespace_for_prefix(&self, prefix: Option<&str>) -> Option<&str> {
		self.nss.lookup(prefix).map(|uri| &**uri)
	}

	/// Position of the next unread character.
	pub fn position(&self) -> Position {
		self.lexer
			.as_ref()
			.map_or_else(Position::default, |lx| lx.position())
	}

	pub fn line(&self) -> usize {
		self.position().line()
	}

	pub fn column(&self) -> usize {
		self.position().column()
	}

	/// Human readable description of the current event and position, for
	/// diagnostics.
	pub fn position_description(&self) -> String {
		let mut buf = String::from(self.ty.name());
		match self.ty {
			EventType::StartTag | EventType::EndTag => {
				buf.push(' ');
				if self.ty == EventType::StartTag && self.degenerate {
					buf.push_str("(empty) ");
				}
				buf.push('<');
				if self.ty == EventType::EndTag {
					buf.push('/');
				}
				if let Some(prefix) = self.prefix.as_ref() {
					buf.push_str(&format!("{{{}}}{}:", self.namespace().unwrap_or(""), prefix));
				}
				buf.push_str(self.name().unwrap_or(""));
				for attr in self.attributes.iter() {
					buf.push(' ');
					if let Some(prefix) = attr.prefix.as_ref() {
						buf.push_str(&format!(
							"{{{}}}{}:",
							attr.namespace.as_deref().unwrap_or(""),
							prefix
						));
					}
					buf.push_str(&format!("{}='{}'", attr.name, attr.value));
				}
				buf.push('>');
			}
			EventType::IgnorableWhitespace => (),
			EventType::Text if self.is_whitespace().unwrap_or(false) => {
				buf.push_str(" (whitespace)");
			}
			EventType::Text => {
				let text = self.text().unwrap_or("");
				buf.push(' ');
				if text.chars().count() > 16 {
					buf.extend(text.chars().take(16));
					buf.push_str("...");
				} else {
					buf.push_str(text);
				}
			}
			_ => {
				if let Some(text) = self.text_characters().filter(|t| !t.is_empty()) {
					buf.push(' ');
					buf.push_str(text);
				}
			}
		}
		buf.push_str(&format!(" @{}", self.position()));
		buf
	}

	/// Name of the encoding used to decode the input, if it was attached
	/// with [`Parser::attach_bytes`].
	pub fn input_encoding(&self) -> Option<&'static str> {
		self.encoding
	}

	/// Owned snapshot of the current event.
	pub fn event(&self) -> Event {
		Event {
			event_type: self.ty,
			text: self.text().map(str::to_string),
			is_whitespace: self.is_whitespace().unwrap_or(false),
			namespace: self.namespace.clone(),
			prefix: self.prefix.clone(),
			name: self.name.clone(),
			attributes: self.attributes.clone(),
			depth: self.depth,
			position: self.position(),
		}
	}

	pub fn options(&self) -> ParserOptions {
		self.opts
	}

	pub fn context(&self) -> &RcPtr<Context> {
		&self.ctx
	}

	/// Enable or disable namespace processing. Takes effect with the next
	/// start tag.
	pub fn set_namespace_processing(&mut self, v: bool) {
		self.opts.process_namespaces = v;
	}

	pub fn set_relaxed(&mut self, v: bool) {
		self.opts.relaxed = v;
		if let Some(lx) = self.lexer.as_mut() {
			lx.set_relaxed(v);
		}
	}

	/// Set a feature by its XmlPull URI, see [`FEATURE_PROCESS_NAMESPACES`]
	/// and [`FEATURE_RELAXED`].
	pub fn set_feature(&mut self, name: &str, value: bool) -> Result<()> {
		match name {
			FEATURE_PROCESS_NAMESPACES => self.set_namespace_processing(value),
			FEATURE_RELAXED => self.set_relaxed(value),
			other => return Err(Error::UnsupportedFeature(other.to_string())),
		}
		Ok(())
	}

	pub fn feature(&self, name: &str) -> Result<bool> {
		match name {
			FEATURE_PROCESS_NAMESPACES => Ok(self.opts.process_namespaces),
			FEATURE_RELAXED => Ok(self.opts.relaxed),
			other => Err(Error::UnsupportedFeature(other.to_string())),
		}
	}
}

impl Default for Parser<'_> {
	fn default() -> Self {
		Self::new()
	}
}

impl fmt::Debug for Parser<'_> {
	fn fmt<'f>(&self, f: &'f mut fmt::Formatter) -> fmt::Result {
		f.debug_struct("Parser")
			.field("opts", &self.opts)
			.field("ty", &self.ty)
			.field("depth", &self.depth)
			.field("position", &self.position())
			.field("err", &self.err)
			.finish()
	}
}
