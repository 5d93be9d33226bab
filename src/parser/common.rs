use std::fmt;
#[cfg(not(feature = "mt"))]
use std::rc::Rc;
#[cfg(feature = "mt")]
use std::sync::Arc;

use crate::lexer::Position;
use crate::strings::Name;

/// Wrapper pointer around namespace URIs
///
/// In builds with the `mt` feature, this is a [`Arc`]. In non-`mt` builds,
/// this is a [`std::rc::Rc`]
#[cfg(feature = "mt")]
pub type RcPtr<T> = Arc<T>;
/// Wrapper pointer around namespace URIs
///
/// In builds with the `mt` feature, this is a [`std::sync::Arc`].
/// In non-`mt` builds, this is a [`Rc`].
#[cfg(not(feature = "mt"))]
pub type RcPtr<T> = Rc<T>;

/// Shared namespace URI
pub type NamespaceName = RcPtr<str>;

/// XML core namespace URI (for the `xml:` prefix)
pub const XMLNS_XML: &'static str = "http://www.w3.org/XML/1998/namespace";
/// XML namespace URI (for the `xmlns:` prefix)
pub const XMLNS_XMLNS: &'static str = "http://www.w3.org/2000/xmlns/";

/// Feature name for namespace processing, see [`Parser::set_feature`](crate::Parser::set_feature).
pub const FEATURE_PROCESS_NAMESPACES: &'static str =
	"http://xmlpull.org/v1/doc/features.html#process-namespaces";
/// Feature name for relaxed parsing, see [`Parser::set_feature`](crate::Parser::set_feature).
pub const FEATURE_RELAXED: &'static str = "http://xmlpull.org/v1/doc/features.html#relaxed";

/**
# Kind of a parser event

[`Parser::next`](crate::Parser::next) only ever reports
[`StartDocument`](Self::StartDocument), [`StartTag`](Self::StartTag),
[`EndTag`](Self::EndTag), [`Text`](Self::Text),
[`IgnorableWhitespace`](Self::IgnorableWhitespace) and
[`EndDocument`](Self::EndDocument). The remaining kinds are only visible
through [`Parser::next_token`](crate::Parser::next_token).
*/
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventType {
	/// Initial state after attaching an input.
	StartDocument,
	/// The input is exhausted.
	EndDocument,
	StartTag,
	/// End of an element. Also emitted right after the start tag of a
	/// self-closing element.
	EndTag,
	/// Character data.
	Text,
	/// Content of a CDATA section.
	CdSect,
	/// An entity or character reference.
	EntityRef,
	/// Whitespace outside of the root element.
	IgnorableWhitespace,
	ProcessingInstruction,
	Comment,
	/// Document type declaration.
	DocDecl,
}

impl EventType {
	/// Name of the event type as used by XmlPull, e.g. `START_TAG`.
	pub fn name(&self) -> &'static str {
		match self {
			Self::StartDocument => "START_DOCUMENT",
			Self::EndDocument => "END_DOCUMENT",
			Self::StartTag => "START_TAG",
			Self::EndTag => "END_TAG",
			Self::Text => "TEXT",
			Self::CdSect => "CDSECT",
			Self::EntityRef => "ENTITY_REF",
			Self::IgnorableWhitespace => "IGNORABLE_WHITESPACE",
			Self::ProcessingInstruction => "PROCESSING_INSTRUCTION",
			Self::Comment => "COMMENT",
			Self::DocDecl => "DOCDECL",
		}
	}

	/// True for the events which carry no text at all.
	pub(crate) fn is_structural(&self) -> bool {
		match self {
			Self::StartDocument | Self::EndDocument | Self::StartTag | Self::EndTag => true,
			_ => false,
		}
	}
}

impl fmt::Display for EventType {
	fn fmt<'f>(&self, f: &'f mut fmt::Formatter) -> fmt::Result {
		f.write_str(self.name())
	}
}

/// Attribute of a start tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
	/// Namespace URI.
	///
	/// Unprefixed attributes have the empty namespace (`Some("")`). `None`
	/// only occurs in relaxed mode, for prefixes which could not be
	/// resolved.
	pub namespace: Option<NamespaceName>,
	/// Namespace prefix, if any.
	pub prefix: Option<Name>,
	/// Local name (or the full name if namespace processing is off).
	pub name: Name,
	/// Value with references expanded.
	pub value: String,
}

/**
# Owned snapshot of the current parser state

Obtained with [`Parser::event`](crate::Parser::event) or through
[`EventRead`](crate::EventRead).
*/
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
	pub event_type: EventType,
	/// Text content; `None` for tags, document boundaries and unresolved
	/// entity references.
	pub text: Option<String>,
	/// The text consists only of characters up to U+20.
	pub is_whitespace: bool,
	pub namespace: Option<NamespaceName>,
	pub prefix: Option<Name>,
	/// Local name for tags, entity name for entity references.
	pub name: Option<Name>,
	pub attributes: Vec<Attribute>,
	pub depth: usize,
	/// Position after the construct.
	pub position: Position,
}

/**
# Behavioural switches of a [`Parser`](crate::Parser)

Both are off by default.
*/
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ParserOptions {
	/// Resolve namespace prefixes and hide `xmlns` attributes.
	pub process_namespaces: bool,
	/// Recover from a number of well-formedness errors instead of failing:
	/// mismatched end tags, unquoted attribute values, undefined namespace
	/// prefixes, unknown entities in attribute values and malformed
	/// references.
	pub relaxed: bool,
}

impl ParserOptions {
	/// Set the [`ParserOptions::process_namespaces`] value.
	///
	/// # Example
	///
	/// ```
	/// use pullxml::{Parser, ParserOptions};
	/// let parser = Parser::with_options(ParserOptions::default().process_namespaces(true));
	/// ```
	pub fn process_namespaces(mut self, v: bool) -> ParserOptions {
		self.process_namespaces = v;
		self
	}

	/// Set the [`ParserOptions::relaxed`] value.
	pub fn relaxed(mut self, v: bool) -> ParserOptions {
		self.relaxed = v;
		self
	}
}
