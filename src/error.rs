/*!
# Error types

This module holds the error types returned by the various functions of this
crate.
*/
use std::error;
use std::fmt;
use std::io;
use std::ops::Deref;
use std::result::Result as StdResult;
use std::sync::Arc;

use crate::lexer::Position;
use crate::strings::Name;

/// Violation of the XML grammar which is not covered by one of the more
/// specific [`Error`] variants.
#[derive(Debug, Clone, PartialEq)]
pub enum MarkupError {
	/// Unicode codepoint which was not expected at that point in the
	/// grammar.
	///
	/// The contents are implementation details.
	UnexpectedChar(&'static str, char, Option<&'static [&'static str]>),

	/// A name was required, but the next character cannot start one.
	///
	/// The contents are implementation details.
	NameExpected(&'static str, char),

	/// An attribute value was not delimited by `'` or `"`.
	InvalidDelimiter(char),

	/// Ending tag name does not match opening tag.
	ElementMismatch {
		/// Qualified name of the innermost open element.
		expected: Name,
		/// Qualified name found in the end tag.
		found: Name,
	},

	/// End tag encountered while no element is open.
	UnbalancedEndTag(Name),

	/// Element or attribute name starts with a colon.
	LeadingColon(Name),

	/// A namespace prefix was bound to the empty URI.
	EmptyNamespaceUri(Name),

	/// Malformed character or entity reference.
	///
	/// Carries the reference body between `&` and `;`.
	InvalidReference(String),
}

impl fmt::Display for MarkupError {
	fn fmt<'f>(&self, f: &'f mut fmt::Formatter) -> fmt::Result {
		match self {
			Self::UnexpectedChar(ctx, ch, Some(opts)) if opts.len() > 0 => {
				write!(f, "U+{:x} not allowed {} (expected ", *ch as u32, ctx)?;
				if opts.len() == 1 {
					f.write_str(opts[0])?;
					f.write_str(")")
				} else {
					f.write_str("one of: ")?;
					for (i, opt) in opts.iter().enumerate() {
						if i > 0 {
							f.write_str(", ")?;
						}
						f.write_str(*opt)?;
					}
					f.write_str(")")
				}
			}
			Self::UnexpectedChar(ctx, ch, _) => {
				write!(f, "U+{:x} not allowed {}", *ch as u32, ctx)
			}
			Self::NameExpected(ctx, ch) => {
				write!(f, "name expected {}, found U+{:x}", ctx, *ch as u32)
			}
			Self::InvalidDelimiter(ch) => {
				write!(f, "invalid attribute value delimiter U+{:x}", *ch as u32)
			}
			Self::ElementMismatch { expected, found } => write!(
				f,
				"end tag </{}> does not match start tag <{}>",
				found, expected
			),
			Self::UnbalancedEndTag(name) => {
				write!(f, "end tag </{}> without open element", name)
			}
			Self::LeadingColon(name) => write!(f, "illegal name {:?}", name),
			Self::EmptyNamespaceUri(prefix) => {
				write!(f, "prefix {:?} bound to the empty namespace URI", prefix)
			}
			Self::InvalidReference(body) => write!(f, "invalid reference &{};", body),
		}
	}
}

/// [`std::sync::Arc`]-based around [`std::io::Error`] to allow cloning.
#[derive(Clone)]
pub struct IOErrorWrapper(Arc<io::Error>);

impl IOErrorWrapper {
	fn wrap(e: io::Error) -> IOErrorWrapper {
		IOErrorWrapper(Arc::new(e))
	}
}

impl fmt::Debug for IOErrorWrapper {
	fn fmt<'f>(&self, f: &'f mut fmt::Formatter) -> fmt::Result {
		fmt::Debug::fmt(&**self, f)
	}
}

impl fmt::Display for IOErrorWrapper {
	fn fmt<'f>(&self, f: &'f mut fmt::Formatter) -> fmt::Result {
		fmt::Display::fmt(&**self, f)
	}
}

impl PartialEq for IOErrorWrapper {
	fn eq(&self, other: &Self) -> bool {
		Arc::ptr_eq(&self.0, &other.0)
	}
}

impl AsRef<io::Error> for IOErrorWrapper {
	fn as_ref(&self) -> &io::Error {
		&*self.0
	}
}

impl Deref for IOErrorWrapper {
	type Target = io::Error;

	fn deref(&self) -> &io::Error {
		&*self.0
	}
}

/// Coarse classification of an [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
	/// See [`Error::IO`].
	IO,
	/// See [`Error::UnexpectedEof`].
	UnexpectedEof,
	/// See [`Error::Malformed`].
	MalformedMarkup,
	/// See [`Error::UndefinedPrefix`].
	UndefinedPrefix,
	/// See [`Error::DuplicateAttribute`].
	DuplicateAttribute,
	/// See [`Error::UnresolvedEntity`].
	UnresolvedEntity,
	/// See [`Error::Encoding`].
	Encoding,
	/// See [`Error::Precondition`].
	Precondition,
	/// See [`Error::UnsupportedFeature`].
	UnsupportedFeature,
}

/// Error types which may be returned from the parser.
///
/// Errors raised while reading the document are fatal: the parser returns
/// the same error from every further call to
/// [`Parser::next`](crate::Parser::next) and
/// [`Parser::next_token`](crate::Parser::next_token).
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
	/// The character source failed.
	IO(IOErrorWrapper),

	/// The stream ended in the middle of a construct.
	///
	/// The string indicates the context and should not be interpreted by
	/// user code.
	UnexpectedEof(&'static str, Position),

	/// A violation of the XML grammar.
	Malformed(MarkupError, Position),

	/// Use of a namespace prefix which has not been declared.
	///
	/// Only raised when namespace processing is enabled and the parser is
	/// not relaxed.
	UndefinedPrefix(Name, Position),

	/// Attribute was declared multiple times in the same element.
	///
	/// **Note:** This will also be emitted for namespaced attributes which
	/// resolve to the same `(uri, localname)` pair after prefix resolution.
	DuplicateAttribute(String, Position),

	/// Attempt to refer to an entity which was neither built in nor
	/// registered with [`Parser::register_entity`](crate::Parser::register_entity).
	UnresolvedEntity(String, Position),

	/// The requested or detected character encoding is not supported.
	Encoding(String),

	/// An operation was invoked on an event which does not support it.
	Precondition(String, Position),

	/// Unknown feature name passed to
	/// [`Parser::set_feature`](crate::Parser::set_feature) or
	/// [`Parser::feature`](crate::Parser::feature).
	UnsupportedFeature(String),
}

pub type Result<T> = StdResult<T, Error>;

impl Error {
	pub fn io(e: io::Error) -> Error {
		Error::IO(IOErrorWrapper::wrap(e))
	}

	/// Return the classification of this error.
	pub fn kind(&self) -> ErrorKind {
		match self {
			Self::IO(..) => ErrorKind::IO,
			Self::UnexpectedEof(..) => ErrorKind::UnexpectedEof,
			Self::Malformed(..) => ErrorKind::MalformedMarkup,
			Self::UndefinedPrefix(..) => ErrorKind::UndefinedPrefix,
			Self::DuplicateAttribute(..) => ErrorKind::DuplicateAttribute,
			Self::UnresolvedEntity(..) => ErrorKind::UnresolvedEntity,
			Self::Encoding(..) => ErrorKind::Encoding,
			Self::Precondition(..) => ErrorKind::Precondition,
			Self::UnsupportedFeature(..) => ErrorKind::UnsupportedFeature,
		}
	}

	/// Return the position in the document at which the error was detected,
	/// if the error is tied to one.
	pub fn position(&self) -> Option<Position> {
		match self {
			Self::UnexpectedEof(_, pos)
			| Self::Malformed(_, pos)
			| Self::UndefinedPrefix(_, pos)
			| Self::DuplicateAttribute(_, pos)
			| Self::UnresolvedEntity(_, pos)
			| Self::Precondition(_, pos) => Some(*pos),
			Self::IO(_) | Self::Encoding(_) | Self::UnsupportedFeature(_) => None,
		}
	}
}

impl From<io::Error> for Error {
	fn from(e: io::Error) -> Error {
		Error::io(e)
	}
}

impl fmt::Display for Error {
	fn fmt<'f>(&self, f: &'f mut fmt::Formatter) -> fmt::Result {
		match self {
			Error::IO(e) => write!(f, "I/O error: {}", e),
			Error::UnexpectedEof(ctx, pos) => write!(f, "unexpected eof {} @{}", ctx, pos),
			Error::Malformed(e, pos) => write!(f, "malformed markup: {} @{}", e, pos),
			Error::UndefinedPrefix(prefix, pos) => {
				write!(f, "undefined namespace prefix {:?} @{}", prefix, pos)
			}
			Error::DuplicateAttribute(name, pos) => {
				write!(f, "duplicate attribute {} @{}", name, pos)
			}
			Error::UnresolvedEntity(name, pos) => {
				write!(f, "unresolved entity &{}; @{}", name, pos)
			}
			Error::Encoding(msg) => write!(f, "invalid stream or encoding: {}", msg),
			Error::Precondition(msg, pos) => write!(f, "precondition failed: {} @{}", msg, pos),
			Error::UnsupportedFeature(name) => write!(f, "unsupported feature: {}", name),
		}
	}
}

impl error::Error for Error {
	fn source(&self) -> Option<&(dyn error::Error + 'static)> {
		match self {
			Error::IO(e) => Some(&**e),
			_ => None,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn kind_and_position_follow_variant() {
		let pos = Position::new(3, 7);
		let e = Error::Malformed(MarkupError::InvalidDelimiter('x'), pos);
		assert_eq!(e.kind(), ErrorKind::MalformedMarkup);
		assert_eq!(e.position(), Some(pos));

		let e = Error::Encoding("EBCDIC-XYZ".to_string());
		assert_eq!(e.kind(), ErrorKind::Encoding);
		assert_eq!(e.position(), None);
	}

	#[test]
	fn display_includes_line_and_column() {
		let e = Error::UnresolvedEntity("zzz".to_string(), Position::new(2, 5));
		assert_eq!(e.to_string(), "unresolved entity &zzz; @2:5");
	}

	#[test]
	fn unexpected_char_lists_alternatives() {
		let e = MarkupError::UnexpectedChar("in element header", 'x', Some(&["'>'", "'/>'"]));
		assert_eq!(
			e.to_string(),
			"U+78 not allowed in element header (expected one of: '>', '/>')"
		);
	}

	#[test]
	fn io_errors_are_cloneable_and_keep_source() {
		let e: Error = io::Error::new(io::ErrorKind::Other, "boom").into();
		let e2 = e.clone();
		assert_eq!(e, e2);
		assert!(error::Error::source(&e).is_some());
	}
}
