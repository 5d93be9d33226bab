/*!
# Streaming pull-based XML tokenizer

This crate reads XML documents one construct at a time, driven by the
caller. The API follows the XmlPull model: a [`Parser`] is stepped with
[`Parser::next`] (structural events with merged text) or
[`Parser::next_token`] (every construct, including comments and entity
references), and the current event is inspected with accessor methods.

Features:

- Encoding detection from byte order marks and the XML declaration, see
  [`DecodingReader`].
- Line ending normalization and position tracking.
- Optional namespace processing.
- A relaxed mode which recovers from common errors in hand-written markup
  (unquoted attribute values, mismatched end tags, undefined prefixes).

What this crate does not do: validate against a DTD, expand entities
declared in the document type declaration, or write XML.

## Example

```
use pullxml::{EventType, Parser};
let doc: &[u8] = b"<?xml version='1.0'?>\n<greeting lang='en'>Hello &amp; welcome</greeting>";
let mut p = Parser::new();
p.attach_bytes(doc, None).unwrap();
assert_eq!(p.input_encoding(), Some("UTF-8"));
assert_eq!(p.next_tag().unwrap(), EventType::StartTag);
assert_eq!(p.attribute_value_by_name(None, "lang"), Some("en"));
assert_eq!(p.next_text().unwrap(), "Hello & welcome");
assert_eq!(p.next().unwrap(), EventType::EndDocument);
```

## Crate features

- `mt`: namespace URIs are shared with [`std::sync::Arc`] instead of
  [`std::rc::Rc`], making [`Context`] `Send` and `Sync`.
- `shared_ns`: namespace URIs are deduplicated in the [`Context`].
*/
mod errctx;

pub mod context;
pub mod encoding;
pub mod error;
pub mod lexer;
pub mod parser;
pub mod strings;


pub use context::Context;
pub use encoding::DecodingReader;
pub use error::{Error, ErrorKind, MarkupError, Result};
pub use lexer::{CharIter, CharRead, Position};
pub use parser::{
	Attribute, Event, EventType, NamespaceName, Parser, ParserOptions, RcPtr,
	FEATURE_PROCESS_NAMESPACES, FEATURE_RELAXED, XMLNS_XML, XMLNS_XMLNS,
};
pub use strings::Name;

/// Package version
pub const VERSION: &'static str = env!("CARGO_PKG_VERSION");

/**
# Read events one by one

Iterator-like interface on top of a pull parser: each call to
[`EventRead::read`] advances to the next structural event and returns an
owned snapshot of it.
*/
pub trait EventRead {
	type Output;

	/// Read a single event.
	///
	/// If the end of the document has been reached, `None` is returned.
	///
	/// Errors are fatal and will be returned again on the next invocation.
	fn read(&mut self) -> Result<Option<Self::Output>>;

	/// Read all remaining events, invoking `cb` for each of them.
	fn read_all<F>(&mut self, mut cb: F) -> Result<()>
	where
		F: FnMut(Self::Output) -> (),
	{
		loop {
			match self.read()? {
				None => return Ok(()),
				Some(ev) => cb(ev),
			}
		}
	}
}

impl EventRead for Parser<'_> {
	type Output = Event;

	/// Advance with [`Parser::next`] and return a snapshot of the event.
	fn read(&mut self) -> Result<Option<Event>> {
		match self.next()? {
			EventType::EndDocument => Ok(None),
			_ => Ok(Some(self.event())),
		}
	}
}
