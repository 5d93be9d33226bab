/*!
# Element and namespace bookkeeping

The [`NamespaceStack`] keeps all in-scope prefix bindings in one sequence
plus, per element depth, the number of bindings visible at that depth. Each
depth starts out with the count of its parent, so bindings of closed
elements drop out of scope without any lookups being affected.

[`resolve_start_tag`] turns a raw start tag into its namespace-resolved
form, declaring the `xmlns` attributes on the way.
*/
use std::borrow::Cow;

use log::warn;

use crate::context::Context;
use crate::error::{Error, MarkupError, Result};
use crate::lexer::{Position, RawAttribute};
use crate::strings::Name;

use super::common::{Attribute, NamespaceName, XMLNS_XML, XMLNS_XMLNS};

#[derive(Debug, Clone, PartialEq)]
struct NamespaceBinding {
	/// `None` for the default namespace.
	prefix: Option<Name>,
	uri: NamespaceName,
}

/// An open element.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ElementFrame {
	pub namespace: Option<NamespaceName>,
	pub prefix: Option<Name>,
	pub local_name: Name,
	/// The name as written, for matching the end tag.
	pub raw_name: Name,
}

#[derive(Debug)]
pub(crate) struct NamespaceStack {
	bindings: Vec<NamespaceBinding>,
	/// `counts[d]`: number of bindings visible at depth `d`.
	counts: Vec<usize>,
	empty: NamespaceName,
	xml: NamespaceName,
	xmlns: NamespaceName,
}

impl NamespaceStack {
	pub(crate) fn new(ctx: &Context) -> Self {
		Self {
			bindings: Vec::new(),
			counts: vec![0],
			empty: ctx.intern_namespace(""),
			xml: ctx.intern_namespace(Cow::Borrowed(XMLNS_XML)),
			xmlns: ctx.intern_namespace(Cow::Borrowed(XMLNS_XMLNS)),
		}
	}

	pub(crate) fn reset(&mut self) {
		self.bindings.clear();
		self.counts.clear();
		self.counts.push(0);
	}

	/// The empty namespace URI.
	pub(crate) fn empty(&self) -> &NamespaceName {
		&self.empty
	}

	/// Enter `depth` (≥ 1), inheriting the bindings of `depth - 1`.
	pub(crate) fn push_level(&mut self, depth: usize) {
		debug_assert!(depth >= 1);
		self.counts.truncate(depth);
		let inherited = self.counts.last().copied().unwrap_or(0);
		self.counts.push(inherited);
		self.bindings.truncate(inherited);
	}

	/// Return to `depth` after closing the element at `depth + 1`.
	pub(crate) fn pop_level(&mut self, depth: usize) {
		self.counts.truncate(depth + 1);
		let visible = self.counts.last().copied().unwrap_or(0);
		self.bindings.truncate(visible);
	}

	fn declare(&mut self, prefix: Option<Name>, uri: NamespaceName) {
		self.bindings.push(NamespaceBinding { prefix, uri });
		if let Some(count) = self.counts.last_mut() {
			*count += 1;
		}
	}

	/// Resolve `prefix` (`None`: default namespace) against the current
	/// scope, including the built-in `xml` and `xmlns` prefixes.
	pub(crate) fn lookup(&self, prefix: Option<&str>) -> Option<&NamespaceName> {
		match prefix {
			Some("xml") => return Some(&self.xml),
			Some("xmlns") => return Some(&self.xmlns),
			_ => (),
		}
		self.bindings
			.iter()
			.rev()
			.find(|b| b.prefix.as_deref() == prefix)
			.map(|b| &b.uri)
	}

	/// Number of bindings visible at `depth`, or `None` if `depth` is
	/// deeper than the current element.
	pub(crate) fn count(&self, depth: usize) -> Option<usize> {
		self.counts.get(depth).copied()
	}

	pub(crate) fn prefix(&self, pos: usize) -> Option<Option<&str>> {
		self.bindings.get(pos).map(|b| b.prefix.as_deref())
	}

	pub(crate) fn uri(&self, pos: usize) -> Option<&str> {
		self.bindings.get(pos).map(|b| &*b.uri)
	}
}

fn split_name(name: &Name, pos: Position) -> Result<(Option<Name>, Name)> {
	match name.find(':') {
		Some(0) => Err(Error::Malformed(MarkupError::LeadingColon(name.clone()), pos)),
		Some(cut) => Ok((Some(Name::from(&name[..cut])), Name::from(&name[cut + 1..]))),
		None => Ok((None, name.clone())),
	}
}

fn resolve_prefix(
	nss: &NamespaceStack,
	prefix: &Name,
	relaxed: bool,
	pos: Position,
) -> Result<Option<NamespaceName>> {
	match nss.lookup(Some(prefix)) {
		Some(uri) => Ok(Some(uri.clone())),
		None if relaxed => {
			warn!("undefined namespace prefix {:?} at {}", prefix, pos);
			Ok(None)
		}
		None => Err(Error::UndefinedPrefix(prefix.clone(), pos)),
	}
}

/**
Resolve the names of a start tag at the current depth.

The caller must have entered the element's depth with
[`NamespaceStack::push_level`] already. With namespace processing
disabled, names are kept verbatim and everything is in the empty
namespace.
*/
pub(crate) fn resolve_start_tag(
	ctx: &Context,
	nss: &mut NamespaceStack,
	raw_name: Name,
	raw_attributes: Vec<RawAttribute>,
	process_namespaces: bool,
	relaxed: bool,
	pos: Position,
) -> Result<(ElementFrame, Vec<Attribute>)> {
	if !process_namespaces {
		let empty = nss.empty().clone();
		let attributes = raw_attributes
			.into_iter()
			.map(|a| Attribute {
				namespace: Some(empty.clone()),
				prefix: None,
				name: a.name,
				value: a.value,
			})
			.collect();
		return Ok((
			ElementFrame {
				namespace: Some(empty),
				prefix: None,
				local_name: raw_name.clone(),
				raw_name,
			},
			attributes,
		));
	}

	let mut regular = Vec::with_capacity(raw_attributes.len());
	for attr in raw_attributes {
		if attr.name.as_str() == "xmlns" {
			nss.declare(None, ctx.intern_namespace(attr.value));
		} else if let Some(prefix) = attr.name.strip_prefix("xmlns:") {
			if attr.value.is_empty() {
				return Err(Error::Malformed(
					MarkupError::EmptyNamespaceUri(Name::from(prefix)),
					pos,
				));
			}
			nss.declare(Some(Name::from(prefix)), ctx.intern_namespace(attr.value));
		} else {
			regular.push(attr);
		}
	}

	let mut attributes: Vec<Attribute> = Vec::with_capacity(regular.len());
	for attr in regular {
		let (prefix, local_name) = split_name(&attr.name, pos)?;
		let namespace = match prefix.as_ref() {
			Some(prefix) => resolve_prefix(nss, prefix, relaxed, pos)?,
			None => Some(nss.empty().clone()),
		};
		if !relaxed
			&& attributes
				.iter()
				.any(|other| other.name == local_name && other.namespace == namespace)
		{
			return Err(Error::DuplicateAttribute(attr.name.to_string(), pos));
		}
		attributes.push(Attribute {
			namespace,
			prefix,
			name: local_name,
			value: attr.value,
		});
	}

	let (prefix, local_name) = split_name(&raw_name, pos)?;
	let namespace = match prefix.as_ref() {
		Some(prefix) => resolve_prefix(nss, prefix, relaxed, pos)?,
		None => Some(nss.lookup(None).unwrap_or(nss.empty()).clone()),
	};
	Ok((
		ElementFrame {
			namespace,
			prefix,
			local_name,
			raw_name,
		},
		attributes,
	))
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::error::ErrorKind;

	fn raw(attrs: &[(&str, &str)]) -> Vec<RawAttribute> {
		attrs
			.iter()
			.map(|(name, value)| RawAttribute {
				name: Name::from(*name),
				value: value.to_string(),
			})
			.collect()
	}

	fn pos() -> Position {
		Position::new(1, 1)
	}

	#[test]
	fn nested_scopes_inherit_and_drop_bindings() {
		let ctx = Context::new();
		let mut nss = NamespaceStack::new(&ctx);
		nss.push_level(1);
		nss.declare(Some(Name::from("a")), ctx.intern_namespace("urn:a"));
		nss.push_level(2);
		nss.declare(Some(Name::from("b")), ctx.intern_namespace("urn:b"));
		nss.declare(Some(Name::from("a")), ctx.intern_namespace("urn:a2"));
		assert_eq!(nss.count(1), Some(1));
		assert_eq!(nss.count(2), Some(3));
		assert_eq!(nss.lookup(Some("a")).map(|u| &**u), Some("urn:a2"));
		assert_eq!(nss.lookup(Some("b")).map(|u| &**u), Some("urn:b"));

		nss.pop_level(1);
		assert_eq!(nss.count(2), None);
		assert_eq!(nss.lookup(Some("a")).map(|u| &**u), Some("urn:a"));
		assert_eq!(nss.lookup(Some("b")), None);

		// a sibling reuses the slots
		nss.push_level(2);
		assert_eq!(nss.count(2), Some(1));
		assert_eq!(nss.lookup(Some("b")), None);
	}

	#[test]
	fn builtin_prefixes_always_resolve() {
		let ctx = Context::new();
		let nss = NamespaceStack::new(&ctx);
		assert_eq!(nss.lookup(Some("xml")).map(|u| &**u), Some(XMLNS_XML));
		assert_eq!(nss.lookup(Some("xmlns")).map(|u| &**u), Some(XMLNS_XMLNS));
		assert_eq!(nss.lookup(None), None);
	}

	#[test]
	fn resolution_without_processing_keeps_names() {
		let ctx = Context::new();
		let mut nss = NamespaceStack::new(&ctx);
		nss.push_level(1);
		let (frame, attrs) = resolve_start_tag(
			&ctx,
			&mut nss,
			Name::from("p:a"),
			raw(&[("xmlns:p", "urn:p"), ("p:x", "1")]),
			false,
			false,
			pos(),
		)
		.unwrap();
		assert_eq!(frame.local_name, "p:a");
		assert_eq!(frame.prefix, None);
		assert_eq!(frame.namespace.as_deref(), Some(""));
		assert_eq!(attrs.len(), 2);
		assert_eq!(attrs[0].name, "xmlns:p");
		assert_eq!(nss.count(1), Some(0));
	}

	#[test]
	fn declarations_are_removed_and_applied() {
		let ctx = Context::new();
		let mut nss = NamespaceStack::new(&ctx);
		nss.push_level(1);
		let (frame, attrs) = resolve_start_tag(
			&ctx,
			&mut nss,
			Name::from("p:a"),
			raw(&[("xmlns", "urn:d"), ("p:x", "1"), ("xmlns:p", "urn:p"), ("y", "2")]),
			true,
			false,
			pos(),
		)
		.unwrap();
		assert_eq!(frame.namespace.as_deref(), Some("urn:p"));
		assert_eq!(frame.prefix.as_deref(), Some("p"));
		assert_eq!(frame.local_name, "a");
		assert_eq!(attrs.len(), 2);
		assert_eq!(attrs[0].namespace.as_deref(), Some("urn:p"));
		assert_eq!(attrs[0].name, "x");
		// unprefixed attributes are not in the default namespace
		assert_eq!(attrs[1].namespace.as_deref(), Some(""));
		assert_eq!(nss.count(1), Some(2));
	}

	#[test]
	fn default_namespace_applies_to_elements() {
		let ctx = Context::new();
		let mut nss = NamespaceStack::new(&ctx);
		nss.push_level(1);
		let (frame, _) =
			resolve_start_tag(&ctx, &mut nss, Name::from("a"), raw(&[("xmlns", "urn:x")]), true, false, pos())
				.unwrap();
		assert_eq!(frame.namespace.as_deref(), Some("urn:x"));
		nss.push_level(2);
		let (frame, _) =
			resolve_start_tag(&ctx, &mut nss, Name::from("b"), raw(&[("xmlns", "")]), true, false, pos())
				.unwrap();
		assert_eq!(frame.namespace.as_deref(), Some(""));
	}

	#[test]
	fn undefined_prefix() {
		let ctx = Context::new();
		let mut nss = NamespaceStack::new(&ctx);
		nss.push_level(1);
		let err = resolve_start_tag(&ctx, &mut nss, Name::from("q:a"), Vec::new(), true, false, pos())
			.unwrap_err();
		assert_eq!(err.kind(), ErrorKind::UndefinedPrefix);

		let (frame, attrs) = resolve_start_tag(
			&ctx,
			&mut nss,
			Name::from("q:a"),
			raw(&[("q:x", "1")]),
			true,
			true,
			pos(),
		)
		.unwrap();
		assert_eq!(frame.namespace, None);
		assert_eq!(frame.local_name, "a");
		assert_eq!(attrs[0].namespace, None);
	}

	#[test]
	fn duplicate_after_resolution() {
		let ctx = Context::new();
		let mut nss = NamespaceStack::new(&ctx);
		nss.push_level(1);
		let err = resolve_start_tag(
			&ctx,
			&mut nss,
			Name::from("a"),
			raw(&[("xmlns:p", "urn:x"), ("xmlns:q", "urn:x"), ("p:x", "1"), ("q:x", "2")]),
			true,
			false,
			pos(),
		)
		.unwrap_err();
		match err {
			Error::DuplicateAttribute(name, _) => assert_eq!(name, "q:x"),
			other => panic!("unexpected error: {:?}", other),
		}
	}

	#[test]
	fn empty_prefixed_declaration_is_rejected() {
		let ctx = Context::new();
		let mut nss = NamespaceStack::new(&ctx);
		nss.push_level(1);
		let err = resolve_start_tag(&ctx, &mut nss, Name::from("a"), raw(&[("xmlns:p", "")]), true, true, pos())
			.unwrap_err();
		assert_eq!(err.kind(), ErrorKind::MalformedMarkup);
	}

	#[test]
	fn leading_colon_is_rejected_even_when_relaxed() {
		let ctx = Context::new();
		let mut nss = NamespaceStack::new(&ctx);
		nss.push_level(1);
		match resolve_start_tag(&ctx, &mut nss, Name::from(":a"), Vec::new(), true, true, pos()) {
			Err(Error::Malformed(MarkupError::LeadingColon(name), _)) => assert_eq!(name, ":a"),
			other => panic!("unexpected result: {:?}", other),
		}
	}
}
