/// Predicate over single characters, used by the lexer to consume runs.
pub trait CharSelector {
	fn select(&self, c: char) -> bool;
}

impl CharSelector for char {
	#[inline]
	fn select(&self, c: char) -> bool {
		*self == c
	}
}

impl CharSelector for &'_ [char] {
	#[inline]
	fn select(&self, c: char) -> bool {
		self.contains(&c)
	}
}

/// Select every character not matched by the inner selector.
pub struct InvertDelimiters<T>(pub T);

impl<T: CharSelector> CharSelector for InvertDelimiters<T> {
	#[inline]
	fn select(&self, c: char) -> bool {
		!self.0.select(c)
	}
}

/// Characters the lexer treats as whitespace: everything up to and
/// including U+20.
pub struct Whitespace;

impl CharSelector for Whitespace {
	#[inline]
	fn select(&self, c: char) -> bool {
		c <= ' '
	}
}

pub const DELIM_TEXT_STATE_EXIT: &'static [char] = &['<', '&'];

// start to end (incl., because some of our edge points are not valid chars
// in rust)
pub struct CodepointRange(char, char);

pub struct CodepointRanges(pub &'static [CodepointRange]);

// XML 1.0 § 2.3 [4]
const VALID_XML_NAME_START_RANGES: &'static [CodepointRange] = &[
	CodepointRange(':', ':'),
	CodepointRange('A', 'Z'),
	CodepointRange('_', '_'),
	CodepointRange('a', 'z'),
	CodepointRange('\u{c0}', '\u{d6}'),
	CodepointRange('\u{d8}', '\u{f6}'),
	CodepointRange('\u{f8}', '\u{2ff}'),
	CodepointRange('\u{370}', '\u{37d}'),
	CodepointRange('\u{37f}', '\u{1fff}'),
	CodepointRange('\u{200c}', '\u{200d}'),
	CodepointRange('\u{2070}', '\u{218f}'),
	CodepointRange('\u{2c00}', '\u{2fef}'),
	CodepointRange('\u{3001}', '\u{d7ff}'),
	CodepointRange('\u{f900}', '\u{fdcf}'),
	CodepointRange('\u{10000}', '\u{effff}'),
];

// XML 1.0 § 2.3 [4a]
const VALID_XML_NAME_RANGES: &'static [CodepointRange] = &[
	CodepointRange(':', ':'),
	CodepointRange('-', '-'),
	CodepointRange('.', '.'),
	CodepointRange('A', 'Z'),
	CodepointRange('_', '_'),
	CodepointRange('0', '9'),
	CodepointRange('a', 'z'),
	CodepointRange('\u{b7}', '\u{b7}'),
	CodepointRange('\u{c0}', '\u{d6}'),
	CodepointRange('\u{d8}', '\u{f6}'),
	CodepointRange('\u{f8}', '\u{2ff}'),
	CodepointRange('\u{300}', '\u{36f}'),
	CodepointRange('\u{370}', '\u{37d}'),
	CodepointRange('\u{37f}', '\u{1fff}'),
	CodepointRange('\u{200c}', '\u{200d}'),
	CodepointRange('\u{203f}', '\u{2040}'),
	CodepointRange('\u{2070}', '\u{218f}'),
	CodepointRange('\u{2c00}', '\u{2fef}'),
	CodepointRange('\u{3001}', '\u{d7ff}'),
	CodepointRange('\u{f900}', '\u{fdcf}'),
	CodepointRange('\u{10000}', '\u{effff}'),
];

pub const CLASS_XML_NAMESTART: CodepointRanges = CodepointRanges(VALID_XML_NAME_START_RANGES);
pub const CLASS_XML_NAME: CodepointRanges = CodepointRanges(VALID_XML_NAME_RANGES);

impl CodepointRange {
	pub fn contains(&self, c: char) -> bool {
		return (self.0 <= c) && (c <= self.1);
	}
}

impl CharSelector for CodepointRanges {
	fn select(&self, c: char) -> bool {
		self.0.iter().any(|r| r.contains(c))
	}
}

/// Whether `c` may appear in character data at all (XML 1.0 § 2.2).
pub fn is_xml_char(c: char) -> bool {
	match c {
		'\x09' | '\x0a' | '\x0d' => true,
		'\u{20}'..='\u{d7ff}' => true,
		'\u{e000}'..='\u{fffd}' => true,
		'\u{10000}'..='\u{10ffff}' => true,
		_ => false,
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn namestart_excludes_digits_and_punctuation() {
		assert!(CLASS_XML_NAMESTART.select('a'));
		assert!(CLASS_XML_NAMESTART.select(':'));
		assert!(CLASS_XML_NAMESTART.select('_'));
		assert!(CLASS_XML_NAMESTART.select('ä'));
		assert!(!CLASS_XML_NAMESTART.select('1'));
		assert!(!CLASS_XML_NAMESTART.select('-'));
		assert!(!CLASS_XML_NAMESTART.select('.'));
		assert!(!CLASS_XML_NAMESTART.select('\u{b7}'));
	}

	#[test]
	fn name_accepts_continuation_chars() {
		for c in "a1-._:\u{b7}\u{300}".chars() {
			assert!(CLASS_XML_NAME.select(c), "{:?}", c);
		}
		for c in " =>/;&\"'".chars() {
			assert!(!CLASS_XML_NAME.select(c), "{:?}", c);
		}
	}

	#[test]
	fn inverted_delimiters() {
		let sel = InvertDelimiters(DELIM_TEXT_STATE_EXIT);
		assert!(sel.select('x'));
		assert!(!sel.select('<'));
		assert!(!sel.select('&'));
	}

	#[test]
	fn xml_chars() {
		assert!(is_xml_char('A'));
		assert!(is_xml_char('\t'));
		assert!(!is_xml_char('\0'));
		assert!(!is_xml_char('\u{fffe}'));
	}
}
