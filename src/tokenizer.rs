//! Turning raw bytes into tokens
//!
//! The tokenizer drives a `quick_xml::Reader` over the whole input buffer,
//! resolves prefixes against the `xmlns` declarations in scope, lowercases
//! element and attribute local names, and keeps the [`NamespaceScope`] of the
//! open element chain. Empty elements are reported as a start tag followed by
//! an end tag. Comments, processing instructions and declarations are
//! dropped.
//!
//! Errors come in two kinds. A [`MalformedToken`] is a token the reader
//! accepted structurally but whose content cannot be decoded (a broken
//! attribute list, an unknown entity, invalid UTF-8); it carries the byte
//! range the walker may excise before retrying. Anything the reader itself
//! rejects is a structural [`Flags::SYNTAX`] error.

use crate::error::ParserError;
use crate::flags::Flags;
use crate::namespaces::{Name, NamespaceScope, PrefixBindings};
use crate::token::{Attribute, CharData, EndElement, StartElement, Token};
use log::{debug, trace};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::ops::Range;

/// A token whose content could not be decoded
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MalformedToken {
    /// Bytes of the input to drop before retrying, if they could be located
    pub range: Option<Range<usize>>,
    /// What was wrong, flagged with one of the [`Flags::TOKEN`] kinds
    pub error: ParserError,
}

/// Why the tokenizer stopped
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenError {
    /// Recoverable by excising bytes
    Malformed(MalformedToken),
    /// Malformed XML structure
    Syntax(ParserError),
}

/// Pull tokenizer over an in-memory document
pub struct Tokenizer<'a> {
    input: &'a [u8],
    reader: Reader<&'a [u8]>,
    bindings: PrefixBindings,
    scope: NamespaceScope,
    pending_end: Option<Name>,
}

impl<'a> Tokenizer<'a> {
    /// Create a tokenizer over `input`
    pub fn new(input: &'a [u8]) -> Self {
        let mut reader = Reader::from_reader(input);
        reader.trim_text(false);
        reader.check_end_names(true);

        Self {
            input,
            reader,
            bindings: PrefixBindings::new(),
            scope: NamespaceScope::new(),
            pending_end: None,
        }
    }

    /// Namespaces of the currently open elements
    pub fn scope(&self) -> &NamespaceScope {
        &self.scope
    }

    /// Read the next token; `Ok(None)` at end of input
    pub fn next_token(&mut self) -> Result<Option<Token>, TokenError> {
        if let Some(name) = self.pending_end.take() {
            return Ok(Some(self.close(name)));
        }

        loop {
            let event = self.reader.read_event().map_err(|e| {
                TokenError::Syntax(ParserError::new(
                    Flags::SYNTAX,
                    format!(
                        "XML syntax error at position {}: {}",
                        self.reader.buffer_position(),
                        e
                    ),
                ))
            })?;

            match event {
                Event::Start(e) => {
                    let start = self.open(&e)?;
                    return Ok(Some(Token::Start(start)));
                }
                Event::Empty(e) => {
                    let start = self.open(&e)?;
                    self.pending_end = Some(start.name.clone());
                    return Ok(Some(Token::Start(start)));
                }
                Event::End(e) => {
                    let name = self.resolve_element(e.name().as_ref());
                    return Ok(Some(self.close(name)));
                }
                Event::Text(e) => {
                    let range = span_of(self.input, &e);
                    let text = e
                        .unescape()
                        .map_err(|err| malformed(range, decode_flag(&err), "text", err))?;
                    return Ok(Some(Token::Text(CharData {
                        text: text.into_owned(),
                    })));
                }
                Event::CData(e) => {
                    let range = span_of(self.input, &e);
                    let text = String::from_utf8(e.into_inner().into_owned()).map_err(|err| {
                        malformed(range, Flags::ENCODING, "CDATA section", err)
                    })?;
                    return Ok(Some(Token::Text(CharData { text })));
                }
                Event::Eof => return Ok(None),
                _ => continue,
            }
        }
    }

    fn open(&mut self, e: &BytesStart<'a>) -> Result<StartElement, TokenError> {
        self.bindings.push_frame();
        let raw_attributes = match self.read_attributes(e) {
            Ok(attributes) => attributes,
            Err(err) => {
                self.bindings.pop_frame();
                return Err(err);
            }
        };

        let name = self.resolve_element(e.name().as_ref());
        let attributes = raw_attributes
            .into_iter()
            .map(|(key, value)| Attribute::new(self.resolve_attribute(&key), value))
            .collect();

        self.scope.push(name.namespace());
        trace!(target: "feedspec::tokenizer", "start {}", name);

        Ok(StartElement {
            name,
            attributes,
            scope: self.scope.clone(),
        })
    }

    fn close(&mut self, name: Name) -> Token {
        self.bindings.pop_frame();
        self.scope.pop(name.namespace());
        trace!(target: "feedspec::tokenizer", "end {}", name);
        Token::End(EndElement { name })
    }

    /// Read the attributes of a start tag, declaring `xmlns` bindings on the
    /// way; the remaining attributes are returned with their raw keys
    fn read_attributes(&mut self, e: &BytesStart<'a>) -> Result<Vec<(String, String)>, TokenError> {
        let range = attribute_span(self.input, e);
        let mut attributes = Vec::new();

        for attr in e.attributes() {
            let attr = attr.map_err(|err| {
                malformed(range.clone(), Flags::ATTRIBUTE_SYNTAX, "attribute list", err)
            })?;
            let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
            let value = attr
                .unescape_value()
                .map_err(|err| malformed(range.clone(), decode_flag(&err), "attribute value", err))?
                .into_owned();

            if key == "xmlns" {
                self.bindings.declare(None, value);
            } else if let Some(prefix) = key.strip_prefix("xmlns:") {
                self.bindings.declare(Some(prefix), value);
            } else {
                attributes.push((key, value));
            }
        }

        Ok(attributes)
    }

    fn resolve_element(&self, raw: &[u8]) -> Name {
        let raw = String::from_utf8_lossy(raw);
        match raw.split_once(':') {
            Some((prefix, local)) => Name::new(Some(self.resolve_prefix(prefix)), local),
            None => Name::new(self.bindings.resolve(None), &*raw),
        }
    }

    fn resolve_attribute(&self, raw: &str) -> Name {
        match raw.split_once(':') {
            Some((prefix, local)) => Name::new(Some(self.resolve_prefix(prefix)), local),
            None => Name::local(raw),
        }
    }

    fn resolve_prefix(&self, prefix: &str) -> String {
        match self.bindings.resolve(Some(prefix)) {
            Some(ns) => ns.to_string(),
            None => {
                debug!(target: "feedspec::tokenizer", "unbound prefix '{}'", prefix);
                prefix.to_string()
            }
        }
    }
}

fn malformed(
    range: Option<Range<usize>>,
    flag: Flags,
    what: &str,
    err: impl std::fmt::Display,
) -> TokenError {
    TokenError::Malformed(MalformedToken {
        range,
        error: ParserError::new(flag, format!("malformed {}: {}", what, err)),
    })
}

fn decode_flag(err: &quick_xml::Error) -> Flags {
    match err {
        quick_xml::Error::NonDecodable(_) => Flags::ENCODING,
        _ => Flags::ESCAPE,
    }
}

/// Position of `part` inside `input`, when `part` borrows from it
fn span_of(input: &[u8], part: &[u8]) -> Option<Range<usize>> {
    let start = (part.as_ptr() as usize).checked_sub(input.as_ptr() as usize)?;
    let end = start.checked_add(part.len())?;
    (end <= input.len()).then_some(start..end)
}

/// Bytes between the element name and the end of the tag (`>` or `/>`)
fn attribute_span(input: &[u8], e: &BytesStart<'_>) -> Option<Range<usize>> {
    let content = span_of(input, e)?;
    let name_len = e.name().as_ref().len();
    Some(content.start + name_len..content.end)
}
