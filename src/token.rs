//! Tokens handed from the walker to visitors

use crate::namespaces::{Name, NamespaceScope};

/// An attribute of a start tag, with its value unescaped
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    /// Qualified name; unprefixed attributes have no namespace
    pub name: Name,
    /// Unescaped value
    pub value: String,
}

impl Attribute {
    /// Create a new attribute
    pub fn new(name: Name, value: impl Into<String>) -> Self {
        Self {
            name,
            value: value.into(),
        }
    }
}

/// A start tag
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartElement {
    /// Qualified name of the element
    pub name: Name,
    /// Attributes in document order, namespace declarations excluded
    pub attributes: Vec<Attribute>,
    /// Namespaces of the open elements, this one included
    pub scope: NamespaceScope,
}

impl StartElement {
    /// Get an attribute value by qualified name
    pub fn attribute(&self, name: &Name) -> Option<&str> {
        self.attributes
            .iter()
            .find(|attr| &attr.name == name)
            .map(|attr| attr.value.as_str())
    }
}

/// An end tag
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndElement {
    /// Qualified name of the element
    pub name: Name,
}

/// Character data, text and CDATA alike
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CharData {
    /// Unescaped text
    pub text: String,
}

/// One token of a document, in document order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    /// A start tag
    Start(StartElement),
    /// An end tag
    End(EndElement),
    /// Character data
    Text(CharData),
}
