//! XML namespace handling
//!
//! This module provides qualified names, the prefix bindings the tokenizer
//! uses to resolve them, and the namespace scope the walker maintains for
//! the element chain currently open.

use std::collections::HashMap;
use std::fmt;

/// XML namespace
pub const XML_NAMESPACE: &str = "http://www.w3.org/XML/1998/namespace";

/// XMLNS namespace
pub const XMLNS_NAMESPACE: &str = "http://www.w3.org/2000/xmlns/";

/// Qualified name: namespace URI and lowercased local name
///
/// Local names are lowercased on construction, so every comparison between
/// element or attribute names is case-insensitive. Namespace URIs are kept
/// verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Name {
    /// Namespace URI (None for no namespace)
    pub namespace: Option<String>,
    /// Local name, lowercased
    pub local: String,
}

impl Name {
    /// Create a new name
    pub fn new(namespace: Option<impl Into<String>>, local: impl AsRef<str>) -> Self {
        Self {
            namespace: namespace.map(|ns| ns.into()).filter(|ns: &String| !ns.is_empty()),
            local: local.as_ref().to_lowercase(),
        }
    }

    /// Create a name without a namespace
    pub fn local(local: impl AsRef<str>) -> Self {
        Self::new(None::<String>, local)
    }

    /// Create a name in a namespace
    pub fn namespaced(namespace: impl Into<String>, local: impl AsRef<str>) -> Self {
        Self::new(Some(namespace), local)
    }

    /// Namespace URI, if any
    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    /// Check if both names are in the same namespace
    pub fn same_namespace(&self, other: &Name) -> bool {
        self.namespace == other.namespace
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.namespace {
            Some(ns) => write!(f, "{{{}}}{}", ns, self.local),
            None => write!(f, "{}", self.local),
        }
    }
}

/// Multiset of the namespace URIs of the currently open elements
///
/// The walker pushes an element's namespace when its start tag is read and
/// pops it on the matching end tag. Start tags carry a snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NamespaceScope {
    counts: HashMap<String, usize>,
}

impl NamespaceScope {
    /// Create an empty scope
    pub fn new() -> Self {
        Self::default()
    }

    /// Enter an element in `namespace`
    pub fn push(&mut self, namespace: Option<&str>) {
        if let Some(ns) = namespace {
            *self.counts.entry(ns.to_string()).or_insert(0) += 1;
        }
    }

    /// Leave an element in `namespace`
    pub fn pop(&mut self, namespace: Option<&str>) {
        if let Some(ns) = namespace {
            if let Some(count) = self.counts.get_mut(ns) {
                *count -= 1;
                if *count == 0 {
                    self.counts.remove(ns);
                }
            }
        }
    }

    /// Check if `namespace` is used by any open element
    pub fn contains(&self, namespace: &str) -> bool {
        self.counts.contains_key(namespace)
    }

    /// Check if no namespaced element is open
    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }
}

/// Prefix declarations of one element
#[derive(Debug, Clone, Default)]
struct Frame {
    prefixes: HashMap<String, String>,
    default_namespace: Option<String>,
}

/// Prefix to namespace bindings, scoped per element
#[derive(Debug, Clone, Default)]
pub struct PrefixBindings {
    frames: Vec<Frame>,
}

impl PrefixBindings {
    /// Create bindings with nothing declared
    pub fn new() -> Self {
        Self::default()
    }

    /// Open the scope of a new element
    pub fn push_frame(&mut self) {
        self.frames.push(Frame::default());
    }

    /// Close the scope of the innermost element
    pub fn pop_frame(&mut self) {
        self.frames.pop();
    }

    /// Declare a prefix on the innermost element; `None` sets the default
    pub fn declare(&mut self, prefix: Option<&str>, namespace: impl Into<String>) {
        if self.frames.is_empty() {
            self.push_frame();
        }
        if let Some(frame) = self.frames.last_mut() {
            match prefix {
                Some(p) => {
                    frame.prefixes.insert(p.to_string(), namespace.into());
                }
                None => frame.default_namespace = Some(namespace.into()),
            }
        }
    }

    /// Resolve a prefix; `None` resolves the default namespace
    ///
    /// An empty default declaration (`xmlns=""`) undeclares the default.
    pub fn resolve(&self, prefix: Option<&str>) -> Option<&str> {
        match prefix {
            Some("xml") => Some(XML_NAMESPACE),
            Some("xmlns") => Some(XMLNS_NAMESPACE),
            Some(p) => self
                .frames
                .iter()
                .rev()
                .find_map(|frame| frame.prefixes.get(p))
                .map(|s| s.as_str()),
            None => self
                .frames
                .iter()
                .rev()
                .find_map(|frame| frame.default_namespace.as_deref())
                .filter(|ns| !ns.is_empty()),
        }
    }
}
