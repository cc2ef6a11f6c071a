//! # feedspec
//!
//! A specification-conformance parsing and validation engine for Atom/RSS
//! style XML feed grammars.
//!
//! The engine walks a document token by token, hands every token to the
//! grammar node currently in charge (a [`Visitor`]), and lets each node report
//! everything wrong with its own element when it closes. Which violations
//! abort the walk is decided per element name by an [`ErrorChecker`], so a
//! caller can validate strictly against a feed format while waiving named
//! violations for named elements.
//!
//! ## Features
//!
//! - Streaming walker with bounded recovery from malformed tokens
//! - Visitor protocol with per-node depth tracking
//! - Cardinality validation of children, attributes and extensions
//! - Flag-based error taxonomy with per-element suppression
//! - Namespace extensions registered per parent tag
//! - A data-driven grammar kit to declare concrete grammars
//!
//! ## Example
//!
//! ```rust,ignore
//! use feedspec::{walk, Cardinality, Element, ElementRule, ErrorChecker, Flags};
//!
//! let entry = ElementRule::new("entry")
//!     .child(ElementRule::leaf("id"), Cardinality::ExistsAndUnique)
//!     .child(ElementRule::leaf("updated"), Cardinality::ExistsAndUnique);
//! let root = Element::root(entry, None);
//!
//! let mut checker = ErrorChecker::strict();
//! checker.disable("entry", Flags::MISSING);
//!
//! walk("<entry><id>1</id></entry>".as_bytes(), root.clone(), &checker, 8)?;
//! assert_eq!(root.borrow().child_text("id").as_deref(), Some("1"));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

// Foundation
pub mod error;
pub mod flags;
pub mod limits;

// Names and tokens
pub mod namespaces;
pub mod token;
pub mod tokenizer;

// Visitor protocol
pub mod depth;
pub mod occurrence;
pub mod visitor;

// Error suppression
pub mod checker;

// Extension registry
pub mod extensions;

// Driving
pub mod walker;

// Grammar kit
pub mod grammar;

// Re-exports for convenience
pub use checker::{CheckerConfig, ErrorChecker, ALL_ELEMENTS};
pub use depth::{Depth, DepthWatcher};
pub use error::{Error, ErrorAggregator, ParserError, Result};
pub use extensions::{
    ExtensionAttribute, ExtensionHandle, Extensions, Manager, Repository, Store, TextAttribute,
};
pub use flags::{FlagRegistry, Flags};
pub use grammar::{Element, ElementRef, ElementRule, Snapshot};
pub use limits::Limits;
pub use namespaces::{Name, NamespaceScope};
pub use occurrence::{Bounds, Cardinality, Occurrence, OccurrenceCollection};
pub use token::{Attribute, CharData, EndElement, StartElement, Token};
pub use visitor::{Next, ParentRef, Step, Visitor, VisitorRef};
pub use walker::{walk, Walker};

/// Version of the feedspec library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Atom 1.0 namespace
pub const ATOM_NAMESPACE: &str = "http://www.w3.org/2005/Atom";
