//! Reusable grammar kit
//!
//! Concrete feed grammars are declared as data: an [`ElementRule`] lists what
//! an element may contain, and [`Element`] is the visitor that parses and
//! validates any element against its rule.

mod elements;
mod rules;

pub use elements::{Element, ElementRef, Snapshot};
pub use rules::{not_empty, unsigned_integer, AttributeRule, ChildRule, ElementRule, ValueCheck};
