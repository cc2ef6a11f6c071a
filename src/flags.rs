//! Error kind flags
//!
//! Every error kind is one bit in a [`Flags`] set. Flags compose by union and
//! are filtered by intersection, which is how the [`ErrorChecker`] decides
//! whether an error is fatal for a given element.
//!
//! The core error kinds occupy the low bits and are available as associated
//! constants. Grammars and extensions mint further kinds through an explicit
//! [`FlagRegistry`] built once at grammar bootstrap.
//!
//! [`ErrorChecker`]: crate::checker::ErrorChecker

use crate::error::{Error, Result};
use indexmap::IndexMap;
use std::fmt;
use std::ops::{BitAnd, BitAndAssign, BitOr, BitOrAssign, Not};

/// A set of error kinds, one bit per kind
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Flags(u64);

impl Flags {
    /// Malformed XML structure reported by the underlying reader
    pub const SYNTAX: Flags = Flags(1 << 0);
    /// Unreadable or oversized input
    pub const INPUT: Flags = Flags(1 << 1);
    /// A visitor received an end tag outside of its own scope
    pub const DESYNC: Flags = Flags(1 << 2);
    /// The malformed-token retry budget ran out
    pub const RETRY_EXHAUSTED: Flags = Flags(1 << 3);
    /// Malformed attribute list in a start tag
    pub const ATTRIBUTE_SYNTAX: Flags = Flags(1 << 4);
    /// Unresolvable character or entity reference
    pub const ESCAPE: Flags = Flags(1 << 5);
    /// Text or attribute value that is not valid UTF-8
    pub const ENCODING: Flags = Flags(1 << 6);
    /// A required child or attribute is absent
    pub const MISSING: Flags = Flags(1 << 7);
    /// A unique child or attribute appears more than once
    pub const DUPLICATED: Flags = Flags(1 << 8);
    /// A child that must not appear was present
    pub const FORBIDDEN: Flags = Flags(1 << 9);
    /// A leaf element contains a child element
    pub const UNEXPECTED_CHILD: Flags = Flags(1 << 10);
    /// Textual content failed its format check
    pub const VALUE: Flags = Flags(1 << 11);
    /// An element is not in its required namespace
    pub const NAMESPACE: Flags = Flags(1 << 12);

    /// Low-level token syntax kinds, the ones the walker retries on
    pub const TOKEN: Flags = Flags(Self::ATTRIBUTE_SYNTAX.0 | Self::ESCAPE.0 | Self::ENCODING.0);
    /// Kinds that are fatal regardless of checker settings
    pub const STRUCTURAL: Flags =
        Flags(Self::SYNTAX.0 | Self::INPUT.0 | Self::DESYNC.0 | Self::RETRY_EXHAUSTED.0);
    /// Grammar violations
    pub const GRAMMAR: Flags = Flags(
        Self::MISSING.0
            | Self::DUPLICATED.0
            | Self::FORBIDDEN.0
            | Self::UNEXPECTED_CHILD.0
            | Self::NAMESPACE.0,
    );

    /// Number of bits used by the core kinds
    pub const CORE_BITS: u32 = 13;

    /// Number of distinct kinds a set can hold
    pub const CAPACITY: u32 = u64::BITS;

    /// The empty set
    pub const fn empty() -> Self {
        Flags(0)
    }

    /// Every possible kind, including ones not minted yet
    pub const fn all() -> Self {
        Flags(u64::MAX)
    }

    /// The flag for a single bit
    pub const fn bit(index: u32) -> Self {
        Flags(1 << index)
    }

    /// Raw bit representation
    pub const fn bits(self) -> u64 {
        self.0
    }

    /// Check if no kind is set
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Kinds present in either set
    pub const fn union(self, other: Flags) -> Self {
        Flags(self.0 | other.0)
    }

    /// Kinds present in both sets
    pub const fn intersect(self, other: Flags) -> Self {
        Flags(self.0 & other.0)
    }

    /// Kinds of `self` that are not in `other`
    pub const fn exclude(self, other: Flags) -> Self {
        Flags(self.0 & !other.0)
    }

    /// Check if the sets share at least one kind
    pub const fn intersects(self, other: Flags) -> bool {
        self.0 & other.0 != 0
    }

    /// Check if every kind of `other` is in `self`
    pub const fn contains(self, other: Flags) -> bool {
        self.0 & other.0 == other.0
    }

    /// Iterate over the single-bit flags of this set
    pub fn iter(self) -> impl Iterator<Item = Flags> {
        (0..Self::CAPACITY)
            .map(Flags::bit)
            .filter(move |flag| self.contains(*flag))
    }
}

impl BitOr for Flags {
    type Output = Flags;

    fn bitor(self, rhs: Flags) -> Flags {
        self.union(rhs)
    }
}

impl BitOrAssign for Flags {
    fn bitor_assign(&mut self, rhs: Flags) {
        *self = self.union(rhs);
    }
}

impl BitAnd for Flags {
    type Output = Flags;

    fn bitand(self, rhs: Flags) -> Flags {
        self.intersect(rhs)
    }
}

impl BitAndAssign for Flags {
    fn bitand_assign(&mut self, rhs: Flags) {
        *self = self.intersect(rhs);
    }
}

impl Not for Flags {
    type Output = Flags;

    fn not(self) -> Flags {
        Flags(!self.0)
    }
}

impl fmt::Debug for Flags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Flags({:#b})", self.0)
    }
}

/// Allocator and name table for error kinds
///
/// A registry starts out knowing the core kinds and the umbrella names
/// `token`, `structural`, `grammar` and `all`. Grammars and extensions mint
/// their own kinds with [`FlagRegistry::mint`]; each call hands out the next
/// unused bit.
#[derive(Debug, Clone)]
pub struct FlagRegistry {
    next: u32,
    names: IndexMap<String, Flags>,
}

impl FlagRegistry {
    /// Create a registry holding the core kinds
    pub fn new() -> Self {
        let mut names = IndexMap::new();
        for (name, flag) in [
            ("syntax", Flags::SYNTAX),
            ("input", Flags::INPUT),
            ("desync", Flags::DESYNC),
            ("retry-exhausted", Flags::RETRY_EXHAUSTED),
            ("attribute-syntax", Flags::ATTRIBUTE_SYNTAX),
            ("escape", Flags::ESCAPE),
            ("encoding", Flags::ENCODING),
            ("missing", Flags::MISSING),
            ("duplicated", Flags::DUPLICATED),
            ("forbidden", Flags::FORBIDDEN),
            ("unexpected-child", Flags::UNEXPECTED_CHILD),
            ("value", Flags::VALUE),
            ("namespace", Flags::NAMESPACE),
            ("token", Flags::TOKEN),
            ("structural", Flags::STRUCTURAL),
            ("grammar", Flags::GRAMMAR),
            ("all", Flags::all()),
        ] {
            names.insert(name.to_string(), flag);
        }

        Self {
            next: Flags::CORE_BITS,
            names,
        }
    }

    /// Mint a new error kind under `name`
    pub fn mint(&mut self, name: impl Into<String>) -> Result<Flags> {
        let name = normalize(name.into());
        if self.names.contains_key(&name) {
            return Err(Error::DuplicateFlag(name));
        }
        if self.next >= Flags::CAPACITY {
            return Err(Error::FlagsExhausted(Flags::CAPACITY));
        }

        let flag = Flags::bit(self.next);
        self.next += 1;
        self.names.insert(name, flag);
        Ok(flag)
    }

    /// Name a composite of already known kinds
    pub fn alias(&mut self, name: impl Into<String>, flags: Flags) -> Result<()> {
        let name = normalize(name.into());
        if self.names.contains_key(&name) {
            return Err(Error::DuplicateFlag(name));
        }
        self.names.insert(name, flags);
        Ok(())
    }

    /// Look up a kind or composite by name
    pub fn get(&self, name: &str) -> Option<Flags> {
        self.names.get(&normalize(name.to_string())).copied()
    }

    /// Look up a kind by name, failing on unknown names
    pub fn resolve(&self, name: &str) -> Result<Flags> {
        self.get(name)
            .ok_or_else(|| Error::UnknownFlag(name.to_string()))
    }

    /// Names of the single kinds set in `flags`
    pub fn describe(&self, flags: Flags) -> Vec<&str> {
        self.names
            .iter()
            .filter(|(_, flag)| flag.bits().count_ones() == 1 && flags.contains(**flag))
            .map(|(name, _)| name.as_str())
            .collect()
    }
}

impl Default for FlagRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn normalize(name: String) -> String {
    name.trim().to_lowercase().replace('_', "-")
}
