//! Occurrence tracking and cardinality validation
//!
//! A grammar node keeps one [`Occurrence`] per child element or attribute it
//! cares about. The counter is bumped once per child start seen at the node's
//! own first nesting level and checked against its [`Cardinality`] when the
//! node's scope closes. Counters are scoped per element instance: the owning
//! node resets its [`OccurrenceCollection`] whenever its own start tag is seen.

use crate::error::{ErrorAggregator, ParserError};
use crate::flags::Flags;
use indexmap::IndexMap;

/// A plugged-in cardinality check: `(name, count)` to an optional error
pub type OccurrenceCheck = fn(&str, usize) -> Option<ParserError>;

/// Occurrence bounds (min, max); `None` for max means unbounded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bounds {
    /// Minimum number of occurrences
    pub min: usize,
    /// Maximum number of occurrences (None = unbounded)
    pub max: Option<usize>,
}

impl Bounds {
    /// Create new occurrence bounds
    pub fn new(min: usize, max: Option<usize>) -> Self {
        Self { min, max }
    }

    /// Exactly once (1, 1)
    pub fn once() -> Self {
        Self::new(1, Some(1))
    }

    /// Optional occurrence (0, 1)
    pub fn optional() -> Self {
        Self::new(0, Some(1))
    }

    /// Zero or more (0, unbounded)
    pub fn zero_or_more() -> Self {
        Self::new(0, None)
    }

    /// One or more (1, unbounded)
    pub fn one_or_more() -> Self {
        Self::new(1, None)
    }

    /// Check if occurrence count is under the minimum
    pub fn is_missing(&self, count: usize) -> bool {
        count < self.min
    }

    /// Check if occurrence count exceeds the maximum
    pub fn is_exceeded(&self, count: usize) -> bool {
        match self.max {
            Some(max) => count > max,
            None => false,
        }
    }

    /// Check if at most one occurrence is allowed
    pub fn is_single(&self) -> bool {
        matches!(self.max, Some(0) | Some(1))
    }
}

/// How many times a child may appear
#[derive(Debug, Clone, Copy)]
pub enum Cardinality {
    /// Any number of times, never an error
    Optional,
    /// At least once
    Exists,
    /// At most once
    Unique,
    /// Exactly once; existence is checked first
    ExistsAndUnique,
    /// Never
    Forbidden,
    /// Within explicit bounds
    Bounds(Bounds),
    /// A custom check
    Custom(OccurrenceCheck),
}

impl Cardinality {
    /// Check a count against this cardinality
    pub fn check(&self, name: &str, count: usize) -> Option<ParserError> {
        match self {
            Cardinality::Optional => None,
            Cardinality::Exists => exists(name, count),
            Cardinality::Unique => unique(name, count),
            Cardinality::ExistsAndUnique => exists_and_unique(name, count),
            Cardinality::Forbidden => forbidden(name, count),
            Cardinality::Bounds(bounds) => {
                if bounds.is_missing(count) {
                    Some(ParserError::new(
                        Flags::MISSING,
                        format!("{} should occur at least {} times", name, bounds.min),
                    ))
                } else if bounds.is_exceeded(count) {
                    Some(ParserError::new(
                        Flags::DUPLICATED,
                        format!(
                            "{} should occur at most {} times",
                            name,
                            bounds.max.unwrap_or_default()
                        ),
                    ))
                } else {
                    None
                }
            }
            Cardinality::Custom(check) => check(name, count),
        }
    }

    /// Check if at most one occurrence is accepted
    pub fn is_single(&self) -> bool {
        match self {
            Cardinality::Unique | Cardinality::ExistsAndUnique | Cardinality::Forbidden => true,
            Cardinality::Bounds(bounds) => bounds.is_single(),
            _ => false,
        }
    }
}

/// Zero occurrences is an error
pub fn exists(name: &str, count: usize) -> Option<ParserError> {
    (count == 0).then(|| ParserError::new(Flags::MISSING, format!("{} should exist", name)))
}

/// More than one occurrence is an error
pub fn unique(name: &str, count: usize) -> Option<ParserError> {
    (count > 1).then(|| ParserError::new(Flags::DUPLICATED, format!("{} should be unique", name)))
}

/// Exactly one occurrence; a missing child is reported before a duplicate
pub fn exists_and_unique(name: &str, count: usize) -> Option<ParserError> {
    exists(name, count).or_else(|| unique(name, count))
}

/// Any occurrence is an error
pub fn forbidden(name: &str, count: usize) -> Option<ParserError> {
    (count > 0).then(|| {
        ParserError::new(Flags::FORBIDDEN, format!("{} should not be present", name))
    })
}

/// A named counter with its cardinality
#[derive(Debug, Clone)]
pub struct Occurrence {
    name: String,
    count: usize,
    cardinality: Cardinality,
}

impl Occurrence {
    /// Create a zeroed counter
    pub fn new(name: impl Into<String>, cardinality: Cardinality) -> Self {
        Self {
            name: name.into(),
            count: 0,
            cardinality,
        }
    }

    /// Record one occurrence
    pub fn inc(&mut self) -> usize {
        self.count += 1;
        self.count
    }

    /// Zero the counter
    pub fn reset(&mut self) {
        self.count = 0;
    }

    /// Run the cardinality check against the current count
    pub fn validate(&self) -> Option<ParserError> {
        self.cardinality.check(&self.name, self.count)
    }

    /// Name being counted
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current count
    pub fn count(&self) -> usize {
        self.count
    }

    /// Cardinality of the counter
    pub fn cardinality(&self) -> Cardinality {
        self.cardinality
    }
}

/// Occurrences of one element, unique by name, in declaration order
#[derive(Debug, Clone, Default)]
pub struct OccurrenceCollection {
    occurrences: IndexMap<String, Occurrence>,
}

impl OccurrenceCollection {
    /// Create an empty collection
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a counter; an existing counter of the same name is replaced
    pub fn insert(&mut self, occurrence: Occurrence) {
        self.occurrences
            .insert(occurrence.name().to_string(), occurrence);
    }

    /// Record one occurrence of `name`; returns the new count, or None if
    /// nothing counts that name
    pub fn inc(&mut self, name: &str) -> Option<usize> {
        self.occurrences.get_mut(name).map(Occurrence::inc)
    }

    /// Current count for `name`
    pub fn count(&self, name: &str) -> usize {
        self.occurrences.get(name).map_or(0, Occurrence::count)
    }

    /// Get a counter by name
    pub fn get(&self, name: &str) -> Option<&Occurrence> {
        self.occurrences.get(name)
    }

    /// Zero every counter
    pub fn reset(&mut self) {
        self.occurrences.values_mut().for_each(Occurrence::reset);
    }

    /// Validate every counter and report all failures together
    pub fn validate(&self) -> Option<ParserError> {
        let mut agg = ErrorAggregator::new();
        self.validate_into(&mut agg);
        agg.finish()
    }

    /// Validate every counter into an existing aggregator
    pub fn validate_into(&self, agg: &mut ErrorAggregator) {
        for occurrence in self.occurrences.values() {
            agg.add(occurrence.validate());
        }
    }

    /// Number of counters
    pub fn len(&self) -> usize {
        self.occurrences.len()
    }

    /// Check if the collection holds no counters
    pub fn is_empty(&self) -> bool {
        self.occurrences.is_empty()
    }

    /// Iterate over the counters in declaration order
    pub fn iter(&self) -> impl Iterator<Item = &Occurrence> {
        self.occurrences.values()
    }
}
