//! Extension constructors registered for one parent tag

use super::manager::Manager;
use super::{ExtensionAttribute, ExtensionHandle};
use crate::error::{Error, Result};
use crate::grammar::{Element, ElementRule};
use crate::namespaces::Name;
use crate::occurrence::{Cardinality, Occurrence, OccurrenceCollection};
use crate::visitor::ParentRef;
use indexmap::IndexMap;
use std::sync::Arc;

/// Builds the visitor of an extension element
///
/// Receives the grammar node the element is found under and the manager the
/// node is bound to, so rule-built extensions can carry extensions of their
/// own.
pub type ElementConstructor =
    Arc<dyn Fn(ParentRef, &Arc<Manager>) -> ExtensionHandle + Send + Sync>;

/// Builds an empty extension attribute
pub type AttributeConstructor = Arc<dyn Fn() -> Box<dyn ExtensionAttribute> + Send + Sync>;

/// A registered extension element
#[derive(Clone)]
pub struct ElementEntry {
    /// Visitor factory
    pub constructor: ElementConstructor,
    /// How many times the element may appear under one parent
    pub cardinality: Cardinality,
}

/// A registered extension attribute
#[derive(Clone)]
pub struct AttributeEntry {
    /// Value factory
    pub constructor: AttributeConstructor,
    /// Whether the attribute must or must not appear
    pub cardinality: Cardinality,
}

/// Extensions of one parent tag, keyed by qualified name
#[derive(Clone, Default)]
pub struct Repository {
    tag: String,
    elements: IndexMap<Name, ElementEntry>,
    attributes: IndexMap<Name, AttributeEntry>,
}

impl Repository {
    /// Create an empty repository for `tag`
    pub fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_lowercase(),
            ..Self::default()
        }
    }

    /// Parent tag the repository extends
    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Register an extension element
    pub fn register_element<F>(
        &mut self,
        name: Name,
        cardinality: Cardinality,
        constructor: F,
    ) -> Result<()>
    where
        F: Fn(ParentRef, &Arc<Manager>) -> ExtensionHandle + Send + Sync + 'static,
    {
        if self.elements.contains_key(&name) {
            return Err(self.duplicate(&name));
        }
        self.elements.insert(
            name,
            ElementEntry {
                constructor: Arc::new(constructor),
                cardinality,
            },
        );
        Ok(())
    }

    /// Register an extension element parsed by a grammar rule
    pub fn register_element_rule(
        &mut self,
        name: Name,
        cardinality: Cardinality,
        rule: ElementRule,
    ) -> Result<()> {
        let rule = Arc::new(rule);
        self.register_element(name, cardinality, move |parent, manager| {
            ExtensionHandle::from_shared(Element::new(
                Arc::clone(&rule),
                Some(Arc::clone(manager)),
                parent,
            ))
        })
    }

    /// Register an extension attribute
    pub fn register_attribute<F>(
        &mut self,
        name: Name,
        cardinality: Cardinality,
        constructor: F,
    ) -> Result<()>
    where
        F: Fn() -> Box<dyn ExtensionAttribute> + Send + Sync + 'static,
    {
        if self.attributes.contains_key(&name) {
            return Err(self.duplicate(&name));
        }
        self.attributes.insert(
            name,
            AttributeEntry {
                constructor: Arc::new(constructor),
                cardinality,
            },
        );
        Ok(())
    }

    fn duplicate(&self, name: &Name) -> Error {
        Error::DuplicateExtension {
            parent: self.tag.clone(),
            name: name.to_string(),
        }
    }

    /// Look up an extension element
    pub fn element(&self, name: &Name) -> Option<&ElementEntry> {
        self.elements.get(name)
    }

    /// Look up an extension attribute
    pub fn attribute(&self, name: &Name) -> Option<&AttributeEntry> {
        self.attributes.get(name)
    }

    /// Fresh counters for every registered element
    pub fn element_occurrences(&self) -> OccurrenceCollection {
        counters(self.elements.iter().map(|(name, entry)| (name, entry.cardinality)))
    }

    /// Fresh counters for every registered attribute
    pub fn attribute_occurrences(&self) -> OccurrenceCollection {
        counters(self.attributes.iter().map(|(name, entry)| (name, entry.cardinality)))
    }

    /// Check if nothing is registered
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty() && self.attributes.is_empty()
    }
}

fn counters<'a>(entries: impl Iterator<Item = (&'a Name, Cardinality)>) -> OccurrenceCollection {
    let mut occurrences = OccurrenceCollection::new();
    for (name, cardinality) in entries {
        occurrences.insert(Occurrence::new(name.to_string(), cardinality));
    }
    occurrences
}

impl std::fmt::Debug for Repository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Repository")
            .field("tag", &self.tag)
            .field("elements", &self.elements.keys().collect::<Vec<_>>())
            .field("attributes", &self.attributes.keys().collect::<Vec<_>>())
            .finish()
    }
}
