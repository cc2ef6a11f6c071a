//! Pluggable namespace extensions
//!
//! A [`Manager`] maps parent tag names to [`Repository`] entries, each keyed
//! by the qualified name of an extension element or attribute. A grammar node
//! binds an [`Extensions`] view to the repository of its own tag; when it
//! meets a start tag or attribute from a foreign namespace it asks the view to
//! construct a handler. Handlers built this way are counted against the
//! cardinality they were registered with and their values land in the node's
//! [`Store`].

mod manager;
mod repository;
mod store;

pub use manager::Manager;
pub use repository::{
    AttributeConstructor, AttributeEntry, ElementConstructor, ElementEntry, Repository,
};
pub use store::Store;

use crate::error::{ErrorAggregator, ParserError};
use crate::namespaces::Name;
use crate::occurrence::OccurrenceCollection;
use crate::token::Attribute;
use crate::visitor::{ParentRef, Visitor, VisitorRef};
use log::debug;
use std::any::Any;
use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;

/// An extension element: the visitor the walker drives, and the same object
/// as a value callers can downcast
#[derive(Clone)]
pub struct ExtensionHandle {
    visitor: VisitorRef,
    value: Rc<dyn Any>,
}

impl ExtensionHandle {
    /// Wrap a visitor
    pub fn new<V: Visitor + 'static>(visitor: V) -> Self {
        Self::from_shared(Rc::new(RefCell::new(visitor)))
    }

    /// Wrap an already shared visitor
    pub fn from_shared<V: Visitor + 'static>(shared: Rc<RefCell<V>>) -> Self {
        let visitor: VisitorRef = shared.clone();
        let value: Rc<dyn Any> = shared;
        Self { visitor, value }
    }

    /// Visitor driven by the walker
    pub fn visitor(&self) -> VisitorRef {
        Rc::clone(&self.visitor)
    }

    /// The visitor as its concrete type
    pub fn downcast<T: 'static>(&self) -> Option<Rc<RefCell<T>>> {
        Rc::clone(&self.value).downcast::<RefCell<T>>().ok()
    }
}

impl std::fmt::Debug for ExtensionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExtensionHandle").finish_non_exhaustive()
    }
}

/// Value of an extension attribute
pub trait ExtensionAttribute: Any {
    /// Set the value from the attribute text; an error is reported but the
    /// attribute is kept
    fn set(&mut self, value: &str) -> Option<ParserError>;

    /// Attribute text as set
    fn text(&self) -> &str;

    /// Self as [`Any`], for downcasting
    fn as_any(&self) -> &dyn Any;
}

/// Extension attribute keeping its text as is
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextAttribute {
    /// Attribute text
    pub value: String,
}

impl ExtensionAttribute for TextAttribute {
    fn set(&mut self, value: &str) -> Option<ParserError> {
        self.value = value.to_string();
        None
    }

    fn text(&self) -> &str {
        &self.value
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// A grammar node's view of the extensions registered for its tag
#[derive(Debug, Default)]
pub struct Extensions {
    manager: Option<Arc<Manager>>,
    repository: Option<Arc<Repository>>,
    element_occurrences: OccurrenceCollection,
    attribute_occurrences: OccurrenceCollection,
    store: Store,
}

impl Extensions {
    /// A view that recognises nothing
    pub fn unbound() -> Self {
        Self::default()
    }

    /// Bind to the repository of `tag`
    pub fn bind(manager: Option<&Arc<Manager>>, tag: &str) -> Self {
        let Some(manager) = manager else {
            return Self::unbound();
        };
        let repository = manager.repository(tag).cloned();
        let (element_occurrences, attribute_occurrences) = repository
            .as_ref()
            .map(|repository| {
                (
                    repository.element_occurrences(),
                    repository.attribute_occurrences(),
                )
            })
            .unwrap_or_default();

        Self {
            manager: Some(Arc::clone(manager)),
            repository,
            element_occurrences,
            attribute_occurrences,
            store: Store::new(),
        }
    }

    /// Check if a repository was found for the tag
    pub fn is_bound(&self) -> bool {
        self.repository.is_some()
    }

    /// Zero the counters and drop stored values
    pub fn reset(&mut self) {
        self.element_occurrences.reset();
        self.attribute_occurrences.reset();
        self.store.clear();
    }

    /// Build the visitor of a foreign element, if one is registered
    ///
    /// The element is counted and stored before the visitor is returned.
    pub fn construct_element(&mut self, name: &Name, parent: ParentRef) -> Option<VisitorRef> {
        let (Some(manager), Some(repository)) = (&self.manager, &self.repository) else {
            debug!(target: "feedspec::extensions", "no extensions bound for {}", name);
            return None;
        };
        let Some(entry) = repository.element(name) else {
            debug!(
                target: "feedspec::extensions",
                "no extension {} under {}",
                name,
                repository.tag()
            );
            return None;
        };

        let handle = (entry.constructor)(parent, manager);
        let visitor = handle.visitor();
        self.element_occurrences.inc(&name.to_string());
        self.store.push_element(name.clone(), handle);
        Some(visitor)
    }

    /// Set a foreign attribute, if one is registered
    ///
    /// Returns `Ok(false)` when nothing handles the attribute.
    pub fn process_attribute(&mut self, attribute: &Attribute) -> Result<bool, ParserError> {
        let Some(entry) = self
            .repository
            .as_ref()
            .and_then(|repository| repository.attribute(&attribute.name))
        else {
            return Ok(false);
        };

        let mut value = (entry.constructor)();
        let error = value.set(&attribute.value);
        self.attribute_occurrences.inc(&attribute.name.to_string());
        self.store.set_attribute(attribute.name.clone(), value);
        match error {
            Some(error) => Err(error),
            None => Ok(true),
        }
    }

    /// Check every extension against its registered cardinality
    pub fn validate(&self, agg: &mut ErrorAggregator) {
        self.element_occurrences.validate_into(agg);
        self.attribute_occurrences.validate_into(agg);
    }

    /// Values found so far
    pub fn store(&self) -> &Store {
        &self.store
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flags::Flags;
    use crate::grammar::{Element, ElementRule};
    use crate::occurrence::Cardinality;
    use crate::visitor::orphan;

    /// Attribute accepting only digits
    #[derive(Default)]
    struct Count(String);

    impl ExtensionAttribute for Count {
        fn set(&mut self, value: &str) -> Option<ParserError> {
            self.0 = value.to_string();
            (!value.chars().all(|c| c.is_ascii_digit()))
                .then(|| ParserError::new(Flags::VALUE, format!("{} is not a count", value)))
        }

        fn text(&self) -> &str {
            &self.0
        }

        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    fn manager() -> Arc<Manager> {
        let mut manager = Manager::new();
        manager
            .register_element_rule(
                "entry",
                Name::namespaced("urn:x", "rating"),
                Cardinality::Unique,
                ElementRule::leaf("rating"),
            )
            .unwrap();
        manager
            .register_attribute(
                "entry",
                Name::namespaced("urn:x", "count"),
                Cardinality::Optional,
                || Box::new(Count::default()),
            )
            .unwrap();
        Arc::new(manager)
    }

    #[test]
    fn test_unbound_recognises_nothing() {
        let mut extensions = Extensions::bind(None, "entry");
        assert!(!extensions.is_bound());
        assert!(extensions
            .construct_element(&Name::namespaced("urn:x", "rating"), orphan())
            .is_none());

        let mut extensions = Extensions::bind(Some(&manager()), "feed");
        assert!(!extensions.is_bound());
        assert!(extensions
            .construct_element(&Name::namespaced("urn:x", "rating"), orphan())
            .is_none());
    }

    #[test]
    fn test_construct_counts_and_stores() {
        let name = Name::namespaced("urn:x", "rating");
        let mut extensions = Extensions::bind(Some(&manager()), "Entry");
        assert!(extensions.construct_element(&name, orphan()).is_some());
        assert!(extensions.construct_element(&name, orphan()).is_some());

        assert_eq!(extensions.store().elements(&name).unwrap().len(), 2);
        assert!(extensions.store().element_as::<Element>(&name).is_some());

        let mut agg = ErrorAggregator::new();
        extensions.validate(&mut agg);
        assert!(agg.finish().unwrap().has(Flags::DUPLICATED));

        extensions.reset();
        assert!(extensions.store().is_empty());
        let mut agg = ErrorAggregator::new();
        extensions.validate(&mut agg);
        assert!(agg.is_empty());
    }

    #[test]
    fn test_attributes() {
        let name = Name::namespaced("urn:x", "count");
        let mut extensions = Extensions::bind(Some(&manager()), "entry");

        assert_eq!(
            extensions.process_attribute(&Attribute::new(name.clone(), "12")),
            Ok(true)
        );
        assert_eq!(extensions.store().attribute(&name).unwrap().text(), "12");

        let err = extensions
            .process_attribute(&Attribute::new(name.clone(), "many"))
            .unwrap_err();
        assert!(err.has(Flags::VALUE));
        assert_eq!(extensions.store().attribute(&name).unwrap().text(), "many");

        assert_eq!(
            extensions.process_attribute(&Attribute::new(Name::namespaced("urn:y", "z"), "1")),
            Ok(false)
        );
    }

    #[test]
    fn test_attribute_does_not_count_as_element() {
        let name = Name::namespaced("urn:x", "rating");
        let mut manager = Manager::new();
        manager
            .register_element_rule(
                "entry",
                name.clone(),
                Cardinality::Unique,
                ElementRule::leaf("rating"),
            )
            .unwrap();
        manager
            .register_attribute("entry", name.clone(), Cardinality::Unique, || {
                Box::new(TextAttribute::default())
            })
            .unwrap();
        let mut extensions = Extensions::bind(Some(&Arc::new(manager)), "entry");

        assert!(extensions.construct_element(&name, orphan()).is_some());
        assert_eq!(extensions.process_attribute(&Attribute::new(name.clone(), "a")), Ok(true));
        let mut agg = ErrorAggregator::new();
        extensions.validate(&mut agg);
        assert!(agg.is_empty());

        assert!(extensions.construct_element(&name, orphan()).is_some());
        let mut agg = ErrorAggregator::new();
        extensions.validate(&mut agg);
        assert!(agg.finish().unwrap().has(Flags::DUPLICATED));
    }

    #[test]
    fn test_handle_downcast() {
        let handle = ExtensionHandle::from_shared(Element::root(ElementRule::leaf("x"), None));
        assert!(handle.downcast::<Element>().is_some());
        assert!(handle.downcast::<TextAttribute>().is_none());
    }
}
