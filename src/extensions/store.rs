//! Extension values discovered in one element instance

use super::{ExtensionAttribute, ExtensionHandle};
use crate::namespaces::Name;
use indexmap::IndexMap;
use std::cell::RefCell;
use std::rc::Rc;

/// Extension elements and attributes found under one grammar node
///
/// Elements are grouped by qualified name, each group in document order.
#[derive(Default)]
pub struct Store {
    elements: IndexMap<Name, Vec<ExtensionHandle>>,
    attributes: IndexMap<Name, Box<dyn ExtensionAttribute>>,
}

impl Store {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push_element(&mut self, name: Name, handle: ExtensionHandle) {
        self.elements.entry(name).or_default().push(handle);
    }

    pub(crate) fn set_attribute(&mut self, name: Name, attribute: Box<dyn ExtensionAttribute>) {
        self.attributes.insert(name, attribute);
    }

    /// Drop every stored value
    pub fn clear(&mut self) {
        self.elements.clear();
        self.attributes.clear();
    }

    /// Check if nothing was stored
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty() && self.attributes.is_empty()
    }

    /// First extension element stored under `name`
    pub fn element(&self, name: &Name) -> Option<&ExtensionHandle> {
        self.elements.get(name).and_then(|group| group.first())
    }

    /// Every extension element stored under `name`, in document order
    pub fn elements(&self, name: &Name) -> Option<&[ExtensionHandle]> {
        self.elements.get(name).map(|group| group.as_slice())
    }

    /// First extension element stored under `name`, as its concrete type
    pub fn element_as<T: 'static>(&self, name: &Name) -> Option<Rc<RefCell<T>>> {
        self.element(name).and_then(|handle| handle.downcast::<T>())
    }

    /// Extension attribute stored under `name`
    pub fn attribute(&self, name: &Name) -> Option<&dyn ExtensionAttribute> {
        self.attributes.get(name).map(|attribute| attribute.as_ref())
    }

    /// Extension attribute stored under `name`, as its concrete type
    pub fn attribute_as<T: 'static>(&self, name: &Name) -> Option<&T> {
        self.attribute(name)
            .and_then(|attribute| attribute.as_any().downcast_ref::<T>())
    }

    /// Names of the stored element groups
    pub fn element_names(&self) -> impl Iterator<Item = &Name> {
        self.elements.keys()
    }

    /// Stored element groups, in order of first appearance
    pub fn iter_elements(&self) -> impl Iterator<Item = (&Name, &[ExtensionHandle])> {
        self.elements
            .iter()
            .map(|(name, group)| (name, group.as_slice()))
    }

    /// Stored attributes, in document order
    pub fn iter_attributes(&self) -> impl Iterator<Item = (&Name, &dyn ExtensionAttribute)> {
        self.attributes
            .iter()
            .map(|(name, attribute)| (name, attribute.as_ref()))
    }
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store")
            .field(
                "elements",
                &self
                    .elements
                    .iter()
                    .map(|(name, group)| (name.to_string(), group.len()))
                    .collect::<Vec<_>>(),
            )
            .field(
                "attributes",
                &self
                    .attributes
                    .iter()
                    .map(|(name, attribute)| (name.to_string(), attribute.text().to_string()))
                    .collect::<Vec<_>>(),
            )
            .finish()
    }
}
