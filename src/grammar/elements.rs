//! The generic grammar node driven by an [`ElementRule`]

use super::rules::ElementRule;
use crate::depth::{Depth, DepthWatcher};
use crate::error::{ErrorAggregator, ParserError, Result};
use crate::extensions::{Extensions, Manager, Store};
use crate::flags::Flags;
use crate::namespaces::Name;
use crate::occurrence::{Occurrence, OccurrenceCollection};
use crate::token::{Attribute, CharData, EndElement, StartElement};
use crate::visitor::{orphan, Next, ParentRef, Step, Visitor, VisitorRef};
use indexmap::IndexMap;
use log::debug;
use serde::Serialize;
use std::cell::RefCell;
use std::rc::{Rc, Weak};
use std::sync::Arc;

/// Shared handle on a parsed element
pub type ElementRef = Rc<RefCell<Element>>;

/// Children of one declared name
#[derive(Debug)]
enum Slot {
    /// At most one occurrence is accepted; the last one wins
    Single(Option<ElementRef>),
    /// Every occurrence, in document order
    Many(Vec<ElementRef>),
}

impl Slot {
    fn put(&mut self, child: ElementRef) {
        match self {
            Slot::Single(slot) => *slot = Some(child),
            Slot::Many(children) => children.push(child),
        }
    }

    fn clear(&mut self) {
        match self {
            Slot::Single(slot) => *slot = None,
            Slot::Many(children) => children.clear(),
        }
    }

    fn items(&self) -> &[ElementRef] {
        match self {
            Slot::Single(slot) => slot.as_ref().map(std::slice::from_ref).unwrap_or(&[]),
            Slot::Many(children) => children,
        }
    }
}

/// A parsed element and the visitor that parses it
///
/// The node resets itself on its own start tag, counts declared children and
/// attributes, descends into declared children, hands foreign-namespace
/// children and attributes to its extensions, and reports everything wrong
/// with itself in one error when its own end tag is reached.
pub struct Element {
    rule: Arc<ElementRule>,
    manager: Option<Arc<Manager>>,
    depth: DepthWatcher,
    name: Option<Name>,
    attributes: IndexMap<Name, String>,
    attribute_occurrences: OccurrenceCollection,
    occurrences: OccurrenceCollection,
    children: IndexMap<String, Slot>,
    text: String,
    extensions: Extensions,
    pending: ErrorAggregator,
    this: Weak<RefCell<Element>>,
    parent: ParentRef,
}

impl Element {
    /// Create a node parented to `parent`
    pub fn new(
        rule: Arc<ElementRule>,
        manager: Option<Arc<Manager>>,
        parent: ParentRef,
    ) -> ElementRef {
        let depth = match rule.depth_limit() {
            Some(max) => DepthWatcher::with_max_depth(max),
            None => DepthWatcher::new(),
        };

        let mut occurrences = OccurrenceCollection::new();
        let mut children = IndexMap::new();
        for child in rule.children() {
            let name = child.rule.name().to_string();
            occurrences.insert(Occurrence::new(name.clone(), child.cardinality));
            let slot = if child.cardinality.is_single() {
                Slot::Single(None)
            } else {
                Slot::Many(Vec::new())
            };
            children.insert(name, slot);
        }

        let mut attribute_occurrences = OccurrenceCollection::new();
        for (name, attribute) in rule.attributes() {
            attribute_occurrences.insert(Occurrence::new(name.to_string(), attribute.cardinality));
        }

        let extensions = Extensions::bind(manager.as_ref(), rule.name());

        Rc::new_cyclic(|this| {
            RefCell::new(Self {
                rule,
                manager,
                depth,
                name: None,
                attributes: IndexMap::new(),
                attribute_occurrences,
                occurrences,
                children,
                text: String::new(),
                extensions,
                pending: ErrorAggregator::new(),
                this: this.clone(),
                parent,
            })
        })
    }

    /// Create a root node, the first visitor of a walk
    pub fn root(rule: ElementRule, manager: Option<Arc<Manager>>) -> ElementRef {
        Self::new(Arc::new(rule), manager, orphan())
    }

    /// Rule the node follows
    pub fn rule(&self) -> &ElementRule {
        &self.rule
    }

    /// Qualified name of the element, once its start tag was seen
    pub fn name(&self) -> Option<&Name> {
        self.name.as_ref()
    }

    /// Value of an unprefixed attribute
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.qualified_attribute(&Name::local(name))
    }

    /// Value of a declared attribute by qualified name
    pub fn qualified_attribute(&self, name: &Name) -> Option<&str> {
        self.attributes.get(name).map(|value| value.as_str())
    }

    /// Text of the element, trimmed
    pub fn text(&self) -> &str {
        self.text.trim()
    }

    /// The last child of a declared name
    pub fn child(&self, name: &str) -> Option<ElementRef> {
        self.children
            .get(&name.to_lowercase())
            .and_then(|slot| slot.items().last())
            .cloned()
    }

    /// Every retained child of a declared name, in document order
    pub fn children(&self, name: &str) -> Vec<ElementRef> {
        self.children
            .get(&name.to_lowercase())
            .map(|slot| slot.items().to_vec())
            .unwrap_or_default()
    }

    /// Text of the last child of a declared name
    pub fn child_text(&self, name: &str) -> Option<String> {
        self.child(name)
            .map(|child| child.borrow().text().to_string())
    }

    /// Number of times a declared child appeared
    pub fn count(&self, name: &str) -> usize {
        self.occurrences.count(&name.to_lowercase())
    }

    /// Extension values found under the element
    pub fn extensions(&self) -> &Store {
        self.extensions.store()
    }

    /// Plain copy of the parsed tree
    pub fn snapshot(&self) -> Snapshot {
        let mut attributes: IndexMap<String, String> = self
            .attributes
            .iter()
            .map(|(name, value)| (name.to_string(), value.clone()))
            .collect();
        for (name, attribute) in self.extensions().iter_attributes() {
            attributes.insert(name.to_string(), attribute.text().to_string());
        }

        let children = self
            .children
            .values()
            .flat_map(|slot| slot.items())
            .map(|child| child.borrow().snapshot())
            .collect();

        let extensions = self
            .extensions()
            .iter_elements()
            .map(|(name, group)| {
                let snapshots = group
                    .iter()
                    .map(|handle| match handle.downcast::<Element>() {
                        Some(element) => element.borrow().snapshot(),
                        None => Snapshot {
                            name: name.local.clone(),
                            ..Snapshot::default()
                        },
                    })
                    .collect();
                (name.to_string(), snapshots)
            })
            .collect();

        Snapshot {
            name: self.rule.name().to_string(),
            attributes,
            text: self.text().to_string(),
            children,
            extensions,
        }
    }

    fn open(&mut self, start: &StartElement) {
        self.reset();
        self.name = Some(start.name.clone());

        if let Some(uri) = self.rule.required_namespace() {
            if !start.scope.contains(uri) {
                self.pending.push(ParserError::new(
                    Flags::NAMESPACE,
                    format!("{} requires namespace {} in scope", self.rule.name(), uri),
                ));
            }
        }

        for attribute in &start.attributes {
            self.process_attribute(attribute);
        }
    }

    fn process_attribute(&mut self, attribute: &Attribute) {
        if let Some(rule) = self.rule.attribute_rule(&attribute.name) {
            if let Some((check, flag)) = rule.check {
                if let Err(message) = check(&attribute.value) {
                    self.pending.push(ParserError::new(
                        flag,
                        format!("{}: {}", attribute.name, message),
                    ));
                }
            }
            self.attribute_occurrences.inc(&attribute.name.to_string());
            self.attributes
                .insert(attribute.name.clone(), attribute.value.clone());
            return;
        }

        if attribute.name.namespace().is_some() {
            match self.extensions.process_attribute(attribute) {
                Ok(true) => return,
                Ok(false) => {}
                Err(error) => {
                    self.pending.push(error);
                    return;
                }
            }
        }

        debug!(
            target: "feedspec::extensions",
            "ignoring attribute {} on {}",
            attribute.name,
            self.rule.name()
        );
    }

    /// Start tag seen directly inside the element
    fn descend(&mut self, start: &StartElement) -> Option<Step> {
        let own = self.name.as_ref()?;

        let child: VisitorRef = if start.name.same_namespace(own) {
            let child_rule = self.rule.child_rule(&start.name.local)?;
            let element = Element::new(
                Arc::clone(&child_rule.rule),
                self.manager.clone(),
                self.this.clone(),
            );
            self.occurrences.inc(&start.name.local);
            if let Some(slot) = self.children.get_mut(&start.name.local) {
                slot.put(Rc::clone(&element));
            }
            element
        } else {
            match self.extensions.construct_element(&start.name, self.this.clone()) {
                Some(visitor) => visitor,
                None => return Some(Step::skip()),
            }
        };

        let step = child.borrow_mut().process_start_element(start);
        let next = match step.next {
            Next::Skip => Step::skip(),
            Next::Leave => {
                self.depth.down();
                Step::stay()
            }
            Next::Stay => Step::enter(child),
            Next::Enter(inner) => Step::enter(inner),
        };
        Some(next.with_error(step.error))
    }

    fn close(&mut self) -> Option<ParserError> {
        let mut agg = std::mem::take(&mut self.pending);
        self.attribute_occurrences.validate_into(&mut agg);
        self.occurrences.validate_into(&mut agg);
        self.extensions.validate(&mut agg);

        if let Some((check, flag)) = self.rule.value_check() {
            if let Err(message) = check(self.text()) {
                agg.push(ParserError::new(
                    flag,
                    format!("{}: {}", self.rule.name(), message),
                ));
            }
        }

        agg.finish()
    }
}

impl Visitor for Element {
    fn process_start_element(&mut self, start: &StartElement) -> Step {
        if self.depth.is_root() {
            self.open(start);
            self.depth.down();
            return Step::stay();
        }

        if self.depth.level() == 1 && !self.rule.is_leaf() {
            if let Some(step) = self.descend(start) {
                return step;
            }
        }

        match self.depth.down() {
            Depth::MaxReached => Step::stay().with_error(Some(ParserError::new(
                Flags::UNEXPECTED_CHILD,
                format!(
                    "leaf element {} has unexpected child {}",
                    self.rule.name(),
                    start.name.local
                ),
            ))),
            _ => Step::stay(),
        }
    }

    fn process_end_element(&mut self, end: &EndElement) -> Step {
        match self.depth.up() {
            Depth::Root => Step::leave().with_error(self.close()),
            Depth::Ancestor => Step::leave().with_error(Some(ParserError::new(
                Flags::DESYNC,
                format!("{} received end tag of {}", self.rule.name(), end.name),
            ))),
            _ => Step::stay(),
        }
    }

    fn process_char_data(&mut self, data: &CharData) -> Step {
        if self.depth.level() == 1 && self.rule.keeps_text() {
            self.text.push_str(&data.text);
        }
        Step::stay()
    }

    fn reset(&mut self) {
        self.depth.reset();
        self.name = None;
        self.attributes.clear();
        self.attribute_occurrences.reset();
        self.occurrences.reset();
        for slot in self.children.values_mut() {
            slot.clear();
        }
        self.text.clear();
        self.extensions.reset();
        self.pending.clear();
    }

    fn parent(&self) -> Option<VisitorRef> {
        self.parent.upgrade()
    }
}

impl std::fmt::Debug for Element {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Element")
            .field("rule", &self.rule.name())
            .field("name", &self.name)
            .field("attributes", &self.attributes)
            .field("text", &self.text())
            .field("children", &self.children)
            .field("extensions", self.extensions())
            .finish()
    }
}

/// Serialisable copy of a parsed element tree
///
/// Children are listed by declared name, then document order. Extension
/// attributes are merged into `attributes` under their qualified name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Snapshot {
    /// Local name from the rule
    pub name: String,
    /// Attribute values by qualified name
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub attributes: IndexMap<String, String>,
    /// Trimmed text
    #[serde(skip_serializing_if = "String::is_empty")]
    pub text: String,
    /// Declared children
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Snapshot>,
    /// Extension elements by qualified name
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub extensions: IndexMap<String, Vec<Snapshot>>,
}

impl Snapshot {
    /// Render as pretty-printed JSON
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::namespaces::NamespaceScope;
    use crate::occurrence::Cardinality;

    fn start(local: &str) -> StartElement {
        StartElement {
            name: Name::local(local),
            attributes: Vec::new(),
            scope: NamespaceScope::new(),
        }
    }

    fn end(local: &str) -> EndElement {
        EndElement {
            name: Name::local(local),
        }
    }

    #[test]
    fn test_leaf_keeps_text() {
        let title = Element::root(ElementRule::leaf("title"), None);
        let mut node = title.borrow_mut();
        assert!(matches!(node.process_start_element(&start("title")).next, Next::Stay));
        node.process_char_data(&CharData { text: " Hello ".to_string() });
        let step = node.process_end_element(&end("title"));
        assert!(matches!(step.next, Next::Leave));
        assert!(step.error.is_none());
        assert_eq!(node.text(), "Hello");
    }

    #[test]
    fn test_leaf_child_is_unexpected() {
        let title = Element::root(ElementRule::leaf("title"), None);
        let mut node = title.borrow_mut();
        node.process_start_element(&start("title"));

        let step = node.process_start_element(&start("b"));
        assert!(matches!(step.next, Next::Stay));
        assert!(step.error.unwrap().has(Flags::UNEXPECTED_CHILD));

        assert!(node.process_end_element(&end("b")).error.is_none());
        assert!(matches!(node.process_end_element(&end("title")).next, Next::Leave));
    }

    #[test]
    fn test_container_enters_declared_child() {
        let entry = Element::root(
            ElementRule::new("entry").child(ElementRule::leaf("id"), Cardinality::ExistsAndUnique),
            None,
        );
        let mut node = entry.borrow_mut();
        node.process_start_element(&start("entry"));

        let step = node.process_start_element(&start("id"));
        let Next::Enter(child) = step.next else {
            panic!("expected to enter the child");
        };
        assert!(Rc::ptr_eq(&child.borrow().parent().unwrap(), &(entry.clone() as VisitorRef)));
        assert_eq!(node.count("id"), 1);
    }

    #[test]
    fn test_unknown_same_namespace_child_is_tracked_by_depth() {
        let entry = Element::root(ElementRule::new("entry"), None);
        let mut node = entry.borrow_mut();
        node.process_start_element(&start("entry"));
        assert!(matches!(node.process_start_element(&start("other")).next, Next::Stay));
        assert!(matches!(node.process_end_element(&end("other")).next, Next::Stay));
        assert!(matches!(node.process_end_element(&end("entry")).next, Next::Leave));
    }

    #[test]
    fn test_foreign_child_without_extension_is_skipped() {
        let entry = Element::root(ElementRule::new("entry"), None);
        let mut node = entry.borrow_mut();
        node.process_start_element(&start("entry"));

        let foreign = StartElement {
            name: Name::namespaced("urn:unknown", "thing"),
            attributes: Vec::new(),
            scope: NamespaceScope::new(),
        };
        assert!(matches!(node.process_start_element(&foreign).next, Next::Skip));
        assert_eq!(node.depth.level(), 1);
    }

    #[test]
    fn test_missing_required_attribute() {
        let link = Element::root(
            ElementRule::leaf("link").attribute("href", Cardinality::ExistsAndUnique),
            None,
        );
        let mut node = link.borrow_mut();
        node.process_start_element(&start("link"));
        let err = node.process_end_element(&end("link")).error.unwrap();
        assert_eq!(err.message(), "href should exist");
        assert!(err.has(Flags::MISSING));
    }

    #[test]
    fn test_required_namespace() {
        let feed = Element::root(ElementRule::new("feed").namespace("urn:atom"), None);
        let mut node = feed.borrow_mut();
        node.process_start_element(&start("feed"));
        let err = node.process_end_element(&end("feed")).error.unwrap();
        assert!(err.has(Flags::NAMESPACE));
    }

    #[test]
    fn test_end_tag_of_ancestor_is_desync() {
        let feed = Element::root(ElementRule::new("feed"), None);
        let step = feed.borrow_mut().process_end_element(&end("feed"));
        assert!(step.error.unwrap().has(Flags::DESYNC));
    }

    #[test]
    fn test_snapshot_json() {
        let rule = ElementRule::leaf("link").attribute("href", Cardinality::Optional);
        let link = Element::root(rule, None);
        let mut node = link.borrow_mut();
        let mut tag = start("link");
        tag.attributes.push(Attribute::new(Name::local("href"), "http://example.com/"));
        node.process_start_element(&tag);
        node.process_end_element(&end("link"));

        let json = node.snapshot().to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["name"], "link");
        assert_eq!(value["attributes"]["href"], "http://example.com/");
        assert!(value.get("children").is_none());
    }
}
