//! Declarative element rules

use crate::flags::Flags;
use crate::namespaces::Name;
use crate::occurrence::Cardinality;
use indexmap::IndexMap;
use std::sync::Arc;

/// Format check run against an element's text or an attribute's value
pub type ValueCheck = fn(&str) -> Result<(), String>;

/// A declared child element
#[derive(Debug, Clone)]
pub struct ChildRule {
    /// Rule of the child
    pub rule: Arc<ElementRule>,
    /// How many times the child may appear
    pub cardinality: Cardinality,
}

/// A declared attribute
#[derive(Debug, Clone)]
pub struct AttributeRule {
    /// Whether the attribute must or must not appear
    pub cardinality: Cardinality,
    /// Format check and the flag its failures carry
    pub check: Option<(ValueCheck, Flags)>,
}

/// What an element may contain
///
/// ```rust,ignore
/// let entry = ElementRule::new("entry")
///     .child(ElementRule::leaf("id"), Cardinality::ExistsAndUnique)
///     .child(ElementRule::leaf("title"), Cardinality::ExistsAndUnique)
///     .child(
///         ElementRule::leaf("link").attribute("href", Cardinality::ExistsAndUnique),
///         Cardinality::Optional,
///     );
/// ```
#[derive(Debug, Clone)]
pub struct ElementRule {
    name: String,
    namespace: Option<String>,
    children: IndexMap<String, ChildRule>,
    attributes: IndexMap<Name, AttributeRule>,
    keep_text: bool,
    value: Option<(ValueCheck, Flags)>,
    max_depth: Option<usize>,
}

impl ElementRule {
    /// An element with no declared content
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_lowercase(),
            namespace: None,
            children: IndexMap::new(),
            attributes: IndexMap::new(),
            keep_text: false,
            value: None,
            max_depth: None,
        }
    }

    /// A text-only element: keeps its text, any child element is an error
    pub fn leaf(name: &str) -> Self {
        Self::new(name).keep_text().max_depth(1)
    }

    /// Declare a child element
    pub fn child(self, rule: ElementRule, cardinality: Cardinality) -> Self {
        self.child_shared(Arc::new(rule), cardinality)
    }

    /// Declare a child element whose rule is shared with other parents
    pub fn child_shared(mut self, rule: Arc<ElementRule>, cardinality: Cardinality) -> Self {
        self.children
            .insert(rule.name.clone(), ChildRule { rule, cardinality });
        self
    }

    /// Declare an unprefixed attribute
    pub fn attribute(self, name: &str, cardinality: Cardinality) -> Self {
        self.qualified_attribute(Name::local(name), cardinality, None)
    }

    /// Declare an unprefixed attribute with a format check
    pub fn checked_attribute(
        self,
        name: &str,
        cardinality: Cardinality,
        check: ValueCheck,
        flag: Flags,
    ) -> Self {
        self.qualified_attribute(Name::local(name), cardinality, Some((check, flag)))
    }

    /// Declare an attribute by qualified name, e.g. `xml:lang`
    pub fn qualified_attribute(
        mut self,
        name: Name,
        cardinality: Cardinality,
        check: Option<(ValueCheck, Flags)>,
    ) -> Self {
        self.attributes
            .insert(name, AttributeRule { cardinality, check });
        self
    }

    /// Keep the character data found directly inside the element
    pub fn keep_text(mut self) -> Self {
        self.keep_text = true;
        self
    }

    /// Check the element's text when it closes
    pub fn value(mut self, check: ValueCheck, flag: Flags) -> Self {
        self.keep_text = true;
        self.value = Some((check, flag));
        self
    }

    /// Report every start tag nested deeper than `max_depth` levels, the
    /// element's own tag being level 1
    pub fn max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = Some(max_depth);
        self
    }

    /// Require `uri` to be in scope on the element's own start tag
    pub fn namespace(mut self, uri: &str) -> Self {
        self.namespace = Some(uri.to_string());
        self
    }

    /// Local name of the element
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Namespace required in scope, if any
    pub fn required_namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    /// Declared child by local name
    pub fn child_rule(&self, name: &str) -> Option<&ChildRule> {
        self.children.get(name)
    }

    /// Declared children, in declaration order
    pub fn children(&self) -> impl Iterator<Item = &ChildRule> {
        self.children.values()
    }

    /// Declared attribute by qualified name
    pub fn attribute_rule(&self, name: &Name) -> Option<&AttributeRule> {
        self.attributes.get(name)
    }

    /// Declared attributes, in declaration order
    pub fn attributes(&self) -> impl Iterator<Item = (&Name, &AttributeRule)> {
        self.attributes.iter()
    }

    /// Check if character data is kept
    pub fn keeps_text(&self) -> bool {
        self.keep_text
    }

    /// Text check, if any
    pub fn value_check(&self) -> Option<(ValueCheck, Flags)> {
        self.value
    }

    /// Maximum nesting, if any
    pub fn depth_limit(&self) -> Option<usize> {
        self.max_depth
    }

    /// Check if the element accepts no child elements
    pub fn is_leaf(&self) -> bool {
        self.max_depth == Some(1)
    }
}

/// Accept non-empty text
pub fn not_empty(value: &str) -> Result<(), String> {
    if value.is_empty() {
        Err("value should not be empty".to_string())
    } else {
        Ok(())
    }
}

/// Accept an unsigned decimal integer
pub fn unsigned_integer(value: &str) -> Result<(), String> {
    if !value.is_empty() && value.bytes().all(|b| b.is_ascii_digit()) {
        Ok(())
    } else {
        Err(format!("'{}' is not an unsigned integer", value))
    }
}
