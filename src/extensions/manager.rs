//! Extension repositories for every parent tag

use super::repository::Repository;
use super::{ExtensionAttribute, ExtensionHandle};
use crate::error::Result;
use crate::grammar::ElementRule;
use crate::namespaces::Name;
use crate::occurrence::Cardinality;
use crate::visitor::ParentRef;
use indexmap::IndexMap;
use std::sync::Arc;

/// Every registered extension, grouped by the parent tag it extends
///
/// Configure once, then share read-only between walks (usually behind an
/// `Arc`).
///
/// ```rust,ignore
/// let mut manager = Manager::new();
/// manager.register_element_rule(
///     "entry",
///     Name::namespaced(MEDIA, "thumbnail"),
///     Cardinality::Unique,
///     ElementRule::leaf("thumbnail").attribute("url", Cardinality::ExistsAndUnique),
/// )?;
/// let manager = Arc::new(manager);
/// ```
#[derive(Debug, Clone, Default)]
pub struct Manager {
    repositories: IndexMap<String, Arc<Repository>>,
}

impl Manager {
    /// Create an empty manager
    pub fn new() -> Self {
        Self::default()
    }

    fn repository_mut(&mut self, tag: &str) -> &mut Repository {
        let tag = tag.to_lowercase();
        let repository = self
            .repositories
            .entry(tag.clone())
            .or_insert_with(|| Arc::new(Repository::new(&tag)));
        Arc::make_mut(repository)
    }

    /// Register an extension element under `tag`
    pub fn register_element<F>(
        &mut self,
        tag: &str,
        name: Name,
        cardinality: Cardinality,
        constructor: F,
    ) -> Result<()>
    where
        F: Fn(ParentRef, &Arc<Manager>) -> ExtensionHandle + Send + Sync + 'static,
    {
        self.repository_mut(tag)
            .register_element(name, cardinality, constructor)
    }

    /// Register an extension element parsed by a grammar rule under `tag`
    pub fn register_element_rule(
        &mut self,
        tag: &str,
        name: Name,
        cardinality: Cardinality,
        rule: ElementRule,
    ) -> Result<()> {
        self.repository_mut(tag)
            .register_element_rule(name, cardinality, rule)
    }

    /// Register an extension attribute under `tag`
    pub fn register_attribute<F>(
        &mut self,
        tag: &str,
        name: Name,
        cardinality: Cardinality,
        constructor: F,
    ) -> Result<()>
    where
        F: Fn() -> Box<dyn ExtensionAttribute> + Send + Sync + 'static,
    {
        self.repository_mut(tag)
            .register_attribute(name, cardinality, constructor)
    }

    /// Repository of `tag`, if anything was registered for it
    pub fn repository(&self, tag: &str) -> Option<&Arc<Repository>> {
        self.repositories.get(&tag.to_lowercase())
    }

    /// Extended tags
    pub fn tags(&self) -> impl Iterator<Item = &str> {
        self.repositories.keys().map(|tag| tag.as_str())
    }
}
