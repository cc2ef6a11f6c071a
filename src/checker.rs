//! Deciding which errors are fatal
//!
//! An [`ErrorChecker`] maps element names to the mask of flags that are
//! fatal inside that element, with a default mask for every element it has no
//! override for. An error is fatal when its flags intersect the mask of the
//! element it surfaced in.
//!
//! ```rust,ignore
//! // Accept feeds whose entries lack an updated date, reject everything else.
//! let mut checker = ErrorChecker::strict();
//! checker.disable("updated", Flags::MISSING);
//! ```

use crate::error::{Error, ParserError, Result};
use crate::flags::{FlagRegistry, Flags};
use indexmap::IndexMap;
use serde::Deserialize;

/// Element name addressing the default mask and every override at once
pub const ALL_ELEMENTS: &str = "*";

/// Per-element table of fatal flags
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorChecker {
    default: Flags,
    overrides: IndexMap<String, Flags>,
}

impl ErrorChecker {
    /// Every error is fatal
    pub fn strict() -> Self {
        Self::with_default(Flags::all())
    }

    /// No error is fatal
    pub fn lenient() -> Self {
        Self::with_default(Flags::empty())
    }

    /// Start from an explicit default mask
    pub fn with_default(default: Flags) -> Self {
        Self {
            default,
            overrides: IndexMap::new(),
        }
    }

    /// Make `flags` fatal inside `element`
    pub fn enable(&mut self, element: &str, flags: Flags) -> &mut Self {
        self.update(element, |mask| mask | flags)
    }

    /// Stop treating `flags` as fatal inside `element`
    pub fn disable(&mut self, element: &str, flags: Flags) -> &mut Self {
        self.update(element, |mask| mask.exclude(flags))
    }

    fn update(&mut self, element: &str, apply: impl Fn(Flags) -> Flags) -> &mut Self {
        if element == ALL_ELEMENTS {
            self.default = apply(self.default);
            for mask in self.overrides.values_mut() {
                *mask = apply(*mask);
            }
        } else {
            let default = self.default;
            let mask = self
                .overrides
                .entry(element.to_lowercase())
                .or_insert(default);
            *mask = apply(*mask);
        }
        self
    }

    /// Mask of fatal flags inside `element`
    pub fn mask(&self, element: &str) -> Flags {
        self.overrides
            .get(&element.to_lowercase())
            .copied()
            .unwrap_or(self.default)
    }

    /// Mask used for elements without an override
    pub fn default_mask(&self) -> Flags {
        self.default
    }

    /// Check if `error` is fatal inside `element`
    pub fn check(&self, element: &str, error: &ParserError) -> bool {
        self.mask(element).intersects(error.flags())
    }

    /// Build a checker from a configuration, resolving flag names through
    /// `registry`
    pub fn from_config(config: &CheckerConfig, registry: &FlagRegistry) -> Result<Self> {
        let mut checker = match config.posture {
            Posture::Strict => Self::strict(),
            Posture::Lenient => Self::lenient(),
        };

        for (element, rule) in &config.elements {
            for name in &rule.disable {
                checker.disable(element, registry.resolve(name)?);
            }
            for name in &rule.enable {
                checker.enable(element, registry.resolve(name)?);
            }
        }

        Ok(checker)
    }
}

impl Default for ErrorChecker {
    fn default() -> Self {
        Self::strict()
    }
}

/// Starting posture of a configured checker
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Posture {
    /// Everything fatal
    #[default]
    Strict,
    /// Nothing fatal
    Lenient,
}

/// Flag names to enable or disable for one element
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ElementRule {
    /// Flags to make fatal
    pub enable: Vec<String>,
    /// Flags to waive
    pub disable: Vec<String>,
}

/// Serialisable description of an [`ErrorChecker`]
///
/// Disables are applied before enables within one element; elements are
/// applied in file order, so a `"*"` entry only reaches overrides listed
/// before it.
///
/// ```json
/// {
///   "posture": "strict",
///   "elements": {
///     "updated": { "disable": ["missing"] },
///     "*": { "disable": ["value"] }
///   }
/// }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CheckerConfig {
    /// Starting posture
    pub posture: Posture,
    /// Per-element adjustments
    pub elements: IndexMap<String, ElementRule>,
}

impl CheckerConfig {
    /// Parse a configuration from JSON
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        if config.elements.keys().any(|element| element.trim().is_empty()) {
            return Err(Error::Config("element names must not be empty".to_string()));
        }
        Ok(config)
    }
}
