//! Nesting depth bookkeeping for visitors
//!
//! A visitor bumps its [`DepthWatcher`] once for every start tag it processes
//! itself and drops it once per end tag. Level 0 means "outside my element":
//! the start tag that moves the level from 0 to 1 is the visitor's own opening
//! tag, and the end tag that brings it back to 0 is its own closing tag.

/// Classification of a depth change
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Depth {
    /// The visitor's own element opened or closed
    Root,
    /// Still inside the visitor's element
    Inside,
    /// An end tag belonging to an ancestor of the visitor
    Ancestor,
    /// The start tag took the level past the declared maximum
    MaxReached,
}

/// Per-visitor nesting counter with an optional maximum
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DepthWatcher {
    level: usize,
    max_depth: Option<usize>,
}

impl DepthWatcher {
    /// Create an unbounded watcher
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a watcher that reports levels beyond `max_depth`
    pub fn with_max_depth(max_depth: usize) -> Self {
        Self {
            level: 0,
            max_depth: Some(max_depth),
        }
    }

    /// Current level
    pub fn level(&self) -> usize {
        self.level
    }

    /// Declared maximum, if any
    pub fn max_depth(&self) -> Option<usize> {
        self.max_depth
    }

    /// Check if the next start tag is the visitor's own opening tag
    pub fn is_root(&self) -> bool {
        self.level == 0
    }

    /// Enter one level on a start tag
    ///
    /// The level is raised even when the maximum is exceeded, so the matching
    /// end tags still balance.
    pub fn down(&mut self) -> Depth {
        self.level += 1;
        match self.max_depth {
            Some(max) if self.level > max => Depth::MaxReached,
            _ if self.level == 1 => Depth::Root,
            _ => Depth::Inside,
        }
    }

    /// Leave one level on an end tag
    pub fn up(&mut self) -> Depth {
        match self.level {
            0 => Depth::Ancestor,
            1 => {
                self.level = 0;
                Depth::Root
            }
            _ => {
                self.level -= 1;
                Depth::Inside
            }
        }
    }

    /// Return to level 0
    pub fn reset(&mut self) {
        self.level = 0;
    }
}
