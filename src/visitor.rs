//! The visitor protocol
//!
//! Every grammar node is a [`Visitor`]. The walker holds exactly one current
//! visitor, hands it each token, and replaces it with whatever the returned
//! [`Step`] asks for:
//!
//! - [`Next::Stay`]: keep the current visitor.
//! - [`Next::Enter`]: a child visitor takes over. The container has already
//!   forwarded the child's start tag to it.
//! - [`Next::Leave`]: the visitor's own element closed; control returns to
//!   its [`Visitor::parent`].
//! - [`Next::Skip`]: the start tag carries no grammar meaning; the walker
//!   discards the whole subtree without dispatching it.
//!
//! Containers own their children (the visitor graph is kept alive for
//! end-of-scope validation). Children only hold a [`ParentRef`] back to the
//! container, which never keeps it alive.

use crate::error::ParserError;
use crate::token::{CharData, EndElement, StartElement};
use std::cell::RefCell;
use std::rc::{Rc, Weak};

/// Shared handle on a visitor
pub type VisitorRef = Rc<RefCell<dyn Visitor>>;

/// Back-reference from a visitor to the one that created it
pub type ParentRef = Weak<RefCell<dyn Visitor>>;

/// Which visitor handles the next token
#[derive(Clone, Default)]
pub enum Next {
    /// The current visitor
    #[default]
    Stay,
    /// A child visitor
    Enter(VisitorRef),
    /// The current visitor's parent
    Leave,
    /// None: skip the subtree of the start tag just processed
    Skip,
}

impl std::fmt::Debug for Next {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Next::Stay => write!(f, "Stay"),
            Next::Enter(_) => write!(f, "Enter(..)"),
            Next::Leave => write!(f, "Leave"),
            Next::Skip => write!(f, "Skip"),
        }
    }
}

/// Outcome of dispatching one token to a visitor
#[derive(Debug, Clone, Default)]
pub struct Step {
    /// Which visitor handles the next token
    pub next: Next,
    /// Error discovered while processing the token
    pub error: Option<ParserError>,
}

impl Step {
    /// Keep the current visitor
    pub fn stay() -> Self {
        Self::default()
    }

    /// Hand control to a child visitor
    pub fn enter(child: VisitorRef) -> Self {
        Self {
            next: Next::Enter(child),
            error: None,
        }
    }

    /// Return control to the parent visitor
    pub fn leave() -> Self {
        Self {
            next: Next::Leave,
            error: None,
        }
    }

    /// Skip the subtree of the current start tag
    pub fn skip() -> Self {
        Self {
            next: Next::Skip,
            error: None,
        }
    }

    /// Attach an error, if any
    pub fn with_error(mut self, error: Option<ParserError>) -> Self {
        self.error = error;
        self
    }
}

/// A grammar node interpreting the tokens of its own element
///
/// Implementations track their own nesting with a
/// [`DepthWatcher`](crate::depth::DepthWatcher): the start tag seen at depth
/// 0 is their own, the end tag that returns them to depth 0 closes them and
/// triggers end-of-scope validation.
pub trait Visitor {
    /// Process a start tag
    fn process_start_element(&mut self, start: &StartElement) -> Step;

    /// Process an end tag
    fn process_end_element(&mut self, end: &EndElement) -> Step;

    /// Process character data
    fn process_char_data(&mut self, data: &CharData) -> Step;

    /// Forget everything parsed so far
    ///
    /// Called by the walker on the root before every pass, and by containers
    /// before they reuse a child for another occurrence.
    fn reset(&mut self);

    /// The visitor to return to once this one's element closes
    fn parent(&self) -> Option<VisitorRef>;
}

/// Wrap a concrete visitor into a shared handle
///
/// The typed handle is returned alongside so the owner keeps access to the
/// concrete state.
pub fn shared<V: Visitor + 'static>(visitor: V) -> (Rc<RefCell<V>>, VisitorRef) {
    let typed = Rc::new(RefCell::new(visitor));
    let dynamic: VisitorRef = typed.clone();
    (typed, dynamic)
}

/// A parent reference that never resolves
pub fn orphan() -> ParentRef {
    Weak::<RefCell<Orphan>>::new()
}

/// Placeholder type for [`orphan`]
struct Orphan;

impl Visitor for Orphan {
    fn process_start_element(&mut self, _start: &StartElement) -> Step {
        Step::skip()
    }

    fn process_end_element(&mut self, _end: &EndElement) -> Step {
        Step::leave()
    }

    fn process_char_data(&mut self, _data: &CharData) -> Step {
        Step::stay()
    }

    fn reset(&mut self) {}

    fn parent(&self) -> Option<VisitorRef> {
        None
    }
}
