//! Driving visitors over a document
//!
//! The walker reads the whole input, tokenizes it, and feeds every token to
//! the current [`Visitor`]. After each dispatch, an error returned by the
//! visitor is gated through the [`ErrorChecker`] using the name of the
//! token's own element: a fatal error aborts the walk, wrapped with that
//! element and every open ancestor; a suppressed one is dropped and the walk
//! goes on with whatever state the visitor kept.
//!
//! A malformed token (see [`MalformedToken`]) is recovered from by excising
//! its bytes and restarting the whole walk, with the root visitor reset, up
//! to a retry budget. Structural errors are never retried and never
//! suppressed.

use crate::checker::ErrorChecker;
use crate::error::ParserError;
use crate::flags::Flags;
use crate::limits::Limits;
use crate::token::Token;
use crate::tokenizer::{MalformedToken, TokenError, Tokenizer};
use crate::visitor::{Next, VisitorRef};
use log::{debug, trace, warn};
use std::io::Read;
use std::rc::Rc;

/// Walk `input` with `root` as the first visitor
///
/// Returns `Ok(())` once the input is exhausted, or the first fatal error.
/// On success the parsed graph is whatever `root` accumulated.
pub fn walk<R: Read>(
    input: R,
    root: VisitorRef,
    checker: &ErrorChecker,
    retry_budget: usize,
) -> Result<(), ParserError> {
    Walker::new(checker)
        .with_limits(Limits::default().with_retry_budget(retry_budget))
        .walk(input, root)
}

enum Interrupt {
    Retry(MalformedToken),
    Fatal(ParserError),
}

impl From<TokenError> for Interrupt {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Malformed(token) => Interrupt::Retry(token),
            TokenError::Syntax(error) => Interrupt::Fatal(error),
        }
    }
}

/// Token walker bound to an error checker and a set of limits
#[derive(Debug, Clone)]
pub struct Walker<'c> {
    checker: &'c ErrorChecker,
    limits: Limits,
}

impl<'c> Walker<'c> {
    /// Create a walker with default limits
    pub fn new(checker: &'c ErrorChecker) -> Self {
        Self {
            checker,
            limits: Limits::default(),
        }
    }

    /// Replace the limits
    pub fn with_limits(mut self, limits: Limits) -> Self {
        self.limits = limits;
        self
    }

    /// Limits in effect
    pub fn limits(&self) -> &Limits {
        &self.limits
    }

    /// Read `input` to the end and walk it
    pub fn walk<R: Read>(&self, input: R, root: VisitorRef) -> Result<(), ParserError> {
        let mut buf = Vec::new();
        let cap = self.limits.max_input_size.saturating_add(1) as u64;
        input
            .take(cap)
            .read_to_end(&mut buf)
            .map_err(|e| ParserError::new(Flags::INPUT, format!("failed to read input: {}", e)))?;
        self.limits.check_input_size(buf.len())?;
        self.walk_bytes(buf, root)
    }

    /// Walk an in-memory document
    pub fn walk_bytes(&self, mut buf: Vec<u8>, root: VisitorRef) -> Result<(), ParserError> {
        let mut retries = 0;

        loop {
            root.borrow_mut().reset();

            match self.drive(&buf, &root) {
                Ok(()) => return Ok(()),
                Err(Interrupt::Fatal(error)) => return Err(error),
                Err(Interrupt::Retry(token)) => {
                    let range = match token.range {
                        Some(range) if retries < self.limits.retry_budget => range,
                        _ => {
                            return Err(ParserError::new(
                                token.error.flags() | Flags::RETRY_EXHAUSTED,
                                format!(
                                    "gave up after {} retries: {}",
                                    retries,
                                    token.error.message()
                                ),
                            ))
                        }
                    };

                    retries += 1;
                    warn!(
                        target: "feedspec::walker",
                        "retry {}/{}: excising bytes {}..{}: {}",
                        retries,
                        self.limits.retry_budget,
                        range.start,
                        range.end,
                        token.error
                    );
                    buf.drain(range);
                }
            }
        }
    }

    fn drive(&self, input: &[u8], root: &VisitorRef) -> Result<(), Interrupt> {
        let mut tokenizer = Tokenizer::new(input);
        let mut current = Rc::clone(root);
        let mut open: Vec<String> = Vec::new();
        let mut skipping = 0usize;

        while let Some(token) = tokenizer.next_token()? {
            match token {
                Token::Start(start) => {
                    if let Err(error) = self.limits.check_depth(open.len() + 1) {
                        return Err(Interrupt::Fatal(wrap(error, &open)));
                    }
                    open.push(start.name.local.clone());
                    if skipping > 0 {
                        skipping += 1;
                        continue;
                    }

                    trace!(target: "feedspec::walker", "start {}", start.name);
                    let step = current.borrow_mut().process_start_element(&start);
                    self.gate(step.error, &open)?;
                    current = self.advance(current, step.next, &mut skipping);
                    if skipping > 0 {
                        debug!(target: "feedspec::walker", "skipping subtree of {}", start.name);
                    }
                }
                Token::End(end) => {
                    if skipping > 0 {
                        open.pop();
                        skipping -= 1;
                        continue;
                    }

                    trace!(target: "feedspec::walker", "end {}", end.name);
                    let step = current.borrow_mut().process_end_element(&end);
                    self.gate(step.error, &open)?;
                    open.pop();
                    current = self.advance(current, step.next, &mut skipping);
                }
                Token::Text(data) => {
                    if skipping > 0 {
                        continue;
                    }

                    let step = current.borrow_mut().process_char_data(&data);
                    self.gate(step.error, &open)?;
                    current = self.advance(current, step.next, &mut skipping);
                }
            }
        }

        Ok(())
    }

    fn advance(&self, current: VisitorRef, next: Next, skipping: &mut usize) -> VisitorRef {
        match next {
            Next::Stay => current,
            Next::Enter(child) => child,
            Next::Leave => {
                let parent = current.borrow().parent();
                parent.unwrap_or(current)
            }
            Next::Skip => {
                *skipping = 1;
                current
            }
        }
    }

    /// Decide whether `error` stops the walk. `open` lists the open elements,
    /// the innermost one being the token's own.
    fn gate(&self, error: Option<ParserError>, open: &[String]) -> Result<(), Interrupt> {
        let Some(error) = error else {
            return Ok(());
        };
        let element = open.last().map(|s| s.as_str()).unwrap_or_default();

        if error.has(Flags::STRUCTURAL) || self.checker.check(element, &error) {
            return Err(Interrupt::Fatal(wrap(error, open)));
        }

        debug!(
            target: "feedspec::walker",
            "suppressed in '{}': {}",
            element,
            error
        );
        Ok(())
    }
}

/// Delegate `error` through every open element, innermost first
fn wrap(error: ParserError, open: &[String]) -> ParserError {
    open.iter()
        .rev()
        .fold(error, |error, element| error.delegate(element.as_str()))
}
