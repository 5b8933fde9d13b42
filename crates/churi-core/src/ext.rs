//! Extension registry for `!`-tagged entities and directives.
//!
//! Before the decoder falls back to a plain [`Entity`](crate::Entity) or
//! [`Directive`](crate::Directive), it looks the raw tag up in the parser's
//! [`ExtRegistry`]. A registered [`ExtHandler`] may take over: it writes the
//! value into the receiver it is handed and reports where parsing resumes, or
//! declines and leaves the default handling in place.
//!
//! Tags are matched exactly as they appear in the input, `!` included and
//! percent-encoding untouched.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::decoder::Parser;
use crate::error::{ChargeError, Result};
use crate::rx::{ChargeRx, ItemsRx, ValueRx};
use crate::value::Primitive;

/// What kind of construct the tag introduced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtTarget {
    /// A bare `!tag` token.
    Entity,
    /// A `!tag(...)` directive. The cursor offset points at the first `(`.
    Directive,
}

/// Handles one extension tag.
///
/// Return `Ok(Some(end))` after writing the value into `rx` and consuming the
/// input up to `end`, or `Ok(None)` to decline without touching `rx`. `end`
/// must lie between [`ExtCursor::offset`] and the input length; anything else
/// fails the parse with [`ChargeError::Extension`].
pub trait ExtHandler<R: ChargeRx>: Send + Sync {
    fn handle(&self, cursor: &ExtCursor<'_, R>, rx: &mut dyn ValueRx<Rx = R>)
        -> Result<Option<usize>>;
}

impl<R, F> ExtHandler<R> for F
where
    R: ChargeRx,
    F: Fn(&ExtCursor<'_, R>, &mut dyn ValueRx<Rx = R>) -> Result<Option<usize>> + Send + Sync,
{
    fn handle(
        &self,
        cursor: &ExtCursor<'_, R>,
        rx: &mut dyn ValueRx<Rx = R>,
    ) -> Result<Option<usize>> {
        self(cursor, rx)
    }
}

/// Parsing position handed to an [`ExtHandler`].
pub struct ExtCursor<'a, R: ChargeRx> {
    parser: &'a Parser<R>,
    input: &'a str,
    name: &'a str,
    offset: usize,
    target: ExtTarget,
    depth: usize,
}

impl<'a, R: ChargeRx> ExtCursor<'a, R> {
    pub(crate) fn new(
        parser: &'a Parser<R>,
        input: &'a str,
        name: &'a str,
        offset: usize,
        target: ExtTarget,
        depth: usize,
    ) -> Self {
        Self {
            parser,
            input,
            name,
            offset,
            target,
            depth,
        }
    }

    pub fn parser(&self) -> &'a Parser<R> {
        self.parser
    }

    /// The whole input being parsed.
    pub fn input(&self) -> &'a str {
        self.input
    }

    /// The raw tag, e.g. `!NaN`.
    pub fn name(&self) -> &'a str {
        self.name
    }

    /// Offset right after the tag.
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Input remaining after the tag.
    pub fn rest(&self) -> &'a str {
        &self.input[self.offset..]
    }

    pub fn target(&self) -> ExtTarget {
        self.target
    }

    /// Nesting depth of the tagged value.
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Parses the `(item)(item)...` run following a directive tag into
    /// `items`, returning the offset where parsing stopped.
    pub fn parse_items<I: ItemsRx<Rx = R>>(&self, items: &mut I) -> Result<usize> {
        self.parser
            .parse_items(self.input, self.offset, self.depth, items)
    }

    /// Accepts the end offset reported by a handler. It must not fall before
    /// the tag end or past the input.
    pub(crate) fn checked_end(&self, end: usize) -> Result<usize> {
        if (self.offset..=self.input.len()).contains(&end) {
            Ok(end)
        } else {
            Err(self.error(format!(
                "handler returned end offset {end} outside {}..={}",
                self.offset,
                self.input.len()
            )))
        }
    }

    /// Builds an [`ChargeError::Extension`] located at this tag.
    pub fn error(&self, message: impl Into<String>) -> ChargeError {
        ChargeError::Extension {
            name: self.name.to_string(),
            offset: self.offset - self.name.len(),
            message: message.into(),
        }
    }
}

/// Extension handlers keyed by raw tag.
pub struct ExtRegistry<R: ChargeRx> {
    handlers: HashMap<String, Arc<dyn ExtHandler<R>>>,
}

impl<R: ChargeRx> ExtRegistry<R> {
    /// An empty registry. Every tag decodes to an entity or directive.
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// The registry every parser starts with: `!NaN`, `!Infinity` and
    /// `!-Infinity` decode to the matching numbers.
    pub fn predefined() -> Self {
        let mut registry = Self::new();
        registry.insert("!NaN", NumberEntity(f64::NAN));
        registry.insert("!Infinity", NumberEntity(f64::INFINITY));
        registry.insert("!-Infinity", NumberEntity(f64::NEG_INFINITY));
        registry
    }

    /// Registers `handler` for `name`, replacing any previous handler.
    pub fn insert(&mut self, name: impl Into<String>, handler: impl ExtHandler<R> + 'static) {
        self.handlers.insert(name.into(), Arc::new(handler));
    }

    /// Registers a closure handler for `name`.
    pub fn on<F>(&mut self, name: impl Into<String>, handler: F)
    where
        F: Fn(&ExtCursor<'_, R>, &mut dyn ValueRx<Rx = R>) -> Result<Option<usize>>
            + Send
            + Sync
            + 'static,
    {
        self.insert(name, handler);
    }

    pub fn remove(&mut self, name: &str) -> bool {
        self.handlers.remove(name).is_some()
    }

    pub fn get(&self, name: &str) -> Option<&dyn ExtHandler<R>> {
        self.handlers.get(name).map(|handler| handler.as_ref())
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl<R: ChargeRx> Default for ExtRegistry<R> {
    fn default() -> Self {
        Self::predefined()
    }
}

impl<R: ChargeRx> Clone for ExtRegistry<R> {
    fn clone(&self) -> Self {
        Self {
            handlers: self.handlers.clone(),
        }
    }
}

impl<R: ChargeRx> fmt::Debug for ExtRegistry<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&str> = self.handlers.keys().map(String::as_str).collect();
        names.sort_unstable();
        f.debug_struct("ExtRegistry").field("tags", &names).finish()
    }
}

/// Entity standing for a fixed number.
struct NumberEntity(f64);

impl<R: ChargeRx> ExtHandler<R> for NumberEntity {
    fn handle(
        &self,
        cursor: &ExtCursor<'_, R>,
        rx: &mut dyn ValueRx<Rx = R>,
    ) -> Result<Option<usize>> {
        if cursor.target() != ExtTarget::Entity {
            return Ok(None);
        }
        rx.set_value(Primitive::Number(self.0));
        Ok(Some(cursor.offset()))
    }
}
