//! Charge decoder: URI component text to receiver calls.
//!
//! The decoder walks the still percent-encoded input once, dispatching on the
//! next parenthesis:
//!
//! - no parenthesis, or `)` first: the text up to it is a scalar token,
//! - `(` right at the current offset: list items `(a)(b)...`,
//! - `(` after a `!`-prefixed run: a directive `!name(a)(b)...`,
//! - `(` after any other run: map entries `key(value)key2(value2)...`.
//!
//! # Key design decisions
//!
//! - **Offsets, not errors, for structure**: an unmatched `)` stops the current
//!   level and an unmatched `(` runs to the end of input. [`Parsed::end`] tells
//!   the caller where parsing stopped, so a charge can be embedded in a larger
//!   string.
//! - **Receivers own the values**: every value goes through a
//!   [`ValueRx`]. Repeated keys, list promotion (`key(a)(b)`) and the meaning of
//!   an empty charge are up to the receiver family.
//! - **Depth guard**: nesting deeper than [`Parser::max_depth`] is rejected
//!   with [`ChargeError::TooDeep`] instead of exhausting the stack.

use std::borrow::Cow;
use std::sync::LazyLock;

use num_bigint::BigInt;
use percent_encoding::percent_decode_str;
use tracing::{debug, trace};

use crate::builder::ValueBuilder;
use crate::error::{ChargeError, Result};
use crate::ext::{ExtCursor, ExtRegistry, ExtTarget};
use crate::rx::{ChargeRx, DirectiveRx, EntryRx, ItemRx, ItemsRx, ListRx, MapRx, ValueRx};
use crate::value::{Primitive, Value};

/// Nesting depth accepted by a default parser.
pub const DEFAULT_MAX_DEPTH: usize = 256;

/// Result of a parse: the charge and the offset where parsing stopped.
#[derive(Debug, Clone, PartialEq)]
pub struct Parsed<C> {
    pub charge: C,
    /// Exclusive end offset. Less than the input length when an unmatched
    /// `)` stopped parsing.
    pub end: usize,
}

/// Charge parser: a receiver family, an extension registry and a depth limit.
///
/// Parsers are immutable and can be shared between threads when the receiver
/// family allows it.
#[derive(Debug, Clone)]
pub struct Parser<R: ChargeRx = ValueBuilder> {
    rx: R,
    ext: ExtRegistry<R>,
    max_depth: usize,
}

static DEFAULT_PARSER: LazyLock<Parser> = LazyLock::new(Parser::new);

/// The shared default parser building [`Value`]s with the predefined
/// extensions.
pub fn parser() -> &'static Parser {
    &DEFAULT_PARSER
}

/// Decodes a charge into a [`Value`] with the default parser.
///
/// ```
/// use churi_core::{decode, Value};
///
/// let parsed = decode("foo(bar))").unwrap();
/// assert_eq!(parsed.charge, [("foo", "bar")].into_iter().collect::<Value>());
/// assert_eq!(parsed.end, 8);
/// ```
pub fn decode(input: &str) -> Result<Parsed<Value>> {
    parser().parse(input)
}

/// Decodes a charge and renders the result as compact JSON.
///
/// Bigints become decimal strings, entities their raw text and directives a
/// single-entry object (see [`Value`]'s `Serialize` impl).
pub fn decode_json(input: &str) -> Result<String> {
    let parsed = decode(input)?;
    Ok(serde_json::to_string(&parsed.charge)?)
}

/// Decodes an encoded map key: strips one leading `$` or `'` escape marker,
/// then percent-decodes the rest.
pub fn decode_key(raw: &str) -> Result<String> {
    decode_key_at(raw, 0)
}

impl Parser<ValueBuilder> {
    pub fn new() -> Self {
        Self::with_rx(ValueBuilder)
    }
}

impl Default for Parser<ValueBuilder> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: ChargeRx> Parser<R> {
    /// A parser for the given receiver family, with the predefined extensions.
    pub fn with_rx(rx: R) -> Self {
        Self {
            rx,
            ext: ExtRegistry::predefined(),
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    /// Replaces the extension registry.
    pub fn with_ext(mut self, ext: ExtRegistry<R>) -> Self {
        self.ext = ext;
        self
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn charge_rx(&self) -> &R {
        &self.rx
    }

    pub fn ext(&self) -> &ExtRegistry<R> {
        &self.ext
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Parses `input` with this parser's receiver family.
    pub fn parse(&self, input: &str) -> Result<Parsed<R::Charge>> {
        let mut slot = self.rx.rx_value();
        let end = self.parse_into(input, &mut slot)?;
        Ok(Parsed {
            charge: slot.end(),
            end,
        })
    }

    /// Parses `input` into a caller-supplied receiver and returns the end
    /// offset.
    pub fn parse_into<V: ValueRx<Rx = R>>(&self, input: &str, rx: &mut V) -> Result<usize> {
        let end = self.parse_value(input, 0, 0, rx)?;
        if end < input.len() {
            debug!(end, len = input.len(), "charge parsing stopped before end of input");
        }
        Ok(end)
    }

    fn parse_value<V: ValueRx<Rx = R>>(
        &self,
        input: &str,
        pos: usize,
        depth: usize,
        rx: &mut V,
    ) -> Result<usize> {
        if depth > self.max_depth {
            return Err(ChargeError::TooDeep {
                offset: pos,
                max_depth: self.max_depth,
            });
        }

        match next_paren(input, pos) {
            None => self.parse_token(input, pos, input.len(), depth, rx),
            Some((close, b')')) => self.parse_token(input, pos, close, depth, rx),
            Some((open, _)) if open == pos => {
                let mut list = rx.start_list();
                let end = self.parse_items(input, pos, depth, &mut list)?;
                rx.set(list.end());
                Ok(end)
            }
            Some((open, _)) if input.as_bytes()[pos] == b'!' => {
                self.parse_directive(input, pos, open, depth, rx)
            }
            Some(_) => {
                let mut map = rx.start_map();
                let end = self.parse_entries(input, pos, depth, &mut map)?;
                rx.set(map.end());
                Ok(end)
            }
        }
    }

    fn parse_directive<V: ValueRx<Rx = R>>(
        &self,
        input: &str,
        pos: usize,
        open: usize,
        depth: usize,
        rx: &mut V,
    ) -> Result<usize> {
        let name = &input[pos..open];
        if let Some(handler) = self.ext.get(name) {
            trace!(name, offset = pos, "consulting directive extension");
            let cursor = ExtCursor::new(self, input, name, open, ExtTarget::Directive, depth);
            if let Some(end) = handler.handle(&cursor, &mut *rx)? {
                return cursor.checked_end(end);
            }
        }

        let mut directive = rx.start_directive(name);
        let end = self.parse_items(input, open, depth, &mut directive)?;
        rx.set(directive.end());
        Ok(end)
    }

    /// Parses `key(value)...` entries starting at `pos`. Returns the offset
    /// of the closing `)` of the enclosing level, or the input length.
    fn parse_entries<M: MapRx<Rx = R>>(
        &self,
        input: &str,
        mut pos: usize,
        depth: usize,
        map: &mut M,
    ) -> Result<usize> {
        loop {
            let open = match next_paren(input, pos) {
                Some((open, b'(')) => open,
                found => {
                    // Bare key with no value: a suffix.
                    let stop = found.map_or(input.len(), |(close, _)| close);
                    if stop > pos {
                        let key = decode_key_at(&input[pos..stop], pos)?;
                        map.add_suffix(&key);
                    }
                    return Ok(stop);
                }
            };

            let key = decode_key_at(&input[pos..open], pos)?;
            let end = self.parse_value(input, open + 1, depth + 1, &mut EntryRx::new(map, &key))?;
            pos = skip_close(input, end);

            if input.as_bytes().get(pos) == Some(&b'(') {
                let mut list = map.start_list(&key);
                pos = self.parse_item_run(input, pos, depth + 1, &mut list)?;
                let list = list.end();
                map.put(&key, list);
            }

            match input.as_bytes().get(pos) {
                None | Some(b')') => return Ok(pos),
                Some(_) => {}
            }
        }
    }

    /// Parses `(item)(item)...` starting at the `(` at `pos`, followed by an
    /// optional trailing map item written without parentheses.
    pub(crate) fn parse_items<I: ItemsRx<Rx = R>>(
        &self,
        input: &str,
        pos: usize,
        depth: usize,
        items: &mut I,
    ) -> Result<usize> {
        let pos = self.parse_item_run(input, pos, depth, items)?;
        match input.as_bytes().get(pos) {
            None | Some(b')') => Ok(pos),
            Some(_) => {
                let mut map = items.start_map();
                let end = self.parse_entries(input, pos, depth + 1, &mut map)?;
                items.add(map.end());
                Ok(end)
            }
        }
    }

    /// Parses consecutive `(item)` groups. Stops at the first offset not
    /// holding `(`.
    fn parse_item_run<I: ItemsRx<Rx = R>>(
        &self,
        input: &str,
        mut pos: usize,
        depth: usize,
        items: &mut I,
    ) -> Result<usize> {
        while input.as_bytes().get(pos) == Some(&b'(') {
            let end = self.parse_value(input, pos + 1, depth + 1, &mut ItemRx::new(items))?;
            pos = skip_close(input, end);
        }
        Ok(pos)
    }

    /// Decodes the scalar token `input[pos..stop]` and returns `stop`, or the
    /// offset an extension handler consumed up to.
    fn parse_token<V: ValueRx<Rx = R>>(
        &self,
        input: &str,
        pos: usize,
        stop: usize,
        depth: usize,
        rx: &mut V,
    ) -> Result<usize> {
        let token = &input[pos..stop];
        let Some(&first) = token.as_bytes().first() else {
            let map = rx.start_map();
            rx.set(map.end());
            return Ok(stop);
        };

        match first {
            b'!' => match token {
                "!" => rx.set_value(Primitive::Bool(true)),
                "!!" => {
                    let list = rx.start_list();
                    rx.set(list.end());
                }
                _ => return self.parse_entity(input, pos, stop, depth, rx),
            },
            b'-' => match token {
                "-" => rx.set_value(Primitive::Bool(false)),
                "--" => rx.set_value(Primitive::Null),
                _ if token.as_bytes()[1].is_ascii_digit() => {
                    rx.set_value(parse_number(token, pos)?);
                }
                _ => rx.set_value(Primitive::String(decode_text(token, pos)?.into_owned())),
            },
            b'0'..=b'9' => rx.set_value(parse_number(token, pos)?),
            b'\'' => rx.set_value(Primitive::String(
                decode_text(&token[1..], pos + 1)?.into_owned(),
            )),
            b'$' => {
                let mut map = rx.start_map();
                if token.len() > 1 {
                    map.add_suffix(&decode_key_at(token, pos)?);
                }
                rx.set(map.end());
            }
            _ => rx.set_value(Primitive::String(decode_text(token, pos)?.into_owned())),
        }
        Ok(stop)
    }

    fn parse_entity<V: ValueRx<Rx = R>>(
        &self,
        input: &str,
        pos: usize,
        stop: usize,
        depth: usize,
        rx: &mut V,
    ) -> Result<usize> {
        let raw = &input[pos..stop];
        if let Some(handler) = self.ext.get(raw) {
            trace!(name = raw, offset = pos, "consulting entity extension");
            let cursor = ExtCursor::new(self, input, raw, stop, ExtTarget::Entity, depth);
            if let Some(end) = handler.handle(&cursor, &mut *rx)? {
                return cursor.checked_end(end);
            }
        }
        rx.set_entity(raw);
        Ok(stop)
    }
}

/// Finds the next `(` or `)` at or after `from`.
fn next_paren(input: &str, from: usize) -> Option<(usize, u8)> {
    input.as_bytes()[from..]
        .iter()
        .position(|b| matches!(b, b'(' | b')'))
        .map(|i| (from + i, input.as_bytes()[from + i]))
}

/// Steps over the `)` at `pos`, if there is one.
fn skip_close(input: &str, pos: usize) -> usize {
    if input.as_bytes().get(pos) == Some(&b')') {
        pos + 1
    } else {
        pos
    }
}

fn decode_key_at(raw: &str, offset: usize) -> Result<String> {
    let (escaped, offset) = match raw.as_bytes().first() {
        Some(b'$' | b'\'') => (&raw[1..], offset + 1),
        _ => (raw, offset),
    };
    Ok(decode_text(escaped, offset)?.into_owned())
}

fn decode_text(raw: &str, offset: usize) -> Result<Cow<'_, str>> {
    percent_decode_str(raw)
        .decode_utf8()
        .map_err(|_| ChargeError::InvalidEncoding {
            offset,
            token: raw.to_string(),
        })
}

/// Parses a number token, sign included.
///
/// `0n` selects a bigint, `0x` and `0b` hexadecimal and binary. Empty digits
/// after a prefix read as zero. Errors report the whole token.
fn parse_number(token: &str, offset: usize) -> Result<Primitive> {
    let (negative, unsigned) = match token.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, token),
    };

    if let Some(digits) = unsigned.strip_prefix("0n") {
        let malformed = || ChargeError::MalformedBigInt {
            offset,
            token: token.to_string(),
        };
        let value = if digits.is_empty() {
            BigInt::default()
        } else if digits.bytes().all(|b| b.is_ascii_digit()) {
            BigInt::parse_bytes(digits.as_bytes(), 10).ok_or_else(malformed)?
        } else {
            return Err(malformed());
        };
        return Ok(Primitive::BigInt(if negative { -value } else { value }));
    }

    let malformed = || ChargeError::MalformedNumber {
        offset,
        token: token.to_string(),
    };

    let value = if let Some(digits) = unsigned.strip_prefix("0x") {
        parse_radix(digits, 16).ok_or_else(malformed)?
    } else if let Some(digits) = unsigned.strip_prefix("0b") {
        parse_radix(digits, 2).ok_or_else(malformed)?
    } else {
        let decoded = decode_text(unsigned, offset)?;
        decoded.parse::<f64>().map_err(|_| malformed())?
    };
    Ok(Primitive::Number(if negative { -value } else { value }))
}

fn parse_radix(digits: &str, radix: u32) -> Option<f64> {
    digits.chars().try_fold(0f64, |acc, c| {
        c.to_digit(radix)
            .map(|d| acc * f64::from(radix) + f64::from(d))
    })
}
