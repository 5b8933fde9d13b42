//! Charge encoder: values to URI-safe charge text.
//!
//! Anything implementing [`ChargeEncode`] can be written. The encoder asks a
//! value, in order, for:
//!
//! 1. custom text ([`ChargeEncode::encode_charge`]), used verbatim,
//! 2. a JSON substitute ([`ChargeEncode::charge_json`]), encoded in its place,
//! 3. its built-in structure ([`ChargeEncode::charge_view`]).
//!
//! # Example
//! ```
//! use churi_core::{encode, Value};
//!
//! let value: Value = [("name", Value::from("Alice")), ("age", Value::from(30))]
//!     .into_iter()
//!     .collect();
//! assert_eq!(encode(&value).as_deref(), Some("name(Alice)age(30)"));
//! ```
//!
//! # Key design decisions
//!
//! - **Every list item in parentheses**: `(a)(b)` rather than a separator
//!   grammar. A trailing non-empty map item is the only item written bare
//!   (`(1)foo(bar)`), and a trailing empty-map entry the only entry written as
//!   a bare key (`foo(1)bar`).
//! - **Placement-aware scalars**: the same string can need a `'` quote at top
//!   level and none inside parentheses, so every write knows its [`Placement`].
//! - **Absent is not null**: absent map entries are dropped, absent list items
//!   become `--`, and an absent top-level value has no text at all.

use std::borrow::Cow;
use std::collections::BTreeMap;

use indexmap::IndexMap;
use num_bigint::{BigInt, Sign};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde::Serialize;

use crate::error::Result;
use crate::value::{Directive, Entity, Value};

/// Characters written verbatim in strings and keys. Everything else is
/// percent-encoded.
const CHARGE_TEXT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'');

/// Longest first key written without a `$` prefix, in encoded octets.
const MAX_BARE_FIRST_KEY: usize = 63;

/// Where a value is written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Placement {
    /// The whole charge.
    TopLevel,
    /// Inside `key(...)`.
    MapEntry,
    /// Inside `(...)` of a list or directive.
    ListItem,
}

/// Built-in structure of an encodable value.
pub enum ChargeView<'a> {
    /// No value. Dropped from maps, `--` in lists, no text at top level.
    Absent,
    Null,
    Bool(bool),
    Number(f64),
    BigInt(Cow<'a, BigInt>),
    String(&'a str),
    /// Raw entity text, written unchanged.
    Entity(&'a str),
    /// Raw directive name and value.
    Directive(&'a str, &'a dyn ChargeEncode),
    Map(Vec<(&'a str, &'a dyn ChargeEncode)>),
    List(Vec<&'a dyn ChargeEncode>),
}

/// A value that can be written as charge text.
pub trait ChargeEncode {
    /// Custom charge text for the given placement. Used verbatim, so it must
    /// already be a valid charge in that placement.
    fn encode_charge(&self, _placement: Placement) -> Option<String> {
        None
    }

    /// JSON value to encode instead of this one.
    fn charge_json(&self) -> Option<serde_json::Value> {
        None
    }

    fn charge_view(&self) -> ChargeView<'_>;
}

/// Encodes `value` as a top-level charge. `None` when the value is absent.
pub fn encode<T: ChargeEncode + ?Sized>(value: &T) -> Option<String> {
    encode_in(value, Placement::TopLevel)
}

/// Encodes `value` for the given placement. `None` when the value is absent.
pub fn encode_in<T: ChargeEncode + ?Sized>(value: &T, placement: Placement) -> Option<String> {
    let mut out = String::new();
    match write_value(value, placement, &mut out) {
        Written::Absent => None,
        _ => Some(out),
    }
}

/// Encodes a JSON document as a top-level charge.
///
/// ```
/// let charge = churi_core::encode_json(r#"{"tags":["a","b"],"page":2}"#).unwrap();
/// assert_eq!(charge.as_deref(), Some("tags((a)(b))page(2)"));
/// ```
pub fn encode_json(json: &str) -> Result<Option<String>> {
    let value: serde_json::Value = serde_json::from_str(json)?;
    Ok(encode(&value))
}

/// Encodes a map key. `subsequent` is false for the first key of a map.
///
/// Empty keys become `$`. Keys that would read as an entity, a quoted string
/// or (for the first key) an overlong run get a `$` prefix.
pub fn encode_key(key: &str, subsequent: bool) -> String {
    let Some(&first) = key.as_bytes().first() else {
        return "$".to_string();
    };
    let encoded = utf8_percent_encode(key, CHARGE_TEXT).to_string();
    if matches!(first, b'!' | b'\'') || (!subsequent && encoded.len() > MAX_BARE_FIRST_KEY) {
        format!("${encoded}")
    } else {
        encoded
    }
}

/// What [`write_value`] produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Written {
    Absent,
    /// A map with at least one entry.
    Map,
    Other,
}

fn write_value<T: ChargeEncode + ?Sized>(value: &T, placement: Placement, out: &mut String) -> Written {
    if let Some(text) = value.encode_charge(placement) {
        out.push_str(&text);
        return Written::Other;
    }
    if let Some(json) = value.charge_json() {
        return write_value(&json, placement, out);
    }

    match value.charge_view() {
        ChargeView::Absent => return Written::Absent,
        ChargeView::Null => out.push_str("--"),
        ChargeView::Bool(true) => out.push('!'),
        ChargeView::Bool(false) => out.push('-'),
        ChargeView::Number(n) => write_number(n, out),
        ChargeView::BigInt(n) => write_bigint(&n, out),
        ChargeView::String(s) => write_string(s, placement, out),
        ChargeView::Entity(raw) => out.push_str(raw),
        ChargeView::Directive(name, value) => write_directive(name, value, out),
        ChargeView::Map(entries) => return write_map(&entries, placement, out),
        ChargeView::List(items) if items.is_empty() => out.push_str("!!"),
        ChargeView::List(items) => write_items(&items, out),
    }
    Written::Other
}

fn write_number(n: f64, out: &mut String) {
    if n.is_nan() {
        out.push_str("!NaN");
    } else if n.is_infinite() {
        out.push_str(if n > 0.0 { "!Infinity" } else { "!-Infinity" });
    } else {
        let plain = n.to_string();
        let exp = format!("{n:e}");
        out.push_str(if exp.len() < plain.len() { &exp } else { &plain });
    }
}

fn write_bigint(n: &BigInt, out: &mut String) {
    if n.sign() == Sign::Minus {
        out.push('-');
    }
    out.push_str("0n");
    out.push_str(&n.magnitude().to_string());
}

fn write_string(s: &str, placement: Placement, out: &mut String) {
    let quote = match s.as_bytes().first() {
        None | Some(b'!' | b'\'' | b'0'..=b'9') => true,
        Some(b'-') => {
            placement == Placement::TopLevel
                || s == "-"
                || s == "--"
                || s.as_bytes()[1].is_ascii_digit()
        }
        Some(_) => false,
    };
    if quote {
        out.push('\'');
    }
    out.extend(utf8_percent_encode(s, CHARGE_TEXT));
}

fn write_directive(name: &str, value: &dyn ChargeEncode, out: &mut String) {
    out.push_str(name);
    // Multi-item lists spread over the directive's own items.
    if value.encode_charge(Placement::ListItem).is_none() && value.charge_json().is_none() {
        match value.charge_view() {
            ChargeView::List(items) if items.len() > 1 => {
                write_items(&items, out);
                return;
            }
            ChargeView::Absent => {
                out.push_str("()");
                return;
            }
            _ => {}
        }
    }
    out.push('(');
    write_value(value, Placement::ListItem, out);
    out.push(')');
}

fn write_map(entries: &[(&str, &dyn ChargeEncode)], placement: Placement, out: &mut String) -> Written {
    let mut written = 0;
    // Where the `(` of the last entry is, if that entry holds an empty value.
    let mut empty_tail = None;

    for &(key, value) in entries {
        let start = out.len();
        out.push_str(&encode_key(key, written > 0));
        let open = out.len();
        out.push('(');
        if write_value(value, Placement::MapEntry, out) == Written::Absent {
            out.truncate(start);
            continue;
        }
        empty_tail = (written > 0 && out.len() == open + 1).then_some(open);
        out.push(')');
        written += 1;
    }

    if let Some(open) = empty_tail {
        out.truncate(open);
    }
    if written == 0 {
        if placement == Placement::TopLevel {
            out.push('$');
        }
        return Written::Other;
    }
    Written::Map
}

/// Writes `(item)(item)...`. A trailing non-empty map after at least one
/// other item is written without parentheses.
fn write_items(items: &[&dyn ChargeEncode], out: &mut String) {
    let last = items.len() - 1;
    for (i, item) in items.iter().enumerate() {
        let open = out.len();
        out.push('(');
        match write_value(*item, Placement::ListItem, out) {
            Written::Absent => out.push_str("--"),
            Written::Map if i == last && i > 0 => {
                out.remove(open);
                return;
            }
            _ => {}
        }
        out.push(')');
    }
}

impl ChargeEncode for Value {
    fn charge_view(&self) -> ChargeView<'_> {
        match self {
            Value::None => ChargeView::Absent,
            Value::Null => ChargeView::Null,
            Value::Bool(b) => ChargeView::Bool(*b),
            Value::Number(n) => ChargeView::Number(*n),
            Value::BigInt(n) => ChargeView::BigInt(Cow::Borrowed(n)),
            Value::String(s) => ChargeView::String(s),
            Value::Entity(entity) => ChargeView::Entity(entity.raw()),
            Value::Directive(directive) => directive.charge_view(),
            Value::Map(entries) => ChargeView::Map(
                entries
                    .iter()
                    .map(|(key, value)| (key.as_str(), value as &dyn ChargeEncode))
                    .collect(),
            ),
            Value::List(items) => {
                ChargeView::List(items.iter().map(|item| item as &dyn ChargeEncode).collect())
            }
        }
    }
}

impl ChargeEncode for serde_json::Value {
    fn charge_view(&self) -> ChargeView<'_> {
        match self {
            serde_json::Value::Null => ChargeView::Null,
            serde_json::Value::Bool(b) => ChargeView::Bool(*b),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    integer_view(i128::from(i))
                } else if let Some(u) = n.as_u64() {
                    integer_view(i128::from(u))
                } else {
                    n.as_f64().map_or(ChargeView::Absent, ChargeView::Number)
                }
            }
            serde_json::Value::String(s) => ChargeView::String(s),
            serde_json::Value::Array(items) => {
                ChargeView::List(items.iter().map(|item| item as &dyn ChargeEncode).collect())
            }
            serde_json::Value::Object(entries) => ChargeView::Map(
                entries
                    .iter()
                    .map(|(key, value)| (key.as_str(), value as &dyn ChargeEncode))
                    .collect(),
            ),
        }
    }
}

impl ChargeEncode for Entity {
    fn charge_view(&self) -> ChargeView<'_> {
        ChargeView::Entity(self.raw())
    }
}

impl ChargeEncode for Directive {
    fn charge_view(&self) -> ChargeView<'_> {
        ChargeView::Directive(self.raw_name(), self.value())
    }
}

impl ChargeEncode for str {
    fn charge_view(&self) -> ChargeView<'_> {
        ChargeView::String(self)
    }
}

impl ChargeEncode for String {
    fn charge_view(&self) -> ChargeView<'_> {
        ChargeView::String(self)
    }
}

impl ChargeEncode for bool {
    fn charge_view(&self) -> ChargeView<'_> {
        ChargeView::Bool(*self)
    }
}

impl ChargeEncode for f64 {
    fn charge_view(&self) -> ChargeView<'_> {
        ChargeView::Number(*self)
    }
}

/// Integers beyond the exact `f64` range are written as bigints.
impl ChargeEncode for i64 {
    fn charge_view(&self) -> ChargeView<'_> {
        integer_view(i128::from(*self))
    }
}

fn integer_view<'a>(n: i128) -> ChargeView<'a> {
    const MAX_EXACT: i128 = 1 << 53;
    if (-MAX_EXACT..=MAX_EXACT).contains(&n) {
        ChargeView::Number(n as f64)
    } else {
        ChargeView::BigInt(Cow::Owned(BigInt::from(n)))
    }
}

impl ChargeEncode for BigInt {
    fn charge_view(&self) -> ChargeView<'_> {
        ChargeView::BigInt(Cow::Borrowed(self))
    }
}

impl<T: ChargeEncode> ChargeEncode for Option<T> {
    fn encode_charge(&self, placement: Placement) -> Option<String> {
        self.as_ref().and_then(|value| value.encode_charge(placement))
    }

    fn charge_json(&self) -> Option<serde_json::Value> {
        self.as_ref().and_then(ChargeEncode::charge_json)
    }

    fn charge_view(&self) -> ChargeView<'_> {
        match self {
            Some(value) => value.charge_view(),
            None => ChargeView::Absent,
        }
    }
}

impl<T: ChargeEncode> ChargeEncode for [T] {
    fn charge_view(&self) -> ChargeView<'_> {
        ChargeView::List(self.iter().map(|item| item as &dyn ChargeEncode).collect())
    }
}

impl<T: ChargeEncode> ChargeEncode for Vec<T> {
    fn charge_view(&self) -> ChargeView<'_> {
        self.as_slice().charge_view()
    }
}

impl<T: ChargeEncode> ChargeEncode for IndexMap<String, T> {
    fn charge_view(&self) -> ChargeView<'_> {
        ChargeView::Map(
            self.iter()
                .map(|(key, value)| (key.as_str(), value as &dyn ChargeEncode))
                .collect(),
        )
    }
}

impl<T: ChargeEncode> ChargeEncode for BTreeMap<String, T> {
    fn charge_view(&self) -> ChargeView<'_> {
        ChargeView::Map(
            self.iter()
                .map(|(key, value)| (key.as_str(), value as &dyn ChargeEncode))
                .collect(),
        )
    }
}

impl<T: ChargeEncode + ?Sized> ChargeEncode for &T {
    fn encode_charge(&self, placement: Placement) -> Option<String> {
        (**self).encode_charge(placement)
    }

    fn charge_json(&self) -> Option<serde_json::Value> {
        (**self).charge_json()
    }

    fn charge_view(&self) -> ChargeView<'_> {
        (**self).charge_view()
    }
}

impl<T: ChargeEncode + ?Sized> ChargeEncode for Box<T> {
    fn encode_charge(&self, placement: Placement) -> Option<String> {
        (**self).encode_charge(placement)
    }

    fn charge_json(&self) -> Option<serde_json::Value> {
        (**self).charge_json()
    }

    fn charge_view(&self) -> ChargeView<'_> {
        (**self).charge_view()
    }
}

/// Encodes any `Serialize` value through its `serde_json` representation.
///
/// Values that fail to serialize are absent.
///
/// ```
/// use churi_core::{encode, Json};
///
/// #[derive(serde::Serialize)]
/// struct Page {
///     offset: u32,
///     limit: u32,
/// }
///
/// let page = Json(Page { offset: 20, limit: 10 });
/// assert_eq!(encode(&page).as_deref(), Some("offset(20)limit(10)"));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Json<T>(pub T);

impl<T: Serialize> ChargeEncode for Json<T> {
    fn charge_json(&self) -> Option<serde_json::Value> {
        serde_json::to_value(&self.0).ok()
    }

    fn charge_view(&self) -> ChargeView<'_> {
        ChargeView::Absent
    }
}
