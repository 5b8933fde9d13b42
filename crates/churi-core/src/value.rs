//! Charge value model.
//!
//! [`Value`] is the closed set of kinds a charge can carry. It is what the
//! default receiver family ([`ValueBuilder`](crate::ValueBuilder)) builds and
//! what the encoder writes back. Custom receivers are free to build anything
//! else; nothing in the decoder depends on this type.

use std::fmt;

use indexmap::IndexMap;
use num_bigint::BigInt;
use serde::ser::{Serialize, SerializeMap, SerializeSeq, Serializer};

/// Map entries in insertion order.
pub type ChargeMap = IndexMap<String, Value>;

/// A decoded (or to be encoded) charge value.
///
/// Equality is structural. Maps compare regardless of entry order and numbers
/// follow `f64` semantics, so `NaN` is never equal to itself and `-0.0 == 0.0`.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// No value was produced. Only ever returned by a receiver; never stored
    /// inside a map or a list.
    None,
    Null,
    Bool(bool),
    Number(f64),
    BigInt(BigInt),
    String(String),
    Entity(Entity),
    Directive(Directive),
    Map(ChargeMap),
    List(Vec<Value>),
}

/// Scalar values passed to `set_value`, `put_value` and `add_value`.
///
/// The variant doubles as the value's kind.
#[derive(Debug, Clone, PartialEq)]
pub enum Primitive {
    Null,
    Bool(bool),
    Number(f64),
    BigInt(BigInt),
    String(String),
}

/// A `!`-tagged atom the decoder could not resolve.
///
/// The raw text is kept exactly as it appeared in the input, percent-encoding
/// included, so that it can be written back unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Entity {
    raw: String,
}

impl Entity {
    /// Wraps raw entity text.
    ///
    /// The text is written back verbatim, so it must be a valid entity token:
    /// a `!` followed by at least one character other than `!`, with no
    /// parentheses. Tags claimed by the parser's extensions (`!NaN` and the
    /// like) decode to whatever their handler produces.
    pub fn new(raw: impl Into<String>) -> Self {
        let raw = raw.into();
        debug_assert!(is_entity_token(&raw), "not an entity token: {raw:?}");
        Self { raw }
    }

    /// The raw entity text, e.g. `!bar%20baz`.
    pub fn raw(&self) -> &str {
        &self.raw
    }
}

/// A `!`-tagged container: a raw name followed by parenthesized items.
#[derive(Debug, Clone, PartialEq)]
pub struct Directive {
    raw_name: String,
    value: Box<Value>,
}

impl Directive {
    pub fn new(raw_name: impl Into<String>, value: Value) -> Self {
        Self {
            raw_name: raw_name.into(),
            value: Box::new(value),
        }
    }

    pub fn raw_name(&self) -> &str {
        &self.raw_name
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    pub fn into_value(self) -> Value {
        *self.value
    }
}

impl Value {
    /// An empty map, the value of an empty charge.
    pub fn empty_map() -> Self {
        Value::Map(ChargeMap::new())
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Value::None)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bigint(&self) -> Option<&BigInt> {
        match self {
            Value::BigInt(n) => Some(n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&ChargeMap> {
        match self {
            Value::Map(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    /// Looks up a map entry. Returns `None` for missing keys and non-maps.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.as_map().and_then(|map| map.get(key))
    }
}

impl From<Primitive> for Value {
    fn from(value: Primitive) -> Self {
        match value {
            Primitive::Null => Value::Null,
            Primitive::Bool(b) => Value::Bool(b),
            Primitive::Number(n) => Value::Number(n),
            Primitive::BigInt(n) => Value::BigInt(n),
            Primitive::String(s) => Value::String(s),
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Number(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Number(f64::from(value))
    }
}

impl From<BigInt> for Value {
    fn from(value: BigInt) -> Self {
        Value::BigInt(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl From<Entity> for Value {
    fn from(value: Entity) -> Self {
        Value::Entity(value)
    }
}

impl From<Directive> for Value {
    fn from(value: Directive) -> Self {
        Value::Directive(value)
    }
}

impl From<Vec<Value>> for Value {
    fn from(value: Vec<Value>) -> Self {
        Value::List(value)
    }
}

impl From<ChargeMap> for Value {
    fn from(value: ChargeMap) -> Self {
        Value::Map(value)
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Value {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Value::Map(
            iter.into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        )
    }
}

impl From<serde_json::Value> for Value {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => {
                let wide = n.as_i64().map(i128::from).or_else(|| n.as_u64().map(i128::from));
                match (wide, n.as_f64()) {
                    (Some(i), _) if i.unsigned_abs() > 1 << 53 => Value::BigInt(BigInt::from(i)),
                    (_, Some(f)) => Value::Number(f),
                    (_, None) => Value::String(n.to_string()),
                }
            }
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(items) => {
                Value::List(items.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(map) => Value::Map(
                map.into_iter()
                    .map(|(key, value)| (key, Value::from(value)))
                    .collect(),
            ),
        }
    }
}

/// Renders the top-level charge text. `Value::None` renders as `!None`.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match crate::encoder::encode(self) {
            Some(text) => f.write_str(&text),
            None => f.write_str("!None"),
        }
    }
}

/// JSON-compatible view of a charge.
///
/// Integral numbers within the exact `f64` integer range serialize as
/// integers. Bigints become decimal strings, entities their raw text, and directives a
/// single-entry object keyed by the directive name. Non-finite numbers follow
/// the serializer's own policy (`serde_json` writes `null`).
impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::None | Value::Null => serializer.serialize_unit(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Number(n) => match exact_integer(*n) {
                Some(i) => serializer.serialize_i64(i),
                None => serializer.serialize_f64(*n),
            },
            Value::BigInt(n) => serializer.collect_str(n),
            Value::String(s) => serializer.serialize_str(s),
            Value::Entity(entity) => serializer.serialize_str(entity.raw()),
            Value::Directive(directive) => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry(directive.raw_name(), directive.value())?;
                map.end()
            }
            Value::Map(entries) => {
                let mut map = serializer.serialize_map(Some(entries.len()))?;
                for (key, value) in entries {
                    map.serialize_entry(key, value)?;
                }
                map.end()
            }
            Value::List(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
        }
    }
}

fn is_entity_token(raw: &str) -> bool {
    raw.len() > 1 && raw.starts_with('!') && raw != "!!" && !raw.contains(['(', ')'])
}

fn exact_integer(n: f64) -> Option<i64> {
    const MAX_EXACT: f64 = 9_007_199_254_740_992.0;
    let exact = n.fract() == 0.0 && n.abs() <= MAX_EXACT && !(n == 0.0 && n.is_sign_negative());
    exact.then_some(n as i64)
}
