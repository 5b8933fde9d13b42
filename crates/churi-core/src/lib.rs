//! # churi-core
//!
//! Pure-Rust decoder and encoder for **charges**: structured data (maps, lists,
//! strings, numbers, bigints, booleans, null, entities and directives) written
//! inside a single URI component without breaking URI syntax.
//!
//! A charge uses parentheses for nesting and a handful of one-character
//! markers for types: `foo(bar)baz((1)(2))` is the map
//! `{ foo: "bar", baz: [1, 2] }`, `!` is `true`, `--` is `null`, `0n13` is a
//! bigint and `!name` an entity.
//!
//! ## Quick start
//!
//! ```rust
//! use churi_core::{decode, encode, Value};
//!
//! // Charge → value
//! let parsed = decode("search(rust)page(2)tags((uri)(parser))").unwrap();
//! assert_eq!(parsed.charge.get("page"), Some(&Value::from(2)));
//!
//! // Value → charge (roundtrip)
//! let text = encode(&parsed.charge).unwrap();
//! assert_eq!(text, "search(rust)page(2)tags((uri)(parser))");
//! ```
//!
//! ## Modules
//!
//! - [`decoder`]: charge text → receiver calls ([`Parser`], [`decode`])
//! - [`encoder`]: [`ChargeEncode`] values → charge text ([`encode`])
//! - [`rx`]: the receiver protocol the decoder writes into
//! - [`builder`]: the default receiver family building [`Value`]s
//! - [`ext`]: handlers for `!`-tagged entities and directives
//! - [`value`]: the [`Value`] model
//! - [`error`]: error types for decoding failures

pub mod builder;
pub mod decoder;
pub mod encoder;
pub mod error;
pub mod ext;
pub mod rx;
pub mod value;

pub use builder::{DirectiveBuilder, ListBuilder, MapBuilder, ValueBuilder};
pub use decoder::{decode, decode_json, decode_key, parser, Parsed, Parser, DEFAULT_MAX_DEPTH};
pub use encoder::{encode, encode_in, encode_json, encode_key, ChargeEncode, ChargeView, Json, Placement};
pub use error::ChargeError;
pub use ext::{ExtCursor, ExtHandler, ExtRegistry, ExtTarget};
pub use rx::{ChargeRx, DirectiveRx, ItemsRx, ListRx, MapRx, ValueRx, ValueSlot};
pub use value::{ChargeMap, Directive, Entity, Primitive, Value};
