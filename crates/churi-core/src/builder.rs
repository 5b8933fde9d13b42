//! Default receiver family building [`Value`] trees.
//!
//! Repeated map keys combine by the merge rule: the last scalar wins, lists
//! concatenate, and maps merge entry by entry, recursively. A repeated-entry
//! list (`foo(1)(2)`) is the exception: [`MapRx::start_list`] resets the entry
//! first, so a later `foo(3)(4)` replaces `[1, 2]` instead of extending it.

use crate::rx::{ChargeRx, DirectiveRx, ItemsRx, ListRx, MapRx};
use crate::value::{ChargeMap, Directive, Entity, Primitive, Value};

/// The default [`ChargeRx`] family. Builds [`Value`]s.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ValueBuilder;

impl ChargeRx for ValueBuilder {
    type Charge = Value;
    type Map = MapBuilder;
    type List = ListBuilder;
    type Directive = DirectiveBuilder;

    fn none(&self) -> Value {
        Value::None
    }

    fn create_value(&self, value: Primitive) -> Value {
        Value::from(value)
    }

    fn create_entity(&self, raw: &str) -> Value {
        Value::Entity(Entity::new(raw))
    }

    fn rx_map(&self) -> MapBuilder {
        MapBuilder::default()
    }

    fn rx_list(&self) -> ListBuilder {
        ListBuilder::default()
    }

    fn rx_directive(&self, raw_name: &str) -> DirectiveBuilder {
        DirectiveBuilder {
            rx: ValueBuilder,
            raw_name: raw_name.to_string(),
            items: Vec::new(),
        }
    }
}

/// Builds a [`Value::Map`], applying the merge rule to repeated keys.
#[derive(Debug, Default)]
pub struct MapBuilder {
    rx: ValueBuilder,
    entries: ChargeMap,
}

impl MapRx for MapBuilder {
    type Rx = ValueBuilder;

    fn charge_rx(&self) -> &ValueBuilder {
        &self.rx
    }

    fn put(&mut self, key: &str, charge: Value) {
        if charge.is_none() {
            return;
        }
        put_entry(&mut self.entries, key.to_string(), charge);
    }

    fn start_list(&mut self, key: &str) -> ListBuilder {
        let mut list = ListBuilder::default();
        // An empty list left in place keeps the entry's position; the
        // committing put concatenates onto it.
        if let Some(slot) = self.entries.get_mut(key) {
            list.items
                .push(std::mem::replace(slot, Value::List(Vec::new())));
        }
        list
    }

    fn end(self) -> Value {
        Value::Map(self.entries)
    }
}

fn put_entry(entries: &mut ChargeMap, key: String, charge: Value) {
    match entries.get_mut(&key) {
        Some(slot) => merge_value(slot, charge),
        None => {
            entries.insert(key, charge);
        }
    }
}

/// Merges `incoming` into `slot`: lists concatenate, maps merge, anything
/// else is replaced.
fn merge_value(slot: &mut Value, incoming: Value) {
    match (slot, incoming) {
        (Value::List(items), Value::List(more)) => items.extend(more),
        (Value::Map(entries), Value::Map(more)) => {
            for (key, value) in more {
                put_entry(entries, key, value);
            }
        }
        (slot, incoming) => *slot = incoming,
    }
}

/// Builds a [`Value::List`].
#[derive(Debug, Default)]
pub struct ListBuilder {
    rx: ValueBuilder,
    items: Vec<Value>,
}

impl ItemsRx for ListBuilder {
    type Rx = ValueBuilder;

    fn charge_rx(&self) -> &ValueBuilder {
        &self.rx
    }

    fn add(&mut self, charge: Value) {
        if !charge.is_none() {
            self.items.push(charge);
        }
    }
}

impl ListRx for ListBuilder {
    fn end(self) -> Value {
        Value::List(self.items)
    }
}

/// Builds a [`Value::Directive`].
///
/// The directive value is the empty map when no items were received, the
/// item itself when there is exactly one, and a list otherwise.
#[derive(Debug)]
pub struct DirectiveBuilder {
    rx: ValueBuilder,
    raw_name: String,
    items: Vec<Value>,
}

impl ItemsRx for DirectiveBuilder {
    type Rx = ValueBuilder;

    fn charge_rx(&self) -> &ValueBuilder {
        &self.rx
    }

    fn add(&mut self, charge: Value) {
        if !charge.is_none() {
            self.items.push(charge);
        }
    }
}

impl DirectiveRx for DirectiveBuilder {
    fn raw_name(&self) -> &str {
        &self.raw_name
    }

    fn end(mut self) -> Value {
        let value = match self.items.len() {
            0 => Value::empty_map(),
            1 => self.items.remove(0),
            _ => Value::List(self.items),
        };
        Value::Directive(Directive::new(self.raw_name, value))
    }
}
