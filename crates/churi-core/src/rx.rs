//! Charge receiver protocol.
//!
//! The decoder never builds values itself. It recognizes the grammar and
//! pushes what it finds into receivers, so one parse can produce a generic
//! [`Value`](crate::Value) tree, a schema-typed object, or anything else a
//! receiver family decides to build.
//!
//! A receiver family implements [`ChargeRx`]. It fixes the charge type and
//! the three composite receivers:
//!
//! - [`MapRx`] collects map entries,
//! - [`ListRx`] collects list items,
//! - [`DirectiveRx`] collects the items of a `!name(...)` directive.
//!
//! [`ValueRx`] is the single-value target the decoder writes into. Receivers
//! returned by `start_*` methods are independent owned builders: once the
//! decoder has filled one, it ends it and commits the resulting charge back
//! through `set`, `put` or `add`. No receiver keeps a reference to its parent.

use crate::value::Primitive;

/// Charge type of a receiver family.
pub type ChargeOf<R> = <R as ChargeRx>::Charge;
/// Map receiver of a receiver family.
pub type MapOf<R> = <R as ChargeRx>::Map;
/// List receiver of a receiver family.
pub type ListOf<R> = <R as ChargeRx>::List;
/// Directive receiver of a receiver family.
pub type DirectiveOf<R> = <R as ChargeRx>::Directive;

/// A receiver family: creates charges and composite receivers.
///
/// Receivers hold a clone of their family (see [`MapRx::charge_rx`]), so
/// families are expected to be cheap to clone. Implement this trait on a
/// reference or an `Arc` when the family carries real state.
pub trait ChargeRx: Clone {
    /// The value representation built by this family.
    type Charge;
    type Map: MapRx<Rx = Self>;
    type List: ListRx<Rx = Self>;
    type Directive: DirectiveRx<Rx = Self>;

    /// The "no value" charge, returned when nothing was received.
    fn none(&self) -> Self::Charge;

    fn create_value(&self, value: Primitive) -> Self::Charge;

    fn create_entity(&self, raw: &str) -> Self::Charge;

    /// A stand-alone value receiver.
    fn rx_value(&self) -> ValueSlot<'_, Self> {
        ValueSlot::new(self)
    }

    fn rx_map(&self) -> Self::Map;

    fn rx_list(&self) -> Self::List;

    fn rx_directive(&self, raw_name: &str) -> Self::Directive;
}

/// Receives exactly one value.
///
/// Calling more than one of these methods for the same value violates the
/// protocol. The `start_*` methods only open a child receiver; the caller
/// ends the child and hands the charge to [`set`](ValueRx::set).
pub trait ValueRx {
    type Rx: ChargeRx;

    fn charge_rx(&self) -> &Self::Rx;

    fn set(&mut self, charge: ChargeOf<Self::Rx>);

    fn set_value(&mut self, value: Primitive) {
        let charge = self.charge_rx().create_value(value);
        self.set(charge);
    }

    fn set_entity(&mut self, raw: &str) {
        let charge = self.charge_rx().create_entity(raw);
        self.set(charge);
    }

    fn start_map(&mut self) -> MapOf<Self::Rx> {
        self.charge_rx().rx_map()
    }

    fn start_list(&mut self) -> ListOf<Self::Rx> {
        self.charge_rx().rx_list()
    }

    fn start_directive(&mut self, raw_name: &str) -> DirectiveOf<Self::Rx> {
        self.charge_rx().rx_directive(raw_name)
    }
}

/// Receives map entries.
///
/// Writing an existing key is not an error; how repeated keys combine is up to
/// the implementation (see [`MapBuilder`](crate::MapBuilder) for the default
/// merge rule).
pub trait MapRx {
    type Rx: ChargeRx;

    fn charge_rx(&self) -> &Self::Rx;

    fn put(&mut self, key: &str, charge: ChargeOf<Self::Rx>);

    fn put_value(&mut self, key: &str, value: Primitive) {
        let charge = self.charge_rx().create_value(value);
        self.put(key, charge);
    }

    fn put_entity(&mut self, key: &str, raw: &str) {
        let charge = self.charge_rx().create_entity(raw);
        self.put(key, charge);
    }

    /// Opens a map receiver for the value of `key`.
    fn start_map(&mut self, _key: &str) -> MapOf<Self::Rx> {
        self.charge_rx().rx_map()
    }

    /// Promotes the entry `key` to the repeated form `key(a)(b)...`.
    ///
    /// The returned list starts with the value already put under `key`, if
    /// any. Committing the list with [`put`](MapRx::put) replaces the entry
    /// rather than merging into it.
    fn start_list(&mut self, key: &str) -> ListOf<Self::Rx>;

    /// Opens a directive receiver for the value of `key`.
    fn start_directive(&mut self, _key: &str, raw_name: &str) -> DirectiveOf<Self::Rx> {
        self.charge_rx().rx_directive(raw_name)
    }

    /// Adds `key` mapped to an empty map, the meaning of a trailing bare key.
    fn add_suffix(&mut self, key: &str) {
        let suffix = self.start_map(key).end();
        self.put(key, suffix);
    }

    fn end(self) -> ChargeOf<Self::Rx>;
}

/// Receives a sequence of items. Shared by lists and directives.
pub trait ItemsRx {
    type Rx: ChargeRx;

    fn charge_rx(&self) -> &Self::Rx;

    fn add(&mut self, charge: ChargeOf<Self::Rx>);

    fn add_value(&mut self, value: Primitive) {
        let charge = self.charge_rx().create_value(value);
        self.add(charge);
    }

    fn add_entity(&mut self, raw: &str) {
        let charge = self.charge_rx().create_entity(raw);
        self.add(charge);
    }

    fn start_map(&mut self) -> MapOf<Self::Rx> {
        self.charge_rx().rx_map()
    }

    fn start_list(&mut self) -> ListOf<Self::Rx> {
        self.charge_rx().rx_list()
    }

    fn start_directive(&mut self, raw_name: &str) -> DirectiveOf<Self::Rx> {
        self.charge_rx().rx_directive(raw_name)
    }
}

pub trait ListRx: ItemsRx {
    fn end(self) -> ChargeOf<Self::Rx>;
}

pub trait DirectiveRx: ItemsRx {
    /// The directive name exactly as it appeared in the input.
    fn raw_name(&self) -> &str;

    fn end(self) -> ChargeOf<Self::Rx>;
}

/// Stand-alone [`ValueRx`] holding the received charge until [`end`](ValueSlot::end).
pub struct ValueSlot<'r, R: ChargeRx> {
    rx: &'r R,
    charge: Option<R::Charge>,
}

impl<'r, R: ChargeRx> ValueSlot<'r, R> {
    pub fn new(rx: &'r R) -> Self {
        Self { rx, charge: None }
    }

    /// Whether a value has been received.
    pub fn is_set(&self) -> bool {
        self.charge.is_some()
    }

    /// The received charge, or the family's `none()` if nothing was received.
    pub fn end(self) -> R::Charge {
        match self.charge {
            Some(charge) => charge,
            None => self.rx.none(),
        }
    }
}

impl<R: ChargeRx> ValueRx for ValueSlot<'_, R> {
    type Rx = R;

    fn charge_rx(&self) -> &R {
        self.rx
    }

    fn set(&mut self, charge: R::Charge) {
        debug_assert!(self.charge.is_none(), "value received more than once");
        self.charge = Some(charge);
    }
}

/// Routes a single value into a map entry.
pub(crate) struct EntryRx<'a, M: MapRx> {
    map: &'a mut M,
    key: &'a str,
}

impl<'a, M: MapRx> EntryRx<'a, M> {
    pub(crate) fn new(map: &'a mut M, key: &'a str) -> Self {
        Self { map, key }
    }
}

impl<M: MapRx> ValueRx for EntryRx<'_, M> {
    type Rx = M::Rx;

    fn charge_rx(&self) -> &M::Rx {
        self.map.charge_rx()
    }

    fn set(&mut self, charge: ChargeOf<M::Rx>) {
        self.map.put(self.key, charge);
    }

    fn set_value(&mut self, value: Primitive) {
        self.map.put_value(self.key, value);
    }

    fn set_entity(&mut self, raw: &str) {
        self.map.put_entity(self.key, raw);
    }

    fn start_map(&mut self) -> MapOf<M::Rx> {
        self.map.start_map(self.key)
    }

    fn start_directive(&mut self, raw_name: &str) -> DirectiveOf<M::Rx> {
        self.map.start_directive(self.key, raw_name)
    }
}

/// Routes a single value into a list or directive item.
pub(crate) struct ItemRx<'a, I: ItemsRx> {
    items: &'a mut I,
}

impl<'a, I: ItemsRx> ItemRx<'a, I> {
    pub(crate) fn new(items: &'a mut I) -> Self {
        Self { items }
    }
}

impl<I: ItemsRx> ValueRx for ItemRx<'_, I> {
    type Rx = I::Rx;

    fn charge_rx(&self) -> &I::Rx {
        self.items.charge_rx()
    }

    fn set(&mut self, charge: ChargeOf<I::Rx>) {
        self.items.add(charge);
    }

    fn set_value(&mut self, value: Primitive) {
        self.items.add_value(value);
    }

    fn set_entity(&mut self, raw: &str) {
        self.items.add_entity(raw);
    }

    fn start_map(&mut self) -> MapOf<I::Rx> {
        self.items.start_map()
    }

    fn start_list(&mut self) -> ListOf<I::Rx> {
        self.items.start_list()
    }

    fn start_directive(&mut self, raw_name: &str) -> DirectiveOf<I::Rx> {
        self.items.start_directive(raw_name)
    }
}
