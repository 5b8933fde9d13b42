//! Custom receiver families driven by the decoder.

use std::cell::RefCell;
use std::rc::Rc;

use churi_core::{
    ChargeRx, DirectiveRx, ItemsRx, ListRx, MapRx, Parser, Primitive, ValueRx, ValueSlot,
};
use serde_json::{json, Map, Value as Json};

// ============================================================================
// A family building serde_json values directly
// ============================================================================

#[derive(Debug, Clone, Copy, Default)]
struct JsonRx;

struct JsonMap {
    rx: JsonRx,
    entries: Map<String, Json>,
}

struct JsonList {
    rx: JsonRx,
    items: Vec<Json>,
}

struct JsonDirective {
    rx: JsonRx,
    name: String,
    items: Vec<Json>,
}

impl ChargeRx for JsonRx {
    type Charge = Json;
    type Map = JsonMap;
    type List = JsonList;
    type Directive = JsonDirective;

    fn none(&self) -> Json {
        Json::Null
    }

    fn create_value(&self, value: Primitive) -> Json {
        match value {
            Primitive::Null => Json::Null,
            Primitive::Bool(b) => json!(b),
            Primitive::Number(n) => json!(n),
            Primitive::BigInt(n) => json!(n.to_string()),
            Primitive::String(s) => json!(s),
        }
    }

    fn create_entity(&self, raw: &str) -> Json {
        json!(raw)
    }

    fn rx_map(&self) -> JsonMap {
        JsonMap {
            rx: *self,
            entries: Map::new(),
        }
    }

    fn rx_list(&self) -> JsonList {
        JsonList {
            rx: *self,
            items: Vec::new(),
        }
    }

    fn rx_directive(&self, raw_name: &str) -> JsonDirective {
        JsonDirective {
            rx: *self,
            name: raw_name.to_string(),
            items: Vec::new(),
        }
    }
}

impl MapRx for JsonMap {
    type Rx = JsonRx;

    fn charge_rx(&self) -> &JsonRx {
        &self.rx
    }

    fn put(&mut self, key: &str, charge: Json) {
        self.entries.insert(key.to_string(), charge);
    }

    fn start_list(&mut self, key: &str) -> JsonList {
        let mut list = self.rx.rx_list();
        list.items.extend(self.entries.get(key).cloned());
        list
    }

    fn end(self) -> Json {
        Json::Object(self.entries)
    }
}

impl ItemsRx for JsonList {
    type Rx = JsonRx;

    fn charge_rx(&self) -> &JsonRx {
        &self.rx
    }

    fn add(&mut self, charge: Json) {
        self.items.push(charge);
    }
}

impl ListRx for JsonList {
    fn end(self) -> Json {
        Json::Array(self.items)
    }
}

impl ItemsRx for JsonDirective {
    type Rx = JsonRx;

    fn charge_rx(&self) -> &JsonRx {
        &self.rx
    }

    fn add(&mut self, charge: Json) {
        self.items.push(charge);
    }
}

impl DirectiveRx for JsonDirective {
    fn raw_name(&self) -> &str {
        &self.name
    }

    fn end(mut self) -> Json {
        let value = if self.items.len() == 1 {
            self.items.remove(0)
        } else {
            Json::Array(self.items)
        };
        let mut entry = Map::new();
        entry.insert(self.name, value);
        Json::Object(entry)
    }
}

#[test]
fn json_family_builds_serde_values() {
    let parser = Parser::with_rx(JsonRx);
    let parsed = parser.parse("a(1)b((x)(y))c(!d(z))e").unwrap();
    assert_eq!(
        parsed.charge,
        json!({ "a": 1.0, "b": ["x", "y"], "c": { "!d": "z" }, "e": {} })
    );
    assert_eq!(parsed.end, 22);
}

#[test]
fn json_family_without_merging_overrides_entries() {
    let parser = Parser::with_rx(JsonRx);
    let charge = parser.parse("a(b(1))a(c(2))x(1)(2)").unwrap().charge;
    assert_eq!(charge, json!({ "a": { "c": 2.0 }, "x": [1.0, 2.0] }));
}

#[test]
fn json_family_sees_extensions() {
    let charge = Parser::with_rx(JsonRx).parse("(!NaN)(!Infinity)").unwrap().charge;
    // serde_json has no NaN, so the number converts to null.
    assert_eq!(charge, json!([null, null]));
}

// ============================================================================
// A family recording the calls it receives
// ============================================================================

#[derive(Debug, Clone, Default)]
struct Recorder(Rc<RefCell<Vec<String>>>);

impl Recorder {
    fn log(&self, event: impl Into<String>) {
        self.0.borrow_mut().push(event.into());
    }

    fn events(&self) -> Vec<String> {
        self.0.borrow().clone()
    }
}

struct RecMap(Recorder);
struct RecList(Recorder);
struct RecDirective(Recorder, String);

impl ChargeRx for Recorder {
    type Charge = ();
    type Map = RecMap;
    type List = RecList;
    type Directive = RecDirective;

    fn none(&self) {}

    fn create_value(&self, value: Primitive) {
        self.log(format!("value {value:?}"));
    }

    fn create_entity(&self, raw: &str) {
        self.log(format!("entity {raw}"));
    }

    fn rx_map(&self) -> RecMap {
        self.log("map");
        RecMap(self.clone())
    }

    fn rx_list(&self) -> RecList {
        self.log("list");
        RecList(self.clone())
    }

    fn rx_directive(&self, raw_name: &str) -> RecDirective {
        self.log(format!("directive {raw_name}"));
        RecDirective(self.clone(), raw_name.to_string())
    }
}

impl MapRx for RecMap {
    type Rx = Recorder;

    fn charge_rx(&self) -> &Recorder {
        &self.0
    }

    fn put(&mut self, key: &str, _charge: ()) {
        self.0.log(format!("put {key}"));
    }

    fn start_list(&mut self, key: &str) -> RecList {
        self.0.log(format!("promote {key}"));
        RecList(self.0.clone())
    }

    fn end(self) {
        self.0.log("end map");
    }
}

impl ItemsRx for RecList {
    type Rx = Recorder;

    fn charge_rx(&self) -> &Recorder {
        &self.0
    }

    fn add(&mut self, _charge: ()) {
        self.0.log("add");
    }
}

impl ListRx for RecList {
    fn end(self) {
        self.0.log("end list");
    }
}

impl ItemsRx for RecDirective {
    type Rx = Recorder;

    fn charge_rx(&self) -> &Recorder {
        &self.0
    }

    fn add(&mut self, _charge: ()) {
        self.0.log("add");
    }
}

impl DirectiveRx for RecDirective {
    fn raw_name(&self) -> &str {
        &self.1
    }

    fn end(self) {
        self.0.log(format!("end {}", self.1));
    }
}

#[test]
fn repeated_entry_is_promoted_through_start_list() {
    let recorder = Recorder::default();
    Parser::with_rx(recorder.clone()).parse("foo(1)(2)bar").unwrap();
    assert_eq!(
        recorder.events(),
        [
            "map",
            "value Number(1.0)",
            "put foo",
            "promote foo",
            "value Number(2.0)",
            "add",
            "end list",
            "put foo",
            "map",
            "end map",
            "put bar",
            "end map",
        ]
    );
}

#[test]
fn directive_items_and_entities_reach_the_family() {
    let recorder = Recorder::default();
    Parser::with_rx(recorder.clone()).parse("(!x(!y)(--))").unwrap();
    assert_eq!(
        recorder.events(),
        [
            "list",
            "directive !x",
            "entity !y",
            "add",
            "value Null",
            "add",
            "end !x",
            "add",
            "end list",
        ]
    );
}

#[test]
fn parse_into_caller_supplied_slot() {
    let recorder = Recorder::default();
    let parser = Parser::with_rx(recorder.clone());
    let mut slot = ValueSlot::new(&recorder);
    let end = parser.parse_into("'quoted)", &mut slot).unwrap();
    assert_eq!(end, 7);
    assert!(slot.is_set());
    assert_eq!(recorder.events(), ["value String(\"quoted\")"]);
}

#[test]
fn empty_slot_ends_with_none() {
    let rx = JsonRx;
    let slot = rx.rx_value();
    assert!(!slot.is_set());
    assert_eq!(slot.end(), Json::Null);
    let mut slot = ValueSlot::new(&rx);
    slot.set_value(Primitive::Bool(true));
    assert_eq!(slot.end(), json!(true));
}
