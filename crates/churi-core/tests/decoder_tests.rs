use churi_core::{decode, decode_json, ChargeError, Directive, Entity, Parsed, Parser, Value};
use num_bigint::BigInt;

fn charge(input: &str) -> Value {
    decode(input).unwrap().charge
}

fn parsed(input: &str) -> (Value, usize) {
    let Parsed { charge, end } = decode(input).unwrap();
    (charge, end)
}

fn map<const N: usize>(entries: [(&str, Value); N]) -> Value {
    entries.into_iter().collect()
}

fn list<const N: usize>(items: [Value; N]) -> Value {
    Value::List(items.into())
}

fn num(n: f64) -> Value {
    Value::Number(n)
}

fn text(s: &str) -> Value {
    Value::from(s)
}

fn empty() -> Value {
    Value::empty_map()
}

fn big(n: i64) -> Value {
    Value::BigInt(BigInt::from(n))
}

// ============================================================================
// Strings
// ============================================================================

#[test]
fn decode_top_level_string() {
    assert_eq!(parsed("Hello,%20World!"), (text("Hello, World!"), 15));
}

#[test]
fn decode_string_entry() {
    assert_eq!(charge("foo(bar)"), map([("foo", text("bar"))]));
}

#[test]
fn decode_dash_prefixed_string() {
    assert_eq!(charge("foo(-bar)"), map([("foo", text("-bar"))]));
}

#[test]
fn decode_percent_encoded_quotes() {
    assert_eq!(charge("foo(%27bar%27)"), map([("foo", text("'bar'"))]));
}

#[test]
fn decode_quoted_string() {
    assert_eq!(parsed("'foo"), (text("foo"), 4));
    assert_eq!(charge("foo('bar)"), map([("foo", text("bar"))]));
    assert_eq!(charge("('bar)"), list([text("bar")]));
}

#[test]
fn decode_empty_quoted_string() {
    assert_eq!(parsed("'"), (text(""), 1));
    assert_eq!(charge("foo(')"), map([("foo", text(""))]));
    assert_eq!(charge("(')"), list([text("")]));
}

#[test]
fn decode_quoted_digits_stay_strings() {
    assert_eq!(charge("'123"), text("123"));
    assert_eq!(charge("'!foo"), text("!foo"));
}

#[test]
fn decode_invalid_utf8_is_an_error() {
    let err = decode("foo(%FF)").unwrap_err();
    assert!(matches!(err, ChargeError::InvalidEncoding { offset: 4, .. }));
}

// ============================================================================
// Numbers and bigints
// ============================================================================

#[test]
fn decode_decimal_numbers() {
    assert_eq!(parsed("123E-2"), (num(1.23), 6));
    assert_eq!(parsed("-123E-2"), (num(-1.23), 7));
    assert_eq!(parsed("0"), (num(0.0), 1));
    assert_eq!(charge("foo(42)"), map([("foo", num(42.0))]));
    assert_eq!(charge("(3.5)"), list([num(3.5)]));
}

#[test]
fn decode_negative_zero_keeps_sign() {
    let value = charge("-0").as_f64().unwrap();
    assert_eq!(value, 0.0);
    assert!(value.is_sign_negative());
}

#[test]
fn decode_binary_numbers() {
    assert_eq!(charge("foo(0b1101)"), map([("foo", num(13.0))]));
    assert_eq!(charge("foo(-0b1101)"), map([("foo", num(-13.0))]));
    assert_eq!(charge("foo(0b)"), map([("foo", num(0.0))]));
}

#[test]
fn decode_hexadecimal_numbers() {
    assert_eq!(charge("foo(0x123)"), map([("foo", num(291.0))]));
    assert_eq!(charge("foo(-0x123)"), map([("foo", num(-291.0))]));
    assert_eq!(charge("foo(0x)"), map([("foo", num(0.0))]));
    assert!(charge("-0x").as_f64().unwrap().is_sign_negative());
}

#[test]
fn decode_bigints() {
    assert_eq!(charge("foo(0n13)"), map([("foo", big(13))]));
    assert_eq!(charge("foo(-0n13)"), map([("foo", big(-13))]));
    assert_eq!(charge("foo(0n)"), map([("foo", big(0))]));
    assert_eq!(charge("(-0n)"), list([big(0)]));
    assert_eq!(
        charge("0n123456789012345678901234567890"),
        Value::BigInt("123456789012345678901234567890".parse().unwrap())
    );
}

#[test]
fn decode_malformed_number_is_an_error() {
    let err = decode("foo(12abc)").unwrap_err();
    assert!(matches!(
        err,
        ChargeError::MalformedNumber { offset: 4, ref token } if token == "12abc"
    ));
    assert!(matches!(
        decode("0xfg").unwrap_err(),
        ChargeError::MalformedNumber { .. }
    ));
    assert!(matches!(
        decode("0n12x").unwrap_err(),
        ChargeError::MalformedBigInt { .. }
    ));
}

#[test]
fn decode_malformed_negative_number_reports_raw_token() {
    let err = decode("n(-1foo)").unwrap_err();
    assert!(matches!(
        err,
        ChargeError::MalformedNumber { offset: 2, ref token } if token == "-1foo"
    ));
}

#[test]
fn decode_non_finite_entities() {
    assert!(charge("!NaN").as_f64().unwrap().is_nan());
    assert_eq!(charge("!Infinity"), num(f64::INFINITY));
    assert_eq!(charge("foo(!-Infinity)"), map([("foo", num(f64::NEG_INFINITY))]));
}

// ============================================================================
// Booleans, null, empty containers
// ============================================================================

#[test]
fn decode_booleans() {
    assert_eq!(charge("!"), Value::Bool(true));
    assert_eq!(charge("-"), Value::Bool(false));
    assert_eq!(charge("foo(!)"), map([("foo", Value::Bool(true))]));
    assert_eq!(charge("(-)"), list([Value::Bool(false)]));
}

#[test]
fn decode_null() {
    assert_eq!(parsed("--"), (Value::Null, 2));
    assert_eq!(charge("foo(--)"), map([("foo", Value::Null)]));
    assert_eq!(charge("(--)"), list([Value::Null]));
}

#[test]
fn decode_empty_map() {
    assert_eq!(parsed(""), (empty(), 0));
    assert_eq!(parsed("$"), (empty(), 1));
    assert_eq!(charge("foo()"), map([("foo", empty())]));
    assert_eq!(charge("()"), list([empty()]));
}

#[test]
fn decode_escaped_suffix() {
    assert_eq!(charge("$foo"), map([("foo", empty())]));
    assert_eq!(charge("$%24"), map([("$", empty())]));
}

#[test]
fn decode_empty_list() {
    assert_eq!(parsed("!!"), (list([]), 2));
    assert_eq!(charge("foo(!!)"), map([("foo", list([]))]));
    assert_eq!(charge("(!!)"), list([list([])]));
}

// ============================================================================
// Entities and directives
// ============================================================================

#[test]
fn decode_unknown_entity_keeps_raw_text() {
    let entity = Value::Entity(Entity::new("!bar%20baz"));
    assert_eq!(charge("!bar%20baz"), entity);
    assert_eq!(charge("foo(!bar%20baz)"), map([("foo", entity.clone())]));
    assert_eq!(charge("(!bar%20baz)"), list([entity]));
}

#[test]
fn decode_top_level_directive() {
    let Value::Directive(directive) = charge("!bar%20baz(foo)((1))test") else {
        panic!("expected a directive");
    };
    assert_eq!(directive.raw_name(), "!bar%20baz");
    assert_eq!(
        directive.value(),
        &list([text("foo"), list([num(1.0)]), map([("test", empty())])])
    );
}

#[test]
fn decode_directive_entry_with_single_item() {
    assert_eq!(
        charge("foo(!bar%20baz(1))"),
        map([(
            "foo",
            Value::Directive(Directive::new("!bar%20baz", num(1.0)))
        )])
    );
}

#[test]
fn decode_directive_item_with_empty_value() {
    assert_eq!(
        charge("(!bar%20baz())"),
        list([Value::Directive(Directive::new("!bar%20baz", empty()))])
    );
}

// ============================================================================
// Lists
// ============================================================================

#[test]
fn decode_top_level_list() {
    assert_eq!(charge("(123)"), list([num(123.0)]));
    assert_eq!(charge("(123)(456)"), list([num(123.0), num(456.0)]));
}

#[test]
fn decode_repeated_entry_as_list() {
    assert_eq!(
        charge("foo(1)(bar)()"),
        map([("foo", list([num(1.0), text("bar"), empty()]))])
    );
    assert_eq!(
        charge("foo()(1)"),
        map([("foo", list([empty(), num(1.0)]))])
    );
}

#[test]
fn decode_nested_list_entry() {
    assert_eq!(
        charge("foo((1)(bar)())"),
        map([("foo", list([num(1.0), text("bar"), empty()]))])
    );
    assert_eq!(charge("foo((1))"), map([("foo", list([num(1.0)]))]));
    assert_eq!(charge("foo(())"), map([("foo", list([empty()]))]));
}

#[test]
fn decode_list_of_lists() {
    assert_eq!(
        charge("foo(((1)(bar)(!))((2)(baz)(-)))"),
        map([(
            "foo",
            list([
                list([num(1.0), text("bar"), Value::Bool(true)]),
                list([num(2.0), text("baz"), Value::Bool(false)]),
            ])
        )])
    );
}

// ============================================================================
// Maps
// ============================================================================

#[test]
fn decode_nested_maps() {
    assert_eq!(
        charge("foo(bar(baz))"),
        map([("foo", map([("bar", text("baz"))]))])
    );
    assert_eq!(
        charge("foo(bar(baz(13)))"),
        map([("foo", map([("bar", map([("baz", num(13.0))]))]))])
    );
}

#[test]
fn decode_keys() {
    assert_eq!(charge("%27foo%27(13)"), map([("'foo'", num(13.0))]));
    assert_eq!(charge("'foo'(13)"), map([("foo'", num(13.0))]));
    assert_eq!(charge("'(13)"), map([("", num(13.0))]));
    assert_eq!(charge("$(13)"), map([("", num(13.0))]));
    assert_eq!(charge("$!foo(13)"), map([("!foo", num(13.0))]));
}

#[test]
fn decode_entries_keep_order() {
    let value = charge("foo(1)bar(test)baz()suffix");
    assert_eq!(
        value,
        map([
            ("foo", num(1.0)),
            ("bar", text("test")),
            ("baz", empty()),
            ("suffix", empty()),
        ])
    );
    let keys: Vec<&str> = value.as_map().unwrap().keys().map(String::as_str).collect();
    assert_eq!(keys, ["foo", "bar", "baz", "suffix"]);
}

#[test]
fn decode_entry_after_list_valued_entry() {
    assert_eq!(
        charge("foo(1)(bar)test(-)"),
        map([
            ("foo", list([num(1.0), text("bar")])),
            ("test", Value::Bool(false)),
        ])
    );
}

#[test]
fn decode_last_entry_wins() {
    assert_eq!(charge("foo(1)foo(bar)foo"), map([("foo", empty())]));
}

#[test]
fn decode_trailing_map_of_top_level_list() {
    assert_eq!(
        charge("(123)(456)foo(test)bar(1)tail"),
        list([
            num(123.0),
            num(456.0),
            map([("foo", text("test")), ("bar", num(1.0)), ("tail", empty())]),
        ])
    );
    assert_eq!(
        charge("(123)(456)foo"),
        list([num(123.0), num(456.0), map([("foo", empty())])])
    );
}

#[test]
fn decode_trailing_map_of_nested_list() {
    assert_eq!(
        charge("foo(bar((1)(2)test(3))))"),
        map([(
            "foo",
            map([("bar", list([num(1.0), num(2.0), map([("test", num(3.0))])]))])
        )])
    );
    assert_eq!(
        charge("foo(bar((1)(2)test)))"),
        map([(
            "foo",
            map([("bar", list([num(1.0), num(2.0), map([("test", empty())])]))])
        )])
    );
}

#[test]
fn decode_suffix_after_entries() {
    assert_eq!(
        charge("foo(bar(baz)test))"),
        map([("foo", map([("bar", text("baz")), ("test", empty())]))])
    );
    assert_eq!(
        charge("foo(bar(1)(2)test))"),
        map([(
            "foo",
            map([("bar", list([num(1.0), num(2.0)])), ("test", empty())])
        )])
    );
}

// ============================================================================
// Stop offsets
// ============================================================================

#[test]
fn decode_stops_at_unmatched_close() {
    assert_eq!(parsed("foo)"), (text("foo"), 3));
    assert_eq!(parsed("(foo))"), (list([text("foo")]), 5));
    assert_eq!(parsed("foo(bar))"), (map([("foo", text("bar"))]), 8));
    assert_eq!(
        parsed("foo(bar)baz)"),
        (map([("foo", text("bar")), ("baz", empty())]), 11)
    );
    assert_eq!(parsed("foo(13))"), (map([("foo", num(13.0))]), 7));
}

#[test]
fn decode_runs_unclosed_input_to_the_end() {
    assert_eq!(parsed("foo(13"), (map([("foo", num(13.0))]), 6));
    assert_eq!(
        parsed("foo(1)bar(2)baz(13"),
        (
            map([("foo", num(1.0)), ("bar", num(2.0)), ("baz", num(13.0))]),
            18
        )
    );
    assert_eq!(
        parsed("foo(bar(baz(13"),
        (map([("foo", map([("bar", map([("baz", num(13.0))]))]))]), 14)
    );
    assert_eq!(
        parsed("foo(1)bar(2)baz("),
        (
            map([("foo", num(1.0)), ("bar", num(2.0)), ("baz", empty())]),
            16
        )
    );
    assert_eq!(
        parsed("foo(bar(baz("),
        (map([("foo", map([("bar", map([("baz", empty())]))]))]), 12)
    );
}

// ============================================================================
// Depth limit and JSON output
// ============================================================================

#[test]
fn decode_rejects_nesting_beyond_max_depth() {
    let parser = Parser::new().with_max_depth(4);
    assert!(parser.parse("a(b(c(d(1))))").is_ok());
    let err = parser.parse("a(b(c(d(e(1)))))").unwrap_err();
    assert!(matches!(err, ChargeError::TooDeep { max_depth: 4, .. }));
}

#[test]
fn decode_default_depth_survives_deep_lists() {
    let input = format!("{}{}", "(".repeat(200), ")".repeat(200));
    assert!(decode(&input).is_ok());
    let input = "(".repeat(1000);
    assert!(matches!(
        decode(&input).unwrap_err(),
        ChargeError::TooDeep { max_depth: 256, .. }
    ));
}

#[test]
fn decode_json_renders_value() {
    let json = decode_json("foo(bar)baz((1)(!))big(0n13)").unwrap();
    assert_eq!(json, r#"{"foo":"bar","baz":[1,true],"big":"13"}"#);
}
