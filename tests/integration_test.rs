//! Integration tests for the filtering engine, rules and built-in filters

use filtration::{assign, name, resolve, Bag, Filtration, RuleSet, Value};
use serde_json::json;

fn bag(json: serde_json::Value) -> Bag {
    Value::from(json).into_map().unwrap()
}

fn sample_data() -> Bag {
    bag(json!({
        "name": "inhere",
        "age": "50",
        "money": "50.34",
        "remember": "yes",
        "sub": {"k0": "v0"},
        "sub1": ["1", "2"],
        "tags": "go;lib",
        "str1": " word ",
        "ids": [1, 2, 2, 1]
    }))
}

#[test]
fn test_name() {
    assert_eq!(name("str2time"), "strToTime");
    assert_eq!(name("some"), "some");
    assert_eq!(name(name("str2arr")), name("str2arr"));
}

#[test]
fn test_lookups_without_rules() {
    let data = bag(json!({
        "key0": " abc ",
        "key1": "2",
        "sub": {"k0": "v0"}
    }));
    let f = Filtration::new(&data);

    assert_eq!(f.get("key1"), Some(&Value::from("2")));
    assert_eq!(f.get("sub.k0"), Some(&Value::from("v0")));
    assert_eq!(f.safe("key1"), None);
    assert_eq!(f.raw("key1"), Some(&Value::from("2")));
    assert_eq!(f.raw("not-exist"), None);
    assert_eq!(f.must_get("absent"), Value::Null);
}

#[test]
fn test_sanitize_with_rule_map() {
    let data = bag(json!({"name": " inhere ", "email": " my@email.com "}));
    let mut f = Filtration::new(&data);
    f.attach_rules([("email", "email"), ("name", "trim|ucFirst")]);

    assert!(f.sanitize().is_ok());
    assert_eq!(f.string("name"), "Inhere");
    assert_eq!(f.string("email"), "my@email.com");
}

#[test]
fn test_filtering() {
    let data = sample_data();
    let mut f = Filtration::new(&data);
    f.attach_rule("name", "upper")
        .attach_rule("age", "int")
        .attach_rule("money", "float")
        .attach_rule("remember", "bool")
        .attach_rule("sub1", "strings2ints")
        .attach_rule("tags", "str2arr:;")
        .attach_rule("ids", "unique")
        .attach_rule("str1", "ltrim|rtrim")
        .attach_rule("not-exist", "unique");

    assert!(f.filtering().is_ok());
    assert!(f.filtering().is_ok());
    assert!(f.is_ok());

    assert!(f.bool("remember"));
    assert!(!f.bool("not-exist"));
    assert_eq!(f.int("age"), 50);
    assert_eq!(f.int("not-exist"), 0);
    assert_eq!(f.must_get("age"), Value::Int(50));
    assert_eq!(f.int64("age"), 50);
    assert_eq!(f.int64("not-exist"), 0);
    assert_eq!(f.must_get("money"), Value::Float(50.34));
    assert_eq!(f.must_get("sub1"), Value::from(vec![1, 2]));
    assert_eq!(f.must_get("ids").as_list().map(|ids| ids.len()), Some(2));
    assert_eq!(f.must_get("tags"), Value::from(vec!["go", "lib"]));
    assert_eq!(f.filtered_data().get("name"), Some(&Value::from("INHERE")));
    assert_eq!(f.string("str1"), "word");
    assert!(f.safe("not-exist").is_none());

    // raw data is untouched
    assert_eq!(data.get("age"), Some(&Value::from("50")));
    assert_eq!(f.raw("name"), Some(&Value::from("inhere")));
}

#[test]
fn test_unique_strings_keep_order() {
    let data = bag(json!({"ids": ["1", "2", "2", "1"]}));
    let mut f = Filtration::new(&data);
    f.attach_rule("ids", "unique");

    f.filtering().unwrap();
    assert_eq!(f.must_get("ids"), Value::from(vec!["1", "2"]));
}

#[test]
fn test_failed_rule_reports_error() {
    let data = sample_data();
    let mut f = Filtration::new(&data);
    f.attach_rule("name", "int").attach_rule("age", "int");

    let err = f.sanitize().unwrap_err();
    assert_eq!(err.field, "name");
    assert!(!f.is_ok());
    assert_eq!(f.filtered_data().get("age"), Some(&Value::Int(50)));
    assert!(f.safe("name").is_none());
    assert_eq!(f.string("name"), "inhere");

    // same outcome on the second call
    assert_eq!(f.sanitize().unwrap_err(), err);
}

#[test]
fn test_string_filters_and_time() {
    let mut data = sample_data();
    data.insert("name".to_string(), Value::from(" inhere "));
    data.insert("sDate".to_string(), Value::from("2018-10-16 12:34"));
    data.insert("msg".to_string(), Value::from(" hello world "));
    data.insert("msg1".to_string(), Value::from("helloWorld"));
    data.insert("msg2".to_string(), Value::from("hello_world"));

    let mut f = Filtration::new(&data);
    f.attach_rules([
        ("age", "uint"),
        ("money", "float"),
        ("name", "trim|ucFirst"),
        ("str1", "trim|upper"),
        ("sDate", "str2time"),
        ("msg", "trim|ucWord"),
        ("msg1", "snake"),
        ("msg2", "camel"),
    ]);

    assert!(f.sanitize().is_ok());
    assert_eq!(f.must_get("age"), Value::Uint(50));
    assert_eq!(f.string("name"), "Inhere");
    assert_eq!(f.string("str1"), "WORD");
    assert_eq!(f.string("msg"), "Hello World");
    assert_eq!(f.string("msg1"), "hello_world");
    assert_eq!(f.string("msg2"), "helloWorld");

    let time = f.safe("sDate").unwrap();
    assert!(matches!(time, Value::Time(_)));
    assert_eq!(time.to_string(), "2018-10-16 12:34:00 UTC");
}

#[test]
fn test_url_and_substr() {
    let mut data = sample_data();
    data.insert("url".to_string(), Value::from("a.com?p=1"));
    data.insert("msg1".to_string(), Value::from("helloWorld"));

    let mut f = Filtration::new(&data);
    f.attach_rule("url", "urlEncode").attach_rule("msg1", "substr:0,2");

    assert!(f.sanitize().is_ok());
    assert_eq!(f.string("msg1"), "he");
    assert_eq!(f.string("url"), "a.com?p%3D1");
}

#[test]
fn test_dotted_field_rule() {
    let data = bag(json!({"sub": {"k0": " v0 "}}));
    let mut f = Filtration::new(&data);
    f.attach_rule("sub.k0", "trim|upper");

    f.filtering().unwrap();
    assert_eq!(f.safe("sub.k0"), Some(&Value::from("V0")));
    assert_eq!(f.raw("sub.k0"), Some(&Value::from(" v0 ")));
    assert_eq!(f.filtered_data().len(), 1);
}

#[test]
fn test_merge_results_into_document() {
    let data = bag(json!({"name": " inhere ", "sub": {"k0": " v0 ", "k1": "x"}}));
    let mut f = Filtration::new(&data);
    f.attach_rule("name", "trim").attach_rule("sub.k0", "trim|upper");
    f.filtering().unwrap();

    let mut merged = data.clone();
    for (field, value) in f.filtered_data() {
        assign(&mut merged, &field, value);
    }

    let keys: Vec<&String> = merged.keys().collect();
    assert_eq!(keys, vec!["name", "sub"]);
    assert_eq!(merged.get("name"), Some(&Value::from("inhere")));
    assert_eq!(resolve(&merged, "sub.k0"), Some(&Value::from("V0")));
    assert_eq!(resolve(&merged, "sub.k1"), Some(&Value::from("x")));
}

#[test]
fn test_rule_set_from_config() {
    let rule_set = RuleSet::from_yaml_str(
        r#"
rules:
  name: trim|ucFirst
  age: toInt
  tags: "str2arr:;|unique"
"#,
    )
    .unwrap();

    let data = bag(json!({"name": " inhere ", "age": "7", "tags": "a;b;a"}));
    let mut f = Filtration::new(&data);
    f.attach_rule_set(&rule_set);

    assert!(f.filtering().is_ok());
    assert_eq!(f.string("name"), "Inhere");
    assert_eq!(f.int("age"), 7);
    assert_eq!(f.must_get("tags"), Value::from(vec!["a", "b"]));
}
