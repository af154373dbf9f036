//! One-off overrides on top of a parsed store

use macroconf::{config_store, Error, Value};
use pretty_assertions::assert_eq;
use std::path::PathBuf;

const CONFIG: &str = "\
[global]
massagers =
    *:port = macroconf.IntegerMassager
    instance:debug = macroconf.BooleanMassager
    instance:data = macroconf.PathMassager

[instance:base]
debug = no
data = base

[instance:web]
<= base
port = 80
";

#[test]
fn overrides_use_section_massagers() {
    let store = config_store!(CONFIG, "/etc/app");

    let effective = store
        .effective(
            "instance",
            "web",
            [("port", "8080"), ("debug", "yes"), ("data", "../var")],
        )
        .unwrap();

    assert_eq!(effective.get("port").unwrap(), Some(Value::Integer(8080)));
    assert_eq!(effective.get("debug").unwrap(), Some(Value::Boolean(true)));
    assert_eq!(
        effective.get("data").unwrap(),
        Some(Value::Path(PathBuf::from("/etc/var")))
    );
}

#[test]
fn store_is_unchanged() {
    let store = config_store!(CONFIG, "/etc/app");
    let before = store.to_value().unwrap();

    let effective = store
        .effective("instance", "web", [("port", "8080"), ("new", "1")])
        .unwrap();
    assert_eq!(effective.get("new").unwrap(), Some(Value::from("1")));

    assert_eq!(store.to_value().unwrap(), before);
    assert_eq!(
        store.get("instance", "web", "port").unwrap(),
        Some(Value::Integer(80))
    );
}

#[test]
fn inherited_values_stay_lazy() {
    let text = "\
[global]
massagers = :count = macroconf.IntegerMassager
[global:app]
count = many
";
    let store = config_store!(text);

    // the broken inherited value only fails once it's read
    let effective = store.effective("global", "app", [("other", "1")]).unwrap();
    assert!(matches!(
        effective.get("count").unwrap_err(),
        Error::TypeCoercion { .. }
    ));

    let err = store
        .effective("global", "app", [("count", "lots")])
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        r#"Invalid integer value "lots" for key 'count'"#
    );
}

#[test]
fn unknown_section() {
    let store = config_store!(CONFIG);

    let err = store
        .effective("instance", "db", [("port", "1")])
        .unwrap_err();
    assert!(matches!(err, Error::SectionNotFound { .. }));
}
