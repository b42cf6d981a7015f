use maroonval::{u64_add, u64_cmp, u64_mul, u64_sub, Value};
use pretty_assertions::assert_eq;
use std::cmp::Ordering;

#[test]
fn display_forms() {
    assert_eq!(Value::U64(42).to_string(), "42");
    assert_eq!(Value::Bool(true).to_string(), "true");
    assert_eq!(Value::Bool(false).to_string(), "false");
    assert_eq!(Value::OptU64(None).to_string(), "None");
    assert_eq!(Value::OptU64(Some(7)).to_string(), "Some(7)");
    assert_eq!(Value::OptBool(Some(false)).to_string(), "Some(false)");
}

#[test]
fn type_names() {
    assert_eq!(Value::U64(0).type_name(), "U64");
    assert_eq!(Value::Bool(false).type_name(), "BOOL");
    assert_eq!(Value::OptU64(None).type_name(), "OPTIONAL_U64");
    assert_eq!(Value::OptBool(None).type_name(), "OPTIONAL_BOOL");
}

#[test]
fn arithmetic_is_u64_only() {
    assert_eq!(u64_add(&Value::U64(2), &Value::U64(3)), Some(Value::U64(5)));
    assert_eq!(u64_sub(&Value::U64(3), &Value::U64(2)), Some(Value::U64(1)));
    assert_eq!(u64_mul(&Value::U64(4), &Value::U64(5)), Some(Value::U64(20)));
    assert_eq!(u64_add(&Value::U64(2), &Value::Bool(true)), None);
    assert_eq!(u64_add(&Value::OptU64(Some(2)), &Value::U64(1)), None);
}

#[test]
fn subtraction_wraps() {
    assert_eq!(
        u64_sub(&Value::U64(0), &Value::U64(1)),
        Some(Value::U64(u64::MAX))
    );
}

#[test]
fn ordering() {
    assert_eq!(
        u64_cmp(&Value::U64(2), &Value::U64(3)),
        Some(Ordering::Less)
    );
    assert_eq!(
        u64_cmp(&Value::U64(3), &Value::U64(3)),
        Some(Ordering::Equal)
    );
    assert_eq!(u64_cmp(&Value::Bool(true), &Value::U64(3)), None);
}

#[test]
fn optional_wrapping() {
    let some = Value::some_of(&Value::U64(7)).unwrap();
    assert_eq!(some, Value::OptU64(Some(7)));
    assert_eq!(some.unwrap_some(), Some(Value::U64(7)));
    assert_eq!(Value::none_of("OPTIONAL_U64"), Some(Value::OptU64(None)));
    assert_eq!(Value::none_of("U64"), None);
    assert_eq!(Value::OptU64(None).unwrap_some(), None);
    assert_eq!(Value::some_of(&Value::OptU64(None)), None);
}
