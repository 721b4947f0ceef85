use crate::{
    compare::{
        Collation, Comparator, ComparatorResolver, NaturalOrder, ValueComparatorRegistry,
        value_cmp,
    },
    error::ErrorClass,
    value::{Value, ValueType},
};
use std::cmp::Ordering;

fn v_txt(s: &str) -> Value {
    Value::Text(s.to_string())
}

#[test]
fn builtin_registry_resolves_every_scalar_type() {
    let registry = ValueComparatorRegistry::builtin();

    for ty in ValueType::ALL {
        let resolved = registry.resolve(&ty);
        if ty == ValueType::List {
            let err = resolved.expect_err("list has no total order");
            assert_eq!(err.class, ErrorClass::Unsupported);
            assert!(err.is_unsupported_type());
            assert!(err.message.contains("list"), "unexpected error: {err:?}");
        } else {
            let comparator = resolved.expect("scalar type should resolve");
            assert_eq!(comparator.label(), ty.label());
        }
    }
}

#[test]
fn text_binds_binary_collation() {
    let registry = ValueComparatorRegistry::builtin();
    let text = registry.resolve(&ValueType::Text).expect("text resolves");

    assert_eq!(text.collation(), Some(Collation::Binary));
    // byte order: uppercase before lowercase, no locale folding
    assert_eq!(text.compare(&v_txt("Zebra"), &v_txt("apple")), Ordering::Less);
    assert_eq!(text.compare(&v_txt("é"), &v_txt("z")), Ordering::Greater);

    let int = registry.resolve(&ValueType::Int).expect("int resolves");
    assert_eq!(int.collation(), None);
}

#[test]
fn resolved_comparator_admits_only_its_type() {
    let registry = ValueComparatorRegistry::builtin();
    let int = registry.resolve(&ValueType::Int).expect("int resolves");

    assert!(int.admits(&Value::Int(1)));
    assert!(!int.admits(&Value::Uint(1)));
    assert!(!int.admits(&v_txt("1")));
}

#[test]
fn registered_comparator_overrides_builtin_order() {
    let mut registry = ValueComparatorRegistry::builtin();
    registry.register(
        ValueType::Int,
        Comparator::new("int_desc", |a: &Value, b: &Value| value_cmp(b, a)),
    );

    let int = registry.resolve(&ValueType::Int).expect("int resolves");
    assert_eq!(int.label(), "int_desc");
    assert_eq!(int.compare(&Value::Int(1), &Value::Int(2)), Ordering::Greater);
    assert!(int.has_admission(), "registry should install type admission");
    assert!(!int.admits(&Value::Bool(true)));
}

#[test]
fn unregistered_type_fails_resolution() {
    let mut registry = ValueComparatorRegistry::builtin();
    assert!(registry.supports(ValueType::Blob));

    let removed = registry.unregister(ValueType::Blob);
    assert!(removed.is_some());
    assert!(!registry.supports(ValueType::Blob));

    let err = registry
        .resolve(&ValueType::Blob)
        .expect_err("blob order was removed");
    assert!(err.is_unsupported_type());
}

#[test]
fn value_cmp_is_deterministic_across_variants() {
    assert_eq!(value_cmp(&Value::Int(5), &v_txt("a")), Ordering::Less);
    assert_eq!(value_cmp(&v_txt("a"), &Value::Int(5)), Ordering::Greater);
    assert_eq!(value_cmp(&Value::Null, &Value::Null), Ordering::Equal);
    assert_eq!(
        value_cmp(
            &Value::List(vec![Value::Int(1)]),
            &Value::List(vec![Value::Int(1), Value::Int(0)])
        ),
        Ordering::Less
    );
}

#[test]
fn natural_order_resolver_uses_ord() {
    let comparator: Comparator<i64> = NaturalOrder.resolve(&()).expect("ord types resolve");

    assert_eq!(comparator.compare(&-1, &3), Ordering::Less);
    assert!(comparator.admits(&42));
    assert!(!comparator.has_admission());
}
