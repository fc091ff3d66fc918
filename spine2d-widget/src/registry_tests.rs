use crate::{Error, Registry};

#[test]
fn identifiers_are_unique() {
    let mut registry = Registry::new();
    registry.register("hero", 1).unwrap();
    let err = registry.register("hero", 2).unwrap_err();
    assert!(matches!(err, Error::DuplicateIdentifier { identifier } if identifier == "hero"));
    assert_eq!(registry.get("hero"), Some(&1));
}

#[test]
fn keeps_registration_order() {
    let mut registry = Registry::new();
    for (id, value) in [("b", 2), ("a", 1), ("c", 3)] {
        registry.register(id, value).unwrap();
    }
    for (_, value) in registry.iter_mut() {
        *value *= 10;
    }
    let ids: Vec<(&str, i32)> = registry.iter().map(|(id, v)| (id, *v)).collect();
    assert_eq!(ids, vec![("b", 20), ("a", 10), ("c", 30)]);

    assert_eq!(registry.remove("a"), Some(10));
    assert!(!registry.contains("a"));
    assert_eq!(registry.remove("a"), None);
    assert_eq!(registry.len(), 2);
    registry.register("a", 5).unwrap();
}
