use propkeeper::construct::Property;
use propkeeper::database::Database;
use propkeeper::error::KeeperError;
use propkeeper::filter::{FilterBindings, Pagination};
use propkeeper::interface::{FilterRequest, QueryParams};
use propkeeper::persist::PersistenceMode;

#[test]
fn create_then_fetch_round_trips() {
    let db = Database::new(PersistenceMode::InMemory).expect("db");
    let property = Property::new("db.url", Some("jdbc:h2:mem"), Some("connection string"), 1);
    let id = db.create_property(&property).expect("create");
    let fetched = db.property(id).expect("by id");
    assert_eq!(fetched, property, "equality ignores the identity");
    assert_eq!(fetched.id, Some(id));
}

#[test]
fn dangling_group_reference_is_tolerated() {
    let db = Database::new(PersistenceMode::InMemory).expect("db");
    let id = db
        .create_property(&Property::new("orphan", None, None, 999))
        .expect("no group validation at this layer");
    assert_eq!(db.property(id).unwrap().property_group_id, 999);
}

#[test]
fn optional_fields_respect_their_limits() {
    let db = Database::new(PersistenceMode::InMemory).expect("db");
    let long_value = "x".repeat(1025);
    let long_description = "d".repeat(513);
    assert!(matches!(
        db.create_property(&Property::new("k", Some(&long_value), None, 1)),
        Err(KeeperError::Validation(_))
    ));
    assert!(matches!(
        db.create_property(&Property::new("k", None, Some(&long_description), 1)),
        Err(KeeperError::Validation(_))
    ));
    assert!(matches!(
        db.create_property(&Property::new("", None, None, 1)),
        Err(KeeperError::Validation(_))
    ));
}

#[test]
fn update_and_delete_follow_identity_rules() {
    let db = Database::new(PersistenceMode::InMemory).expect("db");
    let id = db.create_property(&Property::new("k", Some("v1"), None, 1)).unwrap();
    assert!(matches!(
        db.create_property(&Property::new("k", None, None, 1).with_id(id)),
        Err(KeeperError::Conflict(_))
    ));

    let changed = Property::new("k", Some("v2"), None, 1).with_id(id);
    db.update_property(id, &changed).expect("update");
    assert_eq!(db.property(id).unwrap().value.as_deref(), Some("v2"));
    assert!(matches!(
        db.update_property(id + 1, &changed),
        Err(KeeperError::Validation(_))
    ));

    db.delete_property(id).expect("delete");
    assert!(matches!(db.property(id), Err(KeeperError::NotFound(_))));
    assert!(matches!(db.delete_property(id), Err(KeeperError::NotFound(_))));
}

#[test]
fn filter_by_group_reference() {
    let db = Database::new(PersistenceMode::InMemory).expect("db");
    db.create_property(&Property::new("a", Some("1"), None, 7)).unwrap();
    db.create_property(&Property::new("b", Some("2"), None, 7)).unwrap();
    db.create_property(&Property::new("c", Some("3"), None, 8)).unwrap();

    let params: QueryParams = [("propertyGroupId", "7")].into_iter().collect();
    let page = db
        .filter_properties(&FilterRequest::from_query_default(&params).unwrap())
        .expect("filter ok");
    assert_eq!(page.total_results, 2);
    assert!(page.result.iter().all(|p| p.property_group_id == 7));
    let keys: Vec<_> = page.result.iter().map(|p| p.key.as_str()).collect();
    assert_eq!(keys, vec!["a", "b"], "default order is by id");
}

#[test]
fn bindings_combine_conjunctively() {
    let db = Database::new(PersistenceMode::InMemory).expect("db");
    db.create_property(&Property::new("k", Some("1"), None, 1)).unwrap();
    db.create_property(&Property::new("k", Some("2"), None, 1)).unwrap();
    db.create_property(&Property::new("j", Some("1"), None, 1)).unwrap();
    let bindings = FilterBindings::<Property>::new()
        .with("key", "k")
        .unwrap()
        .with("value", "1")
        .unwrap();
    let page = db
        .filter_properties(&FilterRequest::new(bindings, Pagination::default()))
        .expect("filter ok");
    assert_eq!(page.total_results, 1);
    assert_eq!(page.result[0], Property::new("k", Some("1"), None, 1));
}

#[test]
fn unknown_parameters_are_rejected_for_properties() {
    let params: QueryParams = [("color", "red")].into_iter().collect();
    let err = FilterRequest::<Property>::from_query_default(&params).unwrap_err();
    assert!(matches!(err, KeeperError::Validation(_)));
    assert!(FilterBindings::<Property>::new().with("color", "red").is_err());
}
