use propkeeper::construct::{Property, PropertyGroup, Status, Tag};
use propkeeper::database::Database;
use propkeeper::persist::PersistenceMode;
use propkeeper::settings::DatabaseSettings;

#[test]
fn in_memory_mode_allows_basic_operations() {
    let db = Database::new(PersistenceMode::InMemory).expect("db");
    let group = db
        .create_property_group(&PropertyGroup::new("svc", "1.0", Status::Active))
        .expect("group");
    db.create_property(&Property::new("k", Some("v"), None, group)).expect("property");
    // every handle opens its own empty store
    let other = Database::new(PersistenceMode::InMemory).expect("db");
    assert!(matches!(
        other.property_group(group),
        Err(propkeeper::error::KeeperError::NotFound(_))
    ));
}

#[test]
fn file_mode_survives_reopening() {
    let path = std::env::temp_dir()
        .join(format!("test_propkeeper_{}.db", std::process::id()))
        .to_string_lossy()
        .into_owned();
    // Ensure clean start
    let _ = std::fs::remove_file(&path);
    let (group, tag) = {
        let db = Database::new(PersistenceMode::File(path.clone())).expect("db");
        db.add_tag_domain_key("env").expect("domain");
        let group = db
            .create_property_group(&PropertyGroup::new("svc", "1.0", Status::Active))
            .expect("group");
        let tag = db.create_tag(group, &Tag::new("env", Some("prod"))).expect("tag");
        (group, tag)
    };
    let settings = DatabaseSettings {
        path: Some(path.clone()),
        busy_timeout_ms: 100,
    };
    let db = Database::open(&settings).expect("reopen");
    assert_eq!(db.property_group(group).expect("group").name, "svc");
    assert_eq!(db.tag(tag).expect("tag").value.as_deref(), Some("prod"));
    assert!(db.tag_domain().unwrap().contains("env"));
    drop(db);
    // Clean up
    let _ = std::fs::remove_file(&path);
}

#[test]
fn settings_select_the_mode() {
    let memory = DatabaseSettings { path: None, busy_timeout_ms: 5000 };
    assert_eq!(memory.persistence_mode(), PersistenceMode::InMemory);
    let file = DatabaseSettings { path: Some("store.db".into()), busy_timeout_ms: 5000 };
    assert_eq!(file.persistence_mode(), PersistenceMode::File("store.db".into()));
}
