use propkeeper::construct::{Property, PropertyGroup, Status};
use propkeeper::database::Database;
use propkeeper::error::KeeperError;
use propkeeper::filter::{FilterBindings, Pagination};
use propkeeper::interface::{FilterRequest, QueryParams};
use propkeeper::persist::PersistenceMode;
use propkeeper::sort::Sort;

fn seeded() -> Database {
    let db = Database::new(PersistenceMode::InMemory).expect("db");
    // two ties on "b" so the id tie-break is observable
    for key in ["d", "b", "a", "e", "b", "c", "g"] {
        db.create_property(&Property::new(key, None, None, 1)).expect("create");
    }
    db
}

fn page(db: &Database, start: i64, limit: i64, sorts: Vec<Sort>) -> (Vec<Property>, i64) {
    let request = FilterRequest::new(FilterBindings::new(), Pagination::new(start, limit).unwrap())
        .with_sorts(sorts);
    let page = db.filter_properties(&request).expect("filter ok");
    assert_eq!(page.page_number, start / limit);
    assert_eq!(page.page_size, limit);
    (page.result, page.total_results)
}

#[test]
fn pages_slice_the_sorted_result() {
    let db = seeded();
    let sorts = vec![Sort::asc("key").unwrap(), Sort::asc("id").unwrap()];
    let (everything, total) = page(&db, 0, 100, sorts.clone());
    assert_eq!(total, 7);
    let limit = 3;
    for k in 0..3 {
        let (rows, total) = page(&db, k * limit, limit, sorts.clone());
        assert_eq!(total, 7, "count ignores paging");
        let from = (k * limit) as usize;
        let to = ((k + 1) * limit).min(7) as usize;
        assert_eq!(rows, everything[from..to].to_vec(), "page {k}");
    }
    let (beyond, total) = page(&db, 21, limit, sorts);
    assert!(beyond.is_empty());
    assert_eq!(total, 7);
}

#[test]
fn descending_field_with_id_tie_break() {
    let db = seeded();
    let (rows, _) = page(&db, 0, 50, vec!["key desc".parse().unwrap(), "id".parse().unwrap()]);
    let keys: Vec<_> = rows.iter().map(|p| p.key.as_str()).collect();
    assert_eq!(keys, vec!["g", "e", "d", "c", "b", "b", "a"]);
    let ties: Vec<_> = rows.iter().filter(|p| p.key == "b").filter_map(|p| p.id).collect();
    assert!(ties[0] < ties[1], "ties broken by ascending id");
}

#[test]
fn reversing_direction_inverts_untied_order() {
    let db = seeded();
    let (ascending, _) = page(&db, 0, 50, vec![Sort::asc("key").unwrap(), Sort::asc("id").unwrap()]);
    let (descending, _) = page(&db, 0, 50, vec![Sort::desc("key").unwrap(), Sort::asc("id").unwrap()]);
    let up: Vec<_> = ascending.iter().map(|p| p.key.clone()).collect();
    let mut down: Vec<_> = descending.iter().map(|p| p.key.clone()).collect();
    down.reverse();
    assert_eq!(up, down);
}

#[test]
fn unknown_sort_field_is_rejected() {
    let db = seeded();
    let request = FilterRequest::<Property>::default().with_sorts(vec![Sort::asc("name").unwrap()]);
    assert!(matches!(db.filter_properties(&request), Err(KeeperError::Validation(_))));

    let params: QueryParams = [("sort", "key; drop table Property")].into_iter().collect();
    let err = FilterRequest::<Property>::from_query_default(&params)
        .and_then(|r| db.filter_properties(&r))
        .unwrap_err();
    assert!(err.is_client_error());
    assert_eq!(page(&db, 0, 50, vec![]).1, 7, "nothing was dropped");
}

#[test]
fn pagination_bounds_are_validated() {
    assert!(matches!(Pagination::new(0, 0), Err(KeeperError::Validation(_))));
    assert!(matches!(Pagination::new(-1, 10), Err(KeeperError::Validation(_))));
    let params: QueryParams = [("limit", "0")].into_iter().collect();
    assert!(FilterRequest::<PropertyGroup>::from_query_default(&params).is_err());
    let params: QueryParams = [("start", "ten")].into_iter().collect();
    assert!(FilterRequest::<PropertyGroup>::from_query_default(&params).is_err());
}

#[test]
fn page_number_is_start_over_limit() {
    let db = Database::new(PersistenceMode::InMemory).expect("db");
    for version in 0..5 {
        db.create_property_group(&PropertyGroup::new("svc", version.to_string(), Status::Active))
            .unwrap();
    }
    let params: QueryParams = [("start", "4"), ("limit", "2")].into_iter().collect();
    let response = db
        .filter_property_groups(&FilterRequest::from_query_default(&params).unwrap())
        .expect("filter ok");
    assert_eq!(response.page_number, 2);
    assert_eq!(response.result.len(), 1);
    assert_eq!(response.total_results, 5);

    let json = serde_json::to_value(&response).unwrap();
    assert_eq!(json["pageNumber"], 2);
    assert_eq!(json["pageSize"], 2);
    assert_eq!(json["totalResults"], 5);
    assert_eq!(json["result"].as_array().unwrap().len(), 1);
}
