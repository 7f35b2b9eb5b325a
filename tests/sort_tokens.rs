use propkeeper::error::KeeperError;
use propkeeper::sort::{Direction, Sort};

#[test]
fn bare_field_sorts_ascending() {
    let sort: Sort = "name".parse().expect("parse ok");
    assert_eq!(sort.field(), "name");
    assert_eq!(sort.direction(), Direction::Asc);
}

#[test]
fn direction_token_is_case_insensitive() {
    for token in ["version desc", "version DESC", "version Desc"] {
        let sort: Sort = token.parse().expect("parse ok");
        assert_eq!(sort, Sort::new("version", Direction::Desc).unwrap(), "token {token}");
    }
    let sort: Sort = "id asc".parse().expect("parse ok");
    assert_eq!(sort.direction(), Direction::Asc);
}

#[test]
fn unknown_direction_is_rejected() {
    let err = "name sideways".parse::<Sort>().unwrap_err();
    assert!(matches!(err, KeeperError::Validation(_)));
    assert!(err.to_string().contains("invalid direction"));
}

#[test]
fn empty_field_is_rejected() {
    assert!(matches!(Sort::new("", Direction::Asc), Err(KeeperError::Validation(_))));
    assert!(matches!("".parse::<Sort>(), Err(KeeperError::Validation(_))));
}

#[test]
fn renders_field_and_upper_case_direction() {
    assert_eq!("status".parse::<Sort>().unwrap().to_string(), "status ASC");
    assert_eq!(Sort::desc("id").unwrap().to_string(), "id DESC");
}
