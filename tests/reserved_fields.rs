use cairn::builder::*;
use cairn::error::CairnError;
use cairn::parser::RequestParser;
use serde_json::json;

#[test]
fn reserved_fields_cannot_be_inserted() {
    let mut parser = RequestParser::default();
    assert!(parser.parse_insert(r##"{"$data": {"#id": "value"}}"##).is_err());
    assert!(parser.parse_insert(r#"{"$data": {"Content": {"_internal": 1}}}"#).is_err());
    assert!(parser.parse_insert(r##"{"$data": {"List": [{"#nbunits": 2}]}}"##).is_err());
    let request = parser
        .parse_insert(r##"{"$data": {"Title": "#id is fine as a value"}}"##)
        .expect("parse ok");
    assert_eq!(request.data().unwrap()["Title"], "#id is fine as a value");
}

#[test]
fn reserved_fields_cannot_be_updated() {
    let mut parser = RequestParser::default();
    assert!(parser.parse_update(r##"{"$action": [{"$set": {"#id": 1}}]}"##).is_err());
    assert!(parser.parse_update(r#"{"$action": [{"$unset": ["_id"]}]}"#).is_err());
    assert!(parser.parse_update(r##"{"$action": [{"$rename": {"Title": "#id"}}]}"##).is_err());
    let request = parser
        .parse_update(r##"{"$action": [{"$set": {"var": "#id"}}]}"##)
        .expect("a reserved token as a value is fine");
    assert_eq!(request.actions().len(), 1);
}

#[test]
fn management_fields_stay_mutable() {
    let mut parser = RequestParser::default();
    parser
        .parse_update(r##"{"$action": [{"$set": {"#management.ClassificationRule": "R1"}}]}"##)
        .expect("parse ok");
    assert!(set("#management", json!({})).is_ok());
    assert!(set("#managementx", 1).is_err());
}

#[test]
fn builder_rejects_reserved_targets() {
    assert!(set("#id", 1).is_err());
    assert!(set("var", "#id").is_ok());
    assert!(unset(["Title", "_id"]).is_err());
    assert!(inc("#nbunits", 1).is_err());
    assert!(set("Title", 1).unwrap().add("#id", 2).is_err());

    let mut insert = Insert::new();
    let data = json!({"Title": "A", "Nested": {"#id": 1}});
    let err = insert.set_data(data.as_object().cloned().unwrap()).unwrap_err();
    match err {
        CairnError::Construction(message) => {
            assert!(message.contains("#id"), "{message}");
            assert!(!message.contains("Parse error"), "{message}");
        }
        other => panic!("expected a construction error, got {other:?}"),
    }
}

#[test]
fn internal_fields_cannot_be_queried() {
    assert!(eq("_id", 1).is_err());
    assert!(exists("").is_err());
    let mut parser = RequestParser::default();
    assert!(parser.parse(r#"{"$query": [{"$eq": {"_id": 1}}], "$projection": {}}"#).is_err());
    assert!(
        parser
            .parse(r#"{"$filter": {"$orderby": {"_score": 1}}, "$projection": {}}"#)
            .is_err()
    );
}
