use cairn::catalog;
use cairn::error::CairnError;
use cairn::request::RequestKind;
use cairn::schema::Schema;
use cairn::typexpr::TypeExpr;
use cairn::validator::{ErrorKind, Validator};
use serde_json::json;

#[test]
fn bundled_catalog_builds() {
    let schema = catalog::dsl_schema().expect("catalog ok");
    for name in ["SELECT", "UPDATE", "INSERT", "DELETE", "QUERY", "ACTION", "FACET"] {
        assert!(schema.lookup(name).is_some(), "{name} is defined");
    }
}

#[test]
fn object_where_string_expected() {
    let report = catalog::report("QUERY", &json!({"$exists": {}})).expect("known type");
    assert!(report.count(ErrorKind::InvalidValue) >= 1, "{report}");
    assert!(report.count(ErrorKind::InvalidJsonField) >= 1, "{report}");
    let invalid = report
        .errors()
        .iter()
        .find(|e| e.kind == ErrorKind::InvalidValue)
        .unwrap();
    assert!(invalid.info.contains("OBJECT"));
    assert_eq!(invalid.expected, "string");
    assert_eq!(invalid.dotted_path(), "$exists");
}

#[test]
fn unknown_top_level_key() {
    let report = catalog::report("SELECT", &json!({"$unknown": 1, "$projection": {}})).expect("known type");
    let unknown = report
        .errors()
        .iter()
        .find(|e| e.kind == ErrorKind::InvalidJsonField)
        .expect("an unknown field error");
    assert_eq!(unknown.path, vec!["$unknown".to_string()]);
    assert!(unknown.info.contains("$unknown"));
    assert!(report.to_string().starts_with("Validating: "));
}

#[test]
fn well_formed_requests_pass() {
    let select = json!({
        "$roots": ["id0"],
        "$query": [
            {"$path": ["id1", "id2"]},
            {"$and": [{"$eq": {"Title": "A"}}, {"$exists": "Description"}], "$exactdepth": 4},
            {"$match": {"Description": "report"}, "$depth": 1},
            {"$range": {"StartDate": {"$gte": {"$date": "2015-01-01"}, "$lt": {"$date": "2016-01-01"}}}},
            {"$match_phrase_prefix": {"Title": "ann", "$max_expansions": 5}},
            {}
        ],
        "$filter": {"$offset": 100, "$limit": 1000, "$hint": ["cache"], "$orderby": {"Title": 1, "StartDate": -1}},
        "$projection": {"$fields": {"#dua": 1, "#all": 1}, "$usage": "abcdef1234"},
        "$facets": [
            {"$name": "by_type", "$terms": {"$field": "Type", "$size": 10, "$order": "DESC"}},
            {"$name": "years", "$date_range": {"$field": "StartDate", "$format": "yyyy", "$ranges": [{"$from": "2000"}, {"$from": "2001", "$to": "2010"}]}},
            {"$name": "kinds", "$filters": {"$query_filters": [{"$name": "titled", "$query": {"$exists": "Title"}}]}}
        ]
    });
    catalog::validate_request(RequestKind::Select, &select).expect("valid select");

    let update = json!({
        "$query": [{"$in": {"Tag": ["a", "b"]}}],
        "$filter": {"$mult": true, "$hint": "nocache"},
        "$action": [
            {"$set": {"Title": "B"}},
            {"$inc": {"Count": 1}},
            {"$push": {"Tags": {"$each": ["x"]}}},
            {"$pull": {"Tags": ["y"]}},
            {"$unset": ["Obsolete"]},
            {"$pop": {"Tags": -1}},
            {"$rename": {"Old": "New"}}
        ]
    });
    catalog::validate_request(RequestKind::Update, &update).expect("valid update");

    catalog::validate_request(RequestKind::Insert, &json!({"$data": {"Title": "A"}})).expect("valid insert");
    catalog::validate_request(RequestKind::Delete, &json!({"$query": [{"$missing": "Title"}]})).expect("valid delete");
}

#[test]
fn all_violations_are_reported() {
    let select = json!({
        "$roots": "id0",
        "$query": [{"$eq": {"Title": "A", "Other": "B"}}],
        "$filter": {"$limit": -1, "$orderby": []}
    });
    let report = catalog::report("SELECT", &select).expect("known type");
    assert_eq!(report.count(ErrorKind::WrongJsonType), 2, "{report}");
    assert_eq!(report.count(ErrorKind::ElementTooLong), 1, "{report}");
    assert!(report.count(ErrorKind::InvalidValue) >= 1, "{report}");

    let orderby = report
        .errors()
        .iter()
        .find(|e| e.dotted_path() == "$filter.$orderby")
        .expect("an error on $orderby");
    assert_eq!(orderby.expected, "{[key]: -1|1}");
}

#[test]
fn missing_and_empty_parts() {
    let report = catalog::report("UPDATE", &json!({})).expect("known type");
    assert_eq!(report.count(ErrorKind::Mandatory), 1);
    let report = catalog::report("UPDATE", &json!({"$action": []})).expect("known type");
    assert_eq!(report.count(ErrorKind::ElementTooShort), 1);

    match catalog::validate_request(RequestKind::Update, &json!({})) {
        Err(CairnError::Validation(report)) => assert_eq!(report.len(), 1),
        other => panic!("expected a validation error, got {other:?}"),
    }
}

#[test]
fn two_operators_in_one_node() {
    let report = catalog::report("QUERY", &json!({"$eq": {"a": 1}, "$ne": {"a": 2}})).expect("known type");
    assert_eq!(report.count(ErrorKind::ElementTooLong), 1);
    let report = catalog::report("ACTION", &json!({})).expect("known type");
    assert_eq!(report.count(ErrorKind::ElementTooShort), 1);
}

#[test]
fn unknown_root_type() {
    assert!(matches!(catalog::report("NOPE", &json!({})), Err(CairnError::Schema(_))));
}

#[test]
fn custom_schema_documents() {
    let schema = Schema::parse(
        r#"{
            "PERSON": {"object": {"name": "string", "age?": "AGE", "tags?": "string[0..2]"}, "hint": "a person"},
            "AGE": {"range": {"min": 0, "max": 150}}
        }"#,
    )
    .expect("schema ok");
    let validator = Validator::new(&schema);
    validator.validate("PERSON", &json!({"name": "Ada", "age": 36})).expect("valid");
    let report = validator
        .report("PERSON", &json!({"age": 200, "tags": ["a", "b", "c"], "nick": "x"}))
        .expect("known type");
    assert_eq!(report.count(ErrorKind::Mandatory), 1, "{report}");
    assert_eq!(report.count(ErrorKind::InvalidValue), 1, "{report}");
    assert_eq!(report.count(ErrorKind::ElementTooLong), 1, "{report}");
    assert_eq!(report.count(ErrorKind::InvalidJsonField), 1, "{report}");
    assert_eq!(schema.format(schema.lookup("PERSON").unwrap()).hint(), Some("a person"));
}

#[test]
fn schema_building_errors() {
    assert!(matches!(Schema::parse(r#"{"A": "B"}"#), Err(CairnError::Schema(_))));
    assert!(Schema::parse(r#"{"A": "B", "B": "A"}"#).is_err(), "aliases in a loop");
    assert!(Schema::parse(r#"{"A": {"union": ["A"]}}"#).is_err());
    assert!(Schema::parse(r#"{"string": "integer"}"#).is_err(), "shadows a built-in");
    assert!(Schema::parse(r#"{"A": "string[2..1]"}"#).is_err());
    assert!(Schema::parse(r#"{"A": {"pattern": "("}}"#).is_err());
    assert!(Schema::parse(r#"{"A": {"choice": "B"}, "B": {"choice": {"$x": "string"}}}"#).is_err(), "reused choice must come first");
    assert!(Schema::parse(r#"{"A": "string|"}"#).is_err());
    assert!(Schema::parse("[]").is_err());
    Schema::parse(r#"{"TREE": {"object": {"children?": "TREE[]"}}}"#).expect("recursion through a container");
}

#[test]
fn type_expressions_print_as_signatures() {
    for text in ["string", "guid[]", "QUERY[1..]", "string[0..2]", "{[key]: -1|1}", "(string|integer)[]", "'ASC'|'DESC'", "0|1|true|false"] {
        assert_eq!(TypeExpr::parse(text).expect("parse ok").to_string(), text);
    }
    assert_eq!(TypeExpr::parse("{ [key] : any }").unwrap().to_string(), "{[key]: any}");
    assert!(TypeExpr::parse("'ASC'|'DESC'").unwrap().is_enumeration());
    assert!(!TypeExpr::parse("string|integer").unwrap().is_enumeration());
}
