use cairn::builder::*;
use cairn::facet::{DateBucket, FacetKind, FacetOrder};
use cairn::parser::RequestParser;
use cairn::query::Query;
use cairn::token::FacetOp;
use serde_json::json;

fn select_with(facets: &str) -> String {
    format!(r#"{{"$projection": {{}}, "$facets": {facets}}}"#)
}

#[test]
fn facets_are_parsed_in_order() {
    let text = select_with(
        r#"[
            {"$name": "by_type", "$terms": {"$field": "Type", "$size": 10, "$order": "ASC"}},
            {"$name": "years", "$date_range": {"$field": "StartDate", "$format": "yyyy", "$ranges": [{"$from": "2000", "$to": "2010"}, {"$to": "1990"}]}},
            {"$name": "kinds", "$filters": {"$query_filters": [{"$name": "titled", "$query": {"$exists": "Title"}}]}}
        ]"#,
    );
    let request = RequestParser::default().parse(&text).expect("parse ok");
    let ops: Vec<FacetOp> = request.facets().iter().map(|f| f.op()).collect();
    assert_eq!(ops, vec![FacetOp::Terms, FacetOp::DateRange, FacetOp::Filters]);
    match request.facets()[1].kind() {
        FacetKind::DateRange { ranges, .. } => {
            assert_eq!(ranges[1], DateBucket { from: None, to: Some("1990".to_string()) });
        }
        other => panic!("unexpected facet {other:?}"),
    }
    let again = RequestParser::default().parse(&request.canonical()).expect("parse ok");
    assert_eq!(again.facets(), request.facets());
}

#[test]
fn facet_errors() {
    let mut parser = RequestParser::default();
    let terms = r#"{"$field": "Type", "$size": 10, "$order": "ASC"}"#;
    let duplicate = format!(r#"[{{"$name": "a", "$terms": {terms}}}, {{"$name": "a", "$terms": {terms}}}]"#);
    assert!(parser.parse(&select_with(&duplicate)).is_err(), "duplicate names");
    assert!(parser.parse(&select_with(&format!(r#"[{{"$terms": {terms}}}]"#))).is_err(), "missing name");
    assert!(parser.parse(&select_with(r#"[{"$name": "a", "$histogram": {}}]"#)).is_err(), "unknown command");
    assert!(parser.parse(&select_with(r#"[{"$name": "a"}]"#)).is_err(), "no command");
    assert!(
        parser
            .parse(&select_with(r#"[{"$name": "a", "$terms": {"$field": "Type", "$size": 10, "$order": "UP"}}]"#))
            .is_err(),
        "bad order"
    );
    assert!(
        parser
            .parse(&select_with(r#"[{"$name": "a", "$date_range": {"$field": "D", "$format": "yyyy", "$ranges": [{}]}}]"#))
            .is_err(),
        "unbounded range"
    );
    assert!(
        parser
            .parse(&select_with(r#"[{"$name": "a", "$filters": {"$query_filters": []}}]"#))
            .is_err(),
        "no filter"
    );
}

#[test]
fn builder_facets() {
    let mut select = Select::new();
    select
        .add_facets([
            terms_facet("by_type", "Type", 10, FacetOrder::Desc).unwrap(),
            date_range_facet(
                "years",
                "StartDate",
                "yyyy",
                vec![DateBucket { from: Some("2000".to_string()), to: None }],
            )
            .unwrap(),
            filters_facet("kinds", [("titled", exists("Title").unwrap())]).unwrap(),
        ])
        .unwrap();
    let json = select.final_select().expect("build ok");
    assert_eq!(
        json["$facets"][0],
        json!({"$name": "by_type", "$terms": {"$field": "Type", "$size": 10, "$order": "DESC"}})
    );
    assert_eq!(
        json["$facets"][2],
        json!({"$name": "kinds", "$filters": {"$query_filters": [{"$name": "titled", "$query": {"$exists": "Title"}}]}})
    );

    assert!(select.add_facets([terms_facet("by_type", "Other", 5, FacetOrder::Asc).unwrap()]).is_err());
    assert!(terms_facet("", "Type", 10, FacetOrder::Asc).is_err());
    assert!(terms_facet("t", "Type", 0, FacetOrder::Asc).is_err());
    assert!(date_range_facet("d", "StartDate", "yyyy", Vec::new()).is_err());
    assert!(filters_facet("f", Vec::<(&str, Query)>::new()).is_err());
}

#[test]
fn filter_facets_only_accept_nested_queries() {
    assert!(filters_facet("f", [("withpath", path(["id1"]).unwrap())]).is_err());
    assert!(filters_facet("g", [("empty", and())]).is_err());
    assert!(filters_facet("h", [("nested", or().add([not()]).unwrap())]).is_err());
    assert!(filters_facet("i", [("deep", exists("Title").unwrap().set_depth_limit(2).unwrap())]).is_err());

    let mut select = Select::new();
    select
        .add_facets([filters_facet(
            "kinds",
            [
                ("titled", exists("Title").unwrap()),
                ("either", or().add([eq("Type", "A").unwrap(), eq("Type", "B").unwrap()]).unwrap()),
            ],
        )
        .unwrap()])
        .unwrap();
    let built = select.build().expect("build ok");
    let json = select.final_select().expect("build ok");
    let parsed = RequestParser::default().parse(&json.to_string()).expect("parse ok");
    assert_eq!(parsed.facets(), built.facets());
}
