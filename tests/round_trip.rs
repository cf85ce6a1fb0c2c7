use cairn::action::PopEnd;
use cairn::builder::*;
use cairn::parser::RequestParser;
use cairn::request::RequestKind;
use serde_json::json;

fn archive_select() -> Select {
    let mut select = Select::new();
    select
        .add_roots(["id0"])
        .unwrap()
        .add_queries([
            path(["id1", "id2"]).unwrap(),
            and()
                .add([
                    or().add([
                        eq("Title", "Annual report").unwrap(),
                        not().add([exists("Description").unwrap()]).unwrap(),
                    ])
                    .unwrap(),
                    gt("Size", 10).unwrap(),
                ])
                .unwrap()
                .set_exact_depth_limit(4)
                .unwrap(),
            or().add([lte("Size", 100).unwrap(), in_("Tag", ["a", "b"]).unwrap()])
                .unwrap()
                .set_depth_limit(1)
                .unwrap(),
        ])
        .unwrap()
        .add_hint_filter(["cache"])
        .unwrap()
        .set_limit_filter(100, 1000)
        .add_used_projection(["#dua", "#all"])
        .unwrap()
        .set_usage_projection("abcdef1234")
        .unwrap();
    select
}

#[test]
fn select_survives_serialize_then_parse() {
    let select = archive_select();
    let built = select.build().expect("build ok");
    assert_eq!(built.last_depth(), 5, "path of two ids, then exact 4, then one more");

    let text = select.final_select().expect("serialize ok").to_string();
    let mut parser = RequestParser::default();
    let parsed = parser.parse(&text).expect("parse ok");

    assert_eq!(parsed.kind(), RequestKind::Select);
    assert_eq!(parsed.roots(), built.roots());
    assert_eq!(parsed.queries(), built.queries());
    assert_eq!(parsed.filter(), built.filter());
    assert_eq!(parsed.projection(), built.projection());
    assert_eq!(parsed.last_depth(), built.last_depth());
    assert_eq!(parser.last_depth(), 5);
    assert_eq!(parsed.canonical(), built.canonical());
}

#[test]
fn serialized_select_has_expected_envelope() {
    let json = archive_select().final_select().expect("serialize ok");
    assert_eq!(json["$roots"], json!(["id0"]));
    assert_eq!(json["$query"][0], json!({"$path": ["id1", "id2"]}));
    assert_eq!(json["$query"][1]["$exactdepth"], 4);
    assert_eq!(json["$query"][2]["$depth"], 1);
    assert_eq!(json["$filter"], json!({"$offset": 100, "$limit": 1000, "$hint": ["cache"]}));
    assert_eq!(json["$projection"], json!({"$fields": {"#dua": 1, "#all": 1}, "$usage": "abcdef1234"}));
    assert!(json.get("$facets").is_none(), "no facets, no key");
}

#[test]
fn update_survives_serialize_then_parse() {
    let mut update = Update::new();
    update
        .add_queries([eq("Title", "Minutes").unwrap()])
        .unwrap()
        .add_actions([
            set("Title", "Minutes 2015").unwrap().add("Description", "Board minutes").unwrap(),
            inc("Count", 1).unwrap(),
            push("Tags", json!(["x", "y"])).unwrap(),
            pop("Tags", PopEnd::Last).unwrap(),
            unset(["Obsolete"]).unwrap(),
            rename("OldName", "NewName").unwrap(),
        ])
        .unwrap()
        .set_mult(true);
    let built = update.build().expect("build ok");
    let text = update.final_update().expect("serialize ok").to_string();
    let parsed = RequestParser::default().parse(&text).expect("parse ok");
    assert_eq!(parsed.kind(), RequestKind::Update);
    assert_eq!(parsed.actions(), built.actions());
    assert_eq!(parsed.canonical(), built.canonical());
}

#[test]
fn insert_and_delete_survive_serialize_then_parse() {
    let mut insert = Insert::new();
    let data = json!({"Title": "Minutes", "Content": {"Pages": 3}});
    insert
        .add_roots(["id0"])
        .unwrap()
        .set_data(data.as_object().cloned().unwrap())
        .unwrap();
    let built = insert.build().expect("build ok");
    let parsed = RequestParser::default()
        .parse(&insert.final_insert().unwrap().to_string())
        .expect("parse ok");
    assert_eq!(parsed.kind(), RequestKind::Insert);
    assert_eq!(parsed.canonical(), built.canonical());

    let mut delete = Delete::new();
    delete.add_queries([missing("Title").unwrap()]).unwrap().set_mult(false);
    let built = delete.build().expect("build ok");
    let parsed = RequestParser::default()
        .parse(&delete.final_delete().unwrap().to_string())
        .expect("parse ok");
    assert_eq!(parsed.kind(), RequestKind::Delete);
    assert_eq!(parsed.filter().mult(), Some(false));
    assert_eq!(parsed.canonical(), built.canonical());
}

#[test]
fn dates_keep_their_value() {
    let text = r#"{"$query": [{"$range": {"StartDate": {"$gte": {"$date": "2015-01-01"}, "$lt": {"$date": "2016-01-01T00:00:00Z"}}}}], "$projection": {}}"#;
    let mut parser = RequestParser::default();
    let first = parser.parse(text).expect("parse ok");
    let second = parser.parse(&first.canonical()).expect("parse ok");
    assert_eq!(first, second);
    assert_eq!(
        first.to_json()["$query"][0],
        json!({"$range": {"StartDate": {"$gte": {"$date": "2015-01-01T00:00:00"}, "$lt": {"$date": "2016-01-01T00:00:00"}}}})
    );
}

#[test]
fn array_form_needs_a_kind() {
    let text = r#"[["id0"], [{"$eq": {"Title": "A"}}], {"$limit": 5}, {"$fields": {"Title": 1}}]"#;
    let mut parser = RequestParser::default();
    assert!(parser.parse(text).is_err());
    let request = parser.parse_select(text).expect("parse ok");
    assert_eq!(request.roots().len(), 1);
    assert_eq!(request.filter().limit(), Some(5));
    assert_eq!(request.projection().unwrap().fields(), &[("Title".to_string(), true)]);
}

#[test]
fn array_form_validates_once_mapped_to_an_envelope() {
    let parts = json!([["id0"], [{"$eq": {"Title": "A"}}], {"$limit": 5}, {"$fields": {"Title": 1}}]);
    assert!(cairn::catalog::validate_request(RequestKind::Select, &parts).is_err());
    let envelope = RequestParser::from_array_form(RequestKind::Select, parts.as_array().unwrap()).expect("four parts");
    assert_eq!(envelope.keys().collect::<Vec<_>>(), vec!["$roots", "$query", "$filter", "$projection"]);
    let envelope = serde_json::Value::Object(envelope);
    cairn::catalog::validate_request(RequestKind::Select, &envelope).expect("valid select");
    let request = RequestParser::default().parse_value(RequestKind::Select, &envelope).expect("parse ok");
    assert_eq!(request.last_depth(), 1);

    let delete = json!([[], [], {}, {"$fields": {}}]);
    assert!(RequestParser::from_array_form(RequestKind::Delete, delete.as_array().unwrap()).is_err());
}

#[test]
fn request_size_is_checked_before_decoding() {
    let parser = RequestParser::new(cairn::config::Limits { limit_request: 10, ..Default::default() });
    assert!(parser.sanity_check_request(10).is_ok());
    assert!(parser.sanity_check_request(11).is_err());
}
