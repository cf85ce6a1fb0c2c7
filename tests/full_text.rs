use cairn::builder::*;
use cairn::parser::RequestParser;
use cairn::token::QueryOp;

fn select_with(query: &str) -> String {
    format!(r#"{{"$query": [{query}], "$projection": {{}}}}"#)
}

#[test]
fn every_text_operator_sets_the_flag() {
    let queries = [
        r#"{"$match": {"Title": "report"}}"#,
        r#"{"$match_phrase": {"Title": "annual report"}}"#,
        r#"{"$match_phrase_prefix": {"Title": "annual rep", "$max_expansions": 10}}"#,
        r#"{"$search": {"Title": "report"}}"#,
        r#"{"$flt": {"$fields": ["Title", "Description"], "$like": "report"}}"#,
        r#"{"$term": {"Title": "report", "Status": "open"}}"#,
    ];
    let mut parser = RequestParser::default();
    for query in queries {
        let request = parser.parse(&select_with(query)).expect("parse ok");
        assert!(parser.has_full_text_query(), "{query} is a text operator");
        assert!(request.has_full_text_query());
    }
}

#[test]
fn nested_text_operator_sets_the_flag() {
    let mut parser = RequestParser::default();
    parser
        .parse(&select_with(r#"{"$and": [{"$exists": "Title"}, {"$not": [{"$search": {"Title": "draft"}}]}]}"#))
        .expect("parse ok");
    assert!(parser.has_full_text_query());
}

#[test]
fn flag_is_reset_by_the_next_parse() {
    let mut parser = RequestParser::default();
    parser.parse(&select_with(r#"{"$match": {"Title": "report"}}"#)).expect("parse ok");
    assert!(parser.has_full_text_query());
    parser
        .parse(&select_with(r#"{"$and": [{"$eq": {"Title": "A"}}, {"$regex": {"Title": "^A.*"}}]}"#))
        .expect("parse ok");
    assert!(!parser.has_full_text_query());
}

#[test]
fn failed_parse_leaves_no_flag_behind() {
    let mut parser = RequestParser::default();
    parser.parse(&select_with(r#"{"$match": {"Title": "report"}}"#)).expect("parse ok");
    assert!(parser.parse(&select_with(r#"{"$unknown": {"Title": "x"}}"#)).is_err());
    assert!(!parser.has_full_text_query());
    assert_eq!(parser.last_depth(), 0);
}

#[test]
fn builder_requests_are_flagged_too() {
    let mut select = Select::new();
    select
        .add_queries([or().add([flt("report", ["Title"]).unwrap(), term("Status", "open").unwrap()]).unwrap()])
        .unwrap();
    assert!(select.build().unwrap().has_full_text_query());

    let mut select = Select::new();
    select.add_queries([size("Tags", 2).unwrap()]).unwrap();
    assert!(!select.build().unwrap().has_full_text_query());
}

#[test]
fn operator_catalog_knows_the_text_family() {
    let text: Vec<&str> = QueryOp::ALL.iter().filter(|op| op.is_full_text()).map(|op| op.token()).collect();
    assert_eq!(
        text,
        vec!["$match", "$match_phrase", "$match_phrase_prefix", "$search", "$flt", "$term"]
    );
    assert_eq!(QueryOp::ALL.len(), 24);
    assert_eq!(QueryOp::from_token("$isNull"), Some(QueryOp::IsNull));
    assert_eq!(QueryOp::from_token("$isnull"), None);
}
