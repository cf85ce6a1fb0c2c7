use cairn::action::PopEnd;
use cairn::builder::*;
use cairn::error::CairnError;
use cairn::token::RangeBound;
use cairn::value::Scalar;
use serde_json::json;

#[test]
fn leaf_queries_serialize_as_single_operator_nodes() {
    assert_eq!(eq("Title", "A").unwrap().to_json(), json!({"$eq": {"Title": "A"}}));
    assert_eq!(ne("Size", 3).unwrap().to_json(), json!({"$ne": {"Size": 3}}));
    assert_eq!(gte("Ratio", 0.5).unwrap().to_json(), json!({"$gte": {"Ratio": 0.5}}));
    assert_eq!(is_null("Title").unwrap().to_json(), json!({"$isNull": "Title"}));
    assert_eq!(size("Tags", 2).unwrap().to_json(), json!({"$size": {"Tags": 2}}));
    assert_eq!(regex("Title", "^A.*").unwrap().to_json(), json!({"$regex": {"Title": "^A.*"}}));
    assert_eq!(search("Title", "report").unwrap().to_json(), json!({"$search": {"Title": "report"}}));
    assert_eq!(
        flt("report", ["Title", "Description"]).unwrap().to_json(),
        json!({"$flt": {"$fields": ["Title", "Description"], "$like": "report"}})
    );
}

#[test]
fn range_bounds() {
    assert_eq!(
        range("Size", 1, true, 10, false).unwrap().to_json(),
        json!({"$range": {"Size": {"$gte": 1, "$lt": 10}}})
    );
    let lower_only = cairn::builder::range_bounds("Size", vec![(RangeBound::Gt, Scalar::Int(0))]).unwrap();
    assert_eq!(lower_only.to_json(), json!({"$range": {"Size": {"$gt": 0}}}));
    assert!(cairn::builder::range_bounds("Size", Vec::new()).is_err());
    assert!(cairn::builder::range_bounds("Size", vec![(RangeBound::Gt, Scalar::Int(0)), (RangeBound::Gte, Scalar::Int(1))]).is_err());
}

#[test]
fn extenders() {
    let query = in_("Tag", ["a"]).unwrap().add_value("b").unwrap();
    assert_eq!(query.to_json(), json!({"$in": {"Tag": ["a", "b"]}}));
    assert!(in_("Tag", Vec::<&str>::new()).is_err());

    let query = term("Status", "open").unwrap().add_term("Level", 2).unwrap();
    assert_eq!(query.to_json(), json!({"$term": {"Status": "open", "Level": 2}}));

    let query = match_phrase_prefix("Title", "annual rep").unwrap().set_max_expansions(10).unwrap();
    assert_eq!(query.to_json(), json!({"$match_phrase_prefix": {"Title": "annual rep", "$max_expansions": 10}}));

    assert!(eq("Title", "A").unwrap().add([exists("Title").unwrap()]).is_err());
    assert!(eq("Title", "A").unwrap().add_value("B").is_err());
    assert!(match_("Title", "A").unwrap().set_max_expansions(3).is_err());
}

#[test]
fn logical_nodes() {
    let query = and()
        .add([eq("Title", "A").unwrap(), or().add([exists("B").unwrap(), missing("C").unwrap()]).unwrap()])
        .unwrap()
        .set_exact_depth_limit(2)
        .unwrap();
    assert_eq!(
        query.to_json(),
        json!({"$and": [{"$eq": {"Title": "A"}}, {"$or": [{"$exists": "B"}, {"$missing": "C"}]}], "$exactdepth": 2})
    );

    let mut select = Select::new();
    assert!(select.add_queries([and()]).is_err(), "empty logical node");
    assert!(select.add_queries([not().add([or()]).unwrap()]).is_err(), "nested empty node");
}

#[test]
fn operand_checks() {
    assert!(eq("", 1).is_err());
    assert!(regex("Title", "(").is_err());
    assert!(path(Vec::<&str>::new()).is_err());
    assert!(path(["a", ""]).is_err());
    assert!(flt("report", Vec::<&str>::new()).is_err());
    assert!(matches!(eq("_id", 1), Err(CairnError::Construction(_))));
}

#[test]
fn actions() {
    assert_eq!(set("Title", "A").unwrap().add("Level", 2).unwrap().to_json(), json!({"$set": {"Title": "A", "Level": 2}}));
    assert_eq!(unset(["A", "B"]).unwrap().to_json(), json!({"$unset": ["A", "B"]}));
    assert_eq!(inc("Count", 2).unwrap().to_json(), json!({"$inc": {"Count": 2}}));
    assert_eq!(min("Count", 0).unwrap().to_json(), json!({"$min": {"Count": 0}}));
    assert_eq!(max("Count", 9).unwrap().to_json(), json!({"$max": {"Count": 9}}));
    assert_eq!(rename("Old", "New").unwrap().to_json(), json!({"$rename": {"Old": "New"}}));
    assert_eq!(push("Tags", "x").unwrap().to_json(), json!({"$push": {"Tags": {"$each": ["x"]}}}));
    assert_eq!(
        add("Tags", json!(["x", "y"])).unwrap().add("Tags", "z").unwrap().to_json(),
        json!({"$add": {"Tags": {"$each": ["x", "y", "z"]}}})
    );
    assert_eq!(pull("Tags", json!(["x"])).unwrap().to_json(), json!({"$pull": {"Tags": {"$each": ["x"]}}}));
    assert_eq!(pop("Tags", PopEnd::First).unwrap().to_json(), json!({"$pop": {"Tags": -1}}));

    assert!(inc("Count", "two").is_err());
    assert!(unset(Vec::<&str>::new()).is_err());
    assert!(pop("Tags", PopEnd::Last).unwrap().add("Other", 2).is_err());
}

#[test]
fn request_builders() {
    let mut update = Update::new();
    assert!(update.final_update().is_err(), "an update needs an action");
    update.add_actions([set("Title", "A").unwrap()]).unwrap().set_mult(true);
    assert_eq!(
        update.final_update().unwrap(),
        json!({"$roots": [], "$query": [], "$filter": {"$mult": true}, "$action": [{"$set": {"Title": "A"}}]})
    );
    update.reset_actions();
    assert!(update.final_update().is_err());

    let mut insert = Insert::new();
    insert
        .set_data(json!({"Title": "A"}).as_object().cloned().unwrap())
        .unwrap()
        .set_data(json!({"Level": 1}).as_object().cloned().unwrap())
        .unwrap();
    assert_eq!(insert.final_insert().unwrap()["$data"], json!({"Title": "A", "Level": 1}));
    insert.reset_data();
    assert_eq!(insert.final_insert().unwrap()["$data"], json!({}));

    let mut delete = Delete::new();
    delete.add_roots(["b", "a", "b"]).unwrap().add_queries([exists("Title").unwrap()]).unwrap();
    let json = delete.final_delete().unwrap();
    assert_eq!(json["$roots"], json!(["a", "b"]), "roots are a sorted set");
    assert!(delete.add_roots([""]).is_err());
    delete.reset_queries();
    assert_eq!(delete.final_delete().unwrap()["$query"], json!([]));
}

#[test]
fn select_without_limit_has_none() {
    let mut select = Select::new();
    select.add_queries([exists("Title").unwrap()]).unwrap();
    let request = select.build().unwrap();
    assert_eq!(request.filter().limit(), None, "only the parser applies the load limit");
    assert_eq!(request.last_depth(), 1);
    assert!(select.set_usage_projection("").is_err());
    select.set_usage_projection("Dissemination").unwrap();
    assert_eq!(select.final_select().unwrap()["$projection"], json!({"$usage": "Dissemination"}));
    select.reset_usage_projection();
    assert_eq!(select.final_select().unwrap()["$projection"], json!({}));
}
