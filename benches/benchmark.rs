use criterion::{black_box, criterion_group, criterion_main, Criterion};
use serde_json::Value;

use cairn::builder::*;
use cairn::catalog;
use cairn::request::RequestKind;
use cairn::RequestParser;

fn select_text(queries: usize) -> String {
    let mut chain = vec![r#"{"$path": ["id1", "id2"]}"#.to_string()];
    for n in 1..queries {
        chain.push(format!(
            r#"{{"$and": [{{"$eq": {{"Title": "report {n}"}}}}, {{"$range": {{"StartDate": {{"$gte": {{"$date": "2015-01-01"}}, "$lt": {{"$date": "2016-01-01"}}}}}}}}], "$depth": 1}}"#
        ));
    }
    format!(
        r#"{{"$roots": ["id0"], "$query": [{}], "$filter": {{"$limit": 1000, "$hint": ["cache"], "$orderby": {{"Title": 1}}}}, "$projection": {{"$fields": {{"Title": 1}}}}}}"#,
        chain.join(", ")
    )
}

pub fn criterion_benchmark(c: &mut Criterion) {
    let mut parser = RequestParser::default();
    for queries in [1, 10, 100] {
        let text = select_text(queries);
        c.bench_function(&format!("parse select {queries}"), |b| b.iter(|| parser.parse(black_box(&text))));
        let value: Value = serde_json::from_str(&text).unwrap();
        c.bench_function(&format!("validate select {queries}"), |b| {
            b.iter(|| catalog::validate_request(RequestKind::Select, black_box(&value)))
        });
    }
    c.bench_function("build select", |b| {
        b.iter(|| {
            let mut select = Select::new();
            select
                .add_roots(["id0"])
                .unwrap()
                .add_queries([
                    path(["id1", "id2"]).unwrap(),
                    and()
                        .add([eq("Title", "report").unwrap(), exists("Description").unwrap()])
                        .unwrap()
                        .set_depth_limit(1)
                        .unwrap(),
                ])
                .unwrap()
                .set_limit_filter(0, 1000);
            black_box(select.final_select())
        })
    });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
