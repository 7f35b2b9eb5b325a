use criterion::{criterion_group, criterion_main, Criterion};
use std::hint::black_box;

use propkeeper::compose::QueryComposer;
use propkeeper::construct::{PropertyGroup, Status, Tag};
use propkeeper::database::Database;
use propkeeper::filter::{FilterBindings, Pagination, TagPredicates};
use propkeeper::interface::{FilterRequest, QueryParams};
use propkeeper::persist::PersistenceMode;
use propkeeper::sort::Sort;

fn populated(groups: usize) -> Database {
    let db = Database::new(PersistenceMode::InMemory).expect("db");
    db.add_tag_domain_key("env").expect("domain");
    db.add_tag_domain_key("region").expect("domain");
    for i in 0..groups {
        let status = if i % 3 == 0 { Status::Inactive } else { Status::Active };
        let id = db
            .create_property_group(&PropertyGroup::new(format!("svc{}", i % 50), "1.0", status))
            .expect("group");
        let env = if i % 2 == 0 { "prod" } else { "dev" };
        db.create_tag(id, &Tag::new("env", Some(env))).expect("tag");
        db.create_tag(id, &Tag::new("region", Some("eu"))).expect("tag");
    }
    db
}

pub fn criterion_benchmark(c: &mut Criterion) {
    let bindings = FilterBindings::<PropertyGroup>::new()
        .with("name", "svc1")
        .expect("binding");
    let tags = TagPredicates::new()
        .with("env", "prod")
        .and_then(|t| t.with("region", "eu"))
        .expect("tags");
    let sorts = vec![Sort::desc("name").expect("sort"), Sort::asc("id").expect("sort")];
    let page = Pagination::default();

    c.bench_function("compose plain", |b| {
        b.iter(|| {
            QueryComposer::compose(black_box(&bindings), &TagPredicates::new(), &sorts, &page)
        })
    });
    c.bench_function("compose 2 tags", |b| {
        b.iter(|| QueryComposer::compose(black_box(&bindings), black_box(&tags), &sorts, &page))
    });

    let params: QueryParams = [("name", "svc1"), ("env", "prod"), ("sort", "id desc")]
        .into_iter()
        .collect();
    c.bench_function("dispatch query params", |b| {
        b.iter(|| FilterRequest::<PropertyGroup>::from_query_default(black_box(&params)))
    });

    let db = populated(10_000);
    let by_name = FilterRequest::new(bindings.clone(), page);
    c.bench_function("filter 10k by name", |b| {
        b.iter(|| db.filter_property_groups(black_box(&by_name)))
    });
    let by_tags = FilterRequest::<PropertyGroup>::default().with_tags(tags.clone());
    c.bench_function("filter 10k by 2 tags", |b| {
        b.iter(|| db.filter_property_groups(black_box(&by_tags)))
    });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
