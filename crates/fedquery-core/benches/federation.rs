//! Federation benchmarks.
//!
//! Measures request planning alone, root-first hydration, and relation-first
//! discovery over in-memory providers at a few root counts.

use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use fedquery_core::catalog::{FederationSchema, RelationDecl, RootDecl};
use fedquery_core::{Federation, FederationConfig, MemoryProvider, RelationRegistry};
use fedquery_proto::{Entity, FilterCondition, Request, SortKey};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::runtime::Runtime;

fn build_federation(users: usize, orders_per_user: usize) -> Federation {
    let mut rng = StdRng::seed_from_u64(42);

    let roots: Vec<Entity> = (0..users as i64)
        .map(|id| {
            Entity::new()
                .with("id", id)
                .with("name", format!("user-{id}"))
                .with("active", rng.gen_bool(0.5))
        })
        .collect();

    let mut orders = Vec::with_capacity(users * orders_per_user);
    for user in 0..users as i64 {
        for n in 0..orders_per_user {
            orders.push(
                Entity::new()
                    .with("id", user * orders_per_user as i64 + n as i64)
                    .with("user_id", user)
                    .with("total", rng.gen_range(1..10_000))
                    .with("is_last", n + 1 == orders_per_user),
            );
        }
    }

    let registry = RelationRegistry::new()
        .with_provider("orders", Arc::new(MemoryProvider::new("Order", orders)));
    let schema = FederationSchema::new(RootDecl::new("User", "id")).with_relation(
        RelationDecl::has_many("orders", "orders", "id", "user_id")
            .with_distinct_filter(FilterCondition::eq("is_last", true)),
    );

    Federation::new(
        schema,
        Arc::new(MemoryProvider::new("User", roots)),
        &registry,
        FederationConfig::default(),
    )
    .unwrap()
}

fn relation_sorted_request(limit: u64) -> Request {
    Request::new()
        .filter(FilterCondition::eq("active", true))
        .sort(SortKey::desc("total").on("orders"))
        .with_limit(limit)
}

fn bench_planning(c: &mut Criterion) {
    let federation = build_federation(10, 1);
    let request = relation_sorted_request(20);

    c.bench_function("federation/plan", |b| {
        b.iter(|| black_box(federation.plan(&request).unwrap()));
    });
}

fn bench_root_first(c: &mut Criterion) {
    let mut group = c.benchmark_group("federation/root_first");
    let runtime = Runtime::new().unwrap();

    for users in [100, 1000] {
        let federation = build_federation(users, 3);
        let request = Request::new().sort(SortKey::asc("name")).with_limit(50);

        group.bench_with_input(BenchmarkId::new("users", users), &users, |b, _| {
            b.to_async(&runtime)
                .iter(|| async { black_box(federation.get_many(&request).await.unwrap()) });
        });
    }

    group.finish();
}

fn bench_relation_first(c: &mut Criterion) {
    let mut group = c.benchmark_group("federation/relation_first");
    let runtime = Runtime::new().unwrap();

    for users in [100, 1000] {
        let federation = build_federation(users, 3);
        let request = relation_sorted_request(50);

        group.bench_with_input(BenchmarkId::new("users", users), &users, |b, _| {
            b.to_async(&runtime)
                .iter(|| async { black_box(federation.get_many(&request).await.unwrap()) });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_planning, bench_root_first, bench_relation_first);
criterion_main!(benches);
