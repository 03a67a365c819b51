//! Selection benchmarks.
//!
//! Run with: `cargo bench -p daedalus-router`

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use daedalus_router::{MediaType, Router};

fn build_router(num_routes: usize) -> Router<usize> {
    let mut builder = Router::builder();

    // Static routes
    for i in 0..num_routes / 3 {
        builder.get(&format!("/api/v1/resource{i}"), i);
    }

    // Variable routes, JSON only
    for i in 0..num_routes / 3 {
        builder
            .get(&format!("/api/v1/resource{i}/:id"), i)
            .produces(["json"]);
    }

    // Nested routes with a constrained variable
    for i in 0..num_routes / 3 {
        builder.get(&format!("/api/v1/org/{{org}}/resource{i}/{{id:[0-9]+}}"), i);
    }

    builder.build().expect("benchmark routes are valid")
}

fn bench_static_select(c: &mut Criterion) {
    let router = build_router(99);
    let accept = MediaType::parse_list("*/*");

    c.bench_function("static_select", |b| {
        b.iter(|| black_box(router.select("GET", "/api/v1/resource20", None, &accept).is_matched()));
    });
}

fn bench_variable_select(c: &mut Criterion) {
    let router = build_router(99);
    let accept = MediaType::parse_list("text/html;q=0.9, application/json");

    c.bench_function("variable_select", |b| {
        b.iter(|| black_box(router.select("GET", "/api/v1/resource20/12345", None, &accept).is_matched()));
    });
}

fn bench_nested_select(c: &mut Criterion) {
    let router = build_router(99);
    let accept = MediaType::parse_list("*/*");

    c.bench_function("nested_select", |b| {
        b.iter(|| {
            black_box(
                router
                    .select("GET", "/api/v1/org/acme/resource10/12345", None, &accept)
                    .is_matched(),
            )
        });
    });
}

fn bench_not_acceptable(c: &mut Criterion) {
    let router = build_router(99);
    let accept = MediaType::parse_list("text/xml");

    c.bench_function("not_acceptable", |b| {
        b.iter(|| black_box(router.select("GET", "/api/v1/resource20/1", None, &accept).outcome()));
    });
}

fn bench_parse_accept(c: &mut Criterion) {
    let header = "text/html, application/xhtml+xml, application/xml;q=0.9, image/webp, */*;q=0.8";

    c.bench_function("parse_accept", |b| {
        b.iter(|| black_box(MediaType::parse_list(black_box(header))));
    });
}

fn bench_scaling(c: &mut Criterion) {
    let mut group = c.benchmark_group("scaling");
    let accept = MediaType::parse_list("*/*");

    for num_routes in [12, 48, 99, 498, 999] {
        let router = build_router(num_routes);

        group.bench_with_input(BenchmarkId::new("last_static", num_routes), &num_routes, |b, &n| {
            let path = format!("/api/v1/resource{}", n / 3 - 1);
            b.iter(|| black_box(router.select("GET", &path, None, &accept).is_matched()));
        });

        group.bench_with_input(BenchmarkId::new("miss", num_routes), &num_routes, |b, _| {
            b.iter(|| black_box(router.select("GET", "/nonexistent/path", None, &accept).outcome()));
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_static_select,
    bench_variable_select,
    bench_nested_select,
    bench_not_acceptable,
    bench_parse_accept,
    bench_scaling
);
criterion_main!(benches);
