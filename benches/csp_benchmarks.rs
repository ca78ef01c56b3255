use criterion::{Criterion, criterion_group, criterion_main};
use palisade::prelude::*;
use palisade::reduce::reduce_source_list;
use std::hint::black_box;
use std::sync::Arc;

fn site_policy() -> Policy {
    let mut policy = Policy::recommended()
        .script_src(["'self'", "https://cdn.example.com", "https://cdn.example.com"])
        .style_src(["'self'", "'unsafe-inline'"])
        .img_src(["'self'", "data:", "https:", "https://img.example.com"])
        .upgrade_insecure_requests();
    policy
        .set_directive("connect-src", "'self' wss: wss://socket.example.com")
        .unwrap();
    policy
}

fn bench_serialization(c: &mut Criterion) {
    let mut group = c.benchmark_group("serialize");

    let recommended = Policy::recommended();
    group.bench_function("recommended", |b| {
        b.iter(|| black_box(&recommended).header_value())
    });

    let site = site_policy();
    group.bench_function("site", |b| b.iter(|| black_box(&site).header_value()));

    let sources: Vec<String> = ["*", "'self'", "https:", "data:", "a.example.com", "https://b.example.com"]
        .iter()
        .map(|s| s.to_string())
        .collect();
    group.bench_function("reduce_wildcard", |b| {
        b.iter(|| reduce_source_list(black_box(&sources)))
    });

    group.finish();
}

fn bench_helper(c: &mut Criterion) {
    let mut group = c.benchmark_group("helper");

    group.bench_function("append_nonce", |b| {
        b.iter(|| {
            let helper = PolicyHelper::new(Arc::new(NonceSource::new()));
            let mut policy = site_policy();
            helper
                .append_nonce(&mut policy, Resource::Script, "'unsafe-inline'", None)
                .unwrap();
            policy.header_value()
        })
    });

    let hash = HashAlgorithm::Sha256.source("document.body.classList.add('js')");
    group.bench_function("append_hash_attr", |b| {
        b.iter(|| {
            let helper = PolicyHelper::new(Arc::new(NonceSource::new()));
            let mut policy = site_policy();
            helper
                .append_hash(
                    &mut policy,
                    Resource::Script,
                    Scope::Attr,
                    "'unsafe-inline'",
                    black_box(&hash),
                )
                .unwrap();
            policy
        })
    });

    group.bench_function("nonce_value", |b| {
        b.iter(|| NonceSource::new().as_source())
    });

    group.finish();
}

criterion_group!(csp_benches, bench_serialization, bench_helper);

criterion_main!(csp_benches);
