//! Dependency Resolution Benchmarks
//!
//! Run with: cargo bench --bench dependency_resolution

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use albertox3::extensions::{
    resolve_extensions, Extension, ExtensionDescriptor, ExtensionRegistry, Features, Requirements,
    StaticInventory,
};
use albertox3::permissions::{
    default_levels, Permission, PermissionDefaults, PermissionLevelResolver, PermissionLevels,
    PermissionModel, PermissionRow, PermissionService, RoleStrategy,
};
use albertox3::storage::{MemoryCache, MemoryStore};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use tokio::runtime::Runtime;

struct Link {
    enabled: bool,
    requires: Requirements,
}

impl Extension for Link {
    fn name(&self) -> &str {
        "Link"
    }

    fn enabled(&self) -> bool {
        self.enabled
    }

    fn requires(&self) -> Requirements {
        self.requires.clone()
    }
}

/// `n` extensions where each one requires its predecessor.
fn chain(n: usize, head_enabled: bool) -> (ExtensionRegistry, Vec<ExtensionDescriptor>) {
    let mut registry = ExtensionRegistry::new();
    let mut descriptors = Vec::with_capacity(n);

    for i in 0..n {
        let name = format!("ext{}", i);
        let descriptor = ExtensionDescriptor::new(
            "extensions",
            "chain",
            name.as_str(),
            PathBuf::from(format!("extensions/chain/{}", name)),
            Features::empty(),
        );
        let requires = if i == 0 {
            Requirements::none()
        } else {
            Requirements::none().with_ext(format!("chain.ext{}", i - 1))
        };
        let enabled = i != 0 || head_enabled;
        registry.register_module(descriptor.package(), move |scope| {
            scope.declare(Link {
                enabled,
                requires: requires.clone(),
            });
            Ok(())
        });
        descriptors.push(descriptor);
    }

    (registry, descriptors)
}

fn benchmark_chain_resolution(c: &mut Criterion) {
    let inventory = StaticInventory::default();
    let mut group = c.benchmark_group("chain_resolution");

    for n in [10usize, 100, 1000] {
        group.throughput(Throughput::Elements(n as u64));

        group.bench_with_input(BenchmarkId::new("all_enabled", n), &n, |b, &n| {
            b.iter(|| {
                let (mut registry, descriptors) = chain(n, true);
                let resolution =
                    resolve_extensions(&mut registry, &inventory, black_box(&descriptors)).unwrap();
                assert_eq!(resolution.enabled.len(), n);
            });
        });

        group.bench_with_input(BenchmarkId::new("head_disabled", n), &n, |b, &n| {
            b.iter(|| {
                let (mut registry, descriptors) = chain(n, false);
                let resolution =
                    resolve_extensions(&mut registry, &inventory, black_box(&descriptors)).unwrap();
                assert!(resolution.enabled.is_empty());
            });
        });
    }

    group.finish();
}

fn benchmark_permission_resolve(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();

    let levels = Arc::new(PermissionLevels::new(default_levels()).unwrap());
    let resolver = Arc::new(PermissionLevelResolver::new(
        Arc::clone(&levels),
        Arc::new(RoleStrategy::new(levels)),
    ));
    let model = PermissionModel::new(
        Arc::new(MemoryCache::new()),
        Arc::new(MemoryStore::<PermissionRow>::new()),
        Duration::from_secs(3600),
    );
    let service = PermissionService::new(model, PermissionDefaults::new(0), resolver);
    let permission = Permission::new("ban", "ban");

    let mut group = c.benchmark_group("permissions");
    group.throughput(Throughput::Elements(1));

    group.bench_function("resolve_cached", |b| {
        b.to_async(&rt).iter(|| async {
            service.resolve(black_box(&permission)).await.unwrap();
        });
    });

    group.finish();
}

criterion_group!(benches, benchmark_chain_resolution, benchmark_permission_resolve);
criterion_main!(benches);
