use criterion::{BatchSize, BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};

use std::collections::BTreeMap;

use citycat_catalog::{EntityType, ImportScope, NewCategory, NewProduct, NewSubCategory, ProductPatch};
use citycat_core::{CategoryId, CityId, ExpectedVersion, ProductId};
use citycat_events::InMemoryEventBus;
use citycat_infra::{CatalogEnvelope, CatalogService, InMemoryCatalogStore};
use citycat_markets::NewCity;
use tokio::runtime::Runtime;
use uuid::Uuid;

type BenchService = CatalogService<InMemoryCatalogStore, InMemoryEventBus<CatalogEnvelope>>;

/// A catalog of `categories` categories with `subs_per_category` subcategories each and
/// one product per category, plus two empty cities.
struct Fixture {
    service: BenchService,
    source: CityId,
    target: CityId,
    categories: Vec<Uuid>,
    products: Vec<Uuid>,
}

fn runtime() -> Runtime {
    tokio::runtime::Builder::new_current_thread().build().unwrap()
}

fn new_city(name: &str) -> NewCity {
    NewCity {
        name: name.to_string(),
        state: "Bihar".to_string(),
        contact_number: "0612 555 0100".to_string(),
        sort_order: None,
        is_active: None,
    }
}

fn setup(rt: &Runtime, categories: usize, subs_per_category: usize) -> Fixture {
    rt.block_on(async {
        let service = CatalogService::new(InMemoryCatalogStore::new(), InMemoryEventBus::new());
        let source = service.create_city(new_city("Patna")).await.unwrap().id;
        let target = service.create_city(new_city("Ranchi")).await.unwrap().id;

        let mut category_ids = Vec::with_capacity(categories);
        let mut product_ids = Vec::with_capacity(categories);
        for i in 0..categories {
            let category = service
                .create_category(NewCategory {
                    name: format!("Category {i}"),
                    description: String::new(),
                    media: Vec::new(),
                })
                .await
                .unwrap();
            for j in 0..subs_per_category {
                service
                    .create_sub_category(NewSubCategory {
                        name: format!("Sub {i}.{j}"),
                        description: String::new(),
                        media: Vec::new(),
                        parent_category_id: category.id,
                    })
                    .await
                    .unwrap();
            }
            let product = service
                .create_product(NewProduct {
                    name: format!("Product {i}"),
                    description: String::new(),
                    price: 999,
                    images: Vec::new(),
                    attributes: BTreeMap::new(),
                    category_id: category.id,
                    sub_category_id: None,
                })
                .await
                .unwrap();
            category_ids.push(*category.id.as_uuid());
            product_ids.push(*product.id.as_uuid());
        }

        Fixture {
            service,
            source,
            target,
            categories: category_ids,
            products: product_ids,
        }
    })
}

fn bench_assign_cascade(c: &mut Criterion) {
    let rt = runtime();
    let mut group = c.benchmark_group("assign_cascade");

    for count in [10usize, 100, 1000].iter() {
        group.throughput(Throughput::Elements(*count as u64));
        group.bench_with_input(BenchmarkId::from_parameter(count), count, |b, &count| {
            b.iter_batched(
                || setup(&rt, count, 5),
                |fx| {
                    let outcome = rt
                        .block_on(fx.service.assign(fx.source, EntityType::Category, fx.categories.clone()))
                        .unwrap();
                    black_box(outcome);
                },
                BatchSize::LargeInput,
            );
        });
    }

    group.finish();
}

fn bench_import(c: &mut Criterion) {
    let rt = runtime();
    let mut group = c.benchmark_group("import_all");

    for count in [10usize, 100, 1000].iter() {
        group.throughput(Throughput::Elements(*count as u64));
        group.bench_with_input(BenchmarkId::from_parameter(count), count, |b, &count| {
            b.iter_batched(
                || {
                    let fx = setup(&rt, count, 5);
                    rt.block_on(async {
                        fx.service
                            .assign(fx.source, EntityType::Category, fx.categories.clone())
                            .await
                            .unwrap();
                        fx.service
                            .assign(fx.source, EntityType::Product, fx.products.clone())
                            .await
                            .unwrap();
                    });
                    fx
                },
                |fx| {
                    let outcome = rt
                        .block_on(fx.service.import(fx.target, fx.source, ImportScope::All))
                        .unwrap();
                    black_box(outcome);
                },
                BatchSize::LargeInput,
            );
        });
    }

    group.finish();
}

fn bench_edit_in_city(c: &mut Criterion) {
    let rt = runtime();
    let mut group = c.benchmark_group("edit_product_in_city");
    let patch = ProductPatch {
        price: Some(799),
        ..ProductPatch::default()
    };

    for (label, shared) in [("in_place", false), ("fork", true)] {
        group.bench_function(label, |b| {
            b.iter_batched(
                || {
                    let fx = setup(&rt, 1, 0);
                    rt.block_on(async {
                        fx.service
                            .assign(fx.source, EntityType::Product, fx.products.clone())
                            .await
                            .unwrap();
                        if shared {
                            fx.service
                                .assign(fx.target, EntityType::Product, fx.products.clone())
                                .await
                                .unwrap();
                        }
                    });
                    fx
                },
                |fx| {
                    let product = ProductId::from_uuid(fx.products[0]);
                    let outcome = rt
                        .block_on(fx.service.edit_product_in_city(fx.source, product, patch.clone()))
                        .unwrap();
                    black_box(outcome);
                },
                BatchSize::SmallInput,
            );
        });
    }

    group.finish();
}

fn bench_reorder(c: &mut Criterion) {
    let rt = runtime();
    let mut group = c.benchmark_group("reorder_categories");

    for count in [10usize, 100, 1000].iter() {
        let fx = setup(&rt, *count, 0);
        let mut reversed: Vec<CategoryId> = fx.categories.iter().copied().map(CategoryId::from_uuid).collect();
        reversed.reverse();
        group.throughput(Throughput::Elements(*count as u64));
        group.bench_with_input(BenchmarkId::from_parameter(count), count, |b, _| {
            b.iter(|| {
                reversed.reverse();
                let order = rt
                    .block_on(fx.service.reorder_categories(reversed.clone(), ExpectedVersion::Any))
                    .unwrap();
                black_box(order);
            });
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_assign_cascade,
    bench_import,
    bench_edit_in_city,
    bench_reorder
);
criterion_main!(benches);
