use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};

use std::sync::Arc;

use aquaerp_auth::{Capability, CapabilityDirectory};
use aquaerp_core::{ActorId, Money, Pounds};
use aquaerp_infra::{
    FixedClock, InMemoryEventStore, LotRegistry, NewLot, NewSale,
};
use aquaerp_lots::{LotId, LotPolicy, LotState};
use chrono::NaiveDate;

type BenchRegistry = LotRegistry<Arc<InMemoryEventStore>, Arc<CapabilityDirectory>, FixedClock>;

struct Fixture {
    registry: BenchRegistry,
    store: Arc<InMemoryEventStore>,
    directory: Arc<CapabilityDirectory>,
    owner: ActorId,
    seller: ActorId,
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn setup() -> Fixture {
    let owner = ActorId::new();
    let seller = ActorId::new();
    let directory = Arc::new(
        CapabilityDirectory::new()
            .with(owner, Capability::Owner)
            .with(seller, Capability::Seller),
    );
    let store = Arc::new(InMemoryEventStore::new());
    let registry = LotRegistry::new(
        store.clone(),
        directory.clone(),
        FixedClock::new(date(2024, 3, 10)),
        LotPolicy::default(),
    );
    Fixture {
        registry,
        store,
        directory,
        owner,
        seller,
    }
}

/// A lot on sale with far more stock than any benchmark sells.
fn stocked_lot(fx: &Fixture) -> LotId {
    let lot_id = fx
        .registry
        .create_lot(
            NewLot {
                name: "Bench pond".to_string(),
                variety: "Vannamei".to_string(),
                start_date: date(2024, 1, 10),
                estimated_harvest_date: date(2024, 4, 18),
                production_cost: "1000".parse().unwrap(),
            },
            fx.owner,
        )
        .unwrap()
        .lot
        .lot_id;
    fx.registry
        .change_state(lot_id, LotState::ReadyToHarvest, fx.owner)
        .unwrap();
    fx.registry
        .record_harvest(lot_id, "1000000000".parse().unwrap(), date(2024, 3, 1), fx.owner)
        .unwrap();
    lot_id
}

fn small_sale() -> NewSale {
    NewSale {
        weight: "0.25".parse::<Pounds>().unwrap(),
        unit_price: "2.35".parse::<Money>().unwrap(),
        date: date(2024, 3, 2),
        counterparty: "bench buyer".to_string(),
    }
}

fn bench_sale_latency(c: &mut Criterion) {
    let mut group = c.benchmark_group("sale_latency");
    group.sample_size(1000);

    group.bench_function("record_sale", |b| {
        let fx = setup();
        let lot_id = stocked_lot(&fx);
        b.iter(|| black_box(fx.registry.record_sale(lot_id, small_sale(), fx.seller).unwrap()));
    });

    group.bench_function("get_lot", |b| {
        let fx = setup();
        let lot_id = stocked_lot(&fx);
        b.iter(|| black_box(fx.registry.get_lot(lot_id).unwrap()));
    });

    group.finish();
}

fn bench_parallel_lots(c: &mut Criterion) {
    let mut group = c.benchmark_group("parallel_lots");

    for threads in [1usize, 2, 4, 8].iter() {
        group.throughput(Throughput::Elements((*threads * 100) as u64));
        group.bench_with_input(BenchmarkId::new("sales_per_lot", threads), threads, |b, &n| {
            let fx = setup();
            let lots: Vec<LotId> = (0..n).map(|_| stocked_lot(&fx)).collect();
            b.iter(|| {
                std::thread::scope(|scope| {
                    for &lot_id in &lots {
                        let fx = &fx;
                        scope.spawn(move || {
                            for _ in 0..100 {
                                black_box(
                                    fx.registry
                                        .record_sale(lot_id, small_sale(), fx.seller)
                                        .unwrap(),
                                );
                            }
                        });
                    }
                });
            });
        });
    }

    group.finish();
}

fn bench_rehydrate(c: &mut Criterion) {
    let mut group = c.benchmark_group("rehydrate");

    for sales in [10usize, 100, 1000, 10000].iter() {
        group.bench_with_input(BenchmarkId::new("replay_lot_stream", sales), sales, |b, &count| {
            let fx = setup();
            let lot_id = stocked_lot(&fx);
            for _ in 0..count {
                fx.registry
                    .record_sale(lot_id, small_sale(), fx.seller)
                    .unwrap();
            }

            b.iter(|| {
                let rebuilt = LotRegistry::rehydrate(
                    fx.store.clone(),
                    fx.directory.clone(),
                    FixedClock::new(date(2024, 3, 10)),
                    LotPolicy::default(),
                )
                .unwrap();
                black_box(rebuilt.get_lot(lot_id).unwrap());
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_sale_latency, bench_parallel_lots, bench_rehydrate);
criterion_main!(benches);
