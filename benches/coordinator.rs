// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 The verba-ledger authors
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Benchmarks for the ledger coordinator.
//!
//! Run with: cargo bench
//!
//! Benchmarks include:
//! - Single-threaded transfer and expense throughput
//! - The full card lifecycle (create, fund, spend, approve)
//! - Multi-threaded operation across independent cards
//! - Contention scaling as more threads share fewer cards

use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use rayon::prelude::*;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::Arc;
use verba_ledger::{
    AllowAll, CardId, CategoryId, CategoryRegistry, Coordinator, MemoryCashLedger,
    MemoryProjectBudget, ProjectBudget, ProjectId, UserId,
};

const ADMIN: UserId = UserId(1);
const PROJECT: ProjectId = ProjectId(1);
const MATERIALS: CategoryId = CategoryId(1);

// =============================================================================
// Helper Functions
// =============================================================================

fn make_coordinator(pool: Decimal) -> Coordinator {
    let budget = Arc::new(MemoryProjectBudget::new());
    budget.open_pool(PROJECT, pool);
    Coordinator::new(
        Arc::new(MemoryCashLedger::new()),
        budget,
        Arc::new(CategoryRegistry::with_defaults()),
        Arc::new(AllowAll),
    )
}

fn make_funded_cards(coordinator: &Coordinator, count: u32, funding: Decimal) -> Vec<CardId> {
    (0..count)
        .map(|i| {
            let id = coordinator
                .create_card(
                    ADMIN,
                    PROJECT,
                    &format!("Card {i}"),
                    "Acme",
                    dec!(1000000.00),
                    ADMIN,
                )
                .unwrap();
            coordinator.transfer(ADMIN, id, funding).unwrap();
            id
        })
        .collect()
}

// =============================================================================
// Single-Threaded Benchmarks
// =============================================================================

fn bench_single_transfer(c: &mut Criterion) {
    c.bench_function("single_transfer", |b| {
        b.iter(|| {
            let coordinator = make_coordinator(dec!(1000000.00));
            let card = coordinator
                .create_card(ADMIN, PROJECT, "Card", "Acme", dec!(1000000.00), ADMIN)
                .unwrap();
            coordinator
                .transfer(ADMIN, black_box(card), dec!(100.00))
                .unwrap();
        })
    });
}

fn bench_single_expense(c: &mut Criterion) {
    c.bench_function("single_expense", |b| {
        b.iter(|| {
            let coordinator = make_coordinator(dec!(1000000.00));
            let card = coordinator
                .create_card(ADMIN, PROJECT, "Card", "Acme", dec!(1000000.00), ADMIN)
                .unwrap();
            coordinator.transfer(ADMIN, card, dec!(100.00)).unwrap();
            coordinator
                .register_expense(ADMIN, black_box(card), MATERIALS, "supplies", dec!(50.00), None)
                .unwrap();
        })
    });
}

fn bench_transfer_throughput(c: &mut Criterion) {
    let mut group = c.benchmark_group("transfer_throughput");

    for count in [100, 1_000, 10_000].iter() {
        group.throughput(Throughput::Elements(*count as u64));
        group.bench_with_input(BenchmarkId::from_parameter(count), count, |b, &count| {
            b.iter(|| {
                let coordinator = make_coordinator(dec!(100000000.00));
                let card = coordinator
                    .create_card(ADMIN, PROJECT, "Card", "Acme", dec!(100000000.00), ADMIN)
                    .unwrap();
                for _ in 0..count {
                    coordinator.transfer(ADMIN, card, dec!(10.00)).unwrap();
                }
                black_box(&coordinator);
            })
        });
    }
    group.finish();
}

fn bench_expense_throughput(c: &mut Criterion) {
    let mut group = c.benchmark_group("expense_throughput");

    for count in [100, 1_000, 10_000].iter() {
        group.throughput(Throughput::Elements(*count as u64));
        group.bench_with_input(BenchmarkId::from_parameter(count), count, |b, &count| {
            b.iter(|| {
                let coordinator = make_coordinator(dec!(100000000.00));
                let card = coordinator
                    .create_card(ADMIN, PROJECT, "Card", "Acme", dec!(100000000.00), ADMIN)
                    .unwrap();
                coordinator
                    .transfer(ADMIN, card, Decimal::from(count) * dec!(2.00))
                    .unwrap();
                for _ in 0..count {
                    coordinator
                        .register_expense(ADMIN, card, MATERIALS, "supplies", dec!(1.00), None)
                        .unwrap();
                }
                black_box(&coordinator);
            })
        });
    }
    group.finish();
}

// =============================================================================
// Lifecycle Benchmarks
// =============================================================================

fn bench_card_lifecycle(c: &mut Criterion) {
    let mut group = c.benchmark_group("card_lifecycle");

    // Fund, spend, finalize, approve: the whole reconciliation saga.
    group.bench_function("fund_spend_approve", |b| {
        b.iter(|| {
            let coordinator = make_coordinator(dec!(1000000.00));
            let card = coordinator
                .create_card(ADMIN, PROJECT, "Card", "Acme", dec!(1000000.00), ADMIN)
                .unwrap();
            coordinator.transfer(ADMIN, card, dec!(3000.00)).unwrap();
            coordinator
                .register_expense(ADMIN, card, MATERIALS, "supplies", dec!(1200.00), None)
                .unwrap();
            coordinator.finalize_card(ADMIN, card).unwrap();
            coordinator.approve_card(ADMIN, black_box(card)).unwrap();
        })
    });

    // The fund-request round trip.
    group.bench_function("request_and_approve_funds", |b| {
        b.iter(|| {
            let coordinator = make_coordinator(dec!(1000000.00));
            let card = coordinator
                .create_card(ADMIN, PROJECT, "Card", "Acme", dec!(1000000.00), ADMIN)
                .unwrap();
            coordinator.transfer(ADMIN, card, dec!(1000.00)).unwrap();
            let request = coordinator
                .request_funds(ADMIN, card, ADMIN, dec!(500.00), "more")
                .unwrap();
            coordinator
                .resolve_fund_request(ADMIN, black_box(request), verba_ledger::Decision::Approve)
                .unwrap();
        })
    });

    group.finish();
}

// =============================================================================
// Multi-Threaded Benchmarks
// =============================================================================

fn bench_parallel_transfers_same_card(c: &mut Criterion) {
    let mut group = c.benchmark_group("parallel_transfers_same_card");

    for count in [1_000, 10_000].iter() {
        group.throughput(Throughput::Elements(*count as u64));
        group.bench_with_input(BenchmarkId::from_parameter(count), count, |b, &count| {
            b.iter(|| {
                let coordinator = Arc::new(make_coordinator(dec!(100000000.00)));
                let card = coordinator
                    .create_card(ADMIN, PROJECT, "Card", "Acme", dec!(100000000.00), ADMIN)
                    .unwrap();

                (0..count).into_par_iter().for_each(|_| {
                    coordinator.transfer(ADMIN, card, dec!(1.00)).unwrap();
                });

                black_box(&coordinator);
            })
        });
    }
    group.finish();
}

fn bench_parallel_transfers_different_cards(c: &mut Criterion) {
    let mut group = c.benchmark_group("parallel_transfers_different_cards");

    for num_cards in [10, 100, 1_000].iter() {
        let transfers_per_card = 10u64;
        group.throughput(Throughput::Elements(*num_cards as u64 * transfers_per_card));
        group.bench_with_input(
            BenchmarkId::from_parameter(num_cards),
            num_cards,
            |b, &num_cards| {
                b.iter_batched(
                    || {
                        let coordinator = Arc::new(make_coordinator(dec!(100000000.00)));
                        let cards = make_funded_cards(&coordinator, num_cards, dec!(100.00));
                        (coordinator, cards)
                    },
                    |(coordinator, cards)| {
                        cards.par_iter().for_each(|card| {
                            for _ in 0..transfers_per_card {
                                coordinator.transfer(ADMIN, *card, dec!(1.00)).unwrap();
                            }
                        });
                        black_box(&coordinator);
                    },
                    criterion::BatchSize::SmallInput,
                )
            },
        );
    }
    group.finish();
}

fn bench_parallel_expenses(c: &mut Criterion) {
    let mut group = c.benchmark_group("parallel_expenses");

    for num_cards in [10, 100].iter() {
        let expenses_per_card = 50u64;
        group.throughput(Throughput::Elements(*num_cards as u64 * expenses_per_card));
        group.bench_with_input(
            BenchmarkId::from_parameter(num_cards),
            num_cards,
            |b, &num_cards| {
                b.iter_batched(
                    || {
                        let coordinator = Arc::new(make_coordinator(dec!(100000000.00)));
                        let cards = make_funded_cards(&coordinator, num_cards, dec!(10000.00));
                        (coordinator, cards)
                    },
                    |(coordinator, cards)| {
                        cards.par_iter().for_each(|card| {
                            for _ in 0..expenses_per_card {
                                coordinator
                                    .register_expense(
                                        ADMIN, *card, MATERIALS, "supplies", dec!(1.00), None,
                                    )
                                    .unwrap();
                            }
                        });
                        black_box(&coordinator);
                    },
                    criterion::BatchSize::SmallInput,
                )
            },
        );
    }
    group.finish();
}

// =============================================================================
// Contention Scaling
// =============================================================================

fn bench_contention(c: &mut Criterion) {
    let mut group = c.benchmark_group("contention");
    let total_ops = 10_000u32;

    // Fewer cards = more contention on the per-card operation guard.
    for num_cards in [1, 10, 100, 1_000].iter() {
        group.throughput(Throughput::Elements(total_ops as u64));
        group.bench_with_input(
            BenchmarkId::new("cards", num_cards),
            num_cards,
            |b, &num_cards| {
                b.iter_batched(
                    || {
                        let coordinator = Arc::new(make_coordinator(dec!(100000000.00)));
                        let cards = make_funded_cards(&coordinator, num_cards, dec!(100.00));
                        (coordinator, cards)
                    },
                    |(coordinator, cards)| {
                        (0..total_ops).into_par_iter().for_each(|i| {
                            let card = cards[(i as usize) % cards.len()];
                            coordinator.transfer(ADMIN, card, dec!(1.00)).unwrap();
                        });
                        black_box(&coordinator);
                    },
                    criterion::BatchSize::SmallInput,
                )
            },
        );
    }
    group.finish();
}

// =============================================================================
// Criterion Groups
// =============================================================================

criterion_group!(
    single_threaded,
    bench_single_transfer,
    bench_single_expense,
    bench_transfer_throughput,
    bench_expense_throughput,
);

criterion_group!(lifecycle, bench_card_lifecycle,);

criterion_group!(
    multi_threaded,
    bench_parallel_transfers_same_card,
    bench_parallel_transfers_different_cards,
    bench_parallel_expenses,
);

criterion_group!(scaling, bench_contention,);

criterion_main!(single_threaded, lifecycle, multi_threaded, scaling);
