//! Share arithmetic benchmarks for the hodl vaults.
//!
//! Covers the decay formula across exponents, the penalty split, and a full
//! deposit through a vault backed by the in-memory ledger.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use hodl_contracts::hodl_vault::{BonusAsset, HodlVault, VaultParams};
use hodl_contracts::shares::{decayed_shares, penalty_split};
use hodl_protocol::{Address, AssetMetadata, CallContext, InMemoryLedger};

const DAY: u64 = 86_400;
const ONE: u128 = 1_000_000_000_000_000_000;

fn bench_decay(c: &mut Criterion) {
    let mut group = c.benchmark_group("shares/decay");
    for n in [1u32, 2, 4] {
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, &n| {
            b.iter(|| decayed_shares(black_box(ONE), black_box(DAY), 3 * DAY, n));
        });
    }
    group.finish();
}

fn bench_penalty_split(c: &mut Criterion) {
    c.bench_function("shares/penalty_split", |b| {
        b.iter(|| penalty_split(black_box(ONE), black_box(50), black_box(50)));
    });
}

fn bench_deposit(c: &mut Criterion) {
    let weth = Address::from_label("weth");
    let alice = Address::from_label("alice");
    let start = 1_800_000_000;

    let mut vault = HodlVault::new(Address::from_label("vault"));
    vault
        .init(
            &CallContext::new(alice, start),
            VaultParams {
                asset: weth,
                penalty_rate: 50,
                locking_window: DAY,
                expiry: start + 30 * DAY,
                fee_rate: 50,
                decay_exponent: 2,
                fee_recipient: Address::from_label("fees"),
                bonus_asset: BonusAsset::Disabled,
            },
            AssetMetadata::new("Hodl WETH", "hWETH", 18),
        )
        .unwrap();

    let mut ledger = InMemoryLedger::new();
    ledger.register(weth, AssetMetadata::new("WETH", "WETH", 18)).unwrap();
    ledger.mint(&weth, &alice, u128::MAX / 2).unwrap();
    ledger.approve(&weth, &alice, &vault.address(), u128::MAX).unwrap();

    let ctx = CallContext::new(alice, start + DAY);
    c.bench_function("vault/deposit", |b| {
        b.iter(|| vault.deposit(&ctx, &mut ledger, black_box(1_000), alice).unwrap());
    });
}

criterion_group!(benches, bench_decay, bench_penalty_split, bench_deposit);
criterion_main!(benches);
