use criterion::{criterion_group, criterion_main, Criterion};
use ledger_core::{
    mine::mine_block_parallel, pow::mine_block, Action, Block, Metadata, Transaction,
};
use rand::{rngs::StdRng, Rng, SeedableRng};

fn candidate() -> Block {
    let mut rng = StdRng::seed_from_u64(42);
    let txs: Vec<Transaction> = (0..10)
        .map(|i| {
            let action = Action::ALL[rng.gen_range(0..Action::ALL.len())];
            Transaction::new(
                rng.gen_range(1..1_000),
                rng.gen_range(1..100),
                action,
                format!("validator-{i}"),
                Metadata::new(),
                "0",
            )
            .unwrap()
        })
        .collect();
    Block::candidate(1, "0", txs)
}

fn bench_pow(c: &mut Criterion) {
    let block = candidate();

    c.bench_function("seal_difficulty_2", |b| {
        b.iter(|| {
            let _sealed = mine_block(block.clone(), 2, u64::MAX).unwrap();
        });
    });

    c.bench_function("seal_difficulty_4_sequential", |b| {
        b.iter(|| {
            let _sealed = mine_block(block.clone(), 4, u64::MAX).unwrap();
        });
    });

    c.bench_function("seal_difficulty_4_parallel", |b| {
        b.iter(|| {
            let _sealed = mine_block_parallel(block.clone(), 4, u64::MAX).unwrap();
        });
    });
}

criterion_group!(benches, bench_pow);
criterion_main!(benches);
