use criterion::{black_box, criterion_group, criterion_main, Criterion};
use farm_api::prelude::*;
use farm_network::store::FarmStore;
use rand::{distributions::Alphanumeric, Rng};
use tempdir::TempDir;

const NUM_USERS: usize = 1000;

fn random_user_id() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(20)
        .map(char::from)
        .collect()
}

fn seeded_store(temp_dir: &TempDir, users: usize) -> (FarmStore, Vec<String>) {
    let store = FarmStore::new(temp_dir.path()).unwrap();
    let ids: Vec<String> = (0..users).map(|_| random_user_id()).collect();
    for id in &ids {
        let doc = UserDocument::new_user(format!("FZ-{}", &id[..6]), None, 0);
        store.compare_and_set(id, 0, doc).unwrap();
    }
    (store, ids)
}

fn bench_snapshot(c: &mut Criterion) {
    let temp_dir = TempDir::new("bench_snapshot").unwrap();
    let (store, ids) = seeded_store(&temp_dir, NUM_USERS);

    let mut group = c.benchmark_group("snapshot");
    group.bench_function("get_user_snapshot", |b| {
        let mut i = 0;
        b.iter(|| {
            let id = &ids[i % ids.len()];
            i += 1;
            black_box(store.snapshot(black_box(id)).unwrap());
        })
    });
    group.finish();
}

fn bench_session_cycle(c: &mut Criterion) {
    let temp_dir = TempDir::new("bench_session_cycle").unwrap();
    let (store, ids) = seeded_store(&temp_dir, 1);
    let settings = MiningSettings {
        mining_duration: 0.0,
        total_reward: 6.0,
    };

    let mut group = c.benchmark_group("session_cycle");
    group.bench_function("start_then_claim", |b| {
        b.iter(|| {
            store
                .atomic_update_with(black_box(&ids[0]), |doc, now| {
                    let mut next = doc?.clone();
                    next.set_mining_record(reserve(now, &settings)?);
                    Some(next)
                })
                .unwrap();
            store
                .atomic_update_with(black_box(&ids[0]), |doc, now| {
                    let doc = doc?;
                    if !matches!(classify(&doc.mining_record(), now), SessionState::Claimable { .. }) {
                        return None;
                    }
                    let mut next = doc.clone();
                    next.balance += settings.total_reward;
                    next.set_mining_record(MiningRecord::IDLE);
                    Some(next)
                })
                .unwrap();
        })
    });
    group.finish();
}

fn bench_stale_compare_and_set(c: &mut Criterion) {
    let temp_dir = TempDir::new("bench_stale_cas").unwrap();
    let (store, ids) = seeded_store(&temp_dir, 1);
    let doc = UserDocument::default();

    let mut group = c.benchmark_group("compare_and_set");
    group.bench_function("rejected_stale_revision", |b| {
        b.iter(|| {
            let result = store
                .compare_and_set(black_box(&ids[0]), black_box(0), doc.clone())
                .unwrap();
            assert!(!result.committed);
        })
    });
    group.finish();
}

fn bench_append_transaction(c: &mut Criterion) {
    let temp_dir = TempDir::new("bench_append").unwrap();
    let (store, ids) = seeded_store(&temp_dir, NUM_USERS);

    let mut group = c.benchmark_group("append_transaction");
    group.sample_size(20);
    group.bench_function("append_mining_reward", |b| {
        let mut i = 0;
        b.iter(|| {
            let id = &ids[i % ids.len()];
            i += 1;
            store
                .append_transaction(black_box(id), LogEntry::mining(6.0))
                .unwrap();
        })
    });
    group.finish();
}

criterion_group!(
    benches,
    bench_snapshot,
    bench_session_cycle,
    bench_stale_compare_and_set,
    bench_append_transaction
);
criterion_main!(benches);
