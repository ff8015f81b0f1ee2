use arbor_store::{BPlusTree, LinearStore, NullObserver};
use colored::*;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use std::hint::black_box;
use std::time::{Duration, Instant};

struct Timings {
    insert: Duration,
    search: Duration,
    range: Duration,
    scan: Duration,
    remove: Duration,
}

/// Feeds identical seeded workloads to the B+ tree and the linear baseline
/// and prints wall-clock per operation class. Observational only.
pub fn run(count: usize, order: usize) {
    println!(
        "{}",
        format!("Workload: {} keys, tree order {}", count, order).bold()
    );

    let mut rng = StdRng::seed_from_u64(42);
    let mut keys: Vec<i64> = (0..count as i64).collect();
    keys.shuffle(&mut rng);
    let probes: Vec<i64> = (0..count)
        .map(|_| rng.gen_range(0..count as i64 * 2))
        .collect();
    let windows: Vec<(i64, i64)> = (0..200)
        .map(|_| {
            let lo = rng.gen_range(0..count as i64);
            (lo, lo + 250)
        })
        .collect();

    let tree = bench_tree(order, &keys, &probes, &windows);
    let linear = bench_linear(&keys, &probes, &windows);

    println!();
    println!("| Operation | {:>12} | {:>12} |", "BPlusTree", "LinearStore");
    println!("|-----------|--------------|--------------|");
    print_row("insert", tree.insert, linear.insert);
    print_row("search", tree.search, linear.search);
    print_row("range", tree.range, linear.range);
    print_row("scan", tree.scan, linear.scan);
    print_row("delete", tree.remove, linear.remove);
}

fn print_row(name: &str, tree: Duration, linear: Duration) {
    println!("| {:<9} | {:>12.2?} | {:>12.2?} |", name, tree, linear);
}

fn bench_tree(order: usize, keys: &[i64], probes: &[i64], windows: &[(i64, i64)]) -> Timings {
    let mut tree = BPlusTree::new(order);
    let mut sink = NullObserver;

    let start = Instant::now();
    for &key in keys {
        tree.insert_observed(key, key, &mut sink);
    }
    let insert = start.elapsed();

    let start = Instant::now();
    let mut hits = 0usize;
    for probe in probes {
        if tree.search(probe).is_some() {
            hits += 1;
        }
    }
    black_box(hits);
    let search = start.elapsed();

    let start = Instant::now();
    let mut total = 0usize;
    for (lo, hi) in windows {
        total += tree.range(lo, hi).count();
    }
    black_box(total);
    let range = start.elapsed();

    let start = Instant::now();
    black_box(tree.iter().count());
    let scan = start.elapsed();

    let start = Instant::now();
    for key in keys {
        tree.remove_observed(key, &mut sink);
    }
    let remove = start.elapsed();

    Timings {
        insert,
        search,
        range,
        scan,
        remove,
    }
}

fn bench_linear(keys: &[i64], probes: &[i64], windows: &[(i64, i64)]) -> Timings {
    let mut store = LinearStore::new();

    let start = Instant::now();
    for &key in keys {
        store.insert(key, key);
    }
    let insert = start.elapsed();

    let start = Instant::now();
    let mut hits = 0usize;
    for probe in probes {
        if store.search(probe).is_some() {
            hits += 1;
        }
    }
    black_box(hits);
    let search = start.elapsed();

    let start = Instant::now();
    let mut total = 0usize;
    for (lo, hi) in windows {
        total += store.range(lo, hi).len();
    }
    black_box(total);
    let range = start.elapsed();

    let start = Instant::now();
    black_box(store.scan().len());
    let scan = start.elapsed();

    let start = Instant::now();
    for key in keys {
        store.remove(key);
    }
    let remove = start.elapsed();

    Timings {
        insert,
        search,
        range,
        scan,
        remove,
    }
}
