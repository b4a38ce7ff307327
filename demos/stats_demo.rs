use std::collections::hash_map::RandomState;

use clap::Parser;
use clap::ValueEnum;
use packed_hash::HashTable;
use packed_hash::InsertOutcome;
use packed_hash::ProbeKind;
use packed_hash::hasher::DefaultEq;
use packed_hash::probe::Probe;

#[derive(Clone, Copy, Debug, ValueEnum)]
enum ProbeArg {
    Linear,
    Tiered,
}

impl From<ProbeArg> for ProbeKind {
    fn from(arg: ProbeArg) -> Self {
        match arg {
            ProbeArg::Linear => ProbeKind::Linear,
            ProbeArg::Tiered => ProbeKind::Tiered,
        }
    }
}

#[derive(Parser, Debug)]
struct Args {
    #[arg(short = 'c', long = "target_capacity", default_value_t = 1000)]
    target_capacity: usize,

    #[arg(short = 'p', long = "probe", value_enum, default_value_t = ProbeArg::Linear)]
    probe: ProbeArg,

    /// Percentage of the fill (at most half) to delete and replace with new keys
    /// before the table is topped up to its threshold.
    #[arg(long = "churn", default_value_t = 0)]
    churn: u8,
}

fn main() {
    let args = Args::parse();
    let probe = ProbeKind::from(args.probe);

    println!(
        "Creating HashTable ({:?} probing, load factor {:.2}) with target capacity: {}",
        probe,
        probe.load_factor().as_f64(),
        args.target_capacity
    );

    let mut table: HashTable<u64, u64, RandomState, DefaultEq, ProbeKind> =
        HashTable::with_capacity_and_strategies(
            args.target_capacity,
            RandomState::new(),
            DefaultEq,
            probe,
        );

    println!(
        "Actual buckets: {}, threshold: {}",
        table.buckets(),
        table.threshold()
    );
    println!("Filling table with u64 values...");

    // Every churn step uses at most one more bucket, so filling to the headroom
    // first keeps the table below its threshold. A set at the threshold grows
    // first and purges every tombstone.
    let limit = table.threshold().saturating_sub(1);
    let churned = (limit * args.churn.min(100) as usize / 100).min(limit / 2);
    let num_values = limit - churned;
    for i in 0..num_values {
        let value = i as u64;
        let (_, outcome) = table.set(value, value);
        if outcome == InsertOutcome::AlreadyExists {
            panic!("Value already exists in table: {}", value);
        }
    }

    let buckets = table.buckets();
    let mut next = num_values as u64;
    let mut reused = 0;
    for i in 0..churned {
        table.remove(&(i as u64));
        let (_, outcome) = table.set(next, next);
        next += 1;
        if outcome == InsertOutcome::ReusedTombstone {
            reused += 1;
        }
    }

    while table.used() < limit {
        table.set(next, next);
        next += 1;
    }
    assert_eq!(table.buckets(), buckets, "filling must not grow the table");

    println!("Inserted {} values into table", table.len());
    println!(
        "Final load factor: {:.2}%",
        (table.used() as f64 / table.buckets() as f64) * 100.0
    );
    if churned > 0 {
        println!(
            "Churned {} entries, {} landed on tombstones ({:.02}%)",
            churned,
            reused,
            reused as f64 / churned as f64 * 100.0
        );
    }

    table.probe_histogram().print();
    table.stats().print();
}
