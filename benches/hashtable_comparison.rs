use core::hash::BuildHasher;
use core::hash::Hash;
use core::hint::black_box;

use criterion::AxisScale;
use criterion::BatchSize;
use criterion::Criterion;
use criterion::PlotConfiguration;
use criterion::Throughput;
use criterion::criterion_group;
use criterion::criterion_main;
use packed_hash::HashMap as PackedHashMap;
use packed_hash::Linear;
use packed_hash::Tiered;
use packed_hash::probe::Probe;
use rand::Rng;
use rand::SeedableRng;
use rand::TryRngCore;
use rand::distr;
use rand::rngs::OsRng;
use rand::rngs::SmallRng;
use rand::seq::SliceRandom;
use rand_distr::Zipf;
use siphasher::sip::SipHasher;

#[derive(Clone)]
struct SipHashBuilder {
    k1: u64,
    k2: u64,
}

impl BuildHasher for SipHashBuilder {
    type Hasher = SipHasher;

    fn build_hasher(&self) -> Self::Hasher {
        SipHasher::new_with_keys(self.k1, self.k2)
    }
}

impl Default for SipHashBuilder {
    fn default() -> Self {
        let mut rng = OsRng;
        Self {
            k1: rng.try_next_u64().unwrap(),
            k2: rng.try_next_u64().unwrap(),
        }
    }
}

trait BenchKey: Hash + Eq + Clone {
    fn new(key: u64) -> Self;
}

#[derive(Clone, PartialEq, Eq, Hash)]
struct SmallKey(u64);

impl BenchKey for SmallKey {
    fn new(key: u64) -> Self {
        black_box(Self(key))
    }
}

#[derive(Clone, PartialEq, Eq, Hash)]
struct StringKey(String);

impl BenchKey for StringKey {
    fn new(key: u64) -> Self {
        black_box(Self(format!("key_{:016X}", key)))
    }
}

/// The operations every compared map supports.
trait BenchMap<K> {
    fn with_capacity(capacity: usize) -> Self;
    fn insert(&mut self, key: K, value: u64);
    fn find(&self, key: &K) -> Option<&u64>;
    fn remove(&mut self, key: &K) -> Option<u64>;
    fn capacity(&self) -> usize;
}

impl<K: BenchKey, P: Probe + Default> BenchMap<K> for PackedHashMap<K, u64, SipHashBuilder, P> {
    fn with_capacity(capacity: usize) -> Self {
        let mut map = PackedHashMap::with_hasher_and_probe(SipHashBuilder::default(), P::default());
        map.reserve(capacity);
        map
    }

    fn insert(&mut self, key: K, value: u64) {
        black_box(PackedHashMap::insert(self, key, value));
    }

    fn find(&self, key: &K) -> Option<&u64> {
        self.get(key)
    }

    fn remove(&mut self, key: &K) -> Option<u64> {
        PackedHashMap::remove(self, key)
    }

    fn capacity(&self) -> usize {
        PackedHashMap::capacity(self)
    }
}

impl<K: BenchKey> BenchMap<K> for hashbrown::HashMap<K, u64, SipHashBuilder> {
    fn with_capacity(capacity: usize) -> Self {
        hashbrown::HashMap::with_capacity_and_hasher(capacity, SipHashBuilder::default())
    }

    fn insert(&mut self, key: K, value: u64) {
        black_box(hashbrown::HashMap::insert(self, key, value));
    }

    fn find(&self, key: &K) -> Option<&u64> {
        self.get(key)
    }

    fn remove(&mut self, key: &K) -> Option<u64> {
        hashbrown::HashMap::remove(self, key)
    }

    fn capacity(&self) -> usize {
        hashbrown::HashMap::capacity(self)
    }
}

type PackedLinear<K> = PackedHashMap<K, u64, SipHashBuilder, Linear>;
type PackedTiered<K> = PackedHashMap<K, u64, SipHashBuilder, Tiered>;
type Hashbrown<K> = hashbrown::HashMap<K, u64, SipHashBuilder>;

const SIZES: &[usize] = &[
    (1 << 10),
    (1 << 12),
    (1 << 14),
    (1 << 16),
    (1 << 18),
];

fn random_keys<K: BenchKey>(count: usize) -> Vec<K> {
    let mut rng = OsRng;
    (0..count)
        .map(|_| K::new(rng.try_next_u64().unwrap()))
        .collect()
}

fn bench_insert_random_for<K: BenchKey, M: BenchMap<K>>(
    group: &mut criterion::BenchmarkGroup<'_, criterion::measurement::WallTime>,
    label: &str,
    keys: &[K],
) {
    group.throughput(Throughput::Elements(keys.len() as u64));
    group.bench_function(label, |b| {
        b.iter_batched(
            || {
                let mut keys = keys.to_vec();
                keys.shuffle(&mut SmallRng::from_os_rng());
                keys
            },
            |keys| {
                let mut map = M::with_capacity(0);
                for (i, key) in keys.into_iter().enumerate() {
                    map.insert(key, i as u64);
                }
                black_box(map)
            },
            BatchSize::SmallInput,
        )
    });
}

fn bench_insert_random<K: BenchKey, const MAX_SIZE: usize>(c: &mut Criterion) {
    let mut group = c.benchmark_group(format!(
        "insert_random_{}",
        core::any::type_name::<K>()
    ));
    group.plot_config(PlotConfiguration::default().summary_scale(AxisScale::Logarithmic));

    for size in SIZES[..=MAX_SIZE].iter() {
        let keys = random_keys::<K>(*size);
        bench_insert_random_for::<K, PackedLinear<K>>(&mut group, &format!("linear/{size}"), &keys);
        bench_insert_random_for::<K, PackedTiered<K>>(&mut group, &format!("tiered/{size}"), &keys);
        bench_insert_random_for::<K, Hashbrown<K>>(&mut group, &format!("hashbrown/{size}"), &keys);
    }

    group.finish();
}

fn bench_find_hit_miss_for<K: BenchKey, M: BenchMap<K>>(
    group: &mut criterion::BenchmarkGroup<'_, criterion::measurement::WallTime>,
    label: &str,
    present: &[K],
    probes: &[K],
) {
    let mut map = M::with_capacity(present.len());
    for (i, key) in present.iter().cloned().enumerate() {
        map.insert(key, i as u64);
    }

    group.throughput(Throughput::Elements(probes.len() as u64));
    group.bench_function(label, |b| {
        b.iter(|| {
            let mut found = 0u64;
            for key in probes {
                if let Some(value) = map.find(key) {
                    found = found.wrapping_add(*value);
                }
            }
            black_box(found)
        })
    });
}

fn bench_find_hit_miss<K: BenchKey, const MAX_SIZE: usize>(c: &mut Criterion) {
    let mut group = c.benchmark_group(format!(
        "find_hit_miss_{}",
        core::any::type_name::<K>()
    ));
    group.plot_config(PlotConfiguration::default().summary_scale(AxisScale::Logarithmic));

    for size in SIZES[..=MAX_SIZE].iter() {
        let present = random_keys::<K>(*size);
        let mut probes = random_keys::<K>(*size);
        probes.extend(present.iter().cloned());
        probes.shuffle(&mut SmallRng::from_os_rng());

        bench_find_hit_miss_for::<K, PackedLinear<K>>(
            &mut group,
            &format!("linear/{size}"),
            &present,
            &probes,
        );
        bench_find_hit_miss_for::<K, PackedTiered<K>>(
            &mut group,
            &format!("tiered/{size}"),
            &present,
            &probes,
        );
        bench_find_hit_miss_for::<K, Hashbrown<K>>(
            &mut group,
            &format!("hashbrown/{size}"),
            &present,
            &probes,
        );
    }

    group.finish();
}

#[derive(Clone, Copy)]
enum Operation {
    Insert,
    Remove,
    Find,
}

fn bench_mixed_zipf_for<K: BenchKey, M: BenchMap<K>>(
    group: &mut criterion::BenchmarkGroup<'_, criterion::measurement::WallTime>,
    label: &str,
    operations: &[(Operation, u64)],
) {
    group.throughput(Throughput::Elements(operations.len() as u64));
    group.bench_function(label, |b| {
        b.iter_batched(
            || {
                operations
                    .iter()
                    .map(|&(op, key)| (op, K::new(key)))
                    .collect::<Vec<_>>()
            },
            |operations| {
                let mut map = M::with_capacity(0);
                for (i, (operation, key)) in operations.into_iter().enumerate() {
                    match operation {
                        Operation::Insert => map.insert(key, i as u64),
                        Operation::Remove => {
                            black_box(map.remove(&key));
                        }
                        Operation::Find => {
                            black_box(map.find(&key));
                        }
                    }
                }
                black_box(map.capacity())
            },
            BatchSize::SmallInput,
        )
    });
}

fn bench_mixed_probabilistic_zipf<K: BenchKey, const MAX_SIZE: usize>(c: &mut Criterion) {
    const KEY_SPACE_MULTIPLIER: f32 = 2.0;

    for exponent in [1.0f32, 1.3] {
        let mut group = c.benchmark_group(format!(
            "mixed_probabilistic_zipf_{:.01}_{}",
            exponent,
            core::any::type_name::<K>()
        ));
        group.plot_config(PlotConfiguration::default().summary_scale(AxisScale::Logarithmic));

        for size in SIZES[..=MAX_SIZE].iter() {
            let mut rng = SmallRng::from_os_rng();
            let insert_distr = Zipf::new(*size as f32, exponent).unwrap();
            let find_remove_distr = Zipf::new(*size as f32 * KEY_SPACE_MULTIPLIER, exponent).unwrap();
            let uniform = distr::Uniform::new(0.0, 1.0).unwrap();

            let operations = (0..*size * 3)
                .map(|_| {
                    let op_choice: f64 = rng.sample(uniform);
                    if op_choice < 0.5 {
                        (Operation::Find, rng.sample(find_remove_distr) as u64)
                    } else if op_choice < 0.75 {
                        (Operation::Insert, rng.sample(insert_distr) as u64)
                    } else {
                        (Operation::Remove, rng.sample(find_remove_distr) as u64)
                    }
                })
                .collect::<Vec<_>>();

            bench_mixed_zipf_for::<K, PackedLinear<K>>(
                &mut group,
                &format!("linear/{size}"),
                &operations,
            );
            bench_mixed_zipf_for::<K, PackedTiered<K>>(
                &mut group,
                &format!("tiered/{size}"),
                &operations,
            );
            bench_mixed_zipf_for::<K, Hashbrown<K>>(
                &mut group,
                &format!("hashbrown/{size}"),
                &operations,
            );
        }

        group.finish();
    }
}

fn bench_churn_for<K: BenchKey, M: BenchMap<K>>(
    group: &mut criterion::BenchmarkGroup<'_, criterion::measurement::WallTime>,
    label: &str,
    insertions_and_removals: &[K],
) {
    group.throughput(Throughput::Elements(insertions_and_removals.len() as u64));
    group.bench_function(label, |b| {
        b.iter_batched(
            || {
                let mut keys = insertions_and_removals.to_vec();
                keys.shuffle(&mut SmallRng::from_os_rng());
                keys
            },
            |keys| {
                let mut map = M::with_capacity(0);
                for key in keys {
                    if map.remove(&key).is_none() {
                        map.insert(key, 0);
                    }
                }
                black_box(map.capacity())
            },
            BatchSize::SmallInput,
        )
    });
}

fn bench_churn<K: BenchKey, const MAX_SIZE: usize>(c: &mut Criterion) {
    let mut group = c.benchmark_group(format!("churn_{}", core::any::type_name::<K>()));
    group.plot_config(PlotConfiguration::default().summary_scale(AxisScale::Logarithmic));

    for size in SIZES[..=MAX_SIZE].iter() {
        let insertions_and_removals = (0..*size as u64)
            .flat_map(|key| [K::new(key), K::new(key)])
            .collect::<Vec<K>>();

        bench_churn_for::<K, PackedLinear<K>>(
            &mut group,
            &format!("linear/{size}"),
            &insertions_and_removals,
        );
        bench_churn_for::<K, PackedTiered<K>>(
            &mut group,
            &format!("tiered/{size}"),
            &insertions_and_removals,
        );
        bench_churn_for::<K, Hashbrown<K>>(
            &mut group,
            &format!("hashbrown/{size}"),
            &insertions_and_removals,
        );
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_insert_random::<SmallKey, 4>,
    bench_insert_random::<StringKey, 3>,
    bench_find_hit_miss::<SmallKey, 4>,
    bench_find_hit_miss::<StringKey, 3>,
    bench_mixed_probabilistic_zipf::<SmallKey, 4>,
    bench_mixed_probabilistic_zipf::<StringKey, 3>,
    bench_churn::<SmallKey, 4>,
    bench_churn::<StringKey, 3>,
);

criterion_main!(benches);
