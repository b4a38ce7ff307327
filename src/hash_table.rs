use alloc::vec::Vec;
use core::fmt::Debug;
use core::hash::Hash;
use core::mem::MaybeUninit;

use log::debug;
use log::trace;

use crate::error::CapacityError;
use crate::hasher::BuildIdentityHasher;
use crate::hasher::DefaultEq;
use crate::hasher::HashStrategy;
use crate::hasher::KeyEq;
use crate::probe::DefaultProbe;
use crate::probe::LoadFactor;
use crate::probe::Probe;
use crate::probe::ProbeSeq;
use crate::tags::Tags;

/// Bucket count of the first allocation.
pub const MIN_BUCKETS: usize = 2;

/// Smallest power of two, at least [`MIN_BUCKETS`], whose threshold under
/// `load_factor` is strictly greater than `entries`.
fn buckets_for(entries: usize, load_factor: LoadFactor) -> Option<usize> {
    let mut buckets = MIN_BUCKETS;
    while load_factor.threshold(buckets) <= entries {
        buckets = buckets.checked_mul(2)?;
    }
    Some(buckets)
}

/// What [`HashTable::set`] did with the key it was given.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum InsertOutcome {
    /// The key was written to a bucket that had never been used.
    New,
    /// The key was written over a tombstone left by an earlier removal.
    ReusedTombstone,
    /// An equal key was already stored. Nothing was written; the returned index
    /// points at the existing entry.
    AlreadyExists,
}

impl InsertOutcome {
    /// `true` unless the key was already present.
    pub fn is_inserted(self) -> bool {
        !matches!(self, InsertOutcome::AlreadyExists)
    }
}

/// Where a key lives, or where it would be written.
pub(crate) enum Slot {
    Found(usize),
    Vacant(usize),
}

/// A memory-compact open-addressing hash table.
///
/// Every bucket carries a 2-bit tag (empty, tombstone or occupied) packed 32
/// to a word next to parallel key and value arrays. Removals leave tombstones
/// that keep probe chains intact; tombstones are only dropped when the table
/// is resized. Resizing rehashes in place by swapping entries along their
/// displacement chains instead of building a second set of arrays.
///
/// The table is a set when `V = ()`; the value array is then zero-sized.
///
/// Entries are addressed by bucket index. Indices returned by [`get`] and
/// [`set`] stay valid until the table is resized, which includes a `set` that
/// has to grow it. Growth is checked before probing, so a `set` of a key that
/// is already present can still move every entry.
///
/// Type parameters:
/// - `S` hashes keys, see [`HashStrategy`]. Defaults to the identity hash.
/// - `E` compares keys, see [`KeyEq`].
/// - `P` picks the probe step and load factor, see [`Probe`].
///
/// [`get`]: HashTable::get
/// [`set`]: HashTable::set
///
/// # Examples
///
/// ```rust
/// use packed_hash::HashTable;
/// use packed_hash::InsertOutcome;
///
/// let mut table: HashTable<u64, &str> = HashTable::with_capacity(8);
/// let (index, outcome) = table.set(7, "seven");
/// assert_eq!(outcome, InsertOutcome::New);
/// assert_eq!(table.get(&7), Some(index));
/// assert_eq!(table.value(index), Some(&"seven"));
///
/// // Keys are never replaced.
/// let (again, outcome) = table.set(7, "SEVEN");
/// assert_eq!((again, outcome), (index, InsertOutcome::AlreadyExists));
/// assert_eq!(table.value(index), Some(&"seven"));
/// ```
pub struct HashTable<K, V = (), S = BuildIdentityHasher, E = DefaultEq, P = DefaultProbe> {
    tags: Tags,
    keys: Vec<MaybeUninit<K>>,
    vals: Vec<MaybeUninit<V>>,

    buckets: usize,
    live: usize,
    used: usize,
    threshold: usize,

    hasher: S,
    eq: E,
    probe: P,
}

impl<K, V, S, E, P> Debug for HashTable<K, V, S, E, P>
where
    K: Debug,
    V: Debug,
{
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        struct Entries<'a, K, V>(Iter<'a, K, V>);

        impl<K: Debug, V: Debug> Debug for Entries<'_, K, V> {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                f.debug_map().entries(self.0.clone()).finish()
            }
        }

        f.debug_struct("HashTable")
            .field("buckets", &self.buckets)
            .field("live", &self.live)
            .field("used", &self.used)
            .field("threshold", &self.threshold)
            .field("entries", &Entries(self.iter()))
            .finish()
    }
}

impl<K, V, S, E, P> Clone for HashTable<K, V, S, E, P>
where
    K: Clone,
    V: Clone,
    S: Clone,
    E: Clone,
    P: Clone,
{
    fn clone(&self) -> Self {
        let mut keys = Vec::with_capacity(self.buckets);
        keys.resize_with(self.buckets, MaybeUninit::uninit);
        let mut vals = Vec::with_capacity(self.buckets);
        vals.resize_with(self.buckets, MaybeUninit::uninit);

        for index in self.indices() {
            // SAFETY: `indices` only yields occupied buckets, whose key and value
            // are initialized.
            unsafe {
                keys[index] = MaybeUninit::new(self.keys[index].assume_init_ref().clone());
                vals[index] = MaybeUninit::new(self.vals[index].assume_init_ref().clone());
            }
        }

        Self {
            tags: self.tags.clone(),
            keys,
            vals,
            buckets: self.buckets,
            live: self.live,
            used: self.used,
            threshold: self.threshold,
            hasher: self.hasher.clone(),
            eq: self.eq.clone(),
            probe: self.probe.clone(),
        }
    }
}

impl<K, V, S, E, P> Drop for HashTable<K, V, S, E, P> {
    fn drop(&mut self) {
        self.drop_entries();
    }
}

impl<K, V, S, E, P> Default for HashTable<K, V, S, E, P>
where
    S: Default,
    E: Default,
    P: Default,
{
    fn default() -> Self {
        Self::with_strategies(S::default(), E::default(), P::default())
    }
}

impl<K, V> HashTable<K, V> {
    /// Creates an empty table with the identity hash, `PartialEq` equality and
    /// the default probe strategy.
    ///
    /// No memory is allocated until the first insertion.
    pub fn new() -> Self {
        Self::default()
    }
}

impl<K, V> HashTable<K, V>
where
    K: Hash + PartialEq,
{
    /// Creates a table with the default strategies that can take at least
    /// `capacity` insertions before it has to grow.
    ///
    /// ```rust
    /// use packed_hash::HashTable;
    ///
    /// let mut table: HashTable<u64> = HashTable::with_capacity(100);
    /// let buckets = table.buckets();
    /// for i in 0..100 {
    ///     table.set(i, ());
    /// }
    /// assert_eq!(table.buckets(), buckets);
    /// ```
    ///
    /// # Panics
    ///
    /// Panics if the bucket count overflows `usize` or the allocation fails.
    pub fn with_capacity(capacity: usize) -> Self {
        Self::with_capacity_and_strategies(
            capacity,
            BuildIdentityHasher::default(),
            DefaultEq,
            DefaultProbe::default(),
        )
    }
}

impl<K, V, P> HashTable<K, V, BuildIdentityHasher, DefaultEq, P> {
    /// Creates an empty table probing with `probe`.
    ///
    /// ```rust
    /// use packed_hash::HashTable;
    /// use packed_hash::probe::LoadFactor;
    /// use packed_hash::probe::Tiered;
    ///
    /// let table: HashTable<u32, (), _, _, _> = HashTable::with_probe(Tiered);
    /// assert_eq!(table.load_factor(), LoadFactor::FOUR_FIFTHS);
    /// ```
    pub fn with_probe(probe: P) -> Self {
        Self::with_strategies(BuildIdentityHasher::default(), DefaultEq, probe)
    }
}

impl<K, V, S, E, P> HashTable<K, V, S, E, P> {
    /// Creates an empty table from explicit hash, equality and probe
    /// strategies.
    pub fn with_strategies(hasher: S, eq: E, probe: P) -> Self {
        Self {
            tags: Tags::default(),
            keys: Vec::new(),
            vals: Vec::new(),
            buckets: 0,
            live: 0,
            used: 0,
            threshold: 0,
            hasher,
            eq,
            probe,
        }
    }

    /// Number of entries stored.
    pub fn len(&self) -> usize {
        self.live
    }

    /// Returns `true` if the table stores no entries.
    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// Number of buckets. Zero or a power of two.
    pub fn buckets(&self) -> usize {
        self.buckets
    }

    /// Buckets that are occupied or hold a tombstone.
    pub fn used(&self) -> usize {
        self.used
    }

    /// Value of [`used`](Self::used) at which the next insertion grows the
    /// table.
    pub fn threshold(&self) -> usize {
        self.threshold
    }

    /// The hash strategy.
    pub fn hasher(&self) -> &S {
        &self.hasher
    }

    /// The probe strategy.
    pub fn probe(&self) -> &P {
        &self.probe
    }

    /// Returns `true` if bucket `index` holds an entry. Out-of-range indices
    /// are never occupied.
    #[inline]
    pub fn exists(&self, index: usize) -> bool {
        index < self.buckets && self.tags.is_occupied(index)
    }

    /// The key stored at `index`, if the bucket is occupied.
    #[inline]
    pub fn key(&self, index: usize) -> Option<&K> {
        if !self.exists(index) {
            return None;
        }
        // SAFETY: occupied buckets hold an initialized key.
        Some(unsafe { self.keys[index].assume_init_ref() })
    }

    /// The value stored at `index`, if the bucket is occupied.
    #[inline]
    pub fn value(&self, index: usize) -> Option<&V> {
        if !self.exists(index) {
            return None;
        }
        // SAFETY: occupied buckets hold an initialized value.
        Some(unsafe { self.vals[index].assume_init_ref() })
    }

    /// Mutable access to the value stored at `index`, if the bucket is
    /// occupied.
    ///
    /// This is how a caller overwrites the value of a key that
    /// [`set`](Self::set) reported as already present.
    #[inline]
    pub fn value_mut(&mut self, index: usize) -> Option<&mut V> {
        if !self.exists(index) {
            return None;
        }
        // SAFETY: occupied buckets hold an initialized value.
        Some(unsafe { self.vals[index].assume_init_mut() })
    }

    /// The key and value stored at `index`, if the bucket is occupied.
    pub fn entry_at(&self, index: usize) -> Option<(&K, &V)> {
        if !self.exists(index) {
            return None;
        }
        // SAFETY: occupied buckets hold an initialized key and value.
        unsafe {
            Some((
                self.keys[index].assume_init_ref(),
                self.vals[index].assume_init_ref(),
            ))
        }
    }

    /// Removes the entry at `index`, leaving a tombstone behind.
    ///
    /// Does nothing and returns `None` when `index` is out of range or the
    /// bucket is empty or already deleted. The tombstone still counts toward
    /// [`used`](Self::used) until the next resize.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use packed_hash::HashTable;
    ///
    /// let mut table: HashTable<u64, char> = HashTable::new();
    /// let (index, _) = table.set(1, 'a');
    /// assert_eq!(table.del(index), Some((1, 'a')));
    /// assert_eq!(table.del(index), None);
    /// assert_eq!(table.del(usize::MAX), None);
    /// assert_eq!(table.get(&1), None);
    /// ```
    pub fn del(&mut self, index: usize) -> Option<(K, V)> {
        if !self.exists(index) {
            return None;
        }

        self.tags.set_deleted(index);
        self.live -= 1;

        // SAFETY: the bucket was occupied, so key and value are initialized. It is
        // now a tombstone, so neither slot is read or dropped again before it is
        // overwritten.
        unsafe {
            Some((
                self.keys[index].assume_init_read(),
                self.vals[index].assume_init_read(),
            ))
        }
    }

    /// Key and value of an occupied bucket.
    ///
    /// # Panics
    ///
    /// Panics if the bucket is not occupied.
    pub(crate) fn occupied(&self, index: usize) -> (&K, &V) {
        assert!(self.exists(index), "bucket {index} is not occupied");
        // SAFETY: checked above.
        unsafe {
            (
                self.keys[index].assume_init_ref(),
                self.vals[index].assume_init_ref(),
            )
        }
    }

    /// Key and mutable value of an occupied bucket.
    ///
    /// # Panics
    ///
    /// Panics if the bucket is not occupied.
    pub(crate) fn occupied_mut(&mut self, index: usize) -> (&K, &mut V) {
        assert!(self.exists(index), "bucket {index} is not occupied");
        // SAFETY: checked above.
        unsafe {
            (
                self.keys[index].assume_init_ref(),
                self.vals[index].assume_init_mut(),
            )
        }
    }

    /// Writes a new entry into a bucket returned as [`Slot::Vacant`].
    pub(crate) fn fill(&mut self, index: usize, key: K, value: V) -> InsertOutcome {
        debug_assert!(self.tags.is_either(index));

        let outcome = if self.tags.is_empty(index) {
            self.used += 1;
            InsertOutcome::New
        } else {
            InsertOutcome::ReusedTombstone
        };

        self.keys[index] = MaybeUninit::new(key);
        self.vals[index] = MaybeUninit::new(value);
        self.tags.set_occupied(index);
        self.live += 1;

        outcome
    }

    /// Removes every entry for which `keep` returns `false`.
    ///
    /// ```rust
    /// use packed_hash::HashTable;
    ///
    /// let mut table: HashTable<u64, u64> = HashTable::new();
    /// for i in 0..8 {
    ///     table.set(i, i);
    /// }
    /// table.retain(|_, value| {
    ///     *value *= 10;
    ///     *value < 40
    /// });
    /// assert_eq!(table.len(), 4);
    /// assert_eq!(table.value(table.get(&3).unwrap()), Some(&30));
    /// ```
    pub fn retain<F>(&mut self, mut keep: F)
    where
        F: FnMut(&K, &mut V) -> bool,
    {
        for index in 0..self.buckets {
            if !self.tags.is_occupied(index) {
                continue;
            }

            // SAFETY: occupied buckets hold an initialized key and value.
            let (key, value) = unsafe {
                (
                    self.keys[index].assume_init_ref(),
                    self.vals[index].assume_init_mut(),
                )
            };
            if !keep(key, value) {
                drop(self.del(index));
            }
        }
    }

    /// Removes every entry, keeping the allocated buckets.
    ///
    /// Tombstones are cleared along with the entries.
    pub fn clear(&mut self) {
        self.drop_entries();
        self.tags.fill_empty();
        self.live = 0;
        self.used = 0;
    }

    fn drop_entries(&mut self) {
        if !(core::mem::needs_drop::<K>() || core::mem::needs_drop::<V>()) || self.live == 0 {
            return;
        }

        for index in 0..self.buckets {
            if self.tags.is_occupied(index) {
                // SAFETY: occupied buckets hold an initialized key and value. Callers
                // reset or discard the tags afterwards, so these are never dropped
                // twice.
                unsafe {
                    self.keys[index].assume_init_drop();
                    self.vals[index].assume_init_drop();
                }
            }
        }
    }

    /// Indices of the occupied buckets, in bucket order.
    ///
    /// ```rust
    /// use packed_hash::HashTable;
    ///
    /// let mut table: HashTable<u64> = HashTable::new();
    /// table.set(3, ());
    /// table.set(5, ());
    /// for index in table.indices() {
    ///     assert!(table.exists(index));
    /// }
    /// assert_eq!(table.indices().count(), 2);
    /// ```
    pub fn indices(&self) -> Indices<'_> {
        Indices {
            tags: &self.tags,
            index: 0,
            end: self.buckets,
        }
    }

    /// Iterates over `(key, value)` pairs in bucket order.
    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter {
            tags: &self.tags,
            keys: &self.keys[..self.buckets],
            vals: &self.vals[..self.buckets],
            index: 0,
            remaining: self.live,
        }
    }

    /// Iterates over `(key, value)` pairs in bucket order, with mutable
    /// values.
    pub fn iter_mut(&mut self) -> IterMut<'_, K, V> {
        IterMut {
            tags: &self.tags,
            keys: &self.keys[..self.buckets],
            vals: self.vals[..self.buckets].iter_mut().enumerate(),
            remaining: self.live,
        }
    }

    /// Removes and yields every entry. The buckets stay allocated.
    ///
    /// Entries not consumed before the iterator is dropped are dropped with
    /// it.
    pub fn drain(&mut self) -> Drain<'_, K, V, S, E, P> {
        Drain {
            table: self,
            index: 0,
        }
    }
}

impl<K, V, S, E, P> HashTable<K, V, S, E, P>
where
    S: HashStrategy<K>,
    E: KeyEq<K>,
    P: Probe,
{
    /// Creates a table that can take at least `capacity` insertions before it
    /// has to grow.
    ///
    /// # Panics
    ///
    /// Panics if the bucket count overflows `usize` or the allocation fails.
    pub fn with_capacity_and_strategies(capacity: usize, hasher: S, eq: E, probe: P) -> Self {
        let mut table = Self::with_strategies(hasher, eq, probe);
        if capacity > 0 {
            if let Err(err) = table.try_reserve(capacity) {
                panic!("hash table allocation failed: {err}");
            }
        }
        table
    }

    /// Load factor imposed by the probe strategy.
    pub fn load_factor(&self) -> LoadFactor {
        self.probe.load_factor()
    }

    /// Finds the bucket holding `key`.
    ///
    /// Walks the probe sequence from the key's home bucket and stops at the
    /// first empty bucket. Tombstones are skipped. At most one full pass over
    /// the buckets is made, so a table saturated with tombstones still
    /// answers.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use packed_hash::HashTable;
    ///
    /// let mut table: HashTable<u64, u64> = HashTable::new();
    /// assert_eq!(table.get(&1), None);
    ///
    /// let (index, _) = table.set(1, 10);
    /// assert_eq!(table.get(&1), Some(index));
    /// assert_eq!(table.get(&2), None);
    /// ```
    pub fn get(&self, key: &K) -> Option<usize> {
        let hash = self.hasher.hash_key(key);
        for index in self.probe.sequence(hash, self.buckets) {
            if self.tags.is_empty(index) {
                return None;
            }

            // SAFETY: occupied buckets hold an initialized key.
            if self.tags.is_occupied(index)
                && self
                    .eq
                    .key_eq(unsafe { self.keys[index].assume_init_ref() }, key)
            {
                return Some(index);
            }
        }

        None
    }

    /// Returns `true` if an equal key is stored.
    pub fn contains(&self, key: &K) -> bool {
        self.get(key).is_some()
    }

    /// Inserts `key` with `value` unless an equal key is already present.
    ///
    /// Grows the table first if the used-bucket threshold has been reached.
    /// The key lands in the first tombstone on its probe path if there is one,
    /// otherwise in the empty bucket that ended the probe. An existing key is
    /// never replaced: the outcome is [`InsertOutcome::AlreadyExists`], the
    /// index is that of the stored entry, and `key` and `value` are dropped.
    ///
    /// # Panics
    ///
    /// Panics if growing the table fails. See [`try_set`](Self::try_set).
    ///
    /// # Examples
    ///
    /// ```rust
    /// use packed_hash::HashTable;
    /// use packed_hash::InsertOutcome;
    ///
    /// let mut table: HashTable<u64, &str> = HashTable::with_capacity(8);
    /// let (index, outcome) = table.set(1, "one");
    /// assert_eq!(outcome, InsertOutcome::New);
    ///
    /// table.del(index);
    /// let (_, outcome) = table.set(1, "uno");
    /// assert_eq!(outcome, InsertOutcome::ReusedTombstone);
    /// ```
    pub fn set(&mut self, key: K, value: V) -> (usize, InsertOutcome) {
        match self.try_set(key, value) {
            Ok(inserted) => inserted,
            Err(err) => panic!("hash table growth failed: {err}"),
        }
    }

    /// Like [`set`](Self::set), but reports a failed growth instead of
    /// panicking. The table is unchanged on error.
    pub fn try_set(&mut self, key: K, value: V) -> Result<(usize, InsertOutcome), CapacityError> {
        Ok(match self.locate(&key)? {
            Slot::Found(index) => (index, InsertOutcome::AlreadyExists),
            Slot::Vacant(index) => (index, self.fill(index, key, value)),
        })
    }

    /// Removes the entry whose key equals `key`.
    pub fn remove(&mut self, key: &K) -> Option<(K, V)> {
        let index = self.get(key)?;
        self.del(index)
    }

    /// Grows if needed, then finds either the bucket holding `key` or the
    /// bucket a new entry for it belongs in.
    pub(crate) fn locate(&mut self, key: &K) -> Result<Slot, CapacityError> {
        if self.used >= self.threshold {
            self.grow()?;
        }

        let hash = self.hasher.hash_key(key);
        let mut site = None;
        for index in self.probe.sequence(hash, self.buckets) {
            if self.tags.is_empty(index) {
                return Ok(Slot::Vacant(site.unwrap_or(index)));
            }

            if self.tags.is_deleted(index) {
                if site.is_none() {
                    site = Some(index);
                }
                continue;
            }

            // SAFETY: neither empty nor deleted, so the bucket is occupied and its
            // key is initialized.
            if self
                .eq
                .key_eq(unsafe { self.keys[index].assume_init_ref() }, key)
            {
                return Ok(Slot::Found(index));
            }
        }

        // A full cycle without an empty bucket means every bucket is used, but
        // `used < threshold <= buckets` after the growth check above.
        match site {
            Some(index) => Ok(Slot::Vacant(index)),
            None => unreachable!("probe cycle found no free bucket below the threshold"),
        }
    }

    #[cold]
    fn grow(&mut self) -> Result<(), CapacityError> {
        let mut buckets = if self.buckets == 0 {
            MIN_BUCKETS
        } else {
            self.buckets
                .checked_mul(2)
                .ok_or(CapacityError::Overflow {
                    buckets: self.buckets,
                })?
        };

        let load_factor = self.probe.load_factor();
        while load_factor.threshold(buckets) <= self.live {
            buckets = buckets
                .checked_mul(2)
                .ok_or(CapacityError::Overflow { buckets })?;
        }

        self.resize(buckets)
    }

    /// Rehashes every entry into `buckets` buckets.
    ///
    /// `buckets` must be a power of two large enough that the live entries stay
    /// below the load-factor threshold. Growing, shrinking and resizing to the
    /// current bucket count (which only purges tombstones) are all allowed.
    /// Tombstones are dropped and bucket indices change.
    ///
    /// Entries are moved in place: each one is carried to its bucket in the
    /// new layout, and if that bucket still holds an entry that has not been
    /// moved yet, the two are swapped and the evicted entry is carried on. No
    /// second key or value array is allocated; only the tag words and a hash and
    /// step per old bucket are. Every hash is computed before the first entry
    /// moves, so a panicking hasher leaves the table unchanged.
    ///
    /// # Errors
    ///
    /// Fails without touching the table if `buckets` is not a power of two, is
    /// too small for the live entries, or the storage cannot be allocated.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use packed_hash::CapacityError;
    /// use packed_hash::HashTable;
    /// use packed_hash::Linear;
    ///
    /// let mut table: HashTable<u64, u64, _, _, Linear> = HashTable::with_probe(Linear);
    /// for i in 0..10 {
    ///     table.set(i, i * i);
    /// }
    ///
    /// table.resize(256).unwrap();
    /// assert_eq!(table.buckets(), 256);
    ///
    /// assert!(matches!(table.resize(16), Err(CapacityError::Infeasible { .. })));
    /// assert!(matches!(table.resize(100), Err(CapacityError::NotPowerOfTwo { .. })));
    ///
    /// table.resize(32).unwrap();
    /// let index = table.get(&9).unwrap();
    /// assert_eq!(table.value(index), Some(&81));
    /// ```
    pub fn resize(&mut self, buckets: usize) -> Result<(), CapacityError> {
        if !buckets.is_power_of_two() {
            return Err(CapacityError::NotPowerOfTwo { buckets });
        }

        let threshold = self.probe.load_factor().threshold(buckets);
        if self.live >= threshold {
            trace!(
                "refusing resize to {buckets} buckets: {} live, threshold {threshold}",
                self.live
            );
            return Err(CapacityError::Infeasible {
                live: self.live,
                buckets,
                threshold,
            });
        }

        let old = self.buckets;
        let alloc_failed = |_| CapacityError::AllocFailed { buckets };
        let mut tags = Tags::try_with_buckets(buckets).map_err(alloc_failed)?;
        let mut paths: Vec<(u64, usize)> = Vec::new();
        paths.try_reserve_exact(old).map_err(alloc_failed)?;
        if buckets > old {
            self.keys
                .try_reserve_exact(buckets - old)
                .map_err(alloc_failed)?;
            self.vals
                .try_reserve_exact(buckets - old)
                .map_err(alloc_failed)?;
        }

        // Hashing and stepping run caller code, so both happen before anything
        // moves. A panic here leaves the table as it was.
        paths.extend((0..old).map(|index| {
            if !self.tags.is_occupied(index) {
                return (0, 0);
            }
            // SAFETY: occupied buckets hold an initialized key.
            let hash = self
                .hasher
                .hash_key(unsafe { self.keys[index].assume_init_ref() });
            (hash, self.probe.step(hash))
        }));

        if buckets > old {
            self.keys.resize_with(buckets, MaybeUninit::uninit);
            self.vals.resize_with(buckets, MaybeUninit::uninit);
        }

        // SAFETY: an entry is only moved out of a bucket that is occupied under the
        // old tags, and that bucket is marked deleted in the same step, so every
        // entry is read exactly once. It is written either into a bucket that is
        // not occupied under the old tags (a tombstone, never used, or beyond the
        // old bounds) or swapped with an occupied one, whose entry is then carried.
        for start in 0..old {
            if !self.tags.is_occupied(start) {
                continue;
            }

            let mut key = core::mem::replace(&mut self.keys[start], MaybeUninit::uninit());
            let mut value = core::mem::replace(&mut self.vals[start], MaybeUninit::uninit());
            let (mut hash, mut step) = paths[start];
            self.tags.set_deleted(start);

            loop {
                let target = claim(&mut tags, hash, step, buckets);

                if target < old && self.tags.is_occupied(target) {
                    core::mem::swap(&mut self.keys[target], &mut key);
                    core::mem::swap(&mut self.vals[target], &mut value);
                    (hash, step) = paths[target];
                    self.tags.set_deleted(target);
                } else {
                    self.keys[target] = key;
                    self.vals[target] = value;
                    break;
                }
            }
        }

        if buckets < old {
            self.keys.truncate(buckets);
            self.keys.shrink_to_fit();
            self.vals.truncate(buckets);
            self.vals.shrink_to_fit();
        }

        debug!(
            "resized hash table from {old} to {buckets} buckets ({} live, {} tombstones dropped)",
            self.live,
            self.used - self.live
        );

        self.tags = tags;
        self.buckets = buckets;
        self.used = self.live;
        self.threshold = threshold;

        Ok(())
    }

    /// Makes room for at least `additional` more insertions without growing.
    ///
    /// Resizes (dropping tombstones) only if the insertions would otherwise
    /// cross the threshold.
    ///
    /// # Panics
    ///
    /// Panics if the bucket count overflows `usize` or the allocation fails.
    pub fn reserve(&mut self, additional: usize) {
        if let Err(err) = self.try_reserve(additional) {
            panic!("hash table allocation failed: {err}");
        }
    }

    /// Like [`reserve`](Self::reserve), but reports failure. The table is
    /// unchanged on error.
    pub fn try_reserve(&mut self, additional: usize) -> Result<(), CapacityError> {
        let overflow = CapacityError::Overflow {
            buckets: self.buckets,
        };
        let required = self.used.checked_add(additional).ok_or(overflow.clone())?;
        if required <= self.threshold {
            return Ok(());
        }

        let live = self.live.checked_add(additional).ok_or(overflow.clone())?;
        // `buckets_for` keeps the threshold strictly above `live`, so `live`
        // insertions leave `used` at most at the threshold.
        let buckets = buckets_for(live.saturating_sub(1), self.probe.load_factor())
            .ok_or(overflow)?
            .max(self.buckets);
        self.resize(buckets)
    }

    /// Shrinks the table to the smallest bucket count that holds its entries.
    ///
    /// An empty table releases all of its storage and goes back to zero
    /// buckets.
    pub fn shrink_to_fit(&mut self) {
        if self.live == 0 {
            self.tags = Tags::default();
            self.keys = Vec::new();
            self.vals = Vec::new();
            self.buckets = 0;
            self.used = 0;
            self.threshold = 0;
            return;
        }

        let Some(buckets) = buckets_for(self.live, self.probe.load_factor()) else {
            return;
        };
        if buckets < self.buckets {
            if let Err(err) = self.resize(buckets) {
                trace!("shrink_to_fit skipped: {err}");
            }
        }
    }
}

/// Claims the first unclaimed bucket on `hash`'s probe path in the tags being
/// built by a resize.
#[inline]
fn claim(tags: &mut Tags, hash: u64, step: usize, buckets: usize) -> usize {
    for index in ProbeSeq::new(hash, step, buckets) {
        if tags.is_empty(index) {
            tags.set_occupied(index);
            return index;
        }
    }

    unreachable!("resize target has fewer buckets than live entries")
}

/// Iterator over the occupied bucket indices of a [`HashTable`].
#[derive(Clone)]
pub struct Indices<'a> {
    tags: &'a Tags,
    index: usize,
    end: usize,
}

impl Iterator for Indices<'_> {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        while self.index < self.end {
            let index = self.index;
            self.index += 1;
            if self.tags.is_occupied(index) {
                return Some(index);
            }
        }
        None
    }
}

/// Iterator over the entries of a [`HashTable`], created by
/// [`HashTable::iter`].
pub struct Iter<'a, K, V> {
    tags: &'a Tags,
    keys: &'a [MaybeUninit<K>],
    vals: &'a [MaybeUninit<V>],
    index: usize,
    remaining: usize,
}

impl<K, V> Clone for Iter<'_, K, V> {
    fn clone(&self) -> Self {
        Self {
            tags: self.tags,
            keys: self.keys,
            vals: self.vals,
            index: self.index,
            remaining: self.remaining,
        }
    }
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        while self.remaining > 0 && self.index < self.keys.len() {
            let index = self.index;
            self.index += 1;
            if self.tags.is_occupied(index) {
                self.remaining -= 1;
                // SAFETY: occupied buckets hold an initialized key and value.
                unsafe {
                    return Some((
                        self.keys[index].assume_init_ref(),
                        self.vals[index].assume_init_ref(),
                    ));
                }
            }
        }
        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<K, V> ExactSizeIterator for Iter<'_, K, V> {}

/// Mutable iterator over the entries of a [`HashTable`], created by
/// [`HashTable::iter_mut`].
pub struct IterMut<'a, K, V> {
    tags: &'a Tags,
    keys: &'a [MaybeUninit<K>],
    vals: core::iter::Enumerate<core::slice::IterMut<'a, MaybeUninit<V>>>,
    remaining: usize,
}

impl<'a, K, V> Iterator for IterMut<'a, K, V> {
    type Item = (&'a K, &'a mut V);

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }

        for (index, value) in self.vals.by_ref() {
            if self.tags.is_occupied(index) {
                self.remaining -= 1;
                // SAFETY: occupied buckets hold an initialized key and value.
                unsafe {
                    return Some((self.keys[index].assume_init_ref(), value.assume_init_mut()));
                }
            }
        }
        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<K, V> ExactSizeIterator for IterMut<'_, K, V> {}

/// Draining iterator over the entries of a [`HashTable`], created by
/// [`HashTable::drain`].
pub struct Drain<'a, K, V, S = BuildIdentityHasher, E = DefaultEq, P = DefaultProbe> {
    table: &'a mut HashTable<K, V, S, E, P>,
    index: usize,
}

impl<K, V, S, E, P> Iterator for Drain<'_, K, V, S, E, P> {
    type Item = (K, V);

    fn next(&mut self) -> Option<(K, V)> {
        while self.table.live > 0 && self.index < self.table.buckets {
            let index = self.index;
            self.index += 1;
            if let Some(entry) = self.table.del(index) {
                return Some(entry);
            }
        }
        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.table.live, Some(self.table.live))
    }
}

impl<K, V, S, E, P> ExactSizeIterator for Drain<'_, K, V, S, E, P> {}

impl<K, V, S, E, P> Drop for Drain<'_, K, V, S, E, P> {
    fn drop(&mut self) {
        for _ in &mut *self {}
        self.table.tags.fill_empty();
        self.table.used = 0;
    }
}

/// Distribution of probe lengths over the live entries of a table.
///
/// `counts()[d]` is the number of entries found `d` steps past their home
/// bucket.
#[cfg(any(test, feature = "stats"))]
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ProbeHistogram {
    counts: Vec<usize>,
}

#[cfg(any(test, feature = "stats"))]
impl ProbeHistogram {
    /// Entry counts per probe length.
    pub fn counts(&self) -> &[usize] {
        &self.counts
    }

    /// Longest probe length of any entry.
    pub fn max(&self) -> usize {
        self.counts.len().saturating_sub(1)
    }

    /// Average probe length.
    pub fn mean(&self) -> f64 {
        let total: usize = self.counts.iter().sum();
        if total == 0 {
            return 0.0;
        }
        let weighted: usize = self.counts.iter().enumerate().map(|(d, c)| d * c).sum();
        weighted as f64 / total as f64
    }

    /// Pretty-prints the histogram as a horizontal bar chart on stdout.
    #[cfg(feature = "std")]
    pub fn print(&self) {
        let max = self.counts.iter().copied().max().unwrap_or(0);
        if max == 0 {
            println!("probe histogram: empty");
            return;
        }

        let width = 60usize;
        println!("probe histogram (mean {:.2}):", self.mean());
        for (distance, &count) in self.counts.iter().enumerate() {
            let bar = "█".repeat((count * width).div_ceil(max));
            println!("{distance:>3} | {bar} ({count})");
        }
    }
}

/// A snapshot of a table's occupancy and memory use.
#[cfg(any(test, feature = "stats"))]
#[derive(Clone, Debug)]
pub struct TableStats {
    /// Entries stored.
    pub live: usize,
    /// Occupied buckets plus tombstones.
    pub used: usize,
    /// Tombstones awaiting the next resize.
    pub tombstones: usize,
    /// Total buckets.
    pub buckets: usize,
    /// Used-bucket limit before growth.
    pub threshold: usize,
    /// `used / buckets`.
    pub load: f64,
    /// Bytes held by the packed tags.
    pub tag_bytes: usize,
    /// Bytes held by the key array.
    pub key_bytes: usize,
    /// Bytes held by the value array.
    pub value_bytes: usize,
}

#[cfg(any(test, feature = "stats"))]
impl TableStats {
    /// Pretty-print the statistics.
    #[cfg(feature = "std")]
    pub fn print(&self) {
        println!("=== Hash Table Statistics ===");
        println!(
            "Entries: {} live, {} tombstones, {}/{} buckets used ({:.2}% load, threshold {})",
            self.live,
            self.tombstones,
            self.used,
            self.buckets,
            self.load * 100.0,
            self.threshold
        );
        println!(
            "Memory: {} bytes tags, {} bytes keys, {} bytes values",
            self.tag_bytes, self.key_bytes, self.value_bytes
        );
    }
}

#[cfg(any(test, feature = "stats"))]
impl<K, V, S, E, P> HashTable<K, V, S, E, P>
where
    S: HashStrategy<K>,
    E: KeyEq<K>,
    P: Probe,
{
    /// Computes how far each live entry sits from its home bucket along its
    /// probe sequence.
    pub fn probe_histogram(&self) -> ProbeHistogram {
        let mut counts = Vec::new();
        for (key, _) in self.iter() {
            let hash = self.hasher.hash_key(key);
            let Some(target) = self.get(key) else {
                continue;
            };
            let distance = self
                .probe
                .sequence(hash, self.buckets)
                .position(|index| index == target)
                .unwrap_or(0);
            if counts.len() <= distance {
                counts.resize(distance + 1, 0);
            }
            counts[distance] += 1;
        }
        ProbeHistogram { counts }
    }

    /// Returns occupancy and memory statistics.
    pub fn stats(&self) -> TableStats {
        TableStats {
            live: self.live,
            used: self.used,
            tombstones: self.used - self.live,
            buckets: self.buckets,
            threshold: self.threshold,
            load: if self.buckets == 0 {
                0.0
            } else {
                self.used as f64 / self.buckets as f64
            },
            tag_bytes: self.tags.bytes(),
            key_bytes: self.keys.capacity() * core::mem::size_of::<K>(),
            value_bytes: self.vals.capacity() * core::mem::size_of::<V>(),
        }
    }
}
