use core::fmt::Debug;
use core::hash::BuildHasher;
use core::hash::Hash;

use crate::error::CapacityError;
use crate::hash_table;
use crate::hash_table::HashTable;
use crate::hash_table::Slot;
use crate::hasher::DefaultEq;
use crate::hasher::DefaultHashBuilder;
use crate::probe::DefaultProbe;
use crate::probe::Probe;

/// A hash map stored in a [`HashTable`].
///
/// Unlike the table, which never overwrites a stored key, [`insert`] replaces
/// the value of an existing key and hands back the old one. Keys are hashed
/// with the [`BuildHasher`] `S` and compared with `Eq`; `P` picks the probing
/// strategy.
///
/// # Performance Characteristics
///
/// - **Memory**: 2 bits of tag per bucket, plus `K` and `V` stored in separate
///   arrays. Linear probing keeps at most half of the buckets in use, tiered
///   probing four fifths.
/// - Removals leave tombstones behind until the next resize.
///
/// [`insert`]: HashMap::insert
#[derive(Clone)]
pub struct HashMap<K, V, S = DefaultHashBuilder, P = DefaultProbe> {
    table: HashTable<K, V, S, DefaultEq, P>,
}

impl<K, V, S, P> Debug for HashMap<K, V, S, P>
where
    K: Debug,
    V: Debug,
{
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<K, V, S, P> PartialEq for HashMap<K, V, S, P>
where
    K: Hash + Eq,
    V: PartialEq,
    S: BuildHasher,
    P: Probe,
{
    fn eq(&self, other: &Self) -> bool {
        if self.len() != other.len() {
            return false;
        }
        self.iter()
            .all(|(key, value)| other.get(key).is_some_and(|v| v == value))
    }
}

impl<K, V, S, P> Eq for HashMap<K, V, S, P>
where
    K: Hash + Eq,
    V: Eq,
    S: BuildHasher,
    P: Probe,
{
}

impl<K, V, S, P> Default for HashMap<K, V, S, P>
where
    S: Default,
    P: Default,
{
    fn default() -> Self {
        Self::with_hasher_and_probe(S::default(), P::default())
    }
}

impl<K, V> HashMap<K, V>
where
    K: Hash + Eq,
{
    /// Creates an empty map with the default hasher and probing strategy.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use packed_hash::HashMap;
    ///
    /// let mut map = HashMap::new();
    /// map.insert(1, "a");
    /// assert_eq!(map.get(&1), Some(&"a"));
    /// ```
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty map that holds at least `capacity` entries before
    /// growing.
    ///
    /// ```rust
    /// use packed_hash::HashMap;
    ///
    /// let map: HashMap<i32, String> = HashMap::with_capacity(100);
    /// assert!(map.capacity() >= 100);
    /// ```
    pub fn with_capacity(capacity: usize) -> Self {
        Self::with_capacity_and_hasher(capacity, DefaultHashBuilder::default())
    }
}

impl<K, V, S> HashMap<K, V, S>
where
    K: Hash + Eq,
    S: BuildHasher,
{
    /// Creates an empty map with the given hasher builder.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use core::hash::BuildHasher;
    /// # use siphasher::sip::SipHasher;
    /// #
    /// # use packed_hash::HashMap;
    /// #
    /// # struct SimpleHasher;
    /// # impl BuildHasher for SimpleHasher {
    /// #     type Hasher = SipHasher;
    /// #
    /// #     fn build_hasher(&self) -> Self::Hasher {
    /// #         SipHasher::new()
    /// #     }
    /// # }
    /// #
    /// let map: HashMap<i32, String, _> = HashMap::with_hasher(SimpleHasher);
    /// assert!(map.is_empty());
    /// ```
    pub fn with_hasher(hash_builder: S) -> Self {
        Self::with_hasher_and_probe(hash_builder, DefaultProbe::default())
    }

    /// Creates an empty map with the given hasher builder that holds at least
    /// `capacity` entries before growing.
    pub fn with_capacity_and_hasher(capacity: usize, hash_builder: S) -> Self {
        Self {
            table: HashTable::with_capacity_and_strategies(
                capacity,
                hash_builder,
                DefaultEq,
                DefaultProbe::default(),
            ),
        }
    }
}

impl<K, V, S, P> HashMap<K, V, S, P> {
    /// Creates an empty map with the given hasher builder and probing
    /// strategy.
    ///
    /// ```rust
    /// use packed_hash::HashMap;
    /// use packed_hash::hasher::DefaultHashBuilder;
    /// use packed_hash::probe::Tiered;
    ///
    /// let mut map = HashMap::with_hasher_and_probe(DefaultHashBuilder::default(), Tiered);
    /// map.insert("key", 1);
    /// assert_eq!(map.get(&"key"), Some(&1));
    /// ```
    pub fn with_hasher_and_probe(hash_builder: S, probe: P) -> Self {
        Self {
            table: HashTable::with_strategies(hash_builder, DefaultEq, probe),
        }
    }

    /// Returns the number of entries in the map.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use packed_hash::HashMap;
    ///
    /// let mut map = HashMap::new();
    /// assert_eq!(map.len(), 0);
    /// map.insert(1, "a");
    /// assert_eq!(map.len(), 1);
    /// ```
    pub fn len(&self) -> usize {
        self.table.len()
    }

    /// Returns `true` if the map contains no entries.
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Number of entries the map can hold before it grows, ignoring
    /// tombstones.
    pub fn capacity(&self) -> usize {
        self.table.threshold()
    }

    /// The map's hasher builder.
    pub fn hasher(&self) -> &S {
        self.table.hasher()
    }

    /// The map's probing strategy.
    pub fn probe(&self) -> &P {
        self.table.probe()
    }

    /// Removes every entry, keeping the allocated memory.
    pub fn clear(&mut self) {
        self.table.clear();
    }

    /// Keeps only the entries for which `f` returns `true`.
    ///
    /// ```rust
    /// use packed_hash::HashMap;
    ///
    /// let mut map: HashMap<i32, i32> = (0..8).map(|x| (x, x * 10)).collect();
    /// map.retain(|&k, _| k % 2 == 0);
    /// assert_eq!(map.len(), 4);
    /// ```
    pub fn retain<F>(&mut self, f: F)
    where
        F: FnMut(&K, &mut V) -> bool,
    {
        self.table.retain(f);
    }

    /// Returns an iterator over the key-value pairs of the map, in arbitrary
    /// order.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use packed_hash::HashMap;
    ///
    /// let mut map = HashMap::new();
    /// map.insert("a", 1);
    /// map.insert("b", 2);
    ///
    /// let total: i32 = map.iter().map(|(_, v)| v).sum();
    /// assert_eq!(total, 3);
    /// ```
    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter {
            inner: self.table.iter(),
        }
    }

    /// Returns an iterator over the key-value pairs of the map, with mutable
    /// references to the values.
    pub fn iter_mut(&mut self) -> IterMut<'_, K, V> {
        IterMut {
            inner: self.table.iter_mut(),
        }
    }

    /// Returns an iterator over the keys of the map.
    pub fn keys(&self) -> Keys<'_, K, V> {
        Keys { inner: self.iter() }
    }

    /// Returns an iterator over the values of the map.
    pub fn values(&self) -> Values<'_, K, V> {
        Values { inner: self.iter() }
    }

    /// Returns an iterator over mutable references to the values of the map.
    pub fn values_mut(&mut self) -> ValuesMut<'_, K, V> {
        ValuesMut {
            inner: self.iter_mut(),
        }
    }

    /// Clears the map, returning every key-value pair as an iterator. The
    /// allocated memory is kept.
    ///
    /// ```rust
    /// use packed_hash::HashMap;
    ///
    /// let mut map = HashMap::new();
    /// map.insert(1, "a");
    /// map.insert(2, "b");
    ///
    /// let mut drained: Vec<_> = map.drain().collect();
    /// drained.sort();
    /// assert_eq!(drained, [(1, "a"), (2, "b")]);
    /// assert!(map.is_empty());
    /// ```
    pub fn drain(&mut self) -> Drain<'_, K, V, S, P> {
        Drain {
            inner: self.table.drain(),
        }
    }
}

impl<K, V, S, P> HashMap<K, V, S, P>
where
    K: Hash + Eq,
    S: BuildHasher,
    P: Probe,
{
    fn locate(&mut self, key: &K) -> Slot {
        match self.table.locate(key) {
            Ok(slot) => slot,
            Err(err) => panic!("hash map growth failed: {err}"),
        }
    }

    /// Inserts a key-value pair.
    ///
    /// Returns the previous value if the key was present; the stored key is
    /// kept and `key` is dropped.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use packed_hash::HashMap;
    ///
    /// let mut map = HashMap::new();
    /// assert_eq!(map.insert(37, "a"), None);
    /// assert_eq!(map.insert(37, "b"), Some("a"));
    /// assert_eq!(map.get(&37), Some(&"b"));
    /// ```
    pub fn insert(&mut self, key: K, value: V) -> Option<V> {
        match self.locate(&key) {
            Slot::Found(index) => Some(core::mem::replace(
                self.table.occupied_mut(index).1,
                value,
            )),
            Slot::Vacant(index) => {
                self.table.fill(index, key, value);
                None
            }
        }
    }

    /// Returns a reference to the value stored for `key`.
    ///
    /// ```rust
    /// use packed_hash::HashMap;
    ///
    /// let mut map = HashMap::new();
    /// map.insert(1, "a");
    /// assert_eq!(map.get(&1), Some(&"a"));
    /// assert_eq!(map.get(&2), None);
    /// ```
    pub fn get(&self, key: &K) -> Option<&V> {
        self.table.get(key).map(|index| self.table.occupied(index).1)
    }

    /// Returns the stored key and its value.
    pub fn get_key_value(&self, key: &K) -> Option<(&K, &V)> {
        self.table.get(key).map(|index| self.table.occupied(index))
    }

    /// Returns a mutable reference to the value stored for `key`.
    pub fn get_mut(&mut self, key: &K) -> Option<&mut V> {
        let index = self.table.get(key)?;
        Some(self.table.occupied_mut(index).1)
    }

    /// Returns `true` if the map contains `key`.
    pub fn contains_key(&self, key: &K) -> bool {
        self.table.contains(key)
    }

    /// Removes `key` from the map, returning its value if it was present.
    ///
    /// ```rust
    /// use packed_hash::HashMap;
    ///
    /// let mut map = HashMap::new();
    /// map.insert(1, "a");
    /// assert_eq!(map.remove(&1), Some("a"));
    /// assert_eq!(map.remove(&1), None);
    /// ```
    pub fn remove(&mut self, key: &K) -> Option<V> {
        self.remove_entry(key).map(|(_, value)| value)
    }

    /// Removes `key` from the map, returning the stored key and value.
    pub fn remove_entry(&mut self, key: &K) -> Option<(K, V)> {
        self.table.remove(key)
    }

    /// Gets the entry for `key`, for in-place manipulation.
    ///
    /// The map grows when this is called at its threshold, even if the entry
    /// turns out to be occupied or is never filled.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use packed_hash::HashMap;
    ///
    /// let mut letters = HashMap::new();
    /// for ch in "a short treatise on fungi".chars() {
    ///     *letters.entry(ch).or_insert(0) += 1;
    /// }
    ///
    /// assert_eq!(letters.get(&'s'), Some(&2));
    /// assert_eq!(letters.get(&'t'), Some(&3));
    /// assert_eq!(letters.get(&'y'), None);
    /// ```
    pub fn entry(&mut self, key: K) -> Entry<'_, K, V, S, P> {
        match self.locate(&key) {
            Slot::Found(index) => Entry::Occupied(OccupiedEntry {
                table: &mut self.table,
                index,
            }),
            Slot::Vacant(index) => Entry::Vacant(VacantEntry {
                table: &mut self.table,
                index,
                key,
            }),
        }
    }

    /// Reserves room for at least `additional` more entries.
    ///
    /// # Panics
    ///
    /// Panics if the new bucket count overflows or the allocation fails.
    pub fn reserve(&mut self, additional: usize) {
        self.table.reserve(additional);
    }

    /// Like [`reserve`](Self::reserve), but reports failure instead of
    /// panicking.
    pub fn try_reserve(&mut self, additional: usize) -> Result<(), CapacityError> {
        self.table.try_reserve(additional)
    }

    /// Shrinks the map as much as possible. Tombstones are dropped.
    pub fn shrink_to_fit(&mut self) {
        self.table.shrink_to_fit();
    }
}

impl<K, V, S, P> FromIterator<(K, V)> for HashMap<K, V, S, P>
where
    K: Hash + Eq,
    S: BuildHasher + Default,
    P: Probe + Default,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = Self::default();
        map.extend(iter);
        map
    }
}

impl<K, V, S, P> Extend<(K, V)> for HashMap<K, V, S, P>
where
    K: Hash + Eq,
    S: BuildHasher,
    P: Probe,
{
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        let iter = iter.into_iter();
        self.reserve(iter.size_hint().0);
        for (key, value) in iter {
            self.insert(key, value);
        }
    }
}

impl<'a, K, V, S, P> IntoIterator for &'a HashMap<K, V, S, P> {
    type IntoIter = Iter<'a, K, V>;
    type Item = (&'a K, &'a V);

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<'a, K, V, S, P> IntoIterator for &'a mut HashMap<K, V, S, P> {
    type IntoIter = IterMut<'a, K, V>;
    type Item = (&'a K, &'a mut V);

    fn into_iter(self) -> Self::IntoIter {
        self.iter_mut()
    }
}

/// A view into a single entry in the map, which may either be vacant or
/// occupied.
///
/// This enum is constructed from the [`entry`] method on [`HashMap`].
///
/// [`entry`]: HashMap::entry
pub enum Entry<'a, K, V, S = DefaultHashBuilder, P = DefaultProbe> {
    /// A vacant entry.
    Vacant(VacantEntry<'a, K, V, S, P>),
    /// An occupied entry.
    Occupied(OccupiedEntry<'a, K, V, S, P>),
}

impl<'a, K, V, S, P> Entry<'a, K, V, S, P> {
    /// Inserts `default` if the entry is vacant and returns a mutable
    /// reference to the value.
    pub fn or_insert(self, default: V) -> &'a mut V {
        match self {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => entry.insert(default),
        }
    }

    /// Inserts the result of `default` if the entry is vacant and returns a
    /// mutable reference to the value.
    pub fn or_insert_with<F>(self, default: F) -> &'a mut V
    where
        F: FnOnce() -> V,
    {
        match self {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => entry.insert(default()),
        }
    }

    /// Provides in-place mutable access to an occupied entry before any
    /// potential inserts.
    pub fn and_modify<F>(self, f: F) -> Self
    where
        F: FnOnce(&mut V),
    {
        match self {
            Entry::Occupied(mut entry) => {
                f(entry.get_mut());
                Entry::Occupied(entry)
            }
            Entry::Vacant(entry) => Entry::Vacant(entry),
        }
    }

    /// Returns a reference to this entry's key.
    pub fn key(&self) -> &K {
        match self {
            Entry::Occupied(entry) => entry.key(),
            Entry::Vacant(entry) => entry.key(),
        }
    }
}

impl<'a, K, V, S, P> Entry<'a, K, V, S, P>
where
    V: Default,
{
    /// Inserts the default value if the entry is vacant and returns a mutable
    /// reference to the value.
    pub fn or_default(self) -> &'a mut V {
        self.or_insert_with(Default::default)
    }
}

/// A view into a vacant entry in the map.
///
/// Holds the bucket the key will be written to: either the first tombstone on
/// its probe path or the empty bucket that ended it.
pub struct VacantEntry<'a, K, V, S = DefaultHashBuilder, P = DefaultProbe> {
    table: &'a mut HashTable<K, V, S, DefaultEq, P>,
    index: usize,
    key: K,
}

impl<'a, K, V, S, P> VacantEntry<'a, K, V, S, P> {
    /// Gets a reference to the key that would be used when inserting a value.
    pub fn key(&self) -> &K {
        &self.key
    }

    /// Takes ownership of the key.
    pub fn into_key(self) -> K {
        self.key
    }

    /// Inserts the value into the map and returns a mutable reference to it.
    pub fn insert(self, value: V) -> &'a mut V {
        let table = self.table;
        table.fill(self.index, self.key, value);
        table.occupied_mut(self.index).1
    }
}

/// A view into an occupied entry in the map.
pub struct OccupiedEntry<'a, K, V, S = DefaultHashBuilder, P = DefaultProbe> {
    table: &'a mut HashTable<K, V, S, DefaultEq, P>,
    index: usize,
}

impl<'a, K, V, S, P> OccupiedEntry<'a, K, V, S, P> {
    /// Gets a reference to the key in the entry.
    pub fn key(&self) -> &K {
        self.table.occupied(self.index).0
    }

    /// Gets a reference to the value in the entry.
    pub fn get(&self) -> &V {
        self.table.occupied(self.index).1
    }

    /// Gets a mutable reference to the value in the entry.
    pub fn get_mut(&mut self) -> &mut V {
        self.table.occupied_mut(self.index).1
    }

    /// Converts the entry into a mutable reference to the value.
    pub fn into_mut(self) -> &'a mut V {
        let table = self.table;
        table.occupied_mut(self.index).1
    }

    /// Replaces the value in the entry and returns the old value.
    pub fn insert(&mut self, value: V) -> V {
        core::mem::replace(self.get_mut(), value)
    }

    /// Removes the entry from the map and returns the value.
    pub fn remove(self) -> V {
        self.remove_entry().1
    }

    /// Removes the entry from the map and returns the key and value.
    pub fn remove_entry(self) -> (K, V) {
        match self.table.del(self.index) {
            Some(entry) => entry,
            None => unreachable!("occupied entry points at a vacant bucket"),
        }
    }
}

/// An iterator over the key-value pairs of a `HashMap`.
pub struct Iter<'a, K, V> {
    inner: hash_table::Iter<'a, K, V>,
}

impl<K, V> Clone for Iter<'_, K, V> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K, V> ExactSizeIterator for Iter<'_, K, V> {}

/// A mutable iterator over the key-value pairs of a `HashMap`.
pub struct IterMut<'a, K, V> {
    inner: hash_table::IterMut<'a, K, V>,
}

impl<'a, K, V> Iterator for IterMut<'a, K, V> {
    type Item = (&'a K, &'a mut V);

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K, V> ExactSizeIterator for IterMut<'_, K, V> {}

/// An iterator over the keys of a `HashMap`.
pub struct Keys<'a, K, V> {
    inner: Iter<'a, K, V>,
}

impl<'a, K, V> Iterator for Keys<'a, K, V> {
    type Item = &'a K;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(k, _)| k)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

/// An iterator over the values of a `HashMap`.
pub struct Values<'a, K, V> {
    inner: Iter<'a, K, V>,
}

impl<'a, K, V> Iterator for Values<'a, K, V> {
    type Item = &'a V;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(_, v)| v)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

/// An iterator over mutable references to the values of a `HashMap`.
pub struct ValuesMut<'a, K, V> {
    inner: IterMut<'a, K, V>,
}

impl<'a, K, V> Iterator for ValuesMut<'a, K, V> {
    type Item = &'a mut V;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(_, v)| v)
    }
}

/// A draining iterator over the key-value pairs of a `HashMap`.
pub struct Drain<'a, K, V, S = DefaultHashBuilder, P = DefaultProbe> {
    inner: hash_table::Drain<'a, K, V, S, DefaultEq, P>,
}

impl<K, V, S, P> Iterator for Drain<'_, K, V, S, P> {
    type Item = (K, V);

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}
