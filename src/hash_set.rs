use core::fmt::Debug;
use core::hash::BuildHasher;
use core::hash::Hash;

use crate::error::CapacityError;
use crate::hash_table;
use crate::hash_table::HashTable;
use crate::hasher::DefaultEq;
use crate::hasher::DefaultHashBuilder;
use crate::probe::DefaultProbe;
use crate::probe::Probe;

/// A hash set stored in a [`HashTable`] with zero-sized values.
///
/// `HashSet<T, S, P>` stores values of type `T` where `T` implements
/// `Hash + Eq`, hashed with the builder `S` and probed with `P`. Only the key
/// array and the 2-bit tags are allocated.
///
/// Inserting a value equal to one already stored keeps the stored value.
#[derive(Clone)]
pub struct HashSet<T, S = DefaultHashBuilder, P = DefaultProbe> {
    table: HashTable<T, (), S, DefaultEq, P>,
}

impl<T, S, P> PartialEq for HashSet<T, S, P>
where
    T: Hash + Eq,
    S: BuildHasher,
    P: Probe,
{
    fn eq(&self, other: &Self) -> bool {
        if self.len() != other.len() {
            return false;
        }
        self.iter().all(|v| other.contains(v))
    }
}

impl<T, S, P> Eq for HashSet<T, S, P>
where
    T: Hash + Eq,
    S: BuildHasher,
    P: Probe,
{
}

impl<T, S, P> Debug for HashSet<T, S, P>
where
    T: Debug,
{
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

impl<T, S, P> Default for HashSet<T, S, P>
where
    S: Default,
    P: Default,
{
    fn default() -> Self {
        Self::with_hasher_and_probe(S::default(), P::default())
    }
}

impl<T> HashSet<T>
where
    T: Hash + Eq,
{
    /// Creates an empty set with the default hasher and probing strategy.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use packed_hash::HashSet;
    ///
    /// let set: HashSet<i32> = HashSet::new();
    /// assert!(set.is_empty());
    /// ```
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty set that holds at least `capacity` values before
    /// growing.
    ///
    /// ```rust
    /// use packed_hash::HashSet;
    ///
    /// let set: HashSet<i32> = HashSet::with_capacity(100);
    /// assert!(set.capacity() >= 100);
    /// ```
    pub fn with_capacity(capacity: usize) -> Self {
        Self::with_capacity_and_hasher(capacity, DefaultHashBuilder::default())
    }
}

impl<T, S> HashSet<T, S>
where
    T: Hash + Eq,
    S: BuildHasher,
{
    /// Creates an empty set with the given hasher builder.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # #[cfg(feature = "std")]
    /// # {
    /// use std::collections::hash_map::RandomState;
    ///
    /// use packed_hash::hash_set::HashSet;
    ///
    /// let set: HashSet<i32, _> = HashSet::with_hasher(RandomState::new());
    /// assert!(set.is_empty());
    /// # }
    /// ```
    pub fn with_hasher(hash_builder: S) -> Self {
        Self::with_hasher_and_probe(hash_builder, DefaultProbe::default())
    }

    /// Creates an empty set with the given hasher builder that holds at least
    /// `capacity` values before growing.
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

impl<T, S, P> HashSet<T, S, P> {
    /// Creates an empty set with the given hasher builder and probing
    /// strategy.
    pub fn with_hasher_and_probe(hash_builder: S, probe: P) -> Self {
        Self {
            table: HashTable::with_strategies(hash_builder, DefaultEq, probe),
        }
    }

    /// Returns the number of values in the set.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use packed_hash::HashSet;
    ///
    /// let mut set: HashSet<i32> = HashSet::new();
    /// assert_eq!(set.len(), 0);
    /// set.insert(1);
    /// assert_eq!(set.len(), 1);
    /// ```
    pub fn len(&self) -> usize {
        self.table.len()
    }

    /// Returns `true` if the set contains no values.
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Number of values the set can hold before it grows, ignoring
    /// tombstones.
    pub fn capacity(&self) -> usize {
        self.table.threshold()
    }

    /// The set's hasher builder.
    pub fn hasher(&self) -> &S {
        self.table.hasher()
    }

    /// Removes every value, keeping the allocated memory.
    pub fn clear(&mut self) {
        self.table.clear();
    }

    /// Keeps only the values for which `f` returns `true`.
    ///
    /// ```rust
    /// use packed_hash::HashSet;
    ///
    /// let mut set: HashSet<i32> = (1..=4).collect();
    /// set.retain(|&x| x % 2 == 0);
    /// assert_eq!(set.len(), 2);
    /// assert!(set.contains(&2));
    /// assert!(set.contains(&4));
    /// ```
    pub fn retain<F>(&mut self, mut f: F)
    where
        F: FnMut(&T) -> bool,
    {
        self.table.retain(|value, _| f(value));
    }

    /// Returns an iterator over the values of the set, in arbitrary order.
    pub fn iter(&self) -> Iter<'_, T> {
        Iter {
            inner: self.table.iter(),
        }
    }

    /// Removes every value and yields it. The allocated memory is kept.
    ///
    /// ```rust
    /// use packed_hash::HashSet;
    ///
    /// let mut set: HashSet<i32> = HashSet::new();
    /// set.insert(1);
    /// set.insert(2);
    ///
    /// let values: Vec<_> = set.drain().collect();
    /// assert!(set.is_empty());
    /// assert_eq!(values.len(), 2);
    /// ```
    pub fn drain(&mut self) -> Drain<'_, T, S, P> {
        Drain {
            inner: self.table.drain(),
        }
    }
}

impl<T, S, P> HashSet<T, S, P>
where
    T: Hash + Eq,
    S: BuildHasher,
    P: Probe,
{
    /// Adds a value to the set.
    ///
    /// Returns `false`, and drops `value`, if an equal value was already
    /// present.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use packed_hash::HashSet;
    ///
    /// let mut set: HashSet<i32> = HashSet::new();
    /// assert_eq!(set.insert(37), true);
    /// assert_eq!(set.insert(37), false);
    /// assert_eq!(set.len(), 1);
    /// ```
    pub fn insert(&mut self, value: T) -> bool {
        self.table.set(value, ()).1.is_inserted()
    }

    /// Returns `true` if the set contains `value`.
    pub fn contains(&self, value: &T) -> bool {
        self.table.contains(value)
    }

    /// Returns the stored value equal to `value`.
    ///
    /// ```rust
    /// use packed_hash::HashSet;
    ///
    /// let mut set: HashSet<i32> = HashSet::new();
    /// set.insert(1);
    /// assert_eq!(set.get(&1), Some(&1));
    /// assert_eq!(set.get(&2), None);
    /// ```
    pub fn get(&self, value: &T) -> Option<&T> {
        self.table.get(value).map(|index| self.table.occupied(index).0)
    }

    /// Removes `value` from the set. Returns whether it was present.
    pub fn remove(&mut self, value: &T) -> bool {
        self.take(value).is_some()
    }

    /// Removes and returns the stored value equal to `value`.
    ///
    /// ```rust
    /// use packed_hash::HashSet;
    ///
    /// let mut set: HashSet<i32> = HashSet::new();
    /// set.insert(1);
    /// assert_eq!(set.take(&1), Some(1));
    /// assert_eq!(set.take(&1), None);
    /// ```
    pub fn take(&mut self, value: &T) -> Option<T> {
        self.table.remove(value).map(|(value, ())| value)
    }

    /// Reserves room for at least `additional` more values.
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

    /// Shrinks the set as much as possible. Tombstones are dropped.
    pub fn shrink_to_fit(&mut self) {
        self.table.shrink_to_fit();
    }

    /// Returns `true` if the set has no values in common with `other`.
    ///
    /// ```rust
    /// use packed_hash::HashSet;
    ///
    /// let a: HashSet<i32> = [1, 2].into_iter().collect();
    /// let b: HashSet<i32> = [3, 4].into_iter().collect();
    /// assert!(a.is_disjoint(&b));
    /// ```
    pub fn is_disjoint(&self, other: &Self) -> bool {
        if self.len() <= other.len() {
            self.iter().all(|v| !other.contains(v))
        } else {
            other.iter().all(|v| !self.contains(v))
        }
    }

    /// Returns `true` if every value in `self` is also in `other`.
    pub fn is_subset(&self, other: &Self) -> bool {
        self.len() <= other.len() && self.iter().all(|v| other.contains(v))
    }

    /// Returns `true` if every value in `other` is also in `self`.
    pub fn is_superset(&self, other: &Self) -> bool {
        other.is_subset(self)
    }

    /// Values in `self` or `other`, without duplicates.
    ///
    /// ```rust
    /// use packed_hash::HashSet;
    ///
    /// let a: HashSet<i32> = [1, 2].into_iter().collect();
    /// let b: HashSet<i32> = [2, 3].into_iter().collect();
    ///
    /// let union: Vec<_> = a.union(&b).copied().collect();
    /// assert_eq!(union.len(), 3);
    /// ```
    pub fn union<'a>(&'a self, other: &'a Self) -> Union<'a, T, S, P> {
        Union {
            iter: self.iter(),
            rest: other.difference(self),
        }
    }

    /// Values in both `self` and `other`.
    pub fn intersection<'a>(&'a self, other: &'a Self) -> Intersection<'a, T, S, P> {
        if self.len() <= other.len() {
            Intersection {
                iter: self.iter(),
                other,
            }
        } else {
            Intersection {
                iter: other.iter(),
                other: self,
            }
        }
    }

    /// Values in `self` but not in `other`.
    pub fn difference<'a>(&'a self, other: &'a Self) -> Difference<'a, T, S, P> {
        Difference {
            iter: self.iter(),
            other,
        }
    }

    /// Values in exactly one of `self` and `other`.
    pub fn symmetric_difference<'a>(&'a self, other: &'a Self) -> SymmetricDifference<'a, T, S, P> {
        SymmetricDifference {
            iter: self.difference(other).chain(other.difference(self)),
        }
    }
}

impl<'a, T, S, P> IntoIterator for &'a HashSet<T, S, P> {
    type IntoIter = Iter<'a, T>;
    type Item = &'a T;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<T, S, P> FromIterator<T> for HashSet<T, S, P>
where
    T: Hash + Eq,
    S: BuildHasher + Default,
    P: Probe + Default,
{
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut set = Self::default();
        set.extend(iter);
        set
    }
}

impl<T, S, P> Extend<T> for HashSet<T, S, P>
where
    T: Hash + Eq,
    S: BuildHasher,
    P: Probe,
{
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        let iter = iter.into_iter();
        self.reserve(iter.size_hint().0);
        for value in iter {
            self.insert(value);
        }
    }
}

/// An iterator over the values of a `HashSet`.
pub struct Iter<'a, T> {
    inner: hash_table::Iter<'a, T, ()>,
}

impl<T> Clone for Iter<'_, T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(value, _)| value)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<T> ExactSizeIterator for Iter<'_, T> {}

/// A draining iterator over the values of a `HashSet`.
pub struct Drain<'a, T, S = DefaultHashBuilder, P = DefaultProbe> {
    inner: hash_table::Drain<'a, T, (), S, DefaultEq, P>,
}

impl<T, S, P> Iterator for Drain<'_, T, S, P> {
    type Item = T;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(value, ())| value)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

/// An iterator over the union of two sets.
pub struct Union<'a, T, S, P> {
    iter: Iter<'a, T>,
    rest: Difference<'a, T, S, P>,
}

impl<'a, T, S, P> Iterator for Union<'a, T, S, P>
where
    T: Hash + Eq,
    S: BuildHasher,
    P: Probe,
{
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        self.iter.next().or_else(|| self.rest.next())
    }
}

/// An iterator over the intersection of two sets.
pub struct Intersection<'a, T, S, P> {
    iter: Iter<'a, T>,
    other: &'a HashSet<T, S, P>,
}

impl<'a, T, S, P> Iterator for Intersection<'a, T, S, P>
where
    T: Hash + Eq,
    S: BuildHasher,
    P: Probe,
{
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let v = self.iter.next()?;
            if self.other.contains(v) {
                return Some(v);
            }
        }
    }
}

/// An iterator over the difference of two sets.
pub struct Difference<'a, T, S, P> {
    iter: Iter<'a, T>,
    other: &'a HashSet<T, S, P>,
}

impl<'a, T, S, P> Iterator for Difference<'a, T, S, P>
where
    T: Hash + Eq,
    S: BuildHasher,
    P: Probe,
{
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let v = self.iter.next()?;
            if !self.other.contains(v) {
                return Some(v);
            }
        }
    }
}

/// An iterator over the symmetric difference of two sets.
pub struct SymmetricDifference<'a, T, S, P> {
    iter: core::iter::Chain<Difference<'a, T, S, P>, Difference<'a, T, S, P>>,
}

impl<'a, T, S, P> Iterator for SymmetricDifference<'a, T, S, P>
where
    T: Hash + Eq,
    S: BuildHasher,
    P: Probe,
{
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        self.iter.next()
    }
}
