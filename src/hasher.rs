//! Pluggable hashing and key-equality strategies.
//!
//! A [`HashTable`](crate::HashTable) never hashes or compares keys by itself;
//! it is handed a [`HashStrategy`] and a [`KeyEq`] when it is built. Both are
//! resolved statically, so the probe loop never goes through a vtable.

use core::hash::BuildHasher;
use core::hash::BuildHasherDefault;
use core::hash::Hash;
use core::hash::Hasher;

use cfg_if::cfg_if;

/// Multiplier used when folding several writes into one identity hash.
const FOLD_MULTIPLIER: u64 = 0x9e37_79b9_7f4a_7c15;

/// Maps a key to the 64-bit hash its probe sequence starts from.
pub trait HashStrategy<K: ?Sized> {
    /// Hashes `key`.
    fn hash_key(&self, key: &K) -> u64;
}

impl<K, S> HashStrategy<K> for S
where
    K: Hash + ?Sized,
    S: BuildHasher,
{
    #[inline(always)]
    fn hash_key(&self, key: &K) -> u64 {
        self.hash_one(key)
    }
}

/// Uses a plain function or closure as the hash strategy.
///
/// ```rust
/// use packed_hash::hasher::FnHash;
/// use packed_hash::hasher::HashStrategy;
///
/// let by_len = FnHash(|s: &&str| s.len() as u64);
/// assert_eq!(by_len.hash_key(&"four"), 4);
/// ```
#[derive(Clone, Copy, Debug, Default)]
pub struct FnHash<F>(pub F);

impl<K, F> HashStrategy<K> for FnHash<F>
where
    K: ?Sized,
    F: Fn(&K) -> u64,
{
    #[inline(always)]
    fn hash_key(&self, key: &K) -> u64 {
        (self.0)(key)
    }
}

/// Decides whether two keys are the same key.
pub trait KeyEq<K: ?Sized> {
    /// Returns `true` if `a` and `b` name the same entry.
    fn key_eq(&self, a: &K, b: &K) -> bool;
}

/// Key equality through [`PartialEq`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DefaultEq;

impl<K> KeyEq<K> for DefaultEq
where
    K: PartialEq + ?Sized,
{
    #[inline(always)]
    fn key_eq(&self, a: &K, b: &K) -> bool {
        a == b
    }
}

/// Uses a plain function or closure as the key equality.
///
/// ```rust
/// use packed_hash::hasher::FnEq;
/// use packed_hash::hasher::KeyEq;
///
/// let nocase = FnEq(|a: &&str, b: &&str| a.eq_ignore_ascii_case(b));
/// assert!(nocase.key_eq(&"Key", &"kEY"));
/// ```
#[derive(Clone, Copy, Debug, Default)]
pub struct FnEq<F>(pub F);

impl<K, F> KeyEq<K> for FnEq<F>
where
    K: ?Sized,
    F: Fn(&K, &K) -> bool,
{
    #[inline(always)]
    fn key_eq(&self, a: &K, b: &K) -> bool {
        (self.0)(a, b)
    }
}

/// A hasher that returns integer keys unchanged.
///
/// A single integer write hashes to the integer itself, so `u64` keys land in
/// bucket `key & mask`. Any further write (tuples, strings, byte slices) is
/// folded in with a multiply-rotate, so non-integer keys still spread over the
/// table, just without the quality of a real hash function.
///
/// ```rust
/// use core::hash::BuildHasher;
///
/// use packed_hash::hasher::BuildIdentityHasher;
///
/// let state = BuildIdentityHasher::default();
/// assert_eq!(state.hash_one(42u64), 42);
/// assert_eq!(state.hash_one(7u8), 7);
/// ```
#[derive(Clone, Copy, Debug, Default)]
pub struct IdentityHasher {
    hash: u64,
}

impl IdentityHasher {
    #[inline(always)]
    fn mix(&mut self, word: u64) {
        self.hash = self.hash.wrapping_mul(FOLD_MULTIPLIER).rotate_left(23) ^ word;
    }
}

impl Hasher for IdentityHasher {
    #[inline(always)]
    fn finish(&self) -> u64 {
        self.hash
    }

    fn write(&mut self, bytes: &[u8]) {
        for chunk in bytes.chunks(8) {
            let mut word = [0u8; 8];
            word[..chunk.len()].copy_from_slice(chunk);
            self.mix(u64::from_le_bytes(word));
        }
    }

    #[inline(always)]
    fn write_u8(&mut self, i: u8) {
        self.mix(i as u64);
    }

    #[inline(always)]
    fn write_u16(&mut self, i: u16) {
        self.mix(i as u64);
    }

    #[inline(always)]
    fn write_u32(&mut self, i: u32) {
        self.mix(i as u64);
    }

    #[inline(always)]
    fn write_u64(&mut self, i: u64) {
        self.mix(i);
    }

    #[inline(always)]
    fn write_u128(&mut self, i: u128) {
        self.mix(i as u64 ^ (i >> 64) as u64);
    }

    #[inline(always)]
    fn write_usize(&mut self, i: usize) {
        self.mix(i as u64);
    }
}

/// Builds [`IdentityHasher`]s. The default hash strategy of
/// [`HashTable`](crate::HashTable).
pub type BuildIdentityHasher = BuildHasherDefault<IdentityHasher>;

cfg_if! {
    if #[cfg(feature = "foldhash")] {
        /// Hasher builder used by [`HashMap`](crate::HashMap) and
        /// [`HashSet`](crate::HashSet) when none is named.
        pub type DefaultHashBuilder = foldhash::fast::RandomState;
    } else if #[cfg(feature = "std")] {
        /// Hasher builder used by [`HashMap`](crate::HashMap) and
        /// [`HashSet`](crate::HashSet) when none is named.
        pub type DefaultHashBuilder = std::collections::hash_map::RandomState;
    } else {
        /// Hasher builder used by [`HashMap`](crate::HashMap) and
        /// [`HashSet`](crate::HashSet) when none is named.
        pub type DefaultHashBuilder = BuildIdentityHasher;
    }
}
