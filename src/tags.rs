use alloc::collections::TryReserveError;
use alloc::vec::Vec;

/// Tag bit set while a bucket holds a tombstone.
const DELETED: u64 = 0b01;

/// Tag bit set while a bucket has never been written since the last
/// allocation or clear.
const EMPTY: u64 = 0b10;

const BOTH: u64 = DELETED | EMPTY;

/// `0b10` repeated across a word: every bucket in the word is empty.
const ALL_EMPTY: u64 = 0xAAAA_AAAA_AAAA_AAAA;

const TAGS_PER_WORD: usize = u64::BITS as usize / 2;

/// Packed per-bucket state, two bits per bucket.
///
/// Both bits clear means the bucket is occupied. `EMPTY` alone is a bucket that
/// was never written, `DELETED` alone is a tombstone left behind by a removal.
#[derive(Clone, Default)]
pub(crate) struct Tags {
    words: Vec<u64>,
}

impl Tags {
    /// Allocates tags for `buckets` buckets, all marked empty.
    pub(crate) fn try_with_buckets(buckets: usize) -> Result<Self, TryReserveError> {
        let len = buckets.div_ceil(TAGS_PER_WORD);
        let mut words = Vec::new();
        words.try_reserve_exact(len)?;
        words.resize(len, ALL_EMPTY);
        Ok(Self { words })
    }

    #[inline(always)]
    fn bits(&self, index: usize) -> u64 {
        (self.words[index / TAGS_PER_WORD] >> shift(index)) & BOTH
    }

    #[inline(always)]
    pub(crate) fn is_empty(&self, index: usize) -> bool {
        self.bits(index) & EMPTY != 0
    }

    #[inline(always)]
    pub(crate) fn is_deleted(&self, index: usize) -> bool {
        self.bits(index) & DELETED != 0
    }

    /// True for empty buckets and tombstones alike.
    #[inline(always)]
    pub(crate) fn is_either(&self, index: usize) -> bool {
        self.bits(index) != 0
    }

    #[inline(always)]
    pub(crate) fn is_occupied(&self, index: usize) -> bool {
        !self.is_either(index)
    }

    /// Clears both bits.
    #[inline(always)]
    pub(crate) fn set_occupied(&mut self, index: usize) {
        self.words[index / TAGS_PER_WORD] &= !(BOTH << shift(index));
    }

    /// Only meaningful on an occupied bucket.
    #[inline(always)]
    pub(crate) fn set_deleted(&mut self, index: usize) {
        debug_assert!(self.is_occupied(index));
        self.words[index / TAGS_PER_WORD] |= DELETED << shift(index);
    }

    pub(crate) fn fill_empty(&mut self) {
        self.words.fill(ALL_EMPTY);
    }

    /// Heap bytes held by the tag words.
    pub(crate) fn bytes(&self) -> usize {
        self.words.len() * core::mem::size_of::<u64>()
    }
}

#[inline(always)]
fn shift(index: usize) -> u32 {
    ((index % TAGS_PER_WORD) << 1) as u32
}
