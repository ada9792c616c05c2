//! Collection types used by triangulations, skeleta and signature searches.
//!
//! Hash-based collections use [`rustc_hash`] hashing, which is fast but not DoS-resistant.
//! All keys hashed here (slotmap keys, UUIDs generated by the crate, small integers) are
//! produced internally, so that trade-off is acceptable.

use rustc_hash::{FxBuildHasher, FxHashMap, FxHashSet};
use smallvec::SmallVec;

#[cfg(not(feature = "dense-slotmap"))]
use slotmap::SlotMap;

#[cfg(feature = "dense-slotmap")]
use slotmap::DenseSlotMap;

use crate::core::simplex::SimplexKey;

// Re-export UUID for convenience in type aliases
pub use uuid::Uuid;

// =============================================================================
// STORAGE BACKEND
// =============================================================================

/// Internal storage backend for simplices.
///
/// This type alias abstracts over the concrete storage implementation,
/// allowing the choice between `DenseSlotMap` (**default**) and `SlotMap`
/// (when built with `--no-default-features`) without exposing the choice
/// in public APIs.
///
/// # Feature Flags
///
/// - **default**: Uses `DenseSlotMap` (enabled via the default `dense-slotmap` feature)
/// - **--no-default-features**: Uses `SlotMap`
#[cfg(not(feature = "dense-slotmap"))]
pub type StorageMap<K, V> = SlotMap<K, V>;

#[cfg(feature = "dense-slotmap")]
pub type StorageMap<K, V> = DenseSlotMap<K, V>;

// =============================================================================
// CORE OPTIMIZED TYPES
// =============================================================================

/// `HashMap` using the fast non-cryptographic `FxHasher`.
///
/// # Examples
///
/// ```rust
/// use simplicial::core::collections::FastHashMap;
///
/// let mut map: FastHashMap<u64, usize> = FastHashMap::default();
/// map.insert(123, 456);
/// ```
pub type FastHashMap<K, V> = FxHashMap<K, V>;

/// `HashSet` using the fast non-cryptographic `FxHasher`.
///
/// # Examples
///
/// ```rust
/// use simplicial::core::collections::FastHashSet;
/// use uuid::Uuid;
///
/// let mut set: FastHashSet<Uuid> = FastHashSet::default();
/// set.insert(Uuid::new_v4());
/// ```
pub type FastHashSet<T> = FxHashSet<T>;

/// Small-optimized Vec that uses stack allocation for up to `N` elements
/// and falls back to the heap beyond that.
///
/// # Examples
///
/// ```rust
/// use simplicial::core::collections::SmallBuffer;
///
/// let mut buffer: SmallBuffer<i32, 8> = SmallBuffer::new();
/// for i in 0..5 {
///     buffer.push(i);
/// }
/// assert!(!buffer.spilled());
/// ```
pub type SmallBuffer<T, const N: usize> = SmallVec<[T; N]>;

// =============================================================================
// SEMANTIC SIZE CONSTANTS AND TYPE ALIASES
// =============================================================================

/// Number of facets stored inline per simplex before spilling to the heap.
///
/// Covers every dimension up to 7; higher dimensions remain supported but
/// their facet arrays live on the heap.
pub const MAX_INLINE_FACETS: usize = 8;

/// Per-facet storage for a single simplex.
pub type FacetBuffer<T> = SmallBuffer<T, MAX_INLINE_FACETS>;

/// Mapping from simplex UUIDs to their storage keys.
///
/// Reverse lookups go through the storage map directly: `simplices[key].uuid()`.
pub type UuidToSimplexKeyMap = FastHashMap<Uuid, SimplexKey>;

// =============================================================================
// UTILITY FUNCTIONS
// =============================================================================

/// Creates a `FastHashMap` with pre-allocated capacity.
///
/// # Examples
///
/// ```rust
/// use simplicial::core::collections::fast_hash_map_with_capacity;
///
/// let map = fast_hash_map_with_capacity::<u64, usize>(1000);
/// assert!(map.capacity() >= 1000);
/// ```
#[inline]
#[must_use]
pub fn fast_hash_map_with_capacity<K, V>(capacity: usize) -> FastHashMap<K, V> {
    FastHashMap::with_capacity_and_hasher(capacity, FxBuildHasher)
}

/// Creates a `FastHashSet` with pre-allocated capacity.
///
/// # Examples
///
/// ```rust
/// use simplicial::core::collections::fast_hash_set_with_capacity;
/// use uuid::Uuid;
///
/// let set = fast_hash_set_with_capacity::<Uuid>(500);
/// assert!(set.capacity() >= 500);
/// ```
#[inline]
#[must_use]
pub fn fast_hash_set_with_capacity<T>(capacity: usize) -> FastHashSet<T> {
    FastHashSet::with_capacity_and_hasher(capacity, FxBuildHasher)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fast_collections_basic_operations() {
        let mut map: FastHashMap<u64, usize> = FastHashMap::default();
        assert!(map.is_empty());

        map.insert(123, 456);
        assert_eq!(map.get(&123), Some(&456));
        map.insert(789, 101_112);
        assert_eq!(map.len(), 2);

        let mut set: FastHashSet<u64> = fast_hash_set_with_capacity(4);
        set.insert(789);
        set.insert(456);
        assert!(set.contains(&456));
        assert!(!set.contains(&999));
    }

    #[test]
    fn test_facet_buffer_spills_beyond_seven_dimensions() {
        let mut buffer: FacetBuffer<Option<u8>> = FacetBuffer::new();
        buffer.resize(MAX_INLINE_FACETS, None);
        assert!(!buffer.spilled());

        buffer.push(None);
        assert!(buffer.spilled());
    }
}
