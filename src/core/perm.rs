//! Permutations of `{0, …, n−1}` used as facet gluings and vertex relabellings.
//!
//! A [`Perm`] is a small immutable value: it is `Copy`, hashable and totally ordered.
//! Every permutation of size `n` has a unique **index** in `[0, n!)`, namely its rank
//! in lexicographic order of image sequences; the derived ordering agrees with that rank.
//!
//! Composition reads right to left, like function composition:
//! `(p * q).apply(i) == p.apply(q.apply(i))`.
//!
//! # Examples
//!
//! ```rust
//! use simplicial::core::perm::Perm;
//!
//! let p = Perm::from_images(&[1, 2, 0, 3]).unwrap();
//! let q = Perm::transposition(4, 0, 3);
//!
//! assert_eq!((p * q).apply(0), p.apply(q.apply(0)));
//! assert_eq!(p * p.inverse(), Perm::identity(4));
//! assert_eq!(p.sign(), 1);
//! assert_eq!(Perm::from_index(4, p.index()).unwrap(), p);
//! ```

use std::fmt;
use std::ops::Mul;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::collections::SmallBuffer;

/// Smallest supported permutation size.
pub const MIN_PERM_SIZE: usize = 2;

/// Largest supported permutation size (gluings of 16-dimensional simplices).
pub const MAX_PERM_SIZE: usize = 17;

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Errors that can occur when constructing a permutation.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum PermError {
    /// The requested size is outside `2..=17`.
    #[error("Permutation size {size} is outside the supported range 2..=17")]
    InvalidSize {
        /// The rejected size.
        size: usize,
    },
    /// An image lies outside `0..size`.
    #[error("Image {image} at position {position} is out of range for a permutation of size {size}")]
    ImageOutOfRange {
        /// The position holding the bad image.
        position: usize,
        /// The bad image.
        image: usize,
        /// The permutation size.
        size: usize,
    },
    /// An image occurs twice, so the sequence is not a bijection.
    #[error("Image {image} occurs more than once")]
    RepeatedImage {
        /// The repeated image.
        image: usize,
    },
    /// The lexicographic index is not below `size!`.
    #[error("Index {index} is out of range for permutations of size {size}")]
    IndexOutOfRange {
        /// The rejected index.
        index: u64,
        /// The permutation size.
        size: usize,
    },
}

// =============================================================================
// PERMUTATION
// =============================================================================

/// A permutation of `{0, …, n−1}` for `2 ≤ n ≤ 17`.
///
/// Images are stored inline; slots beyond `len` are always zero so that the
/// derived `Eq`, `Hash` and `Ord` only see the meaningful prefix. Permutations of
/// different sizes compare by size first.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "Vec<u8>", into = "Vec<u8>")]
pub struct Perm {
    len: u8,
    images: [u8; MAX_PERM_SIZE],
}

impl Perm {
    /// The identity permutation of size `n`.
    ///
    /// # Panics
    ///
    /// Panics if `n` is outside `2..=17`.
    #[must_use]
    pub fn identity(n: usize) -> Self {
        assert!(
            (MIN_PERM_SIZE..=MAX_PERM_SIZE).contains(&n),
            "permutation size {n} out of range"
        );
        let mut images = [0_u8; MAX_PERM_SIZE];
        for (i, slot) in images.iter_mut().enumerate().take(n) {
            *slot = i as u8;
        }
        Self {
            len: n as u8,
            images,
        }
    }

    /// Builds a permutation from its image sequence: `i ↦ images[i]`.
    ///
    /// # Errors
    ///
    /// Returns a [`PermError`] if the size is unsupported or the sequence is not a
    /// bijection on `0..images.len()`.
    pub fn from_images(images: &[usize]) -> Result<Self, PermError> {
        let n = images.len();
        if !(MIN_PERM_SIZE..=MAX_PERM_SIZE).contains(&n) {
            return Err(PermError::InvalidSize { size: n });
        }
        let mut seen = [false; MAX_PERM_SIZE];
        let mut stored = [0_u8; MAX_PERM_SIZE];
        for (position, &image) in images.iter().enumerate() {
            if image >= n {
                return Err(PermError::ImageOutOfRange {
                    position,
                    image,
                    size: n,
                });
            }
            if seen[image] {
                return Err(PermError::RepeatedImage { image });
            }
            seen[image] = true;
            stored[position] = image as u8;
        }
        Ok(Self {
            len: n as u8,
            images: stored,
        })
    }

    /// Builds a permutation from images already known to form a bijection.
    pub(crate) fn from_valid_images(images: impl IntoIterator<Item = usize>) -> Self {
        let mut stored = [0_u8; MAX_PERM_SIZE];
        let mut len = 0_usize;
        for (slot, image) in stored.iter_mut().zip(images) {
            *slot = image as u8;
            len += 1;
        }
        debug_assert!((MIN_PERM_SIZE..=MAX_PERM_SIZE).contains(&len));
        Self {
            len: len as u8,
            images: stored,
        }
    }

    /// The transposition of size `n` swapping `a` and `b` (identity if `a == b`).
    ///
    /// # Panics
    ///
    /// Panics if `n` is unsupported or `a`, `b` are not below `n`.
    #[must_use]
    pub fn transposition(n: usize, a: usize, b: usize) -> Self {
        assert!(a < n && b < n, "transposition ({a} {b}) out of range for size {n}");
        let mut p = Self::identity(n);
        p.images.swap(a, b);
        p
    }

    /// The permutation of size `n` with the given lexicographic index.
    ///
    /// # Errors
    ///
    /// Returns [`PermError::InvalidSize`] or [`PermError::IndexOutOfRange`].
    pub fn from_index(n: usize, index: u64) -> Result<Self, PermError> {
        if !(MIN_PERM_SIZE..=MAX_PERM_SIZE).contains(&n) {
            return Err(PermError::InvalidSize { size: n });
        }
        if index >= factorial(n) {
            return Err(PermError::IndexOutOfRange { index, size: n });
        }
        let mut remaining: SmallBuffer<u8, MAX_PERM_SIZE> = (0..n as u8).collect();
        let mut images = [0_u8; MAX_PERM_SIZE];
        let mut rest = index;
        for (position, slot) in images.iter_mut().enumerate().take(n) {
            let block = factorial(n - 1 - position);
            let digit = (rest / block) as usize;
            rest %= block;
            *slot = remaining.remove(digit);
        }
        Ok(Self {
            len: n as u8,
            images,
        })
    }

    /// All permutations of size `n` in increasing index order.
    ///
    /// # Panics
    ///
    /// Panics if `n` is outside `2..=17`.
    #[must_use]
    pub fn all(n: usize) -> PermIter {
        PermIter {
            next: Some(Self::identity(n)),
        }
    }

    /// The size `n` of this permutation.
    #[inline]
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len as usize
    }

    /// Always `false`: permutations have at least two elements.
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        false
    }

    /// The image sequence `[p(0), …, p(n−1)]`.
    #[inline]
    #[must_use]
    pub fn images(&self) -> &[u8] {
        &self.images[..self.len()]
    }

    /// The image of `i`.
    ///
    /// # Panics
    ///
    /// Panics if `i` is not below [`len`](Self::len).
    #[inline]
    #[must_use]
    pub fn apply(&self, i: usize) -> usize {
        usize::from(self.images()[i])
    }

    /// The element mapped to `i`.
    ///
    /// # Panics
    ///
    /// Panics if `i` is not below [`len`](Self::len).
    #[must_use]
    pub fn pre_image(&self, i: usize) -> usize {
        assert!(i < self.len(), "pre-image of {i} out of range");
        self.images()
            .iter()
            .position(|&x| usize::from(x) == i)
            .unwrap_or_default()
    }

    /// Applies the permutation to each entry of an ordered tuple.
    ///
    /// # Panics
    ///
    /// Panics if any entry is not below [`len`](Self::len).
    #[must_use]
    pub fn apply_tuple(&self, tuple: &[usize]) -> SmallBuffer<usize, MAX_PERM_SIZE> {
        tuple.iter().map(|&i| self.apply(i)).collect()
    }

    /// The composition `self ∘ other`: apply `other` first, then `self`.
    ///
    /// # Panics
    ///
    /// Panics if the sizes differ.
    #[must_use]
    pub fn compose(&self, other: &Self) -> Self {
        assert_eq!(self.len, other.len, "cannot compose permutations of different sizes");
        let mut images = [0_u8; MAX_PERM_SIZE];
        for (slot, &o) in images.iter_mut().zip(other.images()) {
            *slot = self.images[usize::from(o)];
        }
        Self {
            len: self.len,
            images,
        }
    }

    /// The inverse permutation.
    #[must_use]
    pub fn inverse(&self) -> Self {
        let mut images = [0_u8; MAX_PERM_SIZE];
        for (i, &image) in self.images().iter().enumerate() {
            images[usize::from(image)] = i as u8;
        }
        Self {
            len: self.len,
            images,
        }
    }

    /// `+1` for even permutations and `-1` for odd ones.
    #[must_use]
    pub fn sign(&self) -> i8 {
        let images = self.images();
        let mut visited = [false; MAX_PERM_SIZE];
        let mut even = true;
        for start in 0..images.len() {
            if visited[start] {
                continue;
            }
            let mut cycle_len = 0;
            let mut i = start;
            while !visited[i] {
                visited[i] = true;
                i = usize::from(images[i]);
                cycle_len += 1;
            }
            if cycle_len % 2 == 0 {
                even = !even;
            }
        }
        if even { 1 } else { -1 }
    }

    /// Whether this is the identity permutation.
    #[must_use]
    pub fn is_identity(&self) -> bool {
        self.images()
            .iter()
            .enumerate()
            .all(|(i, &image)| usize::from(image) == i)
    }

    /// The lexicographic rank of this permutation among all permutations of its size.
    #[must_use]
    pub fn index(&self) -> u64 {
        let images = self.images();
        let n = images.len();
        let mut rank = 0_u64;
        for i in 0..n {
            let smaller_after = images[i + 1..].iter().filter(|&&x| x < images[i]).count();
            rank += smaller_after as u64 * factorial(n - 1 - i);
        }
        rank
    }

    fn advance(&self) -> Option<Self> {
        let n = self.len();
        let mut next = *self;
        let images = &mut next.images[..n];
        let pivot = (0..n - 1).rev().find(|&i| images[i] < images[i + 1])?;
        let successor = (pivot + 1..n).rev().find(|&j| images[j] > images[pivot])?;
        images.swap(pivot, successor);
        images[pivot + 1..].reverse();
        Some(next)
    }
}

/// `n!` as a `u64` (exact for every supported size).
#[must_use]
pub const fn factorial(n: usize) -> u64 {
    let mut result = 1_u64;
    let mut k = 2;
    while k <= n {
        result *= k as u64;
        k += 1;
    }
    result
}

impl Mul for Perm {
    type Output = Self;

    fn mul(self, rhs: Self) -> Self {
        self.compose(&rhs)
    }
}

impl fmt::Display for Perm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.len() <= 10 {
            for image in self.images() {
                write!(f, "{image}")?;
            }
            Ok(())
        } else {
            write!(f, "(")?;
            for (i, image) in self.images().iter().enumerate() {
                if i > 0 {
                    write!(f, ",")?;
                }
                write!(f, "{image}")?;
            }
            write!(f, ")")
        }
    }
}

impl fmt::Debug for Perm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Perm({self})")
    }
}

impl TryFrom<Vec<u8>> for Perm {
    type Error = PermError;

    fn try_from(images: Vec<u8>) -> Result<Self, Self::Error> {
        let widened: SmallBuffer<usize, MAX_PERM_SIZE> =
            images.iter().map(|&x| usize::from(x)).collect();
        Self::from_images(&widened)
    }
}

impl From<Perm> for Vec<u8> {
    fn from(perm: Perm) -> Self {
        perm.images().to_vec()
    }
}

/// Iterator over all permutations of one size, in increasing index order.
#[derive(Clone, Debug)]
pub struct PermIter {
    next: Option<Perm>,
}

impl Iterator for PermIter {
    type Item = Perm;

    fn next(&mut self) -> Option<Perm> {
        let current = self.next?;
        self.next = current.advance();
        Some(current)
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn perm(images: &[usize]) -> Perm {
        Perm::from_images(images).unwrap()
    }

    #[test]
    fn test_composition_applies_right_operand_first() {
        let p = perm(&[1, 2, 0, 3]);
        let q = perm(&[3, 0, 1, 2]);
        let pq = p * q;
        for i in 0..4 {
            assert_eq!(pq.apply(i), p.apply(q.apply(i)));
        }
        assert_eq!(pq, perm(&[3, 1, 2, 0]));
        assert_ne!(pq, q * p);
    }

    #[test]
    fn test_inverse_and_pre_image() {
        let p = perm(&[2, 0, 3, 1]);
        let inv = p.inverse();
        assert!((p * inv).is_identity());
        assert!((inv * p).is_identity());
        for i in 0..4 {
            assert_eq!(p.pre_image(i), inv.apply(i));
        }
    }

    #[test]
    fn test_from_images_rejects_non_bijections() {
        assert_eq!(
            Perm::from_images(&[0, 0, 1]),
            Err(PermError::RepeatedImage { image: 0 })
        );
        assert_eq!(
            Perm::from_images(&[0, 3, 1]),
            Err(PermError::ImageOutOfRange {
                position: 1,
                image: 3,
                size: 3
            })
        );
        assert_eq!(
            Perm::from_images(&[0]),
            Err(PermError::InvalidSize { size: 1 })
        );
        assert!(Perm::from_images(&(0..18).collect::<Vec<_>>()).is_err());
        assert!(Perm::from_images(&(0..17).rev().collect::<Vec<_>>()).is_ok());
    }

    #[test]
    fn test_sign() {
        assert_eq!(Perm::identity(5).sign(), 1);
        assert_eq!(Perm::transposition(4, 1, 3).sign(), -1);
        assert_eq!(perm(&[1, 2, 0, 3]).sign(), 1);
        assert_eq!(perm(&[1, 2, 3, 0]).sign(), -1);
        assert_eq!(perm(&[3, 0, 1, 2]).sign(), -1);
    }

    #[test]
    fn test_index_is_lexicographic_rank() {
        let all: Vec<Perm> = Perm::all(4).collect();
        assert_eq!(all.len(), 24);
        for (rank, p) in all.iter().enumerate() {
            assert_eq!(p.index(), rank as u64);
            assert_eq!(Perm::from_index(4, rank as u64).unwrap(), *p);
        }
        assert!(all.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(perm(&[3, 2, 1, 0]).index(), 23);
        assert_eq!(perm(&[1, 3, 0, 2]).index(), 10);
    }

    #[test]
    fn test_from_index_rejects_out_of_range() {
        assert_eq!(
            Perm::from_index(3, 6),
            Err(PermError::IndexOutOfRange { index: 6, size: 3 })
        );
        let last = Perm::from_index(17, factorial(17) - 1).unwrap();
        assert_eq!(last.apply(0), 16);
        assert_eq!(last.index(), factorial(17) - 1);
    }

    #[test]
    fn test_apply_tuple_and_display() {
        let p = perm(&[1, 3, 0, 2]);
        assert_eq!(p.apply_tuple(&[0, 1, 2]).as_slice(), &[1, 3, 0]);
        assert_eq!(p.to_string(), "1302");
        assert_eq!(format!("{p:?}"), "Perm(1302)");

        let big = Perm::transposition(12, 0, 11);
        assert_eq!(big.to_string(), "(11,1,2,3,4,5,6,7,8,9,10,0)");
    }

    #[test]
    fn test_serde_round_trip() {
        let p = perm(&[2, 0, 1]);
        let json = serde_json::to_string(&p).unwrap();
        assert_eq!(json, "[2,0,1]");
        let back: Perm = serde_json::from_str(&json).unwrap();
        assert_eq!(back, p);
        assert!(serde_json::from_str::<Perm>("[0,0,1]").is_err());
    }
}
