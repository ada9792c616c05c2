//! Grouped change notification.
//!
//! Every public mutator of a [`Triangulation`] runs inside a [`ChangeSpan`]. Spans nest:
//! only when the outermost span is dropped are subscribers notified, and then at most once.
//! Callers that perform several edits and want observers to see only the final state
//! open an explicit span and perform the edits through it.
//!
//! # Examples
//!
//! ```rust
//! use std::sync::Arc;
//! use std::sync::atomic::{AtomicUsize, Ordering};
//! use simplicial::prelude::*;
//!
//! let mut tri = Triangulation::<2>::new();
//! let fired = Arc::new(AtomicUsize::new(0));
//! let counter = Arc::clone(&fired);
//! tri.subscribe(move |_| {
//!     counter.fetch_add(1, Ordering::Relaxed);
//! });
//!
//! {
//!     let mut span = tri.change_span();
//!     let a = span.new_simplex();
//!     let b = span.new_simplex();
//!     span.join(a, 0, b, Perm::identity(3)).unwrap();
//!     assert_eq!(fired.load(Ordering::Relaxed), 0);
//! }
//! assert_eq!(fired.load(Ordering::Relaxed), 1);
//! ```

use std::ops::{Deref, DerefMut};

use crate::core::triangulation::Triangulation;

/// A subscriber callback, invoked with the triangulation after each completed change.
pub type Listener<const D: usize> = Box<dyn FnMut(&Triangulation<D>) + Send + Sync>;

/// Identifier returned by [`Triangulation::subscribe`], used to unsubscribe.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(pub(crate) u64);

/// RAII guard that brackets a group of mutations into a single change notification.
///
/// The guard dereferences to the triangulation, so edits are made through it.
#[must_use = "dropping the span immediately ends it"]
pub struct ChangeSpan<'a, const D: usize> {
    tri: &'a mut Triangulation<D>,
}

impl<'a, const D: usize> ChangeSpan<'a, D> {
    pub(crate) fn new(tri: &'a mut Triangulation<D>) -> Self {
        tri.begin_span();
        Self { tri }
    }
}

impl<const D: usize> Deref for ChangeSpan<'_, D> {
    type Target = Triangulation<D>;

    fn deref(&self) -> &Triangulation<D> {
        self.tri
    }
}

impl<const D: usize> DerefMut for ChangeSpan<'_, D> {
    fn deref_mut(&mut self) -> &mut Triangulation<D> {
        self.tri
    }
}

impl<const D: usize> Drop for ChangeSpan<'_, D> {
    fn drop(&mut self) {
        self.tri.end_span();
    }
}
