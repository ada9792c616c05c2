//! General helper utilities

pub mod disjoint_sets;
pub mod printable;

pub use disjoint_sets::DisjointSets;
