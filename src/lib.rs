//! # `oockit` main library
//!
//! This library processes data sets that do not fit in memory.  Everything is
//! built around pull-based cursors feeding block-addressed storage, external
//! sorting, and space-filling-curve similarity joins.
//!
//! ## Architecture
//!
//! Processing is built around three trait seams:
//! * `cursor::Cursor` is a lazy pull iterator with an explicit lifecycle and
//!   optional reset/remove/update capabilities
//! * `queue::Queue` is a FIFO used both directly and as the backing store for
//!   external sort runs
//! * `join::SweepArea` is the per-input index of a sort-merge join
//!
//! When a storage object is created it takes ownership of its backing files.
//! Any changes are not permanent until the object is flushed or closed.
//!
//! ## Storage
//!
//! The `store` module provides a persistent array of fixed-size blocks split
//! across a chain of physical files (`store::colfile`), a free-extent manager
//! for variable-length allocation (`store::freelist`), integer-keyed lists of
//! fixed-width records (`store::lists`), and a write-through LRU layer above
//! the lists (`store::cache`).
//!
//! ## Sorting
//!
//! The `sort` module generates sorted runs bounded by a memory budget and
//! merges them through a loser tree, recursing when the run count exceeds the
//! fan-in.  Runs live in queues manufactured by a caller-supplied factory, so
//! the same sorter works over memory or disk.
//!
//! ## Spatial joins
//!
//! The `spatial` module supplies rectangles, points, fixed-point coordinates,
//! and variable-precision Z-codes.  The `join` module drives a generic
//! two-input sort-merge with pluggable sweep areas; `join::orenstein`
//! specializes it to Z-code prefix matching over LIFO sweep areas, and
//! `join::gess` adds bounded replication of hypercubes with reference-point
//! duplicate elimination.

pub mod cursor;
pub mod store;
pub mod queue;
pub mod sort;
pub mod spatial;
pub mod join;
pub mod stats;

type DYNERR = Box<dyn std::error::Error>;
type STDRESULT = Result<(),Box<dyn std::error::Error>>;
