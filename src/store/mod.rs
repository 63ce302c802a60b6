//! # Storage Module
//!
//! Persistent storage is layered.  At the bottom, `colfile` presents an
//! array of fixed-size blocks split across a chain of physical files.  Above
//! it, `freelist` tracks free runs of blocks and serves best-fit allocation,
//! and `lists` maps integer identifiers to ordered lists of fixed-width
//! records packed into allocated runs.  `cache` adds a write-through LRU
//! layer above `lists` so hot lists are mutated in memory and flushed in
//! bulk.
//!
//! Records are caller-defined.  The storage layer is byte-transparent: a
//! record serializes itself to exactly the store's entry width, and the
//! store neither inspects nor reorders those bytes.
//!
//! All objects in this module exclusively own their backing files and are
//! not safe for concurrent access.

pub mod colfile;
pub mod freelist;
pub mod lists;
pub mod cache;

use crate::DYNERR;

/// Enumerates storage errors.  The `Display` trait will print the
/// equivalent long message.
#[derive(thiserror::Error,Debug)]
pub enum Error {
    #[error("invalid storage parameter")]
    InvalidParameter,
    #[error("data not found")]
    DataNotFound,
    #[error("record width does not match the store")]
    Serialization
}

/// Fixed-layout serialization contract for stored records.  Every record in
/// a given store must produce exactly the store's entry width from
/// `to_bytes`.  The byte order inside a record is the implementor's
/// business.
pub trait Record: Sized {
    fn to_bytes(&self) -> Vec<u8>;
    fn from_bytes(dat: &[u8]) -> Result<Self,DYNERR>;
}

impl Record for i32 {
    fn to_bytes(&self) -> Vec<u8> {
        i32::to_be_bytes(*self).to_vec()
    }
    fn from_bytes(dat: &[u8]) -> Result<Self,DYNERR> {
        match dat.try_into() {
            Ok(arr) => Ok(i32::from_be_bytes(arr)),
            Err(_) => Err(Box::new(Error::Serialization))
        }
    }
}

impl Record for i64 {
    fn to_bytes(&self) -> Vec<u8> {
        i64::to_be_bytes(*self).to_vec()
    }
    fn from_bytes(dat: &[u8]) -> Result<Self,DYNERR> {
        match dat.try_into() {
            Ok(arr) => Ok(i64::from_be_bytes(arr)),
            Err(_) => Err(Box::new(Error::Serialization))
        }
    }
}

impl Record for u64 {
    fn to_bytes(&self) -> Vec<u8> {
        u64::to_be_bytes(*self).to_vec()
    }
    fn from_bytes(dat: &[u8]) -> Result<Self,DYNERR> {
        match dat.try_into() {
            Ok(arr) => Ok(u64::from_be_bytes(arr)),
            Err(_) => Err(Box::new(Error::Serialization))
        }
    }
}

impl Record for f64 {
    fn to_bytes(&self) -> Vec<u8> {
        f64::to_be_bytes(*self).to_vec()
    }
    fn from_bytes(dat: &[u8]) -> Result<Self,DYNERR> {
        match dat.try_into() {
            Ok(arr) => Ok(f64::from_be_bytes(arr)),
            Err(_) => Err(Box::new(Error::Serialization))
        }
    }
}

impl<const N: usize> Record for [u8;N] {
    fn to_bytes(&self) -> Vec<u8> {
        self.to_vec()
    }
    fn from_bytes(dat: &[u8]) -> Result<Self,DYNERR> {
        match dat.try_into() {
            Ok(arr) => Ok(arr),
            Err(_) => Err(Box::new(Error::Serialization))
        }
    }
}
