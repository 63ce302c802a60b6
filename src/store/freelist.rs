//! ## Free-extent manager
//!
//! Tracks maximal runs of empty blocks by length and serves best-fit
//! allocation.  Buckets are FIFO within a length, and the first length at or
//! above the request wins.  A winning extent longer than the request has its
//! tail fragment reinserted under the remaining length.  When no bucket can
//! serve, the array is extended from `last_used_block + 1`.
//!
//! Adjacent free extents are never coalesced.  Repeated fragment and
//! reallocate cycles therefore shuffle the same pointers between buckets of
//! shrinking lengths; this is harmless because allocations never overlap,
//! but callers should not expect a merged extent to reappear.
//!
//! The persisted form is a sequence of big-endian `(pointer, length)` signed
//! 64-bit pairs terminated by a pair whose pointer is −1.  `last_used_block`
//! is not persisted; the owner reseeds it from the column file size.

use std::collections::{BTreeMap,VecDeque};
use std::fs::File;
use std::path::Path;
use binrw::{BinRead,BinWrite};
use log::{debug,trace};
use crate::{STDRESULT,DYNERR};

#[derive(BinRead,BinWrite)]
#[brw(big)]
struct ExtentPair {
    pointer: i64,
    length: i64
}

const SENTINEL: i64 = -1;

pub struct EmptyBlockManager {
    /// length -> FIFO of first-block pointers
    buckets: BTreeMap<u64,VecDeque<u64>>,
    last_used_block: u64
}

impl EmptyBlockManager {
    pub fn new() -> Self {
        Self { buckets: BTreeMap::new(), last_used_block: 0 }
    }
    /// Replay a persisted extent file.  `last_used_block` must be reseeded
    /// separately by the owner.
    pub fn open(path: &Path) -> Result<Self,DYNERR> {
        let mut ans = Self::new();
        let mut file = File::open(path)?;
        loop {
            let pair = ExtentPair::read(&mut file)?;
            if pair.pointer == SENTINEL {
                break;
            }
            ans.mark_empty(pair.pointer as u64,pair.length as u64);
        }
        Ok(ans)
    }
    /// Write every extent followed by the sentinel pair.
    pub fn save(&self,path: &Path) -> STDRESULT {
        let mut file = File::create(path)?;
        for (length,deque) in self.buckets.iter() {
            for pointer in deque.iter() {
                ExtentPair { pointer: *pointer as i64, length: *length as i64 }.write(&mut file)?;
            }
        }
        ExtentPair { pointer: SENTINEL, length: 0 }.write(&mut file)?;
        Ok(())
    }
    pub fn last_used_block(&self) -> u64 {
        self.last_used_block
    }
    /// Seed the high-water mark, normally with the column file's size.
    pub fn set_last_used_block(&mut self,n: u64) {
        self.last_used_block = n;
    }
    /// Record blocks `[pointer, pointer+length)` as free.
    pub fn mark_empty(&mut self,pointer: u64,length: u64) {
        if length == 0 {
            return;
        }
        trace!("free extent ({},{})",pointer,length);
        self.buckets.entry(length).or_insert_with(VecDeque::new).push_back(pointer);
        if pointer + length - 1 > self.last_used_block {
            self.last_used_block = pointer + length - 1;
        }
    }
    /// Allocate `num_blocks` consecutive blocks and return the first.
    /// Best fit by length, FIFO within a length; the tail fragment of an
    /// oversized extent is reinserted under its remaining length.
    pub fn get_pointer(&mut self,num_blocks: u64) -> u64 {
        if num_blocks == 0 {
            return self.last_used_block + 1;
        }
        let found = self.buckets.range(num_blocks..).find(|(_,d)| !d.is_empty()).map(|(l,_)| *l);
        match found {
            Some(length) => {
                let deque = self.buckets.get_mut(&length).unwrap();
                let pointer = deque.pop_front().unwrap();
                if deque.is_empty() {
                    self.buckets.remove(&length);
                }
                if length > num_blocks {
                    self.buckets.entry(length - num_blocks).or_insert_with(VecDeque::new).push_back(pointer + num_blocks);
                }
                debug!("allocate {} blocks at {} from {}-bucket",num_blocks,pointer,length);
                pointer
            },
            None => {
                let pointer = self.last_used_block + 1;
                self.last_used_block += num_blocks;
                debug!("allocate {} blocks at {} by extension",num_blocks,pointer);
                pointer
            }
        }
    }
    /// Total free blocks on record.
    pub fn free_blocks(&self) -> u64 {
        self.buckets.iter().map(|(l,d)| l * d.len() as u64).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_then_recycle() {
        let mut mgr = EmptyBlockManager::new();
        assert_eq!(mgr.get_pointer(3),1);
        assert_eq!(mgr.get_pointer(5),4);
        mgr.mark_empty(4,5);
        assert_eq!(mgr.get_pointer(2),4);
        // the tail fragment lives in the 3-bucket now
        assert_eq!(mgr.get_pointer(2),6);
        // nothing big enough on record, extend past the high-water mark
        assert_eq!(mgr.get_pointer(10),9);
        assert_eq!(mgr.last_used_block(),18);
    }

    #[test]
    fn best_fit_prefers_smallest_sufficient_bucket() {
        let mut mgr = EmptyBlockManager::new();
        mgr.set_last_used_block(100);
        mgr.mark_empty(10,8);
        mgr.mark_empty(30,3);
        mgr.mark_empty(50,5);
        assert_eq!(mgr.get_pointer(4),50);
        assert_eq!(mgr.get_pointer(4),10);
        // fragment of the 8-extent is back under length 4
        assert_eq!(mgr.get_pointer(4),14);
        assert_eq!(mgr.get_pointer(3),30);
    }

    #[test]
    fn fifo_within_length() {
        let mut mgr = EmptyBlockManager::new();
        mgr.set_last_used_block(100);
        mgr.mark_empty(20,2);
        mgr.mark_empty(40,2);
        assert_eq!(mgr.get_pointer(2),20);
        assert_eq!(mgr.get_pointer(2),40);
    }

    #[test]
    fn no_coalescing_but_no_overlap() {
        let mut mgr = EmptyBlockManager::new();
        // adjacent frees stay separate; allocations must still be disjoint
        mgr.set_last_used_block(20);
        mgr.mark_empty(1,2);
        mgr.mark_empty(3,2);
        // a 4-block request cannot be served from the two adjacent 2-extents
        assert_eq!(mgr.get_pointer(4),21);
        let a = mgr.get_pointer(2);
        let b = mgr.get_pointer(2);
        assert!(a == 1 && b == 3);
        // repeated fragment/reallocate cycles never hand out overlap
        mgr.mark_empty(a,2);
        let c = mgr.get_pointer(1);
        let d = mgr.get_pointer(1);
        assert_eq!((c,d),(1,2));
    }

    #[test]
    fn persistence_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("free");
        let mut mgr = EmptyBlockManager::new();
        mgr.set_last_used_block(50);
        mgr.mark_empty(5,3);
        mgr.mark_empty(9,1);
        mgr.mark_empty(30,7);
        mgr.save(&path).unwrap();
        let mut back = EmptyBlockManager::open(&path).unwrap();
        back.set_last_used_block(50);
        assert_eq!(back.free_blocks(),11);
        assert_eq!(back.get_pointer(3),5);
        assert_eq!(back.get_pointer(1),9);
        assert_eq!(back.get_pointer(7),30);
    }
}
