//! ## Buffered list storage
//!
//! A write-through LRU layer above the persistent list store.  Hot lists
//! live in memory; a replaced or appended list is only marked dirty, and
//! dirty lists reach the store in bulk.  Evicting a dirty entry triggers a
//! flush of the whole cache first, which is cheaper than per-entry flushing
//! on block-aligned storage.
//!
//! Operations that expose the durable state (`entry_set`, `size_in_bytes`,
//! `close`, `delete`) flush implicitly.

use std::collections::HashMap;
use std::path::Path;
use log::{debug,trace};
use crate::stats::{Counter,StatCenter,maybe_count};
use crate::{STDRESULT,DYNERR};
use super::lists::ListFile;
use super::{Error,Record};

#[derive(Clone,Copy,PartialEq,Eq,Debug)]
enum SlotState {
    Read,
    Write
}

struct Slot<R> {
    list: Vec<R>,
    state: SlotState
}

pub struct BufferedListFile<R: Record + Clone> {
    store: ListFile<R>,
    cache: HashMap<i32,Slot<R>>,
    /// least recent at the front
    lru: Vec<i32>,
    cache_size: usize,
    loads: Counter,
    stores: Counter
}

impl<R: Record + Clone> BufferedListFile<R> {
    pub fn create(prefix: &Path,block_size: usize,blocks_per_file: u64,entry_size: usize,cache_size: usize,center: Option<&dyn StatCenter>) -> Result<Self,DYNERR> {
        if cache_size == 0 {
            return Err(Box::new(Error::InvalidParameter));
        }
        let store = ListFile::create(prefix,block_size,blocks_per_file,entry_size,center)?;
        Ok(Self::wrap(store,prefix,cache_size,center))
    }
    pub fn open(prefix: &Path,block_size: usize,blocks_per_file: u64,entry_size: usize,cache_size: usize,center: Option<&dyn StatCenter>) -> Result<Self,DYNERR> {
        if cache_size == 0 {
            return Err(Box::new(Error::InvalidParameter));
        }
        let store = ListFile::open(prefix,block_size,blocks_per_file,entry_size,center)?;
        Ok(Self::wrap(store,prefix,cache_size,center))
    }
    fn wrap(store: ListFile<R>,prefix: &Path,cache_size: usize,center: Option<&dyn StatCenter>) -> Self {
        let stem = prefix.file_name().map(|s| s.to_string_lossy().to_string()).unwrap_or_default();
        Self {
            store,
            cache: HashMap::new(),
            lru: Vec::new(),
            cache_size,
            loads: maybe_count(center,&format!("{}_lists_loaded",stem)),
            stores: maybe_count(center,&format!("{}_lists_stored",stem))
        }
    }
    fn touch(&mut self,list_id: i32) {
        self.lru.retain(|id| *id != list_id);
        self.lru.push(list_id);
    }
    /// Make room for one more entry, flushing the whole cache before any
    /// dirty entry is evicted.
    fn make_room(&mut self) -> STDRESULT {
        while self.cache.len() >= self.cache_size {
            let victim = match self.lru.first() {
                Some(id) => *id,
                None => return Ok(())
            };
            if self.cache.get(&victim).map(|s| s.state) == Some(SlotState::Write) {
                debug!("dirty eviction of list {}, flushing cache",victim);
                self.flush()?;
            }
            self.cache.remove(&victim);
            self.lru.retain(|id| *id != victim);
            trace!("evict list {}",victim);
        }
        Ok(())
    }
    /// Load a list into the cache if it exists anywhere; returns whether it
    /// is now cached.
    fn materialize(&mut self,list_id: i32) -> Result<bool,DYNERR> {
        if self.cache.contains_key(&list_id) {
            return Ok(true);
        }
        match self.store.get_list(list_id)? {
            Some(list) => {
                self.loads.inc();
                self.make_room()?;
                self.cache.insert(list_id,Slot { list, state: SlotState::Read });
                self.touch(list_id);
                Ok(true)
            },
            None => Ok(false)
        }
    }
    /// The list, from memory when cached.  None when the id is unknown.
    pub fn get_list(&mut self,list_id: i32) -> Result<Option<Vec<R>>,DYNERR> {
        if self.materialize(list_id)? {
            self.touch(list_id);
            return Ok(Some(self.cache.get(&list_id).unwrap().list.clone()));
        }
        Ok(None)
    }
    /// Replace or create the list in memory; the store is updated on flush.
    pub fn put_list(&mut self,list_id: i32,list: Vec<R>) -> STDRESULT {
        if !self.cache.contains_key(&list_id) {
            self.make_room()?;
        }
        self.cache.insert(list_id,Slot { list, state: SlotState::Write });
        self.touch(list_id);
        Ok(())
    }
    /// Append one record.  With `unique` set, a record equal to an existing
    /// one is silently dropped.
    pub fn add_entry(&mut self,list_id: i32,record: R,unique: bool) -> STDRESULT where R: PartialEq {
        if !self.materialize(list_id)? {
            self.make_room()?;
            self.cache.insert(list_id,Slot { list: Vec::new(), state: SlotState::Write });
        }
        self.touch(list_id);
        let slot = self.cache.get_mut(&list_id).unwrap();
        if unique && slot.list.iter().any(|r| *r == record) {
            return Ok(());
        }
        slot.list.push(record);
        slot.state = SlotState::Write;
        Ok(())
    }
    /// Drop the list from the cache and the store.
    pub fn remove(&mut self,list_id: i32) -> STDRESULT {
        let cached = self.cache.remove(&list_id);
        self.lru.retain(|id| *id != list_id);
        if self.store.contains(list_id) {
            self.store.remove(list_id)?;
        } else if cached.is_none() {
            return Err(Box::new(Error::DataNotFound));
        }
        Ok(())
    }
    pub fn get_list_size(&mut self,list_id: i32) -> Option<u64> {
        match self.cache.get(&list_id) {
            Some(slot) => Some(slot.list.len() as u64),
            None => self.store.get_list_size(list_id)
        }
    }
    pub fn contains(&self,list_id: i32) -> bool {
        self.cache.contains_key(&list_id) || self.store.contains(list_id)
    }
    pub fn ids(&self) -> Vec<i32> {
        let mut ans = self.store.ids();
        for id in self.cache.keys() {
            if !ans.contains(id) {
                ans.push(*id);
            }
        }
        ans.sort();
        ans
    }
    pub fn largest_id(&self) -> Option<i32> {
        self.ids().into_iter().max()
    }
    /// Write every dirty list to the store and downgrade it to clean.
    pub fn flush(&mut self) -> STDRESULT {
        let mut dirty: Vec<i32> = self.cache.iter().filter(|(_,s)| s.state == SlotState::Write).map(|(id,_)| *id).collect();
        dirty.sort();
        for id in dirty {
            let list = self.cache.get(&id).unwrap().list.clone();
            self.store.put_list(id,&list)?;
            self.stores.inc();
            self.cache.get_mut(&id).unwrap().state = SlotState::Read;
        }
        self.store.flush()
    }
    /// Snapshot of every list, flushed first.
    pub fn entry_set(&mut self) -> Result<Vec<(i32,Vec<R>)>,DYNERR> {
        self.flush()?;
        self.store.entry_set()
    }
    /// Total durable payload bytes, flushed first.
    pub fn size_in_bytes(&mut self) -> Result<u64,DYNERR> {
        self.flush()?;
        let mut ans = 0;
        for id in self.store.ids() {
            ans += self.store.get_list_size(id).unwrap_or(0) * self.store.entry_size() as u64;
        }
        Ok(ans)
    }
    pub fn close(&mut self) -> STDRESULT {
        self.flush()?;
        self.store.close()
    }
    /// Flush, close, and delete every backing file.
    pub fn delete(mut self) -> STDRESULT {
        self.flush()?;
        self.store.delete()
    }
}
