//! ## Persistent list storage
//!
//! Maps an integer list identifier to an ordered list of fixed-width
//! records.  Lists are packed into runs of consecutive blocks allocated
//! from the free-extent manager.  A run starts with a 16-byte header
//! `(num_blocks, num_entries)`, ends with an 8-byte forward pointer to the
//! next run (−1 terminates the chain), and packs records densely in
//! between.  Replacing a list reuses the existing chain in place when the
//! new contents fit its total capacity, otherwise the chain is freed and a
//! fresh run is allocated.
//!
//! The `list_id -> head run` directory and the free extents are persisted
//! in side files `<prefix>.dir` and `<prefix>.free`; both use the sentinel
//! convention of the free-extent layout.
//!
//! The block size must leave room for a run header and trailer; anything
//! below 32 bytes is refused.

use std::collections::BTreeMap;
use std::fs::File;
use std::marker::PhantomData;
use std::path::{Path,PathBuf};
use binrw::{BinRead,BinWrite};
use log::{debug,info,trace};
use crate::cursor::wrappers::VecCursor;
use crate::stats::StatCenter;
use crate::{STDRESULT,DYNERR};
use super::colfile::BlockColumnFile;
use super::freelist::EmptyBlockManager;
use super::{Error,Record};

const RUN_HEADER: usize = 16;
const RUN_TRAILER: usize = 8;
const NO_NEXT: i64 = -1;
const MIN_BLOCK_SIZE: usize = 32;

#[derive(BinRead,BinWrite)]
#[brw(big)]
struct DirEntry {
    id: i32,
    head: i64,
    entries: i64
}

const DIR_SENTINEL: i32 = -1;

#[derive(Clone,Copy)]
struct ListHead {
    head: u64,
    entries: u64
}

/// One run of consecutive blocks belonging to a list chain.
struct Run {
    pointer: u64,
    num_blocks: u64,
    num_entries: u64,
    bytes: Vec<u8>
}

impl Run {
    fn next(&self) -> i64 {
        let n = self.bytes.len();
        i64::from_be_bytes(self.bytes[n-RUN_TRAILER..].try_into().unwrap())
    }
}

pub struct ListFile<R: Record> {
    col: BlockColumnFile,
    free: EmptyBlockManager,
    entry_size: usize,
    block_size: usize,
    directory: BTreeMap<i32,ListHead>,
    prefix: PathBuf,
    _marker: PhantomData<R>
}

impl<R: Record> ListFile<R> {
    pub fn create(prefix: &Path,block_size: usize,blocks_per_file: u64,entry_size: usize,center: Option<&dyn StatCenter>) -> Result<Self,DYNERR> {
        if entry_size == 0 || block_size < MIN_BLOCK_SIZE {
            return Err(Box::new(Error::InvalidParameter));
        }
        let col = BlockColumnFile::create(prefix,block_size,blocks_per_file,center)?;
        Ok(Self {
            col,
            free: EmptyBlockManager::new(),
            entry_size,
            block_size,
            directory: BTreeMap::new(),
            prefix: prefix.to_path_buf(),
            _marker: PhantomData
        })
    }
    /// Reopen a persisted store.  Geometry and entry width come from the
    /// caller, the directory and free extents from the side files.
    pub fn open(prefix: &Path,block_size: usize,blocks_per_file: u64,entry_size: usize,center: Option<&dyn StatCenter>) -> Result<Self,DYNERR> {
        if entry_size == 0 || block_size < MIN_BLOCK_SIZE {
            return Err(Box::new(Error::InvalidParameter));
        }
        let col = BlockColumnFile::open(prefix,block_size,blocks_per_file,center)?;
        let free_path = Self::side_path(prefix,"free");
        let mut free = match free_path.exists() {
            true => EmptyBlockManager::open(&free_path)?,
            false => EmptyBlockManager::new()
        };
        // the trailing physical file is sized to the highest block ever
        // written, so the recovered size is the exact high-water mark and
        // extension allocations resume right after it
        if col.size() > free.last_used_block() {
            free.set_last_used_block(col.size());
        }
        let mut directory = BTreeMap::new();
        let dir_path = Self::side_path(prefix,"dir");
        if dir_path.exists() {
            let mut file = File::open(&dir_path)?;
            loop {
                let ent = DirEntry::read(&mut file)?;
                if ent.id == DIR_SENTINEL {
                    break;
                }
                directory.insert(ent.id,ListHead { head: ent.head as u64, entries: ent.entries as u64 });
            }
        }
        info!("open list store {} with {} lists",prefix.display(),directory.len());
        Ok(Self {
            col,
            free,
            entry_size,
            block_size,
            directory,
            prefix: prefix.to_path_buf(),
            _marker: PhantomData
        })
    }
    fn side_path(prefix: &Path,ext: &str) -> PathBuf {
        let mut name = prefix.as_os_str().to_os_string();
        name.push(format!(".{}",ext));
        PathBuf::from(name)
    }
    /// Records one run can hold.
    fn capacity(&self,num_blocks: u64) -> u64 {
        ((num_blocks as usize * self.block_size - RUN_HEADER - RUN_TRAILER) / self.entry_size) as u64
    }
    /// Blocks needed for a run holding `entries` records.
    fn blocks_for(&self,entries: u64) -> u64 {
        let bytes = entries as usize * self.entry_size + RUN_HEADER + RUN_TRAILER;
        ((bytes + self.block_size - 1) / self.block_size) as u64
    }
    fn read_run(&mut self,pointer: u64) -> Result<Run,DYNERR> {
        let mut first = vec![0;self.block_size];
        self.col.select(pointer,&mut first)?;
        let num_blocks = i64::from_be_bytes(first[0..8].try_into().unwrap()) as u64;
        let num_entries = i64::from_be_bytes(first[8..16].try_into().unwrap()) as u64;
        let mut bytes = vec![0;num_blocks as usize * self.block_size];
        bytes[0..self.block_size].copy_from_slice(&first);
        for i in 1..num_blocks {
            let start = i as usize * self.block_size;
            self.col.select(pointer + i,&mut bytes[start..start+self.block_size])?;
        }
        trace!("read run at {} ({} blocks, {} entries)",pointer,num_blocks,num_entries);
        Ok(Run { pointer, num_blocks, num_entries, bytes })
    }
    fn write_run(&mut self,run: &Run) -> STDRESULT {
        for i in 0..run.num_blocks {
            let start = i as usize * self.block_size;
            self.col.insert(run.pointer + i,&run.bytes[start..start+self.block_size])?;
        }
        trace!("write run at {} ({} blocks, {} entries)",run.pointer,run.num_blocks,run.num_entries);
        Ok(())
    }
    /// Assemble a run image from serialized entries.
    fn build_run(&self,pointer: u64,num_blocks: u64,entries: &[Vec<u8>],next: i64) -> Run {
        let mut bytes = vec![0;num_blocks as usize * self.block_size];
        bytes[0..8].copy_from_slice(&i64::to_be_bytes(num_blocks as i64));
        bytes[8..16].copy_from_slice(&i64::to_be_bytes(entries.len() as i64));
        let mut off = RUN_HEADER;
        for ent in entries {
            bytes[off..off+self.entry_size].copy_from_slice(ent);
            off += self.entry_size;
        }
        let n = bytes.len();
        bytes[n-RUN_TRAILER..].copy_from_slice(&i64::to_be_bytes(next));
        Run { pointer, num_blocks, num_entries: entries.len() as u64, bytes }
    }
    fn serialize(&self,records: &[R]) -> Result<Vec<Vec<u8>>,DYNERR> {
        let mut ans = Vec::with_capacity(records.len());
        for rec in records {
            let bytes = rec.to_bytes();
            if bytes.len() != self.entry_size {
                return Err(Box::new(Error::Serialization));
            }
            ans.push(bytes);
        }
        Ok(ans)
    }
    /// Walk a chain and return every run.
    fn chain(&mut self,head: u64) -> Result<Vec<Run>,DYNERR> {
        let mut ans = Vec::new();
        let mut pointer = head as i64;
        while pointer != NO_NEXT {
            let run = self.read_run(pointer as u64)?;
            pointer = run.next();
            ans.push(run);
        }
        Ok(ans)
    }
    /// The stored list, or None when the id is unknown.
    pub fn get_list(&mut self,list_id: i32) -> Result<Option<Vec<R>>,DYNERR> {
        let head = match self.directory.get(&list_id) {
            Some(h) => *h,
            None => return Ok(None)
        };
        let mut ans = Vec::with_capacity(head.entries as usize);
        for run in self.chain(head.head)? {
            for i in 0..run.num_entries as usize {
                let off = RUN_HEADER + i * self.entry_size;
                ans.push(R::from_bytes(&run.bytes[off..off+self.entry_size])?);
            }
        }
        Ok(Some(ans))
    }
    /// Cursor over the stored list, or None when the id is unknown.
    pub fn get_entries(&mut self,list_id: i32) -> Result<Option<VecCursor<R>>,DYNERR> where R: Clone {
        Ok(self.get_list(list_id)?.map(VecCursor::new))
    }
    /// Replace or create the list.  The existing chain is reused in place
    /// when the new contents fit its total capacity.
    pub fn put_list(&mut self,list_id: i32,records: &[R]) -> STDRESULT {
        let entries = self.serialize(records)?;
        if let Some(head) = self.directory.get(&list_id).copied() {
            let runs = self.chain(head.head)?;
            let total_cap: u64 = runs.iter().map(|r| self.capacity(r.num_blocks)).sum();
            if entries.len() as u64 <= total_cap {
                debug!("list {} rewritten in place",list_id);
                let mut rest = entries.as_slice();
                for old in runs {
                    let take = (self.capacity(old.num_blocks) as usize).min(rest.len());
                    let run = self.build_run(old.pointer,old.num_blocks,&rest[0..take],old.next());
                    self.write_run(&run)?;
                    rest = &rest[take..];
                }
                self.directory.insert(list_id,ListHead { head: head.head, entries: records.len() as u64 });
                return Ok(());
            }
            for old in runs {
                self.free.mark_empty(old.pointer,old.num_blocks);
            }
        }
        let num_blocks = self.blocks_for(entries.len() as u64);
        let pointer = self.free.get_pointer(num_blocks);
        let run = self.build_run(pointer,num_blocks,&entries,NO_NEXT);
        self.write_run(&run)?;
        debug!("list {} placed at {} ({} blocks)",list_id,pointer,num_blocks);
        self.directory.insert(list_id,ListHead { head: pointer, entries: records.len() as u64 });
        Ok(())
    }
    /// Append one record, growing the chain by a new run when the tail run
    /// is full.
    pub fn add_entry(&mut self,list_id: i32,record: &R) -> STDRESULT {
        let bytes = record.to_bytes();
        if bytes.len() != self.entry_size {
            return Err(Box::new(Error::Serialization));
        }
        let head = match self.directory.get(&list_id).copied() {
            Some(h) => h,
            None => return self.put_list(list_id,std::slice::from_ref(record))
        };
        let mut runs = self.chain(head.head)?;
        let tail = runs.last_mut().unwrap();
        if tail.num_entries < self.capacity(tail.num_blocks) {
            let off = RUN_HEADER + tail.num_entries as usize * self.entry_size;
            tail.bytes[off..off+self.entry_size].copy_from_slice(&bytes);
            tail.num_entries += 1;
            tail.bytes[8..16].copy_from_slice(&i64::to_be_bytes(tail.num_entries as i64));
            let tail = runs.pop().unwrap();
            self.write_run(&tail)?;
        } else {
            let num_blocks = self.blocks_for(1);
            let pointer = self.free.get_pointer(num_blocks);
            let fresh = self.build_run(pointer,num_blocks,std::slice::from_ref(&bytes),NO_NEXT);
            self.write_run(&fresh)?;
            // relink the old tail to the fresh run
            let n = tail.bytes.len();
            tail.bytes[n-RUN_TRAILER..].copy_from_slice(&i64::to_be_bytes(pointer as i64));
            let tail = runs.pop().unwrap();
            self.write_run(&tail)?;
            debug!("list {} grew a run at {}",list_id,pointer);
        }
        self.directory.insert(list_id,ListHead { head: head.head, entries: head.entries + 1 });
        Ok(())
    }
    /// Free every run of the list.
    pub fn remove(&mut self,list_id: i32) -> STDRESULT {
        let head = match self.directory.remove(&list_id) {
            Some(h) => h,
            None => return Err(Box::new(Error::DataNotFound))
        };
        for run in self.chain(head.head)? {
            self.free.mark_empty(run.pointer,run.num_blocks);
        }
        info!("list {} removed",list_id);
        Ok(())
    }
    pub fn get_list_size(&self,list_id: i32) -> Option<u64> {
        self.directory.get(&list_id).map(|h| h.entries)
    }
    pub fn ids(&self) -> Vec<i32> {
        self.directory.keys().copied().collect()
    }
    pub fn largest_id(&self) -> Option<i32> {
        self.directory.keys().max().copied()
    }
    pub fn contains(&self,list_id: i32) -> bool {
        self.directory.contains_key(&list_id)
    }
    /// Every list in the store, materialized.
    pub fn entry_set(&mut self) -> Result<Vec<(i32,Vec<R>)>,DYNERR> {
        let ids = self.ids();
        let mut ans = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(list) = self.get_list(id)? {
                ans.push((id,list));
            }
        }
        Ok(ans)
    }
    pub fn entry_size(&self) -> usize {
        self.entry_size
    }
    /// Persist the directory and free extents.
    pub fn flush(&mut self) -> STDRESULT {
        let mut file = File::create(Self::side_path(&self.prefix,"dir"))?;
        for (id,head) in self.directory.iter() {
            DirEntry { id: *id, head: head.head as i64, entries: head.entries as i64 }.write(&mut file)?;
        }
        DirEntry { id: DIR_SENTINEL, head: 0, entries: 0 }.write(&mut file)?;
        self.free.save(&Self::side_path(&self.prefix,"free"))?;
        Ok(())
    }
    pub fn close(&mut self) -> STDRESULT {
        self.flush()?;
        self.col.close()
    }
    /// Close and delete every backing file.
    pub fn delete(mut self) -> STDRESULT {
        self.col.close()?;
        for ext in ["dir","free"] {
            let path = Self::side_path(&self.prefix,ext);
            if path.exists() {
                std::fs::remove_file(&path)?;
            }
        }
        self.col.delete()
    }
}
