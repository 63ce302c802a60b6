//! ## File-backed queue
//!
//! Frames variable-length records over a block column file.  The queue is a
//! byte stream: each record is written as a big-endian `u32` length prefix
//! followed by its payload, and the stream is packed into blocks.  Every
//! block starts with a frame header naming its kind: `Data` when the first
//! payload byte begins a record, `Spill` when it continues a record begun
//! in an earlier block.  Only full blocks are flushed; the stream tail stays
//! in memory, so a reader that catches up with the writer is served from
//! memory without a disk round trip.
//!
//! The element count lives in memory only.  Runs are write-once read-once
//! within a process, and `close` deletes the backing files.

use std::collections::VecDeque;
use std::io::Cursor as IoCursor;
use std::marker::PhantomData;
use std::path::Path;
use binrw::{BinRead,BinWrite};
use num_derive::FromPrimitive;
use num_traits::FromPrimitive;
use log::trace;
use crate::stats::StatCenter;
use crate::store::colfile::BlockColumnFile;
use crate::store::Record;
use crate::{STDRESULT,DYNERR};
use super::{Error,Queue};

/// On-disk block type code.
#[derive(FromPrimitive,Clone,Copy,PartialEq,Eq,Debug)]
pub enum FrameKind {
    Data = 1,
    Spill = 2
}

#[derive(BinRead,BinWrite)]
#[brw(big)]
struct FrameHeader {
    kind: u8,
    used: u16
}

const HEADER_LEN: usize = 3;
const LEN_PREFIX: usize = 4;

pub struct BlockFileQueue<R: Record> {
    col: Option<BlockColumnFile>,
    block_size: usize,
    /// stream bytes not yet flushed to disk
    tail: VecDeque<u8>,
    /// record start offsets not yet flushed
    starts: VecDeque<u64>,
    /// total stream bytes enqueued
    written: u64,
    /// stream offset of the next unread byte
    read_pos: u64,
    /// blocks flushed so far
    blocks: u64,
    /// cached read block (1-based id, payload bytes)
    read_cache: Option<(u64,Vec<u8>)>,
    ahead: Option<R>,
    count: usize
}

impl<R: Record> BlockFileQueue<R> {
    pub fn create(prefix: &Path,block_size: usize,blocks_per_file: u64,center: Option<&dyn StatCenter>) -> Result<Self,DYNERR> {
        if block_size <= HEADER_LEN + LEN_PREFIX {
            return Err(Box::new(crate::store::Error::InvalidParameter));
        }
        let col = BlockColumnFile::create(prefix,block_size,blocks_per_file,center)?;
        Ok(Self {
            col: Some(col),
            block_size,
            tail: VecDeque::new(),
            starts: VecDeque::new(),
            written: 0,
            read_pos: 0,
            blocks: 0,
            read_cache: None,
            ahead: None,
            count: 0
        })
    }
    fn payload_cap(&self) -> usize {
        self.block_size - HEADER_LEN
    }
    /// Flush full blocks out of the stream tail.
    fn flush_full_blocks(&mut self) -> STDRESULT {
        let cap = self.payload_cap();
        while self.tail.len() >= cap {
            let block_start = self.blocks * cap as u64;
            while self.starts.front().map(|s| *s < block_start) == Some(true) {
                self.starts.pop_front();
            }
            // the head either begins a record or continues one from an
            // earlier block
            let kind = match self.starts.front() {
                Some(s) if *s == block_start => FrameKind::Data,
                _ => FrameKind::Spill
            };
            let mut bytes = Vec::with_capacity(self.block_size);
            let mut hdr = IoCursor::new(&mut bytes);
            FrameHeader { kind: kind as u8, used: cap as u16 }.write(&mut hdr)?;
            for _i in 0..cap {
                bytes.push(self.tail.pop_front().unwrap());
            }
            self.blocks += 1;
            trace!("flush queue block {} ({:?})",self.blocks,kind);
            self.col.as_mut().unwrap().insert(self.blocks,&bytes)?;
        }
        Ok(())
    }
    /// Copy `n` stream bytes starting at `read_pos`, from disk blocks or
    /// the in-memory tail.
    fn read_bytes(&mut self,n: usize) -> Result<Vec<u8>,DYNERR> {
        let cap = self.payload_cap();
        let mut ans = Vec::with_capacity(n);
        while ans.len() < n {
            let frontier = self.blocks * cap as u64;
            if self.read_pos < frontier {
                let block_id = self.read_pos / cap as u64 + 1;
                let off = (self.read_pos % cap as u64) as usize;
                let stale = match &self.read_cache {
                    Some((id,_)) => *id != block_id,
                    None => true
                };
                if stale {
                    let mut bytes = vec![0;self.block_size];
                    self.col.as_mut().unwrap().select(block_id,&mut bytes)?;
                    let mut rdr = IoCursor::new(&bytes[0..HEADER_LEN]);
                    let hdr = FrameHeader::read(&mut rdr)?;
                    if FrameKind::from_u8(hdr.kind).is_none() || hdr.used as usize != cap {
                        return Err(Box::new(Error::BadFrame));
                    }
                    self.read_cache = Some((block_id,bytes[HEADER_LEN..].to_vec()));
                }
                let payload = &self.read_cache.as_ref().unwrap().1;
                let take = (n - ans.len()).min(cap - off);
                ans.extend_from_slice(&payload[off..off+take]);
                self.read_pos += take as u64;
            } else {
                let off = (self.read_pos - frontier) as usize;
                if off >= self.tail.len() {
                    return Err(Box::new(Error::Empty));
                }
                let take = (n - ans.len()).min(self.tail.len() - off);
                for i in 0..take {
                    ans.push(self.tail[off+i]);
                }
                self.read_pos += take as u64;
            }
        }
        Ok(ans)
    }
    fn fill_ahead(&mut self) -> STDRESULT {
        if self.ahead.is_none() && self.count > 0 {
            let len_bytes = self.read_bytes(LEN_PREFIX)?;
            let len = u32::from_be_bytes(len_bytes.try_into().unwrap()) as usize;
            let payload = self.read_bytes(len)?;
            self.ahead = Some(R::from_bytes(&payload)?);
        }
        Ok(())
    }
}

impl<R: Record> Queue for BlockFileQueue<R> {
    type Item = R;
    fn open(&mut self) -> STDRESULT {
        Ok(())
    }
    fn close(&mut self) -> STDRESULT {
        self.tail.clear();
        self.read_cache = None;
        self.ahead = None;
        self.count = 0;
        if let Some(col) = self.col.take() {
            col.delete()?;
        }
        Ok(())
    }
    fn enqueue(&mut self,item: R) -> STDRESULT {
        let payload = item.to_bytes();
        self.starts.push_back(self.written);
        self.tail.extend(u32::to_be_bytes(payload.len() as u32));
        self.tail.extend(payload.iter());
        self.written += (LEN_PREFIX + payload.len()) as u64;
        self.count += 1;
        self.flush_full_blocks()
    }
    fn dequeue(&mut self) -> Result<R,DYNERR> {
        self.fill_ahead()?;
        match self.ahead.take() {
            Some(item) => {
                self.count -= 1;
                Ok(item)
            },
            None => Err(Box::new(Error::Empty))
        }
    }
    fn peek(&mut self) -> Result<&R,DYNERR> {
        self.fill_ahead()?;
        match self.ahead.as_ref() {
            Some(item) => Ok(item),
            None => Err(Box::new(Error::Empty))
        }
    }
    fn len(&self) -> usize {
        self.count
    }
}
