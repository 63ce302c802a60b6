//! # Sort Module
//!
//! External merge sorting.  The input cursor is consumed in memory-bounded
//! runs; each run is sorted with a stable in-memory sort and staged into a
//! queue manufactured by a caller-supplied factory.  Runs are then merged
//! through a loser tree, in rounds when the run count exceeds the fan-in,
//! and the final merge is exposed lazily as a sorted cursor.
//!
//! Equal elements keep their input order: the in-memory sort is stable,
//! runs are merged in generation order, and ties between runs resolve to
//! the earlier run.

pub mod tree;

use std::cmp::Ordering;
use std::rc::Rc;
use log::debug;
use crate::cursor::{Cursor,Error as CursorError,State};
use crate::queue::Queue;
use crate::{STDRESULT,DYNERR};
use tree::LoserTree;

/// Enumerates sorter errors.  The `Display` trait will print the
/// equivalent long message.
#[derive(thiserror::Error,Debug)]
pub enum Error {
    #[error("invalid sorter configuration")]
    Config
}

pub type QueueFactory<R> = Box<dyn FnMut() -> Result<Box<dyn Queue<Item = R>>,DYNERR>>;
pub type Comparator<R> = Rc<dyn Fn(&R,&R) -> Ordering>;

pub struct MergeSorter<R> {
    cmp: Comparator<R>,
    /// total memory budget in bytes
    mem_size: usize,
    /// estimated size of one record in bytes
    object_size: usize,
    /// per-run read buffer estimate, bounds the merge fan-in
    read_buf: usize,
    /// output buffer estimate, bounds the merge fan-in
    write_buf: usize,
    factory: QueueFactory<R>,
    runs_generated: usize
}

impl<R: 'static> MergeSorter<R> {
    pub fn new(cmp: Comparator<R>,mem_size: usize,object_size: usize,read_buf: usize,write_buf: usize,factory: QueueFactory<R>) -> Result<Self,DYNERR> {
        if mem_size == 0 || object_size == 0 || object_size > mem_size || read_buf + write_buf == 0 {
            return Err(Box::new(Error::Config));
        }
        Ok(Self { cmp, mem_size, object_size, read_buf, write_buf, factory, runs_generated: 0 })
    }
    /// Runs materialized by the last `sort`, counting merge rounds.
    pub fn runs_generated(&self) -> usize {
        self.runs_generated
    }
    fn fan_in(&self) -> usize {
        (self.mem_size / (self.read_buf + self.write_buf)).max(2)
    }
    /// Consume the input and return a lazy cursor over the sorted sequence.
    pub fn sort<C: Cursor<Item = R>>(&mut self,mut input: C) -> Result<SortedCursor<R>,DYNERR> {
        self.runs_generated = 0;
        let run_len = (self.mem_size / self.object_size).max(1);
        let mut runs: Vec<Box<dyn Queue<Item = R>>> = Vec::new();
        input.open()?;
        while input.has_next()? {
            let mut batch = Vec::with_capacity(run_len);
            while batch.len() < run_len && input.has_next()? {
                batch.push(input.next()?);
            }
            let cmp = self.cmp.clone();
            batch.sort_by(|a,b| cmp(a,b));
            let mut queue = (self.factory)()?;
            queue.open()?;
            for item in batch {
                queue.enqueue(item)?;
            }
            runs.push(queue);
            self.runs_generated += 1;
        }
        input.close()?;
        debug!("generated {} runs of up to {} records",runs.len(),run_len);
        let fan_in = self.fan_in();
        while runs.len() > fan_in {
            // merge in generation-order groups so equal elements keep
            // their input order across rounds
            let mut next_round: Vec<Box<dyn Queue<Item = R>>> = Vec::new();
            while !runs.is_empty() {
                let group: Vec<Box<dyn Queue<Item = R>>> = runs.drain(0..fan_in.min(runs.len())).collect();
                if group.len() == 1 {
                    next_round.extend(group);
                } else {
                    next_round.push(self.merge_once(group)?);
                    self.runs_generated += 1;
                }
            }
            runs = next_round;
            debug!("merge round left {} runs",runs.len());
        }
        SortedCursor::new(runs,self.cmp.clone())
    }
    /// Drain a group of runs into one fresh queue.
    fn merge_once(&mut self,group: Vec<Box<dyn Queue<Item = R>>>) -> Result<Box<dyn Queue<Item = R>>,DYNERR> {
        let mut out = (self.factory)()?;
        out.open()?;
        let mut merger = SortedCursor::new(group,self.cmp.clone())?;
        merger.open()?;
        while merger.has_next()? {
            out.enqueue(merger.next()?)?;
        }
        merger.close()?;
        Ok(out)
    }
}

/// Lazy k-way merge over sorted runs.  Closing tears down every queue.
pub struct SortedCursor<R> {
    runs: Vec<Box<dyn Queue<Item = R>>>,
    heads: Vec<Option<R>>,
    tree: LoserTree,
    cmp: Comparator<R>,
    state: State
}

impl<R> SortedCursor<R> {
    fn new(runs: Vec<Box<dyn Queue<Item = R>>>,cmp: Comparator<R>) -> Result<Self,DYNERR> {
        let k = runs.len();
        Ok(Self {
            runs,
            heads: Vec::with_capacity(k),
            tree: LoserTree::build(0,&mut |_,_| false),
            cmp,
            state: State::Fresh
        })
    }
    fn refill(&mut self,leaf: usize) -> STDRESULT {
        self.heads[leaf] = match self.runs[leaf].is_empty() {
            true => None,
            false => Some(self.runs[leaf].dequeue()?)
        };
        Ok(())
    }
}

/// Exhausted runs sort after live ones; ties resolve to the earlier run.
fn run_less<R>(heads: &[Option<R>],cmp: &Comparator<R>,i: usize,j: usize) -> bool {
    match (&heads[i],&heads[j]) {
        (Some(a),Some(b)) => match cmp(a,b) {
            Ordering::Less => true,
            Ordering::Greater => false,
            Ordering::Equal => i < j
        },
        (Some(_),None) => true,
        (None,Some(_)) => false,
        (None,None) => i < j
    }
}

impl<R> Cursor for SortedCursor<R> {
    type Item = R;
    fn open(&mut self) -> STDRESULT {
        if self.state == State::Fresh {
            for i in 0..self.runs.len() {
                self.runs[i].open()?;
                self.heads.push(None);
                self.refill(i)?;
            }
            let heads = &self.heads;
            let cmp = &self.cmp;
            self.tree = LoserTree::build(self.runs.len(),&mut |i,j| run_less(heads,cmp,i,j));
            self.state = State::Opened;
        }
        Ok(())
    }
    fn close(&mut self) -> STDRESULT {
        if self.state != State::Closed {
            for run in self.runs.iter_mut() {
                run.close()?;
            }
            self.heads.clear();
            self.state = State::Closed;
        }
        Ok(())
    }
    fn has_next(&mut self) -> Result<bool,DYNERR> {
        self.state.demand()?;
        if self.runs.is_empty() {
            return Ok(false);
        }
        Ok(self.heads[self.tree.winner()].is_some())
    }
    fn next(&mut self) -> Result<R,DYNERR> {
        self.state.demand()?;
        if self.runs.is_empty() {
            return Err(Box::new(CursorError::Exhausted));
        }
        let w = self.tree.winner();
        let item = match self.heads[w].take() {
            Some(item) => item,
            None => return Err(Box::new(CursorError::Exhausted))
        };
        self.refill(w)?;
        let heads = &self.heads;
        let cmp = &self.cmp;
        self.tree.replay(w,&mut |i,j| run_less(heads,cmp,i,j));
        Ok(item)
    }
    fn peek(&mut self) -> Result<&R,DYNERR> {
        self.state.demand()?;
        if self.runs.is_empty() {
            return Err(Box::new(CursorError::Exhausted));
        }
        match self.heads[self.tree.winner()].as_ref() {
            Some(item) => Ok(item),
            None => Err(Box::new(CursorError::Exhausted))
        }
    }
}
