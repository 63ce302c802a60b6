//! # Join Module
//!
//! A generic two-input sort-merge join with pluggable sweep areas.  Both
//! inputs must be sorted by a shared comparator.  The driver advances the
//! smaller head (ties to input 0), reorganizes the opposite sweep area with
//! the advancing element, queries it for matches, and inserts the element
//! into its own side's sweep area.  When one input runs dry the other side
//! drains through the same reorganize/query steps; insertion is skipped
//! then, since no future probe can reach it.
//!
//! `orenstein` specializes the driver to Z-code prefix matching over LIFO
//! sweep areas; `gess` composes the replicator in front of each input and
//! adds reference-point duplicate elimination.

pub mod orenstein;
pub mod gess;

use std::cmp::Ordering;
use std::collections::VecDeque;
use log::trace;
use crate::cursor::{Cursor,Error as CursorError,State};
use crate::sort::Comparator;
use crate::{STDRESULT,DYNERR};

/// Enumerates join errors.  The `Display` trait will print the equivalent
/// long message.
#[derive(thiserror::Error,Debug)]
pub enum Error {
    #[error("join input violates the sort precondition")]
    Precondition,
    #[error("invalid join configuration")]
    Config
}

/// Per-input index of currently live entries in a sort-merge join.  `id`
/// parameters name the input the triggering element came from.
pub trait SweepArea<T> {
    fn insert(&mut self,item: T) -> STDRESULT;
    /// The other input advanced to `current`; expire entries that can no
    /// longer match anything at or beyond it.
    fn reorganize(&mut self,current: &T,id: usize) -> STDRESULT;
    /// All entries matching the probe under the join predicate.
    fn query(&mut self,probe: &T,id: usize) -> Result<Vec<T>,DYNERR>;
    fn len(&self) -> usize;
}

/// The sort-merge driver.  Emits `tuple(a,b)` with `a` from input 0 and
/// `b` from input 1.
pub struct MergeJoin<T: Clone,C0,C1,S0,S1,O,F>
where C0: Cursor<Item = T>,C1: Cursor<Item = T>,S0: SweepArea<T>,S1: SweepArea<T>,F: Fn(&T,&T) -> O {
    input0: C0,
    input1: C1,
    sweep0: S0,
    sweep1: S1,
    cmp: Comparator<T>,
    tuple: F,
    out: VecDeque<O>,
    last: [Option<T>;2],
    state: State
}

impl<T: Clone,C0,C1,S0,S1,O,F> MergeJoin<T,C0,C1,S0,S1,O,F>
where C0: Cursor<Item = T>,C1: Cursor<Item = T>,S0: SweepArea<T>,S1: SweepArea<T>,F: Fn(&T,&T) -> O {
    pub fn new(input0: C0,input1: C1,sweep0: S0,sweep1: S1,cmp: Comparator<T>,tuple: F) -> Self {
        Self {
            input0,
            input1,
            sweep0,
            sweep1,
            cmp,
            tuple,
            out: VecDeque::new(),
            last: [None,None],
            state: State::Fresh
        }
    }
    /// Which input advances next: the smaller head, ties to input 0.
    fn choose(&mut self) -> Result<Option<usize>,DYNERR> {
        let h0 = self.input0.has_next()?;
        let h1 = self.input1.has_next()?;
        match (h0,h1) {
            (false,false) => Ok(None),
            (true,false) => Ok(Some(0)),
            (false,true) => Ok(Some(1)),
            (true,true) => {
                let p0 = self.input0.peek()?;
                let p1 = self.input1.peek()?;
                match (self.cmp)(p0,p1) {
                    Ordering::Greater => Ok(Some(1)),
                    _ => Ok(Some(0))
                }
            }
        }
    }
    fn check_order(&mut self,side: usize,x: &T) -> STDRESULT {
        if let Some(prev) = &self.last[side] {
            if (self.cmp)(prev,x) == Ordering::Greater {
                return Err(Box::new(Error::Precondition));
            }
        }
        self.last[side] = Some(x.clone());
        Ok(())
    }
    fn fill(&mut self) -> STDRESULT {
        while self.out.is_empty() {
            let side = match self.choose()? {
                Some(s) => s,
                None => return Ok(())
            };
            if side == 0 {
                let x = self.input0.next()?;
                self.check_order(0,&x)?;
                self.sweep1.reorganize(&x,0)?;
                for m in self.sweep1.query(&x,0)? {
                    self.out.push_back((self.tuple)(&x,&m));
                }
                if self.input1.has_next()? {
                    self.sweep0.insert(x)?;
                }
            } else {
                let x = self.input1.next()?;
                self.check_order(1,&x)?;
                self.sweep0.reorganize(&x,1)?;
                for m in self.sweep0.query(&x,1)? {
                    self.out.push_back((self.tuple)(&m,&x));
                }
                if self.input0.has_next()? {
                    self.sweep1.insert(x)?;
                }
            }
            trace!("sweep sizes {}/{}",self.sweep0.len(),self.sweep1.len());
        }
        Ok(())
    }
}

impl<T: Clone,C0,C1,S0,S1,O,F> Cursor for MergeJoin<T,C0,C1,S0,S1,O,F>
where C0: Cursor<Item = T>,C1: Cursor<Item = T>,S0: SweepArea<T>,S1: SweepArea<T>,F: Fn(&T,&T) -> O {
    type Item = O;
    fn open(&mut self) -> STDRESULT {
        if self.state == State::Fresh {
            self.input0.open()?;
            self.input1.open()?;
            self.state = State::Opened;
        }
        Ok(())
    }
    fn close(&mut self) -> STDRESULT {
        if self.state != State::Closed {
            self.input0.close()?;
            self.input1.close()?;
            self.out.clear();
            self.state = State::Closed;
        }
        Ok(())
    }
    fn has_next(&mut self) -> Result<bool,DYNERR> {
        self.state.demand()?;
        self.fill()?;
        Ok(!self.out.is_empty())
    }
    fn next(&mut self) -> Result<O,DYNERR> {
        self.state.demand()?;
        self.fill()?;
        match self.out.pop_front() {
            Some(item) => Ok(item),
            None => Err(Box::new(CursorError::Exhausted))
        }
    }
    fn peek(&mut self) -> Result<&O,DYNERR> {
        self.state.demand()?;
        self.fill()?;
        match self.out.front() {
            Some(item) => Ok(item),
            None => Err(Box::new(CursorError::Exhausted))
        }
    }
}
