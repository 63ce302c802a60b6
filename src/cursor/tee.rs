//! ## Tee
//!
//! Broadcast one cursor into several independently advancing consumers.
//! Elements a fast consumer has seen but a slow one has not are buffered in
//! a shared ring; the ring is trimmed as the slowest open consumer advances.
//! Closing one branch does not disturb the others; the source is closed when
//! the last branch closes.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;
use crate::{STDRESULT,DYNERR};
use super::{Cursor,Error,State};

struct TeeShared<C: Cursor> {
    source: C,
    buffer: VecDeque<C::Item>,
    /// absolute index of the buffer front
    base: u64,
    /// absolute next-element index per branch, None once closed
    positions: Vec<Option<u64>>,
    source_open: bool,
    source_done: bool
}

impl<C: Cursor> TeeShared<C> where C::Item: Clone {
    fn open_source(&mut self) -> STDRESULT {
        if !self.source_open {
            self.source.open()?;
            self.source_open = true;
        }
        Ok(())
    }
    /// Clone out the element at an absolute position, pulling the source
    /// forward as needed.  None past the end of the source.
    fn element_at(&mut self,pos: u64) -> Result<Option<C::Item>,DYNERR> {
        while !self.source_done && self.base + self.buffer.len() as u64 <= pos {
            if self.source.has_next()? {
                self.buffer.push_back(self.source.next()?);
            } else {
                self.source_done = true;
            }
        }
        if pos < self.base + self.buffer.len() as u64 {
            Ok(Some(self.buffer[(pos - self.base) as usize].clone()))
        } else {
            Ok(None)
        }
    }
    /// Drop buffered elements every open branch has consumed.
    fn trim(&mut self) {
        let min_pos = self.positions.iter().flatten().min().copied();
        if let Some(min_pos) = min_pos {
            while self.base < min_pos && !self.buffer.is_empty() {
                self.buffer.pop_front();
                self.base += 1;
            }
        }
    }
    fn close_branch(&mut self,id: usize) -> STDRESULT {
        self.positions[id] = None;
        if self.positions.iter().all(|p| p.is_none()) {
            self.buffer.clear();
            if self.source_open {
                self.source.close()?;
            }
        } else {
            self.trim();
        }
        Ok(())
    }
}

/// One consumer of a tee'd source.  Obtained from `tee`.
pub struct TeeBranch<C: Cursor> {
    shared: Rc<RefCell<TeeShared<C>>>,
    id: usize,
    ahead: Option<C::Item>,
    state: State
}

/// Split a cursor into `n` independently advancing branches.
pub fn tee<C: Cursor>(source: C,n: usize) -> Vec<TeeBranch<C>> where C::Item: Clone {
    let shared = Rc::new(RefCell::new(TeeShared {
        source,
        buffer: VecDeque::new(),
        base: 0,
        positions: vec![Some(0);n],
        source_open: false,
        source_done: false
    }));
    (0..n).map(|id| TeeBranch {
        shared: shared.clone(),
        id,
        ahead: None,
        state: State::Fresh
    }).collect()
}

impl<C: Cursor> TeeBranch<C> where C::Item: Clone {
    fn fill(&mut self) -> STDRESULT {
        if self.ahead.is_none() {
            let mut shared = self.shared.borrow_mut();
            let pos = shared.positions[self.id].ok_or(Error::Closed)?;
            self.ahead = shared.element_at(pos)?;
        }
        Ok(())
    }
}

impl<C: Cursor> Cursor for TeeBranch<C> where C::Item: Clone {
    type Item = C::Item;
    fn open(&mut self) -> STDRESULT {
        if self.state == State::Fresh {
            self.shared.borrow_mut().open_source()?;
            self.state = State::Opened;
        }
        Ok(())
    }
    fn close(&mut self) -> STDRESULT {
        if self.state != State::Closed {
            self.shared.borrow_mut().close_branch(self.id)?;
            self.ahead = None;
            self.state = State::Closed;
        }
        Ok(())
    }
    fn has_next(&mut self) -> Result<bool,DYNERR> {
        self.state.demand()?;
        self.fill()?;
        Ok(self.ahead.is_some())
    }
    fn next(&mut self) -> Result<C::Item,DYNERR> {
        self.state.demand()?;
        self.fill()?;
        match self.ahead.take() {
            Some(item) => {
                let mut shared = self.shared.borrow_mut();
                if let Some(pos) = shared.positions[self.id] {
                    shared.positions[self.id] = Some(pos + 1);
                }
                shared.trim();
                Ok(item)
            },
            None => Err(Box::new(Error::Exhausted))
        }
    }
    fn peek(&mut self) -> Result<&C::Item,DYNERR> {
        self.state.demand()?;
        self.fill()?;
        match self.ahead.as_ref() {
            Some(item) => Ok(item),
            None => Err(Box::new(Error::Exhausted))
        }
    }
}
