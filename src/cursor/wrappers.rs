//! ## Cursor wrappers
//!
//! The wrappers in this module lift ordinary values, slices, iterators, and
//! queues into the cursor protocol, and combine cursors into new ones
//! (concatenation, mapping, filtering).  All of them are ordinary state
//! structs; none spawns work ahead of demand.

use std::collections::VecDeque;
use std::marker::PhantomData;
use crate::queue::Queue;
use crate::{STDRESULT,DYNERR};
use super::{Cursor,Error,State};

/// Cursor over nothing at all.
pub struct EmptyCursor<T> {
    state: State,
    _marker: PhantomData<T>
}

impl<T> EmptyCursor<T> {
    pub fn new() -> Self {
        Self { state: State::Fresh, _marker: PhantomData }
    }
}

impl<T> Cursor for EmptyCursor<T> {
    type Item = T;
    fn open(&mut self) -> STDRESULT {
        if self.state == State::Fresh {
            self.state = State::Opened;
        }
        Ok(())
    }
    fn close(&mut self) -> STDRESULT {
        self.state = State::Closed;
        Ok(())
    }
    fn has_next(&mut self) -> Result<bool,DYNERR> {
        self.state.demand()?;
        Ok(false)
    }
    fn next(&mut self) -> Result<T,DYNERR> {
        self.state.demand()?;
        Err(Box::new(Error::Exhausted))
    }
    fn peek(&mut self) -> Result<&T,DYNERR> {
        self.state.demand()?;
        Err(Box::new(Error::Exhausted))
    }
    fn reset(&mut self) -> STDRESULT {
        self.state.demand()
    }
    fn supports_reset(&self) -> bool {
        true
    }
}

/// Cursor over exactly one element.
pub struct SingleCursor<T: Clone> {
    item: T,
    taken: bool,
    state: State
}

impl<T: Clone> SingleCursor<T> {
    pub fn new(item: T) -> Self {
        Self { item, taken: false, state: State::Fresh }
    }
}

impl<T: Clone> Cursor for SingleCursor<T> {
    type Item = T;
    fn open(&mut self) -> STDRESULT {
        if self.state == State::Fresh {
            self.state = State::Opened;
        }
        Ok(())
    }
    fn close(&mut self) -> STDRESULT {
        self.state = State::Closed;
        Ok(())
    }
    fn has_next(&mut self) -> Result<bool,DYNERR> {
        self.state.demand()?;
        Ok(!self.taken)
    }
    fn next(&mut self) -> Result<T,DYNERR> {
        self.state.demand()?;
        if self.taken {
            return Err(Box::new(Error::Exhausted));
        }
        self.taken = true;
        Ok(self.item.clone())
    }
    fn peek(&mut self) -> Result<&T,DYNERR> {
        self.state.demand()?;
        if self.taken {
            return Err(Box::new(Error::Exhausted));
        }
        Ok(&self.item)
    }
    fn reset(&mut self) -> STDRESULT {
        self.state.demand()?;
        self.taken = false;
        Ok(())
    }
    fn supports_reset(&self) -> bool {
        true
    }
}

/// Cursor over a borrowed slice.  Elements are cloned out on demand.
pub struct SliceCursor<'a,T: Clone> {
    items: &'a [T],
    pos: usize,
    state: State
}

impl<'a,T: Clone> SliceCursor<'a,T> {
    pub fn new(items: &'a [T]) -> Self {
        Self { items, pos: 0, state: State::Fresh }
    }
}

impl<'a,T: Clone> Cursor for SliceCursor<'a,T> {
    type Item = T;
    fn open(&mut self) -> STDRESULT {
        if self.state == State::Fresh {
            self.state = State::Opened;
        }
        Ok(())
    }
    fn close(&mut self) -> STDRESULT {
        self.state = State::Closed;
        Ok(())
    }
    fn has_next(&mut self) -> Result<bool,DYNERR> {
        self.state.demand()?;
        Ok(self.pos < self.items.len())
    }
    fn next(&mut self) -> Result<T,DYNERR> {
        self.state.demand()?;
        if self.pos >= self.items.len() {
            return Err(Box::new(Error::Exhausted));
        }
        self.pos += 1;
        Ok(self.items[self.pos-1].clone())
    }
    fn peek(&mut self) -> Result<&T,DYNERR> {
        self.state.demand()?;
        if self.pos >= self.items.len() {
            return Err(Box::new(Error::Exhausted));
        }
        Ok(&self.items[self.pos])
    }
    fn reset(&mut self) -> STDRESULT {
        self.state.demand()?;
        self.pos = 0;
        Ok(())
    }
    fn supports_reset(&self) -> bool {
        true
    }
}

/// Cursor owning a vector, with removal and update of the element last
/// returned.  This is the fully capable reference implementation of the
/// protocol.
pub struct VecCursor<T: Clone> {
    items: Vec<T>,
    pos: usize,
    /// index of the element the next `remove`/`update` targets
    target: Option<usize>,
    state: State
}

impl<T: Clone> VecCursor<T> {
    pub fn new(items: Vec<T>) -> Self {
        Self { items, pos: 0, target: None, state: State::Fresh }
    }
    /// Surrender the remaining backing store.
    pub fn into_inner(self) -> Vec<T> {
        self.items
    }
}

impl<T: Clone> Cursor for VecCursor<T> {
    type Item = T;
    fn open(&mut self) -> STDRESULT {
        if self.state == State::Fresh {
            self.state = State::Opened;
        }
        Ok(())
    }
    fn close(&mut self) -> STDRESULT {
        self.state = State::Closed;
        Ok(())
    }
    fn has_next(&mut self) -> Result<bool,DYNERR> {
        self.state.demand()?;
        Ok(self.pos < self.items.len())
    }
    fn next(&mut self) -> Result<T,DYNERR> {
        self.state.demand()?;
        if self.pos >= self.items.len() {
            return Err(Box::new(Error::Exhausted));
        }
        self.pos += 1;
        self.target = Some(self.pos-1);
        Ok(self.items[self.pos-1].clone())
    }
    fn peek(&mut self) -> Result<&T,DYNERR> {
        self.state.demand()?;
        if self.pos >= self.items.len() {
            return Err(Box::new(Error::Exhausted));
        }
        self.target = Some(self.pos);
        Ok(&self.items[self.pos])
    }
    fn reset(&mut self) -> STDRESULT {
        self.state.demand()?;
        self.pos = 0;
        self.target = None;
        Ok(())
    }
    fn remove(&mut self) -> STDRESULT {
        self.state.demand()?;
        match self.target.take() {
            Some(idx) => {
                self.items.remove(idx);
                if idx < self.pos {
                    self.pos -= 1;
                }
                Ok(())
            },
            None => Err(Box::new(Error::IterationState))
        }
    }
    fn update(&mut self,item: T) -> STDRESULT {
        self.state.demand()?;
        match self.target {
            Some(idx) => {
                self.items[idx] = item;
                Ok(())
            },
            None => Err(Box::new(Error::IterationState))
        }
    }
    fn supports_reset(&self) -> bool {
        true
    }
    fn supports_remove(&self) -> bool {
        true
    }
    fn supports_update(&self) -> bool {
        true
    }
}

/// Adapter from any `Iterator`.  One element of lookahead is buffered to
/// serve `has_next` and `peek`.
pub struct IterCursor<I: Iterator> {
    source: I,
    ahead: Option<I::Item>,
    state: State
}

impl<I: Iterator> IterCursor<I> {
    pub fn new(source: I) -> Self {
        Self { source, ahead: None, state: State::Fresh }
    }
    fn fill(&mut self) {
        if self.ahead.is_none() {
            self.ahead = self.source.next();
        }
    }
}

impl<I: Iterator> Cursor for IterCursor<I> {
    type Item = I::Item;
    fn open(&mut self) -> STDRESULT {
        if self.state == State::Fresh {
            self.state = State::Opened;
        }
        Ok(())
    }
    fn close(&mut self) -> STDRESULT {
        self.state = State::Closed;
        self.ahead = None;
        Ok(())
    }
    fn has_next(&mut self) -> Result<bool,DYNERR> {
        self.state.demand()?;
        self.fill();
        Ok(self.ahead.is_some())
    }
    fn next(&mut self) -> Result<I::Item,DYNERR> {
        self.state.demand()?;
        self.fill();
        match self.ahead.take() {
            Some(item) => Ok(item),
            None => Err(Box::new(Error::Exhausted))
        }
    }
    fn peek(&mut self) -> Result<&I::Item,DYNERR> {
        self.state.demand()?;
        self.fill();
        match self.ahead.as_ref() {
            Some(item) => Ok(item),
            None => Err(Box::new(Error::Exhausted))
        }
    }
}

/// Destructive cursor over a queue.  Opening the cursor opens the queue;
/// every `next` dequeues.
pub struct QueueCursor<Q: Queue> {
    queue: Q,
    state: State
}

impl<Q: Queue> QueueCursor<Q> {
    pub fn new(queue: Q) -> Self {
        Self { queue, state: State::Fresh }
    }
}

impl<Q: Queue> Cursor for QueueCursor<Q> {
    type Item = Q::Item;
    fn open(&mut self) -> STDRESULT {
        if self.state == State::Fresh {
            self.queue.open()?;
            self.state = State::Opened;
        }
        Ok(())
    }
    fn close(&mut self) -> STDRESULT {
        if self.state != State::Closed {
            self.queue.close()?;
            self.state = State::Closed;
        }
        Ok(())
    }
    fn has_next(&mut self) -> Result<bool,DYNERR> {
        self.state.demand()?;
        Ok(!self.queue.is_empty())
    }
    fn next(&mut self) -> Result<Q::Item,DYNERR> {
        self.state.demand()?;
        if self.queue.is_empty() {
            return Err(Box::new(Error::Exhausted));
        }
        self.queue.dequeue()
    }
    fn peek(&mut self) -> Result<&Q::Item,DYNERR> {
        self.state.demand()?;
        if self.queue.is_empty() {
            return Err(Box::new(Error::Exhausted));
        }
        self.queue.peek()
    }
}

/// Concatenates any number of cursors into one.  Parts are opened lazily as
/// the iteration reaches them and all remain owned until `close`.
pub struct Sequentializer<T> {
    parts: Vec<Box<dyn Cursor<Item = T>>>,
    idx: usize,
    state: State
}

impl<T> Sequentializer<T> {
    pub fn new(parts: Vec<Box<dyn Cursor<Item = T>>>) -> Self {
        Self { parts, idx: 0, state: State::Fresh }
    }
    /// Open parts up to and including the first that still has elements.
    fn settle(&mut self) -> STDRESULT {
        while self.idx < self.parts.len() {
            self.parts[self.idx].open()?;
            if self.parts[self.idx].has_next()? {
                return Ok(());
            }
            self.idx += 1;
        }
        Ok(())
    }
}

impl<T> Cursor for Sequentializer<T> {
    type Item = T;
    fn open(&mut self) -> STDRESULT {
        if self.state == State::Fresh {
            self.state = State::Opened;
            if !self.parts.is_empty() {
                self.parts[0].open()?;
            }
        }
        Ok(())
    }
    fn close(&mut self) -> STDRESULT {
        if self.state != State::Closed {
            for part in self.parts.iter_mut() {
                part.close()?;
            }
            self.state = State::Closed;
        }
        Ok(())
    }
    fn has_next(&mut self) -> Result<bool,DYNERR> {
        self.state.demand()?;
        self.settle()?;
        Ok(self.idx < self.parts.len())
    }
    fn next(&mut self) -> Result<T,DYNERR> {
        self.state.demand()?;
        self.settle()?;
        if self.idx >= self.parts.len() {
            return Err(Box::new(Error::Exhausted));
        }
        self.parts[self.idx].next()
    }
    fn peek(&mut self) -> Result<&T,DYNERR> {
        self.state.demand()?;
        self.settle()?;
        if self.idx >= self.parts.len() {
            return Err(Box::new(Error::Exhausted));
        }
        self.parts[self.idx].peek()
    }
    fn reset(&mut self) -> STDRESULT {
        self.state.demand()?;
        if !self.supports_reset() {
            return Err(Box::new(Error::CapabilityMissing));
        }
        // only parts the iteration already reached were opened
        for part in self.parts.iter_mut().take(self.idx+1) {
            part.reset()?;
        }
        self.idx = 0;
        Ok(())
    }
    fn supports_reset(&self) -> bool {
        self.parts.iter().all(|p| p.supports_reset())
    }
}

/// Applies a function to every element of a source cursor.
pub struct Mapper<C: Cursor,U,F: FnMut(C::Item) -> U> {
    source: C,
    func: F,
    ahead: Option<U>,
    state: State
}

impl<C: Cursor,U,F: FnMut(C::Item) -> U> Mapper<C,U,F> {
    pub fn new(source: C,func: F) -> Self {
        Self { source, func, ahead: None, state: State::Fresh }
    }
    fn fill(&mut self) -> STDRESULT {
        if self.ahead.is_none() && self.source.has_next()? {
            let raw = self.source.next()?;
            self.ahead = Some((self.func)(raw));
        }
        Ok(())
    }
}

impl<C: Cursor,U,F: FnMut(C::Item) -> U> Cursor for Mapper<C,U,F> {
    type Item = U;
    fn open(&mut self) -> STDRESULT {
        if self.state == State::Fresh {
            self.source.open()?;
            self.state = State::Opened;
        }
        Ok(())
    }
    fn close(&mut self) -> STDRESULT {
        if self.state != State::Closed {
            self.source.close()?;
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
    fn next(&mut self) -> Result<U,DYNERR> {
        self.state.demand()?;
        self.fill()?;
        match self.ahead.take() {
            Some(item) => Ok(item),
            None => Err(Box::new(Error::Exhausted))
        }
    }
    fn peek(&mut self) -> Result<&U,DYNERR> {
        self.state.demand()?;
        self.fill()?;
        match self.ahead.as_ref() {
            Some(item) => Ok(item),
            None => Err(Box::new(Error::Exhausted))
        }
    }
    fn reset(&mut self) -> STDRESULT {
        self.state.demand()?;
        self.source.reset()?;
        self.ahead = None;
        Ok(())
    }
    fn supports_reset(&self) -> bool {
        self.source.supports_reset()
    }
}

/// Drops elements of a source cursor that fail a predicate.
pub struct Filter<C: Cursor,P: FnMut(&C::Item) -> bool> {
    source: C,
    pred: P,
    ahead: Option<C::Item>,
    state: State
}

impl<C: Cursor,P: FnMut(&C::Item) -> bool> Filter<C,P> {
    pub fn new(source: C,pred: P) -> Self {
        Self { source, pred, ahead: None, state: State::Fresh }
    }
    fn fill(&mut self) -> STDRESULT {
        while self.ahead.is_none() && self.source.has_next()? {
            let item = self.source.next()?;
            if (self.pred)(&item) {
                self.ahead = Some(item);
            }
        }
        Ok(())
    }
}

impl<C: Cursor,P: FnMut(&C::Item) -> bool> Cursor for Filter<C,P> {
    type Item = C::Item;
    fn open(&mut self) -> STDRESULT {
        if self.state == State::Fresh {
            self.source.open()?;
            self.state = State::Opened;
        }
        Ok(())
    }
    fn close(&mut self) -> STDRESULT {
        if self.state != State::Closed {
            self.source.close()?;
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
            Some(item) => Ok(item),
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
    fn reset(&mut self) -> STDRESULT {
        self.state.demand()?;
        self.source.reset()?;
        self.ahead = None;
        Ok(())
    }
    fn supports_reset(&self) -> bool {
        self.source.supports_reset()
    }
}

/// Cursor over an owned `VecDeque`, used by components that stage results.
pub struct DequeCursor<T> {
    items: VecDeque<T>,
    state: State
}

impl<T> DequeCursor<T> {
    pub fn new(items: VecDeque<T>) -> Self {
        Self { items, state: State::Fresh }
    }
}

impl<T> Cursor for DequeCursor<T> {
    type Item = T;
    fn open(&mut self) -> STDRESULT {
        if self.state == State::Fresh {
            self.state = State::Opened;
        }
        Ok(())
    }
    fn close(&mut self) -> STDRESULT {
        self.items.clear();
        self.state = State::Closed;
        Ok(())
    }
    fn has_next(&mut self) -> Result<bool,DYNERR> {
        self.state.demand()?;
        Ok(!self.items.is_empty())
    }
    fn next(&mut self) -> Result<T,DYNERR> {
        self.state.demand()?;
        match self.items.pop_front() {
            Some(item) => Ok(item),
            None => Err(Box::new(Error::Exhausted))
        }
    }
    fn peek(&mut self) -> Result<&T,DYNERR> {
        self.state.demand()?;
        match self.items.front() {
            Some(item) => Ok(item),
            None => Err(Box::new(Error::Exhausted))
        }
    }
}
