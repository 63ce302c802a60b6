//! # Queue Module
//!
//! FIFO queues feed the external sorter and back its runs.  The trait is
//! deliberately small: lifecycle, enqueue/dequeue/peek, and size.  The
//! in-memory implementation wraps a deque; the file-backed implementation
//! in `blockfile` frames records over a block column file and is the normal
//! backing store for sort runs.
//!
//! `BoundedQueue` decorates any queue with an admission predicate.  A
//! rejected element goes to the overflow handler; the default handler
//! surfaces a capacity-exceeded error.

pub mod blockfile;

use std::collections::VecDeque;
use crate::{STDRESULT,DYNERR};

/// Enumerates queue errors.  The `Display` trait will print the equivalent
/// long message.
#[derive(thiserror::Error,Debug)]
pub enum Error {
    #[error("queue capacity exceeded")]
    CapacityExceeded,
    #[error("queue is empty")]
    Empty,
    #[error("unexpected frame in backing file")]
    BadFrame
}

/// First-in first-out element store.
pub trait Queue {
    type Item;
    fn open(&mut self) -> STDRESULT;
    /// Release all resources.  A file-backed queue also deletes its backing
    /// files; runs are write-once read-once.
    fn close(&mut self) -> STDRESULT;
    fn enqueue(&mut self,item: Self::Item) -> STDRESULT;
    fn dequeue(&mut self) -> Result<Self::Item,DYNERR>;
    fn peek(&mut self) -> Result<&Self::Item,DYNERR>;
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
    fn len(&self) -> usize;
}

impl<Q: Queue + ?Sized> Queue for Box<Q> {
    type Item = Q::Item;
    fn open(&mut self) -> STDRESULT {
        (**self).open()
    }
    fn close(&mut self) -> STDRESULT {
        (**self).close()
    }
    fn enqueue(&mut self,item: Self::Item) -> STDRESULT {
        (**self).enqueue(item)
    }
    fn dequeue(&mut self) -> Result<Self::Item,DYNERR> {
        (**self).dequeue()
    }
    fn peek(&mut self) -> Result<&Self::Item,DYNERR> {
        (**self).peek()
    }
    fn is_empty(&self) -> bool {
        (**self).is_empty()
    }
    fn len(&self) -> usize {
        (**self).len()
    }
}

/// Heap-resident FIFO.
pub struct MemQueue<T> {
    items: VecDeque<T>
}

impl<T> MemQueue<T> {
    pub fn new() -> Self {
        Self { items: VecDeque::new() }
    }
}

impl<T> Queue for MemQueue<T> {
    type Item = T;
    fn open(&mut self) -> STDRESULT {
        Ok(())
    }
    fn close(&mut self) -> STDRESULT {
        self.items.clear();
        Ok(())
    }
    fn enqueue(&mut self,item: T) -> STDRESULT {
        self.items.push_back(item);
        Ok(())
    }
    fn dequeue(&mut self) -> Result<T,DYNERR> {
        match self.items.pop_front() {
            Some(item) => Ok(item),
            None => Err(Box::new(Error::Empty))
        }
    }
    fn peek(&mut self) -> Result<&T,DYNERR> {
        match self.items.front() {
            Some(item) => Ok(item),
            None => Err(Box::new(Error::Empty))
        }
    }
    fn len(&self) -> usize {
        self.items.len()
    }
}

/// Called with the queue and the rejected element when admission fails.
pub type OverflowHandler<Q> = Box<dyn FnMut(&mut Q,<Q as Queue>::Item) -> STDRESULT>;

/// Decorates a queue with an admission predicate.
pub struct BoundedQueue<Q: Queue> {
    inner: Q,
    admit: Box<dyn Fn(usize,&Q::Item) -> bool>,
    overflow: Option<OverflowHandler<Q>>
}

impl<Q: Queue> BoundedQueue<Q> {
    /// `admit` sees the current length and the candidate element.  Without
    /// a handler, rejection surfaces `Error::CapacityExceeded`.
    pub fn new(inner: Q,admit: Box<dyn Fn(usize,&Q::Item) -> bool>,overflow: Option<OverflowHandler<Q>>) -> Self {
        Self { inner, admit, overflow }
    }
    /// Convenience constructor bounding by element count.
    pub fn with_capacity(inner: Q,max_len: usize) -> Self {
        Self::new(inner,Box::new(move |len,_| len < max_len),None)
    }
    pub fn into_inner(self) -> Q {
        self.inner
    }
}

impl<Q: Queue> Queue for BoundedQueue<Q> {
    type Item = Q::Item;
    fn open(&mut self) -> STDRESULT {
        self.inner.open()
    }
    fn close(&mut self) -> STDRESULT {
        self.inner.close()
    }
    fn enqueue(&mut self,item: Self::Item) -> STDRESULT {
        if (self.admit)(self.inner.len(),&item) {
            return self.inner.enqueue(item);
        }
        match self.overflow.as_mut() {
            Some(handler) => handler(&mut self.inner,item),
            None => Err(Box::new(Error::CapacityExceeded))
        }
    }
    fn dequeue(&mut self) -> Result<Self::Item,DYNERR> {
        self.inner.dequeue()
    }
    fn peek(&mut self) -> Result<&Self::Item,DYNERR> {
        self.inner.peek()
    }
    fn len(&self) -> usize {
        self.inner.len()
    }
}
