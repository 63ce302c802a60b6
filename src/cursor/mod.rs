//! # Cursor Module
//!
//! Cursors are lazy pull iterators with an explicit lifecycle.  Every data
//! producing component in this crate speaks this protocol: storage scans,
//! queue drains, sorted outputs, replicators, and joins.
//!
//! ## Lifecycle
//!
//! A cursor is in exactly one of three states: fresh, opened, or closed.
//! The caller orders calls as `open -> (has_next | peek | next)* -> close`.
//! Demanding elements from a fresh or closed cursor is an error.  `close` is
//! idempotent, releases every borrowed resource, and propagates to owned
//! sub-cursors.  Re-opening a closed cursor is not supported.
//!
//! ## Peeking
//!
//! `peek` computes the next element without consuming it; the following
//! `next` returns that same element.  `has_next` never advances.
//!
//! ## Optional capabilities
//!
//! `reset`, `remove`, and `update` are optional.  A cursor advertises them
//! through `supports_reset`/`supports_remove`/`supports_update`; calling an
//! unsupported operation fails with `Error::CapabilityMissing`, never with a
//! silent no-op.  `remove` and `update` target the element last returned by
//! `next` (or `peek` when `remove` directly follows it); interleaving other
//! demands in between is an order violation.

pub mod wrappers;
pub mod tee;
#[cfg(test)]
mod cursor_test;

use crate::{STDRESULT,DYNERR};

/// Enumerates cursor errors.  The `Display` trait will print the equivalent
/// long message.
#[derive(thiserror::Error,Debug)]
pub enum Error {
    #[error("optional cursor operation not supported")]
    CapabilityMissing,
    #[error("cursor demand order violated")]
    IterationState,
    #[error("cursor is exhausted")]
    Exhausted,
    #[error("cursor is not open")]
    NotOpen,
    #[error("cursor was already closed")]
    Closed
}

/// Lifecycle state shared by all cursor implementations.
#[derive(Clone,Copy,PartialEq,Eq,Debug)]
pub enum State {
    Fresh,
    Opened,
    Closed
}

impl State {
    /// Demand-side guard, errors unless the cursor is open.
    pub fn demand(&self) -> STDRESULT {
        match self {
            State::Opened => Ok(()),
            State::Fresh => Err(Box::new(Error::NotOpen)),
            State::Closed => Err(Box::new(Error::Closed))
        }
    }
}

/// The pull iteration protocol.  See the module documentation for the
/// ordering rules.
pub trait Cursor {
    type Item;
    /// Acquire resources and move to the opened state.  Opening an already
    /// opened cursor is a no-op.
    fn open(&mut self) -> STDRESULT;
    /// Release all resources.  Idempotent.
    fn close(&mut self) -> STDRESULT;
    /// Will `next` produce another element?  Never advances the cursor.
    fn has_next(&mut self) -> Result<bool,DYNERR>;
    /// Produce the next element, or `Error::Exhausted` past the end.
    fn next(&mut self) -> Result<Self::Item,DYNERR>;
    /// Compute the next element without consuming it.
    fn peek(&mut self) -> Result<&Self::Item,DYNERR>;
    /// Restart the iteration from the beginning, if supported.
    fn reset(&mut self) -> STDRESULT {
        Err(Box::new(Error::CapabilityMissing))
    }
    /// Remove the element last returned, if supported.
    fn remove(&mut self) -> STDRESULT {
        Err(Box::new(Error::CapabilityMissing))
    }
    /// Replace the element last returned, if supported.
    fn update(&mut self,_item: Self::Item) -> STDRESULT {
        Err(Box::new(Error::CapabilityMissing))
    }
    fn supports_reset(&self) -> bool {
        false
    }
    fn supports_remove(&self) -> bool {
        false
    }
    fn supports_update(&self) -> bool {
        false
    }
}

impl<C: Cursor + ?Sized> Cursor for Box<C> {
    type Item = C::Item;
    fn open(&mut self) -> STDRESULT {
        (**self).open()
    }
    fn close(&mut self) -> STDRESULT {
        (**self).close()
    }
    fn has_next(&mut self) -> Result<bool,DYNERR> {
        (**self).has_next()
    }
    fn next(&mut self) -> Result<Self::Item,DYNERR> {
        (**self).next()
    }
    fn peek(&mut self) -> Result<&Self::Item,DYNERR> {
        (**self).peek()
    }
    fn reset(&mut self) -> STDRESULT {
        (**self).reset()
    }
    fn remove(&mut self) -> STDRESULT {
        (**self).remove()
    }
    fn update(&mut self,item: Self::Item) -> STDRESULT {
        (**self).update(item)
    }
    fn supports_reset(&self) -> bool {
        (**self).supports_reset()
    }
    fn supports_remove(&self) -> bool {
        (**self).supports_remove()
    }
    fn supports_update(&self) -> bool {
        (**self).supports_update()
    }
}

/// Drain an open cursor into a vector, closing it afterwards.
pub fn drain<C: Cursor>(mut curs: C) -> Result<Vec<C::Item>,DYNERR> {
    curs.open()?;
    let mut ans = Vec::new();
    while curs.has_next()? {
        ans.push(curs.next()?);
    }
    curs.close()?;
    Ok(ans)
}
