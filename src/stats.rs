//! # Statistic Center
//!
//! Storage objects count the block traffic they cause.  The counters are a
//! side channel: a component asks an injected `StatCenter` for a named
//! counter at construction time and increments it as it works.  When no
//! center is supplied the component holds a detached counter and behaves
//! identically.
//!
//! Counters are `Rc`-shared cells.  The whole crate is single-threaded, so
//! there is no atomicity requirement.

use std::cell::{Cell,RefCell};
use std::collections::HashMap;
use std::rc::Rc;

/// Shared handle to a named tally.  Cloning yields another handle to the
/// same tally.
#[derive(Clone,Default)]
pub struct Counter {
    count: Rc<Cell<u64>>
}

impl Counter {
    pub fn new() -> Self {
        Self { count: Rc::new(Cell::new(0)) }
    }
    pub fn inc(&self) {
        self.count.set(self.count.get() + 1);
    }
    pub fn add(&self,n: u64) {
        self.count.set(self.count.get() + n);
    }
    pub fn value(&self) -> u64 {
        self.count.get()
    }
}

/// Anything that hands out counters by name.  Implementations may aggregate,
/// display, or ignore the counts.
pub trait StatCenter {
    fn get_count(&self,name: &str) -> Counter;
}

/// Keeps every requested counter in a map so callers can read the totals
/// back after a run.
#[derive(Default)]
pub struct MemStatCenter {
    counters: RefCell<HashMap<String,Counter>>
}

impl MemStatCenter {
    pub fn new() -> Self {
        Self { counters: RefCell::new(HashMap::new()) }
    }
    /// Value of a named counter, 0 if it was never requested.
    pub fn value(&self,name: &str) -> u64 {
        match self.counters.borrow().get(name) {
            Some(c) => c.value(),
            None => 0
        }
    }
}

impl StatCenter for MemStatCenter {
    fn get_count(&self,name: &str) -> Counter {
        let mut map = self.counters.borrow_mut();
        match map.get(name) {
            Some(c) => c.clone(),
            None => {
                let c = Counter::new();
                map.insert(name.to_string(),c.clone());
                c
            }
        }
    }
}

/// Resolve a counter from an optional center, detached counter if none.
pub fn maybe_count(center: Option<&dyn StatCenter>,name: &str) -> Counter {
    match center {
        Some(c) => c.get_count(name),
        None => Counter::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_are_shared() {
        let center = MemStatCenter::new();
        let a = center.get_count("reads");
        let b = center.get_count("reads");
        a.inc();
        b.add(2);
        assert_eq!(center.value("reads"),3);
        assert_eq!(center.value("writes"),0);
    }

    #[test]
    fn detached_counter_still_counts() {
        let c = maybe_count(None,"whatever");
        c.inc();
        assert_eq!(c.value(),1);
    }
}
