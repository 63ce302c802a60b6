//! ## Replicator
//!
//! Maps each input hypercube to one or more disjoint Z-cells.  The
//! recursion walks the bisection tree by bit interleaving: while the cube
//! lies wholly on one side of the split plane it descends; when it
//! straddles, it either splits into the two clipped halves (replication) or,
//! when the split predicate forbids it, assigns the cube to the enclosing
//! cell at the current precision.
//!
//! The first cell emitted for an input is the canonical one; the rest are
//! marked as replicates so the join can eliminate the duplicates they
//! cause.  Recursion depth is capped by the reserved headroom of the
//! fixed-point representation (`split_bit_index`).

use std::collections::{HashMap,VecDeque};
use log::trace;
use crate::cursor::{Cursor,Error as CursorError,State};
use crate::{STDRESULT,DYNERR};
use super::zcode::{ZCode,ZKeyed,split_bit_index};
use super::{FixedRect,Rect};

/// `split_allowed(level, splits_at_level)`.
pub type SplitPredicate = Box<dyn Fn(usize,usize) -> bool>;

/// The default replication limit: at most `max_splits_per_level` splits on
/// any one level and no splitting at or beyond `max_split_level`.
pub struct SplitLimits {
    pub max_splits_per_level: usize,
    pub max_split_level: usize
}

impl SplitLimits {
    pub fn new(max_splits_per_level: usize,max_split_level: usize) -> Self {
        Self { max_splits_per_level, max_split_level }
    }
    pub fn predicate(self) -> SplitPredicate {
        Box::new(move |level,splits| splits < self.max_splits_per_level && level < self.max_split_level)
    }
}

/// The cells an input cube is assigned to, canonical cell first.
pub fn replicate_cells(rect: &FixedRect,split_allowed: &dyn Fn(usize,usize) -> bool) -> Vec<ZCode> {
    let d = rect.dimensions();
    let mut cells = Vec::new();
    let mut splits_at_level: HashMap<usize,usize> = HashMap::new();
    // explicit DFS; the upper half is pushed first so the lower half and
    // with it the lowest cell comes out first
    let mut stack: Vec<(FixedRect,ZCode,usize)> = vec![(rect.clone(),ZCode::root(),0)];
    while let Some((cube,code,level)) = stack.pop() {
        let bit_index = match split_bit_index(d,level) {
            Some(b) => b,
            None => {
                cells.push(code);
                continue;
            }
        };
        let dim = level % d;
        let lo = cube.lo[dim] >> bit_index & 1;
        let hi = cube.hi[dim] >> bit_index & 1;
        if lo == hi {
            let mut deeper = code;
            deeper.push(lo == 1);
            stack.push((cube,deeper,level+1));
            continue;
        }
        let splits = splits_at_level.get(&level).copied().unwrap_or(0);
        if !split_allowed(level,splits) {
            cells.push(code);
            continue;
        }
        splits_at_level.insert(level,splits+1);
        let low_ones = (1u64 << bit_index) - 1;
        let prefix = cube.hi[dim] & !((1u64 << (bit_index+1)) - 1);
        let mut lower = cube.clone();
        lower.hi[dim] = prefix | low_ones;
        let mut upper = cube;
        upper.lo[dim] = prefix | (1u64 << bit_index);
        let mut upper_code = code.clone();
        upper_code.push(true);
        let mut lower_code = code;
        lower_code.push(false);
        stack.push((upper,upper_code,level+1));
        stack.push((lower,lower_code,level+1));
    }
    cells
}

/// Cursor adaptor yielding the lazy replication of its source.
pub struct Replicator<C: Cursor,F: Fn(&C::Item) -> Result<FixedRect,DYNERR>> where C::Item: Clone {
    source: C,
    mapping: F,
    split_allowed: SplitPredicate,
    batch: VecDeque<ZKeyed<C::Item>>,
    state: State
}

impl<C: Cursor,F: Fn(&C::Item) -> Result<FixedRect,DYNERR>> Replicator<C,F> where C::Item: Clone {
    /// `mapping` turns an input into the fixed-point hypercube that gets
    /// replicated; for distance joins it also applies the ε/2 expansion.
    pub fn new(source: C,mapping: F,split_allowed: SplitPredicate) -> Self {
        Self { source, mapping, split_allowed, batch: VecDeque::new(), state: State::Fresh }
    }
    fn fill(&mut self) -> STDRESULT {
        while self.batch.is_empty() && self.source.has_next()? {
            let item = self.source.next()?;
            let cube = (self.mapping)(&item)?;
            let cells = replicate_cells(&cube,self.split_allowed.as_ref());
            trace!("input replicated into {} cells",cells.len());
            for (i,code) in cells.into_iter().enumerate() {
                self.batch.push_back(ZKeyed::new(item.clone(),code,i > 0));
            }
        }
        Ok(())
    }
}

impl<C: Cursor,F: Fn(&C::Item) -> Result<FixedRect,DYNERR>> Cursor for Replicator<C,F> where C::Item: Clone {
    type Item = ZKeyed<C::Item>;
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
            self.batch.clear();
            self.state = State::Closed;
        }
        Ok(())
    }
    fn has_next(&mut self) -> Result<bool,DYNERR> {
        self.state.demand()?;
        self.fill()?;
        Ok(!self.batch.is_empty())
    }
    fn next(&mut self) -> Result<Self::Item,DYNERR> {
        self.state.demand()?;
        self.fill()?;
        match self.batch.pop_front() {
            Some(item) => Ok(item),
            None => Err(Box::new(CursorError::Exhausted))
        }
    }
    fn peek(&mut self) -> Result<&Self::Item,DYNERR> {
        self.state.demand()?;
        self.fill()?;
        match self.batch.front() {
            Some(item) => Ok(item),
            None => Err(Box::new(CursorError::Exhausted))
        }
    }
}

/// Mapping for distance joins over unit-space rectangles: expand by ε/2 on
/// every side, then clamp into fixed-point space.
pub fn eps_expansion(eps: f64) -> impl Fn(&Rect) -> Result<FixedRect,DYNERR> {
    move |rect| FixedRect::from_rect(&rect.expanded(eps / 2.0))
}
