//! ## Orenstein join
//!
//! Specializes the sort-merge driver to Z-code prefix matching.  Inputs are
//! streams of keyed payloads sorted by the total Z-code order (containing
//! cells first).  Each side's sweep area is a stack whose entries always
//! form a nested prefix chain: expiration pops every entry whose cell does
//! not contain the element the other side advanced to, and insertion pops
//! the same way before pushing, which is what keeps the chain nested.  Once
//! an entry is popped no later element of either input can sit inside its
//! cell, so nothing is lost.
//!
//! Two entries join when their cells stand in prefix relation and the data
//! predicate accepts their payloads.

use std::rc::Rc;
use crate::cursor::Cursor;
use crate::spatial::zcode::ZKeyed;
use crate::{STDRESULT,DYNERR};
use super::{MergeJoin,SweepArea};

/// Decides whether two payloads in prefix-related cells really join.
pub type DataPredicate<T> = Rc<dyn Fn(&ZKeyed<T>,&ZKeyed<T>) -> Result<bool,DYNERR>>;

/// LIFO sweep area over Z-keyed payloads.
pub struct StackSweep<T> {
    stack: Vec<ZKeyed<T>>,
    pred: DataPredicate<T>
}

impl<T> StackSweep<T> {
    pub fn new(pred: DataPredicate<T>) -> Self {
        Self { stack: Vec::new(), pred }
    }
    /// Pop everything whose cell does not contain `code`'s cell.
    fn expire(&mut self,current: &ZKeyed<T>) {
        while let Some(top) = self.stack.last() {
            if current.code.precision() < top.code.precision()
                || current.code.prefix_cmp(&top.code) != std::cmp::Ordering::Equal {
                self.stack.pop();
            } else {
                break;
            }
        }
    }
}

impl<T: Clone> SweepArea<ZKeyed<T>> for StackSweep<T> {
    fn insert(&mut self,item: ZKeyed<T>) -> STDRESULT {
        // entries off the inserted element's prefix path can never match a
        // later element of either input, and popping them first keeps the
        // stack a nested chain
        self.expire(&item);
        self.stack.push(item);
        Ok(())
    }
    fn reorganize(&mut self,current: &ZKeyed<T>,_id: usize) -> STDRESULT {
        self.expire(current);
        Ok(())
    }
    fn query(&mut self,probe: &ZKeyed<T>,_id: usize) -> Result<Vec<ZKeyed<T>>,DYNERR> {
        let mut ans = Vec::new();
        for entry in self.stack.iter() {
            let related = entry.code.is_prefix_of(&probe.code) || probe.code.is_prefix_of(&entry.code);
            if related && (self.pred)(entry,probe)? {
                ans.push(entry.clone());
            }
        }
        Ok(ans)
    }
    fn len(&self) -> usize {
        self.stack.len()
    }
}

/// Total Z-code order over keyed payloads, the sort order both inputs must
/// arrive in.
pub fn zcode_order<T>() -> crate::sort::Comparator<ZKeyed<T>> {
    Rc::new(|a: &ZKeyed<T>,b: &ZKeyed<T>| a.code.cmp(&b.code))
}

/// The join over two Z-ordered inputs.  Emitted pairs are oriented
/// (input 0, input 1).
pub type OrensteinJoin<T,C0,C1> = MergeJoin<
    ZKeyed<T>,C0,C1,StackSweep<T>,StackSweep<T>,
    (ZKeyed<T>,ZKeyed<T>),
    fn(&ZKeyed<T>,&ZKeyed<T>) -> (ZKeyed<T>,ZKeyed<T>)
>;

fn pair<T: Clone>(a: &ZKeyed<T>,b: &ZKeyed<T>) -> (ZKeyed<T>,ZKeyed<T>) {
    (a.clone(),b.clone())
}

pub fn orenstein_join<T,C0,C1>(input0: C0,input1: C1,pred: DataPredicate<T>) -> OrensteinJoin<T,C0,C1>
where T: Clone,C0: Cursor<Item = ZKeyed<T>>,C1: Cursor<Item = ZKeyed<T>> {
    MergeJoin::new(
        input0,
        input1,
        StackSweep::new(pred.clone()),
        StackSweep::new(pred),
        zcode_order(),
        pair::<T>
    )
}
