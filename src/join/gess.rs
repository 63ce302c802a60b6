//! ## GESS join
//!
//! Distance joins over replicated inputs.  Each input stream of rectangles
//! (or points, as degenerate rectangles) is expanded by ε/2, replicated
//! into Z-cells, sorted by the total Z-code order, and fed to the Orenstein
//! merge.  Replication makes a logical pair appear in every cell where both
//! sides left a piece, so the data predicate is conjoined with a
//! reference-point test that lets exactly one cell own each pair: the pair
//! survives only in the cell containing `max(ll_0, ll_1) - ε/2`.
//!
//! The test is skipped when neither payload is a replicate, since only
//! replication produces duplicates.  The check can be forced on every pair
//! for verification; a pair's reference point always lies inside both
//! payloads' cells when the pair is the only copy, so forcing changes
//! nothing but cost.

use std::rc::Rc;
use log::debug;
use crate::cursor::Cursor;
use crate::sort::{MergeSorter,SortedCursor};
use crate::spatial::replicate::{Replicator,SplitLimits,eps_expansion};
use crate::spatial::zcode::{ZKeyed,point_code};
use crate::spatial::{Point,Rect};
use crate::DYNERR;
use super::orenstein::{DataPredicate,OrensteinJoin,orenstein_join};
use super::Error;

/// Accepts when the two payloads are within `eps` under the L^p norm.
pub fn within_distance(eps: f64,p: f64) -> Rc<dyn Fn(&Rect,&Rect) -> Result<bool,DYNERR>> {
    Rc::new(move |a,b| Ok(a.distance(b,p)? <= eps))
}

/// The deterministic witness of an intersection: coordinate-wise maximum
/// of the lower corners, pulled back by ε/2.
pub fn reference_point(a: &Rect,b: &Rect,eps: f64) -> Point {
    let d = a.dimensions();
    Point::new((0..d).map(|i| a.ll().coord(i).max(b.ll().coord(i)) - eps / 2.0).collect())
}

/// Does the pair's common cell own its reference point?  The common cell
/// is the more precise of the two codes; the prefix invariant makes the
/// other an ancestor.
pub fn reference_accepts(a: &ZKeyed<Rect>,b: &ZKeyed<Rect>,eps: f64) -> Result<bool,DYNERR> {
    let cell = match a.code.precision() >= b.code.precision() {
        true => &a.code,
        false => &b.code
    };
    let r = reference_point(&a.data,&b.data,eps);
    let r_code = point_code(&r,cell.precision())?;
    Ok(r_code == *cell)
}

/// Conjoin the user predicate with reference-point duplicate elimination.
/// With `replicate_only_check` the test runs only when at least one payload
/// is a replicate.
pub fn gess_predicate(user: Rc<dyn Fn(&Rect,&Rect) -> Result<bool,DYNERR>>,eps: f64,replicate_only_check: bool) -> DataPredicate<Rect> {
    Rc::new(move |a,b| {
        if !user(&a.data,&b.data)? {
            return Ok(false);
        }
        if replicate_only_check && !a.replicate && !b.replicate {
            return Ok(true);
        }
        reference_accepts(a,b,eps)
    })
}

/// Expand, replicate, and sort one input for the merge.  The sorter's
/// comparator must be the total Z-code order.
pub fn prepare_input<C>(input: C,eps: f64,limits: SplitLimits,sorter: &mut MergeSorter<ZKeyed<Rect>>) -> Result<SortedCursor<ZKeyed<Rect>>,DYNERR>
where C: Cursor<Item = Rect> + 'static {
    let repl = Replicator::new(input,eps_expansion(eps),limits.predicate());
    let sorted = sorter.sort(repl)?;
    debug!("gess input staged in {} runs",sorter.runs_generated());
    Ok(sorted)
}

/// The GESS join over two Z-ordered replicated inputs.
pub fn gess_join<C0,C1>(input0: C0,input1: C1,eps: f64,user: Rc<dyn Fn(&Rect,&Rect) -> Result<bool,DYNERR>>,replicate_only_check: bool) -> Result<OrensteinJoin<Rect,C0,C1>,DYNERR>
where C0: Cursor<Item = ZKeyed<Rect>>,C1: Cursor<Item = ZKeyed<Rect>> {
    if !(eps >= 0.0) {
        return Err(Box::new(Error::Config));
    }
    Ok(orenstein_join(input0,input1,gess_predicate(user,eps,replicate_only_check)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spatial::zcode::ZCode;

    fn pt(coords: &[f64]) -> Rect {
        Rect::from_point(&Point::new(coords.to_vec()))
    }

    fn code(bits: &[u8]) -> ZCode {
        ZCode::from_bools(&bits.iter().map(|b| *b == 1).collect::<Vec<bool>>())
    }

    #[test]
    fn reference_point_is_max_ll_minus_half_eps() {
        let r = reference_point(&pt(&[0.1,0.1]),&pt(&[0.15,0.15]),0.2);
        assert!((r.coord(0) - 0.05).abs() < 1e-12);
        assert!((r.coord(1) - 0.05).abs() < 1e-12);
    }

    #[test]
    fn exactly_one_cell_owns_the_pair() {
        // replication forced at level 0 in dimension 0: cells "0" and "1";
        // the reference point (0.05,0.05) lives in cell "0"
        let eps = 0.2;
        let p = pt(&[0.1,0.1]);
        let q = pt(&[0.15,0.15]);
        let in_low = ZKeyed::new(p.clone(),code(&[0]),false);
        let in_high = ZKeyed::new(p,code(&[1]),true);
        let probe_low = ZKeyed::new(q.clone(),code(&[0]),true);
        let probe_high = ZKeyed::new(q,code(&[1]),true);
        assert!(reference_accepts(&in_low,&probe_low,eps).unwrap());
        assert!(!reference_accepts(&in_high,&probe_high,eps).unwrap());
    }

    #[test]
    fn canonical_only_pair_passes_even_when_forced() {
        // both payloads wholly inside cell "00": the reference point is in
        // the same cell, so forcing the check keeps the pair
        let eps = 0.1;
        let a = ZKeyed::new(pt(&[0.1,0.1]),code(&[0,0]),false);
        let b = ZKeyed::new(pt(&[0.12,0.12]),code(&[0,0]),false);
        assert!(reference_accepts(&a,&b,eps).unwrap());
        let forced = gess_predicate(within_distance(eps,2.0),eps,false);
        let relaxed = gess_predicate(within_distance(eps,2.0),eps,true);
        assert_eq!(forced(&a,&b).unwrap(),relaxed(&a,&b).unwrap());
    }
}
